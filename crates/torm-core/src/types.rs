//! Logical and SQL column types.
//!
//! Two total functions live here: [`map_logical_to_sql`] picks the SQL type a
//! column is emitted with, and [`canonicalize`] folds equivalent catalog type
//! names together so drift detection compares like with like.

use core::fmt;

/// The logical type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `String`
    String,
    /// `Int`
    Int,
    /// `Float`
    Float,
    /// `Boolean`
    Bool,
    /// `DateTime`
    Timestamp,
    /// `@db.Uuid`
    Uuid,
    /// `Json`
    Json,
    /// A schema-level enum, by name.
    Enum(String),
    /// Any other type name, kept verbatim.
    Other(String),
}

impl FieldType {
    /// Maps a declared schema type name to its logical type.
    ///
    /// Enum names are not known at this point; they come back as
    /// [`FieldType::Other`] and are resolved once the whole schema is read.
    #[must_use]
    pub fn from_declared(name: &str) -> Self {
        match name {
            "String" => Self::String,
            "Int" => Self::Int,
            "Float" => Self::Float,
            "Boolean" => Self::Bool,
            "DateTime" => Self::Timestamp,
            "Json" => Self::Json,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the logical type name (`string`, `int`, an enum name, ...).
    #[must_use]
    pub fn logical_name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
            Self::Uuid => "uuid",
            Self::Json => "json",
            Self::Enum(name) | Self::Other(name) => name,
        }
    }

    /// Returns the SQL column type used when emitting DDL.
    #[must_use]
    pub fn sql_type(&self) -> &'static str {
        map_logical_to_sql(self.logical_name())
    }

    /// Returns true for integer types.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.logical_name())
    }
}

/// Maps a logical type name to the SQL type used for emission.
///
/// `int*` maps to `INTEGER` and `float*` to `REAL`; anything unknown falls
/// back to `TEXT`.
#[must_use]
pub fn map_logical_to_sql(logical: &str) -> &'static str {
    match logical {
        "string" => "TEXT",
        "bool" => "BOOLEAN",
        "timestamp" => "TIMESTAMP",
        "uuid" => "UUID",
        t if t.starts_with("int") => "INTEGER",
        t if t.starts_with("float") => "REAL",
        _ => "TEXT",
    }
}

/// Normalizes an SQL type name for drift comparison.
///
/// Equivalent names fold to one representative; unknown names pass through
/// upper-cased. The function is idempotent.
#[must_use]
pub fn canonicalize(sql: &str) -> String {
    let upper = sql.trim().to_uppercase();
    let canonical = match upper.as_str() {
        "INT4" | "INT8" | "INTEGER" => "INTEGER",
        "BOOL" | "BOOLEAN" => "BOOLEAN",
        "REAL" | "FLOAT4" | "FLOAT8" => "REAL",
        "TIMESTAMP" | "TIMESTAMPTZ" => "TIMESTAMP",
        "TEXT" => "TEXT",
        "UUID" => "UUID",
        _ => return upper,
    };
    canonical.to_string()
}
