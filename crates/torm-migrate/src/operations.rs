//! Schema changes a stub can express.
//!
//! Operations are plain data; [`crate::dialect::PostgresDialect`] turns each
//! one into its forward and reverse SQL.

use serde::Serialize;
use torm_core::{Entity, Field, FieldType};

/// How a primary-key column is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyStyle {
    /// `UUID PRIMARY KEY DEFAULT uuid_generate_v4()`
    Uuid,
    /// `SERIAL PRIMARY KEY`
    Serial,
    /// `<type> PRIMARY KEY`
    Typed,
}

/// A column as the stub generator emits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    /// Column name (lower-cased field name).
    pub name: String,
    /// SQL type from the type mapper.
    pub sql_type: String,
    /// Raw default expression.
    pub default: Option<String>,
    /// Set on the primary-key column.
    pub key: Option<KeyStyle>,
}

impl ColumnDef {
    /// Builds the column for a schema field.
    #[must_use]
    pub fn from_field(field: &Field) -> Self {
        let key = field.primary_key.then(|| {
            if field.ty == FieldType::Uuid {
                KeyStyle::Uuid
            } else if field.auto_increment && field.ty.is_integer() {
                KeyStyle::Serial
            } else {
                KeyStyle::Typed
            }
        });
        Self {
            name: field.column_name(),
            sql_type: field.sql_type().to_string(),
            default: field.default.clone(),
            key,
        }
    }
}

/// A named index over some columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDef {
    /// `idx_<table>_<n>`
    pub name: String,
    /// Indexed column names, in declaration order.
    pub columns: Vec<String>,
}

/// One side of a many-to-many join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinSide {
    /// The referenced table.
    pub table: String,
    /// SQL type of the referenced primary key.
    pub key_type: String,
    /// Name of the referenced primary-key column.
    pub key_column: String,
}

impl JoinSide {
    /// Describes the join column pointing at `entity`.
    #[must_use]
    pub fn for_entity(entity: &Entity) -> Self {
        let (key_type, key_column) = entity.primary_key().map_or_else(
            || ("INTEGER".to_string(), "id".to_string()),
            |pk| (pk.sql_type().to_string(), pk.column_name()),
        );
        Self {
            table: entity.table_name(),
            key_type,
            key_column,
        }
    }

    /// The join column name, `<table>_id`.
    #[must_use]
    pub fn column(&self) -> String {
        format!("{}_id", self.table)
    }
}

/// A single change recorded in a stub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StubOperation {
    /// Create an entity table with its indexes.
    CreateTable {
        /// Table name.
        table: String,
        /// Primary key first, then the remaining fields in declaration order.
        columns: Vec<ColumnDef>,
        /// Model-level indexes.
        indexes: Vec<IndexDef>,
    },

    /// Add a column missing from the live table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: ColumnDef,
    },

    /// Change a column whose canonical type drifted.
    AlterColumnType {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Canonical live type (restored on rollback).
        from: String,
        /// Canonical expected type.
        to: String,
    },

    /// Drop a column that only exists in the database.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Create a many-to-many join table.
    CreateJoinTable {
        /// Join table name.
        table: String,
        /// The lexicographically smaller entity.
        left: JoinSide,
        /// The other entity.
        right: JoinSide,
    },
}

impl StubOperation {
    /// Builds the `CREATE TABLE` operation for an entity.
    #[must_use]
    pub fn create_table(entity: &Entity) -> Self {
        let primary = entity.fields.iter().filter(|f| f.primary_key);
        let rest = entity.fields.iter().filter(|f| !f.primary_key);
        let columns = primary.chain(rest).map(ColumnDef::from_field).collect();

        let indexes = entity
            .indexes
            .iter()
            .enumerate()
            .map(|(position, index)| IndexDef {
                name: entity.index_name(position),
                columns: index.fields.iter().map(|f| f.to_lowercase()).collect(),
            })
            .collect();

        Self::CreateTable {
            table: entity.table_name(),
            columns,
            indexes,
        }
    }

    /// Returns the table this operation touches.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { table, .. }
            | Self::AddColumn { table, .. }
            | Self::AlterColumnType { table, .. }
            | Self::DropColumn { table, .. }
            | Self::CreateJoinTable { table, .. } => table,
        }
    }

    /// Returns true if rolling back cannot restore the data.
    #[must_use]
    pub const fn is_destructive(&self) -> bool {
        matches!(self, Self::DropColumn { .. })
    }

    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { table, .. } => format!("Create table '{table}'"),
            Self::AddColumn { table, column } => {
                format!("Add column '{}' to table '{table}'", column.name)
            }
            Self::AlterColumnType {
                table,
                column,
                from,
                to,
            } => format!("Change column '{column}' in table '{table}' from {from} to {to}"),
            Self::DropColumn { table, column } => {
                format!("Drop column '{column}' from table '{table}'")
            }
            Self::CreateJoinTable { table, .. } => format!("Create join table '{table}'"),
        }
    }
}
