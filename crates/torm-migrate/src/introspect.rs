//! Live database introspection.

use std::collections::BTreeMap;

use torm_core::Ast;
use tracing::debug;

use crate::driver::Driver;
use crate::error::{MigrateError, Result};

/// Columns of one live table: column name to upper-cased SQL type.
///
/// An empty map means the table does not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableColumns {
    /// Column name to upper-cased type name.
    pub types: BTreeMap<String, String>,
}

impl TableColumns {
    /// Builds a table from `(name, type)` pairs.
    pub fn from_pairs<I, N, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: AsRef<str>,
    {
        Self {
            types: pairs
                .into_iter()
                .map(|(name, ty)| (name.into(), ty.as_ref().to_uppercase()))
                .collect(),
        }
    }

    /// Returns true if the table exists in the database.
    #[must_use]
    pub fn exists(&self) -> bool {
        !self.types.is_empty()
    }

    /// Returns true if the table has a column named `column`.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.types.contains_key(column)
    }

    /// Returns the upper-cased type of `column`.
    #[must_use]
    pub fn type_of(&self, column: &str) -> Option<&str> {
        self.types.get(column).map(String::as_str)
    }

    /// Iterates column names in name order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

/// Per-table live state keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSnapshot {
    tables: BTreeMap<String, TableColumns>,
}

impl SchemaSnapshot {
    /// Creates an empty snapshot (every table missing).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>, columns: TableColumns) -> Self {
        self.tables.insert(table.into(), columns);
        self
    }

    /// Returns the live columns of `table`; missing tables yield `None`.
    #[must_use]
    pub fn table(&self, table: &str) -> Option<&TableColumns> {
        self.tables.get(table)
    }

    /// Returns true if `table` exists with at least one column.
    #[must_use]
    pub fn table_exists(&self, table: &str) -> bool {
        self.table(table).is_some_and(TableColumns::exists)
    }
}

/// Runs one catalog lookup per entity and collects the results.
///
/// # Errors
///
/// The first failing lookup aborts the whole introspection with
/// [`MigrateError::Introspection`]; no partial snapshot is returned.
pub async fn introspect<D: Driver>(driver: &D, ast: &Ast) -> Result<SchemaSnapshot> {
    let mut snapshot = SchemaSnapshot::new();
    for entity in &ast.entities {
        let table = entity.table_name();
        let pairs = driver
            .table_columns(&table)
            .await
            .map_err(|source| MigrateError::Introspection {
                table: table.clone(),
                source,
            })?;
        debug!(table = %table, columns = pairs.len(), "Introspected table");
        snapshot.tables.insert(table, TableColumns::from_pairs(pairs));
    }
    Ok(snapshot)
}
