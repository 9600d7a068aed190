//! Error types for the migration engine.

use std::path::PathBuf;

use crate::store::Direction;

/// Errors that can occur while synchronizing or migrating a database.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Invalid configuration (unresolvable DSN, bad flags).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The schema file does not exist.
    #[error("Schema file not found: {0}")]
    SchemaNotFound(PathBuf),

    /// The schema could not be parsed.
    #[error("Schema error: {0}")]
    Parse(#[from] torm_core::ParseError),

    /// A catalog query failed.
    #[error("Failed to introspect table '{table}': {source}")]
    Introspection {
        /// Table being introspected.
        table: String,
        /// Underlying driver error.
        source: sqlx::Error,
    },

    /// A stub file could not be written.
    #[error("Failed to write migration file '{path}': {source}")]
    StubWrite {
        /// Path of the file being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A migration script failed.
    #[error("Failed to apply {direction} migration {version:04}_{name}: {source}")]
    Apply {
        /// Version of the failing migration.
        version: i64,
        /// Name of the failing migration.
        name: String,
        /// Which script was running.
        direction: Direction,
        /// Underlying driver error.
        source: sqlx::Error,
    },

    /// A script succeeded but its version row could not be written.
    #[error("Failed to record version {version}: {source}")]
    Record {
        /// Version being recorded or removed.
        version: i64,
        /// Underlying driver error.
        source: sqlx::Error,
    },

    /// An applied version has no migration file.
    #[error("Migration not found for version {version}")]
    MigrationNotFound {
        /// The applied version.
        version: i64,
    },

    /// Only one half of a migration pair exists.
    #[error("Migration {version:04}_{name} has no {missing} script")]
    IncompleteMigration {
        /// Version of the partial pair.
        version: i64,
        /// Name of the partial pair.
        name: String,
        /// The direction with no file.
        missing: Direction,
    },

    /// Two files claim the same version and direction.
    #[error("Duplicate {direction} script for version {version}: {path}")]
    DuplicateMigration {
        /// The contested version.
        version: i64,
        /// The contested direction.
        direction: Direction,
        /// The second file found.
        path: PathBuf,
    },

    /// Database error outside a migration script (bookkeeping, connection).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
