//! Schema-driven PostgreSQL migrations.
//!
//! `torm-migrate` keeps a live database in line with a torm schema through a
//! versioned, reversible history of SQL files:
//! - The schema is parsed by [`torm_core`]
//! - The live catalog is introspected through a [`driver::Driver`]
//! - The difference becomes new `up`/`down` stub pairs on disk
//! - The [`manager::MigrationManager`] applies and rolls them back in strict
//!   version order, recording progress in `schema_migrations`
//!
//! # Architecture
//!
//! - **Driver** - Raw statement execution and catalog lookups (`PgPool`, `SqlitePool`)
//! - **Introspect** - Per-table live column snapshot
//! - **Stubs** - Diff planning and stub writing
//! - **Operations** / **Dialect** - Typed schema changes and their PostgreSQL text
//! - **Store** - The `NNNN_<name>.{up,down}.sql` directory
//! - **History** - The `schema_migrations` table
//! - **Manager** - Up, down, reset, status
//!
//! # Example
//!
//! ```rust,ignore
//! use torm_migrate::prelude::*;
//!
//! let pool = sqlx::PgPool::connect(&url).await?;
//! let ast = Config::new().load_ast()?;
//!
//! let mut manager = MigrationManager::new(pool, MigrationStore::new("migrations"))?;
//! let applied = manager.dev(&ast).await?;
//! println!("{}", manager.status().await?);
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Generate stubs for schema changes, apply them, regenerate code
//! torm migrate dev
//!
//! # Apply committed migrations only
//! torm migrate deploy
//!
//! # Roll back the newest migration
//! torm migrate down
//!
//! # Show migration status
//! torm migrate status
//! ```

pub mod config;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod history;
pub mod introspect;
pub mod manager;
pub mod operations;
pub mod store;
pub mod stubs;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{find_datasource_url, Config, DatasourceUrl};
    pub use crate::dialect::PostgresDialect;
    pub use crate::driver::Driver;
    pub use crate::error::{MigrateError, Result};
    pub use crate::history::MigrationHistory;
    pub use crate::introspect::{introspect, SchemaSnapshot, TableColumns};
    pub use crate::manager::{MigrationManager, MigrationState, MigrationStatus, StatusReport};
    pub use crate::operations::{ColumnDef, IndexDef, JoinSide, KeyStyle, StubOperation};
    pub use crate::store::{Direction, Migration, MigrationStore, StubIndex};
    pub use crate::stubs::{ensure_stubs, plan_stubs, write_stubs, StubPlan};
}
