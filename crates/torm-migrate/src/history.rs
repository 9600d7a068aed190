//! Applied-version bookkeeping in the `schema_migrations` table.

use tracing::debug;

use crate::driver::Driver;
use crate::error::{MigrateError, Result};

/// SQL to create the version table.
pub const CREATE_VERSION_TABLE_SQL: &str =
    "CREATE TABLE IF NOT EXISTS schema_migrations (version INTEGER PRIMARY KEY)";

/// SQL reading the highest applied version (NULL when none).
pub const CURRENT_VERSION_SQL: &str =
    "SELECT CAST(MAX(version) AS BIGINT) FROM schema_migrations";

/// Reads and writes the `schema_migrations` table.
///
/// The table's `MAX(version)` is the highest successfully applied migration.
pub struct MigrationHistory<'d, D> {
    driver: &'d D,
}

impl<'d, D: Driver> MigrationHistory<'d, D> {
    /// Creates a history over `driver`.
    pub const fn new(driver: &'d D) -> Self {
        Self { driver }
    }

    /// Creates the version table if it does not exist.
    pub async fn ensure_table(&self) -> Result<()> {
        self.driver.execute(CREATE_VERSION_TABLE_SQL).await?;
        Ok(())
    }

    /// Returns the highest applied version, 0 when nothing is applied.
    pub async fn current_version(&self) -> Result<i64> {
        let version = self.driver.fetch_version(CURRENT_VERSION_SQL).await?;
        Ok(version.unwrap_or(0))
    }

    /// Records `version` as applied.
    pub async fn record_applied(&self, version: i64) -> Result<()> {
        let sql = format!("INSERT INTO schema_migrations (version) VALUES ({version})");
        debug!(version, "Recording applied version");
        self.driver
            .execute(&sql)
            .await
            .map_err(|source| MigrateError::Record { version, source })
    }

    /// Removes `version` from the applied set.
    pub async fn record_unapplied(&self, version: i64) -> Result<()> {
        let sql = format!("DELETE FROM schema_migrations WHERE version = {version}");
        debug!(version, "Removing applied version");
        self.driver
            .execute(&sql)
            .await
            .map_err(|source| MigrateError::Record { version, source })
    }
}
