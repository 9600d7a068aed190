//! Applying and rolling back migrations.
//!
//! The manager owns a [`Driver`] handle and the loaded [`MigrationStore`]
//! contents. Each script runs as one driver call and its version row is
//! written by a second call; the two are not atomic. A failure between them
//! surfaces as [`MigrateError::Record`] and leaves the database half-applied.

use std::fmt;

use serde::Serialize;
use torm_core::Ast;
use tracing::{debug, info, warn};

use crate::driver::Driver;
use crate::error::{MigrateError, Result};
use crate::history::MigrationHistory;
use crate::store::{Direction, Migration, MigrationStore};
use crate::stubs::ensure_stubs;

/// Whether a migration is at or below the current version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    /// Version ≤ current version.
    Applied,
    /// Version > current version.
    Pending,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Pending => f.write_str("pending"),
        }
    }
}

/// One line of a status report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Migration version.
    pub version: i64,
    /// Migration name.
    pub name: String,
    /// Applied or pending.
    pub state: MigrationState,
}

/// The result of [`MigrationManager::status`].
///
/// `Display` renders `Current version: V` followed by one
/// `<version>_<name>: applied|pending` line per known migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Highest applied version, 0 when none.
    pub current_version: i64,
    /// Every known migration, by version.
    pub migrations: Vec<MigrationStatus>,
}

impl StatusReport {
    /// Builds a report for `migrations` at `current_version`.
    #[must_use]
    pub fn new(current_version: i64, migrations: &[Migration]) -> Self {
        let migrations = migrations
            .iter()
            .map(|m| MigrationStatus {
                version: m.version,
                name: m.name.clone(),
                state: if m.version <= current_version {
                    MigrationState::Applied
                } else {
                    MigrationState::Pending
                },
            })
            .collect();
        Self {
            current_version,
            migrations,
        }
    }

    /// Returns the versions still pending.
    #[must_use]
    pub fn pending(&self) -> Vec<i64> {
        self.migrations
            .iter()
            .filter(|m| m.state == MigrationState::Pending)
            .map(|m| m.version)
            .collect()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Current version: {}", self.current_version)?;
        for m in &self.migrations {
            write!(f, "\n{}_{}: {}", m.version, m.name, m.state)?;
        }
        Ok(())
    }
}

/// Applies migrations from a store against one database.
pub struct MigrationManager<D: Driver> {
    driver: D,
    store: MigrationStore,
    migrations: Vec<Migration>,
}

impl<D: Driver> MigrationManager<D> {
    /// Creates a manager and loads the store.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be loaded.
    pub fn new(driver: D, store: MigrationStore) -> Result<Self> {
        let migrations = store.load()?;
        Ok(Self {
            driver,
            store,
            migrations,
        })
    }

    /// Returns the driver handle.
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns the store.
    pub const fn store(&self) -> &MigrationStore {
        &self.store
    }

    /// Returns the loaded migrations, sorted by version.
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Re-reads the store from disk.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be loaded; the previous list is kept.
    pub fn reload(&mut self) -> Result<()> {
        self.migrations = self.store.load()?;
        Ok(())
    }

    fn history(&self) -> MigrationHistory<'_, D> {
        MigrationHistory::new(&self.driver)
    }

    /// Creates `schema_migrations` if it does not exist.
    pub async fn ensure_version_table(&self) -> Result<()> {
        self.history().ensure_table().await
    }

    /// Returns the highest applied version, 0 when none.
    pub async fn current_version(&self) -> Result<i64> {
        self.history().current_version().await
    }

    async fn run(&self, migration: &Migration, direction: Direction) -> Result<()> {
        let sql = migration.script(direction);
        debug!(sql = %sql, "Executing SQL");
        self.driver
            .execute(sql)
            .await
            .map_err(|source| MigrateError::Apply {
                version: migration.version,
                name: migration.name.clone(),
                direction,
                source,
            })
    }

    /// Applies every migration above the current version, in order.
    /// Returns the versions applied.
    ///
    /// # Errors
    ///
    /// Stops at the first failing script or version insert; migrations
    /// applied before the failure stay applied.
    pub async fn up(&self) -> Result<Vec<i64>> {
        self.ensure_version_table().await?;
        let current = self.current_version().await?;

        let mut applied = Vec::new();
        for migration in self.migrations.iter().filter(|m| m.version > current) {
            info!(version = migration.version, name = %migration.name, "Applying migration");
            self.run(migration, Direction::Up).await?;
            self.history().record_applied(migration.version).await?;
            applied.push(migration.version);
        }

        if applied.is_empty() {
            info!(version = current, "No pending migrations");
        }
        Ok(applied)
    }

    /// Rolls back the newest applied migration. Returns its version, or
    /// `None` when nothing is applied.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::MigrationNotFound`] when the current version
    /// has no file, and propagates script and bookkeeping failures.
    pub async fn down(&self) -> Result<Option<i64>> {
        self.ensure_version_table().await?;
        let current = self.current_version().await?;
        if current == 0 {
            info!("No migrations to roll back.");
            return Ok(None);
        }

        let Some(migration) = self.migrations.iter().rev().find(|m| m.version == current) else {
            warn!(version = current, "Applied version has no migration file");
            return Err(MigrateError::MigrationNotFound { version: current });
        };

        info!(version = migration.version, name = %migration.name, "Rolling back migration");
        self.run(migration, Direction::Down).await?;
        self.history().record_unapplied(migration.version).await?;
        Ok(Some(migration.version))
    }

    /// Rolls back every applied migration newest first, then applies all.
    /// Returns the versions applied by the final pass.
    ///
    /// # Errors
    ///
    /// Stops at the first failure in either pass.
    pub async fn reset(&self) -> Result<Vec<i64>> {
        self.ensure_version_table().await?;
        let current = self.current_version().await?;

        for migration in self.migrations.iter().rev().filter(|m| m.version <= current) {
            info!(version = migration.version, name = %migration.name, "Reverting migration");
            self.run(migration, Direction::Down).await?;
            self.history().record_unapplied(migration.version).await?;
        }

        self.up().await
    }

    /// Reports the current version and the state of every known migration.
    ///
    /// # Errors
    ///
    /// Propagates bookkeeping failures.
    pub async fn status(&self) -> Result<StatusReport> {
        self.ensure_version_table().await?;
        let current = self.current_version().await?;
        Ok(StatusReport::new(current, &self.migrations))
    }

    /// Applies migration files that are already pending, generates stubs for
    /// the remaining schema changes and applies those too.
    ///
    /// Pending files go first so the diff sees the columns they add. A pending
    /// `ALTER` stub that was rolled back is re-applied instead of being
    /// stubbed a second time.
    ///
    /// # Errors
    ///
    /// Stops at the first failing migration. No stubs are generated if a
    /// pending migration fails, and nothing new is applied if stub
    /// generation fails.
    pub async fn dev(&mut self, ast: &Ast) -> Result<Vec<i64>> {
        self.reload()?;
        let mut applied = self.up().await?;

        let plans = ensure_stubs(&self.driver, ast, &self.store).await?;
        if !plans.is_empty() {
            info!(count = plans.len(), "Generated migration stubs");
            self.reload()?;
            applied.extend(self.up().await?);
        }
        Ok(applied)
    }

    /// Applies committed migrations only.
    ///
    /// # Errors
    ///
    /// Same as [`MigrationManager::up`].
    pub async fn deploy(&self) -> Result<Vec<i64>> {
        self.up().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migration(version: i64, name: &str) -> Migration {
        Migration {
            version,
            name: name.to_string(),
            up: String::new(),
            down: String::new(),
        }
    }

    #[test]
    fn test_status_display() {
        let report = StatusReport::new(1, &[migration(1, "Author"), migration(2, "Book")]);
        assert_eq!(
            report.to_string(),
            "Current version: 1\n1_Author: applied\n2_Book: pending"
        );
        assert_eq!(report.pending(), vec![2]);
    }

    #[test]
    fn test_status_empty() {
        let report = StatusReport::new(0, &[]);
        assert_eq!(report.to_string(), "Current version: 0");
    }

    #[test]
    fn test_status_json() {
        let report = StatusReport::new(1, &[migration(1, "Author")]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "current_version": 1,
                "migrations": [{"version": 1, "name": "Author", "state": "applied"}]
            })
        );
    }
}
