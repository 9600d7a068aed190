#![allow(dead_code)]

use std::fs;
use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use torm_core::{parse_schema, Ast};
use torm_migrate::prelude::*;

pub const AUTHOR_BOOK: &str = "model Author {\n  id String @id @db.Uuid\n  name String\n}\n\n\
                               model Book {\n  id String @id @db.Uuid\n  title String\n}\n";

pub const POST_TAG: &str = "model Post {\n  id Int @id @default(autoincrement())\n  title String\n  tags Tag[]\n}\n\n\
                            model Tag {\n  id Int @id @default(autoincrement())\n  label String\n  posts Post[]\n}\n";

pub async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

pub fn parse(schema: &str) -> Ast {
    parse_schema(schema).unwrap_or_else(|e| panic!("Failed to parse: {schema}\nError: {e}"))
}

/// A temporary migrations directory.
pub struct Workspace {
    pub tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn dir(&self) -> &Path {
        self.tmp.path()
    }

    pub fn store(&self) -> MigrationStore {
        MigrationStore::new(self.dir())
    }

    pub fn write(&self, version: i64, name: &str, up: &str, down: &str) {
        self.store()
            .write_pair(version, name, up, down)
            .expect("Failed to write migration pair");
    }

    pub fn read(&self, file_name: &str) -> String {
        fs::read_to_string(self.dir().join(file_name))
            .unwrap_or_else(|e| panic!("Failed to read {file_name}: {e}"))
    }

    /// Sorted file names in the directory.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.dir())
            .expect("Failed to list temp dir")
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub async fn applied_versions(pool: &SqlitePool) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>("SELECT version FROM schema_migrations ORDER BY version")
        .fetch_all(pool)
        .await
        .expect("Failed to read schema_migrations")
}

pub async fn table_exists(pool: &SqlitePool, table: &str) -> bool {
    !pool
        .table_columns(table)
        .await
        .expect("Failed to introspect")
        .is_empty()
}
