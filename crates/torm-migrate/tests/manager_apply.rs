//! Applying, rolling back and resetting migrations.

mod common;
use common::*;
use sqlx::SqlitePool;
use tokio_test::{assert_err, assert_ok};
use torm_migrate::prelude::*;

fn two_tables(ws: &Workspace) {
    ws.write(1, "Author", "CREATE TABLE author (id INTEGER PRIMARY KEY, name TEXT);", "DROP TABLE author;");
    ws.write(2, "Book", "CREATE TABLE book (id INTEGER PRIMARY KEY, title TEXT);", "DROP TABLE book;");
}

fn manager(pool: &SqlitePool, ws: &Workspace) -> MigrationManager<SqlitePool> {
    MigrationManager::new(pool.clone(), ws.store()).unwrap()
}

// ===== Empty store =====

#[tokio::test]
async fn empty_store_boundaries() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    let manager = manager(&pool, &ws);

    let report = manager.status().await.unwrap();
    assert_eq!(report.to_string(), "Current version: 0");
    assert_eq!(assert_ok!(manager.down().await), None);
    assert!(manager.up().await.unwrap().is_empty());
}

// ===== Up / down / status =====

#[tokio::test]
async fn up_down_status() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    two_tables(&ws);
    let manager = manager(&pool, &ws);

    assert_eq!(manager.up().await.unwrap(), vec![1, 2]);
    assert_eq!(applied_versions(&pool).await, vec![1, 2]);
    assert_eq!(manager.current_version().await.unwrap(), 2);

    assert_eq!(manager.down().await.unwrap(), Some(2));
    assert_eq!(applied_versions(&pool).await, vec![1]);
    assert!(table_exists(&pool, "author").await);
    assert!(!table_exists(&pool, "book").await);

    let report = manager.status().await.unwrap();
    assert_eq!(report.current_version, 1);
    assert_eq!(report.pending(), vec![2]);
    assert_eq!(
        report.to_string(),
        "Current version: 1\n1_Author: applied\n2_Book: pending"
    );
}

#[tokio::test]
async fn up_is_monotonic_and_idempotent() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    two_tables(&ws);
    let mut manager = manager(&pool, &ws);

    manager.up().await.unwrap();
    assert!(manager.up().await.unwrap().is_empty());

    ws.write(3, "Tag", "CREATE TABLE tag (id INTEGER PRIMARY KEY);", "DROP TABLE tag;");
    manager.reload().unwrap();
    assert_eq!(manager.up().await.unwrap(), vec![3]);

    let max = manager.migrations().iter().map(|m| m.version).max();
    assert_eq!(Some(manager.current_version().await.unwrap()), max);
}

#[tokio::test]
async fn up_down_up_leaves_single_row() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    ws.write(1, "Author", "CREATE TABLE author (id INTEGER PRIMARY KEY);", "DROP TABLE author;");
    let manager = manager(&pool, &ws);

    manager.up().await.unwrap();
    manager.down().await.unwrap();
    manager.up().await.unwrap();

    assert_eq!(applied_versions(&pool).await, vec![1]);
    assert!(table_exists(&pool, "author").await);
}

// ===== Reset =====

#[tokio::test]
async fn reset_rolls_back_newest_first_then_reapplies() {
    let pool = create_test_pool().await;
    pool.execute("CREATE TABLE audit (id INTEGER PRIMARY KEY AUTOINCREMENT, step TEXT)")
        .await
        .unwrap();
    let ws = Workspace::new();
    for (version, name) in [(1, "One"), (2, "Two"), (3, "Three")] {
        ws.write(
            version,
            name,
            &format!("INSERT INTO audit (step) VALUES ('{version}.up');"),
            &format!("INSERT INTO audit (step) VALUES ('{version}.down');"),
        );
    }
    let manager = manager(&pool, &ws);
    manager.up().await.unwrap();
    pool.execute("DELETE FROM audit").await.unwrap();

    assert_eq!(manager.reset().await.unwrap(), vec![1, 2, 3]);

    let steps: Vec<String> = sqlx::query_scalar("SELECT step FROM audit ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(
        steps,
        vec!["3.down", "2.down", "1.down", "1.up", "2.up", "3.up"]
    );
    assert_eq!(manager.current_version().await.unwrap(), 3);
    assert_eq!(applied_versions(&pool).await, vec![1, 2, 3]);
}

// ===== Dev / deploy =====

#[tokio::test]
async fn dev_generates_applies_and_settles() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    let ast = parse("model Author {\n  id Int @id\n  name String\n}\n");
    let mut manager = manager(&pool, &ws);

    assert_eq!(manager.dev(&ast).await.unwrap(), vec![1]);
    assert!(table_exists(&pool, "author").await);

    let files_before = ws.files();
    assert!(manager.dev(&ast).await.unwrap().is_empty());
    assert_eq!(ws.files(), files_before);
}

#[tokio::test]
async fn dev_after_rollback_generates_nothing() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    let ast = parse("model Author {\n  id Int @id\n  name String\n}\n");
    let mut manager = manager(&pool, &ws);

    manager.dev(&ast).await.unwrap();
    manager.down().await.unwrap();
    let files_before = ws.files();

    assert_eq!(manager.dev(&ast).await.unwrap(), vec![1]);
    assert_eq!(ws.files(), files_before);
}

#[tokio::test]
async fn dev_after_alter_rollback_reapplies_existing_stub() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    let v1 = parse("model Book {\n  id Int @id\n  title String\n}\n");
    let v2 = parse("model Book {\n  id Int @id\n  title String\n  pages Int @default(0)\n}\n");
    let mut manager = manager(&pool, &ws);

    assert_eq!(manager.dev(&v1).await.unwrap(), vec![1]);
    assert_eq!(manager.dev(&v2).await.unwrap(), vec![2]);
    assert_eq!(
        ws.read("0002_Book.up.sql"),
        "ALTER TABLE book ADD COLUMN pages INTEGER DEFAULT 0;"
    );
    assert_eq!(manager.down().await.unwrap(), Some(2));
    let files_before = ws.files();

    assert_eq!(manager.dev(&v2).await.unwrap(), vec![2]);
    assert_eq!(ws.files(), files_before);
    assert_eq!(ws.files().len(), 4);
    assert_eq!(applied_versions(&pool).await, vec![1, 2]);
    let columns = pool.table_columns("book").await.unwrap();
    assert!(columns.iter().any(|(name, _)| name == "pages"));

    assert!(manager.dev(&v2).await.unwrap().is_empty());
    assert_eq!(ws.files(), files_before);
}

#[tokio::test]
async fn deploy_ignores_schema_changes() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    two_tables(&ws);
    let manager = manager(&pool, &ws);

    assert_eq!(manager.deploy().await.unwrap(), vec![1, 2]);
    assert_eq!(ws.files().len(), 4);
}

// ===== Failures =====

#[tokio::test]
async fn failing_script_stops_the_loop() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    ws.write(1, "Author", "CREATE TABLE author (id INTEGER PRIMARY KEY);", "DROP TABLE author;");
    ws.write(2, "Book", "CREATE TABLE book (id INTEGER PRIMARY KEY", "DROP TABLE book;");
    ws.write(3, "Tag", "CREATE TABLE tag (id INTEGER PRIMARY KEY);", "DROP TABLE tag;");
    let manager = manager(&pool, &ws);

    let err = assert_err!(manager.up().await);
    match &err {
        MigrateError::Apply {
            version,
            name,
            direction,
            ..
        } => {
            assert_eq!(*version, 2);
            assert_eq!(name, "Book");
            assert_eq!(*direction, Direction::Up);
        }
        other => panic!("expected Apply error, got {other:?}"),
    }
    assert!(err.to_string().contains("0002_Book"));
    assert_eq!(applied_versions(&pool).await, vec![1]);
    assert!(!table_exists(&pool, "tag").await);
}

#[tokio::test]
async fn failing_version_insert_is_record_error() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    ws.write(
        1,
        "SelfRecording",
        "INSERT INTO schema_migrations (version) VALUES (1);",
        "SELECT 1;",
    );
    let manager = manager(&pool, &ws);

    let err = manager.up().await.unwrap_err();
    assert!(matches!(err, MigrateError::Record { version: 1, .. }));
}

#[tokio::test]
async fn down_without_file_is_consistency_error() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    two_tables(&ws);
    let manager = manager(&pool, &ws);
    manager.up().await.unwrap();
    pool.execute("INSERT INTO schema_migrations (version) VALUES (7)")
        .await
        .unwrap();

    let err = manager.down().await.unwrap_err();
    assert!(matches!(err, MigrateError::MigrationNotFound { version: 7 }));
    assert_eq!(err.to_string(), "Migration not found for version 7");
    assert_eq!(applied_versions(&pool).await, vec![1, 2, 7]);
}

#[tokio::test]
async fn partial_pair_fails_to_load() {
    let pool = create_test_pool().await;
    let ws = Workspace::new();
    two_tables(&ws);
    std::fs::write(ws.dir().join("0003_Tag.up.sql"), "SELECT 1;").unwrap();

    let err = MigrationManager::new(pool, ws.store()).err().unwrap();
    assert!(matches!(err, MigrateError::IncompleteMigration { version: 3, .. }));
}
