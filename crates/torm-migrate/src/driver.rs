//! Database driver seam.
//!
//! The engine never reaches for process-wide connection state: every
//! component receives a [`Driver`] handle. [`sqlx::PgPool`] is the production
//! driver; [`sqlx::SqlitePool`] serves scratch databases and the test suite.

use std::future::Future;

use sqlx::{PgPool, SqlitePool};

/// Catalog lookup for one table in the public schema.
const PG_TABLE_COLUMNS_SQL: &str = "SELECT column_name::text, udt_name::text \
     FROM information_schema.columns \
     WHERE table_schema = 'public' AND table_name = $1 \
     ORDER BY ordinal_position";

const SQLITE_TABLE_COLUMNS_SQL: &str = "SELECT name, type FROM pragma_table_info(?1) ORDER BY cid";

/// Raw statement execution against one database.
pub trait Driver: Send + Sync {
    /// Executes a script that may contain several statements.
    fn execute(&self, sql: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Runs a query returning one nullable integer.
    fn fetch_version(&self, sql: &str)
        -> impl Future<Output = Result<Option<i64>, sqlx::Error>> + Send;

    /// Lists `(column name, column type)` for `table`, empty if the table
    /// does not exist.
    fn table_columns(
        &self,
        table: &str,
    ) -> impl Future<Output = Result<Vec<(String, String)>, sqlx::Error>> + Send;
}

impl Driver for PgPool {
    async fn execute(&self, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(sql).execute(self).await?;
        Ok(())
    }

    async fn fetch_version(&self, sql: &str) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<i64>>(sql)
            .fetch_one(self)
            .await
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<(String, String)>, sqlx::Error> {
        sqlx::query_as::<_, (String, String)>(PG_TABLE_COLUMNS_SQL)
            .bind(table)
            .fetch_all(self)
            .await
    }
}

impl Driver for SqlitePool {
    async fn execute(&self, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(sql).execute(self).await?;
        Ok(())
    }

    async fn fetch_version(&self, sql: &str) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<i64>>(sql)
            .fetch_one(self)
            .await
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<(String, String)>, sqlx::Error> {
        sqlx::query_as::<_, (String, String)>(SQLITE_TABLE_COLUMNS_SQL)
            .bind(table)
            .fetch_all(self)
            .await
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("Failed to create in-memory SQLite pool")
    }

    #[tokio::test]
    async fn test_execute_multiple_statements() {
        let pool = create_test_pool().await;
        pool.execute("CREATE TABLE a (id INTEGER);\nINSERT INTO a (id) VALUES (7);")
            .await
            .unwrap();

        let max = pool
            .fetch_version("SELECT CAST(MAX(id) AS BIGINT) FROM a")
            .await
            .unwrap();
        assert_eq!(max, Some(7));
    }

    #[tokio::test]
    async fn test_fetch_version_null() {
        let pool = create_test_pool().await;
        pool.execute("CREATE TABLE a (id INTEGER)").await.unwrap();
        let max = pool
            .fetch_version("SELECT CAST(MAX(id) AS BIGINT) FROM a")
            .await
            .unwrap();
        assert_eq!(max, None);
    }

    #[tokio::test]
    async fn test_table_columns() {
        let pool = create_test_pool().await;
        pool.execute("CREATE TABLE book (id UUID PRIMARY KEY, title TEXT)")
            .await
            .unwrap();

        let columns = pool.table_columns("book").await.unwrap();
        assert_eq!(
            columns,
            vec![
                ("id".to_string(), "UUID".to_string()),
                ("title".to_string(), "TEXT".to_string()),
            ]
        );
        assert!(pool.table_columns("missing").await.unwrap().is_empty());
    }
}
