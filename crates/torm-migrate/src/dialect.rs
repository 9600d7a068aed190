//! PostgreSQL rendering of stub operations.

use crate::operations::{ColumnDef, IndexDef, JoinSide, KeyStyle, StubOperation};

/// Renders [`StubOperation`]s as PostgreSQL DDL.
///
/// Identifiers are emitted bare: table and column names are the lower-cased
/// schema names.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates the dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generates the forward SQL for an operation.
    #[must_use]
    pub fn up_sql(&self, operation: &StubOperation) -> String {
        match operation {
            StubOperation::CreateTable {
                table,
                columns,
                indexes,
            } => {
                let mut statements = vec![self.create_table_sql(table, columns)];
                statements.extend(indexes.iter().map(|i| self.create_index_sql(table, i)));
                statements.join("\n\n")
            }
            StubOperation::AddColumn { table, column } => self.add_column_sql(table, column),
            StubOperation::AlterColumnType {
                table, column, to, ..
            } => self.alter_column_type_sql(table, column, to),
            StubOperation::DropColumn { table, column } => self.drop_column_sql(table, column),
            StubOperation::CreateJoinTable { table, left, right } => {
                self.create_join_table_sql(table, left, right)
            }
        }
    }

    /// Generates the reverse SQL for an operation.
    ///
    /// A dropped column cannot be rebuilt from the live catalog, so its
    /// reverse is a non-executable comment.
    #[must_use]
    pub fn down_sql(&self, operation: &StubOperation) -> String {
        match operation {
            StubOperation::CreateTable { table, indexes, .. } => {
                let mut statements: Vec<String> = indexes
                    .iter()
                    .map(|i| format!("DROP INDEX IF EXISTS {};", i.name))
                    .collect();
                statements.push(self.drop_table_sql(table));
                statements.join("\n")
            }
            StubOperation::AddColumn { table, column } => {
                self.drop_column_sql(table, &column.name)
            }
            StubOperation::AlterColumnType {
                table,
                column,
                from,
                ..
            } => self.alter_column_type_sql(table, column, from),
            StubOperation::DropColumn { column, .. } => {
                format!("-- note: column {column} dropped; manual re-add may be required")
            }
            StubOperation::CreateJoinTable { table, .. } => self.drop_table_sql(table),
        }
    }

    /// Column definition used inside `CREATE TABLE`.
    fn column_definition(&self, column: &ColumnDef) -> String {
        match column.key {
            Some(KeyStyle::Uuid) => {
                format!("{} UUID PRIMARY KEY DEFAULT uuid_generate_v4()", column.name)
            }
            Some(KeyStyle::Serial) => format!("{} SERIAL PRIMARY KEY", column.name),
            Some(KeyStyle::Typed) => format!("{} {} PRIMARY KEY", column.name, column.sql_type),
            None => {
                let mut definition = format!("{} {}", column.name, column.sql_type);
                if let Some(default) = &column.default {
                    definition.push_str(" DEFAULT ");
                    definition.push_str(default);
                }
                definition
            }
        }
    }

    fn create_table_sql(&self, table: &str, columns: &[ColumnDef]) -> String {
        let definitions: Vec<String> = columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();
        format!("CREATE TABLE {table} ({});", definitions.join(", "))
    }

    fn create_index_sql(&self, table: &str, index: &IndexDef) -> String {
        format!(
            "CREATE INDEX {} ON {table} ({});",
            index.name,
            index.columns.join(", ")
        )
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE {table};")
    }

    /// `NOT NULL` is emitted iff the column has no default.
    fn add_column_sql(&self, table: &str, column: &ColumnDef) -> String {
        let mut sql = format!(
            "ALTER TABLE {table} ADD COLUMN {} {}",
            column.name, column.sql_type
        );
        match &column.default {
            Some(default) => {
                sql.push_str(" DEFAULT ");
                sql.push_str(default);
            }
            None => sql.push_str(" NOT NULL"),
        }
        sql.push(';');
        sql
    }

    fn alter_column_type_sql(&self, table: &str, column: &str, sql_type: &str) -> String {
        format!("ALTER TABLE {table} ALTER COLUMN {column} TYPE {sql_type};")
    }

    fn drop_column_sql(&self, table: &str, column: &str) -> String {
        format!("ALTER TABLE {table} DROP COLUMN {column};")
    }

    fn create_join_table_sql(&self, table: &str, left: &JoinSide, right: &JoinSide) -> String {
        let (a, b) = (left.column(), right.column());
        [
            format!(
                "CREATE TABLE {table} (\n    {a} {} NOT NULL,\n    {b} {} NOT NULL,\n    PRIMARY KEY ({a}, {b})\n);",
                left.key_type, right.key_type
            ),
            format!(
                "ALTER TABLE {table} ADD FOREIGN KEY ({a}) REFERENCES {}({});",
                left.table, left.key_column
            ),
            format!(
                "ALTER TABLE {table} ADD FOREIGN KEY ({b}) REFERENCES {}({});",
                right.table, right.key_column
            ),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect() -> PostgresDialect {
        PostgresDialect::new()
    }

    fn column(name: &str, sql_type: &str) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            default: None,
            key: None,
        }
    }

    #[test]
    fn test_create_table_uuid_key() {
        let op = StubOperation::CreateTable {
            table: "author".into(),
            columns: vec![
                ColumnDef {
                    key: Some(KeyStyle::Uuid),
                    ..column("id", "UUID")
                },
                column("name", "TEXT"),
            ],
            indexes: vec![],
        };
        assert_eq!(
            dialect().up_sql(&op),
            "CREATE TABLE author (id UUID PRIMARY KEY DEFAULT uuid_generate_v4(), name TEXT);"
        );
        assert_eq!(dialect().down_sql(&op), "DROP TABLE author;");
    }

    #[test]
    fn test_create_table_with_indexes_and_defaults() {
        let op = StubOperation::CreateTable {
            table: "post".into(),
            columns: vec![
                ColumnDef {
                    key: Some(KeyStyle::Serial),
                    ..column("id", "INTEGER")
                },
                ColumnDef {
                    default: Some("false".into()),
                    ..column("published", "BOOLEAN")
                },
            ],
            indexes: vec![
                IndexDef {
                    name: "idx_post_1".into(),
                    columns: vec!["published".into()],
                },
                IndexDef {
                    name: "idx_post_2".into(),
                    columns: vec!["id".into(), "published".into()],
                },
            ],
        };
        assert_eq!(
            dialect().up_sql(&op),
            "CREATE TABLE post (id SERIAL PRIMARY KEY, published BOOLEAN DEFAULT false);\n\n\
             CREATE INDEX idx_post_1 ON post (published);\n\n\
             CREATE INDEX idx_post_2 ON post (id, published);"
        );
        assert_eq!(
            dialect().down_sql(&op),
            "DROP INDEX IF EXISTS idx_post_1;\nDROP INDEX IF EXISTS idx_post_2;\nDROP TABLE post;"
        );
    }

    #[test]
    fn test_typed_key() {
        let op = StubOperation::CreateTable {
            table: "country".into(),
            columns: vec![ColumnDef {
                key: Some(KeyStyle::Typed),
                ..column("code", "TEXT")
            }],
            indexes: vec![],
        };
        assert_eq!(
            dialect().up_sql(&op),
            "CREATE TABLE country (code TEXT PRIMARY KEY);"
        );
    }

    #[test]
    fn test_add_column() {
        let required = StubOperation::AddColumn {
            table: "book".into(),
            column: column("pages", "INTEGER"),
        };
        assert_eq!(
            dialect().up_sql(&required),
            "ALTER TABLE book ADD COLUMN pages INTEGER NOT NULL;"
        );
        assert_eq!(
            dialect().down_sql(&required),
            "ALTER TABLE book DROP COLUMN pages;"
        );

        let defaulted = StubOperation::AddColumn {
            table: "book".into(),
            column: ColumnDef {
                default: Some("0".into()),
                ..column("pages", "INTEGER")
            },
        };
        assert_eq!(
            dialect().up_sql(&defaulted),
            "ALTER TABLE book ADD COLUMN pages INTEGER DEFAULT 0;"
        );
    }

    #[test]
    fn test_alter_column_type() {
        let op = StubOperation::AlterColumnType {
            table: "book".into(),
            column: "pages".into(),
            from: "TEXT".into(),
            to: "INTEGER".into(),
        };
        assert_eq!(
            dialect().up_sql(&op),
            "ALTER TABLE book ALTER COLUMN pages TYPE INTEGER;"
        );
        assert_eq!(
            dialect().down_sql(&op),
            "ALTER TABLE book ALTER COLUMN pages TYPE TEXT;"
        );
    }

    #[test]
    fn test_drop_column_down_is_comment() {
        let op = StubOperation::DropColumn {
            table: "book".into(),
            column: "isbn".into(),
        };
        assert_eq!(dialect().up_sql(&op), "ALTER TABLE book DROP COLUMN isbn;");
        assert!(dialect().down_sql(&op).starts_with("-- note: column isbn dropped"));
    }

    #[test]
    fn test_create_join_table() {
        let side = |table: &str, key_type: &str| JoinSide {
            table: table.to_string(),
            key_type: key_type.to_string(),
            key_column: "id".to_string(),
        };
        let op = StubOperation::CreateJoinTable {
            table: "post_tag".into(),
            left: side("post", "INTEGER"),
            right: side("tag", "UUID"),
        };
        assert_eq!(
            dialect().up_sql(&op),
            "CREATE TABLE post_tag (\n    post_id INTEGER NOT NULL,\n    tag_id UUID NOT NULL,\n    PRIMARY KEY (post_id, tag_id)\n);\n\
             ALTER TABLE post_tag ADD FOREIGN KEY (post_id) REFERENCES post(id);\n\
             ALTER TABLE post_tag ADD FOREIGN KEY (tag_id) REFERENCES tag(id);"
        );
        assert_eq!(dialect().down_sql(&op), "DROP TABLE post_tag;");
    }
}
