//! Diffing the schema against the live database and synthesizing stubs.
//!
//! Planning is pure: given the same [`Ast`], [`SchemaSnapshot`] and
//! [`StubIndex`], [`plan_stubs`] returns byte-identical plans. Stubs are
//! ordered as follows, each group in declaration order:
//!
//! 1. `CREATE TABLE` for entities with no stub yet
//! 2. `ALTER TABLE` for stubbed entities whose live table drifted
//! 3. join tables for many-to-many pairs with no stub yet

use std::collections::BTreeSet;
use std::path::PathBuf;

use torm_core::{canonicalize, Ast, Entity};
use tracing::{info, warn};

use crate::dialect::PostgresDialect;
use crate::driver::Driver;
use crate::error::Result;
use crate::introspect::{introspect, SchemaSnapshot, TableColumns};
use crate::operations::{ColumnDef, JoinSide, StubOperation};
use crate::store::{file_stem, MigrationStore, StubIndex};

/// One migration pair waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubPlan {
    /// Assigned version.
    pub version: i64,
    /// Entity name, or join table name.
    pub name: String,
    /// Changes in forward order.
    pub operations: Vec<StubOperation>,
}

impl StubPlan {
    /// The filename stem, e.g. `0002_Book`.
    #[must_use]
    pub fn stem(&self) -> String {
        file_stem(self.version, &self.name)
    }

    /// Forward script: each operation's SQL, one per line.
    #[must_use]
    pub fn up_sql(&self) -> String {
        let dialect = PostgresDialect::new();
        self.operations
            .iter()
            .map(|op| dialect.up_sql(op))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Reverse script: each operation's reverse, last operation first.
    #[must_use]
    pub fn down_sql(&self) -> String {
        let dialect = PostgresDialect::new();
        self.operations
            .iter()
            .rev()
            .map(|op| dialect.down_sql(op))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Computes the column diff for a stubbed entity against its live table.
///
/// Added columns come first, then type changes, then dropped columns in
/// column-name order.
fn diff_table(entity: &Entity, live: &TableColumns) -> Vec<StubOperation> {
    let table = entity.table_name();
    let mut operations = Vec::new();

    for field in &entity.fields {
        if !live.contains(&field.column_name()) {
            operations.push(StubOperation::AddColumn {
                table: table.clone(),
                column: ColumnDef::from_field(field),
            });
        }
    }

    for field in &entity.fields {
        let column = field.column_name();
        let Some(actual) = live.type_of(&column) else {
            continue;
        };
        let expected = canonicalize(field.sql_type());
        let actual = canonicalize(actual);
        if expected != actual {
            operations.push(StubOperation::AlterColumnType {
                table: table.clone(),
                column,
                from: actual,
                to: expected,
            });
        }
    }

    let declared: BTreeSet<String> = entity.fields.iter().map(|f| f.column_name()).collect();
    for column in live.columns() {
        if !declared.contains(column) {
            operations.push(StubOperation::DropColumn {
                table: table.clone(),
                column: column.to_string(),
            });
        }
    }

    operations
}

/// Plans every stub needed to bring the database in line with `ast`.
#[must_use]
pub fn plan_stubs(ast: &Ast, snapshot: &SchemaSnapshot, index: &StubIndex) -> Vec<StubPlan> {
    let mut version = index.max_version;
    let mut plans = Vec::new();
    let mut push = |name: &str, operations: Vec<StubOperation>| {
        version += 1;
        plans.push(StubPlan {
            version,
            name: name.to_string(),
            operations,
        });
    };

    for entity in &ast.entities {
        if !index.contains(&entity.name) {
            push(&entity.name, vec![StubOperation::create_table(entity)]);
        }
    }

    for entity in &ast.entities {
        if !index.contains(&entity.name) {
            continue;
        }
        let Some(live) = snapshot
            .table(&entity.table_name())
            .filter(|t| t.exists())
        else {
            continue;
        };
        let operations = diff_table(entity, live);
        if !operations.is_empty() {
            push(&entity.name, operations);
        }
    }

    let mut joined = BTreeSet::new();
    for (a, b, join) in ast.many_to_many_pairs() {
        if index.contains(join) || !joined.insert(join) {
            continue;
        }
        push(
            join,
            vec![StubOperation::CreateJoinTable {
                table: join.to_string(),
                left: JoinSide::for_entity(a),
                right: JoinSide::for_entity(b),
            }],
        );
    }

    plans
}

/// Writes each plan as a new migration pair. Returns the paths written.
///
/// # Errors
///
/// Stops at the first failed write; files already written stay on disk.
pub fn write_stubs(store: &MigrationStore, plans: &[StubPlan]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(plans.len() * 2);
    for plan in plans {
        for op in plan.operations.iter().filter(|op| op.is_destructive()) {
            warn!(migration = %plan.stem(), "{} (rollback cannot restore data)", op.description());
        }
        let (up, down) = store.write_pair(plan.version, &plan.name, &plan.up_sql(), &plan.down_sql())?;
        written.push(up);
        written.push(down);
    }
    Ok(written)
}

/// Introspects the database, plans stubs and writes them.
///
/// Nothing is written when introspection fails.
///
/// # Errors
///
/// Propagates introspection, directory scan and write errors.
pub async fn ensure_stubs<D: Driver>(
    driver: &D,
    ast: &Ast,
    store: &MigrationStore,
) -> Result<Vec<StubPlan>> {
    let snapshot = introspect(driver, ast).await?;
    let index = store.stub_index()?;
    let plans = plan_stubs(ast, &snapshot, &index);
    if plans.is_empty() {
        info!("Schema is in sync, no stubs generated");
    } else {
        write_stubs(store, &plans)?;
    }
    Ok(plans)
}
