//! Client file emission: shared query helpers plus one service per entity.

use super::{column_list, owned_access, rust_ident, snake_case, HEADER};
use crate::ast::{Ast, Entity, Field, Relation};
use crate::types::FieldType;

/// Code shared by every service: errors, values, filters and binders.
const RUNTIME: &str = r##"
use std::collections::BTreeMap;

use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::{Query, QueryAs};
use sqlx::{Postgres, Row};

#[allow(unused_imports)]
use super::*;

/// Errors returned by generated services.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A lookup, update or delete matched no row.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A caller-supplied column is not part of the table.
    #[error("unknown column {column:?} on table {table}")]
    UnknownColumn { table: &'static str, column: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// A value compared against a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(uuid::Uuid),
    Timestamp(chrono::NaiveDateTime),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<chrono::NaiveDateTime> for Value {
    fn from(v: chrono::NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Equality conditions joined with AND. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `column = value` (`column IS NULL` for [`Value::Null`]).
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Aggregate functions. Results are keyed `<fn>_<column>` (`count_all` for
/// `(Count, "*")`) and returned as floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Aggregation {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    const fn function(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }

    const fn key(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// One group returned by `group_by`: the key columns as text, plus aggregates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupRow {
    pub keys: BTreeMap<String, Option<String>>,
    pub aggregates: BTreeMap<String, Option<f64>>,
}

fn check_column(table: &'static str, columns: &[&str], column: &str) -> ClientResult<()> {
    if columns.contains(&column) {
        Ok(())
    } else {
        Err(ClientError::UnknownColumn {
            table,
            column: column.to_string(),
        })
    }
}

/// Renders `filter` as a WHERE body whose placeholders start at `$first`.
fn where_clause(
    table: &'static str,
    columns: &[&str],
    filter: &Filter,
    first: usize,
) -> ClientResult<(String, Vec<Value>)> {
    if filter.conditions.is_empty() {
        return Ok((String::from("TRUE"), Vec::new()));
    }
    let mut parts = Vec::with_capacity(filter.conditions.len());
    let mut args = Vec::new();
    for (column, value) in &filter.conditions {
        check_column(table, columns, column)?;
        if *value == Value::Null {
            parts.push(format!("{column} IS NULL"));
        } else {
            parts.push(format!("{column} = ${}", first + args.len()));
            args.push(value.clone());
        }
    }
    Ok((parts.join(" AND "), args))
}

fn order_clause(table: &'static str, columns: &[&str], order_by: &[OrderBy]) -> ClientResult<String> {
    if order_by.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(order_by.len());
    for order in order_by {
        check_column(table, columns, &order.column)?;
        let direction = if order.descending { "DESC" } else { "ASC" };
        parts.push(format!("{} {direction}", order.column));
    }
    Ok(format!(" ORDER BY {}", parts.join(", ")))
}

fn page_clause(skip: Option<i64>, take: Option<i64>) -> String {
    let mut out = String::new();
    if let Some(take) = take {
        out.push_str(&format!(" LIMIT {take}"));
    }
    if let Some(skip) = skip {
        out.push_str(&format!(" OFFSET {skip}"));
    }
    out
}

/// Returns `(select expression, result key)` per aggregation.
fn aggregate_selects(
    table: &'static str,
    columns: &[&str],
    aggregations: &[(Aggregation, &str)],
) -> ClientResult<Vec<(String, String)>> {
    let mut selects = Vec::with_capacity(aggregations.len());
    for &(aggregation, column) in aggregations {
        let key = if aggregation == Aggregation::Count && column == "*" {
            String::from("count_all")
        } else {
            check_column(table, columns, column)?;
            format!("{}_{column}", aggregation.key())
        };
        let expr = format!(
            "CAST({}({column}) AS DOUBLE PRECISION) AS {key}",
            aggregation.function()
        );
        selects.push((expr, key));
    }
    Ok(selects)
}

fn read_aggregates(
    row: &PgRow,
    selects: &[(String, String)],
) -> ClientResult<BTreeMap<String, Option<f64>>> {
    let mut values = BTreeMap::new();
    for (_, key) in selects {
        values.insert(key.clone(), row.try_get::<Option<f64>, _>(key.as_str())?);
    }
    Ok(values)
}

fn bind(query: Query<'_, Postgres, PgArguments>, value: Value) -> Query<'_, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(v),
        Value::Int(v) => query.bind(v),
        Value::Float(v) => query.bind(v),
        Value::Text(v) => query.bind(v),
        Value::Uuid(v) => query.bind(v),
        Value::Timestamp(v) => query.bind(v),
    }
}

fn bind_as<O>(
    query: QueryAs<'_, Postgres, O, PgArguments>,
    value: Value,
) -> QueryAs<'_, Postgres, O, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(v),
        Value::Int(v) => query.bind(v),
        Value::Float(v) => query.bind(v),
        Value::Text(v) => query.bind(v),
        Value::Uuid(v) => query.bind(v),
        Value::Timestamp(v) => query.bind(v),
    }
}
"##;

/// Per-entity service; `__Placeholders__` are filled in by [`render_service`].
const SERVICE: &str = r##"
/// Queries over the `__table__` table.
#[derive(Debug, Clone, Copy)]
pub struct __Name__Service<'c> {
    pool: &'c PgPool,
}

impl<'c> __Name__Service<'c> {
    const TABLE: &'static str = "__table__";
    const COLUMNS: &'static [&'static str] = &[__columns__];
    const SELECT: &'static str = "__select__";
    const INSERT: &'static str = "__insert__";

    #[must_use]
    pub const fn new(pool: &'c PgPool) -> Self {
        Self { pool }
    }

    /// Returns the row matching `filter`, if any.
    pub async fn find_unique(&self, filter: &Filter) -> ClientResult<Option<__Name__>> {
        Ok(self.fetch(filter, &[], None, Some(1)).await?.pop())
    }

    /// Returns the row matching `filter` or [`ClientError::NotFound`].
    pub async fn find_unique_or_throw(&self, filter: &Filter) -> ClientResult<__Name__> {
        self.find_unique(filter)
            .await?
            .ok_or(ClientError::NotFound("__Name__"))
    }

    /// Returns the first row matching `filter` in `order_by` order.
    pub async fn find_first(
        &self,
        filter: &Filter,
        order_by: &[OrderBy],
    ) -> ClientResult<Option<__Name__>> {
        Ok(self.fetch(filter, order_by, None, Some(1)).await?.pop())
    }

    /// Returns the first row matching `filter` or [`ClientError::NotFound`].
    pub async fn find_first_or_throw(
        &self,
        filter: &Filter,
        order_by: &[OrderBy],
    ) -> ClientResult<__Name__> {
        self.find_first(filter, order_by)
            .await?
            .ok_or(ClientError::NotFound("__Name__"))
    }

    /// Returns the rows matching `filter`, ordered, skipping `skip` and
    /// keeping at most `take`.
    pub async fn find_many(
        &self,
        filter: &Filter,
        order_by: &[OrderBy],
        skip: Option<i64>,
        take: Option<i64>,
    ) -> ClientResult<Vec<__Name__>> {
        self.fetch(filter, order_by, skip, take).await
    }

    /// Inserts `record` and returns the stored row.
    pub async fn create(&self, record: &__Name__) -> ClientResult<__Name__> {
        Self::insert_with(self.pool, record).await
    }

    /// Writes the non-key fields of `record` to the row matching `filter`.
    pub async fn update(&self, filter: &Filter, record: &__Name__) -> ClientResult<__Name__> {
        Self::update_with(self.pool, filter, record)
            .await?
            .ok_or(ClientError::NotFound("__Name__"))
    }

    /// Updates the row matching `filter` with `update`, or inserts `create`
    /// when none matches. Both steps share one transaction.
    pub async fn upsert(
        &self,
        filter: &Filter,
        create: &__Name__,
        update: &__Name__,
    ) -> ClientResult<__Name__> {
        let (clause, args) = where_clause(Self::TABLE, Self::COLUMNS, filter, 1)?;
        let probe = format!("SELECT 1 FROM {} WHERE {clause} LIMIT 1 FOR UPDATE", Self::TABLE);
        let mut tx = self.pool.begin().await?;
        let mut query = sqlx::query(&probe);
        for arg in args {
            query = bind(query, arg);
        }
        let exists = query.fetch_optional(&mut *tx).await?.is_some();
        let record = if exists {
            Self::update_with(&mut *tx, filter, update)
                .await?
                .ok_or(ClientError::NotFound("__Name__"))?
        } else {
            Self::insert_with(&mut *tx, create).await?
        };
        tx.commit().await?;
        Ok(record)
    }

    /// Deletes the row matching `filter` and returns it.
    pub async fn delete(&self, filter: &Filter) -> ClientResult<__Name__> {
        let (clause, args) = where_clause(Self::TABLE, Self::COLUMNS, filter, 1)?;
        let sql = format!(
            "DELETE FROM {} WHERE {clause} RETURNING {}",
            Self::TABLE,
            Self::SELECT
        );
        let mut query = sqlx::query_as::<_, __Name__>(&sql);
        for arg in args {
            query = bind_as(query, arg);
        }
        query
            .fetch_optional(self.pool)
            .await?
            .ok_or(ClientError::NotFound("__Name__"))
    }

    /// Counts the rows matching `filter`.
    pub async fn count(&self, filter: &Filter) -> ClientResult<i64> {
        let (clause, args) = where_clause(Self::TABLE, Self::COLUMNS, filter, 1)?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {clause}", Self::TABLE);
        let mut query = sqlx::query(&sql);
        for arg in args {
            query = bind(query, arg);
        }
        let row = query.fetch_one(self.pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// Inserts every record and returns the number of rows written.
    pub async fn create_many(&self, records: &[__Name__]) -> ClientResult<u64> {
__create_many__
    }

    /// Writes the non-key fields of `record` to every row matching `filter`.
    pub async fn update_many(&self, filter: &Filter, record: &__Name__) -> ClientResult<u64> {
        let (clause, args) = where_clause(Self::TABLE, Self::COLUMNS, filter, __first_arg__)?;
        let sql = format!("UPDATE {} SET __set__ WHERE {clause}", Self::TABLE);
        let mut query = sqlx::query(&sql)__update_binds__;
        for arg in args {
            query = bind(query, arg);
        }
        Ok(query.execute(self.pool).await?.rows_affected())
    }

    /// Deletes every row matching `filter` and returns how many were removed.
    pub async fn delete_many(&self, filter: &Filter) -> ClientResult<u64> {
        let (clause, args) = where_clause(Self::TABLE, Self::COLUMNS, filter, 1)?;
        let sql = format!("DELETE FROM {} WHERE {clause}", Self::TABLE);
        let mut query = sqlx::query(&sql);
        for arg in args {
            query = bind(query, arg);
        }
        Ok(query.execute(self.pool).await?.rows_affected())
    }

    /// Computes `aggregations` over the rows matching `filter`.
    pub async fn aggregate(
        &self,
        filter: &Filter,
        aggregations: &[(Aggregation, &str)],
    ) -> ClientResult<BTreeMap<String, Option<f64>>> {
        let selects = aggregate_selects(Self::TABLE, Self::COLUMNS, aggregations)?;
        if selects.is_empty() {
            return Ok(BTreeMap::new());
        }
        let (clause, args) = where_clause(Self::TABLE, Self::COLUMNS, filter, 1)?;
        let list = selects
            .iter()
            .map(|(expr, _)| expr.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {list} FROM {} WHERE {clause}", Self::TABLE);
        let mut query = sqlx::query(&sql);
        for arg in args {
            query = bind(query, arg);
        }
        let row = query.fetch_one(self.pool).await?;
        read_aggregates(&row, &selects)
    }

    /// Groups the rows matching `filter` by the `by` columns and computes
    /// `aggregations` per group. Groups come back ordered by their keys.
    pub async fn group_by(
        &self,
        by: &[&str],
        filter: &Filter,
        aggregations: &[(Aggregation, &str)],
    ) -> ClientResult<Vec<GroupRow>> {
        for column in by {
            check_column(Self::TABLE, Self::COLUMNS, column)?;
        }
        let selects = aggregate_selects(Self::TABLE, Self::COLUMNS, aggregations)?;
        let mut list: Vec<String> = by
            .iter()
            .map(|column| format!("CAST({column} AS TEXT) AS {column}"))
            .collect();
        list.extend(selects.iter().map(|(expr, _)| expr.clone()));
        if list.is_empty() {
            return Ok(Vec::new());
        }
        let (clause, args) = where_clause(Self::TABLE, Self::COLUMNS, filter, 1)?;
        let mut sql = format!("SELECT {} FROM {} WHERE {clause}", list.join(", "), Self::TABLE);
        if !by.is_empty() {
            let keys = by.join(", ");
            sql.push_str(&format!(" GROUP BY {keys} ORDER BY {keys}"));
        }
        let mut query = sqlx::query(&sql);
        for arg in args {
            query = bind(query, arg);
        }
        let rows = query.fetch_all(self.pool).await?;
        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut keys = BTreeMap::new();
            for column in by {
                keys.insert((*column).to_string(), row.try_get::<Option<String>, _>(*column)?);
            }
            groups.push(GroupRow {
                keys,
                aggregates: read_aggregates(row, &selects)?,
            });
        }
        Ok(groups)
    }

    async fn fetch(
        &self,
        filter: &Filter,
        order_by: &[OrderBy],
        skip: Option<i64>,
        take: Option<i64>,
    ) -> ClientResult<Vec<__Name__>> {
        let (clause, args) = where_clause(Self::TABLE, Self::COLUMNS, filter, 1)?;
        let order = order_clause(Self::TABLE, Self::COLUMNS, order_by)?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {clause}{order}{}",
            Self::SELECT,
            Self::TABLE,
            page_clause(skip, take)
        );
        let mut query = sqlx::query_as::<_, __Name__>(&sql);
        for arg in args {
            query = bind_as(query, arg);
        }
        let mut records = query.fetch_all(self.pool).await?;
        for record in &mut records {
            self.load_relations(record).await?;
        }
        Ok(records)
    }

    async fn insert_with<'e, E>(executor: E, record: &__Name__) -> ClientResult<__Name__>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, __Name__>(Self::INSERT)__insert_binds__
            .fetch_one(executor)
            .await?;
        Ok(created)
    }

    async fn update_with<'e, E>(
        executor: E,
        filter: &Filter,
        record: &__Name__,
    ) -> ClientResult<Option<__Name__>>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let (clause, args) = where_clause(Self::TABLE, Self::COLUMNS, filter, __first_arg__)?;
        let sql = format!(
            "UPDATE {} SET __set__ WHERE {clause} RETURNING {}",
            Self::TABLE,
            Self::SELECT
        );
        let mut query = sqlx::query_as::<_, __Name__>(&sql)__update_binds__;
        for arg in args {
            query = bind_as(query, arg);
        }
        Ok(query.fetch_optional(executor).await?)
    }

    /// Loads list relations one level deep, one query per relation.
    async fn load_relations(&self, __record__: &mut __Name__) -> ClientResult<()> {
__relations__        Ok(())
    }
}
"##;

/// Renders `client.rs`.
pub(super) fn render_client(ast: &Ast) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    out.push_str(RUNTIME);

    for def in &ast.enums {
        out.push_str(&format!(
            "\nimpl From<{0}> for Value {{\n    fn from(v: {0}) -> Self {{\n        Self::Text(v.as_str().to_string())\n    }}\n}}\n",
            def.name
        ));
    }

    out.push_str(&render_client_struct(ast));
    for entity in &ast.entities {
        out.push_str(&render_service(ast, entity));
    }
    out
}

fn render_client_struct(ast: &Ast) -> String {
    let mut out = String::from(
        "\n/// Entry point of the generated client.\n\
         #[derive(Debug, Clone)]\n\
         pub struct Client {\n\
         \x20   pool: PgPool,\n\
         }\n\
         \n\
         impl Client {\n\
         \x20   /// Connects to the database at `url`.\n\
         \x20   pub async fn connect(url: &str) -> ClientResult<Self> {\n\
         \x20       let pool = PgPoolOptions::new().connect(url).await?;\n\
         \x20       Ok(Self { pool })\n\
         \x20   }\n\
         \n\
         \x20   #[must_use]\n\
         \x20   pub const fn from_pool(pool: PgPool) -> Self {\n\
         \x20       Self { pool }\n\
         \x20   }\n\
         \n\
         \x20   #[must_use]\n\
         \x20   pub const fn pool(&self) -> &PgPool {\n\
         \x20       &self.pool\n\
         \x20   }\n",
    );
    for entity in &ast.entities {
        out.push_str(&format!(
            "\n    #[must_use]\n    pub const fn {}(&self) -> {}Service<'_> {{\n        {}Service::new(&self.pool)\n    }}\n",
            rust_ident(&snake_case(&entity.name)),
            entity.name,
            entity.name
        ));
    }
    out.push_str("}\n");
    out
}

/// Renders the service for one entity.
fn render_service(ast: &Ast, entity: &Entity) -> String {
    let table = entity.table_name();
    let columns = entity
        .fields
        .iter()
        .map(|f| format!("\"{}\"", f.column_name()))
        .collect::<Vec<_>>()
        .join(", ");
    let select = column_list(entity, None);

    let insert_fields: Vec<&Field> = entity
        .fields
        .iter()
        .filter(|f| !generated_by_database(f))
        .collect();
    let update_fields: Vec<&Field> = entity.fields.iter().filter(|f| !f.primary_key).collect();

    let insert = if insert_fields.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES RETURNING {select}")
    } else {
        format!(
            "INSERT INTO {table} ({}) VALUES ({}) RETURNING {select}",
            names(&insert_fields),
            placeholders(insert_fields.len())
        )
    };

    let set = if update_fields.is_empty() {
        // Key-only tables: a no-op assignment keeps UPDATE ... RETURNING valid
        let key = entity
            .primary_key()
            .or_else(|| entity.fields.first())
            .map_or_else(|| String::from("ctid"), Field::column_name);
        format!("{key} = {key}")
    } else {
        update_fields
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ${}", f.column_name(), i + 1))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let relations = render_relations(ast, entity);
    let record_param = if relations.is_empty() { "_record" } else { "record" };

    SERVICE
        .replace("__create_many__", &render_create_many(&table, &insert_fields))
        .replace("__insert_binds__", &chained_binds(&insert_fields, 12))
        .replace("__update_binds__", &chained_binds(&update_fields, 12))
        .replace("__relations__", &relations)
        .replace("__record__", record_param)
        .replace("__first_arg__", &(update_fields.len() + 1).to_string())
        .replace("__columns__", &columns)
        .replace("__select__", &select)
        .replace("__insert__", &insert)
        .replace("__set__", &set)
        .replace("__table__", &table)
        .replace("__Name__", &entity.name)
}

/// Fields whose value the database assigns on insert.
fn generated_by_database(field: &Field) -> bool {
    field.primary_key && (field.auto_increment || field.ty == FieldType::Uuid)
}

fn names(fields: &[&Field]) -> String {
    fields
        .iter()
        .map(|f| f.column_name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `.bind(record.x)` calls, one per line at `indent` spaces.
fn chained_binds(fields: &[&Field], indent: usize) -> String {
    fields
        .iter()
        .map(|f| format!("\n{:indent$}.bind({})", "", owned_access("record", f)))
        .collect()
}

fn render_create_many(table: &str, insert_fields: &[&Field]) -> String {
    if insert_fields.is_empty() {
        return String::from(
            "        let mut written = 0;\n\
             \x20       for record in records {\n\
             \x20           Self::insert_with(self.pool, record).await?;\n\
             \x20           written += 1;\n\
             \x20       }\n\
             \x20       Ok(written)",
        );
    }

    let pushes = insert_fields
        .iter()
        .map(|f| format!("\n                .push_bind({})", owned_access("record", f)))
        .collect::<String>();
    format!(
        "        if records.is_empty() {{\n\
         \x20           return Ok(0);\n\
         \x20       }}\n\
         \x20       let mut builder =\n\
         \x20           sqlx::QueryBuilder::<Postgres>::new(\"INSERT INTO {table} ({}) \");\n\
         \x20       builder.push_values(records, |mut row, record| {{\n\
         \x20           row{pushes};\n\
         \x20       }});\n\
         \x20       Ok(builder.build().execute(self.pool).await?.rows_affected())",
        names(insert_fields)
    )
}

/// Renders the body of `load_relations`.
fn render_relations(ast: &Ast, entity: &Entity) -> String {
    let Some(key) = entity.primary_key() else {
        return String::new();
    };
    let owner = entity.table_name();

    let mut out = String::new();
    for relation in &entity.relations {
        let Some(target) = ast.relation_target(relation) else {
            continue;
        };
        let Some(sql) = relation_query(entity, relation, target) else {
            out.push_str(&format!(
                "        // {}: {} has no {owner}id column to join on\n",
                relation.name, target.name
            ));
            continue;
        };
        out.push_str(&format!(
            "        record.{} = sqlx::query_as::<_, {}>(\n\
             \x20           \"{sql}\",\n\
             \x20       )\n\
             \x20       .bind({})\n\
             \x20       .fetch_all(self.pool)\n\
             \x20       .await?;\n",
            rust_ident(&snake_case(&relation.name)),
            target.name,
            owned_access("record", key)
        ));
    }
    out
}

/// SQL loading `relation` for one owner row, keyed by the owner's primary key.
fn relation_query(entity: &Entity, relation: &Relation, target: &Entity) -> Option<String> {
    let owner = entity.table_name();
    let target_table = target.table_name();

    if let Some(join) = &relation.join_table {
        let target_key = target.primary_key()?.column_name();
        return Some(format!(
            "SELECT {} FROM {target_table} t JOIN {join} j ON t.{target_key} = j.{target_table}_id WHERE j.{owner}_id = $1",
            column_list(target, Some("t"))
        ));
    }

    let foreign_key = [format!("{owner}id"), format!("{owner}_id")]
        .into_iter()
        .find(|candidate| target.fields.iter().any(|f| f.column_name() == *candidate))?;
    Some(format!(
        "SELECT {} FROM {target_table} WHERE {foreign_key} = $1",
        column_list(target, None)
    ))
}
