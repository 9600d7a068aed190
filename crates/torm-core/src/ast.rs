//! Parsed schema model.
//!
//! An [`Ast`] is produced once per invocation and never mutated afterwards.
//! Relations between entities are expressed as indices into
//! [`Ast::entities`] plus a shared join-table name, so cyclic relation graphs
//! need no owning references.

use crate::types::FieldType;

/// The parsed schema: entities and enums in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ast {
    /// Models, in declaration order.
    pub entities: Vec<Entity>,
    /// Enums, in declaration order.
    pub enums: Vec<EnumDef>,
}

impl Ast {
    /// Looks up an entity by its declared name.
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Looks up an enum by its declared name.
    #[must_use]
    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// Returns the entity a relation points at, if it exists.
    #[must_use]
    pub fn relation_target(&self, relation: &Relation) -> Option<&Entity> {
        relation.target_index.and_then(|i| self.entities.get(i))
    }

    /// Returns every many-to-many pair `(a, b)` with `a.name < b.name`,
    /// ordered by the declaration order of `a`, then of `a`'s relation.
    #[must_use]
    pub fn many_to_many_pairs(&self) -> Vec<(&Entity, &Entity, &str)> {
        let mut pairs = Vec::new();
        for entity in &self.entities {
            for relation in &entity.relations {
                let (Some(join), Some(target)) =
                    (relation.join_table.as_deref(), self.relation_target(relation))
                else {
                    continue;
                };
                if entity.name < target.name {
                    pairs.push((entity, target, join));
                }
            }
        }
        pairs
    }
}

/// A model, materialized as one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Declared name; unique within the schema.
    pub name: String,
    /// Scalar fields, in declaration order.
    pub fields: Vec<Field>,
    /// Model-level indexes, in declaration order.
    pub indexes: Vec<Index>,
    /// List-typed relations, in declaration order.
    pub relations: Vec<Relation>,
}

impl Entity {
    /// Creates an empty entity.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            indexes: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// The table name: the lower-cased entity name.
    #[must_use]
    pub fn table_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Returns the primary-key field.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Looks up a field by declared name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the name of index `position` (0-based): `idx_<table>_<n>`.
    #[must_use]
    pub fn index_name(&self, position: usize) -> String {
        format!("idx_{}_{}", self.table_name(), position + 1)
    }
}

/// A scalar column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Declared name.
    pub name: String,
    /// Logical type.
    pub ty: FieldType,
    /// Opaque SQL default expression.
    pub default: Option<String>,
    /// False for optional types unless `@id` or `@updatedAt` forces it.
    pub not_null: bool,
    /// Set by `@id`.
    pub primary_key: bool,
    /// Set by `@default(autoincrement())`.
    pub auto_increment: bool,
    /// Allowed values when `ty` is an enum.
    pub enum_values: Vec<String>,
}

impl Field {
    /// Creates a nullable field with no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            not_null: false,
            primary_key: false,
            auto_increment: false,
            enum_values: Vec::new(),
        }
    }

    /// Marks the field as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks the field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    /// Marks the field as auto-increment.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// The column name: the lower-cased field name.
    #[must_use]
    pub fn column_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// The SQL type used for emission.
    #[must_use]
    pub fn sql_type(&self) -> &'static str {
        self.ty.sql_type()
    }
}

/// A model-level index over one or more fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Referenced field names, in declaration order.
    pub fields: Vec<String>,
}

/// A list-typed field pointing at another entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Declared field name.
    pub name: String,
    /// Declared target entity name.
    pub target: String,
    /// Index of the target in [`Ast::entities`], once resolved.
    pub target_index: Option<usize>,
    /// Join table name, set iff the target has a list relation back.
    pub join_table: Option<String>,
}

impl Relation {
    /// Creates an unresolved relation.
    #[must_use]
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            target_index: None,
            join_table: None,
        }
    }

    /// Returns true if this relation goes through a join table.
    #[must_use]
    pub const fn is_many_to_many(&self) -> bool {
        self.join_table.is_some()
    }
}

/// A named string enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    /// Declared name.
    pub name: String,
    /// Members in declaration order.
    pub values: Vec<String>,
}

/// Returns the join table name for two entity names: `lower(min)_lower(max)`.
#[must_use]
pub fn join_table_name(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{}_{}", first.to_lowercase(), second.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_table_name_is_symmetric() {
        assert_eq!(join_table_name("Post", "Tag"), "post_tag");
        assert_eq!(join_table_name("Tag", "Post"), "post_tag");
    }

    #[test]
    fn test_entity_names() {
        let mut entity = Entity::new("BlogPost");
        entity
            .fields
            .push(Field::new("ID", FieldType::Int).primary_key());
        assert_eq!(entity.table_name(), "blogpost");
        assert_eq!(entity.index_name(0), "idx_blogpost_1");
        assert_eq!(entity.primary_key().map(Field::column_name).as_deref(), Some("id"));
    }

    #[test]
    fn test_field_builder() {
        let field = Field::new("count", FieldType::Int)
            .not_null()
            .default("0");
        assert!(field.not_null);
        assert!(!field.primary_key);
        assert_eq!(field.default.as_deref(), Some("0"));
        assert_eq!(field.sql_type(), "INTEGER");
    }
}
