//! Record type emission, one file per entity.

use super::{field_ident, rust_type, HEADER};
use crate::ast::{Ast, Entity};
use crate::types::FieldType;

/// Renders the record file for `entity`.
pub(super) fn render_model(ast: &Ast, entity: &Entity) -> String {
    let relations: Vec<_> = entity
        .relations
        .iter()
        .filter_map(|r| ast.relation_target(r).map(|target| (r, target)))
        .collect();
    let uses_siblings = !relations.is_empty()
        || entity
            .fields
            .iter()
            .any(|f| matches!(f.ty, FieldType::Enum(_)));

    let mut out = format!("{HEADER}\n\n");
    if uses_siblings {
        out.push_str("#[allow(unused_imports)]\nuse super::*;\n\n");
    }

    out.push_str(&format!(
        "/// A row of the `{}` table.\n\
         #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, sqlx::FromRow)]\n\
         pub struct {} {{\n",
        entity.table_name(),
        entity.name
    ));

    for field in &entity.fields {
        let ident = field_ident(field);
        if ident.trim_start_matches("r#") != field.column_name() {
            out.push_str(&format!("    #[sqlx(rename = \"{}\")]\n", field.column_name()));
        }
        if ident.trim_start_matches("r#") != field.name {
            out.push_str(&format!("    #[serde(rename = \"{}\")]\n", field.name));
        }
        out.push_str(&format!("    pub {ident}: {},\n", rust_type(field)));
    }

    for (relation, target) in relations {
        let ident = super::rust_ident(&super::snake_case(&relation.name));
        out.push_str("    #[sqlx(skip)]\n    #[serde(default)]\n");
        out.push_str(&format!("    pub {ident}: Vec<{}>,\n", target.name));
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema;

    const SCHEMA: &str = "\
enum Role {
  USER
  ADMIN
}

model User {
  id        String   @id @db.Uuid @default(uuid())
  email     String
  nickname  String?
  role      Role
  createdAt DateTime @default(now())
  posts     Post[]
}

model Post {
  id       Int    @id @default(autoincrement())
  title    String
  authorId String @db.Uuid
  author   User   @relation(fields: [authorId], references: [id])
}
";

    #[test]
    fn test_model_fields() {
        let ast = parse_schema(SCHEMA).unwrap();
        let user = render_model(&ast, &ast.entities[0]);
        assert!(user.contains("pub struct User {\n"));
        assert!(user.contains("    pub id: uuid::Uuid,\n"));
        assert!(user.contains("    pub nickname: Option<String>,\n"));
        assert!(user.contains("    pub role: Role,\n"));
        assert!(user.contains(
            "    #[sqlx(rename = \"createdat\")]\n    #[serde(rename = \"createdAt\")]\n    pub created_at: chrono::NaiveDateTime,\n"
        ));
        assert!(user.contains("    #[sqlx(skip)]\n    #[serde(default)]\n    pub posts: Vec<Post>,\n"));
        assert!(user.contains("use super::*;"));
    }

    #[test]
    fn test_model_without_siblings() {
        let ast = parse_schema(SCHEMA).unwrap();
        let post = render_model(&ast, &ast.entities[1]);
        assert!(!post.contains("use super::*;"));
        assert!(post.contains("    #[sqlx(rename = \"authorid\")]\n"));
        assert!(!post.contains("author:"));
    }
}
