//! Enum emission.
//!
//! Each schema enum becomes a Rust enum stored as text. sqlx support is
//! written out by hand so the column type stays plain `TEXT`.

use super::{pascal_case, HEADER};
use crate::ast::{Ast, EnumDef};

/// Renders `enums.rs`.
pub(super) fn render_enums(ast: &Ast) -> String {
    let mut out = format!(
        "{HEADER}\n\
         \n\
         use std::fmt;\n\
         use std::str::FromStr;\n\
         \n\
         /// Returned when text does not name a variant of a generated enum.\n\
         #[derive(Debug, Clone, PartialEq, Eq)]\n\
         pub struct UnknownVariant {{\n\
         \x20   pub enum_name: &'static str,\n\
         \x20   pub value: String,\n\
         }}\n\
         \n\
         impl fmt::Display for UnknownVariant {{\n\
         \x20   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{\n\
         \x20       write!(f, \"{{:?}} is not a {{}} value\", self.value, self.enum_name)\n\
         \x20   }}\n\
         }}\n\
         \n\
         impl std::error::Error for UnknownVariant {{}}\n"
    );
    for def in &ast.enums {
        out.push('\n');
        out.push_str(&render_enum(def));
    }
    out
}

fn render_enum(def: &EnumDef) -> String {
    let name = &def.name;
    let variants: Vec<(String, &str)> = def
        .values
        .iter()
        .map(|v| (pascal_case(v), v.as_str()))
        .collect();

    let mut out = format!(
        "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]\n\
         pub enum {name} {{\n"
    );
    for (variant, value) in &variants {
        out.push_str(&format!("    #[serde(rename = \"{value}\")]\n    {variant},\n"));
    }
    out.push_str("}\n\n");

    let all = variants
        .iter()
        .map(|(variant, _)| format!("Self::{variant}"))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!(
        "impl {name} {{\n\
         \x20   /// Every variant, in declaration order.\n\
         \x20   pub const ALL: [Self; {}] = [{all}];\n\
         \n\
         \x20   /// The stored text value.\n\
         \x20   #[must_use]\n\
         \x20   pub const fn as_str(self) -> &'static str {{\n\
         \x20       match self {{\n",
        variants.len()
    ));
    for (variant, value) in &variants {
        out.push_str(&format!("            Self::{variant} => \"{value}\",\n"));
    }
    out.push_str("        }\n    }\n}\n\n");

    out.push_str(&format!(
        "impl fmt::Display for {name} {{\n\
         \x20   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{\n\
         \x20       f.write_str(self.as_str())\n\
         \x20   }}\n\
         }}\n\
         \n\
         impl FromStr for {name} {{\n\
         \x20   type Err = UnknownVariant;\n\
         \n\
         \x20   fn from_str(s: &str) -> Result<Self, Self::Err> {{\n\
         \x20       Self::ALL\n\
         \x20           .into_iter()\n\
         \x20           .find(|v| v.as_str() == s)\n\
         \x20           .ok_or_else(|| UnknownVariant {{\n\
         \x20               enum_name: \"{name}\",\n\
         \x20               value: s.to_string(),\n\
         \x20           }})\n\
         \x20   }}\n\
         }}\n\
         \n\
         impl sqlx::Type<sqlx::Postgres> for {name} {{\n\
         \x20   fn type_info() -> sqlx::postgres::PgTypeInfo {{\n\
         \x20       <String as sqlx::Type<sqlx::Postgres>>::type_info()\n\
         \x20   }}\n\
         \n\
         \x20   fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {{\n\
         \x20       <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)\n\
         \x20   }}\n\
         }}\n\
         \n\
         impl<'r> sqlx::Decode<'r, sqlx::Postgres> for {name} {{\n\
         \x20   fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {{\n\
         \x20       let text = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;\n\
         \x20       Ok(text.parse::<Self>()?)\n\
         \x20   }}\n\
         }}\n\
         \n\
         impl sqlx::Encode<'_, sqlx::Postgres> for {name} {{\n\
         \x20   fn encode_by_ref(\n\
         \x20       &self,\n\
         \x20       buf: &mut sqlx::postgres::PgArgumentBuffer,\n\
         \x20   ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {{\n\
         \x20       <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)\n\
         \x20   }}\n\
         }}\n"
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_enum() {
        let def = EnumDef {
            name: "Status".to_string(),
            values: vec!["IN_PROGRESS".to_string(), "DONE".to_string()],
        };
        let out = render_enum(&def);
        assert!(out.contains("pub enum Status {\n    #[serde(rename = \"IN_PROGRESS\")]\n    InProgress,\n"));
        assert!(out.contains("pub const ALL: [Self; 2] = [Self::InProgress, Self::Done];"));
        assert!(out.contains("            Self::Done => \"DONE\",\n"));
        assert!(out.contains("impl sqlx::Type<sqlx::Postgres> for Status {"));
        assert!(out.contains("enum_name: \"Status\","));
    }

    #[test]
    fn test_enums_file_without_enums() {
        let out = render_enums(&Ast::default());
        assert!(out.starts_with(HEADER));
        assert!(out.contains("pub struct UnknownVariant {"));
        assert!(!out.contains("impl FromStr"));
    }
}
