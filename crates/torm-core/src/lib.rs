//! # torm-core
//!
//! The dependency-free half of torm: everything that works on the schema
//! text alone.
//!
//! This crate provides:
//! - A hand-written lexer and recursive descent parser for the schema
//!   language (`model`, `enum`, field attributes, `@@index`)
//! - The parsed [`Ast`]: entities, fields, indexes, list relations with
//!   resolved many-to-many join tables, and enums
//! - The type mapper used for DDL emission and drift comparison
//! - A code generator producing a typed sqlx client from the [`Ast`]
//!
//! ## Parsing
//!
//! ```rust
//! use torm_core::parse_schema;
//!
//! let ast = parse_schema(
//!     "model Post {\n  id Int @id @default(autoincrement())\n  tags Tag[]\n}\n\
//!      model Tag {\n  id Int @id\n  posts Post[]\n}\n",
//! )
//! .unwrap();
//!
//! assert_eq!(ast.entities[0].table_name(), "post");
//! assert_eq!(ast.entities[0].relations[0].join_table.as_deref(), Some("post_tag"));
//! ```
//!
//! ## Type mapping
//!
//! ```rust
//! use torm_core::types::{canonicalize, map_logical_to_sql};
//!
//! assert_eq!(map_logical_to_sql("int"), "INTEGER");
//! assert_eq!(canonicalize("int4"), canonicalize("INTEGER"));
//! ```

pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod parser;
pub mod types;

pub use ast::{Ast, Entity, EnumDef, Field, Index, Relation};
pub use codegen::{generate, GeneratedFile};
pub use parser::{parse_schema, ParseError, ParseErrorKind};
pub use types::{canonicalize, map_logical_to_sql, FieldType};
