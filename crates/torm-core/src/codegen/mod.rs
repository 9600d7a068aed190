//! Client code generation.
//!
//! Turns an [`Ast`] into Rust source for a typed data-access layer over
//! sqlx and PostgreSQL: one record file per entity, one file of enums, one
//! client file with a service per entity, and a `mod.rs` tying them
//! together. Every column name, SQL type and nullable wrapper is decided
//! here, so the generated code never inspects types at query time.
//!
//! The generated module depends on `sqlx` (with the `postgres`, `uuid` and
//! `chrono` features), `serde`, `thiserror`, `uuid` and `chrono`.

mod client;
mod enums;
mod model;
mod naming;

use std::path::{Path, PathBuf};

use crate::ast::{Ast, Entity, Field};
use crate::types::FieldType;

pub use naming::{pascal_case, rust_ident, snake_case};

/// First line of every generated file.
pub const HEADER: &str = "// Code generated by torm. DO NOT EDIT.";

/// A generated source file, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// File name, e.g. `post.rs`.
    pub path: String,
    /// File contents.
    pub contents: String,
}

impl GeneratedFile {
    fn new(path: impl Into<String>, contents: String) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }
}

/// Generates the client module for `ast`.
///
/// Files come back in a fixed order: `mod.rs`, `enums.rs`, one file per
/// entity in declaration order, then `client.rs`.
#[must_use]
pub fn generate(ast: &Ast) -> Vec<GeneratedFile> {
    let mut files = vec![
        GeneratedFile::new("mod.rs", render_mod(ast)),
        GeneratedFile::new("enums.rs", enums::render_enums(ast)),
    ];
    for entity in &ast.entities {
        files.push(GeneratedFile::new(
            format!("{}.rs", module_name(entity)),
            model::render_model(ast, entity),
        ));
    }
    files.push(GeneratedFile::new("client.rs", client::render_client(ast)));
    files
}

/// Generates the client module and writes it under `out_dir`, creating the
/// directory if needed. Returns the written paths.
///
/// # Errors
///
/// Returns an I/O error if the directory or a file cannot be written.
pub fn write_to(out_dir: &Path, ast: &Ast) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();
    for file in generate(ast) {
        let path = out_dir.join(&file.path);
        std::fs::write(&path, file.contents)?;
        written.push(path);
    }
    Ok(written)
}

fn render_mod(ast: &Ast) -> String {
    let mut out = format!("{HEADER}\n\nmod client;\nmod enums;\n");
    for entity in &ast.entities {
        out.push_str(&format!("mod {};\n", rust_ident(&module_name(entity))));
    }
    out.push_str("\npub use client::*;\npub use enums::*;\n");
    for entity in &ast.entities {
        out.push_str(&format!(
            "pub use {}::{};\n",
            rust_ident(&module_name(entity)),
            entity.name
        ));
    }
    out
}

// ===== Shared helpers =====

/// Module (and file stem) for an entity: its table name.
fn module_name(entity: &Entity) -> String {
    entity.table_name()
}

/// Rust field name for a schema field.
fn field_ident(field: &Field) -> String {
    rust_ident(&snake_case(&field.name))
}

/// Rust type of a field, without the nullable wrapper.
fn base_type(field: &Field) -> String {
    match &field.ty {
        FieldType::Int => "i32".to_string(),
        FieldType::Float => "f32".to_string(),
        FieldType::Bool => "bool".to_string(),
        FieldType::Timestamp => "chrono::NaiveDateTime".to_string(),
        FieldType::Uuid => "uuid::Uuid".to_string(),
        FieldType::Enum(name) => name.clone(),
        FieldType::String | FieldType::Json | FieldType::Other(_) => "String".to_string(),
    }
}

/// Rust type of a field, `Option<_>` when the column is nullable.
fn rust_type(field: &Field) -> String {
    let base = base_type(field);
    if field.not_null {
        base
    } else {
        format!("Option<{base}>")
    }
}

/// Expression reading `field` from `record` by value.
fn owned_access(record: &str, field: &Field) -> String {
    let copy = !matches!(
        field.ty,
        FieldType::String | FieldType::Json | FieldType::Other(_)
    );
    if copy {
        format!("{record}.{}", field_ident(field))
    } else {
        format!("{record}.{}.clone()", field_ident(field))
    }
}

/// Comma-separated column list for an entity, optionally table-qualified.
fn column_list(entity: &Entity, qualifier: Option<&str>) -> String {
    entity
        .fields
        .iter()
        .map(|f| match qualifier {
            Some(q) => format!("{q}.{}", f.column_name()),
            None => f.column_name(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
