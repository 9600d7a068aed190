//! Schema Parser
//!
//! A hand-written recursive descent parser over the line-oriented schema
//! language: `model` and `enum` blocks, field lines with `@` attributes and
//! model-level `@@index` declarations.

mod error;
mod parser;

pub use error::{ParseError, ParseErrorKind};
pub use parser::{parse_schema, Parser};
