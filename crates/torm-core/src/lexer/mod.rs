//! Schema Lexer/Tokenizer
//!
//! This module provides a hand-written lexer for the schema language that
//! produces a stream of tokens. Newlines are tokens because field and
//! attribute declarations are line-oriented.

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Token, TokenKind};
pub use tokenizer::Lexer;
