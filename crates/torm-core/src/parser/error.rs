//! Parser error types.

use core::fmt;

use crate::lexer::{Span, TokenKind};

/// What went wrong while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Malformed input.
    Syntax,
    /// The schema declares no models.
    NoModels,
    /// A model has no `@id` field.
    MissingPrimaryKey { model: String },
    /// A model has more than one `@id` field.
    MultiplePrimaryKeys { model: String },
    /// Two models share a name.
    DuplicateModel { model: String },
}

/// A parse error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// The error category.
    pub kind: ParseErrorKind,
    /// The error message.
    pub message: String,
    /// The location of the error.
    pub span: Span,
    /// Expected tokens (if applicable).
    pub expected: Option<String>,
    /// The actual token found.
    pub found: Option<TokenKind>,
}

impl ParseError {
    /// Creates a new syntax error.
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::Syntax,
            message: message.into(),
            span,
            expected: None,
            found: None,
        }
    }

    /// Creates an "unexpected token" error.
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        let expected_str: String = expected.into();
        Self {
            kind: ParseErrorKind::Syntax,
            message: format!("Unexpected token: expected {expected_str}, found {found:?}"),
            span,
            expected: Some(expected_str),
            found: Some(found),
        }
    }

    /// Creates an "unexpected end of input" error.
    #[must_use]
    pub fn unexpected_eof(expected: impl Into<String>, span: Span) -> Self {
        let expected_str: String = expected.into();
        Self {
            kind: ParseErrorKind::Syntax,
            message: format!("Unexpected end of input: expected {expected_str}"),
            span,
            expected: Some(expected_str),
            found: Some(TokenKind::Eof),
        }
    }

    /// Creates a structural error (a well-formed schema that cannot be used).
    #[must_use]
    pub fn structural(kind: ParseErrorKind, span: Span) -> Self {
        let message = match &kind {
            ParseErrorKind::Syntax => String::from("Malformed schema"),
            ParseErrorKind::NoModels => String::from("No model definitions found"),
            ParseErrorKind::MissingPrimaryKey { model } => {
                format!("Model {model} has no primary key field")
            }
            ParseErrorKind::MultiplePrimaryKeys { model } => {
                format!("Model {model} declares more than one primary key field")
            }
            ParseErrorKind::DuplicateModel { model } => {
                format!("Model {model} is declared more than once")
            }
        };
        Self {
            kind,
            message,
            span,
            expected: None,
            found: None,
        }
    }

    /// Resolves the 1-based line and column of the error start in `source`.
    #[must_use]
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let offset = self.span.start.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
            + 1;
        (line, column)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at position {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}
