//! Token types for the schema lexer.

use super::Span;

/// Token types.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Identifier (model, field, type and attribute names)
    Identifier(String),
    /// Double-quoted string literal (without quotes)
    String(String),
    /// Numeric literal, kept as written
    Number(String),

    // Attribute markers
    /// @
    At,
    /// @@
    AtAt,

    // Delimiters
    /// {
    LeftBrace,
    /// }
    RightBrace,
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// ,
    Comma,
    /// .
    Dot,
    /// :
    Colon,
    /// =
    Eq,
    /// ?
    Question,
    /// -
    Minus,
    /// Any other punctuation character; only valid inside attribute arguments
    Symbol(char),

    // Special
    /// Line break
    Newline,
    /// End of input
    Eof,
    /// Invalid/unknown token
    Error(String),
}

/// A token with its span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source text.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns true if this token ends a line (newline or end of input).
    #[must_use]
    pub const fn is_line_end(&self) -> bool {
        matches!(self.kind, TokenKind::Newline | TokenKind::Eof)
    }

    /// Returns the identifier text if this is an identifier token.
    #[must_use]
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}
