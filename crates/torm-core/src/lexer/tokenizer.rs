//! Schema tokenizer implementation.

use super::{Span, Token, TokenKind};

/// A lexer that tokenizes schema input.
pub struct Lexer<'a> {
    /// The input source text.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    /// Returns the input this lexer reads from.
    #[must_use]
    pub const fn source(&self) -> &'a str {
        self.input
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace (except line breaks) and comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(|c| c.is_whitespace() && c != '\n') {
                self.advance();
            }

            // Line comments (// and ///) run up to, not including, the newline
            if self.peek() == Some('/') && self.peek_next() == Some('/') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            break;
        }
    }

    /// Creates a span from start to current position.
    const fn make_span(&self) -> Span {
        Span::new(self.start, self.pos)
    }

    /// Creates a token with the current span.
    const fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.make_span())
    }

    /// Scans an identifier.
    fn scan_identifier(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let text = &self.input[self.start..self.pos];
        self.make_token(TokenKind::Identifier(String::from(text)))
    }

    /// Scans a number. The literal text is kept; attribute arguments are
    /// passed through verbatim.
    fn scan_number(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(); // consume .
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = &self.input[self.start..self.pos];
        self.make_token(TokenKind::Number(String::from(text)))
    }

    /// Scans a double-quoted string literal with backslash escapes.
    fn scan_string(&mut self) -> Token {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => {
                        return self.make_token(TokenKind::Error(String::from(
                            "Unterminated string literal",
                        )));
                    }
                },
                Some('\n') | None => {
                    return self.make_token(TokenKind::Error(String::from(
                        "Unterminated string literal",
                    )));
                }
                Some(c) => value.push(c),
            }
        }

        self.make_token(TokenKind::String(value))
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.start = self.pos;

        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '\n' => self.make_token(TokenKind::Newline),
            '{' => self.make_token(TokenKind::LeftBrace),
            '}' => self.make_token(TokenKind::RightBrace),
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '[' => self.make_token(TokenKind::LeftBracket),
            ']' => self.make_token(TokenKind::RightBracket),
            ',' => self.make_token(TokenKind::Comma),
            '.' => self.make_token(TokenKind::Dot),
            ':' => self.make_token(TokenKind::Colon),
            '=' => self.make_token(TokenKind::Eq),
            '?' => self.make_token(TokenKind::Question),
            '-' => self.make_token(TokenKind::Minus),
            '@' => {
                if self.peek() == Some('@') {
                    self.advance();
                    self.make_token(TokenKind::AtAt)
                } else {
                    self.make_token(TokenKind::At)
                }
            }

            '"' => {
                self.pos = self.start; // Reset position to scan from quote
                self.scan_string()
            }

            c if c.is_ascii_digit() => {
                self.pos = self.start;
                self.scan_number()
            }

            c if c.is_alphabetic() || c == '_' => {
                self.pos = self.start;
                self.scan_identifier()
            }

            c if c.is_ascii_punctuation() => self.make_token(TokenKind::Symbol(c)),

            _ => self.make_token(TokenKind::Error(format!("Unexpected character: {c}"))),
        }
    }

    /// Tokenizes the entire input and returns all tokens.
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
