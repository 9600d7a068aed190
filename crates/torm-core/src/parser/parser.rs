//! Schema parser implementation.

use std::collections::HashMap;

use super::error::{ParseError, ParseErrorKind};
use crate::ast::{join_table_name, Ast, EnumDef, Entity, Field, Index, Relation};
use crate::lexer::{Lexer, Span, Token, TokenKind};
use crate::types::FieldType;

/// Default expression that turns a field into an auto-increment column.
const AUTOINCREMENT: &str = "autoincrement()";

/// Default applied to `@updatedAt` fields without an explicit default.
const UPDATED_AT_DEFAULT: &str = "now()";

/// Parses a schema into an [`Ast`].
///
/// # Errors
///
/// Returns a `ParseError` if the input is malformed, declares no models, or
/// declares a model without exactly one primary key.
pub fn parse_schema(input: &str) -> Result<Ast, ParseError> {
    Parser::new(input).parse()
}

/// A field attribute as written: `@name` or `@name(args)`.
#[derive(Debug)]
struct Attribute {
    name: String,
    args: Option<String>,
    span: Span,
}

/// Schema parser.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given input.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
        }
    }

    /// Parses the whole schema.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` on malformed input, when no model is declared,
    /// when a model name repeats, or when a model lacks a single `@id` field.
    pub fn parse(mut self) -> Result<Ast, ParseError> {
        let mut ast = Ast::default();

        loop {
            self.skip_newlines();
            let keyword = match &self.current.kind {
                TokenKind::Eof => break,
                TokenKind::Identifier(keyword) => keyword.clone(),
                _ => return Err(self.error_here("model, enum or block declaration")),
            };

            match keyword.as_str() {
                "model" => {
                    let (entity, span) = self.parse_model()?;
                    if ast.entity(&entity.name).is_some() {
                        return Err(ParseError::structural(
                            ParseErrorKind::DuplicateModel { model: entity.name },
                            span,
                        ));
                    }
                    ast.entities.push(entity);
                }
                "enum" => {
                    let def = self.parse_enum()?;
                    ast.enums.push(def);
                }
                // datasource, generator and anything else we do not model
                _ => self.skip_block()?,
            }
        }

        if ast.entities.is_empty() {
            return Err(ParseError::structural(
                ParseErrorKind::NoModels,
                self.current.span,
            ));
        }

        resolve_enums(&mut ast);
        resolve_relations(&mut ast);
        Ok(ast)
    }

    /// Parses `model Name { ... }`.
    fn parse_model(&mut self) -> Result<(Entity, Span), ParseError> {
        self.advance(); // model
        let (name, name_span) = self.expect_identifier("model name")?;
        self.expect(&TokenKind::LeftBrace, "'{'")?;

        let mut entity = Entity::new(name);
        loop {
            self.skip_newlines();
            match &self.current.kind {
                TokenKind::RightBrace => {
                    self.advance();
                    break;
                }
                TokenKind::AtAt => self.parse_block_attribute(&mut entity)?,
                TokenKind::Identifier(_) => self.parse_field_line(&mut entity)?,
                _ => return Err(self.error_here("field declaration or '}'")),
            }
        }

        let primary_keys = entity.fields.iter().filter(|f| f.primary_key).count();
        match primary_keys {
            1 => Ok((entity, name_span)),
            0 => Err(ParseError::structural(
                ParseErrorKind::MissingPrimaryKey { model: entity.name },
                name_span,
            )),
            _ => Err(ParseError::structural(
                ParseErrorKind::MultiplePrimaryKeys { model: entity.name },
                name_span,
            )),
        }
    }

    /// Parses one field line and appends a field or relation to `entity`.
    fn parse_field_line(&mut self, entity: &mut Entity) -> Result<(), ParseError> {
        let (name, _) = self.expect_identifier("field name")?;
        let (type_name, _) = self.expect_identifier("field type")?;

        // Native type wrappers such as Unsupported("tsvector")
        if self.check(&TokenKind::LeftParen) {
            self.parse_raw_arguments()?;
        }

        let mut list = false;
        let mut optional = false;
        if self.check(&TokenKind::LeftBracket) {
            self.advance();
            self.expect(&TokenKind::RightBracket, "']'")?;
            list = true;
        } else if self.check(&TokenKind::Question) {
            self.advance();
            optional = true;
        }

        let attributes = self.parse_field_attributes()?;

        if list {
            entity.relations.push(Relation::new(name, type_name));
            return Ok(());
        }
        // Scalar side of a relation; the foreign key column is declared separately
        if attributes.iter().any(|a| a.name == "relation") {
            return Ok(());
        }

        let mut field = Field::new(name, FieldType::from_declared(&type_name));
        field.not_null = !optional;
        let mut updated_at = false;

        for attribute in attributes {
            match attribute.name.as_str() {
                "id" => {
                    field.primary_key = true;
                    field.not_null = true;
                }
                "default" => match attribute.args {
                    Some(expr) if expr == AUTOINCREMENT => field.auto_increment = true,
                    Some(expr) if !expr.is_empty() => field.default = Some(expr),
                    _ => {
                        return Err(ParseError::new(
                            "@default requires an expression",
                            attribute.span,
                        ));
                    }
                },
                "db.Uuid" => field.ty = FieldType::Uuid,
                "updatedAt" => updated_at = true,
                _ => {}
            }
        }

        if updated_at {
            field.not_null = true;
            if field.default.is_none() {
                field.default = Some(UPDATED_AT_DEFAULT.to_string());
            }
        }

        entity.fields.push(field);
        Ok(())
    }

    /// Parses `@name[.part]*[(args)]` attributes up to the end of the line.
    fn parse_field_attributes(&mut self) -> Result<Vec<Attribute>, ParseError> {
        let mut attributes = Vec::new();

        while self.check(&TokenKind::At) {
            let start = self.current.span;
            self.advance();
            let (mut name, _) = self.expect_identifier("attribute name")?;
            while self.check(&TokenKind::Dot) {
                self.advance();
                let (part, _) = self.expect_identifier("attribute name")?;
                name.push('.');
                name.push_str(&part);
            }
            let args = if self.check(&TokenKind::LeftParen) {
                Some(self.parse_raw_arguments()?)
            } else {
                None
            };
            attributes.push(Attribute {
                name,
                args,
                span: start.cover(self.previous.span),
            });
        }

        self.expect_line_end()?;
        Ok(attributes)
    }

    /// Parses `@@name(args)`; only `@@index([a, b])` is kept.
    fn parse_block_attribute(&mut self, entity: &mut Entity) -> Result<(), ParseError> {
        self.advance(); // @@
        let (name, _) = self.expect_identifier("block attribute name")?;

        if name == "index" {
            self.expect(&TokenKind::LeftParen, "'('")?;
            self.expect(&TokenKind::LeftBracket, "'['")?;
            let mut fields = Vec::new();
            loop {
                let (field, _) = self.expect_identifier("indexed field name")?;
                // Per-field options such as `title(sort: Desc)`
                if self.check(&TokenKind::LeftParen) {
                    self.parse_raw_arguments()?;
                }
                fields.push(field);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(&TokenKind::RightBracket, "']'")?;
            // Trailing named arguments such as `, name: "by_title"`
            while !self.check(&TokenKind::RightParen) {
                if self.current.is_line_end() {
                    return Err(self.error_here("')'"));
                }
                self.advance();
            }
            self.advance(); // )
            entity.indexes.push(Index { fields });
        } else if self.check(&TokenKind::LeftParen) {
            self.parse_raw_arguments()?;
        }

        self.expect_line_end()
    }

    /// Parses `enum Name { A B ... }`. Values may share a line or carry
    /// attributes, which are ignored.
    fn parse_enum(&mut self) -> Result<EnumDef, ParseError> {
        self.advance(); // enum
        let (name, _) = self.expect_identifier("enum name")?;
        self.expect(&TokenKind::LeftBrace, "'{'")?;

        let mut values = Vec::new();
        loop {
            self.skip_newlines();
            match &self.current.kind {
                TokenKind::RightBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Identifier(value) => {
                    values.push(value.clone());
                    self.advance();
                }
                TokenKind::At | TokenKind::AtAt => {
                    self.advance();
                    self.expect_identifier("attribute name")?;
                    if self.check(&TokenKind::LeftParen) {
                        self.parse_raw_arguments()?;
                    }
                }
                TokenKind::Comma => self.advance(),
                _ => return Err(self.error_here("enum value or '}'")),
            }
        }

        Ok(EnumDef { name, values })
    }

    /// Skips `keyword name { ... }` with brace matching.
    fn skip_block(&mut self) -> Result<(), ParseError> {
        while !self.check(&TokenKind::LeftBrace) {
            match &self.current.kind {
                TokenKind::Identifier(_) => self.advance(),
                _ => return Err(self.error_here("'{'")),
            }
        }
        self.advance(); // {

        let mut depth = 1usize;
        while depth > 0 {
            match &self.current.kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => depth -= 1,
                TokenKind::Eof => return Err(self.error_here("'}'")),
                TokenKind::Error(message) => {
                    return Err(ParseError::new(message.clone(), self.current.span));
                }
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Consumes a balanced `( ... )` group on the current line and returns
    /// the trimmed source text between the outer parentheses.
    fn parse_raw_arguments(&mut self) -> Result<String, ParseError> {
        let open = self.expect(&TokenKind::LeftParen, "'('")?;
        let mut depth = 1usize;

        loop {
            match &self.current.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        let close = self.current.span;
                        self.advance();
                        let raw = Span::new(open.end, close.start).slice(self.lexer.source());
                        return Ok(raw.trim().to_string());
                    }
                }
                TokenKind::Newline | TokenKind::Eof => return Err(self.error_here("')'")),
                TokenKind::Error(message) => {
                    return Err(ParseError::new(message.clone(), self.current.span));
                }
                _ => {}
            }
            self.advance();
        }
    }

    // ===== Token helpers =====

    /// Advances to the next token.
    fn advance(&mut self) {
        self.previous = core::mem::replace(&mut self.current, self.lexer.next_token());
    }

    /// Returns true if the current token has the given kind.
    fn check(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    /// Consumes a token of the given kind and returns its span.
    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Span, ParseError> {
        if self.check(kind) {
            let span = self.current.span;
            self.advance();
            Ok(span)
        } else {
            Err(self.error_here(expected))
        }
    }

    /// Consumes an identifier and returns its text and span.
    fn expect_identifier(&mut self, expected: &str) -> Result<(String, Span), ParseError> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let result = (name.clone(), self.current.span);
                self.advance();
                Ok(result)
            }
            _ => Err(self.error_here(expected)),
        }
    }

    /// Consumes the end of a declaration line. A closing brace also ends a
    /// line (`model A { id Int @id }`) and is left for the caller.
    fn expect_line_end(&mut self) -> Result<(), ParseError> {
        match &self.current.kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof | TokenKind::RightBrace => Ok(()),
            _ => Err(self.error_here("attribute or end of line")),
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Builds an error describing the current token.
    fn error_here(&self, expected: &str) -> ParseError {
        match &self.current.kind {
            TokenKind::Eof => ParseError::unexpected_eof(expected, self.current.span),
            TokenKind::Error(message) => ParseError::new(message.clone(), self.current.span),
            other => ParseError::unexpected(expected, other.clone(), self.current.span),
        }
    }
}

// ===== Resolution passes =====

/// Turns fields typed with a declared enum name into enum fields.
fn resolve_enums(ast: &mut Ast) {
    let enums: HashMap<String, Vec<String>> = ast
        .enums
        .iter()
        .map(|e| (e.name.clone(), e.values.clone()))
        .collect();

    for field in ast.entities.iter_mut().flat_map(|e| e.fields.iter_mut()) {
        if let FieldType::Other(name) = &field.ty {
            if let Some(values) = enums.get(name) {
                field.enum_values.clone_from(values);
                field.ty = FieldType::Enum(name.clone());
            }
        }
    }
}

/// Resolves relation targets and assigns join tables to reciprocal pairs.
fn resolve_relations(ast: &mut Ast) {
    let positions: HashMap<String, usize> = ast
        .entities
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name.clone(), i))
        .collect();

    // (owner, target) for every list relation with a known target
    let declared: Vec<(String, String)> = ast
        .entities
        .iter()
        .flat_map(|e| {
            e.relations
                .iter()
                .filter(|r| positions.contains_key(&r.target))
                .map(|r| (e.name.clone(), r.target.clone()))
        })
        .collect();

    for entity in &mut ast.entities {
        for relation in &mut entity.relations {
            relation.target_index = positions.get(&relation.target).copied();
            let reciprocal = relation.target != entity.name
                && declared
                    .iter()
                    .any(|(owner, target)| *owner == relation.target && *target == entity.name);
            if relation.target_index.is_some() && reciprocal {
                relation.join_table = Some(join_table_name(&entity.name, &relation.target));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Ast {
        parse_schema(input).unwrap_or_else(|e| panic!("Failed to parse: {input}\nError: {e}"))
    }

    #[test]
    fn test_minimal_model() {
        let ast = parse("model User {\n  id Int @id @default(autoincrement())\n}\n");
        assert_eq!(ast.entities.len(), 1);
        let id = &ast.entities[0].fields[0];
        assert!(id.primary_key);
        assert!(id.auto_increment);
        assert!(id.default.is_none());
        assert_eq!(id.ty, FieldType::Int);
    }

    #[test]
    fn test_single_line_model() {
        let ast = parse("model Tag { id Int @id }");
        assert_eq!(ast.entities[0].fields.len(), 1);
    }

    #[test]
    fn test_default_keeps_raw_expression() {
        let ast = parse(
            "model Doc {\n  id String @id @db.Uuid @default(dbgenerated(\"gen_random_uuid()\"))\n  score Float @default(-1.5)\n}",
        );
        let fields = &ast.entities[0].fields;
        assert_eq!(fields[0].ty, FieldType::Uuid);
        assert_eq!(
            fields[0].default.as_deref(),
            Some("dbgenerated(\"gen_random_uuid()\")")
        );
        assert_eq!(fields[1].default.as_deref(), Some("-1.5"));
    }

    #[test]
    fn test_optional_and_updated_at() {
        let ast = parse(
            "model Note {\n  id Int @id\n  body String?\n  updatedAt DateTime @updatedAt\n}",
        );
        let fields = &ast.entities[0].fields;
        assert!(!fields[1].not_null);
        assert!(fields[2].not_null);
        assert_eq!(fields[2].default.as_deref(), Some("now()"));
    }

    #[test]
    fn test_updated_at_keeps_explicit_default() {
        let ast = parse("model Note {\n  id Int @id\n  at DateTime @default(now()) @updatedAt\n}");
        assert_eq!(ast.entities[0].fields[1].default.as_deref(), Some("now()"));
        let ast = parse(
            "model Note {\n  id Int @id\n  at DateTime @updatedAt @default(CURRENT_TIMESTAMP)\n}",
        );
        assert_eq!(
            ast.entities[0].fields[1].default.as_deref(),
            Some("CURRENT_TIMESTAMP")
        );
    }

    #[test]
    fn test_relation_scalar_line_is_elided() {
        let ast = parse(
            "model Post {\n  id Int @id\n  author User @relation(fields: [authorId], references: [id])\n  authorId Int\n}\nmodel User {\n  id Int @id\n  posts Post[]\n}",
        );
        let post = &ast.entities[0];
        assert_eq!(post.fields.len(), 2);
        assert_eq!(post.fields[1].name, "authorId");
        let user = &ast.entities[1];
        assert_eq!(user.relations.len(), 1);
        assert_eq!(user.relations[0].target_index, Some(0));
        assert!(user.relations[0].join_table.is_none());
    }

    #[test]
    fn test_skips_datasource_and_generator() {
        let ast = parse(
            "datasource db {\n  provider = \"postgresql\"\n  url = env(\"DATABASE_URL\")\n}\n\ngenerator client {\n  provider = \"torm\"\n}\n\nmodel A {\n  id Int @id\n}",
        );
        assert_eq!(ast.entities.len(), 1);
    }

    #[test]
    fn test_enum_values_with_attributes() {
        let ast = parse(
            "enum Role {\n  USER\n  ADMIN @map(\"admin\")\n}\nmodel A {\n  id Int @id\n  role Role @default(USER)\n}",
        );
        assert_eq!(ast.enums[0].values, vec!["USER", "ADMIN"]);
        let role = &ast.entities[0].fields[1];
        assert_eq!(role.ty, FieldType::Enum("Role".to_string()));
        assert_eq!(role.enum_values, vec!["USER", "ADMIN"]);
    }

    #[test]
    fn test_block_attributes() {
        let ast = parse(
            "model A {\n  id Int @id\n  a String\n  b String\n  @@index([a, b(sort: Desc)], name: \"ab\")\n  @@map(\"alpha\")\n  @@unique([a])\n}",
        );
        assert_eq!(ast.entities[0].indexes.len(), 1);
        assert_eq!(ast.entities[0].indexes[0].fields, vec!["a", "b"]);
    }

    #[test]
    fn test_malformed_attribute() {
        let err = parse_schema("model A {\n  id Int @id @default(\n}").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Syntax);
    }

    #[test]
    fn test_multiple_primary_keys() {
        let err = parse_schema("model A {\n  id Int @id\n  other Int @id\n}").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::MultiplePrimaryKeys {
                model: "A".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_model() {
        let err = parse_schema("model A {\n  id Int @id\n}\nmodel A {\n  id Int @id\n}").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::DuplicateModel { .. }));
    }

    #[test]
    fn test_self_relation_has_no_join_table() {
        let ast = parse("model Node {\n  id Int @id\n  children Node[]\n}");
        let relation = &ast.entities[0].relations[0];
        assert_eq!(relation.target_index, Some(0));
        assert!(relation.join_table.is_none());
    }
}
