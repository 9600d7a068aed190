#![allow(dead_code)]

use torm_core::{parse_schema, Ast, Entity, ParseError};

/// A schema exercising every construct the parser understands.
pub const BLOG_SCHEMA: &str = r#"
datasource db {
  provider = "postgresql"
  url      = env("DATABASE_URL")
}

generator client {
  provider = "torm"
  output   = "../models"
}

/// Who may do what
enum Role {
  READER
  AUTHOR
  ADMIN
}

model User {
  id        String   @id @db.Uuid @default(uuid())
  email     String   @unique
  name      String?
  role      Role     @default(READER)
  createdAt DateTime @default(now())
  updatedAt DateTime @updatedAt
  posts     Post[]

  @@index([email])
}

model Post {
  id        Int      @id @default(autoincrement())
  title     String
  body      String?
  score     Float    @default(0)
  published Boolean  @default(false)
  meta      Json?
  author    User     @relation(fields: [userId], references: [id])
  userId    String   @db.Uuid
  tags      Tag[]

  @@index([title, published])
  @@index([userId])
}

model Tag {
  id    Int    @id @default(autoincrement())
  label String
  posts Post[]
}
"#;

pub fn parse(schema: &str) -> Ast {
    parse_schema(schema).unwrap_or_else(|e| panic!("Failed to parse: {schema}\nError: {e}"))
}

pub fn parse_err(schema: &str) -> ParseError {
    parse_schema(schema)
        .err()
        .unwrap_or_else(|| panic!("Expected parse error for: {schema}"))
}

pub fn entity<'a>(ast: &'a Ast, name: &str) -> &'a Entity {
    ast.entity(name)
        .unwrap_or_else(|| panic!("Expected entity {name}"))
}
