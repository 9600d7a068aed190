//! Command configuration and database URL discovery.
//!
//! The database URL comes from, in order: an explicit override, then the
//! `url` of the first `datasource` block in the schema that declares one.
//! `url = env("NAME")` reads the process environment; call
//! [`dotenvy::dotenv`] beforehand to pick up a `.env` file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use torm_core::{parse_schema, Ast};

use crate::error::{MigrateError, Result};

/// Default schema file location.
pub const DEFAULT_SCHEMA_PATH: &str = "prisma/schema.prisma";
/// Default migrations directory.
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";
/// Default output directory for generated code.
pub const DEFAULT_OUT_DIR: &str = "models";

static DATASOURCE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)datasource\s+\w+\s*\{(.*?)\}").expect("Invalid datasource regex")
});

static DATASOURCE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\s*=\s*(?:env\("([^"]+)"\)|"([^"]+)")"#).expect("Invalid datasource url regex")
});

/// Where a datasource gets its connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasourceUrl {
    /// `url = env("NAME")`
    Env(String),
    /// `url = "postgres://..."`
    Literal(String),
}

impl DatasourceUrl {
    /// Resolves the URL, reading the environment for [`DatasourceUrl::Env`].
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Config`] if the variable is unset or empty.
    pub fn resolve(&self) -> Result<String> {
        match self {
            Self::Literal(url) => Ok(url.clone()),
            Self::Env(name) => match std::env::var(name) {
                Ok(url) if !url.is_empty() => Ok(url),
                _ => Err(MigrateError::Config(format!(
                    "environment variable {name} is not set"
                ))),
            },
        }
    }
}

/// Finds the `url` setting of the first `datasource` block that has one.
#[must_use]
pub fn find_datasource_url(schema: &str) -> Option<DatasourceUrl> {
    DATASOURCE_BLOCK.captures_iter(schema).find_map(|block| {
        let body = block.get(1)?.as_str();
        let caps = DATASOURCE_URL.captures(body)?;
        caps.get(1)
            .map(|name| DatasourceUrl::Env(name.as_str().to_string()))
            .or_else(|| {
                caps.get(2)
                    .map(|url| DatasourceUrl::Literal(url.as_str().to_string()))
            })
    })
}

/// Paths and connection settings shared by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Schema file.
    pub schema_path: PathBuf,
    /// Migration directory.
    pub migrations_dir: PathBuf,
    /// Output directory for generated code.
    pub out_dir: PathBuf,
    /// Explicit database URL; overrides the schema's datasource.
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_path: PathBuf::from(DEFAULT_SCHEMA_PATH),
            migrations_dir: PathBuf::from(DEFAULT_MIGRATIONS_DIR),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            database_url: None,
        }
    }
}

impl Config {
    /// Creates a configuration with the default paths.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the schema path.
    #[must_use]
    pub fn schema_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_path = path.into();
        self
    }

    /// Sets the migrations directory.
    #[must_use]
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    /// Sets the code output directory.
    #[must_use]
    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    /// Sets an explicit database URL.
    #[must_use]
    pub fn database_url(mut self, url: Option<String>) -> Self {
        self.database_url = url;
        self
    }

    /// Reads the schema file.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::SchemaNotFound`] if the file does not exist.
    pub fn read_schema(&self) -> Result<String> {
        read_schema_file(&self.schema_path)
    }

    /// Reads and parses the schema file.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or does not parse.
    pub fn load_ast(&self) -> Result<Ast> {
        let source = self.read_schema()?;
        Ok(parse_schema(&source)?)
    }

    /// Resolves the database URL from the override or the schema source.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Config`] if no URL can be found.
    pub fn resolve_database_url(&self, schema: &str) -> Result<String> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }
        find_datasource_url(schema)
            .ok_or_else(|| {
                MigrateError::Config(format!(
                    "no datasource url found in {}",
                    self.schema_path.display()
                ))
            })?
            .resolve()
    }
}

fn read_schema_file(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(source) => Ok(source),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(MigrateError::SchemaNotFound(path.to_path_buf()))
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_find_env_url() {
        let schema = "datasource db {\n  provider = \"postgresql\"\n  url      = env(\"DATABASE_URL\")\n}\n";
        assert_eq!(
            find_datasource_url(schema),
            Some(DatasourceUrl::Env("DATABASE_URL".into()))
        );
    }

    #[test]
    fn test_find_literal_url() {
        let schema = "generator client {\n  provider = \"torm\"\n}\n\
                      datasource db {\n  url = \"postgres://localhost/app\"\n}\n";
        assert_eq!(
            find_datasource_url(schema),
            Some(DatasourceUrl::Literal("postgres://localhost/app".into()))
        );
    }

    #[test]
    fn test_url_outside_datasource_is_ignored() {
        let schema = "generator client {\n  url = \"postgres://nope\"\n}\n";
        assert_eq!(find_datasource_url(schema), None);
    }

    #[test]
    fn test_override_wins() {
        let config = Config::new().database_url(Some("postgres://override".into()));
        let url = config
            .resolve_database_url("datasource db {\n  url = \"postgres://schema\"\n}\n")
            .unwrap();
        assert_eq!(url, "postgres://override");
    }

    #[test]
    fn test_missing_env_var_is_config_error() {
        let url = DatasourceUrl::Env("TORM_TEST_SURELY_UNSET_VARIABLE".into());
        assert!(matches!(url.resolve(), Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_no_datasource_is_config_error() {
        let err = Config::new()
            .resolve_database_url("model A {\n  id Int @id\n}\n")
            .unwrap_err();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn test_missing_schema_file() {
        let tmp = TempDir::new().unwrap();
        let config = Config::new().schema_path(tmp.path().join("schema.prisma"));
        assert!(matches!(
            config.read_schema(),
            Err(MigrateError::SchemaNotFound(_))
        ));
    }

    #[test]
    fn test_load_ast() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("schema.prisma");
        fs::write(&path, "model Author {\n  id String @id @db.Uuid\n}\n").unwrap();

        let ast = Config::new().schema_path(&path).load_ast().unwrap();
        assert_eq!(ast.entities[0].name, "Author");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.schema_path, PathBuf::from("prisma/schema.prisma"));
        assert_eq!(config.migrations_dir, PathBuf::from("migrations"));
        assert_eq!(config.out_dir, PathBuf::from("models"));
    }
}
