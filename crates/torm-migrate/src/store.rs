//! The on-disk migration directory.
//!
//! Migrations are pairs of files named `NNNN_<name>.up.sql` and
//! `NNNN_<name>.down.sql`, where `NNNN` is the version zero-padded to at least
//! four digits. Files are append-only: the engine never rewrites or deletes
//! a past migration.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MigrateError, Result};

static MIGRATION_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)_(.+)\.(up|down)\.sql$").expect("Invalid migration filename regex")
});

#[cfg(unix)]
const FILE_MODE: u32 = 0o644;
#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// Which half of a migration pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The forward script.
    Up,
    /// The reverse script.
    Down,
}

impl Direction {
    /// File suffix for this direction (without the `.sql` extension).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete migration pair loaded from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Migration {
    /// Version number (≥ 1 for engine-written files).
    pub version: i64,
    /// Human name taken from the filename.
    pub name: String,
    /// Forward script.
    pub up: String,
    /// Reverse script.
    pub down: String,
}

impl Migration {
    /// The shared filename stem, e.g. `0002_Book`.
    #[must_use]
    pub fn stem(&self) -> String {
        file_stem(self.version, &self.name)
    }

    /// Returns the script for `direction`.
    #[must_use]
    pub fn script(&self, direction: Direction) -> &str {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }
}

/// What the stub generator needs to know about existing files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StubIndex {
    /// Names that already have an `.up.sql` file (entity or join-table names).
    pub stubbed: BTreeSet<String>,
    /// Highest version found among `.up.sql` files, 0 when none.
    pub max_version: i64,
}

impl StubIndex {
    /// Returns true if `name` already has a stub.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.stubbed.contains(name)
    }
}

/// Formats `NNNN_<name>`.
#[must_use]
pub fn file_stem(version: i64, name: &str) -> String {
    format!("{version:04}_{name}")
}

/// A filename split into its parts; `None` for files the store ignores.
fn parse_file_name(file_name: &str) -> Option<(i64, &str, Direction)> {
    let caps = MIGRATION_FILE.captures(file_name)?;
    let version = caps.get(1)?.as_str().parse::<i64>().ok()?;
    let name = caps.get(2)?.as_str();
    let direction = match caps.get(3)?.as_str() {
        "up" => Direction::Up,
        _ => Direction::Down,
    };
    Some((version, name, direction))
}

#[derive(Default)]
struct PartialMigration {
    name: String,
    up: Option<String>,
    down: Option<String>,
}

/// A directory of migration pairs.
#[derive(Debug, Clone)]
pub struct MigrationStore {
    dir: PathBuf,
}

impl MigrationStore {
    /// Creates a store rooted at `dir`. The directory need not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory path.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lists regular files in the directory, sorted by name. A missing
    /// directory lists as empty.
    fn file_names(&self) -> Result<Vec<(String, PathBuf)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push((name.to_string(), entry.path()));
            }
        }
        names.sort();
        Ok(names)
    }

    /// Loads every complete migration, sorted by version ascending.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, on a version with only one script, and on two
    /// files claiming the same version and direction.
    pub fn load(&self) -> Result<Vec<Migration>> {
        let mut grouped: BTreeMap<i64, PartialMigration> = BTreeMap::new();

        for (file_name, path) in self.file_names()? {
            let Some((version, name, direction)) = parse_file_name(&file_name) else {
                continue;
            };
            let contents = fs::read_to_string(&path)?;
            let entry = grouped.entry(version).or_insert_with(|| PartialMigration {
                name: name.to_string(),
                ..PartialMigration::default()
            });
            let slot = match direction {
                Direction::Up => &mut entry.up,
                Direction::Down => &mut entry.down,
            };
            if slot.is_some() {
                return Err(MigrateError::DuplicateMigration {
                    version,
                    direction,
                    path,
                });
            }
            *slot = Some(contents);
        }

        let mut migrations = Vec::with_capacity(grouped.len());
        for (version, partial) in grouped {
            match (partial.up, partial.down) {
                (Some(up), Some(down)) => migrations.push(Migration {
                    version,
                    name: partial.name,
                    up,
                    down,
                }),
                (up, _) => {
                    let present = if up.is_some() { Direction::Up } else { Direction::Down };
                    return Err(MigrateError::IncompleteMigration {
                        version,
                        name: partial.name,
                        missing: present.opposite(),
                    });
                }
            }
        }

        debug!(dir = %self.dir.display(), count = migrations.len(), "Loaded migrations");
        Ok(migrations)
    }

    /// Scans `.up.sql` filenames for stubbed names and the highest version.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors other than a missing directory.
    pub fn stub_index(&self) -> Result<StubIndex> {
        let mut index = StubIndex::default();
        for (file_name, _) in self.file_names()? {
            if let Some((version, name, Direction::Up)) = parse_file_name(&file_name) {
                index.stubbed.insert(name.to_string());
                index.max_version = index.max_version.max(version);
            }
        }
        Ok(index)
    }

    /// Writes a new migration pair, creating the directory if needed.
    /// Returns the two paths written (up, down).
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::StubWrite`] naming the file that failed.
    /// Existing files are never overwritten.
    pub fn write_pair(
        &self,
        version: i64,
        name: &str,
        up: &str,
        down: &str,
    ) -> Result<(PathBuf, PathBuf)> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);
        builder
            .create(&self.dir)
            .map_err(|source| MigrateError::StubWrite {
                path: self.dir.clone(),
                source,
            })?;

        let stem = file_stem(version, name);
        let up_path = self.dir.join(format!("{stem}.up.sql"));
        let down_path = self.dir.join(format!("{stem}.down.sql"));
        write_new_file(&up_path, up)?;
        write_new_file(&down_path, down)?;

        info!(version, name = %name, "Generated migration stubs");
        Ok((up_path, down_path))
    }
}

fn write_new_file(path: &Path, contents: &str) -> Result<()> {
    let to_error = |source| MigrateError::StubWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);
    let mut file = options.open(path).map_err(to_error)?;
    file.write_all(contents.as_bytes()).map_err(to_error)
}
