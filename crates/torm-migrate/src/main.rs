//! torm CLI
//!
//! Command-line tool for schema migrations and client code generation.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use torm_migrate::config::{
    Config, DEFAULT_MIGRATIONS_DIR, DEFAULT_OUT_DIR, DEFAULT_SCHEMA_PATH,
};
use torm_migrate::prelude::*;

/// Schema-driven PostgreSQL toolkit.
#[derive(Parser)]
#[command(name = "torm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Schema file.
    #[arg(long, global = true, default_value = DEFAULT_SCHEMA_PATH)]
    schema: PathBuf,

    /// Migrations directory.
    #[arg(long, global = true, default_value = DEFAULT_MIGRATIONS_DIR)]
    dir: PathBuf,

    /// Output directory for generated code.
    #[arg(long, global = true, default_value = DEFAULT_OUT_DIR)]
    out: PathBuf,

    /// Database URL; overrides the schema's datasource.
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage database migrations.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },

    /// Regenerate client code from the schema (no database access).
    Generate,
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Generate stubs for schema changes, apply them and regenerate code.
    Dev,

    /// Apply committed migrations only.
    Deploy,

    /// Roll back every applied migration, then apply all.
    Reset,

    /// Roll back the newest applied migration.
    Down,

    /// Show migration status.
    Status {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn generate_code(config: &Config, ast: &torm_core::Ast) -> anyhow::Result<()> {
    let written = torm_core::codegen::write_to(&config.out_dir, ast)
        .with_context(|| format!("failed to write code to {}", config.out_dir.display()))?;
    for path in written {
        println!("Generated {}", path.display());
    }
    Ok(())
}

async fn migrate(config: &Config, action: MigrateAction) -> anyhow::Result<()> {
    let schema = config.read_schema()?;
    // Parse before connecting so schema errors never touch the database.
    let ast = matches!(action, MigrateAction::Dev)
        .then(|| torm_core::parse_schema(&schema))
        .transpose()
        .map_err(MigrateError::from)?;
    let url = config.resolve_database_url(&schema)?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .context("failed to connect to database")?;
    let mut manager = MigrationManager::new(pool, MigrationStore::new(&config.migrations_dir))?;

    match action {
        MigrateAction::Dev => {
            let ast = ast.context("schema was not parsed")?;
            let applied = manager.dev(&ast).await?;
            report_applied(&applied);
            generate_code(config, &ast)?;
        }
        MigrateAction::Deploy => {
            let applied = manager.deploy().await?;
            report_applied(&applied);
        }
        MigrateAction::Reset => {
            let applied = manager.reset().await?;
            report_applied(&applied);
        }
        MigrateAction::Down => match manager.down().await? {
            Some(version) => println!("Rolled back version {version}"),
            None => println!("No migrations to roll back."),
        },
        MigrateAction::Status { json } => {
            let report = manager.status().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
    }

    Ok(())
}

fn report_applied(applied: &[i64]) {
    if applied.is_empty() {
        println!("Database is up to date.");
    } else {
        for version in applied {
            println!("Applied version {version}");
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::new()
        .schema_path(cli.schema)
        .migrations_dir(cli.dir)
        .out_dir(cli.out)
        .database_url(cli.database_url);

    match cli.command {
        Commands::Migrate { action } => migrate(&config, action).await,
        Commands::Generate => {
            let ast = config.load_ast()?;
            generate_code(&config, &ast)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    dotenvy::dotenv().ok();

    tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted; the database may be left at a partially applied version");
            bail!("interrupted")
        }
    }
}
