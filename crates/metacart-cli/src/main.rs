//! Metacart command line interface
//!
//! Two subcommands, one per pipeline: `export` drives the catalog export
//! (login, job launch, poll, download) and prints the downloaded filename
//! to stdout for shell chaining; `load` lands spreadsheet files in the
//! configured warehouse.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use metacart_core::{Config, Dialect};
use metacart_export::{poll_until_complete, IdmcClient, DEFAULT_POLL_INTERVAL};
use metacart_load::{
    find_input_file, resolve_inputs, LoadOptions, LoadSession, PostgresExecutor,
};

/// Metacart - catalog export and spreadsheet warehouse load
#[derive(Parser)]
#[command(name = "metacart")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: metacart.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the metadata catalog and download the artifact
    Export,

    /// Load spreadsheet files (or a zip of them) into the warehouse
    Load {
        /// Input file, overriding the configured input path
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up a local .env before reading anything else.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting metacart");

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from("metacart.toml"));
    if cli.verbose {
        eprintln!(
            "{} {}",
            "Loading config from:".cyan(),
            config_path.display()
        );
    }
    let config = Config::from_file(&config_path)
        .with_context(|| format!("cannot load config {}", config_path.display()))?;

    match cli.command {
        Commands::Export => export_command(&config).await,
        Commands::Load { input } => load_command(&config, input).await,
    }
}

/// Export command - run the catalog export pipeline end to end
async fn export_command(config: &Config) -> Result<()> {
    let idmc = config.idmc()?;

    let client = IdmcClient::new(&idmc.pod);
    let session = client.login(&idmc.username, &idmc.password).await?;
    let token = client.mint_token(&session).await?;

    let job = client
        .start_export(&session.org_id, &token, &idmc.query, &idmc.export_filename)
        .await?;

    let mut handle = client.job(&session.org_id, &token, &job.job_id);
    poll_until_complete(&mut handle, DEFAULT_POLL_INTERVAL).await?;

    let path = client
        .download_export(&session.org_id, &token, &job.output_uri, &idmc.export_filename)
        .await?;

    eprintln!("{} {}", "Export complete:".green(), path.display());
    // The filename goes to stdout so callers can capture it.
    println!("{}", path.display());
    Ok(())
}

/// Load command - resolve the input and load every sheet
async fn load_command(config: &Config, input: Option<PathBuf>) -> Result<()> {
    let db = config.database()?;

    let input_path = resolve_input_path(config, input)?;
    tracing::info!(input = %input_path.display(), "loading input");

    let resolved = resolve_inputs(&input_path)?;
    if resolved.files.is_empty() {
        eprintln!("{}", "No spreadsheet files to load.".yellow());
        return Ok(());
    }

    let executor = match db.db_type {
        Dialect::Postgres => PostgresExecutor::connect(&db.url, &db.user, &db.password).await?,
        other => bail!(
            "no bundled driver for '{}'; only the postgres driver ships with metacart",
            other
        ),
    };

    let mut session = LoadSession::new(
        executor,
        LoadOptions {
            dialect: db.db_type,
            schema: db.schema.clone(),
            drop_tables: db.drop_table,
            truncate_tables: db.truncate_table,
            debug: config.app.debug,
        },
    );
    session.load_files(&resolved.files).await?;

    eprintln!(
        "{} {} file(s)",
        "Load complete:".green(),
        resolved.files.len()
    );
    Ok(())
}

/// The explicit CLI argument wins over the configured base path
fn resolve_input_path(config: &Config, input: Option<PathBuf>) -> Result<PathBuf> {
    match input {
        Some(path) => {
            if !Path::new(&path).is_file() {
                bail!("input file '{}' does not exist", path.display());
            }
            Ok(path)
        }
        None => {
            let base = config.app.input_path.as_deref().ok_or_else(|| {
                anyhow::anyhow!(
                    "no input path: set [app] input_path in the config or pass one as an argument"
                )
            })?;
            Ok(find_input_file(base)?)
        }
    }
}
