//! # Capability Lookup CLI (`caplook`)
//!
//! ```bash
//! caplook --config ./config/caplook.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `caplook init` | Create the SQLite database and schema |
//! | `caplook validate` | Check workbooks without indexing them |
//! | `caplook index` | Index workbooks into the vector store |
//! | `caplook stats` | Show store totals |
//! | `caplook files` | Show chunks per source workbook |
//! | `caplook search <query>` | Ranked capabilities with a generated overview |
//!
//! Every command accepts `--format json` for machine-readable output.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use capability_lookup::config::{self, Config};
use capability_lookup::embedding::{create_provider, DisabledProvider};
use capability_lookup::generation::create_generator;
use capability_lookup::ingest::{ingest_directory, IngestOptions};
use capability_lookup::search::{search, SearchOptions};
use capability_lookup::store::memory::InMemoryStore;
use capability_lookup::store::sqlite::SqliteStore;
use capability_lookup::{db, logging, migrate, render, stats, validate};

/// Capability Lookup: index capability workbooks and ask questions about them.
///
/// All commands read a TOML configuration file given by `--config`.
/// See `config/caplook.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "caplook",
    about = "Capability Lookup: semantic search over capability estimation workbooks",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/caplook.toml")]
    config: PathBuf,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Check every workbook for the capability sheet and a recognizable
    /// header without writing anything.
    Validate {
        /// Directory to scan instead of `[workbooks].root`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Index workbooks into the vector store.
    ///
    /// Re-indexing a workbook replaces its previous chunks.
    Index {
        /// Directory to scan instead of `[workbooks].root`.
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Delete every stored chunk before indexing.
        #[arg(long)]
        rebuild: bool,

        /// Count chunks without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show store statistics.
    Stats,

    /// List indexed workbooks with their chunk counts.
    Files,

    /// Search capabilities with a free-text question.
    Search {
        /// The question; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Maximum number of matches (defaults to `[retrieval].top_k`).
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        limit: Option<u64>,

        /// Also generate a short summary for every match.
        #[arg(long)]
        summaries: bool,
    },
}

#[derive(Serialize)]
struct InitOutput {
    status: &'static str,
    database_path: String,
}

fn emit<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => print!("{}", text(value)),
    }
    Ok(())
}

async fn open_store(cfg: &Config) -> Result<SqliteStore> {
    let pool = db::connect(cfg).await?;
    migrate::create_schema(&pool).await?;
    Ok(SqliteStore::new(pool))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            let output = InitOutput {
                status: "ok",
                database_path: cfg.db.path.display().to_string(),
            };
            emit(cli.format, &output, |_| {
                "Database initialized successfully.\n".to_string()
            })?;
        }
        Commands::Validate { dir } => {
            let dir = dir.unwrap_or_else(|| cfg.workbooks.root.clone());
            let report = validate::validate_directory(&dir, &cfg.workbooks);
            emit(cli.format, &report, render::validation_report)?;
        }
        Commands::Index {
            dir,
            rebuild,
            dry_run,
        } => {
            let dir = dir.unwrap_or_else(|| cfg.workbooks.root.clone());
            let options = IngestOptions { rebuild, dry_run };

            let report = if dry_run {
                let scratch = InMemoryStore::new();
                ingest_directory(&cfg, &dir, options, &DisabledProvider, &scratch).await?
            } else {
                if !cfg.embedding.is_enabled() {
                    bail!(
                        "Indexing requires an embedding provider. Set [embedding] provider \
                         (hash, openai, or ollama) in {}",
                        cli.config.display()
                    );
                }
                let embedder = create_provider(&cfg.embedding)?;
                let store = open_store(&cfg).await?;
                let report =
                    ingest_directory(&cfg, &dir, options, embedder.as_ref(), &store).await?;
                store.pool().close().await;
                report
            };
            emit(cli.format, &report, render::ingest_report)?;
        }
        Commands::Stats => {
            let store = open_store(&cfg).await?;
            let summary = stats::collect_stats(&cfg, &store).await?;
            store.pool().close().await;
            emit(cli.format, &summary, render::store_stats)?;
        }
        Commands::Files => {
            let store = open_store(&cfg).await?;
            let files = stats::list_files(&store).await?;
            store.pool().close().await;
            emit(cli.format, &files, |f| render::file_inventory(f))?;
        }
        Commands::Search {
            query,
            limit,
            summaries,
        } => {
            let query = query.join(" ");
            let options = SearchOptions {
                limit: limit.map(|l| l as usize).unwrap_or(cfg.retrieval.top_k),
                summaries,
            };
            let embedder = create_provider(&cfg.embedding)?;
            let generator = create_generator(&cfg.generation)?;
            let store = open_store(&cfg).await?;
            let result = search(
                &cfg,
                &query,
                options,
                embedder.as_ref(),
                generator.as_ref(),
                &store,
            )
            .await;
            store.pool().close().await;
            emit(cli.format, &result, render::query_result)?;
        }
    }

    Ok(())
}
