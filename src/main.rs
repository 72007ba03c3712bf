//! # Car Benchmarking CLI (`carbench`)
//!
//! The `carbench` binary builds the vector index from a car dataset, answers
//! questions against it, and serves the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! carbench --config ./config/carbench.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `carbench init` | Create the index database and schema |
//! | `carbench ingest` | Rebuild the collection from the dataset |
//! | `carbench retrieve "<query>"` | Print the context retrieved for a query |
//! | `carbench ask "<query>"` | Answer a question |
//! | `carbench stats` | Describe the collection |
//! | `carbench backend` | Show which generation backend would be used |
//! | `carbench serve` | Start the HTTP API |
//!
//! If the config file does not exist, built-in defaults are used.
//! Logs go to stderr (`RUST_LOG` overrides the filter); results go to stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use carbench::config::{self, Config, Credentials};
use carbench::dataset::load_records;
use carbench::embedding::create_provider;
use carbench::generation::select_backend;
use carbench::ingest::Indexer;
use carbench::progress::ProgressMode;
use carbench::rag::RagPipeline;
use carbench::search::Retriever;
use carbench::server;
use carbench::sqlite_store::SqliteStore;
use carbench::stats;

/// Car Benchmarking: question answering over car specifications.
#[derive(Parser)]
#[command(
    name = "carbench",
    about = "Car Benchmarking: retrieval-augmented question answering over car specifications",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/carbench.toml")]
    config: PathBuf,

    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the index database schema. Idempotent.
    Init,

    /// Rebuild the collection from the dataset.
    ///
    /// The previous collection of the same name is discarded.
    Ingest {
        /// Dataset file (`.csv`, `.json`, `.jsonl`). Overrides `[dataset].path`.
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Progress output on stderr. Defaults to `human` on a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Print the context bundle retrieved for a query.
    Retrieve {
        query: String,

        /// Number of documents to retrieve. Defaults to `[retrieval].top_k`.
        #[arg(long)]
        k: Option<usize>,
    },

    /// Answer a question from the indexed data.
    Ask { query: String },

    /// Show collection statistics.
    Stats,

    /// Show the generation backend selected by the current credentials.
    Backend,

    /// Start the HTTP API.
    Serve,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "carbench=debug,info"
    } else {
        "carbench=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = load(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = SqliteStore::open(&cfg.index.path).await?;
            store.close().await;
            println!("Index initialized at {}.", cfg.index.path.display());
        }
        Commands::Ingest { dataset, progress } => {
            let path = dataset.unwrap_or_else(|| cfg.dataset.path.clone());
            let records = load_records(&path)
                .with_context(|| format!("failed to load dataset {}", path.display()))?;

            let store = Arc::new(SqliteStore::open(&cfg.index.path).await?);
            let embedder = create_provider(&cfg.embedding, &Credentials::from_env())?;
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);

            let indexer = Indexer::from_config(&cfg, store.clone(), embedder)
                .with_progress(progress.reporter());
            let count = indexer.reindex(records).await?;
            store.close().await;

            println!(
                "Indexed {} documents into collection '{}'.",
                count, cfg.index.collection
            );
        }
        Commands::Retrieve { query, k } => {
            let store = Arc::new(SqliteStore::open(&cfg.index.path).await?);
            let embedder = create_provider(&cfg.embedding, &Credentials::from_env())?;
            let retriever = Retriever::new(store, embedder, cfg.index.collection.clone());

            let bundle = retriever
                .retrieve(&query, k.unwrap_or(cfg.retrieval.top_k))
                .await?;
            println!("{}", bundle);
        }
        Commands::Ask { query } => {
            let store = Arc::new(SqliteStore::open(&cfg.index.path).await?);
            let embedder = create_provider(&cfg.embedding, &Credentials::from_env())?;
            let pipeline = RagPipeline::from_config(&cfg, store, embedder);

            let answer = pipeline.answer(&query).await?;
            println!("{}", answer);
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Backend => {
            let backend = select_backend(&Credentials::from_env());
            println!("{}", backend);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
