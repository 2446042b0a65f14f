//! # docq CLI
//!
//! The `docq` binary drives the pipeline end to end. All commands accept a
//! `--config` flag pointing to a TOML configuration file.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docq extract` | Run the extraction cascade over the configured PDF directory |
//! | `docq index` | Chunk and embed text artifacts, rebuild the vector collection |
//! | `docq ingest` | Extract then index in one run |
//! | `docq ask "<question>"` | Answer a question against the indexed corpus |
//!
//! ## Examples
//!
//! ```bash
//! # Extract text from every PDF under [ingest].pdf_dir
//! docq extract --config ./config/docq.toml
//!
//! # Rebuild the vector collection from the extracted text
//! docq index --config ./config/docq.toml
//!
//! # Ask a question with a larger retrieval window
//! docq ask "Which filings mention liquidity risk?" --top-k 8
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docq::{ask, cascade, config, index_cmd};

/// docq — a cascading PDF text-extraction and retrieval-backed question
/// answering pipeline.
#[derive(Parser)]
#[command(
    name = "docq",
    about = "docq — cascading PDF extraction and retrieval-backed question answering",
    version,
    long_about = "docq ingests PDF documents through a cascade of increasingly expensive \
    extraction strategies (structure parse, repair and re-parse, alternative parser, OCR), \
    chunks and embeds the text into a vector collection, and answers natural-language \
    questions grounded in the retrieved chunks."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docq.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the extraction cascade over the configured PDF directory.
    ///
    /// Writes one text artifact per successfully extracted document and
    /// appends one failure-log line per document every strategy gave up on.
    /// A failing document never stops the batch.
    Extract {
        /// Maximum number of documents to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Rebuild the vector collection from the extracted text artifacts.
    ///
    /// Destructive: drops the existing collection, recreates it with the
    /// embedding model's dimensionality and cosine distance, and bulk-loads
    /// every chunk.
    Index,

    /// Extract then index in one run.
    Ingest {
        /// Maximum number of documents to extract.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a question against the indexed corpus.
    ///
    /// Embeds the question, retrieves the nearest chunks, and asks the
    /// generation service for a grounded answer. Collaborator failures are
    /// reported as readable messages.
    Ask {
        /// The question to answer.
        question: String,

        /// Number of chunks to retrieve (overrides retrieval.top_k).
        #[arg(long)]
        top_k: Option<usize>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Extract { limit } => {
            cascade::run_extract(&cfg, limit).await?;
        }
        Commands::Index => {
            index_cmd::run_index(&cfg).await?;
        }
        Commands::Ingest { limit } => {
            index_cmd::run_ingest(&cfg, limit).await?;
        }
        Commands::Ask { question, top_k } => {
            if let Some(k) = top_k {
                cfg.retrieval.top_k = k;
            }
            ask::run_ask(&cfg, &question).await?;
        }
    }

    Ok(())
}
