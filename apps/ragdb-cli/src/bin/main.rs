use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use ragdb_core::config::{Config, RagConfig};
use ragdb_hybrid::manifest::{self, LoadOutcome};
use ragdb_hybrid::{PipelineComponents, PipelineRegistry, RetrievalPipeline};
use tracing_subscriber::EnvFilter;

/// Hybrid document retrieval over local files
#[derive(Parser, Debug)]
#[command(name = "ragdb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Index local documents and query them with vector + BM25 search", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(global = true, long = "verbose", short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build (or load) the database for the configured or given paths
    Index {
        /// Files or directories to index instead of `rag.document_paths`
        #[arg(value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Rebuild even if a matching database exists
        #[arg(long = "force")]
        force: bool,

        /// Show an embedding progress bar
        #[arg(long = "progress")]
        progress: bool,
    },

    /// Search the database and print the best chunks
    Query {
        #[arg(value_name = "TEXT")]
        text: String,

        /// Search only this file or directory (kept in its own database)
        #[arg(long = "doc-path")]
        doc_path: Option<PathBuf>,
    },

    /// Show configuration and what is stored on disk
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let rag = config.rag().context("invalid [rag] configuration")?;

    match cli.command {
        Commands::Index { paths, force, progress } => cmd_index(rag, paths, force, progress).await,
        Commands::Query { text, doc_path } => cmd_query(rag, &text, doc_path.as_deref()).await,
        Commands::Status => cmd_status(&rag),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

async fn cmd_index(mut rag: RagConfig, paths: Vec<PathBuf>, force: bool, progress: bool) -> anyhow::Result<()> {
    if !paths.is_empty() {
        rag.document_paths = paths.iter().map(|p| p.to_string_lossy().to_string()).collect();
    }
    rag.force_reindex |= force;
    rag.show_progress |= progress;

    println!("Document paths: {}", rag.document_paths.join(", "));
    println!("Database: {}", rag.persist_dir);
    let components = PipelineComponents::from_config(&rag)?;
    let pipeline = RetrievalPipeline::open(rag, components).await?;
    println!("\n✅ Database ready ({} chunks)", pipeline.len());
    println!("💡 To search, use: ragdb query '<text>'");
    Ok(())
}

async fn cmd_query(rag: RagConfig, text: &str, doc_path: Option<&Path>) -> anyhow::Result<()> {
    let registry = PipelineRegistry::new(rag);
    println!("{}", registry.search(text, doc_path).await);
    Ok(())
}

fn cmd_status(rag: &RagConfig) -> anyhow::Result<()> {
    println!("Document paths: {}", rag.document_paths.join(", "));
    println!("Database: {}", rag.persist_dir);
    println!(
        "Retrieval: top_k={} rerank_top_k={} fusion={:?} metric={:?} rerank={}",
        rag.top_k, rag.rerank_top_k, rag.fusion, rag.distance_metric, rag.rerank_enabled
    );

    match manifest::load(Path::new(&rag.persist_dir), &rag.document_paths) {
        Ok(LoadOutcome::Loaded(stored)) => {
            println!("📊 {} chunks stored", stored.docs.len());
            if let Some(created_at) = stored.created_at {
                println!("Indexed at: {}", created_at.to_rfc3339());
            }
            if let Some(model) = stored.embed_model {
                println!("Embedding model: {}", model);
            }
        }
        Ok(LoadOutcome::Missing) => println!("⚠️  No database yet, run `ragdb index`"),
        Ok(LoadOutcome::LegacyFormat) => println!("⚠️  Legacy database format, the next run reindexes"),
        Ok(LoadOutcome::PathMismatch { cached, .. }) => {
            println!("⚠️  Database was built for other paths ({}), the next run reindexes", cached.join(", "))
        }
        Err(e) => println!("⚠️  Database unreadable ({}), the next run reindexes", e),
    }
    Ok(())
}
