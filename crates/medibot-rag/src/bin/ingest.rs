//! Ingestion binary: index every PDF under the data directory
//!
//! Run with: cargo run -p medibot-rag --bin medibot-ingest -- --data-dir data/

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use medibot_rag::{
    config::{ApiKeys, RagConfig},
    ingestion::IngestPipeline,
    providers::{open_index, OnnxEmbedder},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Load PDFs, embed their chunks and upsert them into the vector index
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory scanned for PDFs (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Abort on the first unreadable PDF
    #[arg(long)]
    fail_fast: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medibot_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = args.data_dir {
        config.ingestion.data_dir = dir;
    }
    if args.fail_fast {
        config.ingestion.fail_fast = true;
    }

    let keys = ApiKeys::from_env(config.backend, false)?;

    let embedder = Arc::new(
        OnnxEmbedder::new(&config.embeddings)
            .await
            .context("initializing embedder")?,
    );
    let index = open_index(&config, &keys)?;

    let start = Instant::now();
    let pipeline = IngestPipeline::new(&config, embedder, index)?;
    let report = pipeline
        .run(&config.ingestion.data_dir)
        .await
        .with_context(|| format!("ingesting {}", config.ingestion.data_dir.display()))?;

    println!(
        "Indexed {} chunks from {} pages into '{}' in {:.1}s{}",
        report.upserted,
        report.documents,
        config.vector_db.index_name,
        start.elapsed().as_secs_f64(),
        if report.index_created { " (index created)" } else { "" }
    );

    Ok(())
}
