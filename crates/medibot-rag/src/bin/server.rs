//! Chat server binary
//!
//! Run with: cargo run -p medibot-rag --bin medibot-server

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use medibot_rag::{
    config::{ApiKeys, RagConfig},
    providers::{open_index, OnnxEmbedder, OpenAiChat},
    server::{state::AppState, RagServer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Medical chatbot web server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medibot_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = RagConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.backend);
    tracing::info!("  - Index: {}", config.vector_db.index_name);
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!("  - Top k: {}", config.retrieval.top_k);

    let keys = ApiKeys::from_env(config.backend, true)?;
    let openai_key = keys
        .openai
        .clone()
        .context("OPENAI_API_KEY is required by the server")?;

    let embedder = Arc::new(
        OnnxEmbedder::new(&config.embeddings)
            .await
            .context("initializing embedder")?,
    );
    let index = open_index(&config, &keys)?;
    let llm = Arc::new(OpenAiChat::new(openai_key, &config.llm)?);

    let state = AppState::new(config, embedder, index, llm)
        .await
        .context("validating vector index")?;
    let server = RagServer::new(state);

    println!("\nServer starting...");
    println!("  Chat:   http://{}/", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
