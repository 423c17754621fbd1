//! Application state for the chat server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::RagChain;
use crate::ingestion::verify_index;
use crate::providers::{EmbeddingProvider, LlmProvider, VectorIndex};
use crate::retrieval::Retriever;
use crate::types::IndexSpec;

/// Shared application state, read-only after startup
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Question answering chain
    chain: RagChain,
}

impl AppState {
    /// Create state after checking the index was built with this embedder
    pub async fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let expected = IndexSpec::cosine(
            &config.vector_db.index_name,
            embedder.dimensions(),
            embedder.model_id(),
        );
        verify_index(index.as_ref(), &expected).await?;

        tracing::info!(
            "Serving index '{}' via {} (embedder {}, llm {} {}, top_k {})",
            config.vector_db.index_name,
            index.name(),
            embedder.model_id(),
            llm.name(),
            llm.model(),
            config.retrieval.top_k
        );

        let retriever = Retriever::new(embedder, index, config.retrieval.top_k);
        let chain = RagChain::new(retriever, llm);

        Ok(Self {
            inner: Arc::new(AppStateInner { config, chain }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the answer chain
    pub fn chain(&self) -> &RagChain {
        &self.inner.chain
    }
}
