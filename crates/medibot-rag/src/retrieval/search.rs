//! Similarity search over the vector index

use std::sync::Arc;

use crate::error::Result;
use crate::providers::{EmbeddingProvider, VectorIndex};
use crate::types::ScoredRecord;

/// Embeds a question and fetches the most similar chunks
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Return at most `top_k` records, most similar first
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredRecord>> {
        let vector = self.embedder.embed(question).await?;
        let records = self.index.query(&vector, self.top_k).await?;
        tracing::debug!(
            "Retrieved {} records (top score {:?})",
            records.len(),
            records.first().map(|r| r.score)
        );
        Ok(records)
    }
}
