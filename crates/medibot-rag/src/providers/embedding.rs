//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for generating text embeddings
///
/// Implementations:
/// - `OnnxEmbedder`: local sentence-transformers model (all-MiniLM-L6-v2)
///
/// One instance is built at process start and shared by the ingestion
/// pipeline and the query flow, so both sides embed with the same model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts, same length and order as the input
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("Empty embedding result"))
    }

    /// Get embedding dimensions (384 for all-MiniLM-L6-v2)
    fn dimensions(&self) -> usize;

    /// Identifier of the model, recorded on the index
    fn model_id(&self) -> &str;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Check that a batch result matches the request shape
pub fn check_batch(expected_len: usize, dimensions: usize, embeddings: &[Vec<f32>]) -> Result<()> {
    if embeddings.len() != expected_len {
        return Err(Error::embedding(format!(
            "Got {} embeddings for {} inputs",
            embeddings.len(),
            expected_len
        )));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(Error::embedding(format!(
            "Embedding has {} dimensions, expected {}",
            bad.len(),
            dimensions
        )));
    }
    Ok(())
}
