//! Vector index trait for storing and searching embeddings

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{IndexRecord, IndexSpec, ScoredRecord};

/// Trait for the vector database boundary
///
/// Implementations:
/// - `PineconeIndex`: managed Pinecone serverless index
/// - `LocalIndex`: JSON file on disk with exact cosine search
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Whether the configured index exists
    async fn index_exists(&self) -> Result<bool>;

    /// Declared schema of the index, `None` when it does not exist
    async fn describe_index(&self) -> Result<Option<IndexSpec>>;

    /// Create the index with the given schema
    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    /// Write records in one request, returning how many were written
    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize>;

    /// Return the `top_k` records most similar to `vector`, best first
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
