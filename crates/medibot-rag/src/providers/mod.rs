//! Provider abstractions for embeddings, chat completion and vector storage
//!
//! Trait seams let the ingestion pipeline and the query flow run against
//! Pinecone and OpenAI in production, or the local index in offline runs.

pub mod embedding;
pub mod llm;
pub mod local;
pub mod onnx;
pub mod openai;
pub mod pinecone;
pub mod retry;
pub mod vector_store;

use std::sync::Arc;

use crate::config::{ApiKeys, BackendProvider, RagConfig};
use crate::error::{Error, Result};

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use local::LocalIndex;
pub use onnx::OnnxEmbedder;
pub use openai::OpenAiChat;
pub use pinecone::PineconeIndex;
pub use retry::RetryPolicy;
pub use vector_store::VectorIndex;

/// Open the configured vector index backend
pub fn open_index(config: &RagConfig, keys: &ApiKeys) -> Result<Arc<dyn VectorIndex>> {
    match config.backend {
        BackendProvider::Pinecone => {
            let api_key = keys
                .pinecone
                .as_deref()
                .ok_or_else(|| Error::config("Pinecone backend requires PINECONE_API_KEY"))?;
            Ok(Arc::new(PineconeIndex::new(api_key, &config.vector_db)?))
        }
        BackendProvider::Local => Ok(Arc::new(LocalIndex::open(&config.vector_db.local_path)?)),
    }
}
