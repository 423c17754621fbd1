//! Records stored in and returned from the vector index

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::document::{Chunk, Metadata};

/// Metadata key the chunk text is stored under in the index
pub const TEXT_KEY: &str = "text";

/// Similarity metric declared on the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Dotproduct => "dotproduct",
        }
    }
}

/// Declared schema of a vector index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name
    pub name: String,
    /// Vector dimension, equal to the embedder's output dimension
    pub dimension: usize,
    /// Similarity metric
    pub metric: Metric,
    /// Embedding model the index was populated with
    pub embedding_model: Option<String>,
}

impl IndexSpec {
    /// Cosine index for the given model
    pub fn cosine(name: impl Into<String>, dimension: usize, embedding_model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: Metric::Cosine,
            embedding_model: Some(embedding_model.into()),
        }
    }
}

/// One chunk paired with its embedding, ready for upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Record identifier, stable across re-ingestion
    pub id: String,
    /// Chunk text
    pub text: String,
    /// Chunk metadata
    pub metadata: Metadata,
    /// Embedding vector
    pub values: Vec<f32>,
}

impl IndexRecord {
    /// Pair a chunk with its embedding
    pub fn from_chunk(chunk: &Chunk, values: Vec<f32>) -> Self {
        Self {
            id: record_id(chunk),
            text: chunk.text.clone(),
            metadata: chunk.metadata(),
            values,
        }
    }

    /// Metadata as written to the index, including the text
    pub fn stored_metadata(&self) -> Metadata {
        let mut metadata = self.metadata.clone();
        metadata.insert(TEXT_KEY.to_string(), serde_json::json!(self.text));
        metadata
    }
}

/// A record returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Similarity score, higher is more similar
    pub score: f32,
}

impl ScoredRecord {
    /// Rebuild from stored metadata, splitting the text back out
    pub fn from_stored(id: String, score: f32, mut metadata: Metadata) -> Self {
        let text = match metadata.remove(TEXT_KEY) {
            Some(serde_json::Value::String(text)) => text,
            _ => String::new(),
        };
        Self {
            id,
            text,
            metadata,
            score,
        }
    }
}

/// Deterministic record id from source, position and content
pub fn record_id(chunk: &Chunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk.source.as_bytes());
    hasher.update([0u8]);
    hasher.update(chunk.chunk_index.to_le_bytes());
    hasher.update([0u8]);
    hasher.update(chunk.text.as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(32);
    id
}
