//! medibot-rag: retrieval-augmented medical chatbot
//!
//! Two processes share this crate. `medibot-ingest` loads PDFs, splits them
//! into overlapping chunks, embeds them locally with ONNX Runtime and upserts
//! them into a vector index. `medibot-server` answers questions over HTTP by
//! retrieving the closest chunks and handing them to a chat-completion model.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::RagChain;
pub use ingestion::{IngestPipeline, IngestReport};
pub use types::{Chunk, IndexRecord, MinimalDocument, RawDocument, ScoredRecord};
