//! Core types for the chatbot

pub mod document;
pub mod record;

pub use document::{Chunk, Metadata, MinimalDocument, RawDocument};
pub use record::{IndexRecord, IndexSpec, Metric, ScoredRecord};
