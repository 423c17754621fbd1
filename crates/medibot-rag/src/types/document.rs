//! Document and chunk types flowing through the ingestion pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key identifying the originating file
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the 0-based page index
pub const PAGE_KEY: &str = "page";
/// Metadata key holding the page count of the originating file
pub const TOTAL_PAGES_KEY: &str = "total_pages";

/// String-keyed scalar metadata
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// One page of loaded PDF text with loader metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Extracted text
    pub text: String,
    /// Loader metadata (`source`, `page`, `total_pages`)
    pub metadata: Metadata,
}

impl RawDocument {
    /// Create a document for one page of a file
    pub fn page(text: String, source: &str, page: u32, total_pages: u32) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), serde_json::json!(source));
        metadata.insert(PAGE_KEY.to_string(), serde_json::json!(page));
        metadata.insert(TOTAL_PAGES_KEY.to_string(), serde_json::json!(total_pages));
        Self { text, metadata }
    }

    /// The `source` metadata value, if it is a string
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(|v| v.as_str())
    }
}

/// A document whose metadata has been narrowed to `source`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalDocument {
    /// Text, identical to the originating raw document
    pub text: String,
    /// Originating file path
    pub source: String,
}

impl MinimalDocument {
    /// Metadata view: exactly `{ "source": ... }`
    pub fn metadata(&self) -> Metadata {
        source_metadata(&self.source)
    }
}

/// A bounded slice of a document's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text, a contiguous substring of the document
    pub text: String,
    /// Originating file path, shared by every chunk of a document
    pub source: String,
    /// Position of the chunk within its document
    pub chunk_index: u32,
    /// Char offset of the chunk within its document
    pub start: usize,
}

impl Chunk {
    /// Metadata stored alongside the chunk's vector
    pub fn metadata(&self) -> Metadata {
        source_metadata(&self.source)
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

fn source_metadata(source: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(SOURCE_KEY.to_string(), serde_json::json!(source));
    metadata
}
