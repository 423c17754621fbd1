//! Document ingestion: PDF loading, metadata narrowing, chunking and indexing

pub mod filter;
pub mod loader;
pub mod pipeline;
pub mod splitter;

pub use filter::filter_to_minimal;
pub use loader::PdfLoader;
pub use pipeline::{ensure_index, verify_index, IngestPipeline, IngestReport};
pub use splitter::{RecursiveTextSplitter, TextSpan};
