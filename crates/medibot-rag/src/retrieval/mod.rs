//! Retrieval of context chunks for a question

pub mod search;

pub use search::Retriever;
