//! Metadata narrowing between the loader and the splitter

use crate::types::{MinimalDocument, RawDocument};

/// Keep only the `source` metadata of each document.
///
/// Same length and order as the input; text is passed through untouched.
pub fn filter_to_minimal(docs: &[RawDocument]) -> Vec<MinimalDocument> {
    docs.iter()
        .map(|doc| MinimalDocument {
            text: doc.text.clone(),
            source: doc.source().unwrap_or_default().to_string(),
        })
        .collect()
}
