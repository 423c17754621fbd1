//! Prompt templates for RAG generation

use crate::types::ScoredRecord;

/// Placeholder replaced by the retrieved context
const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Fixed system instruction for the medical assistant
pub const SYSTEM_PROMPT: &str = "You are a medical assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, say that you don't know. \
Use three sentences maximum and keep the answer concise.\n\n{context}";

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join record texts with blank lines, in retrieval order
    pub fn build_context(records: &[ScoredRecord]) -> String {
        records
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Fill the system prompt with the assembled context
    pub fn system_prompt(context: &str) -> String {
        SYSTEM_PROMPT.replace(CONTEXT_PLACEHOLDER, context)
    }
}
