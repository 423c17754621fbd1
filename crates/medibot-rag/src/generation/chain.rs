//! Retrieve-then-generate answer chain

use std::sync::Arc;

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::retrieval::Retriever;

use super::prompt::PromptBuilder;

/// Stateless question answering over the index
#[derive(Clone)]
pub struct RagChain {
    retriever: Retriever,
    llm: Arc<dyn LlmProvider>,
}

impl RagChain {
    pub fn new(retriever: Retriever, llm: Arc<dyn LlmProvider>) -> Self {
        Self { retriever, llm }
    }

    /// Answer one question: retrieve, build context, complete
    pub async fn answer(&self, question: &str) -> Result<String> {
        let records = self.retriever.retrieve(question).await?;
        let context = PromptBuilder::build_context(&records);
        let system_prompt = PromptBuilder::system_prompt(&context);

        tracing::info!(
            "Answering with {} context chunks via {} ({})",
            records.len(),
            self.llm.name(),
            self.llm.model()
        );

        let answer = self.llm.generate_answer(&system_prompt, question).await?;
        Ok(answer.trim().to_string())
    }
}
