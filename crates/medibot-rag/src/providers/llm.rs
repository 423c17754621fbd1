//! LLM provider trait for generating answers

use async_trait::async_trait;

use crate::error::Result;

/// Trait for chat-completion answer generation
///
/// Implementations:
/// - `OpenAiChat`: OpenAI-compatible chat completions API (gpt-4o)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Answer `question` under the given system instruction
    async fn generate_answer(&self, system_prompt: &str, question: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
