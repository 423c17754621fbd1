//! Answer generation from retrieved context

pub mod chain;
pub mod prompt;

pub use chain::RagChain;
pub use prompt::{PromptBuilder, SYSTEM_PROMPT};
