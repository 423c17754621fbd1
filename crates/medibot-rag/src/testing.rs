//! Deterministic in-process providers for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider};

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket
pub struct HashEmbedder {
    dimensions: usize,
    model: String,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            model: "hash-bow".to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut values = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            values[(hasher.finish() % self.dimensions as u64) as usize] += 1.0;
        }

        let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v /= norm;
            }
        }
        values
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// LLM that answers with the system prompt it was given
#[derive(Default)]
pub struct EchoLlm {
    fail: bool,
    /// (system prompt, question) pairs received
    pub calls: Mutex<Vec<(String, String)>>,
}

impl EchoLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// LLM whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl LlmProvider for EchoLlm {
    async fn generate_answer(&self, system_prompt: &str, question: &str) -> Result<String> {
        self.calls
            .lock()
            .push((system_prompt.to_string(), question.to_string()));
        if self.fail {
            return Err(Error::llm("completion service unavailable"));
        }
        Ok(system_prompt.to_string())
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo"
    }
}
