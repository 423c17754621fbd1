//! OpenAI chat completions client with retry logic

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::llm::LlmProvider;
use super::retry::RetryPolicy;

/// Chat completions client
pub struct OpenAiChat {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
    /// Bearer token
    api_key: String,
    retry: RetryPolicy,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChat {
    /// Create a new client
    pub fn new(api_key: impl Into<String>, config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            retry: RetryPolicy::new(config.max_retries),
            config: config.clone(),
        })
    }

    fn build_request(&self, system_prompt: &str, question: &str) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: question.to_string(),
                },
            ],
            temperature: self.config.temperature,
        }
    }
}

fn answer_from_response(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::llm("Completion contained no message content"))
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    async fn generate_answer(&self, system_prompt: &str, question: &str) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let request = self.build_request(system_prompt, question);

        tracing::info!("Generating answer with model: {}", self.config.model);

        self.retry
            .run("Chat completion", || {
                let url = url.clone();
                let request = request.clone();
                let client = self.client.clone();
                let api_key = self.api_key.clone();

                async move {
                    let response = client
                        .post(&url)
                        .bearer_auth(api_key)
                        .json(&request)
                        .send()
                        .await
                        .map_err(|e| Error::llm(format!("Completion request failed: {}", e)))?;

                    let status = response.status();
                    if status == StatusCode::UNAUTHORIZED {
                        return Err(Error::config("OpenAI rejected the API key"));
                    }
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::llm(format!(
                            "Completion failed: HTTP {} - {}",
                            status, body
                        )));
                    }

                    let parsed: ChatResponse = response.json().await.map_err(|e| {
                        Error::llm(format!("Failed to parse completion response: {}", e))
                    })?;

                    answer_from_response(parsed)
                }
            })
            .await
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let chat = OpenAiChat::new("sk-test", &LlmConfig::default()).unwrap();
        let value = serde_json::to_value(chat.build_request("Be brief.", "What is a fracture?")).unwrap();

        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["messages"][0], json!({"role": "system", "content": "Be brief."}));
        assert_eq!(
            value["messages"][1],
            json!({"role": "user", "content": "What is a fracture?"})
        );
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_temperature_forwarded() {
        let config = LlmConfig {
            temperature: Some(0.4),
            ..LlmConfig::default()
        };
        let chat = OpenAiChat::new("sk-test", &config).unwrap();
        let value = serde_json::to_value(chat.build_request("s", "q")).unwrap();
        assert!((value["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_answer_from_response() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "A fracture is a break in a bone."}, "finish_reason": "stop"}]
        }))
        .unwrap();
        assert_eq!(
            answer_from_response(response).unwrap(),
            "A fracture is a break in a bone."
        );

        let empty: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(answer_from_response(empty), Err(Error::Llm(_))));
    }
}
