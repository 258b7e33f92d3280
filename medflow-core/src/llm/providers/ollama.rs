//! Ollama LLM provider implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{MedflowError, Result};
use crate::llm::{
    parse_structured, status_error, transport_error, LLMProvider, LLMRequest, LLMResponse,
    Message, MessageRole, ModelInfo, TokenUsage,
};

const DEFAULT_MODEL: &str = "qwen3:14b";
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama LLM provider (local, free, runs on your machine).
pub struct OllamaProvider {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider.
    ///
    /// # Arguments
    ///
    /// * `model` - Model name (e.g., "qwen3:14b")
    /// * `base_url` - Base URL for Ollama API (defaults to "http://localhost:11434")
    pub fn new(model: impl Into<String>, base_url: Option<impl Into<String>>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: model.into(),
            base_url: base_url
                .map(|u| u.into())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    /// Create from environment variables.
    ///
    /// Reads from:
    /// - `OLLAMA_MODEL` - Model name (optional, defaults to "qwen3:14b")
    /// - `OLLAMA_BASE_URL` - Base URL (optional, defaults to "http://localhost:11434")
    pub fn from_env(model: Option<impl Into<String>>) -> Result<Self> {
        let model = model
            .map(|m| m.into())
            .or_else(|| std::env::var("OLLAMA_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url =
            std::env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::new(model, Some(base_url)))
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(
        &self,
        request: &LLMRequest,
        format: Option<serde_json::Value>,
    ) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            messages: convert_messages(&request.messages),
            stream: false,
            format,
            options: Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                stop: if request.stop_sequences.is_empty() {
                    None
                } else {
                    Some(request.stop_sequences.clone())
                },
            }),
        }
    }

    async fn chat(&self, body: &OllamaRequest) -> Result<LLMResponse> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error("Ollama", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("Ollama", status, text));
        }

        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            MedflowError::Provider(format!("Failed to parse Ollama response: {}", e))
        })?;

        let mut content = ollama_response.message.content.trim().to_string();
        if content.is_empty() {
            if let Some(thinking) = ollama_response.message.thinking {
                content = thinking.trim().to_string();
            }
        }

        let usage = match (ollama_response.prompt_eval_count, ollama_response.eval_count) {
            (Some(prompt_tokens), Some(completion_tokens)) => Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
            _ => None,
        };

        Ok(LLMResponse { content, usage })
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: Option<f32>,
    num_predict: Option<usize>,
    stop: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaMessageResponse,
    #[serde(default)]
    prompt_eval_count: Option<usize>,
    #[serde(default)]
    eval_count: Option<usize>,
}

#[derive(Deserialize)]
struct OllamaMessageResponse {
    content: String,
    #[serde(default)]
    thinking: Option<String>,
}

fn convert_messages(messages: &[Message]) -> Vec<OllamaMessage> {
    messages
        .iter()
        .map(|m| OllamaMessage {
            role: match m.role {
                MessageRole::System => "system".to_string(),
                MessageRole::User => "user".to_string(),
                MessageRole::Assistant => "assistant".to_string(),
            },
            content: m.content.clone(),
        })
        .collect()
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        self.chat(&self.build_request(request, None)).await
    }

    async fn generate_structured(
        &self,
        request: &LLMRequest,
        schema: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        // Ollama accepts a JSON schema (or "json") in `format`
        let format = schema.unwrap_or_else(|| serde_json::Value::String("json".to_string()));
        let response = self.chat(&self.build_request(request, Some(format))).await?;
        parse_structured(&response.content)
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "ollama".to_string(),
            model_name: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("qwen3:14b", None::<String>);
        assert_eq!(provider.model(), "qwen3:14b");
        assert_eq!(provider.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_ollama_model_override() {
        let provider = OllamaProvider::from_env(Some("llama3.2")).unwrap();
        assert_eq!(provider.model(), "llama3.2");
    }

    #[test]
    fn test_structured_request_carries_schema() {
        let provider = OllamaProvider::new("qwen3:14b", Some("http://ollama:11434"));
        let schema = serde_json::json!({ "type": "object" });
        let body = provider.build_request(&LLMRequest::from_prompt("hi"), Some(schema.clone()));
        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(encoded["format"], schema);
        assert_eq!(encoded["stream"], false);
        assert_eq!(encoded["messages"][0]["role"], "user");
    }

    #[test]
    fn test_plain_request_omits_format() {
        let provider = OllamaProvider::new("qwen3:14b", None::<String>);
        let body = provider.build_request(&LLMRequest::from_prompt("hi"), None);
        let encoded = serde_json::to_value(&body).unwrap();
        assert!(encoded.get("format").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let provider = OllamaProvider::new("qwen3:14b", Some("http://127.0.0.1:9"));
        let err = provider
            .generate_request(&LLMRequest::from_prompt("hi"))
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }
}
