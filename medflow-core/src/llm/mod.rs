//! LLM providers for structured generation
//!
//! Providers speak a chat-style protocol; the flow layer only ever asks them
//! for structured JSON through [`LLMProvider::generate_structured`], wrapped
//! by [`crate::capability::LLMCapability`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{MedflowError, Result};

mod json;

pub mod factory;
pub mod providers;

pub use factory::LLMProviderFactory;
pub use json::extract_json;

/// Configuration for LLM operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Temperature for generation (0.0-2.0, default: 0.7)
    pub temperature: f32,

    /// Maximum tokens to generate (default: 1000)
    pub max_tokens: usize,

    /// System prompt for context
    pub system_prompt: Option<String>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
            system_prompt: None,
        }
    }
}

impl LLMConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Request to an LLM provider
#[derive(Debug, Clone)]
pub struct LLMRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,

    /// Temperature for generation (0.0-2.0)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,

    /// Stop sequences
    pub stop_sequences: Vec<String>,
}

impl LLMRequest {
    /// Create a simple request from a single prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message {
                role: MessageRole::User,
                content: prompt.into(),
            }],
            temperature: None,
            max_tokens: None,
            stop_sequences: Vec::new(),
        }
    }

    /// Create a request from a prompt and generation settings
    pub fn with_config(prompt: impl Into<String>, config: &LLMConfig) -> Self {
        let mut messages = Vec::new();
        if let Some(ref system) = config.system_prompt {
            messages.push(Message {
                role: MessageRole::System,
                content: system.clone(),
            });
        }
        messages.push(Message {
            role: MessageRole::User,
            content: prompt.into(),
        });

        Self {
            messages,
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
            stop_sequences: Vec::new(),
        }
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Generated content
    pub content: String,

    /// Token usage information
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Trait for LLM provider implementations.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate text from a structured request.
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse>;

    /// Generate structured output (JSON) as a JSON value.
    ///
    /// # Arguments
    ///
    /// * `request` - The LLM request
    /// * `schema` - Optional JSON schema the output must follow
    ///
    /// The default implementation asks for plain text and pulls the first
    /// JSON object out of it. Providers with native constrained decoding
    /// override this and pass `schema` through.
    async fn generate_structured(
        &self,
        request: &LLMRequest,
        _schema: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let response = self.generate_request(request).await?;
        parse_structured(&response.content)
    }

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

/// Parse model text into JSON, tolerating code fences and surrounding prose.
pub(crate) fn parse_structured(content: &str) -> Result<serde_json::Value> {
    let candidate = extract_json(content).ok_or_else(|| {
        MedflowError::Provider("Model returned no JSON object".to_string())
    })?;
    serde_json::from_str(&candidate).map_err(|e| {
        MedflowError::Provider(format!("Failed to parse structured output: {}", e))
    })
}

/// Model information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}

/// Map a reqwest transport failure onto the unavailable/error split.
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> MedflowError {
    if err.is_connect() || err.is_timeout() {
        MedflowError::Unavailable(format!("Failed to reach {}: {}", provider, err))
    } else {
        MedflowError::Provider(format!("Failed to send request to {}: {}", provider, err))
    }
}

/// Map a non-success HTTP status onto the unavailable/error split.
pub(crate) fn status_error(
    provider: &str,
    status: reqwest::StatusCode,
    detail: String,
) -> MedflowError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        MedflowError::Unavailable(format!("{} API unavailable ({}): {}", provider, status, detail))
    } else {
        MedflowError::Provider(format!("{} API error ({}): {}", provider, status, detail))
    }
}
