//! Model invocation capability
//!
//! A capability accepts a rendered prompt plus the output schema and returns a
//! structured value (or fails). Flows never talk to providers directly; they
//! hold an `Arc<dyn ModelCapability>`.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{MedflowError, Result};
use crate::llm::{LLMConfig, LLMProvider, LLMRequest, ModelInfo};
use crate::schema::Schema;
use crate::speech::SpeechProvider;

pub mod stub;

pub use stub::{StubCapability, StubError, StubResponse};

/// The generative-model service a flow calls.
#[async_trait]
pub trait ModelCapability: Send + Sync {
    /// Invoke the model with a rendered prompt, asking for output shaped like
    /// `output_schema`.
    async fn invoke(&self, prompt: &str, output_schema: &Schema) -> Result<Value>;

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

async fn with_deadline<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| MedflowError::Timeout(limit))?,
        None => fut.await,
    }
}

/// Structured JSON generation backed by an [`LLMProvider`].
pub struct LLMCapability {
    provider: Arc<dyn LLMProvider>,
    config: LLMConfig,
    timeout: Option<Duration>,
}

impl LLMCapability {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            config: LLMConfig::default(),
            timeout: None,
        }
    }

    pub fn with_config(mut self, config: LLMConfig) -> Self {
        self.config = config;
        self
    }

    /// Fail with [`MedflowError::Timeout`] when a call runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl ModelCapability for LLMCapability {
    async fn invoke(&self, prompt: &str, output_schema: &Schema) -> Result<Value> {
        let request = LLMRequest::with_config(prompt, &self.config);
        let started = Instant::now();
        let value = with_deadline(
            self.timeout,
            self.provider
                .generate_structured(&request, Some(output_schema.to_json_schema())),
        )
        .await?;
        debug!(
            schema = output_schema.name(),
            duration_ms = started.elapsed().as_millis() as u64,
            "structured generation complete"
        );
        Ok(value)
    }

    fn model_info(&self) -> ModelInfo {
        self.provider.model_info()
    }
}

/// Audio synthesis backed by a [`SpeechProvider`].
///
/// The prompt is the text to narrate. The result is `{"media": <data URI>}`,
/// or `{}` when the provider produced no audio.
pub struct SpeechCapability {
    provider: Arc<dyn SpeechProvider>,
    timeout: Option<Duration>,
}

impl SpeechCapability {
    pub fn new(provider: Arc<dyn SpeechProvider>) -> Self {
        Self {
            provider,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl ModelCapability for SpeechCapability {
    async fn invoke(&self, prompt: &str, _output_schema: &Schema) -> Result<Value> {
        let started = Instant::now();
        let audio = with_deadline(self.timeout, self.provider.synthesize(prompt)).await?;
        debug!(
            bytes = audio.as_ref().map(|a| a.bytes.len()).unwrap_or(0),
            duration_ms = started.elapsed().as_millis() as u64,
            "speech synthesis complete"
        );
        Ok(match audio {
            Some(audio) => serde_json::json!({ "media": audio.to_data_uri() }),
            None => serde_json::json!({}),
        })
    }

    fn model_info(&self) -> ModelInfo {
        self.provider.model_info()
    }
}

/// Capability for a flow whose provider was not configured.
///
/// Every call fails as unavailable, so the flow still registers and its
/// failures surface through the normal error path.
pub struct UnconfiguredCapability {
    what: String,
}

impl UnconfiguredCapability {
    pub fn new(what: impl Into<String>) -> Self {
        Self { what: what.into() }
    }
}

#[async_trait]
impl ModelCapability for UnconfiguredCapability {
    async fn invoke(&self, _prompt: &str, _output_schema: &Schema) -> Result<Value> {
        Err(MedflowError::Unavailable(format!(
            "no {} provider configured",
            self.what
        )))
    }
}
