//! OpenAI text-to-speech provider

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{MedflowError, Result};
use crate::llm::providers::openai::DEFAULT_BASE_URL;
use crate::llm::{status_error, transport_error, ModelInfo};
use crate::speech::{SpeechProvider, SynthesizedAudio};

const DEFAULT_MODEL: &str = "gpt-4o-mini-tts";
const DEFAULT_VOICE: &str = "alloy";

/// OpenAI `/audio/speech` provider; audio comes back as WAV.
pub struct OpenAISpeechProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    voice: String,
    base_url: String,
}

impl OpenAISpeechProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            voice: DEFAULT_VOICE.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create from environment variables.
    ///
    /// Reads from:
    /// - `OPENAI_API_KEY` - API key (required)
    /// - `OPENAI_TTS_MODEL` - Model name (optional, defaults to "gpt-4o-mini-tts")
    /// - `OPENAI_TTS_VOICE` - Voice (optional, defaults to "alloy")
    /// - `OPENAI_BASE_URL` - Custom base URL (optional)
    pub fn from_env(model: Option<impl Into<String>>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            MedflowError::Configuration("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let model = model
            .map(|m| m.into())
            .or_else(|| std::env::var("OPENAI_TTS_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let mut provider = Self::new(api_key, model);
        if let Ok(voice) = std::env::var("OPENAI_TTS_VOICE") {
            provider = provider.with_voice(voice);
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            provider = provider.with_base_url(base_url);
        }
        Ok(provider)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    fn build_request<'a>(&'a self, text: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "wav",
        }
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

#[async_trait]
impl SpeechProvider for OpenAISpeechProvider {
    async fn synthesize(&self, text: &str) -> Result<Option<SynthesizedAudio>> {
        let url = format!("{}/audio/speech", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.build_request(text))
            .send()
            .await
            .map_err(|e| transport_error("OpenAI speech", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("OpenAI speech", status, text));
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("audio/"))
            .unwrap_or_else(|| "audio/wav".to_string());

        let bytes = response.bytes().await.map_err(|e| {
            MedflowError::Provider(format!("Failed to read OpenAI speech body: {}", e))
        })?;

        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(SynthesizedAudio::new(bytes.to_vec(), mime)))
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            model_name: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let provider = OpenAISpeechProvider::new("test-key", "tts-1");
        assert_eq!(provider.model(), "tts-1");
        assert_eq!(provider.voice(), "alloy");
        assert_eq!(provider.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_request_body() {
        let provider = OpenAISpeechProvider::new("test-key", "tts-1").with_voice("nova");
        let body = serde_json::to_value(provider.build_request("Breathe in slowly.")).unwrap();
        assert_eq!(body["input"], "Breathe in slowly.");
        assert_eq!(body["voice"], "nova");
        assert_eq!(body["response_format"], "wav");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let provider =
            OpenAISpeechProvider::new("test-key", "tts-1").with_base_url("http://127.0.0.1:9");
        let err = provider.synthesize("hello").await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
