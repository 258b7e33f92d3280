//! Configuration types for Medflow

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{MedflowError, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MedflowConfig {
    /// LLM provider backing the structured flows (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LLMProviderConfig>,

    /// Speech provider backing narration (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech: Option<SpeechProviderConfig>,

    /// Capability invocation settings
    #[serde(default)]
    pub invocation: InvocationConfig,

    /// Session storage
    #[serde(default)]
    pub session: SessionConfig,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMProviderConfig {
    /// Provider type
    pub provider: LLMProvider,

    /// Model name (empty means provider default)
    #[serde(default)]
    pub model: String,

    /// API key (if needed, prefer env vars)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL (for custom endpoints, e.g., Ollama)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Ollama,
}

/// Speech provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechProviderConfig {
    /// Provider type
    pub provider: SpeechProvider,

    /// Model name (empty means provider default)
    #[serde(default)]
    pub model: String,

    /// Voice name (provider default when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// API key (if needed, prefer env vars)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL (for compatible endpoints)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Speech provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    OpenAI,
}

/// Capability invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationConfig {
    /// Deadline for a single capability call
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Sampling temperature for structured flows
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion budget for structured flows
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> usize {
    1000
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Session storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Session file path (defaults to `<data dir>/medflow/session.json`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl SessionConfig {
    /// Resolved session file location
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("medflow").join("session.json"))
            .ok_or_else(|| {
                MedflowError::Configuration(
                    "No platform data directory; set session.path".to_string(),
                )
            })
    }
}

impl MedflowConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `medflow.toml` in the working directory
    /// 3. File named by `MEDFLOW_CONFIG_PATH`
    /// 4. `MEDFLOW_*` environment variables (`__` separates nested keys,
    ///    e.g. `MEDFLOW_INVOCATION__REQUEST_TIMEOUT=30s`)
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(MedflowConfig::default()))
            .merge(Toml::file("medflow.toml"));

        if let Ok(path) = std::env::var("MEDFLOW_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: MedflowConfig = figment
            .merge(Env::prefixed("MEDFLOW_").ignore(&["CONFIG_PATH"]).split("__"))
            .extract()
            .map_err(|e| {
                MedflowError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: MedflowConfig = Figment::from(Serialized::defaults(MedflowConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                MedflowError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.invocation.request_timeout.is_zero() {
            return Err(MedflowError::Configuration(
                "invocation.request_timeout must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.invocation.temperature) {
            return Err(MedflowError::Configuration(format!(
                "invocation.temperature must be within 0.0..=2.0, got {}",
                self.invocation.temperature
            )));
        }
        Ok(())
    }
}
