//! Factory for creating LLM providers from configuration

use crate::config::{LLMProvider as LLMProviderType, LLMProviderConfig};
use crate::error::Result;
use crate::llm::LLMProvider;
use std::sync::Arc;

#[cfg(feature = "llm-ollama")]
use crate::llm::providers::ollama::OllamaProvider;

#[cfg(feature = "llm-openai")]
use crate::llm::providers::openai::OpenAIProvider;

/// Factory for creating LLM providers
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be created (e.g., missing API key
    /// or the provider's feature is disabled)
    pub async fn create(config: &LLMProviderConfig) -> Result<Arc<dyn LLMProvider>> {
        match config.provider {
            #[cfg(feature = "llm-openai")]
            LLMProviderType::OpenAI => {
                let model = (!config.model.is_empty()).then(|| config.model.clone());

                let provider = if let Some(api_key) = &config.api_key {
                    let model_str = model
                        .or_else(|| std::env::var("OPENAI_MODEL").ok())
                        .unwrap_or_else(|| "gpt-4o".to_string());

                    match &config.base_url {
                        Some(base_url) => OpenAIProvider::with_base_url(
                            api_key.clone(),
                            model_str,
                            base_url.clone(),
                        ),
                        None => OpenAIProvider::new(api_key.clone(), model_str),
                    }
                } else {
                    OpenAIProvider::from_env(model)?
                };

                Ok(Arc::new(provider))
            }

            #[cfg(not(feature = "llm-openai"))]
            LLMProviderType::OpenAI => Err(crate::error::MedflowError::Configuration(
                "OpenAI provider requires 'llm-openai' feature".to_string(),
            )),

            #[cfg(feature = "llm-ollama")]
            LLMProviderType::Ollama => {
                let model = (!config.model.is_empty()).then(|| config.model.clone());

                let provider = match config.base_url.clone() {
                    Some(url) => OllamaProvider::new(
                        model
                            .or_else(|| std::env::var("OLLAMA_MODEL").ok())
                            .unwrap_or_else(|| "qwen3:14b".to_string()),
                        Some(url),
                    ),
                    None => OllamaProvider::from_env(model)?,
                };

                Ok(Arc::new(provider))
            }

            #[cfg(not(feature = "llm-ollama"))]
            LLMProviderType::Ollama => Err(crate::error::MedflowError::Configuration(
                "Ollama provider requires 'llm-ollama' feature".to_string(),
            )),
        }
    }

    /// Create from MedflowConfig (if LLM config is present)
    pub async fn from_config(
        config: Option<&LLMProviderConfig>,
    ) -> Result<Option<Arc<dyn LLMProvider>>> {
        match config {
            Some(cfg) => Ok(Some(Self::create(cfg).await?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_config_yields_none() {
        assert!(LLMProviderFactory::from_config(None).await.unwrap().is_none());
    }

    #[cfg(feature = "llm-ollama")]
    #[tokio::test]
    async fn test_ollama_from_config() {
        let config = LLMProviderConfig {
            provider: LLMProviderType::Ollama,
            model: "llama3.2".to_string(),
            api_key: None,
            base_url: Some("http://gpu-box:11434".to_string()),
        };
        let provider = LLMProviderFactory::create(&config).await.unwrap();
        assert_eq!(provider.model_info().provider, "ollama");
        assert_eq!(provider.model_info().model_name, "llama3.2");
    }

    #[cfg(feature = "llm-openai")]
    #[tokio::test]
    async fn test_openai_with_inline_key() {
        let config = LLMProviderConfig {
            provider: LLMProviderType::OpenAI,
            model: "gpt-4o-mini".to_string(),
            api_key: Some("sk-test".to_string()),
            base_url: None,
        };
        let provider = LLMProviderFactory::create(&config).await.unwrap();
        assert_eq!(provider.model_info().model_name, "gpt-4o-mini");
    }

    #[cfg(not(feature = "llm-openai"))]
    #[tokio::test]
    async fn test_disabled_feature_is_configuration_error() {
        let config = LLMProviderConfig {
            provider: LLMProviderType::OpenAI,
            model: String::new(),
            api_key: Some("sk-test".to_string()),
            base_url: None,
        };
        let err = LLMProviderFactory::create(&config).await.err().unwrap();
        assert!(matches!(err, crate::error::MedflowError::Configuration(_)));
    }
}
