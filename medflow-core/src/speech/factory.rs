//! Factory for creating speech providers from configuration

use crate::config::{SpeechProvider as SpeechProviderType, SpeechProviderConfig};
use crate::error::Result;
use crate::speech::SpeechProvider;
use std::sync::Arc;

#[cfg(feature = "llm-openai")]
use crate::speech::providers::openai::OpenAISpeechProvider;

/// Factory for creating speech providers
pub struct SpeechProviderFactory;

impl SpeechProviderFactory {
    /// Create a speech provider from configuration
    pub async fn create(config: &SpeechProviderConfig) -> Result<Arc<dyn SpeechProvider>> {
        match config.provider {
            #[cfg(feature = "llm-openai")]
            SpeechProviderType::OpenAI => {
                let model = (!config.model.is_empty()).then(|| config.model.clone());

                let mut provider = if let Some(api_key) = &config.api_key {
                    let model_str = model
                        .or_else(|| std::env::var("OPENAI_TTS_MODEL").ok())
                        .unwrap_or_else(|| "gpt-4o-mini-tts".to_string());
                    OpenAISpeechProvider::new(api_key.clone(), model_str)
                } else {
                    OpenAISpeechProvider::from_env(model)?
                };

                if let Some(voice) = &config.voice {
                    provider = provider.with_voice(voice.clone());
                }
                if let Some(base_url) = &config.base_url {
                    provider = provider.with_base_url(base_url.clone());
                }

                Ok(Arc::new(provider))
            }

            #[cfg(not(feature = "llm-openai"))]
            SpeechProviderType::OpenAI => Err(crate::error::MedflowError::Configuration(
                "OpenAI speech provider requires 'llm-openai' feature".to_string(),
            )),
        }
    }

    /// Create from MedflowConfig (if speech config is present)
    pub async fn from_config(
        config: Option<&SpeechProviderConfig>,
    ) -> Result<Option<Arc<dyn SpeechProvider>>> {
        match config {
            Some(cfg) => Ok(Some(Self::create(cfg).await?)),
            None => Ok(None),
        }
    }
}
