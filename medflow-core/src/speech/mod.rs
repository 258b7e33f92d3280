//! Text-to-speech providers
//!
//! A speech provider turns text into encoded audio. The speech flow reaches
//! it through [`crate::capability::SpeechCapability`], which hands the audio
//! back as a `data:` URI.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::ModelInfo;

pub mod factory;
pub mod providers;

pub use factory::SpeechProviderFactory;

/// Encoded audio returned by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    /// Raw encoded bytes
    pub bytes: Vec<u8>,

    /// MIME type of `bytes` (e.g. `audio/wav`)
    pub mime: String,
}

impl SynthesizedAudio {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// Render as a base64 `data:` URI suitable for an audio element
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, base64::encode(&self.bytes))
    }
}

/// Decode a base64 `data:` URI back into its MIME type and bytes.
///
/// Returns `None` for anything that is not a base64 data URI.
pub fn decode_data_uri(uri: &str) -> Option<SynthesizedAudio> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = base64::decode(payload).ok()?;
    Some(SynthesizedAudio::new(bytes, mime))
}

/// Trait for speech provider implementations.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize `text` into audio.
    ///
    /// `Ok(None)` means the provider answered but produced no audio.
    async fn synthesize(&self, text: &str) -> Result<Option<SynthesizedAudio>>;

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}
