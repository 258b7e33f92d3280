//! Text-to-speech narration

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::capability::ModelCapability;
use crate::flow::{Flow, FlowError, FlowResult, FlowSpec, from_output, to_input};
use crate::schema::{FieldSpec, Schema};
use crate::template::PromptTemplate;

pub const FLOW_NAME: &str = "generateSpeech";

/// Text to narrate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Generated audio, as a `data:` URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechResult {
    pub media: String,
    /// Any further fields the capability returned, kept as is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Build the flow definition
pub fn spec(capability: Arc<dyn ModelCapability>) -> FlowResult<FlowSpec> {
    let input = Schema::object("SpeechInput").field(
        "text",
        FieldSpec::string().non_blank().describe("The text to narrate."),
    );
    // Absent media is a synthesis failure, reported after validation.
    let output = Schema::object("SpeechOutput").field(
        "media",
        FieldSpec::string()
            .optional()
            .describe("Audio as a base64 data URI."),
    );
    let template = PromptTemplate::parse("speechText", "{{{text}}}")
        .map_err(|e| FlowError::from_template(FLOW_NAME, e))?;

    FlowSpec::new(FLOW_NAME, input, output, template, capability)
}

/// Narrates text in a single synthesis request.
#[derive(Debug, Clone)]
pub struct SpeechFlow {
    spec: Arc<FlowSpec>,
}

impl SpeechFlow {
    pub fn new(spec: Arc<FlowSpec>) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Flow for SpeechFlow {
    type Request = SpeechRequest;
    type Response = SpeechResult;

    fn name(&self) -> &str {
        self.spec.name()
    }

    async fn run(&self, request: SpeechRequest) -> FlowResult<SpeechResult> {
        if request.text.trim().is_empty() {
            return Err(FlowError::input_invalid(FLOW_NAME, "text must not be empty"));
        }

        let input = to_input(FLOW_NAME, &request)?;
        let output = self.spec.execute(input).await?;

        match output.get("media").and_then(|m| m.as_str()) {
            Some(media) if !media.is_empty() => from_output(&self.spec, output),
            _ => Err(FlowError::SynthesisFailed {
                flow: FLOW_NAME.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::StubCapability;
    use crate::flow::FlowErrorKind;
    use serde_json::json;

    fn flow(stub: Arc<StubCapability>) -> SpeechFlow {
        SpeechFlow::new(Arc::new(spec(stub).unwrap()))
    }

    #[tokio::test]
    async fn test_media_returned() {
        let stub = Arc::new(StubCapability::returning(
            json!({"media": "data:audio/wav;base64,UklGRg=="}),
        ));
        let result = flow(stub.clone())
            .run(SpeechRequest::new("Breathe in <slowly>."))
            .await
            .unwrap();
        assert_eq!(result.media, "data:audio/wav;base64,UklGRg==");
        // raw interpolation, text goes through untouched
        assert_eq!(stub.prompts().await, vec!["Breathe in <slowly>."]);
    }

    #[tokio::test]
    async fn test_missing_media_is_synthesis_failed() {
        let stub = Arc::new(StubCapability::returning(json!({})));
        let err = flow(stub).run(SpeechRequest::new("hello")).await.unwrap_err();
        assert_eq!(err.kind(), FlowErrorKind::SynthesisFailed);
    }

    #[tokio::test]
    async fn test_empty_media_is_synthesis_failed() {
        let stub = Arc::new(StubCapability::returning(json!({"media": ""})));
        let err = flow(stub).run(SpeechRequest::new("hello")).await.unwrap_err();
        assert_eq!(err.kind(), FlowErrorKind::SynthesisFailed);
    }

    #[tokio::test]
    async fn test_non_string_media_is_output_invalid() {
        let stub = Arc::new(StubCapability::returning(json!({"media": 7})));
        let err = flow(stub).run(SpeechRequest::new("hello")).await.unwrap_err();
        assert_eq!(err.kind(), FlowErrorKind::OutputInvalid);
    }
}
