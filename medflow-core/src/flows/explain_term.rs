//! Medical term explanation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::capability::ModelCapability;
use crate::flow::{Flow, FlowError, FlowResult, FlowSpec, from_output, to_input};
use crate::schema::{FieldSpec, Schema};
use crate::template::PromptTemplate;

pub const FLOW_NAME: &str = "explainMedicalTerm";

const PROMPT: &str = "You are a helpful chatbot that explains medical terms in simple language.

Explain the following medical term in simple language:

{{{term}}}";

/// A term to explain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermExplanationRequest {
    pub term: String,
}

impl TermExplanationRequest {
    pub fn new(term: impl Into<String>) -> Self {
        Self { term: term.into() }
    }
}

/// Plain-language explanation of a term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermExplanationResult {
    pub explanation: String,
    /// Any further fields the model returned, kept as is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Build the flow definition
pub fn spec(capability: Arc<dyn ModelCapability>) -> FlowResult<FlowSpec> {
    let input = Schema::object("ExplainMedicalTermInput").field(
        "term",
        FieldSpec::string()
            .non_blank()
            .describe("The medical term to explain."),
    );
    let output = Schema::object("ExplainMedicalTermOutput").field(
        "explanation",
        FieldSpec::string()
            .non_blank()
            .describe("A simple explanation of the medical term."),
    );
    let template = PromptTemplate::parse("explainMedicalTermPrompt", PROMPT)
        .map_err(|e| FlowError::from_template(FLOW_NAME, e))?;

    FlowSpec::new(FLOW_NAME, input, output, template, capability)
}

/// Explains a medical term; always calls the capability for a non-blank term.
#[derive(Debug, Clone)]
pub struct ExplainTermFlow {
    spec: Arc<FlowSpec>,
}

impl ExplainTermFlow {
    pub fn new(spec: Arc<FlowSpec>) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Flow for ExplainTermFlow {
    type Request = TermExplanationRequest;
    type Response = TermExplanationResult;

    fn name(&self) -> &str {
        self.spec.name()
    }

    async fn run(&self, request: TermExplanationRequest) -> FlowResult<TermExplanationResult> {
        let term = request.term.trim();
        if term.is_empty() {
            return Err(FlowError::input_invalid(FLOW_NAME, "term must not be empty"));
        }

        let input = to_input(FLOW_NAME, &TermExplanationRequest::new(term))?;
        let output = self.spec.execute(input).await?;
        from_output(&self.spec, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::StubCapability;
    use crate::flow::FlowErrorKind;
    use serde_json::json;

    fn flow(stub: Arc<StubCapability>) -> ExplainTermFlow {
        ExplainTermFlow::new(Arc::new(spec(stub).unwrap()))
    }

    #[tokio::test]
    async fn test_prompt_carries_trimmed_term() {
        let stub = Arc::new(StubCapability::returning(
            json!({"explanation": "A heart rate over 100 beats per minute."}),
        ));
        let result = flow(stub.clone())
            .run(TermExplanationRequest::new("  tachycardia \n"))
            .await
            .unwrap();

        assert_eq!(result.explanation, "A heart rate over 100 beats per minute.");
        let prompts = stub.prompts().await;
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("You are a helpful chatbot"));
        assert!(prompts[0].ends_with("simple language:\n\ntachycardia"));
    }

    #[tokio::test]
    async fn test_blank_term_is_input_invalid() {
        let stub = Arc::new(StubCapability::returning(json!({"explanation": "x"})));
        let err = flow(stub.clone())
            .run(TermExplanationRequest::new("   "))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FlowErrorKind::InputInvalid);
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_explanation_is_output_invalid() {
        let stub = Arc::new(StubCapability::returning(json!({"explanation": ""})));
        let err = flow(stub)
            .run(TermExplanationRequest::new("angina"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FlowErrorKind::OutputInvalid);
    }

    #[tokio::test]
    async fn test_term_reaches_prompt_verbatim() {
        let stub = Arc::new(StubCapability::returning(json!({"explanation": "ok"})));
        flow(stub.clone())
            .run(TermExplanationRequest::new("Crohn's <disease>"))
            .await
            .unwrap();
        assert!(stub.prompts().await[0].ends_with("simple language:\n\nCrohn's <disease>"));
    }

    #[tokio::test]
    async fn test_extra_output_fields_are_kept() {
        let output = json!({
            "explanation": "Chest pain from reduced blood flow.",
            "source": "model",
        });
        let stub = Arc::new(StubCapability::returning(output.clone()));
        let result = flow(stub)
            .run(TermExplanationRequest::new("angina"))
            .await
            .unwrap();
        assert_eq!(result.extra.get("source"), Some(&json!("model")));
        assert_eq!(serde_json::to_value(&result).unwrap(), output);
    }
}
