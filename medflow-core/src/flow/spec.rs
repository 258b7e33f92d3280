//! Flow definition: schema pair + prompt template + capability

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::error::{FlowError, FlowResult};
use crate::capability::ModelCapability;
use crate::schema::{FieldType, Schema};
use crate::template::PromptTemplate;

/// A named, schema-typed request/response unit backed by a model capability.
///
/// Immutable once built. Execution validates the input, renders the prompt,
/// invokes the capability with the output schema, validates what comes back
/// and returns it untouched.
#[derive(Clone)]
pub struct FlowSpec {
    name: String,
    input_schema: Schema,
    output_schema: Schema,
    template: PromptTemplate,
    capability: Arc<dyn ModelCapability>,
}

impl std::fmt::Debug for FlowSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowSpec")
            .field("name", &self.name)
            .field("input_schema", &self.input_schema.name())
            .field("output_schema", &self.output_schema.name())
            .field("template", &self.template.name())
            .field("model", &self.capability.model_info())
            .finish()
    }
}

impl FlowSpec {
    /// Build a flow, checking that every field the template reads is
    /// declared by the input schema (and that iterated fields are arrays).
    pub fn new(
        name: impl Into<String>,
        input_schema: Schema,
        output_schema: Schema,
        template: PromptTemplate,
        capability: Arc<dyn ModelCapability>,
    ) -> FlowResult<Self> {
        let name = name.into();

        for (field, iterated) in template.referenced_fields() {
            let spec = input_schema.get(&field).ok_or_else(|| FlowError::Configuration {
                flow: name.clone(),
                message: format!(
                    "template '{}' reads '{}', which schema '{}' does not declare",
                    template.name(),
                    field,
                    input_schema.name()
                ),
            })?;
            if iterated && !matches!(spec.field_type, FieldType::Array(_)) {
                return Err(FlowError::Configuration {
                    flow: name.clone(),
                    message: format!(
                        "template '{}' iterates '{}', declared as {}",
                        template.name(),
                        field,
                        spec.field_type.type_name()
                    ),
                });
            }
        }

        Ok(Self {
            name,
            input_schema,
            output_schema,
            template,
            capability,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    pub fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub fn capability(&self) -> &Arc<dyn ModelCapability> {
        &self.capability
    }

    /// Render the prompt for an input that has already been validated
    pub fn render(&self, input: &Value) -> FlowResult<String> {
        self.template
            .render(input)
            .map_err(|e| FlowError::from_template(&self.name, e))
    }

    /// Run the flow: validate input, render, invoke, validate output.
    pub async fn execute(&self, input: Value) -> FlowResult<Value> {
        self.input_schema
            .check(&input)
            .map_err(|e| FlowError::input_invalid(&self.name, e.to_string()))?;

        let prompt = self.render(&input)?;
        debug!(
            flow = %self.name,
            prompt_sha256 = %digest(&prompt),
            prompt_len = prompt.len(),
            "invoking capability"
        );

        let started = Instant::now();
        let output = match self.capability.invoke(&prompt, &self.output_schema).await {
            Ok(output) => output,
            Err(e) => {
                let err = FlowError::from_capability(&self.name, e);
                warn!(
                    flow = %self.name,
                    kind = %err.kind(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "capability call failed"
                );
                return Err(err);
            }
        };

        if let Err(error) = self.output_schema.check(&output) {
            warn!(flow = %self.name, field = %error.field, "capability output rejected");
            return Err(FlowError::OutputInvalid {
                flow: self.name.clone(),
                error,
            });
        }

        info!(
            flow = %self.name,
            duration_ms = started.elapsed().as_millis() as u64,
            "flow completed"
        );
        Ok(output)
    }
}

/// Short SHA-256 prefix identifying a prompt in logs without its contents
fn digest(prompt: &str) -> String {
    let hash = Sha256::digest(prompt.as_bytes());
    hash.iter().take(6).map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{StubCapability, StubError};
    use crate::flow::FlowErrorKind;
    use crate::schema::FieldSpec;
    use serde_json::json;

    fn input_schema() -> Schema {
        Schema::object("EchoInput").field("word", FieldSpec::string().non_blank())
    }

    fn output_schema() -> Schema {
        Schema::object("EchoOutput").field("echo", FieldSpec::string())
    }

    fn template() -> PromptTemplate {
        PromptTemplate::parse("echo", "Say {{word}}").unwrap()
    }

    fn spec(stub: Arc<StubCapability>) -> FlowSpec {
        FlowSpec::new("echo", input_schema(), output_schema(), template(), stub).unwrap()
    }

    #[tokio::test]
    async fn test_execute_renders_and_returns_output_unchanged() {
        let output = json!({"echo": "hi", "extra": [1, 2, 3]});
        let stub = Arc::new(StubCapability::returning(output.clone()));
        let flow = spec(stub.clone());

        let result = flow.execute(json!({"word": "hi"})).await.unwrap();
        assert_eq!(result, output);
        assert_eq!(stub.prompts().await, vec!["Say hi"]);
    }

    #[tokio::test]
    async fn test_invalid_input_skips_capability() {
        let stub = Arc::new(StubCapability::returning(json!({"echo": "x"})));
        let flow = spec(stub.clone());

        let err = flow.execute(json!({"word": "  "})).await.unwrap_err();
        assert_eq!(err.kind(), FlowErrorKind::InputInvalid);
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_output_invalid() {
        let stub = Arc::new(StubCapability::returning(json!({"echo": 42})));
        let err = spec(stub).execute(json!({"word": "hi"})).await.unwrap_err();
        match err {
            FlowError::OutputInvalid { error, .. } => {
                assert_eq!(error.field, "echo");
                assert_eq!(error.expected, "string");
                assert_eq!(error.actual, "number");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_capability_failures_are_classified() {
        let stub = Arc::new(StubCapability::failing(StubError::Unavailable("503".into())));
        let err = spec(stub).execute(json!({"word": "hi"})).await.unwrap_err();
        assert_eq!(err.kind(), FlowErrorKind::ModelUnavailable);

        let stub = Arc::new(StubCapability::failing(StubError::Provider("400".into())));
        let err = spec(stub).execute(json!({"word": "hi"})).await.unwrap_err();
        assert_eq!(err.kind(), FlowErrorKind::ModelError);
    }

    #[test]
    fn test_template_field_must_be_declared() {
        let template = PromptTemplate::parse("t", "{{word}} {{other}}").unwrap();
        let stub = Arc::new(StubCapability::returning(json!({})));
        let err =
            FlowSpec::new("bad", input_schema(), output_schema(), template, stub).unwrap_err();
        assert_eq!(err.kind(), FlowErrorKind::Configuration);
        assert!(err.to_string().contains("'other'"));
    }

    #[test]
    fn test_iterated_field_must_be_array() {
        let template = PromptTemplate::parse("t", "{{#each word}}{{this}}{{/each}}").unwrap();
        let stub = Arc::new(StubCapability::returning(json!({})));
        let err =
            FlowSpec::new("bad", input_schema(), output_schema(), template, stub).unwrap_err();
        assert!(err.to_string().contains("declared as string"));
    }

    #[test]
    fn test_digest_is_short_hex() {
        let d = digest("Explain tachycardia");
        assert_eq!(d.len(), 12);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(d, digest("Explain bradycardia"));
    }
}
