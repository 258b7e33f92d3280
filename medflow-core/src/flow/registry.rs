//! Flow registry: name-unique catalogue of flow definitions
//!
//! ```rust
//! use std::sync::Arc;
//! use medflow_core::capability::StubCapability;
//! use medflow_core::flow::{FlowRegistry, FlowSpec};
//! use medflow_core::schema::{FieldSpec, Schema};
//! use medflow_core::template::PromptTemplate;
//!
//! let spec = FlowSpec::new(
//!     "echo",
//!     Schema::object("In").field("word", FieldSpec::string()),
//!     Schema::object("Out"),
//!     PromptTemplate::parse("echo", "{{word}}").unwrap(),
//!     Arc::new(StubCapability::returning(serde_json::json!({}))),
//! )
//! .unwrap();
//!
//! let mut registry = FlowRegistry::new();
//! registry.register(spec.clone()).unwrap();
//! assert!(registry.register(spec).is_err());
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{FlowError, FlowResult};
use super::spec::FlowSpec;

/// Summary of a registered flow for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSummary {
    /// Flow name
    pub name: String,
    /// Input schema as JSON Schema
    pub input_schema: serde_json::Value,
    /// Output schema as JSON Schema
    pub output_schema: serde_json::Value,
    /// Provider backing the flow
    pub provider: String,
    /// Model backing the flow
    pub model: String,
}

impl From<&FlowSpec> for FlowSummary {
    fn from(spec: &FlowSpec) -> Self {
        let info = spec.capability().model_info();
        Self {
            name: spec.name().to_string(),
            input_schema: spec.input_schema().to_json_schema(),
            output_schema: spec.output_schema().to_json_schema(),
            provider: info.provider,
            model: info.model_name,
        }
    }
}

/// Registered flows, in registration order
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: IndexMap<String, Arc<FlowSpec>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flow; fails with `DuplicateFlowName` if the name is taken.
    pub fn register(&mut self, spec: FlowSpec) -> FlowResult<Arc<FlowSpec>> {
        if self.flows.contains_key(spec.name()) {
            return Err(FlowError::DuplicateFlowName(spec.name().to_string()));
        }
        let spec = Arc::new(spec);
        self.flows.insert(spec.name().to_string(), spec.clone());
        Ok(spec)
    }

    /// Look up a flow by name
    pub fn get(&self, name: &str) -> FlowResult<Arc<FlowSpec>> {
        self.flows
            .get(name)
            .cloned()
            .ok_or_else(|| FlowError::UnknownFlow(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flows.contains_key(name)
    }

    /// Registered flow names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.flows.keys().map(String::as_str).collect()
    }

    /// Summaries of every registered flow
    pub fn list(&self) -> Vec<FlowSummary> {
        self.flows.values().map(|spec| FlowSummary::from(spec.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::StubCapability;
    use crate::flow::FlowErrorKind;
    use crate::schema::{FieldSpec, Schema};
    use crate::template::PromptTemplate;
    use serde_json::json;

    fn spec(name: &str) -> FlowSpec {
        FlowSpec::new(
            name,
            Schema::object("In").field("text", FieldSpec::string()),
            Schema::object("Out").field("media", FieldSpec::string().optional()),
            PromptTemplate::parse(name, "{{{text}}}").unwrap(),
            Arc::new(StubCapability::returning(json!({}))),
        )
        .unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = FlowRegistry::new();
        registry.register(spec("generateSpeech")).unwrap();
        registry.register(spec("explainMedicalTerm")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["generateSpeech", "explainMedicalTerm"]);
        assert_eq!(registry.get("generateSpeech").unwrap().name(), "generateSpeech");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = FlowRegistry::new();
        registry.register(spec("generateSpeech")).unwrap();
        let err = registry.register(spec("generateSpeech")).unwrap_err();
        assert_eq!(err.kind(), FlowErrorKind::DuplicateFlowName);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_flow() {
        let registry = FlowRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.get("nope").unwrap_err().kind(), FlowErrorKind::UnknownFlow);
    }

    #[test]
    fn test_list_exposes_json_schema() {
        let mut registry = FlowRegistry::new();
        registry.register(spec("generateSpeech")).unwrap();
        let summaries = registry.list();
        assert_eq!(summaries[0].provider, "stub");
        assert_eq!(summaries[0].input_schema["required"], json!(["text"]));
        assert_eq!(summaries[0].output_schema["required"], json!([]));
    }
}
