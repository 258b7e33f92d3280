//! Flow error taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::MedflowError;
use crate::schema::ValidationError;
use crate::template::TemplateError;

/// Errors a flow can fail with
#[derive(Debug, Clone, Error)]
pub enum FlowError {
    /// Request did not match the input schema (or a flow-specific rule)
    #[error("Flow '{flow}': invalid input: {reason}")]
    InputInvalid { flow: String, reason: String },

    /// Capability could not be reached, refused, or timed out
    #[error("Flow '{flow}': model unavailable: {message}")]
    ModelUnavailable { flow: String, message: String },

    /// Capability answered with an error
    #[error("Flow '{flow}': model error: {message}")]
    ModelError { flow: String, message: String },

    /// Capability output did not match the output schema
    #[error("Flow '{flow}': invalid output: {error}")]
    OutputInvalid {
        flow: String,
        error: ValidationError,
    },

    /// Speech capability returned no media
    #[error("Flow '{flow}': speech synthesis produced no audio")]
    SynthesisFailed { flow: String },

    /// A flow with this name is already registered
    #[error("Flow '{0}' is already registered")]
    DuplicateFlowName(String),

    /// No flow with this name is registered
    #[error("Flow '{0}' is not registered")]
    UnknownFlow(String),

    /// Flow definition is inconsistent (template vs. schema)
    #[error("Flow '{flow}': invalid definition: {message}")]
    Configuration { flow: String, message: String },
}

/// Result type for flow operations
pub type FlowResult<T> = Result<T, FlowError>;

/// Error kind, without the detail payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowErrorKind {
    InputInvalid,
    ModelUnavailable,
    ModelError,
    OutputInvalid,
    SynthesisFailed,
    DuplicateFlowName,
    UnknownFlow,
    Configuration,
}

impl std::fmt::Display for FlowErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FlowErrorKind::InputInvalid => "InputInvalid",
            FlowErrorKind::ModelUnavailable => "ModelUnavailable",
            FlowErrorKind::ModelError => "ModelError",
            FlowErrorKind::OutputInvalid => "OutputInvalid",
            FlowErrorKind::SynthesisFailed => "SynthesisFailed",
            FlowErrorKind::DuplicateFlowName => "DuplicateFlowName",
            FlowErrorKind::UnknownFlow => "UnknownFlow",
            FlowErrorKind::Configuration => "Configuration",
        };
        f.write_str(name)
    }
}

impl FlowError {
    pub fn kind(&self) -> FlowErrorKind {
        match self {
            FlowError::InputInvalid { .. } => FlowErrorKind::InputInvalid,
            FlowError::ModelUnavailable { .. } => FlowErrorKind::ModelUnavailable,
            FlowError::ModelError { .. } => FlowErrorKind::ModelError,
            FlowError::OutputInvalid { .. } => FlowErrorKind::OutputInvalid,
            FlowError::SynthesisFailed { .. } => FlowErrorKind::SynthesisFailed,
            FlowError::DuplicateFlowName(_) => FlowErrorKind::DuplicateFlowName,
            FlowError::UnknownFlow(_) => FlowErrorKind::UnknownFlow,
            FlowError::Configuration { .. } => FlowErrorKind::Configuration,
        }
    }

    pub(crate) fn input_invalid(flow: &str, reason: impl Into<String>) -> Self {
        FlowError::InputInvalid {
            flow: flow.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify a capability failure
    pub(crate) fn from_capability(flow: &str, err: MedflowError) -> Self {
        if err.is_unavailable() {
            FlowError::ModelUnavailable {
                flow: flow.to_string(),
                message: err.to_string(),
            }
        } else {
            FlowError::ModelError {
                flow: flow.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub(crate) fn from_template(flow: &str, err: TemplateError) -> Self {
        FlowError::Configuration {
            flow: flow.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_capability_classification() {
        let unavailable = FlowError::from_capability("f", MedflowError::Unavailable("503".into()));
        assert_eq!(unavailable.kind(), FlowErrorKind::ModelUnavailable);

        let timeout =
            FlowError::from_capability("f", MedflowError::Timeout(Duration::from_secs(1)));
        assert_eq!(timeout.kind(), FlowErrorKind::ModelUnavailable);

        let error = FlowError::from_capability("f", MedflowError::Provider("400".into()));
        assert_eq!(error.kind(), FlowErrorKind::ModelError);
    }

    #[test]
    fn test_kind_display_and_serde() {
        assert_eq!(FlowErrorKind::OutputInvalid.to_string(), "OutputInvalid");
        assert_eq!(
            serde_json::to_value(FlowErrorKind::SynthesisFailed).unwrap(),
            "synthesis_failed"
        );
    }

    #[test]
    fn test_messages() {
        let err = FlowError::input_invalid(
            "explainMedicalTerm",
            "term: expected non-blank string, got blank string",
        );
        assert_eq!(
            err.to_string(),
            "Flow 'explainMedicalTerm': invalid input: term: expected non-blank string, got blank string"
        );
        assert_eq!(
            FlowError::DuplicateFlowName("generateSpeech".into()).to_string(),
            "Flow 'generateSpeech' is already registered"
        );
    }
}
