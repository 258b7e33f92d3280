//! Error types for Medflow operations

use std::time::Duration;

/// Result type for Medflow operations
pub type Result<T> = std::result::Result<T, MedflowError>;

/// Error types for the Medflow runtime
///
/// These cover everything outside the flow contract itself: configuration,
/// provider transport, session storage. The flow layer translates provider
/// failures into [`crate::flow::FlowError`] kinds.
#[derive(Debug, thiserror::Error)]
pub enum MedflowError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider could not be reached or is temporarily refusing requests
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Provider answered, but with an error or an unusable body
    #[error("Provider error: {0}")]
    Provider(String),

    /// Capability call exceeded its deadline
    #[error("Capability timed out after {0:?}")]
    Timeout(Duration),

    /// Session storage error
    #[error("Session error: {0}")]
    Session(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl MedflowError {
    /// Whether the failure means the capability could not serve the request
    /// at all (as opposed to serving it badly).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, MedflowError::Unavailable(_) | MedflowError::Timeout(_))
    }
}

impl From<String> for MedflowError {
    fn from(s: String) -> Self {
        MedflowError::Other(s)
    }
}

impl From<&str> for MedflowError {
    fn from(s: &str) -> Self {
        MedflowError::Other(s.to_string())
    }
}

impl From<anyhow::Error> for MedflowError {
    fn from(err: anyhow::Error) -> Self {
        MedflowError::Other(err.to_string())
    }
}
