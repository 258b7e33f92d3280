//! Flow layer
//!
//! A [`FlowSpec`] binds an input schema, an output schema and a prompt
//! template to a [`crate::capability::ModelCapability`]. Concrete features
//! implement [`Flow`] on top of a spec, adding typed requests/responses and
//! any feature-specific pre-checks (see [`crate::flows`]).

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

mod error;
mod registry;
mod spec;

pub use error::{FlowError, FlowErrorKind, FlowResult};
pub use registry::{FlowRegistry, FlowSummary};
pub use spec::FlowSpec;

/// A typed flow entry point
#[async_trait]
pub trait Flow: Send + Sync {
    /// Request type
    type Request: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Response type
    type Response: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Registered flow name
    fn name(&self) -> &str;

    /// Run the flow for one request
    async fn run(&self, request: Self::Request) -> FlowResult<Self::Response>;
}

/// Serialize a typed request into the value a [`FlowSpec`] validates.
pub(crate) fn to_input<T: Serialize>(flow: &str, request: &T) -> FlowResult<serde_json::Value> {
    serde_json::to_value(request).map_err(|e| FlowError::input_invalid(flow, e.to_string()))
}

/// Deserialize a schema-validated output into its typed response.
pub(crate) fn from_output<T: DeserializeOwned>(
    spec: &FlowSpec,
    output: serde_json::Value,
) -> FlowResult<T> {
    serde_json::from_value(output).map_err(|e| FlowError::OutputInvalid {
        flow: spec.name().to_string(),
        error: crate::schema::ValidationError::new("$", spec.output_schema().name(), e.to_string()),
    })
}
