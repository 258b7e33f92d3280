//! # Medflow Core
//!
//! Schema-typed AI flows for personal health tracking, and the client-side
//! orchestration that invokes them.
//!
//! - [`schema`]: tagged schema descriptors and one generic validator
//! - [`template`]: substitution-only prompt templates
//! - [`flow`]: flow definitions, error taxonomy, registry
//! - [`flows`]: term explanation, symptom analysis, speech synthesis
//! - [`capability`]: the model capability seam (LLM, speech, stub)
//! - [`client`]: invocation records, histories, failure policy, forms
//! - [`session`]: explicit session state
//! - [`app`]: the assembled application root

pub mod app;
pub mod capability;
pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod flows;
pub mod llm;
pub mod schema;
pub mod session;
pub mod speech;
pub mod template;

pub use error::{MedflowError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::app::App;
    pub use crate::capability::{ModelCapability, StubCapability, StubError, StubResponse};
    pub use crate::client::{
        ChannelNotifier, ClientPolicy, FailurePolicy, History, HistoryOrder, InvocationClient,
        InvocationStatus, LogNotifier, Notification, Notifier, SubmitError, SubmitOutcome,
        SymptomLogForm, TermForm,
    };
    pub use crate::config::MedflowConfig;
    pub use crate::error::{MedflowError, Result};
    pub use crate::flow::{Flow, FlowError, FlowErrorKind, FlowRegistry, FlowResult, FlowSpec};
    pub use crate::flows::{
        FlowSuite, SpeechRequest, SpeechResult, SymptomAnalysisRequest, SymptomAnalysisResult,
        TermExplanationRequest, TermExplanationResult,
    };
    pub use crate::schema::{FieldSpec, FieldType, Schema, ValidationError, validate};
    pub use crate::session::{FileSessionStore, MemorySessionStore, Session, SessionStore};
}
