//! The three health flows and their shared registration
//!
//! - [`ExplainTermFlow`] (`explainMedicalTerm`)
//! - [`SymptomAnalysisFlow`] (`analyzeSymptomLog`)
//! - [`SpeechFlow`] (`generateSpeech`)

use std::sync::Arc;

use crate::capability::ModelCapability;
use crate::flow::{Flow, FlowRegistry, FlowResult};

pub mod explain_term;
pub mod speech;
pub mod symptom_analysis;

pub use explain_term::{ExplainTermFlow, TermExplanationRequest, TermExplanationResult};
pub use speech::{SpeechFlow, SpeechRequest, SpeechResult};
pub use symptom_analysis::{SymptomAnalysisFlow, SymptomAnalysisRequest, SymptomAnalysisResult};

/// All three flows, registered once at startup
#[derive(Debug)]
pub struct FlowSuite {
    registry: FlowRegistry,
    explain: ExplainTermFlow,
    symptoms: SymptomAnalysisFlow,
    speech: SpeechFlow,
}

impl FlowSuite {
    /// Register the flows. `text` backs the structured flows, `voice`
    /// backs narration.
    pub fn new(
        text: Arc<dyn ModelCapability>,
        voice: Arc<dyn ModelCapability>,
    ) -> FlowResult<Self> {
        let mut registry = FlowRegistry::new();
        let explain = ExplainTermFlow::new(registry.register(explain_term::spec(text.clone())?)?);
        let symptoms =
            SymptomAnalysisFlow::new(registry.register(symptom_analysis::spec(text)?)?);
        let speech = SpeechFlow::new(registry.register(speech::spec(voice)?)?);

        Ok(Self {
            registry,
            explain,
            symptoms,
            speech,
        })
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    pub fn explain_term(&self) -> &ExplainTermFlow {
        &self.explain
    }

    pub fn symptom_analysis(&self) -> &SymptomAnalysisFlow {
        &self.symptoms
    }

    pub fn speech(&self) -> &SpeechFlow {
        &self.speech
    }

    /// Explain a medical term in plain language
    pub async fn explain_medical_term(
        &self,
        request: TermExplanationRequest,
    ) -> FlowResult<TermExplanationResult> {
        self.explain.run(request).await
    }

    /// Summarize a symptom log for a doctor's visit
    pub async fn analyze_symptom_log(
        &self,
        request: SymptomAnalysisRequest,
    ) -> FlowResult<SymptomAnalysisResult> {
        self.symptoms.run(request).await
    }

    /// Narrate text as audio
    pub async fn generate_speech(&self, request: SpeechRequest) -> FlowResult<SpeechResult> {
        self.speech.run(request).await
    }
}
