//! Symptom log analysis

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::capability::ModelCapability;
use crate::flow::{Flow, FlowError, FlowResult, FlowSpec, from_output, to_input};
use crate::schema::{FieldSpec, FieldType, Schema};
use crate::template::PromptTemplate;

pub const FLOW_NAME: &str = "analyzeSymptomLog";

/// Summary returned, without a model call, for a log with nothing in it
pub const EMPTY_LOG_SUMMARY: &str = "No symptoms or notes were provided for this log.";

const PROMPT: &str = r#"You are a helpful and cautious health assistant AI. Your role is to analyze a user's symptom log to help them prepare for a doctor's visit.

You MUST NOT provide any form of medical advice, diagnosis, or interpretation of the severity of the symptoms. Your response must be neutral and objective.

Based on the following symptoms and notes, you will:
1.  Generate a brief, one or two-sentence summary of the user's log.
2.  Identify potential triggers ONLY if they are explicitly mentioned in the user's notes (e.g., 'after eating spicy food', 'during a stressful meeting', 'after my morning walk'). Do not infer or guess triggers. If none are mentioned, return an empty array.
3.  Suggest a few neutral questions the user could ask their doctor. These questions should be aimed at facilitating a conversation, not at seeking a diagnosis from you. Frame them like "I noticed [symptom] when [context], could we talk about that?"

Symptom List:
{{#each symptoms}}
- {{{this}}}
{{/each}}

User's Notes:
"{{{notes}}}"

Your entire response must be in the structured JSON format defined by the output schema.
"#;

/// Symptoms picked by the user plus free-text notes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SymptomAnalysisRequest {
    pub symptoms: Vec<String>,
    pub notes: String,
}

impl SymptomAnalysisRequest {
    pub fn new(symptoms: Vec<String>, notes: impl Into<String>) -> Self {
        Self {
            symptoms,
            notes: notes.into(),
        }
    }

    /// No symptoms selected and nothing but whitespace in the notes
    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty() && self.notes.trim().is_empty()
    }
}

/// Neutral summary, stated triggers and questions for a clinician
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomAnalysisResult {
    pub summary: String,
    pub potential_triggers: Vec<String>,
    pub questions_for_doctor: Vec<String>,
    /// Any further fields the model returned, kept as is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SymptomAnalysisResult {
    /// Fixed result for an empty log
    pub fn empty_log() -> Self {
        Self {
            summary: EMPTY_LOG_SUMMARY.to_string(),
            potential_triggers: Vec::new(),
            questions_for_doctor: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Build the flow definition
pub fn spec(capability: Arc<dyn ModelCapability>) -> FlowResult<FlowSpec> {
    let input = Schema::object("SymptomAnalysisInput")
        .field(
            "symptoms",
            FieldSpec::array(FieldType::String)
                .describe("A list of symptoms the user has selected."),
        )
        .field(
            "notes",
            FieldSpec::string().describe("Free-text notes from the user about their symptoms."),
        );
    let output = Schema::object("SymptomAnalysisOutput")
        .field(
            "summary",
            FieldSpec::string()
                .describe("A brief, neutral summary of the logged symptoms and notes."),
        )
        .field(
            "potentialTriggers",
            FieldSpec::array(FieldType::String).describe(
                "A list of potential lifestyle or environmental triggers explicitly mentioned in the user's notes.",
            ),
        )
        .field(
            "questionsForDoctor",
            FieldSpec::array(FieldType::String).describe(
                "A list of suggested, neutrally-phrased questions the user could ask their doctor.",
            ),
        );
    let template = PromptTemplate::parse("symptomAnalyzerPrompt", PROMPT)
        .map_err(|e| FlowError::from_template(FLOW_NAME, e))?;

    FlowSpec::new(FLOW_NAME, input, output, template, capability)
}

/// Analyzes a symptom log. An empty log short-circuits to
/// [`SymptomAnalysisResult::empty_log`]; otherwise the capability's
/// schema-valid output is returned as is.
#[derive(Debug, Clone)]
pub struct SymptomAnalysisFlow {
    spec: Arc<FlowSpec>,
}

impl SymptomAnalysisFlow {
    pub fn new(spec: Arc<FlowSpec>) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Flow for SymptomAnalysisFlow {
    type Request = SymptomAnalysisRequest;
    type Response = SymptomAnalysisResult;

    fn name(&self) -> &str {
        self.spec.name()
    }

    async fn run(&self, request: SymptomAnalysisRequest) -> FlowResult<SymptomAnalysisResult> {
        if request.is_empty() {
            debug!(flow = FLOW_NAME, "empty log, skipping capability");
            return Ok(SymptomAnalysisResult::empty_log());
        }

        let input = to_input(FLOW_NAME, &request)?;
        let output = self.spec.execute(input).await?;
        from_output(&self.spec, output)
    }
}
