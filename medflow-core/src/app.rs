//! Application root: configuration, session, flows and per-page clients

use std::sync::Arc;
use tracing::info;

use crate::capability::{LLMCapability, ModelCapability, SpeechCapability, UnconfiguredCapability};
use crate::client::{ClientPolicy, InvocationClient, Notifier};
use crate::config::MedflowConfig;
use crate::error::{MedflowError, Result};
use crate::flow::FlowResult;
use crate::flows::{ExplainTermFlow, FlowSuite, SpeechFlow, SymptomAnalysisFlow};
use crate::llm::{LLMConfig, LLMProviderFactory};
use crate::session::Session;
use crate::speech::SpeechProviderFactory;

/// Everything a front end needs, built once at startup.
///
/// Each feature page gets its own client and history; nothing is shared
/// between them except the flow definitions.
pub struct App {
    config: MedflowConfig,
    session: Arc<Session>,
    flows: FlowSuite,
    chatbot: InvocationClient<ExplainTermFlow>,
    symptom_log: InvocationClient<SymptomAnalysisFlow>,
    narration: InvocationClient<SpeechFlow>,
}

impl App {
    /// Assemble from explicit capabilities
    pub fn new(
        config: MedflowConfig,
        session: Arc<Session>,
        text: Arc<dyn ModelCapability>,
        voice: Arc<dyn ModelCapability>,
        notifier: Arc<dyn Notifier>,
    ) -> FlowResult<Self> {
        let flows = FlowSuite::new(text, voice)?;

        let chatbot = InvocationClient::new(
            Arc::new(flows.explain_term().clone()),
            ClientPolicy::term_explanation(),
            notifier.clone(),
        );
        let symptom_log = InvocationClient::new(
            Arc::new(flows.symptom_analysis().clone()),
            ClientPolicy::symptom_analysis(),
            notifier.clone(),
        );
        let narration = InvocationClient::new(
            Arc::new(flows.speech().clone()),
            ClientPolicy::speech(),
            notifier,
        );

        Ok(Self {
            config,
            session,
            flows,
            chatbot,
            symptom_log,
            narration,
        })
    }

    /// Assemble from configuration, building providers through the factories.
    ///
    /// A missing provider section leaves its flows registered but failing as
    /// unavailable.
    pub async fn from_config(
        config: MedflowConfig,
        session: Arc<Session>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let timeout = config.invocation.request_timeout;

        let text: Arc<dyn ModelCapability> =
            match LLMProviderFactory::from_config(config.llm.as_ref()).await? {
                Some(provider) => {
                    let info = provider.model_info();
                    info!(
                        provider = %info.provider,
                        model = %info.model_name,
                        "LLM provider ready"
                    );
                    let llm_config = LLMConfig::new()
                        .with_temperature(config.invocation.temperature)
                        .with_max_tokens(config.invocation.max_tokens);
                    Arc::new(
                        LLMCapability::new(provider)
                            .with_config(llm_config)
                            .with_timeout(timeout),
                    )
                }
                None => Arc::new(UnconfiguredCapability::new("LLM")),
            };

        let voice: Arc<dyn ModelCapability> =
            match SpeechProviderFactory::from_config(config.speech.as_ref()).await? {
                Some(provider) => {
                    let info = provider.model_info();
                    info!(
                        provider = %info.provider,
                        model = %info.model_name,
                        "speech provider ready"
                    );
                    Arc::new(SpeechCapability::new(provider).with_timeout(timeout))
                }
                None => Arc::new(UnconfiguredCapability::new("speech")),
            };

        Self::new(config, session, text, voice, notifier)
            .map_err(|e| MedflowError::Configuration(e.to_string()))
    }

    pub fn config(&self) -> &MedflowConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn flows(&self) -> &FlowSuite {
        &self.flows
    }

    /// Medical term chatbot page
    pub fn chatbot(&self) -> &InvocationClient<ExplainTermFlow> {
        &self.chatbot
    }

    /// Symptom logger page
    pub fn symptom_log(&self) -> &InvocationClient<SymptomAnalysisFlow> {
        &self.symptom_log
    }

    /// Article narration
    pub fn narration(&self) -> &InvocationClient<SpeechFlow> {
        &self.narration
    }
}
