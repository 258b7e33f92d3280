//! Capability stubbing for deterministic tests
//!
//! [`StubCapability`] returns predetermined responses in order, records every
//! prompt it receives and counts calls, so flow behaviour can be checked
//! without a live model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, RwLock};

use super::ModelCapability;
use crate::error::{MedflowError, Result};
use crate::llm::ModelInfo;
use crate::schema::Schema;

/// Predetermined response for a stub capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubResponse {
    /// Value to return on success
    pub value: Option<Value>,

    /// Error to return on failure
    pub error: Option<StubError>,

    /// Simulated delay in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

impl StubResponse {
    /// Create a successful response
    pub fn success(value: Value) -> Self {
        Self {
            value: Some(value),
            error: None,
            delay_ms: 0,
        }
    }

    /// Create a failing response
    pub fn error(error: StubError) -> Self {
        Self {
            value: None,
            error: Some(error),
            delay_ms: 0,
        }
    }

    /// Add a simulated delay
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// Failure a stub should produce
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum StubError {
    /// Provider unreachable or refusing requests
    Unavailable(String),
    /// Provider answered with an error
    Provider(String),
    /// Call exceeded its deadline
    Timeout,
}

impl From<&StubError> for MedflowError {
    fn from(error: &StubError) -> Self {
        match error {
            StubError::Unavailable(message) => MedflowError::Unavailable(message.clone()),
            StubError::Provider(message) => MedflowError::Provider(message.clone()),
            StubError::Timeout => MedflowError::Timeout(Duration::ZERO),
        }
    }
}

/// A capability that returns predetermined responses
pub struct StubCapability {
    responses: Arc<RwLock<Vec<StubResponse>>>,
    call_count: AtomicUsize,
    prompts: Arc<RwLock<Vec<String>>>,
    gate: Option<Arc<Notify>>,
}

impl StubCapability {
    /// Create a stub with a single response
    pub fn new(response: StubResponse) -> Self {
        Self::with_responses(vec![response])
    }

    /// Create a stub with multiple responses (returned in order, the last
    /// one repeating)
    pub fn with_responses(responses: Vec<StubResponse>) -> Self {
        Self {
            responses: Arc::new(RwLock::new(responses)),
            call_count: AtomicUsize::new(0),
            prompts: Arc::new(RwLock::new(Vec::new())),
            gate: None,
        }
    }

    /// Create a stub that always succeeds with `value`
    pub fn returning(value: Value) -> Self {
        Self::new(StubResponse::success(value))
    }

    /// Create a stub that always fails with `error`
    pub fn failing(error: StubError) -> Self {
        Self::new(StubResponse::error(error))
    }

    /// Hold every call until the returned handle is notified once per call.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Get the number of times this capability has been invoked
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get the prompts passed to each call
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.read().await.clone()
    }

    /// Reset call count and history
    pub async fn reset(&self) {
        self.call_count.store(0, Ordering::SeqCst);
        self.prompts.write().await.clear();
    }
}

#[async_trait]
impl ModelCapability for StubCapability {
    async fn invoke(&self, prompt: &str, _output_schema: &Schema) -> Result<Value> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.write().await.push(prompt.to_string());

        let response = {
            let responses = self.responses.read().await;
            responses
                .get(call_num)
                .or_else(|| responses.last())
                .cloned()
                .unwrap_or_else(|| StubResponse::success(Value::Null))
        };

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if response.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(response.delay_ms)).await;
        }

        match (&response.error, response.value) {
            (Some(error), _) => Err(error.into()),
            (None, value) => Ok(value.unwrap_or(Value::Null)),
        }
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "stub".to_string(),
            model_name: "stub".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::object("Out")
    }

    #[tokio::test]
    async fn test_responses_in_order_then_repeat_last() {
        let stub = StubCapability::with_responses(vec![
            StubResponse::success(json!({"n": 1})),
            StubResponse::success(json!({"n": 2})),
        ]);

        assert_eq!(stub.invoke("a", &schema()).await.unwrap()["n"], 1);
        assert_eq!(stub.invoke("b", &schema()).await.unwrap()["n"], 2);
        assert_eq!(stub.invoke("c", &schema()).await.unwrap()["n"], 2);
        assert_eq!(stub.call_count(), 3);
        assert_eq!(stub.prompts().await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failure_kinds() {
        let stub = StubCapability::failing(StubError::Unavailable("down".into()));
        assert!(stub.invoke("x", &schema()).await.unwrap_err().is_unavailable());

        let stub = StubCapability::failing(StubError::Provider("bad".into()));
        let err = stub.invoke("x", &schema()).await.unwrap_err();
        assert!(matches!(err, MedflowError::Provider(_)));
    }

    #[tokio::test]
    async fn test_gate_holds_call() {
        let (stub, gate) = StubCapability::returning(json!({"ok": true})).gated();
        let stub = Arc::new(stub);

        let task = {
            let stub = stub.clone();
            tokio::spawn(async move { stub.invoke("x", &Schema::object("Out")).await })
        };
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        gate.notify_one();
        assert_eq!(task.await.unwrap().unwrap()["ok"], true);
    }

    #[tokio::test]
    async fn test_reset() {
        let stub = StubCapability::returning(json!({}));
        stub.invoke("x", &schema()).await.unwrap();
        stub.reset().await;
        assert_eq!(stub.call_count(), 0);
        assert!(stub.prompts().await.is_empty());
    }

    #[test]
    fn test_stub_error_serde() {
        let error: StubError =
            serde_json::from_value(json!({"kind": "unavailable", "message": "503"})).unwrap();
        assert!(matches!(error, StubError::Unavailable(ref m) if m == "503"));
    }
}
