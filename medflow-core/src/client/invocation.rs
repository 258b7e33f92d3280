//! Invocation client: submit, track, reconcile
//!
//! A client belongs to one form. Submitting inserts a pending record into the
//! client's history straight away, runs the flow, then settles that record by
//! identity. What happens to a failed record is a per-feature policy:
//! the symptom logger keeps it (the entry is saved without analysis), the
//! chatbot and narration drop it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::history::{History, HistoryError, HistoryOrder, SharedHistory};
use super::notification::{Notification, Notifier};
use super::record::{FlowInvocationRecord, RecordId};
use crate::flow::{Flow, FlowErrorKind};

/// What to do with a record whose flow failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the record, marked failed
    Retain,
    /// Remove the record from the history
    Discard,
}

/// Per-feature client behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPolicy {
    pub on_failure: FailurePolicy,
    pub order: HistoryOrder,
    /// Shown when a submission fails
    pub failure_notice: Notification,
}

impl ClientPolicy {
    /// Medical term chatbot
    pub fn term_explanation() -> Self {
        Self {
            on_failure: FailurePolicy::Discard,
            order: HistoryOrder::OldestFirst,
            failure_notice: Notification::destructive(
                "An error occurred",
                "Could not get an explanation. Please try again.",
            ),
        }
    }

    /// Symptom logger
    pub fn symptom_analysis() -> Self {
        Self {
            on_failure: FailurePolicy::Retain,
            order: HistoryOrder::NewestFirst,
            failure_notice: Notification::destructive(
                "Analysis Failed",
                "The AI analysis could not be completed. The log has been saved without it.",
            ),
        }
    }

    /// Article narration
    pub fn speech() -> Self {
        Self {
            on_failure: FailurePolicy::Discard,
            order: HistoryOrder::OldestFirst,
            failure_notice: Notification::destructive(
                "Error",
                "Could not generate audio. Please try again.",
            ),
        }
    }
}

/// Submission refused before anything was recorded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("A submission is already pending for '{0}'")]
    Busy(String),
}

/// How a submission ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Record settled as succeeded
    Succeeded(RecordId),
    /// Flow failed; `retained` tells whether the record is still listed
    Failed {
        id: RecordId,
        kind: FlowErrorKind,
        retained: bool,
    },
    /// Record was removed while the flow ran; the result was dropped
    Evicted(RecordId),
}

impl SubmitOutcome {
    pub fn id(&self) -> RecordId {
        match self {
            SubmitOutcome::Succeeded(id) | SubmitOutcome::Evicted(id) => *id,
            SubmitOutcome::Failed { id, .. } => *id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Succeeded(_))
    }
}

/// Clears the in-flight flag when the submission ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Calls one flow on behalf of one form and reconciles into its history
pub struct InvocationClient<F: Flow> {
    flow: Arc<F>,
    history: SharedHistory<F::Request, F::Response>,
    policy: ClientPolicy,
    notifier: Arc<dyn Notifier>,
    in_flight: AtomicBool,
}

impl<F: Flow> InvocationClient<F> {
    /// Client with a fresh history
    pub fn new(flow: Arc<F>, policy: ClientPolicy, notifier: Arc<dyn Notifier>) -> Self {
        let history = History::shared(policy.order);
        Self::with_history(flow, policy, notifier, history)
    }

    /// Client reconciling into an existing history
    pub fn with_history(
        flow: Arc<F>,
        policy: ClientPolicy,
        notifier: Arc<dyn Notifier>,
        history: SharedHistory<F::Request, F::Response>,
    ) -> Self {
        Self {
            flow,
            history,
            policy,
            notifier,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn history(&self) -> SharedHistory<F::Request, F::Response> {
        self.history.clone()
    }

    pub fn policy(&self) -> &ClientPolicy {
        &self.policy
    }

    pub fn flow(&self) -> &F {
        &self.flow
    }

    /// Whether a submission is outstanding (the submit control is disabled)
    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit a request and wait for it to be reconciled.
    ///
    /// Fails only with [`SubmitError::Busy`]; flow failures are reconciled
    /// into the history, announced through the notifier, and reported in
    /// the outcome.
    pub async fn submit(&self, request: F::Request) -> Result<SubmitOutcome, SubmitError> {
        let _guard = InFlight::acquire(&self.in_flight)
            .ok_or_else(|| SubmitError::Busy(self.flow.name().to_string()))?;

        let record = FlowInvocationRecord::pending(self.flow.name(), request.clone());
        let id = self.history.write().await.insert(record);
        debug!(flow = self.flow.name(), record_id = %id, "record pending");

        let result = self.flow.run(request).await;

        let mut history = self.history.write().await;
        match result {
            Ok(response) => match history.resolve(id, response) {
                Ok(()) => {
                    info!(flow = self.flow.name(), record_id = %id, "record succeeded");
                    Ok(SubmitOutcome::Succeeded(id))
                }
                Err(e) => {
                    debug!(
                        flow = self.flow.name(),
                        record_id = %id,
                        error = %e,
                        "late result dropped"
                    );
                    Ok(SubmitOutcome::Evicted(id))
                }
            },
            Err(error) => {
                let kind = error.kind();
                warn!(flow = self.flow.name(), record_id = %id, kind = %kind, "record failed");

                let retained = match self.policy.on_failure {
                    FailurePolicy::Retain => match history.fail(id, &error) {
                        Ok(()) => true,
                        Err(HistoryError::NotFound(_)) => {
                            debug!(
                                flow = self.flow.name(),
                                record_id = %id,
                                "late failure dropped"
                            );
                            false
                        }
                        Err(e) => {
                            warn!(
                                flow = self.flow.name(),
                                record_id = %id,
                                error = %e,
                                "record not updated"
                            );
                            true
                        }
                    },
                    FailurePolicy::Discard => {
                        history.remove(id);
                        false
                    }
                };
                drop(history);

                self.notifier.notify(self.policy.failure_notice.clone());
                Ok(SubmitOutcome::Failed { id, kind, retained })
            }
        }
    }
}
