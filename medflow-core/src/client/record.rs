//! Invocation records: one per user submission

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::flow::{FlowError, FlowErrorKind};

/// Unique identity of an invocation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a record is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    Pending,
    Succeeded,
    Failed,
}

impl std::fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvocationStatus::Pending => write!(f, "pending"),
            InvocationStatus::Succeeded => write!(f, "succeeded"),
            InvocationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Record state, carrying the result or the failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordState<Res> {
    Pending,
    Succeeded { result: Res },
    Failed { kind: FlowErrorKind, error: String },
}

/// A record was asked to settle twice
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Record {id} already {status}")]
pub struct AlreadySettled {
    pub id: RecordId,
    pub status: InvocationStatus,
}

/// One user-initiated call's lifecycle: Pending, then exactly one of
/// Succeeded or Failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowInvocationRecord<Req, Res> {
    id: RecordId,
    flow: String,
    request: Req,
    state: RecordState<Res>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl<Req, Res> FlowInvocationRecord<Req, Res> {
    /// New pending record for `request`
    pub fn pending(flow: impl Into<String>, request: Req) -> Self {
        Self {
            id: RecordId::new(),
            flow: flow.into(),
            request,
            state: RecordState::Pending,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn flow(&self) -> &str {
        &self.flow
    }

    pub fn request(&self) -> &Req {
        &self.request
    }

    pub fn state(&self) -> &RecordState<Res> {
        &self.state
    }

    pub fn status(&self) -> InvocationStatus {
        match self.state {
            RecordState::Pending => InvocationStatus::Pending,
            RecordState::Succeeded { .. } => InvocationStatus::Succeeded,
            RecordState::Failed { .. } => InvocationStatus::Failed,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, RecordState::Pending)
    }

    pub fn result(&self) -> Option<&Res> {
        match &self.state {
            RecordState::Succeeded { result } => Some(result),
            _ => None,
        }
    }

    /// Failure kind and message, if the record failed
    pub fn failure(&self) -> Option<(FlowErrorKind, &str)> {
        match &self.state {
            RecordState::Failed { kind, error } => Some((*kind, error.as_str())),
            _ => None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Local-time creation stamp, e.g. "October 18, 2026 at 3:04 PM"
    pub fn logged_on(&self) -> String {
        display_timestamp(&self.created_at.with_timezone(&Local))
    }

    /// Pending to Succeeded
    pub fn succeed(&mut self, result: Res) -> Result<(), AlreadySettled> {
        self.settle(RecordState::Succeeded { result })
    }

    /// Pending to Failed
    pub fn fail(&mut self, error: &FlowError) -> Result<(), AlreadySettled> {
        self.settle(RecordState::Failed {
            kind: error.kind(),
            error: error.to_string(),
        })
    }

    fn settle(&mut self, state: RecordState<Res>) -> Result<(), AlreadySettled> {
        if !self.is_pending() {
            return Err(AlreadySettled {
                id: self.id,
                status: self.status(),
            });
        }
        self.state = state;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// Format a timestamp the way history entries show it
pub fn display_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%B %-d, %Y at %-I:%M %p").to_string()
}
