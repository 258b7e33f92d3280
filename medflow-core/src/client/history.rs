//! Ordered, identity-keyed invocation history

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use super::record::{AlreadySettled, FlowInvocationRecord, RecordId};
use crate::flow::FlowError;

/// Where new records go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOrder {
    /// Append (chat transcript)
    OldestFirst,
    /// Prepend (log book)
    NewestFirst,
}

/// Reconciliation could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// Record was removed before its result arrived
    #[error("Record {0} is no longer in the history")]
    NotFound(RecordId),

    #[error(transparent)]
    AlreadySettled(#[from] AlreadySettled),
}

/// A feature page's visible history
///
/// Records are keyed by identity, so settling one is a map lookup rather
/// than a scan, and keeps the record at its position.
#[derive(Debug, Clone)]
pub struct History<Req, Res> {
    records: IndexMap<RecordId, FlowInvocationRecord<Req, Res>>,
    order: HistoryOrder,
}

/// A history shared between a client and whoever renders it
pub type SharedHistory<Req, Res> = Arc<RwLock<History<Req, Res>>>;

impl<Req, Res> History<Req, Res> {
    pub fn new(order: HistoryOrder) -> Self {
        Self {
            records: IndexMap::new(),
            order,
        }
    }

    pub fn shared(order: HistoryOrder) -> SharedHistory<Req, Res> {
        Arc::new(RwLock::new(Self::new(order)))
    }

    pub fn order(&self) -> HistoryOrder {
        self.order
    }

    /// Insert a record at the head or tail, per the history's order
    pub fn insert(&mut self, record: FlowInvocationRecord<Req, Res>) -> RecordId {
        let id = record.id();
        match self.order {
            HistoryOrder::OldestFirst => {
                self.records.insert(id, record);
            }
            HistoryOrder::NewestFirst => {
                self.records.shift_insert(0, id, record);
            }
        }
        id
    }

    /// Settle a pending record as succeeded, in place
    pub fn resolve(&mut self, id: RecordId, result: Res) -> Result<(), HistoryError> {
        let record = self.records.get_mut(&id).ok_or(HistoryError::NotFound(id))?;
        record.succeed(result)?;
        Ok(())
    }

    /// Settle a pending record as failed, in place
    pub fn fail(&mut self, id: RecordId, error: &FlowError) -> Result<(), HistoryError> {
        let record = self.records.get_mut(&id).ok_or(HistoryError::NotFound(id))?;
        record.fail(error)?;
        Ok(())
    }

    /// Remove a record, keeping the others in order
    pub fn remove(&mut self, id: RecordId) -> Option<FlowInvocationRecord<Req, Res>> {
        self.records.shift_remove(&id)
    }

    pub fn get(&self, id: RecordId) -> Option<&FlowInvocationRecord<Req, Res>> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    /// Records in display order
    pub fn iter(&self) -> impl Iterator<Item = &FlowInvocationRecord<Req, Res>> {
        self.records.values()
    }

    /// Record ids in display order
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.keys().copied().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.records.values().filter(|r| r.is_pending()).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::record::InvocationStatus;

    type Rec = FlowInvocationRecord<String, String>;

    fn error() -> FlowError {
        FlowError::ModelError {
            flow: "f".into(),
            message: "boom".into(),
        }
    }

    #[test]
    fn test_oldest_first_appends() {
        let mut history = History::new(HistoryOrder::OldestFirst);
        let a = history.insert(Rec::pending("f", "a".into()));
        let b = history.insert(Rec::pending("f", "b".into()));
        assert_eq!(history.ids(), vec![a, b]);
    }

    #[test]
    fn test_newest_first_prepends() {
        let mut history = History::new(HistoryOrder::NewestFirst);
        let a = history.insert(Rec::pending("f", "a".into()));
        let b = history.insert(Rec::pending("f", "b".into()));
        assert_eq!(history.ids(), vec![b, a]);
    }

    #[test]
    fn test_resolve_keeps_position() {
        let mut history = History::new(HistoryOrder::OldestFirst);
        let a = history.insert(Rec::pending("f", "a".into()));
        let b = history.insert(Rec::pending("f", "b".into()));
        let c = history.insert(Rec::pending("f", "c".into()));

        history.resolve(b, "done".into()).unwrap();
        history.fail(a, &error()).unwrap();

        assert_eq!(history.ids(), vec![a, b, c]);
        assert_eq!(history.get(b).unwrap().status(), InvocationStatus::Succeeded);
        assert_eq!(history.get(a).unwrap().status(), InvocationStatus::Failed);
        assert_eq!(history.pending_count(), 1);
    }

    #[test]
    fn test_remove_then_late_resolve() {
        let mut history = History::new(HistoryOrder::NewestFirst);
        let a = history.insert(Rec::pending("f", "a".into()));
        let b = history.insert(Rec::pending("f", "b".into()));
        let c = history.insert(Rec::pending("f", "c".into()));

        assert!(history.remove(b).is_some());
        assert_eq!(history.ids(), vec![c, a]);
        assert_eq!(history.resolve(b, "late".into()), Err(HistoryError::NotFound(b)));
    }

    #[test]
    fn test_double_settle_rejected() {
        let mut history = History::new(HistoryOrder::OldestFirst);
        let a = history.insert(Rec::pending("f", "a".into()));
        history.resolve(a, "one".into()).unwrap();
        assert!(matches!(
            history.fail(a, &error()),
            Err(HistoryError::AlreadySettled(_))
        ));
        assert_eq!(history.get(a).unwrap().result().map(String::as_str), Some("one"));
    }
}
