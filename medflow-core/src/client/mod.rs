//! Invocation client layer: forms, records, histories, notifications

mod forms;
mod history;
mod invocation;
mod notification;
mod record;

pub use forms::{COMMON_SYMPTOMS, CatalogSymptom, FormError, SymptomLogForm, TermForm};
pub use history::{History, HistoryError, HistoryOrder, SharedHistory};
pub use invocation::{ClientPolicy, FailurePolicy, InvocationClient, SubmitError, SubmitOutcome};
pub use notification::{
    ChannelNotifier, LogNotifier, Notification, NotificationVariant, Notifier,
};
pub use record::{
    AlreadySettled, FlowInvocationRecord, InvocationStatus, RecordId, RecordState,
    display_timestamp,
};
