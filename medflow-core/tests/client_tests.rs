//! Invocation client tests: optimistic insert, reconciliation, failure policy

use std::sync::Arc;
use std::time::Duration;

use medflow_core::client::{ChannelNotifier, NotificationVariant, RecordState};
use medflow_core::prelude::*;
use serde_json::json;

fn app(
    text: Arc<StubCapability>,
    voice: Arc<StubCapability>,
) -> (App, tokio::sync::mpsc::UnboundedReceiver<Notification>) {
    let (notifier, rx) = ChannelNotifier::channel();
    let app = App::new(
        MedflowConfig::default(),
        Arc::new(Session::in_memory()),
        text,
        voice,
        Arc::new(notifier),
    )
    .expect("app assembles");
    (app, rx)
}

#[tokio::test]
async fn test_failed_explanation_leaves_history_unchanged() {
    let text = Arc::new(StubCapability::with_responses(vec![
        StubResponse::success(json!({"explanation": "Swelling caused by fluid."})),
        StubResponse::error(StubError::Provider("model exploded".into())),
    ]));
    let (app, mut rx) = app(text, Arc::new(StubCapability::returning(json!({}))));
    let client = app.chatbot();

    client.submit(TermExplanationRequest::new("Edema")).await.unwrap();
    let before = client.history().read().await.ids();

    let outcome = client
        .submit(TermExplanationRequest::new("Angina"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        SubmitOutcome::Failed { kind: FlowErrorKind::ModelError, retained: false, .. }
    ));
    assert_eq!(client.history().read().await.ids(), before);

    let notice = rx.try_recv().unwrap();
    assert_eq!(notice.variant, NotificationVariant::Destructive);
    assert_eq!(notice.title, "An error occurred");
    assert_eq!(notice.description, "Could not get an explanation. Please try again.");
}

#[tokio::test]
async fn test_failed_analysis_keeps_log_newest_first() {
    let text = Arc::new(StubCapability::with_responses(vec![
        StubResponse::success(json!({
            "summary": "Fatigue logged.",
            "potentialTriggers": [],
            "questionsForDoctor": [],
        })),
        StubResponse::error(StubError::Unavailable("503".into())),
    ]));
    let (app, mut rx) = app(text, Arc::new(StubCapability::returning(json!({}))));
    let client = app.symptom_log();

    let first = client
        .submit(SymptomLogForm::validate(&["fatigue"], "").unwrap())
        .await
        .unwrap();
    let second = client
        .submit(SymptomLogForm::validate(&["dizziness"], "stood up too fast").unwrap())
        .await
        .unwrap();

    let history = client.history();
    let history = history.read().await;
    assert_eq!(history.ids(), vec![second.id(), first.id()]);

    let failed = history.get(second.id()).unwrap();
    assert_eq!(failed.status(), InvocationStatus::Failed);
    assert_eq!(failed.request().notes, "stood up too fast");
    assert!(matches!(
        failed.state(),
        RecordState::Failed { kind: FlowErrorKind::ModelUnavailable, .. }
    ));

    assert_eq!(rx.try_recv().unwrap().title, "Analysis Failed");
}

#[tokio::test]
async fn test_speech_failure_discards_record() {
    let voice = Arc::new(StubCapability::returning(json!({})));
    let (app, mut rx) = app(Arc::new(StubCapability::returning(json!({}))), voice);

    let outcome = app
        .narration()
        .submit(SpeechRequest::new("Take a slow breath in."))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        SubmitOutcome::Failed { kind: FlowErrorKind::SynthesisFailed, retained: false, .. }
    ));
    assert!(app.narration().history().read().await.is_empty());
    assert_eq!(rx.try_recv().unwrap().description, "Could not generate audio. Please try again.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_histories_stay_independent() {
    let (text_stub, text_gate) = StubCapability::returning(json!({
        "explanation": "A slow heart rate.",
        "summary": "Chest pain logged.",
        "potentialTriggers": [],
        "questionsForDoctor": [],
    }))
    .gated();
    let (app, _rx) = app(
        Arc::new(text_stub),
        Arc::new(StubCapability::returning(json!({}))),
    );
    let app = Arc::new(app);

    let chat = {
        let app = app.clone();
        tokio::spawn(async move {
            app.chatbot()
                .submit(TermExplanationRequest::new("Bradycardia"))
                .await
        })
    };
    let log = {
        let app = app.clone();
        tokio::spawn(async move {
            app.symptom_log()
                .submit(SymptomAnalysisRequest::new(vec!["Chest pain".into()], ""))
                .await
        })
    };

    while !(app.chatbot().is_pending() && app.symptom_log().is_pending()) {
        tokio::task::yield_now().await;
    }
    // Both submissions are outstanding at once; release them.
    while !(chat.is_finished() && log.is_finished()) {
        text_gate.notify_one();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let chat = chat.await.unwrap().unwrap();
    let log = log.await.unwrap().unwrap();

    let chat_history = app.chatbot().history();
    let log_history = app.symptom_log().history();
    let chat_history = chat_history.read().await;
    let log_history = log_history.read().await;

    assert_eq!(chat_history.ids(), vec![chat.id()]);
    assert_eq!(log_history.ids(), vec![log.id()]);
    assert!(!chat_history.contains(log.id()));
    assert!(!log_history.contains(chat.id()));
}

#[tokio::test]
async fn test_empty_log_never_reaches_the_client() {
    let err = SymptomLogForm::validate::<&str>(&[], "").unwrap_err();
    assert_eq!(err.notification().unwrap().title, "Empty Log");
}
