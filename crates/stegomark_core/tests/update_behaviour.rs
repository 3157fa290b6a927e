use std::sync::Once;

use serde_json::json;
use stegomark_core::{
    update, Effect, FailureKind, JobError, JobState, JobStatus, Msg, ProgressEvent,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(stegomark_logging::initialize_for_tests);
}

fn submitted() -> JobState {
    let (state, effects) = update(JobState::new(), Msg::Submitted);
    assert!(effects.is_empty());
    state
}

fn complete(result: serde_json::Value) -> ProgressEvent {
    ProgressEvent {
        result: Some(result),
        ..ProgressEvent::new("complete", 100.0, "done")
    }
}

#[test]
fn submit_records_synthetic_init_progress() {
    init_logging();
    let state = submitted();

    assert_eq!(state.status(), JobStatus::Pending);
    let latest = state.latest_progress().expect("init progress");
    assert_eq!(latest.stage, "init");
    assert_eq!(latest.progress, 0.0);
    assert!(state.result().is_none());
    assert!(state.error().is_none());
}

#[test]
fn progress_events_replace_latest_without_clamping() {
    init_logging();
    let state = submitted();
    let (state, _) = update(
        state,
        Msg::Event(ProgressEvent::new("embedding", 60.0, "working")),
    );
    let (state, _) = update(
        state,
        Msg::Event(ProgressEvent::new("encoding", 20.0, "re-encoding")),
    );

    assert_eq!(state.status(), JobStatus::Pending);
    let latest = state.latest_progress().unwrap();
    assert_eq!(latest.stage, "encoding");
    assert_eq!(latest.progress, 20.0);
}

#[test]
fn complete_event_succeeds_with_result_and_full_progress() {
    init_logging();
    let state = submitted();
    let (state, effects) = update(state, Msg::Event(complete(json!({"x": 1}))));

    assert!(effects.is_empty());
    assert_eq!(state.status(), JobStatus::Succeeded);
    assert_eq!(state.result(), Some(&json!({"x": 1})));
    assert!(state.error().is_none());
    let latest = state.latest_progress().unwrap();
    assert_eq!(latest.progress, 100.0);
    assert_eq!(latest.message, "done");
    assert!(latest.result.is_none());
}

#[test]
fn complete_without_result_stores_null() {
    init_logging();
    let state = submitted();
    let (state, _) = update(
        state,
        Msg::Event(ProgressEvent::new("complete", 100.0, "done")),
    );

    assert_eq!(state.status(), JobStatus::Succeeded);
    assert_eq!(state.result(), Some(&serde_json::Value::Null));
}

#[test]
fn error_event_fails_with_server_message_verbatim() {
    init_logging();
    let state = submitted();
    let (state, _) = update(
        state,
        Msg::Event(ProgressEvent::new("error", 0.0, "Cannot open video")),
    );

    assert_eq!(state.status(), JobStatus::Failed);
    assert!(state.result().is_none());
    let error = state.error().unwrap();
    assert_eq!(error.kind, FailureKind::Server);
    assert_eq!(error.message, "Cannot open video");
}

#[test]
fn stream_end_without_terminal_record_fails() {
    init_logging();
    let state = submitted();
    let (state, _) = update(
        state,
        Msg::Event(ProgressEvent::new("upload", 100.0, "uploaded")),
    );
    let (state, _) = update(state, Msg::StreamEnded);

    assert_eq!(state.status(), JobStatus::Failed);
    assert_eq!(state.error().unwrap().kind, FailureKind::Truncated);
    assert!(state.result().is_none());
}

#[test]
fn transport_failure_keeps_status_code() {
    init_logging();
    let state = submitted();
    let (state, _) = update(
        state,
        Msg::Failed(JobError::http_status(404, Some("Not Found"))),
    );

    assert_eq!(state.status(), JobStatus::Failed);
    let error = state.error().unwrap();
    assert_eq!(error.kind, FailureKind::HttpStatus(404));
    assert!(error.message.contains("404"));
}

#[test]
fn terminal_states_ignore_late_messages() {
    init_logging();
    let state = submitted();
    let (state, _) = update(state, Msg::Event(complete(json!({"ok": true}))));
    let before = state.clone();

    let (state, _) = update(state, Msg::Event(ProgressEvent::new("late", 5.0, "late")));
    let (state, _) = update(state, Msg::StreamEnded);
    let (state, effects) = update(state, Msg::CancelRequested);

    assert_eq!(state.status(), JobStatus::Succeeded);
    assert_eq!(state.result(), before.result());
    assert_eq!(state.latest_progress(), before.latest_progress());
    assert!(effects.is_empty());
}

#[test]
fn cancel_while_pending_aborts_stream() {
    init_logging();
    let state = submitted();
    let (state, effects) = update(state, Msg::CancelRequested);

    assert_eq!(effects, vec![Effect::AbortStream]);
    assert_eq!(state.status(), JobStatus::Cancelled);
    assert_eq!(state.error().unwrap().kind, FailureKind::Cancelled);
    assert!(state.result().is_none());
}

#[test]
fn reset_returns_to_idle_and_releases_resources() {
    init_logging();
    let state = submitted();
    let (state, _) = update(state, Msg::Event(complete(json!(1))));
    let (state, effects) = update(state, Msg::Reset);

    assert_eq!(effects, vec![Effect::ReleaseResources]);
    assert_eq!(state.status(), JobStatus::Idle);
    assert!(state.latest_progress().is_none());
    assert!(state.result().is_none());
    assert!(state.error().is_none());
}

#[test]
fn reset_while_pending_also_aborts() {
    init_logging();
    let state = submitted();
    let (state, effects) = update(state, Msg::Reset);

    assert_eq!(effects, vec![Effect::AbortStream, Effect::ReleaseResources]);
    assert_eq!(state.status(), JobStatus::Idle);
}

#[test]
fn resubmit_after_failure_clears_previous_outcome() {
    init_logging();
    let state = submitted();
    let (state, _) = update(state, Msg::Failed(JobError::truncated()));
    let (state, _) = update(state, Msg::Submitted);

    assert_eq!(state.status(), JobStatus::Pending);
    assert!(state.error().is_none());
    assert!(state.result().is_none());
    assert_eq!(state.latest_progress().unwrap().stage, "init");
}

#[test]
fn submit_while_pending_keeps_progress() {
    init_logging();
    let state = submitted();
    let (state, _) = update(
        state,
        Msg::Event(ProgressEvent::new("processing", 50.0, "half")),
    );
    let (state, _) = update(state, Msg::Submitted);

    assert_eq!(state.latest_progress().unwrap().progress, 50.0);
}
