use stegomark_core::{update, JobError, JobState, Msg, ProgressEvent};

#[test]
fn messages_without_a_pending_job_are_noops() {
    let state = JobState::new();

    for msg in [
        Msg::Event(ProgressEvent::new("embedding", 50.0, "late")),
        Msg::StreamEnded,
        Msg::Failed(JobError::truncated()),
        Msg::CancelRequested,
    ] {
        let (next, effects) = update(state.clone(), msg);
        assert_eq!(state, next);
        assert!(effects.is_empty());
    }
}
