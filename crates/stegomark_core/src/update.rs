use serde_json::Value;

use crate::{Effect, EventKind, JobError, JobState, Msg, ProgressEvent, STAGE_COMPLETE};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: JobState, msg: Msg) -> (JobState, Vec<Effect>) {
    let effects = match msg {
        Msg::Submitted => {
            // One job at a time; the driver rejects a second submit before it gets here.
            if !state.is_pending() {
                state.begin();
            }
            Vec::new()
        }
        Msg::Event(event) => {
            if state.is_pending() {
                apply_event(&mut state, event);
            }
            Vec::new()
        }
        Msg::StreamEnded => {
            if state.is_pending() {
                state.fail(JobError::truncated());
            }
            Vec::new()
        }
        Msg::Failed(error) => {
            if state.is_pending() {
                state.fail(error);
            }
            Vec::new()
        }
        Msg::CancelRequested => {
            if state.is_pending() {
                state.cancel();
                vec![Effect::AbortStream]
            } else {
                Vec::new()
            }
        }
        Msg::Reset => {
            let mut effects = Vec::with_capacity(2);
            if state.is_pending() {
                effects.push(Effect::AbortStream);
            }
            effects.push(Effect::ReleaseResources);
            state.clear();
            effects
        }
    };

    (state, effects)
}

fn apply_event(state: &mut JobState, mut event: ProgressEvent) {
    match event.kind() {
        EventKind::Complete => {
            let result = event.result.take().unwrap_or(Value::Null);
            let latest = ProgressEvent::new(STAGE_COMPLETE, 100.0, event.message);
            state.succeed(result, latest);
        }
        EventKind::Error => state.fail(JobError::server(event.message)),
        EventKind::Progress => {
            // Progress is shown as sent; no clamping or monotonicity check.
            event.result = None;
            state.record_progress(event);
        }
    }
}
