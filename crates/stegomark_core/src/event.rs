use serde::{Deserialize, Serialize};

pub const STAGE_INIT: &str = "init";
pub const STAGE_COMPLETE: &str = "complete";
pub const STAGE_ERROR: &str = "error";

/// One record decoded from a job's event stream.
///
/// `stage` is free-form apart from the two terminal values. Error records
/// sent by the server carry no `progress`, so it defaults to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Progress,
    Complete,
    Error,
}

impl ProgressEvent {
    pub fn new(stage: impl Into<String>, progress: f64, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            progress,
            message: message.into(),
            result: None,
        }
    }

    /// Synthetic event recorded on submission, before any byte arrives.
    pub fn initial() -> Self {
        Self::new(STAGE_INIT, 0.0, "Initializing...")
    }

    pub fn kind(&self) -> EventKind {
        match self.stage.as_str() {
            STAGE_COMPLETE => EventKind::Complete,
            STAGE_ERROR => EventKind::Error,
            _ => EventKind::Progress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind() != EventKind::Progress
    }
}

#[cfg(test)]
mod tests {
    use super::{EventKind, ProgressEvent};

    #[test]
    fn error_record_without_progress_decodes() {
        let event: ProgressEvent =
            serde_json::from_str(r#"{"stage":"error","message":"bad frame"}"#).unwrap();
        assert_eq!(event.kind(), EventKind::Error);
        assert_eq!(event.progress, 0.0);
        assert_eq!(event.message, "bad frame");
        assert!(event.result.is_none());
    }

    #[test]
    fn unknown_stages_are_progress() {
        let event = ProgressEvent::new("embedding", 40.0, "working");
        assert_eq!(event.kind(), EventKind::Progress);
        assert!(!event.is_terminal());
    }

    #[test]
    fn complete_keeps_result_payload() {
        let event: ProgressEvent = serde_json::from_str(
            r#"{"stage":"complete","progress":100,"message":"done","result":{"x":1}}"#,
        )
        .unwrap();
        assert!(event.is_terminal());
        assert_eq!(event.result, Some(serde_json::json!({"x": 1})));
    }
}
