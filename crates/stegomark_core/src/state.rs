use serde_json::Value;

use crate::view_model::JobView;
use crate::{JobError, ProgressEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// State of the current (or last) job of one driver.
///
/// Invariants kept by [`crate::update`]: idle and pending states hold neither
/// a result nor an error; a succeeded state holds only a result; failed and
/// cancelled states hold only an error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobState {
    status: JobStatus,
    latest_progress: Option<ProgressEvent>,
    result: Option<Value>,
    error: Option<JobError>,
    dirty: bool,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn latest_progress(&self) -> Option<&ProgressEvent> {
        self.latest_progress.as_ref()
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.status == JobStatus::Pending
    }

    pub fn view(&self) -> JobView {
        let message = match (&self.error, &self.latest_progress) {
            (Some(error), _) => Some(error.message.clone()),
            (None, Some(progress)) => Some(progress.message.clone()),
            (None, None) => None,
        };
        JobView {
            status: self.status,
            stage: self.latest_progress.as_ref().map(|p| p.stage.clone()),
            progress: self.latest_progress.as_ref().map(|p| p.progress),
            message,
            has_result: self.result.is_some(),
        }
    }

    /// Returns whether the state changed since the last call, clearing the flag.
    ///
    /// Publishers call this to decide whether observers need a notification.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin(&mut self) {
        self.status = JobStatus::Pending;
        self.latest_progress = Some(ProgressEvent::initial());
        self.result = None;
        self.error = None;
        self.dirty = true;
    }

    pub(crate) fn record_progress(&mut self, event: ProgressEvent) {
        self.latest_progress = Some(event);
        self.dirty = true;
    }

    pub(crate) fn succeed(&mut self, result: Value, latest: ProgressEvent) {
        self.status = JobStatus::Succeeded;
        self.latest_progress = Some(latest);
        self.result = Some(result);
        self.error = None;
        self.dirty = true;
    }

    pub(crate) fn fail(&mut self, error: JobError) {
        self.status = JobStatus::Failed;
        self.result = None;
        self.error = Some(error);
        self.dirty = true;
    }

    pub(crate) fn cancel(&mut self) {
        self.status = JobStatus::Cancelled;
        self.result = None;
        self.error = Some(JobError::cancelled());
        self.dirty = true;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self {
            dirty: true,
            ..Self::default()
        };
    }
}
