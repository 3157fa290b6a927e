use crate::JobStatus;

/// What a front end renders for one job.
///
/// `message` is the single source of truth for the status line: the
/// terminal error when the job failed, otherwise the latest event message.
/// Change notification comes from whoever publishes the state, not from the view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobView {
    pub status: JobStatus,
    pub stage: Option<String>,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub has_result: bool,
}
