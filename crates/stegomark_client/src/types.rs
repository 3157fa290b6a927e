use stegomark_core::{JobStatus, ProgressEvent};

use crate::config::ConfigError;
use crate::resource::ResourceError;

pub type JobId = u64;

/// Notifications pushed to a [`crate::ProgressSink`] while a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress {
        job_id: JobId,
        event: ProgressEvent,
    },
    /// The job stopped being pending. `status` is terminal, or `Idle`
    /// when a reset interrupted it.
    Settled {
        job_id: JobId,
        status: JobStatus,
        message: Option<String>,
    },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Progress { job_id, .. } | JobEvent::Settled { job_id, .. } => *job_id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} is too long ({len} characters, max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("{field} is required when {reason}")]
    Required {
        field: &'static str,
        reason: &'static str,
    },
}

/// Reasons a submission is refused before any network activity.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SubmitError {
    #[error("a job is already in flight")]
    Busy,
    #[error("missing required input {0}")]
    MissingInput(&'static str),
    #[error("unknown input slot {0}")]
    UnknownInput(String),
    #[error("invalid parameters: {0}")]
    Invalid(#[from] ValidationError),
    #[error("input could not be read: {0}")]
    Resource(#[from] ResourceError),
}
