use std::fmt;

/// Terminal failure of a job, as surfaced to the caller.
///
/// `message` is what a front end displays; `kind` keeps enough detail
/// (status code, cause class) for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct JobError {
    pub kind: FailureKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error reported by the server through an `error` record; the message is kept verbatim.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Server, message)
    }

    pub fn http_status(code: u16, reason: Option<&str>) -> Self {
        let message = match reason {
            Some(reason) => format!("HTTP error, status: {code} {reason}"),
            None => format!("HTTP error, status: {code}"),
        };
        Self::new(FailureKind::HttpStatus(code), message)
    }

    pub fn truncated() -> Self {
        Self::new(
            FailureKind::Truncated,
            "stream ended before the job reported completion",
        )
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "job cancelled")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Request could not be sent or the connection dropped mid-stream.
    Transport,
    /// Non-2xx response; the body is never read as an event stream.
    HttpStatus(u16),
    /// Connect timeout or the job's wall-clock ceiling was exceeded.
    Timeout,
    /// Stream closed without a terminal record.
    Truncated,
    /// Explicit `error` stage from the server.
    Server,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "transport error"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Truncated => write!(f, "stream truncated"),
            FailureKind::Server => write!(f, "server error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
