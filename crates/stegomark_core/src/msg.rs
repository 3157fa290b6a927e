use crate::{JobError, ProgressEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// A job was submitted; the request is about to be sent.
    Submitted,
    /// One record decoded from the event stream.
    Event(ProgressEvent),
    /// The byte stream ended.
    StreamEnded,
    /// The transport failed (connect, status, timeout, dropped connection).
    Failed(JobError),
    /// Caller asked to abandon the in-flight job.
    CancelRequested,
    /// Caller asked to clear everything back to idle.
    Reset,
}
