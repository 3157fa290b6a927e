//! Stegomark core: pure job state machine and view-model helpers.
mod effect;
mod error;
mod event;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use error::{FailureKind, JobError};
pub use event::{EventKind, ProgressEvent, STAGE_COMPLETE, STAGE_ERROR, STAGE_INIT};
pub use msg::Msg;
pub use state::{JobState, JobStatus};
pub use update::update;
pub use view_model::JobView;
