//! Stegomark client: streaming job submission, decoding and resource handling.
mod client;
mod config;
mod decode;
mod driver;
pub mod features;
mod preview;
mod request;
mod resource;
mod transport;
mod types;

pub use client::Client;
pub use config::{
    ClientConfig, ConfigError, DEFAULT_API_URL, ENV_API_URL, ENV_CONNECT_TIMEOUT_SECS,
    ENV_JOB_TIMEOUT_SECS, ENV_VIDEO_JOB_TIMEOUT_SECS,
};
pub use decode::{StreamDecoder, EVENT_PREFIX};
pub use driver::{ChannelProgressSink, JobDriver, JobWatch, ProgressSink};
pub use features::{Feature, FeatureAdapter, InputSlot};
pub use preview::{
    decode_data_url, encode_data_url, extension_for_mime, is_displayable, mime_for_path, DataUrl,
    DataUrlError, FALLBACK_MIME,
};
pub use request::{FieldValue, FormField, JobRequest};
pub use resource::{
    LogResourceErrors, ManagedResource, Preview, PreviewHandle, PreviewRegistry, PreviewStrategy,
    ResourceError, ResourceErrorSink, ResourceManager, SelectedFile,
};
pub use transport::{EventByteStream, ReqwestTransport, Transport};
pub use types::{ClientError, JobEvent, JobId, SubmitError, ValidationError};

pub use stegomark_core::{FailureKind, JobError, JobState, JobStatus, JobView, ProgressEvent};
