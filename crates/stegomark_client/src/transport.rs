use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use stegomark_core::{FailureKind, JobError};
use stegomark_logging::{stego_debug, stego_info};

use crate::request::{FieldValue, JobRequest};
use crate::{ClientConfig, ClientError};

/// Largest error body read when looking for a failure reason.
const MAX_ERROR_BODY: usize = 16 * 1024;

/// Raw response body of a job, chunked however the network delivered it.
pub type EventByteStream = BoxStream<'static, Result<Bytes, JobError>>;

/// Sends a job request and hands back its streaming body.
///
/// A non-2xx status must fail here, before any body byte is read.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: JobRequest) -> Result<EventByteStream, JobError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    config: Arc<ClientConfig>,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: Arc<ClientConfig>) -> Result<Self, ClientError> {
        // Only connect time is bounded here; the driver owns the per-job ceiling.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|err| ClientError::HttpClient(err.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn open(&self, request: JobRequest) -> Result<EventByteStream, JobError> {
        let url = self
            .config
            .endpoint(request.endpoint)
            .map_err(|err| JobError::new(FailureKind::Transport, err.to_string()))?;
        let field_count = request.fields.len();
        let form = build_form(request)?;

        stego_info!("POST {} ({} form fields)", url, field_count);
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "text/event-stream")
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let mut err = JobError::http_status(status.as_u16(), status.canonical_reason());
            if let Some(detail) = error_detail(response).await {
                err.message = format!("{}: {}", err.message, detail);
            }
            return Err(err);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("<none>");
        stego_debug!("event stream open: status={} content-type={}", status, content_type);

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .boxed())
    }
}

fn build_form(request: JobRequest) -> Result<Form, JobError> {
    let mut form = Form::new();
    for field in request.fields {
        form = match field.value {
            FieldValue::Text(value) => form.text(field.name, value),
            FieldValue::File {
                file_name,
                mime,
                bytes,
            } => {
                let part = Part::bytes(bytes.to_vec())
                    .file_name(file_name)
                    .mime_str(&mime)
                    .map_err(|err| {
                        JobError::new(
                            FailureKind::Transport,
                            format!("invalid mime type {mime:?} for field {}: {err}", field.name),
                        )
                    })?;
                form.part(field.name, part)
            }
        };
    }
    Ok(form)
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Value,
}

/// Failure reason from a non-2xx JSON body such as `{"detail": "..."}`.
///
/// Reads at most [`MAX_ERROR_BODY`] bytes; anything unreadable or not of
/// that shape yields `None`.
async fn error_detail(response: reqwest::Response) -> Option<String> {
    let mut body = Vec::new();
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.ok()?;
        if body.len() + chunk.len() > MAX_ERROR_BODY {
            stego_debug!("error body exceeds {} bytes; reason dropped", MAX_ERROR_BODY);
            return None;
        }
        body.extend_from_slice(&chunk);
    }

    let parsed: ErrorBody = serde_json::from_slice(&body).ok()?;
    match parsed.detail {
        Value::String(text) if !text.trim().is_empty() => Some(text),
        Value::String(_) | Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> JobError {
    if err.is_timeout() {
        return JobError::new(FailureKind::Timeout, err.to_string());
    }
    JobError::new(FailureKind::Transport, err.to_string())
}
