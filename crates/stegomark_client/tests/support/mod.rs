#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use stegomark_client::{EventByteStream, JobError, JobRequest, Transport};
use tokio::sync::mpsc;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(stegomark_logging::initialize_for_tests);
}

/// `data: {...}` record line followed by the blank separator line.
pub fn record(json: &str) -> Vec<u8> {
    format!("data: {json}\n\n").into_bytes()
}

pub enum Script {
    /// Body chunks, then a clean end of stream.
    Chunks(Vec<Vec<u8>>),
    /// Body chunks, then the connection stays open forever.
    ChunksThenHang(Vec<Vec<u8>>),
    /// Body chunks, then a read error.
    ChunksThenError(Vec<Vec<u8>>, JobError),
    /// The request itself fails (connect error, non-2xx status).
    Reject(JobError),
    /// Chunks pushed by the test while the job runs; ends when the sender drops.
    Feed(mpsc::UnboundedReceiver<Vec<u8>>),
}

pub fn feed() -> (mpsc::UnboundedSender<Vec<u8>>, Script) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, Script::Feed(rx))
}

/// In-memory transport replaying one script per request.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<JobRequest>>,
}

impl ScriptedTransport {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<JobRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn chunks(chunks: Vec<Vec<u8>>) -> impl futures_util::Stream<Item = Result<Bytes, JobError>> {
    stream::iter(chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))))
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, request: JobRequest) -> Result<EventByteStream, JobError> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Chunks(Vec::new()));

        match script {
            Script::Chunks(body) => Ok(chunks(body).boxed()),
            Script::ChunksThenHang(body) => Ok(chunks(body).chain(stream::pending()).boxed()),
            Script::ChunksThenError(body, err) => {
                Ok(chunks(body).chain(stream::iter([Err(err)])).boxed())
            }
            Script::Reject(err) => Err(err),
            Script::Feed(rx) => Ok(stream::unfold(rx, |mut rx| async move {
                let chunk = rx.recv().await?;
                Some((Ok(Bytes::from(chunk)), rx))
            })
            .boxed()),
        }
    }
}
