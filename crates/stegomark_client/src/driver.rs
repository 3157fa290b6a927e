use std::future::Future;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use stegomark_core::{update, Effect, FailureKind, JobError, JobState, JobView, Msg};
use stegomark_logging::{stego_debug, stego_info, stego_warn};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::decode::StreamDecoder;
use crate::request::JobRequest;
use crate::resource::ResourceManager;
use crate::transport::Transport;
use crate::{JobEvent, JobId, SubmitError};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: JobEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<JobEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<JobEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::Receiver<JobEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: JobEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Default)]
struct Tracked {
    job_id: JobId,
    state: JobState,
}

/// Read side of a driver's job state.
pub struct JobWatch {
    rx: watch::Receiver<Tracked>,
}

impl JobWatch {
    pub fn current(&self) -> JobState {
        self.rx.borrow().state.clone()
    }

    pub fn job_id(&self) -> JobId {
        self.rx.borrow().job_id
    }

    /// Next state after a change; `None` once the driver is gone.
    pub async fn changed(&mut self) -> Option<JobState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().state.clone())
    }

    /// Resolves once the job is no longer pending (immediately if idle).
    pub async fn settled(&mut self) -> JobState {
        let settled = self
            .rx
            .wait_for(|tracked| !tracked.state.is_pending())
            .await
            .map(|tracked| tracked.state.clone());
        match settled {
            Ok(state) => state,
            Err(_) => self.rx.borrow().state.clone(),
        }
    }
}

/// Drives one job at a time: request, event stream, state machine, cleanup.
///
/// The read loop runs as a task on `runtime`. Transitions are published
/// through a watch channel, so observers only ever see whole updates.
pub struct JobDriver {
    runtime: Handle,
    transport: Arc<dyn Transport>,
    sink: Option<Arc<dyn ProgressSink>>,
    resources: ResourceManager,
    tracked: Arc<watch::Sender<Tracked>>,
    next_job_id: JobId,
    active: Option<CancellationToken>,
}

impl JobDriver {
    pub fn new(runtime: Handle, transport: Arc<dyn Transport>, resources: ResourceManager) -> Self {
        let (tracked, _) = watch::channel(Tracked::default());
        Self {
            runtime,
            transport,
            sink: None,
            resources,
            tracked: Arc::new(tracked),
            next_job_id: 0,
            active: None,
        }
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn state(&self) -> JobState {
        self.tracked.borrow().state.clone()
    }

    /// Run `read` against the current state without cloning it.
    ///
    /// The watch lock is held while `read` runs; it must not call back into the driver.
    pub fn with_state<R>(&self, read: impl FnOnce(&JobState) -> R) -> R {
        read(&self.tracked.borrow().state)
    }

    pub fn view(&self) -> JobView {
        self.with_state(JobState::view)
    }

    pub fn is_pending(&self) -> bool {
        self.with_state(JobState::is_pending)
    }

    /// Id of the current or last job; `None` before the first submit.
    pub fn job_id(&self) -> Option<JobId> {
        match self.tracked.borrow().job_id {
            0 => None,
            id => Some(id),
        }
    }

    pub fn subscribe(&self) -> JobWatch {
        JobWatch {
            rx: self.tracked.subscribe(),
        }
    }

    pub async fn wait(&self) -> JobState {
        self.subscribe().settled().await
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    /// Start a job. Progress is observed through [`Self::state`],
    /// [`Self::subscribe`] or the progress sink, not through a return value.
    pub fn submit(
        &mut self,
        request: JobRequest,
        ceiling: Option<Duration>,
    ) -> Result<JobId, SubmitError> {
        if self.is_pending() {
            return Err(SubmitError::Busy);
        }

        self.next_job_id += 1;
        let job_id = self.next_job_id;
        self.tracked.send_if_modified(|tracked| {
            tracked.job_id = job_id;
            false
        });
        transition(&self.tracked, self.sink.as_deref(), job_id, Msg::Submitted);

        let cancel = CancellationToken::new();
        if let Some(previous) = self.active.replace(cancel.clone()) {
            previous.cancel();
        }

        stego_info!(
            "job {} submitted to {} (ceiling={:?})",
            job_id,
            request.endpoint,
            ceiling
        );
        let task = JobTask {
            job_id,
            transport: self.transport.clone(),
            tracked: self.tracked.clone(),
            sink: self.sink.clone(),
        };
        self.runtime.spawn(task.run(request, ceiling, cancel));
        Ok(job_id)
    }

    /// Abort the in-flight job; it settles as cancelled. No-op otherwise.
    pub fn cancel(&mut self) {
        self.dispatch(Msg::CancelRequested);
    }

    /// Abort any in-flight read, return to idle and release every held resource.
    pub fn reset(&mut self) {
        self.dispatch(Msg::Reset);
    }

    fn dispatch(&mut self, msg: Msg) {
        let job_id = self.tracked.borrow().job_id;
        let outcome = transition(&self.tracked, self.sink.as_deref(), job_id, msg);
        for effect in outcome.effects {
            match effect {
                Effect::AbortStream => {
                    if let Some(cancel) = self.active.take() {
                        stego_debug!("aborting stream of job {}", job_id);
                        cancel.cancel();
                    }
                }
                Effect::ReleaseResources => self.resources.release_all(),
            }
        }
    }
}

impl Drop for JobDriver {
    fn drop(&mut self) {
        if let Some(cancel) = self.active.take() {
            cancel.cancel();
        }
    }
}

struct Transition {
    effects: Vec<Effect>,
    pending: bool,
}

/// Apply `msg` to the tracked state if `job_id` is still the tracked job.
fn transition(
    tracked: &watch::Sender<Tracked>,
    sink: Option<&dyn ProgressSink>,
    job_id: JobId,
    msg: Msg,
) -> Transition {
    let mut outcome = Transition {
        effects: Vec::new(),
        pending: false,
    };
    let mut notice = None;

    tracked.send_if_modified(|tracked| {
        if tracked.job_id != job_id {
            return false;
        }
        let was_pending = tracked.state.is_pending();
        let (state, effects) = update(std::mem::take(&mut tracked.state), msg);
        tracked.state = state;
        outcome.effects = effects;
        outcome.pending = tracked.state.is_pending();

        let changed = tracked.state.consume_dirty();
        if changed && outcome.pending {
            notice = tracked
                .state
                .latest_progress()
                .cloned()
                .map(|event| JobEvent::Progress { job_id, event });
        } else if changed && was_pending {
            // Terminal status, or `Idle` after a reset interrupted the job.
            notice = Some(JobEvent::Settled {
                job_id,
                status: tracked.state.status(),
                message: tracked.state.view().message,
            });
        }
        changed
    });

    if let (Some(sink), Some(notice)) = (sink, notice) {
        sink.emit(notice);
    }
    outcome
}

struct JobTask {
    job_id: JobId,
    transport: Arc<dyn Transport>,
    tracked: Arc<watch::Sender<Tracked>>,
    sink: Option<Arc<dyn ProgressSink>>,
}

impl JobTask {
    async fn run(self, request: JobRequest, ceiling: Option<Duration>, cancel: CancellationToken) {
        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                stego_info!("job {} aborted after {:?}", self.job_id, started.elapsed());
                return;
            }
            outcome = with_ceiling(self.stream(request), ceiling) => outcome,
        };

        if let Err(err) = outcome {
            stego_warn!("job {} failed: {} ({})", self.job_id, err, err.kind);
            self.apply(Msg::Failed(err));
        }
        stego_info!(
            "job {} settled as {:?} after {:?}",
            self.job_id,
            self.tracked.borrow().state.status(),
            started.elapsed()
        );
    }

    async fn stream(&self, request: JobRequest) -> Result<(), JobError> {
        let mut body = self.transport.open(request).await?;
        let mut decoder = StreamDecoder::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in decoder.feed(&chunk) {
                stego_debug!(
                    "job {} event stage={} progress={} message={:?}",
                    self.job_id,
                    event.stage,
                    event.progress,
                    event.message
                );
                if !self.apply(Msg::Event(event)) {
                    return Ok(());
                }
            }
        }

        for event in decoder.finish() {
            if !self.apply(Msg::Event(event)) {
                return Ok(());
            }
        }
        if decoder.malformed_count() > 0 {
            stego_warn!(
                "job {} skipped {} malformed records",
                self.job_id,
                decoder.malformed_count()
            );
        }
        self.apply(Msg::StreamEnded);
        Ok(())
    }

    /// Returns whether the job should keep reading.
    fn apply(&self, msg: Msg) -> bool {
        transition(&self.tracked, self.sink.as_deref(), self.job_id, msg).pending
    }
}

async fn with_ceiling<F>(work: F, ceiling: Option<Duration>) -> Result<(), JobError>
where
    F: Future<Output = Result<(), JobError>>,
{
    match ceiling {
        Some(limit) => tokio::time::timeout(limit, work).await.unwrap_or_else(|_| {
            Err(JobError::new(
                FailureKind::Timeout,
                format!("job exceeded its {:?} time limit", limit),
            ))
        }),
        None => work.await,
    }
}
