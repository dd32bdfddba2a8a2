//! Bounded assembly queue with a fixed pool of worker threads.
//!
//! Jobs are taken in submission order. Each submission hands back a
//! [`JobTicket`] that can cancel the job and wait for its result.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use thiserror::Error;

use crate::models::{AssemblyJob, AssemblyRequest, ErrorKind, JobStatus};
use crate::orchestrator::{Assembler, CancelHandle, ProgressSubscriber};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("assembly queue is full")]
    Full,

    #[error("assembly queue is closed")]
    Closed,
}

pub type QueueResult<T> = Result<T, QueueError>;

struct QueuedJob {
    job_id: String,
    request: AssemblyRequest,
    cancel: CancelHandle,
    subscriber: Option<ProgressSubscriber>,
    result_tx: mpsc::Sender<AssemblyJob>,
}

/// Handle to a submitted job.
pub struct JobTicket {
    job_id: String,
    cancel: CancelHandle,
    result_rx: Receiver<AssemblyJob>,
}

impl JobTicket {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    /// Request cancellation. Takes effect at the job's next step boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until the job finishes.
    ///
    /// Returns `Closed` only if the worker went away without reporting,
    /// which means the job never ran.
    pub fn wait(self) -> QueueResult<AssemblyJob> {
        self.result_rx.recv().map_err(|_| QueueError::Closed)
    }

    /// Non-blocking check for a finished job.
    pub fn try_result(&self) -> Option<AssemblyJob> {
        self.result_rx.try_recv().ok()
    }
}

pub struct AssemblyQueue {
    sender: Option<SyncSender<QueuedJob>>,
    workers: Vec<JoinHandle<()>>,
}

impl AssemblyQueue {
    /// Start `workers` threads pulling from a queue holding at most
    /// `capacity` waiting jobs. Both are raised to at least one.
    pub fn new(assembler: Assembler, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::sync_channel::<QueuedJob>(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let assembler = Arc::new(assembler);

        let workers = (0..workers.max(1))
            .map(|index| {
                let receiver = Arc::clone(&receiver);
                let assembler = Arc::clone(&assembler);
                thread::Builder::new()
                    .name(format!("dubmux-worker-{}", index))
                    .spawn(move || worker_loop(index, &assembler, &receiver))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::error!("Failed to spawn queue worker: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "Assembly queue started with {} workers, capacity {}",
            workers.len(),
            capacity.max(1)
        );
        Self {
            sender: Some(sender),
            workers,
        }
    }

    /// Size the queue from the assembler's `[queue]` settings.
    pub fn from_settings(assembler: Assembler) -> Self {
        let workers = assembler.settings().queue.workers;
        let capacity = assembler.settings().queue.capacity;
        Self::new(assembler, workers, capacity)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Submit a job, blocking while the queue is full.
    pub fn submit(
        &self,
        request: AssemblyRequest,
        subscriber: Option<ProgressSubscriber>,
    ) -> QueueResult<JobTicket> {
        let sender = self.sender.as_ref().ok_or(QueueError::Closed)?;
        let (job, ticket) = prepare(request, subscriber);
        sender.send(job).map_err(|_| QueueError::Closed)?;
        tracing::debug!("Queued job {}", ticket.job_id);
        Ok(ticket)
    }

    /// Submit a job without blocking. Fails with `Full` when no slot is free.
    pub fn try_submit(
        &self,
        request: AssemblyRequest,
        subscriber: Option<ProgressSubscriber>,
    ) -> QueueResult<JobTicket> {
        let sender = self.sender.as_ref().ok_or(QueueError::Closed)?;
        let (job, ticket) = prepare(request, subscriber);
        match sender.try_send(job) {
            Ok(()) => {
                tracing::debug!("Queued job {}", ticket.job_id);
                Ok(ticket)
            }
            Err(TrySendError::Full(_)) => Err(QueueError::Full),
            Err(TrySendError::Disconnected(_)) => Err(QueueError::Closed),
        }
    }

    /// Stop accepting jobs, let queued and in-flight jobs finish, and join
    /// the workers.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("Queue worker panicked");
            }
        }
        tracing::info!("Assembly queue shut down");
    }
}

impl Drop for AssemblyQueue {
    fn drop(&mut self) {
        self.close();
    }
}

fn prepare(
    request: AssemblyRequest,
    subscriber: Option<ProgressSubscriber>,
) -> (QueuedJob, JobTicket) {
    let job_id = uuid::Uuid::new_v4().to_string();
    let cancel = CancelHandle::new();
    let (result_tx, result_rx) = mpsc::channel();
    let job = QueuedJob {
        job_id: job_id.clone(),
        request,
        cancel: cancel.clone(),
        subscriber,
        result_tx,
    };
    let ticket = JobTicket {
        job_id,
        cancel,
        result_rx,
    };
    (job, ticket)
}

fn worker_loop(index: usize, assembler: &Assembler, receiver: &Mutex<Receiver<QueuedJob>>) {
    loop {
        // The guard is released before the job runs.
        let next = receiver.lock().recv();
        let Ok(job) = next else {
            tracing::debug!("Worker {} exiting", index);
            return;
        };

        tracing::info!("Worker {} picked up job {}", index, job.job_id);
        let kind = job.request.kind;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            assembler.assemble(&job.job_id, job.request, &job.cancel, job.subscriber)
        }))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!("Worker {}: job {} panicked: {}", index, job.job_id, message);
            let mut failed = AssemblyJob::new(&job.job_id, kind);
            failed.status = JobStatus::Failed;
            failed.error = Some(format!("job panicked: {}", message));
            failed.error_kind = Some(ErrorKind::Internal);
            failed
        });
        if job.result_tx.send(result).is_err() {
            tracing::debug!("Ticket for job {} was dropped", job.job_id);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CollaboratorError, Collaborators, Transcriber};
    use crate::config::Settings;
    use crate::media::fake::ScriptedToolkit;
    use crate::models::{CaptionSource, MediaAsset, NarrationAsset, RawSegment};
    use crate::orchestrator::ProgressEvent;
    use std::path::Path;
    use tempfile::TempDir;

    fn assembler(dir: &TempDir) -> Assembler {
        let mut settings = Settings::default();
        settings.paths.temp_root = dir.path().join("temp").to_string_lossy().into_owned();
        settings.paths.logs_folder = dir.path().join("logs").to_string_lossy().into_owned();
        Assembler::new(settings, Arc::new(ScriptedToolkit::new(12.0, 9.0)))
    }

    fn request() -> AssemblyRequest {
        AssemblyRequest::new(
            MediaAsset::from_bytes(b"video".to_vec()),
            NarrationAsset::from_bytes(vec![0; 48_000], 24_000),
        )
    }

    /// A subscriber that reports when its job starts and then holds the
    /// worker until the gate is opened.
    fn gated() -> (ProgressSubscriber, Receiver<()>, mpsc::Sender<()>) {
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let mut waited = false;
        let subscriber: ProgressSubscriber = Box::new(move |_event: ProgressEvent| {
            if !waited {
                waited = true;
                let _ = started_tx.send(());
                let _ = gate_rx.recv();
            }
        });
        (subscriber, started_rx, gate_tx)
    }

    #[test]
    fn submitted_job_completes() {
        let dir = tempfile::tempdir().unwrap();
        let queue = AssemblyQueue::new(assembler(&dir), 2, 4);
        assert_eq!(queue.worker_count(), 2);

        let ticket = queue.submit(request(), None).unwrap();
        let job_id = ticket.job_id().to_string();
        let job = ticket.wait().unwrap();

        assert_eq!(job.job_id, job_id);
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.duration, Some(12.0));
        queue.shutdown();
    }

    #[test]
    fn jobs_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let queue = AssemblyQueue::new(assembler(&dir), 1, 4);
        let a = queue.submit(request(), None).unwrap();
        let b = queue.submit(request(), None).unwrap();
        assert_ne!(a.job_id(), b.job_id());
        assert!(a.wait().unwrap().is_done());
        assert!(b.wait().unwrap().is_done());
    }

    #[test]
    fn rejects_when_full() {
        let dir = tempfile::tempdir().unwrap();
        let queue = AssemblyQueue::new(assembler(&dir), 1, 1);

        let (subscriber, started, gate) = gated();
        let running = queue.submit(request(), Some(subscriber)).unwrap();
        started.recv().unwrap();

        let waiting = queue.try_submit(request(), None).unwrap();
        assert_eq!(
            queue.try_submit(request(), None).err(),
            Some(QueueError::Full)
        );

        gate.send(()).unwrap();
        assert!(running.wait().unwrap().is_done());
        assert!(waiting.wait().unwrap().is_done());
    }

    #[test]
    fn cancelled_while_waiting_fails_with_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let queue = AssemblyQueue::new(assembler(&dir), 1, 2);

        let (subscriber, started, gate) = gated();
        let running = queue.submit(request(), Some(subscriber)).unwrap();
        started.recv().unwrap();

        let waiting = queue.submit(request(), None).unwrap();
        waiting.cancel();
        assert!(waiting.cancel_handle().is_cancelled());
        gate.send(()).unwrap();

        assert!(running.wait().unwrap().is_done());
        let cancelled = waiting.wait().unwrap();
        assert_eq!(cancelled.status, JobStatus::Failed);
        assert_eq!(cancelled.error_kind, Some(ErrorKind::Cancelled));
        assert!(cancelled.result.is_none());
    }

    #[test]
    fn shutdown_finishes_queued_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let queue = AssemblyQueue::new(assembler(&dir), 1, 4);
        let tickets: Vec<_> = (0..3)
            .map(|_| queue.submit(request(), None).unwrap())
            .collect();
        queue.shutdown();

        for ticket in tickets {
            assert!(ticket.try_result().is_some_and(|job| job.is_done()));
        }
    }

    struct ExplodingTranscriber;

    impl Transcriber for ExplodingTranscriber {
        fn transcribe(&self, _audio: &Path) -> Result<Vec<RawSegment>, CollaboratorError> {
            panic!("transcriber exploded");
        }
    }

    #[test]
    fn panicking_job_fails_and_worker_keeps_going() {
        let dir = tempfile::tempdir().unwrap();
        let assembler = assembler(&dir).with_collaborators(
            Collaborators::new().with_transcriber(Arc::new(ExplodingTranscriber)),
        );
        let queue = AssemblyQueue::new(assembler, 1, 4);

        let broken = queue
            .submit(request().with_captions(CaptionSource::Transcribe), None)
            .unwrap();
        let healthy = queue.submit(request(), None).unwrap();

        let failed = broken.wait().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error_kind, Some(ErrorKind::Internal));
        assert!(failed.error.unwrap().contains("transcriber exploded"));

        assert!(healthy.wait().unwrap().is_done());
        assert_eq!(queue.worker_count(), 1);
    }

    #[test]
    fn from_settings_uses_queue_section() {
        let dir = tempfile::tempdir().unwrap();
        let mut assembler = assembler(&dir);
        let mut settings = assembler.settings().clone();
        settings.queue.workers = 3;
        assembler = Assembler::new(settings, assembler.toolkit().clone());
        let queue = AssemblyQueue::from_settings(assembler);
        assert_eq!(queue.worker_count(), 3);
    }
}
