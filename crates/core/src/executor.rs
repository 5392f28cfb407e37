//! Bounded job executor.
//!
//! [`JobExecutor::submit`] records the job and spawns it onto the runtime
//! without waiting for it. Each job then waits for a worker permit, runs the
//! configured [`JobProcessor`], and reports exactly one [`JobCompletion`] on
//! the completion channel. The consumer of that channel (the correlation
//! router) owns delivery; the executor forgets the job once it has reported.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::task::TaskTracker;

use crate::error::CoreError;
use crate::shape::{JobError, JobPayload, JobProcessor, ShapeData};
use crate::types::TrackingToken;

/// Default number of jobs allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 8;

/// Non-terminal job states. Terminal states are reported as a
/// [`JobOutcome`] and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Accepted, waiting for a worker permit.
    Submitted,
    /// Holding a permit and running the processor.
    Running,
}

/// Terminal result of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(ShapeData),
    Failed(String),
}

/// A finished job, handed to the correlation router for delivery.
#[derive(Debug, Clone)]
pub struct JobCompletion {
    pub token: TrackingToken,
    pub outcome: JobOutcome,
}

type JobTable = Arc<Mutex<HashMap<TrackingToken, JobState>>>;

pub struct JobExecutor {
    processor: Arc<dyn JobProcessor>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    jobs: JobTable,
    completions: mpsc::UnboundedSender<JobCompletion>,
}

impl JobExecutor {
    /// Create an executor running at most `max_concurrent` jobs at once.
    ///
    /// Returns the executor together with the receiving half of its
    /// completion channel.
    pub fn new(
        processor: Arc<dyn JobProcessor>,
        max_concurrent: usize,
    ) -> (Self, mpsc::UnboundedReceiver<JobCompletion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let executor = Self {
            processor,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tracker: TaskTracker::new(),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            completions: tx,
        };
        (executor, rx)
    }

    /// Accept a job and return without waiting for it to start.
    ///
    /// Fails only after [`shutdown`](Self::shutdown) has been called.
    pub fn submit(&self, token: TrackingToken, payload: JobPayload) -> Result<(), CoreError> {
        if self.tracker.is_closed() {
            tracing::warn!(tracking_id = %token, "Job rejected, executor is shutting down");
            return Err(CoreError::ShuttingDown(
                "job executor no longer accepts work".to_string(),
            ));
        }

        set_state(&self.jobs, &token, JobState::Submitted);
        tracing::info!(
            tracking_id = %token,
            file_name = %payload.file_name,
            "Job submitted",
        );

        let processor = Arc::clone(&self.processor);
        let permits = Arc::clone(&self.permits);
        let jobs = Arc::clone(&self.jobs);
        let completions = self.completions.clone();

        self.tracker.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(_permit) => {
                    set_state(&jobs, &token, JobState::Running);
                    tracing::debug!(tracking_id = %token, "Job running");
                    run_processor(processor.as_ref(), payload).await
                }
                Err(_) => JobOutcome::Failed("worker pool closed".to_string()),
            };

            jobs.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&token);

            match &outcome {
                JobOutcome::Completed(shape) => tracing::info!(
                    tracking_id = %token,
                    vertices = shape.vertices.len(),
                    "Job completed",
                ),
                JobOutcome::Failed(error) => tracing::warn!(
                    tracking_id = %token,
                    error = %error,
                    "Job failed",
                ),
            }

            if completions.send(JobCompletion { token, outcome }).is_err() {
                tracing::warn!("Completion channel closed, job outcome dropped");
            }
        });

        Ok(())
    }

    /// Current state of a job that has not yet finished.
    pub fn state(&self, token: &TrackingToken) -> Option<JobState> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .copied()
    }

    /// Number of jobs submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Worker permits not currently held by a running job.
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stop accepting new jobs and wait up to `timeout` for in-flight jobs.
    ///
    /// Returns `true` if every in-flight job finished in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        tracing::info!(pending, "Draining job executor");

        let drained = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        if !drained {
            tracing::warn!(remaining = self.tracker.len(), "Job executor drain timed out");
        }
        drained
    }
}

/// Run the processor, turning errors and panics into a failed outcome.
async fn run_processor(processor: &dyn JobProcessor, payload: JobPayload) -> JobOutcome {
    match AssertUnwindSafe(processor.process(payload))
        .catch_unwind()
        .await
    {
        Ok(Ok(shape)) => JobOutcome::Completed(shape),
        Ok(Err(e)) => JobOutcome::Failed(e.to_string()),
        Err(_) => JobOutcome::Failed(JobError::Panicked.to_string()),
    }
}

fn set_state(jobs: &JobTable, token: &TrackingToken, state: JobState) {
    jobs.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(token.clone(), state);
}
