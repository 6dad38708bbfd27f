//! Bounded worker queue that executes deferred tasks in the background.
//!
//! # Design
//! - `enqueue` never waits: a full buffer or stopped worker is reported as a `QueueError`.
//! - At most `concurrency` tasks run at once; failed attempts back off linearly.
//! - Exhausted tasks are reported on the event bus, never to the original caller.

use std::sync::Arc;

use async_trait::async_trait;
use deposit_config::QueuePolicy;
use deposit_core::{QueueError, QueueResult, Task, TaskHandle, TaskQueue};
use deposit_telemetry::Metrics;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::runner::JobRunner;

struct QueuedTask {
    handle: TaskHandle,
    task: Task,
}

/// Producer side of the worker queue; cheap to clone.
#[derive(Clone)]
pub struct WorkerQueue {
    sender: mpsc::Sender<QueuedTask>,
    metrics: Metrics,
}

/// Owner handle for the background worker.
pub struct WorkerHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop accepting tasks, finish everything already queued, and wait for the worker.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.join.await {
            warn!(error = %err, "task worker terminated abnormally");
        }
    }
}

impl WorkerQueue {
    /// Spawn the background worker and return the queue plus its owner handle.
    #[must_use]
    pub fn spawn(runner: JobRunner, policy: QueuePolicy, metrics: Metrics) -> (Self, WorkerHandle) {
        let (sender, receiver) = mpsc::channel(policy.capacity.max(1));
        let (shutdown, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(run_worker(
            runner,
            policy,
            metrics.clone(),
            receiver,
            shutdown_rx,
        ));
        (Self { sender, metrics }, WorkerHandle { shutdown, join })
    }
}

#[async_trait]
impl TaskQueue for WorkerQueue {
    async fn enqueue(&self, task: Task) -> QueueResult<TaskHandle> {
        let kind = task.kind();
        let handle = TaskHandle::for_task(&task);
        self.sender
            .try_send(QueuedTask {
                handle: handle.clone(),
                task,
            })
            .map_err(|err| match err {
                TrySendError::Full(_) => QueueError::Full { kind },
                TrySendError::Closed(_) => QueueError::Closed { kind },
            })?;
        self.metrics.inc_task_enqueued(kind);
        debug!(task_id = %handle.id, kind, "task enqueued");
        Ok(handle)
    }
}

async fn run_worker(
    runner: JobRunner,
    policy: QueuePolicy,
    metrics: Metrics,
    mut receiver: mpsc::Receiver<QueuedTask>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let concurrency = policy.concurrency.max(1);
    let permits = Arc::new(Semaphore::new(concurrency));
    let mut draining = false;
    loop {
        tokio::select! {
            queued = receiver.recv() => {
                let Some(queued) = queued else { break };
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await else { break };
                let runner = runner.clone();
                let policy = policy.clone();
                let metrics = metrics.clone();
                let span = info_span!("task", task_id = %queued.handle.id, kind = queued.task.kind());
                tokio::spawn(
                    async move {
                        execute(&runner, &policy, &metrics, queued).await;
                        drop(permit);
                    }
                    .instrument(span),
                );
            }
            signal = &mut shutdown, if !draining => {
                draining = true;
                // A dropped handle leaves the worker running until every producer is gone.
                if signal.is_ok() {
                    info!("task worker draining");
                    receiver.close();
                }
            }
        }
    }

    let in_flight = u32::try_from(concurrency).unwrap_or(u32::MAX);
    let _ = permits.acquire_many(in_flight).await;
    info!("task worker stopped");
}

async fn execute(runner: &JobRunner, policy: &QueuePolicy, metrics: &Metrics, queued: QueuedTask) {
    let QueuedTask { handle, task } = queued;
    let kind = task.kind();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match runner.run(&task).await {
            Ok(()) => {
                metrics.inc_task_finished(kind, "completed");
                debug!(attempt, "task completed");
                return;
            }
            Err(err) if attempt < max_attempts => {
                warn!(attempt, error = %err, "task attempt failed; retrying");
                tokio::time::sleep(policy.backoff_for(attempt)).await;
                attempt += 1;
            }
            Err(err) => {
                error!(attempt, error = %err, "task exhausted its attempts");
                metrics.inc_task_finished(kind, "failed");
                runner.report_failure(&handle, &task, &err).await;
                return;
            }
        }
    }
}
