//! Background task queue
//!
//! The gateway hands accepted requests to a [`TaskSink`] and answers at once.
//! [`TaskQueue`] runs each request on the runtime, at most
//! `max_concurrent_rounds` at a time. Once a request is dispatched it runs to
//! completion; shutdown stops intake and waits for in-flight rounds.

use async_trait::async_trait;
use pagesmith_utils::logging::round_span;
use pagesmith_utils::types::TaskRequest;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{Instrument, debug, error, info};

use crate::workflow::RoundWorkflow;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Task queue is shut down")]
    Closed,
}

/// Intake side of the queue, as seen by the gateway.
pub trait TaskSink: Send + Sync {
    /// Accept `task` for background execution without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Closed` once shutdown has begun.
    fn submit(&self, task: TaskRequest) -> Result<(), QueueError>;
}

/// Executes one dispatched request.
#[async_trait]
pub trait RoundRunner: Send + Sync {
    async fn run_round(&self, task: TaskRequest);
}

#[async_trait]
impl RoundRunner for RoundWorkflow {
    async fn run_round(&self, task: TaskRequest) {
        let span = round_span(&task.task, &task.nonce, task.round);
        async {
            info!(email = %task.email, "Round started");
            match self.run(&task).await {
                Ok(summary) => info!(
                    repo = %summary.repo,
                    states = ?summary.states,
                    strategy = %summary.strategy,
                    publish = %summary.publish,
                    commit = %summary.commit_sha,
                    notify = %summary.notify,
                    "Round finished"
                ),
                Err(e) => error!(error = %e, "Round aborted"),
            }
        }
        .instrument(span)
        .await;
    }
}

/// Bounded-concurrency dispatcher.
pub struct TaskQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<TaskRequest>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TaskQueue {
    /// Start the dispatcher on the current runtime.
    #[must_use]
    pub fn start(runner: Arc<dyn RoundRunner>, max_concurrent_rounds: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(max_concurrent_rounds.max(1)));
        let dispatcher = tokio::spawn(dispatch(receiver, runner, permits));

        Self {
            sender: Mutex::new(Some(sender)),
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Stop accepting work and wait for every dispatched round to finish.
    pub async fn shutdown(&self) {
        drop(lock(&self.sender).take());
        let handle = lock(&self.dispatcher).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Task dispatcher ended abnormally");
            }
        }
        info!("Task queue drained");
    }
}

impl TaskSink for TaskQueue {
    fn submit(&self, task: TaskRequest) -> Result<(), QueueError> {
        let guard = lock(&self.sender);
        let sender = guard.as_ref().ok_or(QueueError::Closed)?;
        sender.send(task).map_err(|_| QueueError::Closed)
    }
}

async fn dispatch(
    mut receiver: mpsc::UnboundedReceiver<TaskRequest>,
    runner: Arc<dyn RoundRunner>,
    permits: Arc<Semaphore>,
) {
    let mut in_flight = JoinSet::new();

    while let Some(task) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        debug!(task = %task.task, nonce = %task.nonce, round = task.round, "Dispatching round");
        let runner = runner.clone();
        in_flight.spawn(async move {
            let _permit = permit;
            runner.run_round(task).await;
        });

        while let Some(finished) = in_flight.try_join_next() {
            log_join(finished);
        }
    }

    while let Some(finished) = in_flight.join_next().await {
        log_join(finished);
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Round task panicked");
    }
}
