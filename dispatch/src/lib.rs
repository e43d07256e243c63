//! Bounded action queue between a front-end and the Moltbook client.
//!
//! Actions are submitted as futures and executed by a fixed pool of
//! workers; lifecycle events flow back over a channel that a single UI
//! context drains. A full queue rejects new work instead of growing,
//! and nothing survives a restart.

use futures::future::{BoxFuture, FutureExt};
use moltbook_core::{CoreError, DispatchError, ErrorExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type ActionId = Uuid;

type ActionFuture<M> = BoxFuture<'static, Result<M, CoreError>>;

struct Job<M> {
    id: ActionId,
    name: String,
    future: ActionFuture<M>,
}

/// Lifecycle events delivered to the UI receiver. Every accepted action
/// produces `Started` followed by exactly one of `Completed` or `Failed`.
#[derive(Debug)]
pub enum ActionEvent<M> {
    Started {
        id: ActionId,
        name: String,
    },
    Completed {
        id: ActionId,
        name: String,
        message: M,
    },
    Failed {
        id: ActionId,
        name: String,
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How many actions may run at the same time.
    pub workers: usize,
    /// How many accepted actions may wait for a worker.
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 32,
        }
    }
}

/// Handle for submitting actions. Cheap to clone; all clones feed the
/// same queue. Must be created inside a Tokio runtime.
pub struct Dispatcher<M> {
    jobs: mpsc::Sender<Job<M>>,
    events: mpsc::UnboundedSender<ActionEvent<M>>,
    config: DispatchConfig,
}

impl<M> Clone for Dispatcher<M> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
            events: self.events.clone(),
            config: self.config.clone(),
        }
    }
}

impl<M: Send + 'static> Dispatcher<M> {
    pub fn new(config: DispatchConfig) -> (Self, mpsc::UnboundedReceiver<ActionEvent<M>>) {
        let (jobs_tx, jobs_rx) = mpsc::channel(config.queue_capacity);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(config.workers));

        tokio::spawn(run_queue(jobs_rx, events_tx.clone(), permits));

        let dispatcher = Self {
            jobs: jobs_tx,
            events: events_tx,
            config,
        };
        (dispatcher, events_rx)
    }

    /// Queues an action for execution. Duplicate submissions are not
    /// de-duplicated; concurrent identical actions all run and the last
    /// write wins server-side.
    pub fn submit<F>(&self, name: &str, future: F) -> Result<ActionId, CoreError>
    where
        F: Future<Output = Result<M, CoreError>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let job = Job {
            id,
            name: name.to_string(),
            future: future.boxed(),
        };

        match self.jobs.try_send(job) {
            Ok(()) => {
                debug!("Queued action {} ({})", name, id);
                Ok(id)
            }
            Err(TrySendError::Full(job)) => {
                warn!("Action queue full, rejecting {} ({})", job.name, job.id);
                Err(DispatchError::QueueFull {
                    capacity: self.config.queue_capacity,
                }
                .into())
            }
            Err(TrySendError::Closed(_)) => Err(DispatchError::Closed.into()),
        }
    }

    /// Runs an action after a one-shot delay. The timer lives only in
    /// this process; pending timers are lost on restart. A queue that is
    /// full when the timer fires turns into a `Failed` event.
    pub fn schedule<F>(
        &self,
        delay: Duration,
        name: &str,
        future: F,
    ) -> Result<ActionId, CoreError>
    where
        F: Future<Output = Result<M, CoreError>> + Send + 'static,
    {
        if delay.is_zero() {
            return self.submit(name, future);
        }

        let id = Uuid::new_v4();
        let job = Job {
            id,
            name: name.to_string(),
            future: future.boxed(),
        };
        let jobs = self.jobs.clone();
        let events = self.events.clone();
        let capacity = self.config.queue_capacity;

        debug!("Scheduled action {} ({}) in {:?}", name, id, delay);
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(send_error) = jobs.try_send(job) {
                let (job, error): (Job<M>, CoreError) = match send_error {
                    TrySendError::Full(job) => (
                        job,
                        DispatchError::QueueFull { capacity }.into(),
                    ),
                    TrySendError::Closed(job) => (job, DispatchError::Closed.into()),
                };
                error.log_warn();
                let _ = events.send(ActionEvent::Failed {
                    id: job.id,
                    name: job.name,
                    error: error.user_friendly_message(),
                });
            }
        });

        Ok(id)
    }
}

async fn run_queue<M: Send + 'static>(
    mut jobs: mpsc::Receiver<Job<M>>,
    events: mpsc::UnboundedSender<ActionEvent<M>>,
    permits: Arc<Semaphore>,
) {
    info!("Action queue started");
    while let Some(job) = jobs.recv().await {
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .expect("Semaphore should not be closed");
        tokio::spawn(run_action(job, events.clone(), permit));
    }
    info!("Action queue stopped");
}

async fn run_action<M: Send + 'static>(
    job: Job<M>,
    events: mpsc::UnboundedSender<ActionEvent<M>>,
    _permit: OwnedSemaphorePermit,
) {
    let Job { id, name, future } = job;

    // Started marks the beginning of execution, not of queueing, so the
    // activity label reflects work actually in flight.
    let _ = events.send(ActionEvent::Started {
        id,
        name: name.clone(),
    });

    match future.await {
        Ok(message) => {
            debug!("Action {} ({}) completed", name, id);
            let _ = events.send(ActionEvent::Completed { id, name, message });
        }
        Err(error) => {
            warn!("Action {} ({}) failed", name, id);
            error.log_error();
            let _ = events.send(ActionEvent::Failed {
                id,
                name,
                error: error.user_friendly_message(),
            });
        }
    }
}
