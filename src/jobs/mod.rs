//! Named background jobs: the queue contract and the bus-backed worker.

mod manager;
mod service;

pub use manager::ArtworkManager;
pub use service::ArtworkService;

use log::warn;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::{Receiver, Sender};
use uuid::Uuid;

use crate::error::{ArtworkError, Result};
use crate::protocol::{ArtworkJob, ArtworkMessage, JobSummary, Message};

/// Enqueue a named job, get a handle back.
pub trait JobQueue {
    fn enqueue(&self, job: ArtworkJob) -> Result<JobHandle>;
}

/// Tracks one enqueued job on the bus.
pub struct JobHandle {
    job_id: String,
    name: &'static str,
    bus_consumer: Receiver<Message>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Blocks until the worker reports this job finished or failed.
    pub fn wait(mut self) -> Result<JobSummary> {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(Message::Artwork(ArtworkMessage::JobFinished { job_id, summary }))
                    if job_id == self.job_id =>
                {
                    return Ok(summary);
                }
                Ok(Message::Artwork(ArtworkMessage::JobFailed { job_id, error }))
                    if job_id == self.job_id =>
                {
                    return Err(ArtworkError::Queue(format!("{} failed: {}", self.name, error)));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "JobHandle {} lagged on bus, skipped {} message(s)",
                        self.job_id, skipped
                    );
                }
                Err(RecvError::Closed) => {
                    return Err(ArtworkError::Queue(format!(
                        "bus closed before {} {} completed",
                        self.name, self.job_id
                    )));
                }
            }
        }
    }
}

/// Queue backed by the broadcast bus; an [`ArtworkManager`] consumes it.
#[derive(Clone)]
pub struct BusJobQueue {
    bus_producer: Sender<Message>,
}

impl BusJobQueue {
    pub fn new(bus_producer: Sender<Message>) -> Self {
        Self { bus_producer }
    }
}

impl JobQueue for BusJobQueue {
    fn enqueue(&self, job: ArtworkJob) -> Result<JobHandle> {
        if self.bus_producer.receiver_count() == 0 {
            return Err(ArtworkError::Queue("no artwork worker on the bus".to_string()));
        }
        let job_id = Uuid::new_v4().to_string();
        let name = job.name();
        // Subscribe before sending so the completion cannot be missed.
        let bus_consumer = self.bus_producer.subscribe();
        self.bus_producer
            .send(Message::Artwork(ArtworkMessage::RunJob {
                job_id: job_id.clone(),
                job,
            }))
            .map_err(|_| ArtworkError::Queue("artwork bus closed".to_string()))?;
        Ok(JobHandle {
            job_id,
            name,
            bus_consumer,
        })
    }
}
