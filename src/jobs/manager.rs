//! Artwork worker runtime component.
//!
//! Consumes `RunJob` requests from the bus, runs them one at a time and
//! publishes the outcome under the same job id.

use log::{debug, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::{Receiver, Sender};

use super::ArtworkService;
use crate::index::{ArtworkIndex, MediaManifest};
use crate::protocol::{ArtworkJob, ArtworkMessage, Message};

pub struct ArtworkManager<I> {
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
    service: ArtworkService<I>,
}

impl<I> ArtworkManager<I>
where
    I: ArtworkIndex + MediaManifest,
{
    pub fn new(
        bus_consumer: Receiver<Message>,
        bus_producer: Sender<Message>,
        service: ArtworkService<I>,
    ) -> Self {
        Self {
            bus_consumer,
            bus_producer,
            service,
        }
    }

    fn handle_run_job(&self, job_id: String, job: ArtworkJob) {
        debug!("ArtworkManager: starting {} job_id={}", job.name(), job_id);
        let _ = self
            .bus_producer
            .send(Message::Artwork(ArtworkMessage::JobStarted {
                job_id: job_id.clone(),
                name: job.name(),
            }));
        let reply = match self.service.execute(&job) {
            Ok(summary) => ArtworkMessage::JobFinished { job_id, summary },
            Err(error) => {
                warn!(
                    "ArtworkManager: {} job_id={} failed: {}",
                    job.name(),
                    job_id,
                    error
                );
                ArtworkMessage::JobFailed {
                    job_id,
                    error: error.to_string(),
                }
            }
        };
        let _ = self.bus_producer.send(Message::Artwork(reply));
    }

    /// Starts the blocking event loop for queued artwork jobs.
    pub fn run(&mut self) {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(Message::Artwork(ArtworkMessage::RunJob { job_id, job })) => {
                    self.handle_run_job(job_id, job);
                }
                Ok(Message::Artwork(ArtworkMessage::Shutdown)) => {
                    debug!("ArtworkManager: shutdown requested");
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "ArtworkManager lagged on control bus, skipped {} message(s)",
                        skipped
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}
