//! Event-bus protocol between job producers and the artwork worker.

use crate::artwork_item::ArtworkItem;
use crate::artwork_store::ArtworkOutcome;
use crate::metadata::EmbedReport;
use crate::validator::ValidationReport;

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Artwork(ArtworkMessage),
}

/// Background work the artwork worker knows how to run.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtworkJob {
    DownloadMissingArtwork,
    SyncEmbeddedThumbnails,
    DownloadArtwork {
        item: ArtworkItem,
        skip_existing: bool,
    },
    DeleteArtwork {
        item: ArtworkItem,
    },
}

impl ArtworkJob {
    /// Stable job name as seen by queue consumers.
    pub fn name(&self) -> &'static str {
        match self {
            ArtworkJob::DownloadMissingArtwork => "download_missing_artwork",
            ArtworkJob::SyncEmbeddedThumbnails => "sync_embedded_thumbnails",
            ArtworkJob::DownloadArtwork { .. } => "download_artwork",
            ArtworkJob::DeleteArtwork { .. } => "delete_artwork",
        }
    }
}

/// Result payload of a finished job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobSummary {
    Validation(ValidationReport),
    Embedding(EmbedReport),
    Downloaded {
        id: String,
        outcomes: Vec<ArtworkOutcome>,
        /// Slots that errored; the other slots were still attempted.
        failures: Vec<String>,
    },
    Deleted {
        id: String,
        removed: usize,
    },
}

#[derive(Debug, Clone)]
pub enum ArtworkMessage {
    RunJob { job_id: String, job: ArtworkJob },
    JobStarted { job_id: String, name: &'static str },
    JobFinished { job_id: String, summary: JobSummary },
    JobFailed { job_id: String, error: String },
    /// Stops the worker loop after the current job.
    Shutdown,
}
