use log::info;

use crate::artwork_item::ArtworkTarget;
use crate::artwork_store::ArtworkStore;
use crate::config::Config;
use crate::error::Result;
use crate::index::{ArtworkIndex, MediaManifest};
use crate::metadata::MetadataEmbedder;
use crate::protocol::{ArtworkJob, JobSummary};
use crate::validator::ArtworkValidator;

/// Owns the store and index and runs jobs synchronously on the caller's thread.
pub struct ArtworkService<I> {
    config: Config,
    store: ArtworkStore,
    index: I,
}

impl<I> ArtworkService<I>
where
    I: ArtworkIndex + MediaManifest,
{
    pub fn new(config: Config, store: ArtworkStore, index: I) -> Self {
        Self {
            config,
            store,
            index,
        }
    }

    pub fn store(&self) -> &ArtworkStore {
        &self.store
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn validator(&self) -> ArtworkValidator<'_> {
        ArtworkValidator::new(&self.store, &self.index, &self.config.validator)
    }

    pub fn embedder(&self) -> MetadataEmbedder<'_> {
        MetadataEmbedder::new(
            &self.store,
            &self.index,
            &self.config.application.media_dir,
            &self.config.embedder,
        )
    }

    pub fn execute(&self, job: &ArtworkJob) -> Result<JobSummary> {
        info!("ArtworkService: running {}", job.name());
        match job {
            ArtworkJob::DownloadMissingArtwork => Ok(JobSummary::Validation(
                self.validator().download_missing_artwork(),
            )),
            ArtworkJob::SyncEmbeddedThumbnails => Ok(JobSummary::Embedding(
                self.embedder().sync_embedded_thumbnails()?,
            )),
            ArtworkJob::DownloadArtwork {
                item,
                skip_existing,
            } => {
                let mut outcomes = Vec::new();
                let mut failures = Vec::new();
                for result in item.download(&self.store, *skip_existing) {
                    match result {
                        Ok(outcome) => outcomes.push(outcome),
                        Err(error) => failures.push(error.to_string()),
                    }
                }
                Ok(JobSummary::Downloaded {
                    id: item.id().to_string(),
                    outcomes,
                    failures,
                })
            }
            ArtworkJob::DeleteArtwork { item } => Ok(JobSummary::Deleted {
                id: item.id().to_string(),
                removed: item.delete(&self.store)?,
            }),
        }
    }
}
