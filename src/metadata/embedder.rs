//! Batch rewrite of embedded cover art from cached video thumbnails.

use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};

use super::cover_art::write_front_cover;
use crate::artwork_store::{ArtworkStore, CachePathOptions, EntityId};
use crate::config::EmbedderConfig;
use crate::error::{ArtworkError, Result};
use crate::index::{MediaEntry, MediaManifest};

/// A media file and the cached thumbnail that belongs inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedPair {
    pub youtube_id: String,
    pub media_path: PathBuf,
    pub thumb_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedFailure {
    pub youtube_id: String,
    pub media_path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedReport {
    pub total: usize,
    pub embedded: usize,
    pub failures: Vec<EmbedFailure>,
}

pub struct MetadataEmbedder<'a> {
    store: &'a ArtworkStore,
    manifest: &'a dyn MediaManifest,
    media_dir: PathBuf,
    config: EmbedderConfig,
}

impl<'a> MetadataEmbedder<'a> {
    pub fn new(
        store: &'a ArtworkStore,
        manifest: &'a dyn MediaManifest,
        media_dir: impl Into<PathBuf>,
        config: &EmbedderConfig,
    ) -> Self {
        Self {
            store,
            manifest,
            media_dir: media_dir.into(),
            config: config.clone(),
        }
    }

    fn pair_for(&self, entry: MediaEntry) -> std::result::Result<EmbedPair, EmbedFailure> {
        let media_path = self.media_dir.join(&entry.media_url);
        let thumb_path = EntityId::new(entry.youtube_id.as_str()).and_then(|id| {
            self.store.video_thumb_path(
                &id,
                CachePathOptions {
                    absolute: true,
                    create_folder: false,
                },
            )
        });
        match thumb_path {
            Ok(thumb_path) => Ok(EmbedPair {
                youtube_id: entry.youtube_id,
                media_path,
                thumb_path,
            }),
            Err(error) => Err(EmbedFailure {
                youtube_id: entry.youtube_id,
                media_path,
                reason: error.to_string(),
            }),
        }
    }

    /// Joins every manifest entry with its cached thumbnail path. Entries
    /// whose id cannot name a cache file come back as failures.
    fn joined_entries(&self) -> Result<Vec<std::result::Result<EmbedPair, EmbedFailure>>> {
        Ok(self
            .manifest
            .media_entries()?
            .into_iter()
            .map(|entry| self.pair_for(entry))
            .collect())
    }

    /// Media files of pending and indexed videos paired with their cached
    /// thumbnail paths. Entries with unusable ids are left out.
    pub fn thumb_list(&self) -> Result<Vec<EmbedPair>> {
        Ok(self
            .joined_entries()?
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(pair) => Some(pair),
                Err(failure) => {
                    warn!(
                        "MetadataEmbedder: skipping {:?}: {}",
                        failure.youtube_id, failure.reason
                    );
                    None
                }
            })
            .collect())
    }

    fn embed_one(&self, pair: &EmbedPair) -> Result<()> {
        if !pair.thumb_path.exists() {
            return Err(ArtworkError::NotFound(pair.thumb_path.clone()));
        }
        debug!(
            "MetadataEmbedder: {} -> {}",
            pair.thumb_path.display(),
            pair.media_path.display()
        );
        let bytes = fs::read(&pair.thumb_path)
            .map_err(|error| ArtworkError::io(&pair.thumb_path, error))?;
        write_front_cover(&pair.media_path, bytes)
    }

    /// Writes each cached thumbnail into its media file as the front cover.
    ///
    /// A missing thumbnail is skipped unless `abort_on_missing_thumbnail` is
    /// set, in which case the run stops with [`ArtworkError::NotFound`]. Any
    /// other per-file failure is recorded and the run continues.
    pub fn sync_embedded_thumbnails(&self) -> Result<EmbedReport> {
        let joined = self.joined_entries()?;
        let total = joined.len();
        let mut report = EmbedReport {
            total,
            ..EmbedReport::default()
        };
        let interval = self.config.progress_interval.max(1);
        info!("MetadataEmbedder: embedding thumbnails into {} file(s)", total);

        for (position, entry) in joined.into_iter().enumerate() {
            let failure = match entry {
                Ok(pair) => match self.embed_one(&pair) {
                    Ok(()) => {
                        report.embedded += 1;
                        None
                    }
                    Err(ArtworkError::NotFound(path))
                        if path == pair.thumb_path && self.config.abort_on_missing_thumbnail =>
                    {
                        warn!(
                            "MetadataEmbedder: aborting, thumbnail missing for {}: {}",
                            pair.youtube_id,
                            path.display()
                        );
                        return Err(ArtworkError::NotFound(path));
                    }
                    Err(error) => Some(EmbedFailure {
                        youtube_id: pair.youtube_id,
                        media_path: pair.media_path,
                        reason: error.to_string(),
                    }),
                },
                Err(failure) => Some(failure),
            };
            if let Some(failure) = failure {
                warn!("MetadataEmbedder: {}: {}", failure.youtube_id, failure.reason);
                report.failures.push(failure);
            }

            let counter = position + 1;
            if counter % interval == 0 {
                info!("thumbnail write progress {}/{}", counter, total);
            }
        }

        info!(
            "MetadataEmbedder: embedded {}/{} thumbnail(s), {} failure(s)",
            report.embedded,
            report.total,
            report.failures.len()
        );
        Ok(report)
    }
}
