//! Bulk backfill of missing artwork from the index.
//!
//! Every active entity is passed to the store with `skip_existing`, so a pass
//! over a fully cached library performs no downloads at all.

use log::{info, warn};

use crate::artwork_item::ArtworkTarget;
use crate::artwork_store::{ArtworkOutcome, ArtworkStore};
use crate::config::ValidatorConfig;
use crate::index::{ArtworkIndex, IndexCollection, IndexRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub collection: IndexCollection,
    pub scanned: usize,
    pub written: usize,
    pub skipped: usize,
    pub unavailable: usize,
    pub failed: usize,
    /// Set when the scan itself stopped early.
    pub scan_error: Option<String>,
}

impl CollectionReport {
    fn new(collection: IndexCollection) -> Self {
        Self {
            collection,
            scanned: 0,
            written: 0,
            skipped: 0,
            unavailable: 0,
            failed: 0,
            scan_error: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub collections: Vec<CollectionReport>,
}

impl ValidationReport {
    pub fn written(&self) -> usize {
        self.collections.iter().map(|report| report.written).sum()
    }

    pub fn failed(&self) -> usize {
        self.collections
            .iter()
            .map(|report| report.failed + usize::from(report.scan_error.is_some()))
            .sum()
    }
}

pub struct ArtworkValidator<'a> {
    store: &'a ArtworkStore,
    index: &'a dyn ArtworkIndex,
    video_page_size: usize,
    page_size: usize,
}

impl<'a> ArtworkValidator<'a> {
    pub fn new(store: &'a ArtworkStore, index: &'a dyn ArtworkIndex, config: &ValidatorConfig) -> Self {
        Self {
            store,
            index,
            video_page_size: config.video_page_size.max(1),
            page_size: config.page_size.max(1),
        }
    }

    /// Scans videos, channels, then playlists.
    pub fn download_missing_artwork(&self) -> ValidationReport {
        ValidationReport {
            collections: IndexCollection::ALL
                .into_iter()
                .map(|collection| self.download_missing(collection))
                .collect(),
        }
    }

    pub fn download_missing(&self, collection: IndexCollection) -> CollectionReport {
        let page_size = match collection {
            IndexCollection::Videos => self.video_page_size,
            IndexCollection::Channels | IndexCollection::Playlists => self.page_size,
        };
        info!("Validator[{}]: validate artwork", collection);

        let mut report = CollectionReport::new(collection);
        let scan = self.index.scan_active(collection, page_size, &mut |page: Vec<IndexRecord>| {
            self.validate_page(page, &mut report)
        });
        if let Err(error) = scan {
            warn!("Validator[{}]: scan aborted: {}", collection, error);
            report.scan_error = Some(error.to_string());
        }

        info!(
            "Validator[{}]: scanned={} written={} skipped={} unavailable={} failed={}",
            collection,
            report.scanned,
            report.written,
            report.skipped,
            report.unavailable,
            report.failed
        );
        report
    }

    fn validate_page(&self, page: Vec<IndexRecord>, report: &mut CollectionReport) {
        for record in page {
            report.scanned += 1;
            let record_id = record.id().to_string();
            let item = match record.into_artwork_item() {
                Ok(item) => item,
                Err(error) => {
                    warn!(
                        "Validator[{}]: skipping record {:?}: {}",
                        report.collection, record_id, error
                    );
                    report.failed += 1;
                    continue;
                }
            };

            for outcome in item.download(self.store, true) {
                match outcome {
                    Ok(ArtworkOutcome::Written { .. }) => report.written += 1,
                    Ok(ArtworkOutcome::Skipped { .. }) => report.skipped += 1,
                    Ok(ArtworkOutcome::Unavailable { .. }) => report.unavailable += 1,
                    Err(error) => {
                        warn!(
                            "Validator[{}]: {}: artwork write failed: {}",
                            report.collection, record_id, error
                        );
                        report.failed += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork_store::tests::{id, store};
    use crate::error::{ArtworkError, Result};
    use crate::fallback::ArtworkKind;
    use crate::index::{ChannelRecord, PlaylistRecord, SqliteIndex, VideoRecord};
    use std::fs;

    fn video(id: &str) -> VideoRecord {
        VideoRecord {
            youtube_id: id.to_string(),
            vid_thumb_url: Some(format!("http://img/{id}.jpg")),
        }
    }

    #[test]
    fn test_download_missing_fetches_only_absent_thumbnails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        let index = SqliteIndex::open_in_memory().unwrap();
        for video_id in ["aaa", "bbb", "ccc"] {
            index.upsert_video(&video(video_id), None, true).unwrap();
        }
        let cached = store.cache_path(&id("bbb"), ArtworkKind::Video);
        fs::create_dir_all(cached.parent().unwrap()).unwrap();
        fs::write(&cached, b"already cached").unwrap();
        transport.push_image(160, 90);
        transport.push_image(160, 90);

        let validator = ArtworkValidator::new(&store, &index, &ValidatorConfig::default());
        let report = validator.download_missing(IndexCollection::Videos);

        assert_eq!(transport.calls(), 2);
        assert_eq!(
            transport.urls(),
            vec!["http://img/aaa.jpg".to_string(), "http://img/ccc.jpg".to_string()]
        );
        assert_eq!(fs::read(&cached).unwrap(), b"already cached");
        assert_eq!((report.scanned, report.written, report.skipped), (3, 2, 1));
    }

    #[test]
    fn test_second_pass_performs_no_downloads() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        let index = SqliteIndex::open_in_memory().unwrap();
        index.upsert_video(&video("v1"), None, true).unwrap();
        index
            .upsert_channel(
                &ChannelRecord {
                    channel_id: "UC1".to_string(),
                    channel_thumb_url: None,
                    channel_banner_url: None,
                },
                true,
            )
            .unwrap();
        index
            .upsert_playlist(
                &PlaylistRecord {
                    playlist_id: "PL1".to_string(),
                    playlist_thumbnail: None,
                },
                true,
            )
            .unwrap();
        transport.push_image(160, 90);

        let validator = ArtworkValidator::new(&store, &index, &ValidatorConfig::default());
        let first = validator.download_missing_artwork();
        assert_eq!(first.written(), 4);
        assert_eq!(transport.calls(), 1);

        let snapshot = fs::read(store.cache_path(&id("v1"), ArtworkKind::Video)).unwrap();
        let second = validator.download_missing_artwork();
        assert_eq!(second.written(), 0);
        assert_eq!(transport.calls(), 1);
        assert_eq!(
            fs::read(store.cache_path(&id("v1"), ArtworkKind::Video)).unwrap(),
            snapshot
        );
        let skipped: usize = second.collections.iter().map(|report| report.skipped).sum();
        assert_eq!(skipped, 4);
    }

    #[test]
    fn test_inactive_entities_are_not_validated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        let index = SqliteIndex::open_in_memory().unwrap();
        index.upsert_video(&video("off"), None, false).unwrap();

        let validator = ArtworkValidator::new(&store, &index, &ValidatorConfig::default());
        let report = validator.download_missing(IndexCollection::Videos);
        assert_eq!(report.scanned, 0);
        assert_eq!(transport.calls(), 0);
        assert!(!store.cache_path(&id("off"), ArtworkKind::Video).exists());
    }

    #[test]
    fn test_bad_entities_do_not_abort_the_page() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        let index = SqliteIndex::open_in_memory().unwrap();
        index.upsert_video(&video("a/b"), None, true).unwrap();
        index.upsert_video(&video("down"), None, true).unwrap();
        index.upsert_video(&video("up"), None, true).unwrap();
        for _ in 0..3 {
            transport.push(Err(crate::image_fetcher::TransportError(
                "connection refused".to_string(),
            )));
        }
        transport.push_image(160, 90);

        let config = ValidatorConfig {
            video_page_size: 1,
            page_size: 1,
        };
        let validator = ArtworkValidator::new(&store, &index, &config);
        let report = validator.download_missing(IndexCollection::Videos);

        assert_eq!(report.scanned, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.unavailable, 1);
        assert_eq!(report.written, 1);
        assert!(store.cache_path(&id("up"), ArtworkKind::Video).exists());
        assert!(!store.cache_path(&id("down"), ArtworkKind::Video).exists());
    }

    struct BrokenIndex;

    impl ArtworkIndex for BrokenIndex {
        fn scan_active(
            &self,
            _collection: IndexCollection,
            _page_size: usize,
            _on_page: &mut dyn FnMut(Vec<IndexRecord>),
        ) -> Result<usize> {
            Err(ArtworkError::Index(rusqlite::Error::QueryReturnedNoRows))
        }

        fn get(&self, _collection: IndexCollection, _id: &str) -> Result<Option<IndexRecord>> {
            Ok(None)
        }
    }

    #[test]
    fn test_scan_failure_is_reported_per_collection() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, _) = store(temp_dir.path());
        let validator = ArtworkValidator::new(&store, &BrokenIndex, &ValidatorConfig::default());

        let report = validator.download_missing_artwork();
        assert_eq!(report.collections.len(), 3);
        assert!(report
            .collections
            .iter()
            .all(|collection| collection.scan_error.is_some()));
        assert_eq!(report.failed(), 3);
    }
}
