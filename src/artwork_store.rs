//! On-disk artwork cache: canonical paths, normalization, persistence.
//!
//! Layout under the cache root:
//!
//! ```text
//! videos/<lower(id[0])>/<id>.jpg
//! channels/<id>_thumb.jpg
//! channels/<id>_banner.jpg
//! playlists/<id>.jpg
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::DynamicImage;
use log::{debug, info, warn};

use crate::config::Config;
use crate::error::{ArtworkError, Result};
use crate::fallback::ArtworkKind;
use crate::image_fetcher::{FetchOutcome, FetchRequest, ImageFetcher};
use crate::image_pipeline::{
    blurred_jpeg_preview, crop_to_widescreen, decode_image_from_path_with_fallback,
    save_jpeg_atomic,
};

const VIDEOS_DIR: &str = "videos";
const CHANNELS_DIR: &str = "channels";
const PLAYLISTS_DIR: &str = "playlists";
const PREVIEW_SHRINK_FACTOR: u32 = 20;
const PREVIEW_DATA_URI_PREFIX: &str = "data:image/jpg;base64,";

/// Opaque external identifier, used verbatim as a file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let forbidden = value.is_empty()
            || value == "."
            || value == ".."
            || value.contains(['/', '\\', '\0']);
        if forbidden {
            return Err(ArtworkError::InvalidEntityId(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shard directory name for video thumbnails.
    pub fn shard(&self) -> String {
        self.0
            .chars()
            .next()
            .map(|first| first.to_lowercase().collect())
            .unwrap_or_default()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for EntityId {
    type Err = ArtworkError;

    fn from_str(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePathOptions {
    /// Prefix the path with the cache root.
    pub absolute: bool,
    /// Create the shard directory under the cache root.
    pub create_folder: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkSource {
    Remote,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtworkOutcome {
    Written { path: PathBuf, source: ArtworkSource },
    /// Target already present and `skip_existing` was requested.
    Skipped { path: PathBuf },
    /// Remote kept failing; nothing written so a later pass retries.
    Unavailable { path: PathBuf },
}

impl ArtworkOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ArtworkOutcome::Written { path, .. }
            | ArtworkOutcome::Skipped { path }
            | ArtworkOutcome::Unavailable { path } => path,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelArtUrls {
    pub icon: Option<String>,
    pub banner: Option<String>,
}

/// Icon and banner are fetched independently; one failing leaves the other intact.
#[derive(Debug)]
pub struct ChannelArtOutcome {
    pub icon: Result<ArtworkOutcome>,
    pub banner: Result<ArtworkOutcome>,
}

pub struct ArtworkStore {
    cache_dir: PathBuf,
    fetcher: ImageFetcher,
}

impl ArtworkStore {
    pub fn new(config: &Config, fetcher: ImageFetcher) -> Self {
        Self {
            cache_dir: config.application.cache_dir.clone(),
            fetcher,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn video_thumb_relative_path(id: &EntityId) -> PathBuf {
        Path::new(VIDEOS_DIR)
            .join(id.shard())
            .join(format!("{}.jpg", id.as_str()))
    }

    pub fn video_thumb_path(&self, id: &EntityId, options: CachePathOptions) -> Result<PathBuf> {
        let relative = Self::video_thumb_relative_path(id);
        if options.create_folder {
            let folder = self.cache_dir.join(VIDEOS_DIR).join(id.shard());
            fs::create_dir_all(&folder).map_err(|error| ArtworkError::io(&folder, error))?;
        }
        if options.absolute {
            return Ok(self.cache_dir.join(relative));
        }
        Ok(relative)
    }

    pub fn channel_icon_path(&self, id: &EntityId) -> PathBuf {
        self.cache_dir
            .join(CHANNELS_DIR)
            .join(format!("{}_thumb.jpg", id.as_str()))
    }

    pub fn channel_banner_path(&self, id: &EntityId) -> PathBuf {
        self.cache_dir
            .join(CHANNELS_DIR)
            .join(format!("{}_banner.jpg", id.as_str()))
    }

    /// Icon and banner paths, in that order.
    pub fn channel_art_paths(&self, id: &EntityId) -> (PathBuf, PathBuf) {
        (self.channel_icon_path(id), self.channel_banner_path(id))
    }

    pub fn playlist_thumb_path(&self, id: &EntityId) -> PathBuf {
        self.cache_dir
            .join(PLAYLISTS_DIR)
            .join(format!("{}.jpg", id.as_str()))
    }

    /// Absolute cache path of one artwork slot.
    pub fn cache_path(&self, id: &EntityId, kind: ArtworkKind) -> PathBuf {
        match kind {
            ArtworkKind::Video => self.cache_dir.join(Self::video_thumb_relative_path(id)),
            ArtworkKind::ChannelIcon => self.channel_icon_path(id),
            ArtworkKind::ChannelBanner => self.channel_banner_path(id),
            ArtworkKind::Playlist => self.playlist_thumb_path(id),
        }
    }

    fn fetch_and_persist<F>(
        &self,
        id: &EntityId,
        target: PathBuf,
        request: FetchRequest<'_>,
        skip_existing: bool,
        transform: F,
    ) -> Result<ArtworkOutcome>
    where
        F: FnOnce(DynamicImage) -> DynamicImage,
    {
        if skip_existing && target.exists() {
            return Ok(ArtworkOutcome::Skipped { path: target });
        }

        debug!("ArtworkStore: {}: download {} thumbnail", id, request.kind);
        let outcome = self.fetcher.fetch(request);
        let source = if outcome.is_fallback() {
            ArtworkSource::Fallback
        } else {
            ArtworkSource::Remote
        };
        let Some(image) = outcome.into_image() else {
            warn!(
                "ArtworkStore: {}: no {} artwork available, leaving {} unfilled",
                id,
                request.kind,
                target.display()
            );
            return Ok(ArtworkOutcome::Unavailable { path: target });
        };

        save_jpeg_atomic(&transform(image), &target)?;
        Ok(ArtworkOutcome::Written {
            path: target,
            source,
        })
    }

    pub fn download_video_thumbnail(
        &self,
        id: &EntityId,
        url: Option<&str>,
        skip_existing: bool,
    ) -> Result<ArtworkOutcome> {
        let target = self.video_thumb_path(
            id,
            CachePathOptions {
                absolute: true,
                create_folder: false,
            },
        )?;
        if skip_existing && target.exists() {
            return Ok(ArtworkOutcome::Skipped { path: target });
        }
        self.video_thumb_path(
            id,
            CachePathOptions {
                absolute: true,
                create_folder: true,
            },
        )?;
        self.fetch_and_persist(
            id,
            target,
            FetchRequest::new(ArtworkKind::Video, url),
            false,
            crop_to_widescreen,
        )
    }

    pub fn download_channel_art(
        &self,
        id: &EntityId,
        urls: &ChannelArtUrls,
        skip_existing: bool,
    ) -> ChannelArtOutcome {
        self.download_channel_art_with_fallback(id, urls, skip_existing, None)
    }

    /// Like [`Self::download_channel_art`], with one image preferred over the
    /// bundled defaults for both slots.
    pub fn download_channel_art_with_fallback(
        &self,
        id: &EntityId,
        urls: &ChannelArtUrls,
        skip_existing: bool,
        fallback_override: Option<&Path>,
    ) -> ChannelArtOutcome {
        let icon_request = FetchRequest::new(ArtworkKind::ChannelIcon, urls.icon.as_deref())
            .with_fallback_override(fallback_override);
        let icon = self.fetch_and_persist(
            id,
            self.channel_icon_path(id),
            icon_request,
            skip_existing,
            |image| image,
        );
        if let Err(error) = &icon {
            warn!("ArtworkStore: {}: channel icon failed: {}", id, error);
        }

        let banner_request = FetchRequest::new(ArtworkKind::ChannelBanner, urls.banner.as_deref())
            .with_fallback_override(fallback_override);
        let banner = self.fetch_and_persist(
            id,
            self.channel_banner_path(id),
            banner_request,
            skip_existing,
            |image| image,
        );
        if let Err(error) = &banner {
            warn!("ArtworkStore: {}: channel banner failed: {}", id, error);
        }

        ChannelArtOutcome { icon, banner }
    }

    pub fn download_playlist_thumbnail(
        &self,
        id: &EntityId,
        url: Option<&str>,
        skip_existing: bool,
    ) -> Result<ArtworkOutcome> {
        self.fetch_and_persist(
            id,
            self.playlist_thumb_path(id),
            FetchRequest::new(ArtworkKind::Playlist, url),
            skip_existing,
            |image| image,
        )
    }

    pub fn delete_video_thumbnail(&self, id: &EntityId) -> Result<bool> {
        info!("ArtworkStore: {}: delete video thumbnail", id);
        remove_if_present(&self.cache_path(id, ArtworkKind::Video))
    }

    /// Removes icon and banner; returns how many files existed.
    pub fn delete_channel_art(&self, id: &EntityId) -> Result<usize> {
        info!("ArtworkStore: {}: delete channel artwork", id);
        let (icon_path, banner_path) = self.channel_art_paths(id);
        let icon = remove_if_present(&icon_path)?;
        let banner = remove_if_present(&banner_path)?;
        Ok(usize::from(icon) + usize::from(banner))
    }

    pub fn delete_playlist_thumbnail(&self, id: &EntityId) -> Result<bool> {
        info!("ArtworkStore: {}: delete playlist thumbnail", id);
        remove_if_present(&self.playlist_thumb_path(id))
    }

    /// Low-resolution blurred placeholder of the cached video thumbnail, as a
    /// `data:image/jpg;base64,...` URI.
    pub fn blurred_preview(&self, id: &EntityId) -> Result<String> {
        let path = self.cache_path(id, ArtworkKind::Video);
        if !path.is_file() {
            return Err(ArtworkError::NotFound(path));
        }
        let image = decode_image_from_path_with_fallback(&path)?;
        let jpeg = blurred_jpeg_preview(&image, PREVIEW_SHRINK_FACTOR)?;
        Ok(format!("{PREVIEW_DATA_URI_PREFIX}{}", BASE64.encode(jpeg)))
    }
}

fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(ArtworkError::io(path, error)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::image_fetcher::tests::{test_config, ScriptedTransport};
    use crate::image_fetcher::{HttpResponse, TransportError};
    use image::{GenericImageView, Rgb, RgbImage};
    use std::sync::Arc;

    pub(crate) fn store(root: &Path) -> (ArtworkStore, Arc<ScriptedTransport>) {
        let config = test_config(root);
        let transport = Arc::new(ScriptedTransport::default());
        let fetcher = ImageFetcher::with_transport(&config, transport.clone());
        (ArtworkStore::new(&config, fetcher), transport)
    }

    pub(crate) fn id(value: &str) -> EntityId {
        EntityId::new(value).expect("valid id")
    }

    #[test]
    fn test_entity_id_rejects_empty_and_path_like_values() {
        for value in ["", ".", "..", "a/b", "a\\b"] {
            assert!(matches!(
                EntityId::new(value),
                Err(ArtworkError::InvalidEntityId(_))
            ));
        }
        assert_eq!(id("dQw4w9WgXcQ").as_str(), "dQw4w9WgXcQ");
        assert_eq!(id("-x_").shard(), "-");
    }

    #[test]
    fn test_video_thumb_path_shards_by_lowercased_first_char() {
        assert_eq!(
            ArtworkStore::video_thumb_relative_path(&id("Xyz_123")),
            PathBuf::from("videos/x/Xyz_123.jpg")
        );
        assert_eq!(
            ArtworkStore::video_thumb_relative_path(&id("abc")),
            PathBuf::from("videos/a/abc.jpg")
        );
    }

    #[test]
    fn test_video_thumb_path_side_effects_are_opt_in() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, _) = store(temp_dir.path());
        let video = id("Qabc");

        let relative = store
            .video_thumb_path(&video, CachePathOptions::default())
            .unwrap();
        assert_eq!(relative, PathBuf::from("videos/q/Qabc.jpg"));
        assert!(!store.cache_dir().join("videos").exists());

        let absolute = store
            .video_thumb_path(
                &video,
                CachePathOptions {
                    absolute: true,
                    create_folder: true,
                },
            )
            .unwrap();
        assert_eq!(absolute, store.cache_dir().join("videos/q/Qabc.jpg"));
        assert!(store.cache_dir().join("videos/q").is_dir());
        assert!(!absolute.exists());
    }

    #[test]
    fn test_cache_path_is_stable_for_every_kind() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, _) = store(temp_dir.path());
        let entity = id("UC123");
        let cache = store.cache_dir().to_path_buf();

        let expected = [
            (ArtworkKind::Video, cache.join("videos/u/UC123.jpg")),
            (ArtworkKind::ChannelIcon, cache.join("channels/UC123_thumb.jpg")),
            (ArtworkKind::ChannelBanner, cache.join("channels/UC123_banner.jpg")),
            (ArtworkKind::Playlist, cache.join("playlists/UC123.jpg")),
        ];
        for (kind, path) in expected {
            assert_eq!(store.cache_path(&entity, kind), path);
            assert_eq!(store.cache_path(&entity, kind), store.cache_path(&entity, kind));
        }
    }

    #[test]
    fn test_download_video_thumbnail_crops_tall_image_to_widescreen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        transport.push_image(1000, 2000);

        let outcome = store
            .download_video_thumbnail(&id("tall"), Some("http://img/tall.jpg"), false)
            .unwrap();
        let ArtworkOutcome::Written { path, source } = outcome else {
            panic!("expected written thumbnail");
        };
        assert_eq!(source, ArtworkSource::Remote);
        let (width, height) = image::open(&path).unwrap().dimensions();
        assert_eq!(width, 1000);
        let ratio = width as f64 / height as f64;
        assert!((ratio - 16.0 / 9.0).abs() < 0.01, "ratio was {ratio}");
    }

    #[test]
    fn test_download_video_thumbnail_keeps_widescreen_dimensions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        transport.push_image(1600, 900);

        let outcome = store
            .download_video_thumbnail(&id("wide"), Some("http://img/wide.jpg"), false)
            .unwrap();
        let saved = image::open(outcome.path()).unwrap();
        assert_eq!(saved.dimensions(), (1600, 900));
        assert_eq!(outcome.path(), store.cache_dir().join("videos/w/wide.jpg"));
    }

    #[test]
    fn test_download_video_thumbnail_skip_existing_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        transport.push_image(320, 180);
        let video = id("again");

        let first = store
            .download_video_thumbnail(&video, Some("http://img/a.jpg"), true)
            .unwrap();
        let bytes_before = fs::read(first.path()).unwrap();
        assert_eq!(transport.calls(), 1);

        let second = store
            .download_video_thumbnail(&video, Some("http://img/a.jpg"), true)
            .unwrap();
        assert!(matches!(second, ArtworkOutcome::Skipped { .. }));
        assert_eq!(transport.calls(), 1);
        assert_eq!(fs::read(second.path()).unwrap(), bytes_before);
    }

    #[test]
    fn test_download_without_skip_existing_refreshes_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        transport.push_image(320, 180);
        transport.push_image(640, 360);
        let video = id("refresh");

        store
            .download_video_thumbnail(&video, Some("http://img/1.jpg"), false)
            .unwrap();
        let outcome = store
            .download_video_thumbnail(&video, Some("http://img/2.jpg"), false)
            .unwrap();
        assert_eq!(transport.calls(), 2);
        assert_eq!(image::open(outcome.path()).unwrap().dimensions(), (640, 360));
    }

    #[test]
    fn test_unavailable_fetch_writes_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());

        let outcome = store
            .download_playlist_thumbnail(&id("PLdown"), Some("http://img/down.jpg"), true)
            .unwrap();
        assert!(matches!(outcome, ArtworkOutcome::Unavailable { .. }));
        assert!(!outcome.path().exists());
        assert_eq!(transport.calls(), 3);
    }

    #[test]
    fn test_missing_url_writes_fallback_without_network() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());

        let outcome = store
            .download_video_thumbnail(&id("nourl"), None, false)
            .unwrap();
        let ArtworkOutcome::Written { path, source } = outcome else {
            panic!("expected fallback to be written");
        };
        assert_eq!(source, ArtworkSource::Fallback);
        assert_eq!(image::open(path).unwrap().dimensions(), (1280, 720));
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_channel_art_slots_fail_independently() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        for _ in 0..3 {
            transport.push(Err(TransportError("dns failure".to_string())));
        }
        transport.push_image(2560, 424);
        let channel = id("UCsplit");

        let outcome = store.download_channel_art(
            &channel,
            &ChannelArtUrls {
                icon: Some("http://img/icon.jpg".to_string()),
                banner: Some("http://img/banner.jpg".to_string()),
            },
            false,
        );

        assert!(matches!(outcome.icon, Ok(ArtworkOutcome::Unavailable { .. })));
        assert!(!store.channel_icon_path(&channel).exists());
        let banner = outcome.banner.expect("banner should be written");
        assert_eq!(banner.path(), store.channel_banner_path(&channel));
        assert_eq!(image::open(banner.path()).unwrap().dimensions(), (2560, 424));
        assert_eq!(
            transport.urls().last().map(String::as_str),
            Some("http://img/banner.jpg")
        );
    }

    #[test]
    fn test_channel_art_uses_kind_specific_fallbacks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        transport.push(Ok(HttpResponse {
            status: 404,
            body: Vec::new(),
        }));
        let channel = id("UCgone");

        let outcome = store.download_channel_art(
            &channel,
            &ChannelArtUrls {
                icon: Some("http://img/icon.jpg".to_string()),
                banner: None,
            },
            false,
        );
        let icon = outcome.icon.unwrap();
        let banner = outcome.banner.unwrap();
        assert_eq!(image::open(icon.path()).unwrap().dimensions(), (900, 900));
        assert_eq!(image::open(banner.path()).unwrap().dimensions(), (2560, 424));
    }

    #[test]
    fn test_channel_art_fallback_override_applies_to_both_slots() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, _) = store(temp_dir.path());
        let override_path = temp_dir.path().join("shared.png");
        RgbImage::from_pixel(50, 40, Rgb([5, 5, 5]))
            .save(&override_path)
            .unwrap();

        let outcome = store.download_channel_art_with_fallback(
            &id("UCshared"),
            &ChannelArtUrls::default(),
            false,
            Some(&override_path),
        );
        for slot in [outcome.icon.unwrap(), outcome.banner.unwrap()] {
            assert_eq!(image::open(slot.path()).unwrap().dimensions(), (50, 40));
        }
    }

    #[test]
    fn test_playlist_thumbnail_is_not_cropped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        transport.push_image(500, 500);

        let outcome = store
            .download_playlist_thumbnail(&id("PLsquare"), Some("http://img/pl.jpg"), false)
            .unwrap();
        assert_eq!(outcome.path(), store.cache_dir().join("playlists/PLsquare.jpg"));
        assert_eq!(image::open(outcome.path()).unwrap().dimensions(), (500, 500));
    }

    #[test]
    fn test_delete_removes_present_files_and_ignores_absent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, _) = store(temp_dir.path());
        let entity = id("Gone1");

        assert!(!store.delete_video_thumbnail(&entity).unwrap());
        assert_eq!(store.delete_channel_art(&entity).unwrap(), 0);
        assert!(!store.delete_playlist_thumbnail(&entity).unwrap());

        store.download_video_thumbnail(&entity, None, false).unwrap();
        store.download_channel_art(&entity, &ChannelArtUrls::default(), false);
        store.download_playlist_thumbnail(&entity, None, false).unwrap();

        assert!(store.delete_video_thumbnail(&entity).unwrap());
        assert_eq!(store.delete_channel_art(&entity).unwrap(), 2);
        assert!(store.delete_playlist_thumbnail(&entity).unwrap());
        for kind in ArtworkKind::ALL {
            assert!(!store.cache_path(&entity, kind).exists());
        }
    }

    #[test]
    fn test_blurred_preview_requires_cached_thumbnail() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, _) = store(temp_dir.path());
        assert!(matches!(
            store.blurred_preview(&id("missing")),
            Err(ArtworkError::NotFound(_))
        ));
    }

    #[test]
    fn test_blurred_preview_returns_small_jpeg_data_uri() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (store, transport) = store(temp_dir.path());
        transport.push_image(1920, 1080);
        let video = id("blurme");
        store
            .download_video_thumbnail(&video, Some("http://img/full.jpg"), false)
            .unwrap();

        let data_uri = store.blurred_preview(&video).unwrap();
        let payload = data_uri
            .strip_prefix("data:image/jpg;base64,")
            .expect("data uri prefix");
        let jpeg = BASE64.decode(payload).expect("valid base64");
        assert_eq!(&jpeg[..2], &[0xff, 0xd8]);
        let decoded = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg)
            .expect("valid jpeg");
        let (width, height) = decoded.dimensions();
        assert!(width < 1920 && height < 1080);
        assert_eq!((width, height), (96, 54));
    }
}
