//! Per-entity artwork targets dispatched through a closed enum.

use std::path::PathBuf;

use crate::artwork_store::{ArtworkOutcome, ArtworkStore, ChannelArtUrls, EntityId};
use crate::error::Result;
use crate::fallback::ArtworkKind;

/// What every artwork-owning entity can do against the store.
pub trait ArtworkTarget {
    fn cache_paths(&self, store: &ArtworkStore) -> Vec<PathBuf>;

    /// One result per artwork slot, slots are attempted independently.
    fn download(&self, store: &ArtworkStore, skip_existing: bool) -> Vec<Result<ArtworkOutcome>>;

    /// Number of cache files that existed and were removed.
    fn delete(&self, store: &ArtworkStore) -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoArtwork {
    pub id: EntityId,
    pub thumb_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelArtwork {
    pub id: EntityId,
    pub urls: ChannelArtUrls,
    pub fallback_override: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistArtwork {
    pub id: EntityId,
    pub thumb_url: Option<String>,
}

impl ArtworkTarget for VideoArtwork {
    fn cache_paths(&self, store: &ArtworkStore) -> Vec<PathBuf> {
        vec![store.cache_path(&self.id, ArtworkKind::Video)]
    }

    fn download(&self, store: &ArtworkStore, skip_existing: bool) -> Vec<Result<ArtworkOutcome>> {
        vec![store.download_video_thumbnail(&self.id, self.thumb_url.as_deref(), skip_existing)]
    }

    fn delete(&self, store: &ArtworkStore) -> Result<usize> {
        store.delete_video_thumbnail(&self.id).map(usize::from)
    }
}

impl ArtworkTarget for ChannelArtwork {
    fn cache_paths(&self, store: &ArtworkStore) -> Vec<PathBuf> {
        let (icon, banner) = store.channel_art_paths(&self.id);
        vec![icon, banner]
    }

    fn download(&self, store: &ArtworkStore, skip_existing: bool) -> Vec<Result<ArtworkOutcome>> {
        let outcome = store.download_channel_art_with_fallback(
            &self.id,
            &self.urls,
            skip_existing,
            self.fallback_override.as_deref(),
        );
        vec![outcome.icon, outcome.banner]
    }

    fn delete(&self, store: &ArtworkStore) -> Result<usize> {
        store.delete_channel_art(&self.id)
    }
}

impl ArtworkTarget for PlaylistArtwork {
    fn cache_paths(&self, store: &ArtworkStore) -> Vec<PathBuf> {
        vec![store.cache_path(&self.id, ArtworkKind::Playlist)]
    }

    fn download(&self, store: &ArtworkStore, skip_existing: bool) -> Vec<Result<ArtworkOutcome>> {
        vec![store.download_playlist_thumbnail(&self.id, self.thumb_url.as_deref(), skip_existing)]
    }

    fn delete(&self, store: &ArtworkStore) -> Result<usize> {
        store.delete_playlist_thumbnail(&self.id).map(usize::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtworkItem {
    Video(VideoArtwork),
    Channel(ChannelArtwork),
    Playlist(PlaylistArtwork),
}

impl ArtworkItem {
    pub fn id(&self) -> &EntityId {
        match self {
            ArtworkItem::Video(video) => &video.id,
            ArtworkItem::Channel(channel) => &channel.id,
            ArtworkItem::Playlist(playlist) => &playlist.id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtworkItem::Video(_) => "video",
            ArtworkItem::Channel(_) => "channel",
            ArtworkItem::Playlist(_) => "playlist",
        }
    }

    fn target(&self) -> &dyn ArtworkTarget {
        match self {
            ArtworkItem::Video(video) => video,
            ArtworkItem::Channel(channel) => channel,
            ArtworkItem::Playlist(playlist) => playlist,
        }
    }
}

impl ArtworkTarget for ArtworkItem {
    fn cache_paths(&self, store: &ArtworkStore) -> Vec<PathBuf> {
        self.target().cache_paths(store)
    }

    fn download(&self, store: &ArtworkStore, skip_existing: bool) -> Vec<Result<ArtworkOutcome>> {
        log::info!("{}: download {} thumbnail", self.id(), self.label());
        self.target().download(store, skip_existing)
    }

    fn delete(&self, store: &ArtworkStore) -> Result<usize> {
        log::info!("{}: delete {} thumbnail", self.id(), self.label());
        self.target().delete(store)
    }
}
