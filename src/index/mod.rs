//! Interfaces to the external media index and the media manifest.

mod sqlite_index;

pub use sqlite_index::SqliteIndex;

use std::fmt;

use crate::artwork_item::{ArtworkItem, ChannelArtwork, PlaylistArtwork, VideoArtwork};
use crate::artwork_store::{ChannelArtUrls, EntityId};
use crate::error::{ArtworkError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexCollection {
    Videos,
    Channels,
    Playlists,
}

impl IndexCollection {
    pub const ALL: [IndexCollection; 3] = [
        IndexCollection::Videos,
        IndexCollection::Channels,
        IndexCollection::Playlists,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IndexCollection::Videos => "videos",
            IndexCollection::Channels => "channels",
            IndexCollection::Playlists => "playlists",
        }
    }
}

impl fmt::Display for IndexCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub youtube_id: String,
    pub vid_thumb_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub channel_id: String,
    pub channel_thumb_url: Option<String>,
    pub channel_banner_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRecord {
    pub playlist_id: String,
    pub playlist_thumbnail: Option<String>,
}

/// The id and thumbnail fields of one indexed entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRecord {
    Video(VideoRecord),
    Channel(ChannelRecord),
    Playlist(PlaylistRecord),
}

impl IndexRecord {
    pub fn id(&self) -> &str {
        match self {
            IndexRecord::Video(video) => &video.youtube_id,
            IndexRecord::Channel(channel) => &channel.channel_id,
            IndexRecord::Playlist(playlist) => &playlist.playlist_id,
        }
    }

    pub fn into_artwork_item(self) -> Result<ArtworkItem> {
        Ok(match self {
            IndexRecord::Video(video) => ArtworkItem::Video(VideoArtwork {
                id: EntityId::new(video.youtube_id)?,
                thumb_url: video.vid_thumb_url,
            }),
            IndexRecord::Channel(channel) => ArtworkItem::Channel(ChannelArtwork {
                id: EntityId::new(channel.channel_id)?,
                urls: ChannelArtUrls {
                    icon: channel.channel_thumb_url,
                    banner: channel.channel_banner_url,
                },
                fallback_override: None,
            }),
            IndexRecord::Playlist(playlist) => ArtworkItem::Playlist(PlaylistArtwork {
                id: EntityId::new(playlist.playlist_id)?,
                thumb_url: playlist.playlist_thumbnail,
            }),
        })
    }
}

/// Paginated access to indexed entities.
pub trait ArtworkIndex {
    /// Walks every active entity of `collection` in ascending id order,
    /// handing `on_page` at most `page_size` records at a time. Returns the
    /// number of records visited.
    fn scan_active(
        &self,
        collection: IndexCollection,
        page_size: usize,
        on_page: &mut dyn FnMut(Vec<IndexRecord>),
    ) -> Result<usize>;

    fn get(&self, collection: IndexCollection, id: &str) -> Result<Option<IndexRecord>>;
}

/// Looks up one entity and turns it into a downloadable item.
pub fn lookup_item(
    index: &dyn ArtworkIndex,
    collection: IndexCollection,
    id: &str,
) -> Result<ArtworkItem> {
    index
        .get(collection, id)?
        .ok_or_else(|| ArtworkError::UnknownEntity {
            collection: collection.to_string(),
            id: id.to_string(),
        })?
        .into_artwork_item()
}

/// A media file known to the archive, path relative to the media root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    pub youtube_id: String,
    pub media_url: String,
}

/// Pending and indexed media files.
pub trait MediaManifest {
    fn media_entries(&self) -> Result<Vec<MediaEntry>>;
}
