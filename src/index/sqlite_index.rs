use std::path::Path;

use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    ArtworkIndex, ChannelRecord, IndexCollection, IndexRecord, MediaEntry, MediaManifest,
    PlaylistRecord, VideoRecord,
};
use crate::error::Result;

/// SQLite-backed index of videos, channels, and playlists.
pub struct SqliteIndex {
    conn: Connection,
}

impl SqliteIndex {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|error| crate::error::ArtworkError::io(parent, error))?;
            }
        }
        let index = Self {
            conn: Connection::open(path)?,
        };
        index.initialize_schema()?;
        Ok(index)
    }

    pub fn open_in_memory() -> Result<Self> {
        let index = Self {
            conn: Connection::open_in_memory()?,
        };
        index.initialize_schema()?;
        Ok(index)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS videos (
                youtube_id TEXT PRIMARY KEY,
                vid_thumb_url TEXT,
                media_url TEXT,
                active INTEGER NOT NULL DEFAULT 1
            );
            CREATE TABLE IF NOT EXISTS channels (
                channel_id TEXT PRIMARY KEY,
                channel_thumb_url TEXT,
                channel_banner_url TEXT,
                active INTEGER NOT NULL DEFAULT 1
            );
            CREATE TABLE IF NOT EXISTS playlists (
                playlist_id TEXT PRIMARY KEY,
                playlist_thumbnail TEXT,
                active INTEGER NOT NULL DEFAULT 1
            );
            CREATE TABLE IF NOT EXISTS download_queue (
                youtube_id TEXT PRIMARY KEY,
                vid_thumb_url TEXT,
                media_url TEXT
            );",
        )?;
        Ok(())
    }

    pub fn upsert_video(
        &self,
        record: &VideoRecord,
        media_url: Option<&str>,
        active: bool,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO videos (youtube_id, vid_thumb_url, media_url, active)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(youtube_id) DO UPDATE SET
                vid_thumb_url = excluded.vid_thumb_url,
                media_url = excluded.media_url,
                active = excluded.active",
            params![record.youtube_id, record.vid_thumb_url, media_url, active],
        )?;
        Ok(())
    }

    pub fn upsert_channel(&self, record: &ChannelRecord, active: bool) -> Result<()> {
        self.conn.execute(
            "INSERT INTO channels (channel_id, channel_thumb_url, channel_banner_url, active)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(channel_id) DO UPDATE SET
                channel_thumb_url = excluded.channel_thumb_url,
                channel_banner_url = excluded.channel_banner_url,
                active = excluded.active",
            params![
                record.channel_id,
                record.channel_thumb_url,
                record.channel_banner_url,
                active
            ],
        )?;
        Ok(())
    }

    pub fn upsert_playlist(&self, record: &PlaylistRecord, active: bool) -> Result<()> {
        self.conn.execute(
            "INSERT INTO playlists (playlist_id, playlist_thumbnail, active)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(playlist_id) DO UPDATE SET
                playlist_thumbnail = excluded.playlist_thumbnail,
                active = excluded.active",
            params![record.playlist_id, record.playlist_thumbnail, active],
        )?;
        Ok(())
    }

    /// Adds a queued download; `media_url` is set once the file exists.
    pub fn queue_pending(&self, record: &VideoRecord, media_url: Option<&str>) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO download_queue (youtube_id, vid_thumb_url, media_url)
             VALUES (?1, ?2, ?3)",
            params![record.youtube_id, record.vid_thumb_url, media_url],
        )?;
        Ok(())
    }

    fn page_query(collection: IndexCollection) -> &'static str {
        match collection {
            IndexCollection::Videos => {
                "SELECT youtube_id, vid_thumb_url FROM videos
                 WHERE active = 1 AND youtube_id > ?1
                 ORDER BY youtube_id ASC LIMIT ?2"
            }
            IndexCollection::Channels => {
                "SELECT channel_id, channel_thumb_url, channel_banner_url FROM channels
                 WHERE active = 1 AND channel_id > ?1
                 ORDER BY channel_id ASC LIMIT ?2"
            }
            IndexCollection::Playlists => {
                "SELECT playlist_id, playlist_thumbnail FROM playlists
                 WHERE active = 1 AND playlist_id > ?1
                 ORDER BY playlist_id ASC LIMIT ?2"
            }
        }
    }

    fn lookup_query(collection: IndexCollection) -> &'static str {
        match collection {
            IndexCollection::Videos => {
                "SELECT youtube_id, vid_thumb_url FROM videos WHERE youtube_id = ?1"
            }
            IndexCollection::Channels => {
                "SELECT channel_id, channel_thumb_url, channel_banner_url FROM channels
                 WHERE channel_id = ?1"
            }
            IndexCollection::Playlists => {
                "SELECT playlist_id, playlist_thumbnail FROM playlists WHERE playlist_id = ?1"
            }
        }
    }

    fn record_from_row(collection: IndexCollection, row: &Row<'_>) -> rusqlite::Result<IndexRecord> {
        Ok(match collection {
            IndexCollection::Videos => IndexRecord::Video(VideoRecord {
                youtube_id: row.get(0)?,
                vid_thumb_url: row.get(1)?,
            }),
            IndexCollection::Channels => IndexRecord::Channel(ChannelRecord {
                channel_id: row.get(0)?,
                channel_thumb_url: row.get(1)?,
                channel_banner_url: row.get(2)?,
            }),
            IndexCollection::Playlists => IndexRecord::Playlist(PlaylistRecord {
                playlist_id: row.get(0)?,
                playlist_thumbnail: row.get(1)?,
            }),
        })
    }
}

impl ArtworkIndex for SqliteIndex {
    fn scan_active(
        &self,
        collection: IndexCollection,
        page_size: usize,
        on_page: &mut dyn FnMut(Vec<IndexRecord>),
    ) -> Result<usize> {
        let page_size = page_size.max(1);
        let limit = i64::try_from(page_size).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(Self::page_query(collection))?;
        // Keyset cursor: ids are unique and sorted, so the last id of a page
        // is the exclusive lower bound of the next one.
        let mut cursor = String::new();
        let mut visited = 0usize;
        let mut page_number = 0usize;

        loop {
            let page = stmt
                .query_map(params![cursor, limit], |row| {
                    Self::record_from_row(collection, row)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = last.id().to_string();
            let page_len = page.len();
            visited += page_len;
            page_number += 1;
            debug!(
                "SqliteIndex: {} page {} with {} record(s)",
                collection, page_number, page_len
            );
            on_page(page);
            if page_len < page_size {
                break;
            }
        }

        Ok(visited)
    }

    fn get(&self, collection: IndexCollection, id: &str) -> Result<Option<IndexRecord>> {
        let record = self
            .conn
            .query_row(Self::lookup_query(collection), params![id], |row| {
                Self::record_from_row(collection, row)
            })
            .optional()?;
        Ok(record)
    }
}

impl MediaManifest for SqliteIndex {
    fn media_entries(&self) -> Result<Vec<MediaEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT youtube_id, media_url FROM download_queue WHERE media_url IS NOT NULL
             UNION
             SELECT youtube_id, media_url FROM videos WHERE media_url IS NOT NULL
             ORDER BY youtube_id ASC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(MediaEntry {
                    youtube_id: row.get(0)?,
                    media_url: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}
