//! Error type shared by the artwork library.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArtworkError>;

#[derive(Debug, Error)]
pub enum ArtworkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to update tags of {path}: {source}")]
    Tag {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },

    #[error("no writable tag in {0}")]
    NoWritableTag(PathBuf),

    #[error("index query failed: {0}")]
    Index(#[from] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("{collection} has no entity {id:?}")]
    UnknownEntity { collection: String, id: String },

    #[error("invalid entity id {0:?}")]
    InvalidEntityId(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("job queue error: {0}")]
    Queue(String),
}

impl ArtworkError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound(path);
        }
        Self::Io { path, source }
    }
}
