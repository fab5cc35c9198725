//! Embedded cover-art writer backed by `lofty`.

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::read_from_path;
use lofty::tag::Tag;

use crate::error::{ArtworkError, Result};

fn tag_error(path: &Path, source: lofty::error::LoftyError) -> ArtworkError {
    ArtworkError::Tag {
        path: path.to_path_buf(),
        source,
    }
}

/// Replaces every embedded picture in `path` with one JPEG front cover.
pub fn write_front_cover(path: &Path, jpeg_bytes: Vec<u8>) -> Result<()> {
    if !path.exists() {
        return Err(ArtworkError::NotFound(path.to_path_buf()));
    }
    let mut tagged_file = read_from_path(path).map_err(|error| tag_error(path, error))?;
    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }

    let Some(tag) = tagged_file.tag_mut(tag_type) else {
        return Err(ArtworkError::NoWritableTag(path.to_path_buf()));
    };

    while !tag.pictures().is_empty() {
        tag.remove_picture(0);
    }
    tag.push_picture(Picture::new_unchecked(
        PictureType::CoverFront,
        Some(MimeType::Jpeg),
        None,
        jpeg_bytes,
    ));

    tagged_file
        .save_to_path(path, WriteOptions::default())
        .map_err(|error| tag_error(path, error))
}
