//! Default artwork substituted when a remote image is unavailable.

use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use log::warn;

use crate::image_pipeline::decode_image_from_path_with_fallback;

const DEFAULT_VIDEO_THUMB: &str = "static/img/default-video-thumb.jpg";
const DEFAULT_CHANNEL_ICON: &str = "static/img/default-channel-icon.jpg";
const DEFAULT_CHANNEL_BANNER: &str = "static/img/default-channel-banner.jpg";
const PLACEHOLDER_COLOR: Rgb<u8> = Rgb([38, 40, 46]);

/// Artwork slot kind, determines cache path shape and fallback image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtworkKind {
    Video,
    ChannelIcon,
    ChannelBanner,
    Playlist,
}

impl ArtworkKind {
    pub const ALL: [ArtworkKind; 4] = [
        ArtworkKind::Video,
        ArtworkKind::ChannelIcon,
        ArtworkKind::ChannelBanner,
        ArtworkKind::Playlist,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ArtworkKind::Video => "video",
            ArtworkKind::ChannelIcon => "icon",
            ArtworkKind::ChannelBanner => "banner",
            ArtworkKind::Playlist => "playlist",
        }
    }

    /// Bundled default, relative to the application root.
    pub fn default_image(self) -> &'static str {
        match self {
            ArtworkKind::Video | ArtworkKind::Playlist => DEFAULT_VIDEO_THUMB,
            ArtworkKind::ChannelIcon => DEFAULT_CHANNEL_ICON,
            ArtworkKind::ChannelBanner => DEFAULT_CHANNEL_BANNER,
        }
    }

    fn placeholder_dimensions(self) -> (u32, u32) {
        match self {
            ArtworkKind::Video | ArtworkKind::Playlist => (1280, 720),
            ArtworkKind::ChannelIcon => (900, 900),
            ArtworkKind::ChannelBanner => (2560, 424),
        }
    }
}

impl fmt::Display for ArtworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    app_root: PathBuf,
}

impl FallbackPolicy {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
        }
    }

    pub fn default_image_path(&self, kind: ArtworkKind) -> PathBuf {
        self.app_root.join(kind.default_image())
    }

    /// Resolves the fallback image for `kind`. An explicit override wins over
    /// the bundled default; an unreadable image degrades to a flat placeholder
    /// so resolution itself never fails.
    pub fn resolve(&self, kind: ArtworkKind, override_path: Option<&Path>) -> DynamicImage {
        if let Some(path) = override_path {
            match decode_image_from_path_with_fallback(path) {
                Ok(image) => return image,
                Err(error) => warn!(
                    "Fallback override {} unreadable ({}), using {} default",
                    path.display(),
                    error,
                    kind
                ),
            }
        }

        let default_path = self.default_image_path(kind);
        match decode_image_from_path_with_fallback(&default_path) {
            Ok(image) => image,
            Err(error) => {
                warn!(
                    "Bundled {} fallback {} unreadable ({}), using placeholder",
                    kind,
                    default_path.display(),
                    error
                );
                placeholder(kind)
            }
        }
    }
}

fn placeholder(kind: ArtworkKind) -> DynamicImage {
    let (width, height) = kind.placeholder_dimensions();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, PLACEHOLDER_COLOR))
}
