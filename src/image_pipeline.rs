//! Shared image decoding, normalization, and JPEG persistence helpers.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageFormat};
use zune_core::{colorspace::ColorSpace, options::DecoderOptions};
use zune_jpeg::JpegDecoder;

use crate::error::{ArtworkError, Result};

const PREVIEW_BLUR_SIGMA: f32 = 1.0;

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if !parent.exists() {
        fs::create_dir_all(parent).map_err(|error| ArtworkError::io(parent, error))?;
    }
    Ok(())
}

fn looks_like_jpeg(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0xff && bytes[1] == 0xd8
}

fn decode_jpeg_non_strict(bytes: &[u8]) -> Option<DynamicImage> {
    if !looks_like_jpeg(bytes) {
        return None;
    }

    let options = DecoderOptions::new_cmd()
        .set_strict_mode(false)
        .jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(bytes, options);
    let pixels = decoder.decode().ok()?;
    let (width, height) = decoder.dimensions()?;
    let image = image::RgbImage::from_raw(width as u32, height as u32, pixels)?;
    Some(DynamicImage::ImageRgb8(image))
}

pub fn decode_image_from_memory_with_fallback(bytes: &[u8]) -> Option<DynamicImage> {
    // Truncated thumbnails from CDNs are common; the primary decoder rejects
    // them, the non-strict JPEG path usually recovers the visible part.
    image::load_from_memory(bytes)
        .ok()
        .or_else(|| decode_jpeg_non_strict(bytes))
}

pub fn decode_image_from_path_with_fallback(path: &Path) -> Result<DynamicImage> {
    match image::open(path) {
        Ok(decoded) => Ok(decoded),
        Err(primary_error) => {
            let bytes = fs::read(path).map_err(|error| ArtworkError::io(path, error))?;
            decode_jpeg_non_strict(&bytes).ok_or(ArtworkError::Image(primary_error))
        }
    }
}

pub fn is_widescreen(width: u32, height: u32) -> bool {
    u64::from(width) * 9 == u64::from(height) * 16
}

/// Center-crops to 16:9. Tall images lose rows top and bottom, wide images
/// lose columns left and right; 16:9 input is returned untouched.
pub fn crop_to_widescreen(image: DynamicImage) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || is_widescreen(width, height) {
        return image;
    }

    let target_height = (u64::from(width) * 9 / 16).max(1) as u32;
    if target_height <= height {
        let offset = (height - target_height) / 2;
        return image.crop_imm(0, offset, width, target_height);
    }

    let target_width = (u64::from(height) * 16 / 9).max(1) as u32;
    let offset = (width - target_width) / 2;
    image.crop_imm(offset, 0, target_width, height)
}

pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut cursor, ImageFormat::Jpeg)?;
    Ok(cursor.into_inner())
}

/// Writes `image` as RGB JPEG through a sibling temp file so readers never
/// observe a partially written thumbnail.
pub fn save_jpeg_atomic(image: &DynamicImage, target_path: &Path) -> Result<()> {
    ensure_parent_dir(target_path)?;
    let temp_path = target_path.with_extension("jpg.tmp");
    if temp_path.exists() {
        let _ = fs::remove_file(&temp_path);
    }
    DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(&temp_path, ImageFormat::Jpeg)?;
    fs::rename(&temp_path, target_path).map_err(|error| ArtworkError::io(target_path, error))
}

pub fn blurred_jpeg_preview(image: &DynamicImage, shrink_factor: u32) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    let factor = shrink_factor.max(1);
    let reduced = image.thumbnail((width / factor).max(1), (height / factor).max(1));
    encode_jpeg(&reduced.blur(PREVIEW_BLUR_SIGMA))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{codecs::jpeg::JpegEncoder, ImageBuffer, Rgb, RgbImage, Rgba};

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 80, 120])))
    }

    #[test]
    fn test_is_widescreen_uses_exact_ratio() {
        assert!(is_widescreen(1600, 900));
        assert!(is_widescreen(1920, 1080));
        assert!(!is_widescreen(1000, 2000));
        assert!(!is_widescreen(1601, 900));
    }

    #[test]
    fn test_crop_to_widescreen_trims_tall_image_symmetrically() {
        let cropped = crop_to_widescreen(solid(1000, 2000));
        let (width, height) = cropped.dimensions();
        assert_eq!(width, 1000);
        assert_eq!(height, 562);
        let ratio = width as f64 / height as f64;
        assert!((ratio - 16.0 / 9.0).abs() < 0.01, "ratio was {ratio}");
    }

    #[test]
    fn test_crop_to_widescreen_keeps_center_rows() {
        let source = DynamicImage::ImageRgba8(ImageBuffer::from_fn(160, 180, |_, y| {
            if (45..135).contains(&y) {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        }));
        let cropped = crop_to_widescreen(source);
        assert_eq!(cropped.dimensions(), (160, 90));
        assert_eq!(cropped.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(cropped.get_pixel(159, 89), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_crop_to_widescreen_leaves_widescreen_untouched() {
        let cropped = crop_to_widescreen(solid(1600, 900));
        assert_eq!(cropped.dimensions(), (1600, 900));
    }

    #[test]
    fn test_crop_to_widescreen_trims_wide_image_horizontally() {
        let cropped = crop_to_widescreen(solid(2000, 900));
        assert_eq!(cropped.dimensions(), (1600, 900));
    }

    #[test]
    fn test_decode_image_from_memory_with_fallback_decodes_truncated_jpeg() {
        let rgb = RgbImage::from_pixel(12, 9, Rgb([90, 140, 210]));
        let mut encoded = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut encoded, 85);
            encoder
                .encode_image(&DynamicImage::ImageRgb8(rgb))
                .expect("jpeg encoding should succeed");
        }
        encoded.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

        let decoded = decode_image_from_memory_with_fallback(&encoded)
            .expect("fallback decoder should decode jpeg bytes");
        assert_eq!(decoded.dimensions(), (12, 9));
    }

    #[test]
    fn test_decode_image_from_memory_with_fallback_rejects_non_image_bytes() {
        assert!(decode_image_from_memory_with_fallback(b"<html>404</html>").is_none());
    }

    #[test]
    fn test_save_jpeg_atomic_writes_rgb_jpeg_and_removes_temp() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let target = temp_dir.path().join("a").join("b.jpg");
        let rgba = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(8, 8, Rgba([1, 2, 3, 128])));

        save_jpeg_atomic(&rgba, &target).expect("save should succeed");

        let bytes = fs::read(&target).expect("target should exist");
        assert!(looks_like_jpeg(&bytes));
        assert!(!target.with_extension("jpg.tmp").exists());
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn test_blurred_jpeg_preview_shrinks_by_factor() {
        let bytes = blurred_jpeg_preview(&solid(1920, 1080), 20).expect("preview should encode");
        assert!(looks_like_jpeg(&bytes));
        let decoded = image::load_from_memory(&bytes).expect("preview should decode");
        assert_eq!(decoded.dimensions(), (96, 54));
    }

    #[test]
    fn test_blurred_jpeg_preview_never_produces_empty_image() {
        let bytes = blurred_jpeg_preview(&solid(10, 5), 20).expect("preview should encode");
        let decoded = image::load_from_memory(&bytes).expect("preview should decode");
        assert_eq!(decoded.dimensions(), (1, 1));
    }
}
