use crate::crop::entropy_crop;
use crate::error::{ProcessingError, ProcessingResult};
use image::imageops::FilterType;
use image::GenericImageView;

/// Thumbnails are square WebP images of this edge length.
pub const THUMBNAIL_SIZE: u32 = 320;

pub const WEBP_QUALITY: f32 = 78.0;

/// Render a square WebP thumbnail from encoded image bytes.
///
/// The source is scaled so its shorter side covers the target square
/// (upscaling small images), cropped to the most detailed window, and
/// encoded as lossy WebP.
pub fn render_thumbnail(data: &[u8]) -> ProcessingResult<Vec<u8>> {
    let img = image::load_from_memory(data)
        .map_err(|e| ProcessingError::DecodeFailed(e.to_string()))?;

    let (width, height) = img.dimensions();
    let (cover_width, cover_height) = cover_dimensions(width, height, THUMBNAIL_SIZE);

    let scaled = img.resize_exact(cover_width, cover_height, FilterType::Lanczos3);
    let cropped = entropy_crop(&scaled, THUMBNAIL_SIZE, THUMBNAIL_SIZE)?;

    let rgba = cropped.to_rgba8();
    let encoder = webp::Encoder::from_rgba(&rgba, THUMBNAIL_SIZE, THUMBNAIL_SIZE);
    let webp_data = encoder.encode(WEBP_QUALITY);

    Ok(webp_data.to_vec())
}

/// Scale dimensions so the shorter side equals `target`, preserving aspect
/// ratio. Neither side ever ends up below `target`.
fn cover_dimensions(width: u32, height: u32, target: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (target, target);
    }

    if width <= height {
        let scaled = (height as u64 * target as u64 / width as u64).max(target as u64);
        (target, scaled as u32)
    } else {
        let scaled = (width as u64 * target as u64 / height as u64).max(target as u64);
        (scaled as u32, target)
    }
}
