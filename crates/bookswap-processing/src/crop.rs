use crate::error::{ProcessingError, ProcessingResult};
use image::{imageops, DynamicImage, GenericImageView};

const SALIENCY_SCALE: u32 = 4;
const EDGE_WEIGHT: f32 = 0.6;
const VARIANCE_WEIGHT: f32 = 0.4;

/// Saliency map at full resolution: per-pixel edge strength blended with
/// local variance, computed on a downscaled grayscale copy for speed.
fn saliency_map(img: &DynamicImage) -> Vec<f32> {
    let (width, height) = img.dimensions();
    let gray = img.to_luma8();

    let small_width = (width / SALIENCY_SCALE).max(1);
    let small_height = (height / SALIENCY_SCALE).max(1);
    let small_gray = imageops::resize(
        &gray,
        small_width,
        small_height,
        imageops::FilterType::Triangle,
    );

    let mut small = vec![0.0f32; (small_width * small_height) as usize];

    for y in 1..small_height.saturating_sub(1) {
        for x in 1..small_width.saturating_sub(1) {
            let right = small_gray.get_pixel(x + 1, y)[0] as i32;
            let left = small_gray.get_pixel(x - 1, y)[0] as i32;
            let bottom = small_gray.get_pixel(x, y + 1)[0] as i32;
            let top = small_gray.get_pixel(x, y - 1)[0] as i32;

            let gx = (right - left).abs();
            let gy = (bottom - top).abs();
            let edge_strength = ((gx * gx + gy * gy) as f32).sqrt();

            // Local variance over a 3x3 neighborhood approximates entropy.
            let mut sum = 0i32;
            let mut sum_sq = 0i32;
            let mut count = 0;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let px_x = (x as i32 + dx).clamp(0, small_width as i32 - 1) as u32;
                    let px_y = (y as i32 + dy).clamp(0, small_height as i32 - 1) as u32;
                    let px = small_gray.get_pixel(px_x, px_y)[0] as i32;
                    sum += px;
                    sum_sq += px * px;
                    count += 1;
                }
            }
            let mean = sum as f32 / count as f32;
            let variance = (sum_sq as f32 / count as f32) - (mean * mean);

            small[(y * small_width + x) as usize] =
                edge_strength * EDGE_WEIGHT + variance * VARIANCE_WEIGHT;
        }
    }

    // Map back to full resolution by nearest sample.
    let mut full = vec![0.0f32; (width * height) as usize];
    for y in 0..height {
        let sy = (y / SALIENCY_SCALE).min(small_height - 1);
        for x in 0..width {
            let sx = (x / SALIENCY_SCALE).min(small_width - 1);
            full[(y * width + x) as usize] = small[(sy * small_width + sx) as usize];
        }
    }

    full
}

/// Crop to the window with the highest total saliency.
///
/// An exhaustive scan over every candidate window position; callers are
/// expected to scale the image first so at most one axis has slack.
pub fn entropy_crop(
    img: &DynamicImage,
    target_width: u32,
    target_height: u32,
) -> ProcessingResult<DynamicImage> {
    let (width, height) = img.dimensions();

    if target_width > width || target_height > height {
        return Err(ProcessingError::CropOutOfBounds(
            target_width,
            target_height,
            width,
            height,
        ));
    }

    if target_width == width && target_height == height {
        return Ok(img.clone());
    }

    let saliency = saliency_map(img);

    let mut best_score = 0.0f32;
    let mut best_x = 0u32;
    let mut best_y = 0u32;

    for y in 0..=(height - target_height) {
        for x in 0..=(width - target_width) {
            let mut score = 0.0f32;
            for dy in 0..target_height {
                let row = ((y + dy) * width + x) as usize;
                for dx in 0..target_width as usize {
                    score += saliency[row + dx];
                }
            }
            if score > best_score {
                best_score = score;
                best_x = x;
                best_y = y;
            }
        }
    }

    let cropped = imageops::crop_imm(img, best_x, best_y, target_width, target_height);
    Ok(DynamicImage::ImageRgba8(cropped.to_image()))
}
