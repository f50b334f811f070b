//! JPEG re-encoding of the composited preview.
//!
//! Output is always baseline JPEG at a fixed quality. JPEG has no alpha
//! channel, so translucent source pixels are flattened onto black first.

use super::WatermarkError;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageEncoder as _, RgbaImage};
use std::io::Cursor;

/// Content-Type of every watermarked output.
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// Encode an RGBA image as JPEG at `quality` (1-100).
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, WatermarkError> {
    if !(1..=100).contains(&quality) {
        return Err(WatermarkError::Configuration(format!(
            "quality must be 1-100, got {}",
            quality
        )));
    }

    let (width, height) = image.dimensions();
    let rgb_data = flatten_to_rgb(image.as_raw());

    let mut output = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut output, quality)
        .write_image(&rgb_data, width, height, ColorType::Rgb8)
        .map_err(|e| WatermarkError::Encode(format!("jpeg: {}", e)))?;

    Ok(output.into_inner())
}

/// Drop alpha by compositing each pixel onto an opaque black backdrop.
fn flatten_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);

    for chunk in rgba.chunks_exact(4) {
        let alpha = chunk[3] as u32;
        if alpha == 255 {
            rgb.extend_from_slice(&chunk[..3]);
        } else {
            for &channel in &chunk[..3] {
                rgb.push(((channel as u32 * alpha + 127) / 255) as u8);
            }
        }
    }

    rgb
}
