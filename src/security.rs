//! Upload Guard Module
//!
//! Protects the compositor from inputs that could:
//! - Exhaust memory before decoding (oversized uploads)
//! - Decompress to enormous canvases (image bombs)
//! - Reach a decoder that was never meant to see them (unsupported types)
//!
//! Returns appropriate HTTP status codes:
//! - 413 Payload Too Large - Upload exceeds the byte limit
//! - 415 Unsupported Media Type - Content-Type is not jpeg, png or webp
//! - 422 Unprocessable Entity - Header dimensions exceed the pixel limit

use crate::constants::{DEFAULT_MAX_PIXELS, DEFAULT_MAX_UPLOAD_BYTES};
use crate::watermark::SourceFormat;
use serde::{Deserialize, Serialize};

/// Upload validation error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Upload larger than the configured byte limit (413)
    PayloadTooLarge { size: usize, limit: usize },
    /// Missing or disallowed Content-Type (415)
    UnsupportedMediaType { content_type: Option<String> },
    /// Decoded canvas would exceed the pixel limit (422)
    TooManyPixels {
        width: u32,
        height: u32,
        pixels: u64,
        limit: u64,
    },
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::PayloadTooLarge { size, limit } => {
                write!(f, "Upload size {} exceeds limit {}", size, limit)
            }
            UploadError::UnsupportedMediaType { content_type } => match content_type {
                Some(content_type) => write!(
                    f,
                    "Unsupported media type: {}. Use image/jpeg, image/png or image/webp",
                    content_type
                ),
                None => write!(f, "Missing Content-Type header"),
            },
            UploadError::TooManyPixels {
                width,
                height,
                pixels,
                limit,
            } => write!(
                f,
                "Image {}x{} has {} pixels, limit is {}",
                width, height, pixels, limit
            ),
        }
    }
}

impl std::error::Error for UploadError {}

impl UploadError {
    pub fn status_code(&self) -> u16 {
        match self {
            UploadError::PayloadTooLarge { .. } => 413,
            UploadError::UnsupportedMediaType { .. } => 415,
            UploadError::TooManyPixels { .. } => 422,
        }
    }
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_max_pixels() -> u64 {
    DEFAULT_MAX_PIXELS
}

/// Limits applied to every upload before it reaches the compositor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadLimits {
    /// Maximum request body size in bytes (default: 5 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Maximum width * height read from the image header (default: 100 megapixels)
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            max_pixels: default_max_pixels(),
        }
    }
}

impl UploadLimits {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_upload_bytes == 0 {
            return Err("limits.max_upload_bytes must be greater than 0".to_string());
        }
        if self.max_pixels == 0 {
            return Err("limits.max_pixels must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Validate upload size (declared Content-Length or actual body length)
pub fn validate_upload_size(size: Option<usize>, limit: usize) -> Result<(), UploadError> {
    if let Some(size) = size {
        if size > limit {
            return Err(UploadError::PayloadTooLarge { size, limit });
        }
    }
    Ok(())
}

/// Validate Content-Type and return the format it announces
///
/// Parameters such as `; charset=binary` are ignored.
pub fn validate_content_type(content_type: Option<&str>) -> Result<SourceFormat, UploadError> {
    content_type
        .and_then(SourceFormat::from_mime)
        .ok_or_else(|| UploadError::UnsupportedMediaType {
            content_type: content_type.map(str::to_string),
        })
}

/// Validate header dimensions against the pixel limit
///
/// This should be called BEFORE decoding so a small file that decompresses
/// to a huge canvas is rejected without allocating it.
pub fn validate_dimensions(
    width: u32,
    height: u32,
    limits: &UploadLimits,
) -> Result<(), UploadError> {
    let pixels = width as u64 * height as u64;
    if pixels > limits.max_pixels {
        return Err(UploadError::TooManyPixels {
            width,
            height,
            pixels,
            limit: limits.max_pixels,
        });
    }
    Ok(())
}
