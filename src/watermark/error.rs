//! Watermark error types.
//!
//! Every variant is terminal for a single call: the transform is
//! deterministic, so retrying with the same input fails the same way.

use thiserror::Error;

/// Errors that can occur while producing a watermarked preview.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatermarkError {
    /// Source bytes are empty, corrupt, or not a supported raster format.
    #[error("Failed to decode source image: {0}")]
    Decode(String),

    /// Overlay rasterization, compositing or re-encoding failed.
    #[error("Failed to encode watermarked image: {0}")]
    Encode(String),

    /// A watermark parameter is out of range.
    #[error("Watermark configuration error: {0}")]
    Configuration(String),

    /// Source image could not be downloaded.
    #[error("Failed to fetch source image: {0}")]
    Fetch(String),
}

impl WatermarkError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Encode(_) => "encode",
            Self::Configuration(_) => "configuration",
            Self::Fetch(_) => "fetch",
        }
    }
}
