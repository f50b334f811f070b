//! Source image probing and decoding.
//!
//! Two entry points over the same bytes:
//! - [`SourceImage::probe`] reads only the header (format and dimensions)
//! - [`SourceImage::decode`] additionally decodes every pixel for compositing

use super::WatermarkError;
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Raster formats accepted as watermark sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    WebP,
}

impl SourceFormat {
    /// Map a detected codec to a supported source format.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }

    /// Map a MIME type (parameters ignored) to a supported source format.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
        }
    }

    /// Short lowercase name recorded in [`ImageMetadata::format`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }
}

/// Descriptive facts about an uploaded image, persisted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: String,
    /// Byte length of the original upload, not of the watermarked output.
    pub size: usize,
}

/// Borrowed source bytes with their header facts.
#[derive(Debug, Clone, Copy)]
pub struct SourceImage<'a> {
    pub bytes: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub format: SourceFormat,
}

impl<'a> SourceImage<'a> {
    /// Read format and dimensions without decoding pixel data.
    pub fn probe(bytes: &'a [u8]) -> Result<Self, WatermarkError> {
        if bytes.is_empty() {
            return Err(WatermarkError::Decode("image data is empty".to_string()));
        }

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| WatermarkError::Decode(e.to_string()))?;

        let detected = reader
            .format()
            .ok_or_else(|| WatermarkError::Decode("unrecognized image format".to_string()))?;
        let format = SourceFormat::from_image_format(detected).ok_or_else(|| {
            WatermarkError::Decode(format!("unsupported image format: {:?}", detected))
        })?;

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| WatermarkError::Decode(e.to_string()))?;

        Ok(Self {
            bytes,
            width,
            height,
            format,
        })
    }

    /// Decode every pixel of the probed image.
    pub fn decode(&self) -> Result<DynamicImage, WatermarkError> {
        let image = ImageReader::with_format(Cursor::new(self.bytes), self.format.image_format())
            .decode()
            .map_err(|e| WatermarkError::Decode(e.to_string()))?;

        if image.width() != self.width || image.height() != self.height {
            return Err(WatermarkError::Decode(format!(
                "decoded size {}x{} does not match header {}x{}",
                image.width(),
                image.height(),
                self.width,
                self.height
            )));
        }

        Ok(image)
    }

    pub fn metadata(&self) -> ImageMetadata {
        ImageMetadata {
            width: self.width,
            height: self.height,
            format: self.format.as_str().to_string(),
            size: self.bytes.len(),
        }
    }
}

/// Header-only metadata read for callers that do not need a watermark.
pub fn read_metadata(bytes: &[u8]) -> Result<ImageMetadata, WatermarkError> {
    SourceImage::probe(bytes).map(|source| source.metadata())
}
