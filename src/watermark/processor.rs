//! Watermark processor: the decode → layout → overlay → blend → encode pipeline.
//!
//! The processor is stateless and reentrant. It holds only an immutable
//! configuration (shared through an `Arc`) and the process-wide font, so a
//! single instance can serve any number of concurrent calls without locking.
//!
//! # Example
//!
//! ```no_run
//! use gallery_watermark::watermark::{WatermarkConfig, WatermarkProcessor};
//!
//! let processor = WatermarkProcessor::new(WatermarkConfig::default()).unwrap();
//! let source = std::fs::read("photo.png").unwrap();
//! let output = processor.apply_watermark(&source).unwrap();
//! assert_eq!(output.metadata.size, source.len());
//! std::fs::write("photo-preview.jpg", &output.image.data).unwrap();
//! ```

use super::compositor::{composite, rasterize_overlay};
use super::encoder::encode_jpeg;
use super::layout::{compute_layout, TileLayout};
use super::markup::OverlayMarkup;
use super::source::{ImageMetadata, SourceImage};
use super::{WatermarkConfig, WatermarkError};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;

/// Final JPEG preview.
#[derive(Clone)]
pub struct WatermarkedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// Number of labels drawn onto the image.
    pub tile_count: usize,
}

impl std::fmt::Debug for WatermarkedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkedImage")
            .field("bytes", &self.data.len())
            .field("dimensions", &(self.width, self.height))
            .field("quality", &self.quality)
            .field("tile_count", &self.tile_count)
            .finish()
    }
}

/// Watermarked preview together with the metadata of the original upload.
#[derive(Debug, Clone)]
pub struct WatermarkOutput {
    pub image: WatermarkedImage,
    pub metadata: ImageMetadata,
}

/// Applies the configured tiled text watermark to source images.
#[derive(Debug, Clone)]
pub struct WatermarkProcessor {
    config: Arc<WatermarkConfig>,
}

impl WatermarkProcessor {
    /// Create a processor, rejecting invalid configuration up front.
    pub fn new(config: WatermarkConfig) -> Result<Self, WatermarkError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Tile grid this processor uses for an image of the given size.
    pub fn layout_for(&self, width: u32, height: u32) -> TileLayout {
        compute_layout(width, height, &self.config)
    }

    /// Overlay markup this processor composites for an image of the given size.
    pub fn overlay_for(&self, width: u32, height: u32) -> Result<OverlayMarkup, WatermarkError> {
        OverlayMarkup::from_layout(&self.layout_for(width, height), &self.config)
    }

    /// Watermark `source` and return the JPEG preview plus source metadata.
    ///
    /// Either both parts are produced or an error is returned; there is no
    /// partial output.
    pub fn apply_watermark(&self, source: &[u8]) -> Result<WatermarkOutput, WatermarkError> {
        let started = Instant::now();

        let source_image = SourceImage::probe(source)?;
        let (width, height) = (source_image.width, source_image.height);
        let mut canvas = source_image.decode()?.to_rgba8();

        let overlay_markup = self.overlay_for(width, height)?;
        let overlay = rasterize_overlay(&overlay_markup)?;
        composite(&mut canvas, &overlay, self.config.blend)?;

        let data = encode_jpeg(&canvas, self.config.quality)?;

        tracing::debug!(
            width,
            height,
            format = source_image.format.as_str(),
            input_bytes = source.len(),
            output_bytes = data.len(),
            tiles = overlay_markup.tile_count(),
            blend = self.config.blend.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Applied watermark"
        );

        Ok(WatermarkOutput {
            image: WatermarkedImage {
                data,
                width,
                height,
                quality: self.config.quality,
                tile_count: overlay_markup.tile_count(),
            },
            metadata: source_image.metadata(),
        })
    }

    /// Run [`apply_watermark`](Self::apply_watermark) on the blocking pool.
    ///
    /// Decoding, rasterizing and encoding are CPU bound and must not stall
    /// the async executor.
    pub async fn apply_blocking(&self, source: Bytes) -> Result<WatermarkOutput, WatermarkError> {
        self.apply_blocking_with(source, ()).await
    }

    /// Like [`apply_blocking`](Self::apply_blocking), but `guard` is moved
    /// into the worker and dropped only when the job finishes.
    ///
    /// Dropping the returned future does not stop the worker, so a
    /// concurrency permit passed here stays held while pixels are still
    /// being processed.
    pub async fn apply_blocking_with<G>(
        &self,
        source: Bytes,
        guard: G,
    ) -> Result<WatermarkOutput, WatermarkError>
    where
        G: Send + 'static,
    {
        let processor = self.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            processor.apply_watermark(&source)
        })
        .await
        .map_err(|e| WatermarkError::Encode(format!("watermark worker failed: {}", e)))?
    }
}

/// One-shot watermark with an explicit configuration.
pub fn apply_watermark(
    source: &[u8],
    config: &WatermarkConfig,
) -> Result<WatermarkOutput, WatermarkError> {
    WatermarkProcessor::new(config.clone())?.apply_watermark(source)
}
