//! Tiled text watermark compositor.
//!
//! Produces protected previews of uploaded images: a grid of rotated,
//! semi-transparent text labels sized proportionally to the image is drawn
//! over the original pixels and the result is re-encoded as JPEG.
//!
//! # Pipeline
//!
//! 1. [`source`]: probe format and dimensions, then decode pixels
//! 2. [`layout`]: derive tile size, font size and the grid of anchors
//! 3. [`markup`]: describe every label as one SVG document
//! 4. [`compositor`]: rasterize the SVG and blend it onto the source
//! 5. [`encoder`]: flatten and re-encode as JPEG
//!
//! Layout and markup are pure functions of `(width, height, config)`; the
//! same image and configuration always produce the same overlay.
//!
//! # Configuration Example
//!
//! ```yaml
//! watermark:
//!   label: "GALLERY"
//!   divisor: 4
//!   rotation_degrees: -30
//!   fill_opacity: 0.6
//!   quality: 95
//!   blend: over
//! ```

pub mod compositor;
pub mod config;
pub mod encoder;
pub mod error;
pub mod fetcher;
pub mod font;
pub mod layout;
pub mod markup;
pub mod processor;
pub mod source;

pub use compositor::{composite, rasterize_overlay};
pub use config::{parse_hex_color, BlendMode, Color, WatermarkConfig};
pub use encoder::{encode_jpeg, OUTPUT_CONTENT_TYPE};
pub use error::WatermarkError;
pub use fetcher::{FetchConfig, SourceFetcher};
pub use layout::{compute_layout, TileAnchor, TileLayout};
pub use markup::{LabelStyle, OverlayMarkup, TileDescriptor};
pub use processor::{apply_watermark, WatermarkOutput, WatermarkProcessor, WatermarkedImage};
pub use source::{read_metadata, ImageMetadata, SourceFormat, SourceImage};
