//! Tile grid calculation for the repeating text watermark.
//!
//! The grid is a pure function of the image dimensions and the
//! [`WatermarkConfig`]: identical inputs always yield an identical layout.
//!
//! ```text
//! tile_size = max(min_tile_size, floor(width / divisor))
//! font_size = max(1, floor(tile_size / font_size_ratio))
//! tiles     = ceil(width / tile_size) * ceil(height / tile_size)
//! ```
//!
//! The last row and column are not clipped to the image boundary; their
//! labels may overflow the canvas and are clipped when rasterized.
//!
//! # Example
//!
//! ```
//! use gallery_watermark::watermark::{compute_layout, WatermarkConfig};
//!
//! let layout = compute_layout(1200, 800, &WatermarkConfig::default());
//! assert_eq!(layout.tile_size, 300);
//! assert_eq!((layout.columns, layout.rows), (4, 3));
//! assert_eq!(layout.anchors.len(), 12);
//! ```

use super::WatermarkConfig;

/// Top-left corner of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileAnchor {
    pub x: u32,
    pub y: u32,
}

impl TileAnchor {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Center of the cell, where the label is anchored and rotated.
    pub fn center(&self, tile_size: u32) -> (f64, f64) {
        let half = tile_size as f64 / 2.0;
        (self.x as f64 + half, self.y as f64 + half)
    }
}

/// Geometric description of the watermark grid for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayout {
    pub width: u32,
    pub height: u32,
    /// Edge length of one square cell, in pixels.
    pub tile_size: u32,
    /// Label font size, in pixels.
    pub font_size: u32,
    /// Rotation applied to every label about its center.
    pub rotation_degrees: f32,
    pub columns: u32,
    pub rows: u32,
    /// Cells in row-major order.
    pub anchors: Vec<TileAnchor>,
}

impl TileLayout {
    pub fn tile_count(&self) -> usize {
        self.anchors.len()
    }
}

/// Number of cells needed to cover `width` x `height` with `tile_size` cells.
pub fn tile_count(width: u32, height: u32, tile_size: u32) -> u64 {
    let t = u64::from(tile_size.max(1));
    u64::from(width).div_ceil(t) * u64::from(height).div_ceil(t)
}

/// Tile size before the tile-count ceiling is applied.
pub fn base_tile_size(width: u32, config: &WatermarkConfig) -> u32 {
    (width / config.divisor.max(1)).max(config.min_tile_size.max(1))
}

/// Smallest tile size >= `tile_size` whose grid fits in `max_tiles` cells.
///
/// The count is non-increasing in the tile size and reaches 1 at
/// `max(width, height)`, so a binary search over that range terminates.
fn cap_tile_size(width: u32, height: u32, tile_size: u32, max_tiles: u32) -> u32 {
    let max_tiles = u64::from(max_tiles.max(1));
    if tile_count(width, height, tile_size) <= max_tiles {
        return tile_size;
    }

    let mut lo = tile_size;
    let mut hi = width.max(height).max(tile_size);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if tile_count(width, height, mid) <= max_tiles {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Compute the tile grid for an image of the given dimensions.
pub fn compute_layout(width: u32, height: u32, config: &WatermarkConfig) -> TileLayout {
    let tile_size = cap_tile_size(
        width,
        height,
        base_tile_size(width, config),
        config.max_tiles,
    );
    let font_size = (tile_size / config.font_size_ratio.max(1)).max(1);

    let columns = width.div_ceil(tile_size);
    let rows = height.div_ceil(tile_size);

    let mut anchors = Vec::with_capacity(columns as usize * rows as usize);
    for row in 0..rows {
        for column in 0..columns {
            anchors.push(TileAnchor::new(column * tile_size, row * tile_size));
        }
    }

    TileLayout {
        width,
        height,
        tile_size,
        font_size,
        rotation_degrees: config.rotation_degrees,
        columns,
        rows,
        anchors,
    }
}
