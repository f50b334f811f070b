//! Watermark configuration types.
//!
//! Every constant the tiling, overlay and encoding passes depend on is a
//! named field here with one canonical default. The same `WatermarkConfig`
//! instance is shared by every request a process serves, so re-watermarking
//! an image always uses the same divisor and produces the same grid.
//!
//! # Configuration Example
//!
//! ```yaml
//! watermark:
//!   divisor: 4
//!   font_size_ratio: 3
//!   rotation_degrees: -30
//!   label: "GALLERY"
//!   fill_color: "#FFFFFF"
//!   fill_opacity: 0.6
//!   stroke_color: "#000000"
//!   stroke_width: 2
//!   stroke_opacity: 0.45
//!   quality: 95
//!   blend: over
//! ```

use super::WatermarkError;
use serde::{Deserialize, Serialize};
use std::fmt;

// Default values
fn default_divisor() -> u32 {
    4
}

fn default_font_size_ratio() -> u32 {
    3
}

fn default_rotation_degrees() -> f32 {
    -30.0
}

fn default_label() -> String {
    "GALLERY".to_string()
}

fn default_fill_color() -> String {
    "#FFFFFF".to_string()
}

fn default_fill_opacity() -> f32 {
    0.6
}

fn default_stroke_color() -> String {
    "#000000".to_string()
}

fn default_stroke_width() -> f32 {
    2.0
}

fn default_stroke_opacity() -> f32 {
    0.45
}

fn default_font_weight() -> u16 {
    900
}

fn default_quality() -> u8 {
    95
}

fn default_min_tile_size() -> u32 {
    1
}

fn default_max_tiles() -> u32 {
    10_000
}

fn default_true() -> bool {
    true
}

/// How the rendered overlay is combined with the source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Porter-Duff source-over. Labels look the same on every background.
    #[default]
    Over,
    /// Separable overlay blend. Label visibility depends on backdrop contrast.
    Overlay,
}

impl BlendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Over => "over",
            Self::Overlay => "overlay",
        }
    }
}

/// Tiled text watermark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Tile size is `floor(width / divisor)` (default: 4)
    #[serde(default = "default_divisor")]
    pub divisor: u32,

    /// Font size is `floor(tile_size / font_size_ratio)` (default: 3)
    #[serde(default = "default_font_size_ratio")]
    pub font_size_ratio: u32,

    /// Rotation of every label about its own center, in degrees (default: -30)
    #[serde(default = "default_rotation_degrees")]
    pub rotation_degrees: f32,

    /// Literal label text (default: "GALLERY")
    #[serde(default = "default_label")]
    pub label: String,

    /// Label fill color as hex string (default: "#FFFFFF")
    #[serde(default = "default_fill_color")]
    pub fill_color: String,

    /// Label fill opacity from 0.0 to 1.0 (default: 0.6)
    #[serde(default = "default_fill_opacity")]
    pub fill_opacity: f32,

    /// Outline color as hex string (default: "#000000")
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,

    /// Outline width in pixels (default: 2)
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,

    /// Outline opacity from 0.0 to 1.0 (default: 0.45)
    #[serde(default = "default_stroke_opacity")]
    pub stroke_opacity: f32,

    /// CSS font weight of the label (default: 900)
    #[serde(default = "default_font_weight")]
    pub font_weight: u16,

    /// JPEG quality of the output, 1-100 (default: 95)
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Blend mode used to composite the overlay (default: over)
    #[serde(default)]
    pub blend: BlendMode,

    /// Lower bound for the tile size in pixels (default: 1)
    #[serde(default = "default_min_tile_size")]
    pub min_tile_size: u32,

    /// Upper bound for the number of tiles in one overlay (default: 10000)
    #[serde(default = "default_max_tiles")]
    pub max_tiles: u32,

    /// Embed the label font as an `@font-face` data URL in the overlay markup
    #[serde(default = "default_true")]
    pub embed_font: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            divisor: default_divisor(),
            font_size_ratio: default_font_size_ratio(),
            rotation_degrees: default_rotation_degrees(),
            label: default_label(),
            fill_color: default_fill_color(),
            fill_opacity: default_fill_opacity(),
            stroke_color: default_stroke_color(),
            stroke_width: default_stroke_width(),
            stroke_opacity: default_stroke_opacity(),
            font_weight: default_font_weight(),
            quality: default_quality(),
            blend: BlendMode::default(),
            min_tile_size: default_min_tile_size(),
            max_tiles: default_max_tiles(),
            embed_font: true,
        }
    }
}

impl WatermarkConfig {
    /// Check every parameter, returning the first problem found.
    pub fn validate(&self) -> Result<(), WatermarkError> {
        if self.divisor == 0 {
            return Err(WatermarkError::Configuration(
                "divisor must be at least 1".to_string(),
            ));
        }
        if self.font_size_ratio == 0 {
            return Err(WatermarkError::Configuration(
                "font_size_ratio must be at least 1".to_string(),
            ));
        }
        if self.min_tile_size == 0 {
            return Err(WatermarkError::Configuration(
                "min_tile_size must be at least 1".to_string(),
            ));
        }
        if self.max_tiles == 0 {
            return Err(WatermarkError::Configuration(
                "max_tiles must be at least 1".to_string(),
            ));
        }
        if !self.rotation_degrees.is_finite() {
            return Err(WatermarkError::Configuration(
                "rotation_degrees must be a finite number".to_string(),
            ));
        }
        if self.label.trim().is_empty() {
            return Err(WatermarkError::Configuration(
                "label cannot be empty".to_string(),
            ));
        }
        validate_opacity("fill_opacity", self.fill_opacity)?;
        validate_opacity("stroke_opacity", self.stroke_opacity)?;
        if !self.stroke_width.is_finite() || self.stroke_width < 0.0 {
            return Err(WatermarkError::Configuration(format!(
                "stroke_width must be non-negative, got {}",
                self.stroke_width
            )));
        }
        if !(1..=1000).contains(&self.font_weight) {
            return Err(WatermarkError::Configuration(format!(
                "font_weight must be 1-1000, got {}",
                self.font_weight
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(WatermarkError::Configuration(format!(
                "quality must be 1-100, got {}",
                self.quality
            )));
        }
        parse_hex_color(&self.fill_color)?;
        parse_hex_color(&self.stroke_color)?;
        Ok(())
    }
}

fn validate_opacity(name: &str, value: f32) -> Result<(), WatermarkError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(WatermarkError::Configuration(format!(
            "{} must be between 0.0 and 1.0, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Parsed RGB color from hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Canonical `#RRGGBB` form, as written into overlay markup.
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Parse a hex color string into RGB components.
///
/// Supports both #RGB and #RRGGBB formats.
///
/// # Examples
///
/// ```
/// use gallery_watermark::watermark::{parse_hex_color, Color};
///
/// assert_eq!(parse_hex_color("#FFF").unwrap(), Color::new(255, 255, 255));
/// assert_eq!(parse_hex_color("#FF0000").unwrap(), Color::new(255, 0, 0));
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let digits = hex.strip_prefix('#').ok_or_else(|| {
        WatermarkError::Configuration(format!("Color must start with '#', got '{}'", hex))
    })?;

    if !digits.is_ascii() {
        return Err(WatermarkError::Configuration(format!(
            "Invalid hex color '{}'",
            hex
        )));
    }

    let component = |s: &str| {
        u8::from_str_radix(s, 16)
            .map_err(|_| WatermarkError::Configuration(format!("Invalid hex color '{}'", hex)))
    };

    match digits.len() {
        // #RGB - each digit is doubled: 0xF -> 0xFF
        3 => Ok(Color::new(
            component(&digits[0..1])? * 17,
            component(&digits[1..2])? * 17,
            component(&digits[2..3])? * 17,
        )),
        6 => Ok(Color::new(
            component(&digits[0..2])?,
            component(&digits[2..4])?,
            component(&digits[4..6])?,
        )),
        n => Err(WatermarkError::Configuration(format!(
            "Color must be #RGB or #RRGGBB format, got {} characters",
            n
        ))),
    }
}
