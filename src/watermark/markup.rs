//! SVG overlay generation.
//!
//! Turns a [`TileLayout`] into a declarative vector document: one rotated
//! `<text>` element per tile, sized exactly to the source image. Shared label
//! styling is written once on an enclosing `<g>` and inherited by every tile.
//!
//! The document contains nothing but geometry and style derived from the
//! layout and configuration (no ids, timestamps or random values), so the
//! same inputs always serialize to the same string.

use super::config::{parse_hex_color, Color};
use super::font::{font_base64, font_family_list, FONT_FAMILY};
use super::layout::TileLayout;
use super::{WatermarkConfig, WatermarkError};
use std::fmt::Write as _;

/// Styling shared by every label in one overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub text: String,
    pub font_size: u32,
    pub font_weight: u16,
    pub fill: Color,
    pub fill_opacity: f32,
    pub stroke: Color,
    pub stroke_width: f32,
    pub stroke_opacity: f32,
}

/// One label, anchored and rotated about its cell center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileDescriptor {
    pub center_x: f64,
    pub center_y: f64,
    pub rotation_degrees: f32,
}

/// Vector description of all tiles for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayMarkup {
    pub width: u32,
    pub height: u32,
    pub style: LabelStyle,
    pub tiles: Vec<TileDescriptor>,
    pub embed_font: bool,
}

impl OverlayMarkup {
    /// Build the overlay for a layout using the configured label style.
    pub fn from_layout(
        layout: &TileLayout,
        config: &WatermarkConfig,
    ) -> Result<Self, WatermarkError> {
        let style = LabelStyle {
            text: config.label.clone(),
            font_size: layout.font_size,
            font_weight: config.font_weight,
            fill: parse_hex_color(&config.fill_color)?,
            fill_opacity: config.fill_opacity,
            stroke: parse_hex_color(&config.stroke_color)?,
            stroke_width: config.stroke_width,
            stroke_opacity: config.stroke_opacity,
        };

        let tiles = layout
            .anchors
            .iter()
            .map(|anchor| {
                let (center_x, center_y) = anchor.center(layout.tile_size);
                TileDescriptor {
                    center_x,
                    center_y,
                    rotation_degrees: layout.rotation_degrees,
                }
            })
            .collect();

        Ok(Self {
            width: layout.width,
            height: layout.height,
            style,
            tiles,
            embed_font: config.embed_font,
        })
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Serialize the overlay as a standalone SVG document.
    pub fn to_svg(&self) -> String {
        let style = &self.style;
        let label = escape_xml(&style.text);

        // ~120 bytes per tile plus the optional embedded font
        let mut svg = String::with_capacity(
            512 + self.tiles.len() * (120 + label.len())
                + if self.embed_font { font_base64().len() } else { 0 },
        );

        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height,
        );

        if self.embed_font {
            let _ = write!(
                svg,
                "<defs><style>@font-face {{ font-family: '{}'; src: url(data:font/truetype;base64,{}) format('truetype'); }}</style></defs>",
                FONT_FAMILY,
                font_base64(),
            );
        }

        let _ = write!(
            svg,
            r#"<g font-family="{family}" font-size="{size}" font-weight="{weight}" text-anchor="middle" dominant-baseline="middle" fill="{fill}" fill-opacity="{fill_opacity}" stroke="{stroke}" stroke-width="{stroke_width}" stroke-opacity="{stroke_opacity}">"#,
            family = font_family_list(),
            size = style.font_size,
            weight = style.font_weight,
            fill = style.fill,
            fill_opacity = style.fill_opacity,
            stroke = style.stroke,
            stroke_width = style.stroke_width,
            stroke_opacity = style.stroke_opacity,
        );

        for tile in &self.tiles {
            let _ = write!(
                svg,
                r#"<text x="{x}" y="{y}" transform="rotate({r} {x} {y})">{label}</text>"#,
                x = tile.center_x,
                y = tile.center_y,
                r = tile.rotation_degrees,
                label = label,
            );
        }

        svg.push_str("</g></svg>");
        svg
    }
}

/// Escape text for use as XML character data or attribute values.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
