//! Overlay rasterization and blending.
//!
//! The SVG overlay is rasterized with resvg onto a transparent canvas the
//! size of the source image, then blended pixel by pixel onto the decoded
//! source.
//!
//! # Blend modes
//!
//! Both modes use the W3C compositing formula with a separable blend
//! function `B(cb, cs)`:
//!
//! ```text
//! ao = as + ab * (1 - as)
//! co = as * (1 - ab) * cs + as * ab * B(cb, cs) + (1 - as) * ab * cb
//! ```
//!
//! - `over`: `B(cb, cs) = cs`, the Porter-Duff source-over operator
//! - `overlay`: `B(cb, cs) = 2*cb*cs` if `cb <= 0.5`, else `1 - 2*(1-cb)*(1-cs)`
//!
//! Rendering clips to the canvas, so tiles overflowing the last row or
//! column are cut at the image edge.

use super::font::font_database;
use super::markup::OverlayMarkup;
use super::{BlendMode, WatermarkError};
use image::{Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};

/// Rasterize an overlay to a straight-alpha RGBA canvas of its own size.
pub fn rasterize_overlay(markup: &OverlayMarkup) -> Result<RgbaImage, WatermarkError> {
    rasterize_svg(&markup.to_svg(), markup.width, markup.height)
}

/// Rasterize SVG text onto a transparent `width` x `height` canvas.
pub fn rasterize_svg(svg: &str, width: u32, height: u32) -> Result<RgbaImage, WatermarkError> {
    let options = usvg::Options {
        fontdb: font_database(),
        ..Default::default()
    };

    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| WatermarkError::Encode(format!("invalid overlay markup: {}", e)))?;

    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        WatermarkError::Encode(format!(
            "cannot allocate {}x{} overlay canvas",
            width, height
        ))
    })?;

    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    RgbaImage::from_raw(width, height, data)
        .ok_or_else(|| WatermarkError::Encode("overlay buffer size mismatch".to_string()))
}

/// Blend `overlay` onto `target` in place.
///
/// Both images must have identical dimensions.
pub fn composite(
    target: &mut RgbaImage,
    overlay: &RgbaImage,
    mode: BlendMode,
) -> Result<(), WatermarkError> {
    if target.dimensions() != overlay.dimensions() {
        return Err(WatermarkError::Encode(format!(
            "overlay is {}x{} but target is {}x{}",
            overlay.width(),
            overlay.height(),
            target.width(),
            target.height()
        )));
    }

    for (background, foreground) in target.pixels_mut().zip(overlay.pixels()) {
        if foreground[3] == 0 {
            continue;
        }
        *background = blend_pixels(*background, *foreground, mode);
    }

    Ok(())
}

/// Blend one overlay pixel onto one background pixel.
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, mode: BlendMode) -> Rgba<u8> {
    let fg_alpha = foreground[3] as f32 / 255.0;
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let cs = fg as f32 / 255.0;
        let cb = bg as f32 / 255.0;
        let mixed = match mode {
            BlendMode::Over => cs,
            BlendMode::Overlay => overlay_channel(cb, cs),
        };
        let co = fg_alpha * (1.0 - bg_alpha) * cs
            + fg_alpha * bg_alpha * mixed
            + (1.0 - fg_alpha) * bg_alpha * cb;
        (co / out_alpha * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Separable overlay: multiply dark backdrops, screen light ones.
fn overlay_channel(cb: f32, cs: f32) -> f32 {
    if cb <= 0.5 {
        2.0 * cb * cs
    } else {
        1.0 - 2.0 * (1.0 - cb) * (1.0 - cs)
    }
}
