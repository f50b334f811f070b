//! Watermark End-to-End Tests
//!
//! Exercises the complete library flow:
//!   source bytes → probe → layout → overlay → blend → JPEG + metadata
//!
//! Run with:
//!   cargo test --test integration_tests watermark

use gallery_watermark::watermark::{
    apply_watermark, compute_layout, WatermarkConfig, WatermarkError, WatermarkProcessor,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Gradient so that blending differences are visible in every region
fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            96,
            255,
        ])
    })
}

fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(gradient(width, height))
        .to_rgb8()
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .unwrap();
    buffer.into_inner()
}

fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(gradient(width, height))
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

fn create_test_webp(width: u32, height: u32) -> Vec<u8> {
    use image::codecs::webp::WebPEncoder;
    use image::{ColorType, ImageEncoder};

    let img = gradient(width, height);
    let mut buffer = Vec::new();
    WebPEncoder::new_lossless(&mut buffer)
        .write_image(img.as_raw(), width, height, ColorType::Rgba8)
        .unwrap();
    buffer
}

fn decode(data: &[u8]) -> DynamicImage {
    assert_eq!(image::guess_format(data).unwrap(), ImageFormat::Jpeg);
    image::load_from_memory(data).unwrap()
}

#[test]
fn test_1200x800_jpeg_gets_twelve_tiles() {
    let source = create_test_jpeg(1200, 800);
    let output = apply_watermark(&source, &WatermarkConfig::default()).unwrap();

    assert_eq!(output.image.tile_count, 12);
    assert_eq!(output.image.quality, 95);
    assert_eq!(output.metadata.width, 1200);
    assert_eq!(output.metadata.height, 800);
    assert_eq!(output.metadata.format, "jpeg");
    assert_eq!(output.metadata.size, source.len());

    let decoded = decode(&output.image.data);
    assert_eq!((decoded.width(), decoded.height()), (1200, 800));

    let layout = compute_layout(1200, 800, &WatermarkConfig::default());
    assert_eq!(layout.tile_size, 300);
    assert_eq!(layout.font_size, 100);
}

#[test]
fn test_tiny_png_with_divisor_six() {
    let config = WatermarkConfig {
        divisor: 6,
        ..Default::default()
    };
    let source = create_test_png(10, 10);
    let output = apply_watermark(&source, &config).unwrap();

    // 10 / 6 == 1, so every pixel is its own tile
    assert_eq!(output.image.tile_count, 100);
    assert_eq!(output.metadata.format, "png");

    let decoded = decode(&output.image.data);
    assert_eq!((decoded.width(), decoded.height()), (10, 10));
}

#[test]
fn test_webp_source() {
    let source = create_test_webp(160, 90);
    let output = apply_watermark(&source, &WatermarkConfig::default()).unwrap();

    assert_eq!(output.metadata.format, "webp");
    assert_eq!(output.metadata.size, source.len());
    let decoded = decode(&output.image.data);
    assert_eq!((decoded.width(), decoded.height()), (160, 90));
}

#[test]
fn test_width_below_divisor() {
    let source = create_test_png(3, 50);
    let output = apply_watermark(&source, &WatermarkConfig::default()).unwrap();

    // tile size clamps to 1: 3 columns by 50 rows
    assert_eq!(output.image.tile_count, 150);
    let decoded = decode(&output.image.data);
    assert_eq!((decoded.width(), decoded.height()), (3, 50));
}

#[test]
fn test_empty_input_is_decode_error() {
    let err = apply_watermark(&[], &WatermarkConfig::default()).unwrap_err();
    assert!(matches!(err, WatermarkError::Decode(_)));
}

#[test]
fn test_corrupt_input_is_decode_error() {
    let mut source = create_test_png(64, 64);
    source.truncate(source.len() / 3);
    let err = apply_watermark(&source, &WatermarkConfig::default()).unwrap_err();
    assert!(matches!(err, WatermarkError::Decode(_)));
}

#[test]
fn test_output_is_deterministic() {
    let source = create_test_png(240, 180);
    let processor = WatermarkProcessor::new(WatermarkConfig::default()).unwrap();

    let first = processor.apply_watermark(&source).unwrap();
    let second = processor.apply_watermark(&source).unwrap();
    assert_eq!(first.image.data, second.image.data);
    assert_eq!(first.metadata, second.metadata);
}

#[test]
fn test_watermark_is_visible() {
    let source = create_test_png(400, 300);
    let output = apply_watermark(&source, &WatermarkConfig::default()).unwrap();
    let watermarked = decode(&output.image.data).to_rgb8();
    let original = gradient(400, 300);

    let changed = watermarked
        .pixels()
        .zip(original.pixels())
        .filter(|(after, before)| {
            after
                .0
                .iter()
                .zip(before.0.iter())
                .any(|(a, b)| (*a as i16 - *b as i16).abs() > 24)
        })
        .count();

    // Labels cover a real share of the image but never all of it
    assert!(changed > 400 * 300 / 50, "only {} pixels changed", changed);
    assert!(changed < 400 * 300, "every pixel changed");
}

#[test]
fn test_concurrent_calls_share_one_processor() {
    let processor = WatermarkProcessor::new(WatermarkConfig::default()).unwrap();
    let source = create_test_jpeg(200, 120);
    let expected = processor.apply_watermark(&source).unwrap().image.data;

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| processor.apply_watermark(&source).unwrap().image.data))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
