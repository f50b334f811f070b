//! CLI Tests
//!
//! Runs the compiled binary against files in a temporary directory.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::Value;
use std::process::Command;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_gallery-watermark"))
}

fn write_png(path: &std::path::Path, width: u32, height: u32) {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        width,
        height,
        Rgba([30, 60, 90, 255]),
    ))
    .save_with_format(path, ImageFormat::Png)
    .unwrap();
}

#[test]
fn test_apply_writes_jpeg_and_prints_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("source.png");
    let output = dir.path().join("preview.jpg");
    write_png(&input, 120, 80);

    let result = binary()
        .current_dir(dir.path())
        .args(["apply", "source.png", "-o", "preview.jpg"])
        .output()
        .unwrap();
    assert!(
        result.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let metadata: Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(metadata["width"], 120);
    assert_eq!(metadata["height"], 80);
    assert_eq!(metadata["format"], "png");
    assert_eq!(
        metadata["size"],
        std::fs::metadata(&input).unwrap().len()
    );

    let written = std::fs::read(&output).unwrap();
    assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Jpeg);
}

#[test]
fn test_inspect_prints_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("source.png");
    write_png(&input, 9, 7);

    let result = binary()
        .current_dir(dir.path())
        .args(["inspect", "source.png"])
        .output()
        .unwrap();
    assert!(result.status.success());

    let metadata: Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(metadata["width"], 9);
    assert_eq!(metadata["height"], 7);
}

#[test]
fn test_invalid_config_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.yaml"), "watermark:\n  divisor: 0\n").unwrap();
    write_png(&dir.path().join("source.png"), 4, 4);

    let result = binary()
        .current_dir(dir.path())
        .args(["inspect", "source.png"])
        .output()
        .unwrap();
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("divisor"));
}

#[test]
fn test_serve_test_flag_validates_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("custom.yaml");
    std::fs::write(&config, "server:\n  port: 0\nlogging:\n  format: text\n").unwrap();

    let result = binary()
        .args(["serve", "--test", "-c"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(result.status.success());
}

#[test]
fn test_apply_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = binary()
        .current_dir(dir.path())
        .args(["apply", "absent.png", "-o", "out.jpg"])
        .output()
        .unwrap();
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("absent.png"));
}
