//! HTTP Server End-to-End Tests
//!
//! Starts the real hyper server on an ephemeral port and drives it with
//! reqwest:
//!   HTTP Request → upload guard → compositor → (image host) → Response
//!
//! Run with:
//!   cargo test --test integration_tests server

use async_trait::async_trait;
use bytes::Bytes;
use gallery_watermark::config::Config;
use gallery_watermark::hosting::{HostingError, ImageHost};
use gallery_watermark::server::{AppState, WatermarkServer};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::Value;
use std::convert::Infallible;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 200, 255])
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.server.address = "127.0.0.1".to_string();
    config.server.port = 0;
    config.fetch.timeout_secs = 5;
    config
}

async fn start_server(state: AppState) -> SocketAddr {
    let server = WatermarkServer::bind("127.0.0.1:0", state).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

/// Serves `body` at `/photo.png` and 404 everywhere else
async fn start_source_server(body: Vec<u8>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = Bytes::from(body);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                    let body = body.clone();
                    async move {
                        let response = if req.uri().path() == "/photo.png" {
                            hyper::Response::builder()
                                .header("content-type", "image/png")
                                .body(Full::new(body))
                        } else {
                            hyper::Response::builder()
                                .status(404)
                                .body(Full::new(Bytes::from_static(b"missing")))
                        };
                        Ok::<_, Infallible>(response.unwrap())
                    }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    addr
}

/// Image host that keeps uploads in memory
#[derive(Default)]
struct RecordingHost {
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl ImageHost for RecordingHost {
    fn name(&self) -> &str {
        "recording"
    }

    async fn upload(&self, image: &[u8], name: &str) -> Result<String, HostingError> {
        self.uploads
            .lock()
            .unwrap()
            .push((name.to_string(), image.to_vec()));
        Ok(format!("https://img.example.test/{}.jpg", name))
    }
}

/// Image host that always fails
struct BrokenHost;

#[async_trait]
impl ImageHost for BrokenHost {
    fn name(&self) -> &str {
        "broken"
    }

    async fn upload(&self, _image: &[u8], _name: &str) -> Result<String, HostingError> {
        Err(HostingError::Api("upload rejected (500): boom".to_string()))
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let addr = start_server(AppState::from_config(&test_config()).unwrap()).await;

    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_watermark_endpoint() {
    let addr = start_server(AppState::from_config(&test_config()).unwrap()).await;
    let source = create_test_png(320, 240);

    let response = reqwest::Client::new()
        .post(format!("http://{}/watermark", addr))
        .header("content-type", "image/png")
        .body(source.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let headers = response.headers().clone();
    assert_eq!(headers["content-type"], "image/jpeg");
    assert_eq!(headers["x-image-width"], "320");
    assert_eq!(headers["x-image-height"], "240");
    assert_eq!(headers["x-image-format"], "png");
    assert_eq!(
        headers["x-image-size"].to_str().unwrap(),
        source.len().to_string()
    );

    let body = response.bytes().await.unwrap();
    let decoded = image::load_from_memory(&body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (320, 240));
}

#[tokio::test]
async fn test_metadata_endpoint() {
    let addr = start_server(AppState::from_config(&test_config()).unwrap()).await;
    let source = create_test_png(77, 33);

    let response = reqwest::Client::new()
        .post(format!("http://{}/metadata", addr))
        .header("content-type", "image/png")
        .body(source.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["width"], 77);
    assert_eq!(json["height"], 33);
    assert_eq!(json["format"], "png");
    assert_eq!(json["size"], source.len());
}

#[tokio::test]
async fn test_upload_guard_errors() {
    let addr = start_server(AppState::from_config(&test_config()).unwrap()).await;
    let client = reqwest::Client::new();

    let unsupported = client
        .post(format!("http://{}/watermark", addr))
        .header("content-type", "image/gif")
        .body(create_test_png(8, 8))
        .send()
        .await
        .unwrap();
    assert_eq!(unsupported.status(), 415);
    let json: Value = unsupported.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("image/gif"));

    let empty = client
        .post(format!("http://{}/watermark", addr))
        .header("content-type", "image/png")
        .body(Vec::new())
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), 400);
}

#[tokio::test]
async fn test_upload_size_limit() {
    let mut config = test_config();
    config.limits.max_upload_bytes = 1024;
    let addr = start_server(AppState::from_config(&config).unwrap()).await;

    let too_large = reqwest::Client::new()
        .post(format!("http://{}/watermark", addr))
        .header("content-type", "image/png")
        .body(vec![0u8; 2048])
        .send()
        .await
        .unwrap();
    assert_eq!(too_large.status(), 413);
    let json: Value = too_large.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("exceeds limit 1024"));
}

#[tokio::test]
async fn test_pixel_limit() {
    let mut config = test_config();
    config.limits.max_pixels = 100;
    let addr = start_server(AppState::from_config(&config).unwrap()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/watermark", addr))
        .header("content-type", "image/png")
        .body(create_test_png(20, 20))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn test_routing_errors() {
    let addr = start_server(AppState::from_config(&test_config()).unwrap()).await;

    let missing = reqwest::get(format!("http://{}/nope", addr)).await.unwrap();
    assert_eq!(missing.status(), 404);

    let wrong_method = reqwest::get(format!("http://{}/watermark", addr))
        .await
        .unwrap();
    assert_eq!(wrong_method.status(), 405);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let addr = start_server(AppState::from_config(&test_config()).unwrap()).await;
    reqwest::get(format!("http://{}/health", addr)).await.unwrap();

    let response = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();
    assert_eq!(response.status(), 200);
    let text = response.text().await.unwrap();
    assert!(text.contains("gallery_watermark_requests_total"));
    assert!(text.contains("endpoint=\"health\""));
}

#[tokio::test]
async fn test_images_endpoint_publishes_preview() {
    let source = create_test_png(200, 100);
    let source_addr = start_source_server(source.clone()).await;

    let host = Arc::new(RecordingHost::default());
    let state = AppState::from_config(&test_config())
        .unwrap()
        .with_host(host.clone());
    let addr = start_server(state).await;

    let original_url = format!("http://{}/photo.png", source_addr);
    let response = reqwest::Client::new()
        .post(format!("http://{}/images", addr))
        .json(&serde_json::json!({ "img": original_url }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["original_image"], original_url.as_str());
    assert!(json["watermarked_image"]
        .as_str()
        .unwrap()
        .starts_with("https://img.example.test/watermarked-"));
    assert_eq!(
        json["metadata"],
        serde_json::json!({"width": 200, "height": 100, "format": "png", "size": source.len()})
    );

    let uploads = host.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    let decoded = image::load_from_memory(&uploads[0].1).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (200, 100));
}

#[tokio::test]
async fn test_images_endpoint_errors() {
    let source_addr = start_source_server(create_test_png(10, 10)).await;
    let state = AppState::from_config(&test_config())
        .unwrap()
        .with_host(Arc::new(RecordingHost::default()));
    let addr = start_server(state).await;
    let client = reqwest::Client::new();
    let url = format!("http://{}/images", addr);

    let bad_scheme = client
        .post(&url)
        .json(&serde_json::json!({ "img": "ftp://example.com/a.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_scheme.status(), 400);

    let bad_json = client.post(&url).body("{not json").send().await.unwrap();
    assert_eq!(bad_json.status(), 400);

    let missing_source = client
        .post(&url)
        .json(&serde_json::json!({ "img": format!("http://{}/gone.png", source_addr) }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_source.status(), 502);
}

#[tokio::test]
async fn test_images_host_failures() {
    let source_addr = start_source_server(create_test_png(10, 10)).await;
    let body = serde_json::json!({ "img": format!("http://{}/photo.png", source_addr) });

    let unconfigured = start_server(AppState::from_config(&test_config()).unwrap()).await;
    let response = reqwest::Client::new()
        .post(format!("http://{}/images", unconfigured))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);

    let broken = start_server(
        AppState::from_config(&test_config())
            .unwrap()
            .with_host(Arc::new(BrokenHost)),
    )
    .await;
    let response = reqwest::Client::new()
        .post(format!("http://{}/images", broken))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn test_images_source_obeys_upload_limit() {
    let source = create_test_png(200, 100);
    assert!(source.len() > 1024);
    let source_addr = start_source_server(source).await;

    let mut config = test_config();
    config.limits.max_upload_bytes = 1024;
    let host = Arc::new(RecordingHost::default());
    let state = AppState::from_config(&config)
        .unwrap()
        .with_host(host.clone());
    let addr = start_server(state).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/images", addr))
        .json(&serde_json::json!({ "img": format!("http://{}/photo.png", source_addr) }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let json: Value = response.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("limit is 1024"));
    assert!(host.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_method_allow_header() {
    let addr = start_server(AppState::from_config(&test_config()).unwrap()).await;
    let client = reqwest::Client::new();

    let health = client
        .post(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 405);
    assert_eq!(health.headers()["allow"], "GET");

    let watermark = client
        .get(format!("http://{}/watermark", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(watermark.status(), 405);
    assert_eq!(watermark.headers()["allow"], "POST");
}
