// Request handlers - routing, body limits and responses for each endpoint

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::sync::Arc;

use super::AppState;
use crate::error::ServiceError;
use crate::metrics::{self, WatermarkMetrics};
use crate::security::{
    validate_content_type, validate_dimensions, validate_upload_size, UploadError,
};
use crate::watermark::fetcher::validate_source_url;
use crate::watermark::{ImageMetadata, SourceImage, WatermarkOutput, OUTPUT_CONTENT_TYPE};

/// JSON bodies (`POST /images`) never need more than this
const MAX_JSON_BODY_BYTES: usize = 64 * 1024;

const JSON_CONTENT_TYPE: &str = "application/json";

pub type ResponseBody = Full<Bytes>;

/// Body of `POST /images`
#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    /// Remote URL of the original image
    pub img: String,
}

/// Successful answer of `POST /images`
#[derive(Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub original_image: String,
    pub watermarked_image: String,
    pub metadata: ImageMetadata,
}

/// Route label used in logs and metrics
pub fn route_name(path: &str) -> &'static str {
    match path {
        "/health" => "health",
        "/metrics" => "metrics",
        "/metadata" => "metadata",
        "/watermark" => "watermark",
        "/images" => "images",
        _ => "unknown",
    }
}

/// Method accepted by a known route, for the `Allow` header
pub fn allowed_method(path: &str) -> Option<&'static str> {
    match path {
        "/health" | "/metrics" => Some("GET"),
        "/metadata" | "/watermark" | "/images" => Some("POST"),
        _ => None,
    }
}

/// Dispatch one request to its handler
pub async fn route<B>(
    state: Arc<AppState>,
    req: Request<B>,
) -> Result<Response<ResponseBody>, ServiceError>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (path.as_str(), &method) {
        ("/health", &Method::GET) => health(),
        ("/metrics", &Method::GET) => metrics_text(),
        ("/metadata", &Method::POST) => metadata(&state, req).await,
        ("/watermark", &Method::POST) => watermark(&state, req).await,
        ("/images", &Method::POST) => images(&state, req).await,
        (path, _) => match allowed_method(path) {
            Some(allow) => Err(ServiceError::MethodNotAllowed {
                method: method.to_string(),
                allow,
            }),
            None => Err(ServiceError::NotFound(path.to_string())),
        },
    }
}

fn health() -> Result<Response<ResponseBody>, ServiceError> {
    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

fn metrics_text() -> Result<Response<ResponseBody>, ServiceError> {
    let text = metrics::export_prometheus().map_err(ServiceError::Internal)?;
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, metrics::content_type())
        .body(Full::new(Bytes::from(text)))
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

/// Header probe only: no pixel decode, no watermark
async fn metadata<B>(
    state: &AppState,
    req: Request<B>,
) -> Result<Response<ResponseBody>, ServiceError>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let body = read_image_upload(state, req).await?;
    let metadata = SourceImage::probe(&body)?.metadata();
    json_response(StatusCode::OK, &metadata)
}

async fn watermark<B>(
    state: &AppState,
    req: Request<B>,
) -> Result<Response<ResponseBody>, ServiceError>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let body = read_image_upload(state, req).await?;
    let output = run_watermark(state, body, "watermark").await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, OUTPUT_CONTENT_TYPE)
        .header("x-image-width", output.metadata.width)
        .header("x-image-height", output.metadata.height)
        .header("x-image-format", output.metadata.format.as_str())
        .header("x-image-size", output.metadata.size)
        .body(Full::new(Bytes::from(output.image.data)))
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

/// Fetch a remote original, watermark it and publish the preview
async fn images<B>(
    state: &AppState,
    req: Request<B>,
) -> Result<Response<ResponseBody>, ServiceError>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let host = state
        .host
        .clone()
        .ok_or(ServiceError::HostingUnavailable)?;

    let body = collect_limited(req.into_body(), MAX_JSON_BODY_BYTES).await?;
    let request: ImageRequest = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid JSON body: {}", e)))?;

    validate_source_url(&request.img).map_err(|e| ServiceError::BadRequest(e.to_string()))?;

    // Remote originals obey the upload limit too; stop downloading past it
    let original = state
        .fetcher
        .fetch_limited(&request.img, state.limits.max_upload_bytes)
        .await?;

    let output = run_watermark(state, original, "images").await?;

    let name = format!("watermarked-{}", uuid::Uuid::new_v4());
    let upload = host.upload(&output.image.data, &name).await;
    let outcome = if upload.is_ok() { "ok" } else { "error" };
    WatermarkMetrics::global().record_upload(host.name(), outcome);
    let watermarked_url = upload?;

    tracing::info!(
        original = %request.img,
        watermarked = %watermarked_url,
        host = host.name(),
        "Published watermarked image"
    );

    json_response(
        StatusCode::CREATED,
        &ImageResponse {
            original_image: request.img,
            watermarked_image: watermarked_url,
            metadata: output.metadata,
        },
    )
}

/// Guard and run one watermark job on the blocking pool
async fn run_watermark(
    state: &AppState,
    source: Bytes,
    endpoint: &str,
) -> Result<WatermarkOutput, ServiceError> {
    let probe = SourceImage::probe(&source)?;
    validate_dimensions(probe.width, probe.height, &state.limits)?;

    // The permit travels with the blocking job, so a request that times out
    // keeps its slot until the pixels are done
    let permit = state
        .jobs
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| ServiceError::Internal(format!("job limiter closed: {}", e)))?;

    let metrics = WatermarkMetrics::global();
    let timer = metrics.start_processing_timer(endpoint);
    let output = state.processor.apply_blocking_with(source, permit).await?;
    timer.observe_duration();

    metrics.observe_watermark(output.metadata.size, output.image.tile_count);
    Ok(output)
}

/// Validate headers, then read the body under the upload limit
async fn read_image_upload<B>(state: &AppState, req: Request<B>) -> Result<Bytes, ServiceError>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let declared = validate_content_type(content_type)?;

    let content_length = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    validate_upload_size(content_length, state.limits.max_upload_bytes)?;

    let body = collect_limited(req.into_body(), state.limits.max_upload_bytes).await?;

    tracing::debug!(
        content_type = declared.content_type(),
        bytes = body.len(),
        "Received upload"
    );

    Ok(body)
}

async fn collect_limited<B>(body: B, limit: usize) -> Result<Bytes, ServiceError>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            // Size of the rejected body is unknown past the limit
            Err(UploadError::PayloadTooLarge {
                size: limit + 1,
                limit,
            }
            .into())
        }
        Err(e) => Err(ServiceError::BadRequest(format!(
            "failed to read request body: {}",
            e
        ))),
    }
}

fn json_response<T: Serialize>(
    status: StatusCode,
    value: &T,
) -> Result<Response<ResponseBody>, ServiceError> {
    let body = serde_json::to_vec(value).map_err(|e| ServiceError::Internal(e.to_string()))?;
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(Full::new(Bytes::from(body)))
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

/// `{"error": message}` with the mapped status; never fails
pub fn error_response(error: &ServiceError) -> Response<ResponseBody> {
    let body = serde_json::json!({ "error": error.to_string() }).to_string();

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = error.status_code();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    if let ServiceError::MethodNotAllowed { allow, .. } = error {
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static(*allow));
    }
    response
}
