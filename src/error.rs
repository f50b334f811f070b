// Error types module

use http::StatusCode;
use thiserror::Error;

use crate::hosting::HostingError;
use crate::security::UploadError;
use crate::watermark::WatermarkError;

/// Centralized error type for the HTTP service
///
/// Wraps the domain errors and maps each one to the status code the caller
/// receives.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Decode, encode, configuration or fetch failure in the compositor
    #[error(transparent)]
    Watermark(#[from] WatermarkError),

    /// Upload rejected before reaching the compositor
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Image host rejected the preview or could not be reached
    #[error(transparent)]
    Hosting(#[from] HostingError),

    /// Configuration errors (invalid YAML, missing env vars, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed request that is not an image problem (bad JSON, bad URL)
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("No route for {0}")]
    NotFound(String),

    /// Known route, wrong method; `allow` lists what the route accepts
    #[error("Method {method} is not allowed on this route")]
    MethodNotAllowed { method: String, allow: &'static str },

    /// `POST /images` without a `hosting` section
    #[error("Image hosting is not configured")]
    HostingUnavailable,

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Unexpected failures (worker panic, response building)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Watermark(err) => match err {
                WatermarkError::Decode(_) => StatusCode::BAD_REQUEST,
                WatermarkError::Fetch(_) => StatusCode::BAD_GATEWAY,
                WatermarkError::Encode(_) | WatermarkError::Configuration(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ServiceError::Upload(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::BAD_REQUEST),
            ServiceError::Hosting(err) => match err {
                HostingError::Connection(_) | HostingError::Api(_) => StatusCode::BAD_GATEWAY,
                HostingError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            ServiceError::Config(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ServiceError::HostingUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Short label used as the metrics outcome
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Watermark(err) => err.kind(),
            ServiceError::Upload(UploadError::PayloadTooLarge { .. }) => "too_large",
            ServiceError::Upload(UploadError::UnsupportedMediaType { .. }) => "media_type",
            ServiceError::Upload(UploadError::TooManyPixels { .. }) => "too_many_pixels",
            ServiceError::Hosting(_) => "hosting",
            ServiceError::Config(_) => "config",
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::MethodNotAllowed { .. } => "method_not_allowed",
            ServiceError::HostingUnavailable => "hosting_unavailable",
            ServiceError::Timeout(_) => "timeout",
            ServiceError::Internal(_) => "internal",
        }
    }
}
