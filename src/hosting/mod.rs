// Image hosting collaborator
//
// Watermarked previews are handed to an external image host which returns a
// public URL. The host is a trait so the HTTP layer can run against ImgBB in
// production and an in-memory host in tests.

use crate::constants::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IMGBB_ENDPOINT};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from talking to an image host
#[derive(Debug, Error)]
pub enum HostingError {
    /// Network error or timeout
    #[error("Connection error: {0}")]
    Connection(String),

    /// Host answered but rejected the upload or returned garbage
    #[error("Image host API error: {0}")]
    Api(String),

    /// Invalid hosting configuration
    #[error("Hosting configuration error: {0}")]
    Configuration(String),
}

/// Destination for watermarked previews
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Short provider name for logs and metrics
    fn name(&self) -> &str;

    /// Upload `image` and return its public URL
    async fn upload(&self, image: &[u8], name: &str) -> Result<String, HostingError>;
}

fn default_endpoint() -> String {
    DEFAULT_IMGBB_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// ImgBB upload settings (`hosting:` section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostingConfig {
    /// API key, usually `${IMGBB_API_KEY}`
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl HostingConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("hosting.api_key cannot be empty".to_string());
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(format!(
                "hosting.endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            ));
        }
        if self.timeout_secs == 0 {
            return Err("hosting.timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: String,
}

/// ImgBB client: form-encoded base64 upload, public URL in `data.url`
#[derive(Debug, Clone)]
pub struct ImgbbHost {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ImgbbHost {
    pub fn new(config: &HostingConfig) -> Result<Self, HostingError> {
        config.validate().map_err(HostingError::Configuration)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                HostingError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ImageHost for ImgbbHost {
    fn name(&self) -> &str {
        "imgbb"
    }

    async fn upload(&self, image: &[u8], name: &str) -> Result<String, HostingError> {
        let encoded = STANDARD.encode(image);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("image", encoded.as_str()), ("name", name)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HostingError::Connection(format!("Request timed out: {}", e))
                } else {
                    HostingError::Connection(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(HostingError::Api(format!(
                "upload rejected ({}): {}",
                status.as_u16(),
                error_body
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| HostingError::Api(format!("Failed to parse response: {}", e)))?;

        tracing::debug!(host = "imgbb", url = %body.data.url, bytes = image.len(), "Uploaded image");

        Ok(body.data.url)
    }
}
