//! Remote source image fetcher.
//!
//! Downloads the original image for a watermark job from an `http://` or
//! `https://` URL. The body is streamed chunk by chunk and the download is
//! abandoned as soon as it exceeds the configured byte cap, so an oversized
//! remote file never lands fully in memory.
//!
//! Fetched bytes are returned untouched; decoding is the processor's job.

use super::WatermarkError;
use crate::constants::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MAX_UPLOAD_BYTES};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

// Remote sources get the same cap as direct uploads
fn default_max_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

/// Remote fetch limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Largest body accepted from the remote server.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be greater than 0".to_string());
        }
        if self.max_bytes == 0 {
            return Err("fetch.max_bytes must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Check that `url` is an absolute http(s) URL.
pub fn validate_source_url(url: &str) -> Result<(), WatermarkError> {
    let lower = url.trim().to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .ok_or_else(|| {
            WatermarkError::Fetch(format!(
                "unsupported source URL: {}. Use http:// or https://",
                url
            ))
        })?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(WatermarkError::Fetch(format!(
            "source URL has no host: {}",
            url
        )));
    }

    Ok(())
}

/// HTTP client for source images.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    http_client: reqwest::Client,
    max_bytes: usize,
}

impl SourceFetcher {
    /// # Errors
    ///
    /// Returns `WatermarkError::Configuration` if the HTTP client cannot be
    /// built (TLS backend initialization failure).
    pub fn new(config: &FetchConfig) -> Result<Self, WatermarkError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                WatermarkError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            max_bytes: config.max_bytes,
        })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Download the body at `url`.
    ///
    /// # Errors
    ///
    /// Returns `WatermarkError::Fetch` for a non-http(s) URL, a network
    /// failure, a non-2xx status, or a body larger than the byte cap.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, WatermarkError> {
        self.fetch_limited(url, self.max_bytes).await
    }

    /// Download the body at `url`, capped at the smaller of `max_bytes` and
    /// the configured cap.
    pub async fn fetch_limited(
        &self,
        url: &str,
        max_bytes: usize,
    ) -> Result<Bytes, WatermarkError> {
        validate_source_url(url)?;
        let limit = max_bytes.min(self.max_bytes);

        let mut response = self
            .http_client
            .get(url.trim())
            .send()
            .await
            .map_err(|e| WatermarkError::Fetch(format!("HTTP fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(WatermarkError::Fetch(format!(
                "HTTP request failed with status: {}",
                response.status()
            )));
        }

        if let Some(length) = response.content_length() {
            if length > limit as u64 {
                return Err(too_large(length, limit));
            }
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| WatermarkError::Fetch(format!("failed to read HTTP body: {}", e)))?
        {
            if body.len() + chunk.len() > limit {
                return Err(too_large((body.len() + chunk.len()) as u64, limit));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(url = %url, bytes = body.len(), "Fetched source image");

        Ok(body.freeze())
    }

}

fn too_large(length: u64, limit: usize) -> WatermarkError {
    WatermarkError::Fetch(format!(
        "remote image is {} bytes, limit is {}",
        length, limit
    ))
}
