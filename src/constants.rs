// Constants module - centralized default values for configuration
//
// Watermark geometry and style defaults live next to `WatermarkConfig`;
// this module holds the service-level ones.

// =============================================================================
// Server defaults
// =============================================================================

/// Default bind address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of watermark jobs allowed to run at once
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 16;

// =============================================================================
// Upload guard defaults
// =============================================================================

/// Default maximum upload size (5 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Default maximum decoded canvas size (100 megapixels)
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// Outbound HTTP defaults
// =============================================================================

/// Default timeout for source fetches and image host uploads in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default ImgBB upload endpoint
pub const DEFAULT_IMGBB_ENDPOINT: &str = "https://api.imgbb.com/1/upload";
