// Metrics module - Prometheus metrics for the watermark service
//
// Provides:
// - Request counters by endpoint and outcome
// - Processing latency histogram
// - Tile count and input size histograms
// - Image host upload counters

use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, Encoder, Histogram,
    HistogramVec, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Instant;

/// Global metrics registry for the watermark service
pub struct WatermarkMetrics {
    /// Requests by endpoint and outcome (ok, or an error kind)
    pub requests: IntCounterVec,

    /// Watermark processing duration histogram (in seconds)
    pub processing_duration: HistogramVec,

    /// Labels drawn per watermarked image
    pub tiles: Histogram,

    /// Size of accepted source images in bytes
    pub input_bytes: Histogram,

    /// Image host uploads by host and outcome
    pub uploads: IntCounterVec,
}

/// Global singleton instance of metrics
static METRICS: OnceLock<WatermarkMetrics> = OnceLock::new();

impl WatermarkMetrics {
    /// Initialize and return the global metrics instance
    ///
    /// Subsequent calls return the same instance.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let requests = register_int_counter_vec!(
                "gallery_watermark_requests_total",
                "Total number of requests by endpoint and outcome",
                &["endpoint", "outcome"]
            )
            .expect("Failed to register requests_total metric");

            let processing_duration = register_histogram_vec!(
                "gallery_watermark_processing_duration_seconds",
                "Duration of watermark processing in seconds",
                &["endpoint"],
                vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
            )
            .expect("Failed to register processing_duration_seconds metric");

            let tiles = register_histogram!(
                "gallery_watermark_tiles",
                "Number of labels drawn per image",
                vec![1.0, 4.0, 9.0, 16.0, 25.0, 50.0, 100.0, 500.0, 1000.0, 10000.0]
            )
            .expect("Failed to register tiles metric");

            let input_bytes = register_histogram!(
                "gallery_watermark_input_bytes",
                "Size of source images in bytes",
                prometheus::exponential_buckets(1024.0, 4.0, 9)
                    .expect("Failed to build input_bytes buckets")
            )
            .expect("Failed to register input_bytes metric");

            let uploads = register_int_counter_vec!(
                "gallery_watermark_host_uploads_total",
                "Total number of image host uploads by host and outcome",
                &["host", "outcome"]
            )
            .expect("Failed to register host_uploads_total metric");

            WatermarkMetrics {
                requests,
                processing_duration,
                tiles,
                input_bytes,
                uploads,
            }
        })
    }

    pub fn record_request(&self, endpoint: &str, outcome: &str) {
        self.requests.with_label_values(&[endpoint, outcome]).inc();
    }

    /// Record a finished watermark job
    pub fn observe_watermark(&self, input_bytes: usize, tiles: usize) {
        self.input_bytes.observe(input_bytes as f64);
        self.tiles.observe(tiles as f64);
    }

    pub fn record_upload(&self, host: &str, outcome: &str) {
        self.uploads.with_label_values(&[host, outcome]).inc();
    }

    /// Start timing a processing step
    ///
    /// # Example
    /// ```ignore
    /// let timer = metrics.start_processing_timer("watermark");
    /// // ... decode, composite, encode ...
    /// timer.observe_duration();
    /// ```
    pub fn start_processing_timer(&self, endpoint: &str) -> HistogramTimer {
        HistogramTimer {
            histogram: self.processing_duration.with_label_values(&[endpoint]),
            start: Instant::now(),
            observed: false,
        }
    }
}

/// RAII timer for histogram metrics
///
/// Records the duration when dropped unless already observed.
pub struct HistogramTimer {
    histogram: Histogram,
    start: Instant,
    observed: bool,
}

impl HistogramTimer {
    /// Manually observe and consume the timer
    pub fn observe_duration(mut self) {
        self.record();
    }

    fn record(&mut self) {
        if !self.observed {
            self.observed = true;
            self.histogram.observe(self.start.elapsed().as_secs_f64());
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.record();
    }
}

/// Render the default registry in Prometheus text exposition format
pub fn export_prometheus() -> Result<String, String> {
    // Make sure the service metrics exist even before the first request
    WatermarkMetrics::global();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| format!("Metrics are not valid UTF-8: {}", e))
}

/// Content-Type of [`export_prometheus`] output
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}
