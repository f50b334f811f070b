// Gallery Watermark Library
// Tiled text watermark compositor plus the HTTP service around it

pub mod config;
pub mod constants;
pub mod error;
pub mod hosting; // Image host collaborator (ImgBB)
pub mod logging;
pub mod metrics; // Prometheus metrics
pub mod security; // Upload guard: size, media type, pixel limits
pub mod server;
pub mod watermark;
