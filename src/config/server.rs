//! Server configuration types.
//!
//! Address and port bindings, the per-request timeout, and the bound on
//! watermark jobs running at once. Default values are sourced from
//! `crate::constants`.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ADDRESS, DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS,
};

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_concurrent_jobs() -> usize {
    DEFAULT_MAX_CONCURRENT_JOBS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on handling one request, fetch and upload included
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Watermark jobs allowed on the blocking pool at once
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

impl ServerConfig {
    /// `address:port` string suitable for binding
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.address.trim().is_empty() {
            return Err("server.address cannot be empty".to_string());
        }
        if self.request_timeout == 0 {
            return Err("server.request_timeout must be greater than 0".to_string());
        }
        if self.max_concurrent_jobs == 0 {
            return Err("server.max_concurrent_jobs must be greater than 0".to_string());
        }
        Ok(())
    }
}
