// Configuration module
//
// One YAML file drives the service. Every section has defaults, so an empty
// file is a valid configuration. `${VAR}` references are replaced with
// environment variables before parsing; a referenced variable that is not
// set is an error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::hosting::HostingConfig;
use crate::logging::LoggingConfig;
use crate::security::UploadLimits;
use crate::watermark::{FetchConfig, WatermarkConfig};

pub mod server;

pub use server::ServerConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: UploadLimits,
    #[serde(default)]
    pub watermark: WatermarkConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Image host for `POST /images`; the route answers 503 without it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosting: Option<HostingConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        // An empty document (or one holding only comments) parses to null
        let value: serde_yaml::Value =
            serde_yaml::from_str(&substituted).map_err(|e| e.to_string())?;
        if value.is_null() {
            return Ok(Config::default());
        }

        serde_yaml::from_value(value).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.limits.validate()?;
        self.watermark
            .validate()
            .map_err(|e| format!("watermark: {}", e))?;
        self.fetch.validate()?;
        if let Some(hosting) = &self.hosting {
            hosting.validate()?;
        }
        self.logging.validate()?;
        Ok(())
    }
}
