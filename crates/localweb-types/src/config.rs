//! Serving configuration.

use serde::Deserialize;

use crate::error::{LocalWebError, Result};

/// Host of the synthetic HTTPS origin. Never resolved over DNS.
pub const DEFAULT_HOST: &str = "local.web";

/// Requests at or above this many milliseconds are logged as slow.
pub const DEFAULT_SLOW_REQUEST_MS: u64 = 25;

/// Minimum interval between served-statistics log lines.
pub const DEFAULT_STATS_INTERVAL_MS: u64 = 2000;

/// Configuration for the local resource server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Synthetic origin host (`https://{host}/`).
    pub host: String,
    /// Try direct id concatenation before walking the tree.
    pub fast_path: bool,
    /// Slow-request warning threshold in milliseconds.
    pub slow_request_ms: u64,
    /// Minimum milliseconds between statistics log lines.
    pub stats_interval_ms: u64,
    /// Log media and range bodies when they are closed.
    pub log_media_streams: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            fast_path: true,
            slow_request_ms: DEFAULT_SLOW_REQUEST_MS,
            stats_interval_ms: DEFAULT_STATS_INTERVAL_MS,
            log_media_streams: true,
        }
    }
}

impl ServeConfig {
    /// Parse a `localweb.toml` document. Missing keys take their defaults.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: ServeConfig = toml::from_str(toml_str)
            .map_err(|e| LocalWebError::Config(format!("localweb.toml: {e}")))?;
        if config.host.trim().is_empty() {
            return Err(LocalWebError::Config("host must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Base URL handed to the rendering engine for the main document.
    pub fn base_url(&self) -> String {
        format!("https://{}/", self.host)
    }
}
