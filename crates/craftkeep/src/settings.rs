use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use craftkeep_core::{DEFAULT_DISTRIBUTION_BASE_URL, DEFAULT_VERSION_MANIFEST_URL, ReleaseConfig};

/// Application-level settings, independent of any one server's config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_version_manifest_url")]
    pub version_manifest_url: String,

    #[serde(default = "default_distribution_base_url")]
    pub distribution_base_url: String,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,
}

fn default_version_manifest_url() -> String {
    DEFAULT_VERSION_MANIFEST_URL.to_string()
}

fn default_distribution_base_url() -> String {
    DEFAULT_DISTRIBUTION_BASE_URL.to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_fetch_timeout() -> u64 {
    90
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version_manifest_url: default_version_manifest_url(),
            distribution_base_url: default_distribution_base_url(),
            http_timeout_secs: default_http_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
        }
    }
}

impl AppSettings {
    /// Missing or unreadable settings fall back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("ignoring invalid settings at {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn release_config(&self) -> ReleaseConfig {
        ReleaseConfig {
            version_manifest_url: self.version_manifest_url.clone(),
            distribution_base_url: self.distribution_base_url.clone(),
            request_timeout: Duration::from_secs(self.http_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ..ReleaseConfig::default()
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
