//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/absendo/config.toml` by default. Every key is optional:
//!
//! ```toml
//! debug = false
//! log_filter = "absendo_providers=debug"
//!
//! [fetch]
//! cache_ttl_secs = 900
//! max_concurrent_fetches = 4
//! timeout_secs = 30
//! proxy_url = "https://proxy.example.com/proxy"
//! proxy_host_pattern = "schulnetz.lu.ch"
//!
//! [mapping]
//! teachers = "/etc/absendo/teachers.json"
//! subjects = "/etc/absendo/subjects.json"
//!
//! [output]
//! short_names = false
//! ```
//!
//! `ABSENDO_PROXY_URL` overrides `fetch.proxy_url`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use absendo_core::DataMapping;
use absendo_providers::{FetchConfig, ProxyConfig};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the proxy endpoint.
pub const PROXY_URL_ENV: &str = "ABSENDO_PROXY_URL";

/// Configuration for the absendo client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Log filter directive, replaces `RUST_LOG`.
    pub log_filter: Option<String>,

    /// Calendar fetch settings.
    pub fetch: FetchSettings,

    /// Code-to-name mapping tables.
    pub mapping: MappingSettings,

    /// Output settings.
    pub output: OutputSettings,
}

/// Calendar fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Cache TTL in seconds.
    pub cache_ttl_secs: u64,

    /// Maximum simultaneous fetches.
    pub max_concurrent_fetches: usize,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// User agent override.
    pub user_agent: Option<String>,

    /// Minimum accepted payload length in bytes.
    pub min_payload_len: usize,

    /// Markers that identify an error page instead of a calendar.
    pub error_markers: Vec<String>,

    /// Proxy endpoint for the school network.
    pub proxy_url: Option<String>,

    /// Substring of calendar URLs that are sent through the proxy.
    pub proxy_host_pattern: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        let defaults = FetchConfig::default();
        Self {
            cache_ttl_secs: FetchConfig::DEFAULT_CACHE_TTL_SECS,
            max_concurrent_fetches: FetchConfig::DEFAULT_MAX_CONCURRENT_FETCHES,
            timeout_secs: FetchConfig::DEFAULT_TIMEOUT_SECS,
            user_agent: None,
            min_payload_len: FetchConfig::DEFAULT_MIN_PAYLOAD_LEN,
            error_markers: defaults.error_markers,
            proxy_url: None,
            proxy_host_pattern: ProxyConfig::DEFAULT_HOST_PATTERN.to_string(),
        }
    }
}

impl FetchSettings {
    /// Builds the fetch configuration.
    ///
    /// `proxy_override` takes precedence over `proxy_url`.
    pub fn to_fetch_config(&self, proxy_override: Option<&str>) -> Result<FetchConfig, String> {
        if self.max_concurrent_fetches == 0 {
            return Err("fetch.max_concurrent_fetches must be at least 1".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be at least 1".to_string());
        }

        let mut config = FetchConfig::default()
            .with_cache_ttl(Duration::from_secs(self.cache_ttl_secs))
            .with_max_concurrent_fetches(self.max_concurrent_fetches)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_min_payload_len(self.min_payload_len)
            .with_error_markers(self.error_markers.clone());

        if let Some(ref user_agent) = self.user_agent {
            config = config.with_user_agent(user_agent.as_str());
        }

        let proxy_url = proxy_override
            .filter(|url| !url.is_empty())
            .or(self.proxy_url.as_deref());
        if let Some(url) = proxy_url {
            let proxy = ProxyConfig::new(url)
                .map_err(|e| format!("invalid proxy URL '{}': {}", url, e))?
                .with_host_pattern(self.proxy_host_pattern.as_str());
            config = config.with_proxy(proxy);
        }

        Ok(config)
    }
}

/// Paths to custom mapping tables.
///
/// Both tables must be given together; without them the built-in tables
/// are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Teacher code table (JSON object).
    pub teachers: Option<PathBuf>,

    /// Subject code table (JSON object).
    pub subjects: Option<PathBuf>,
}

impl MappingSettings {
    /// Loads the configured tables, or `None` for the built-in ones.
    pub fn load(&self) -> Result<Option<DataMapping>, String> {
        match (&self.teachers, &self.subjects) {
            (Some(teachers), Some(subjects)) => DataMapping::load(teachers, subjects)
                .map(Some)
                .map_err(|e| e.to_string()),
            (None, None) => Ok(None),
            _ => Err("mapping.teachers and mapping.subjects must be set together".to_string()),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Show short codes instead of full names by default.
    pub short_names: bool,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("absendo")
    }

    /// Builds the fetch configuration, applying `ABSENDO_PROXY_URL`.
    pub fn to_fetch_config(&self) -> Result<FetchConfig, String> {
        let proxy_override = std::env::var(PROXY_URL_ENV).ok();
        self.fetch.to_fetch_config(proxy_override.as_deref())
    }
}
