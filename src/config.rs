//! Configuration surface consumed by the engine.
//!
//! Read once at startup from a JSON file; [`ServerConfig`] values are
//! immutable for the lifetime of a poller and replaced wholesale on a
//! config reload.

use serde::Deserialize;
use tracing::trace;

use crate::filters::FilterConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub servers: Vec<ServerConfig>,

    /// Global settings (notification behavior, filters, verbosity).
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Identity and connection settings of one monitored server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub name: String,

    /// Backend type tag, resolved through the backend registry.
    #[serde(rename = "type")]
    pub kind: String,

    pub url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub proxy: Option<ProxyConfig>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Upper bound on any single status fetch.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub address: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Raises log verbosity to TRACE for the whole engine.
    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_true")]
    pub notification_sound: bool,

    #[serde(default)]
    pub notification_sound_repeat: bool,

    #[serde(default = "default_true")]
    pub flashing: bool,

    #[serde(default)]
    pub filters: FilterConfig,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug: false,
            notification_sound: true,
            notification_sound_repeat: false,
            flashing: true,
            filters: FilterConfig::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    10
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("invalid configuration file: {e}"))
        .inspect(|config: &Config| trace!("loaded config: {config:?}"))
}
