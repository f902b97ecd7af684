//! Configuration management for Floodgate.

use serde::{Deserialize, Serialize};

use crate::ratelimit::DEFAULT_NAMESPACE;

/// Main configuration for a Floodgate instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloodgateConfig {
    /// Shared store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Bucket key configuration
    #[serde(default)]
    pub keys: KeyConfig,
}

impl Default for FloodgateConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            keys: KeyConfig::default(),
        }
    }
}

/// Shared store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Redis connection URL
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Connection establishment timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-command response timeout in milliseconds
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    /// Bucket expiry as a multiple of the bucket fill time
    #[serde(default = "default_ttl_multiplier")]
    pub ttl_multiplier: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            ttl_multiplier: default_ttl_multiplier(),
        }
    }
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    1000
}

fn default_response_timeout_ms() -> u64 {
    250
}

fn default_ttl_multiplier() -> f64 {
    2.0
}

/// Bucket key configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Namespace prefix applied to all bucket keys
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl FloodgateConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: FloodgateConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::FloodgateError::Config(e.to_string()))?;
        Ok(config)
    }
}
