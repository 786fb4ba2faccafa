use crate::config::interval::parse_scrape_interval;
use crate::error::ConfigError;
use crate::fetcher::{ApiEndpoint, FetchFailurePolicy};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Exporter configuration
///
/// Loaded from an optional TOML file; every field may be omitted and falls
/// back to its default. Command-line flags and environment variables are
/// applied on top by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node whose stats are exported
    pub node_name: String,
    /// Target period between cycle starts, in duration syntax (`15s`, `1m`)
    pub scrape_duration: String,
    /// Use the pod's service account instead of `api_server`
    pub in_cluster: bool,
    /// API server (or authenticating proxy) used outside the cluster
    pub api_server: String,
    /// Port of the `/metrics` endpoint
    pub metrics_port: u16,
    /// Reaction to a failed stats fetch
    pub fetch_failure_policy: FetchFailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_name: String::new(),
            scrape_duration: "15s".to_string(),
            in_cluster: true,
            api_server: "http://127.0.0.1:8001".to_string(),
            metrics_port: 9100,
            fetch_failure_policy: FetchFailurePolicy::Exit,
        }
    }
}

impl Config {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a configuration file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read and
    /// `ConfigError::TomlError` if it is not valid TOML for this structure.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from file or use defaults
    ///
    /// A missing or unreadable file is not fatal: a warning is logged and the
    /// defaults are used. A file that exists but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                match Self::from_file(path) {
                    Ok(config) => Ok(config),
                    Err(ConfigError::ReadError(reason)) => {
                        warn!(
                            "Configuration file unreadable ({}), using defaults",
                            reason
                        );
                        Ok(Self::default())
                    }
                    Err(e) => Err(e),
                }
            }
            None => {
                info!("Using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Check values that cannot be recovered from at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "node name is empty (set CURRENT_NODE_NAME or --node-name)".to_string(),
            ));
        }
        if self.node_name.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "node name '{}' contains '/'",
                self.node_name
            )));
        }
        if !self.in_cluster && self.api_server.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api_server must be set when not running in cluster".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective scrape interval, falling back to 15s on invalid input
    pub fn scrape_interval(&self) -> Duration {
        parse_scrape_interval(&self.scrape_duration)
    }

    /// Resolve how the API server is reached
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Credentials` in cluster mode when the service
    /// account or service environment is unavailable.
    pub fn api_endpoint(&self) -> Result<ApiEndpoint, ConfigError> {
        if self.in_cluster {
            ApiEndpoint::in_cluster()
        } else {
            Ok(ApiEndpoint::local(self.api_server.clone()))
        }
    }
}
