//! Access to the node stats summary endpoint
//!
//! The collectors only see the `StatsFetcher` trait: one blocking call that
//! returns the raw payload or an error. `KubeletStatsFetcher` implements it by
//! going through the API server's node proxy, either with the pod's service
//! account (cluster mode) or against a local, already authenticated proxy.

use crate::error::{CollectorError, ConfigError};
use log::{debug, error, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Default service account mount inside a pod
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Source of raw stats summary payloads for one node
#[cfg_attr(test, mockall::automock)]
pub trait StatsFetcher: Send + Sync {
    /// Fetch the current stats summary as raw bytes
    fn fetch(&self) -> Result<Vec<u8>, CollectorError>;
}

/// Path of the stats summary for `node` behind the API server's node proxy
pub fn stats_summary_path(node: &str) -> String {
    format!("/api/v1/nodes/{}/proxy/stats/summary", node)
}

/// How to reach the API server
#[derive(Clone, PartialEq, Eq)]
pub enum ApiEndpoint {
    /// In-cluster access with the pod's service account
    Cluster {
        base_url: String,
        token: String,
        ca_pem: Vec<u8>,
    },
    /// Plain access to a local proxy that handles authentication itself
    Local { base_url: String },
}

impl fmt::Debug for ApiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiEndpoint::Cluster { base_url, .. } => f
                .debug_struct("Cluster")
                .field("base_url", base_url)
                .finish_non_exhaustive(),
            ApiEndpoint::Local { base_url } => {
                f.debug_struct("Local").field("base_url", base_url).finish()
            }
        }
    }
}

impl ApiEndpoint {
    /// Resolve the in-cluster endpoint from the service environment and the
    /// default service account mount
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Credentials` if the service environment variables
    /// or the token and CA files are missing.
    pub fn in_cluster() -> Result<Self, ConfigError> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").ok();
        let port = std::env::var("KUBERNETES_SERVICE_PORT").ok();
        Self::in_cluster_from(host.as_deref(), port.as_deref(), Path::new(SERVICE_ACCOUNT_DIR))
    }

    fn in_cluster_from(
        host: Option<&str>,
        port: Option<&str>,
        account_dir: &Path,
    ) -> Result<Self, ConfigError> {
        let (host, port) = match (host, port) {
            (Some(host), Some(port)) if !host.is_empty() && !port.is_empty() => (host, port),
            _ => {
                return Err(ConfigError::Credentials(
                    "KUBERNETES_SERVICE_HOST and KUBERNETES_SERVICE_PORT must be defined"
                        .to_string(),
                ))
            }
        };

        let host = if host.contains(':') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };

        let token = read_credential(&account_dir.join("token"))?;
        let token = String::from_utf8_lossy(&token).trim().to_string();
        let ca_pem = read_credential(&account_dir.join("ca.crt"))?;

        Ok(ApiEndpoint::Cluster {
            base_url: format!("https://{}:{}", host, port),
            token,
            ca_pem,
        })
    }

    pub fn local(base_url: impl Into<String>) -> Self {
        ApiEndpoint::Local {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        match self {
            ApiEndpoint::Cluster { base_url, .. } | ApiEndpoint::Local { base_url } => {
                base_url.trim_end_matches('/')
            }
        }
    }

    fn bearer_token(&self) -> Option<&str> {
        match self {
            ApiEndpoint::Cluster { token, .. } => Some(token.as_str()),
            ApiEndpoint::Local { .. } => None,
        }
    }

    /// Build the HTTP client shared by all collectors
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the CA bundle is invalid or the
    /// client cannot be constructed.
    pub fn build_client(&self) -> Result<Client, ConfigError> {
        let mut builder = Client::builder().timeout(None::<Duration>);
        if let ApiEndpoint::Cluster { ca_pem, .. } = self {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(ca_pem)?);
        }
        Ok(builder.build()?)
    }
}

fn read_credential(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path)
        .map_err(|e| ConfigError::Credentials(format!("{}: {}", path.display(), e)))
}

/// Fetches `/stats/summary` of one node through the API server proxy
pub struct KubeletStatsFetcher {
    client: Client,
    url: String,
    token: Option<String>,
    node_name: String,
}

impl KubeletStatsFetcher {
    pub fn new(client: Client, endpoint: &ApiEndpoint, node_name: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", endpoint.base_url(), stats_summary_path(node_name)),
            token: endpoint.bearer_token().map(str::to_string),
            node_name: node_name.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl StatsFetcher for KubeletStatsFetcher {
    fn fetch(&self) -> Result<Vec<u8>, CollectorError> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::HttpStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let body = response.bytes()?;
        debug!("Fetched proxy stats from node: {}", self.node_name);
        Ok(body.to_vec())
    }
}

/// What a collector does when the stats endpoint cannot be reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Log and terminate the whole process, leaving restarts to the supervisor
    #[default]
    Exit,
    /// Log a warning, keep the last published series and retry next tick
    Skip,
}

impl FetchFailurePolicy {
    /// Apply the policy to a failed fetch
    pub fn handle(self, collector: &str, err: &CollectorError) {
        match self {
            FetchFailurePolicy::Exit => {
                error!("{} collector: ErrorBadRequest: {}", collector, err);
                std::process::exit(1);
            }
            FetchFailurePolicy::Skip => {
                warn!(
                    "{} collector: fetch failed, keeping previous metrics: {}",
                    collector, err
                );
            }
        }
    }
}

impl FromStr for FetchFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exit" => Ok(FetchFailurePolicy::Exit),
            "skip" => Ok(FetchFailurePolicy::Skip),
            other => Err(ConfigError::ValidationError(format!(
                "unknown fetch failure policy '{}' (expected 'exit' or 'skip')",
                other
            ))),
        }
    }
}
