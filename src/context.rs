use crate::config::Config;
use crate::error::ContextError;
use crate::fetcher::{ApiEndpoint, FetchFailurePolicy, KubeletStatsFetcher};
use crate::metrics::MetricsRegistry;
use crate::monitoring::SelfMonitoring;
use reqwest::blocking::Client;
use std::sync::Arc;
use std::time::Duration;

/// Everything collectors share, built once at startup
///
/// Holds the metrics registry, the HTTP client and the settings every
/// collector needs. Passed by reference to collector constructors.
pub struct ExporterContext {
    pub registry: Arc<MetricsRegistry>,
    pub monitoring: SelfMonitoring,
    pub client: Client,
    pub endpoint: ApiEndpoint,
    pub node_name: String,
    pub scrape_interval: Duration,
    pub fetch_failure_policy: FetchFailurePolicy,
}

impl ExporterContext {
    /// Build the context for `config` reaching the API server via `endpoint`
    pub fn new(config: &Config, endpoint: ApiEndpoint) -> Result<Self, ContextError> {
        let registry = Arc::new(MetricsRegistry::new());
        let monitoring = SelfMonitoring::register(&registry)?;
        let client = endpoint.build_client()?;

        Ok(Self {
            registry,
            monitoring,
            client,
            endpoint,
            node_name: config.node_name.clone(),
            scrape_interval: config.scrape_interval(),
            fetch_failure_policy: config.fetch_failure_policy,
        })
    }

    /// A stats fetcher for the configured node sharing this context's client
    pub fn fetcher(&self) -> KubeletStatsFetcher {
        KubeletStatsFetcher::new(self.client.clone(), &self.endpoint, &self.node_name)
    }
}
