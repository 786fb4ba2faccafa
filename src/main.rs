use anyhow::Context;
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use std::path::PathBuf;
use std::sync::Arc;
use storage_exporter::config::{parse_log_level, Config};
use storage_exporter::fetcher::FetchFailurePolicy;
use storage_exporter::{server, Collector, EphemeralStorage, ExporterContext, VolumeStorage};

/// Command-line arguments for the storage exporter
///
/// Every setting can also come from the environment or a TOML file; flags and
/// environment variables win over the file.
#[derive(Parser, Debug)]
#[command(
    name = "storage-exporter",
    about = "Kubernetes ephemeral and PVC storage metrics exporter",
    long_about = "Periodically reads the stats summary of one node through the API server \
                  and exposes per-pod ephemeral storage and per-volume PVC usage as \
                  Prometheus gauges."
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", help = "Configuration file path (TOML format)")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging output (same as --log-level debug)")]
    verbose: bool,

    /// Log verbosity
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Node whose storage stats are exported
    #[arg(long, env = "CURRENT_NODE_NAME")]
    node_name: Option<String>,

    /// Scrape interval in duration syntax (e.g. 15s, 1m)
    #[arg(long, env = "SCRAPE_DURATION")]
    scrape_duration: Option<String>,

    /// "true" to use the pod's service account, anything else for local mode
    #[arg(long, env = "IN_CLUSTER")]
    in_cluster: Option<String>,

    /// API server or authenticating proxy used in local mode
    #[arg(long, env = "API_SERVER")]
    api_server: Option<String>,

    /// Port of the /metrics endpoint
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Reaction to a failed stats fetch: exit or skip
    #[arg(long, env = "FETCH_FAILURE_POLICY")]
    fetch_failure_policy: Option<FetchFailurePolicy>,
}

impl Cli {
    /// Validate the CLI arguments
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in Config::load
            if config_path.exists() && !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }
        }
        Ok(())
    }

    /// Effective log level, `--verbose` taking precedence
    fn level(&self) -> Result<LevelFilter, String> {
        if self.verbose {
            return Ok(LevelFilter::Debug);
        }
        parse_log_level(&self.log_level).map_err(|e| e.to_string())
    }

    /// Overlay flags and environment variables on top of `config`
    fn apply(&self, config: &mut Config) {
        if let Some(ref node_name) = self.node_name {
            config.node_name = node_name.clone();
        }
        if let Some(ref scrape_duration) = self.scrape_duration {
            config.scrape_duration = scrape_duration.clone();
        }
        if let Some(ref in_cluster) = self.in_cluster {
            config.in_cluster = in_cluster == "true";
        }
        if let Some(ref api_server) = self.api_server {
            config.api_server = api_server.clone();
        }
        if let Some(metrics_port) = self.metrics_port {
            config.metrics_port = metrics_port;
        }
        if let Some(policy) = self.fetch_failure_policy {
            config.fetch_failure_policy = policy;
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let mut config =
        Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let endpoint = config
        .api_endpoint()
        .context("Failed to resolve API server access")?;
    info!(
        "Exporting storage metrics for node {} via {:?}",
        config.node_name, endpoint
    );
    if config.fetch_failure_policy == FetchFailurePolicy::Skip {
        warn!("Fetch failures will be skipped instead of terminating the exporter");
    }

    let context = ExporterContext::new(&config, endpoint).context("Failed to initialize exporter")?;
    info!("Scrape interval: {:?}", context.scrape_interval);

    // Both collectors must register before anything runs
    let ephemeral = Collector::new(&context, EphemeralStorage)
        .context("Failed to register ephemeral storage metrics")?;
    let volume = Collector::new(&context, VolumeStorage)
        .context("Failed to register volume storage metrics")?;

    let _collector_threads = vec![ephemeral.spawn()?, volume.spawn()?];

    ctrlc::set_handler(|| {
        info!("Received interrupt signal (SIGINT), exiting");
        std::process::exit(0);
    })
    .context("Failed to install SIGINT handler")?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start server runtime")?;
    runtime
        .block_on(server::serve(
            config.metrics_port,
            Arc::clone(&context.registry),
        ))
        .context("Listener failed")?;

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Invalid LOG_LEVEL: {}", e);
            std::process::exit(1);
        }
    };
    env_logger::Builder::new().filter_level(level).init();

    info!("Starting Kubernetes storage metrics exporter");

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
