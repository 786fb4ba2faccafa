use thiserror::Error;

/// Errors that can occur in storage collectors
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Failed to fetch node stats: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Stats endpoint returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to decode stats payload: {0}")]
    DecodeFailed(#[from] serde_json::Error),

    #[error("Failed to spawn collector thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Errors raised while registering or rendering metrics
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Metric registration failed: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Rendered metrics are not valid UTF-8: {0}")]
    Encode(#[from] std::string::FromUtf8Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("Cluster credentials unavailable: {0}")]
    Credentials(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Errors building the shared exporter context at startup
#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
