/// Error types for the exporter
pub mod error;

/// Configuration management
pub mod config;

/// Stats summary payload model
pub mod snapshot;

/// Node stats fetching and fetch failure policy
pub mod fetcher;

/// Registry, gauge families and sinks
pub mod metrics;

/// Exporter self-monitoring metrics
pub mod monitoring;

/// Shared startup context
pub mod context;

/// Scheduled storage collectors
pub mod collectors;

/// Metrics exposition endpoint
pub mod server;

// Re-export commonly used types
pub use collectors::{Collector, EphemeralStorage, RecordSource, VolumeStorage};
pub use context::ExporterContext;
pub use error::{CollectorError, ConfigError, ContextError, RegistryError};
