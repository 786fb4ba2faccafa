/// Exporter settings and file loading
#[allow(clippy::module_inception)]
pub mod config;

/// Scrape interval parsing with fallback
pub mod interval;

/// Log verbosity parsing
pub mod logging;

pub use config::Config;
pub use interval::{parse_scrape_interval, DEFAULT_SCRAPE_INTERVAL};
pub use logging::parse_log_level;
