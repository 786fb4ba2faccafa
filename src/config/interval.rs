use log::warn;
use std::time::Duration;

/// Interval used when the configured scrape duration is missing or invalid
pub const DEFAULT_SCRAPE_INTERVAL: Duration = Duration::from_secs(15);

/// Parse a scrape duration such as `15s`, `1m30s` or `500ms`
///
/// A value that does not parse falls back to `DEFAULT_SCRAPE_INTERVAL` with a
/// warning; the exporter keeps running either way.
pub fn parse_scrape_interval(value: &str) -> Duration {
    match humantime::parse_duration(value.trim()) {
        Ok(interval) if !interval.is_zero() => interval,
        Ok(_) => {
            warn!("SCRAPE_DURATION must be positive, using default 15s");
            DEFAULT_SCRAPE_INTERVAL
        }
        Err(e) => {
            warn!(
                "Invalid SCRAPE_DURATION '{}', using default 15s ({})",
                value, e
            );
            DEFAULT_SCRAPE_INTERVAL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_common_durations() {
        assert_eq!(parse_scrape_interval("15s"), Duration::from_secs(15));
        assert_eq!(parse_scrape_interval("1m30s"), Duration::from_secs(90));
        assert_eq!(parse_scrape_interval("500ms"), Duration::from_millis(500));
        assert_eq!(parse_scrape_interval(" 2m "), Duration::from_secs(120));
    }

    #[test]
    fn test_invalid_duration_falls_back() {
        assert_eq!(parse_scrape_interval(""), DEFAULT_SCRAPE_INTERVAL);
        assert_eq!(parse_scrape_interval("soon"), DEFAULT_SCRAPE_INTERVAL);
        assert_eq!(parse_scrape_interval("15"), DEFAULT_SCRAPE_INTERVAL);
        assert_eq!(parse_scrape_interval("0s"), DEFAULT_SCRAPE_INTERVAL);
        assert_eq!(parse_scrape_interval("-5s"), DEFAULT_SCRAPE_INTERVAL);
    }
}
