//! Self-monitoring metrics for the exporter
//!
//! Tracks the health of the collection loops themselves: how often a stats
//! payload could not be decoded, how long the last cycle took and how many
//! records it published. Registered once in the shared registry next to the
//! storage gauges.

use crate::error::RegistryError;
use crate::metrics::MetricsRegistry;
use log::debug;
use prometheus::{GaugeVec, IntCounterVec, IntGaugeVec, Opts};
use std::time::Duration;

/// Per-collector health metrics, labeled by collector name
#[derive(Clone)]
pub struct SelfMonitoring {
    decode_failures: IntCounterVec,
    cycle_duration: GaugeVec,
    published_records: IntGaugeVec,
}

impl SelfMonitoring {
    /// Create and register the self-monitoring metrics
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Prometheus` if registration fails, e.g. when
    /// called twice against the same registry.
    pub fn register(registry: &MetricsRegistry) -> Result<Self, RegistryError> {
        let labels = &["collector"];

        let decode_failures = registry.register(IntCounterVec::new(
            Opts::new(
                "storage_exporter_decode_failures_total",
                "Stats payloads that could not be decoded and were treated as empty",
            ),
            labels,
        )?)?;

        let cycle_duration = registry.register(GaugeVec::new(
            Opts::new(
                "storage_exporter_cycle_duration_seconds",
                "Duration of the last fetch, transform and publish cycle",
            ),
            labels,
        )?)?;

        let published_records = registry.register(IntGaugeVec::new(
            Opts::new(
                "storage_exporter_published_records",
                "Records published by the last cycle",
            ),
            labels,
        )?)?;

        Ok(Self {
            decode_failures,
            cycle_duration,
            published_records,
        })
    }

    pub fn record_decode_failure(&self, collector: &str) {
        self.decode_failures.with_label_values(&[collector]).inc();
    }

    pub fn record_cycle(&self, collector: &str, elapsed: Duration, records: usize) {
        debug!(
            "{} cycle finished in {:?} with {} records",
            collector, elapsed, records
        );
        self.cycle_duration
            .with_label_values(&[collector])
            .set(elapsed.as_secs_f64());
        self.published_records
            .with_label_values(&[collector])
            .set(i64::try_from(records).unwrap_or(i64::MAX));
    }

    pub fn decode_failures(&self, collector: &str) -> u64 {
        self.decode_failures.with_label_values(&[collector]).get()
    }

    pub fn published_records(&self, collector: &str) -> i64 {
        self.published_records.with_label_values(&[collector]).get()
    }
}
