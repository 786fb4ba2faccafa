/// Shared Prometheus registry with publish/render serialization
pub mod registry;

/// Gauge tables for one collector and the reset-then-populate protocol
pub mod sink;

pub use registry::MetricsRegistry;
pub use sink::MetricSink;

use crate::snapshot::StorageUsage;

/// Gauge kinds every storage family exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeKind {
    Used,
    Capacity,
    Available,
}

impl GaugeKind {
    pub const ALL: [GaugeKind; 3] = [GaugeKind::Used, GaugeKind::Capacity, GaugeKind::Available];

    fn suffix(self) -> &'static str {
        match self {
            GaugeKind::Used => "usage",
            GaugeKind::Capacity => "capacity",
            GaugeKind::Available => "available",
        }
    }

    fn help_verb(self) -> &'static str {
        match self {
            GaugeKind::Used => "Used",
            GaugeKind::Capacity => "Capacity",
            GaugeKind::Available => "Available",
        }
    }
}

/// Naming and label layout of one used/capacity/available gauge family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaugeFamily {
    /// Metric name prefix, e.g. `ephemeral_storage_pod`
    pub prefix: &'static str,
    /// Human readable storage kind used in help texts
    pub subject: &'static str,
    /// Label names, in the order record label values are given
    pub labels: &'static [&'static str],
}

impl GaugeFamily {
    pub fn metric_name(&self, kind: GaugeKind) -> String {
        format!("{}_{}", self.prefix, kind.suffix())
    }

    pub fn help(&self, kind: GaugeKind) -> String {
        format!("{} to expose {} metrics for pod", kind.help_verb(), self.subject)
    }
}

/// One flat, fully labeled data point derived from a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    /// Label values in the family's label order
    pub labels: Vec<String>,
    pub usage: StorageUsage,
}

impl MetricRecord {
    pub fn new(labels: Vec<String>, usage: StorageUsage) -> Self {
        Self { labels, usage }
    }

    pub fn value(&self, kind: GaugeKind) -> f64 {
        match kind {
            GaugeKind::Used => self.usage.used,
            GaugeKind::Capacity => self.usage.capacity,
            GaugeKind::Available => self.usage.available,
        }
    }
}
