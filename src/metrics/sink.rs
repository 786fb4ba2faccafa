use crate::error::RegistryError;
use crate::metrics::{GaugeFamily, GaugeKind, MetricRecord, MetricsRegistry};
use log::error;
use prometheus::core::Collector;
use prometheus::{GaugeVec, Opts};
use std::sync::Arc;

/// Currently exposed used/capacity/available tables for one collector
///
/// Each cycle the three tables are cleared in full and then filled from the
/// new snapshot's records. Full reset is the only eviction mechanism: a pod or
/// volume that disappears from the snapshot disappears from the tables.
pub struct MetricSink {
    registry: Arc<MetricsRegistry>,
    family: GaugeFamily,
    used: GaugeVec,
    capacity: GaugeVec,
    available: GaugeVec,
}

impl MetricSink {
    /// Create the three gauge tables of `family` and register them
    ///
    /// # Arguments
    ///
    /// * `registry` - Shared registry the tables are exposed through
    /// * `family` - Metric name prefix, help subject and label layout
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use storage_exporter::collectors::{EphemeralStorage, RecordSource};
    /// use storage_exporter::metrics::{MetricSink, MetricsRegistry};
    ///
    /// let registry = Arc::new(MetricsRegistry::new());
    /// let sink = MetricSink::register(registry, EphemeralStorage.family()).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Prometheus` if any of the metric names is
    /// already registered or the family's label names are invalid.
    pub fn register(
        registry: Arc<MetricsRegistry>,
        family: GaugeFamily,
    ) -> Result<Self, RegistryError> {
        let gauge = |kind: GaugeKind| -> Result<GaugeVec, RegistryError> {
            let opts = Opts::new(family.metric_name(kind), family.help(kind));
            registry.register(GaugeVec::new(opts, family.labels)?)
        };

        let used = gauge(GaugeKind::Used)?;
        let capacity = gauge(GaugeKind::Capacity)?;
        let available = gauge(GaugeKind::Available)?;

        Ok(Self {
            registry,
            family,
            used,
            capacity,
            available,
        })
    }

    fn table(&self, kind: GaugeKind) -> &GaugeVec {
        match kind {
            GaugeKind::Used => &self.used,
            GaugeKind::Capacity => &self.capacity,
            GaugeKind::Available => &self.available,
        }
    }

    /// Replace every exposed series with `records` as one publish
    ///
    /// Returns the number of records written. Duplicate label tuples
    /// overwrite each other, the last one wins.
    pub fn replace(&self, records: &[MetricRecord]) -> usize {
        self.registry.publish(|| {
            self.reset();
            self.populate(records)
        })
    }

    fn reset(&self) {
        for kind in GaugeKind::ALL {
            self.table(kind).reset();
        }
    }

    fn populate(&self, records: &[MetricRecord]) -> usize {
        let mut written = 0;
        for record in records {
            let values: Vec<&str> = record.labels.iter().map(String::as_str).collect();
            let mut complete = true;
            for kind in GaugeKind::ALL {
                match self.table(kind).get_metric_with_label_values(&values) {
                    Ok(gauge) => gauge.set(record.value(kind)),
                    Err(e) => {
                        error!(
                            "Dropping record {:?} for {}: {}",
                            record.labels,
                            self.family.metric_name(kind),
                            e
                        );
                        complete = false;
                    }
                }
            }
            if complete {
                written += 1;
            }
        }
        written
    }

    /// Number of label sets currently held in the given table
    pub fn series_count(&self, kind: GaugeKind) -> usize {
        self.table(kind)
            .collect()
            .iter()
            .map(|family| family.get_metric().len())
            .sum()
    }
}
