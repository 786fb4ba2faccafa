use crate::collectors::Scheduler;
use crate::context::ExporterContext;
use crate::error::{CollectorError, RegistryError};
use crate::fetcher::{FetchFailurePolicy, StatsFetcher};
use crate::metrics::{GaugeFamily, MetricRecord, MetricSink};
use crate::monitoring::SelfMonitoring;
use crate::snapshot::StorageSnapshot;
use log::{debug, info, warn};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Strategy that turns a snapshot into the records of one gauge family
pub trait RecordSource: Send + 'static {
    /// Short collector name used in logs, thread names and self-metrics
    fn name(&self) -> &'static str;

    /// Names, help texts and label layout of the exported gauges
    fn family(&self) -> GaugeFamily;

    /// Project a snapshot into records; pure, no memory of earlier snapshots
    fn records(&self, snapshot: &StorageSnapshot) -> Vec<MetricRecord>;
}

/// One independently scheduled fetch, transform and publish pipeline
///
/// A cycle fetches the node stats, decodes them (an undecodable payload
/// counts as an empty snapshot), projects them through the `RecordSource`
/// and replaces the sink's series with the result.
pub struct Collector<S: RecordSource> {
    source: S,
    fetcher: Box<dyn StatsFetcher>,
    sink: MetricSink,
    monitoring: SelfMonitoring,
    scheduler: Scheduler,
    policy: FetchFailurePolicy,
}

impl<S: RecordSource> Collector<S> {
    /// Create a collector fetching from the context's node endpoint
    ///
    /// Registers the source's gauges in the context's registry; the collector
    /// does nothing until `run` or `spawn` is called.
    ///
    /// # Arguments
    ///
    /// * `context` - Shared registry, HTTP client, node and interval settings
    /// * `source` - Projection from snapshots to records (e.g., `EphemeralStorage`)
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use storage_exporter::config::Config;
    /// use storage_exporter::fetcher::ApiEndpoint;
    /// use storage_exporter::{Collector, EphemeralStorage, ExporterContext};
    ///
    /// let config = Config::default();
    /// let context = ExporterContext::new(&config, ApiEndpoint::local("http://127.0.0.1:8001")).unwrap();
    /// let collector = Collector::new(&context, EphemeralStorage).unwrap();
    /// let handle = collector.spawn().unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Prometheus` if the source's gauges are already
    /// registered.
    pub fn new(context: &ExporterContext, source: S) -> Result<Self, RegistryError> {
        let fetcher = Box::new(context.fetcher());
        Self::with_fetcher(context, source, fetcher)
    }

    /// Create a collector with an explicit stats fetcher
    pub fn with_fetcher(
        context: &ExporterContext,
        source: S,
        fetcher: Box<dyn StatsFetcher>,
    ) -> Result<Self, RegistryError> {
        let sink = MetricSink::register(context.registry.clone(), source.family())?;
        Ok(Self {
            source,
            fetcher,
            sink,
            monitoring: context.monitoring.clone(),
            scheduler: Scheduler::new(context.scrape_interval),
            policy: context.fetch_failure_policy,
        })
    }

    pub fn name(&self) -> &'static str {
        self.source.name()
    }

    pub fn sink(&self) -> &MetricSink {
        &self.sink
    }

    /// Run a single cycle
    ///
    /// Returns the number of records published.
    ///
    /// # Errors
    ///
    /// Returns the fetch error unchanged; the exposed series are left as they
    /// were. Decode failures are not errors.
    pub fn run_cycle(&self) -> Result<usize, CollectorError> {
        let started = Instant::now();

        let payload = self.fetcher.fetch()?;
        let snapshot = self.decode(&payload);
        let records = self.source.records(&snapshot);
        let published = self.sink.replace(&records);

        self.monitoring
            .record_cycle(self.name(), started.elapsed(), published);
        Ok(published)
    }

    fn decode(&self, payload: &[u8]) -> StorageSnapshot {
        match StorageSnapshot::from_slice(payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "{} collector: discarding undecodable stats payload ({} bytes): {}",
                    self.name(),
                    payload.len(),
                    e
                );
                self.monitoring.record_decode_failure(self.name());
                StorageSnapshot::default()
            }
        }
    }

    /// Run cycles forever on the current thread
    pub fn run(self) -> ! {
        info!(
            "Starting {} storage metrics collection every {:?}",
            self.name(),
            self.scheduler.interval()
        );
        let scheduler = self.scheduler;
        scheduler.run(|| match self.run_cycle() {
            Ok(published) => debug!("{} collector published {} records", self.name(), published),
            Err(e) => self.policy.handle(self.name(), &e),
        })
    }

    /// Move the collector onto its own named thread
    pub fn spawn(self) -> Result<JoinHandle<()>, CollectorError> {
        let thread_name = format!("{}-collector", self.name());
        debug!("Spawning {} thread", thread_name);
        let handle: JoinHandle<()> = thread::Builder::new()
            .name(thread_name)
            .spawn(move || self.run())?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::{EphemeralStorage, VolumeStorage, JOB_NAME};
    use crate::config::Config;
    use crate::fetcher::{ApiEndpoint, MockStatsFetcher};
    use crate::metrics::GaugeKind;
    use prometheus::proto::MetricFamily;
    use std::collections::BTreeMap;

    const SCENARIO: &str = r#"{
        "node": { "nodeName": "n1" },
        "pods": [
            { "podRef": { "name": "a", "namespace": "ns" },
              "ephemeral-storage": { "usedBytes": 100, "capacityBytes": 1000, "availableBytes": 900 } }
        ]
    }"#;

    fn context() -> ExporterContext {
        let config = Config {
            node_name: "n1".to_string(),
            in_cluster: false,
            ..Config::default()
        };
        ExporterContext::new(&config, ApiEndpoint::local("http://127.0.0.1:1")).unwrap()
    }

    fn fetcher_returning(payloads: Vec<&'static str>) -> Box<MockStatsFetcher> {
        let mut fetcher = MockStatsFetcher::new();
        let mut payloads = payloads.into_iter();
        fetcher
            .expect_fetch()
            .returning(move || Ok(payloads.next().unwrap_or_default().as_bytes().to_vec()));
        Box::new(fetcher)
    }

    /// All series of `name` as `labels -> value`
    fn series(families: &[MetricFamily], name: &str) -> Vec<(BTreeMap<String, String>, f64)> {
        families
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric())
            .map(|metric| {
                let labels = metric
                    .get_label()
                    .iter()
                    .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
                    .collect();
                (labels, metric.get_gauge().get_value())
            })
            .collect()
    }

    #[test]
    fn test_scenario_publishes_one_series_per_metric() {
        let context = context();
        let collector =
            Collector::with_fetcher(&context, EphemeralStorage, fetcher_returning(vec![SCENARIO]))
                .unwrap();

        assert_eq!(collector.run_cycle().unwrap(), 1);

        let families = context.registry.gather();
        let expected_labels: BTreeMap<String, String> = [
            ("job", JOB_NAME),
            ("pod", "a"),
            ("namespace", "ns"),
            ("node", "n1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        for (name, value) in [
            ("ephemeral_storage_pod_usage", 100.0),
            ("ephemeral_storage_pod_capacity", 1000.0),
            ("ephemeral_storage_pod_available", 900.0),
        ] {
            let found = series(&families, name);
            assert_eq!(found.len(), 1, "{}", name);
            assert_eq!(found[0].0, expected_labels);
            assert_eq!(found[0].1, value);
        }
    }

    #[test]
    fn test_removed_pod_disappears_next_cycle() {
        let context = context();
        let second = r#"{ "node": { "nodeName": "n1" }, "pods": [
            { "podRef": { "name": "b", "namespace": "ns" },
              "ephemeral-storage": { "usedBytes": 1, "capacityBytes": 2, "availableBytes": 1 } } ] }"#;
        let collector = Collector::with_fetcher(
            &context,
            EphemeralStorage,
            fetcher_returning(vec![SCENARIO, second]),
        )
        .unwrap();

        collector.run_cycle().unwrap();
        collector.run_cycle().unwrap();

        let families = context.registry.gather();
        for name in [
            "ephemeral_storage_pod_usage",
            "ephemeral_storage_pod_capacity",
            "ephemeral_storage_pod_available",
        ] {
            let pods: Vec<String> = series(&families, name)
                .into_iter()
                .map(|(labels, _)| labels["pod"].clone())
                .collect();
            assert_eq!(pods, vec!["b".to_string()], "{}", name);
        }
    }

    #[test]
    fn test_malformed_payload_empties_tables() {
        let context = context();
        let collector = Collector::with_fetcher(
            &context,
            EphemeralStorage,
            fetcher_returning(vec![SCENARIO, "{ not json", ""]),
        )
        .unwrap();

        assert_eq!(collector.run_cycle().unwrap(), 1);
        assert_eq!(collector.run_cycle().unwrap(), 0);
        for kind in GaugeKind::ALL {
            assert_eq!(collector.sink().series_count(kind), 0);
        }

        assert_eq!(collector.run_cycle().unwrap(), 0);
        assert_eq!(context.monitoring.decode_failures("ephemeral"), 2);
    }

    #[test]
    fn test_volume_collector_filters_unclaimed_volumes() {
        let context = context();
        let payload = r#"{ "node": { "nodeName": "n1" }, "pods": [
            { "podRef": { "name": "db-0", "namespace": "ns" },
              "volume": [
                { "name": "data", "pvcRef": { "name": "data-db-0" },
                  "usedBytes": 30, "capacityBytes": 80, "availableBytes": 50 },
                { "name": "tmp", "usedBytes": 1, "capacityBytes": 2, "availableBytes": 1 }
              ] } ] }"#;
        let collector =
            Collector::with_fetcher(&context, VolumeStorage, fetcher_returning(vec![payload]))
                .unwrap();

        assert_eq!(collector.run_cycle().unwrap(), 1);

        let families = context.registry.gather();
        for (name, value) in [
            ("volume_storage_pod_usage", 30.0),
            ("volume_storage_pod_capacity", 80.0),
            ("volume_storage_pod_available", 50.0),
        ] {
            let found = series(&families, name);
            assert_eq!(found.len(), 1, "{}", name);
            assert_eq!(found[0].0["volume_name"], "data");
            assert_eq!(found[0].0["pvc_name"], "data-db-0");
            assert_eq!(found[0].1, value);
        }
    }

    #[test]
    fn test_null_volume_section_keeps_ephemeral_metrics() {
        let context = context();
        let payload = r#"{ "node": { "nodeName": "n1" }, "pods": [
            { "podRef": { "name": "a", "namespace": "ns" },
              "ephemeral-storage": { "usedBytes": 1, "capacityBytes": 2, "availableBytes": 1 },
              "volume": null },
            { "podRef": { "name": "b", "namespace": "ns" },
              "ephemeral-storage": { "usedBytes": 3, "capacityBytes": 4, "availableBytes": 1 } } ] }"#;
        let collector =
            Collector::with_fetcher(&context, EphemeralStorage, fetcher_returning(vec![payload]))
                .unwrap();

        assert_eq!(collector.run_cycle().unwrap(), 2);
        assert_eq!(context.monitoring.decode_failures("ephemeral"), 0);

        let mut pods: Vec<String> =
            series(&context.registry.gather(), "ephemeral_storage_pod_usage")
                .into_iter()
                .map(|(labels, _)| labels["pod"].clone())
                .collect();
        pods.sort();
        assert_eq!(pods, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_fetch_error_keeps_previous_series() {
        let context = context();
        let mut fetcher = MockStatsFetcher::new();
        let mut calls = 0;
        fetcher.expect_fetch().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(SCENARIO.as_bytes().to_vec())
            } else {
                Err(CollectorError::HttpStatus {
                    status: 500,
                    url: "http://node/stats".to_string(),
                })
            }
        });
        let collector =
            Collector::with_fetcher(&context, EphemeralStorage, Box::new(fetcher)).unwrap();

        collector.run_cycle().unwrap();
        assert!(matches!(
            collector.run_cycle(),
            Err(CollectorError::HttpStatus { status: 500, .. })
        ));
        assert_eq!(collector.sink().series_count(GaugeKind::Used), 1);
    }

    #[test]
    fn test_collectors_share_one_registry() {
        let context = context();
        let ephemeral =
            Collector::with_fetcher(&context, EphemeralStorage, fetcher_returning(vec![SCENARIO]))
                .unwrap();
        let volume =
            Collector::with_fetcher(&context, VolumeStorage, fetcher_returning(vec![SCENARIO]))
                .unwrap();

        ephemeral.run_cycle().unwrap();
        volume.run_cycle().unwrap();

        assert_eq!(context.monitoring.published_records("ephemeral"), 1);
        assert_eq!(context.monitoring.published_records("volume"), 0);
    }

    #[test]
    fn test_same_source_cannot_register_twice() {
        let context = context();
        Collector::with_fetcher(&context, VolumeStorage, fetcher_returning(vec![])).unwrap();

        let again = Collector::with_fetcher(&context, VolumeStorage, fetcher_returning(vec![]));
        assert!(again.is_err());
    }
}
