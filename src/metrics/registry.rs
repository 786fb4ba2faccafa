use crate::error::RegistryError;
use log::debug;
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::{PoisonError, RwLock};

/// Process-wide metrics registry shared by collectors and the exposition endpoint
///
/// Wraps a Prometheus `Registry` and serializes whole-cycle publishes against
/// renders: a collector replacing its series holds the write side, a scrape
/// holds the read side. A scrape therefore always sees either the previous or
/// the next complete cycle, never a cleared or half-populated table.
#[derive(Default)]
pub struct MetricsRegistry {
    registry: Registry,
    publish_lock: RwLock<()>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric collector and hand back a clone for updating it
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Prometheus` if a metric with the same name is
    /// already registered. Callers treat this as a startup programming error.
    pub fn register<C>(&self, collector: C) -> Result<C, RegistryError>
    where
        C: Collector + Clone + 'static,
    {
        self.registry.register(Box::new(collector.clone()))?;
        Ok(collector)
    }

    /// Run `update` while no render can observe the registry
    pub fn publish<T>(&self, update: impl FnOnce() -> T) -> T {
        let _guard = self
            .publish_lock
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        update()
    }

    /// Gather a consistent view of all registered metric families
    pub fn gather(&self) -> Vec<MetricFamily> {
        let _guard = self
            .publish_lock
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        self.registry.gather()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> Result<String, RegistryError> {
        let families = self.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        debug!(
            "Rendered {} metric families ({} bytes)",
            families.len(),
            buffer.len()
        );
        Ok(String::from_utf8(buffer)?)
    }
}
