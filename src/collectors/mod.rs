/// Drift-compensated scheduling loop
pub mod scheduler;

/// Generic fetch, transform and publish pipeline
pub mod collector;

/// Ephemeral pod storage records
pub mod ephemeral;

/// PVC-backed volume storage records
pub mod volume;

pub use collector::{Collector, RecordSource};
pub use ephemeral::EphemeralStorage;
pub use scheduler::Scheduler;
pub use volume::VolumeStorage;

/// Value of the `job` label on every exported series
pub const JOB_NAME: &str = "kubernetes-storage-metrics";
