use crate::collectors::{RecordSource, JOB_NAME};
use crate::metrics::{GaugeFamily, MetricRecord};
use crate::snapshot::StorageSnapshot;
use log::{debug, warn};

/// Projects each pod's ephemeral storage into one record
///
/// Every pod yields a record, even when the kubelet has not reported numbers
/// for it yet; such pods only produce a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct EphemeralStorage;

impl RecordSource for EphemeralStorage {
    fn name(&self) -> &'static str {
        "ephemeral"
    }

    fn family(&self) -> GaugeFamily {
        GaugeFamily {
            prefix: "ephemeral_storage_pod",
            subject: "Ephemeral Storage",
            labels: &["job", "pod", "namespace", "node"],
        }
    }

    fn records(&self, snapshot: &StorageSnapshot) -> Vec<MetricRecord> {
        let node = snapshot.node_name();

        snapshot
            .pods
            .iter()
            .map(|pod| {
                let name = &pod.pod_ref.name;
                let namespace = &pod.pod_ref.namespace;
                let usage = pod.ephemeral_storage;

                if namespace.is_empty() || usage.is_unreported() {
                    warn!(
                        "pod {}/{} on {} has no metrics on its ephemeral storage usage",
                        name, namespace, node
                    );
                }
                debug!(
                    "pod {}/{} on {} with usedBytes: {}",
                    namespace, name, node, usage.used
                );

                MetricRecord::new(
                    vec![
                        JOB_NAME.to_string(),
                        name.clone(),
                        namespace.clone(),
                        node.to_string(),
                    ],
                    usage,
                )
            })
            .collect()
    }
}
