use crate::collectors::{RecordSource, JOB_NAME};
use crate::metrics::{GaugeFamily, MetricRecord};
use crate::snapshot::StorageSnapshot;
use log::{debug, warn};

/// Projects each PVC-backed volume of each pod into one record
///
/// Volumes without a claim reference (config maps, projected tokens,
/// emptyDirs) are skipped silently.
#[derive(Debug, Default, Clone, Copy)]
pub struct VolumeStorage;

impl RecordSource for VolumeStorage {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn family(&self) -> GaugeFamily {
        GaugeFamily {
            prefix: "volume_storage_pod",
            subject: "Volume Storage",
            labels: &["job", "pod", "namespace", "node", "volume_name", "pvc_name"],
        }
    }

    fn records(&self, snapshot: &StorageSnapshot) -> Vec<MetricRecord> {
        let node = snapshot.node_name();
        let mut records = Vec::new();

        for pod in &snapshot.pods {
            let name = &pod.pod_ref.name;
            let namespace = &pod.pod_ref.namespace;

            for volume in &pod.volumes {
                let Some(pvc_name) = volume.pvc_name() else {
                    continue;
                };

                if namespace.is_empty() || volume.usage.is_unreported() {
                    warn!(
                        "pod {}/{} on {} has no metrics on its pvcRef storage usage",
                        name, namespace, node
                    );
                }
                debug!(
                    "pod {}/{} on {} volume {} (pvc {}) with usedBytes: {}",
                    namespace, name, node, volume.name, pvc_name, volume.usage.used
                );

                records.push(MetricRecord::new(
                    vec![
                        JOB_NAME.to_string(),
                        name.clone(),
                        namespace.clone(),
                        node.to_string(),
                        volume.name.clone(),
                        pvc_name.to_string(),
                    ],
                    volume.usage,
                ));
            }
        }

        records
    }
}
