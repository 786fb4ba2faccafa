//! Stats summary payload types
//!
//! This module models the subset of the node stats summary document that the
//! exporter reads: the node name and, per pod, its ephemeral storage usage and
//! its volume usage. Every field is optional on the wire: a missing field or an
//! explicit `null` decodes to the zero value, so partially reported pods still
//! decode.

use crate::error::CollectorError;
use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Byte counters reported for one storage target
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageUsage {
    #[serde(rename = "usedBytes", deserialize_with = "null_as_default")]
    pub used: f64,
    #[serde(rename = "capacityBytes", deserialize_with = "null_as_default")]
    pub capacity: f64,
    #[serde(rename = "availableBytes", deserialize_with = "null_as_default")]
    pub available: f64,
}

impl StorageUsage {
    pub fn new(used: f64, capacity: f64, available: f64) -> Self {
        Self {
            used,
            capacity,
            available,
        }
    }

    /// True when the kubelet has not reported any numbers yet
    pub fn is_unreported(&self) -> bool {
        self.used == 0.0 && self.capacity == 0.0 && self.available == 0.0
    }
}

/// One decoded stats summary for a single node at a single point in time
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSnapshot {
    #[serde(deserialize_with = "null_as_default")]
    pub node: NodeRef,
    #[serde(deserialize_with = "null_as_default")]
    pub pods: Vec<PodEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeRef {
    #[serde(rename = "nodeName", deserialize_with = "null_as_default")]
    pub node_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PodRef {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub namespace: String,
}

/// Per-pod storage stats
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PodEntry {
    #[serde(rename = "podRef", deserialize_with = "null_as_default")]
    pub pod_ref: PodRef,
    #[serde(rename = "ephemeral-storage", deserialize_with = "null_as_default")]
    pub ephemeral_storage: StorageUsage,
    #[serde(rename = "volume", deserialize_with = "null_as_default")]
    pub volumes: Vec<VolumeEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PvcRef {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

/// Usage of one volume mounted into a pod
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VolumeEntry {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "pvcRef", skip_serializing_if = "Option::is_none")]
    pub pvc_ref: Option<PvcRef>,
    #[serde(flatten)]
    pub usage: StorageUsage,
}

impl VolumeEntry {
    /// Name of the backing claim, `None` when the volume is not PVC-backed
    pub fn pvc_name(&self) -> Option<&str> {
        self.pvc_ref
            .as_ref()
            .map(|pvc| pvc.name.as_str())
            .filter(|name| !name.is_empty())
    }
}

impl StorageSnapshot {
    /// Decode a raw stats summary payload
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::DecodeFailed` if the payload is not a valid
    /// stats document.
    pub fn from_slice(payload: &[u8]) -> Result<Self, CollectorError> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn node_name(&self) -> &str {
        &self.node.node_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = r#"{
        "node": { "nodeName": "worker-1", "cpu": { "usageNanoCores": 12 } },
        "pods": [
            {
                "podRef": { "name": "web-0", "namespace": "shop", "uid": "abc" },
                "ephemeral-storage": { "availableBytes": 900, "capacityBytes": 1000, "usedBytes": 100 },
                "volume": [
                    { "name": "data", "pvcRef": { "name": "data-web-0", "namespace": "shop" },
                      "availableBytes": 50, "capacityBytes": 80, "usedBytes": 30 },
                    { "name": "kube-api-access", "availableBytes": 1, "capacityBytes": 2, "usedBytes": 1 }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_decode_full_summary() {
        let snapshot = StorageSnapshot::from_slice(SUMMARY.as_bytes()).unwrap();

        assert_eq!(snapshot.node_name(), "worker-1");
        assert_eq!(snapshot.pods.len(), 1);

        let pod = &snapshot.pods[0];
        assert_eq!(pod.pod_ref.name, "web-0");
        assert_eq!(pod.pod_ref.namespace, "shop");
        assert_eq!(pod.ephemeral_storage, StorageUsage::new(100.0, 1000.0, 900.0));

        assert_eq!(pod.volumes.len(), 2);
        assert_eq!(pod.volumes[0].pvc_name(), Some("data-web-0"));
        assert_eq!(pod.volumes[0].usage, StorageUsage::new(30.0, 80.0, 50.0));
        assert_eq!(pod.volumes[1].pvc_name(), None);
    }

    #[test]
    fn test_missing_sections_default_to_zero() {
        let payload = br#"{ "node": { "nodeName": "n1" }, "pods": [ { "podRef": { "name": "a" } } ] }"#;
        let snapshot = StorageSnapshot::from_slice(payload).unwrap();

        let pod = &snapshot.pods[0];
        assert_eq!(pod.pod_ref.namespace, "");
        assert!(pod.ephemeral_storage.is_unreported());
        assert!(pod.volumes.is_empty());
    }

    #[test]
    fn test_null_sections_decode_as_zero_values() {
        let payload = br#"{
            "node": { "nodeName": "n1" },
            "pods": [
                { "podRef": { "name": "a", "namespace": "ns" },
                  "ephemeral-storage": { "usedBytes": 1, "capacityBytes": 2, "availableBytes": 1 },
                  "volume": null },
                { "podRef": null, "ephemeral-storage": null },
                { "podRef": { "name": "c", "namespace": null },
                  "volume": [ { "name": "data", "pvcRef": null, "usedBytes": null } ] }
            ]
        }"#;
        let snapshot = StorageSnapshot::from_slice(payload).unwrap();

        assert_eq!(snapshot.pods.len(), 3);
        assert!(snapshot.pods[0].volumes.is_empty());
        assert_eq!(
            snapshot.pods[0].ephemeral_storage,
            StorageUsage::new(1.0, 2.0, 1.0)
        );
        assert_eq!(snapshot.pods[1].pod_ref, PodRef::default());
        assert!(snapshot.pods[1].ephemeral_storage.is_unreported());
        assert_eq!(snapshot.pods[2].pod_ref.namespace, "");
        assert_eq!(snapshot.pods[2].volumes[0].pvc_name(), None);
        assert!(snapshot.pods[2].volumes[0].usage.is_unreported());
    }

    #[test]
    fn test_null_pods_is_empty_snapshot() {
        let snapshot = StorageSnapshot::from_slice(br#"{ "node": null, "pods": null }"#).unwrap();
        assert_eq!(snapshot, StorageSnapshot::default());
    }

    #[test]
    fn test_empty_pvc_name_is_not_a_claim() {
        let volume = VolumeEntry {
            name: "scratch".to_string(),
            pvc_ref: Some(PvcRef {
                name: String::new(),
            }),
            usage: StorageUsage::default(),
        };
        assert_eq!(volume.pvc_name(), None);
    }

    #[test]
    fn test_malformed_payload_is_decode_failure() {
        for payload in [&b""[..], &b"not json"[..], &b"{\"pods\": 7}"[..]] {
            match StorageSnapshot::from_slice(payload) {
                Err(CollectorError::DecodeFailed(_)) => {}
                other => panic!("expected DecodeFailed, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_default_snapshot_is_empty() {
        let snapshot = StorageSnapshot::default();
        assert_eq!(snapshot.node_name(), "");
        assert!(snapshot.pods.is_empty());
    }

    #[test]
    fn test_usage_unreported() {
        assert!(StorageUsage::new(0.0, 0.0, 0.0).is_unreported());
        assert!(!StorageUsage::new(0.0, 10.0, 0.0).is_unreported());
    }
}
