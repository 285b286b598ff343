//! Eviction eligibility of pods

use super::node_fit::pod_fits_any_other_node;
use crate::strategy::pod_priority;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Pods carrying this annotation are always evictable
pub const EVICT_ANNOTATION: &str = "descheduler.alpha.kubernetes.io/evict";

const MIRROR_ANNOTATION: &str = "kubernetes.io/config.mirror";
const CONFIG_SOURCE_ANNOTATION: &str = "kubernetes.io/config.source";

/// Evictor-wide knobs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvictionOptions {
    /// Log evictions instead of performing them
    pub dry_run: bool,
    /// Allow evicting pods that use emptyDir volumes
    pub evict_local_storage_pods: bool,
    /// Cap on evictions per node over the evictor's lifetime
    pub max_pods_to_evict_per_node: Option<usize>,
}

fn is_mirror_pod(pod: &Pod) -> bool {
    pod.annotations().contains_key(MIRROR_ANNOTATION)
}

fn is_static_pod(pod: &Pod) -> bool {
    pod.annotations()
        .get(CONFIG_SOURCE_ANNOTATION)
        .is_some_and(|source| source != "api")
}

fn is_daemonset_pod(pod: &Pod) -> bool {
    pod.owner_references()
        .iter()
        .any(|owner| owner.kind == "DaemonSet")
}

fn uses_local_storage(pod: &Pod) -> bool {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.volumes.as_ref())
        .is_some_and(|volumes| volumes.iter().any(|v| v.empty_dir.is_some()))
}

/// Reasons a pod may not be evicted; empty means evictable
fn blockers(
    pod: &Pod,
    priority_threshold: i32,
    node_fit: bool,
    nodes: &[Node],
    options: &EvictionOptions,
) -> Vec<&'static str> {
    let mut reasons = Vec::new();

    if pod.owner_references().is_empty() {
        reasons.push("pod does not have any owner references");
    }
    if is_daemonset_pod(pod) {
        reasons.push("pod is owned by a DaemonSet");
    }
    if is_mirror_pod(pod) {
        reasons.push("pod is a mirror pod");
    }
    if is_static_pod(pod) {
        reasons.push("pod is a static pod");
    }
    if pod_priority(pod) >= priority_threshold {
        reasons.push("pod priority is at or above the threshold");
    }
    if !options.evict_local_storage_pods && uses_local_storage(pod) {
        reasons.push("pod has local storage");
    }
    if node_fit && !pod_fits_any_other_node(pod, nodes) {
        reasons.push("pod does not fit on any other node");
    }

    reasons
}

/// Pod may be evicted under the given cutoff and node-fit setting
pub fn is_evictable(
    pod: &Pod,
    priority_threshold: i32,
    node_fit: bool,
    nodes: &[Node],
    options: &EvictionOptions,
) -> bool {
    if pod.annotations().contains_key(EVICT_ANNOTATION) {
        return true;
    }

    let reasons = blockers(pod, priority_threshold, node_fit, nodes, options);
    if !reasons.is_empty() {
        trace!(pod = %pod.name_any(), reasons = ?reasons, "Pod is not evictable");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{EmptyDirVolumeSource, PodSpec, Volume};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
    use std::collections::BTreeMap;

    fn owned_pod(kind: &str, priority: i32) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("web-0".to_string()),
                namespace: Some("default".to_string()),
                owner_references: Some(vec![OwnerReference {
                    kind: kind.to_string(),
                    name: "web".to_string(),
                    api_version: "apps/v1".to_string(),
                    uid: "uid-1".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            spec: Some(PodSpec {
                priority: Some(priority),
                node_name: Some("node-a".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn annotate(pod: &mut Pod, key: &str, value: &str) {
        pod.metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
    }

    const THRESHOLD: i32 = 1000;

    #[test]
    fn test_replicaset_pod_is_evictable() {
        let pod = owned_pod("ReplicaSet", 0);
        assert!(is_evictable(&pod, THRESHOLD, false, &[], &EvictionOptions::default()));
    }

    #[test]
    fn test_daemonset_pod_is_not_evictable() {
        let pod = owned_pod("DaemonSet", 0);
        assert!(!is_evictable(&pod, THRESHOLD, false, &[], &EvictionOptions::default()));
    }

    #[test]
    fn test_bare_pod_is_not_evictable() {
        let mut pod = owned_pod("ReplicaSet", 0);
        pod.metadata.owner_references = None;
        assert!(!is_evictable(&pod, THRESHOLD, false, &[], &EvictionOptions::default()));
    }

    #[test]
    fn test_priority_at_threshold_is_not_evictable() {
        let pod = owned_pod("ReplicaSet", THRESHOLD);
        assert!(!is_evictable(&pod, THRESHOLD, false, &[], &EvictionOptions::default()));

        let pod = owned_pod("ReplicaSet", THRESHOLD - 1);
        assert!(is_evictable(&pod, THRESHOLD, false, &[], &EvictionOptions::default()));
    }

    #[test]
    fn test_mirror_and_static_pods() {
        let mut mirror = owned_pod("ReplicaSet", 0);
        annotate(&mut mirror, MIRROR_ANNOTATION, "abc");
        assert!(!is_evictable(&mirror, THRESHOLD, false, &[], &EvictionOptions::default()));

        let mut static_pod = owned_pod("ReplicaSet", 0);
        annotate(&mut static_pod, CONFIG_SOURCE_ANNOTATION, "file");
        assert!(!is_evictable(&static_pod, THRESHOLD, false, &[], &EvictionOptions::default()));

        let mut api_pod = owned_pod("ReplicaSet", 0);
        annotate(&mut api_pod, CONFIG_SOURCE_ANNOTATION, "api");
        assert!(is_evictable(&api_pod, THRESHOLD, false, &[], &EvictionOptions::default()));
    }

    #[test]
    fn test_local_storage() {
        let mut pod = owned_pod("ReplicaSet", 0);
        pod.spec.as_mut().unwrap().volumes = Some(vec![Volume {
            name: "scratch".to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        }]);

        assert!(!is_evictable(&pod, THRESHOLD, false, &[], &EvictionOptions::default()));

        let options = EvictionOptions {
            evict_local_storage_pods: true,
            ..Default::default()
        };
        assert!(is_evictable(&pod, THRESHOLD, false, &[], &options));
    }

    #[test]
    fn test_node_fit_without_other_nodes() {
        let pod = owned_pod("ReplicaSet", 0);
        assert!(!is_evictable(&pod, THRESHOLD, true, &[], &EvictionOptions::default()));
    }

    #[test]
    fn test_evict_annotation_overrides_checks() {
        let mut pod = owned_pod("DaemonSet", THRESHOLD + 1);
        annotate(&mut pod, EVICT_ANNOTATION, "");
        assert!(is_evictable(&pod, THRESHOLD, true, &[], &EvictionOptions::default()));
    }
}
