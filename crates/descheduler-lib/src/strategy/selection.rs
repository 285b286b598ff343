//! Decision rule and eviction candidate selection

use super::ports::pod_priority;
use crate::config::PodSelection;
use crate::models::{Metric, NodeMetrics};
use k8s_openapi::api::core::v1::Pod;

/// First `Memory`/`Latest` metric, in listing order, whose value exceeds `target`
pub fn find_violation(node: &NodeMetrics, target: f64) -> Option<&Metric> {
    node.metrics
        .iter()
        .find(|metric| metric.is_latest_memory() && metric.value > target)
}

/// Pick the pod to evict from the evictable pods of an over-utilized node
pub fn select_pod(pods: &[Pod], selection: PodSelection) -> Option<&Pod> {
    match selection {
        PodSelection::ListingIndex(index) => pods.get(index),
        // min_by_key keeps the first of equal elements
        PodSelection::LowestPriority => pods.iter().min_by_key(|pod| pod_priority(pod)),
    }
}
