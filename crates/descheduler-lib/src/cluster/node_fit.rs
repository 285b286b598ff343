//! Checks whether an evicted pod could land on another node

use k8s_openapi::api::core::v1::{Node, Pod, Taint, Toleration};
use kube::ResourceExt;

const EFFECT_NO_SCHEDULE: &str = "NoSchedule";
const EFFECT_NO_EXECUTE: &str = "NoExecute";

/// Node reports the Ready condition as True
pub fn is_node_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
        .unwrap_or(false)
}

fn is_unschedulable(node: &Node) -> bool {
    node.spec
        .as_ref()
        .and_then(|spec| spec.unschedulable)
        .unwrap_or(false)
}

fn matches_node_selector(pod: &Pod, node: &Node) -> bool {
    let Some(selector) = pod.spec.as_ref().and_then(|spec| spec.node_selector.as_ref()) else {
        return true;
    };
    let labels = node.labels();
    selector
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}

fn tolerates(toleration: &Toleration, taint: &Taint) -> bool {
    if let Some(effect) = toleration.effect.as_deref() {
        if !effect.is_empty() && effect != taint.effect {
            return false;
        }
    }

    let key = toleration.key.as_deref().unwrap_or("");
    let operator = toleration.operator.as_deref().unwrap_or("Equal");

    if key.is_empty() {
        // An empty key with Exists tolerates every taint
        return operator == "Exists";
    }
    if key != taint.key {
        return false;
    }

    match operator {
        "Exists" => true,
        _ => toleration.value.as_deref().unwrap_or("") == taint.value.as_deref().unwrap_or(""),
    }
}

fn tolerates_node_taints(pod: &Pod, node: &Node) -> bool {
    let taints = node
        .spec
        .as_ref()
        .and_then(|spec| spec.taints.as_deref())
        .unwrap_or_default();
    let tolerations = pod
        .spec
        .as_ref()
        .and_then(|spec| spec.tolerations.as_deref())
        .unwrap_or_default();

    taints
        .iter()
        .filter(|taint| taint.effect == EFFECT_NO_SCHEDULE || taint.effect == EFFECT_NO_EXECUTE)
        .all(|taint| tolerations.iter().any(|t| tolerates(t, taint)))
}

/// Pod could be scheduled onto `node`
pub fn pod_fits_node(pod: &Pod, node: &Node) -> bool {
    is_node_ready(node)
        && !is_unschedulable(node)
        && matches_node_selector(pod, node)
        && tolerates_node_taints(pod, node)
}

/// Pod fits at least one node other than the one it runs on
pub fn pod_fits_any_other_node(pod: &Pod, nodes: &[Node]) -> bool {
    let current = pod.spec.as_ref().and_then(|spec| spec.node_name.as_deref());

    nodes
        .iter()
        .filter(|node| node.metadata.name.as_deref() != current)
        .any(|node| pod_fits_node(pod, node))
}
