//! Pod eviction through the Eviction subresource

use super::evictable::{is_evictable, EvictionOptions};
use crate::strategy::{EvictableFactory, EvictablePredicate, PodEvictor};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::EvictParams;
use kube::{Api, Client, ResourceExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Evicts pods and builds the evictable predicate for the current node set
pub struct KubePodEvictor {
    client: Client,
    nodes: Arc<Vec<Node>>,
    options: EvictionOptions,
    evicted_per_node: Mutex<HashMap<String, usize>>,
}

impl KubePodEvictor {
    pub fn new(client: Client, nodes: Vec<Node>, options: EvictionOptions) -> Self {
        Self {
            client,
            nodes: Arc::new(nodes),
            options,
            evicted_per_node: Mutex::new(HashMap::new()),
        }
    }

    /// Pods evicted on `node_name` so far
    pub fn node_evicted_count(&self, node_name: &str) -> usize {
        self.evicted_per_node
            .lock()
            .map(|counts| counts.get(node_name).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Pods evicted across all nodes so far
    pub fn total_evicted(&self) -> usize {
        self.evicted_per_node
            .lock()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }

    fn limit_reached(&self, node_name: &str) -> bool {
        self.options
            .max_pods_to_evict_per_node
            .is_some_and(|limit| self.node_evicted_count(node_name) >= limit)
    }

    fn record(&self, node_name: &str) {
        if let Ok(mut counts) = self.evicted_per_node.lock() {
            *counts.entry(node_name.to_string()).or_insert(0) += 1;
        }
    }
}

#[async_trait]
impl PodEvictor for KubePodEvictor {
    async fn evict_pod(&self, pod: &Pod, node: &Node, reason: &str) -> Result<()> {
        let node_name = node.name_any();
        let pod_name = pod.name_any();
        let namespace = pod.namespace().unwrap_or_else(|| "default".to_string());

        if self.limit_reached(&node_name) {
            bail!("maximum number of evicted pods per node reached on {node_name}");
        }

        if self.options.dry_run {
            info!(
                pod = %pod_name,
                namespace = %namespace,
                node = %node_name,
                reason = %reason,
                "Evicted pod in dry run mode"
            );
        } else {
            let pods: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);
            pods.evict(&pod_name, &EvictParams::default())
                .await
                .with_context(|| format!("Failed to evict pod {namespace}/{pod_name}"))?;
            info!(
                pod = %pod_name,
                namespace = %namespace,
                node = %node_name,
                reason = %reason,
                "Evicted pod"
            );
        }

        self.record(&node_name);
        Ok(())
    }
}

impl EvictableFactory for KubePodEvictor {
    fn evictable(&self, priority_threshold: i32, node_fit: bool) -> EvictablePredicate {
        let nodes = self.nodes.clone();
        let options = self.options.clone();
        Arc::new(move |pod: &Pod| is_evictable(pod, priority_threshold, node_fit, &nodes, &options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::PodSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

    /// Client pointed at a port nobody listens on; never used in dry-run mode
    fn offline_client() -> Client {
        let config = kube::Config::new("http://127.0.0.1:1".parse().unwrap());
        Client::try_from(config).unwrap()
    }

    fn node(name: &str) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn pod(name: &str, priority: i32) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                owner_references: Some(vec![OwnerReference {
                    kind: "ReplicaSet".to_string(),
                    name: "web".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            spec: Some(PodSpec {
                priority: Some(priority),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_dry_run_records_without_api_call() {
        let options = EvictionOptions {
            dry_run: true,
            ..Default::default()
        };
        let evictor = KubePodEvictor::new(offline_client(), vec![], options);

        evictor
            .evict_pod(&pod("web-0", 0), &node("node-a"), "RealNodeUtilization")
            .await
            .unwrap();

        assert_eq!(evictor.node_evicted_count("node-a"), 1);
        assert_eq!(evictor.node_evicted_count("node-b"), 0);
        assert_eq!(evictor.total_evicted(), 1);
    }

    #[tokio::test]
    async fn test_per_node_limit() {
        let options = EvictionOptions {
            dry_run: true,
            max_pods_to_evict_per_node: Some(1),
            ..Default::default()
        };
        let evictor = KubePodEvictor::new(offline_client(), vec![], options);
        let node_a = node("node-a");

        evictor.evict_pod(&pod("web-0", 0), &node_a, "test").await.unwrap();
        assert!(evictor.evict_pod(&pod("web-1", 0), &node_a, "test").await.is_err());
        evictor
            .evict_pod(&pod("web-2", 0), &node("node-b"), "test")
            .await
            .unwrap();

        assert_eq!(evictor.total_evicted(), 2);
    }

    #[tokio::test]
    async fn test_failed_eviction_is_not_recorded() {
        let evictor = KubePodEvictor::new(offline_client(), vec![], EvictionOptions::default());

        let result = evictor
            .evict_pod(&pod("web-0", 0), &node("node-a"), "test")
            .await;

        assert!(result.is_err());
        assert_eq!(evictor.total_evicted(), 0);
    }

    #[tokio::test]
    async fn test_evictable_predicate_uses_threshold() {
        let evictor = KubePodEvictor::new(offline_client(), vec![], EvictionOptions::default());
        let evictable = evictor.evictable(100, false);

        assert!(evictable(&pod("low", 10)));
        assert!(!evictable(&pod("high", 100)));
    }
}
