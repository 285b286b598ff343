//! Pod listing by node

use crate::strategy::{PodFilter, PodLister};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};
use tracing::debug;

/// Field selector for non-terminal pods bound to `node_name`
pub fn node_field_selector(node_name: &str) -> String {
    format!("spec.nodeName={node_name},status.phase!=Succeeded,status.phase!=Failed")
}

/// Lists pods through the API server
pub struct KubePodLister {
    client: Client,
}

impl KubePodLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodLister for KubePodLister {
    async fn list_pods_on_node(&self, node: &Node, filter: &PodFilter) -> Result<Vec<Pod>> {
        let node_name = node.name_any();
        let pods: Api<Pod> = Api::all(self.client.clone());
        let params = ListParams::default().fields(&node_field_selector(&node_name));

        let listed = pods
            .list(&params)
            .await
            .with_context(|| format!("Failed to list pods on node {node_name}"))?;

        let total = listed.items.len();
        let matching: Vec<Pod> = listed
            .items
            .into_iter()
            .filter(|pod| filter.matches(pod))
            .collect();

        debug!(
            node = %node_name,
            total,
            evictable = matching.len(),
            "Listed pods on node"
        );

        Ok(matching)
    }
}
