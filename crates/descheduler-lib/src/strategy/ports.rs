//! Collaborator interfaces consumed by the strategy
//!
//! The strategy never talks to the cluster directly. Priority resolution,
//! pod listing, the evictable predicate and eviction itself are injected,
//! so tests can substitute in-memory fakes.

use crate::config::StrategyParams;
use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use std::sync::Arc;

/// Decides whether a pod may legally be evicted
pub type EvictablePredicate = Arc<dyn Fn(&Pod) -> bool + Send + Sync>;

/// Maps the configured priority threshold onto an effective cutoff
#[async_trait]
pub trait PriorityResolver: Send + Sync {
    async fn resolve(&self, params: &StrategyParams) -> Result<i32>;
}

/// Builds the evictable predicate for a run
pub trait EvictableFactory: Send + Sync {
    fn evictable(&self, priority_threshold: i32, node_fit: bool) -> EvictablePredicate;
}

/// Enumerates pods on a node subject to a filter
#[async_trait]
pub trait PodLister: Send + Sync {
    async fn list_pods_on_node(&self, node: &Node, filter: &PodFilter) -> Result<Vec<Pod>>;
}

/// Removes a pod from its node and records the eviction
#[async_trait]
pub trait PodEvictor: Send + Sync {
    async fn evict_pod(&self, pod: &Pod, node: &Node, reason: &str) -> Result<()>;
}

/// Filters applied when listing pods on a node
#[derive(Clone)]
pub struct PodFilter {
    pub evictable: EvictablePredicate,
    pub include_namespaces: Vec<String>,
    pub exclude_namespaces: Vec<String>,
}

impl PodFilter {
    pub fn new(evictable: EvictablePredicate) -> Self {
        Self {
            evictable,
            include_namespaces: Vec::new(),
            exclude_namespaces: Vec::new(),
        }
    }

    pub fn with_namespaces(mut self, include: &[String], exclude: &[String]) -> Self {
        self.include_namespaces = include.to_vec();
        self.exclude_namespaces = exclude.to_vec();
        self
    }

    /// Namespace filters first, then the evictable predicate
    pub fn matches(&self, pod: &Pod) -> bool {
        let namespace = pod.metadata.namespace.as_deref().unwrap_or("default");

        if !self.include_namespaces.is_empty()
            && !self.include_namespaces.iter().any(|ns| ns == namespace)
        {
            return false;
        }
        if self.exclude_namespaces.iter().any(|ns| ns == namespace) {
            return false;
        }

        (self.evictable)(pod)
    }
}

impl std::fmt::Debug for PodFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodFilter")
            .field("include_namespaces", &self.include_namespaces)
            .field("exclude_namespaces", &self.exclude_namespaces)
            .finish_non_exhaustive()
    }
}

/// Scheduling priority of a pod; unset priority counts as zero
pub fn pod_priority(pod: &Pod) -> i32 {
    pod.spec.as_ref().and_then(|spec| spec.priority).unwrap_or(0)
}
