//! Decision orchestrator for the RealNodeUtilization strategy
//!
//! One run validates the parameters, resolves the priority cutoff, fetches
//! a single metrics snapshot from the watcher and then walks the nodes in
//! the order given. A node whose `Memory`/`Latest` reading exceeds the
//! target gets at most one pod evicted.

use super::ports::{EvictableFactory, PodEvictor, PodFilter, PodLister, PriorityResolver};
use super::selection::{find_violation, select_pod};
use crate::config::{ConfigError, ListingErrorPolicy, StrategyParams};
use crate::models::NodeMetrics;
use crate::observability::{StrategyMetrics, StructuredLogger};
use crate::watcher::{WatcherClient, WatcherClientConfig, WatcherError};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::ResourceExt;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// Name of the strategy, also used as the eviction reason
pub const STRATEGY_NAME: &str = "RealNodeUtilization";

/// Conditions that abort a run
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("invalid RealNodeUtilization parameters: {0}")]
    InvalidParams(#[from] ConfigError),

    #[error("failed to get threshold priority from strategy's params: {0}")]
    PriorityResolution(#[source] anyhow::Error),

    #[error("failed to get metrics from watcher: {0}")]
    Watcher(#[from] WatcherError),

    #[error("failed to list pods on node {node}: {source}")]
    Listing {
        node: String,
        #[source]
        source: anyhow::Error,
    },
}

impl StrategyError {
    /// Short cause label for metrics and log fields
    pub fn reason(&self) -> &'static str {
        match self {
            StrategyError::InvalidParams(_) => "invalid_params",
            StrategyError::PriorityResolution(_) => "priority_resolution",
            StrategyError::Watcher(_) => "watcher",
            StrategyError::Listing { .. } => "listing",
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Nodes whose pods were listed successfully
    pub nodes_processed: usize,
    pub nodes_over_threshold: usize,
    pub evictions: usize,
    pub eviction_failures: usize,
    /// Over-threshold nodes where no pod could be chosen
    pub nodes_without_candidates: usize,
    /// Nodes passed over after a listing failure
    pub nodes_skipped: usize,
}

/// The RealNodeUtilization strategy with its injected collaborators
pub struct RealNodeUtilization {
    priority_resolver: Arc<dyn PriorityResolver>,
    evictable_factory: Arc<dyn EvictableFactory>,
    pod_lister: Arc<dyn PodLister>,
    pod_evictor: Arc<dyn PodEvictor>,
    metrics: StrategyMetrics,
    logger: StructuredLogger,
}

impl RealNodeUtilization {
    pub fn new(
        priority_resolver: Arc<dyn PriorityResolver>,
        evictable_factory: Arc<dyn EvictableFactory>,
        pod_lister: Arc<dyn PodLister>,
        pod_evictor: Arc<dyn PodEvictor>,
    ) -> Self {
        Self {
            priority_resolver,
            evictable_factory,
            pod_lister,
            pod_evictor,
            metrics: StrategyMetrics::new(),
            logger: StructuredLogger::new(STRATEGY_NAME),
        }
    }

    /// Run one decision pass. The outcome is only reported through logs,
    /// metrics and the pods actually evicted.
    pub async fn run(&self, params: &StrategyParams, nodes: &[Node]) {
        // try_run already logged the outcome
        let _ = self.try_run(params, nodes).await;
    }

    /// Run one decision pass and hand the outcome back to the caller
    pub async fn try_run(
        &self,
        params: &StrategyParams,
        nodes: &[Node],
    ) -> Result<RunSummary, StrategyError> {
        self.metrics.inc_runs();

        match self.execute(params, nodes).await {
            Ok(summary) => {
                self.metrics
                    .set_nodes_over_threshold(summary.nodes_over_threshold as i64);
                self.logger.log_run_completed(&summary);
                Ok(summary)
            }
            Err(e) => {
                self.metrics.inc_runs_aborted(e.reason());
                self.logger.log_run_aborted(e.reason(), &e.to_string());
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        params: &StrategyParams,
        nodes: &[Node],
    ) -> Result<RunSummary, StrategyError> {
        let thresholds = params.validate()?;
        let memory_target = thresholds.target_memory_rate;
        let included_namespaces = params.included_namespaces();

        let priority_threshold = self
            .priority_resolver
            .resolve(params)
            .await
            .map_err(StrategyError::PriorityResolution)?;

        let evictable = self
            .evictable_factory
            .evictable(priority_threshold, params.node_fit);
        let filter = PodFilter::new(evictable)
            .with_namespaces(included_namespaces, params.excluded_namespaces());

        self.logger
            .log_run_started(nodes.len(), memory_target, priority_threshold);

        let client = WatcherClient::with_config(
            WatcherClientConfig::new(thresholds.watcher_address.as_str())
                .with_retry(params.watcher_retry),
        )?;

        let start = Instant::now();
        let fetched = client.fetch_snapshot().await;
        self.metrics
            .observe_fetch_latency(start.elapsed().as_secs_f64());
        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.metrics.inc_watcher_errors();
                return Err(e.into());
            }
        };

        debug!(
            nodes_in_snapshot = snapshot.node_count(),
            source = %snapshot.source,
            timestamp = snapshot.timestamp,
            "Fetched metrics snapshot"
        );

        let no_metrics = NodeMetrics::default();
        let mut summary = RunSummary::default();

        for node in nodes {
            let node_name = node.name_any();

            let pods = match self.pod_lister.list_pods_on_node(node, &filter).await {
                Ok(pods) => pods,
                Err(source) => match params.listing_error_policy {
                    ListingErrorPolicy::AbortRun => {
                        return Err(StrategyError::Listing {
                            node: node_name,
                            source,
                        });
                    }
                    ListingErrorPolicy::SkipNode => {
                        self.logger.log_node_skipped(&node_name, &source.to_string());
                        summary.nodes_skipped += 1;
                        continue;
                    }
                },
            };
            summary.nodes_processed += 1;

            let node_metrics = snapshot.node(&node_name).unwrap_or(&no_metrics);
            let Some(metric) = find_violation(node_metrics, memory_target) else {
                continue;
            };

            summary.nodes_over_threshold += 1;
            self.logger
                .log_node_over_threshold(&node_name, &metric.name, metric.value, memory_target);

            if pods.is_empty() {
                self.logger
                    .log_no_evictable_pods(&node_name, included_namespaces);
                summary.nodes_without_candidates += 1;
                continue;
            }

            let Some(pod) = select_pod(&pods, params.pod_selection) else {
                self.logger.log_no_candidate(
                    &node_name,
                    pods.len(),
                    &format!("{:?}", params.pod_selection),
                );
                summary.nodes_without_candidates += 1;
                continue;
            };

            self.evict(pod, node, &node_name, &mut summary).await;
        }

        Ok(summary)
    }

    async fn evict(&self, pod: &Pod, node: &Node, node_name: &str, summary: &mut RunSummary) {
        let pod_name = pod.name_any();
        let namespace = pod.namespace().unwrap_or_default();

        match self.pod_evictor.evict_pod(pod, node, STRATEGY_NAME).await {
            Ok(()) => {
                summary.evictions += 1;
                self.metrics.inc_evictions();
                self.logger.log_pod_evicted(node_name, &namespace, &pod_name);
            }
            Err(e) => {
                summary.eviction_failures += 1;
                self.metrics.inc_eviction_errors();
                self.logger
                    .log_eviction_failed(node_name, &namespace, &pod_name, &format!("{e:#}"));
            }
        }
    }
}
