//! Observability infrastructure for the descheduler strategy
//!
//! Provides:
//! - Prometheus metrics (runs, evictions, watcher fetch latency and errors)
//! - Structured JSON logging with tracing

use crate::strategy::RunSummary;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for watcher round trips (in seconds)
const FETCH_LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<StrategyMetricsInner> = OnceLock::new();

struct StrategyMetricsInner {
    runs_total: IntCounter,
    runs_aborted_total: IntCounterVec,
    evictions_total: IntCounter,
    eviction_errors_total: IntCounter,
    nodes_over_threshold: IntGauge,
    watcher_fetch_latency_seconds: Histogram,
    watcher_errors_total: IntCounter,
}

impl StrategyMetricsInner {
    fn new() -> Self {
        Self {
            runs_total: register_int_counter!(
                "realutil_runs_total",
                "Total number of strategy runs started"
            )
            .expect("Failed to register runs_total"),

            runs_aborted_total: register_int_counter_vec!(
                "realutil_runs_aborted_total",
                "Strategy runs aborted before completing, by cause",
                &["reason"]
            )
            .expect("Failed to register runs_aborted_total"),

            evictions_total: register_int_counter!(
                "realutil_evictions_total",
                "Total number of pods evicted by the strategy"
            )
            .expect("Failed to register evictions_total"),

            eviction_errors_total: register_int_counter!(
                "realutil_eviction_errors_total",
                "Total number of failed eviction requests"
            )
            .expect("Failed to register eviction_errors_total"),

            nodes_over_threshold: register_int_gauge!(
                "realutil_nodes_over_threshold",
                "Nodes above the memory target in the last completed run"
            )
            .expect("Failed to register nodes_over_threshold"),

            watcher_fetch_latency_seconds: register_histogram!(
                "realutil_watcher_fetch_latency_seconds",
                "Time spent fetching a metrics snapshot from the watcher",
                FETCH_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register watcher_fetch_latency_seconds"),

            watcher_errors_total: register_int_counter!(
                "realutil_watcher_errors_total",
                "Total number of failed watcher fetches"
            )
            .expect("Failed to register watcher_errors_total"),
        }
    }
}

/// Strategy metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct StrategyMetrics {
    _private: (),
}

impl Default for StrategyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(StrategyMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &StrategyMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_runs(&self) {
        self.inner().runs_total.inc();
    }

    pub fn inc_runs_aborted(&self, reason: &str) {
        self.inner()
            .runs_aborted_total
            .with_label_values(&[reason])
            .inc();
    }

    pub fn inc_evictions(&self) {
        self.inner().evictions_total.inc();
    }

    pub fn inc_eviction_errors(&self) {
        self.inner().eviction_errors_total.inc();
    }

    pub fn set_nodes_over_threshold(&self, count: i64) {
        self.inner().nodes_over_threshold.set(count);
    }

    pub fn observe_fetch_latency(&self, duration_secs: f64) {
        self.inner()
            .watcher_fetch_latency_seconds
            .observe(duration_secs);
    }

    pub fn inc_watcher_errors(&self) {
        self.inner().watcher_errors_total.inc();
    }

    /// Current counter values since process start
    pub fn totals(&self) -> MetricTotals {
        let inner = self.inner();
        MetricTotals {
            runs: inner.runs_total.get(),
            evictions: inner.evictions_total.get(),
            eviction_errors: inner.eviction_errors_total.get(),
            watcher_errors: inner.watcher_errors_total.get(),
            nodes_over_threshold: inner.nodes_over_threshold.get(),
        }
    }

    /// Render every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Counter values exposed on the status endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTotals {
    pub runs: u64,
    pub evictions: u64,
    pub eviction_errors: u64,
    pub watcher_errors: u64,
    pub nodes_over_threshold: i64,
}

/// Structured logger for strategy events
///
/// Every event carries the strategy name so log pipelines can separate
/// this strategy from others running in the same descheduler.
#[derive(Clone)]
pub struct StructuredLogger {
    strategy: String,
}

impl StructuredLogger {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
        }
    }

    pub fn log_startup(&self, version: &str, interval_secs: u64, dry_run: bool) {
        info!(
            event = "startup",
            strategy = %self.strategy,
            version = %version,
            interval_secs = interval_secs,
            dry_run = dry_run,
            "Descheduler starting"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            strategy = %self.strategy,
            reason = %reason,
            "Descheduler shutting down"
        );
    }

    pub fn log_run_started(&self, nodes: usize, memory_target: f64, priority_threshold: i32) {
        info!(
            event = "run_started",
            strategy = %self.strategy,
            nodes = nodes,
            memory_target = memory_target,
            priority_threshold = priority_threshold,
            "Strategy run started"
        );
    }

    pub fn log_node_over_threshold(&self, node: &str, metric: &str, value: f64, target: f64) {
        info!(
            event = "node_over_threshold",
            strategy = %self.strategy,
            node = %node,
            metric = %metric,
            value = value,
            target = target,
            "Node memory utilization above target"
        );
    }

    pub fn log_no_evictable_pods(&self, node: &str, namespaces: &[String]) {
        info!(
            event = "no_evictable_pods",
            strategy = %self.strategy,
            node = %node,
            namespaces = ?namespaces,
            "No pods can be evicted on node"
        );
    }

    pub fn log_no_candidate(&self, node: &str, evictable: usize, selection: &str) {
        warn!(
            event = "no_eviction_candidate",
            strategy = %self.strategy,
            node = %node,
            evictable = evictable,
            selection = %selection,
            "Pod selection yielded no candidate"
        );
    }

    pub fn log_pod_evicted(&self, node: &str, namespace: &str, pod: &str) {
        info!(
            event = "pod_evicted",
            strategy = %self.strategy,
            node = %node,
            namespace = %namespace,
            pod = %pod,
            "Evicted pod"
        );
    }

    pub fn log_eviction_failed(&self, node: &str, namespace: &str, pod: &str, error: &str) {
        error!(
            event = "eviction_failed",
            strategy = %self.strategy,
            node = %node,
            namespace = %namespace,
            pod = %pod,
            error = %error,
            "Error evicting pod"
        );
    }

    pub fn log_node_skipped(&self, node: &str, error: &str) {
        warn!(
            event = "node_skipped",
            strategy = %self.strategy,
            node = %node,
            error = %error,
            "Failed to list pods on node, skipping"
        );
    }

    pub fn log_run_aborted(&self, reason: &str, error: &str) {
        error!(
            event = "run_aborted",
            strategy = %self.strategy,
            reason = %reason,
            error = %error,
            "Strategy run aborted"
        );
    }

    pub fn log_run_completed(&self, summary: &RunSummary) {
        info!(
            event = "run_completed",
            strategy = %self.strategy,
            nodes_processed = summary.nodes_processed,
            nodes_over_threshold = summary.nodes_over_threshold,
            evictions = summary.evictions,
            eviction_failures = summary.eviction_failures,
            nodes_without_candidates = summary.nodes_without_candidates,
            nodes_skipped = summary.nodes_skipped,
            "Strategy run completed"
        );
    }
}
