//! Core data models for the watcher metrics snapshot
//!
//! These types mirror the JSON document served by the load watcher on
//! `GET /watcher`. Every field tolerates absence so that a partially
//! populated document still decodes.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Metric type reported for memory utilization
pub const METRIC_TYPE_MEMORY: &str = "Memory";

/// Metric type reported for CPU utilization
pub const METRIC_TYPE_CPU: &str = "CPU";

/// Operator for the most recent instantaneous sample
pub const OPERATOR_LATEST: &str = "Latest";

/// One metrics snapshot fetched from the watcher
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherMetrics {
    pub timestamp: i64,
    pub window: Window,
    pub source: String,
    /// Node name to that node's metrics
    #[serde(deserialize_with = "deserialize_node_data")]
    pub data: HashMap<String, NodeMetrics>,
}

/// Accepted layouts of the `data` object
#[derive(Deserialize)]
#[serde(untagged)]
enum NodeData {
    /// Watchers built on the Go client nest the map under `NodeMetricsMap`
    Wrapped(WrappedNodeData),
    Flat(HashMap<String, NodeMetrics>),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WrappedNodeData {
    #[serde(rename = "NodeMetricsMap")]
    node_metrics_map: Option<HashMap<String, NodeMetrics>>,
}

fn deserialize_node_data<'de, D>(deserializer: D) -> Result<HashMap<String, NodeMetrics>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match NodeData::deserialize(deserializer)? {
        NodeData::Wrapped(wrapped) => wrapped.node_metrics_map.unwrap_or_default(),
        NodeData::Flat(map) => map,
    })
}

impl WatcherMetrics {
    /// Metrics recorded for `node_name`, if the watcher reported any
    pub fn node(&self, node_name: &str) -> Option<&NodeMetrics> {
        self.data.get(node_name)
    }

    /// Number of nodes present in the snapshot
    pub fn node_count(&self) -> usize {
        self.data.len()
    }
}

/// Time window the snapshot was aggregated over
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Window {
    pub duration: String,
    pub start: i64,
    pub end: i64,
}

/// Metrics for a single node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMetrics {
    pub metrics: Vec<Metric>,
    pub tags: Tags,
    pub metadata: Metadata,
}

impl NodeMetrics {
    /// First `Memory`/`Latest` metric in listing order
    pub fn latest_memory(&self) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.is_latest_memory())
    }
}

/// A single named measurement; `value` is a percentage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    /// Name of the metric at the provider
    pub name: String,
    /// CPU or Memory
    #[serde(rename = "type")]
    pub metric_type: String,
    /// AVG, SUM, Latest, ...
    pub operator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollup: Option<String>,
    pub value: f64,
}

impl Metric {
    pub fn is_latest_memory(&self) -> bool {
        self.metric_type == METRIC_TYPE_MEMORY && self.operator == OPERATOR_LATEST
    }
}

/// Reserved, currently carries nothing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(rename = "dataCenter", skip_serializing_if = "Option::is_none")]
    pub data_center: Option<String>,
}
