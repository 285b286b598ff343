//! Strategy parameters for the RealNodeUtilization strategy
//!
//! Parameters come from the descheduler policy document (YAML or JSON,
//! camelCase keys). They are validated before any network access.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Validation failures for [`StrategyParams`]
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("NodeRealUtilizationThresholds not set")]
    MissingThresholds,

    #[error("watcher address is empty")]
    MissingWatcherAddress,

    #[error("only one of Include/Exclude namespaces can be set")]
    ConflictingNamespaces,

    #[error("only one of thresholdPriority and thresholdPriorityClassName can be set")]
    ConflictingPriority,

    #[error("target memory rate must be a finite percentage, got {0}")]
    InvalidMemoryTarget(f64),
}

/// Utilization thresholds and the watcher to consult
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRealUtilizationThresholds {
    /// Base address of the load watcher, e.g. `http://load-watcher:2020`
    #[serde(default)]
    pub watcher_address: String,
    /// Memory utilization percentage above which a node is over-utilized
    pub target_memory_rate: f64,
}

/// Namespace filters; at most one of the two lists may be non-empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Namespaces {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Which evictable pod on an over-utilized node gets evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PodSelection {
    /// Pod at this position in listing order
    ListingIndex(usize),
    /// Pod with the lowest priority, first listed wins ties
    LowestPriority,
}

impl Default for PodSelection {
    fn default() -> Self {
        PodSelection::ListingIndex(1)
    }
}

/// What a pod listing failure on one node does to the rest of the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListingErrorPolicy {
    /// Stop the whole run; remaining nodes are not visited
    #[default]
    AbortRun,
    /// Log and move on to the next node
    SkipNode,
}

/// Retry behaviour for transient watcher transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    #[serde(rename = "initialBackoffMs", with = "duration_millis")]
    pub initial_backoff: Duration,
    #[serde(rename = "maxBackoffMs", with = "duration_millis")]
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Backoff to wait after the given failed attempt (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let mut backoff = self.initial_backoff;
        for _ in 1..attempt {
            backoff = std::cmp::min(backoff * 2, self.max_backoff);
        }
        std::cmp::min(backoff, self.max_backoff)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Parameters of the RealNodeUtilization strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategyParams {
    pub node_real_utilization_thresholds: Option<NodeRealUtilizationThresholds>,
    pub namespaces: Option<Namespaces>,
    pub threshold_priority: Option<i32>,
    pub threshold_priority_class_name: Option<String>,
    pub node_fit: bool,
    pub pod_selection: PodSelection,
    pub listing_error_policy: ListingErrorPolicy,
    pub watcher_retry: RetryConfig,
}

impl StrategyParams {
    /// Parse parameters from a YAML (or JSON) document
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Read and parse a policy file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file {}", path.display()))?;
        Self::from_yaml(&content).context("Failed to parse policy file")
    }

    /// Check the parameters; must pass before any I/O is attempted
    pub fn validate(&self) -> Result<&NodeRealUtilizationThresholds, ConfigError> {
        let thresholds = self
            .node_real_utilization_thresholds
            .as_ref()
            .ok_or(ConfigError::MissingThresholds)?;

        if let Some(ns) = &self.namespaces {
            if !ns.include.is_empty() && !ns.exclude.is_empty() {
                return Err(ConfigError::ConflictingNamespaces);
            }
        }

        let has_class_name = self
            .threshold_priority_class_name
            .as_deref()
            .is_some_and(|name| !name.is_empty());
        if self.threshold_priority.is_some() && has_class_name {
            return Err(ConfigError::ConflictingPriority);
        }

        if thresholds.watcher_address.is_empty() {
            return Err(ConfigError::MissingWatcherAddress);
        }

        if !thresholds.target_memory_rate.is_finite() {
            return Err(ConfigError::InvalidMemoryTarget(
                thresholds.target_memory_rate,
            ));
        }

        Ok(thresholds)
    }

    pub fn included_namespaces(&self) -> &[String] {
        self.namespaces
            .as_ref()
            .map(|ns| ns.include.as_slice())
            .unwrap_or_default()
    }

    pub fn excluded_namespaces(&self) -> &[String] {
        self.namespaces
            .as_ref()
            .map(|ns| ns.exclude.as_slice())
            .unwrap_or_default()
    }
}
