//! Descheduler host configuration

use anyhow::{Context, Result};
use descheduler_lib::cluster::EvictionOptions;
use descheduler_lib::StrategyParams;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// Host configuration, read from `DESCHEDULER_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct DeschedulerConfig {
    /// Policy file holding the strategy parameters (YAML or JSON)
    #[serde(default = "default_policy_path")]
    pub policy_path: PathBuf,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds between strategy runs
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Label selector restricting the nodes considered
    #[serde(default)]
    pub node_selector: Option<String>,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub evict_local_storage_pods: bool,

    #[serde(default)]
    pub max_pods_to_evict_per_node: Option<usize>,
}

fn default_policy_path() -> PathBuf {
    PathBuf::from("/etc/descheduler/policy.yaml")
}

fn default_api_port() -> u16 {
    8080
}

fn default_interval() -> u64 {
    300
}

impl DeschedulerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("DESCHEDULER"))
            .build()
            .context("Failed to read descheduler configuration")?;

        config
            .try_deserialize()
            .context("Invalid descheduler configuration")
    }

    /// Strategy parameters from the policy file
    pub fn load_policy(&self) -> Result<StrategyParams> {
        StrategyParams::load(&self.policy_path)
    }

    /// Ticker for the run loop; the first tick fires immediately and a run
    /// that overruns pushes the schedule back instead of bursting
    pub fn run_ticker(&self) -> Interval {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    pub fn eviction_options(&self) -> EvictionOptions {
        EvictionOptions {
            dry_run: self.dry_run,
            evict_local_storage_pods: self.evict_local_storage_pods,
            max_pods_to_evict_per_node: self.max_pods_to_evict_per_node,
        }
    }
}
