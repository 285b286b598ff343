//! CLI subcommands

pub mod plan;
pub mod policy;
pub mod snapshot;

use anyhow::{Context, Result};
use descheduler_lib::watcher::{WatcherClient, WatcherClientConfig};
use std::time::Duration;

/// Watcher client for a single CLI invocation
pub fn watcher_client(url: &str, timeout_secs: u64) -> Result<WatcherClient> {
    let config = WatcherClientConfig::new(url).with_timeout(Duration::from_secs(timeout_secs));
    WatcherClient::with_config(config)
        .with_context(|| format!("Failed to create watcher client for {url}"))
}
