//! Client for the load watcher telemetry service
//!
//! The watcher serves one JSON document per request describing the latest
//! utilization of every node it tracks. This module provides:
//! - HTTP client with a bounded request timeout
//! - Typed decoding into [`WatcherMetrics`](crate::models::WatcherMetrics)
//! - Optional retry with exponential backoff for transport failures

mod client;

#[cfg(test)]
mod tests;

pub use client::{WatcherClient, WatcherClientConfig, WatcherError, DEFAULT_TIMEOUT, WATCHER_PATH};
