//! Library for the real-utilization descheduler
//!
//! This crate provides the core functionality for:
//! - Fetching node metrics snapshots from a load watcher
//! - Deciding which overloaded nodes should lose a pod
//! - Pod listing, eviction and priority lookup against the Kubernetes API
//! - Health checks and observability

pub mod cluster;
pub mod config;
pub mod health;
pub mod models;
pub mod observability;
pub mod strategy;
pub mod watcher;

pub use config::{ConfigError, StrategyParams};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{MetricTotals, StrategyMetrics, StructuredLogger};
pub use strategy::{RealNodeUtilization, RunSummary, StrategyError};
pub use watcher::{WatcherClient, WatcherError};
