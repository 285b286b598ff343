//! Health check infrastructure for the descheduler
//!
//! Tracks the watcher, the Kubernetes API and the strategy itself. Every
//! strategy run is folded into component status through
//! [`HealthRegistry::record_run`], so the health endpoints report whether the last
//! pass could reach its dependencies.

use crate::strategy::{RunSummary, StrategyError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still usable, the last run hit a recoverable problem
    Degraded,
    Unhealthy,
}

/// Component names for health tracking
pub mod components {
    /// The load watcher metrics endpoint
    pub const WATCHER: &str = "watcher";
    /// API server access for pods, nodes and priority classes
    pub const KUBERNETES: &str = "kubernetes";
    /// Policy validity and eviction outcomes
    pub const STRATEGY: &str = "strategy";
}

/// Status of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unix time the component entered its current status
    pub since: i64,
    /// Non-healthy reports in a row
    pub failure_streak: u32,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            since: chrono::Utc::now().timestamp(),
            failure_streak: 0,
        }
    }

    /// Apply a new report, keeping `since` while the status is unchanged
    fn report(&mut self, status: ComponentStatus, message: Option<String>) {
        if status != self.status {
            self.status = status;
            self.since = chrono::Utc::now().timestamp();
        }
        self.message = message;
        self.failure_streak = match status {
            ComponentStatus::Healthy => 0,
            _ => self.failure_streak.saturating_add(1),
        };
    }
}

/// Outcome of the most recent strategy run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRun {
    pub finished_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evictions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<LastRun>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    components: HashMap<String, ComponentHealth>,
    ready: bool,
    last_run: Option<LastRun>,
}

impl State {
    fn overall(&self) -> ComponentStatus {
        self.components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }

    fn report(&mut self, name: &str, status: ComponentStatus, message: Option<String>) {
        self.components
            .entry(name.to_string())
            .and_modify(|c| c.report(status, message.clone()))
            .or_insert_with(|| ComponentHealth::new(status, message));
    }
}

/// Shared registry behind the health endpoints
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<State>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a component as healthy
    pub async fn register(&self, name: &str) {
        let mut state = self.state.write().await;
        state.components.insert(
            name.to_string(),
            ComponentHealth::new(ComponentStatus::Healthy, None),
        );
    }

    pub async fn set_healthy(&self, name: &str) {
        self.state
            .write()
            .await
            .report(name, ComponentStatus::Healthy, None);
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.state
            .write()
            .await
            .report(name, ComponentStatus::Degraded, Some(message.into()));
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.state
            .write()
            .await
            .report(name, ComponentStatus::Unhealthy, Some(message.into()));
    }

    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    /// Fold the outcome of a strategy run into component health
    pub async fn record_run(&self, outcome: &Result<RunSummary, StrategyError>) {
        let mut state = self.state.write().await;
        let finished_at = chrono::Utc::now().timestamp();

        match outcome {
            Ok(summary) => {
                state.report(components::WATCHER, ComponentStatus::Healthy, None);
                state.report(components::KUBERNETES, ComponentStatus::Healthy, None);
                if summary.eviction_failures > 0 {
                    let message =
                        format!("{} eviction(s) failed in last run", summary.eviction_failures);
                    state.report(components::STRATEGY, ComponentStatus::Degraded, Some(message));
                } else {
                    state.report(components::STRATEGY, ComponentStatus::Healthy, None);
                }
                state.last_run = Some(LastRun {
                    finished_at,
                    evictions: Some(summary.evictions),
                    aborted: None,
                });
            }
            Err(e) => {
                let (component, status) = match e {
                    StrategyError::InvalidParams(_) => {
                        (components::STRATEGY, ComponentStatus::Unhealthy)
                    }
                    // A watcher outage is external, restarting the pod would not fix it
                    StrategyError::Watcher(_) => (components::WATCHER, ComponentStatus::Degraded),
                    StrategyError::PriorityResolution(_) | StrategyError::Listing { .. } => {
                        (components::KUBERNETES, ComponentStatus::Degraded)
                    }
                };
                state.report(component, status, Some(e.to_string()));
                state.last_run = Some(LastRun {
                    finished_at,
                    evictions: None,
                    aborted: Some(e.reason().to_string()),
                });
            }
        }
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: state.overall(),
            components: state.components.clone(),
            last_run: state.last_run.clone(),
        }
    }

    /// Ready once startup finished and no component is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;

        let reason = if !state.ready {
            Some("Descheduler not yet initialized".to_string())
        } else {
            state
                .components
                .iter()
                .find(|(_, c)| c.status == ComponentStatus::Unhealthy)
                .map(|(name, _)| format!("Component {name} unhealthy"))
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
