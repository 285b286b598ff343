//! Real utilization descheduler
//!
//! Periodically runs the RealNodeUtilization strategy against the ready
//! nodes of the cluster, evicting one pod from each node whose measured
//! memory utilization exceeds the configured target.

use anyhow::{Context, Result};
use descheduler_lib::{
    cluster::{is_node_ready, KubePodEvictor, KubePodLister, KubePriorityResolver},
    health::{components, HealthRegistry},
    observability::{StrategyMetrics, StructuredLogger},
    strategy::{RealNodeUtilization, STRATEGY_NAME},
    StrategyParams,
};
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::{Api, Client};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const DESCHEDULER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting realutil-descheduler");

    let config = config::DeschedulerConfig::load()?;
    let params = config.load_policy()?;
    params
        .validate()
        .with_context(|| format!("Invalid policy in {}", config.policy_path.display()))?;
    info!(
        policy = %config.policy_path.display(),
        interval_secs = config.interval_secs,
        "Descheduler configured"
    );

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let health_registry = HealthRegistry::new();
    health_registry.register(components::WATCHER).await;
    health_registry.register(components::KUBERNETES).await;
    health_registry.register(components::STRATEGY).await;

    let metrics = StrategyMetrics::new();

    let logger = StructuredLogger::new(STRATEGY_NAME);
    logger.log_startup(DESCHEDULER_VERSION, config.interval_secs, config.dry_run);

    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    health_registry.set_ready(true).await;

    let mut ticker = config.run_ticker();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        // Dropping an in-flight run on shutdown cancels its pending calls
        tokio::select! {
            _ = &mut shutdown => {
                logger.log_shutdown("SIGINT received");
                break;
            }
            _ = async {
                ticker.tick().await;
                run_once(&client, &config, &params, &health_registry).await;
            } => {}
        }
    }

    api_handle.abort();
    info!("Shutting down");

    Ok(())
}

/// One strategy pass over the currently ready nodes
async fn run_once(
    client: &Client,
    config: &config::DeschedulerConfig,
    params: &StrategyParams,
    health_registry: &HealthRegistry,
) {
    let nodes = match list_ready_nodes(client, config.node_selector.as_deref()).await {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Skipping run, nodes unavailable");
            health_registry
                .set_degraded(components::KUBERNETES, e.to_string())
                .await;
            return;
        }
    };

    let evictor = Arc::new(KubePodEvictor::new(
        client.clone(),
        nodes.clone(),
        config.eviction_options(),
    ));
    let strategy = RealNodeUtilization::new(
        Arc::new(KubePriorityResolver::new(client.clone())),
        evictor.clone(),
        Arc::new(KubePodLister::new(client.clone())),
        evictor,
    );

    let outcome = strategy.try_run(params, &nodes).await;
    health_registry.record_run(&outcome).await;
}

async fn list_ready_nodes(client: &Client, label_selector: Option<&str>) -> Result<Vec<Node>> {
    let api: Api<Node> = Api::all(client.clone());
    let mut params = ListParams::default();
    if let Some(selector) = label_selector {
        params = params.labels(selector);
    }

    let nodes = api.list(&params).await.context("Failed to list nodes")?;
    Ok(nodes.items.into_iter().filter(is_node_ready).collect())
}
