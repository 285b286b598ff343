//! Dry preview of the eviction decision
//!
//! Applies the same per-node rule as the strategy to a live snapshot. Pod
//! selection needs the cluster and is not part of the preview.

use anyhow::{bail, Result};
use colored::Colorize;
use descheduler_lib::strategy::find_violation;
use descheduler_lib::{StrategyParams, WatcherClient, WatcherMetrics};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    color_utilization, print_info, print_json, print_success, print_table, print_warning,
    OutputFormat,
};

/// Where the preview reads metrics and which target it applies
#[derive(Debug, Clone, PartialEq)]
pub struct PlanSettings {
    pub watcher_url: String,
    pub target: f64,
}

impl PlanSettings {
    /// A policy file supplies both the watcher address and the target;
    /// an explicit target overrides the policy's.
    pub fn resolve(watcher_url: &str, target: Option<f64>, policy: Option<&Path>) -> Result<Self> {
        let Some(path) = policy else {
            let Some(target) = target else {
                bail!("either --target or --policy is required");
            };
            return Ok(Self {
                watcher_url: watcher_url.to_string(),
                target,
            });
        };

        let params = StrategyParams::load(path)?;
        let thresholds = params.validate()?;
        Ok(Self {
            watcher_url: thresholds.watcher_address.clone(),
            target: target.unwrap_or(thresholds.target_memory_rate),
        })
    }
}

/// Decision for one node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePlan {
    pub node: String,
    /// Memory/Latest reading, if the watcher reported one
    pub memory: Option<f64>,
    pub target: f64,
    pub evict: bool,
}

/// Row for the plan table
#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Action")]
    action: String,
}

/// Per-node decisions, sorted by node name
pub fn plan_nodes(snapshot: &WatcherMetrics, target: f64) -> Vec<NodePlan> {
    let mut plans: Vec<NodePlan> = snapshot
        .data
        .iter()
        .map(|(node, metrics)| {
            let violation = find_violation(metrics, target);
            NodePlan {
                node: node.clone(),
                memory: violation
                    .or_else(|| metrics.latest_memory())
                    .map(|m| m.value),
                target,
                evict: violation.is_some(),
            }
        })
        .collect();
    plans.sort_by(|a, b| a.node.cmp(&b.node));
    plans
}

pub async fn show_plan(client: &WatcherClient, target: f64, format: OutputFormat) -> Result<()> {
    let snapshot = client.fetch_snapshot().await?;
    let plans = plan_nodes(&snapshot, target);

    match format {
        OutputFormat::Json => print_json(&plans)?,
        OutputFormat::Table => {
            println!("{}", "Eviction Plan".bold());
            println!("{}", "=".repeat(60));
            println!("Watcher: {}", client.url().as_str().cyan());
            println!("Target:  {:.1}%", target);
            println!();

            if plans.is_empty() {
                print_warning("Watcher reported no nodes");
                return Ok(());
            }

            let rows: Vec<PlanRow> = plans
                .iter()
                .map(|p| PlanRow {
                    node: p.node.clone(),
                    memory: p
                        .memory
                        .map(|value| color_utilization(value, target))
                        .unwrap_or_else(|| "-".to_string()),
                    action: if p.evict {
                        "evict one pod".red().to_string()
                    } else {
                        "none".to_string()
                    },
                })
                .collect();
            print_table(&rows);

            let over = plans.iter().filter(|p| p.evict).count();
            println!();
            if over == 0 {
                print_success("No node is above the memory target");
            } else {
                print_info(&format!(
                    "{over} of {} nodes above the memory target",
                    plans.len()
                ));
            }
        }
    }

    Ok(())
}
