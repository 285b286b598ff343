//! Policy file validation

use anyhow::{bail, Result};
use colored::Colorize;
use descheduler_lib::config::{ListingErrorPolicy, PodSelection};
use descheduler_lib::StrategyParams;
use serde::Serialize;
use std::path::Path;

use crate::output::{print_error, print_json, print_success, OutputFormat};

/// Effective settings of a valid policy
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySummary {
    pub watcher_address: String,
    pub target_memory_rate: f64,
    pub priority_threshold: String,
    pub include_namespaces: Vec<String>,
    pub exclude_namespaces: Vec<String>,
    pub node_fit: bool,
    pub pod_selection: String,
    pub listing_error_policy: String,
    pub watcher_attempts: u32,
}

fn describe_selection(selection: PodSelection) -> String {
    match selection {
        PodSelection::ListingIndex(index) => format!("pod at listing index {index}"),
        PodSelection::LowestPriority => "lowest priority pod".to_string(),
    }
}

fn describe_priority(params: &StrategyParams) -> String {
    if let Some(value) = params.threshold_priority {
        return value.to_string();
    }
    match params.threshold_priority_class_name.as_deref() {
        Some(name) if !name.is_empty() => format!("priority class {name}"),
        _ => "system critical".to_string(),
    }
}

pub fn summarize(params: &StrategyParams) -> Result<PolicySummary> {
    let thresholds = params.validate()?;

    Ok(PolicySummary {
        watcher_address: thresholds.watcher_address.clone(),
        target_memory_rate: thresholds.target_memory_rate,
        priority_threshold: describe_priority(params),
        include_namespaces: params.included_namespaces().to_vec(),
        exclude_namespaces: params.excluded_namespaces().to_vec(),
        node_fit: params.node_fit,
        pod_selection: describe_selection(params.pod_selection),
        listing_error_policy: match params.listing_error_policy {
            ListingErrorPolicy::AbortRun => "abort run".to_string(),
            ListingErrorPolicy::SkipNode => "skip node".to_string(),
        },
        watcher_attempts: params.watcher_retry.max_attempts.max(1),
    })
}

/// Validate a policy file and show the settings it yields
pub fn validate_policy(path: &Path, format: OutputFormat) -> Result<()> {
    let summary = match StrategyParams::load(path).and_then(|params| summarize(&params)) {
        Ok(summary) => summary,
        Err(e) => {
            print_error(&format!("{} is not a valid policy: {e:#}", path.display()));
            bail!("policy validation failed");
        }
    };

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_success(&format!("{} is a valid policy", path.display()));
            println!();
            println!("Watcher:          {}", summary.watcher_address.cyan());
            println!("Memory target:    {:.1}%", summary.target_memory_rate);
            println!("Priority cutoff:  {}", summary.priority_threshold);
            if !summary.include_namespaces.is_empty() {
                println!("Namespaces:       {}", summary.include_namespaces.join(", "));
            }
            if !summary.exclude_namespaces.is_empty() {
                println!(
                    "Excluded:         {}",
                    summary.exclude_namespaces.join(", ")
                );
            }
            println!("Node fit:         {}", summary.node_fit);
            println!("Pod selection:    {}", summary.pod_selection);
            println!("Listing errors:   {}", summary.listing_error_policy);
            println!("Watcher attempts: {}", summary.watcher_attempts);
        }
    }

    Ok(())
}
