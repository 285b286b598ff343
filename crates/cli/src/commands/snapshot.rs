//! Watcher snapshot inspection

use anyhow::{bail, Result};
use colored::Colorize;
use descheduler_lib::{WatcherClient, WatcherMetrics};
use tabled::Tabled;

use crate::output::{format_percent, format_timestamp, print_json, print_table, OutputFormat};

/// Row for the snapshot table
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Type")]
    metric_type: String,
    #[tabled(rename = "Operator")]
    operator: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Name")]
    name: String,
}

/// Flatten a snapshot into table rows, nodes sorted by name
fn metric_rows(snapshot: &WatcherMetrics) -> Vec<MetricRow> {
    let mut nodes: Vec<_> = snapshot.data.iter().collect();
    nodes.sort_by(|a, b| a.0.cmp(b.0));

    nodes
        .into_iter()
        .flat_map(|(node, metrics)| {
            metrics.metrics.iter().map(move |m| MetricRow {
                node: node.clone(),
                metric_type: m.metric_type.clone(),
                operator: m.operator.clone(),
                value: format_percent(m.value),
                name: m.name.clone(),
            })
        })
        .collect()
}

/// Show the current snapshot, optionally narrowed to one node
pub async fn show_snapshot(
    client: &WatcherClient,
    node: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let mut snapshot = client.fetch_snapshot().await?;

    if let Some(node) = node {
        if !snapshot.data.contains_key(node) {
            bail!("node {node} is not present in the watcher snapshot");
        }
        snapshot.data.retain(|name, _| name == node);
    }

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => {
            println!("{}", "Watcher Snapshot".bold());
            println!("{}", "=".repeat(60));
            println!("Source:    {}", snapshot.source.cyan());
            println!("Timestamp: {}", format_timestamp(snapshot.timestamp));
            println!(
                "Window:    {} ({} - {})",
                snapshot.window.duration,
                format_timestamp(snapshot.window.start),
                format_timestamp(snapshot.window.end)
            );
            println!();

            print_table(&metric_rows(&snapshot));
            println!("\nTotal: {} nodes", snapshot.node_count());
        }
    }

    Ok(())
}
