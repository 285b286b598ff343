//! Real Utilization Descheduler CLI
//!
//! A command-line tool for inspecting load watcher snapshots, previewing
//! which nodes the RealNodeUtilization strategy would act on, and checking
//! policy files before they are deployed.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{plan, policy, snapshot};
use std::path::PathBuf;

/// Real Utilization Descheduler CLI
#[derive(Parser)]
#[command(name = "realutil")]
#[command(author, version, about = "CLI for the Real Utilization Descheduler", long_about = None)]
pub struct Cli {
    /// Load watcher base URL (can also be set via REALUTIL_WATCHER_URL env var)
    #[arg(long, env = "REALUTIL_WATCHER_URL", default_value = "http://localhost:2020")]
    pub watcher_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current metrics snapshot from the watcher
    Snapshot {
        /// Only show this node
        #[arg(long, short)]
        node: Option<String>,
    },

    /// Preview which nodes would have a pod evicted
    Plan {
        /// Memory utilization target in percent
        #[arg(long, short)]
        target: Option<f64>,

        /// Take the target and watcher address from this policy file
        #[arg(long, short)]
        policy: Option<PathBuf>,
    },

    /// Validate a strategy policy file
    Validate {
        /// Policy file (YAML or JSON)
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Snapshot { node } => {
            let client = commands::watcher_client(&cli.watcher_url, cli.timeout_secs)?;
            snapshot::show_snapshot(&client, node.as_deref(), cli.format).await?;
        }
        Commands::Plan { target, policy } => {
            let settings = plan::PlanSettings::resolve(&cli.watcher_url, target, policy.as_deref())?;
            let client = commands::watcher_client(&settings.watcher_url, cli.timeout_secs)?;
            plan::show_plan(&client, settings.target, cli.format).await?;
        }
        Commands::Validate { path } => {
            policy::validate_policy(&path, cli.format)?;
        }
    }

    Ok(())
}
