//! gh-jira-sync - GitHub to JIRA sync for GitHub Actions
//!
//! Main entry point. Exits 0 when every item synced or was skipped, 1 when
//! any item failed and 2 when the run could not start.

use anyhow::Context;
use clap::Parser;
use gh_jira_sync::config::Vars;
use gh_jira_sync::sync::{self, exit_code_for_error, RunOptions, EXIT_ITEM_FAILED};
use gh_jira_sync::SyncError;
use std::path::PathBuf;
use std::process;

/// Mirror GitHub issues and pull requests into JIRA
#[derive(Parser, Debug)]
#[command(name = "gh-jira-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// YAML file with settings (environment variables take precedence)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the webhook event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: Option<PathBuf>,

    /// Name of the event that triggered the workflow
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event_name: Option<String>,

    /// Items synced in parallel (overrides SYNC_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = gh_jira_sync::logging::init(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    };

    process::exit(code);
}

/// Input problems abort with 2, anything else that stops the run with 1
fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<SyncError>()
        .map(exit_code_for_error)
        .unwrap_or(EXIT_ITEM_FAILED)
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let vars = Vars::load(cli.config.as_deref()).context("Failed to load settings")?;
    let options = RunOptions {
        event_name: cli.event_name,
        event_path: cli.event_path,
        concurrency: cli.concurrency,
    };

    let report = sync::run(&vars, &options).await.context("Sync run aborted")?;
    report.print();

    Ok(report.exit_code())
}
