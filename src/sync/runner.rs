//! A complete run
//!
//! Settings, then the trigger, then the adapters, then the batch. Anything
//! that goes wrong before the first item is an error; after that every
//! outcome lands in the [`BatchReport`].

use super::engine::SyncEngine;
use super::report::BatchReport;
use crate::config::{Settings, Vars};
use crate::event::{self, Trigger};
use crate::integrations::{GitHubAdapter, JiraAdapter};
use crate::{Result, SyncError};
use std::path::PathBuf;
use tracing::info;

/// Inputs that come from the command line rather than the settings
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// `GITHUB_EVENT_NAME`
    pub event_name: Option<String>,
    /// `GITHUB_EVENT_PATH`
    pub event_path: Option<PathBuf>,
    /// Overrides `SYNC_CONCURRENCY`
    pub concurrency: Option<usize>,
}

/// Decide what the run syncs: every open pull request for a cron job,
/// otherwise whatever the event names
pub fn trigger_for(settings: &Settings, options: &RunOptions) -> Result<Trigger> {
    if settings.sync.cron_job {
        info!("Running as a cron job, checking open pull requests");
        return Ok(Trigger::OpenPulls);
    }

    let name = options
        .event_name
        .as_deref()
        .ok_or_else(|| SyncError::Config("GITHUB_EVENT_NAME is not set".into()))?;
    let path = options
        .event_path
        .as_deref()
        .ok_or_else(|| SyncError::Config("GITHUB_EVENT_PATH is not set".into()))?;

    let payload = event::read_payload(path)?;
    info!(event = %name, "Handling workflow event");
    event::parse_trigger(name, &payload)
}

/// Validate settings, read the event and sync everything it names
///
/// No tracker is contacted until the settings and the event are known to
/// be usable.
pub async fn run(vars: &Vars, options: &RunOptions) -> Result<BatchReport> {
    let mut settings = Settings::from_vars(vars)?;
    if let Some(concurrency) = options.concurrency {
        if concurrency == 0 {
            return Err(SyncError::Config(
                "--concurrency must be greater than 0".into(),
            ));
        }
        settings.sync.concurrency = concurrency;
    }

    let trigger = trigger_for(&settings, options)?;

    let github = GitHubAdapter::new(settings.trackers.github.clone())?
        .with_closing_refs(settings.sync.link_closing_issues);
    let jira = JiraAdapter::new(
        settings.trackers.jira.clone(),
        settings.sync.status_field_name(),
    )?;
    let engine = SyncEngine::new(github, jira, settings.sync)?;

    let mut report = BatchReport::start();
    let refs = event::resolve(&trigger, engine.source()).await?;

    info!(
        items = refs.len(),
        concurrency = engine.config().concurrency,
        "Starting sync"
    );

    report.extend(engine.run(engine.source(), refs).await);
    report.finish();
    Ok(report)
}
