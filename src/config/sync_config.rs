//! Sync behaviour configuration
//!
//! The immutable record built once from the action inputs.

use super::vars::Vars;
use crate::integrations::retry::RetryConfig;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_STATUS_FIELD_ID: &str = "12100";
pub const DEFAULT_FIND_JIRA_RETRIES: u32 = 5;
pub const DEFAULT_MINIMUM_APPROVALS: u32 = 3;

/// How the engine decides scope, retries lookups and gates approvals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Running from a schedule rather than a webhook event
    #[serde(default)]
    pub cron_job: bool,

    /// Numeric id of the JIRA status custom field
    #[serde(default = "default_status_field_id")]
    pub status_field_id: String,

    /// Only items carrying this label are synced
    #[serde(default)]
    pub sync_label: Option<String>,

    /// Extra JIRA lookups before concluding an issue does not exist
    #[serde(default = "default_find_jira_retries")]
    pub find_jira_retries: u32,

    /// Rewrite PR titles with the JIRA keys of the issues they close
    #[serde(default)]
    pub link_closing_issues: bool,

    /// Approvals a PR needs before it counts as ready
    #[serde(default = "default_minimum_approvals")]
    pub minimum_approvals: u32,

    /// Backoff curve between attempts; `max_retries` is ignored in favour
    /// of `find_jira_retries`
    #[serde(default)]
    pub backoff: RetryConfig,

    /// Items synced in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_status_field_id() -> String {
    DEFAULT_STATUS_FIELD_ID.to_string()
}

fn default_find_jira_retries() -> u32 {
    DEFAULT_FIND_JIRA_RETRIES
}

fn default_minimum_approvals() -> u32 {
    DEFAULT_MINIMUM_APPROVALS
}

fn default_concurrency() -> usize {
    1
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cron_job: false,
            status_field_id: default_status_field_id(),
            sync_label: None,
            find_jira_retries: DEFAULT_FIND_JIRA_RETRIES,
            link_closing_issues: false,
            minimum_approvals: DEFAULT_MINIMUM_APPROVALS,
            backoff: RetryConfig::default(),
            concurrency: default_concurrency(),
        }
    }
}

impl SyncConfig {
    /// Build from action inputs
    pub fn from_vars(vars: &Vars) -> Result<Self> {
        let defaults = Self::default();

        let status_field_id = vars
            .get("INPUT_STATUS_FIELD_ID")
            .map(|v| v.trim_start_matches("customfield_").to_string())
            .unwrap_or(defaults.status_field_id);

        let mut backoff = defaults.backoff;
        if let Some(ms) = vars.get("SYNC_BACKOFF_INITIAL_MS") {
            backoff.initial_backoff = Duration::from_millis(parse_millis("SYNC_BACKOFF_INITIAL_MS", ms)?);
        }
        if let Some(ms) = vars.get("SYNC_BACKOFF_MAX_MS") {
            backoff.max_backoff = Duration::from_millis(parse_millis("SYNC_BACKOFF_MAX_MS", ms)?);
        }
        if let Some(ms) = vars.get("SYNC_RETRY_AFTER_MAX_MS") {
            backoff.max_retry_after =
                Duration::from_millis(parse_millis("SYNC_RETRY_AFTER_MAX_MS", ms)?);
        }
        backoff.jitter = vars.get_bool("SYNC_BACKOFF_JITTER", backoff.jitter)?;

        Ok(Self {
            cron_job: vars.get_bool("INPUT_CRON_JOB", defaults.cron_job)?,
            status_field_id,
            sync_label: vars.get("INPUT_SYNC_LABEL").map(String::from),
            find_jira_retries: vars.get_u32("INPUT_FIND_JIRA_RETRIES", defaults.find_jira_retries)?,
            link_closing_issues: vars
                .get_bool("INPUT_LINK_CLOSING_ISSUES", defaults.link_closing_issues)?,
            minimum_approvals: vars.get_u32("INPUT_MINIMUM_APPROVALS", defaults.minimum_approvals)?,
            backoff,
            concurrency: vars.get_u32("SYNC_CONCURRENCY", defaults.concurrency as u32)? as usize,
        })
    }

    pub fn with_cron_job(mut self, cron_job: bool) -> Self {
        self.cron_job = cron_job;
        self
    }

    pub fn with_sync_label(mut self, label: impl Into<String>) -> Self {
        self.sync_label = Some(label.into());
        self
    }

    pub fn with_find_jira_retries(mut self, retries: u32) -> Self {
        self.find_jira_retries = retries;
        self
    }

    pub fn with_link_closing_issues(mut self, enabled: bool) -> Self {
        self.link_closing_issues = enabled;
        self
    }

    pub fn with_minimum_approvals(mut self, approvals: u32) -> Self {
        self.minimum_approvals = approvals;
        self
    }

    pub fn with_backoff(mut self, backoff: RetryConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Retry policy for lookups and transient failures
    pub fn retry_policy(&self) -> RetryConfig {
        self.backoff.clone().with_max_retries(self.find_jira_retries)
    }

    /// JIRA field name of the status custom field
    pub fn status_field_name(&self) -> String {
        format!("customfield_{}", self.status_field_id)
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| {
        crate::SyncError::Config(format!("{}: expected milliseconds, got '{}'", key, value))
    })
}
