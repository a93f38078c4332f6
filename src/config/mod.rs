//! Configuration system
//!
//! Builds the run's settings from action inputs:
//! - `SyncConfig`: scope, retry and approval behaviour (`INPUT_*`)
//! - `TrackerConfig`: JIRA and GitHub endpoints and credentials
//! - Optional YAML file with the same variable names, overridden by the
//!   environment
//!
//! Any problem here is a [`crate::SyncError::Config`] and aborts the run
//! before an item is touched.

mod integrations;
mod sync_config;
pub mod validation;
mod vars;

pub use integrations::{
    graphql_url_for, GitHubIntegration, JiraAuth, JiraIntegration, TrackerConfig,
    DEFAULT_GITHUB_API_URL, DEFAULT_JIRA_ISSUE_TYPE,
};
pub use sync_config::{
    SyncConfig, DEFAULT_FIND_JIRA_RETRIES, DEFAULT_MINIMUM_APPROVALS, DEFAULT_STATUS_FIELD_ID,
};
pub use validation::{validate_sync_config, validate_trackers, ValidationError};
pub use vars::Vars;

use crate::Result;
use std::path::Path;

/// Everything a run needs to know before it starts
#[derive(Debug, Clone)]
pub struct Settings {
    pub sync: SyncConfig,
    pub trackers: TrackerConfig,
}

impl Settings {
    /// Load from an optional YAML file overlaid with the process environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_vars(&Vars::load(file)?)
    }

    /// Parse and validate both records
    pub fn from_vars(vars: &Vars) -> Result<Self> {
        let sync = SyncConfig::from_vars(vars)?;
        let trackers = TrackerConfig::from_vars(vars)?;

        let mut errors = Vec::new();
        if let Err(mut e) = validate_sync_config(&sync) {
            errors.append(&mut e);
        }
        if let Err(mut e) = validate_trackers(&trackers) {
            errors.append(&mut e);
        }
        if !errors.is_empty() {
            return Err(validation::into_config_error(errors));
        }

        tracing::debug!(
            cron_job = sync.cron_job,
            sync_label = ?sync.sync_label,
            find_jira_retries = sync.find_jira_retries,
            link_closing_issues = sync.link_closing_issues,
            minimum_approvals = sync.minimum_approvals,
            repository = %trackers.github.repository,
            project = %trackers.jira.project,
            "Settings loaded"
        );

        Ok(Self { sync, trackers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Vars {
        Vars::from_pairs([
            ("JIRA_URL", "https://jira.example.com"),
            ("JIRA_PROJECT", "IDF"),
            ("JIRA_PASS", "token:abc"),
            ("GITHUB_TOKEN", "ghp_x"),
            ("GITHUB_REPOSITORY", "espressif/esp-idf"),
            ("INPUT_SYNC_LABEL", "jira-sync"),
        ])
    }

    #[test]
    fn test_settings_from_vars() {
        let settings = Settings::from_vars(&vars()).unwrap();
        assert_eq!(settings.sync.sync_label.as_deref(), Some("jira-sync"));
        assert_eq!(settings.trackers.jira.project, "IDF");
    }

    #[test]
    fn test_validation_failures_are_config_errors() {
        let mut vars = vars();
        vars.set("INPUT_STATUS_FIELD_ID", "abc");
        vars.set("JIRA_PROJECT", "lower");
        let err = Settings::from_vars(&vars).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("status_field_id"));
        assert!(msg.contains("jira.project"));
    }
}
