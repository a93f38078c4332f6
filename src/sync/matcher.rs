//! Scope rules
//!
//! An ordered rule chain deciding what happens to a [`SourceItem`] before
//! any tracker is contacted. Evaluation is pure.

use crate::config::SyncConfig;
use crate::model::{ClosingIssueRef, ReviewDecision, SourceItem};
use crate::{Result, SyncError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an item was left alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingSyncLabel { label: String },
    /// A pull request that the triggering event did not touch
    NotInTriggeringEvent,
    /// Pull request opened by a collaborator without the sync label
    CollaboratorPullRequest,
    /// Deleted on GitHub or no longer visible, with no JIRA mirror to close
    GoneFromGitHub,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingSyncLabel { label } => write!(f, "missing the '{}' label", label),
            SkipReason::NotInTriggeringEvent => f.write_str("not part of the triggering event"),
            SkipReason::CollaboratorPullRequest => f.write_str("pull request from a collaborator"),
            SkipReason::GoneFromGitHub => f.write_str("no longer on GitHub"),
        }
    }
}

/// Outcome of the rule chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Skip(SkipReason),
    /// Record closing-issue keys in the PR title instead of syncing
    LinkOnly,
    /// Sync; `ready` is true when the PR passed the approval gate
    Eligible { ready: bool },
}

/// Apply the scope rules in order
pub fn evaluate(item: &SourceItem, cfg: &SyncConfig) -> Verdict {
    let has_sync_label = cfg
        .sync_label
        .as_deref()
        .is_some_and(|label| item.has_label(label));

    if let Some(label) = &cfg.sync_label {
        if !has_sync_label {
            return Verdict::Skip(SkipReason::MissingSyncLabel {
                label: label.clone(),
            });
        }
    }

    if !cfg.cron_job && item.is_pull_request() && !item.from_event {
        return Verdict::Skip(SkipReason::NotInTriggeringEvent);
    }

    if cfg.link_closing_issues && item.is_pull_request() && !item.closing_issue_refs.is_empty() {
        return Verdict::LinkOnly;
    }

    if item.is_pull_request() && item.author_is_collaborator && !has_sync_label {
        return Verdict::Skip(SkipReason::CollaboratorPullRequest);
    }

    Verdict::Eligible {
        ready: approval_ready(item, cfg),
    }
}

/// Whether the item passes the rule chain at all
pub fn is_in_scope(item: &SourceItem, cfg: &SyncConfig) -> bool {
    !matches!(evaluate(item, cfg), Verdict::Skip(_))
}

/// Enough approvals, nobody requesting changes and no review still
/// required by branch protection. Issues never qualify.
pub fn approval_ready(item: &SourceItem, cfg: &SyncConfig) -> bool {
    item.is_pull_request()
        && item.approval_count >= cfg.minimum_approvals
        && !item.changes_requested
        && !matches!(
            item.review_decision,
            Some(ReviewDecision::ChangesRequested | ReviewDecision::ReviewRequired)
        )
}

/// Matches `<PROJECT>-<digits>` issue keys
#[derive(Debug, Clone)]
pub struct KeyPattern {
    key: Regex,
    empty_parens: Regex,
}

impl KeyPattern {
    pub fn new(project: &str) -> Result<Self> {
        let key = Regex::new(&format!(r"\b{}-\d+\b", regex::escape(project)))
            .map_err(|e| SyncError::Config(format!("Invalid project key pattern: {}", e)))?;
        let empty_parens = Regex::new(r"\(\s*\)")
            .map_err(|e| SyncError::Config(format!("Invalid pattern: {}", e)))?;
        Ok(Self { key, empty_parens })
    }

    /// Keys mentioned in closing-issue titles, first mention first
    pub fn extract_keys(&self, refs: &[ClosingIssueRef]) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for m in refs.iter().flat_map(|r| self.key.find_iter(&r.title)) {
            if !keys.iter().any(|k| k == m.as_str()) {
                keys.push(m.as_str().to_string());
            }
        }
        keys
    }

    /// `title` with any existing keys replaced by ` (KEY1 KEY2)` at the end
    pub fn link_title(&self, title: &str, keys: &[String]) -> String {
        if keys.is_empty() {
            return title.to_string();
        }

        let stripped = self.key.replace_all(title, "");
        let stripped = self.empty_parens.replace_all(&stripped, "");
        let stripped = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

        if stripped.is_empty() {
            format!("({})", keys.join(" "))
        } else {
            format!("{} ({})", stripped, keys.join(" "))
        }
    }
}
