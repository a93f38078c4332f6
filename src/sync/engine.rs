//! Sync engine
//!
//! Drives one [`SourceItem`] at a time through the scope rules and into
//! JIRA: find the mirrored issue with a bounded, retried lookup, then update
//! it or create it. A batch runs items through an ordered worker pool.

use super::matcher::{evaluate, KeyPattern, SkipReason, Verdict};
use crate::config::SyncConfig;
use crate::event::ItemRef;
use crate::integrations::{
    with_retry, ItemLoader, RetryConfig, RetryDecision, RetryableError, SourceTracker,
    TargetTracker,
};
use crate::model::{
    transition_note, JiraKey, SourceId, SourceItem, StatusValue, TargetFields, TargetItem,
};
use crate::{Result, SyncError};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, info, warn};

/// Terminal state of one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    Created(JiraKey),
    Updated(JiraKey),
    /// Closing-issue keys recorded in the PR title; JIRA untouched
    LinkedOnly { keys: Vec<String> },
    SkippedOutOfScope(SkipReason),
    Failed(String),
}

impl SyncResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncResult::Failed(_))
    }

    /// Short name used in reports
    pub fn label(&self) -> &'static str {
        match self {
            SyncResult::Created(_) => "created",
            SyncResult::Updated(_) => "updated",
            SyncResult::LinkedOnly { .. } => "linked",
            SyncResult::SkippedOutOfScope(_) => "skipped",
            SyncResult::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncResult::Created(key) => write!(f, "created {}", key),
            SyncResult::Updated(key) => write!(f, "updated {}", key),
            SyncResult::LinkedOnly { keys } if keys.is_empty() => {
                f.write_str("linked (no JIRA keys in closing issues)")
            }
            SyncResult::LinkedOnly { keys } => write!(f, "linked to {}", keys.join(" ")),
            SyncResult::SkippedOutOfScope(reason) => write!(f, "skipped: {}", reason),
            SyncResult::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Lookup outcome as seen by the retry loop
///
/// Not finding the issue is retried like a transient failure, so that a
/// concurrent run has time to finish creating it.
#[derive(Debug)]
enum LookupError {
    NotFound,
    Tracker(SyncError),
}

impl RetryableError for LookupError {
    fn retry_decision(&self) -> RetryDecision {
        match self {
            LookupError::NotFound => RetryDecision::Retry,
            LookupError::Tracker(e) => e.retry_decision(),
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::NotFound => f.write_str("no linked JIRA issue yet"),
            LookupError::Tracker(e) => e.fmt(f),
        }
    }
}

/// One-way GitHub to JIRA sync
pub struct SyncEngine<S, T> {
    source: S,
    target: T,
    config: SyncConfig,
    keys: KeyPattern,
}

impl<S: SourceTracker, T: TargetTracker> SyncEngine<S, T> {
    pub fn new(source: S, target: T, config: SyncConfig) -> Result<Self> {
        let keys = KeyPattern::new(target.project_key())?;
        Ok(Self {
            source,
            target,
            config,
            keys,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    fn retry_policy(&self) -> RetryConfig {
        self.config.retry_policy()
    }

    /// Sync one item. Never panics or returns an error; failures are a
    /// [`SyncResult::Failed`].
    ///
    /// Only a linked-only item is modified, and only its title.
    pub async fn sync(&self, item: &mut SourceItem) -> SyncResult {
        let result = match self.try_sync(item).await {
            Ok(result) => result,
            Err(e) => SyncResult::Failed(e.to_string()),
        };
        log_result(&item.id, &result);
        result
    }

    async fn try_sync(&self, item: &mut SourceItem) -> Result<SyncResult> {
        let ready = match evaluate(item, &self.config) {
            Verdict::Skip(reason) => return Ok(SyncResult::SkippedOutOfScope(reason)),
            Verdict::LinkOnly => return self.link_closing_issues(item).await,
            Verdict::Eligible { ready } => ready,
        };

        let status = StatusValue::derive(item, ready);
        let fields = TargetFields::from_source(item, status);

        match self.find_linked(&item.id).await? {
            Some(existing) => {
                debug!(id = %item.id, key = %existing.key, status = %status, "Updating linked issue");
                let previous = existing
                    .status_field_value
                    .as_deref()
                    .and_then(StatusValue::parse);
                let updated = with_retry(&self.retry_policy(), "update_jira_issue", || {
                    self.target.update(&existing.key, &fields)
                })
                .await?;

                if item.is_pull_request() {
                    if let Some(note) = transition_note(&item.id, previous, status) {
                        self.comment(&updated.key, &note).await;
                    }
                }
                Ok(SyncResult::Updated(updated.key))
            }
            None => {
                let created = self.create_with_recheck(&fields).await?;
                Ok(SyncResult::Created(created.key))
            }
        }
    }

    /// Put the closing issues' keys in the PR title
    async fn link_closing_issues(&self, item: &mut SourceItem) -> Result<SyncResult> {
        let keys = self.keys.extract_keys(&item.closing_issue_refs);
        let title = self.keys.link_title(&item.title, &keys);

        if title != item.title {
            debug!(id = %item.id, from = %item.title, to = %title, "Linking PR title");
            let source = &self.source;
            let current = &*item;
            with_retry(&self.retry_policy(), "update_github_title", || {
                source.update_title(current, &title)
            })
            .await?;
            item.title = title;
        }

        Ok(SyncResult::LinkedOnly { keys })
    }

    /// Add a comment; failing to do so only costs the note, not the sync
    async fn comment(&self, key: &JiraKey, body: &str) {
        let target = &self.target;
        let added = with_retry(&self.retry_policy(), "comment_jira_issue", || {
            target.add_comment(key, body)
        })
        .await;
        if let Err(e) = added {
            warn!(key = %key, error = %e, "Failed to add JIRA comment");
        }
    }

    /// Close the JIRA mirror of an issue deleted on GitHub
    pub async fn close_deleted(&self, source: &SourceId) -> SyncResult {
        let result = match self.try_close_deleted(source).await {
            Ok(result) => result,
            Err(e) => SyncResult::Failed(e.to_string()),
        };
        log_result(source, &result);
        result
    }

    async fn try_close_deleted(&self, source: &SourceId) -> Result<SyncResult> {
        let target = &self.target;
        // no waiting for a concurrent create: nothing will create it now
        let existing = with_retry(&self.retry_policy(), "find_jira_issue", || {
            target.find_by_source(source)
        })
        .await?;

        let Some(existing) = existing else {
            return Ok(SyncResult::SkippedOutOfScope(SkipReason::GoneFromGitHub));
        };

        if existing.status_field_value.as_deref() != Some(StatusValue::Closed.as_str()) {
            with_retry(&self.retry_policy(), "close_jira_issue", || {
                target.set_status(&existing.key, StatusValue::Closed)
            })
            .await?;
        }
        self.comment(
            &existing.key,
            &format!("GitHub issue {} was deleted.", source),
        )
        .await;

        Ok(SyncResult::Updated(existing.key))
    }

    /// Look up the linked issue, up to `find_jira_retries + 1` times
    async fn find_linked(&self, source: &SourceId) -> Result<Option<TargetItem>> {
        let target = &self.target;
        let found = with_retry(&self.retry_policy(), "find_jira_issue", || async move {
            match target.find_by_source(source).await {
                Ok(Some(item)) => Ok(item),
                Ok(None) => Err(LookupError::NotFound),
                Err(e) => Err(LookupError::Tracker(e)),
            }
        })
        .await;

        match found {
            Ok(item) => Ok(Some(item)),
            Err(LookupError::NotFound) => Ok(None),
            Err(LookupError::Tracker(e)) => Err(e),
        }
    }

    /// Create, re-running the lookup before every retry so a create that
    /// landed despite an error is not repeated
    async fn create_with_recheck(&self, fields: &TargetFields) -> Result<TargetItem> {
        let target = &self.target;
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        with_retry(&self.retry_policy(), "create_jira_issue", || async move {
            if attempts.fetch_add(1, Ordering::Relaxed) > 0 {
                if let Some(existing) = target.find_by_source(&fields.source_id).await? {
                    info!(id = %fields.source_id, key = %existing.key, "Issue appeared before create retry");
                    return Ok(existing);
                }
            }
            target.create(fields).await
        })
        .await
    }

    /// Sync already loaded items, in order, `concurrency` at a time
    pub async fn sync_batch(&self, items: Vec<SourceItem>) -> Vec<(SourceId, SyncResult)> {
        stream::iter(items)
            .map(|mut item| async move {
                let result = self.sync(&mut item).await;
                (item.id, result)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    /// Load and sync item references, in order, `concurrency` at a time
    ///
    /// An item that cannot be loaded is reported as failed without
    /// affecting the rest of the batch. An item named by the event that
    /// GitHub no longer has (404 or 410) is skipped, and a deleted one
    /// closes its JIRA mirror.
    pub async fn run<L: ItemLoader>(
        &self,
        loader: &L,
        refs: Vec<ItemRef>,
    ) -> Vec<(SourceId, SyncResult)> {
        let policy = self.retry_policy();
        let policy = &policy;

        stream::iter(refs)
            .map(|item_ref| async move {
                if item_ref.deleted {
                    let id = loader.source_id(&item_ref);
                    let result = self.close_deleted(&id).await;
                    return (id, result);
                }

                let loaded =
                    with_retry(policy, "load_source_item", || loader.load(&item_ref)).await;
                match loaded {
                    Ok(mut item) => {
                        let result = self.sync(&mut item).await;
                        (item.id, result)
                    }
                    Err(SyncError::NotFound(detail)) if item_ref.from_event => {
                        let id = loader.source_id(&item_ref);
                        info!(id = %id, detail = %detail, "Item is gone from GitHub, skipping");
                        (id, SyncResult::SkippedOutOfScope(SkipReason::GoneFromGitHub))
                    }
                    Err(e) => {
                        let id = loader.source_id(&item_ref);
                        warn!(id = %id, error = %e, "Failed to load item");
                        (id, SyncResult::Failed(format!("load failed: {}", e)))
                    }
                }
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }
}

fn log_result(id: &SourceId, result: &SyncResult) {
    match result {
        SyncResult::Failed(reason) => warn!(id = %id, reason = %reason, "Sync failed"),
        other => info!(id = %id, result = other.label(), "{}", other),
    }
}
