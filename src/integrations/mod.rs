//! External Integrations
//!
//! Adapters for the two trackers taking part in the sync.
//!
//! # Built-in Integrations
//!
//! - **GitHub**: REST + GraphQL adapter, the source of truth
//! - **JIRA**: REST v2 adapter, the mirror that the engine writes to
//!
//! The sync engine only talks to the trackers through [`SourceTracker`] and
//! [`TargetTracker`], so it can run against in-memory trackers in tests.

pub mod github;
pub mod jira;
pub mod retry;

use crate::event::ItemRef;
use crate::model::{JiraKey, SourceId, SourceItem, StatusValue, TargetFields, TargetItem};
use crate::Result;
use async_trait::async_trait;

pub use github::{GitHubAdapter, GitHubIssue, ReviewStatus};
pub use jira::{JiraAdapter, JiraIssue};
pub use retry::{with_retry, RetryConfig, RetryDecision, RetryableError};

/// Write access to the tracker items come from
#[async_trait]
pub trait SourceTracker: Send + Sync {
    /// Replace the title of an issue or pull request
    async fn update_title(&self, item: &SourceItem, title: &str) -> Result<()>;
}

/// Turns item references from an event into hydrated items
#[async_trait]
pub trait ItemLoader: Send + Sync {
    /// Id the item will have once loaded, for reporting load failures
    fn source_id(&self, item: &ItemRef) -> SourceId;

    async fn load(&self, item: &ItemRef) -> Result<SourceItem>;
}

/// The tracker items are mirrored into
#[async_trait]
pub trait TargetTracker: Send + Sync {
    /// Project key that issue keys on this tracker start with
    fn project_key(&self) -> &str;

    /// Look up the issue stamped with this source's link, if any
    async fn find_by_source(&self, source: &SourceId) -> Result<Option<TargetItem>>;

    /// Create an issue carrying all of `fields` in a single request
    async fn create(&self, fields: &TargetFields) -> Result<TargetItem>;

    /// Overwrite an issue's fields in a single request
    async fn update(&self, key: &JiraKey, fields: &TargetFields) -> Result<TargetItem>;

    /// Change only the status field
    async fn set_status(&self, key: &JiraKey, status: StatusValue) -> Result<()>;

    async fn add_comment(&self, key: &JiraKey, body: &str) -> Result<()>;
}
