//! GitHub side of the sync
//!
//! A [`SourceItem`] is a GitHub issue or pull request as the engine sees it,
//! already hydrated with review and closing-issue data.

use super::SourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Issue or pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Issue,
    PullRequest,
}

/// GitHub state of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Open,
    Closed,
}

impl ItemState {
    /// Parse GitHub's `state` field (REST uses lowercase, GraphQL uppercase)
    pub fn parse(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "closed" | "merged" => ItemState::Closed,
            _ => ItemState::Open,
        }
    }
}

/// GitHub's overall review verdict on a pull request
///
/// Absent when the repository does not require reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    ReviewRequired,
}

impl ReviewDecision {
    /// Parse GraphQL's `reviewDecision`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "APPROVED" => Some(ReviewDecision::Approved),
            "CHANGES_REQUESTED" => Some(ReviewDecision::ChangesRequested),
            "REVIEW_REQUIRED" => Some(ReviewDecision::ReviewRequired),
            _ => None,
        }
    }
}

/// An issue that a pull request will close when merged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingIssueRef {
    pub number: u64,
    pub title: String,
}

impl ClosingIssueRef {
    pub fn new(number: u64, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
        }
    }
}

/// A GitHub issue or pull request considered for sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: SourceId,
    /// Issue/PR number in its repository (0 when built by hand)
    #[serde(default)]
    pub number: u64,
    pub kind: ItemKind,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    pub state: ItemState,
    #[serde(default)]
    pub author: Option<String>,
    /// Issues this PR closes, in GitHub's order. Always empty for issues.
    #[serde(default)]
    pub closing_issue_refs: Vec<ClosingIssueRef>,
    #[serde(default)]
    pub approval_count: u32,
    /// A reviewer currently requests changes
    #[serde(default)]
    pub changes_requested: bool,
    #[serde(default)]
    pub review_decision: Option<ReviewDecision>,
    /// Item was created or updated by the event that triggered this run
    #[serde(default = "default_true")]
    pub from_event: bool,
    #[serde(default)]
    pub author_is_collaborator: bool,
}

fn default_true() -> bool {
    true
}

impl SourceItem {
    /// Open issue with no labels, as delivered by a webhook event
    pub fn issue(id: impl Into<SourceId>, title: impl Into<String>) -> Self {
        Self::new(id.into(), ItemKind::Issue, title.into())
    }

    /// Open pull request with no reviews, as delivered by a webhook event
    pub fn pull_request(id: impl Into<SourceId>, title: impl Into<String>) -> Self {
        Self::new(id.into(), ItemKind::PullRequest, title.into())
    }

    fn new(id: SourceId, kind: ItemKind, title: String) -> Self {
        Self {
            id,
            number: 0,
            kind,
            title,
            body: None,
            url: None,
            labels: BTreeSet::new(),
            state: ItemState::Open,
            author: None,
            closing_issue_refs: Vec::new(),
            approval_count: 0,
            changes_requested: false,
            review_decision: None,
            from_event: true,
            author_is_collaborator: false,
        }
    }

    pub fn with_number(mut self, number: u64) -> Self {
        self.number = number;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.insert(label.into());
        self
    }

    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }

    pub fn with_author(mut self, login: impl Into<String>, is_collaborator: bool) -> Self {
        self.author = Some(login.into());
        self.author_is_collaborator = is_collaborator;
        self
    }

    pub fn with_closing_issue(mut self, reference: ClosingIssueRef) -> Self {
        self.closing_issue_refs.push(reference);
        self
    }

    pub fn with_approvals(mut self, approval_count: u32) -> Self {
        self.approval_count = approval_count;
        self
    }

    pub fn with_changes_requested(mut self, changes_requested: bool) -> Self {
        self.changes_requested = changes_requested;
        self
    }

    pub fn with_review_decision(mut self, decision: ReviewDecision) -> Self {
        self.review_decision = Some(decision);
        self
    }

    pub fn with_from_event(mut self, from_event: bool) -> Self {
        self.from_event = from_event;
        self
    }

    pub fn is_pull_request(&self) -> bool {
        self.kind == ItemKind::PullRequest
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}
