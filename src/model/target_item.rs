//! JIRA side of the sync

use super::{ItemKind, ItemState, JiraKey, SourceId, SourceItem};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value written to the JIRA status custom field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusValue {
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "In Review")]
    InReview,
    #[serde(rename = "Changes Requested")]
    ChangesRequested,
    #[serde(rename = "Ready")]
    Ready,
    #[serde(rename = "Closed")]
    Closed,
}

impl StatusValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusValue::Open => "Open",
            StatusValue::InReview => "In Review",
            StatusValue::ChangesRequested => "Changes Requested",
            StatusValue::Ready => "Ready",
            StatusValue::Closed => "Closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Open" => Some(StatusValue::Open),
            "In Review" => Some(StatusValue::InReview),
            "Changes Requested" => Some(StatusValue::ChangesRequested),
            "Ready" => Some(StatusValue::Ready),
            "Closed" => Some(StatusValue::Closed),
            _ => None,
        }
    }

    /// Status for an item, given whether it met the approval gate
    pub fn derive(item: &SourceItem, approval_ready: bool) -> Self {
        match (item.kind, item.state) {
            (_, ItemState::Closed) => StatusValue::Closed,
            (ItemKind::Issue, ItemState::Open) => StatusValue::Open,
            (ItemKind::PullRequest, ItemState::Open) => {
                if item.changes_requested {
                    StatusValue::ChangesRequested
                } else if approval_ready {
                    StatusValue::Ready
                } else {
                    StatusValue::InReview
                }
            }
        }
    }
}

/// Comment explaining a pull request status change to JIRA readers
///
/// Only moves between review states get a note; the first sync, repeats of
/// the same status and moves to or from Open and Closed do not.
pub fn transition_note(
    source: &SourceId,
    previous: Option<StatusValue>,
    next: StatusValue,
) -> Option<String> {
    use StatusValue::*;

    let previous = previous?;
    if previous == next || matches!(previous, Open | Closed) {
        return None;
    }
    let note = match next {
        Ready => "has met approval criteria and is ready to merge",
        ChangesRequested => "has new changes requested and moved back in progress",
        InReview => "has new changes or dismissed reviews and moved back to review",
        Open | Closed => return None,
    };
    Some(format!("GitHub pull request {} {}.", source, note))
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JIRA issue mirroring a [`SourceItem`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetItem {
    pub key: JiraKey,
    /// Raw value of the status custom field, if set
    pub status_field_value: Option<String>,
    /// Source item recorded on the JIRA issue
    pub linked_source_id: Option<SourceId>,
}

/// Everything the engine writes to JIRA for one item, in one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFields {
    pub summary: String,
    pub description: String,
    pub status: StatusValue,
    /// Source link label
    pub link_label: String,
    pub source_id: SourceId,
}

impl TargetFields {
    pub fn from_source(item: &SourceItem, status: StatusValue) -> Self {
        Self {
            summary: item.title.clone(),
            description: render_description(item),
            status,
            link_label: item.id.link_label(),
            source_id: item.id.clone(),
        }
    }
}

fn render_description(item: &SourceItem) -> String {
    let kind = match item.kind {
        ItemKind::Issue => "issue",
        ItemKind::PullRequest => "pull request",
    };
    let mut out = match &item.url {
        Some(url) => format!("[GitHub {} {}|{}]", kind, item.id, url),
        None => format!("GitHub {} {}", kind, item.id),
    };
    if let Some(author) = &item.author {
        out.push_str(&format!(" opened by {}", author));
    }
    if let Some(body) = item.body.as_deref().filter(|b| !b.trim().is_empty()) {
        out.push_str("\n\n");
        out.push_str(body);
    }
    out
}
