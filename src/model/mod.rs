//! Core data structures
//!
//! Defines SourceItem (GitHub), TargetItem (JIRA) and the ids tying them together.

mod ids;
mod source_item;
mod target_item;

pub use ids::{JiraKey, SourceId, SOURCE_LINK_PREFIX};
pub use source_item::{ClosingIssueRef, ItemKind, ItemState, ReviewDecision, SourceItem};
pub use target_item::{transition_note, StatusValue, TargetFields, TargetItem};
