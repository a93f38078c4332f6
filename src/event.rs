//! Workflow event intake
//!
//! Turns the event that started the run (`GITHUB_EVENT_NAME` plus the JSON
//! payload at `GITHUB_EVENT_PATH`) into the issue and pull request numbers
//! to sync. Unknown events yield nothing.
//!
//! Every `issues` and `pull_request` action re-syncs the whole item, so
//! opened, edited, closed, reopened, labeled and unlabeled all converge on
//! the same JIRA state. A deleted issue closes its JIRA mirror instead.
//! Comment events re-sync the parent item; comment bodies are not copied.

use crate::integrations::GitHubAdapter;
use crate::{Result, SyncError};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// `inputs.action` value that requests a manual mirror
pub const MIRROR_ISSUES_ACTION: &str = "mirror-issues";

/// What the triggering event asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Explicit issue or pull request numbers
    Items(Vec<u64>),
    /// An issue deleted on GitHub; only its JIRA mirror is left to update
    Deleted(u64),
    /// A review finished; sync the most recently updated pull request
    MostRecentPull,
    /// Cron sweep over every open pull request
    OpenPulls,
    /// Nothing to do for this event
    Ignored(String),
}

/// One issue or pull request to load and sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRef {
    pub number: u64,
    /// Part of the triggering event, as opposed to a cron re-check
    pub from_event: bool,
    /// Deleted on GitHub, so there is nothing to load
    pub deleted: bool,
}

impl ItemRef {
    /// An item named by the triggering event
    pub fn event(number: u64) -> Self {
        Self {
            number,
            from_event: true,
            deleted: false,
        }
    }

    /// An open pull request picked up by the cron sweep
    pub fn sweep(number: u64) -> Self {
        Self {
            number,
            from_event: false,
            deleted: false,
        }
    }

    pub fn deleted(number: u64) -> Self {
        Self {
            number,
            from_event: true,
            deleted: true,
        }
    }
}

/// Read an event payload file
pub fn read_payload(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SyncError::Event(format!("Cannot read event payload {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        SyncError::Event(format!("Invalid event payload {}: {}", path.display(), e))
    })
}

/// Decide what to sync from an event name and payload
pub fn parse_trigger(event_name: &str, payload: &Value) -> Result<Trigger> {
    debug!(event = %event_name, "Parsing trigger");

    match event_name {
        "issues" if action(payload) == Some("deleted") => {
            Ok(Trigger::Deleted(payload_number(payload, "issue")?))
        }
        "issues" | "issue_comment" => Ok(Trigger::Items(vec![payload_number(payload, "issue")?])),
        "pull_request" | "pull_request_target" => {
            Ok(Trigger::Items(vec![payload_number(payload, "pull_request")?]))
        }
        "workflow_run" => {
            let run_event = payload
                .pointer("/workflow_run/event")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if run_event == "pull_request_review" {
                Ok(Trigger::MostRecentPull)
            } else {
                Ok(Trigger::Ignored(format!(
                    "workflow_run from '{}' is not a review",
                    run_event
                )))
            }
        }
        "workflow_dispatch" => dispatch_numbers(payload),
        other => Ok(Trigger::Ignored(format!("No handler for event '{}'", other))),
    }
}

fn action(payload: &Value) -> Option<&str> {
    payload.get("action").and_then(Value::as_str)
}

fn payload_number(payload: &Value, key: &str) -> Result<u64> {
    payload
        .get(key)
        .and_then(|item| item.get("number"))
        .and_then(Value::as_u64)
        .ok_or_else(|| SyncError::Event(format!("Event payload has no {}.number", key)))
}

fn dispatch_numbers(payload: &Value) -> Result<Trigger> {
    let Some(inputs) = payload.get("inputs") else {
        return Ok(Trigger::Ignored(
            "workflow_dispatch without inputs".to_string(),
        ));
    };

    let action = inputs.get("action").and_then(Value::as_str);
    if action != Some(MIRROR_ISSUES_ACTION) {
        return Ok(Trigger::Ignored(format!(
            "workflow_dispatch needs action '{}'",
            MIRROR_ISSUES_ACTION
        )));
    }

    let raw = inputs
        .get("issue-numbers")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let numbers = parse_number_list(raw)?;
    if numbers.is_empty() {
        return Ok(Trigger::Ignored(
            "workflow_dispatch needs input 'issue-numbers'".to_string(),
        ));
    }
    Ok(Trigger::Items(numbers))
}

/// Parse `"1, 2,#3"` into numbers, keeping order and dropping repeats
pub fn parse_number_list(raw: &str) -> Result<Vec<u64>> {
    let mut numbers = Vec::new();
    for part in raw.split(',') {
        let part = part.trim().trim_start_matches('#');
        if part.is_empty() {
            continue;
        }
        let number: u64 = part
            .parse()
            .map_err(|_| SyncError::Event(format!("Invalid issue number '{}'", part)))?;
        if !numbers.contains(&number) {
            numbers.push(number);
        }
    }
    Ok(numbers)
}

/// Resolve a trigger into item references, asking GitHub where needed
pub async fn resolve(trigger: &Trigger, github: &GitHubAdapter) -> Result<Vec<ItemRef>> {
    let refs = match trigger {
        Trigger::Items(numbers) => numbers.iter().map(|&n| ItemRef::event(n)).collect(),
        Trigger::Deleted(number) => vec![ItemRef::deleted(*number)],
        Trigger::MostRecentPull => github
            .most_recently_updated_pull()
            .await?
            .map(ItemRef::event)
            .into_iter()
            .collect(),
        Trigger::OpenPulls => github
            .list_open_pulls()
            .await?
            .into_iter()
            .map(|pull| ItemRef::sweep(pull.number))
            .collect(),
        Trigger::Ignored(reason) => {
            info!(reason = %reason, "Event ignored");
            Vec::new()
        }
    };

    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_issue_events() {
        let payload = json!({ "action": "opened", "issue": { "number": 42 } });
        assert_eq!(
            parse_trigger("issues", &payload).unwrap(),
            Trigger::Items(vec![42])
        );
        assert_eq!(
            parse_trigger("issue_comment", &payload).unwrap(),
            Trigger::Items(vec![42])
        );
    }

    #[test]
    fn test_issue_lifecycle_actions_resync() {
        for action in ["opened", "edited", "closed", "reopened", "labeled", "unlabeled"] {
            let payload = json!({ "action": action, "issue": { "number": 42 } });
            assert_eq!(
                parse_trigger("issues", &payload).unwrap(),
                Trigger::Items(vec![42]),
                "action {}",
                action
            );
        }
    }

    #[test]
    fn test_deleted_issue() {
        let payload = json!({ "action": "deleted", "issue": { "number": 42 } });
        assert_eq!(
            parse_trigger("issues", &payload).unwrap(),
            Trigger::Deleted(42)
        );

        // a deleted comment still re-syncs its issue
        assert_eq!(
            parse_trigger("issue_comment", &payload).unwrap(),
            Trigger::Items(vec![42])
        );

        let missing = json!({ "action": "deleted", "issue": {} });
        assert!(matches!(
            parse_trigger("issues", &missing),
            Err(SyncError::Event(_))
        ));
    }

    #[test]
    fn test_pull_request_events() {
        let payload = json!({ "action": "synchronize", "pull_request": { "number": 7 } });
        assert_eq!(
            parse_trigger("pull_request", &payload).unwrap(),
            Trigger::Items(vec![7])
        );
        assert_eq!(
            parse_trigger("pull_request_target", &payload).unwrap(),
            Trigger::Items(vec![7])
        );
    }

    #[test]
    fn test_missing_number_is_event_error() {
        let err = parse_trigger("issues", &json!({ "action": "opened" })).unwrap_err();
        assert!(matches!(err, SyncError::Event(_)));
    }

    #[test]
    fn test_workflow_run_review() {
        let payload = json!({ "workflow_run": { "event": "pull_request_review" } });
        assert_eq!(
            parse_trigger("workflow_run", &payload).unwrap(),
            Trigger::MostRecentPull
        );

        let push = json!({ "workflow_run": { "event": "push" } });
        assert!(matches!(
            parse_trigger("workflow_run", &push).unwrap(),
            Trigger::Ignored(_)
        ));
    }

    #[test]
    fn test_workflow_dispatch_mirror() {
        let payload = json!({
            "inputs": { "action": "mirror-issues", "issue-numbers": "3, 5,#8,5" }
        });
        assert_eq!(
            parse_trigger("workflow_dispatch", &payload).unwrap(),
            Trigger::Items(vec![3, 5, 8])
        );
    }

    #[test]
    fn test_workflow_dispatch_without_mirror_action() {
        let wrong_action = json!({ "inputs": { "action": "other", "issue-numbers": "1" } });
        assert!(matches!(
            parse_trigger("workflow_dispatch", &wrong_action).unwrap(),
            Trigger::Ignored(_)
        ));

        let no_numbers = json!({ "inputs": { "action": "mirror-issues" } });
        assert!(matches!(
            parse_trigger("workflow_dispatch", &no_numbers).unwrap(),
            Trigger::Ignored(_)
        ));

        assert!(matches!(
            parse_trigger("workflow_dispatch", &json!({})).unwrap(),
            Trigger::Ignored(_)
        ));
    }

    #[test]
    fn test_invalid_dispatch_number() {
        assert!(parse_number_list("1,abc").is_err());
        assert_eq!(parse_number_list(" , ").unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        assert!(matches!(
            parse_trigger("push", &json!({})).unwrap(),
            Trigger::Ignored(_)
        ));
    }

    #[test]
    fn test_read_payload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"issue": {{"number": 9}}}}"#).unwrap();

        let payload = read_payload(file.path()).unwrap();
        assert_eq!(
            parse_trigger("issues", &payload).unwrap(),
            Trigger::Items(vec![9])
        );

        let missing = read_payload(Path::new("/nonexistent/event.json"));
        assert!(matches!(missing, Err(SyncError::Event(_))));

        let mut garbled = tempfile::NamedTempFile::new().unwrap();
        write!(garbled, "{{not json").unwrap();
        assert!(matches!(read_payload(garbled.path()), Err(SyncError::Event(_))));
    }

    #[tokio::test]
    async fn test_resolve_items_without_network() {
        use crate::config::GitHubIntegration;

        let github = GitHubAdapter::new(GitHubIntegration {
            api_url: "http://127.0.0.1:9".into(),
            graphql_url: "http://127.0.0.1:9/graphql".into(),
            repository: "o/r".into(),
            token: "t".into(),
        })
        .unwrap();

        let refs = resolve(&Trigger::Items(vec![1, 2]), &github).await.unwrap();
        assert_eq!(refs, vec![ItemRef::event(1), ItemRef::event(2)]);
        assert!(refs.iter().all(|r| r.from_event && !r.deleted));

        let deleted = resolve(&Trigger::Deleted(3), &github).await.unwrap();
        assert_eq!(deleted, vec![ItemRef::deleted(3)]);

        let none = resolve(&Trigger::Ignored("x".into()), &github).await.unwrap();
        assert!(none.is_empty());
    }
}
