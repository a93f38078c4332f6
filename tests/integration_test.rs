//! Integration tests for gh-jira-sync
//!
//! These tests verify the full workflow from settings and event intake
//! through the GitHub and JIRA adapters, against mock HTTP servers.

use gh_jira_sync::config::{Settings, Vars};
use gh_jira_sync::event::{self, ItemRef, Trigger};
use gh_jira_sync::integrations::{GitHubAdapter, JiraAdapter};
use gh_jira_sync::model::JiraKey;
use gh_jira_sync::sync::{
    self, exit_code_for_error, BatchReport, RunOptions, SkipReason, SyncEngine, SyncResult,
    EXIT_CONFIG_ERROR, EXIT_OK,
};
use serde_json::json;
use std::io::Write;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Settings file pointing both trackers at mock servers
fn write_settings(dir: &TempDir, github: &str, jira: &str, extra: &str) -> std::path::PathBuf {
    let path = dir.path().join("sync.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"
JIRA_URL: "{jira}"
JIRA_PROJECT: IDF
JIRA_PASS: "token:secret"
GITHUB_API_URL: "{github}"
GITHUB_GRAPHQL_URL: "{github}/graphql"
GITHUB_REPOSITORY: espressif/esp-idf
GITHUB_TOKEN: ghp_test
INPUT_SYNC_LABEL: jira-sync
INPUT_STATUS_FIELD_ID: 12100
SYNC_BACKOFF_INITIAL_MS: 0
SYNC_BACKOFF_MAX_MS: 0
SYNC_RETRY_AFTER_MAX_MS: 0
SYNC_BACKOFF_JITTER: false
{extra}
"#
    )
    .unwrap();
    path
}

fn load(path: &std::path::Path) -> Settings {
    Settings::from_vars(&Vars::from_yaml_file(path).unwrap()).unwrap()
}

fn engine(settings: &Settings) -> SyncEngine<GitHubAdapter, JiraAdapter> {
    let github = GitHubAdapter::new(settings.trackers.github.clone())
        .unwrap()
        .with_closing_refs(settings.sync.link_closing_issues);
    let jira = JiraAdapter::new(
        settings.trackers.jira.clone(),
        settings.sync.status_field_name(),
    )
    .unwrap();
    SyncEngine::new(github, jira, settings.sync.clone()).unwrap()
}

async fn mount_issue(server: &MockServer, number: u64, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/espressif/esp-idf/issues/{}", number)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

mod config_tests {
    use super::*;

    #[test]
    fn test_settings_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = write_settings(
            &dir,
            "https://api.github.com",
            "https://jira.example.com",
            "INPUT_FIND_JIRA_RETRIES: 2\nINPUT_MINIMUM_APPROVALS: 1",
        );

        let settings = load(&path);
        assert_eq!(settings.sync.find_jira_retries, 2);
        assert_eq!(settings.sync.minimum_approvals, 1);
        assert_eq!(settings.sync.status_field_name(), "customfield_12100");
        assert_eq!(settings.trackers.github.owner(), "espressif");
    }

    #[test]
    fn test_invalid_settings_file() {
        let dir = TempDir::new().unwrap();
        let path = write_settings(&dir, "api.github.com", "https://jira.example.com", "");
        let vars = Vars::from_yaml_file(&path).unwrap();
        assert!(Settings::from_vars(&vars).is_err());
    }
}

mod sync_tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_event_creates_jira_issue() {
        let github = MockServer::start().await;
        let jira = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let settings = load(&write_settings(
            &dir,
            &github.uri(),
            &jira.uri(),
            "INPUT_FIND_JIRA_RETRIES: 2",
        ));

        mount_issue(
            &github,
            42,
            json!({
                "number": 42,
                "title": "Crash on boot",
                "body": "Backtrace attached",
                "state": "open",
                "html_url": "https://github.com/espressif/esp-idf/issues/42",
                "user": { "login": "reporter" },
                "labels": [ { "name": "jira-sync" } ]
            }),
        )
        .await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .and(query_param(
                "jql",
                "project = \"IDF\" AND labels = \"gh-espressif_sesp-idf_n42\" ORDER BY created ASC",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total": 0, "issues": [] })))
            .expect(3)
            .mount(&jira)
            .await;

        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue"))
            .and(body_partial_json(json!({
                "fields": {
                    "summary": "Crash on boot",
                    "labels": ["gh-espressif_sesp-idf_n42"],
                    "customfield_12100": { "value": "Open" }
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "key": "IDF-101" })))
            .expect(1)
            .mount(&jira)
            .await;

        let payload = json!({ "action": "opened", "issue": { "number": 42 } });
        let trigger = event::parse_trigger("issues", &payload).unwrap();
        let engine = engine(&settings);
        let refs = event::resolve(&trigger, engine.source()).await.unwrap();

        let mut report = BatchReport::start();
        report.extend(engine.run(engine.source(), refs).await);
        report.finish();

        assert_eq!(report.entries().len(), 1);
        assert_eq!(
            report.entries()[0].result,
            SyncResult::Created(JiraKey::new("IDF-101"))
        );
        assert_eq!(report.exit_code(), EXIT_OK);
    }

    #[tokio::test]
    async fn test_existing_issue_is_updated() {
        let github = MockServer::start().await;
        let jira = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let settings = load(&write_settings(&dir, &github.uri(), &jira.uri(), ""));

        mount_issue(
            &github,
            5,
            json!({
                "number": 5, "title": "Docs typo", "state": "closed",
                "labels": [ { "name": "jira-sync" } ]
            }),
        )
        .await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "issues": [ { "key": "IDF-7", "fields": { "labels": ["gh-espressif_sesp-idf_n5"] } } ]
            })))
            .expect(1)
            .mount(&jira)
            .await;

        Mock::given(method("PUT"))
            .and(path("/rest/api/2/issue/IDF-7"))
            .and(body_partial_json(json!({
                "fields": { "customfield_12100": { "value": "Closed" } }
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&jira)
            .await;

        let engine = engine(&settings);
        let results = engine
            .run(
                engine.source(),
                vec![ItemRef::event(5)],
            )
            .await;

        assert_eq!(results[0].1, SyncResult::Updated(JiraKey::new("IDF-7")));
    }

    #[tokio::test]
    async fn test_collaborator_pull_request_is_skipped_without_jira() {
        let github = MockServer::start().await;
        let jira = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let path = write_settings(&dir, &github.uri(), &jira.uri(), "");
        let mut vars = Vars::from_yaml_file(&path).unwrap();
        vars.set("INPUT_SYNC_LABEL", "");
        let settings = Settings::from_vars(&vars).unwrap();

        mount_issue(
            &github,
            8,
            json!({
                "number": 8, "title": "Refactor", "state": "open",
                "user": { "login": "maintainer" }, "labels": [], "pull_request": {}
            }),
        )
        .await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "repository": { "pullRequest": {
                    "reviewDecision": null, "latestReviews": { "nodes": [] }
                } } }
            })))
            .mount(&github)
            .await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::path("/repos/espressif/esp-idf/collaborators/maintainer"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&github)
            .await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::path("/rest/api/2/search"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&jira)
            .await;

        let engine = engine(&settings);
        let results = engine
            .run(
                engine.source(),
                vec![ItemRef::event(8)],
            )
            .await;

        assert_eq!(
            results[0].1,
            SyncResult::SkippedOutOfScope(SkipReason::CollaboratorPullRequest)
        );
    }

    #[tokio::test]
    async fn test_vanished_event_item_is_skipped() {
        let github = MockServer::start().await;
        let jira = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let settings = load(&write_settings(&dir, &github.uri(), &jira.uri(), ""));

        Mock::given(method("GET"))
            .and(path("/repos/espressif/esp-idf/issues/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&github)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/espressif/esp-idf/issues/410"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&github)
            .await;

        let engine = engine(&settings);
        let mut report = BatchReport::start();
        report.extend(
            engine
                .run(engine.source(), vec![ItemRef::event(404), ItemRef::event(410)])
                .await,
        );

        assert_eq!(report.entries()[0].source_id.as_str(), "espressif/esp-idf#404");
        for entry in report.entries() {
            assert_eq!(
                entry.result,
                SyncResult::SkippedOutOfScope(SkipReason::GoneFromGitHub)
            );
        }
        assert_eq!(report.exit_code(), EXIT_OK);
        assert!(jira.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_issue_closes_jira_mirror() {
        let github = MockServer::start().await;
        let jira = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let settings = load(&write_settings(&dir, &github.uri(), &jira.uri(), ""));

        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 1,
                "issues": [ {
                    "key": "IDF-7",
                    "fields": {
                        "labels": ["gh-espressif_sesp-idf_n5"],
                        "customfield_12100": { "value": "Open" }
                    }
                } ]
            })))
            .expect(1)
            .mount(&jira)
            .await;
        Mock::given(method("PUT"))
            .and(path("/rest/api/2/issue/IDF-7"))
            .and(body_partial_json(json!({
                "fields": { "customfield_12100": { "value": "Closed" } }
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&jira)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue/IDF-7/comment"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "1" })))
            .expect(1)
            .mount(&jira)
            .await;

        let payload = json!({ "action": "deleted", "issue": { "number": 5 } });
        let trigger = event::parse_trigger("issues", &payload).unwrap();
        assert_eq!(trigger, Trigger::Deleted(5));

        let engine = engine(&settings);
        let refs = event::resolve(&trigger, engine.source()).await.unwrap();
        let results = engine.run(engine.source(), refs).await;

        assert_eq!(results[0].1, SyncResult::Updated(JiraKey::new("IDF-7")));
        // nothing to fetch from GitHub for a deleted issue
        assert!(github.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ignored_event_syncs_nothing() {
        let dir = TempDir::new().unwrap();
        let settings = load(&write_settings(
            &dir,
            "http://127.0.0.1:9",
            "http://127.0.0.1:9",
            "",
        ));
        let trigger = event::parse_trigger("push", &json!({})).unwrap();
        assert!(matches!(trigger, Trigger::Ignored(_)));

        let engine = engine(&settings);
        let refs = event::resolve(&trigger, engine.source()).await.unwrap();
        assert!(refs.is_empty());
    }
}

mod run_tests {
    use super::*;

    fn event_file(dir: &TempDir, payload: serde_json::Value) -> std::path::PathBuf {
        let path = dir.path().join("event.json");
        std::fs::write(&path, payload.to_string()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_invalid_settings_stop_before_any_request() {
        let github = MockServer::start().await;
        let jira = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let path = write_settings(
            &dir,
            &github.uri(),
            &jira.uri(),
            "INPUT_FIND_JIRA_RETRIES: many",
        );
        let options = RunOptions {
            event_name: Some("issues".into()),
            event_path: Some(event_file(&dir, json!({ "issue": { "number": 1 } }))),
            concurrency: None,
        };

        let err = sync::run(&Vars::from_yaml_file(&path).unwrap(), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, gh_jira_sync::SyncError::Config(_)));
        assert_eq!(exit_code_for_error(&err), EXIT_CONFIG_ERROR);
        assert!(github.received_requests().await.unwrap().is_empty());
        assert!(jira.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_event_stops_before_any_request() {
        let github = MockServer::start().await;
        let jira = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let path = write_settings(&dir, &github.uri(), &jira.uri(), "");
        let options = RunOptions {
            event_name: Some("issues".into()),
            event_path: Some(dir.path().join("missing.json")),
            concurrency: None,
        };

        let err = sync::run(&Vars::from_yaml_file(&path).unwrap(), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, gh_jira_sync::SyncError::Event(_)));
        assert_eq!(exit_code_for_error(&err), EXIT_CONFIG_ERROR);
        assert!(github.received_requests().await.unwrap().is_empty());
        assert!(jira.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_run_reports_skip() {
        let github = MockServer::start().await;
        let jira = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let path = write_settings(&dir, &github.uri(), &jira.uri(), "");

        mount_issue(
            &github,
            3,
            json!({ "number": 3, "title": "Question", "state": "open", "labels": [] }),
        )
        .await;

        let options = RunOptions {
            event_name: Some("issues".into()),
            event_path: Some(event_file(
                &dir,
                json!({ "action": "labeled", "issue": { "number": 3 } }),
            )),
            concurrency: Some(2),
        };

        let report = sync::run(&Vars::from_yaml_file(&path).unwrap(), &options)
            .await
            .unwrap();

        assert_eq!(report.entries().len(), 1);
        assert!(matches!(
            report.entries()[0].result,
            SyncResult::SkippedOutOfScope(SkipReason::MissingSyncLabel { .. })
        ));
        assert_eq!(report.exit_code(), EXIT_OK);
        assert!(jira.received_requests().await.unwrap().is_empty());
    }
}
