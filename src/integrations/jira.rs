//! JIRA Integration Adapter
//!
//! One-way mirror target, using the JIRA REST API v2 (plain-text
//! descriptions, works with both Server/Data Center and Cloud).

use super::TargetTracker;
use crate::config::{JiraAuth, JiraIntegration};
use crate::error::parse_retry_after;
use crate::model::{JiraKey, SourceId, StatusValue, TargetFields, TargetItem, SOURCE_LINK_PREFIX};
use crate::{Result, SyncError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-request timeout for search/query operations
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Per-request timeout for create/update operations
const WRITE_TIMEOUT: Duration = Duration::from_secs(15);

/// JIRA rejects summaries longer than this
const MAX_SUMMARY_CHARS: usize = 255;

/// JIRA API client
pub struct JiraAdapter {
    client: Client,
    config: JiraIntegration,
    base_url: String,
    status_field: String,
}

/// JIRA issue as returned by search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraIssue {
    pub key: String,
    #[serde(default)]
    pub id: Option<String>,
    pub fields: JiraFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created: Option<String>,
    /// Custom fields, keyed by `customfield_<id>`
    #[serde(flatten)]
    pub custom: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct JiraSearchResponse {
    #[serde(default)]
    total: u32,
    issues: Vec<JiraIssue>,
}

#[derive(Debug, Clone, Deserialize)]
struct CreatedIssue {
    key: String,
}

impl JiraAdapter {
    /// Create a new JIRA adapter writing status to `status_field`
    /// (e.g. `customfield_12100`)
    pub fn new(config: JiraIntegration, status_field: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let base_url = format!("{}/rest/api/2", config.url.trim_end_matches('/'));

        Ok(Self {
            client,
            config,
            base_url,
            status_field: status_field.into(),
        })
    }

    pub fn project(&self) -> &str {
        &self.config.project
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth {
            JiraAuth::Bearer { token } => request.bearer_auth(token),
            JiraAuth::Basic { user, password } => request.basic_auth(user, Some(password)),
        }
    }

    /// Turn a non-success response into the matching [`SyncError`]
    async fn error_for(context: &str, response: Response) -> SyncError {
        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return SyncError::Permanent(format!("JIRA authentication failed ({})", status));
        }
        SyncError::from_status(status, retry_after, format!("JIRA {}: {}", context, body))
    }

    /// Search for issues using JQL
    pub async fn search(&self, jql: &str, max_results: u32) -> Result<Vec<JiraIssue>> {
        let url = format!("{}/search", self.base_url);
        let fields = format!("summary,labels,created,{}", self.status_field);
        let params = [
            ("jql", jql.to_string()),
            ("maxResults", max_results.to_string()),
            ("fields", fields),
        ];

        debug!(jql = %jql, max_results = %max_results, "Searching JIRA issues");

        let response = self
            .authorize(self.client.get(&url).query(&params))
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let result: JiraSearchResponse = response.json().await?;
                debug!(
                    total = result.total,
                    returned = result.issues.len(),
                    "JIRA search complete"
                );
                Ok(result.issues)
            }
            _ => Err(Self::error_for("search", response).await),
        }
    }

    /// JQL selecting the issue linked to a source item
    pub fn source_jql(&self, source: &SourceId) -> String {
        format!(
            "project = \"{}\" AND labels = \"{}\" ORDER BY created ASC",
            self.config.project,
            source.link_label()
        )
    }

    /// Map a JIRA issue into a [`TargetItem`], decoding its link label
    pub fn to_target_item(&self, issue: &JiraIssue) -> TargetItem {
        let status_field_value = issue
            .fields
            .custom
            .get(&self.status_field)
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("value").and_then(Value::as_str).map(String::from),
                _ => None,
            });

        let linked_source_id = issue
            .fields
            .labels
            .iter()
            .filter(|l| l.starts_with(SOURCE_LINK_PREFIX))
            .find_map(|l| SourceId::from_link_label(l));

        TargetItem {
            key: JiraKey::new(&issue.key),
            status_field_value,
            linked_source_id,
        }
    }

    fn field_payload(&self, fields: &TargetFields) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        map.insert("summary".into(), json!(truncate(&fields.summary, MAX_SUMMARY_CHARS)));
        map.insert("description".into(), json!(fields.description));
        map.insert(
            self.status_field.clone(),
            json!({ "value": fields.status.as_str() }),
        );
        map
    }

    /// Create a new issue (REST API)
    pub async fn create_issue(&self, fields: &TargetFields) -> Result<TargetItem> {
        let url = format!("{}/issue", self.base_url);

        let mut payload = self.field_payload(fields);
        payload.insert("project".into(), json!({ "key": self.config.project }));
        payload.insert("issuetype".into(), json!({ "name": self.config.issue_type }));
        payload.insert("labels".into(), json!([fields.link_label]));
        let body = json!({ "fields": payload });

        info!(source = %fields.source_id, summary = %fields.summary, "Creating JIRA issue");

        let response = self
            .authorize(self.client.post(&url).json(&body))
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => {
                let created: CreatedIssue = response.json().await?;
                info!(key = %created.key, source = %fields.source_id, "JIRA issue created");
                Ok(TargetItem {
                    key: JiraKey::new(created.key),
                    status_field_value: Some(fields.status.as_str().to_string()),
                    linked_source_id: Some(fields.source_id.clone()),
                })
            }
            _ => Err(Self::error_for("create issue", response).await),
        }
    }

    /// Overwrite summary, description and status of an existing issue
    pub async fn update_issue(&self, key: &JiraKey, fields: &TargetFields) -> Result<TargetItem> {
        let url = format!("{}/issue/{}", self.base_url, key);

        let body = json!({
            "fields": self.field_payload(fields),
            "update": { "labels": [ { "add": fields.link_label } ] },
        });

        info!(key = %key, status = %fields.status, "Updating JIRA issue");

        let response = self
            .authorize(self.client.put(&url).json(&body))
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(TargetItem {
                key: key.clone(),
                status_field_value: Some(fields.status.as_str().to_string()),
                linked_source_id: Some(fields.source_id.clone()),
            }),
            _ => Err(Self::error_for("update issue", response).await),
        }
    }

    /// Write only the status field, leaving summary and description alone
    pub async fn set_issue_status(&self, key: &JiraKey, status: StatusValue) -> Result<()> {
        let url = format!("{}/issue/{}", self.base_url, key);
        let mut fields = serde_json::Map::new();
        fields.insert(self.status_field.clone(), json!({ "value": status.as_str() }));
        let body = json!({ "fields": fields });

        info!(key = %key, status = %status, "Setting JIRA issue status");

        let response = self
            .authorize(self.client.put(&url).json(&body))
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            _ => Err(Self::error_for("set status", response).await),
        }
    }

    /// Add a plain-text comment to an issue
    pub async fn add_issue_comment(&self, key: &JiraKey, body: &str) -> Result<()> {
        let url = format!("{}/issue/{}/comment", self.base_url, key);

        debug!(key = %key, "Adding JIRA comment");

        let response = self
            .authorize(self.client.post(&url).json(&json!({ "body": body })))
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(()),
            _ => Err(Self::error_for("add comment", response).await),
        }
    }
}

#[async_trait]
impl TargetTracker for JiraAdapter {
    fn project_key(&self) -> &str {
        self.project()
    }

    async fn find_by_source(&self, source: &SourceId) -> Result<Option<TargetItem>> {
        // JQL label matching is not exact on every JIRA deployment
        let issues: Vec<TargetItem> = self
            .search(&self.source_jql(source), 10)
            .await?
            .iter()
            .map(|issue| self.to_target_item(issue))
            .filter(|item| item.linked_source_id.as_ref() == Some(source))
            .collect();
        if issues.len() > 1 {
            warn!(
                source = %source,
                keys = ?issues.iter().map(|i| &i.key).collect::<Vec<_>>(),
                "Several JIRA issues linked to one source item, using the oldest"
            );
        }
        Ok(issues.into_iter().next())
    }

    async fn create(&self, fields: &TargetFields) -> Result<TargetItem> {
        self.create_issue(fields).await
    }

    async fn update(&self, key: &JiraKey, fields: &TargetFields) -> Result<TargetItem> {
        self.update_issue(key, fields).await
    }

    async fn set_status(&self, key: &JiraKey, status: StatusValue) -> Result<()> {
        self.set_issue_status(key, status).await
    }

    async fn add_comment(&self, key: &JiraKey, body: &str) -> Result<()> {
        self.add_issue_comment(key, body).await
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
