//! GitHub Integration Adapter
//!
//! Reads issues and pull requests (REST + GraphQL) and writes PR titles
//! back for closing-issue linkage.

use super::{ItemLoader, SourceTracker};
use crate::event::ItemRef;
use crate::config::GitHubIntegration;
use crate::error::parse_retry_after;
use crate::model::{ClosingIssueRef, ItemKind, ItemState, ReviewDecision, SourceId, SourceItem};
use crate::{Result, SyncError};
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Per-request timeout for GraphQL queries
const GRAPHQL_TIMEOUT: Duration = Duration::from_secs(30);
/// Per-request timeout for single issue fetches
const GET_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request timeout for edits
const WRITE_TIMEOUT: Duration = Duration::from_secs(15);

/// Open pull requests fetched per page in cron mode
const PULLS_PER_PAGE: usize = 100;
/// Upper bound on pages fetched in cron mode
const MAX_PULL_PAGES: u32 = 10;

/// GitHub API client
pub struct GitHubAdapter {
    client: Client,
    config: GitHubIntegration,
    fetch_closing_refs: bool,
}

/// GitHub issue or pull request (REST API format)
///
/// `/issues/{n}` and `/pulls` share these fields; `pull_request` is only
/// present on issues that are pull requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub labels: Vec<GitHubLabel>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
    #[serde(default)]
    pub merged_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubLabel {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

/// Review state of a pull request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewStatus {
    /// None when the repository does not require reviews
    pub decision: Option<ReviewDecision>,
    /// Latest review state per reviewer
    pub reviews: Vec<String>,
}

impl ReviewStatus {
    pub fn approvals(&self) -> u32 {
        self.reviews.iter().filter(|r| r.as_str() == "APPROVED").count() as u32
    }

    pub fn changes_requested(&self) -> bool {
        self.decision == Some(ReviewDecision::ChangesRequested)
            || self.reviews.iter().any(|r| r == "CHANGES_REQUESTED")
    }
}

/// GraphQL response wrapper
#[derive(Debug, Clone, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RepositoryData<T> {
    repository: T,
}

#[derive(Debug, Clone, Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClosingRefsPull {
    pull_request: ClosingRefsNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClosingRefsNode {
    closing_issues_references: Nodes<IssueTitleNode>,
}

#[derive(Debug, Clone, Deserialize)]
struct IssueTitleNode {
    number: u64,
    title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewPull {
    pull_request: ReviewNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewNode {
    review_decision: Option<String>,
    latest_reviews: Nodes<ReviewStateNode>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReviewStateNode {
    state: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentPulls {
    pull_requests: Nodes<IssueTitleNode>,
}

#[derive(Debug, Clone, Serialize)]
struct UpdateTitleRequest<'a> {
    title: &'a str,
}

impl GitHubAdapter {
    /// Create a new GitHub adapter
    pub fn new(config: GitHubIntegration) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static(concat!(
                        "gh-jira-sync/",
                        env!("CARGO_PKG_VERSION")
                    )),
                );
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/vnd.github+json"),
                );
                headers
            })
            .build()?;

        Ok(Self {
            client,
            config,
            fetch_closing_refs: false,
        })
    }

    /// Also load closing-issue references when hydrating pull requests
    pub fn with_closing_refs(mut self, enabled: bool) -> Self {
        self.fetch_closing_refs = enabled;
        self
    }

    pub fn repository(&self) -> &str {
        &self.config.repository
    }

    fn repo_url(&self, rest: &str) -> String {
        format!(
            "{}/repos/{}{}",
            self.config.api_url, self.config.repository, rest
        )
    }

    async fn error_for(context: &str, response: Response) -> SyncError {
        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => {
                SyncError::Permanent("GitHub authentication failed".to_string())
            }
            StatusCode::FORBIDDEN if rate_limited || retry_after.is_some() => {
                SyncError::RateLimited(retry_after.unwrap_or(crate::error::DEFAULT_RATE_LIMIT_SECS))
            }
            _ => SyncError::from_status(status, retry_after, format!("GitHub {}: {}", context, body)),
        }
    }

    /// Execute a GraphQL query
    async fn graphql<T: for<'de> Deserialize<'de>>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .client
            .post(&self.config.graphql_url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .timeout(GRAPHQL_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let result: GraphQLResponse<T> = response.json().await?;
                if let Some(errors) = result.errors {
                    let error_msg = errors
                        .iter()
                        .map(|e| e.message.clone())
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(SyncError::Permanent(format!("GraphQL error: {}", error_msg)));
                }
                result
                    .data
                    .ok_or_else(|| SyncError::Permanent("No data in GraphQL response".to_string()))
            }
            _ => Err(Self::error_for("GraphQL", response).await),
        }
    }

    fn repo_vars(&self, extra: serde_json::Value) -> serde_json::Value {
        let mut vars = serde_json::json!({
            "owner": self.config.owner(),
            "repo": self.config.repo_name(),
        });
        if let (Some(map), serde_json::Value::Object(extra)) = (vars.as_object_mut(), extra) {
            map.extend(extra);
        }
        vars
    }

    /// Get a single issue or pull request by number (REST API)
    pub async fn get_issue(&self, number: u64) -> Result<GitHubIssue> {
        let url = self.repo_url(&format!("/issues/{}", number));

        debug!(number = %number, "Fetching GitHub issue");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .timeout(GET_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            _ => Err(Self::error_for(&format!("issue #{}", number), response).await),
        }
    }

    /// List open pull requests, newest first
    pub async fn list_open_pulls(&self) -> Result<Vec<GitHubIssue>> {
        let url = self.repo_url("/pulls");
        let mut pulls = Vec::new();

        for page in 1..=MAX_PULL_PAGES {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.config.token)
                .query(&[
                    ("state", "open".to_string()),
                    ("sort", "created".to_string()),
                    ("direction", "desc".to_string()),
                    ("per_page", PULLS_PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .timeout(GET_TIMEOUT)
                .send()
                .await?;

            if response.status() != StatusCode::OK {
                return Err(Self::error_for("list pulls", response).await);
            }

            let batch: Vec<GitHubIssue> = response.json().await?;
            let last_page = batch.len() < PULLS_PER_PAGE;
            pulls.extend(batch);
            if last_page {
                break;
            }
        }

        info!(count = pulls.len(), "Listed open pull requests");
        Ok(pulls)
    }

    /// Whether `login` is a collaborator on the repository
    pub async fn is_collaborator(&self, login: &str) -> Result<bool> {
        let url = self.repo_url(&format!(
            "/collaborators/{}",
            urlencoding::encode(login)
        ));

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .timeout(GET_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::error_for("collaborator check", response).await),
        }
    }

    /// Issues the pull request closes when merged (first 10)
    pub async fn closing_issue_refs(&self, number: u64) -> Result<Vec<ClosingIssueRef>> {
        let query = r#"
            query($owner: String!, $repo: String!, $pr: Int!) {
                repository(owner: $owner, name: $repo) {
                    pullRequest(number: $pr) {
                        closingIssuesReferences(first: 10) {
                            nodes { number title }
                        }
                    }
                }
            }
        "#;

        let data: RepositoryData<ClosingRefsPull> = self
            .graphql(query, self.repo_vars(serde_json::json!({ "pr": number })))
            .await?;

        Ok(data
            .repository
            .pull_request
            .closing_issues_references
            .nodes
            .into_iter()
            .map(|n| ClosingIssueRef::new(n.number, n.title))
            .collect())
    }

    /// Review decision and latest review per reviewer
    pub async fn review_status(&self, number: u64) -> Result<ReviewStatus> {
        let query = r#"
            query($owner: String!, $repo: String!, $pr: Int!) {
                repository(owner: $owner, name: $repo) {
                    pullRequest(number: $pr) {
                        reviewDecision
                        latestReviews(last: 10) {
                            nodes { state }
                        }
                    }
                }
            }
        "#;

        let data: RepositoryData<ReviewPull> = self
            .graphql(query, self.repo_vars(serde_json::json!({ "pr": number })))
            .await?;
        let pr = data.repository.pull_request;

        Ok(ReviewStatus {
            decision: pr.review_decision.as_deref().and_then(ReviewDecision::parse),
            reviews: pr.latest_reviews.nodes.into_iter().map(|n| n.state).collect(),
        })
    }

    /// Number of the most recently updated pull request
    pub async fn most_recently_updated_pull(&self) -> Result<Option<u64>> {
        let query = r#"
            query($owner: String!, $repo: String!) {
                repository(owner: $owner, name: $repo) {
                    pullRequests(last: 1, orderBy: {field: UPDATED_AT, direction: ASC}) {
                        nodes { number title }
                    }
                }
            }
        "#;

        let data: RepositoryData<RecentPulls> =
            self.graphql(query, self.repo_vars(serde_json::json!({}))).await?;
        Ok(data.repository.pull_requests.nodes.first().map(|n| n.number))
    }

    /// Replace an issue or pull request title (REST API)
    pub async fn edit_title(&self, number: u64, title: &str) -> Result<()> {
        let url = self.repo_url(&format!("/issues/{}", number));

        info!(number = %number, title = %title, "Updating GitHub title");

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.config.token)
            .json(&UpdateTitleRequest { title })
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            _ => Err(Self::error_for(&format!("edit #{}", number), response).await),
        }
    }

    /// Convert a REST issue into a bare [`SourceItem`]
    pub fn issue_to_source_item(&self, issue: &GitHubIssue, from_event: bool) -> SourceItem {
        let kind = if issue.pull_request.is_some() || issue.merged_at.is_some() {
            ItemKind::PullRequest
        } else {
            ItemKind::Issue
        };

        SourceItem {
            id: SourceId::for_number(&self.config.repository, issue.number),
            number: issue.number,
            kind,
            title: issue.title.clone(),
            body: issue.body.clone(),
            url: issue.html_url.clone(),
            labels: issue.labels.iter().map(|l| l.name.clone()).collect(),
            state: ItemState::parse(&issue.state),
            author: issue.user.as_ref().map(|u| u.login.clone()),
            closing_issue_refs: Vec::new(),
            approval_count: 0,
            changes_requested: false,
            review_decision: None,
            from_event,
            author_is_collaborator: false,
        }
    }

    /// Fill in the pull-request-only parts of an item
    pub async fn enrich(&self, mut item: SourceItem) -> Result<SourceItem> {
        if !item.is_pull_request() {
            return Ok(item);
        }

        let reviews = self.review_status(item.number).await?;
        item.approval_count = reviews.approvals();
        item.changes_requested = reviews.changes_requested();
        item.review_decision = reviews.decision;

        if self.fetch_closing_refs {
            item.closing_issue_refs = self.closing_issue_refs(item.number).await?;
        }

        if let Some(login) = item.author.clone() {
            item.author_is_collaborator = self.is_collaborator(&login).await?;
        }

        debug!(
            id = %item.id,
            approvals = item.approval_count,
            changes_requested = item.changes_requested,
            closing_refs = item.closing_issue_refs.len(),
            collaborator = item.author_is_collaborator,
            "Pull request hydrated"
        );

        Ok(item)
    }

    /// Load and hydrate one issue or pull request
    pub async fn load_item(&self, number: u64, from_event: bool) -> Result<SourceItem> {
        let issue = self.get_issue(number).await?;
        self.enrich(self.issue_to_source_item(&issue, from_event)).await
    }
}

#[async_trait]
impl SourceTracker for GitHubAdapter {
    async fn update_title(&self, item: &SourceItem, title: &str) -> Result<()> {
        self.edit_title(item.number, title).await
    }
}

#[async_trait]
impl ItemLoader for GitHubAdapter {
    fn source_id(&self, item: &ItemRef) -> SourceId {
        SourceId::for_number(&self.config.repository, item.number)
    }

    async fn load(&self, item: &ItemRef) -> Result<SourceItem> {
        self.load_item(item.number, item.from_event).await
    }
}
