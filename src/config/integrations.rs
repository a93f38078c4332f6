//! Tracker connection settings
//!
//! Where the two trackers live and how to authenticate against them.

use super::vars::Vars;
use crate::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_JIRA_ISSUE_TYPE: &str = "Task";

/// How to authenticate against JIRA
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum JiraAuth {
    /// Personal access token (`JIRA_PASS=token:<pat>`)
    Bearer { token: String },
    /// User name and password or API token
    Basic { user: String, password: String },
}

impl std::fmt::Debug for JiraAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JiraAuth::Bearer { .. } => f.write_str("Bearer(***)"),
            JiraAuth::Basic { user, .. } => write!(f, "Basic({}:***)", user),
        }
    }
}

/// JIRA integration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraIntegration {
    /// JIRA instance URL
    pub url: String,

    /// JIRA project key
    pub project: String,

    /// Issue type for newly created issues
    #[serde(default = "default_issue_type")]
    pub issue_type: String,

    pub auth: JiraAuth,
}

fn default_issue_type() -> String {
    DEFAULT_JIRA_ISSUE_TYPE.to_string()
}

/// GitHub integration configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct GitHubIntegration {
    /// REST API root (`https://api.github.com` or `https://ghe.example.com/api/v3`)
    pub api_url: String,

    pub graphql_url: String,

    /// `owner/name`
    pub repository: String,

    pub token: String,
}

impl std::fmt::Debug for GitHubIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubIntegration")
            .field("api_url", &self.api_url)
            .field("graphql_url", &self.graphql_url)
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl GitHubIntegration {
    pub fn owner(&self) -> &str {
        self.repository.split('/').next().unwrap_or_default()
    }

    pub fn repo_name(&self) -> &str {
        self.repository.split('/').nth(1).unwrap_or_default()
    }
}

/// GraphQL endpoint that belongs to a REST API root
pub fn graphql_url_for(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    match base.strip_suffix("/api/v3") {
        Some(host) => format!("{}/api/graphql", host),
        None => format!("{}/graphql", base),
    }
}

/// Both trackers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub jira: JiraIntegration,
    pub github: GitHubIntegration,
}

impl TrackerConfig {
    pub fn from_vars(vars: &Vars) -> Result<Self> {
        let password = vars.require("JIRA_PASS")?;
        let auth = match password.strip_prefix("token:") {
            Some(token) => JiraAuth::Bearer {
                token: token.to_string(),
            },
            None => JiraAuth::Basic {
                user: vars.require("JIRA_USER")?.to_string(),
                password: password.to_string(),
            },
        };

        let jira = JiraIntegration {
            url: vars.require("JIRA_URL")?.trim_end_matches('/').to_string(),
            project: vars.require("JIRA_PROJECT")?.to_string(),
            issue_type: vars
                .get("JIRA_ISSUE_TYPE")
                .map(String::from)
                .unwrap_or_else(default_issue_type),
            auth,
        };

        let api_url = vars
            .get("GITHUB_API_URL")
            .unwrap_or(DEFAULT_GITHUB_API_URL)
            .trim_end_matches('/')
            .to_string();
        let graphql_url = vars
            .get("GITHUB_GRAPHQL_URL")
            .map(String::from)
            .unwrap_or_else(|| graphql_url_for(&api_url));

        let github = GitHubIntegration {
            api_url,
            graphql_url,
            repository: vars.require("GITHUB_REPOSITORY")?.to_string(),
            token: vars.require("GITHUB_TOKEN")?.to_string(),
        };

        Ok(Self { jira, github })
    }
}
