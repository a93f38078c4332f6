//! Configuration validation
//!
//! Validates the loaded settings before any item is processed:
//! - Status field id is numeric
//! - Sync label is a usable JIRA/GitHub label
//! - Tracker URLs, project key and repository are well formed
//! - Worker count is at least one

use super::integrations::{JiraAuth, TrackerConfig};
use super::sync_config::SyncConfig;
use crate::SyncError;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate the sync behaviour record
pub fn validate_sync_config(config: &SyncConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.status_field_id.is_empty()
        || !config.status_field_id.chars().all(|c| c.is_ascii_digit())
    {
        errors.push(ValidationError::new(
            "status_field_id",
            format!(
                "Must be the numeric id of a JIRA custom field, got '{}'",
                config.status_field_id
            ),
        ));
    }

    if let Some(ref label) = config.sync_label {
        if label.trim().is_empty() || label.chars().any(char::is_whitespace) {
            errors.push(ValidationError::new(
                "sync_label",
                format!("Label cannot be empty or contain whitespace: '{}'", label),
            ));
        }
    }

    if config.concurrency == 0 {
        errors.push(ValidationError::new(
            "concurrency",
            "Must be greater than 0",
        ));
    }

    if config.backoff.max_backoff < config.backoff.initial_backoff {
        errors.push(ValidationError::new(
            "backoff",
            "Maximum backoff is shorter than the initial backoff",
        ));
    }

    into_result(errors)
}

/// Validate tracker connection settings
pub fn validate_trackers(config: &TrackerConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if !is_http_url(&config.jira.url) {
        errors.push(ValidationError::new(
            "jira.url",
            format!("Invalid JIRA URL: {}", config.jira.url),
        ));
    }

    if !is_project_key(&config.jira.project) {
        errors.push(ValidationError::new(
            "jira.project",
            format!(
                "Invalid JIRA project key '{}' (expected e.g. IDF or MY_PROJ)",
                config.jira.project
            ),
        ));
    }

    if let JiraAuth::Bearer { ref token } = config.jira.auth {
        if token.is_empty() {
            errors.push(ValidationError::new(
                "jira.auth",
                "Token after the 'token:' prefix is empty",
            ));
        }
    }

    if !is_http_url(&config.github.api_url) {
        errors.push(ValidationError::new(
            "github.api_url",
            format!("Invalid GitHub API URL: {}", config.github.api_url),
        ));
    }

    let parts: Vec<&str> = config.github.repository.split('/').collect();
    if parts.len() != 2 || parts.iter().any(|p| p.is_empty()) {
        errors.push(ValidationError::new(
            "github.repository",
            format!(
                "Expected owner/name, got '{}'",
                config.github.repository
            ),
        ));
    }

    into_result(errors)
}

fn into_result(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://")) && url.len() > "https://".len()
}

fn is_project_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Fold validation errors into a single configuration error
pub fn into_config_error(errors: Vec<ValidationError>) -> SyncError {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    SyncError::Config(format!(
        "Configuration validation failed:\n  - {}",
        messages.join("\n  - ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Vars;

    fn trackers() -> TrackerConfig {
        TrackerConfig::from_vars(&Vars::from_pairs([
            ("JIRA_URL", "https://jira.example.com"),
            ("JIRA_PROJECT", "IDF"),
            ("JIRA_PASS", "token:abc"),
            ("GITHUB_TOKEN", "ghp_x"),
            ("GITHUB_REPOSITORY", "espressif/esp-idf"),
        ]))
        .unwrap()
    }

    #[test]
    fn test_valid_defaults() {
        assert!(validate_sync_config(&SyncConfig::default()).is_ok());
        assert!(validate_trackers(&trackers()).is_ok());
    }

    #[test]
    fn test_non_numeric_status_field() {
        let config = SyncConfig {
            status_field_id: "status".into(),
            ..Default::default()
        };
        let errors = validate_sync_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "status_field_id");
    }

    #[test]
    fn test_label_with_space() {
        let config = SyncConfig::default().with_sync_label("jira sync");
        assert!(validate_sync_config(&config).is_err());
    }

    #[test]
    fn test_zero_concurrency() {
        let config = SyncConfig::default().with_concurrency(0);
        let errors = validate_sync_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "concurrency");
    }

    #[test]
    fn test_bad_trackers_collect_every_error() {
        let mut config = trackers();
        config.jira.url = "jira.example.com".into();
        config.jira.project = "idf".into();
        config.github.repository = "esp-idf".into();

        let errors = validate_trackers(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["jira.url", "jira.project", "github.repository"]);
    }

    #[test]
    fn test_into_config_error() {
        let err = into_config_error(vec![ValidationError::new("a", "b")]);
        assert!(matches!(err, SyncError::Config(ref m) if m.contains("a: b")));
    }
}
