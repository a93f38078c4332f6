//! Raw settings source
//!
//! Action inputs arrive as environment variables (`INPUT_SYNC_LABEL`,
//! `JIRA_URL`, ...). The same names can be put in a YAML file; values from
//! the environment win over the file.

use crate::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Variable name prefixes the loader cares about
const PREFIXES: &[&str] = &["INPUT_", "JIRA_", "GITHUB_", "SYNC_"];

/// Flat name → value map of settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars(BTreeMap<String, String>);

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the relevant variables from the process environment
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Collect the relevant variables from arbitrary pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| PREFIXES.iter().any(|p| k.starts_with(p)))
            .collect();
        Self(map)
    }

    /// The optional settings file overlaid with the process environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let base = match file {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::new(),
        };
        Ok(base.merge(Self::from_env()))
    }

    /// Load a YAML mapping of variable names to scalar values
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::SyncError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading settings file");
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(content)
            .map_err(|e| crate::SyncError::Config(format!("Invalid settings file: {}", e)))?;
        let mut map = BTreeMap::new();
        for (key, value) in raw {
            let text = match value {
                serde_yaml::Value::Null => continue,
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::String(s) => s,
                _ => {
                    return Err(crate::SyncError::Config(format!(
                        "{}: expected a scalar value",
                        key
                    )))
                }
            };
            map.insert(key, text);
        }
        Ok(Self(map))
    }

    /// Overlay `other` on top of `self`; `other` wins on conflicts
    pub fn merge(mut self, other: Vars) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Trimmed value, with empty strings treated as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| crate::SyncError::Config(format!("{} is required", key)))
    }

    /// Lenient action-style boolean: true/false, 1/0, yes/no, on/off
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => match v.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(crate::SyncError::Config(format!(
                    "{}: expected a boolean, got '{}'",
                    key, v
                ))),
            },
        }
    }

    /// Non-negative integer
    pub fn get_u32(&self, key: &str, default: u32) -> Result<u32> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.parse::<u32>().map_err(|_| {
                crate::SyncError::Config(format!(
                    "{}: expected a non-negative integer, got '{}'",
                    key, v
                ))
            }),
        }
    }
}
