//! Type-safe ID wrappers for both sides of the sync

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of the JIRA label that links an issue back to its GitHub item
pub const SOURCE_LINK_PREFIX: &str = "gh-";

/// Identifier of a GitHub issue or pull request
///
/// Items loaded from GitHub use `owner/repo#number`. Any string is accepted
/// so callers can build items by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the canonical id for an item in a repository
    pub fn for_number(repository: &str, number: u64) -> Self {
        Self(format!("{}#{}", repository, number))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JIRA label stamped on the TargetItem for this source
    ///
    /// Letters, digits and `-` are kept. `/` becomes `_s`, `#` becomes
    /// `_n`, `_` becomes `__` and any other byte `_x` plus two hex digits,
    /// so distinct ids always get distinct labels and
    /// [`SourceId::from_link_label`] can decode them.
    pub fn link_label(&self) -> String {
        let mut label = String::from(SOURCE_LINK_PREFIX);
        for byte in self.0.bytes() {
            match byte {
                b if b.is_ascii_alphanumeric() || b == b'-' => label.push(b as char),
                b'_' => label.push_str("__"),
                b'/' => label.push_str("_s"),
                b'#' => label.push_str("_n"),
                b => label.push_str(&format!("_x{:02x}", b)),
            }
        }
        label
    }

    /// Decode a label written by [`SourceId::link_label`]
    pub fn from_link_label(label: &str) -> Option<Self> {
        let body = label.strip_prefix(SOURCE_LINK_PREFIX)?.as_bytes();
        let mut bytes = Vec::with_capacity(body.len());
        let mut i = 0;
        while i < body.len() {
            match body[i] {
                b'_' => {
                    match *body.get(i + 1)? {
                        b'_' => bytes.push(b'_'),
                        b's' => bytes.push(b'/'),
                        b'n' => bytes.push(b'#'),
                        b'x' => {
                            let hex = std::str::from_utf8(body.get(i + 2..i + 4)?).ok()?;
                            bytes.push(u8::from_str_radix(hex, 16).ok()?);
                            i += 2;
                        }
                        _ => return None,
                    }
                    i += 2;
                }
                b if b.is_ascii_alphanumeric() || b == b'-' => {
                    bytes.push(b);
                    i += 1;
                }
                _ => return None,
            }
        }
        String::from_utf8(bytes).ok().map(Self)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// JIRA issue key, e.g. `IDF-1234`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JiraKey(String);

impl JiraKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Project part of the key (`IDF` in `IDF-1234`)
    pub fn project(&self) -> Option<&str> {
        self.0.rsplit_once('-').map(|(project, _)| project)
    }
}

impl fmt::Display for JiraKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JiraKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
