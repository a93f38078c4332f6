//! gh-jira-sync - One-way GitHub to JIRA issue synchronisation
//!
//! Mirrors GitHub issues and pull requests into a JIRA project from inside a
//! GitHub Actions workflow. GitHub is the source of truth; JIRA issues are
//! created and updated but never read back into GitHub, except for pull
//! request titles that record the JIRA keys of the issues they close.
//!
//! # Architecture
//!
//! - **config**: Action inputs, tracker credentials and validation
//! - **event**: Workflow event intake
//! - **integrations**: GitHub and JIRA adapters, bounded retry
//! - **model**: Source and target items, ids and status values
//! - **sync**: Scope rules, the sync engine and the run report

// Core modules
pub mod config;
pub mod error;
pub mod model;

// Components
pub mod event;
pub mod integrations;
pub mod sync;

// Utilities
pub mod logging;
pub mod style;

// Re-exports
pub use error::{Result, SyncError};
