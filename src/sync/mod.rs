//! GitHub to JIRA synchronisation
//!
//! - [`matcher`]: scope rules and closing-issue title linking
//! - [`engine`]: per-item sync with bounded retried lookups, and batches
//! - [`report`]: per-run outcome summary and exit code
//! - [`runner`]: one whole run, from settings to report

pub mod engine;
pub mod matcher;
pub mod report;
pub mod runner;

pub use engine::{SyncEngine, SyncResult};
pub use matcher::{approval_ready, evaluate, is_in_scope, KeyPattern, SkipReason, Verdict};
pub use report::{
    exit_code_for_error, BatchReport, ReportEntry, Totals, EXIT_CONFIG_ERROR, EXIT_ITEM_FAILED,
    EXIT_OK,
};
pub use runner::{run, trigger_for, RunOptions};
