//! Run report
//!
//! One line per item in input order, then totals. The exit code is derived
//! from the outcomes.

use super::engine::SyncResult;
use crate::model::SourceId;
use crate::style;
use crate::SyncError;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

/// Every run exits 0 when nothing failed
pub const EXIT_OK: i32 = 0;
/// At least one item failed
pub const EXIT_ITEM_FAILED: i32 = 1;
/// Settings could not be loaded; no item was processed
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Exit code for a run that stopped with `error` instead of a report
///
/// Bad settings or event input abort with [`EXIT_CONFIG_ERROR`]; anything
/// else (e.g. GitHub failing to list open pull requests) with
/// [`EXIT_ITEM_FAILED`].
pub fn exit_code_for_error(error: &SyncError) -> i32 {
    match error {
        SyncError::Config(_) | SyncError::Event(_) => EXIT_CONFIG_ERROR,
        _ => EXIT_ITEM_FAILED,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub source_id: SourceId,
    pub result: SyncResult,
}

/// Outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub created: usize,
    pub updated: usize,
    pub linked: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    entries: Vec<ReportEntry>,
}

impl BatchReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, source_id: SourceId, result: SyncResult) {
        self.entries.push(ReportEntry { source_id, result });
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = (SourceId, SyncResult)>) {
        for (source_id, result) in results {
            self.record(source_id, result);
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for entry in &self.entries {
            match entry.result {
                SyncResult::Created(_) => totals.created += 1,
                SyncResult::Updated(_) => totals.updated += 1,
                SyncResult::LinkedOnly { .. } => totals.linked += 1,
                SyncResult::SkippedOutOfScope(_) => totals.skipped += 1,
                SyncResult::Failed(_) => totals.failed += 1,
            }
        }
        totals
    }

    pub fn exit_code(&self) -> i32 {
        if self.entries.iter().any(|e| e.result.is_failure()) {
            EXIT_ITEM_FAILED
        } else {
            EXIT_OK
        }
    }

    fn summary_line(&self) -> String {
        let t = self.totals();
        let elapsed = self
            .finished_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or_default();
        format!(
            "{} items: {} created, {} updated, {} linked, {} skipped, {} failed ({:.1}s)",
            self.entries.len(),
            t.created,
            t.updated,
            t.linked,
            t.skipped,
            t.failed,
            elapsed
        )
    }

    /// Plain text rendering
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "{:<8} {}  {}", entry.result.label(), entry.source_id, entry.result);
        }
        let _ = writeln!(out, "{}", self.summary_line());
        out
    }

    /// Print to stdout with coloured outcome labels
    pub fn print(&self) {
        for entry in &self.entries {
            println!(
                "{} {}  {}",
                style::result_style(&entry.result),
                entry.source_id,
                entry.result
            );
        }
        println!("{}", style::summary_style(&self.summary_line(), self.exit_code()));
    }
}
