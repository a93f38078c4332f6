//! Terminal styling for the run report
//!
//! Uses crossterm for colours, which GitHub Actions logs render.

use crate::sync::SyncResult;
use crossterm::style::{StyledContent, Stylize};

/// Outcome label, padded so the id column lines up
/// - created/updated: Green
/// - linked: Cyan
/// - skipped: Dim
/// - failed: Red
pub fn result_style(result: &SyncResult) -> StyledContent<String> {
    let label = format!("{:<8}", result.label());
    match result {
        SyncResult::Created(_) | SyncResult::Updated(_) => label.green(),
        SyncResult::LinkedOnly { .. } => label.cyan(),
        SyncResult::SkippedOutOfScope(_) => label.dark_grey(),
        SyncResult::Failed(_) => label.red().bold(),
    }
}

/// Totals line, red when the run will exit non-zero
pub fn summary_style(line: &str, exit_code: i32) -> StyledContent<String> {
    if exit_code == 0 {
        line.to_string().bold()
    } else {
        line.to_string().red().bold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JiraKey;

    #[test]
    fn test_result_label_is_padded() {
        let styled = result_style(&SyncResult::Created(JiraKey::new("IDF-1")));
        assert_eq!(styled.content(), "created ");
    }

    #[test]
    fn test_summary_keeps_text() {
        assert_eq!(summary_style("1 items", 1).content(), "1 items");
    }
}
