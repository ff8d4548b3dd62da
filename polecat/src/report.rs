//! Console rendering of a run outcome (human lines or a JSON summary).

use serde::Serialize;

use crate::core::mode::Mode;
use crate::core::outcome::{RunOutcome, Warning};

/// Machine-readable summary printed with `--json`.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub status: &'a str,
    pub success: bool,
    pub summary: &'a str,
    pub files_modified: usize,
    pub discovered_issues: usize,
    pub mode: Mode,
    pub dry_run: bool,
    /// `null` when commit/merge was not attempted.
    pub merged: Option<bool>,
    pub created_issues: &'a [String],
    pub warnings: &'a [Warning],
}

impl<'a> JsonReport<'a> {
    pub fn new(outcome: &'a RunOutcome) -> Self {
        let result = &outcome.result;
        Self {
            status: result.status.as_str(),
            success: result.success,
            summary: &result.summary,
            files_modified: result.files_modified.len(),
            discovered_issues: result.discovered_issues.len(),
            mode: outcome.mode,
            dry_run: outcome.dry_run,
            merged: outcome.merged,
            created_issues: &outcome.created_issues,
            warnings: &outcome.warnings,
        }
    }
}

/// Pretty-printed JSON summary.
pub fn render_json(outcome: &RunOutcome) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport::new(outcome))
}

/// Human-readable `Key: value` lines.
pub fn render_human(outcome: &RunOutcome) -> String {
    let result = &outcome.result;
    let mut lines = vec![
        format!("Status: {}", result.status),
        format!("Success: {}", result.success),
        format!("Mode: {}", outcome.mode.as_str()),
        format!("Duration: {:.1}s", result.duration_seconds),
        format!("Iterations: {}", result.iterations),
    ];
    if !result.summary.is_empty() {
        lines.push(format!("Summary: {}", result.summary));
    }
    lines.push(format!("Files modified: {}", result.files_modified.len()));
    lines.push(format!(
        "Discovered issues: {}",
        result.discovered_issues.len()
    ));
    if !outcome.created_issues.is_empty() {
        lines.push(format!(
            "Created issues: {}",
            outcome.created_issues.join(", ")
        ));
    }
    match outcome.merged {
        Some(true) => lines.push("Merged: yes".to_string()),
        Some(false) => lines.push("Merged: no (manual resolution needed)".to_string()),
        None => {}
    }
    if outcome.dry_run {
        lines.push("Dry run: issues, commit and reply skipped".to_string());
    }
    for warning in &outcome.warnings {
        lines.push(format!("Warning: {warning}"));
    }
    if let Some(error) = result.error.as_deref().filter(|e| !e.is_empty()) {
        lines.push(format!("Error: {error}"));
    }
    lines.join("\n")
}
