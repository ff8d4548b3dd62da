//! Outcome types for one orchestration pass.

use std::fmt;

use serde::Serialize;

use crate::core::mode::Mode;
use crate::core::result::AgentResult;

/// A failure the run absorbed instead of aborting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    IssueCreationFailed { title: String, reason: String },
    MergeConflict { branch: String, detail: String },
    PushFailed { branch: String, detail: String },
    BranchNotRestored { branch: String, detail: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::IssueCreationFailed { title, reason } => {
                write!(f, "issue creation failed for '{title}': {reason}")
            }
            Warning::MergeConflict { branch, detail } => {
                write!(
                    f,
                    "merge conflict integrating '{branch}', manual resolution needed: {detail}"
                )
            }
            Warning::PushFailed { branch, detail } => {
                write!(f, "push of '{branch}' failed: {detail}")
            }
            Warning::BranchNotRestored { branch, detail } => {
                write!(f, "could not return to branch '{branch}': {detail}")
            }
        }
    }
}

/// Result of the commit/merge step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    pub merged: bool,
    pub warnings: Vec<Warning>,
}

impl Integration {
    pub fn merged() -> Self {
        Self {
            merged: true,
            warnings: Vec::new(),
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub mode: Mode,
    pub result: AgentResult,
    pub dry_run: bool,
    /// Identifiers the tracker reported for created issues.
    pub created_issues: Vec<String>,
    /// `None` when commit/merge was not attempted.
    pub merged: Option<bool>,
    pub notified: bool,
    pub warnings: Vec<Warning>,
}

impl RunOutcome {
    /// Process-level success is the agent's `success` flag, nothing else.
    pub fn succeeded(&self) -> bool {
        self.result.success
    }
}
