//! Fatal error taxonomy for a dispatch run.
//!
//! Every variant here aborts the remaining orchestration steps. Conditions the
//! run absorbs (issue creation failures, merge conflicts, push failures) are
//! [`crate::core::outcome::Warning`] values instead.

use thiserror::Error;

/// Longest excerpt of unparseable agent output kept for diagnosis.
pub const OUTPUT_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// No valid targeting mode, or more than one.
    #[error("usage: {0}")]
    Usage(String),

    /// The agent executable could not be located or started.
    #[error("agent `{program}` is unavailable (is it installed and on PATH?): {reason}")]
    AgentUnavailable { program: String, reason: String },

    /// Non-zero exit without a JSON object on stdout.
    #[error("agent execution failed (exit code {}): {}", display_code(.code), .diagnostics.trim())]
    AgentExecutionFailed {
        code: Option<i32>,
        diagnostics: String,
    },

    /// Stdout was not a JSON object matching the result schema.
    #[error("failed to parse agent output: {reason}\noutput: {excerpt}")]
    InvalidAgentOutput { reason: String, excerpt: String },

    /// Staging, committing or branch handling failed.
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// The run was interrupted between two blocking calls.
    #[error("interrupted")]
    Interrupted,
}

impl DispatchError {
    pub fn invalid_output(reason: impl Into<String>, raw: &str) -> Self {
        DispatchError::InvalidAgentOutput {
            reason: reason.into(),
            excerpt: excerpt(raw),
        }
    }
}

/// First [`OUTPUT_EXCERPT_CHARS`] characters of `raw`.
pub fn excerpt(raw: &str) -> String {
    raw.chars().take(OUTPUT_EXCERPT_CHARS).collect()
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}
