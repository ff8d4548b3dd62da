//! Execution mode selection.
//!
//! The agent runs either a full pass (preflight, assessment, iterations) or a
//! lite single pass. Lite still runs quality gates. The choice is a keyword
//! heuristic over the task text and can be overridden by the caller.

use serde::{Deserialize, Serialize};

/// Task text shorter than this (in characters) counts as short.
pub const SHORT_TEXT_THRESHOLD: usize = 50;

/// Any of these forces lite mode regardless of length.
const TRIVIAL_EDIT_KEYWORDS: &[&str] = &[
    "typo",
    "fix comment",
    "update readme",
    "rename",
    "fix spelling",
    "add comment",
    "remove comment",
    "whitespace",
    "formatting",
    "capitalize",
    "punctuation",
];

/// Any of these keeps short text in full mode.
const COMPLEXITY_KEYWORDS: &[&str] = &[
    "implement",
    "refactor",
    "redesign",
    "integrate",
    "migrate",
    "add feature",
    "security",
    "authentication",
];

/// How the agent should execute the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Full,
    Lite,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Full => "full",
            Mode::Lite => "lite",
        }
    }
}

/// Caller-supplied override of the heuristic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModeOverride {
    #[default]
    Auto,
    Lite,
    Full,
}

/// Pick a mode from task text alone.
pub fn select_mode(task_text: &str) -> Mode {
    let lowered = task_text.to_lowercase();

    if contains_any(&lowered, TRIVIAL_EDIT_KEYWORDS) {
        return Mode::Lite;
    }

    if task_text.chars().count() < SHORT_TEXT_THRESHOLD {
        if contains_any(&lowered, COMPLEXITY_KEYWORDS) {
            return Mode::Full;
        }
        return Mode::Lite;
    }

    Mode::Full
}

/// Resolve the mode for one run.
///
/// `task_text` is `None` when the task is an issue reference; the heuristic
/// has nothing to look at then and full mode is used unless overridden.
pub fn resolve_mode(mode_override: ModeOverride, task_text: Option<&str>) -> Mode {
    match mode_override {
        ModeOverride::Lite => Mode::Lite,
        ModeOverride::Full => Mode::Full,
        ModeOverride::Auto => match task_text {
            Some(text) if !text.is_empty() => select_mode(text),
            _ => Mode::Full,
        },
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
