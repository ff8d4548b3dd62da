//! Validated result of one agent execution.
//!
//! The agent emits a single JSON object on stdout. Any field may be missing or
//! `null` and falls back to a safe default; wrong JSON types and malformed
//! syntax are rejected.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use jsonschema::{Draft, Validator};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

use crate::error::DispatchError;

const AGENT_RESULT_SCHEMA: &str = include_str!("../../schemas/agent_result.schema.json");

static RESULT_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(AGENT_RESULT_SCHEMA).expect("agent result schema should be json");
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .expect("agent result schema should compile")
});

/// Agent-declared outcome. `Unknown` covers missing and unrecognized values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum AgentStatus {
    Completed,
    Partial,
    Blocked,
    Failed,
    Decomposed,
    #[default]
    Unknown,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Completed => "completed",
            AgentStatus::Partial => "partial",
            AgentStatus::Blocked => "blocked",
            AgentStatus::Failed => "failed",
            AgentStatus::Decomposed => "decomposed",
            AgentStatus::Unknown => "unknown",
        }
    }

    fn from_label(label: &str) -> Self {
        match label {
            "completed" => AgentStatus::Completed,
            "partial" => AgentStatus::Partial,
            "blocked" => AgentStatus::Blocked,
            "failed" => AgentStatus::Failed,
            "decomposed" => AgentStatus::Decomposed,
            _ => AgentStatus::Unknown,
        }
    }
}

impl From<Option<String>> for AgentStatus {
    fn from(label: Option<String>) -> Self {
        label.as_deref().map_or(AgentStatus::Unknown, AgentStatus::from_label)
    }
}

impl From<AgentStatus> for String {
    fn from(status: AgentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracker priority, either numeric (`2`) or a tracker label (`"P1"`).
///
/// Whole floats (`2.0`) are read as levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Priority {
    Level(i64),
    Label(String),
}

impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawPriority::deserialize(deserializer)?
            .try_into()
            .map_err(de::Error::custom)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPriority {
    Int(i64),
    Float(f64),
    Label(String),
}

impl TryFrom<RawPriority> for Priority {
    type Error = String;

    fn try_from(raw: RawPriority) -> Result<Self, Self::Error> {
        match raw {
            RawPriority::Int(level) => Ok(Priority::Level(level)),
            RawPriority::Float(level) => whole(level)
                .and_then(|level| i64::try_from(level).ok())
                .map(Priority::Level)
                .ok_or_else(|| format!("priority {level} is not a whole number")),
            RawPriority::Label(label) => Ok(Priority::Label(label)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Level(level) => write!(f, "{level}"),
            Priority::Label(label) => f.write_str(label),
        }
    }
}

/// Follow-up work the agent found outside the current task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveredIssue {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentResult {
    pub status: AgentStatus,
    #[serde(deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(deserialize_with = "whole_count")]
    pub iterations: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub converged: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub duration_seconds: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub files_modified: Vec<String>,
    /// Gate name to outcome; passed through untouched.
    #[serde(deserialize_with = "null_as_default")]
    pub quality_gates: BTreeMap<String, Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub discovered_issues: Vec<DiscoveredIssue>,
    #[serde(deserialize_with = "null_as_default")]
    pub punted_items: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
    pub error: Option<String>,
    pub message: Option<String>,
    pub decomposition: Option<Value>,
}

impl AgentResult {
    /// Parse and validate raw agent stdout.
    pub fn parse(raw: &str) -> Result<Self, DispatchError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| DispatchError::invalid_output(err.to_string(), raw))?;

        let violations: Vec<String> = RESULT_VALIDATOR
            .iter_errors(&value)
            .map(|err| err.to_string())
            .collect();
        if !violations.is_empty() {
            return Err(DispatchError::invalid_output(
                format!("schema validation failed:\n- {}", violations.join("\n- ")),
                raw,
            ));
        }

        serde_json::from_value(value)
            .map_err(|err| DispatchError::invalid_output(err.to_string(), raw))
    }

    /// Completed and successful: the only state whose changes get integrated.
    pub fn is_integrable(&self) -> bool {
        self.success && self.status == AgentStatus::Completed
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Non-negative count; `null` is 0 and `3.0` is 3.
fn whole_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(0);
    };
    let count = match number.as_u64() {
        Some(count) => Some(count),
        None => number.as_f64().and_then(whole).and_then(|n| u64::try_from(n).ok()),
    };
    count
        .and_then(|count| u32::try_from(count).ok())
        .ok_or_else(|| de::Error::custom(format!("{number} is not a valid count")))
}

/// Integral value of `n`, if it has one that fits in `i128`.
fn whole(n: f64) -> Option<i128> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() < 1e18).then_some(n as i128)
}
