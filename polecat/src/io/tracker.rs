//! Issue tracker adapter (`bd create` by default).

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::io::config::{TrackerConfig, timeout};
use crate::io::process::run_command;

const TRACKER_OUTPUT_LIMIT_BYTES: usize = 64 * 1024;

/// One fully defaulted issue-creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub title: String,
    pub description: Option<String>,
    pub issue_type: String,
    pub priority: String,
    pub label: String,
}

impl IssueRequest {
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--title".to_string(),
            self.title.clone(),
            "--type".to_string(),
            self.issue_type.clone(),
            "--priority".to_string(),
            self.priority.clone(),
            "--label".to_string(),
            self.label.clone(),
        ];
        if let Some(description) = &self.description {
            args.push("--description".to_string());
            args.push(description.clone());
        }
        args
    }
}

/// Issue-creation capability.
pub trait IssueTracker {
    /// Create one issue.
    ///
    /// `Ok(None)` means the tracker accepted the request but no identifier
    /// could be read from its response.
    fn create(&self, request: &IssueRequest) -> Result<Option<String>>;
}

/// Tracker that spawns the configured command.
#[derive(Debug, Clone)]
pub struct CommandTracker {
    command: Vec<String>,
    id_pattern: Regex,
    json_output: bool,
    timeout: Option<Duration>,
}

impl CommandTracker {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let id_pattern = Regex::new(&config.id_pattern)
            .with_context(|| format!("compile tracker id pattern '{}'", config.id_pattern))?;
        Ok(Self {
            command: config.command.clone(),
            id_pattern,
            json_output: config.json_output,
            timeout: timeout(config.timeout_secs),
        })
    }
}

impl IssueTracker for CommandTracker {
    #[instrument(skip_all, fields(title = %request.title))]
    fn create(&self, request: &IssueRequest) -> Result<Option<String>> {
        let (program, base_args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("tracker command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(base_args).args(request.args());
        if self.json_output {
            cmd.arg("--json");
        }

        let output = run_command(cmd, None, self.timeout, TRACKER_OUTPUT_LIMIT_BYTES, false)?;
        if output.timed_out {
            return Err(anyhow!("{program} timed out"));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "{program} exited with {:?}: {}",
                output.status.code(),
                output.stderr_text().trim()
            ));
        }

        let id = extract_issue_id(&output.stdout_text(), &self.id_pattern);
        debug!(id = ?id, "tracker responded");
        Ok(id)
    }
}

/// Read the created identifier from a tracker response.
///
/// A JSON object with a string `id` field wins; otherwise the first match of
/// `pattern` (its first capture group when it has one).
pub fn extract_issue_id(response: &str, pattern: &Regex) -> Option<String> {
    let trimmed = response.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed)
        && let Some(Value::String(id)) = map.get("id")
        && !id.is_empty()
    {
        return Some(id.clone());
    }

    let caps = pattern.captures(trimmed)?;
    caps.get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_pattern() -> Regex {
        Regex::new(&TrackerConfig::default().id_pattern).expect("pattern")
    }

    fn request(description: Option<&str>) -> IssueRequest {
        IssueRequest {
            title: "Flaky test".to_string(),
            description: description.map(str::to_string),
            issue_type: "task".to_string(),
            priority: "2".to_string(),
            label: "discovered:related".to_string(),
        }
    }

    #[test]
    fn extracts_id_from_text_response() {
        let id = extract_issue_id("Created issue: vc-a1b2\n", &default_pattern());
        assert_eq!(id.as_deref(), Some("vc-a1b2"));
    }

    #[test]
    fn prefers_structured_response() {
        let id = extract_issue_id(r#"{"id":"vc-json1","title":"x"}"#, &default_pattern());
        assert_eq!(id.as_deref(), Some("vc-json1"));
    }

    #[test]
    fn json_without_id_falls_back_to_pattern() {
        let id = extract_issue_id(r#"{"message":"Created vc-zz9"}"#, &default_pattern());
        assert_eq!(id.as_deref(), Some("vc-zz9"));
    }

    #[test]
    fn no_match_yields_none() {
        assert_eq!(extract_issue_id("ok", &default_pattern()), None);
    }

    #[test]
    fn pattern_without_group_uses_whole_match() {
        let pattern = Regex::new(r"PROJ-\d+").expect("pattern");
        assert_eq!(
            extract_issue_id("created PROJ-42", &pattern).as_deref(),
            Some("PROJ-42")
        );
    }

    #[test]
    fn request_args_omit_empty_description() {
        assert_eq!(
            request(None).args(),
            vec![
                "--title",
                "Flaky test",
                "--type",
                "task",
                "--priority",
                "2",
                "--label",
                "discovered:related"
            ]
        );
    }

    #[test]
    fn request_args_include_description() {
        let args = request(Some("races on CI")).args();
        assert_eq!(&args[args.len() - 2..], ["--description", "races on CI"]);
    }

    #[cfg(unix)]
    #[test]
    fn command_tracker_reads_id_from_stdout() {
        let config = TrackerConfig {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo \"Created issue: vc-x7\"".to_string(),
            ],
            ..TrackerConfig::default()
        };
        let tracker = CommandTracker::new(&config).expect("tracker");
        let id = tracker.create(&request(None)).expect("create");
        assert_eq!(id.as_deref(), Some("vc-x7"));
    }

    #[cfg(unix)]
    #[test]
    fn command_tracker_non_zero_exit_errors() {
        let config = TrackerConfig {
            command: vec!["sh".to_string(), "-c".to_string(), "exit 1".to_string()],
            ..TrackerConfig::default()
        };
        let tracker = CommandTracker::new(&config).expect("tracker");
        assert!(tracker.create(&request(None)).is_err());
    }
}
