//! Dispatcher configuration (`polecat.toml`).

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use minijinja::Environment;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "polecat.toml";

/// Dispatcher configuration (TOML).
///
/// Missing fields default to the stock tool bindings (`vc`, `bd`, `git`, `gm`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolecatConfig {
    pub agent: AgentConfig,
    pub tracker: TrackerConfig,
    pub git: GitConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Program and leading arguments; targeting flags are appended.
    pub command: Vec<String>,
    /// Kill the agent after this many seconds. Unset waits forever.
    pub timeout_secs: Option<u64>,
    /// Truncate captured agent stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "vc".to_string(),
                "exec".to_string(),
                "--polecat-mode".to_string(),
            ],
            timeout_secs: None,
            output_limit_bytes: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackerConfig {
    pub command: Vec<String>,
    /// Provenance label attached to every discovered issue.
    pub label: String,
    pub default_title: String,
    pub default_type: String,
    pub default_priority: i64,
    /// Pattern locating the created identifier in the tracker's text response.
    pub id_pattern: String,
    /// Ask the tracker for a JSON response and read its `id` field first.
    pub json_output: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            command: vec!["bd".to_string(), "create".to_string()],
            label: "discovered:related".to_string(),
            default_title: "Discovered issue".to_string(),
            default_type: "task".to_string(),
            default_priority: 2,
            id_pattern: r"(vc-[a-z0-9]+)".to_string(),
            json_output: false,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    /// Shared branch completed work is merged into.
    pub integration_branch: String,
    pub remote: String,
    /// Push the integration branch after a successful merge.
    pub push: bool,
    pub commit_prefix: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            integration_branch: "main".to_string(),
            remote: "origin".to_string(),
            push: true,
            commit_prefix: "VC: ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotifyConfig {
    pub command: Vec<String>,
    /// minijinja template with `status` and `summary` in scope.
    pub template: String,
    pub timeout_secs: Option<u64>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            command: vec!["gm".to_string(), "reply".to_string()],
            template: "Task {{ status }}: {{ summary }}".to_string(),
            timeout_secs: None,
        }
    }
}

impl PolecatConfig {
    pub fn validate(&self) -> Result<()> {
        validate_command("agent.command", &self.agent.command)?;
        validate_command("tracker.command", &self.tracker.command)?;
        validate_command("notify.command", &self.notify.command)?;
        validate_timeout("agent.timeout_secs", self.agent.timeout_secs)?;
        validate_timeout("tracker.timeout_secs", self.tracker.timeout_secs)?;
        validate_timeout("notify.timeout_secs", self.notify.timeout_secs)?;
        if self.agent.output_limit_bytes == 0 {
            return Err(anyhow!("agent.output_limit_bytes must be > 0"));
        }
        if self.tracker.label.trim().is_empty() {
            return Err(anyhow!("tracker.label must not be empty"));
        }
        if self.tracker.default_title.trim().is_empty() {
            return Err(anyhow!("tracker.default_title must not be empty"));
        }
        Regex::new(&self.tracker.id_pattern)
            .with_context(|| format!("tracker.id_pattern '{}'", self.tracker.id_pattern))?;
        if self.git.integration_branch.trim().is_empty() {
            return Err(anyhow!("git.integration_branch must not be empty"));
        }
        if self.git.push && self.git.remote.trim().is_empty() {
            return Err(anyhow!("git.remote must not be empty when git.push is enabled"));
        }
        Environment::new()
            .template_from_str(&self.notify.template)
            .context("notify.template")?;
        Ok(())
    }
}

fn validate_command(key: &str, command: &[String]) -> Result<()> {
    match command.first() {
        Some(program) if !program.trim().is_empty() => Ok(()),
        _ => Err(anyhow!("{key} must be a non-empty array")),
    }
}

fn validate_timeout(key: &str, timeout_secs: Option<u64>) -> Result<()> {
    if timeout_secs == Some(0) {
        return Err(anyhow!("{key} must be > 0 when set"));
    }
    Ok(())
}

/// Convert an optional seconds setting into a timeout.
pub fn timeout(timeout_secs: Option<u64>) -> Option<Duration> {
    timeout_secs.map(Duration::from_secs)
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PolecatConfig::default()`.
pub fn load_config(path: &Path) -> Result<PolecatConfig> {
    if !path.exists() {
        let cfg = PolecatConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PolecatConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
