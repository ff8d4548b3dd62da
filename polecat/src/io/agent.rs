//! Agent abstraction for task execution.
//!
//! The [`Agent`] trait decouples orchestration from the actual agent backend
//! (by default `vc exec --polecat-mode`). Tests use scripted agents that return
//! predetermined results without spawning processes.

use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::core::mode::Mode;
use crate::core::result::AgentResult;
use crate::error::DispatchError;
use crate::io::config::{AgentConfig, timeout};
use crate::io::process::{CommandOutput, run_command, spawn_failure};

/// What the agent should work on. Exactly one target per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Task(String),
    Issue(String),
    /// Task text delivered on the agent's stdin.
    Stdin(String),
}

/// Parameters for an agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRequest {
    pub mode: Mode,
    pub target: Target,
}

impl AgentRequest {
    /// Arguments appended after the configured agent command.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.mode == Mode::Lite {
            args.push("--lite".to_string());
        }
        match &self.target {
            Target::Issue(id) => {
                args.push("--issue".to_string());
                args.push(id.clone());
            }
            Target::Stdin(_) => args.push("--stdin".to_string()),
            Target::Task(text) => {
                args.push("--task".to_string());
                args.push(text.clone());
            }
        }
        args
    }

    fn stdin(&self) -> Option<&[u8]> {
        match &self.target {
            Target::Stdin(text) => Some(text.as_bytes()),
            Target::Task(_) | Target::Issue(_) => None,
        }
    }
}

/// Abstraction over agent execution backends.
pub trait Agent {
    /// Run the agent once and return its validated result.
    fn invoke(&self, request: &AgentRequest) -> Result<AgentResult, DispatchError>;
}

/// Agent that spawns the configured command.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    program: String,
    base_args: Vec<String>,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
    echo_diagnostics: bool,
}

impl CommandAgent {
    /// `config.command` must be non-empty (guaranteed by config validation).
    pub fn new(config: &AgentConfig, echo_diagnostics: bool) -> Self {
        let (program, base_args) = match config.command.split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => (String::new(), Vec::new()),
        };
        Self {
            program,
            base_args,
            timeout: timeout(config.timeout_secs),
            output_limit_bytes: config.output_limit_bytes,
            echo_diagnostics,
        }
    }
}

impl Agent for CommandAgent {
    #[instrument(skip_all, fields(mode = request.mode.as_str()))]
    fn invoke(&self, request: &AgentRequest) -> Result<AgentResult, DispatchError> {
        let args = request.args();
        info!(program = %self.program, ?args, "starting agent");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args).args(&args);

        let output = run_command(
            cmd,
            request.stdin(),
            self.timeout,
            self.output_limit_bytes,
            self.echo_diagnostics,
        )
        .map_err(|err| match spawn_failure(&err) {
            Some(spawn) => DispatchError::AgentUnavailable {
                program: spawn.program.clone(),
                reason: spawn.source.to_string(),
            },
            None => DispatchError::AgentExecutionFailed {
                code: None,
                diagnostics: format!("{err:#}"),
            },
        })?;

        interpret_output(&output, self.timeout)
    }
}

/// Classify captured agent output.
///
/// A non-zero exit with a JSON object on stdout is the agent reporting failure
/// through its protocol and is parsed like any other result.
pub fn interpret_output(
    output: &CommandOutput,
    timeout: Option<Duration>,
) -> Result<AgentResult, DispatchError> {
    let stdout = output.stdout_text();

    if output.timed_out {
        warn!(timeout_secs = ?timeout.map(|t| t.as_secs()), "agent timed out");
        return Err(DispatchError::AgentExecutionFailed {
            code: output.status.code(),
            diagnostics: format!(
                "agent timed out after {:?}\n{}",
                timeout.unwrap_or_default(),
                output.stderr_text()
            ),
        });
    }

    if !output.status.success() && !stdout.trim_start().starts_with('{') {
        warn!(exit_code = ?output.status.code(), "agent failed without a result");
        return Err(DispatchError::AgentExecutionFailed {
            code: output.status.code(),
            diagnostics: output.stderr_text(),
        });
    }

    let result = AgentResult::parse(&stdout)?;
    debug!(status = %result.status, success = result.success, "parsed agent result");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::result::AgentStatus;

    fn request(mode: Mode, target: Target) -> AgentRequest {
        AgentRequest { mode, target }
    }

    #[test]
    fn task_target_args() {
        let args = request(Mode::Full, Target::Task("Implement OAuth2".to_string())).args();
        assert_eq!(args, vec!["--task", "Implement OAuth2"]);
    }

    #[test]
    fn lite_flag_precedes_target() {
        let args = request(Mode::Lite, Target::Task("Fix typo".to_string())).args();
        assert_eq!(args, vec!["--lite", "--task", "Fix typo"]);
    }

    #[test]
    fn issue_target_args() {
        let args = request(Mode::Full, Target::Issue("vc-123".to_string())).args();
        assert_eq!(args, vec!["--issue", "vc-123"]);
    }

    #[test]
    fn stdin_target_pipes_text() {
        let req = request(Mode::Full, Target::Stdin("long task".to_string()));
        assert_eq!(req.args(), vec!["--stdin"]);
        assert_eq!(req.stdin(), Some("long task".as_bytes()));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use crate::io::config::AgentConfig;

        fn sh_agent(script: &str) -> CommandAgent {
            let config = AgentConfig {
                command: vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    script.to_string(),
                    "agent".to_string(),
                ],
                ..AgentConfig::default()
            };
            CommandAgent::new(&config, false)
        }

        fn task() -> AgentRequest {
            request(Mode::Lite, Target::Task("Fix typo".to_string()))
        }

        #[test]
        fn parses_successful_output() {
            let agent = sh_agent(r#"echo '{"status":"completed","success":true,"summary":"ok"}'"#);
            let result = agent.invoke(&task()).expect("invoke");
            assert_eq!(result.status, AgentStatus::Completed);
            assert_eq!(result.summary, "ok");
        }

        #[test]
        fn passes_targeting_arguments() {
            let agent = sh_agent(
                r#"printf '{"status":"completed","success":true,"summary":"%s %s %s"}' "$1" "$2" "$3""#,
            );
            let result = agent.invoke(&task()).expect("invoke");
            assert_eq!(result.summary, "--lite --task Fix typo");
        }

        #[test]
        fn non_zero_exit_with_json_is_a_result() {
            let agent = sh_agent(
                r#"echo '{"status":"blocked","success":false,"error":"missing credentials"}'; exit 1"#,
            );
            let result = agent.invoke(&task()).expect("invoke");
            assert_eq!(result.status, AgentStatus::Blocked);
            assert_eq!(result.error.as_deref(), Some("missing credentials"));
        }

        #[test]
        fn non_zero_exit_without_json_is_execution_failure() {
            let agent = sh_agent("echo 'database locked' >&2; exit 2");
            let err = agent.invoke(&task()).unwrap_err();
            match err {
                DispatchError::AgentExecutionFailed { code, diagnostics } => {
                    assert_eq!(code, Some(2));
                    assert!(diagnostics.contains("database locked"));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[test]
        fn zero_exit_with_garbage_is_invalid_output() {
            let agent = sh_agent("echo 'not json'");
            let err = agent.invoke(&task()).unwrap_err();
            assert!(matches!(err, DispatchError::InvalidAgentOutput { .. }));
        }

        #[test]
        fn stdin_target_reaches_agent() {
            let agent = sh_agent(
                r#"body=$(cat); printf '{"status":"completed","success":true,"summary":"%s"}' "$body""#,
            );
            let req = request(Mode::Full, Target::Stdin("from stdin".to_string()));
            let result = agent.invoke(&req).expect("invoke");
            assert_eq!(result.summary, "from stdin");
        }

        #[test]
        fn missing_program_is_unavailable() {
            let config = AgentConfig {
                command: vec!["polecat-missing-agent".to_string()],
                ..AgentConfig::default()
            };
            let err = CommandAgent::new(&config, false).invoke(&task()).unwrap_err();
            assert!(matches!(err, DispatchError::AgentUnavailable { .. }));
        }
    }
}
