//! Polecat wrapper CLI.
//!
//! Runs a single task through the coding agent, then files discovered issues,
//! integrates the changes and replies to the dispatcher. Exit status follows
//! the agent's `success` flag (0/1), with 130 on interrupt.

use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing::debug;

use polecat::cancel::CancelToken;
use polecat::core::mode::ModeOverride;
use polecat::core::outcome::RunOutcome;
use polecat::core::task::TaskSpec;
use polecat::error::DispatchError;
use polecat::exit_codes;
use polecat::io::agent::CommandAgent;
use polecat::io::config::{DEFAULT_CONFIG_FILE, load_config};
use polecat::io::git::Git;
use polecat::io::messenger::CommandMessenger;
use polecat::io::signal;
use polecat::io::tracker::CommandTracker;
use polecat::logging;
use polecat::orchestrate::{Orchestrator, RunOptions};
use polecat::report;

#[derive(Parser, Debug)]
#[command(
    name = "polecat",
    version,
    about = "Run one task through the coding agent and integrate the result",
    group(ArgGroup::new("target").args(["task", "issue", "stdin"]))
)]
struct Cli {
    /// Task description.
    task: Option<String>,
    /// Work on an existing tracker issue instead of a description.
    #[arg(short, long, value_name = "ID")]
    issue: Option<String>,
    /// Read the task description from stdin.
    #[arg(long)]
    stdin: bool,
    /// Force lite mode.
    #[arg(short, long)]
    lite: bool,
    /// Force lite mode (alias kept for dispatchers).
    #[arg(long)]
    force_lite: bool,
    /// Force full mode.
    #[arg(long, conflicts_with_all = ["lite", "force_lite"])]
    full: bool,
    /// Message to reply to with the final status.
    #[arg(short = 'm', long, value_name = "ID")]
    message_id: Option<String>,
    /// Run the agent but skip issues, commit and reply.
    #[arg(short = 'n', long)]
    dry_run: bool,
    /// Debug logging and live agent diagnostics on stderr.
    #[arg(short, long)]
    verbose: bool,
    /// Print a JSON summary instead of text lines.
    #[arg(long)]
    json: bool,
    /// Config file (missing file means defaults).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

impl Cli {
    fn mode_override(&self) -> ModeOverride {
        if self.lite || self.force_lite {
            ModeOverride::Lite
        } else if self.full {
            ModeOverride::Full
        } else {
            ModeOverride::Auto
        }
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            mode_override: self.mode_override(),
            recipient: self.message_id.clone(),
            dry_run: self.dry_run,
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version print to stdout and are not failures.
            let code = if err.use_stderr() {
                exit_codes::FAILED
            } else {
                exit_codes::OK
            };
            let _ = err.print();
            process::exit(code);
        }
    };
    logging::init(cli.verbose);

    let code = match run(&cli) {
        Ok(outcome) => match print_outcome(&outcome, cli.json) {
            Ok(()) if outcome.succeeded() => exit_codes::OK,
            Ok(()) => exit_codes::FAILED,
            Err(err) => {
                eprintln!("error: {err:#}");
                exit_codes::FAILED
            }
        },
        Err(err) if is_interrupted(&err) => {
            eprintln!("Interrupted");
            exit_codes::INTERRUPTED
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_codes::FAILED
        }
    };
    process::exit(code);
}

fn run(cli: &Cli) -> Result<RunOutcome> {
    let stream = if cli.stdin { Some(read_stdin()?) } else { None };
    let task = TaskSpec::from_inputs(cli.task.clone(), cli.issue.clone(), stream)?;
    let config = load_config(&cli.config)?;

    let cancel = CancelToken::new();
    signal::install(cancel.clone())?;

    let workdir = env::current_dir().context("read current directory")?;
    let vcs = Git::new(workdir);
    debug!(workdir = %vcs.workdir().display(), config = %cli.config.display(), "starting run");

    let agent = CommandAgent::new(&config.agent, cli.verbose);
    let tracker = CommandTracker::new(&config.tracker)?;
    let messenger = CommandMessenger::new(&config.notify);
    let orchestrator = Orchestrator {
        agent: &agent,
        tracker: &tracker,
        vcs: &vcs,
        messenger: &messenger,
        config: &config,
        cancel,
    };
    Ok(orchestrator.run(&task, &cli.run_options())?)
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("read task from stdin")?;
    Ok(text)
}

fn print_outcome(outcome: &RunOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", report::render_json(outcome).context("serialize report")?);
    } else {
        println!("{}", report::render_human(outcome));
    }
    Ok(())
}

fn is_interrupted(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<DispatchError>(),
        Some(DispatchError::Interrupted)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_positional_task() {
        let cli = Cli::parse_from(["polecat", "Fix typo in README"]);
        assert_eq!(cli.task.as_deref(), Some("Fix typo in README"));
        assert_eq!(cli.mode_override(), ModeOverride::Auto);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn parse_issue_with_reply_and_dry_run() {
        let cli = Cli::parse_from(["polecat", "-i", "vc-12", "-m", "msg-3", "-n", "--json"]);
        let options = cli.run_options();
        assert_eq!(cli.issue.as_deref(), Some("vc-12"));
        assert_eq!(options.recipient.as_deref(), Some("msg-3"));
        assert!(options.dry_run);
        assert!(cli.json);
    }

    #[test]
    fn lite_flags_force_lite() {
        for flag in ["--lite", "-l", "--force-lite"] {
            let cli = Cli::parse_from(["polecat", flag, "Implement OAuth2 login"]);
            assert_eq!(cli.mode_override(), ModeOverride::Lite, "{flag}");
        }
        let cli = Cli::parse_from(["polecat", "--full", "typo"]);
        assert_eq!(cli.mode_override(), ModeOverride::Full);
    }

    #[test]
    fn targets_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["polecat", "task", "--issue", "vc-1"]).is_err());
        assert!(Cli::try_parse_from(["polecat", "--stdin", "--issue", "vc-1"]).is_err());
    }

    #[test]
    fn lite_and_full_conflict() {
        assert!(Cli::try_parse_from(["polecat", "--lite", "--full", "task"]).is_err());
    }

    #[test]
    fn interrupted_is_detected_through_anyhow() {
        let err = anyhow::Error::from(DispatchError::Interrupted);
        assert!(is_interrupted(&err));
        assert!(!is_interrupted(&anyhow::anyhow!("other")));
    }
}
