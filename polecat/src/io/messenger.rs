//! Messaging adapter used to reply to the task's originator (`gm reply`).

use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::instrument;

use crate::io::config::{NotifyConfig, timeout};
use crate::io::process::run_command;

const MESSENGER_OUTPUT_LIMIT_BYTES: usize = 16 * 1024;

/// Fire-and-forget reply capability.
pub trait Messenger {
    fn send(&self, recipient: &str, message: &str) -> Result<()>;
}

/// Messenger that spawns the configured command with `<recipient> <message>`.
#[derive(Debug, Clone)]
pub struct CommandMessenger {
    command: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandMessenger {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            command: config.command.clone(),
            timeout: timeout(config.timeout_secs),
        }
    }
}

impl Messenger for CommandMessenger {
    #[instrument(skip_all, fields(recipient = %recipient))]
    fn send(&self, recipient: &str, message: &str) -> Result<()> {
        let (program, base_args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("messenger command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(base_args).arg(recipient).arg(message);

        let output = run_command(cmd, None, self.timeout, MESSENGER_OUTPUT_LIMIT_BYTES, false)?;
        if !output.success() {
            return Err(anyhow!(
                "{program} exited with {:?}: {}",
                output.status.code(),
                output.stderr_text().trim()
            ));
        }
        Ok(())
    }
}
