//! Notifier: best-effort status reply to the task's originator.

use minijinja::{Environment, context};
use tracing::{debug, info};

use crate::io::messenger::Messenger;

/// Summary used when the agent reported none.
pub const EMPTY_SUMMARY: &str = "No summary available";

/// Terminal status sent to the originator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Completed,
    Failed,
}

impl ReplyStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            ReplyStatus::Completed
        } else {
            ReplyStatus::Failed
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReplyStatus::Completed => "completed",
            ReplyStatus::Failed => "failed",
        }
    }
}

/// Renders reply text and hands it to a [`Messenger`].
pub struct Notifier<'a, M: Messenger> {
    messenger: &'a M,
    env: Environment<'static>,
    template: String,
}

impl<'a, M: Messenger> Notifier<'a, M> {
    /// `template` should already be validated (see `PolecatConfig::validate`).
    pub fn new(messenger: &'a M, template: &str) -> Self {
        Self {
            messenger,
            env: Environment::new(),
            template: template.to_string(),
        }
    }

    /// Render the reply for `status` and `summary`.
    ///
    /// Falls back to the built-in format if the template fails to render.
    pub fn render(&self, status: ReplyStatus, summary: &str) -> String {
        let summary = if summary.trim().is_empty() {
            EMPTY_SUMMARY
        } else {
            summary
        };
        self.env
            .render_str(
                &self.template,
                context! {
                    status => status.as_str(),
                    summary => summary,
                },
            )
            .unwrap_or_else(|err| {
                debug!(err = %err, "reply template failed to render");
                format!("Task {}: {summary}", status.as_str())
            })
    }

    /// Send the reply. Returns whether the messenger accepted it.
    ///
    /// Never fails: no recipient is a no-op and messenger errors are swallowed.
    pub fn notify(&self, recipient: Option<&str>, status: ReplyStatus, summary: &str) -> bool {
        let Some(recipient) = recipient.filter(|r| !r.trim().is_empty()) else {
            debug!("no recipient, skipping reply");
            return false;
        };
        let message = self.render(status, summary);
        match self.messenger.send(recipient, &message) {
            Ok(()) => {
                info!(recipient, status = status.as_str(), "reply sent");
                true
            }
            Err(err) => {
                debug!(err = %format!("{err:#}"), "messenger unavailable, reply dropped");
                false
            }
        }
    }
}
