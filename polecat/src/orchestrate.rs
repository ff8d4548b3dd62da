//! Orchestration for one dispatched task.
//!
//! Sequence: invoke agent → publish discovered issues → commit and integrate →
//! reply to the originator. Dry-run keeps the agent call and suppresses every
//! later side effect.

use tracing::{debug, info, instrument};

use crate::cancel::CancelToken;
use crate::commit::RepositoryCommitter;
use crate::core::mode::{ModeOverride, resolve_mode};
use crate::core::outcome::RunOutcome;
use crate::core::task::TaskSpec;
use crate::error::DispatchError;
use crate::io::agent::{Agent, AgentRequest, Target};
use crate::io::config::PolecatConfig;
use crate::io::git::Vcs;
use crate::io::messenger::Messenger;
use crate::io::tracker::IssueTracker;
use crate::notify::{Notifier, ReplyStatus};
use crate::publish::publish;

/// Caller choices for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub mode_override: ModeOverride,
    /// Conversation/message to reply to, if known.
    pub recipient: Option<String>,
    pub dry_run: bool,
}

/// The four collaborators plus the settings that shape their use.
pub struct Orchestrator<'a, A, T, V, M> {
    pub agent: &'a A,
    pub tracker: &'a T,
    pub vcs: &'a V,
    pub messenger: &'a M,
    pub config: &'a PolecatConfig,
    pub cancel: CancelToken,
}

impl<A, T, V, M> Orchestrator<'_, A, T, V, M>
where
    A: Agent,
    T: IssueTracker,
    V: Vcs,
    M: Messenger,
{
    /// Run the task once. Fatal errors abort the remaining steps.
    #[instrument(skip_all, fields(dry_run = options.dry_run))]
    pub fn run(&self, task: &TaskSpec, options: &RunOptions) -> Result<RunOutcome, DispatchError> {
        let mode = resolve_mode(options.mode_override, task.mode_text());
        let request = AgentRequest {
            mode,
            target: target_for(task),
        };
        info!(mode = mode.as_str(), "dispatching task to agent");

        self.cancel.check()?;
        let invoked = self.agent.invoke(&request);
        self.cancel.check()?;
        let result = invoked?;
        info!(
            status = %result.status,
            success = result.success,
            files_modified = result.files_modified.len(),
            discovered_issues = result.discovered_issues.len(),
            "agent finished"
        );

        let mut outcome = RunOutcome {
            mode,
            result,
            dry_run: options.dry_run,
            created_issues: Vec::new(),
            merged: None,
            notified: false,
            warnings: Vec::new(),
        };

        if options.dry_run {
            debug!("dry run, skipping issues, commit and reply");
            return Ok(outcome);
        }

        if !outcome.result.discovered_issues.is_empty() {
            let publication = publish(
                self.tracker,
                &outcome.result.discovered_issues,
                &self.config.tracker,
                &self.cancel,
            )?;
            if !publication.created.is_empty() {
                info!(ids = %publication.created.join(", "), "created issues");
            }
            outcome.created_issues = publication.created;
            outcome.warnings.extend(publication.warnings);
        }

        if outcome.result.is_integrable() {
            let integration = RepositoryCommitter::new(self.vcs, &self.config.git, &self.cancel)
                .commit_and_integrate(&task.describe(), &outcome.result.files_modified)?;
            info!(merged = integration.merged, "integration finished");
            outcome.merged = Some(integration.merged);
            outcome.warnings.extend(integration.warnings);
        } else {
            debug!(status = %outcome.result.status, "result not integrable, skipping commit");
        }

        self.cancel.check()?;
        let notifier = Notifier::new(self.messenger, &self.config.notify.template);
        outcome.notified = notifier.notify(
            options.recipient.as_deref(),
            ReplyStatus::from_success(outcome.result.success),
            &outcome.result.summary,
        );
        // A reply killed by the interrupt is swallowed above; report the interrupt.
        self.cancel.check()?;

        Ok(outcome)
    }
}

fn target_for(task: &TaskSpec) -> Target {
    match task {
        TaskSpec::Text(text) => Target::Task(text.clone()),
        TaskSpec::Issue(id) => Target::Issue(id.clone()),
        TaskSpec::Stream(text) => Target::Stdin(text.clone()),
    }
}
