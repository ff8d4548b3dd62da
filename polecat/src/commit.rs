//! Repository committer: commit produced changes and merge them into the
//! integration branch.
//!
//! The working branch active before the call is the branch active after it,
//! whatever happens in between. Merge conflicts and push failures degrade to
//! warnings; staging/commit failures are fatal.

use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::core::outcome::{Integration, Warning};
use crate::core::task::commit_message;
use crate::error::DispatchError;
use crate::io::config::GitConfig;
use crate::io::git::{CommitStatus, MergeStatus, Vcs};

/// How far the sequence got. Drives compensation on interrupt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitState {
    Clean,
    Staged,
    /// Committed on `branch`, still checked out there.
    Committed { branch: String },
    /// Switched to the integration branch; `branch` is where we came from.
    OnIntegration { branch: String },
    /// A merge of `branch` into the integration branch was started.
    MergeAttempted { branch: String },
}

/// Stage, commit, merge into the integration branch, push, and return.
pub struct RepositoryCommitter<'a, V: Vcs> {
    vcs: &'a V,
    config: &'a GitConfig,
    cancel: &'a CancelToken,
    state: CommitState,
}

impl<'a, V: Vcs> RepositoryCommitter<'a, V> {
    pub fn new(vcs: &'a V, config: &'a GitConfig, cancel: &'a CancelToken) -> Self {
        Self {
            vcs,
            config,
            cancel,
            state: CommitState::Clean,
        }
    }

    pub fn state(&self) -> &CommitState {
        &self.state
    }

    #[instrument(skip_all, fields(files = files_modified.len()))]
    pub fn commit_and_integrate(
        &mut self,
        task_text: &str,
        files_modified: &[String],
    ) -> Result<Integration, DispatchError> {
        if files_modified.is_empty() {
            debug!("no files modified, skipping commit");
            return Ok(Integration::merged());
        }

        self.checkpoint()?;
        if let Err(err) = self.vcs.stage_all() {
            return Err(self.fail(format!("stage changes: {err:#}")));
        }
        self.state = CommitState::Staged;

        self.checkpoint()?;
        let message = commit_message(&self.config.commit_prefix, task_text);
        let status = match self.vcs.commit(&message) {
            Ok(status) => status,
            Err(err) => return Err(self.fail(format!("{err:#}"))),
        };
        if status == CommitStatus::NothingToCommit {
            info!("nothing to commit, treating as integrated");
            return Ok(Integration::merged());
        }

        let branch = match self.vcs.current_branch() {
            Ok(branch) => branch,
            Err(err) => return Err(self.fail(format!("read current branch: {err:#}"))),
        };
        info!(branch = %branch, message = %message, "committed changes");
        self.state = CommitState::Committed {
            branch: branch.clone(),
        };

        self.checkpoint()?;
        if branch == self.config.integration_branch {
            debug!(branch = %branch, "already on integration branch, skipping merge");
            return Ok(Integration {
                merged: true,
                warnings: self.push().into_iter().collect(),
            });
        }

        let target = self.config.integration_branch.clone();
        if let Err(err) = self.vcs.checkout(&target) {
            return Err(self.fail(format!("switch to {target}: {err:#}")));
        }
        self.state = CommitState::OnIntegration {
            branch: branch.clone(),
        };

        self.checkpoint()?;
        self.state = CommitState::MergeAttempted {
            branch: branch.clone(),
        };
        let merge = match self.vcs.merge(&branch) {
            Ok(merge) => merge,
            Err(err) => return Err(self.fail(format!("merge {branch} into {target}: {err:#}"))),
        };

        let merged = merge == MergeStatus::Merged;
        let mut warnings = Vec::new();
        match merge {
            MergeStatus::Merged => {
                info!(branch = %branch, target = %target, "merged");
                self.checkpoint()?;
                warnings.extend(self.push());
            }
            MergeStatus::Conflict(detail) => {
                let warning = Warning::MergeConflict {
                    branch: branch.clone(),
                    detail,
                };
                warn!("{warning}");
                warnings.push(warning);
                if let Err(err) = self.vcs.abort_merge() {
                    warn!(err = %format!("{err:#}"), "failed to abort merge");
                }
            }
        }

        warnings.extend(self.restore(&branch));
        Ok(Integration { merged, warnings })
    }

    /// Stop at this boundary if interrupted, undoing what the state requires.
    fn checkpoint(&mut self) -> Result<(), DispatchError> {
        if self.cancel.is_cancelled() {
            warn!(state = ?self.state, "interrupted during commit/merge");
            self.compensate();
            return Err(DispatchError::Interrupted);
        }
        Ok(())
    }

    /// Map a failed git step. An interrupt also kills the child in flight, so a
    /// failure after cancellation is reported as the interrupt.
    fn fail(&mut self, detail: String) -> DispatchError {
        self.compensate();
        if self.cancel.is_cancelled() {
            warn!(state = ?self.state, detail = %detail, "git step killed by interrupt");
            return DispatchError::Interrupted;
        }
        DispatchError::CommitFailed(detail)
    }

    /// Return the checkout to the working branch based on the last known state.
    fn compensate(&mut self) {
        let branch = match &self.state {
            CommitState::Clean | CommitState::Staged | CommitState::Committed { .. } => return,
            CommitState::OnIntegration { branch } => branch.clone(),
            CommitState::MergeAttempted { branch } => {
                if let Err(err) = self.vcs.abort_merge() {
                    warn!(err = %format!("{err:#}"), "failed to abort merge");
                }
                branch.clone()
            }
        };
        if let Some(warning) = self.restore(&branch) {
            warn!("{warning}");
        }
    }

    fn restore(&mut self, branch: &str) -> Option<Warning> {
        match self.vcs.checkout(branch) {
            Ok(()) => {
                self.state = CommitState::Committed {
                    branch: branch.to_string(),
                };
                None
            }
            Err(err) => Some(Warning::BranchNotRestored {
                branch: branch.to_string(),
                detail: format!("{err:#}"),
            }),
        }
    }

    fn push(&self) -> Option<Warning> {
        if !self.config.push {
            debug!("push disabled");
            return None;
        }
        let target = &self.config.integration_branch;
        match self.vcs.push(&self.config.remote, target) {
            Ok(()) => {
                info!(remote = %self.config.remote, branch = %target, "pushed");
                None
            }
            Err(err) => {
                let warning = Warning::PushFailed {
                    branch: target.clone(),
                    detail: format!("{err:#}"),
                };
                warn!("{warning}");
                Some(warning)
            }
        }
    }
}
