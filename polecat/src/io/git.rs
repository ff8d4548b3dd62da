//! Git adapter for the repository committer.
//!
//! The committer only needs command-level behavior (stage, commit, branch
//! switching, merge, push), so we keep a small, explicit wrapper around `git`
//! subprocess calls behind the [`Vcs`] trait.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

/// Outcome of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    Committed,
    /// Nothing was staged; no commit was created.
    NothingToCommit,
}

/// Outcome of a merge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStatus {
    Merged,
    /// The merge command failed; the detail is git's own report.
    Conflict(String),
}

/// Version-control capability used by the committer.
///
/// `Err` always means the command could not do its job; expected negative
/// outcomes (nothing to commit, merge conflict) are values.
pub trait Vcs {
    fn stage_all(&self) -> Result<()>;
    fn commit(&self, message: &str) -> Result<CommitStatus>;
    fn current_branch(&self) -> Result<String>;
    fn checkout(&self, branch: &str) -> Result<()>;
    fn merge(&self, branch: &str) -> Result<MergeStatus>;
    /// Abort an in-progress merge. No-op when none is in progress.
    fn abort_merge(&self) -> Result<()>;
    fn push(&self, remote: &str, branch: &str) -> Result<()>;
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// True if there is anything staged for commit.
    pub fn has_staged_changes(&self) -> Result<bool> {
        let out = self.run(&["diff", "--cached", "--name-only"])?;
        Ok(!String::from_utf8_lossy(&out.stdout).trim().is_empty())
    }

    /// True while a merge is in progress (`MERGE_HEAD` exists).
    pub fn merge_in_progress(&self) -> Result<bool> {
        let status = self
            .run(&["rev-parse", "--verify", "--quiet", "MERGE_HEAD"])?
            .status;
        Ok(status.success())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                combined_output(&output)
            ));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

impl Vcs for Git {
    /// Stage all changes (respects .gitignore).
    #[instrument(skip_all)]
    fn stage_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// Commit staged changes with a message.
    ///
    /// Empty staging area, or git itself answering "nothing to commit", yields
    /// `NothingToCommit` instead of an error.
    #[instrument(skip_all)]
    fn commit(&self, message: &str) -> Result<CommitStatus> {
        if !self.has_staged_changes()? {
            debug!("no staged changes, skipping commit");
            return Ok(CommitStatus::NothingToCommit);
        }
        debug!("committing staged changes");
        let output = self.run(&["commit", "-m", message])?;
        if output.status.success() {
            return Ok(CommitStatus::Committed);
        }
        let report = combined_output(&output);
        if is_nothing_to_commit(&report) {
            debug!("git reported nothing to commit");
            return Ok(CommitStatus::NothingToCommit);
        }
        Err(anyhow!("git commit failed: {report}"))
    }

    /// Return the current branch name (errors on detached HEAD).
    #[instrument(skip_all)]
    fn current_branch(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim().to_string();
        if name == "HEAD" {
            warn!("detached HEAD detected");
            return Err(anyhow!("detached HEAD (refuse to integrate)"));
        }
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// Checkout an existing branch.
    #[instrument(skip_all, fields(branch = %branch))]
    fn checkout(&self, branch: &str) -> Result<()> {
        debug!("checking out branch");
        self.run_checked(&["checkout", branch])?;
        Ok(())
    }

    #[instrument(skip_all, fields(branch = %branch))]
    fn merge(&self, branch: &str) -> Result<MergeStatus> {
        debug!("merging branch");
        let output = self.run(&["merge", "--no-edit", branch])?;
        if output.status.success() {
            return Ok(MergeStatus::Merged);
        }
        let report = combined_output(&output);
        warn!("merge failed");
        Ok(MergeStatus::Conflict(report))
    }

    #[instrument(skip_all)]
    fn abort_merge(&self) -> Result<()> {
        if !self.merge_in_progress()? {
            debug!("no merge in progress");
            return Ok(());
        }
        self.run_checked(&["merge", "--abort"])?;
        Ok(())
    }

    #[instrument(skip_all, fields(remote = %remote, branch = %branch))]
    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        debug!("pushing branch");
        self.run_checked(&["push", remote, branch])?;
        Ok(())
    }
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_nothing_to_commit(report: &str) -> bool {
    report.contains("nothing to commit") || report.contains("nothing added to commit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRepo;
    use std::fs;

    #[test]
    fn recognizes_nothing_to_commit_reports() {
        assert!(is_nothing_to_commit(
            "On branch main\nnothing to commit, working tree clean"
        ));
        assert!(is_nothing_to_commit(
            "nothing added to commit but untracked files present"
        ));
        assert!(!is_nothing_to_commit("fatal: unable to auto-detect email"));
    }

    #[test]
    fn commit_with_empty_index_is_nothing_to_commit() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        git.stage_all().expect("stage");
        assert_eq!(
            git.commit("empty").expect("commit"),
            CommitStatus::NothingToCommit
        );
    }

    #[test]
    fn stage_and_commit_new_file() {
        let repo = TestRepo::new().expect("repo");
        fs::write(repo.path().join("new.txt"), "hello\n").expect("write");
        let git = Git::new(repo.path());
        git.stage_all().expect("stage");
        assert_eq!(git.commit("add new").expect("commit"), CommitStatus::Committed);
        assert_eq!(repo.last_commit_subject().expect("log"), "add new");
    }

    #[test]
    fn current_branch_and_checkout() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        assert_eq!(git.current_branch().expect("branch"), "main");
        repo.create_branch("work").expect("branch");
        git.checkout("work").expect("checkout");
        assert_eq!(git.current_branch().expect("branch"), "work");
    }

    #[test]
    fn checkout_missing_branch_errors() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        let err = git.checkout("does-not-exist").unwrap_err();
        assert!(err.to_string().contains("git checkout does-not-exist failed"));
    }

    #[test]
    fn abort_merge_without_merge_is_noop() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        git.abort_merge().expect("abort");
    }

    #[test]
    fn push_without_remote_errors() {
        let repo = TestRepo::new().expect("repo");
        let git = Git::new(repo.path());
        assert!(git.push("origin", "main").is_err());
    }
}
