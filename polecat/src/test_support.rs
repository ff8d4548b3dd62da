//! Test-only fakes for the capability traits plus a throwaway git repository.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::cancel::CancelToken;
use crate::core::result::AgentResult;
use crate::error::DispatchError;
use crate::io::agent::{Agent, AgentRequest};
use crate::io::git::{CommitStatus, MergeStatus, Vcs};
use crate::io::messenger::Messenger;
use crate::io::tracker::{IssueRequest, IssueTracker};

/// Agent that answers every request with the same raw stdout (or one error).
pub struct ScriptedAgent {
    output: String,
    error: RefCell<Option<DispatchError>>,
    cancel: Option<CancelToken>,
    requests: RefCell<Vec<AgentRequest>>,
}

impl ScriptedAgent {
    /// Reply with `raw`, parsed the same way real agent stdout is.
    pub fn json(raw: &str) -> Self {
        Self {
            output: raw.to_string(),
            error: RefCell::new(None),
            cancel: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Fail the first invocation with `err`.
    pub fn failing(err: DispatchError) -> Self {
        Self {
            error: RefCell::new(Some(err)),
            ..Self::json("{}")
        }
    }

    /// Trip `token` while "running", as an interrupt during the agent call would.
    pub fn cancel_on_invoke(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.borrow().clone()
    }
}

impl Agent for ScriptedAgent {
    fn invoke(&self, request: &AgentRequest) -> Result<AgentResult, DispatchError> {
        self.requests.borrow_mut().push(request.clone());
        if let Some(token) = &self.cancel {
            token.cancel();
        }
        if let Some(err) = self.error.borrow_mut().take() {
            return Err(err);
        }
        AgentResult::parse(&self.output)
    }
}

/// Scripted tracker response for one creation call.
#[derive(Debug, Clone)]
pub enum TrackerReply {
    Created(Option<String>),
    Fail(String),
}

/// Tracker that records requests and replays queued replies.
///
/// Once the queue is exhausted every creation succeeds without an id.
pub struct RecordingTracker {
    replies: RefCell<VecDeque<TrackerReply>>,
    requests: RefCell<Vec<IssueRequest>>,
}

impl RecordingTracker {
    pub fn new(replies: Vec<TrackerReply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<IssueRequest> {
        self.requests.borrow().clone()
    }
}

impl IssueTracker for RecordingTracker {
    fn create(&self, request: &IssueRequest) -> Result<Option<String>> {
        self.requests.borrow_mut().push(request.clone());
        match self.replies.borrow_mut().pop_front() {
            Some(TrackerReply::Created(id)) => Ok(id),
            Some(TrackerReply::Fail(reason)) => Err(anyhow!(reason)),
            None => Ok(None),
        }
    }
}

/// One call observed by [`RecordingVcs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    StageAll,
    Commit(String),
    CurrentBranch,
    Checkout(String),
    Merge(String),
    AbortMerge,
    Push(String, String),
}

/// In-memory version control that tracks the checked-out branch.
pub struct RecordingVcs {
    branch: RefCell<String>,
    commit: Result<CommitStatus, String>,
    merge: Result<MergeStatus, String>,
    push: Result<(), String>,
    missing_branches: Vec<String>,
    cancel_on_checkout: Option<(String, CancelToken)>,
    interrupt_commit: Option<CancelToken>,
    interrupt_merge: Option<CancelToken>,
    calls: RefCell<Vec<VcsCall>>,
}

impl RecordingVcs {
    /// Start on `branch` with every command succeeding.
    pub fn on_branch(branch: &str) -> Self {
        Self {
            branch: RefCell::new(branch.to_string()),
            commit: Ok(CommitStatus::Committed),
            merge: Ok(MergeStatus::Merged),
            push: Ok(()),
            missing_branches: Vec::new(),
            cancel_on_checkout: None,
            interrupt_commit: None,
            interrupt_merge: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_commit(mut self, commit: Result<CommitStatus, String>) -> Self {
        self.commit = commit;
        self
    }

    pub fn with_merge(mut self, merge: Result<MergeStatus, String>) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_push(mut self, push: Result<(), String>) -> Self {
        self.push = push;
        self
    }

    /// Checking out `branch` fails.
    pub fn with_missing_branch(mut self, branch: &str) -> Self {
        self.missing_branches.push(branch.to_string());
        self
    }

    /// Trip `token` right after `branch` is checked out.
    pub fn cancel_on_checkout(mut self, branch: &str, token: CancelToken) -> Self {
        self.cancel_on_checkout = Some((branch.to_string(), token));
        self
    }

    /// `commit` trips `token` and fails, as a `git commit` killed by SIGINT would.
    pub fn interrupt_on_commit(mut self, token: CancelToken) -> Self {
        self.interrupt_commit = Some(token);
        self
    }

    /// `merge` trips `token` and fails, as a `git merge` killed by SIGINT would.
    pub fn interrupt_on_merge(mut self, token: CancelToken) -> Self {
        self.interrupt_merge = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.borrow().clone()
    }

    /// Currently checked-out branch.
    pub fn branch(&self) -> String {
        self.branch.borrow().clone()
    }

    fn record(&self, call: VcsCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Vcs for RecordingVcs {
    fn stage_all(&self) -> Result<()> {
        self.record(VcsCall::StageAll);
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<CommitStatus> {
        self.record(VcsCall::Commit(message.to_string()));
        if let Some(token) = &self.interrupt_commit {
            token.cancel();
            return Err(anyhow!("git commit failed: signal: 2 (SIGINT)"));
        }
        self.commit.clone().map_err(|err| anyhow!(err))
    }

    fn current_branch(&self) -> Result<String> {
        self.record(VcsCall::CurrentBranch);
        Ok(self.branch())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.record(VcsCall::Checkout(branch.to_string()));
        if self.missing_branches.iter().any(|b| b == branch) {
            return Err(anyhow!("pathspec '{branch}' did not match any branch"));
        }
        *self.branch.borrow_mut() = branch.to_string();
        if let Some((trigger, token)) = &self.cancel_on_checkout
            && trigger == branch
        {
            token.cancel();
        }
        Ok(())
    }

    fn merge(&self, branch: &str) -> Result<MergeStatus> {
        self.record(VcsCall::Merge(branch.to_string()));
        if let Some(token) = &self.interrupt_merge {
            token.cancel();
            return Err(anyhow!("git merge failed: signal: 2 (SIGINT)"));
        }
        self.merge.clone().map_err(|err| anyhow!(err))
    }

    fn abort_merge(&self) -> Result<()> {
        self.record(VcsCall::AbortMerge);
        Ok(())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.record(VcsCall::Push(remote.to_string(), branch.to_string()));
        self.push.clone().map_err(|err| anyhow!(err))
    }
}

/// Messenger that records `(recipient, message)` pairs.
pub struct RecordingMessenger {
    fail: bool,
    interrupt: Option<CancelToken>,
    sent: RefCell<Vec<(String, String)>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self {
            fail: false,
            interrupt: None,
            sent: RefCell::new(Vec::new()),
        }
    }

    /// Every send fails, as if the messaging tool were missing.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Every send trips `token` and fails, as a reply killed by SIGINT would.
    pub fn interrupt_on_send(mut self, token: CancelToken) -> Self {
        self.interrupt = Some(token);
        self
    }

    /// Messages accepted so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.borrow().clone()
    }
}

impl Default for RecordingMessenger {
    fn default() -> Self {
        Self::new()
    }
}

impl Messenger for RecordingMessenger {
    fn send(&self, recipient: &str, message: &str) -> Result<()> {
        if let Some(token) = &self.interrupt {
            token.cancel();
            return Err(anyhow!("gm reply terminated by signal 2"));
        }
        if self.fail {
            return Err(anyhow!("messenger not found"));
        }
        self.sent
            .borrow_mut()
            .push((recipient.to_string(), message.to_string()));
        Ok(())
    }
}

/// Git repository in a temp dir, on `main` with one initial commit.
pub struct TestRepo {
    temp: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        let repo = Self { temp };
        repo.git(&["init", "--quiet"])?;
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"])?;
        repo.git(&["config", "user.name", "Polecat Test"])?;
        repo.git(&["config", "user.email", "polecat@example.invalid"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        repo.commit_file("README.md", "# test\n", "initial commit")?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Write `name`, stage everything and commit on the current branch.
    pub fn commit_file(&self, name: &str, contents: &str, message: &str) -> Result<()> {
        self.write_file(name, contents)?;
        self.git(&["add", "-A"])?;
        self.git(&["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    /// Write `name` without staging it.
    pub fn write_file(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.path().join(name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.path().join(name);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Create `name` at HEAD without switching to it.
    pub fn create_branch(&self, name: &str) -> Result<()> {
        self.git(&["branch", name])?;
        Ok(())
    }

    pub fn checkout(&self, name: &str) -> Result<()> {
        self.git(&["checkout", "--quiet", name])?;
        Ok(())
    }

    pub fn current_branch(&self) -> Result<String> {
        Ok(self
            .git(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    pub fn last_commit_subject(&self) -> Result<String> {
        self.subject_of("HEAD")
    }

    /// Subject line of the tip commit of `rev`.
    pub fn subject_of(&self, rev: &str) -> Result<String> {
        Ok(self
            .git(&["log", "-1", "--format=%s", rev])?
            .trim()
            .to_string())
    }

    /// True while `MERGE_HEAD` exists.
    pub fn merge_in_progress(&self) -> bool {
        self.path().join(".git").join("MERGE_HEAD").exists()
    }

    /// Run git in the repository and return stdout.
    pub fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
