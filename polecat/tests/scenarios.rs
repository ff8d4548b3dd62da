//! End-to-end orchestration scenarios against scripted collaborators.
//!
//! Each test wires an [`Orchestrator`] to in-memory fakes and checks which
//! external calls a run makes and what it reports.

use polecat::cancel::CancelToken;
use polecat::core::mode::Mode;
use polecat::core::outcome::{RunOutcome, Warning};
use polecat::core::task::TaskSpec;
use polecat::io::agent::Target;
use polecat::io::config::PolecatConfig;
use polecat::io::git::MergeStatus;
use polecat::io::tracker::IssueRequest;
use polecat::orchestrate::{Orchestrator, RunOptions};
use polecat::test_support::{
    RecordingMessenger, RecordingTracker, RecordingVcs, ScriptedAgent, TrackerReply, VcsCall,
};

const SCENARIO_A_OUTPUT: &str = r#"{"status":"completed","success":true,"files_modified":["README.md"],"discovered_issues":[],"summary":"fixed typo"}"#;

struct Fixture {
    agent: ScriptedAgent,
    tracker: RecordingTracker,
    vcs: RecordingVcs,
    messenger: RecordingMessenger,
    config: PolecatConfig,
}

impl Fixture {
    fn new(agent_output: &str) -> Self {
        Self {
            agent: ScriptedAgent::json(agent_output),
            tracker: RecordingTracker::new(Vec::new()),
            vcs: RecordingVcs::on_branch("polecat/work"),
            messenger: RecordingMessenger::new(),
            config: PolecatConfig::default(),
        }
    }

    fn run(&self, task: &str, options: &RunOptions) -> RunOutcome {
        let orchestrator = Orchestrator {
            agent: &self.agent,
            tracker: &self.tracker,
            vcs: &self.vcs,
            messenger: &self.messenger,
            config: &self.config,
            cancel: CancelToken::new(),
        };
        orchestrator
            .run(&TaskSpec::Text(task.to_string()), options)
            .expect("run")
    }
}

fn reply_to(recipient: &str) -> RunOptions {
    RunOptions {
        recipient: Some(recipient.to_string()),
        ..RunOptions::default()
    }
}

/// Scenario A: trivial edit runs lite, integrates, and replies "completed".
#[test]
fn trivial_edit_completes_and_integrates() {
    let fixture = Fixture::new(SCENARIO_A_OUTPUT);
    let outcome = fixture.run("Fix typo in README", &reply_to("msg-1"));

    assert_eq!(outcome.mode, Mode::Lite);
    let requests = fixture.agent.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].args(),
        vec!["--lite", "--task", "Fix typo in README"]
    );

    assert!(fixture.tracker.requests().is_empty());
    assert_eq!(outcome.merged, Some(true));
    assert!(
        fixture
            .vcs
            .calls()
            .contains(&VcsCall::Merge("polecat/work".to_string()))
    );
    assert_eq!(fixture.vcs.branch(), "polecat/work");
    assert_eq!(
        fixture.messenger.sent(),
        vec![("msg-1".to_string(), "Task completed: fixed typo".to_string())]
    );
    assert!(outcome.notified);
    assert!(outcome.succeeded());
}

/// Scenario B: blocked full-mode run skips integration and replies "failed".
#[test]
fn blocked_run_skips_commit_and_reports_failure() {
    let fixture = Fixture::new(r#"{"status":"blocked","success":false,"error":"missing credentials"}"#);
    let outcome = fixture.run("Implement OAuth2 login", &reply_to("msg-2"));

    assert_eq!(outcome.mode, Mode::Full);
    assert!(!fixture.agent.requests()[0].args().contains(&"--lite".to_string()));
    assert!(fixture.vcs.calls().is_empty());
    assert_eq!(outcome.merged, None);
    assert_eq!(
        fixture.messenger.sent(),
        vec![(
            "msg-2".to_string(),
            "Task failed: No summary available".to_string()
        )]
    );
    assert_eq!(outcome.result.error.as_deref(), Some("missing credentials"));
    assert!(!outcome.succeeded());
}

/// Scenario C: a title-only discovery is filed with defaults; tracker failure
/// does not stop the commit step.
#[test]
fn discovered_issue_failure_still_commits() {
    let mut fixture = Fixture::new(
        r#"{"status":"completed","success":true,"files_modified":["src/lib.rs"],
            "discovered_issues":[{"title":"Flaky integration test"}],"summary":"done"}"#,
    );
    fixture.tracker = RecordingTracker::new(vec![TrackerReply::Fail(
        "bd: command not found".to_string(),
    )]);
    let outcome = fixture.run("Fix typo in CONTRIBUTING", &RunOptions::default());

    assert_eq!(
        fixture.tracker.requests(),
        vec![IssueRequest {
            title: "Flaky integration test".to_string(),
            description: None,
            issue_type: "task".to_string(),
            priority: "2".to_string(),
            label: "discovered:related".to_string(),
        }]
    );
    assert!(outcome.created_issues.is_empty());
    assert!(matches!(
        outcome.warnings.as_slice(),
        [Warning::IssueCreationFailed { title, .. }] if title == "Flaky integration test"
    ));
    assert!(fixture.vcs.calls().contains(&VcsCall::StageAll));
    assert_eq!(outcome.merged, Some(true));
    assert!(outcome.succeeded());
}

#[test]
fn created_issue_ids_are_collected() {
    let mut fixture = Fixture::new(
        r#"{"status":"partial","success":false,
            "discovered_issues":[{"title":"a","priority":1},{"title":"b","type":"bug"}]}"#,
    );
    fixture.tracker = RecordingTracker::new(vec![
        TrackerReply::Created(Some("vc-a1".to_string())),
        TrackerReply::Created(Some("vc-b2".to_string())),
    ]);
    let outcome = fixture.run("Investigate slow startup in the indexer service", &RunOptions::default());

    assert_eq!(outcome.created_issues, vec!["vc-a1", "vc-b2"]);
    let requests = fixture.tracker.requests();
    assert_eq!(requests[0].priority, "1");
    assert_eq!(requests[1].issue_type, "bug");
    assert!(fixture.vcs.calls().is_empty());
}

/// Dry run: agent still runs; tracker, git and messenger are untouched.
#[test]
fn dry_run_has_no_side_effects() {
    let mut fixture = Fixture::new(
        r#"{"status":"completed","success":true,"files_modified":["README.md"],
            "discovered_issues":[{"title":"x"}],"summary":"fixed typo"}"#,
    );
    fixture.tracker = RecordingTracker::new(Vec::new());
    let options = RunOptions {
        dry_run: true,
        ..reply_to("msg-1")
    };
    let outcome = fixture.run("Fix typo in README", &options);

    assert_eq!(fixture.agent.requests().len(), 1);
    assert!(fixture.tracker.requests().is_empty());
    assert!(fixture.vcs.calls().is_empty());
    assert!(fixture.messenger.sent().is_empty());
    assert!(outcome.dry_run);
    assert_eq!(outcome.merged, None);
    assert!(outcome.succeeded());
}

#[test]
fn merge_conflict_is_a_warning_not_a_failure() {
    let mut fixture = Fixture::new(SCENARIO_A_OUTPUT);
    fixture.vcs = RecordingVcs::on_branch("polecat/work")
        .with_merge(Ok(MergeStatus::Conflict("CONFLICT (content)".to_string())));
    let outcome = fixture.run("Fix typo in README", &reply_to("msg-1"));

    assert_eq!(outcome.merged, Some(false));
    assert!(matches!(
        outcome.warnings.as_slice(),
        [Warning::MergeConflict { .. }]
    ));
    assert_eq!(fixture.vcs.branch(), "polecat/work");
    assert!(outcome.succeeded());
    assert_eq!(fixture.messenger.sent().len(), 1);
}

#[test]
fn stream_task_is_piped_to_agent() {
    let fixture = Fixture::new(r#"{"status":"completed","success":true}"#);
    let orchestrator = Orchestrator {
        agent: &fixture.agent,
        tracker: &fixture.tracker,
        vcs: &fixture.vcs,
        messenger: &fixture.messenger,
        config: &fixture.config,
        cancel: CancelToken::new(),
    };
    orchestrator
        .run(
            &TaskSpec::Stream("fix whitespace in docs".to_string()),
            &RunOptions::default(),
        )
        .expect("run");

    let request = &fixture.agent.requests()[0];
    assert_eq!(request.mode, Mode::Lite);
    assert_eq!(request.target, Target::Stdin("fix whitespace in docs".to_string()));
    assert_eq!(request.args(), vec!["--lite", "--stdin"]);
}

#[test]
fn messenger_failure_does_not_change_outcome() {
    let mut fixture = Fixture::new(SCENARIO_A_OUTPUT);
    fixture.messenger = RecordingMessenger::failing();
    let outcome = fixture.run("Fix typo in README", &reply_to("msg-1"));
    assert!(!outcome.notified);
    assert!(outcome.succeeded());
    assert!(outcome.warnings.is_empty());
}
