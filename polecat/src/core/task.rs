//! Task specification: what the agent is asked to work on.

use crate::error::DispatchError;

/// Longest slice of task text used in a commit subject.
pub const COMMIT_SUBJECT_CHARS: usize = 50;

/// Exactly one targeting form per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSpec {
    /// Literal task description.
    Text(String),
    /// Reference to an existing tracked issue.
    Issue(String),
    /// Task description read in full from stdin; piped to the agent.
    Stream(String),
}

impl TaskSpec {
    /// Build a spec from the three mutually exclusive CLI inputs.
    ///
    /// `stream` is the already-read stdin content when the stream flag was set.
    pub fn from_inputs(
        text: Option<String>,
        issue: Option<String>,
        stream: Option<String>,
    ) -> Result<Self, DispatchError> {
        let supplied = [text.is_some(), issue.is_some(), stream.is_some()]
            .into_iter()
            .filter(|present| *present)
            .count();
        if supplied > 1 {
            return Err(DispatchError::Usage(
                "task text, --issue and --stdin are mutually exclusive".to_string(),
            ));
        }

        if let Some(issue) = issue {
            let issue = issue.trim().to_string();
            if issue.is_empty() {
                return Err(DispatchError::Usage("--issue requires an id".to_string()));
            }
            return Ok(TaskSpec::Issue(issue));
        }
        if let Some(stream) = stream {
            return Ok(TaskSpec::Stream(stream));
        }
        match text {
            Some(text) if !text.is_empty() => Ok(TaskSpec::Text(text)),
            _ => Err(DispatchError::Usage(
                "either a task, --issue, or --stdin is required".to_string(),
            )),
        }
    }

    /// Text the mode heuristic looks at (`None` for issue references).
    pub fn mode_text(&self) -> Option<&str> {
        match self {
            TaskSpec::Text(text) | TaskSpec::Stream(text) => Some(text),
            TaskSpec::Issue(_) => None,
        }
    }

    /// Human description used for commit messages.
    pub fn describe(&self) -> String {
        match self {
            TaskSpec::Text(text) | TaskSpec::Stream(text) => text.clone(),
            TaskSpec::Issue(id) => format!("issue {id}"),
        }
    }
}

/// `prefix` + first 50 characters of `task_text`, with `...` when cut.
pub fn commit_message(prefix: &str, task_text: &str) -> String {
    let mut message = String::from(prefix);
    let mut chars = task_text.chars();
    message.extend(chars.by_ref().take(COMMIT_SUBJECT_CHARS));
    if chars.next().is_some() {
        message.push_str("...");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_only_builds_text_spec() {
        let spec = TaskSpec::from_inputs(Some("Fix typo".to_string()), None, None).expect("spec");
        assert_eq!(spec, TaskSpec::Text("Fix typo".to_string()));
        assert_eq!(spec.mode_text(), Some("Fix typo"));
    }

    #[test]
    fn issue_spec_has_no_mode_text() {
        let spec = TaskSpec::from_inputs(None, Some("vc-123".to_string()), None).expect("spec");
        assert_eq!(spec, TaskSpec::Issue("vc-123".to_string()));
        assert_eq!(spec.mode_text(), None);
        assert_eq!(spec.describe(), "issue vc-123");
    }

    #[test]
    fn stream_spec_keeps_content() {
        let spec =
            TaskSpec::from_inputs(None, None, Some("long task\nbody".to_string())).expect("spec");
        assert_eq!(spec.mode_text(), Some("long task\nbody"));
    }

    #[test]
    fn nothing_supplied_is_usage_error() {
        let err = TaskSpec::from_inputs(None, None, None).unwrap_err();
        assert!(matches!(err, DispatchError::Usage(_)));
    }

    #[test]
    fn empty_text_is_usage_error() {
        let err = TaskSpec::from_inputs(Some(String::new()), None, None).unwrap_err();
        assert!(matches!(err, DispatchError::Usage(_)));
    }

    #[test]
    fn whitespace_text_is_passed_through() {
        let task = TaskSpec::from_inputs(Some("   ".to_string()), None, None).expect("task");
        assert_eq!(task, TaskSpec::Text("   ".to_string()));
    }

    #[test]
    fn more_than_one_form_is_usage_error() {
        let err = TaskSpec::from_inputs(
            Some("task".to_string()),
            Some("vc-1".to_string()),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn commit_message_short_text_is_untouched() {
        assert_eq!(
            commit_message("VC: ", "Fix typo in README"),
            "VC: Fix typo in README"
        );
    }

    #[test]
    fn commit_message_exactly_fifty_chars_has_no_ellipsis() {
        let task = "a".repeat(COMMIT_SUBJECT_CHARS);
        assert_eq!(commit_message("VC: ", &task), format!("VC: {task}"));
    }

    #[test]
    fn commit_message_long_text_is_truncated_with_ellipsis() {
        let task = "b".repeat(COMMIT_SUBJECT_CHARS + 10);
        let expected = format!("VC: {}...", "b".repeat(COMMIT_SUBJECT_CHARS));
        assert_eq!(commit_message("VC: ", &task), expected);
    }

    #[test]
    fn commit_message_truncates_on_char_boundaries() {
        let task = "ü".repeat(COMMIT_SUBJECT_CHARS + 1);
        let message = commit_message("", &task);
        assert_eq!(message.chars().count(), COMMIT_SUBJECT_CHARS + 3);
    }
}
