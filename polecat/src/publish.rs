//! Issue publisher: files discovered work with the tracker.
//!
//! Each creation is independent. A failure is logged, recorded as a warning
//! and skipped; it never stops the remaining creations or the run.

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::core::outcome::Warning;
use crate::core::result::DiscoveredIssue;
use crate::error::DispatchError;
use crate::io::config::TrackerConfig;
use crate::io::tracker::{IssueRequest, IssueTracker};

/// What the publisher managed to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Publication {
    /// Identifiers read back from the tracker, in entry order.
    pub created: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// Apply defaults and the provenance label to one discovered entry.
pub fn build_request(issue: &DiscoveredIssue, config: &TrackerConfig) -> IssueRequest {
    IssueRequest {
        title: non_blank(issue.title.as_deref()).unwrap_or_else(|| config.default_title.clone()),
        description: non_blank(issue.description.as_deref()),
        issue_type: non_blank(issue.issue_type.as_deref())
            .unwrap_or_else(|| config.default_type.clone()),
        priority: issue
            .priority
            .as_ref()
            .map(ToString::to_string)
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| config.default_priority.to_string()),
        label: config.label.clone(),
    }
}

/// Create one tracker issue per discovered entry.
///
/// Only an interrupt between two creations aborts; tracker failures are absorbed.
pub fn publish<T: IssueTracker>(
    tracker: &T,
    issues: &[DiscoveredIssue],
    config: &TrackerConfig,
    cancel: &CancelToken,
) -> Result<Publication, DispatchError> {
    let mut publication = Publication::default();

    for issue in issues {
        cancel.check()?;
        let request = build_request(issue, config);
        info!(title = %request.title, "creating discovered issue");

        match tracker.create(&request) {
            Ok(Some(id)) => {
                debug!(id = %id, "issue created");
                publication.created.push(id);
            }
            Ok(None) => debug!(title = %request.title, "issue created without a readable id"),
            Err(err) => {
                let warning = Warning::IssueCreationFailed {
                    title: request.title.clone(),
                    reason: format!("{err:#}"),
                };
                warn!("{warning}");
                publication.warnings.push(warning);
            }
        }
    }

    Ok(publication)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
