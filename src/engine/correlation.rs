//! Joining pull requests to issues.
//!
//! Issue keys are pulled out of pull request titles with a per-project regular
//! expression, then resolved against the fetched issue records. Keys without a
//! fetched record are dropped without error.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::data::{Issue, PrId, PullRequest, STATUS_IN_PROGRESS, STATUS_IN_REVIEW};

/// Every match of `pattern` in `title`, in match order, duplicates kept.
pub fn extract_issue_keys(title: &str, pattern: &Regex) -> Vec<String> {
    pattern
        .find_iter(title)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn build_issue_map(pull_requests: &[PullRequest], pattern: &Regex) -> BTreeMap<PrId, Vec<String>> {
    pull_requests
        .iter()
        .map(|pr| (pr.id, extract_issue_keys(&pr.title, pattern)))
        .collect()
}

/// Distinct keys referenced by any pull request, sorted.
pub fn all_issue_keys(issue_map: &BTreeMap<PrId, Vec<String>>) -> Vec<String> {
    issue_map
        .values()
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fetched issues keyed by issue key.
#[derive(Debug, Clone, Default)]
pub struct IssueIndex<'a> {
    by_key: HashMap<&'a str, &'a Issue>,
}

impl<'a> IssueIndex<'a> {
    pub fn new(issues: &'a [Issue]) -> Self {
        Self {
            by_key: issues.iter().map(|i| (i.key.as_str(), i)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&'a Issue> {
        self.by_key.get(key).copied()
    }
}

pub fn resolve_issue_details<'a>(keys: &[String], issues: &IssueIndex<'a>) -> Vec<&'a Issue> {
    keys.iter().filter_map(|key| issues.get(key)).collect()
}

/// The issue map and fetched issue records of one aggregated response.
#[derive(Debug, Clone)]
pub struct IssueCorrelation<'a> {
    issue_map: &'a BTreeMap<PrId, Vec<String>>,
    issues: IssueIndex<'a>,
}

impl<'a> IssueCorrelation<'a> {
    pub fn new(issue_map: &'a BTreeMap<PrId, Vec<String>>, issue_details: &'a [Issue]) -> Self {
        Self {
            issue_map,
            issues: IssueIndex::new(issue_details),
        }
    }

    pub fn keys_for(&self, id: PrId) -> &'a [String] {
        self.issue_map
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn issues_for(&self, id: PrId) -> Vec<&'a Issue> {
        resolve_issue_details(self.keys_for(id), &self.issues)
    }
}

/// Review progress of the non-author participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewSummary {
    pub has_other_participants: bool,
    pub all_other_approved: bool,
}

impl ReviewSummary {
    pub fn of(pr: &PullRequest) -> Self {
        let mut has_other_participants = false;
        let mut all_other_approved = true;
        for participant in pr.other_participants() {
            has_other_participants = true;
            if !participant.approved {
                all_other_approved = false;
            }
        }
        Self {
            has_other_participants,
            all_other_approved: has_other_participants && all_other_approved,
        }
    }
}

/// Workflow position of a pull request, derived from its issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    InProgress,
    InReview,
    InReviewAllApproved,
    Resolved,
}

impl StatusClass {
    pub fn is_in_review(self) -> bool {
        matches!(self, StatusClass::InReview | StatusClass::InReviewAllApproved)
    }

    pub fn to_str(self) -> &'static str {
        match self {
            StatusClass::InProgress => "in-progress",
            StatusClass::InReview => "in-review",
            StatusClass::InReviewAllApproved => "in-review-all-approved",
            StatusClass::Resolved => "resolved",
        }
    }
}

/// Precedence: in progress, then in review, then resolved. A pull request with
/// no known issues counts as resolved.
pub fn derive_status_class(issues: &[Issue], review: &ReviewSummary) -> Option<StatusClass> {
    if issues.iter().any(|i| i.status == STATUS_IN_PROGRESS) {
        Some(StatusClass::InProgress)
    } else if issues.iter().any(|i| i.status == STATUS_IN_REVIEW) {
        if review.all_other_approved {
            Some(StatusClass::InReviewAllApproved)
        } else {
            Some(StatusClass::InReview)
        }
    } else if issues.iter().all(Issue::is_resolved) {
        Some(StatusClass::Resolved)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    NoOtherParticipants,
    InconsistentStatuses,
    ResolvedIssueStillOpen { key: String },
}

impl Alert {
    pub fn message(&self) -> String {
        match self {
            Alert::NoOtherParticipants => "Pull request has no other participants".to_string(),
            Alert::InconsistentStatuses => "Issues have different statuses".to_string(),
            Alert::ResolvedIssueStillOpen { key } => format!("Issue {} is resolved", key),
        }
    }
}

pub fn derive_alerts(review: &ReviewSummary, issues: &[Issue]) -> Vec<Alert> {
    let mut alerts = Vec::new();

    let statuses: BTreeSet<&str> = issues.iter().map(|i| i.status.as_str()).collect();
    if statuses.len() > 1 {
        alerts.push(Alert::InconsistentStatuses);
    }
    if !review.has_other_participants {
        alerts.push(Alert::NoOtherParticipants);
    }
    alerts.extend(
        issues
            .iter()
            .filter(|i| i.is_resolved())
            .map(|i| Alert::ResolvedIssueStillOpen { key: i.key.clone() }),
    );
    alerts
}
