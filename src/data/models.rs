use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pull request identifier as assigned by the hosting service.
pub type PrId = u64;

pub const STATUS_IN_PROGRESS: &str = "In Progress";
pub const STATUS_IN_REVIEW: &str = "In Review";
pub const STATUS_RESOLVED: &str = "Resolved";
pub const STATUS_CLOSED: &str = "Closed";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub display_name: String,
    pub uuid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user: Identity,
    pub approved: bool,
    pub state: ReviewState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    pub name: String,
    pub commit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: PrId,
    pub title: String,
    pub author: Identity,
    pub participants: Vec<Participant>,
    pub source: BranchRef,
    pub destination: BranchRef,
    pub repository: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub commits_ahead: Option<u32>,
    pub commits_behind: Option<u32>,
    pub url: String,
}

impl PullRequest {
    pub fn source_branch(&self) -> &str {
        &self.source.name
    }

    pub fn destination_branch(&self) -> &str {
        &self.destination.name
    }

    /// Participants other than the author, matched by UUID.
    pub fn other_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(move |p| p.user.uuid != self.author.uuid)
    }

    /// Whether a non-author participant with this display name approved.
    ///
    /// `None` when no such participant exists.
    pub fn reviewer_approved(&self, reviewer: &str) -> Option<bool> {
        let mut found = None;
        for participant in self.other_participants() {
            if participant.user.display_name == reviewer {
                if participant.approved {
                    return Some(true);
                }
                found = Some(false);
            }
        }
        found
    }

    /// Commit range used for the conflict check, `destination..source`.
    ///
    /// `None` when either commit hash is missing.
    pub fn commit_range(&self) -> Option<String> {
        match (&self.destination.commit, &self.source.commit) {
            (Some(dest), Some(src)) if !dest.is_empty() && !src.is_empty() => {
                Some(format!("{}..{}", dest, src))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixVersion {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: Option<Identity>,
    pub priority: Option<String>,
    pub fix_versions: Vec<FixVersion>,
}

impl Issue {
    pub fn is_resolved(&self) -> bool {
        self.status == STATUS_RESOLVED || self.status == STATUS_CLOSED
    }

    pub fn has_fix_version(&self, id: &str) -> bool {
        self.fix_versions.iter().any(|v| v.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    pub state: String,
}

/// Answer of the hosting service's conflict check for one commit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictStatus {
    pub has_conflicts: bool,
}

/// Per-node state of the asynchronous conflict check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictCheck {
    Pending,
    Conflicts,
    Clean,
    /// The lookup failed; rendered as an unknown marker.
    Failed,
    /// A commit hash was missing; never sent upstream.
    InvalidSpec,
}

impl From<ConflictStatus> for ConflictCheck {
    fn from(status: ConflictStatus) -> Self {
        if status.has_conflicts {
            ConflictCheck::Conflicts
        } else {
            ConflictCheck::Clean
        }
    }
}

/// Everything the dashboard needs for one project, as produced by a single fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedData {
    pub project: String,
    pub jira_site: String,
    pub pull_requests: Vec<PullRequest>,
    pub issue_map: BTreeMap<PrId, Vec<String>>,
    pub issue_details: Vec<Issue>,
    pub pull_requests_by_destination: BTreeMap<String, Vec<PrId>>,
    pub sprints: Vec<Sprint>,
    pub sprint_issues: BTreeMap<u64, Vec<String>>,
    pub orphaned_issues: Vec<Issue>,
    pub content_hash: String,
    pub last_refresh: DateTime<Utc>,
}

impl AggregatedData {
    /// Sorted unique author display names.
    pub fn authors(&self) -> Vec<String> {
        let mut authors: Vec<String> = self
            .pull_requests
            .iter()
            .map(|pr| pr.author.display_name.clone())
            .collect();
        authors.sort();
        authors.dedup();
        authors
    }

    /// Sorted unique display names of non-author participants.
    pub fn reviewers(&self) -> Vec<String> {
        let mut reviewers: Vec<String> = self
            .pull_requests
            .iter()
            .flat_map(|pr| pr.other_participants().map(|p| p.user.display_name.clone()))
            .collect();
        reviewers.sort();
        reviewers.dedup();
        reviewers
    }

    /// Fix versions referenced by any fetched issue, sorted by name.
    pub fn fix_versions(&self) -> Vec<FixVersion> {
        let mut versions: Vec<FixVersion> = self
            .issue_details
            .iter()
            .flat_map(|issue| issue.fix_versions.iter().cloned())
            .collect();
        versions.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        versions.dedup_by(|a, b| a.id == b.id);
        versions
    }

    pub fn issue_url(&self, key: &str) -> String {
        format!("https://{}.atlassian.net/browse/{}", self.jira_site, key)
    }
}
