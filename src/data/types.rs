use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::models::{
    BranchRef, FixVersion, Identity, Issue, Participant, PullRequest, ReviewState, Sprint,
};

// Bitbucket REST response types

/// One page of a paginated Bitbucket listing.
#[derive(Debug, Deserialize)]
pub struct BitbucketPage<T> {
    pub values: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BitbucketUser {
    pub display_name: String,
    pub uuid: String,
}

impl From<BitbucketUser> for Identity {
    fn from(user: BitbucketUser) -> Self {
        Identity {
            display_name: user.display_name,
            uuid: user.uuid,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BitbucketParticipant {
    pub user: BitbucketUser,
    #[serde(default)]
    pub approved: bool,
    pub state: Option<String>,
}

impl From<BitbucketParticipant> for Participant {
    fn from(p: BitbucketParticipant) -> Self {
        let state = if p.approved {
            ReviewState::Approved
        } else {
            match p.state.as_deref() {
                Some("approved") => ReviewState::Approved,
                Some("changes_requested") => ReviewState::ChangesRequested,
                _ => ReviewState::Pending,
            }
        };
        Participant {
            user: p.user.into(),
            approved: p.approved,
            state,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BitbucketBranch {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct BitbucketCommit {
    pub hash: String,
}

#[derive(Debug, Deserialize)]
pub struct BitbucketEndpoint {
    pub branch: BitbucketBranch,
    pub commit: Option<BitbucketCommit>,
}

impl From<BitbucketEndpoint> for BranchRef {
    fn from(endpoint: BitbucketEndpoint) -> Self {
        BranchRef {
            name: endpoint.branch.name,
            commit: endpoint.commit.map(|c| c.hash),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BitbucketHref {
    pub href: String,
}

#[derive(Debug, Deserialize)]
pub struct BitbucketLinks {
    pub html: BitbucketHref,
}

#[derive(Debug, Deserialize)]
pub struct BitbucketPullRequest {
    pub id: u64,
    pub title: String,
    pub author: BitbucketUser,
    #[serde(default)]
    pub participants: Vec<BitbucketParticipant>,
    pub source: BitbucketEndpoint,
    pub destination: BitbucketEndpoint,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub links: BitbucketLinks,
}

impl BitbucketPullRequest {
    /// Convert to the domain model, filed under the repository slug it was
    /// listed from.
    pub fn into_pull_request(self, repository: &str) -> PullRequest {
        PullRequest {
            id: self.id,
            title: self.title,
            author: self.author.into(),
            participants: self.participants.into_iter().map(Into::into).collect(),
            source: self.source.into(),
            destination: self.destination.into(),
            repository: repository.to_string(),
            created_on: self.created_on,
            updated_on: self.updated_on,
            commits_ahead: None,
            commits_behind: None,
            url: self.links.html.href,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiffstatEntry {
    pub status: String,
}

impl DiffstatEntry {
    pub fn is_conflict(&self) -> bool {
        self.status.contains("conflict")
    }
}

// Jira REST response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraSearchResponse {
    #[serde(default)]
    pub start_at: u64,
    #[serde(default)]
    pub total: u64,
    pub issues: Vec<JiraIssue>,
}

#[derive(Debug, Deserialize)]
pub struct JiraIssue {
    pub key: String,
    pub fields: JiraFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraFields {
    #[serde(default)]
    pub summary: String,
    pub status: JiraNamed,
    pub assignee: Option<JiraUser>,
    pub priority: Option<JiraNamed>,
    #[serde(default)]
    pub fix_versions: Vec<JiraVersion>,
}

#[derive(Debug, Deserialize)]
pub struct JiraNamed {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    pub display_name: String,
    #[serde(default)]
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
pub struct JiraVersion {
    pub id: String,
    pub name: String,
}

impl From<JiraIssue> for Issue {
    fn from(issue: JiraIssue) -> Self {
        let fields = issue.fields;
        Issue {
            key: issue.key,
            summary: fields.summary,
            status: fields.status.name,
            assignee: fields.assignee.map(|u| Identity {
                display_name: u.display_name,
                uuid: u.account_id,
            }),
            priority: fields.priority.map(|p| p.name),
            fix_versions: fields
                .fix_versions
                .into_iter()
                .map(|v| FixVersion {
                    id: v.id,
                    name: v.name,
                })
                .collect(),
        }
    }
}

/// One page of a Jira agile listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraAgilePage<T> {
    pub values: Vec<T>,
    #[serde(default = "default_last")]
    pub is_last: bool,
    #[serde(default)]
    pub start_at: u64,
}

fn default_last() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct JiraSprint {
    pub id: u64,
    pub name: String,
    pub state: String,
}

impl From<JiraSprint> for Sprint {
    fn from(s: JiraSprint) -> Self {
        Sprint {
            id: s.id,
            name: s.name,
            state: s.state,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraSprintIssues {
    #[serde(default)]
    pub start_at: u64,
    #[serde(default)]
    pub total: u64,
    pub issues: Vec<JiraIssueKey>,
}

#[derive(Debug, Deserialize)]
pub struct JiraIssueKey {
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitbucket_pull_request_maps_to_domain() {
        let json = serde_json::json!({
            "id": 7,
            "title": "PROJ-1 add widget",
            "author": {"display_name": "Alice", "uuid": "{a}"},
            "participants": [
                {"user": {"display_name": "Alice", "uuid": "{a}"}, "approved": false, "state": null},
                {"user": {"display_name": "Bob", "uuid": "{b}"}, "approved": false, "state": "changes_requested"}
            ],
            "source": {"branch": {"name": "feature/a"}, "commit": {"hash": "abc"}, "repository": {"name": "web"}},
            "destination": {"branch": {"name": "main"}, "commit": {"hash": "def"}},
            "created_on": "2024-03-01T10:00:00+00:00",
            "updated_on": "2024-03-02T10:00:00+00:00",
            "links": {"html": {"href": "https://bitbucket.org/ws/web/pull-requests/7"}}
        });
        let raw: BitbucketPullRequest = serde_json::from_value(json).unwrap();
        let pr = raw.into_pull_request("web");

        assert_eq!(pr.repository, "web");
        assert_eq!(pr.source_branch(), "feature/a");
        assert_eq!(pr.destination_branch(), "main");
        assert_eq!(pr.commit_range().as_deref(), Some("def..abc"));
        assert_eq!(pr.participants[1].state, ReviewState::ChangesRequested);
        assert_eq!(pr.other_participants().count(), 1);
    }

    #[test]
    fn jira_issue_maps_fix_versions_and_assignee() {
        let json = serde_json::json!({
            "key": "PROJ-1",
            "fields": {
                "summary": "Widget",
                "status": {"name": "In Review"},
                "assignee": {"displayName": "Carol", "accountId": "c-1"},
                "priority": {"name": "Major"},
                "fixVersions": [{"id": "100", "name": "1.2"}]
            }
        });
        let issue: Issue = serde_json::from_value::<JiraIssue>(json).unwrap().into();
        assert_eq!(issue.status, "In Review");
        assert_eq!(issue.assignee.as_ref().unwrap().display_name, "Carol");
        assert!(issue.has_fix_version("100"));
    }

    #[test]
    fn diffstat_conflict_detection() {
        let entry = DiffstatEntry {
            status: "merge conflict".to_string(),
        };
        assert!(entry.is_conflict());
        let entry = DiffstatEntry {
            status: "modified".to_string(),
        };
        assert!(!entry.is_conflict());
    }
}
