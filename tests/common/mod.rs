#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use prtree::data::{BranchRef, Identity, Issue, Participant, PullRequest, ReviewState};

pub fn identity(name: &str) -> Identity {
    Identity {
        display_name: name.to_string(),
        uuid: format!("{{{}}}", name.to_lowercase()),
    }
}

pub fn pr(id: u64, source: &str, destination: &str) -> PullRequest {
    PullRequest {
        id,
        title: format!("PR {}", id),
        author: identity("Alice"),
        participants: Vec::new(),
        source: BranchRef {
            name: source.to_string(),
            commit: Some(format!("s{}", id)),
        },
        destination: BranchRef {
            name: destination.to_string(),
            commit: Some(format!("d{}", id)),
        },
        repository: "web".to_string(),
        created_on: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        updated_on: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, id as u32 % 60).unwrap(),
        commits_ahead: None,
        commits_behind: None,
        url: format!("https://bitbucket.example/web/pull-requests/{}", id),
    }
}

pub fn participant(name: &str, approved: bool) -> Participant {
    Participant {
        user: identity(name),
        approved,
        state: if approved {
            ReviewState::Approved
        } else {
            ReviewState::Pending
        },
    }
}

pub fn issue(key: &str, status: &str) -> Issue {
    Issue {
        key: key.to_string(),
        summary: format!("Summary of {}", key),
        status: status.to_string(),
        assignee: None,
        priority: None,
        fix_versions: Vec::new(),
    }
}
