//! Branch relationships between pull requests.
//!
//! Pull requests chain: a feature branch merges into an integration branch, which
//! in turn merges into a release branch. A pull request's children are the pull
//! requests whose destination is its source branch. Branches that are only ever
//! merged into (never merged from) are the roots of the forest.

use std::collections::{HashMap, HashSet};

use crate::data::PullRequest;

/// Pull requests grouped by the branch they merge into.
///
/// Each list keeps input order. Branches without incoming pull requests have no
/// entry.
#[derive(Debug, Clone, Default)]
pub struct DestinationIndex<'a> {
    by_branch: HashMap<&'a str, Vec<&'a PullRequest>>,
}

impl<'a> DestinationIndex<'a> {
    /// Pull requests whose destination is `branch`.
    pub fn targeting(&self, branch: &str) -> &[&'a PullRequest] {
        self.by_branch
            .get(branch)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, branch: &str) -> bool {
        self.by_branch.contains_key(branch)
    }

    pub fn branches(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.by_branch.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_branch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_branch.is_empty()
    }
}

pub fn build_destination_index<'a, I>(pull_requests: I) -> DestinationIndex<'a>
where
    I: IntoIterator<Item = &'a PullRequest>,
{
    let mut by_branch: HashMap<&'a str, Vec<&'a PullRequest>> = HashMap::new();
    for pr in pull_requests {
        by_branch
            .entry(pr.destination_branch())
            .or_default()
            .push(pr);
    }
    DestinationIndex { by_branch }
}

/// Destinations that never appear as a source, in first-seen order.
pub fn find_root_branches<'a, I>(pull_requests: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a PullRequest>,
{
    let pull_requests: Vec<&PullRequest> = pull_requests.into_iter().collect();
    let sources: HashSet<&str> = pull_requests.iter().map(|pr| pr.source_branch()).collect();

    let mut seen = HashSet::new();
    pull_requests
        .iter()
        .map(|pr| pr.destination_branch())
        .filter(|branch| !sources.contains(branch))
        .filter(|branch| seen.insert(*branch))
        .map(str::to_string)
        .collect()
}

/// Pull requests of one repository, in input order.
#[derive(Debug, Clone)]
pub struct RepositoryPullRequests<'a> {
    pub name: &'a str,
    pub pull_requests: Vec<&'a PullRequest>,
}

/// Group pull requests by repository, repositories in first-seen order.
pub fn group_by_repository(pull_requests: &[PullRequest]) -> Vec<RepositoryPullRequests<'_>> {
    let mut groups: Vec<RepositoryPullRequests<'_>> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for pr in pull_requests {
        let idx = *positions.entry(pr.repository.as_str()).or_insert_with(|| {
            groups.push(RepositoryPullRequests {
                name: pr.repository.as_str(),
                pull_requests: Vec::new(),
            });
            groups.len() - 1
        });
        groups[idx].pull_requests.push(pr);
    }
    groups
}

/// Branch names expanded on the current walk from a root.
///
/// Threaded through every recursive walk of the branch graph: an edge leading
/// back to a branch already on the path is a cycle and is treated as absent.
#[derive(Debug, Clone, Default)]
pub struct BranchPath<'a> {
    branches: HashSet<&'a str>,
}

impl<'a> BranchPath<'a> {
    pub fn starting_at(branch: &'a str) -> Self {
        let mut path = Self::default();
        path.branches.insert(branch);
        path
    }

    /// Push `branch`; returns `false` when it is already on the path.
    pub fn enter(&mut self, branch: &'a str) -> bool {
        self.branches.insert(branch)
    }

    pub fn leave(&mut self, branch: &str) {
        self.branches.remove(branch);
    }

    pub fn contains(&self, branch: &str) -> bool {
        self.branches.contains(branch)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::{BranchRef, Identity};
    use chrono::{TimeZone, Utc};

    pub(crate) fn pr(id: u64, source: &str, destination: &str) -> PullRequest {
        PullRequest {
            id,
            title: format!("PR {}", id),
            author: Identity {
                display_name: "Alice".to_string(),
                uuid: "{alice}".to_string(),
            },
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
            updated_on: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            commits_ahead: None,
            commits_behind: None,
            url: format!("https://example.test/pr/{}", id),
        }
    }

    #[test]
    fn index_groups_by_destination_in_input_order() {
        let prs = vec![
            pr(1, "feature/a", "main"),
            pr(2, "feature/b", "main"),
            pr(3, "feature/c", "feature/a"),
        ];
        let index = build_destination_index(&prs);

        let main: Vec<u64> = index.targeting("main").iter().map(|p| p.id).collect();
        assert_eq!(main, vec![1, 2]);
        assert_eq!(index.targeting("feature/a").len(), 1);
        assert!(!index.contains("feature/c"));
        assert!(index.targeting("feature/c").is_empty());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn roots_are_destinations_never_used_as_source() {
        let prs = vec![
            pr(1, "feature/a", "main"),
            pr(2, "feature/b", "feature/a"),
            pr(3, "hotfix", "release/1.0"),
        ];
        assert_eq!(find_root_branches(&prs), vec!["main", "release/1.0"]);
    }

    #[test]
    fn roots_are_unique() {
        let prs = vec![pr(1, "a", "main"), pr(2, "b", "main")];
        assert_eq!(find_root_branches(&prs), vec!["main"]);
    }

    #[test]
    fn pure_cycle_has_no_root() {
        let prs = vec![pr(1, "a", "b"), pr(2, "b", "a")];
        assert!(find_root_branches(&prs).is_empty());
    }

    #[test]
    fn repositories_keep_first_seen_order() {
        let mut other = pr(2, "x", "main");
        other.repository = "api".to_string();
        let prs = vec![pr(1, "a", "main"), other, pr(3, "b", "main")];

        let groups = group_by_repository(&prs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "web");
        assert_eq!(groups[0].pull_requests.len(), 2);
        assert_eq!(groups[1].name, "api");
    }

    #[test]
    fn branch_path_rejects_reentry() {
        let mut path = BranchPath::starting_at("main");
        assert!(!path.enter("main"));
        assert!(path.enter("feature"));
        path.leave("feature");
        assert!(!path.contains("feature"));
        assert!(path.enter("feature"));
    }
}
