//! Forest materialization.
//!
//! The forest is rebuilt from scratch on every data refresh. Nodes own copies of
//! their pull request and resolved issues so a forest outlives the response it
//! was built from.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use super::branch_graph::{
    build_destination_index, find_root_branches, group_by_repository, BranchPath,
    DestinationIndex,
};
use super::correlation::{
    derive_alerts, derive_status_class, Alert, IssueCorrelation, ReviewSummary, StatusClass,
};
use super::descendants::count_descendants_within;
use crate::data::{AggregatedData, Issue, PrId, PullRequest};

/// How pull requests sharing a parent are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SiblingOrder {
    /// Most recently updated first.
    #[default]
    #[serde(rename = "updated")]
    UpdatedDesc,
    #[serde(rename = "title")]
    Title,
}

impl SiblingOrder {
    fn sort(self, siblings: &mut [&PullRequest]) {
        match self {
            SiblingOrder::UpdatedDesc => siblings.sort_by(|a, b| b.updated_on.cmp(&a.updated_on)),
            SiblingOrder::Title => siblings.sort_by(|a, b| a.title.cmp(&b.title)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub pull_request: PullRequest,
    pub issue_keys: Vec<String>,
    pub issues: Vec<Issue>,
    pub review: ReviewSummary,
    pub status_class: Option<StatusClass>,
    pub alerts: Vec<Alert>,
    pub descendant_count: usize,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn id(&self) -> PrId {
        self.pull_request.id
    }

    /// This node and everything beneath it, pre-order.
    pub fn iter(&self) -> Nodes<'_> {
        Nodes { stack: vec![self] }
    }
}

/// A branch nothing else merges from, with the pull requests targeting it.
#[derive(Debug, Clone)]
pub struct RootBranch {
    pub name: String,
    pub nodes: Vec<TreeNode>,
}

impl RootBranch {
    pub fn iter(&self) -> Nodes<'_> {
        Nodes::over(&self.nodes)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RepositoryGroup {
    pub name: String,
    pub branches: Vec<RootBranch>,
}

impl RepositoryGroup {
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.branches.iter().flat_map(RootBranch::iter)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.iter().all(RootBranch::is_empty)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Forest {
    pub repositories: Vec<RepositoryGroup>,
    /// Pull requests no root leads to; only possible when branches form a cycle.
    pub unreachable: Vec<PrId>,
}

impl Forest {
    pub fn from_data(data: &AggregatedData, order: SiblingOrder) -> Self {
        let correlation = IssueCorrelation::new(&data.issue_map, &data.issue_details);
        build_forest(&data.pull_requests, &correlation, order)
    }

    /// Every node, repository by repository, pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.repositories.iter().flat_map(RepositoryGroup::iter)
    }

    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.iter().all(RepositoryGroup::is_empty)
    }

    pub fn find(&self, id: PrId) -> Option<&TreeNode> {
        self.nodes().find(|node| node.id() == id)
    }
}

/// Pre-order iterator over a set of subtrees.
pub struct Nodes<'f> {
    stack: Vec<&'f TreeNode>,
}

impl<'f> Nodes<'f> {
    fn over(roots: &'f [TreeNode]) -> Self {
        Nodes {
            stack: roots.iter().rev().collect(),
        }
    }
}

impl<'f> Iterator for Nodes<'f> {
    type Item = &'f TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Build the per-repository forest.
///
/// Level-1 nodes are the pull requests targeting a root branch; a node's
/// children are the pull requests targeting its source branch. A pull request
/// whose source branch is already on the current path keeps its place but is
/// not expanded further.
pub fn build_forest(
    pull_requests: &[PullRequest],
    correlation: &IssueCorrelation<'_>,
    order: SiblingOrder,
) -> Forest {
    let mut reached = HashSet::new();
    let mut repositories = Vec::new();

    for group in group_by_repository(pull_requests) {
        let index = build_destination_index(group.pull_requests.iter().copied());
        let roots = find_root_branches(group.pull_requests.iter().copied());

        let branches = roots
            .iter()
            .map(|root| {
                let mut builder = Builder {
                    index: &index,
                    correlation,
                    order,
                    reached: &mut reached,
                };
                let mut path = BranchPath::starting_at(root.as_str());
                RootBranch {
                    name: root.clone(),
                    nodes: builder.children_of(root.as_str(), &mut path),
                }
            })
            .collect();

        repositories.push(RepositoryGroup {
            name: group.name.to_string(),
            branches,
        });
    }

    let unreachable: Vec<PrId> = pull_requests
        .iter()
        .map(|pr| pr.id)
        .filter(|id| !reached.contains(id))
        .collect();
    if !unreachable.is_empty() {
        warn!(
            count = unreachable.len(),
            ids = ?unreachable,
            "pull requests not reachable from any root branch"
        );
    }

    Forest {
        repositories,
        unreachable,
    }
}

struct Builder<'a, 'b> {
    index: &'b DestinationIndex<'a>,
    correlation: &'b IssueCorrelation<'b>,
    order: SiblingOrder,
    reached: &'b mut HashSet<PrId>,
}

impl<'a, 'b> Builder<'a, 'b> {
    fn children_of(&mut self, branch: &str, path: &mut BranchPath<'a>) -> Vec<TreeNode> {
        let mut siblings = self.index.targeting(branch).to_vec();
        self.order.sort(&mut siblings);
        siblings
            .into_iter()
            .map(|pr| self.node(pr, path))
            .collect()
    }

    fn node(&mut self, pr: &'a PullRequest, path: &mut BranchPath<'a>) -> TreeNode {
        self.reached.insert(pr.id);
        let descendant_count = count_descendants_within(pr, self.index, path);

        let source = pr.source_branch();
        let children = if path.enter(source) {
            let children = self.children_of(source, path);
            path.leave(source);
            children
        } else {
            warn!(
                pr = pr.id,
                repository = %pr.repository,
                branch = source,
                "branch cycle detected, not expanding"
            );
            Vec::new()
        };

        let issue_keys = self.correlation.keys_for(pr.id).to_vec();
        let issues: Vec<Issue> = self
            .correlation
            .issues_for(pr.id)
            .into_iter()
            .cloned()
            .collect();
        let review = ReviewSummary::of(pr);

        TreeNode {
            status_class: derive_status_class(&issues, &review),
            alerts: derive_alerts(&review, &issues),
            pull_request: pr.clone(),
            issue_keys,
            issues,
            review,
            descendant_count,
            children,
        }
    }
}
