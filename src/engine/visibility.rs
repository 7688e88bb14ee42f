//! Filter evaluation over a built forest.
//!
//! [`apply_filters`] is a pure function of the forest, the selection and the
//! side-channel state in [`FilterContext`]. It returns a [`ForestView`] with the
//! same shape as the forest: repository `i`, branch `j`, node path `k...` in the
//! view describes the same position in the forest.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use super::correlation::StatusClass;
use super::tree::{Forest, RootBranch, TreeNode};
use crate::data::{ConflictCheck, FilterSelection, PrId, SyncFilter};

/// State the predicates need besides the tree itself.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// Sprint id to the issue keys it contains.
    pub sprint_issues: &'a BTreeMap<u64, Vec<String>>,
    pub conflicts: &'a HashMap<PrId, ConflictCheck>,
    /// Let an author selection also match the assignee of a correlated issue.
    pub match_issue_assignees: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Matches the selection itself.
    Visible,
    /// Shown only because something beneath it matches.
    Filtered,
    Hidden,
}

impl Visibility {
    pub fn is_shown(self) -> bool {
        self != Visibility::Hidden
    }
}

/// Matching pull requests out of all pull requests in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counter {
    pub visible: usize,
    pub total: usize,
}

impl Counter {
    pub fn is_filtered(&self) -> bool {
        self.visible != self.total
    }

    pub fn tooltip(&self) -> String {
        let noun = if self.total == 1 {
            "pull request"
        } else {
            "pull requests"
        };
        if self.is_filtered() {
            format!(
                "{} filtered {} out of {} total",
                self.visible, noun, self.total
            )
        } else {
            format!("{} {}", self.total, noun)
        }
    }

    /// Counts each pull request in the given subtrees once. Pull requests that
    /// share a source branch all list its children, so one pull request can
    /// occur under several parents.
    fn distinct<'v>(roots: impl IntoIterator<Item = &'v NodeView>) -> Counter {
        let mut seen = HashSet::new();
        let mut counter = Counter::default();
        let mut stack: Vec<&NodeView> = roots.into_iter().collect();
        while let Some(node) = stack.pop() {
            stack.extend(&node.children);
            if seen.insert(node.id) {
                counter.total += 1;
                if node.visibility == Visibility::Visible {
                    counter.visible += 1;
                }
            }
        }
        counter
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_filtered() {
            write!(f, "{}/{}", self.visible, self.total)
        } else {
            write!(f, "{}", self.total)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeView {
    pub id: PrId,
    pub visibility: Visibility,
    /// Title should be drawn in the attention colour.
    pub attention: bool,
    /// Over descendants only.
    pub counter: Counter,
    pub children: Vec<NodeView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchView {
    pub name: String,
    pub visible: bool,
    pub counter: Counter,
    pub nodes: Vec<NodeView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryView {
    pub name: String,
    pub visible: bool,
    pub counter: Counter,
    pub branches: Vec<BranchView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ForestView {
    pub repositories: Vec<RepositoryView>,
    /// Every conflict check has come back; the sync control may be enabled.
    pub sync_filter_ready: bool,
    pub counter: Counter,
}

/// True once no node's conflict check is outstanding.
pub fn sync_filter_ready(forest: &Forest, conflicts: &HashMap<PrId, ConflictCheck>) -> bool {
    forest.nodes().all(|node| {
        conflicts
            .get(&node.id())
            .is_some_and(|check| *check != ConflictCheck::Pending)
    })
}

pub fn apply_filters(
    forest: &Forest,
    selection: &FilterSelection,
    context: &FilterContext<'_>,
) -> ForestView {
    let sync_ready = sync_filter_ready(forest, context.conflicts);
    let evaluator = Evaluator {
        selection,
        context,
        sync_active: sync_ready,
    };

    let repositories: Vec<RepositoryView> = forest
        .repositories
        .iter()
        .map(|repo| {
            let branches: Vec<BranchView> = repo
                .branches
                .iter()
                .map(|branch| evaluator.branch(branch))
                .collect();
            let counter = Counter::distinct(branches.iter().flat_map(|b| &b.nodes));
            RepositoryView {
                name: repo.name.clone(),
                visible: branches.iter().any(|b| b.visible),
                counter,
                branches,
            }
        })
        .collect();

    let counter = Counter::distinct(
        repositories
            .iter()
            .flat_map(|r| r.branches.iter().flat_map(|b| &b.nodes)),
    );

    ForestView {
        repositories,
        sync_filter_ready: sync_ready,
        counter,
    }
}

struct Evaluator<'s> {
    selection: &'s FilterSelection,
    context: &'s FilterContext<'s>,
    sync_active: bool,
}

impl Evaluator<'_> {
    fn branch(&self, branch: &RootBranch) -> BranchView {
        let nodes: Vec<NodeView> = branch.nodes.iter().map(|n| self.node(n)).collect();
        let counter = Counter::distinct(&nodes);
        BranchView {
            name: branch.name.clone(),
            visible: nodes.iter().any(|n| n.visibility.is_shown()),
            counter,
            nodes,
        }
    }

    fn node(&self, node: &TreeNode) -> NodeView {
        let children: Vec<NodeView> = node.children.iter().map(|c| self.node(c)).collect();
        let counter = Counter::distinct(&children);
        let visible_children = children.iter().filter(|c| c.visibility.is_shown()).count();

        let author_match = self.author_matches(node);
        let matched = author_match
            && self.reviewer_matches(node)
            && self.sprint_matches(node)
            && self.fix_version_matches(node)
            && self.sync_matches(node)
            && self.ready_matches(node);

        let visibility = if matched {
            Visibility::Visible
        } else if visible_children > 0 {
            Visibility::Filtered
        } else {
            Visibility::Hidden
        };

        NodeView {
            id: node.id(),
            visibility,
            attention: matched && self.needs_attention(node, author_match),
            counter,
            children,
        }
    }

    fn author_matches(&self, node: &TreeNode) -> bool {
        let Some(author) = self.selection.author.value() else {
            return true;
        };
        node.pull_request.author.display_name == author
            || (self.context.match_issue_assignees
                && node.issues.iter().any(|issue| {
                    issue
                        .assignee
                        .as_ref()
                        .is_some_and(|a| a.display_name == author)
                }))
    }

    fn reviewer_matches(&self, node: &TreeNode) -> bool {
        let Some(reviewer) = self.selection.reviewer.value() else {
            return true;
        };
        node.pull_request
            .other_participants()
            .any(|p| p.user.display_name == reviewer)
    }

    fn sprint_matches(&self, node: &TreeNode) -> bool {
        let Some(sprint) = self.selection.sprint.value() else {
            return true;
        };
        let Some(keys) = sprint
            .parse::<u64>()
            .ok()
            .and_then(|id| self.context.sprint_issues.get(&id))
        else {
            return false;
        };
        node.issue_keys.iter().any(|key| keys.contains(key))
    }

    fn fix_version_matches(&self, node: &TreeNode) -> bool {
        let Some(version) = self.selection.fix_version.value() else {
            return true;
        };
        node.issues.iter().any(|issue| issue.has_fix_version(version))
    }

    fn sync_matches(&self, node: &TreeNode) -> bool {
        if !self.sync_active {
            return true;
        }
        let check = self.context.conflicts.get(&node.id()).copied();
        match self.selection.sync {
            SyncFilter::ShowAll => true,
            SyncFilter::Requested => check == Some(ConflictCheck::Conflicts),
            SyncFilter::Ok => check == Some(ConflictCheck::Clean),
        }
    }

    fn ready_matches(&self, node: &TreeNode) -> bool {
        if !self.selection.ready_for_reviewer {
            return true;
        }
        self.awaits_selected_reviewer(node)
    }

    /// In review and the selected reviewer has not approved yet.
    fn awaits_selected_reviewer(&self, node: &TreeNode) -> bool {
        let Some(reviewer) = self.selection.reviewer.value() else {
            return false;
        };
        node.status_class.is_some_and(StatusClass::is_in_review)
            && node.pull_request.reviewer_approved(reviewer) == Some(false)
    }

    fn needs_attention(&self, node: &TreeNode, author_match: bool) -> bool {
        let author_turn = !self.selection.author.is_show_all()
            && author_match
            && node.status_class == Some(StatusClass::InProgress);
        // With both author and reviewer selected, either side's turn counts.
        author_turn || self.awaits_selected_reviewer(node)
    }
}
