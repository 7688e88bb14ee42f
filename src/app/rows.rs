//! Flattening of the filtered forest into the rows of the tree table.

use std::collections::HashSet;

use crate::data::{Issue, PrId};
use crate::engine::{Forest, ForestView, NodeView, TreeNode, Visibility};

/// Identity of a collapsible row. Survives tree rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Repository(String),
    Branch { repository: String, branch: String },
    /// Pull request ids from the root branch down to the node. One pull request
    /// can sit under several parents that share a source branch; each placement
    /// folds on its own.
    PullRequest(Vec<PrId>),
    Orphans,
}

/// What a row points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowTarget {
    Repository(usize),
    Branch(usize, usize),
    /// Child indices from the root branch's node list down to the node.
    Node {
        repository: usize,
        branch: usize,
        path: Vec<usize>,
    },
    OrphanHeader,
    Orphan(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: Option<RowKey>,
    pub depth: usize,
    pub target: RowTarget,
    /// Has children that are currently folded away.
    pub collapsed: bool,
}

impl Row {
    fn new(key: Option<RowKey>, depth: usize, target: RowTarget, collapsed: bool) -> Self {
        Row {
            key,
            depth,
            target,
            collapsed,
        }
    }
}

/// Visible rows in display order. Hidden items are skipped and the children of
/// collapsed rows are left out.
pub fn flatten_rows(
    forest: &Forest,
    view: &ForestView,
    collapsed: &HashSet<RowKey>,
    orphans: &[Issue],
) -> Vec<Row> {
    let mut rows = Vec::new();

    for (r, (repo, repo_view)) in forest.repositories.iter().zip(&view.repositories).enumerate() {
        if !repo_view.visible {
            continue;
        }
        let key = RowKey::Repository(repo.name.clone());
        let folded = collapsed.contains(&key);
        rows.push(Row::new(Some(key), 0, RowTarget::Repository(r), folded));
        if folded {
            continue;
        }

        for (b, (branch, branch_view)) in repo.branches.iter().zip(&repo_view.branches).enumerate() {
            if !branch_view.visible {
                continue;
            }
            let key = RowKey::Branch {
                repository: repo.name.clone(),
                branch: branch.name.clone(),
            };
            let folded = collapsed.contains(&key);
            rows.push(Row::new(Some(key), 1, RowTarget::Branch(r, b), folded));
            if folded {
                continue;
            }
            let mut trail = Trail::default();
            push_nodes(&mut rows, &branch.nodes, &branch_view.nodes, collapsed, (r, b), &mut trail);
        }
    }

    if !orphans.is_empty() {
        let folded = collapsed.contains(&RowKey::Orphans);
        rows.push(Row::new(Some(RowKey::Orphans), 0, RowTarget::OrphanHeader, folded));
        if !folded {
            rows.extend((0..orphans.len()).map(|i| Row::new(None, 1, RowTarget::Orphan(i), false)));
        }
    }

    rows
}

/// Position of the node being visited: child indices and pull request ids.
#[derive(Default)]
struct Trail {
    path: Vec<usize>,
    ids: Vec<PrId>,
}

fn push_nodes(
    rows: &mut Vec<Row>,
    nodes: &[TreeNode],
    views: &[NodeView],
    collapsed: &HashSet<RowKey>,
    (repository, branch): (usize, usize),
    trail: &mut Trail,
) {
    for (i, (node, node_view)) in nodes.iter().zip(views).enumerate() {
        if node_view.visibility == Visibility::Hidden {
            continue;
        }
        trail.path.push(i);
        trail.ids.push(node.id());
        let key = RowKey::PullRequest(trail.ids.clone());
        let folded = !node.children.is_empty() && collapsed.contains(&key);
        rows.push(Row::new(
            Some(key),
            trail.path.len() + 1,
            RowTarget::Node {
                repository,
                branch,
                path: trail.path.clone(),
            },
            folded,
        ));
        if !folded {
            push_nodes(rows, &node.children, &node_view.children, collapsed, (repository, branch), trail);
        }
        trail.path.pop();
        trail.ids.pop();
    }
}

/// The tree node at `path` below a root branch.
pub fn node_at<'f>(forest: &'f Forest, repository: usize, branch: usize, path: &[usize]) -> Option<&'f TreeNode> {
    let (first, rest) = path.split_first()?;
    let mut node = forest
        .repositories
        .get(repository)?
        .branches
        .get(branch)?
        .nodes
        .get(*first)?;
    for &i in rest {
        node = node.children.get(i)?;
    }
    Some(node)
}

/// The filter state at `path`; mirrors [`node_at`].
pub fn node_view_at<'v>(view: &'v ForestView, repository: usize, branch: usize, path: &[usize]) -> Option<&'v NodeView> {
    let (first, rest) = path.split_first()?;
    let mut node = view
        .repositories
        .get(repository)?
        .branches
        .get(branch)?
        .nodes
        .get(*first)?;
    for &i in rest {
        node = node.children.get(i)?;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Choice, FilterSelection};
    use crate::engine::branch_graph::tests::pr;
    use crate::engine::correlation::tests::issue;
    use crate::engine::{apply_filters, build_forest, FilterContext, IssueCorrelation, SiblingOrder};
    use std::collections::{BTreeMap, HashMap};

    fn forest() -> Forest {
        let mut prs = vec![
            pr(1, "feature/a", "main"),
            pr(2, "feature/b", "feature/a"),
            pr(3, "feature/c", "main"),
        ];
        prs[2].author.display_name = "Bob".to_string();
        let map = BTreeMap::new();
        build_forest(&prs, &IssueCorrelation::new(&map, &[]), SiblingOrder::Title)
    }

    fn view(forest: &Forest, selection: &FilterSelection) -> ForestView {
        let sprints = BTreeMap::new();
        let conflicts = HashMap::new();
        apply_filters(
            forest,
            selection,
            &FilterContext {
                sprint_issues: &sprints,
                conflicts: &conflicts,
                match_issue_assignees: true,
            },
        )
    }

    fn targets(rows: &[Row]) -> Vec<(usize, Option<RowKey>)> {
        rows.iter().map(|r| (r.depth, r.key.clone())).collect()
    }

    #[test]
    fn rows_follow_tree_order() {
        let forest = forest();
        let view = view(&forest, &FilterSelection::default());
        let rows = flatten_rows(&forest, &view, &HashSet::new(), &[]);
        assert_eq!(
            targets(&rows),
            vec![
                (0, Some(RowKey::Repository("web".to_string()))),
                (
                    1,
                    Some(RowKey::Branch {
                        repository: "web".to_string(),
                        branch: "main".to_string()
                    })
                ),
                (2, Some(RowKey::PullRequest(vec![1]))),
                (3, Some(RowKey::PullRequest(vec![1, 2]))),
                (2, Some(RowKey::PullRequest(vec![3]))),
            ]
        );
        let RowTarget::Node {
            repository,
            branch,
            path,
        } = &rows[3].target
        else {
            panic!("expected a node row");
        };
        assert_eq!(node_at(&forest, *repository, *branch, path).map(TreeNode::id), Some(2));
        assert_eq!(node_view_at(&view, *repository, *branch, path).map(|v| v.id), Some(2));
    }

    #[test]
    fn collapsed_node_hides_children() {
        let forest = forest();
        let view = view(&forest, &FilterSelection::default());
        let collapsed = HashSet::from([RowKey::PullRequest(vec![1])]);
        let rows = flatten_rows(&forest, &view, &collapsed, &[]);
        assert_eq!(rows.len(), 4);
        assert!(rows[2].collapsed);
        assert_eq!(rows[3].key, Some(RowKey::PullRequest(vec![3])));
    }

    #[test]
    fn hidden_nodes_are_skipped() {
        let forest = forest();
        let selection = FilterSelection::default().with_author(Choice::only("Bob"));
        let rows = flatten_rows(&forest, &view(&forest, &selection), &HashSet::new(), &[]);
        let keys: Vec<_> = rows.iter().filter_map(|r| r.key.clone()).collect();
        assert!(keys.contains(&RowKey::PullRequest(vec![3])));
        assert!(!keys.contains(&RowKey::PullRequest(vec![1])));
        assert!(!keys.contains(&RowKey::PullRequest(vec![1, 2])));
    }

    #[test]
    fn shared_child_folds_per_parent() {
        // 1 and 2 both come from feature/a, so 3 sits under each of them
        let prs = vec![
            pr(1, "feature/a", "main"),
            pr(2, "feature/a", "develop"),
            pr(3, "feature/b", "feature/a"),
        ];
        let map = BTreeMap::new();
        let forest = build_forest(&prs, &IssueCorrelation::new(&map, &[]), SiblingOrder::Title);
        let view = view(&forest, &FilterSelection::default());

        let rows = flatten_rows(&forest, &view, &HashSet::new(), &[]);
        let keys: Vec<_> = rows.iter().filter_map(|r| r.key.clone()).collect();
        assert!(keys.contains(&RowKey::PullRequest(vec![1, 3])));
        assert!(keys.contains(&RowKey::PullRequest(vec![2, 3])));

        let collapsed = HashSet::from([RowKey::PullRequest(vec![1])]);
        let rows = flatten_rows(&forest, &view, &collapsed, &[]);
        let keys: Vec<_> = rows.iter().filter_map(|r| r.key.clone()).collect();
        assert!(!keys.contains(&RowKey::PullRequest(vec![1, 3])));
        assert!(keys.contains(&RowKey::PullRequest(vec![2, 3])));
        assert_eq!(view.counter.total, 3);
    }

    #[test]
    fn orphans_are_listed_last() {
        let forest = forest();
        let view = view(&forest, &FilterSelection::default());
        let orphans = vec![issue("WEB-9", "In Review")];
        let rows = flatten_rows(&forest, &view, &HashSet::new(), &orphans);
        assert_eq!(rows[rows.len() - 2].target, RowTarget::OrphanHeader);
        assert_eq!(rows[rows.len() - 1].target, RowTarget::Orphan(0));

        let collapsed = HashSet::from([RowKey::Orphans]);
        let rows = flatten_rows(&forest, &view, &collapsed, &orphans);
        assert_eq!(rows.last().map(|r| &r.target), Some(&RowTarget::OrphanHeader));
    }
}
