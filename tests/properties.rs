mod common;

use std::collections::{BTreeMap, HashMap, HashSet};

use common::{identity, issue, participant, pr};
use prtree::data::{
    Choice, ConflictCheck, FilterMode, FilterSelection, FixVersion, Issue, PrId, PullRequest,
    SyncFilter,
};
use prtree::engine::change_gate::digest_json;
use prtree::engine::{
    apply_filters, build_destination_index, build_forest, build_issue_map, count_descendants,
    find_root_branches, FilterContext, IssueCorrelation, NodeView, SiblingOrder, TreeNode,
    Visibility,
};
use proptest::prelude::*;
use regex::Regex;
use serde_json::{Map, Value};

const PEOPLE: [&str; 3] = ["Alice", "Bob", "Carol"];
const STATUSES: [&str; 4] = ["In Progress", "In Review", "Resolved", "Open"];
const CHECKS: [ConflictCheck; 4] = [
    ConflictCheck::Clean,
    ConflictCheck::Conflicts,
    ConflictCheck::Pending,
    ConflictCheck::Failed,
];

/// Acyclic pull request sets with unique source branches. Each pull request
/// targets either one of a few root branches or the source of an earlier one.
fn acyclic_prs() -> impl Strategy<Value = Vec<PullRequest>> {
    prop::collection::vec((any::<bool>(), 0usize..64), 1..24).prop_map(|choices| {
        let mut prs: Vec<PullRequest> = Vec::new();
        for (i, (to_root, pick)) in choices.into_iter().enumerate() {
            let destination = if to_root || prs.is_empty() {
                format!("release/{}", pick % 3)
            } else {
                prs[pick % prs.len()].source.name.clone()
            };
            prs.push(pr(i as u64 + 1, &format!("feature/{}", i), &destination));
        }
        prs
    })
}

/// Pull requests whose source branches may repeat. Feature branches are ranked
/// by first use and a pull request only targets a root or a lower-ranked
/// branch, so the graph stays acyclic and every pull request is reachable.
fn shared_source_prs() -> impl Strategy<Value = Vec<PullRequest>> {
    prop::collection::vec(
        (any::<bool>(), 0usize..64, any::<bool>(), 0usize..64),
        1..24,
    )
    .prop_map(|choices| {
        let mut branches = 0usize;
        let mut prs = Vec::new();
        for (i, (reuse, pick, to_root, target)) in choices.into_iter().enumerate() {
            let rank = if reuse && branches > 0 {
                pick % branches
            } else {
                branches += 1;
                branches - 1
            };
            let destination = if to_root || rank == 0 {
                format!("release/{}", target % 3)
            } else {
                format!("feature/{}", target % rank)
            };
            prs.push(pr(i as u64 + 1, &format!("feature/{}", rank), &destination));
        }
        prs
    })
}

#[derive(Debug)]
struct Scenario {
    pull_requests: Vec<PullRequest>,
    issues: Vec<Issue>,
    sprint_issues: BTreeMap<u64, Vec<String>>,
    conflicts: HashMap<PrId, ConflictCheck>,
}

prop_compose! {
    /// Pull requests with authors, reviewers, one issue each, sprint
    /// membership and conflict results.
    fn scenarios()(prs in acyclic_prs())(
        decorations in prop::collection::vec(
            (
                0usize..3,
                prop::collection::vec((0usize..3, any::<bool>()), 0..3),
                0usize..4,
                0usize..3,
                0usize..4,
            ),
            prs.len(),
        ),
        prs in Just(prs),
    ) -> Scenario {
        let mut prs = prs;
        let mut issues = Vec::new();
        let mut sprint_issues: BTreeMap<u64, Vec<String>> = BTreeMap::new();
        let mut conflicts = HashMap::new();

        for (p, (author, reviewers, status, fix, check)) in prs.iter_mut().zip(decorations) {
            let key = format!("WEB-{}", p.id);
            p.author = identity(PEOPLE[author]);
            p.participants = reviewers
                .into_iter()
                .map(|(who, approved)| participant(PEOPLE[who], approved))
                .collect();
            p.title = format!("{} change {}", key, p.id);

            let mut detail = issue(&key, STATUSES[status]);
            detail.assignee = Some(identity(PEOPLE[(author + fix) % 3]));
            if fix > 0 {
                detail.fix_versions = vec![FixVersion {
                    id: format!("v{}", fix),
                    name: format!("1.{}", fix),
                }];
            }
            issues.push(detail);

            sprint_issues.entry(p.id % 2 + 1).or_default().push(key);
            conflicts.insert(p.id, CHECKS[check]);
        }

        Scenario {
            pull_requests: prs,
            issues,
            sprint_issues,
            conflicts,
        }
    }
}

prop_compose! {
    fn selections()(
        author in prop::option::of(0usize..3),
        reviewer in prop::option::of(0usize..3),
        sprint in prop::option::of(1u64..3),
        fix_version in prop::option::of(1usize..3),
        sync in prop::sample::select(vec![SyncFilter::ShowAll, SyncFilter::Requested, SyncFilter::Ok]),
        ready in any::<bool>(),
        exclusive in any::<bool>(),
    ) -> FilterSelection {
        let mode = if exclusive { FilterMode::Exclusive } else { FilterMode::Combined };
        let choice = |value: Option<String>| value.map(Choice::only).unwrap_or_default();
        FilterSelection::new(mode)
            .with_author(choice(author.map(|i| PEOPLE[i].to_string())))
            .with_reviewer(choice(reviewer.map(|i| PEOPLE[i].to_string())))
            .with_sprint(choice(sprint.map(|id| id.to_string())))
            .with_fix_version(choice(fix_version.map(|v| format!("v{}", v))))
            .with_sync(sync)
            .with_ready_for_reviewer(ready)
    }
}

fn check_counts(node: &TreeNode) {
    let expected: usize = node.children.iter().map(|c| 1 + c.descendant_count).sum();
    assert_eq!(node.descendant_count, expected);
    node.children.iter().for_each(check_counts);
}

/// Filtered nodes are scaffolding for a shown descendant; hidden nodes have none.
fn check_scaffolding(node: &NodeView) {
    let shown_child = node.children.iter().any(|c| c.visibility.is_shown());
    match node.visibility {
        Visibility::Filtered => assert!(shown_child),
        Visibility::Hidden => assert!(!shown_child),
        Visibility::Visible => {}
    }
    assert!(node.counter.visible <= node.counter.total);
    node.children.iter().for_each(check_scaffolding);
}

proptest! {
    #[test]
    fn roots_are_destinations_never_used_as_sources(prs in acyclic_prs()) {
        let sources: HashSet<&str> = prs.iter().map(|p| p.source.name.as_str()).collect();
        let expected: HashSet<&str> = prs
            .iter()
            .map(|p| p.destination.name.as_str())
            .filter(|d| !sources.contains(d))
            .collect();

        let roots = find_root_branches(&prs);
        let found: HashSet<&str> = roots.iter().map(String::as_str).collect();
        prop_assert_eq!(&found, &expected);
        prop_assert_eq!(roots.len(), found.len());
    }

    #[test]
    fn every_pull_request_is_reached_exactly_once(prs in acyclic_prs()) {
        let map = BTreeMap::new();
        let forest = build_forest(&prs, &IssueCorrelation::new(&map, &[]), SiblingOrder::UpdatedDesc);

        let mut seen: Vec<u64> = forest.nodes().map(TreeNode::id).collect();
        seen.sort_unstable();
        let all: Vec<u64> = (1..=prs.len() as u64).collect();
        prop_assert_eq!(seen, all);
        prop_assert!(forest.unreachable.is_empty());
    }

    #[test]
    fn descendant_count_is_sum_over_children(prs in acyclic_prs()) {
        let map = BTreeMap::new();
        let forest = build_forest(&prs, &IssueCorrelation::new(&map, &[]), SiblingOrder::Title);
        let index = build_destination_index(&prs);

        for node in forest.nodes() {
            check_counts(node);
            prop_assert_eq!(count_descendants(&node.pull_request, &index), node.descendant_count);
        }
    }

    #[test]
    fn shared_sources_give_each_parent_its_children_once(prs in shared_source_prs()) {
        let map = BTreeMap::new();
        let forest = build_forest(&prs, &IssueCorrelation::new(&map, &[]), SiblingOrder::UpdatedDesc);
        let index = build_destination_index(&prs);

        for branch in forest.repositories.iter().flat_map(|r| &r.branches) {
            let ids: Vec<PrId> = branch.nodes.iter().map(TreeNode::id).collect();
            let unique: HashSet<PrId> = ids.iter().copied().collect();
            prop_assert_eq!(unique.len(), ids.len());
        }

        let mut reached = HashSet::new();
        for node in forest.nodes() {
            reached.insert(node.id());
            check_counts(node);
            prop_assert_eq!(count_descendants(&node.pull_request, &index), node.descendant_count);

            let children: Vec<PrId> = node.children.iter().map(TreeNode::id).collect();
            let edges: HashSet<PrId> = children.iter().copied().collect();
            prop_assert_eq!(edges.len(), children.len());
            let expected: HashSet<PrId> = prs
                .iter()
                .filter(|p| p.destination.name == node.pull_request.source.name)
                .map(|p| p.id)
                .collect();
            prop_assert_eq!(edges, expected);
        }
        prop_assert_eq!(reached.len(), prs.len());

        let sprint_issues = BTreeMap::new();
        let conflicts = HashMap::new();
        let view = apply_filters(
            &forest,
            &FilterSelection::default(),
            &FilterContext {
                sprint_issues: &sprint_issues,
                conflicts: &conflicts,
                match_issue_assignees: true,
            },
        );
        prop_assert_eq!(view.counter.total, prs.len());
        prop_assert_eq!(view.counter.visible, prs.len());
    }

    #[test]
    fn filtering_twice_gives_the_same_view(scenario in scenarios(), selection in selections()) {
        let pattern = Regex::new(r"WEB-\d+").unwrap();
        let issue_map = build_issue_map(&scenario.pull_requests, &pattern);
        let forest = build_forest(
            &scenario.pull_requests,
            &IssueCorrelation::new(&issue_map, &scenario.issues),
            SiblingOrder::UpdatedDesc,
        );
        let context = FilterContext {
            sprint_issues: &scenario.sprint_issues,
            conflicts: &scenario.conflicts,
            match_issue_assignees: true,
        };

        let first = apply_filters(&forest, &selection, &context);
        prop_assert_eq!(first.counter.total, scenario.pull_requests.len());
        prop_assert!(first.counter.visible <= first.counter.total);
        prop_assert_eq!(&first, &apply_filters(&forest, &selection, &context));

        for repository in &first.repositories {
            for branch in &repository.branches {
                branch.nodes.iter().for_each(check_scaffolding);
                prop_assert_eq!(
                    branch.visible,
                    branch.nodes.iter().any(|n| n.visibility.is_shown())
                );
            }
        }
    }

    #[test]
    fn digest_ignores_key_insertion_order(
        entries in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 1..16)
    ) {
        let forward: Map<String, Value> = entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(*v)))
            .collect();
        let backward: Map<String, Value> = entries
            .iter()
            .rev()
            .map(|(k, v)| (k.clone(), Value::from(*v)))
            .collect();
        let a = Value::Object(forward);
        let b = Value::Object(backward);
        prop_assert_eq!(digest_json(&a), digest_json(&b));

        let mut changed = entries.clone();
        if let Some(v) = changed.values_mut().next() {
            *v = v.wrapping_add(1);
        }
        let c = Value::Object(
            changed
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect(),
        );
        prop_assert_ne!(digest_json(&a), digest_json(&c));
    }
}
