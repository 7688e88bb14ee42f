use super::branch_graph::{BranchPath, DestinationIndex};
use crate::data::PullRequest;

/// Number of pull requests transitively stacked on top of `pr`.
///
/// Direct children plus each child's own count; 0 for a leaf. Edges that would
/// revisit a branch are ignored.
pub fn count_descendants<'a>(pr: &'a PullRequest, index: &DestinationIndex<'a>) -> usize {
    let mut path = BranchPath::starting_at(pr.destination_branch());
    count_descendants_within(pr, index, &mut path)
}

/// Like [`count_descendants`], continuing an existing walk.
///
/// `path` is left exactly as it was passed in.
pub fn count_descendants_within<'a>(
    pr: &'a PullRequest,
    index: &DestinationIndex<'a>,
    path: &mut BranchPath<'a>,
) -> usize {
    let source = pr.source_branch();
    if !path.enter(source) {
        return 0;
    }
    let count = index
        .targeting(source)
        .iter()
        .map(|child| 1 + count_descendants_within(child, index, path))
        .sum();
    path.leave(source);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::branch_graph::build_destination_index;
    use crate::engine::branch_graph::tests::pr;

    #[test]
    fn leaf_has_no_descendants() {
        let prs = vec![pr(1, "feature/a", "main")];
        let index = build_destination_index(&prs);
        assert_eq!(count_descendants(&prs[0], &index), 0);
    }

    #[test]
    fn counts_whole_chain() {
        let prs = vec![
            pr(1, "feature/a", "main"),
            pr(2, "feature/b", "feature/a"),
            pr(3, "feature/c", "feature/b"),
            pr(4, "feature/d", "feature/a"),
        ];
        let index = build_destination_index(&prs);
        assert_eq!(count_descendants(&prs[0], &index), 3);
        assert_eq!(count_descendants(&prs[1], &index), 1);
        assert_eq!(count_descendants(&prs[3], &index), 0);
    }

    #[test]
    fn equals_sum_over_children() {
        let prs = vec![
            pr(1, "a", "main"),
            pr(2, "b", "a"),
            pr(3, "c", "a"),
            pr(4, "d", "c"),
        ];
        let index = build_destination_index(&prs);
        let expected: usize = index
            .targeting("a")
            .iter()
            .map(|child| 1 + count_descendants(child, &index))
            .sum();
        assert_eq!(count_descendants(&prs[0], &index), expected);
    }

    #[test]
    fn cycle_terminates() {
        let prs = vec![pr(1, "b", "main"), pr(2, "a", "b"), pr(3, "b", "a")];
        let index = build_destination_index(&prs);
        // main <- b <- a <- b: the second visit to b is cut.
        assert_eq!(count_descendants(&prs[0], &index), 2);
    }

    #[test]
    fn self_loop_terminates() {
        let prs = vec![pr(1, "a", "a")];
        let index = build_destination_index(&prs);
        assert_eq!(count_descendants(&prs[0], &index), 0);
    }

    #[test]
    fn path_is_restored() {
        let prs = vec![pr(1, "a", "main"), pr(2, "b", "a")];
        let index = build_destination_index(&prs);
        let mut path = BranchPath::starting_at("main");
        assert_eq!(count_descendants_within(&prs[0], &index, &mut path), 1);
        assert!(!path.contains("a"));
        assert!(path.contains("main"));
    }
}
