//! Pure dashboard logic: everything between fetched data and what is drawn.

pub mod branch_graph;
pub mod change_gate;
pub mod correlation;
pub mod descendants;
pub mod tree;
pub mod visibility;

pub use branch_graph::{build_destination_index, find_root_branches, DestinationIndex};
pub use change_gate::{compute_hash, ChangeGate, GateDecision, HashPayload};
pub use correlation::{
    build_issue_map, derive_alerts, derive_status_class, extract_issue_keys,
    resolve_issue_details, Alert, IssueCorrelation, ReviewSummary, StatusClass,
};
pub use descendants::count_descendants;
pub use tree::{build_forest, Forest, RepositoryGroup, RootBranch, SiblingOrder, TreeNode};
pub use visibility::{
    apply_filters, sync_filter_ready, BranchView, Counter, FilterContext, ForestView, NodeView,
    RepositoryView, Visibility,
};
