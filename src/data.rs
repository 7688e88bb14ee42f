pub mod filter;
pub mod models;
pub mod types;

pub use filter::{Choice, FilterMode, FilterSelection, SyncFilter, SHOW_ALL};
pub use models::{
    AggregatedData, BranchRef, ConflictCheck, ConflictStatus, FixVersion, Identity, Issue,
    Participant, PrId, PullRequest, ReviewState, Sprint, STATUS_CLOSED, STATUS_IN_PROGRESS,
    STATUS_IN_REVIEW, STATUS_RESOLVED,
};
pub use types::{
    BitbucketPage, BitbucketPullRequest, DiffstatEntry, JiraAgilePage, JiraIssue,
    JiraSearchResponse, JiraSprint, JiraSprintIssues,
};

pub use crate::icons::SPINNER_FRAMES;
