pub mod aggregate;
pub mod bitbucket;
pub mod cache;
pub mod http;
pub mod jira;
pub mod worker;

pub use aggregate::{assemble, find_orphaned_issues, Aggregator, Fetched};
pub use bitbucket::BitbucketClient;
pub use cache::{CacheStats, ResponseCache, SprintData, TtlCache};
pub use jira::JiraClient;
pub use worker::{ConflictRequest, FetchRequest, FetchResult, Worker};
