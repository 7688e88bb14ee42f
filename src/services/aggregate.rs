//! One call that produces everything the dashboard shows for a project.

use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

use super::bitbucket::BitbucketClient;
use super::cache::{project_key, sprints_key, ResponseCache, SprintData};
use super::jira::JiraClient;
use crate::config::Config;
use crate::data::{AggregatedData, Issue, PrId, PullRequest};
use crate::engine::correlation::{all_issue_keys, build_issue_map};
use crate::engine::{compute_hash, HashPayload};
use crate::error::Result;

/// In-review issues that no pull request title references.
pub fn find_orphaned_issues(
    in_review: Vec<Issue>,
    issue_map: &BTreeMap<PrId, Vec<String>>,
) -> Vec<Issue> {
    let referenced: HashSet<&str> = issue_map.values().flatten().map(String::as_str).collect();
    let mut orphans: Vec<Issue> = in_review
        .into_iter()
        .filter(|issue| !referenced.contains(issue.key.as_str()))
        .collect();
    orphans.sort_by(|a, b| a.key.cmp(&b.key));
    orphans
}

/// Pull request ids grouped by destination branch, in input order.
pub fn group_by_destination(pull_requests: &[PullRequest]) -> BTreeMap<String, Vec<PrId>> {
    let mut groups: BTreeMap<String, Vec<PrId>> = BTreeMap::new();
    for pr in pull_requests {
        groups
            .entry(pr.destination_branch().to_string())
            .or_default()
            .push(pr.id);
    }
    groups
}

/// Upstream responses for one project, before joining.
pub struct Fetched {
    pub pull_requests: Vec<PullRequest>,
    pub issue_details: Vec<Issue>,
    pub sprints: SprintData,
    pub in_review: Vec<Issue>,
}

/// Join fetched responses into [`AggregatedData`] and stamp its content hash.
pub fn assemble(
    project: &str,
    jira_site: &str,
    pattern: &Regex,
    fetched: Fetched,
    now: DateTime<Utc>,
) -> Result<AggregatedData> {
    let issue_map = build_issue_map(&fetched.pull_requests, pattern);
    let orphaned_issues = find_orphaned_issues(fetched.in_review, &issue_map);

    let mut data = AggregatedData {
        project: project.to_string(),
        jira_site: jira_site.to_string(),
        pull_requests_by_destination: group_by_destination(&fetched.pull_requests),
        pull_requests: fetched.pull_requests,
        issue_map,
        issue_details: fetched.issue_details,
        sprints: fetched.sprints.sprints,
        sprint_issues: fetched.sprints.sprint_issues,
        orphaned_issues,
        content_hash: String::new(),
        last_refresh: now,
    };
    data.content_hash = compute_hash(&HashPayload::of(&data))?;
    Ok(data)
}

pub struct Aggregator {
    pub bitbucket: BitbucketClient,
    pub jira: JiraClient,
}

impl Aggregator {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            bitbucket: BitbucketClient::new(&config.bitbucket)?,
            jira: JiraClient::new(&config.jira)?,
        })
    }

    /// Aggregated data for `project`, from the cache when fresh.
    pub async fn fetch_aggregated_data(
        &self,
        config: &Config,
        cache: &mut ResponseCache,
        project: &str,
    ) -> Result<AggregatedData> {
        let key = project_key(project);
        if let Some(data) = cache.projects.get(&key) {
            return Ok(data);
        }

        let project_config = config.project(project)?;
        let pattern = project_config.issue_pattern(project)?;

        let pull_requests: Vec<PullRequest> = try_join_all(
            project_config
                .repositories
                .iter()
                .map(|repo| self.bitbucket.fetch_pull_requests(repo)),
        )
        .await?
        .into_iter()
        .flatten()
        .collect();

        let keys = all_issue_keys(&build_issue_map(&pull_requests, &pattern));
        let issue_details = self.jira.fetch_issues(&keys).await?;
        let sprints = self
            .sprint_data(cache, project, project_config.board_id)
            .await?;
        let in_review = self.jira.fetch_in_review(&project_config.jira_projects).await?;

        let data = assemble(
            project,
            &config.jira.site_name,
            &pattern,
            Fetched {
                pull_requests,
                issue_details,
                sprints,
                in_review,
            },
            Utc::now(),
        )?;
        info!(
            project,
            pull_requests = data.pull_requests.len(),
            issues = data.issue_details.len(),
            orphaned = data.orphaned_issues.len(),
            hash = %data.content_hash,
            "aggregated project data"
        );
        cache.projects.insert(key, data.clone());
        Ok(data)
    }

    async fn sprint_data(
        &self,
        cache: &mut ResponseCache,
        project: &str,
        board_id: Option<u64>,
    ) -> Result<SprintData> {
        let Some(board_id) = board_id else {
            return Ok(SprintData::default());
        };
        let key = sprints_key(project);
        if let Some(data) = cache.sprints.get(&key) {
            return Ok(data);
        }

        let sprints = self.jira.fetch_sprints(board_id).await?;
        let memberships = join_all(
            sprints
                .iter()
                .map(|sprint| self.jira.fetch_sprint_issue_keys(sprint.id)),
        )
        .await;

        let mut sprint_issues = BTreeMap::new();
        for (sprint, keys) in sprints.iter().zip(memberships) {
            match keys {
                Ok(keys) => {
                    sprint_issues.insert(sprint.id, keys);
                }
                Err(e) => warn!(sprint = sprint.id, error = %e, "failed to fetch sprint issues"),
            }
        }

        let data = SprintData {
            sprints,
            sprint_issues,
        };
        cache.sprints.insert(key, data.clone());
        Ok(data)
    }
}
