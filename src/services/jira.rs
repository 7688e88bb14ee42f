use tracing::debug;

use super::http::{create_client, get_json};
use crate::config::JiraConfig;
use crate::data::{
    Issue, JiraAgilePage, JiraSearchResponse, JiraSprint, JiraSprintIssues, Sprint,
    STATUS_IN_REVIEW,
};
use crate::error::Result;

const SERVICE: &str = "Jira";
const ISSUE_FIELDS: &str = "summary,status,assignee,priority,fixVersions";

/// Keys per `issueKey in (...)` query.
pub const ISSUE_BATCH_SIZE: usize = 50;
const PAGE_SIZE: u64 = 50;
const MAX_PAGES: u64 = 40;

/// JQL selecting exactly the given issue keys.
pub fn issue_keys_jql(keys: &[String]) -> String {
    format!("issueKey in ({})", keys.join(","))
}

/// JQL selecting in-review issues of the given projects.
pub fn in_review_jql(projects: &[String]) -> String {
    format!(
        "project in ({}) AND status = \"{}\"",
        projects.join(","),
        STATUS_IN_REVIEW
    )
}

#[derive(Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> Result<Self> {
        Ok(Self {
            http: create_client(&config.username, &config.api_key)?,
            base_url: format!("https://{}.atlassian.net", config.site_name),
        })
    }

    fn search_url(&self, jql: &str, start_at: u64) -> String {
        format!(
            "{}/rest/api/2/search?jql={}&fields={}&maxResults={}&startAt={}",
            self.base_url,
            urlencoding::encode(jql),
            ISSUE_FIELDS,
            PAGE_SIZE,
            start_at
        )
    }

    /// Run a JQL search to the last page.
    async fn search(&self, jql: &str) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        let mut start_at = 0;
        for _ in 0..MAX_PAGES {
            let page: JiraSearchResponse =
                get_json(&self.http, SERVICE, &self.search_url(jql, start_at)).await?;
            let count = page.issues.len() as u64;
            issues.extend(page.issues.into_iter().map(Issue::from));
            start_at = page.start_at + count;
            if count == 0 || start_at >= page.total {
                break;
            }
        }
        Ok(issues)
    }

    /// Details for `keys`, fetched in batches. Keys Jira does not return are
    /// simply absent from the result.
    pub async fn fetch_issues(&self, keys: &[String]) -> Result<Vec<Issue>> {
        let mut issues = Vec::with_capacity(keys.len());
        for batch in keys.chunks(ISSUE_BATCH_SIZE) {
            let found = self.search(&issue_keys_jql(batch)).await?;
            debug!(requested = batch.len(), found = found.len(), "fetched issue batch");
            issues.extend(found);
        }
        Ok(issues)
    }

    /// In-review issues of `projects`.
    pub async fn fetch_in_review(&self, projects: &[String]) -> Result<Vec<Issue>> {
        if projects.is_empty() {
            return Ok(Vec::new());
        }
        self.search(&in_review_jql(projects)).await
    }

    /// Active and future sprints of an agile board.
    pub async fn fetch_sprints(&self, board_id: u64) -> Result<Vec<Sprint>> {
        let mut sprints = Vec::new();
        let mut start_at = 0;
        for _ in 0..MAX_PAGES {
            let url = format!(
                "{}/rest/agile/1.0/board/{}/sprint?state=active,future&startAt={}",
                self.base_url, board_id, start_at
            );
            let page: JiraAgilePage<JiraSprint> = get_json(&self.http, SERVICE, &url).await?;
            start_at = page.start_at + page.values.len() as u64;
            let last = page.is_last || page.values.is_empty();
            sprints.extend(page.values.into_iter().map(Sprint::from));
            if last {
                break;
            }
        }
        debug!(board_id, count = sprints.len(), "fetched sprints");
        Ok(sprints)
    }

    /// Keys of every issue in a sprint.
    pub async fn fetch_sprint_issue_keys(&self, sprint_id: u64) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut start_at = 0;
        for _ in 0..MAX_PAGES {
            let url = format!(
                "{}/rest/agile/1.0/sprint/{}/issue?fields=key&maxResults={}&startAt={}",
                self.base_url, sprint_id, PAGE_SIZE, start_at
            );
            let page: JiraSprintIssues = get_json(&self.http, SERVICE, &url).await?;
            let count = page.issues.len() as u64;
            keys.extend(page.issues.into_iter().map(|i| i.key));
            start_at = page.start_at + count;
            if count == 0 || start_at >= page.total {
                break;
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jql_builders() {
        let keys = vec!["WEB-1".to_string(), "WEB-2".to_string()];
        assert_eq!(issue_keys_jql(&keys), "issueKey in (WEB-1,WEB-2)");
        assert_eq!(
            in_review_jql(&["WEB".to_string(), "API".to_string()]),
            "project in (WEB,API) AND status = \"In Review\""
        );
    }

    #[test]
    fn search_url_encodes_jql() {
        let client = JiraClient::new(&JiraConfig {
            site_name: "acme".to_string(),
            username: "u".to_string(),
            api_key: "k".to_string(),
        })
        .unwrap();
        let url = client.search_url("issueKey in (WEB-1)", 50);
        assert!(url.starts_with("https://acme.atlassian.net/rest/api/2/search?jql=issueKey%20in%20%28WEB-1%29"));
        assert!(url.ends_with("&startAt=50"));
    }
}
