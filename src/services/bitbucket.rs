use tracing::debug;

use super::http::{create_client, get_json};
use crate::config::BitbucketConfig;
use crate::data::{BitbucketPage, BitbucketPullRequest, ConflictStatus, DiffstatEntry, PullRequest};
use crate::error::Result;

const BITBUCKET_API_BASE: &str = "https://api.bitbucket.org/2.0";
const SERVICE: &str = "Bitbucket";

/// Safety cap on followed `next` links per listing.
const MAX_PAGES: usize = 50;

#[derive(Clone)]
pub struct BitbucketClient {
    http: reqwest::Client,
    workspace: String,
}

impl BitbucketClient {
    pub fn new(config: &BitbucketConfig) -> Result<Self> {
        Ok(Self {
            http: create_client(&config.username, &config.password)?,
            workspace: config.workspace.clone(),
        })
    }

    fn repository_url(&self, repository: &str) -> String {
        format!(
            "{}/repositories/{}/{}",
            BITBUCKET_API_BASE,
            urlencoding::encode(&self.workspace),
            urlencoding::encode(repository)
        )
    }

    /// All open pull requests of `repository`, following pagination.
    pub async fn fetch_pull_requests(&self, repository: &str) -> Result<Vec<PullRequest>> {
        let mut url = Some(format!(
            "{}/pullrequests?state=OPEN&pagelen=50&fields=%2Bvalues.participants,-values.description,-values.summary",
            self.repository_url(repository)
        ));
        let mut prs = Vec::new();
        let mut pages = 0;

        while let Some(current) = url.take() {
            let page: BitbucketPage<BitbucketPullRequest> =
                get_json(&self.http, SERVICE, &current).await?;
            pages += 1;
            debug!(
                repository,
                page = pages,
                count = page.values.len(),
                "fetched pull request page"
            );
            prs.extend(
                page.values
                    .into_iter()
                    .map(|raw| raw.into_pull_request(repository)),
            );
            if pages >= MAX_PAGES {
                break;
            }
            url = page.next;
        }

        Ok(prs)
    }

    /// Whether merging `spec` (`destination..source`) would conflict.
    pub async fn fetch_conflict_status(
        &self,
        repository: &str,
        spec: &str,
    ) -> Result<ConflictStatus> {
        let mut url = Some(format!(
            "{}/diffstat/{}?pagelen=500",
            self.repository_url(repository),
            urlencoding::encode(spec)
        ));
        let mut pages = 0;

        while let Some(current) = url.take() {
            let page: BitbucketPage<DiffstatEntry> =
                get_json(&self.http, SERVICE, &current).await?;
            if page.values.iter().any(DiffstatEntry::is_conflict) {
                return Ok(ConflictStatus {
                    has_conflicts: true,
                });
            }
            pages += 1;
            if pages >= MAX_PAGES {
                break;
            }
            url = page.next;
        }

        Ok(ConflictStatus {
            has_conflicts: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_url_escapes_segments() {
        let client = BitbucketClient::new(&BitbucketConfig {
            workspace: "acme corp".to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
        })
        .unwrap();
        assert_eq!(
            client.repository_url("web-app"),
            "https://api.bitbucket.org/2.0/repositories/acme%20corp/web-app"
        );
    }
}
