//! Configuration file loading.
//!
//! The config is a JSON document, by default at
//! `<config dir>/prtree/config.json`. Credentials may be left out of the file
//! and supplied through the environment instead.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::data::FilterMode;
use crate::engine::SiblingOrder;
use crate::error::{Error, Result};

pub const ENV_BITBUCKET_USERNAME: &str = "BITBUCKET_USERNAME";
pub const ENV_BITBUCKET_APP_PASSWORD: &str = "BITBUCKET_APP_PASSWORD";
pub const ENV_JIRA_USERNAME: &str = "JIRA_USERNAME";
pub const ENV_JIRA_API_KEY: &str = "JIRA_API_KEY";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_MAX_CONCURRENT_CONFLICT_CHECKS: usize = 4;
const DEFAULT_MATCH_ISSUE_ASSIGNEES: bool = true;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub bitbucket: BitbucketConfig,
    pub jira: JiraConfig,
    pub projects: BTreeMap<String, ProjectConfig>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_concurrent_conflict_checks")]
    pub max_concurrent_conflict_checks: usize,
    #[serde(default)]
    pub sibling_order: SiblingOrder,
    #[serde(default = "default_match_issue_assignees")]
    pub match_issue_assignees: bool,
    #[serde(default)]
    pub filter_mode: FilterMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BitbucketConfig {
    pub workspace: String,
    #[serde(default)]
    pub username: String,
    /// App password.
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JiraConfig {
    /// `<site>` in `https://<site>.atlassian.net`.
    pub site_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Repository slugs in the Bitbucket workspace.
    pub repositories: Vec<String>,
    /// Jira project keys searched for orphaned issues.
    #[serde(default)]
    pub jira_projects: Vec<String>,
    pub issue_key_pattern: String,
    /// Agile board whose active and future sprints feed the sprint filter.
    #[serde(default)]
    pub board_id: Option<u64>,
}

impl ProjectConfig {
    pub fn issue_pattern(&self, project: &str) -> Result<Regex> {
        Regex::new(&self.issue_key_pattern).map_err(|source| Error::InvalidIssuePattern {
            project: project.to_string(),
            source,
        })
    }
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_max_concurrent_conflict_checks() -> usize {
    DEFAULT_MAX_CONCURRENT_CONFLICT_CHECKS
}

fn default_match_issue_assignees() -> bool {
    DEFAULT_MATCH_ISSUE_ASSIGNEES
}

pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("prtree").join("config.json"))
        .ok_or_else(|| Error::config("could not determine the config directory"))
}

impl Config {
    /// Load from `path` (or the default location), apply environment
    /// overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };
        if !path.exists() {
            return Err(Error::ConfigNotFound { path });
        }
        debug!(path = %path.display(), "loading config");

        let raw = std::fs::read_to_string(&path)?;
        let mut config: Config = serde_json::from_str(&raw)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replace credentials with non-empty values from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *target = value;
            }
        };
        set(&mut self.bitbucket.username, ENV_BITBUCKET_USERNAME);
        set(&mut self.bitbucket.password, ENV_BITBUCKET_APP_PASSWORD);
        set(&mut self.jira.username, ENV_JIRA_USERNAME);
        set(&mut self.jira.api_key, ENV_JIRA_API_KEY);
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(Error::config("poll_interval_secs must be positive"));
        }
        if self.max_concurrent_conflict_checks == 0 {
            return Err(Error::config(
                "max_concurrent_conflict_checks must be positive",
            ));
        }
        if self.projects.is_empty() {
            return Err(Error::config("no projects configured"));
        }
        for (name, project) in &self.projects {
            if project.repositories.is_empty() {
                return Err(Error::config(format!(
                    "project '{}' has no repositories",
                    name
                )));
            }
            project.issue_pattern(name)?;
        }
        Ok(())
    }

    /// Project names, sorted.
    pub fn list_projects(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }

    pub fn project(&self, name: &str) -> Result<&ProjectConfig> {
        self.projects.get(name).ok_or_else(|| Error::UnknownProject {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    pub(crate) const SAMPLE: &str = r#"{
        "bitbucket": {"workspace": "acme", "username": "bb-user", "password": "secret"},
        "jira": {"site_name": "acme"},
        "projects": {
            "web": {
                "repositories": ["web-app", "web-api"],
                "jira_projects": ["WEB"],
                "issue_key_pattern": "WEB-\\d+",
                "board_id": 12
            },
            "billing": {
                "repositories": ["billing"],
                "issue_key_pattern": "(BIL|PAY)-\\d+"
            }
        }
    }"#;

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_with_defaults() {
        let (_dir, path) = write_config(SAMPLE);
        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.bitbucket.workspace, "acme");
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.max_concurrent_conflict_checks, 4);
        assert_eq!(config.sibling_order, SiblingOrder::UpdatedDesc);
        assert_eq!(config.filter_mode, FilterMode::Combined);
        assert!(config.match_issue_assignees);
        assert_eq!(config.project("web").unwrap().board_id, Some(12));
        assert!(config.project("billing").unwrap().jira_projects.is_empty());
    }

    #[test]
    fn projects_listed_sorted() {
        let config: Config = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(config.list_projects(), vec!["billing", "web"]);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn unknown_project_is_an_error() {
        let config: Config = serde_json::from_str(SAMPLE).unwrap();
        let err = config.project("mobile").unwrap_err();
        assert!(matches!(err, Error::UnknownProject { name } if name == "mobile"));
    }

    #[test]
    fn invalid_pattern_fails_validation() {
        let mut config: Config = serde_json::from_str(SAMPLE).unwrap();
        config
            .projects
            .get_mut("web")
            .unwrap()
            .issue_key_pattern = "WEB-(".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidIssuePattern { project, .. } if project == "web"));
    }

    #[test]
    fn project_without_repositories_fails_validation() {
        let mut config: Config = serde_json::from_str(SAMPLE).unwrap();
        config.projects.get_mut("billing").unwrap().repositories.clear();
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn environment_overrides_credentials() {
        let mut config: Config = serde_json::from_str(SAMPLE).unwrap();
        let env = HashMap::from([
            (ENV_BITBUCKET_USERNAME, "ci-bot".to_string()),
            (ENV_JIRA_API_KEY, "token".to_string()),
            (ENV_JIRA_USERNAME, String::new()),
        ]);
        config.apply_overrides(|key| env.get(key).cloned());

        assert_eq!(config.bitbucket.username, "ci-bot");
        assert_eq!(config.bitbucket.password, "secret");
        assert_eq!(config.jira.api_key, "token");
        assert_eq!(config.jira.username, "");
    }

    #[test]
    fn options_parse_from_names() {
        let raw = SAMPLE.replacen(
            "\"projects\"",
            "\"sibling_order\": \"title\", \"filter_mode\": \"exclusive\", \"poll_interval_secs\": 120, \"projects\"",
            1,
        );
        let config: Config = serde_json::from_str(&raw).unwrap();
        assert_eq!(config.sibling_order, SiblingOrder::Title);
        assert_eq!(config.filter_mode, FilterMode::Exclusive);
        assert_eq!(config.poll_interval_secs, 120);
    }
}
