//! Error types for prtree.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for configuration, upstream and engine failures.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration ===
    /// The configuration file could not be found.
    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// The configuration is structurally valid JSON but semantically wrong.
    #[error("Invalid config: {reason}")]
    Config { reason: String },

    /// A project's issue key pattern does not compile.
    #[error("Invalid issue key pattern for project '{project}': {source}")]
    InvalidIssuePattern {
        project: String,
        #[source]
        source: regex::Error,
    },

    /// The requested project is not configured.
    #[error("Unknown project: {name}")]
    UnknownProject { name: String },

    // === Upstream ===
    /// An upstream service answered with a non-success status.
    #[error("{service} request failed with status {status}: {url}")]
    Upstream {
        service: &'static str,
        status: u16,
        url: String,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === Encoding / IO ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
