//! Background fetch worker.
//!
//! Runs on its own thread with a tokio runtime and serves requests from the UI
//! in arrival order. Every result carries the project it was requested for so
//! the UI can drop results that arrive after a project switch.

use futures::stream::{self, StreamExt};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use super::aggregate::Aggregator;
use super::cache::{conflicts_key, project_key, ResponseCache};
use crate::config::Config;
use crate::data::{AggregatedData, ConflictCheck, PrId};
use crate::error::Result;

/// One pull request's conflict lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRequest {
    pub id: PrId,
    pub repository: String,
    /// `destination..source`; `None` when a commit hash is missing.
    pub spec: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Project {
        project: String,
        /// Bypass the cached response.
        force: bool,
    },
    Conflicts {
        project: String,
        checks: Vec<ConflictRequest>,
    },
}

#[derive(Debug)]
pub enum FetchResult {
    Project {
        project: String,
        result: std::result::Result<AggregatedData, String>,
    },
    Conflict {
        project: String,
        id: PrId,
        check: ConflictCheck,
    },
}

pub struct Worker {
    config: Config,
    aggregator: Aggregator,
    cache: ResponseCache,
}

impl Worker {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            aggregator: Aggregator::new(&config)?,
            config,
            cache: ResponseCache::default(),
        })
    }

    /// Serve requests until either channel closes.
    pub fn spawn(
        mut self,
        runtime: Runtime,
        requests: Receiver<FetchRequest>,
        results: Sender<FetchResult>,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            while let Ok(request) = requests.recv() {
                if !runtime.block_on(self.handle(request, &results)) {
                    break;
                }
            }
            debug!("fetch worker stopped");
        })
    }

    /// Returns `false` once the UI has gone away.
    async fn handle(&mut self, request: FetchRequest, results: &Sender<FetchResult>) -> bool {
        match request {
            FetchRequest::Project { project, force } => {
                if force {
                    self.cache.clear(&project_key(&project));
                }
                let result = self
                    .aggregator
                    .fetch_aggregated_data(&self.config, &mut self.cache, &project)
                    .await
                    .map_err(|e| {
                        warn!(project = %project, error = %e, "project fetch failed");
                        e.to_string()
                    });
                debug!(project = %project, stats = ?self.cache.stats(), "cache");
                results.send(FetchResult::Project { project, result }).is_ok()
            }
            FetchRequest::Conflicts { project, checks } => {
                self.check_conflicts(project, checks, results).await
            }
        }
    }

    async fn check_conflicts(
        &mut self,
        project: String,
        checks: Vec<ConflictRequest>,
        results: &Sender<FetchResult>,
    ) -> bool {
        let send = |id: PrId, check: ConflictCheck| {
            results
                .send(FetchResult::Conflict {
                    project: project.clone(),
                    id,
                    check,
                })
                .is_ok()
        };

        let mut lookups = Vec::new();
        for request in checks {
            let Some(spec) = request.spec else {
                if !send(request.id, ConflictCheck::InvalidSpec) {
                    return false;
                }
                continue;
            };
            match self
                .cache
                .conflicts
                .get(&conflicts_key(&request.repository, &spec))
            {
                Some(status) => {
                    if !send(request.id, status.into()) {
                        return false;
                    }
                }
                None => lookups.push((request.id, request.repository, spec)),
            }
        }
        debug!(project = %project, lookups = lookups.len(), "checking conflicts");

        let bitbucket = &self.aggregator.bitbucket;
        let mut responses = stream::iter(lookups.into_iter().map(|(id, repository, spec)| async move {
            let result = bitbucket.fetch_conflict_status(&repository, &spec).await;
            (id, repository, spec, result)
        }))
        .buffer_unordered(self.config.max_concurrent_conflict_checks);

        while let Some((id, repository, spec, result)) = responses.next().await {
            let check = match result {
                Ok(status) => {
                    self.cache
                        .conflicts
                        .insert(conflicts_key(&repository, &spec), status);
                    ConflictCheck::from(status)
                }
                Err(e) => {
                    warn!(pr = id, repository = %repository, error = %e, "conflict check failed");
                    ConflictCheck::Failed
                }
            };
            if !send(id, check) {
                return false;
            }
        }
        true
    }
}
