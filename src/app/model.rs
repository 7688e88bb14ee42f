use anyhow::Result;
use ratatui::widgets::TableState;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::config::Config;
use crate::data::{AggregatedData, ConflictCheck, FilterSelection, PrId, SPINNER_FRAMES};
use crate::engine::{apply_filters, ChangeGate, FilterContext, Forest, ForestView, TreeNode};
use crate::services::Worker;

use super::message::{ConflictRequest, FetchRequest, FetchResult};
use super::rows::{flatten_rows, node_at, Row, RowKey, RowTarget};

pub struct App {
    pub config: Config,
    pub projects: Vec<String>,
    pub project: String,

    // Data state
    /// Last successfully fetched and hashed response for `project`.
    pub data: Option<AggregatedData>,
    pub forest: Forest,
    pub conflicts: HashMap<PrId, ConflictCheck>,
    pub gate: ChangeGate,

    // Filter/View state
    pub selection: FilterSelection,
    pub view: ForestView,
    pub collapsed: HashSet<RowKey>,
    pub rows: Vec<Row>,
    pub table_state: TableState,

    // Loading state
    pub loading: bool,
    pub focused: bool,
    pub last_poll: Option<Instant>,

    // Popup state
    pub show_help_popup: bool,
    pub show_error_popup: bool,
    pub show_share_popup: bool,
    pub show_project_picker: bool,
    pub project_picker_state: TableState,

    // Error state
    pub error: Option<String>,

    // Async communication
    pub fetch_tx: Sender<FetchRequest>,
    pub result_rx: Receiver<FetchResult>,

    // Spinner state
    pub spinner_idx: usize,
    pub last_spinner_update: Instant,
}

impl App {
    pub fn new(config: Config, project: String, selection: FilterSelection) -> Result<Self> {
        let (fetch_tx, fetch_rx) = mpsc::channel::<FetchRequest>();
        let (result_tx, result_rx) = mpsc::channel::<FetchResult>();

        let runtime = tokio::runtime::Runtime::new()?;
        let worker = Worker::new(config.clone())?;
        // Detached: the worker exits once `fetch_tx` is dropped with the app.
        worker.spawn(runtime, fetch_rx, result_tx);

        Ok(Self::with_channels(config, project, selection, fetch_tx, result_rx))
    }

    /// An app wired to the given channels instead of a background worker.
    pub fn with_channels(
        config: Config,
        project: String,
        selection: FilterSelection,
        fetch_tx: Sender<FetchRequest>,
        result_rx: Receiver<FetchResult>,
    ) -> Self {
        Self {
            projects: config.list_projects(),
            config,
            project,
            data: None,
            forest: Forest::default(),
            conflicts: HashMap::new(),
            gate: ChangeGate::default(),
            selection,
            view: ForestView::default(),
            collapsed: HashSet::new(),
            rows: Vec::new(),
            table_state: TableState::default(),
            loading: false,
            focused: true,
            last_poll: None,
            show_help_popup: false,
            show_error_popup: false,
            show_share_popup: false,
            show_project_picker: false,
            project_picker_state: TableState::default(),
            error: None,
            fetch_tx,
            result_rx,
            spinner_idx: 0,
            last_spinner_update: Instant::now(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.config.poll_interval_secs)
    }

    /// Due for a background refresh: focused, idle and the interval elapsed.
    pub fn should_poll(&self, now: Instant) -> bool {
        self.focused
            && !self.loading
            && self
                .last_poll
                .map_or(true, |last| now.duration_since(last) >= self.poll_interval())
    }

    pub fn pending_conflicts(&self) -> usize {
        self.conflicts
            .values()
            .filter(|c| **c == ConflictCheck::Pending)
            .count()
    }

    pub fn is_busy(&self) -> bool {
        self.loading || self.pending_conflicts() > 0
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.table_state.selected().and_then(|i| self.rows.get(i))
    }

    pub fn selected_node(&self) -> Option<&TreeNode> {
        match &self.selected_row()?.target {
            RowTarget::Node {
                repository,
                branch,
                path,
            } => node_at(&self.forest, *repository, *branch, path),
            _ => None,
        }
    }

    pub fn author_options(&self) -> Vec<String> {
        self.data.as_ref().map(|d| d.authors()).unwrap_or_default()
    }

    pub fn reviewer_options(&self) -> Vec<String> {
        self.data.as_ref().map(|d| d.reviewers()).unwrap_or_default()
    }

    /// Sprint ids, as strings, in board order.
    pub fn sprint_options(&self) -> Vec<String> {
        self.data
            .as_ref()
            .map(|d| d.sprints.iter().map(|s| s.id.to_string()).collect())
            .unwrap_or_default()
    }

    pub fn fix_version_options(&self) -> Vec<String> {
        self.data
            .as_ref()
            .map(|d| d.fix_versions().into_iter().map(|v| v.id).collect())
            .unwrap_or_default()
    }

    pub fn sprint_name(&self, id: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .sprints
            .iter()
            .find(|s| s.id.to_string() == id)
            .map(|s| s.name.as_str())
    }

    pub fn fix_version_name(&self, id: &str) -> Option<String> {
        self.data
            .as_ref()?
            .fix_versions()
            .into_iter()
            .find(|v| v.id == id)
            .map(|v| v.name)
    }

    /// Command line reopening the current project with the current filters.
    pub fn share_command(&self) -> String {
        let query = self.selection.to_query_string();
        if query.is_empty() {
            format!("prtree --project {}", self.project)
        } else {
            format!("prtree --project {} --filter '{}'", self.project, query)
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_idx]
    }

    // Spinner update

    pub fn update_spinner(&mut self) {
        if self.last_spinner_update.elapsed() >= Duration::from_millis(80) {
            self.spinner_idx = (self.spinner_idx + 1) % SPINNER_FRAMES.len();
            self.last_spinner_update = Instant::now();
        }
    }

    // View management

    /// Rebuild the forest from the current data and mark every conflict check
    /// pending. Returns the checks to request.
    pub fn rebuild_forest(&mut self) -> Vec<ConflictRequest> {
        let Some(data) = &self.data else {
            self.forest = Forest::default();
            self.conflicts.clear();
            return Vec::new();
        };
        self.forest = Forest::from_data(data, self.config.sibling_order);

        let mut seen = HashSet::new();
        let checks: Vec<ConflictRequest> = self
            .forest
            .nodes()
            .filter(|node| seen.insert(node.id()))
            .map(|node| ConflictRequest {
                id: node.id(),
                repository: node.pull_request.repository.clone(),
                spec: node.pull_request.commit_range(),
            })
            .collect();
        self.conflicts = checks
            .iter()
            .map(|c| (c.id, ConflictCheck::Pending))
            .collect();
        checks
    }

    /// Re-run the filter engine and re-flatten the rows, keeping the selection
    /// on the same row where it still exists.
    pub fn refresh_view(&mut self) {
        let selected_key = self.selected_row().and_then(|r| r.key.clone());

        let empty: BTreeMap<u64, Vec<String>> = BTreeMap::new();
        let context = FilterContext {
            sprint_issues: self
                .data
                .as_ref()
                .map(|d| &d.sprint_issues)
                .unwrap_or(&empty),
            conflicts: &self.conflicts,
            match_issue_assignees: self.config.match_issue_assignees,
        };
        self.view = apply_filters(&self.forest, &self.selection, &context);

        let orphans = self
            .data
            .as_ref()
            .map(|d| d.orphaned_issues.as_slice())
            .unwrap_or_default();
        self.rows = flatten_rows(&self.forest, &self.view, &self.collapsed, orphans);

        let index = selected_key
            .and_then(|key| self.rows.iter().position(|r| r.key.as_ref() == Some(&key)))
            .or_else(|| {
                self.table_state
                    .selected()
                    .map(|i| i.min(self.rows.len().saturating_sub(1)))
            })
            .or(Some(0));
        self.table_state
            .select(index.filter(|_| !self.rows.is_empty()));
    }

    // Fetch management

    pub fn start_fetch(&mut self, force: bool) {
        self.loading = true;
        self.last_poll = Some(Instant::now());
        self.error = None;
        self.show_error_popup = false;
        debug!(project = %self.project, force, "requesting project data");
        let request = FetchRequest::Project {
            project: self.project.clone(),
            force,
        };
        if self.fetch_tx.send(request).is_err() {
            self.worker_gone();
        }
    }

    pub fn request_conflicts(&mut self, checks: Vec<ConflictRequest>) {
        if checks.is_empty() {
            return;
        }
        let ids: Vec<PrId> = checks.iter().map(|c| c.id).collect();
        let request = FetchRequest::Conflicts {
            project: self.project.clone(),
            checks,
        };
        if self.fetch_tx.send(request).is_err() {
            for id in ids {
                self.conflicts.insert(id, ConflictCheck::Failed);
            }
            self.refresh_view();
            self.worker_gone();
        }
    }

    /// The fetch worker has exited; nothing sent will ever be answered.
    fn worker_gone(&mut self) {
        error!(project = %self.project, "fetch worker is not running");
        self.loading = false;
        self.error = Some("Background fetcher stopped; restart prtree to reload data".to_string());
        self.show_error_popup = true;
    }

    pub fn check_fetch_result(&mut self) -> Option<FetchResult> {
        self.result_rx.try_recv().ok()
    }
}
