use ratatui::widgets::TableState;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::data::{FilterMode, FilterSelection};
use crate::engine::GateDecision;

use super::message::{Command, FetchResult, Message};
use super::model::App;
use super::rows::RowTarget;

/// Update the application state based on a message.
/// Returns an optional command to be executed by the main loop.
pub fn update(app: &mut App, msg: Message) -> Option<Command> {
    match msg {
        // Navigation
        Message::NextItem => {
            next_item(app);
            None
        }
        Message::PreviousItem => {
            previous_item(app);
            None
        }
        Message::GoToTop => {
            if !app.rows.is_empty() {
                app.table_state.select(Some(0));
            }
            None
        }
        Message::GoToBottom => {
            if !app.rows.is_empty() {
                app.table_state.select(Some(app.rows.len() - 1));
            }
            None
        }
        Message::ToggleCollapse => {
            toggle_collapse(app);
            None
        }

        // Actions
        Message::OpenSelected => selected_url(app).map(Command::OpenUrl),
        Message::Refresh => Some(Command::FetchProject { force: true }),

        // Filters
        Message::CycleAuthor => {
            let next = app.selection.author.cycle(&app.author_options());
            set_selection(app, app.selection.with_author(next));
            None
        }
        Message::CycleReviewer => {
            let next = app.selection.reviewer.cycle(&app.reviewer_options());
            set_selection(app, app.selection.with_reviewer(next));
            None
        }
        Message::CycleSprint => {
            let next = app.selection.sprint.cycle(&app.sprint_options());
            set_selection(app, app.selection.with_sprint(next));
            None
        }
        Message::CycleFixVersion => {
            let next = app.selection.fix_version.cycle(&app.fix_version_options());
            set_selection(app, app.selection.with_fix_version(next));
            None
        }
        Message::CycleSync => {
            // Disabled until every conflict check has come back.
            if app.view.sync_filter_ready {
                set_selection(app, app.selection.with_sync(app.selection.sync.cycle()));
            }
            None
        }
        Message::ToggleReadyForReviewer => {
            let ready = !app.selection.ready_for_reviewer;
            set_selection(app, app.selection.with_ready_for_reviewer(ready));
            None
        }
        Message::ToggleFilterMode => {
            let mode = match app.selection.mode {
                FilterMode::Combined => FilterMode::Exclusive,
                FilterMode::Exclusive => FilterMode::Combined,
            };
            set_selection(app, app.selection.with_mode(mode));
            None
        }
        Message::ClearFilters => {
            set_selection(app, app.selection.cleared());
            None
        }

        // Popups
        Message::ToggleShare => {
            app.show_share_popup = !app.show_share_popup;
            None
        }
        Message::ToggleHelp => {
            app.show_help_popup = !app.show_help_popup;
            None
        }
        Message::DismissHelp => {
            app.show_help_popup = false;
            None
        }
        Message::DismissError => {
            app.show_error_popup = false;
            None
        }

        // Project picker
        Message::OpenProjectPicker => {
            open_project_picker(app);
            None
        }
        Message::ProjectPickerNext => {
            picker_next(app);
            None
        }
        Message::ProjectPickerPrevious => {
            picker_previous(app);
            None
        }
        Message::SelectProject => {
            app.show_project_picker = false;
            let chosen = app
                .project_picker_state
                .selected()
                .and_then(|i| app.projects.get(i))
                .cloned()?;
            switch_project(app, chosen)
        }
        Message::CloseProjectPicker => {
            app.show_project_picker = false;
            None
        }

        // Terminal focus
        Message::FocusGained => {
            app.focused = true;
            if app.loading {
                None
            } else {
                Some(Command::FetchProject { force: false })
            }
        }
        Message::FocusLost => {
            app.focused = false;
            None
        }

        // Async results
        Message::FetchComplete(result) => handle_fetch_result(app, result),

        // System
        Message::Tick => {
            if app.is_busy() {
                app.update_spinner();
            }
            if app.should_poll(Instant::now()) {
                Some(Command::FetchProject { force: false })
            } else {
                None
            }
        }
        Message::Quit => Some(Command::Quit),
    }
}

// Helper functions

fn next_item(app: &mut App) {
    if app.rows.is_empty() {
        return;
    }
    let i = match app.table_state.selected() {
        Some(i) => {
            if i >= app.rows.len() - 1 {
                i
            } else {
                i + 1
            }
        }
        None => 0,
    };
    app.table_state.select(Some(i));
}

fn previous_item(app: &mut App) {
    if app.rows.is_empty() {
        return;
    }
    let i = match app.table_state.selected() {
        Some(i) => i.saturating_sub(1),
        None => 0,
    };
    app.table_state.select(Some(i));
}

fn toggle_collapse(app: &mut App) {
    let Some(row) = app.selected_row() else {
        return;
    };
    let expandable = match &row.target {
        RowTarget::Node { .. } => app
            .selected_node()
            .is_some_and(|node| !node.children.is_empty()),
        RowTarget::Orphan(_) => false,
        _ => true,
    };
    let Some(key) = row.key.clone().filter(|_| expandable) else {
        return;
    };
    if !app.collapsed.remove(&key) {
        app.collapsed.insert(key);
    }
    app.refresh_view();
}

fn selected_url(app: &App) -> Option<String> {
    match &app.selected_row()?.target {
        RowTarget::Node { .. } => app.selected_node().map(|node| node.pull_request.url.clone()),
        RowTarget::Orphan(i) => {
            let data = app.data.as_ref()?;
            data.orphaned_issues.get(*i).map(|issue| data.issue_url(&issue.key))
        }
        _ => None,
    }
}

fn set_selection(app: &mut App, selection: FilterSelection) {
    if app.selection != selection {
        debug!(filter = %selection.to_query_string(), "filter changed");
        app.selection = selection;
        app.refresh_view();
    }
}

fn open_project_picker(app: &mut App) {
    app.show_project_picker = true;
    app.project_picker_state = TableState::default();
    let current = app.projects.iter().position(|p| *p == app.project);
    if !app.projects.is_empty() {
        app.project_picker_state.select(current.or(Some(0)));
    }
}

fn picker_next(app: &mut App) {
    if app.projects.is_empty() {
        return;
    }
    let i = match app.project_picker_state.selected() {
        Some(i) => (i + 1).min(app.projects.len() - 1),
        None => 0,
    };
    app.project_picker_state.select(Some(i));
}

fn picker_previous(app: &mut App) {
    if app.projects.is_empty() {
        return;
    }
    let i = match app.project_picker_state.selected() {
        Some(i) => i.saturating_sub(1),
        None => 0,
    };
    app.project_picker_state.select(Some(i));
}

/// Drop everything belonging to the old project. Results still in flight for
/// it are discarded when they arrive.
fn switch_project(app: &mut App, project: String) -> Option<Command> {
    if project == app.project {
        return None;
    }
    info!(from = %app.project, to = %project, "switching project");
    app.project = project;
    app.data = None;
    app.gate.reset();
    app.conflicts.clear();
    app.forest = Default::default();
    app.selection = app.selection.cleared();
    app.collapsed.clear();
    app.table_state = TableState::default();
    app.loading = false;
    app.refresh_view();
    Some(Command::FetchProject { force: false })
}

fn handle_fetch_result(app: &mut App, result: FetchResult) -> Option<Command> {
    match result {
        FetchResult::Project { project, result } => {
            if project != app.project {
                warn!(stale = %project, current = %app.project, "discarding stale project data");
                return None;
            }
            app.loading = false;

            let data = match result {
                Ok(data) => data,
                Err(e) => {
                    app.error = Some(e);
                    app.show_error_popup = true;
                    return None;
                }
            };

            match app.gate.observe(&data.content_hash, data.last_refresh) {
                GateDecision::Unchanged => {
                    if let Some(current) = app.data.as_mut() {
                        current.last_refresh = data.last_refresh;
                    }
                    None
                }
                GateDecision::Changed => {
                    info!(project = %project, hash = %data.content_hash, "project data changed");
                    app.data = Some(data);
                    let checks = app.rebuild_forest();
                    app.refresh_view();
                    if checks.is_empty() {
                        None
                    } else {
                        Some(Command::CheckConflicts(checks))
                    }
                }
            }
        }
        FetchResult::Conflict { project, id, check } => {
            if project != app.project {
                debug!(stale = %project, pr = id, "discarding stale conflict result");
                return None;
            }
            if let Some(slot) = app.conflicts.get_mut(&id) {
                *slot = check;
                app.refresh_view();
            }
            None
        }
    }
}
