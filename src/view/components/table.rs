use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Cell, Row, Table},
    Frame,
};
use strip_ansi_escapes::strip_str;

use crate::app::rows::{node_at, node_view_at};
use crate::app::{App, Row as TreeRow, RowTarget};
use crate::data::{ConflictCheck, Issue, PullRequest, ReviewState};
use crate::engine::{Counter, NodeView, StatusClass, TreeNode, Visibility};
use crate::icons;

use super::popups::truncate_string;

const TITLE_WIDTH: usize = 60;

/// Upstream text with terminal escape sequences removed.
pub fn sanitize(text: &str) -> String {
    strip_str(text)
}

pub fn status_color(status: Option<StatusClass>) -> Color {
    match status {
        Some(StatusClass::InProgress) => Color::Blue,
        Some(StatusClass::InReview) => Color::Yellow,
        Some(StatusClass::InReviewAllApproved) => Color::Green,
        Some(StatusClass::Resolved) => Color::Gray,
        None => Color::White,
    }
}

fn fold_glyph(row: &TreeRow, expandable: bool) -> &'static str {
    if !expandable {
        icons::LEAF
    } else if row.collapsed {
        icons::COLLAPSED
    } else {
        icons::EXPANDED
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn counter_cell(counter: Counter) -> Cell<'static> {
    let style = if counter.is_filtered() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Cell::from(counter.to_string()).style(style)
}

/// Conflict marker; pending checks show the spinner frame.
pub fn sync_marker(check: Option<ConflictCheck>, spinner: &'static str) -> Span<'static> {
    match check {
        Some(ConflictCheck::Pending) => Span::styled(spinner, Style::default().fg(Color::Yellow)),
        Some(ConflictCheck::Conflicts) => {
            Span::styled(icons::SYNC_NEEDED, Style::default().fg(Color::Red).bold())
        }
        Some(ConflictCheck::Failed) => {
            Span::styled(icons::SYNC_UNKNOWN, Style::default().fg(Color::DarkGray))
        }
        Some(ConflictCheck::InvalidSpec) => {
            Span::styled(icons::SYNC_INVALID, Style::default().fg(Color::Magenta))
        }
        Some(ConflictCheck::Clean) | None => Span::raw(""),
    }
}

/// Commits ahead of / behind the destination, when the host reported them.
pub fn commit_drift(pr: &PullRequest) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(ahead) = pr.commits_ahead {
        parts.push(format!("{}{}", icons::AHEAD, ahead));
    }
    if let Some(behind) = pr.commits_behind {
        parts.push(format!("{}{}", icons::BEHIND, behind));
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn reviewers_line(node: &TreeNode) -> Line<'static> {
    let mut spans = Vec::new();
    for participant in node.pull_request.other_participants() {
        let (glyph, color) = if participant.approved {
            (icons::APPROVED, Color::Green)
        } else if participant.state == ReviewState::ChangesRequested {
            (icons::CHANGES_REQUESTED, Color::Red)
        } else {
            (icons::AWAITING_REVIEW, Color::DarkGray)
        };
        let first_name = participant
            .user
            .display_name
            .split_whitespace()
            .next()
            .unwrap_or_default();
        spans.push(Span::styled(glyph, Style::default().fg(color)));
        spans.push(Span::raw(format!("{} ", sanitize(first_name))));
    }
    Line::from(spans)
}

fn alerts_cell(node: &TreeNode) -> Cell<'static> {
    if node.alerts.is_empty() {
        return Cell::from("");
    }
    let text = node
        .alerts
        .iter()
        .map(|a| a.message())
        .collect::<Vec<_>>()
        .join("; ");
    Cell::from(format!("{} {}", icons::WARNING, text)).style(Style::default().fg(Color::Red))
}

fn node_row(app: &App, row: &TreeRow, node: &TreeNode, view: &NodeView) -> Row<'static> {
    let mut title_style = Style::default().fg(status_color(node.status_class));
    if view.visibility == Visibility::Filtered {
        title_style = Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM);
    } else if view.attention {
        title_style = title_style.fg(Color::LightMagenta).add_modifier(Modifier::BOLD);
    }

    let mut title = Line::from(vec![
        Span::raw(indent(row.depth)),
        Span::styled(
            fold_glyph(row, !node.children.is_empty()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("#{} ", node.id()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            truncate_string(&sanitize(&node.pull_request.title), TITLE_WIDTH),
            title_style,
        ),
        Span::styled(
            format!("  {}", sanitize(&node.pull_request.author.display_name)),
            Style::default().fg(Color::Magenta),
        ),
    ]);
    if let Some(drift) = commit_drift(&node.pull_request) {
        title.push_span(Span::styled(
            format!("  {}", drift),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let counter = if view.counter.total > 0 {
        counter_cell(view.counter)
    } else {
        Cell::from("")
    };

    let sync = sync_marker(app.conflicts.get(&node.id()).copied(), app.spinner());

    let issues = node
        .issue_keys
        .iter()
        .map(|k| sanitize(k))
        .collect::<Vec<_>>()
        .join(" ");

    Row::new(vec![
        Cell::from(title),
        counter,
        Cell::from(sync),
        Cell::from(issues).style(Style::default().fg(Color::Cyan)),
        Cell::from(reviewers_line(node)),
        alerts_cell(node),
    ])
}

fn group_row(row: &TreeRow, name: &str, counter: Counter, style: Style) -> Row<'static> {
    let title = Line::from(vec![
        Span::raw(indent(row.depth)),
        Span::styled(fold_glyph(row, true), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(sanitize(name), style),
    ]);
    Row::new(vec![Cell::from(title), counter_cell(counter)])
}

fn orphan_row(row: &TreeRow, issue: &Issue) -> Row<'static> {
    let assignee = issue
        .assignee
        .as_ref()
        .map(|a| sanitize(&a.display_name))
        .unwrap_or_else(|| "unassigned".to_string());
    let title = Line::from(vec![
        Span::raw(indent(row.depth)),
        Span::styled(icons::BULLET, Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::styled(
            format!("{} ", sanitize(&issue.key)),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(truncate_string(&sanitize(&issue.summary), TITLE_WIDTH)),
        Span::styled(format!("  {}", assignee), Style::default().fg(Color::Magenta)),
    ]);
    Row::new(vec![Cell::from(title)])
}

fn table_row(app: &App, row: &TreeRow) -> Option<Row<'static>> {
    let view = &app.view;
    match &row.target {
        RowTarget::Repository(r) => {
            let repo = view.repositories.get(*r)?;
            Some(group_row(
                row,
                &repo.name,
                repo.counter,
                Style::default().fg(Color::Cyan).bold(),
            ))
        }
        RowTarget::Branch(r, b) => {
            let branch = view.repositories.get(*r)?.branches.get(*b)?;
            Some(group_row(
                row,
                &branch.name,
                branch.counter,
                Style::default().fg(Color::Yellow),
            ))
        }
        RowTarget::Node {
            repository,
            branch,
            path,
        } => {
            let node = node_at(&app.forest, *repository, *branch, path)?;
            let node_view = node_view_at(view, *repository, *branch, path)?;
            Some(node_row(app, row, node, node_view))
        }
        RowTarget::OrphanHeader => {
            let count = app.data.as_ref().map_or(0, |d| d.orphaned_issues.len());
            let title = Line::from(vec![
                Span::styled(fold_glyph(row, true), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(
                    "In review without a pull request",
                    Style::default().fg(Color::Yellow).bold(),
                ),
            ]);
            Some(Row::new(vec![
                Cell::from(title),
                Cell::from(count.to_string()).style(Style::default().fg(Color::DarkGray)),
            ]))
        }
        RowTarget::Orphan(i) => {
            let issue = app.data.as_ref()?.orphaned_issues.get(*i)?;
            Some(orphan_row(row, issue))
        }
    }
}

/// Render the pull request tree
pub fn render_table(f: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec![
        Cell::from("Pull request").style(Style::default().fg(Color::Yellow).bold()),
        Cell::from("#").style(Style::default().fg(Color::Yellow).bold()),
        Cell::from("Sync").style(Style::default().fg(Color::Yellow).bold()),
        Cell::from("Issues").style(Style::default().fg(Color::Yellow).bold()),
        Cell::from("Reviewers").style(Style::default().fg(Color::Yellow).bold()),
        Cell::from("Alerts").style(Style::default().fg(Color::Yellow).bold()),
    ])
    .height(1)
    .bottom_margin(1);

    let rows: Vec<Row> = app
        .rows
        .iter()
        .map(|row| table_row(app, row).unwrap_or_default())
        .collect();

    let widths = [
        Constraint::Min(40),
        Constraint::Length(7),
        Constraint::Length(5),
        Constraint::Length(16),
        Constraint::Length(24),
        Constraint::Length(30),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(icons::SELECTOR);

    f.render_stateful_widget(table, area, &mut app.table_state.clone());
}
