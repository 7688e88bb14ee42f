use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    Frame,
};

use crate::app::App;

/// Render the header line: project and totals on the left, activity on the right
pub fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let counter = app.view.counter;
    let noun = if counter.total == 1 { "PR" } else { "PRs" };

    let mut left_spans = vec![
        Span::styled(" prtree ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}]", app.project),
            Style::default().fg(Color::White).bold(),
        ),
        Span::raw(" "),
        Span::styled(
            format!("{} {}", counter, noun),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(data) = &app.data {
        if !data.orphaned_issues.is_empty() {
            left_spans.push(Span::styled(
                format!("  {} orphaned", data.orphaned_issues.len()),
                Style::default().fg(Color::Yellow),
            ));
        }
    }
    let left = Line::from(left_spans);

    let mut right_spans = Vec::new();
    if app.is_busy() {
        right_spans.push(Span::styled(
            format!("{} ", app.spinner()),
            Style::default().fg(Color::Yellow),
        ));
    }
    let pending = app.pending_conflicts();
    if pending > 0 {
        right_spans.push(Span::styled(
            format!("checking {} ", pending),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if !app.focused {
        right_spans.push(Span::styled("paused ", Style::default().fg(Color::DarkGray)));
    }
    if let Some(data) = &app.data {
        right_spans.push(Span::styled(
            format!(
                "refreshed {} ",
                data.last_refresh.with_timezone(&chrono::Local).format("%H:%M:%S")
            ),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let right = Line::from(right_spans);

    let chunks = Layout::horizontal([Constraint::Min(0), Constraint::Length(right.width() as u16)])
        .split(area);

    f.render_widget(left, chunks[0]);
    f.render_widget(right, chunks[1]);
}
