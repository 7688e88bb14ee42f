use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, RowTarget};
use crate::data::{Choice, SyncFilter};
use crate::icons;

fn label(key: &'static str, name: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(Color::Yellow)),
        Span::styled(name, Style::default().fg(Color::DarkGray)),
    ]
}

fn value_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    }
}

fn choice_span(choice: &Choice, display: Option<String>) -> Span<'static> {
    let text = display.unwrap_or_else(|| choice.to_string());
    Span::styled(format!("{}  ", text), value_style(!choice.is_show_all()))
}

/// Render the filter bar with the current selection
pub fn render_filter_bar(f: &mut Frame, app: &App, area: Rect) {
    let selection = &app.selection;
    let disabled = Style::default().fg(Color::DarkGray);

    let mut spans = Vec::new();
    spans.extend(label(" a", " author "));
    spans.push(choice_span(&selection.author, None));
    spans.extend(label("v", " reviewer "));
    spans.push(choice_span(&selection.reviewer, None));
    spans.extend(label("s", " sprint "));
    spans.push(choice_span(
        &selection.sprint,
        selection
            .sprint
            .value()
            .and_then(|id| app.sprint_name(id))
            .map(str::to_string),
    ));
    spans.extend(label("f", " fix "));
    spans.push(choice_span(
        &selection.fix_version,
        selection
            .fix_version
            .value()
            .and_then(|id| app.fix_version_name(id)),
    ));

    spans.extend(label("y", " sync "));
    let sync_text = format!("{}  ", selection.sync.to_str());
    if app.view.sync_filter_ready {
        spans.push(Span::styled(
            sync_text,
            value_style(selection.sync != SyncFilter::ShowAll),
        ));
    } else {
        spans.push(Span::styled(sync_text, disabled));
    }

    let checkbox = if selection.ready_for_reviewer {
        icons::CHECKED
    } else {
        icons::UNCHECKED
    };
    spans.extend(label("R", " ready "));
    if selection.reviewer.is_show_all() {
        spans.push(Span::styled(format!("{}  ", checkbox), disabled));
    } else {
        spans.push(Span::styled(
            format!("{}  ", checkbox),
            value_style(selection.ready_for_reviewer),
        ));
    }

    spans.extend(label("m", " mode "));
    spans.push(Span::styled(
        selection.mode.to_str(),
        Style::default().fg(Color::White),
    ));

    let tooltip = selected_counter_tooltip(app).unwrap_or_default();
    let right = Line::from(Span::styled(
        format!("{} ", tooltip),
        Style::default().fg(Color::DarkGray),
    ));

    let chunks = Layout::horizontal([Constraint::Min(0), Constraint::Length(right.width() as u16)])
        .split(area);
    f.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);
    f.render_widget(right, chunks[1]);
}

/// Counter description for the selected row, if it has one.
fn selected_counter_tooltip(app: &App) -> Option<String> {
    let view = &app.view;
    let counter = match &app.selected_row()?.target {
        RowTarget::Repository(r) => view.repositories.get(*r)?.counter,
        RowTarget::Branch(r, b) => view.repositories.get(*r)?.branches.get(*b)?.counter,
        RowTarget::Node {
            repository,
            branch,
            path,
        } => {
            let node = crate::app::rows::node_view_at(view, *repository, *branch, path)?;
            if node.counter.total == 0 {
                return None;
            }
            node.counter
        }
        RowTarget::OrphanHeader | RowTarget::Orphan(_) => return None,
    };
    Some(counter.tooltip())
}
