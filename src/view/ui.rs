use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use crate::icons;

use super::components::{
    render_error_popup, render_filter_bar, render_header, render_help_popup,
    render_project_picker, render_share_popup, render_table,
};

/// Main UI rendering function
pub fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Length(1), // Separator
        Constraint::Min(0),    // Tree
        Constraint::Length(1), // Filter bar
    ])
    .split(f.area());

    render_header(f, app, chunks[0]);

    // Separator line
    let separator = icons::SEPARATOR_CHAR.repeat(chunks[1].width as usize);
    f.render_widget(
        Paragraph::new(separator).style(Style::default().fg(Color::DarkGray)),
        chunks[1],
    );

    render_table(f, app, chunks[2]);
    render_filter_bar(f, app, chunks[3]);

    // Render popups (order matters for layering)
    if app.show_project_picker {
        render_project_picker(f, app);
    }

    if app.show_share_popup {
        render_share_popup(f, app);
    }

    if app.show_help_popup {
        render_help_popup(f);
    }

    if app.show_error_popup {
        if let Some(ref error) = app.error {
            render_error_popup(f, error);
        }
    }
}
