use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::icons;

const HELP: &str = include_str!("../../../assets/HELP.md");

fn popup_block(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(title)
        .title_style(Style::default().fg(color).bold())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

/// Render the help popup
pub fn render_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_width = 72u16.min(area.width.saturating_sub(4));
    let lines = markdown_to_lines(HELP);
    let popup_height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let popup_area = centered_rect(popup_width, popup_height, area);

    f.render_widget(Clear, popup_area);

    let help = Paragraph::new(lines)
        .block(popup_block(" Help ", Color::Cyan))
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

/// Render the error popup
pub fn render_error_popup(f: &mut Frame, error: &str) {
    let area = f.area();
    let popup_width = (area.width * 60 / 100)
        .max(40)
        .min(area.width.saturating_sub(4));
    let popup_height = 7u16;
    let popup_area = centered_rect(popup_width, popup_height, area);

    f.render_widget(Clear, popup_area);

    let error_paragraph = Paragraph::new(error)
        .style(Style::default().fg(Color::White))
        .block(popup_block(" Error ", Color::Red))
        .wrap(Wrap { trim: true });

    f.render_widget(error_paragraph, popup_area);

    let hint_area = Rect {
        x: popup_area.x,
        y: popup_area.y + popup_area.height,
        width: popup_area.width,
        height: 1,
    };

    if hint_area.y < area.height {
        let hint = Line::from(vec![
            Span::raw("Press "),
            Span::styled("Esc", Style::default().fg(Color::Yellow)),
            Span::raw(" to dismiss"),
        ])
        .centered();
        f.render_widget(hint, hint_area);
    }
}

/// Render the share popup with the command line for the current view
pub fn render_share_popup(f: &mut Frame, app: &App) {
    let area = f.area();
    let popup_width = 70u16.min(area.width.saturating_sub(4));
    let inner_width = popup_width.saturating_sub(2) as usize;

    let mut lines = vec![Line::styled(
        "Reopen this view with:",
        Style::default().fg(Color::DarkGray),
    )];
    lines.push(Line::raw(""));
    lines.extend(
        wrap_text(&app.share_command(), inner_width)
            .into_iter()
            .map(|l| Line::styled(l, Style::default().fg(Color::White))),
    );
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" close"),
    ]));

    let popup_height = lines.len() as u16 + 2;
    let popup_area = centered_rect(popup_width, popup_height, area);

    f.render_widget(Clear, popup_area);
    f.render_widget(
        Paragraph::new(lines).block(popup_block(" Share ", Color::Cyan)),
        popup_area,
    );
}

/// Render the project picker
pub fn render_project_picker(f: &mut Frame, app: &App) {
    let area = f.area();
    let popup_width = 40u16;
    let popup_height = (app.projects.len() as u16 + 4).min(area.height.saturating_sub(2));
    let popup_area = centered_rect(popup_width, popup_height, area);

    f.render_widget(Clear, popup_area);

    let mut lines: Vec<Line> = Vec::new();
    for (i, project) in app.projects.iter().enumerate() {
        let is_selected = app.project_picker_state.selected() == Some(i);
        let prefix = if is_selected { icons::SELECTOR } else { "  " };
        let style = if is_selected {
            Style::default().fg(Color::Cyan).bold()
        } else {
            Style::default().fg(Color::White)
        };
        let current = if *project == app.project { " (current)" } else { "" };
        lines.push(Line::styled(
            format!("{}{} {}{}", prefix, icons::BULLET, project, current),
            style,
        ));
    }
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" select  "),
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" close"),
    ]));

    let popup = Paragraph::new(lines).block(popup_block(" Projects ", Color::Cyan));

    f.render_widget(popup, popup_area);
}

/// Calculate a centered rectangle within an area
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .split(area);

    Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .split(vertical[0])[0]
}

/// Truncate a string to a maximum number of characters with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

/// Wrap text to fit within a maximum width, breaking on word boundaries
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if !current_line.is_empty()
            && current_line.chars().count() + 1 + word.chars().count() <= max_width
        {
            current_line.push(' ');
            current_line.push_str(word);
            continue;
        }
        if !current_line.is_empty() {
            lines.push(std::mem::take(&mut current_line));
        }
        // Words longer than a line are split
        let mut chars = word.chars().peekable();
        while chars.peek().is_some() {
            let chunk: String = chars.by_ref().take(max_width).collect();
            if chars.peek().is_some() {
                lines.push(chunk);
            } else {
                current_line = chunk;
            }
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Convert markdown text to styled ratatui Lines
fn markdown_to_lines(markdown: &str) -> Vec<Line<'static>> {
    let mut doc = HelpDocument::default();
    for event in Parser::new(markdown) {
        doc.apply(event);
    }
    doc.finish()
}

/// Line builder for the help document. Inline styles nest, so they are kept
/// as a stack and combined when a span is emitted.
#[derive(Default)]
struct HelpDocument {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    in_code_block: bool,
}

impl HelpDocument {
    fn apply(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.end_line();
                self.blank();
                let color = match level {
                    HeadingLevel::H1 => Color::Cyan,
                    HeadingLevel::H2 => Color::Green,
                    _ => Color::Yellow,
                };
                self.styles.push(Style::default().fg(color).bold());
            }
            Event::End(TagEnd::Heading(_)) => {
                self.styles.pop();
                self.end_line();
                self.blank();
            }
            Event::Start(Tag::Strong) => self.styles.push(Style::default().bold()),
            Event::Start(Tag::Emphasis) => self.styles.push(Style::default().italic()),
            Event::End(TagEnd::Strong | TagEnd::Emphasis) => {
                self.styles.pop();
            }
            Event::Start(Tag::Item) => self.spans.push(Span::styled(
                format!("{} ", icons::BULLET),
                Style::default().fg(Color::Yellow),
            )),
            Event::End(TagEnd::Item) | Event::HardBreak => self.end_line(),
            Event::End(TagEnd::Paragraph | TagEnd::List(_)) => {
                self.end_line();
                self.blank();
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.end_line();
                self.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code_block = false;
                self.blank();
            }
            Event::Text(text) if self.in_code_block => {
                self.lines.extend(
                    text.lines()
                        .map(|l| Line::styled(format!("  {}", l), Style::default().fg(Color::Gray))),
                );
            }
            Event::Text(text) => self.push_text(text.to_string()),
            Event::Code(code) => self
                .spans
                .push(Span::styled(code.to_string(), Style::default().fg(Color::Yellow))),
            Event::SoftBreak => self.push_text(" ".to_string()),
            _ => {}
        }
    }

    fn push_text(&mut self, text: String) {
        let style = self
            .styles
            .iter()
            .fold(Style::default(), |acc, s| acc.patch(*s));
        self.spans.push(Span::styled(text, style));
    }

    fn end_line(&mut self) {
        if !self.spans.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.spans)));
        }
    }

    /// One blank line between blocks, never two
    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| l.width() > 0) {
            self.lines.push(Line::raw(""));
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.end_line();
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}
