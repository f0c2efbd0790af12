//! Painting a composed [`Screen`] onto a ratatui frame.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::InputMode;

use super::layout::Screen;
use super::Theme;

/// Render the header bar: tool, active profile and current view.
pub fn render_header(frame: &mut Frame, screen: &Screen, theme: &Theme, area: Rect) {
    let line = Line::from(Span::styled(screen.header.as_str(), theme.header));
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status message row.
pub fn render_status_bar(frame: &mut Frame, screen: &Screen, theme: &Theme, area: Rect) {
    let line = Line::from(Span::styled(screen.status.as_str(), theme.status));
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the content rows followed by the padding row.
///
/// Rows that start with `!` report stream errors and use the error style.
pub fn render_content(frame: &mut Frame, screen: &Screen, theme: &Theme, area: Rect) {
    let lines: Vec<Line> = screen
        .content
        .iter()
        .chain(std::iter::once(&screen.padding))
        .map(|row| {
            let style = if row.starts_with('!') {
                theme.error
            } else {
                theme.content
            };
            Line::from(Span::styled(row.as_str(), style))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

/// Render the command line: prompt while editing, hint otherwise.
pub fn render_command_line(frame: &mut Frame, screen: &Screen, theme: &Theme, area: Rect) {
    let style = match screen.mode {
        InputMode::Normal => theme.hint,
        InputMode::Command | InputMode::Search => theme.prompt,
    };
    let line = Line::from(Span::styled(screen.command_line.as_str(), style));
    frame.render_widget(Paragraph::new(line), area);
}
