//! Terminal UI rendering using ratatui.
//!
//! Rendering is split in two: [`layout::compose`] turns controller state
//! into rows of text, and the [`common`] painters draw those rows.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Header (common::render_header)       │
//! │ Status (common::render_status_bar)   │
//! ├──────────────────────────────────────┤
//! │                                      │
//! │ Content + padding                    │
//! │ (common::render_content)             │
//! │                                      │
//! ├──────────────────────────────────────┤
//! │ Command line                         │
//! │ (common::render_command_line)        │
//! └──────────────────────────────────────┘
//! ```

pub mod common;
pub mod layout;
pub mod theme;

use ratatui::layout::{Constraint, Layout};
use ratatui::widgets::Clear;
use ratatui::Frame;

use crate::app::App;

pub use layout::{compose, visible_lines, Screen, ScreenState};
pub use theme::Theme;

/// Draw one full frame for the controller.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let screen = compose(&app.screen_state(area.width, area.height));

    frame.render_widget(Clear, area);

    let chunks = Layout::vertical([
        Constraint::Length(1),                                   // Header
        Constraint::Length(1),                                   // Status
        Constraint::Length(screen.content.len() as u16 + 1),     // Content + padding
        Constraint::Length(1),                                   // Command line
    ])
    .split(area);

    common::render_header(frame, &screen, &app.theme, chunks[0]);
    common::render_status_bar(frame, &screen, &app.theme, chunks[1]);
    common::render_content(frame, &screen, &app.theme, chunks[2]);
    common::render_command_line(frame, &screen, &app.theme, chunks[3]);
}
