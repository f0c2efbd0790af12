//! Theme configuration for the interactive mode.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};

/// Color and style theme for the terminal UI.
///
/// Use [`Theme::from_scheme()`] to honour the `color_scheme` setting, or
/// [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Top row: tool, profile and view.
    pub header: Style,
    /// Second row: last status message.
    pub status: Style,
    /// Content rows.
    pub content: Style,
    /// Content rows reporting a stream error.
    pub error: Style,
    /// Bottom row in Normal mode.
    pub hint: Style,
    /// Bottom row while editing a command or search.
    pub prompt: Style,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            header: Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            status: Style::default().fg(Color::Cyan),
            content: Style::default(),
            error: Style::default().fg(Color::Red),
            hint: Style::default()
                .fg(Color::Gray)
                .bg(Color::Black)
                .add_modifier(Modifier::DIM),
            prompt: Style::default()
                .fg(Color::White)
                .bg(Color::Black)
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            header: Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            status: Style::default().fg(Color::Blue),
            content: Style::default(),
            error: Style::default().fg(Color::Red),
            hint: Style::default().fg(Color::DarkGray).bg(Color::Gray),
            prompt: Style::default()
                .fg(Color::Black)
                .bg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// `dark`, `light` or anything else for auto-detection.
    pub fn from_scheme(scheme: &str) -> Self {
        match scheme.to_ascii_lowercase().as_str() {
            "dark" => Self::dark(),
            "light" => Self::light(),
            _ => Self::auto_detect(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
