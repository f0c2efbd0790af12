//! Pure screen composition.
//!
//! ```text
//! row 0            header   "kim | Profile: <name> | View: <view>"
//! row 1            status   last status message
//! rows 2..2+N      content  N = visible_lines(height), filler rows when short
//! row height-2     padding
//! row height-1     command  ":" + buffer | "/" + buffer | hint
//! ```
//!
//! Every row is clipped to the terminal width (ellipsis on overflow) and
//! padded to it, so a frame never depends on what the previous frame drew.

use crate::app::InputMode;

/// Rows that are not content: header, status, padding and command line.
pub const CHROME_ROWS: usize = 4;

pub const DEFAULT_WIDTH: u16 = 80;
pub const DEFAULT_HEIGHT: u16 = 24;

const HINT: &str = "Press ':' for commands, '/' to search, 'q' to quit";
const EMPTY: &str = "No content to display";

/// Number of content rows for a terminal height.
pub fn visible_lines(height: u16) -> usize {
    (height as usize).saturating_sub(CHROME_ROWS).max(1)
}

/// Everything a frame is computed from.
#[derive(Debug, Clone, Copy)]
pub struct ScreenState<'a> {
    pub profile: Option<&'a str>,
    pub view: &'a str,
    pub status: &'a str,
    pub content: &'a [String],
    pub scroll_offset: usize,
    pub mode: InputMode,
    pub command_buffer: &'a str,
    pub search_buffer: &'a str,
    pub width: u16,
    pub height: u16,
}

/// One composed frame, row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub header: String,
    pub status: String,
    pub content: Vec<String>,
    pub padding: String,
    pub command_line: String,
    pub mode: InputMode,
}

impl Screen {
    pub fn rows(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.header.as_str())
            .chain(std::iter::once(self.status.as_str()))
            .chain(self.content.iter().map(String::as_str))
            .chain(std::iter::once(self.padding.as_str()))
            .chain(std::iter::once(self.command_line.as_str()))
    }
}

/// Compose a frame from state.
pub fn compose(state: &ScreenState<'_>) -> Screen {
    let width = if state.width == 0 {
        DEFAULT_WIDTH
    } else {
        state.width
    } as usize;
    let height = if state.height == 0 {
        DEFAULT_HEIGHT
    } else {
        state.height
    };
    let visible = visible_lines(height);

    let header = format!(
        "kim | Profile: {} | View: {}",
        state.profile.unwrap_or("None"),
        state.view
    );

    let mut content: Vec<String> = if state.content.is_empty() {
        vec![pad(EMPTY, width)]
    } else {
        let max_offset = state.content.len().saturating_sub(visible);
        let start = state.scroll_offset.min(max_offset);
        state.content[start..]
            .iter()
            .take(visible)
            .map(|line| pad(line, width))
            .collect()
    };
    content.resize(visible, " ".repeat(width));

    let command_line = match state.mode {
        InputMode::Command => format!(":{}", state.command_buffer),
        InputMode::Search => format!("/{}", state.search_buffer),
        InputMode::Normal => HINT.to_string(),
    };

    Screen {
        header: pad(&header, width),
        status: pad(state.status, width),
        content,
        padding: " ".repeat(width),
        command_line: pad(&command_line, width),
        mode: state.mode,
    }
}

/// Clip `line` to `width` characters, ending in "..." when clipped.
pub fn fit(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        return line.to_string();
    }
    if width > 3 {
        let mut clipped: String = line.chars().take(width - 3).collect();
        clipped.push_str("...");
        clipped
    } else {
        line.chars().take(width).collect()
    }
}

fn pad(line: &str, width: usize) -> String {
    let mut fitted = fit(line, width);
    let len = fitted.chars().count();
    fitted.extend(std::iter::repeat(' ').take(width - len));
    fitted
}
