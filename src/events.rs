//! Terminal input: polling and the per-mode key handlers.

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, InputMode};

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }

    match app.mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Command | InputMode::Search => handle_line_input(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        // Quit
        KeyCode::Char('c') if ctrl => app.quit(),
        KeyCode::Char('q') => app.quit(),

        // Mode entry
        KeyCode::Char(':') => app.enter_command_mode(),
        KeyCode::Char('/') => app.enter_search_mode(),

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('f') | KeyCode::PageDown => app.page_down(),
        KeyCode::Char('b') | KeyCode::PageUp => app.page_up(),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_to_top(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),

        // Refresh
        KeyCode::Char('r') => app.refresh(),

        _ => {}
    }
}

/// Shared line editing for Command and Search mode.
fn handle_line_input(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Enter => app.submit_input(),
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Char('c') if ctrl => app.cancel_input(),
        KeyCode::Char('u') if ctrl => app.input_clear(),
        KeyCode::Backspace => app.input_pop(),
        KeyCode::Char(c) if !ctrl && !c.is_control() => app.input_push(c),
        _ => {}
    }
}
