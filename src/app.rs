//! Interactive controller state and the actions behind every command.
//!
//! The controller is synchronous: it runs on the thread that owns the
//! terminal and reaches the async collaborators (connections, managers,
//! session registry) through a runtime [`Handle`]. Every collaborator failure
//! ends up as a status message.

use std::sync::Arc;

use kim_types::{ConsumerInfo, ListOptions};
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TryRecvError;

use crate::config::ProfileStore;
use crate::connection::{Connection, ConnectionManager};
use crate::data::views;
use crate::manager::{GroupManager, TopicManager};
use crate::session::ConsumerStream;
use crate::ui::layout::{visible_lines, ScreenState, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::ui::Theme;

/// Upper bound on lines kept in the Messages view; oldest lines are dropped.
pub const MAX_MESSAGE_LINES: usize = 10_000;

/// Page size used when listing topics and groups interactively.
pub const LIST_PAGE_SIZE: usize = 100;

/// Messages moved from a live stream into the view per tick.
const DRAIN_PER_TICK: usize = 500;

/// Which input handler receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Command,
    Search,
}

/// What produced the current content, and so how to refresh it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Help,
    Topics,
    Groups,
    Profiles,
    Sessions,
    TopicDetails(String),
    GroupDetails(String),
    Messages(ConsumerInfo),
    Cleared,
}

impl View {
    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Help => "help",
            View::Topics => "topics",
            View::Groups => "groups",
            View::Profiles => "profiles",
            View::Sessions => "sessions",
            View::TopicDetails(_) => "topic",
            View::GroupDetails(_) => "group",
            View::Messages(_) => "messages",
            View::Cleared => "cleared",
        }
    }
}

/// A session feeding the Messages view.
#[derive(Debug, Clone)]
struct LiveFeed {
    stream: ConsumerStream,
    connection: Connection,
    received: usize,
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub view: View,
    pub mode: InputMode,
    pub content: Vec<String>,
    pub command_buffer: String,
    pub search_buffer: String,
    pub scroll_offset: usize,
    pub width: u16,
    pub height: u16,
    pub status_message: String,
    pub theme: Theme,

    profiles: Box<dyn ProfileStore>,
    connections: Arc<ConnectionManager>,
    runtime: Handle,
    live: Option<LiveFeed>,
}

impl App {
    pub fn new(
        profiles: Box<dyn ProfileStore>,
        connections: Arc<ConnectionManager>,
        runtime: Handle,
    ) -> Self {
        Self {
            running: true,
            view: View::Help,
            mode: InputMode::Normal,
            content: views::help_lines(),
            command_buffer: String::new(),
            search_buffer: String::new(),
            scroll_offset: 0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            status_message: "Ready - Type :help for commands".to_string(),
            theme: Theme::default(),
            profiles,
            connections,
            runtime,
            live: None,
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Name of the active profile, if one is set.
    pub fn active_profile_name(&self) -> Option<&str> {
        self.profiles.active_profile().ok().map(|p| p.name.as_str())
    }

    /// Everything the layout needs for one frame.
    pub fn screen_state(&self, width: u16, height: u16) -> ScreenState<'_> {
        ScreenState {
            profile: self.active_profile_name(),
            view: self.view.label(),
            status: &self.status_message,
            content: &self.content,
            scroll_offset: self.scroll_offset,
            mode: self.mode,
            command_buffer: &self.command_buffer,
            search_buffer: &self.search_buffer,
            width,
            height,
        }
    }

    // ------------------------------------------------------------------
    // Dimensions and scrolling
    // ------------------------------------------------------------------

    /// Record the terminal size; zero dimensions fall back to 80x24.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = if width == 0 { DEFAULT_WIDTH } else { width };
        self.height = if height == 0 { DEFAULT_HEIGHT } else { height };
        self.clamp_scroll();
    }

    pub fn visible_lines(&self) -> usize {
        visible_lines(self.height)
    }

    /// Largest offset that still fills the content area.
    pub fn max_scroll(&self) -> usize {
        self.content.len().saturating_sub(self.visible_lines())
    }

    fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
    }

    pub fn scroll_down(&mut self) {
        if self.scroll_offset < self.max_scroll() {
            self.scroll_offset += 1;
        } else {
            self.set_status_message("Already at bottom");
        }
    }

    pub fn scroll_up(&mut self) {
        if self.scroll_offset > 0 {
            self.scroll_offset -= 1;
        } else {
            self.set_status_message("Already at top");
        }
    }

    pub fn page_down(&mut self) {
        let max = self.max_scroll();
        if self.scroll_offset >= max {
            self.set_status_message("Already at bottom");
        }
        self.scroll_offset = (self.scroll_offset + self.visible_lines()).min(max);
    }

    pub fn page_up(&mut self) {
        if self.scroll_offset == 0 {
            self.set_status_message("Already at top");
        }
        self.scroll_offset = self.scroll_offset.saturating_sub(self.visible_lines());
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_scroll();
    }

    // ------------------------------------------------------------------
    // Modes and line editing
    // ------------------------------------------------------------------

    pub fn enter_command_mode(&mut self) {
        self.mode = InputMode::Command;
        self.command_buffer.clear();
    }

    pub fn enter_search_mode(&mut self) {
        self.mode = InputMode::Search;
        self.search_buffer.clear();
    }

    /// Discard the line being edited and return to Normal mode.
    pub fn cancel_input(&mut self) {
        match self.mode {
            InputMode::Command => self.set_status_message("Command cancelled"),
            InputMode::Search => self.set_status_message("Search cancelled"),
            InputMode::Normal => {}
        }
        self.command_buffer.clear();
        self.search_buffer.clear();
        self.mode = InputMode::Normal;
    }

    fn input_buffer(&mut self) -> Option<&mut String> {
        match self.mode {
            InputMode::Command => Some(&mut self.command_buffer),
            InputMode::Search => Some(&mut self.search_buffer),
            InputMode::Normal => None,
        }
    }

    pub fn input_push(&mut self, c: char) {
        if let Some(buffer) = self.input_buffer() {
            buffer.push(c);
        }
    }

    pub fn input_pop(&mut self) {
        if let Some(buffer) = self.input_buffer() {
            buffer.pop();
        }
    }

    /// Ctrl+U.
    pub fn input_clear(&mut self) {
        if let Some(buffer) = self.input_buffer() {
            buffer.clear();
        }
    }

    /// Enter: run the command or search, then return to Normal mode.
    pub fn submit_input(&mut self) {
        match std::mem::take(&mut self.mode) {
            InputMode::Command => {
                let line = std::mem::take(&mut self.command_buffer);
                crate::commands::execute(self, &line);
            }
            InputMode::Search => {
                let pattern = std::mem::take(&mut self.search_buffer);
                if !pattern.is_empty() {
                    self.search(&pattern);
                }
            }
            InputMode::Normal => {}
        }
    }

    /// Case-insensitive scan from the top; the match lands two lines below
    /// the top of the content area when possible.
    pub fn search(&mut self, pattern: &str) {
        let needle = pattern.to_lowercase();
        let found = self
            .content
            .iter()
            .position(|line| line.to_lowercase().contains(&needle));

        match found {
            Some(index) => {
                self.scroll_offset = index.saturating_sub(2).min(self.max_scroll());
                self.set_status_message(format!("Found '{pattern}' at line {}", index + 1));
            }
            None => self.set_status_message(format!("Pattern not found: {pattern}")),
        }
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    fn set_content(&mut self, view: View, lines: Vec<String>) {
        self.view = view;
        self.content = lines;
        self.scroll_offset = 0;
    }

    pub fn show_help(&mut self) {
        self.set_content(View::Help, views::help_lines());
        self.set_status_message("Showing help");
    }

    pub fn clear(&mut self) {
        self.set_content(View::Cleared, Vec::new());
        self.set_status_message("Screen cleared");
    }

    /// Connection for the active profile, reporting failures in the status line.
    fn connection(&mut self) -> Option<Connection> {
        let profile = match self.profiles.active_profile() {
            Ok(profile) => profile.clone(),
            Err(_) => {
                self.set_status_message("No active profile set");
                return None;
            }
        };

        match self.runtime.block_on(self.connections.connect(&profile)) {
            Ok(connection) => Some(connection),
            Err(err) => {
                self.set_status_message(format!("Failed to connect: {err}"));
                None
            }
        }
    }

    pub fn show_topics(&mut self) {
        let Some(conn) = self.connection() else {
            return;
        };
        let manager = TopicManager::new(conn.client);
        let opts = ListOptions::default().page_size(LIST_PAGE_SIZE);

        match self.runtime.block_on(manager.list_topics(&opts)) {
            Ok(list) => {
                let count = list.topics.len();
                self.set_content(View::Topics, views::topic_table(&list));
                self.set_status_message(format!("Showing {count} topics"));
            }
            Err(err) => self.set_status_message(format!("Failed to list topics: {err}")),
        }
    }

    pub fn show_groups(&mut self) {
        let Some(conn) = self.connection() else {
            return;
        };
        let manager = GroupManager::new(conn.client);
        let opts = ListOptions::default()
            .page_size(LIST_PAGE_SIZE)
            .sort_by("group_id");

        match self.runtime.block_on(manager.list_groups(&opts)) {
            Ok(list) => {
                let count = list.groups.len();
                self.set_content(View::Groups, views::group_table(&list));
                self.set_status_message(format!("Showing {count} consumer groups"));
            }
            Err(err) => self.set_status_message(format!("Failed to list groups: {err}")),
        }
    }

    pub fn describe_topic(&mut self, name: &str) {
        let Some(conn) = self.connection() else {
            return;
        };
        let manager = TopicManager::new(conn.client);
        match self.runtime.block_on(manager.describe_topic(name)) {
            Ok(details) => {
                self.set_content(
                    View::TopicDetails(name.to_string()),
                    views::topic_details(&details),
                );
                self.set_status_message(format!("Showing topic: {name}"));
            }
            Err(err) => self.set_status_message(format!("Failed to describe topic: {err}")),
        }
    }

    pub fn describe_group(&mut self, group_id: &str) {
        let Some(conn) = self.connection() else {
            return;
        };
        let manager = GroupManager::new(conn.client);
        match self.runtime.block_on(manager.describe_group(group_id)) {
            Ok(details) => {
                self.set_content(
                    View::GroupDetails(group_id.to_string()),
                    views::group_details(&details),
                );
                self.set_status_message(format!("Showing group: {group_id}"));
            }
            Err(err) => self.set_status_message(format!("Failed to describe group: {err}")),
        }
    }

    pub fn show_profiles(&mut self) {
        let lines = views::profile_table(self.profiles.all_profiles(), self.active_profile_name());
        let count = self.profiles.all_profiles().len();
        self.set_content(View::Profiles, lines);
        self.set_status_message(format!("Showing {count} profiles"));
    }

    /// Switch the in-memory active profile.
    pub fn use_profile(&mut self, name: &str) {
        if self.active_profile_name() == Some(name) {
            self.set_status_message(format!("Already using profile: {name}"));
            return;
        }
        match self.profiles.set_active_profile(name) {
            Ok(()) => {
                self.stop_live();
                tracing::info!(profile = name, "switched active profile");
                if self.view == View::Profiles {
                    self.show_profiles();
                }
                self.set_status_message(format!("Switched to profile: {name}"));
            }
            Err(_) => self.set_status_message(format!("Profile not found: {name}")),
        }
    }

    pub fn show_sessions(&mut self) {
        let sessions = self
            .active_profile_name()
            .and_then(|name| self.connections.cached(name))
            .map(|conn| conn.sessions.active_sessions())
            .unwrap_or_default();
        let count = sessions.len();
        self.set_content(View::Sessions, views::session_table(&sessions));
        self.set_status_message(format!("Showing {count} active consumers"));
    }

    /// Re-run whatever produced the current view.
    pub fn refresh(&mut self) {
        match self.view.clone() {
            View::Topics => self.show_topics(),
            View::Groups => self.show_groups(),
            View::Profiles => self.show_profiles(),
            View::Sessions => self.show_sessions(),
            View::TopicDetails(name) => self.describe_topic(&name),
            View::GroupDetails(id) => self.describe_group(&id),
            View::Help | View::Messages(_) | View::Cleared => {
                self.set_status_message("Nothing to refresh")
            }
        }
    }

    // ------------------------------------------------------------------
    // Live messages
    // ------------------------------------------------------------------

    /// Start (or rejoin) a session and show its messages as they arrive.
    ///
    /// `from_beginning` only applies when no session exists for the key yet.
    pub fn consume(&mut self, topic: &str, partition: i32, group_id: &str, from_beginning: bool) {
        let Some(conn) = self.connection() else {
            return;
        };

        let started = self.runtime.block_on(conn.sessions.start_consumer(
            topic,
            partition,
            group_id,
            from_beginning,
        ));
        match started {
            Ok(stream) => {
                let replaced = self
                    .live
                    .as_ref()
                    .is_some_and(|previous| !previous.stream.same_session(&stream));
                if replaced {
                    self.stop_live();
                }
                let info = stream.info().clone();
                self.set_content(View::Messages(info), Vec::new());
                self.set_status_message(format!(
                    "Consuming {topic} partition {partition} (group {group_id})"
                ));
                self.live = Some(LiveFeed {
                    stream,
                    connection: conn,
                    received: 0,
                });
            }
            Err(err) => self.set_status_message(format!("Failed to start consumer: {err}")),
        }
    }

    /// Stop the session feeding the Messages view.
    pub fn stop_consume(&mut self) {
        match self.live.as_ref().map(|feed| feed.stream.info().clone()) {
            Some(info) => {
                self.stop_live();
                self.set_status_message(format!(
                    "Stopped consumer for {} partition {}",
                    info.topic, info.partition
                ));
            }
            None => self.set_status_message("No active consumer"),
        }
    }

    fn stop_live(&mut self) {
        if let Some(feed) = self.live.take() {
            let info = feed.stream.info();
            if let Err(err) =
                feed.connection
                    .sessions
                    .stop_consumer(&info.topic, &info.group_id, info.partition)
            {
                tracing::debug!(error = %err, "live session already gone");
            }
        }
    }

    pub fn is_consuming(&self) -> bool {
        self.live.is_some()
    }

    /// Move pending messages and errors from the live session into the view.
    ///
    /// Only drains while the Messages view is showing; otherwise messages wait
    /// in the session's bounded channel. Returns the number of lines added.
    pub fn poll_live(&mut self) -> usize {
        if !matches!(self.view, View::Messages(_)) {
            return 0;
        }
        let Some(feed) = self.live.as_mut() else {
            return 0;
        };

        let follow = self.scroll_offset >= self.content.len().saturating_sub(visible_lines(self.height));
        let before = self.content.len();
        let mut ended = false;

        for _ in 0..DRAIN_PER_TICK {
            match feed.stream.try_recv() {
                Ok(message) => {
                    feed.received += 1;
                    self.content.extend(views::message_lines(&message));
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    ended = true;
                    break;
                }
            }
        }
        while let Ok(err) = feed.stream.try_recv_error() {
            self.content.push(format!("! {err}"));
        }

        let added = self.content.len() - before;
        let info = feed.stream.info().clone();
        let received = feed.received;

        if self.content.len() > MAX_MESSAGE_LINES {
            let excess = self.content.len() - MAX_MESSAGE_LINES;
            self.content.drain(..excess);
            self.scroll_offset = self.scroll_offset.saturating_sub(excess);
        }

        if ended {
            self.live = None;
            self.set_status_message(format!(
                "Consumer for {} partition {} ended after {received} messages",
                info.topic, info.partition
            ));
        } else if added > 0 {
            self.set_status_message(format!(
                "Consuming {} partition {} (group {}): {received} messages",
                info.topic, info.partition, info.group_id
            ));
        }

        if follow {
            self.scroll_to_bottom();
        } else {
            self.clamp_scroll();
        }
        added
    }

    /// Stop every session and close every connection.
    pub fn shutdown(&mut self) {
        self.live = None;
        self.runtime.block_on(self.connections.close_all());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Profile};
    use crate::connection::FixedConnector;
    use kim_adapters::memory::MemoryBroker;
    use std::time::{Duration, Instant};
    use tokio::runtime::Runtime;

    fn config_with(profiles: &[&str], active: Option<&str>) -> Config {
        let mut config = Config::default();
        for name in profiles {
            config
                .add_profile(Profile::kafka(*name, "localhost:9092"))
                .unwrap();
        }
        if let Some(active) = active {
            config.set_active_profile(active).unwrap();
        }
        config
    }

    fn setup(config: Config) -> (Runtime, MemoryBroker, App) {
        let runtime = Runtime::new().unwrap();
        let broker = MemoryBroker::new();
        let connector = Arc::new(FixedConnector::new(Arc::new(broker.clone())));
        let connections = Arc::new(ConnectionManager::new(connector));
        let app = App::new(Box::new(config), connections, runtime.handle().clone());
        (runtime, broker, app)
    }

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    fn poll_until(app: &mut App, mut done: impl FnMut(&App) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(3);
        while !done(app) {
            assert!(Instant::now() < deadline, "timed out waiting for live messages");
            app.poll_live();
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn starts_on_help() {
        let (_rt, _broker, app) = setup(Config::default());
        assert_eq!(app.view, View::Help);
        assert_eq!(app.mode, InputMode::Normal);
        assert_eq!(app.status_message, "Ready - Type :help for commands");
        assert!(app.content[0].starts_with("KIM"));
        assert!(app.running);
    }

    #[test]
    fn go_to_bottom_uses_visible_lines() {
        let (_rt, _broker, mut app) = setup(Config::default());
        app.resize(80, 10);
        app.content = numbered(20);

        assert_eq!(app.visible_lines(), 6);
        app.scroll_to_bottom();
        assert_eq!(app.scroll_offset, 14);
    }

    #[test]
    fn scrolling_stays_in_bounds() {
        let (_rt, _broker, mut app) = setup(Config::default());
        app.resize(80, 10);
        app.content = numbered(20);

        let ops: [fn(&mut App); 6] = [
            App::scroll_down,
            App::page_down,
            App::page_down,
            App::page_down,
            App::scroll_up,
            App::page_up,
        ];
        for _ in 0..5 {
            for op in ops {
                op(&mut app);
                assert!(app.scroll_offset <= app.max_scroll());
            }
        }

        app.scroll_to_bottom();
        app.scroll_down();
        assert_eq!(app.scroll_offset, 14);
        assert_eq!(app.status_message, "Already at bottom");

        app.scroll_to_top();
        app.scroll_up();
        assert_eq!(app.scroll_offset, 0);
        assert_eq!(app.status_message, "Already at top");
    }

    #[test]
    fn page_down_clamps_to_max_offset() {
        let (_rt, _broker, mut app) = setup(Config::default());
        app.resize(80, 10);
        app.content = numbered(20);

        app.page_down();
        assert_eq!(app.scroll_offset, 6);
        app.page_down();
        assert_eq!(app.scroll_offset, 12);
        app.page_down();
        assert_eq!(app.scroll_offset, 14);
        app.page_up();
        assert_eq!(app.scroll_offset, 8);
    }

    #[test]
    fn short_content_never_scrolls() {
        let (_rt, _broker, mut app) = setup(Config::default());
        app.resize(80, 24);
        app.content = numbered(3);
        app.scroll_to_bottom();
        app.page_down();
        app.scroll_down();
        assert_eq!(app.scroll_offset, 0);
    }

    #[test]
    fn shrinking_the_terminal_clamps_scroll() {
        let (_rt, _broker, mut app) = setup(Config::default());
        app.resize(80, 10);
        app.content = numbered(20);
        app.scroll_to_bottom();

        app.resize(80, 30);
        assert_eq!(app.scroll_offset, 0);

        app.resize(0, 0);
        assert_eq!((app.width, app.height), (80, 24));
    }

    #[test]
    fn search_jumps_two_lines_above_match() {
        let (_rt, _broker, mut app) = setup(Config::default());
        app.resize(80, 10);
        app.content = numbered(20);
        app.content[9] = "Orders topic".to_string();

        app.search("ORDERS");
        assert_eq!(app.scroll_offset, 7);
        assert_eq!(app.status_message, "Found 'ORDERS' at line 10");

        app.content[1] = "orders again".to_string();
        app.search("orders");
        assert_eq!(app.scroll_offset, 0);

        app.search("missing");
        assert_eq!(app.scroll_offset, 0);
        assert_eq!(app.status_message, "Pattern not found: missing");
    }

    #[test]
    fn search_near_the_end_is_clamped() {
        let (_rt, _broker, mut app) = setup(Config::default());
        app.resize(80, 10);
        app.content = numbered(20);

        app.search("line 19");
        assert_eq!(app.scroll_offset, 14);
    }

    #[test]
    fn escape_returns_to_normal_with_empty_buffer() {
        let (_rt, _broker, mut app) = setup(Config::default());

        app.enter_command_mode();
        app.input_push('t');
        app.cancel_input();
        assert_eq!(app.mode, InputMode::Normal);
        assert!(app.command_buffer.is_empty());
        assert_eq!(app.status_message, "Command cancelled");

        app.enter_search_mode();
        app.input_push('x');
        app.cancel_input();
        assert_eq!(app.mode, InputMode::Normal);
        assert!(app.search_buffer.is_empty());
        assert_eq!(app.status_message, "Search cancelled");
    }

    #[test]
    fn topics_without_active_profile_keep_content() {
        let (_rt, _broker, mut app) = setup(config_with(&["local"], None));
        let before = app.content.clone();

        app.show_topics();
        assert_eq!(app.status_message, "No active profile set");
        assert_eq!(app.content, before);
        assert_eq!(app.view, View::Help);
    }

    #[test]
    fn topics_are_listed_for_active_profile() {
        let (_rt, broker, mut app) = setup(config_with(&["local"], Some("local")));
        broker.add_topic("orders", 3);
        broker.add_topic("audit", 1);
        app.scroll_offset = 3;

        app.show_topics();
        assert_eq!(app.view, View::Topics);
        assert_eq!(app.status_message, "Showing 2 topics");
        assert_eq!(app.scroll_offset, 0);
        assert!(app.content.iter().any(|l| l.starts_with("audit")));
        assert!(app.content.iter().any(|l| l.starts_with("orders")));
    }

    #[test]
    fn connection_failures_become_status() {
        let (_rt, broker, mut app) = setup(config_with(&["local"], Some("local")));
        broker.disconnect();

        app.show_topics();
        assert!(app.status_message.starts_with("Failed to connect:"));
        assert_eq!(app.view, View::Help);
    }

    #[test]
    fn refresh_reruns_the_current_view() {
        let (_rt, broker, mut app) = setup(config_with(&["local"], Some("local")));
        broker.add_topic("orders", 1);
        app.show_topics();

        broker.add_topic("payments", 1);
        app.refresh();
        assert_eq!(app.status_message, "Showing 2 topics");

        app.clear();
        app.refresh();
        assert_eq!(app.status_message, "Nothing to refresh");
    }

    #[test]
    fn unknown_profile_leaves_active_profile_unchanged() {
        let (_rt, _broker, mut app) = setup(config_with(&["local", "prod"], Some("local")));

        app.use_profile("ghost");
        assert_eq!(app.status_message, "Profile not found: ghost");
        assert_eq!(app.active_profile_name(), Some("local"));

        app.use_profile("prod");
        assert_eq!(app.status_message, "Switched to profile: prod");
        assert_eq!(app.active_profile_name(), Some("prod"));
    }

    #[test]
    fn live_messages_are_appended_and_followed() {
        let (_rt, broker, mut app) = setup(config_with(&["local"], Some("local")));
        broker.add_topic("orders", 1);
        app.resize(80, 10);

        app.consume("orders", 0, "kim-interactive", false);
        assert!(matches!(app.view, View::Messages(_)));
        assert!(app.is_consuming());

        // Newest start: wait for the reader before producing.
        let deadline = Instant::now() + Duration::from_secs(3);
        while broker.reader_count("orders", 0) == 0 {
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(5));
        }
        for i in 0..5 {
            broker
                .append("orders", 0, Some(b"k"), format!("v{i}").as_bytes())
                .unwrap();
        }

        poll_until(&mut app, |app| {
            app.content.iter().filter(|l| l.starts_with("Value: ")).count() == 5
        });
        assert_eq!(app.scroll_offset, app.max_scroll());
        assert!(app.status_message.ends_with("5 messages"));

        app.stop_consume();
        assert!(!app.is_consuming());
        assert_eq!(app.status_message, "Stopped consumer for orders partition 0");
    }

    #[test]
    fn live_session_end_is_reported() {
        let (_rt, broker, mut app) = setup(config_with(&["local"], Some("local")));
        broker.add_topic("orders", 1);

        app.consume("orders", 0, "grp1", false);
        broker.finish_partition("orders", 0).unwrap();

        poll_until(&mut app, |app| !app.is_consuming());
        assert!(app.status_message.contains("ended after 0 messages"));
    }

    #[test]
    fn sessions_view_lists_live_consumers() {
        let (_rt, broker, mut app) = setup(config_with(&["local"], Some("local")));
        broker.add_topic("orders", 2);

        app.consume("orders", 1, "grp1", false);
        app.show_sessions();
        assert_eq!(app.view, View::Sessions);
        assert_eq!(app.status_message, "Showing 1 active consumers");
        assert!(app
            .content
            .iter()
            .any(|l| l.starts_with("orders") && l.contains("grp1")));
    }

    #[test]
    fn message_view_is_capped() {
        let (_rt, broker, mut app) = setup(config_with(&["local"], Some("local")));
        broker.add_topic("orders", 1);
        // Three lines per keyless message.
        for i in 0..4_000 {
            broker
                .append("orders", 0, None, format!("v{i}").as_bytes())
                .unwrap();
        }

        app.consume("orders", 0, "grp1", true);
        poll_until(&mut app, |app| {
            app.live.as_ref().is_some_and(|feed| feed.received == 4_000)
        });

        assert_eq!(app.content.len(), MAX_MESSAGE_LINES);
        assert_eq!(app.content[MAX_MESSAGE_LINES - 2], "Value: v3999");
        assert_eq!(app.scroll_offset, app.max_scroll());
    }

    #[test]
    fn render_is_idempotent() {
        use ratatui::backend::TestBackend;
        use ratatui::Terminal;

        let (_rt, _broker, mut app) = setup(config_with(&["local"], Some("local")));
        app.resize(60, 12);
        app.enter_command_mode();
        app.input_push('t');

        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|frame| crate::ui::render(frame, &app)).unwrap();
        let first = terminal.backend().buffer().clone();
        terminal.draw(|frame| crate::ui::render(frame, &app)).unwrap();
        let second = terminal.backend().buffer().clone();

        assert_eq!(first, second);
        let bottom: String = (0..60)
            .map(|x| second[(x, 11)].symbol().to_string())
            .collect();
        assert_eq!(bottom.trim_end(), ":t");
        let top: String = (0..60).map(|x| second[(x, 0)].symbol().to_string()).collect();
        assert!(top.starts_with("kim | Profile: local | View: help"));
    }
}
