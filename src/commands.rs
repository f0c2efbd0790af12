//! Command-line parsing and dispatch for Command mode.
//!
//! The first whitespace-delimited token is the verb (case-sensitive); the
//! rest are arguments.

use crate::app::App;

/// Group used by `consume` when none is given.
pub const DEFAULT_CONSUMER_GROUP: &str = "kim-interactive";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileAction {
    List,
    Use(String),
    Unknown(String),
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Topics,
    Groups,
    Profile(ProfileAction),
    Refresh,
    Clear,
    Quit,
    Consume {
        topic: String,
        partition: i32,
        group_id: String,
        from_beginning: bool,
    },
    Stop,
    Sessions,
    Describe(String),
    Group(String),
    /// Recognized verb with missing or malformed arguments.
    Usage(String),
    Unknown(String),
}

impl Command {
    /// Parse a command line; `None` for a blank line.
    pub fn parse(line: &str) -> Option<Command> {
        let mut parts = line.split_whitespace();
        let verb = parts.next()?;
        let args: Vec<&str> = parts.collect();

        let command = match verb {
            "help" | "h" => Command::Help,
            "topics" | "t" => Command::Topics,
            "groups" | "g" => Command::Groups,
            "profile" | "p" => Command::Profile(match args.as_slice() {
                [] | ["list", ..] => ProfileAction::List,
                ["use", name, ..] => ProfileAction::Use(name.to_string()),
                ["use"] => return Some(Command::Usage("Usage: profile use <name>".into())),
                [other, ..] => ProfileAction::Unknown(other.to_string()),
            }),
            "refresh" | "r" => Command::Refresh,
            "clear" | "c" => Command::Clear,
            "quit" | "q" | "exit" => Command::Quit,
            "consume" => parse_consume(&args),
            "stop" => Command::Stop,
            "sessions" => Command::Sessions,
            "describe" => match args.first() {
                Some(topic) => Command::Describe(topic.to_string()),
                None => Command::Usage("Usage: describe <topic>".into()),
            },
            "group" => match args.first() {
                Some(id) => Command::Group(id.to_string()),
                None => Command::Usage("Usage: group <id>".into()),
            },
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }
}

fn parse_consume(args: &[&str]) -> Command {
    const USAGE: &str = "Usage: consume <topic> [partition] [group] [--from-beginning]";

    let is_flag = |a: &&str| *a == "--from-beginning" || *a == "-b";
    let from_beginning = args.iter().any(is_flag);
    let positional: Vec<&str> = args.iter().copied().filter(|a| !is_flag(a)).collect();

    let Some(topic) = positional.first() else {
        return Command::Usage(USAGE.into());
    };
    let partition = match positional.get(1) {
        Some(raw) => match raw.parse::<i32>() {
            Ok(p) if p >= 0 => p,
            _ => return Command::Usage(format!("Invalid partition: {raw}")),
        },
        None => 0,
    };
    let group_id = positional
        .get(2)
        .copied()
        .unwrap_or(DEFAULT_CONSUMER_GROUP);

    Command::Consume {
        topic: topic.to_string(),
        partition,
        group_id: group_id.to_string(),
        from_beginning,
    }
}

/// Parse and run one command line against the controller.
pub fn execute(app: &mut App, line: &str) {
    let Some(command) = Command::parse(line) else {
        return;
    };
    tracing::debug!(?command, "executing command");

    match command {
        Command::Help => app.show_help(),
        Command::Topics => app.show_topics(),
        Command::Groups => app.show_groups(),
        Command::Profile(ProfileAction::List) => app.show_profiles(),
        Command::Profile(ProfileAction::Use(name)) => app.use_profile(&name),
        Command::Profile(ProfileAction::Unknown(sub)) => {
            app.set_status_message(format!("Unknown profile command: {sub}"))
        }
        Command::Refresh => app.refresh(),
        Command::Clear => app.clear(),
        Command::Quit => app.quit(),
        Command::Consume {
            topic,
            partition,
            group_id,
            from_beginning,
        } => app.consume(&topic, partition, &group_id, from_beginning),
        Command::Stop => app.stop_consume(),
        Command::Sessions => app.show_sessions(),
        Command::Describe(topic) => app.describe_topic(&topic),
        Command::Group(id) => app.describe_group(&id),
        Command::Usage(usage) => app.set_status_message(usage),
        Command::Unknown(verb) => app.set_status_message(format!(
            "Unknown command: {verb}. Type 'help' for available commands."
        )),
    }
}
