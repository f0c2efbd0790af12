//! Text builders for every view.
//!
//! Each builder returns display lines; the interactive controller shows them
//! as content and the CLI prints them for `--format table`.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat};

use kim_types::{
    ConsumerInfo, GroupDetails, GroupList, Message, Pagination, ProduceResponse, TopicDetails,
    TopicList,
};

use crate::config::Profile;
use crate::manager::format_config_value;

const HELP: &str = "\
KIM - KAFKA MANAGEMENT TOOL
============================

COMMANDS:
  :help, :h               Show this help
  :topics, :t             List all topics
  :describe <topic>       Show topic details
  :groups, :g             List consumer groups
  :group <id>             Show consumer group details
  :profile, :p            List profiles
  :profile list           List all profiles
  :profile use <name>     Switch to profile
  :consume <topic> [partition] [group] [--from-beginning]
                          Follow messages from a partition
  :stop                   Stop following messages
  :sessions               List active consumers
  :refresh, :r            Refresh current view
  :clear, :c              Clear screen
  :q, :quit, :exit        Quit

NAVIGATION:
  j/Down                  Scroll down
  k/Up                    Scroll up
  f/PgDn                  Page down
  b/PgUp                  Page up
  g                       Go to top
  G                       Go to bottom
  r                       Refresh current view

SEARCH:
  /<pattern>              Search for pattern (case-insensitive)

MODES:
  :                       Enter command mode
  /                       Enter search mode
  Esc                     Exit current mode
  Ctrl+U                  Clear the command line

Press 'q' to quit or ':' to enter a command.";

/// Static help text.
pub fn help_lines() -> Vec<String> {
    HELP.lines().map(str::to_string).collect()
}

/// `[1,2,3]`
pub fn format_int_list(values: &[i32]) -> String {
    let joined: Vec<String> = values.iter().map(i32::to_string).collect();
    format!("[{}]", joined.join(","))
}

/// RFC 3339 with milliseconds, or `-` when there is no timestamp.
pub fn format_timestamp_ms(ms: i64) -> String {
    if ms <= 0 {
        return "-".to_string();
    }
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| ms.to_string())
}

fn page_footer(p: &Pagination, noun: &str) -> Option<String> {
    (p.total_pages > 1).then(|| {
        format!(
            "Page {} of {} ({} total {})",
            p.current_page, p.total_pages, p.total_items, noun
        )
    })
}

pub fn topic_table(list: &TopicList) -> Vec<String> {
    let mut lines = vec!["TOPICS".to_string(), "=".repeat(50), String::new()];
    if list.topics.is_empty() {
        lines.push("No topics found".to_string());
        return lines;
    }

    lines.push(format!(
        "{:<40} {:<10} {:<15}",
        "NAME", "PARTITIONS", "REPLICATION"
    ));
    lines.push("-".repeat(65));
    for t in &list.topics {
        lines.push(format!(
            "{:<40} {:<10} {:<15}",
            t.name, t.partitions, t.replication_factor
        ));
    }
    if let Some(footer) = page_footer(&list.pagination, "topics") {
        lines.push(String::new());
        lines.push(footer);
    }
    lines
}

pub fn topic_details(details: &TopicDetails) -> Vec<String> {
    let mut lines = vec![
        format!("Topic: {}", details.name),
        "=".repeat(50),
        format!("Partitions: {}", details.partitions.len()),
        format!("Replication Factor: {}", details.replication_factor),
        String::new(),
        format!(
            "{:<10} {:<8} {:<20} {:<20} {:<12} {:<12}",
            "PARTITION", "LEADER", "REPLICAS", "IN-SYNC", "LOW", "HIGH"
        ),
        "-".repeat(87),
    ];
    for p in &details.partitions {
        lines.push(format!(
            "{:<10} {:<8} {:<20} {:<20} {:<12} {:<12}",
            p.id,
            p.leader,
            format_int_list(&p.replicas),
            format_int_list(&p.isr),
            p.low_watermark,
            p.high_watermark
        ));
    }

    if !details.configs.is_empty() {
        lines.push(String::new());
        lines.push("Configuration:".to_string());
        lines.push(format!("{:<40} {}", "KEY", "VALUE"));
        lines.push("-".repeat(65));
        for (key, value) in &details.configs {
            lines.push(format!("{:<40} {}", key, format_config_value(key, value)));
        }
    }
    lines
}

pub fn group_table(list: &GroupList) -> Vec<String> {
    let mut lines = vec!["CONSUMER GROUPS".to_string(), "=".repeat(50), String::new()];
    if list.groups.is_empty() {
        lines.push("No consumer groups found".to_string());
        return lines;
    }

    lines.push(format!(
        "{:<40} {:<15} {:<15} {:<10}",
        "GROUP ID", "STATE", "PROTOCOL TYPE", "MEMBERS"
    ));
    lines.push("-".repeat(83));
    for g in &list.groups {
        lines.push(format!(
            "{:<40} {:<15} {:<15} {:<10}",
            g.group_id, g.state, g.protocol_type, g.members
        ));
    }
    if let Some(footer) = page_footer(&list.pagination, "groups") {
        lines.push(String::new());
        lines.push(footer);
    }
    lines
}

pub fn group_details(details: &GroupDetails) -> Vec<String> {
    let mut lines = vec![
        format!("Consumer Group: {}", details.group_id),
        "=".repeat(50),
        format!("State: {}", details.state),
        format!("Protocol Type: {}", details.protocol_type),
        format!("Protocol: {}", details.protocol),
        format!("Total Lag: {}", details.total_lag()),
    ];

    if details.members.is_empty() {
        lines.push(String::new());
        lines.push("No active members".to_string());
        return lines;
    }

    for (i, member) in details.members.iter().enumerate() {
        let member_lag: i64 = member.assignments.iter().map(|a| a.lag.max(0)).sum();
        lines.push(String::new());
        lines.push(format!("Member {}:", i + 1));
        lines.push(format!("  Member ID: {}", member.member_id));
        lines.push(format!("  Client ID: {}", member.client_id));
        lines.push(format!("  Host: {}", member.client_host));
        lines.push(format!("  Total Lag: {member_lag}"));
        if !member.assignments.is_empty() {
            lines.push(format!(
                "    {:<20} {:<10} {:<15} {:<15} {:<10}",
                "TOPIC", "PARTITION", "CURRENT OFFSET", "LOG END OFFSET", "LAG"
            ));
            for a in &member.assignments {
                lines.push(format!(
                    "    {:<20} {:<10} {:<15} {:<15} {:<10}",
                    a.topic, a.partition, a.current_offset, a.log_end_offset, a.lag
                ));
            }
        }
    }
    lines
}

pub fn profile_table(profiles: &BTreeMap<String, Profile>, active: Option<&str>) -> Vec<String> {
    let mut lines = vec!["PROFILES".to_string(), "=".repeat(50), String::new()];
    if profiles.is_empty() {
        lines.push("No profiles configured".to_string());
        lines.push("Add one with: kim profile add <name> --type kafka --bootstrap-servers <host:port>".to_string());
        return lines;
    }

    lines.push(format!(
        "{:<20} {:<10} {:<50} {:<8}",
        "NAME", "TYPE", "DETAILS", "ACTIVE"
    ));
    lines.push("-".repeat(91));
    for (name, profile) in profiles {
        let marker = if active == Some(name.as_str()) { "*" } else { "" };
        lines.push(format!(
            "{:<20} {:<10} {:<50} {:<8}",
            name,
            profile.kind,
            profile.details(),
            marker
        ));
    }
    lines
}

pub fn session_table(sessions: &[ConsumerInfo]) -> Vec<String> {
    let mut lines = vec!["ACTIVE CONSUMERS".to_string(), "=".repeat(50), String::new()];
    if sessions.is_empty() {
        lines.push("No active consumers".to_string());
        return lines;
    }

    lines.push(format!(
        "{:<40} {:<10} {:<30} {:<6}",
        "TOPIC", "PARTITION", "GROUP", "FROM"
    ));
    lines.push("-".repeat(89));
    for s in sessions {
        lines.push(format!(
            "{:<40} {:<10} {:<30} {:<6}",
            s.topic,
            s.partition,
            s.group_id,
            if s.from_beginning { "oldest" } else { "newest" }
        ));
    }
    lines
}

/// A message block: metadata line, key, value (one line per value line), headers, separator.
pub fn message_lines(message: &Message) -> Vec<String> {
    let mut lines = vec![format!(
        "Topic: {} | Partition: {} | Offset: {} | Timestamp: {}",
        message.topic,
        message.partition,
        message.offset,
        format_timestamp_ms(message.timestamp_ms)
    )];
    if !message.key.is_empty() {
        lines.push(format!("Key: {}", message.key));
    }

    let mut value = message.value.lines();
    lines.push(format!("Value: {}", value.next().unwrap_or_default()));
    lines.extend(value.map(|l| format!("       {l}")));

    if !message.headers.is_empty() {
        lines.push("Headers:".to_string());
        for (key, value) in &message.headers {
            lines.push(format!("  {key}: {value}"));
        }
    }
    lines.push("-".repeat(80));
    lines
}

pub fn produce_lines(response: &ProduceResponse) -> Vec<String> {
    vec![
        "Message produced successfully".to_string(),
        format!("Topic: {}", response.topic),
        format!("Partition: {}", response.partition),
        format!("Offset: {}", response.offset),
    ]
}
