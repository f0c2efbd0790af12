use std::cmp::Ordering;
use std::sync::Arc;

use kim_adapters::{AdapterError, BrokerClient};
use kim_types::{CreateTopicRequest, ListOptions, Pagination, TopicDetails, TopicInfo, TopicList};

use super::{matches_pattern, ManagerError};

/// Topic administration over a broker client.
#[derive(Debug, Clone)]
pub struct TopicManager {
    client: Arc<dyn BrokerClient>,
}

impl TopicManager {
    pub fn new(client: Arc<dyn BrokerClient>) -> Self {
        Self { client }
    }

    fn ensure_connected(&self) -> Result<(), ManagerError> {
        if self.client.is_connected() {
            Ok(())
        } else {
            Err(AdapterError::NotConnected.into())
        }
    }

    /// List topics matching `opts.pattern`, sorted by `name`, `partitions` or
    /// `replication_factor` (unknown fields sort by name), then paged.
    pub async fn list_topics(&self, opts: &ListOptions) -> Result<TopicList, ManagerError> {
        self.ensure_connected()?;
        let mut topics: Vec<TopicInfo> = self
            .client
            .list_topics()
            .await?
            .into_iter()
            .filter(|t| {
                opts.pattern
                    .as_deref()
                    .is_none_or(|p| matches_pattern(&t.name, p))
            })
            .collect();

        topics.sort_by(|a, b| {
            let ord = match opts.sort_by.as_str() {
                "partitions" => a.partitions.cmp(&b.partitions),
                "replication_factor" => a.replication_factor.cmp(&b.replication_factor),
                _ => Ordering::Equal,
            }
            .then_with(|| a.name.cmp(&b.name));
            if opts.order.is_desc() {
                ord.reverse()
            } else {
                ord
            }
        });

        let (topics, pagination) = Pagination::paginate(topics, opts);
        tracing::debug!(
            returned = topics.len(),
            total = pagination.total_items,
            "listed topics"
        );
        Ok(TopicList { topics, pagination })
    }

    pub async fn describe_topic(&self, name: &str) -> Result<TopicDetails, ManagerError> {
        self.ensure_connected()?;
        if name.trim().is_empty() {
            return Err(ManagerError::InvalidRequest("topic name is required".into()));
        }
        Ok(self.client.describe_topic(name).await?)
    }

    pub async fn create_topic(&self, request: &CreateTopicRequest) -> Result<(), ManagerError> {
        self.ensure_connected()?;
        if request.name.trim().is_empty() {
            return Err(ManagerError::InvalidRequest("topic name is required".into()));
        }
        if request.partitions < 1 {
            return Err(ManagerError::InvalidRequest(
                "partitions must be at least 1".into(),
            ));
        }
        if request.replication_factor < 1 {
            return Err(ManagerError::InvalidRequest(
                "replication factor must be at least 1".into(),
            ));
        }
        self.client.create_topic(request).await?;
        tracing::info!(
            topic = %request.name,
            partitions = request.partitions,
            replication_factor = request.replication_factor,
            "topic created"
        );
        Ok(())
    }

    pub async fn delete_topic(&self, name: &str) -> Result<(), ManagerError> {
        self.ensure_connected()?;
        self.client.delete_topic(name).await?;
        tracing::info!(topic = %name, "topic deleted");
        Ok(())
    }
}

/// Humanize well-known topic configuration values.
pub fn format_config_value(key: &str, value: &str) -> String {
    match key {
        "retention.ms" | "delete.retention.ms" | "segment.ms" => format_time_ms(value),
        "retention.bytes" | "segment.bytes" | "max.message.bytes" | "index.interval.bytes" => {
            format_bytes(value)
        }
        "cleanup.policy" => match value {
            "delete" => "Delete (messages are deleted after retention period)".to_string(),
            "compact" => "Compact (only latest messages per key are kept)".to_string(),
            "compact,delete" | "delete,compact" => "Compact and Delete".to_string(),
            other => other.to_string(),
        },
        "compression.type" => {
            let mut chars = value.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        "unclean.leader.election.enable" | "preallocate" => match value {
            "true" => "Enabled".to_string(),
            _ => "Disabled".to_string(),
        },
        _ => value.to_string(),
    }
}

fn format_time_ms(value: &str) -> String {
    let Ok(ms) = value.parse::<i64>() else {
        return value.to_string();
    };
    match ms {
        -1 => return "unlimited".to_string(),
        0 => return "0".to_string(),
        _ => {}
    }

    let secs = ms / 1_000;
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        (secs / 3_600) % 24,
        (secs / 60) % 60,
        secs % 60,
    );
    if days > 0 {
        format!("{days} days {hours} hours")
    } else if hours > 0 {
        format!("{hours} hours {minutes} minutes")
    } else if minutes > 0 {
        format!("{minutes} minutes {seconds} seconds")
    } else {
        format!("{seconds} seconds")
    }
}

fn format_bytes(value: &str) -> String {
    let Ok(bytes) = value.parse::<i64>() else {
        return value.to_string();
    };
    const UNIT: i64 = 1024;
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    match bytes {
        -1 => return "unlimited".to_string(),
        b if b < UNIT => return format!("{b} B"),
        _ => {}
    }

    let mut div = UNIT;
    let mut exp = 1;
    while bytes / div >= UNIT && exp < UNITS.len() - 1 {
        div *= UNIT;
        exp += 1;
    }
    format!("{:.2} {}", bytes as f64 / div as f64, UNITS[exp])
}
