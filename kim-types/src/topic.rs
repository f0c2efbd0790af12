//! Topic metadata.

use std::collections::BTreeMap;

use crate::Pagination;

/// A row of a topic listing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopicInfo {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i32,
    /// Non-default configuration entries, when the broker reported them.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "BTreeMap::is_empty"))]
    pub configs: BTreeMap<String, String>,
}

/// One partition of a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionInfo {
    pub id: i32,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
    /// Earliest available offset.
    pub low_watermark: i64,
    /// Offset of the next message to be written.
    pub high_watermark: i64,
}

impl PartitionInfo {
    pub fn message_count(&self) -> i64 {
        (self.high_watermark - self.low_watermark).max(0)
    }
}

/// Full description of a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopicDetails {
    pub name: String,
    pub partitions: Vec<PartitionInfo>,
    pub replication_factor: i32,
    pub configs: BTreeMap<String, String>,
}

/// A page of topics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TopicList {
    pub topics: Vec<TopicInfo>,
    pub pagination: Pagination,
}

/// Parameters for creating a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CreateTopicRequest {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub configs: BTreeMap<String, String>,
}

impl CreateTopicRequest {
    pub fn new(name: impl Into<String>, partitions: i32, replication_factor: i32) -> Self {
        Self {
            name: name.into(),
            partitions,
            replication_factor,
            configs: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configs.insert(key.into(), value.into());
        self
    }
}
