//! Messages and the message operation requests.

use std::collections::BTreeMap;

/// A decoded message as delivered to a consumer.
///
/// `value` has already been through the formatter: pretty-printed JSON when the
/// payload parsed as JSON, the raw text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Milliseconds since the Unix epoch, 0 when the broker supplied none.
    pub timestamp_ms: i64,
    /// Empty when the record had no key.
    pub key: String,
    pub value: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "BTreeMap::is_empty"))]
    pub headers: BTreeMap<String, String>,
}

impl Message {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            ..Default::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Describes one live consumption session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsumerInfo {
    pub topic: String,
    pub partition: i32,
    pub group_id: String,
    pub from_beginning: bool,
}

/// A message to publish.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProduceRequest {
    pub topic: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub key: Option<String>,
    pub value: String,
    /// Explicit partition; the broker's partitioner decides when `None`.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub partition: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "BTreeMap::is_empty"))]
    pub headers: BTreeMap<String, String>,
}

impl ProduceRequest {
    pub fn new(topic: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Where a produced message landed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProduceResponse {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// Parameters of a consumption session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsumeRequest {
    pub topic: String,
    pub partition: i32,
    pub group_id: String,
    pub from_beginning: bool,
}

impl ConsumeRequest {
    pub fn new(topic: impl Into<String>, partition: i32, group_id: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            group_id: group_id.into(),
            from_beginning: false,
        }
    }

    pub fn from_beginning(mut self, from_beginning: bool) -> Self {
        self.from_beginning = from_beginning;
        self
    }

    pub fn info(&self) -> ConsumerInfo {
        ConsumerInfo {
            topic: self.topic.clone(),
            partition: self.partition,
            group_id: self.group_id.clone(),
            from_beginning: self.from_beginning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_builder() {
        let msg = Message::new("orders", 2, 7)
            .with_key("k")
            .with_value("v")
            .with_timestamp_ms(1_700_000_000_000)
            .with_header("a", "1");
        assert_eq!(msg.partition, 2);
        assert_eq!(msg.offset, 7);
        assert_eq!(msg.key, "k");
        assert_eq!(msg.headers.len(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn produce_request_json_omits_unset_fields() {
        let req = ProduceRequest::new("orders", "hello");
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("key").is_none());
        assert!(json.get("partition").is_none());
        assert!(json.get("headers").is_none());
        assert_eq!(json["value"], "hello");
    }

    #[test]
    fn consume_request_info() {
        let req = ConsumeRequest::new("orders", 0, "grp1").from_beginning(true);
        let info = req.info();
        assert_eq!(info.group_id, "grp1");
        assert!(info.from_beginning);
    }
}
