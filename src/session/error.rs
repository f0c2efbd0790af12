use std::fmt;

use kim_adapters::AdapterError;
use thiserror::Error;

/// Identifies one consumption stream: (topic, consumer group, partition).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    pub topic: String,
    pub group_id: String,
    pub partition: i32,
}

impl SessionKey {
    pub fn new(topic: impl Into<String>, group_id: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            group_id: group_id.into(),
            partition,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.topic, self.group_id, self.partition)
    }
}

/// Errors from the session registry and batch consumption.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The broker client is not connected.
    #[error("client not connected")]
    NotConnected,

    /// No active session has this key.
    #[error("consumer not found: {key}")]
    SessionNotFound { key: SessionKey },

    /// Opening the partition consumer failed; nothing was registered.
    #[error("failed to create partition consumer for {key}: {source}")]
    ConsumerCreation {
        key: SessionKey,
        #[source]
        source: AdapterError,
    },

    /// An error arrived on the stream before any message.
    #[error("consumer error: {0}")]
    Stream(AdapterError),

    #[error("invalid consume request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display() {
        assert_eq!(SessionKey::new("orders", "grp1", 3).to_string(), "orders-grp1-3");
    }

    #[test]
    fn creation_error_keeps_cause() {
        let err = SessionError::ConsumerCreation {
            key: SessionKey::new("orders", "grp1", 0),
            source: AdapterError::NotFound("orders/0".into()),
        };
        assert_eq!(
            err.to_string(),
            "failed to create partition consumer for orders-grp1-0: Not found: orders/0"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
