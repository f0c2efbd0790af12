//! Error types for broker clients.

use thiserror::Error;

/// Errors reported by a [`BrokerClient`](crate::BrokerClient) or delivered on a
/// partition consumer's error stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The client is not connected to a cluster.
    #[error("Not connected to a cluster")]
    NotConnected,

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The broker rejected or failed a request.
    #[error("Broker error: {0}")]
    Broker(String),

    /// Topic, partition or group does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested offset is no longer (or not yet) available.
    #[error("Offset out of range for {topic}/{partition}")]
    OffsetOutOfRange { topic: String, partition: i32 },

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// Feature not supported by this client.
    #[error("Feature not supported: {0}")]
    Unsupported(String),

    /// The stream or client was closed.
    #[error("Stream closed")]
    Closed,
}

impl AdapterError {
    /// Whether a consumer that sees this error can never make progress again.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AdapterError::OffsetOutOfRange { .. } | AdapterError::Closed
        )
    }
}

#[cfg(feature = "kafka")]
impl From<rdkafka::error::KafkaError> for AdapterError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        use rdkafka::types::RDKafkaErrorCode;

        match err.rdkafka_error_code() {
            Some(RDKafkaErrorCode::OperationTimedOut) | Some(RDKafkaErrorCode::RequestTimedOut) => {
                AdapterError::Timeout
            }
            Some(RDKafkaErrorCode::UnknownTopicOrPartition)
            | Some(RDKafkaErrorCode::UnknownTopic)
            | Some(RDKafkaErrorCode::UnknownPartition)
            | Some(RDKafkaErrorCode::GroupIdNotFound) => AdapterError::NotFound(err.to_string()),
            Some(RDKafkaErrorCode::AllBrokersDown)
            | Some(RDKafkaErrorCode::BrokerTransportFailure)
            | Some(RDKafkaErrorCode::Authentication) => AdapterError::Connection(err.to_string()),
            _ => AdapterError::Broker(err.to_string()),
        }
    }
}
