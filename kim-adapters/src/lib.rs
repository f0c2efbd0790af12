//! # kim-adapters
//!
//! The broker client facade used by kim. Everything above this crate talks to
//! a cluster through [`BrokerClient`]; a partition read is a
//! [`PartitionConsumer`] handle that yields [`RawRecord`]s and
//! [`AdapterError`]s until it is closed.
//!
//! ## Implementations
//!
//! - [`MemoryBroker`](memory::MemoryBroker) - in-process broker with
//!   append-only partition logs. Always built; used by tests and demos.
//! - **Kafka** (`kafka` feature) - [`KafkaClient`](kafka::KafkaClient) on top
//!   of rdkafka (librdkafka bindings).
//!
//! ## Quick Start
//!
//! ```rust
//! use kim_adapters::memory::MemoryBroker;
//! use kim_adapters::{BrokerClient, StartOffset};
//! use kim_types::ProduceRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = MemoryBroker::new();
//!     broker.add_topic("orders", 1);
//!
//!     broker.send_message(&ProduceRequest::new("orders", "hello")).await?;
//!
//!     let mut consumer = broker
//!         .consume_partition("orders", 0, StartOffset::Oldest)
//!         .await?;
//!     let record = consumer.records.recv().await.ok_or("stream closed")?;
//!     assert_eq!(record.value.as_deref(), Some(&b"hello"[..]));
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod memory;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use client::{BrokerClient, PartitionConsumer, PartitionFeed, RawRecord, StartOffset};
pub use error::AdapterError;

// Re-export types for convenience
pub use kim_types::{
    CreateTopicRequest, GroupDetails, GroupInfo, ProduceRequest, TopicDetails, TopicInfo,
};
