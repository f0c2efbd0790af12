//! The broker client facade and the partition consumer handle.
//!
//! ```text
//!   BrokerClient::consume_partition
//!            │
//!            ▼
//!   ┌──────────────────┐  records  ┌───────────────────┐
//!   │  reader task     │ ────────▶ │ PartitionConsumer │
//!   │  (PartitionFeed) │  errors   │  (owned by pump)  │
//!   │                  │ ────────▶ │                   │
//!   │                  │ ◀──────── │  close() / drop   │
//!   └──────────────────┘  shutdown └───────────────────┘
//! ```

use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use kim_types::{
    CreateTopicRequest, GroupDetails, GroupInfo, ProduceRequest, TopicDetails, TopicInfo,
};

use crate::AdapterError;

/// Capacity of the raw record and error channels between a reader and its handle.
pub const FEED_CAPACITY: usize = 256;

/// Where a partition read starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOffset {
    /// The earliest retained offset.
    Oldest,
    /// Only messages produced after the read starts.
    Newest,
}

impl StartOffset {
    pub fn from_beginning(from_beginning: bool) -> Self {
        if from_beginning {
            StartOffset::Oldest
        } else {
            StartOffset::Newest
        }
    }
}

/// An undecoded record as read from a partition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp_ms: Option<i64>,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub headers: Vec<(String, Vec<u8>)>,
}

/// What the next read from a [`PartitionConsumer`] produced.
#[derive(Debug)]
pub enum ConsumerEvent {
    Record(RawRecord),
    Error(AdapterError),
    /// The record stream ended; nothing more will arrive.
    Closed,
}

/// Exclusive handle on one partition read.
///
/// Dropping the handle stops the reader just like [`close`](Self::close).
#[derive(Debug)]
pub struct PartitionConsumer {
    pub topic: String,
    pub partition: i32,
    pub records: mpsc::Receiver<RawRecord>,
    pub errors: mpsc::Receiver<AdapterError>,
    errors_open: bool,
    shutdown: Option<oneshot::Sender<()>>,
}

/// The producing half of a partition read, held by the reader task.
#[derive(Debug)]
pub struct PartitionFeed {
    pub records: mpsc::Sender<RawRecord>,
    pub errors: mpsc::Sender<AdapterError>,
    shutdown: oneshot::Receiver<()>,
    stopped: bool,
}

impl PartitionConsumer {
    /// Create a connected handle/feed pair.
    pub fn channel(topic: impl Into<String>, partition: i32) -> (PartitionFeed, PartitionConsumer) {
        let (record_tx, record_rx) = mpsc::channel(FEED_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(FEED_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let feed = PartitionFeed {
            records: record_tx,
            errors: error_tx,
            shutdown: shutdown_rx,
            stopped: false,
        };
        let consumer = PartitionConsumer {
            topic: topic.into(),
            partition,
            records: record_rx,
            errors: error_rx,
            errors_open: true,
            shutdown: Some(shutdown_tx),
        };
        (feed, consumer)
    }

    /// Wait for the next record or error.
    ///
    /// Cancel safe. A closed error stream is not an end of stream; only the
    /// record stream closing yields [`ConsumerEvent::Closed`].
    pub async fn next_event(&mut self) -> ConsumerEvent {
        loop {
            tokio::select! {
                record = self.records.recv() => {
                    return match record {
                        Some(record) => ConsumerEvent::Record(record),
                        None => ConsumerEvent::Closed,
                    };
                }
                err = self.errors.recv(), if self.errors_open => match err {
                    Some(err) => return ConsumerEvent::Error(err),
                    None => self.errors_open = false,
                },
            }
        }
    }

    /// Stop the upstream reader.
    pub fn close(&mut self) -> Result<(), AdapterError> {
        if let Some(tx) = self.shutdown.take() {
            // The reader may already be gone; that is a successful close too.
            let _ = tx.send(());
        }
        self.records.close();
        self.errors.close();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_none()
    }
}

impl Drop for PartitionConsumer {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl PartitionFeed {
    /// Deliver a record, giving up when the handle is closed.
    ///
    /// Returns `false` once the reader should stop.
    pub async fn send_record(&mut self, record: RawRecord) -> bool {
        if self.stopped {
            return false;
        }
        tokio::select! {
            _ = &mut self.shutdown => {
                self.stopped = true;
                false
            }
            sent = self.records.send(record) => sent.is_ok(),
        }
    }

    /// Deliver an error without waiting; dropped if the channel is full.
    pub fn send_error(&self, err: AdapterError) -> bool {
        !self.stopped && !self.errors.is_closed() && self.errors.try_send(err).is_ok()
    }

    /// Resolves when the handle asks the reader to stop.
    pub async fn stopped(&mut self) {
        if self.stopped {
            return;
        }
        let _ = (&mut self.shutdown).await;
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped || self.records.is_closed()
    }
}

/// Connection handle to a cluster: admin, produce and partition reads.
///
/// Implementations are shared behind `Arc<dyn BrokerClient>`; every method
/// takes `&self`.
#[async_trait]
pub trait BrokerClient: Send + Sync + Debug {
    /// Whether the client currently holds a usable connection.
    fn is_connected(&self) -> bool;

    async fn list_topics(&self) -> Result<Vec<TopicInfo>, AdapterError>;

    async fn describe_topic(&self, name: &str) -> Result<TopicDetails, AdapterError>;

    async fn create_topic(&self, request: &CreateTopicRequest) -> Result<(), AdapterError>;

    async fn delete_topic(&self, name: &str) -> Result<(), AdapterError>;

    async fn list_groups(&self) -> Result<Vec<GroupInfo>, AdapterError>;

    async fn describe_group(&self, group_id: &str) -> Result<GroupDetails, AdapterError>;

    async fn delete_group(&self, group_id: &str) -> Result<(), AdapterError>;

    /// Publish one message, returning the `(partition, offset)` it was written to.
    async fn send_message(&self, request: &ProduceRequest) -> Result<(i32, i64), AdapterError>;

    /// Open an exclusive read of one partition.
    async fn consume_partition(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<PartitionConsumer, AdapterError>;

    /// Release the connection. Later calls fail with `NotConnected`.
    async fn close(&self) -> Result<(), AdapterError>;
}
