//! Registry of live consumer sessions.
//!
//! ```text
//!  start_consumer(topic, partition, group)
//!        │
//!        ├─ key already live ──────────────▶ same ConsumerStream
//!        │
//!        └─ consume_partition ─▶ insert ─▶ spawn Pump ─▶ new ConsumerStream
//!
//!  stop_consumer(key) ─▶ remove entry ─▶ signal stop ─▶ pump closes channels
//! ```
//!
//! At most one session exists per `(topic, group, partition)`. The map lock
//! is never held across an await.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kim_adapters::{AdapterError, BrokerClient, StartOffset};
use kim_types::{ConsumerInfo, Message};
use parking_lot::Mutex;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};

use super::pump::Pump;
use super::{SessionError, SessionKey};

/// Capacity of a session's message channel.
pub const MESSAGE_BUFFER: usize = 100;
/// Capacity of a session's error channel.
pub const ERROR_BUFFER: usize = 10;

pub(crate) struct SessionEntry {
    pub id: u64,
    pub info: ConsumerInfo,
    pub stream: ConsumerStream,
    pub stop: watch::Sender<bool>,
}

pub(crate) type SessionMap = Arc<Mutex<HashMap<SessionKey, SessionEntry>>>;

/// Receiving side of a consumer session.
///
/// Clones share the same channels, so every clone observes one stream of
/// messages. Both channels close when the session ends.
#[derive(Debug, Clone)]
pub struct ConsumerStream {
    id: u64,
    info: ConsumerInfo,
    messages: Arc<AsyncMutex<mpsc::Receiver<Message>>>,
    errors: Arc<AsyncMutex<mpsc::Receiver<AdapterError>>>,
}

impl ConsumerStream {
    fn new(
        id: u64,
        info: ConsumerInfo,
        messages: mpsc::Receiver<Message>,
        errors: mpsc::Receiver<AdapterError>,
    ) -> Self {
        Self {
            id,
            info,
            messages: Arc::new(AsyncMutex::new(messages)),
            errors: Arc::new(AsyncMutex::new(errors)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn info(&self) -> &ConsumerInfo {
        &self.info
    }

    /// Whether both handles belong to the same session.
    pub fn same_session(&self, other: &ConsumerStream) -> bool {
        Arc::ptr_eq(&self.messages, &other.messages)
    }

    /// Next message; `None` once the session has ended and the buffer is drained.
    pub async fn recv(&self) -> Option<Message> {
        self.messages.lock().await.recv().await
    }

    /// Next error; `None` once the session has ended.
    pub async fn recv_error(&self) -> Option<AdapterError> {
        self.errors.lock().await.recv().await
    }

    /// Non-blocking receive. Reports `Empty` while another clone is receiving.
    pub fn try_recv(&self) -> Result<Message, TryRecvError> {
        match self.messages.try_lock() {
            Ok(mut rx) => rx.try_recv(),
            Err(_) => Err(TryRecvError::Empty),
        }
    }

    pub fn try_recv_error(&self) -> Result<AdapterError, TryRecvError> {
        match self.errors.try_lock() {
            Ok(mut rx) => rx.try_recv(),
            Err(_) => Err(TryRecvError::Empty),
        }
    }
}

/// Owns every consumer session opened through one broker client.
#[derive(Clone)]
pub struct SessionRegistry {
    client: Arc<dyn BrokerClient>,
    sessions: SessionMap,
    next_id: Arc<AtomicU64>,
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.sessions.lock().keys().map(ToString::to_string).collect();
        f.debug_struct("SessionRegistry")
            .field("client", &self.client)
            .field("sessions", &keys)
            .finish()
    }
}

impl SessionRegistry {
    pub fn new(client: Arc<dyn BrokerClient>) -> Self {
        Self {
            client,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn client(&self) -> &Arc<dyn BrokerClient> {
        &self.client
    }

    /// Start consuming a partition, or return the live session for the key.
    ///
    /// `from_beginning` only matters when a new session is created.
    pub async fn start_consumer(
        &self,
        topic: &str,
        partition: i32,
        group_id: &str,
        from_beginning: bool,
    ) -> Result<ConsumerStream, SessionError> {
        if topic.trim().is_empty() {
            return Err(SessionError::InvalidRequest("topic is required".into()));
        }
        if group_id.trim().is_empty() {
            return Err(SessionError::InvalidRequest("group id is required".into()));
        }
        if !self.client.is_connected() {
            return Err(SessionError::NotConnected);
        }

        let key = SessionKey::new(topic, group_id, partition);
        if let Some(entry) = self.sessions.lock().get(&key) {
            tracing::debug!(key = %key, "reusing live consumer session");
            return Ok(entry.stream.clone());
        }

        let consumer = self
            .client
            .consume_partition(topic, partition, StartOffset::from_beginning(from_beginning))
            .await
            .map_err(|source| {
                tracing::warn!(key = %key, error = %source, "failed to open partition consumer");
                SessionError::ConsumerCreation {
                    key: key.clone(),
                    source,
                }
            })?;

        let (message_tx, message_rx) = mpsc::channel(MESSAGE_BUFFER);
        let (error_tx, error_rx) = mpsc::channel(ERROR_BUFFER);
        let (stop_tx, stop_rx) = watch::channel(false);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let info = ConsumerInfo {
            topic: topic.to_string(),
            partition,
            group_id: group_id.to_string(),
            from_beginning,
        };
        let stream = ConsumerStream::new(id, info.clone(), message_rx, error_rx);

        {
            let mut sessions = self.sessions.lock();
            if let Some(existing) = sessions.get(&key) {
                // A concurrent start won; our consumer is closed on drop.
                return Ok(existing.stream.clone());
            }
            sessions.insert(
                key.clone(),
                SessionEntry {
                    id,
                    info,
                    stream: stream.clone(),
                    stop: stop_tx,
                },
            );
        }

        tracing::info!(
            topic,
            partition,
            group = group_id,
            from_beginning,
            "consumer session started"
        );

        tokio::spawn(
            Pump {
                id,
                key,
                consumer,
                messages: message_tx,
                errors: error_tx,
                stop: stop_rx,
                sessions: Arc::clone(&self.sessions),
            }
            .run(),
        );

        Ok(stream)
    }

    /// Stop one session. Its channels close once the pump has exited.
    pub fn stop_consumer(
        &self,
        topic: &str,
        group_id: &str,
        partition: i32,
    ) -> Result<(), SessionError> {
        let key = SessionKey::new(topic, group_id, partition);
        let entry = self.sessions.lock().remove(&key);
        match entry {
            Some(entry) => {
                entry.stop.send_replace(true);
                tracing::info!(key = %key, "consumer session stopped");
                Ok(())
            }
            None => Err(SessionError::SessionNotFound { key }),
        }
    }

    /// Stop every session.
    pub fn stop_all(&self) {
        let entries: Vec<(SessionKey, SessionEntry)> = self.sessions.lock().drain().collect();
        for (key, entry) in &entries {
            entry.stop.send_replace(true);
            tracing::debug!(key = %key, "consumer session stopped");
        }
        if !entries.is_empty() {
            tracing::info!(count = entries.len(), "stopped all consumer sessions");
        }
    }

    /// Snapshot of the live sessions, ordered by topic, group, partition.
    pub fn active_sessions(&self) -> Vec<ConsumerInfo> {
        let sessions = self.sessions.lock();
        let mut keys: Vec<&SessionKey> = sessions.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| sessions.get(key).map(|entry| entry.info.clone()))
            .collect()
    }

    /// The live stream for a key, if any.
    pub fn stream(&self, topic: &str, group_id: &str, partition: i32) -> Option<ConsumerStream> {
        let key = SessionKey::new(topic, group_id, partition);
        self.sessions.lock().get(&key).map(|entry| entry.stream.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kim_adapters::memory::MemoryBroker;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);

    fn broker_with(topic: &str, partitions: i32) -> MemoryBroker {
        let broker = MemoryBroker::new();
        broker.add_topic(topic, partitions);
        broker
    }

    fn registry(broker: &MemoryBroker) -> SessionRegistry {
        SessionRegistry::new(Arc::new(broker.clone()))
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        timeout(WAIT, async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    async fn drain(stream: &ConsumerStream) -> usize {
        let mut count = 0;
        while timeout(WAIT, stream.recv()).await.unwrap().is_some() {
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn delivers_messages_in_order_with_formatted_values() {
        let broker = broker_with("orders", 1);
        broker.append("orders", 0, Some(b"k1"), b"v1").unwrap();
        broker
            .append("orders", 0, Some(b"k2"), br#"{"a":1}"#)
            .unwrap();
        let registry = registry(&broker);

        let stream = registry
            .start_consumer("orders", 0, "grp1", true)
            .await
            .unwrap();

        let first = timeout(WAIT, stream.recv()).await.unwrap().unwrap();
        assert_eq!(first.key, "k1");
        assert_eq!(first.value, "v1");
        assert_eq!(first.offset, 0);

        let second = timeout(WAIT, stream.recv()).await.unwrap().unwrap();
        assert_eq!(second.key, "k2");
        assert_eq!(second.value, "{\n  \"a\": 1\n}");
        assert_eq!(second.offset, 1);
        assert_eq!(second.topic, "orders");
    }

    #[tokio::test]
    async fn start_is_idempotent_per_key() {
        let broker = broker_with("orders", 1);
        let registry = registry(&broker);

        let a = registry.start_consumer("orders", 0, "grp1", true).await.unwrap();
        let b = registry.start_consumer("orders", 0, "grp1", false).await.unwrap();

        assert!(a.same_session(&b));
        assert_eq!(a.id(), b.id());
        assert!(a.info().from_beginning);
        assert_eq!(registry.len(), 1);
        assert_eq!(broker.reader_count("orders", 0), 1);
    }

    #[tokio::test]
    async fn different_groups_get_separate_sessions() {
        let broker = broker_with("orders", 1);
        let registry = registry(&broker);

        let a = registry.start_consumer("orders", 0, "grp1", true).await.unwrap();
        let b = registry.start_consumer("orders", 0, "grp2", true).await.unwrap();

        assert!(!a.same_session(&b));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_starts_share_one_session() {
        let broker = broker_with("orders", 1);
        let registry = registry(&broker);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.start_consumer("orders", 0, "grp1", true).await })
            })
            .collect();

        let mut streams = Vec::new();
        for handle in handles {
            streams.push(handle.await.unwrap().unwrap());
        }

        assert!(streams.iter().all(|s| s.same_session(&streams[0])));
        assert_eq!(registry.len(), 1);
        wait_until(|| broker.reader_count("orders", 0) == 1).await;
    }

    #[tokio::test]
    async fn stop_closes_both_channels_and_allows_restart() {
        let broker = broker_with("orders", 1);
        broker.append("orders", 0, None, b"v1").unwrap();
        let registry = registry(&broker);

        let first = registry.start_consumer("orders", 0, "grp1", true).await.unwrap();
        registry.stop_consumer("orders", "grp1", 0).unwrap();
        assert!(registry.is_empty());

        drain(&first).await;
        assert!(timeout(WAIT, first.recv_error()).await.unwrap().is_none());
        wait_until(|| broker.reader_count("orders", 0) == 0).await;

        let second = registry.start_consumer("orders", 0, "grp1", true).await.unwrap();
        assert!(!first.same_session(&second));
        assert_eq!(timeout(WAIT, second.recv()).await.unwrap().unwrap().value, "v1");
    }

    #[tokio::test]
    async fn stopping_unknown_session_fails() {
        let broker = broker_with("orders", 1);
        let registry = registry(&broker);
        registry.start_consumer("orders", 0, "grp1", true).await.unwrap();

        let err = registry.stop_consumer("orders", "grp1", 1).unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound { ref key } if key.partition == 1));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn rejects_requests_when_disconnected_or_incomplete() {
        let broker = broker_with("orders", 1);
        let registry = registry(&broker);

        assert!(matches!(
            registry.start_consumer("", 0, "grp1", true).await,
            Err(SessionError::InvalidRequest(_))
        ));
        assert!(matches!(
            registry.start_consumer("orders", 0, " ", true).await,
            Err(SessionError::InvalidRequest(_))
        ));

        broker.disconnect();
        assert!(matches!(
            registry.start_consumer("orders", 0, "grp1", true).await,
            Err(SessionError::NotConnected)
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn creation_failure_registers_nothing() {
        let broker = broker_with("orders", 1);
        let registry = registry(&broker);

        let err = registry.start_consumer("orders", 5, "grp1", true).await.unwrap_err();
        assert!(matches!(err, SessionError::ConsumerCreation { .. }));
        assert!(registry.is_empty());

        let err = registry.start_consumer("missing", 0, "grp1", true).await.unwrap_err();
        assert!(matches!(err, SessionError::ConsumerCreation { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn stop_unblocks_a_full_session() {
        let broker = broker_with("orders", 1);
        for i in 0..(MESSAGE_BUFFER + 50) {
            broker
                .append("orders", 0, None, format!("m{i}").as_bytes())
                .unwrap();
        }
        let registry = registry(&broker);

        let stream = registry.start_consumer("orders", 0, "grp1", true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        registry.stop_consumer("orders", "grp1", 0).unwrap();
        assert_eq!(drain(&stream).await, MESSAGE_BUFFER);
        wait_until(|| broker.reader_count("orders", 0) == 0).await;
    }

    #[tokio::test]
    async fn stream_end_deregisters_the_session() {
        let broker = broker_with("orders", 1);
        broker.append("orders", 0, None, b"v1").unwrap();
        broker.append("orders", 0, None, b"v2").unwrap();
        let registry = registry(&broker);

        let stream = registry.start_consumer("orders", 0, "grp1", true).await.unwrap();
        broker.finish_partition("orders", 0).unwrap();

        assert_eq!(drain(&stream).await, 2);
        wait_until(|| registry.is_empty()).await;
        assert!(matches!(
            registry.stop_consumer("orders", "grp1", 0),
            Err(SessionError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn non_fatal_errors_are_forwarded_and_session_continues() {
        let broker = broker_with("orders", 1);
        let registry = registry(&broker);
        let stream = registry.start_consumer("orders", 0, "grp1", false).await.unwrap();
        wait_until(|| broker.reader_count("orders", 0) == 1).await;

        broker
            .inject_error("orders", 0, AdapterError::Broker("leader moved".into()))
            .unwrap();
        let err = timeout(WAIT, stream.recv_error()).await.unwrap().unwrap();
        assert_eq!(err, AdapterError::Broker("leader moved".into()));

        broker.append("orders", 0, None, b"after").unwrap();
        assert_eq!(timeout(WAIT, stream.recv()).await.unwrap().unwrap().value, "after");
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn fatal_error_ends_the_session() {
        let broker = broker_with("orders", 1);
        let registry = registry(&broker);
        let stream = registry.start_consumer("orders", 0, "grp1", false).await.unwrap();
        wait_until(|| broker.reader_count("orders", 0) == 1).await;

        let fatal = AdapterError::OffsetOutOfRange {
            topic: "orders".into(),
            partition: 0,
        };
        broker.inject_error("orders", 0, fatal.clone()).unwrap();

        assert_eq!(timeout(WAIT, stream.recv_error()).await.unwrap(), Some(fatal));
        assert!(timeout(WAIT, stream.recv()).await.unwrap().is_none());
        wait_until(|| registry.is_empty()).await;
    }

    #[tokio::test]
    async fn stop_all_clears_every_session() {
        let broker = broker_with("orders", 2);
        let registry = registry(&broker);
        let a = registry.start_consumer("orders", 0, "grp1", true).await.unwrap();
        let b = registry.start_consumer("orders", 1, "grp1", true).await.unwrap();

        registry.stop_all();
        assert!(registry.is_empty());
        assert_eq!(drain(&a).await, 0);
        assert_eq!(drain(&b).await, 0);
    }

    #[tokio::test]
    async fn active_sessions_are_sorted() {
        let broker = broker_with("orders", 2);
        broker.add_topic("audit", 1);
        let registry = registry(&broker);
        registry.start_consumer("orders", 1, "grp1", true).await.unwrap();
        registry.start_consumer("audit", 0, "grp1", true).await.unwrap();
        registry.start_consumer("orders", 0, "grp1", true).await.unwrap();

        let sessions: Vec<(String, i32)> = registry
            .active_sessions()
            .into_iter()
            .map(|info| (info.topic, info.partition))
            .collect();
        assert_eq!(
            sessions,
            vec![
                ("audit".to_string(), 0),
                ("orders".to_string(), 0),
                ("orders".to_string(), 1)
            ]
        );
        assert!(registry.stream("orders", "grp1", 1).is_some());
        assert!(registry.stream("orders", "grp2", 1).is_none());
    }

    #[tokio::test]
    async fn try_recv_reports_disconnect_after_stop() {
        let broker = broker_with("orders", 1);
        let registry = registry(&broker);
        let stream = registry.start_consumer("orders", 0, "grp1", true).await.unwrap();
        assert_eq!(stream.try_recv().unwrap_err(), TryRecvError::Empty);

        registry.stop_consumer("orders", "grp1", 0).unwrap();
        wait_until(|| stream.try_recv() == Err(TryRecvError::Disconnected)).await;
    }
}
