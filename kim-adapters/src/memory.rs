//! In-process broker.
//!
//! Topics hold append-only partition logs. A partition read replays the log
//! from the requested start and then tails it, so messages produced while a
//! consumer is attached are delivered live. Tests can inject errors into
//! attached readers, end a partition's streams, or drop the connection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use kim_types::{
    CreateTopicRequest, GroupDetails, GroupInfo, PartitionInfo, ProduceRequest, TopicDetails,
    TopicInfo,
};

use crate::client::{BrokerClient, PartitionConsumer, PartitionFeed, RawRecord, StartOffset};
use crate::AdapterError;

struct MemPartition {
    log: Vec<RawRecord>,
    appended: watch::Sender<u64>,
    readers: Vec<mpsc::Sender<AdapterError>>,
    finished: bool,
}

impl MemPartition {
    fn new() -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            log: Vec::new(),
            appended,
            readers: Vec::new(),
            finished: false,
        }
    }

    fn wake(&self) {
        self.appended.send_modify(|n| *n += 1);
    }
}

struct MemTopic {
    partitions: Vec<MemPartition>,
    replication_factor: i32,
    configs: BTreeMap<String, String>,
}

#[derive(Default)]
struct State {
    topics: BTreeMap<String, MemTopic>,
    groups: BTreeMap<String, GroupDetails>,
}

impl State {
    fn partition(&self, topic: &str, partition: i32) -> Result<&MemPartition, AdapterError> {
        self.topics
            .get(topic)
            .and_then(|t| usize::try_from(partition).ok().and_then(|p| t.partitions.get(p)))
            .ok_or_else(|| AdapterError::NotFound(format!("{topic}/{partition}")))
    }

    fn partition_mut(
        &mut self,
        topic: &str,
        partition: i32,
    ) -> Result<&mut MemPartition, AdapterError> {
        self.topics
            .get_mut(topic)
            .and_then(|t| {
                usize::try_from(partition)
                    .ok()
                    .and_then(|p| t.partitions.get_mut(p))
            })
            .ok_or_else(|| AdapterError::NotFound(format!("{topic}/{partition}")))
    }
}

/// A broker that lives entirely in memory.
///
/// Cloning yields another handle on the same broker.
#[derive(Clone)]
pub struct MemoryBroker {
    state: Arc<Mutex<State>>,
    connected: Arc<AtomicBool>,
    round_robin: Arc<AtomicU64>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryBroker")
            .field("connected", &self.is_connected())
            .field("topics", &state.topics.keys().collect::<Vec<_>>())
            .field("groups", &state.groups.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MemoryBroker {
    /// A connected broker with no topics.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            connected: Arc::new(AtomicBool::new(true)),
            round_robin: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Add (or replace) a topic with `partitions` empty partitions.
    pub fn add_topic(&self, name: impl Into<String>, partitions: i32) {
        let partitions = (0..partitions.max(1)).map(|_| MemPartition::new()).collect();
        self.state.lock().topics.insert(
            name.into(),
            MemTopic {
                partitions,
                replication_factor: 1,
                configs: BTreeMap::new(),
            },
        );
    }

    /// Register a consumer group as the broker would report it.
    pub fn add_group(&self, group: GroupDetails) {
        self.state
            .lock()
            .groups
            .insert(group.group_id.clone(), group);
    }

    /// Append a record directly to a partition log.
    pub fn append(
        &self,
        topic: &str,
        partition: i32,
        key: Option<&[u8]>,
        value: &[u8],
    ) -> Result<i64, AdapterError> {
        self.append_record(
            topic,
            partition,
            key.map(<[u8]>::to_vec),
            Some(value.to_vec()),
            Vec::new(),
        )
    }

    /// Deliver `err` to every reader currently attached to the partition.
    ///
    /// Returns how many readers received it.
    pub fn inject_error(
        &self,
        topic: &str,
        partition: i32,
        err: AdapterError,
    ) -> Result<usize, AdapterError> {
        let mut state = self.state.lock();
        let part = state.partition_mut(topic, partition)?;
        part.readers.retain(|tx| !tx.is_closed());
        Ok(part
            .readers
            .iter()
            .filter(|tx| tx.try_send(err.clone()).is_ok())
            .count())
    }

    /// End every read of the partition once it has caught up with the log.
    pub fn finish_partition(&self, topic: &str, partition: i32) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        let part = state.partition_mut(topic, partition)?;
        part.finished = true;
        part.wake();
        Ok(())
    }

    /// Number of readers attached to a partition whose handle is still open.
    pub fn reader_count(&self, topic: &str, partition: i32) -> usize {
        let state = self.state.lock();
        state
            .partition(topic, partition)
            .map(|p| p.readers.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Simulate losing the connection.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    fn ensure_connected(&self) -> Result<(), AdapterError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(AdapterError::NotConnected)
        }
    }

    fn append_record(
        &self,
        topic: &str,
        partition: i32,
        key: Option<Vec<u8>>,
        value: Option<Vec<u8>>,
        headers: Vec<(String, Vec<u8>)>,
    ) -> Result<i64, AdapterError> {
        let mut state = self.state.lock();
        let part = state.partition_mut(topic, partition)?;
        let offset = part.log.len() as i64;
        part.log.push(RawRecord {
            topic: topic.to_string(),
            partition,
            offset,
            timestamp_ms: Some(now_ms()),
            key,
            value,
            headers,
        });
        part.wake();
        Ok(offset)
    }

    fn choose_partition(&self, request: &ProduceRequest, count: i32) -> i32 {
        match (&request.partition, &request.key) {
            (Some(p), _) => *p,
            (None, Some(key)) => {
                let hash = key
                    .bytes()
                    .fold(2_166_136_261u32, |h, b| (h ^ b as u32).wrapping_mul(16_777_619));
                (hash % count as u32) as i32
            }
            (None, None) => (self.round_robin.fetch_add(1, Ordering::Relaxed) % count as u64) as i32,
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Replay the log from `position`, then follow appends until stopped.
async fn tail_partition(
    state: Arc<Mutex<State>>,
    topic: String,
    partition: i32,
    mut position: usize,
    mut appended: watch::Receiver<u64>,
    mut feed: PartitionFeed,
) {
    loop {
        appended.borrow_and_update();
        let (batch, finished) = {
            let state = state.lock();
            match state.partition(&topic, partition) {
                Ok(part) => (
                    part.log.get(position..).unwrap_or_default().to_vec(),
                    part.finished,
                ),
                Err(_) => (Vec::new(), true),
            }
        };

        if batch.is_empty() {
            if finished {
                tracing::debug!(topic = %topic, partition, "partition finished, ending read");
                return;
            }
            tokio::select! {
                _ = feed.stopped() => return,
                changed = appended.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
            continue;
        }

        position += batch.len();
        for record in batch {
            if !feed.send_record(record).await {
                return;
            }
        }
    }
}

#[async_trait]
impl BrokerClient for MemoryBroker {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn list_topics(&self) -> Result<Vec<TopicInfo>, AdapterError> {
        self.ensure_connected()?;
        let state = self.state.lock();
        Ok(state
            .topics
            .iter()
            .map(|(name, t)| TopicInfo {
                name: name.clone(),
                partitions: t.partitions.len() as i32,
                replication_factor: t.replication_factor,
                configs: t.configs.clone(),
            })
            .collect())
    }

    async fn describe_topic(&self, name: &str) -> Result<TopicDetails, AdapterError> {
        self.ensure_connected()?;
        let state = self.state.lock();
        let topic = state
            .topics
            .get(name)
            .ok_or_else(|| AdapterError::NotFound(format!("topic {name}")))?;
        let replicas: Vec<i32> = (1..=topic.replication_factor).collect();
        Ok(TopicDetails {
            name: name.to_string(),
            partitions: topic
                .partitions
                .iter()
                .enumerate()
                .map(|(id, p)| PartitionInfo {
                    id: id as i32,
                    leader: 1,
                    replicas: replicas.clone(),
                    isr: replicas.clone(),
                    low_watermark: 0,
                    high_watermark: p.log.len() as i64,
                })
                .collect(),
            replication_factor: topic.replication_factor,
            configs: topic.configs.clone(),
        })
    }

    async fn create_topic(&self, request: &CreateTopicRequest) -> Result<(), AdapterError> {
        self.ensure_connected()?;
        let mut state = self.state.lock();
        if state.topics.contains_key(&request.name) {
            return Err(AdapterError::Broker(format!(
                "topic {} already exists",
                request.name
            )));
        }
        state.topics.insert(
            request.name.clone(),
            MemTopic {
                partitions: (0..request.partitions.max(1))
                    .map(|_| MemPartition::new())
                    .collect(),
                replication_factor: request.replication_factor.max(1),
                configs: request.configs.clone(),
            },
        );
        Ok(())
    }

    async fn delete_topic(&self, name: &str) -> Result<(), AdapterError> {
        self.ensure_connected()?;
        let removed = self.state.lock().topics.remove(name);
        match removed {
            Some(topic) => {
                // Readers observe the missing topic and end.
                for part in &topic.partitions {
                    part.wake();
                }
                Ok(())
            }
            None => Err(AdapterError::NotFound(format!("topic {name}"))),
        }
    }

    async fn list_groups(&self) -> Result<Vec<GroupInfo>, AdapterError> {
        self.ensure_connected()?;
        let state = self.state.lock();
        Ok(state
            .groups
            .values()
            .map(|g| GroupInfo {
                group_id: g.group_id.clone(),
                state: g.state.clone(),
                protocol_type: g.protocol_type.clone(),
                members: g.members.len(),
            })
            .collect())
    }

    async fn describe_group(&self, group_id: &str) -> Result<GroupDetails, AdapterError> {
        self.ensure_connected()?;
        self.state
            .lock()
            .groups
            .get(group_id)
            .cloned()
            .ok_or_else(|| AdapterError::NotFound(format!("group {group_id}")))
    }

    async fn delete_group(&self, group_id: &str) -> Result<(), AdapterError> {
        self.ensure_connected()?;
        let mut state = self.state.lock();
        match state.groups.get(group_id) {
            None => Err(AdapterError::NotFound(format!("group {group_id}"))),
            Some(g) if !g.members.is_empty() => Err(AdapterError::Broker(format!(
                "group {group_id} is not empty"
            ))),
            Some(_) => {
                state.groups.remove(group_id);
                Ok(())
            }
        }
    }

    async fn send_message(&self, request: &ProduceRequest) -> Result<(i32, i64), AdapterError> {
        self.ensure_connected()?;
        let count = {
            let state = self.state.lock();
            state
                .topics
                .get(&request.topic)
                .map(|t| t.partitions.len() as i32)
                .ok_or_else(|| AdapterError::NotFound(format!("topic {}", request.topic)))?
        };
        let partition = self.choose_partition(request, count);
        let headers = request
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().into_bytes()))
            .collect();
        let offset = self.append_record(
            &request.topic,
            partition,
            request.key.as_ref().map(|k| k.clone().into_bytes()),
            Some(request.value.clone().into_bytes()),
            headers,
        )?;
        Ok((partition, offset))
    }

    async fn consume_partition(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<PartitionConsumer, AdapterError> {
        self.ensure_connected()?;
        let (feed, consumer) = PartitionConsumer::channel(topic, partition);

        let (position, appended) = {
            let mut state = self.state.lock();
            let part = state.partition_mut(topic, partition)?;
            part.readers.retain(|tx| !tx.is_closed());
            part.readers.push(feed.errors.clone());
            let position = match start {
                StartOffset::Oldest => 0,
                StartOffset::Newest => part.log.len(),
            };
            (position, part.appended.subscribe())
        };

        tokio::spawn(tail_partition(
            Arc::clone(&self.state),
            topic.to_string(),
            partition,
            position,
            appended,
            feed,
        ));
        Ok(consumer)
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.disconnect();
        Ok(())
    }
}
