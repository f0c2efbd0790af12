//! Kafka client on top of rdkafka (librdkafka bindings).
//!
//! Admin calls go through an [`AdminClient`], metadata and group listings
//! through a [`BaseConsumer`], produce through a [`FutureProducer`]. Each
//! partition read gets its own [`StreamConsumer`] assigned to exactly that
//! partition, drained by a spawned task into a [`PartitionFeed`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use kim_adapters::kafka::KafkaClient;
//! use kim_adapters::BrokerClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = KafkaClient::builder()
//!         .brokers("localhost:9092")
//!         .build()?;
//!
//!     for topic in client.list_topics().await? {
//!         println!("{} ({} partitions)", topic.name, topic.partitions);
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::admin::{
    AdminClient, AdminOptions, NewTopic, ResourceSpecifier, TopicReplication,
};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Header, Headers, Message as _, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};

use kim_types::{
    CreateTopicRequest, GroupDetails, GroupInfo, MemberInfo, PartitionAssignment, PartitionInfo,
    ProduceRequest, TopicDetails, TopicInfo,
};

use crate::client::{BrokerClient, PartitionConsumer, PartitionFeed, RawRecord, StartOffset};
use crate::AdapterError;

/// Kafka cluster client.
pub struct KafkaClient {
    config: ClientConfig,
    admin: AdminClient<DefaultClientContext>,
    consumer: BaseConsumer,
    producer: FutureProducer,
    timeout: Duration,
    connected: AtomicBool,
}

impl KafkaClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> KafkaClientBuilder {
        KafkaClientBuilder::default()
    }

    fn ensure_connected(&self) -> Result<(), AdapterError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(AdapterError::NotConnected)
        }
    }

    fn admin_options(&self) -> AdminOptions {
        AdminOptions::new().operation_timeout(Some(Timeout::After(self.timeout)))
    }

    /// Committed offsets and lag for every partition the group has committed to.
    fn group_offsets(
        &self,
        group_id: &str,
    ) -> Result<BTreeMap<(String, i32), PartitionAssignment>, AdapterError> {
        let mut config = self.config.clone();
        config.set("group.id", group_id);
        let group_consumer: BaseConsumer = config.create()?;

        let metadata = self.consumer.fetch_metadata(None, self.timeout)?;
        let mut tpl = TopicPartitionList::new();
        for topic in metadata.topics() {
            for partition in topic.partitions() {
                tpl.add_partition(topic.name(), partition.id());
            }
        }

        let committed = group_consumer.committed_offsets(tpl, self.timeout)?;
        let mut offsets = BTreeMap::new();
        for elem in committed.elements() {
            let Offset::Offset(current) = elem.offset() else {
                continue;
            };
            let (_, high) =
                self.consumer
                    .fetch_watermarks(elem.topic(), elem.partition(), self.timeout)?;
            offsets.insert(
                (elem.topic().to_string(), elem.partition()),
                PartitionAssignment {
                    topic: elem.topic().to_string(),
                    partition: elem.partition(),
                    current_offset: current,
                    log_end_offset: high,
                    lag: (high - current).max(0),
                },
            );
        }
        Ok(offsets)
    }
}

impl std::fmt::Debug for KafkaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaClient")
            .field("connected", &self.is_connected())
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn raw_record(msg: &BorrowedMessage<'_>) -> RawRecord {
    let headers = msg
        .headers()
        .map(|hdrs| {
            hdrs.iter()
                .map(|h| (h.key.to_string(), h.value.map(<[u8]>::to_vec).unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();

    RawRecord {
        topic: msg.topic().to_string(),
        partition: msg.partition(),
        offset: msg.offset(),
        timestamp_ms: msg.timestamp().to_millis(),
        key: msg.key().map(<[u8]>::to_vec),
        value: msg.payload().map(<[u8]>::to_vec),
        headers,
    }
}

fn consume_error(err: KafkaError, topic: &str, partition: i32) -> AdapterError {
    match err.rdkafka_error_code() {
        Some(RDKafkaErrorCode::OffsetOutOfRange) => AdapterError::OffsetOutOfRange {
            topic: topic.to_string(),
            partition,
        },
        _ => err.into(),
    }
}

async fn drain_partition(consumer: StreamConsumer, mut feed: PartitionFeed, topic: String, partition: i32) {
    loop {
        let event = tokio::select! {
            _ = feed.stopped() => break,
            msg = consumer.recv() => msg.map(|m| raw_record(&m)),
        };
        match event {
            Ok(record) => {
                if !feed.send_record(record).await {
                    break;
                }
            }
            Err(err) => {
                let err = consume_error(err, &topic, partition);
                tracing::debug!(topic = %topic, partition, error = %err, "partition read error");
                feed.send_error(err);
            }
        }
    }
    consumer.unassign().ok();
}

/// Decode a consumer-protocol member assignment into `(topic, partition)` pairs.
///
/// Layout: version `i16`, then an `i32` count of topics, each an `i16`-length
/// name followed by an `i32` count of `i32` partitions. Trailing user data is
/// ignored.
pub fn decode_member_assignment(bytes: &[u8]) -> Option<Vec<(String, i32)>> {
    struct Cursor<'a>(&'a [u8]);

    impl<'a> Cursor<'a> {
        fn take(&mut self, n: usize) -> Option<&'a [u8]> {
            if self.0.len() < n {
                return None;
            }
            let (head, tail) = self.0.split_at(n);
            self.0 = tail;
            Some(head)
        }
        fn i16(&mut self) -> Option<i16> {
            self.take(2).map(|b| i16::from_be_bytes([b[0], b[1]]))
        }
        fn i32(&mut self) -> Option<i32> {
            self.take(4).map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        }
    }

    if bytes.is_empty() {
        return Some(Vec::new());
    }

    let mut cur = Cursor(bytes);
    let _version = cur.i16()?;
    let topics = cur.i32()?;
    let mut out = Vec::new();
    for _ in 0..topics.max(0) {
        let len = usize::try_from(cur.i16()?).ok()?;
        let name = String::from_utf8_lossy(cur.take(len)?).into_owned();
        let partitions = cur.i32()?;
        for _ in 0..partitions.max(0) {
            out.push((name.clone(), cur.i32()?));
        }
    }
    Some(out)
}

#[async_trait]
impl BrokerClient for KafkaClient {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn list_topics(&self) -> Result<Vec<TopicInfo>, AdapterError> {
        self.ensure_connected()?;
        let metadata = self.consumer.fetch_metadata(None, self.timeout)?;
        Ok(metadata
            .topics()
            .iter()
            .map(|t| TopicInfo {
                name: t.name().to_string(),
                partitions: t.partitions().len() as i32,
                replication_factor: t
                    .partitions()
                    .first()
                    .map(|p| p.replicas().len() as i32)
                    .unwrap_or(0),
                configs: BTreeMap::new(),
            })
            .collect())
    }

    async fn describe_topic(&self, name: &str) -> Result<TopicDetails, AdapterError> {
        self.ensure_connected()?;
        let metadata = self.consumer.fetch_metadata(Some(name), self.timeout)?;
        let topic = metadata
            .topics()
            .iter()
            .find(|t| t.name() == name && t.error().is_none())
            .ok_or_else(|| AdapterError::NotFound(format!("topic {name}")))?;

        let mut partitions = Vec::with_capacity(topic.partitions().len());
        for p in topic.partitions() {
            let (low, high) = self
                .consumer
                .fetch_watermarks(name, p.id(), self.timeout)?;
            partitions.push(PartitionInfo {
                id: p.id(),
                leader: p.leader(),
                replicas: p.replicas().to_vec(),
                isr: p.isr().to_vec(),
                low_watermark: low,
                high_watermark: high,
            });
        }

        let mut configs = BTreeMap::new();
        let results = self
            .admin
            .describe_configs(&[ResourceSpecifier::Topic(name)], &self.admin_options())
            .await?;
        for resource in results.into_iter().flatten() {
            for entry in resource.entries {
                if let Some(value) = entry.value {
                    configs.insert(entry.name, value);
                }
            }
        }

        Ok(TopicDetails {
            name: name.to_string(),
            replication_factor: partitions
                .first()
                .map(|p| p.replicas.len() as i32)
                .unwrap_or(0),
            partitions,
            configs,
        })
    }

    async fn create_topic(&self, request: &CreateTopicRequest) -> Result<(), AdapterError> {
        self.ensure_connected()?;
        let mut topic = NewTopic::new(
            &request.name,
            request.partitions,
            TopicReplication::Fixed(request.replication_factor),
        );
        for (key, value) in &request.configs {
            topic = topic.set(key, value);
        }

        let results = self
            .admin
            .create_topics(&[topic], &self.admin_options())
            .await?;
        for result in results {
            if let Err((name, code)) = result {
                return Err(AdapterError::Broker(format!("create {name}: {code}")));
            }
        }
        Ok(())
    }

    async fn delete_topic(&self, name: &str) -> Result<(), AdapterError> {
        self.ensure_connected()?;
        let results = self
            .admin
            .delete_topics(&[name], &self.admin_options())
            .await?;
        for result in results {
            match result {
                Err((name, RDKafkaErrorCode::UnknownTopicOrPartition)) => {
                    return Err(AdapterError::NotFound(format!("topic {name}")))
                }
                Err((name, code)) => {
                    return Err(AdapterError::Broker(format!("delete {name}: {code}")))
                }
                Ok(_) => {}
            }
        }
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<GroupInfo>, AdapterError> {
        self.ensure_connected()?;
        let groups = self.consumer.fetch_group_list(None, self.timeout)?;
        Ok(groups
            .groups()
            .iter()
            .map(|g| GroupInfo {
                group_id: g.name().to_string(),
                state: g.state().to_string(),
                protocol_type: g.protocol_type().to_string(),
                members: g.members().len(),
            })
            .collect())
    }

    async fn describe_group(&self, group_id: &str) -> Result<GroupDetails, AdapterError> {
        self.ensure_connected()?;
        let groups = self
            .consumer
            .fetch_group_list(Some(group_id), self.timeout)?;
        let group = groups
            .groups()
            .iter()
            .find(|g| g.name() == group_id && g.state() != "Dead")
            .ok_or_else(|| AdapterError::NotFound(format!("group {group_id}")))?;

        let offsets = self.group_offsets(group_id)?;

        let members = group
            .members()
            .iter()
            .map(|m| {
                let assignments = m
                    .assignment()
                    .and_then(decode_member_assignment)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(topic, partition)| {
                        offsets
                            .get(&(topic.clone(), partition))
                            .cloned()
                            .unwrap_or(PartitionAssignment {
                                topic,
                                partition,
                                current_offset: -1,
                                log_end_offset: -1,
                                lag: 0,
                            })
                    })
                    .collect();
                MemberInfo {
                    member_id: m.id().to_string(),
                    client_id: m.client_id().to_string(),
                    client_host: m.client_host().to_string(),
                    assignments,
                }
            })
            .collect();

        Ok(GroupDetails {
            group_id: group.name().to_string(),
            state: group.state().to_string(),
            protocol_type: group.protocol_type().to_string(),
            protocol: group.protocol().to_string(),
            members,
        })
    }

    async fn delete_group(&self, group_id: &str) -> Result<(), AdapterError> {
        self.ensure_connected()?;
        let results = self
            .admin
            .delete_groups(&[group_id], &self.admin_options())
            .await?;
        for result in results {
            match result {
                Err((name, RDKafkaErrorCode::GroupIdNotFound)) => {
                    return Err(AdapterError::NotFound(format!("group {name}")))
                }
                Err((name, code)) => {
                    return Err(AdapterError::Broker(format!("delete {name}: {code}")))
                }
                Ok(_) => {}
            }
        }
        Ok(())
    }

    async fn send_message(&self, request: &ProduceRequest) -> Result<(i32, i64), AdapterError> {
        self.ensure_connected()?;

        let mut headers = OwnedHeaders::new();
        for (key, value) in &request.headers {
            headers = headers.insert(Header {
                key,
                value: Some(value.as_str()),
            });
        }

        let mut record = FutureRecord::<str, str>::to(&request.topic)
            .payload(request.value.as_str())
            .headers(headers);
        if let Some(key) = &request.key {
            record = record.key(key.as_str());
        }
        if let Some(partition) = request.partition {
            record = record.partition(partition);
        }

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map_err(|(err, _)| AdapterError::from(err))?;
        tracing::debug!(topic = %request.topic, partition, offset, "message delivered");
        Ok((partition, offset))
    }

    async fn consume_partition(
        &self,
        topic: &str,
        partition: i32,
        start: StartOffset,
    ) -> Result<PartitionConsumer, AdapterError> {
        self.ensure_connected()?;

        let mut config = self.config.clone();
        config
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false");
        let consumer: StreamConsumer = config.create()?;

        let offset = match start {
            StartOffset::Oldest => Offset::Beginning,
            StartOffset::Newest => Offset::End,
        };
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(topic, partition, offset)?;
        consumer.assign(&tpl)?;

        let (feed, handle) = PartitionConsumer::channel(topic, partition);
        tokio::spawn(drain_partition(consumer, feed, topic.to_string(), partition));
        Ok(handle)
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Builder for KafkaClient.
#[derive(Debug, Default)]
pub struct KafkaClientBuilder {
    brokers: Option<String>,
    client_id: Option<String>,
    group_id: Option<String>,
    security_protocol: Option<String>,
    sasl_mechanism: Option<String>,
    sasl_username: Option<String>,
    sasl_password: Option<String>,
    ssl_ca_location: Option<String>,
    ssl_cert_location: Option<String>,
    ssl_key_location: Option<String>,
    ssl_key_password: Option<String>,
    ssl_check_hostname: Option<bool>,
    extra: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl KafkaClientBuilder {
    /// Set the Kafka broker addresses (comma-separated).
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Group id used by the client's own consumers (default: `kim`).
    pub fn group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// `PLAINTEXT`, `SSL`, `SASL_PLAINTEXT` or `SASL_SSL`.
    pub fn security_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.security_protocol = Some(protocol.into());
        self
    }

    /// `PLAIN`, `SCRAM-SHA-256`, `SCRAM-SHA-512` or `GSSAPI`.
    pub fn sasl_mechanism(mut self, mechanism: impl Into<String>) -> Self {
        self.sasl_mechanism = Some(mechanism.into());
        self
    }

    pub fn sasl_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.sasl_username = Some(username.into());
        self.sasl_password = Some(password.into());
        self
    }

    pub fn ssl_ca_location(mut self, path: impl Into<String>) -> Self {
        self.ssl_ca_location = Some(path.into());
        self
    }

    pub fn ssl_certificate(
        mut self,
        cert_location: impl Into<String>,
        key_location: impl Into<String>,
    ) -> Self {
        self.ssl_cert_location = Some(cert_location.into());
        self.ssl_key_location = Some(key_location.into());
        self
    }

    pub fn ssl_key_password(mut self, password: impl Into<String>) -> Self {
        self.ssl_key_password = Some(password.into());
        self
    }

    pub fn ssl_check_hostname(mut self, check: bool) -> Self {
        self.ssl_check_hostname = Some(check);
        self
    }

    /// Pass an arbitrary librdkafka property through.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set(
            "bootstrap.servers",
            self.brokers.as_deref().unwrap_or("localhost:9092"),
        );
        config.set("client.id", self.client_id.as_deref().unwrap_or("kim"));
        config.set("group.id", self.group_id.as_deref().unwrap_or("kim"));

        if let Some(protocol) = &self.security_protocol {
            config.set("security.protocol", protocol.to_lowercase());
        }
        if let Some(mechanism) = &self.sasl_mechanism {
            config.set("sasl.mechanism", mechanism);
        }
        if let Some(username) = &self.sasl_username {
            config.set("sasl.username", username);
        }
        if let Some(password) = &self.sasl_password {
            config.set("sasl.password", password);
        }
        if let Some(path) = &self.ssl_ca_location {
            config.set("ssl.ca.location", path);
        }
        if let Some(path) = &self.ssl_cert_location {
            config.set("ssl.certificate.location", path);
        }
        if let Some(path) = &self.ssl_key_location {
            config.set("ssl.key.location", path);
        }
        if let Some(password) = &self.ssl_key_password {
            config.set("ssl.key.password", password);
        }
        if let Some(check) = self.ssl_check_hostname {
            let value = if check { "https" } else { "none" };
            config.set("ssl.endpoint.identification.algorithm", value);
        }
        for (key, value) in &self.extra {
            config.set(key, value);
        }
        config
    }

    /// Build the client and verify the cluster is reachable.
    pub fn build(self) -> Result<KafkaClient, AdapterError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let config = self.client_config();

        let admin: AdminClient<DefaultClientContext> = config
            .create()
            .map_err(|e| AdapterError::Connection(e.to_string()))?;
        let consumer: BaseConsumer = config
            .create()
            .map_err(|e| AdapterError::Connection(e.to_string()))?;
        let producer: FutureProducer = config
            .create()
            .map_err(|e| AdapterError::Connection(e.to_string()))?;

        consumer
            .fetch_metadata(None, timeout)
            .map_err(|e| AdapterError::Connection(e.to_string()))?;

        Ok(KafkaClient {
            config,
            admin,
            consumer,
            producer,
            timeout,
            connected: AtomicBool::new(true),
        })
    }
}
