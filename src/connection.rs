//! Cluster connections, one per profile.
//!
//! ```text
//!  Profile ──▶ ConnectionManager ──cached & connected?──▶ Connection
//!                    │                                     ├─ Arc<dyn BrokerClient>
//!                    └─ Connector::connect (on miss)       └─ SessionRegistry
//! ```
//!
//! A connection pairs the broker client with the registry of consumer
//! sessions opened through it, so sessions never outlive their client.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kim_adapters::{AdapterError, BrokerClient};
use parking_lot::Mutex;

use crate::config::{Profile, ProfileKind};
use crate::session::SessionRegistry;

/// Default time allowed for establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens a broker client for a profile.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, profile: &Profile) -> Result<Arc<dyn BrokerClient>, AdapterError>;
}

/// A live client plus the sessions opened through it.
#[derive(Debug, Clone)]
pub struct Connection {
    pub profile: String,
    pub client: Arc<dyn BrokerClient>,
    pub sessions: SessionRegistry,
}

impl Connection {
    fn new(profile: &str, client: Arc<dyn BrokerClient>) -> Self {
        Self {
            profile: profile.to_string(),
            sessions: SessionRegistry::new(Arc::clone(&client)),
            client,
        }
    }
}

/// Caches one [`Connection`] per profile name.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    connections: Mutex<HashMap<String, Connection>>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.connections.lock().keys().cloned().collect();
        f.debug_struct("ConnectionManager")
            .field("connections", &names)
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// The cached connection for `profile`, reconnecting when it dropped.
    pub async fn connect(&self, profile: &Profile) -> Result<Connection, AdapterError> {
        let stale = {
            let mut connections = self.connections.lock();
            match connections.get(&profile.name) {
                Some(conn) if conn.client.is_connected() => return Ok(conn.clone()),
                Some(_) => connections.remove(&profile.name),
                None => None,
            }
        };
        if let Some(stale) = stale {
            tracing::info!(profile = %profile.name, "cached client disconnected, reconnecting");
            stale.sessions.stop_all();
        }

        let client = self.connector.connect(profile).await.map_err(|err| {
            tracing::warn!(profile = %profile.name, error = %err, "failed to connect");
            err
        })?;
        tracing::info!(profile = %profile.name, "connected");

        // A concurrent connect may have cached a client while this one was
        // connecting; keep the cached one and close ours.
        let (conn, duplicate) = {
            let mut connections = self.connections.lock();
            match connections.get(&profile.name) {
                Some(existing) if existing.client.is_connected() => (existing.clone(), Some(client)),
                _ => {
                    let conn = Connection::new(&profile.name, client);
                    if let Some(replaced) = connections.insert(profile.name.clone(), conn.clone()) {
                        replaced.sessions.stop_all();
                    }
                    (conn, None)
                }
            }
        };
        if let Some(client) = duplicate {
            tracing::debug!(profile = %profile.name, "closing duplicate client");
            if let Err(err) = client.close().await {
                tracing::warn!(profile = %profile.name, error = %err, "failed to close duplicate client");
            }
        }
        Ok(conn)
    }

    /// The cached connection for a profile name, without connecting.
    pub fn cached(&self, profile: &str) -> Option<Connection> {
        self.connections.lock().get(profile).cloned()
    }

    /// Stop every session and close every client.
    pub async fn close_all(&self) {
        let connections: Vec<Connection> =
            self.connections.lock().drain().map(|(_, conn)| conn).collect();
        for conn in connections {
            conn.sessions.stop_all();
            if let Err(err) = conn.client.close().await {
                tracing::warn!(profile = %conn.profile, error = %err, "failed to close client");
            }
        }
    }
}

/// Client properties (librdkafka names) for a profile.
///
/// MSK profiles need brokers to be given explicitly and only support SCRAM;
/// IAM needs an AWS token provider this client does not ship.
pub fn client_properties(profile: &Profile) -> Result<BTreeMap<String, String>, AdapterError> {
    let mut props = BTreeMap::new();

    let brokers = profile
        .bootstrap_servers
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let protocol = match profile.kind {
        ProfileKind::Kafka => {
            let brokers = brokers.ok_or_else(|| {
                AdapterError::Connection(format!(
                    "profile '{}' has no bootstrap servers",
                    profile.name
                ))
            })?;
            props.insert("bootstrap.servers".to_string(), brokers.to_string());
            profile.security_protocol.clone()
        }
        ProfileKind::Msk => {
            let method = profile.auth_method.as_deref().unwrap_or("IAM");
            if method != "SASL_SCRAM" {
                return Err(AdapterError::Unsupported(
                    "MSK IAM authentication is not supported; use SASL_SCRAM".into(),
                ));
            }
            let brokers = brokers.ok_or_else(|| {
                AdapterError::Unsupported(
                    "resolving MSK brokers from a cluster ARN is not supported; set bootstrap_servers"
                        .into(),
                )
            })?;
            props.insert("bootstrap.servers".to_string(), brokers.to_string());
            props.insert(
                "sasl.mechanism".to_string(),
                profile
                    .sasl_mechanism
                    .clone()
                    .unwrap_or_else(|| "SCRAM-SHA-512".to_string()),
            );
            Some("SASL_SSL".to_string())
        }
    };

    let protocol = protocol.filter(|p| !p.is_empty());
    if let Some(protocol) = &protocol {
        props.insert("security.protocol".to_string(), protocol.to_lowercase());
    }
    if let Some(mechanism) = profile.sasl_mechanism.as_deref().filter(|m| !m.is_empty()) {
        props.insert("sasl.mechanism".to_string(), mechanism.to_string());
    }

    let optional = [
        ("sasl.username", &profile.sasl_username),
        ("sasl.password", &profile.sasl_password),
        ("ssl.ca.location", &profile.ssl_ca_file),
        ("ssl.certificate.location", &profile.ssl_cert_file),
        ("ssl.key.location", &profile.ssl_key_file),
        ("ssl.key.password", &profile.ssl_password),
    ];
    for (key, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            props.insert(key.to_string(), value.to_string());
        }
    }

    if protocol
        .as_deref()
        .is_some_and(|p| p.to_ascii_uppercase().ends_with("SSL"))
    {
        let algorithm = if profile.ssl_check_hostname { "https" } else { "none" };
        props.insert(
            "ssl.endpoint.identification.algorithm".to_string(),
            algorithm.to_string(),
        );
    }

    for (key, value) in &profile.extra {
        props.insert(key.clone(), value.clone());
    }
    Ok(props)
}

/// Connects with the rdkafka-backed client.
#[cfg(feature = "kafka")]
#[derive(Debug, Clone)]
pub struct KafkaConnector {
    pub timeout: Duration,
}

#[cfg(feature = "kafka")]
impl Default for KafkaConnector {
    fn default() -> Self {
        Self {
            timeout: CONNECT_TIMEOUT,
        }
    }
}

#[cfg(feature = "kafka")]
#[async_trait]
impl Connector for KafkaConnector {
    async fn connect(&self, profile: &Profile) -> Result<Arc<dyn BrokerClient>, AdapterError> {
        let props = client_properties(profile)?;
        let mut builder = kim_adapters::kafka::KafkaClient::builder().timeout(self.timeout);
        for (key, value) in props {
            builder = if key == "bootstrap.servers" {
                builder.brokers(value)
            } else {
                builder.option(key, value)
            };
        }

        // Building fetches metadata synchronously.
        let client = tokio::task::spawn_blocking(move || builder.build())
            .await
            .map_err(|e| AdapterError::Connection(e.to_string()))??;
        Ok(Arc::new(client))
    }
}

/// Used when kim is built without a broker backend.
#[derive(Debug, Clone, Default)]
pub struct UnavailableConnector;

#[async_trait]
impl Connector for UnavailableConnector {
    async fn connect(&self, profile: &Profile) -> Result<Arc<dyn BrokerClient>, AdapterError> {
        client_properties(profile)?;
        Err(AdapterError::Unsupported(
            "kim was built without Kafka support (enable the `kafka` feature)".into(),
        ))
    }
}

/// The connector for this build.
pub fn default_connector() -> Arc<dyn Connector> {
    #[cfg(feature = "kafka")]
    {
        Arc::new(KafkaConnector::default())
    }
    #[cfg(not(feature = "kafka"))]
    {
        Arc::new(UnavailableConnector)
    }
}

/// Hands out one fixed client regardless of profile.
#[cfg(test)]
pub(crate) struct FixedConnector {
    pub client: Arc<dyn BrokerClient>,
    pub connects: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl FixedConnector {
    pub fn new(client: Arc<dyn BrokerClient>) -> Self {
        Self {
            client,
            connects: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Connector for FixedConnector {
    async fn connect(&self, _profile: &Profile) -> Result<Arc<dyn BrokerClient>, AdapterError> {
        self.connects
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.client.is_connected() {
            Ok(Arc::clone(&self.client))
        } else {
            Err(AdapterError::Connection("broker unreachable".into()))
        }
    }
}
