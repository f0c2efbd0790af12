//! Connection profiles and their validation rules.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Security protocols a Kafka profile may use.
pub const SECURITY_PROTOCOLS: &[&str] = &["PLAINTEXT", "SSL", "SASL_PLAINTEXT", "SASL_SSL"];

/// SASL mechanisms understood by the Kafka client.
pub const SASL_MECHANISMS: &[&str] = &["PLAIN", "SCRAM-SHA-256", "SCRAM-SHA-512", "GSSAPI"];

/// Authentication methods for MSK profiles.
pub const MSK_AUTH_METHODS: &[&str] = &["IAM", "SASL_SCRAM"];

/// What kind of cluster a profile points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// Self-hosted Kafka reached through bootstrap servers.
    #[default]
    Kafka,
    /// Amazon MSK, identified by region and cluster ARN.
    Msk,
}

impl ProfileKind {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "kafka" => Ok(ProfileKind::Kafka),
            "msk" => Ok(ProfileKind::Msk),
            "" => Err(ConfigError::InvalidProfile(
                "profile type is required (must be 'kafka' or 'msk')".into(),
            )),
            other => Err(ConfigError::InvalidProfile(format!(
                "invalid profile type: {other} (must be 'kafka' or 'msk')"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileKind::Kafka => "kafka",
            ProfileKind::Msk => "msk",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named cluster connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Profile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ProfileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_servers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_arn: Option<String>,
    /// `IAM` or `SASL_SCRAM` (MSK only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sasl_mechanism: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sasl_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sasl_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_ca_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_cert_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_key_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_password: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ssl_check_hostname: bool,
    /// Extra client properties passed through verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

impl Profile {
    pub fn kafka(name: impl Into<String>, bootstrap_servers: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ProfileKind::Kafka,
            bootstrap_servers: Some(bootstrap_servers.into()),
            ..Default::default()
        }
    }

    pub fn msk(
        name: impl Into<String>,
        region: impl Into<String>,
        cluster_arn: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ProfileKind::Msk,
            region: Some(region.into()),
            cluster_arn: Some(cluster_arn.into()),
            auth_method: Some("IAM".into()),
            ..Default::default()
        }
    }

    /// Check the profile is complete enough to connect with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::InvalidProfile(msg));

        if self.name.trim().is_empty() {
            return invalid("profile name is required".into());
        }

        match self.kind {
            ProfileKind::Msk => {
                if is_blank(&self.region) {
                    return invalid("region is required for MSK profiles".into());
                }
                if is_blank(&self.cluster_arn) {
                    return invalid("cluster_arn is required for MSK profiles".into());
                }
                if let Some(method) = self.auth_method.as_deref() {
                    if !method.is_empty() && !MSK_AUTH_METHODS.contains(&method) {
                        return invalid(
                            "auth_method must be either 'IAM' or 'SASL_SCRAM' for MSK profiles"
                                .into(),
                        );
                    }
                }
            }
            ProfileKind::Kafka => {
                if is_blank(&self.bootstrap_servers) {
                    return invalid("bootstrap_servers is required for Kafka profiles".into());
                }
                if let Some(protocol) = self.security_protocol.as_deref() {
                    if !protocol.is_empty() && !SECURITY_PROTOCOLS.contains(&protocol) {
                        return invalid(format!("invalid security_protocol: {protocol}"));
                    }
                }
            }
        }

        if let Some(mechanism) = self.sasl_mechanism.as_deref() {
            if !mechanism.is_empty() && !SASL_MECHANISMS.contains(&mechanism) {
                return invalid(format!("invalid sasl_mechanism: {mechanism}"));
            }
        }
        Ok(())
    }

    /// One-line summary of where the profile points, for listings.
    pub fn details(&self) -> String {
        match self.kind {
            ProfileKind::Kafka => self.bootstrap_servers.clone().unwrap_or_default(),
            ProfileKind::Msk => format!(
                "{} ({})",
                self.cluster_arn.as_deref().unwrap_or_default(),
                self.region.as_deref().unwrap_or_default()
            ),
        }
    }
}
