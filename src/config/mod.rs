//! Configuration: connection profiles and user settings.
//!
//! The configuration lives in `~/.kim/config.toml`:
//!
//! ```toml
//! active_profile = "local"
//!
//! [settings]
//! page_size = 20
//! refresh_interval_secs = 10
//! default_format = "table"
//! color_scheme = "auto"
//!
//! [profiles.local]
//! name = "local"
//! type = "kafka"
//! bootstrap_servers = "localhost:9092"
//! ```
//!
//! Values can be overridden from the environment with a `KIM_` prefix, using
//! `__` between nested keys (`KIM_SETTINGS__PAGE_SIZE=50`).

mod profile;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use profile::{Profile, ProfileKind, MSK_AUTH_METHODS, SASL_MECHANISMS, SECURITY_PROTOCOLS};

/// Errors from loading, saving or querying the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("no active profile set")]
    NoActiveProfile,

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("profile '{0}' already exists")]
    DuplicateProfile(String),

    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to serialize config: {0}")]
    Save(#[from] toml::ser::Error),

    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to profiles plus switching the active one.
///
/// The interactive controller only needs this much of the configuration.
pub trait ProfileStore: Send {
    fn active_profile(&self) -> Result<&Profile, ConfigError>;

    fn all_profiles(&self) -> &BTreeMap<String, Profile>;

    /// Make `name` the active profile; fails without changes when it does not exist.
    fn set_active_profile(&mut self, name: &str) -> Result<(), ConfigError>;
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub page_size: usize,
    pub refresh_interval_secs: u64,
    pub default_format: String,
    pub color_scheme: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: 20,
            refresh_interval_secs: 10,
            default_format: "table".to_string(),
            color_scheme: "auto".to_string(),
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<String>,
    pub settings: Settings,
    pub profiles: BTreeMap<String, Profile>,
    #[serde(skip)]
    path: PathBuf,
}

/// `~/.kim/config.toml`, or `.kim/config.toml` when there is no home directory.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".kim"))
        .unwrap_or_else(|| PathBuf::from(".kim"))
        .join("config.toml")
}

impl Config {
    /// Load the configuration at `path`; a missing file yields the defaults.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let source = config::Config::builder()
            .add_source(config::File::from(path.as_path()).required(false))
            .add_source(
                config::Environment::with_prefix("KIM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = source.try_deserialize()?;
        cfg.path = path;

        // Profile names come from the table keys when the entry omits them.
        for (name, profile) in cfg.profiles.iter_mut() {
            if profile.name.is_empty() {
                profile.name = name.clone();
            }
        }
        tracing::debug!(path = %cfg.path.display(), profiles = cfg.profiles.len(), "config loaded");
        Ok(cfg)
    }

    /// An empty configuration that will be saved to `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the configuration back to its file, creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&self.path, contents)?;
        tracing::debug!(path = %self.path.display(), "config saved");
        Ok(())
    }

    /// Validate and add a profile. Names must be unique.
    pub fn add_profile(&mut self, profile: Profile) -> Result<(), ConfigError> {
        profile.validate()?;
        if self.profiles.contains_key(&profile.name) {
            return Err(ConfigError::DuplicateProfile(profile.name));
        }
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    /// Remove a profile, clearing the active profile if it was this one.
    pub fn remove_profile(&mut self, name: &str) -> Result<Profile, ConfigError> {
        let removed = self
            .profiles
            .remove(name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?;
        if self.active_profile.as_deref() == Some(name) {
            self.active_profile = None;
        }
        Ok(removed)
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))
    }
}

impl ProfileStore for Config {
    fn active_profile(&self) -> Result<&Profile, ConfigError> {
        match self.active_profile.as_deref() {
            Some(name) if !name.is_empty() => self.profile(name),
            _ => Err(ConfigError::NoActiveProfile),
        }
    }

    fn all_profiles(&self) -> &BTreeMap<String, Profile> {
        &self.profiles
    }

    fn set_active_profile(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.profiles.contains_key(name) {
            return Err(ConfigError::ProfileNotFound(name.to_string()));
        }
        self.active_profile = Some(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(dir.path().join("config.toml")).unwrap();
        assert!(cfg.profiles.is_empty());
        assert_eq!(cfg.settings, Settings::default());
        assert!(matches!(cfg.active_profile(), Err(ConfigError::NoActiveProfile)));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::with_path(&path);
        cfg.add_profile(Profile::kafka("local", "localhost:9092")).unwrap();
        let mut msk = Profile::msk("prod", "eu-west-1", "arn:aws:kafka:eu-west-1:1:cluster/p");
        msk.extra.insert("retries".into(), "5".into());
        cfg.add_profile(msk).unwrap();
        cfg.set_active_profile("local").unwrap();
        cfg.settings.page_size = 50;
        cfg.save().unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.active_profile().unwrap().name, "local");
        assert_eq!(loaded.settings.page_size, 50);
        assert_eq!(loaded.profiles.len(), 2);
        assert_eq!(loaded.profile("prod").unwrap().kind, ProfileKind::Msk);
        assert_eq!(
            loaded.profile("prod").unwrap().extra.get("retries").map(String::as_str),
            Some("5")
        );
    }

    #[test]
    fn profile_name_defaults_to_table_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[profiles.dev]\ntype = \"kafka\"\nbootstrap_servers = \"dev:9092\"\n",
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.profile("dev").unwrap().name, "dev");
    }

    #[test]
    fn duplicate_and_invalid_profiles_are_rejected() {
        let mut cfg = Config::default();
        cfg.add_profile(Profile::kafka("local", "localhost:9092")).unwrap();

        assert!(matches!(
            cfg.add_profile(Profile::kafka("local", "other:9092")),
            Err(ConfigError::DuplicateProfile(_))
        ));
        assert!(matches!(
            cfg.add_profile(Profile::kafka("broken", "")),
            Err(ConfigError::InvalidProfile(_))
        ));
    }

    #[test]
    fn set_unknown_active_profile_leaves_state_unchanged() {
        let mut cfg = Config::default();
        cfg.add_profile(Profile::kafka("local", "localhost:9092")).unwrap();
        cfg.set_active_profile("local").unwrap();

        let err = cfg.set_active_profile("ghost").unwrap_err();
        assert!(matches!(err, ConfigError::ProfileNotFound(ref n) if n == "ghost"));
        assert_eq!(cfg.active_profile().unwrap().name, "local");
    }

    #[test]
    fn removing_active_profile_clears_it() {
        let mut cfg = Config::default();
        cfg.add_profile(Profile::kafka("local", "localhost:9092")).unwrap();
        cfg.set_active_profile("local").unwrap();

        cfg.remove_profile("local").unwrap();
        assert!(cfg.active_profile.is_none());
        assert!(matches!(
            cfg.remove_profile("local"),
            Err(ConfigError::ProfileNotFound(_))
        ));
    }
}
