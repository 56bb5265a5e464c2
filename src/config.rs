//! Configuration loading and management
//!
//! Handles parsing of `taskkeep.toml`. The loaded [`Config`] is passed
//! explicitly to the remote source, the snapshot store and the duplicate
//! guard; nothing reads settings from global state.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::guard::{DEFAULT_ARCHIVE_MARKER, DEFAULT_TOLERANCE_SECS};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "taskkeep.toml";

/// File name of the snapshot inside the platform data directory
const SNAPSHOT_FILE_NAME: &str = "snapshot.json";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where tasks come from
    #[serde(default)]
    pub source: SourceConfig,

    /// Local snapshot persistence
    #[serde(default)]
    pub store: StoreConfig,

    /// Archive marker and duplicate detection
    #[serde(default)]
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// In-process task service seeded from a fixture or demo data
    #[default]
    Mock,
    /// Google Tasks REST API
    Live,
}

/// Remote source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub mode: SourceMode,

    /// JSON fixture backing the mock source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,

    /// Page size served by the mock source
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Account credentials for live mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

fn default_page_size() -> usize {
    100
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            fixture: None,
            page_size: default_page_size(),
            credentials: None,
        }
    }
}

/// Credentials for the live source. `key` is sent as the bearer token.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub id: String,
    pub key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Snapshot store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Snapshot file; defaults to the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// How long a run waits for another run's lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl StoreConfig {
    /// Resolved snapshot path
    pub fn snapshot_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let dirs = directories::ProjectDirs::from("", "", "taskkeep").ok_or_else(|| {
            Error::InvalidConfig("store.path not set and no home directory found".to_string())
        })?;
        Ok(dirs.data_dir().join(SNAPSHOT_FILE_NAME))
    }
}

/// Archive writer and duplicate guard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Token appended to notes of archival writes
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Completion-time window for the heuristic duplicate match
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: i64,
}

fn default_marker() -> String {
    DEFAULT_ARCHIVE_MARKER.to_string()
}

fn default_tolerance_secs() -> i64 {
    DEFAULT_TOLERANCE_SECS
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            tolerance_secs: default_tolerance_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. Relative paths inside the file
    /// are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.validate()?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Load `path` if it exists, otherwise return defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "config file missing; using defaults");
            Ok(Self::default())
        }
    }

    /// Config path from an explicit override, or the default file name
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.store.validate()?;
        self.archive.validate()?;
        Ok(())
    }

    fn rebase(&mut self, base: &Path) {
        if base.as_os_str().is_empty() {
            return;
        }
        for path in [&mut self.source.fixture, &mut self.store.path]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

impl SourceConfig {
    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidConfig(
                "source.page_size must be > 0".to_string(),
            ));
        }
        if self.mode == SourceMode::Live {
            let credentials = self.credentials.as_ref().ok_or_else(|| {
                Error::InvalidConfig("source.credentials required in live mode".to_string())
            })?;
            if credentials.id.trim().is_empty() || credentials.key.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "source.credentials.id and source.credentials.key cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        if self.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "store.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl ArchiveConfig {
    fn validate(&self) -> Result<()> {
        if self.marker.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "archive.marker cannot be empty".to_string(),
            ));
        }
        self.tolerance().map(|_| ())
    }

    /// Tolerance window as a duration; rejects values outside `(0, i64::MAX / 1000]`.
    pub fn tolerance(&self) -> Result<TimeDelta> {
        TimeDelta::try_seconds(self.tolerance_secs)
            .filter(|window| *window > TimeDelta::zero())
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "archive.tolerance_secs must be > 0 and at most {}",
                    i64::MAX / 1000
                ))
            })
    }
}
