//! Configuration loading for a game agent.
//!
//! Configuration is loaded from a TOML file. Every field has a default, so an
//! empty file (or no file at all) yields a working in-memory agent:
//!
//! ```toml
//! [agent]
//! name = "alice"
//!
//! [storage]
//! backend = "sqlite"
//! database = "games.db"
//!
//! [events]
//! capacity = 64
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::StorageError;
use crate::events::BroadcastNotifier;
use crate::storage::{GameStore, MemoryGameStore, SqliteGameStore};

/// Root configuration for an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AgentConfig {
    /// Agent identity.
    #[serde(default)]
    pub agent: AgentSection,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Event fan-out configuration.
    #[serde(default)]
    pub events: EventsConfig,
}

/// Agent identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentSection {
    /// Human-readable name, used in logs and connection ids (default: "agent").
    #[serde(default = "default_name")]
    pub name: String,
}

/// Which store backs the game records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Records live in process memory.
    #[default]
    Memory,
    /// Records live in a SQLite database file.
    Sqlite,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Backend (default: memory).
    #[serde(default)]
    pub backend: StorageBackend,
    /// Path to SQLite database file, used by the sqlite backend (default: games.db).
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
}

/// Event fan-out configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventsConfig {
    /// Events buffered per subscriber before it lags (default: 64).
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

// Default value functions
fn default_name() -> String {
    "agent".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("games.db")
}

fn default_event_capacity() -> usize {
    64
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: default_name(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database: default_database_path(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Copy of this configuration for another agent sharing the same settings.
    ///
    /// The database file gets the agent name appended to its stem
    /// (`games.db` becomes `games-bob.db`) so two agents never share a file.
    pub fn for_agent(&self, name: &str) -> Self {
        let mut config = self.clone();
        config.agent.name = name.to_string();

        let stem = self
            .storage
            .database
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "games".to_string());
        let file = match self.storage.database.extension() {
            Some(ext) => format!("{}-{}.{}", stem, name, ext.to_string_lossy()),
            None => format!("{}-{}", stem, name),
        };
        config.storage.database = self.storage.database.with_file_name(file);
        config
    }

    /// Open the configured game store.
    pub async fn open_store(&self) -> Result<Arc<dyn GameStore>, StorageError> {
        match self.storage.backend {
            StorageBackend::Memory => Ok(Arc::new(MemoryGameStore::new())),
            StorageBackend::Sqlite => {
                Ok(Arc::new(SqliteGameStore::new(&self.storage.database).await?))
            }
        }
    }

    /// Build the event notifier with the configured capacity.
    pub fn notifier(&self) -> BroadcastNotifier {
        BroadcastNotifier::new(self.events.capacity)
    }
}

impl StorageBackend {
    /// Name as written in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(StorageBackend::Memory),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// Backend name is not recognised.
    #[error("unknown storage backend {0:?} (expected \"memory\" or \"sqlite\")")]
    UnknownBackend(String),
}
