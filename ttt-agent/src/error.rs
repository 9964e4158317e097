//! Error types for ttt-agent.

use ttt_core::GameError;
use ttt_types::GameId;

use crate::config::ConfigError;
use crate::transport::TransportError;

/// Main error type for agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The game rules rejected the operation.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transport has no connection with this id.
    #[error("unknown connection: {0}")]
    UnknownConnection(String),

    /// An Outcome was requested for a game without a winner.
    #[error("game {0} has no winner yet")]
    NoWinner(GameId),

    /// The event channel was closed while waiting.
    #[error("event channel closed")]
    EventsClosed,
}

impl AgentError {
    /// The game rule error behind this error, if any.
    pub fn as_game_error(&self) -> Option<&GameError> {
        match self {
            AgentError::Game(err) => Some(err),
            _ => None,
        }
    }
}

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Move list could not be encoded or decoded.
    #[error("move list encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A game with this id already exists.
    #[error("game {game_id} already exists")]
    DuplicateGame {
        /// The game id.
        game_id: String,
    },

    /// A game already exists for this thread.
    #[error("a game already exists for thread {thread_id}")]
    DuplicateThread {
        /// The thread id.
        thread_id: String,
    },

    /// Update of a game that was never created.
    #[error("game not found: {game_id}")]
    NotFound {
        /// The game id.
        game_id: String,
    },

    /// A stored row cannot be turned back into a game record.
    #[error("corrupt game {game_id}: {reason}")]
    Corrupt {
        /// The game id as stored.
        game_id: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
