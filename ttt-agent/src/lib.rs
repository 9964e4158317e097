//! # ttt-agent
//!
//! Async host for the two-party tic-tac-toe protocol.
//!
//! `ttt-core` decides; this crate persists, notifies and sends. Each agent
//! owns a [`GameStore`], an [`EventNotifier`] and a [`Transport`], and the
//! two agents of a game converge only through the Move and Outcome messages
//! they exchange.
//!
//! ## Features
//!
//! - **Storage**: SQLite (WAL) or in-memory game records
//! - **Per-game locking**: local moves and inbound messages never interleave
//! - **Events**: in-process broadcast of every state change
//! - **Transport Abstraction**: pluggable transport (loopback, mock)
//!
//! ## Example
//!
//! ```ignore
//! use ttt_agent::{AgentConfig, LoopbackNetwork, TicTacToeApi, TicTacToeService};
//!
//! let config = AgentConfig::default();
//! let (alice, bob) = LoopbackNetwork::pair("alice", "bob", 16);
//! let api = TicTacToeApi::new(
//!     TicTacToeService::new(config.open_store().await?, config.notifier()),
//!     alice.endpoint,
//! );
//! tokio::spawn(async move { api.run(alice.inbox).await });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod locks;
pub mod service;
pub mod storage;
pub mod transport;

pub use api::TicTacToeApi;
pub use config::{AgentConfig, ConfigError, StorageBackend};
pub use error::{AgentError, Result, StorageError};
pub use events::{wait_for_turn, BroadcastNotifier, EventNotifier, GameStateChanged};
pub use locks::{GameLockGuard, GameLocks};
pub use service::{Handled, TicTacToeService};
pub use storage::{GameQuery, GameStore, MemoryGameStore, SqliteGameStore};
pub use transport::{
    Inbox, LoopbackEndpoint, LoopbackNetwork, LoopbackPeer, MockTransport, Transport,
    TransportError,
};
