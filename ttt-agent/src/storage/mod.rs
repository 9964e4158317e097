//! Storage layer for game records.
//!
//! Each party owns its store; nothing here is shared with the peer. A store
//! holds at most one record per thread id.

mod memory;
mod sqlite;

pub use memory::MemoryGameStore;
pub use sqlite::SqliteGameStore;

use crate::error::StorageError;
use async_trait::async_trait;
use std::sync::Arc;
use ttt_core::{GameRecord, GameState};
use ttt_types::{ConnectionId, GameId, ThreadId};

/// Filter for [`GameStore::find_by_query`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameQuery {
    /// Only games bound to this connection.
    pub connection_id: Option<ConnectionId>,
    /// Only games in this state.
    pub state: Option<GameState>,
}

impl GameQuery {
    /// Match every game.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a connection.
    pub fn connection(mut self, connection_id: ConnectionId) -> Self {
        self.connection_id = Some(connection_id);
        self
    }

    /// Restrict to a state.
    pub fn state(mut self, state: GameState) -> Self {
        self.state = Some(state);
        self
    }

    /// Whether `record` passes this filter.
    pub fn matches(&self, record: &GameRecord) -> bool {
        self.connection_id
            .as_ref()
            .map_or(true, |c| *c == record.connection_id)
            && self.state.map_or(true, |s| s == record.state)
    }
}

/// Trait for game record storage backends.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Persist a new record.
    ///
    /// Fails with [`StorageError::DuplicateGame`] if the id is taken and with
    /// [`StorageError::DuplicateThread`] if a record already uses its thread id.
    async fn create(&self, record: &GameRecord) -> Result<(), StorageError>;

    /// Overwrite the mutable fields of an existing record.
    ///
    /// Fails with [`StorageError::NotFound`] if the id was never created.
    async fn update(&self, record: &GameRecord) -> Result<(), StorageError>;

    /// Get a record by its local id.
    async fn find_by_id(&self, id: &GameId) -> Result<Option<GameRecord>, StorageError>;

    /// Get the record correlated with a thread.
    async fn find_by_thread_id(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<GameRecord>, StorageError>;

    /// All records passing `query`, oldest first.
    async fn find_by_query(&self, query: &GameQuery) -> Result<Vec<GameRecord>, StorageError>;
}

#[async_trait]
impl<T: GameStore + ?Sized> GameStore for Arc<T> {
    async fn create(&self, record: &GameRecord) -> Result<(), StorageError> {
        (**self).create(record).await
    }

    async fn update(&self, record: &GameRecord) -> Result<(), StorageError> {
        (**self).update(record).await
    }

    async fn find_by_id(&self, id: &GameId) -> Result<Option<GameRecord>, StorageError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_thread_id(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<GameRecord>, StorageError> {
        (**self).find_by_thread_id(thread_id).await
    }

    async fn find_by_query(&self, query: &GameQuery) -> Result<Vec<GameRecord>, StorageError> {
        (**self).find_by_query(query).await
    }
}
