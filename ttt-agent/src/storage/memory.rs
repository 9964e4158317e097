//! In-memory storage backend.

use super::{GameQuery, GameStore};
use crate::error::StorageError;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use ttt_core::GameRecord;
use ttt_types::{GameId, ThreadId};

/// Game store held in process memory. Records are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryGameStore {
    /// Records with their insertion sequence, for stable ordering.
    games: DashMap<GameId, (u64, GameRecord)>,
    /// Thread id index.
    threads: DashMap<ThreadId, GameId>,
    next_seq: AtomicU64,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored games.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn create(&self, record: &GameRecord) -> Result<(), StorageError> {
        match self.threads.entry(record.thread_id) {
            Entry::Occupied(_) => Err(StorageError::DuplicateThread {
                thread_id: record.thread_id.to_string(),
            }),
            Entry::Vacant(_) if self.games.contains_key(&record.id) => {
                Err(StorageError::DuplicateGame {
                    game_id: record.id.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                self.games.insert(record.id, (seq, record.clone()));
                slot.insert(record.id);
                Ok(())
            }
        }
    }

    async fn update(&self, record: &GameRecord) -> Result<(), StorageError> {
        match self.games.get_mut(&record.id) {
            Some(mut stored) => {
                stored.1 = record.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound {
                game_id: record.id.to_string(),
            }),
        }
    }

    async fn find_by_id(&self, id: &GameId) -> Result<Option<GameRecord>, StorageError> {
        Ok(self.games.get(id).map(|entry| entry.1.clone()))
    }

    async fn find_by_thread_id(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<GameRecord>, StorageError> {
        let id = match self.threads.get(thread_id) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.find_by_id(&id).await
    }

    async fn find_by_query(&self, query: &GameQuery) -> Result<Vec<GameRecord>, StorageError> {
        let mut found: Vec<(u64, GameRecord)> = self
            .games
            .iter()
            .filter(|entry| query.matches(&entry.1))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|(seq, record)| (record.created_at, *seq));
        Ok(found.into_iter().map(|(_, record)| record).collect())
    }
}
