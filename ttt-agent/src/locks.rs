//! Per-game mutual exclusion.
//!
//! A local move and an inbound message for the same game must not interleave
//! their read-validate-persist sequences. Games are keyed by thread id, which
//! is known both for local intents (via the record) and inbound messages.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use ttt_types::ThreadId;

/// Table of per-thread async mutexes.
///
/// An entry lives only while some task holds or waits on its lock.
#[derive(Debug, Default)]
pub struct GameLocks {
    locks: DashMap<ThreadId, Arc<Mutex<()>>>,
}

impl GameLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `thread_id`, waiting if another task holds it.
    pub async fn lock(&self, thread_id: &ThreadId) -> GameLockGuard<'_> {
        let lock = self
            .locks
            .entry(*thread_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        GameLockGuard {
            locks: self,
            thread_id: *thread_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of tracked threads.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no thread is tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held lock on one thread. Dropping it removes the table entry once no other
/// task holds or waits on it.
#[derive(Debug)]
pub struct GameLockGuard<'a> {
    locks: &'a GameLocks,
    thread_id: ThreadId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for GameLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold a clone, so only the table's own reference means idle.
        self.locks
            .locks
            .remove_if(&self.thread_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_thread_is_exclusive() {
        let locks = Arc::new(GameLocks::new());
        let thread = ThreadId::new();

        let guard = locks.lock(&thread).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&thread).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_threads_do_not_block() {
        let locks = GameLocks::new();
        let _a = locks.lock(&ThreadId::new()).await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.lock(&ThreadId::new()))
            .await
            .unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn released_lock_leaves_no_entry() {
        let locks = GameLocks::new();
        let held = ThreadId::new();
        let guard = locks.lock(&held).await;
        drop(locks.lock(&ThreadId::new()).await);

        assert_eq!(locks.len(), 1);

        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn waiter_keeps_entry_until_done() {
        let locks = Arc::new(GameLocks::new());
        let thread = ThreadId::new();
        let guard = locks.lock(&thread).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&thread).await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Released with a waiter queued: the entry must survive for it.
        drop(guard);
        assert_eq!(locks.len(), 1);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(locks.is_empty());
    }
}
