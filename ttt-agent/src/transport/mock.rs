//! Mock transport for testing.
//!
//! Captures sent messages for verification and can be told to fail.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use ttt_types::{ConnectionId, ProtocolMessage};

/// Mock transport for testing.
///
/// Every connection id is considered open until [`close`](Self::close) is
/// called for it. Clones share state.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    sent_messages: Vec<(ConnectionId, ProtocolMessage)>,
    closed: HashSet<ConnectionId>,
    fail_next_send: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get all messages that were sent, with their connection.
    pub fn sent_messages(&self) -> Vec<(ConnectionId, ProtocolMessage)> {
        self.inner().sent_messages.clone()
    }

    /// Get the last message that was sent.
    pub fn last_sent(&self) -> Option<(ConnectionId, ProtocolMessage)> {
        self.inner().sent_messages.last().cloned()
    }

    /// Mark `connection` as gone.
    pub fn close(&self, connection: &ConnectionId) {
        self.inner().closed.insert(connection.clone());
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.inner().fail_next_send = Some(error.to_string());
    }

    /// Clear all state (messages, closed connections, pending failure).
    pub fn reset(&self) {
        *self.inner() = MockTransportInner::default();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        connection: &ConnectionId,
        message: ProtocolMessage,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner();

        if inner.closed.contains(connection) {
            return Err(TransportError::NotConnected(connection.clone()));
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent_messages.push((connection.clone(), message));
        Ok(())
    }

    fn has_connection(&self, connection: &ConnectionId) -> bool {
        !self.inner().closed.contains(connection)
    }
}
