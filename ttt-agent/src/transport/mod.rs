//! Transport abstraction for protocol messages.
//!
//! The game logic never talks to a network. Hosts hand outbound messages to a
//! [`Transport`] and feed decoded inbound messages to
//! [`TicTacToeApi::dispatch`](crate::TicTacToeApi::dispatch).
//!
//! # Delivery assumptions
//!
//! - Fire-and-forget: a successful `send` only means the message was handed
//!   over.
//! - Messages on one connection arrive in the order they were sent. Nothing
//!   above the transport detects or repairs reordering within a thread.

mod loopback;
mod mock;

pub use loopback::{Inbox, LoopbackEndpoint, LoopbackNetwork, LoopbackPeer};
pub use mock::MockTransport;

use async_trait::async_trait;
use thiserror::Error;
use ttt_types::{ConnectionId, ProtocolMessage, TypesError};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No such connection.
    #[error("not connected: {0}")]
    NotConnected(ConnectionId),

    /// The peer went away.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] TypesError),
}

/// Outbound side of the messaging layer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `message` to the peer on `connection`.
    async fn send(
        &self,
        connection: &ConnectionId,
        message: ProtocolMessage,
    ) -> Result<(), TransportError>;

    /// Whether `connection` is currently usable.
    fn has_connection(&self, connection: &ConnectionId) -> bool;
}
