//! Protocol messages for the tic-tac-toe protocol.
//!
//! Both messages carry their own [`MessageId`] and the [`ThreadId`] of the
//! game they belong to. The first Move of a game opens the thread: its thread
//! id is its own message id.

use serde::{Deserialize, Serialize};

use crate::{ConnectionId, Mark, MessageId, MoveToken, ThreadId, TypesError};

/// Protocol identifier announced to peers.
pub const PROTOCOL_ID: &str = "https://didcomm.org/tictactoe/1.0";

/// Message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// A move, or an invitation to play when it carries no move
    Move,
    /// Declaration of the winner
    Outcome,
}

impl MessageType {
    /// The message type URI used on the wire.
    pub fn uri(self) -> &'static str {
        match self {
            MessageType::Move => "https://didcomm.org/tictactoe/1.0/move",
            MessageType::Outcome => "https://didcomm.org/tictactoe/1.0/outcome",
        }
    }
}

/// All possible protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolMessage {
    /// A move on a game thread
    #[serde(rename = "https://didcomm.org/tictactoe/1.0/move")]
    Move(MoveMessage),
    /// The winner of a game thread
    #[serde(rename = "https://didcomm.org/tictactoe/1.0/outcome")]
    Outcome(OutcomeMessage),
}

impl ProtocolMessage {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        rmp_serde::to_vec_named(self).map_err(TypesError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        rmp_serde::from_slice(bytes).map_err(TypesError::Deserialization)
    }

    /// Get the message type.
    pub fn message_type(&self) -> MessageType {
        match self {
            ProtocolMessage::Move(_) => MessageType::Move,
            ProtocolMessage::Outcome(_) => MessageType::Outcome,
        }
    }

    /// Thread this message belongs to.
    pub fn thread_id(&self) -> ThreadId {
        match self {
            ProtocolMessage::Move(m) => m.thread_id,
            ProtocolMessage::Outcome(m) => m.thread_id,
        }
    }

    /// This message's own identifier.
    pub fn id(&self) -> MessageId {
        match self {
            ProtocolMessage::Move(m) => m.id,
            ProtocolMessage::Outcome(m) => m.id,
        }
    }
}

impl From<MoveMessage> for ProtocolMessage {
    fn from(message: MoveMessage) -> Self {
        ProtocolMessage::Move(message)
    }
}

impl From<OutcomeMessage> for ProtocolMessage {
    fn from(message: OutcomeMessage) -> Self {
        ProtocolMessage::Outcome(message)
    }
}

/// A move on a game thread.
///
/// Without a move it is an invitation to play: the receiver creates the game
/// and waits for its local player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveMessage {
    /// Message identifier
    pub id: MessageId,
    /// Game thread
    pub thread_id: ThreadId,
    /// The move, if any
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub move_token: Option<MoveToken>,
    /// Free-form comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl MoveMessage {
    /// First message of a new game; the thread id is this message's id.
    pub fn open_thread(move_token: Option<MoveToken>) -> Self {
        Self::opening(ThreadId::new(), move_token)
    }

    /// The message that opens `thread_id`. Its id equals the thread id.
    pub fn opening(thread_id: ThreadId, move_token: Option<MoveToken>) -> Self {
        Self {
            id: MessageId::from(*thread_id.as_uuid()),
            thread_id,
            move_token,
            comment: None,
        }
    }

    /// A move on an existing thread.
    pub fn in_thread(thread_id: ThreadId, move_token: Option<MoveToken>) -> Self {
        Self {
            id: MessageId::new(),
            thread_id,
            move_token,
            comment: None,
        }
    }
}

/// Declaration of the winner, sent by the party that detected it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeMessage {
    /// Message identifier
    pub id: MessageId,
    /// Game thread
    pub thread_id: ThreadId,
    /// Winning mark
    pub winner: Mark,
    /// Free-form comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl OutcomeMessage {
    /// Outcome on an existing thread.
    pub fn in_thread(thread_id: ThreadId, winner: Mark) -> Self {
        Self {
            id: MessageId::new(),
            thread_id,
            winner,
            comment: None,
        }
    }
}

/// A decoded inbound message together with the connection it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound<M> {
    /// The message
    pub message: M,
    /// The receiver's id for the connection to the sender
    pub connection_id: ConnectionId,
}

impl<M> Inbound<M> {
    /// Wrap a message received on `connection_id`.
    pub fn new(message: M, connection_id: ConnectionId) -> Self {
        Self {
            message,
            connection_id,
        }
    }
}
