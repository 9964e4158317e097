//! # ttt-types
//!
//! Wire format types for the two-party tic-tac-toe protocol.
//!
//! This crate provides the foundational types shared by every other crate:
//! - [`GameId`], [`MessageId`], [`ThreadId`], [`ConnectionId`] - Identity and correlation types
//! - [`Mark`], [`MoveToken`] - The move token grammar (`^[XO]:[ABC][1-3]$`)
//! - [`ProtocolMessage`] - Protocol messages (Move, Outcome)
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;
mod moves;

pub use error::TypesError;
pub use ids::{ConnectionId, GameId, MessageId, ThreadId};
pub use messages::{
    Inbound, MessageType, MoveMessage, OutcomeMessage, ProtocolMessage, PROTOCOL_ID,
};
pub use moves::{Mark, MoveToken};
