//! Error types for game operations.
//!
//! Every error is a rejected operation: nothing was persisted, no event was
//! emitted and no message was produced.

use thiserror::Error;
use ttt_types::{Mark, MoveToken};

use crate::board::BoardError;
use crate::game::GameState;

/// Why a move was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalMove {
    /// A Move without a move on an existing thread.
    #[error("cannot make empty move")]
    EmptyMove,

    /// The opponent played the mark this party owns.
    #[error("cannot receive own mark {0} from opponent")]
    OwnMarkReceived(Mark),

    /// This party tried to play the opponent's mark.
    #[error("cannot use opponent mark {0}")]
    OpponentMark(Mark),

    /// Inbound move while it is not the opponent's turn.
    #[error("not their turn (state: {0})")]
    NotTheirTurn(GameState),

    /// Local move while it is not this party's turn.
    #[error("not your turn (state: {0})")]
    NotMyTurn(GameState),

    /// Target cell already taken.
    #[error("cell of {0} is already taken")]
    CellOccupied(MoveToken),
}

/// Errors returned by game operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Token fails the `^[XO]:[ABC][1-3]$` grammar.
    #[error("invalid move: {0:?}")]
    InvalidMove(String),

    /// Move is not allowed in the current state or board.
    #[error("illegal move: {0}")]
    IllegalMove(#[from] IllegalMove),

    /// Referenced game or thread does not exist locally.
    #[error("game not found: {0}")]
    NotFound(String),

    /// Declared winner disagrees with the local board.
    #[error("wrong winner: declared {declared}, board says {}", display_winner(.actual))]
    WrongWinner {
        /// Winner claimed by the peer.
        declared: Mark,
        /// Winner computed from the local moves.
        actual: Option<Mark>,
    },

    /// A stored record breaks a record invariant.
    #[error("corrupt game record: {0}")]
    CorruptRecord(String),
}

impl From<BoardError> for GameError {
    fn from(err: BoardError) -> Self {
        GameError::CorruptRecord(err.to_string())
    }
}

fn display_winner(winner: &Option<Mark>) -> String {
    match winner {
        Some(mark) => mark.to_string(),
        None => "none".to_string(),
    }
}
