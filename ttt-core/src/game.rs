//! Per-party game record and the turn-taking state machine.
//!
//! Each party keeps its own [`GameRecord`]. The two records converge only
//! through Move and Outcome messages on the shared thread, so every
//! transition here is a pure function of the current record and one input:
//!
//! ```text
//!                 make_move                 receive_move
//!   NotStarted ──────────────► TheirTurn ─────────────────► MyTurn
//!       │                         ▲                           │
//!       │ receive_move            └───────── make_move ───────┘
//!       ▼                                                     │
//!     MyTurn                 receive_move (line complete)     ▼
//!                            receive_outcome ──────────────► Done
//! ```
//!
//! The party whose move completes a line does not see `Done` until the
//! opponent answers with an Outcome; [`GameRecord::make_move`] never checks
//! for a winner itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ttt_types::{ConnectionId, GameId, Mark, MoveToken, ThreadId};

use crate::board::Board;
use crate::error::{GameError, IllegalMove};

/// Where a game stands from this party's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    /// Created, no move played yet.
    NotStarted,
    /// This party plays next.
    MyTurn,
    /// The opponent plays next.
    TheirTurn,
    /// Terminal; the winner is known.
    Done,
}

impl GameState {
    /// Name used in storage and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            GameState::NotStarted => "NotStarted",
            GameState::MyTurn => "MyTurn",
            GameState::TheirTurn => "TheirTurn",
            GameState::Done => "Done",
        }
    }

    /// No transition leaves this state.
    pub fn is_terminal(self) -> bool {
        self == GameState::Done
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameState {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotStarted" => Ok(GameState::NotStarted),
            "MyTurn" => Ok(GameState::MyTurn),
            "TheirTurn" => Ok(GameState::TheirTurn),
            "Done" => Ok(GameState::Done),
            other => Err(GameError::CorruptRecord(format!("unknown state {:?}", other))),
        }
    }
}

/// Parse a move token, mapping grammar failures to [`GameError::InvalidMove`].
pub fn parse_move(token: &str) -> Result<MoveToken, GameError> {
    token
        .parse()
        .map_err(|_| GameError::InvalidMove(token.to_string()))
}

/// The authoritative local view of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Local identifier.
    pub id: GameId,
    /// Unix timestamp (seconds) of creation.
    pub created_at: u64,
    /// Thread shared with the peer.
    pub thread_id: ThreadId,
    /// Connection to the peer.
    pub connection_id: ConnectionId,
    /// Moves in play order, both parties interleaved.
    pub moves: Vec<MoveToken>,
    /// Current state.
    pub state: GameState,
    /// Mark this party plays, once known.
    pub my_mark: Option<Mark>,
    /// Set exactly when `state` is `Done`.
    pub winner: Option<Mark>,
}

/// Instructions for the host, produced by a transition.
///
/// These are not side effects: the host persists the new record first and
/// then carries the actions out in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send the Move that opens the record's thread.
    OpenThread {
        /// First move, or `None` for an invitation.
        token: Option<MoveToken>,
    },
    /// Send a Move on the record's thread.
    SendMove {
        /// The move just played.
        token: MoveToken,
    },
    /// Send an Outcome on the record's thread, back to the peer.
    SendOutcome {
        /// The winning mark.
        winner: Mark,
    },
    /// Announce the state change to local observers.
    EmitStateChanged {
        /// State before the transition, `None` for a new record.
        previous_state: Option<GameState>,
    },
}

/// Result of a successful operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The record to persist.
    pub record: GameRecord,
    /// State before the operation, `None` when the record is new.
    pub previous_state: Option<GameState>,
    /// What the host must do after persisting.
    pub actions: Vec<Action>,
}

impl Transition {
    /// Whether the record was created by this transition.
    pub fn is_new(&self) -> bool {
        self.previous_state.is_none()
    }
}

impl GameRecord {
    /// Local intent to initiate a game on `connection_id`.
    ///
    /// With a first move this party takes that move's mark and waits for the
    /// opponent; without one the game is an invitation and stays `NotStarted`.
    pub fn start(
        id: GameId,
        created_at: u64,
        connection_id: ConnectionId,
        thread_id: ThreadId,
        first_move: Option<MoveToken>,
    ) -> Transition {
        let record = GameRecord {
            id,
            created_at,
            thread_id,
            connection_id,
            state: if first_move.is_some() {
                GameState::TheirTurn
            } else {
                GameState::NotStarted
            },
            my_mark: first_move.as_ref().map(MoveToken::mark),
            moves: first_move.iter().cloned().collect(),
            winner: None,
        };
        Transition {
            record,
            previous_state: None,
            actions: vec![Action::OpenThread { token: first_move }],
        }
    }

    /// First Move received on an unknown thread: this party is the responder.
    ///
    /// With a move, this party takes the opposite mark and plays next. No
    /// message is sent; the local player acts next.
    pub fn from_first_contact(
        id: GameId,
        created_at: u64,
        connection_id: ConnectionId,
        thread_id: ThreadId,
        incoming: Option<MoveToken>,
    ) -> Transition {
        let record = GameRecord {
            id,
            created_at,
            thread_id,
            connection_id,
            state: if incoming.is_some() {
                GameState::MyTurn
            } else {
                GameState::NotStarted
            },
            my_mark: incoming.as_ref().map(|t| t.mark().opposite()),
            moves: incoming.iter().cloned().collect(),
            winner: None,
        };
        Transition {
            record,
            previous_state: None,
            actions: vec![Action::EmitStateChanged {
                previous_state: None,
            }],
        }
    }

    /// Apply the opponent's Move on this record's thread.
    pub fn receive_move(&self, incoming: Option<&MoveToken>) -> Result<Transition, GameError> {
        let token = incoming.ok_or(IllegalMove::EmptyMove)?;
        let (mark, row, col) = token.decode();

        if self.my_mark == Some(mark) {
            return Err(IllegalMove::OwnMarkReceived(mark).into());
        }
        if !matches!(self.state, GameState::NotStarted | GameState::TheirTurn) {
            return Err(IllegalMove::NotTheirTurn(self.state).into());
        }
        let mut board = self.board()?;
        if !board.is_free(row, col) {
            return Err(IllegalMove::CellOccupied(token.clone()).into());
        }
        board.place(token)?;

        let mut next = self.clone();
        next.moves.push(token.clone());
        next.my_mark.get_or_insert(mark.opposite());
        next.state = GameState::MyTurn;

        let mut actions = vec![Action::EmitStateChanged {
            previous_state: Some(self.state),
        }];
        if let Some(winner) = board.winner() {
            next.winner = Some(winner);
            next.state = GameState::Done;
            actions.push(Action::SendOutcome { winner });
        }

        Ok(Transition {
            record: next,
            previous_state: Some(self.state),
            actions,
        })
    }

    /// Apply the peer's Outcome, after checking it against the local board.
    pub fn receive_outcome(&self, declared: Mark) -> Result<Transition, GameError> {
        let actual = self.board()?.winner();
        if actual != Some(declared) {
            return Err(GameError::WrongWinner { declared, actual });
        }

        let mut next = self.clone();
        next.winner = Some(declared);
        next.state = GameState::Done;

        Ok(Transition {
            record: next,
            previous_state: Some(self.state),
            actions: vec![Action::EmitStateChanged {
                previous_state: Some(self.state),
            }],
        })
    }

    /// Local intent to play `token`.
    ///
    /// Does not look for a winner; see the module docs.
    pub fn make_move(&self, token: &MoveToken) -> Result<Transition, GameError> {
        let (mark, row, col) = token.decode();

        if let Some(mine) = self.my_mark {
            if mine != mark {
                return Err(IllegalMove::OpponentMark(mark).into());
            }
        }
        if !matches!(self.state, GameState::NotStarted | GameState::MyTurn) {
            return Err(IllegalMove::NotMyTurn(self.state).into());
        }
        if !self.board()?.is_free(row, col) {
            return Err(IllegalMove::CellOccupied(token.clone()).into());
        }

        let mut next = self.clone();
        next.moves.push(token.clone());
        next.my_mark.get_or_insert(mark);
        next.state = GameState::TheirTurn;

        Ok(Transition {
            record: next,
            previous_state: Some(self.state),
            actions: vec![
                Action::SendMove {
                    token: token.clone(),
                },
                Action::EmitStateChanged {
                    previous_state: Some(self.state),
                },
            ],
        })
    }

    /// Board derived from the move list.
    pub fn board(&self) -> Result<Board, GameError> {
        Ok(Board::from_moves(&self.moves)?)
    }

    /// Check the record invariants, for records read back from storage.
    pub fn validate(&self) -> Result<(), GameError> {
        self.board()?;
        if self.winner.is_some() != (self.state == GameState::Done) {
            return Err(GameError::CorruptRecord(format!(
                "winner {:?} with state {}",
                self.winner, self.state
            )));
        }
        if let Some(mine) = self.my_mark {
            let foreign = self.moves.iter().filter(|t| t.mark() != mine).count();
            let own = self.moves.len() - foreign;
            if own.abs_diff(foreign) > 1 {
                return Err(GameError::CorruptRecord(format!(
                    "{} own moves against {} opponent moves",
                    own, foreign
                )));
            }
        }
        Ok(())
    }

    /// Board is full and nobody won; no further move can succeed.
    pub fn is_stalled(&self) -> bool {
        self.state != GameState::Done
            && self
                .board()
                .map(|b| b.is_full() && b.winner().is_none())
                .unwrap_or(false)
    }
}
