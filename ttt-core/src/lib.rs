//! # ttt-core
//!
//! Pure logic for the two-party tic-tac-toe protocol (no I/O, instant tests).
//!
//! This crate implements the board model and the per-party game state machine
//! without any network or disk I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. Every transition is computed on a copy of the record
//! and returned together with the [`Action`]s the host must perform, so a
//! rejected operation never leaves a half-updated record behind.
//!
//! Persisting, sending and notifying are performed by `ttt-agent`, which
//! interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod board;
pub mod error;
pub mod game;

pub use board::{Board, BoardError, Cell};
pub use error::{GameError, IllegalMove};
pub use game::{parse_move, Action, GameRecord, GameState, Transition};
