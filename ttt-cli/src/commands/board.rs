//! Replay moves and print the board.

use anyhow::{Context, Result};
use ttt_core::{parse_move, Board};

/// Run the board command.
pub fn run(moves: &[String]) -> Result<()> {
    let board = replay(moves)?;

    println!("{}", board);
    println!();
    match board.winner() {
        Some(mark) => println!("Winner: {}", mark),
        None if board.is_full() => println!("Board full, no winner"),
        None => println!("No winner yet ({} of 9 cells taken)", board.taken()),
    }
    Ok(())
}

/// Parse every token and replay them in order.
pub fn replay(moves: &[String]) -> Result<Board> {
    let tokens = moves
        .iter()
        .enumerate()
        .map(|(i, m)| parse_move(m).with_context(|| format!("Move {}", i + 1)))
        .collect::<Result<Vec<_>>>()?;

    Board::from_moves(&tokens).context("Moves do not form a valid game")
}
