//! Board model: a 3×3 grid derived by replaying a move list.

use std::fmt;
use thiserror::Error;
use ttt_types::{Mark, MoveToken};

/// Lines checked for a winner, in order: rows, columns, diagonals.
const LINES: [[(usize, usize); 3]; 8] = [
    // rows
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    // columns
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    // diagonals
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// Errors raised while building a board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// A move targets a cell that is already taken.
    #[error("cell of {token} is already taken by {owner}")]
    Occupied {
        /// The offending move.
        token: MoveToken,
        /// Mark already in the cell.
        owner: Mark,
    },
}

/// A single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Nobody played here.
    Empty,
    /// Taken by a mark.
    Taken(Mark),
}

/// 3×3 board indexed by `[row][col]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [[Cell; 3]; 3],
}

impl Board {
    /// Empty board.
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; 3]; 3],
        }
    }

    /// Replay `moves` in order.
    ///
    /// A second write to the same cell is an error, never an overwrite.
    pub fn from_moves<'a, I>(moves: I) -> Result<Self, BoardError>
    where
        I: IntoIterator<Item = &'a MoveToken>,
    {
        let mut board = Self::new();
        for token in moves {
            board.place(token)?;
        }
        Ok(board)
    }

    /// Write the move's mark into its cell.
    pub fn place(&mut self, token: &MoveToken) -> Result<(), BoardError> {
        let (mark, row, col) = token.decode();
        match self.cells[row][col] {
            Cell::Empty => {
                self.cells[row][col] = Cell::Taken(mark);
                Ok(())
            }
            Cell::Taken(owner) => Err(BoardError::Occupied {
                token: token.clone(),
                owner,
            }),
        }
    }

    /// Cell at `row` / `col`, `None` outside 0..=2.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row)?.get(col).copied()
    }

    /// Whether `row` / `col` is on the board and still empty.
    pub fn is_free(&self, row: usize, col: usize) -> bool {
        self.get(row, col) == Some(Cell::Empty)
    }

    /// First mark owning a complete line, if any.
    pub fn winner(&self) -> Option<Mark> {
        LINES.into_iter().find_map(|line| {
            let [a, b, c] = line.map(|(row, col)| self.cells[row][col]);
            match a {
                Cell::Taken(mark) if a == b && b == c => Some(mark),
                _ => None,
            }
        })
    }

    /// No empty cell left.
    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|c| *c != Cell::Empty)
    }

    /// Number of taken cells.
    pub fn taken(&self) -> usize {
        self.cells.iter().flatten().filter(|c| **c != Cell::Empty).count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   A B C")?;
        for (row, cells) in self.cells.iter().enumerate() {
            write!(f, "{}  ", row + 1)?;
            for (col, cell) in cells.iter().enumerate() {
                let symbol = match cell {
                    Cell::Empty => '.',
                    Cell::Taken(mark) => mark.as_char(),
                };
                write!(f, "{}", symbol)?;
                if col < 2 {
                    write!(f, " ")?;
                }
            }
            if row < 2 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
