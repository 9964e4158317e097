//! Marks and the move token grammar.
//!
//! A move token is the ASCII string `<Mark>:<Column><Row>`:
//! `X` or `O`, then a column `A`..`C` and a row `1`..`3`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A player's symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    /// `X`
    #[serde(rename = "X")]
    Cross,
    /// `O`
    #[serde(rename = "O")]
    Circle,
}

impl Mark {
    /// Both marks, in the order the board checks them.
    pub const ALL: [Mark; 2] = [Mark::Cross, Mark::Circle];

    /// The mark played by the other party.
    pub fn opposite(self) -> Self {
        match self {
            Mark::Cross => Mark::Circle,
            Mark::Circle => Mark::Cross,
        }
    }

    /// Single-character wire form.
    pub fn as_char(self) -> char {
        match self {
            Mark::Cross => 'X',
            Mark::Circle => 'O',
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Mark {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" => Ok(Mark::Cross),
            "O" => Ok(Mark::Circle),
            _ => Err(TypesError::InvalidMark(s.to_string())),
        }
    }
}

/// A validated move token such as `X:B2`.
///
/// Construction always goes through the grammar check, including serde
/// deserialization, so holding a `MoveToken` means the string is well formed.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MoveToken(String);

impl MoveToken {
    /// Build the token for `mark` at board `row` / `col` (both 0..=2).
    ///
    /// Returns `None` when the coordinates are off the board.
    pub fn new(mark: Mark, row: usize, col: usize) -> Option<Self> {
        if row > 2 || col > 2 {
            return None;
        }
        let column = (b'A' + col as u8) as char;
        let digit = (b'1' + row as u8) as char;
        Some(Self(format!("{}:{}{}", mark.as_char(), column, digit)))
    }

    /// Decode into `(mark, row, col)`.
    ///
    /// Row is the digit minus one; column `A`/`B`/`C` maps to 0/1/2.
    pub fn decode(&self) -> (Mark, usize, usize) {
        let bytes = self.0.as_bytes();
        let mark = if bytes[0] == b'X' {
            Mark::Cross
        } else {
            Mark::Circle
        };
        let col = (bytes[2] - b'A') as usize;
        let row = (bytes[3] - b'1') as usize;
        (mark, row, col)
    }

    /// The mark this move places.
    pub fn mark(&self) -> Mark {
        self.decode().0
    }

    /// Get the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_token(s: &str) -> bool {
    matches!(
        s.as_bytes(),
        [b'X' | b'O', b':', b'A'..=b'C', b'1'..=b'3']
    )
}

impl FromStr for MoveToken {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_valid_token(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(TypesError::InvalidMove(s.to_string()))
        }
    }
}

impl TryFrom<String> for MoveToken {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if is_valid_token(&s) {
            Ok(Self(s))
        } else {
            Err(TypesError::InvalidMove(s))
        }
    }
}

impl From<MoveToken> for String {
    fn from(token: MoveToken) -> Self {
        token.0
    }
}

impl fmt::Display for MoveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MoveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MoveToken({})", self.0)
    }
}
