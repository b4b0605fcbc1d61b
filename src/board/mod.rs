//! Board representation for Gomoku/Renju
//!
//! Cells are addressed through a padded coordinate so that neighbour lookups
//! up to four cells away never leave the backing array:
//!
//! ```text
//! move = ((rank + 4) << 5) + file + 4
//! ```
//!
//! Cells outside the playing area hold [`Piece::Out`].

pub mod bitboard;
pub mod board;
pub mod interval;
pub mod movelist;
pub mod open_three;
pub mod zobrist;

#[cfg(test)]
mod tests;

use std::fmt;

// Re-exports
pub use bitboard::Bitboard;
pub use board::{Board, Wld};
pub use interval::{geometry, Geometry, Interval, IntervalTable};
pub use movelist::{ExtMove, ListItem, MoveList};
pub use open_three::OpenThree;
pub use zobrist::{zobrist, ZobristTable};

/// Board side length (15x15, or 20x20 with the `board-20` feature)
#[cfg(not(feature = "board-20"))]
pub const BOARD_SIDE: usize = 15;
#[cfg(feature = "board-20")]
pub const BOARD_SIDE: usize = 20;

pub const BOARD_SIDE_BIT: u32 = 5;
pub const BOARD_BOUNDARY: i32 = 4;
/// Number of padded cells
pub const MOVE_CAPACITY: usize = 1 << (2 * BOARD_SIDE_BIT);
/// Number of playable cells
pub const MOVE_SIZE: usize = BOARD_SIDE * BOARD_SIDE;
/// Per-ply stacks hold one snapshot per possible piece count
pub const STACK_SIZE: usize = MOVE_SIZE + 1;
/// Ranks, files and both diagonal families
pub const VECTOR_SIZE: usize = BOARD_SIDE * 6 - 2;
pub const DIRECTION_NUM: usize = 4;

/// Step between neighbours along each direction, in padded coordinates
pub const D: [i32; DIRECTION_NUM] = [
    1,                         // right
    (1 << BOARD_SIDE_BIT) - 1, // down left
    1 << BOARD_SIDE_BIT,       // down
    (1 << BOARD_SIDE_BIT) + 1, // down right
];

/// Cells within distance 2 along the four lines
pub const N2: [i32; 16] = [
    -D[3] - D[3],
    -D[2] - D[2],
    -D[1] - D[1],
    -D[3],
    -D[2],
    -D[1],
    -D[0] - D[0],
    -D[0],
    D[0],
    D[0] + D[0],
    D[1],
    D[2],
    D[3],
    D[1] + D[1],
    D[2] + D[2],
    D[3] + D[3],
];

/// Wider neighbourhood used for opening moves
pub const N3: [i32; 32] = [
    -D[3] - D[3] - D[3],
    -D[2] - D[2] - D[2],
    -D[1] - D[1] - D[1],
    -D[3] - D[3],
    -D[3] - D[2],
    -D[2] - D[2],
    -D[2] - D[1],
    -D[1] - D[1],
    -D[3] - D[0],
    -D[3],
    -D[2],
    -D[1],
    -D[1] + D[0],
    -D[0] - D[0] - D[0],
    -D[0] - D[0],
    -D[0],
    D[0],
    D[0] + D[0],
    D[0] + D[0] + D[0],
    D[1] - D[0],
    D[1],
    D[2],
    D[3],
    D[3] + D[0],
    D[1] + D[1],
    D[1] + D[2],
    D[2] + D[2],
    D[3] + D[2],
    D[3] + D[3],
    D[1] + D[1] + D[1],
    D[2] + D[2] + D[2],
    D[3] + D[3] + D[3],
];

/// Cells within distance 4 along the four lines, used by the VCF solver
pub const N4: [i32; 32] = [
    -D[3] - D[3] - D[3] - D[3],
    -D[2] - D[2] - D[2] - D[2],
    -D[1] - D[1] - D[1] - D[1],
    -D[3] - D[3] - D[3],
    -D[2] - D[2] - D[2],
    -D[1] - D[1] - D[1],
    -D[3] - D[3],
    -D[2] - D[2],
    -D[1] - D[1],
    -D[3],
    -D[2],
    -D[1],
    -D[0] - D[0] - D[0] - D[0],
    -D[0] - D[0] - D[0],
    -D[0] - D[0],
    -D[0],
    D[0],
    D[0] + D[0],
    D[0] + D[0] + D[0],
    D[0] + D[0] + D[0] + D[0],
    D[1],
    D[2],
    D[3],
    D[1] + D[1],
    D[2] + D[2],
    D[3] + D[3],
    D[1] + D[1] + D[1],
    D[2] + D[2] + D[2],
    D[3] + D[3] + D[3],
    D[1] + D[1] + D[1] + D[1],
    D[2] + D[2] + D[2] + D[2],
    D[3] + D[3] + D[3] + D[3],
];

/// Game rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Five or more in a row wins
    Freestyle,
    /// Exactly five wins, overlines do not count
    Standard,
    /// Standard for the first player plus overline/double-four/double-three fouls
    Renju,
}

impl Rule {
    /// Map the numeric rule of the text protocol.
    ///
    /// `0` is freestyle, `1` standard, `2` and `4` renju.
    pub fn from_protocol(n: i64) -> Option<Rule> {
        match n {
            0 => Some(Rule::Freestyle),
            1 => Some(Rule::Standard),
            2 | 4 => Some(Rule::Renju),
            _ => None,
        }
    }
}

/// Cell content. `Black` always refers to the side that moved first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece {
    Black = 0,
    White = 1,
    Empty = 2,
    Out = 3,
}

impl Piece {
    /// Get opponent color
    #[inline]
    pub fn opponent(self) -> Piece {
        match self {
            Piece::Black => Piece::White,
            Piece::White => Piece::Black,
            other => other,
        }
    }

    /// Index into per-color arrays. Only meaningful for the two colors.
    #[inline]
    pub fn index(self) -> usize {
        debug_assert!(matches!(self, Piece::Black | Piece::White));
        self as usize
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Piece::Black => "BLACK",
            Piece::White => "WHITE",
            Piece::Empty => "EMPTY",
            Piece::Out => "OUT",
        };
        f.pad(name)
    }
}

/// Line direction. The order matches the step table [`D`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Rank = 0,
    ADiag = 1,
    File = 2,
    MDiag = 3,
}

impl Direction {
    pub const ALL: [Direction; DIRECTION_NUM] = [
        Direction::Rank,
        Direction::ADiag,
        Direction::File,
        Direction::MDiag,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Padded-coordinate step to the next cell along this direction
    #[inline]
    pub fn step(self) -> i32 {
        D[self as usize]
    }
}

/// A board cell in padded coordinates. `Move::NONE` (0) is never on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Move(u16);

impl Move {
    pub const NONE: Move = Move(0);

    /// Cell at `rank`, `file` (both zero based).
    #[inline]
    pub const fn new(rank: usize, file: usize) -> Move {
        Move((((rank as i32 + BOARD_BOUNDARY) << BOARD_SIDE_BIT) + file as i32 + BOARD_BOUNDARY) as u16)
    }

    /// Inverse of [`index`](Self::index)
    #[inline]
    pub(crate) const fn from_index(i: usize) -> Move {
        Move(i as u16)
    }

    /// Checked constructor for coordinates coming from outside the engine
    pub fn from_coords(rank: i64, file: i64) -> Option<Move> {
        let side = BOARD_SIDE as i64;
        if (0..side).contains(&rank) && (0..side).contains(&file) {
            Some(Move::new(rank as usize, file as usize))
        } else {
            None
        }
    }

    /// Centre cell, the first move on an empty board
    #[inline]
    pub const fn center() -> Move {
        Move::new(BOARD_SIDE / 2, BOARD_SIDE / 2)
    }

    #[inline]
    pub const fn rank(self) -> i32 {
        (self.0 as i32 >> BOARD_SIDE_BIT) - BOARD_BOUNDARY
    }

    #[inline]
    pub const fn file(self) -> i32 {
        (self.0 as i32 & ((1 << BOARD_SIDE_BIT) - 1)) - BOARD_BOUNDARY
    }

    /// True when the cell lies on the playing area
    #[inline]
    pub const fn is_ok(self) -> bool {
        let (r, f) = (self.rank(), self.file());
        r >= 0 && r < BOARD_SIDE as i32 && f >= 0 && f < BOARD_SIDE as i32
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Padded index, usable for arrays of [`MOVE_CAPACITY`]
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Cell `delta` padded steps away. The result may be off the board.
    #[inline]
    pub fn offset(self, delta: i32) -> Move {
        let raw = self.0 as i32 + delta;
        debug_assert!(raw >= 0 && (raw as usize) < MOVE_CAPACITY);
        Move(raw as u16)
    }

    /// Chebyshev distance
    #[inline]
    pub fn distance(self, other: Move) -> i32 {
        (self.rank() - other.rank())
            .abs()
            .max((self.file() - other.file()).abs())
    }

    /// Iterate every playable cell, rank-major
    pub fn all() -> impl Iterator<Item = Move> {
        (0..BOARD_SIDE).flat_map(|r| (0..BOARD_SIDE).map(move |f| Move::new(r, f)))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("NONE");
        }
        let file = (b'a' + self.file() as u8) as char;
        write!(f, "{}{}", file, BOARD_SIDE as i32 - self.rank())
    }
}
