//! Open-three records
//!
//! Each open three on the board is tracked with the cells that turn it into
//! an open four and the cells that defend it. The records are refreshed after
//! every move, and a record with no four cell or no defence cell left is
//! dropped.

use super::{Board, Direction, Move, Piece};
use crate::pattern::Material;

pub const FOUR_CELLS: usize = 2;
pub const DEFENCE_CELLS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenThree {
    pub owner: Piece,
    /// Stone that formed the three
    pub anchor: Move,
    pub direction: Direction,
    /// Line the three lies on
    pub line: usize,
    /// Cells that make an open four, `Move::NONE` padded
    pub four_cells: [Move; FOUR_CELLS],
    /// Cells where an opponent stone breaks the three, `Move::NONE` padded
    pub defences: [Move; DEFENCE_CELLS],
    /// Refreshes survived; zero means formed by the latest move
    pub age: i32,
}

impl OpenThree {
    pub fn new(owner: Piece, anchor: Move, direction: Direction, line: usize) -> Self {
        OpenThree {
            owner,
            anchor,
            direction,
            line,
            four_cells: [Move::NONE; FOUR_CELLS],
            defences: [Move::NONE; DEFENCE_CELLS],
            age: 0,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.four_cells[0].is_none() && !self.defences[0].is_none()
    }

    pub(crate) fn add_four_cell(&mut self, m: Move) {
        if let Some(slot) = self.four_cells.iter_mut().find(|c| c.is_none()) {
            *slot = m;
        }
    }

    pub(crate) fn add_defence(&mut self, m: Move) {
        if let Some(slot) = self.defences.iter_mut().find(|c| c.is_none()) {
            *slot = m;
        }
    }

    /// Recompute both cell lists from the current board.
    ///
    /// With `renju_black`, a four cell only counts when the resulting shape is
    /// a plain open four with no overline, blocked four or second three.
    pub(crate) fn refresh(&mut self, board: &Board, renju_black: bool) {
        self.four_cells = [Move::NONE; FOUR_CELLS];
        self.defences = [Move::NONE; DEFENCE_CELLS];
        let step = self.direction.step();

        for k in -4..=4 {
            let m = self.anchor.offset(step * k);
            if !board.is_empty(m) {
                continue;
            }
            let forms_four = if renju_black {
                board.query_gain(self.owner, m, Material::C6) == 0
                    && board.query_gain(self.owner, m, Material::F4) == 1
                    && board.query_gain(self.owner, m, Material::B4) == 0
                    && board.query_gain(self.owner, m, Material::F3) <= 1
            } else {
                board.query_gain(self.owner, m, Material::F4) > 0
            };
            if forms_four {
                self.add_four_cell(m);
            }
            if board.query_defence(self.owner.opponent(), m, Material::F3) > 0 {
                self.add_defence(m);
            }
        }
    }
}
