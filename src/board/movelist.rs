//! Fixed-capacity move lists with O(1) membership

use super::{Bitboard, Move, MOVE_SIZE};
use crate::eval::{Score, SCORE_NONE};

/// Large enough for every empty cell plus a hash move
pub const LIST_CAPACITY: usize = MOVE_SIZE + 1;

/// Anything a [`MoveList`] can hold
pub trait ListItem: Copy + Default {
    fn mv(&self) -> Move;
}

impl ListItem for Move {
    #[inline]
    fn mv(&self) -> Move {
        *self
    }
}

/// A move with its ordering score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtMove {
    pub mv: Move,
    pub score: Score,
}

impl ExtMove {
    #[inline]
    pub fn new(mv: Move, score: Score) -> Self {
        ExtMove { mv, score }
    }
}

impl Default for ExtMove {
    fn default() -> Self {
        ExtMove::new(Move::NONE, SCORE_NONE)
    }
}

impl ListItem for ExtMove {
    #[inline]
    fn mv(&self) -> Move {
        self.mv
    }
}

/// Duplicate-free list of moves. Insertion order is kept until a removal,
/// which swaps the last element into the hole.
#[derive(Clone)]
pub struct MoveList<T: ListItem> {
    items: [T; LIST_CAPACITY],
    len: usize,
    members: Bitboard,
}

impl<T: ListItem> Default for MoveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ListItem> MoveList<T> {
    pub fn new() -> Self {
        MoveList {
            items: [T::default(); LIST_CAPACITY],
            len: 0,
            members: Bitboard::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn contains(&self, m: Move) -> bool {
        self.members.get(m)
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.members.reset();
    }

    /// Append unless the move is already present. Returns whether it was added.
    #[inline]
    pub fn push(&mut self, item: T) -> bool {
        let m = item.mv();
        if self.contains(m) {
            return false;
        }
        debug_assert!(self.len < LIST_CAPACITY);
        self.items[self.len] = item;
        self.len += 1;
        self.members.set(m);
        true
    }

    /// Remove a move if present
    pub fn remove(&mut self, m: Move) {
        if !self.contains(m) {
            return;
        }
        if let Some(i) = self.items[..self.len].iter().position(|it| it.mv() == m) {
            self.len -= 1;
            self.items[i] = self.items[self.len];
            self.members.clear(m);
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items[..self.len]
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items[..self.len]
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Overwrite with the contents of `other` without reallocating
    #[inline]
    pub fn copy_from(&mut self, other: &MoveList<T>) {
        self.items[..other.len].copy_from_slice(&other.items[..other.len]);
        self.len = other.len;
        self.members = other.members;
    }
}

impl<T: ListItem> std::ops::Index<usize> for MoveList<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        &self.as_slice()[i]
    }
}
