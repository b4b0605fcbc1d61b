//! Zobrist hashing for position identification
//!
//! The board keeps its key incrementally: every placed stone XORs the key of
//! its (color, cell) pair in, and taking it back XORs the same key out.
//!
//! # Example
//!
//! ```
//! use gomoku::board::{zobrist, Board, Move, Piece, Rule};
//!
//! let mut board = Board::new(Rule::Freestyle);
//! let m = Move::new(7, 7);
//! board.do_move(m);
//! assert_eq!(board.key(), zobrist().key(Piece::Black, m));
//! board.undo_move();
//! assert_eq!(board.key(), 0);
//! ```

use std::sync::OnceLock;

use super::{Move, Piece, MOVE_CAPACITY};

const SEED: u64 = 1_070_372;

/// xorshift64* generator with a fixed seed, so keys are identical across runs
struct Prng(u64);

impl Prng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        self.0.wrapping_mul(2_685_821_657_736_338_717)
    }
}

/// Random keys for every (color, padded cell) pair
pub struct ZobristTable {
    keys: [Vec<u64>; 2],
}

impl ZobristTable {
    #[must_use]
    pub fn new() -> Self {
        let mut rng = Prng(SEED);
        let black = (0..MOVE_CAPACITY).map(|_| rng.next()).collect();
        let white = (0..MOVE_CAPACITY).map(|_| rng.next()).collect();
        Self {
            keys: [black, white],
        }
    }

    #[inline]
    pub fn key(&self, piece: Piece, m: Move) -> u64 {
        self.keys[piece.index()][m.index()]
    }

    /// Hash of a whole stone list, for checking the incremental key
    pub fn hash<I>(&self, stones: I) -> u64
    where
        I: IntoIterator<Item = (Piece, Move)>,
    {
        stones
            .into_iter()
            .fold(0, |h, (piece, m)| h ^ self.key(piece, m))
    }
}

impl Default for ZobristTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide key table
pub fn zobrist() -> &'static ZobristTable {
    static TABLE: OnceLock<ZobristTable> = OnceLock::new();
    TABLE.get_or_init(ZobristTable::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = ZobristTable::new();
        let b = ZobristTable::new();
        let m = Move::new(3, 4);
        assert_eq!(a.key(Piece::Black, m), b.key(Piece::Black, m));
        assert_ne!(a.key(Piece::Black, m), a.key(Piece::White, m));
    }

    #[test]
    fn test_keys_are_distinct() {
        let zt = zobrist();
        let mut seen = std::collections::HashSet::new();
        for m in Move::all() {
            assert!(seen.insert(zt.key(Piece::Black, m)), "duplicate key at {}", m);
            assert!(seen.insert(zt.key(Piece::White, m)), "duplicate key at {}", m);
        }
    }

    #[test]
    fn test_hash_is_order_independent() {
        let zt = zobrist();
        let stones = [
            (Piece::Black, Move::new(7, 7)),
            (Piece::White, Move::new(7, 8)),
            (Piece::Black, Move::new(8, 8)),
        ];
        let forward = zt.hash(stones.iter().copied());
        let backward = zt.hash(stones.iter().rev().copied());
        assert_eq!(forward, backward);
        assert_ne!(forward, 0);
    }
}
