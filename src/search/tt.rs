//! Transposition table for caching search results
//!
//! The table is shared by every search thread without locks. Each entry is
//! two `AtomicU64` words: the packed data and `key ^ data`. A reader
//! accepts an entry only when the two words XOR back to its key, so a torn
//! write from another thread reads as a miss.
//!
//! Entries are grouped in clusters of three. A probe that misses hands back
//! the least valuable entry of the cluster as the slot to overwrite.
//!
//! # Example
//!
//! ```
//! use gomoku::board::Move;
//! use gomoku::search::{Bound, TranspositionTable};
//!
//! let tt = TranspositionTable::new(1); // 1 MB
//! let key = 0x1234_5678_9ABC_DEF0;
//!
//! let (hit, slot) = tt.probe(key);
//! assert!(hit.is_none());
//! tt.save(slot, key, Move::new(7, 7), 120, Bound::Exact, true, 5);
//!
//! let (hit, _) = tt.probe(key);
//! let data = hit.unwrap();
//! assert_eq!(data.mv, Move::new(7, 7));
//! assert_eq!(data.score, 120);
//! ```

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::board::Move;
use crate::eval::{Score, SCORE_WIN_THRESHOLD};

/// Kind of score stored in an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    None = 0,
    /// Score <= stored value (alpha fail-low)
    Upper = 1,
    /// Score >= stored value (beta cutoff)
    Lower = 2,
    /// Search completed inside the window
    Exact = 3,
}

impl Bound {
    fn from_bits(bits: u64) -> Bound {
        match bits & 0x3 {
            1 => Bound::Upper,
            2 => Bound::Lower,
            3 => Bound::Exact,
            _ => Bound::None,
        }
    }

    /// True when this bound covers `other` (Exact covers both sides)
    #[inline]
    pub fn includes(self, other: Bound) -> bool {
        (self as u8) & (other as u8) != 0
    }
}

/// Decoded entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTData {
    pub mv: Move,
    pub score: Score,
    pub bound: Bound,
    pub is_pv: bool,
    pub depth: i32,
}

/// Where a probed position lives, or should be stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTSlot {
    cluster: usize,
    index: usize,
}

/// Statistics about transposition table usage.
#[derive(Debug, Clone, Copy)]
pub struct TTStats {
    /// Total number of entries
    pub size: usize,
    /// Entries written during the current search
    pub used: usize,
    /// Per-mille of the sampled entries in use
    pub hashfull: u32,
}

const CLUSTER_SIZE: usize = 3;

// Low bits of the generation byte hold the bound and the pv flag
const GENERATION_BITS: u32 = 3;
const GENERATION_DELTA: u8 = 1 << GENERATION_BITS;
const GENERATION_CYCLE: i32 = 255 + (1 << GENERATION_BITS);
const GENERATION_MASK: i32 = (0xFF << GENERATION_BITS) & 0xFF;

/// Data word layout:
/// ```text
/// bits [0..16]   move
/// bits [16..32]  score (i16)
/// bits [32..40]  generation | pv << 2 | bound
/// bits [40..48]  depth
/// ```
#[inline]
fn pack(mv: Move, score: Score, gen_bound: u8, depth: i32) -> u64 {
    mv.index() as u64
        | ((score as i16 as u16 as u64) << 16)
        | ((gen_bound as u64) << 32)
        | ((depth.clamp(0, 255) as u64) << 40)
}

#[inline]
fn unpack_move(data: u64) -> Move {
    Move::from_index((data & 0xFFFF) as usize)
}

#[inline]
fn unpack_gen_bound(data: u64) -> u8 {
    ((data >> 32) & 0xFF) as u8
}

#[inline]
fn unpack_depth(data: u64) -> i32 {
    ((data >> 40) & 0xFF) as i32
}

fn unpack(data: u64) -> TTData {
    let gen_bound = unpack_gen_bound(data);
    TTData {
        mv: unpack_move(data),
        score: ((data >> 16) & 0xFFFF) as u16 as i16 as Score,
        bound: Bound::from_bits(gen_bound as u64),
        is_pv: gen_bound & 0x4 != 0,
        depth: unpack_depth(data),
    }
}

#[derive(Default)]
struct Entry {
    key: AtomicU64,
    data: AtomicU64,
}

impl Entry {
    #[inline]
    fn load(&self) -> (u64, u64) {
        let data = self.data.load(Ordering::Relaxed);
        let key = self.key.load(Ordering::Relaxed) ^ data;
        (key, data)
    }

    #[inline]
    fn store(&self, key: u64, data: u64) {
        self.data.store(data, Ordering::Relaxed);
        self.key.store(key ^ data, Ordering::Relaxed);
    }
}

#[derive(Default)]
struct Cluster {
    entries: [Entry; CLUSTER_SIZE],
}

/// Lock-free transposition table, shared by reference between threads.
pub struct TranspositionTable {
    clusters: Vec<Cluster>,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Create a table of roughly `size_mb` megabytes.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        let cluster_bytes = std::mem::size_of::<Cluster>();
        let count = ((size_mb.max(1) * 1024 * 1024) / cluster_bytes).max(1024);
        let mut clusters = Vec::with_capacity(count);
        clusters.resize_with(count, Cluster::default);
        Self {
            clusters,
            generation: AtomicU8::new(0),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.clusters.len() * CLUSTER_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Table size in megabytes, rounded down
    pub fn size_mb(&self) -> usize {
        self.clusters.len() * std::mem::size_of::<Cluster>() / (1024 * 1024)
    }

    #[inline]
    fn cluster_of(&self, key: u64) -> usize {
        ((key as u128 * self.clusters.len() as u128) >> 64) as usize
    }

    #[inline]
    fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Age every entry by one search
    pub fn new_search(&self) {
        self.generation.fetch_add(GENERATION_DELTA, Ordering::Relaxed);
    }

    /// Look up `key`.
    ///
    /// On a hit the entry's generation is refreshed. On a miss the returned
    /// slot is an empty entry, or the one with the lowest
    /// `depth - relative age`.
    pub fn probe(&self, key: u64) -> (Option<TTData>, TTSlot) {
        let cluster = self.cluster_of(key);
        let entries = &self.clusters[cluster].entries;
        let generation = self.generation();

        for (index, entry) in entries.iter().enumerate() {
            let (stored, data) = entry.load();
            let depth = unpack_depth(data);
            if depth == 0 {
                return (None, TTSlot { cluster, index });
            }
            if stored == key {
                let gen_bound = generation | (unpack_gen_bound(data) & (GENERATION_DELTA - 1));
                let refreshed = (data & !(0xFFu64 << 32)) | ((gen_bound as u64) << 32);
                entry.store(key, refreshed);
                return (Some(unpack(refreshed)), TTSlot { cluster, index });
            }
        }

        let worth = |e: &Entry| {
            let data = e.load().1;
            let age = (GENERATION_CYCLE + generation as i32 - unpack_gen_bound(data) as i32) & GENERATION_MASK;
            unpack_depth(data) - age
        };
        let index = (1..CLUSTER_SIZE).fold(0, |best, i| {
            if worth(&entries[best]) > worth(&entries[i]) {
                i
            } else {
                best
            }
        });
        (None, TTSlot { cluster, index })
    }

    /// Write a search result into `slot`.
    ///
    /// The stored move survives a move-less save of the same position, and a
    /// same-position entry searched deeper is kept unless the new bound is
    /// exact.
    #[allow(clippy::too_many_arguments)]
    pub fn save(&self, slot: TTSlot, key: u64, mv: Move, score: Score, bound: Bound, pv: bool, depth: i32) {
        let entry = &self.clusters[slot.cluster].entries[slot.index];
        let (stored, data) = entry.load();
        let same = stored == key && unpack_depth(data) != 0;

        let mv = if !mv.is_none() || !same { mv } else { unpack_move(data) };

        if bound == Bound::Exact || !same || depth > unpack_depth(data) - 4 {
            let gen_bound = self.generation() | (pv as u8) << 2 | bound as u8;
            entry.store(key, pack(mv, score, gen_bound, depth));
        } else if mv != unpack_move(data) {
            let data = (data & !0xFFFFu64) | mv.index() as u64;
            entry.store(key, data);
        }
    }

    /// Zero every entry
    pub fn clear(&mut self) {
        for cluster in self.clusters.iter_mut() {
            *cluster = Cluster::default();
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Approximate usage, sampled over the first thousand clusters
    #[must_use]
    pub fn stats(&self) -> TTStats {
        let sample = self.clusters.len().min(1000);
        let generation = self.generation();
        let used = self.clusters[..sample]
            .iter()
            .flat_map(|c| c.entries.iter())
            .filter(|e| {
                let data = e.load().1;
                unpack_depth(data) != 0 && unpack_gen_bound(data) & !(GENERATION_DELTA - 1) == generation
            })
            .count();
        let hashfull = (used * 1000 / (sample * CLUSTER_SIZE)) as u32;
        TTStats {
            size: self.len(),
            used: used * self.clusters.len() / sample,
            hashfull,
        }
    }
}

/// Convert a root-relative win score to a node-relative one for storing
#[inline]
pub fn score_to_tt(score: Score, ply: i32) -> Score {
    if score > SCORE_WIN_THRESHOLD {
        score + ply
    } else if score < -SCORE_WIN_THRESHOLD {
        score - ply
    } else {
        score
    }
}

/// Inverse of [`score_to_tt`]
#[inline]
pub fn score_from_tt(score: Score, ply: i32) -> Score {
    if score > SCORE_WIN_THRESHOLD {
        score - ply
    } else if score < -SCORE_WIN_THRESHOLD {
        score + ply
    } else {
        score
    }
}
