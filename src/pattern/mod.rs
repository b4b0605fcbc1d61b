//! Tactical line patterns
//!
//! Every line segment that one color could still use (its own stones and
//! empty cells, bounded by opponent stones or the edge) is classified into
//! tactical materials. The classification is precomputed for every bit
//! string up to the board side, once per rule family, and queried by the
//! board on each incremental update.

pub mod line;
pub mod table;

use crate::board::{Piece, Rule};

pub use line::{Line, LineRule};
pub use table::{table, PatternTable, TableEntry, TableKind};

/// Shortest segment that can still hold a five
pub const MIN_LINE_LEN: usize = 5;
pub const MATERIAL_NUM: usize = 10;
/// Nibble marking an unused material slot
pub const MATERIAL_NONE: u32 = 0xF;
/// Material slots per table row
pub const MATERIAL_SLOTS: usize = 8;

/// Tactical material classes, from most to least urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Material {
    /// Six or more in a row
    C6 = 0,
    /// Five in a row
    C5,
    /// Open four
    F4,
    /// Blocked four
    B4,
    /// Open three
    F3,
    /// Blocked three
    B3,
    /// Open two
    F2,
    /// Blocked two
    B2,
    /// Open one
    F1,
    /// Blocked one
    B1,
}

impl Material {
    pub const ALL: [Material; MATERIAL_NUM] = [
        Material::C6,
        Material::C5,
        Material::F4,
        Material::B4,
        Material::F3,
        Material::B3,
        Material::F2,
        Material::B2,
        Material::F1,
        Material::B1,
    ];

    /// The four-or-weaker classes that can share a line
    pub const MINOR: [Material; 7] = [
        Material::B4,
        Material::F3,
        Material::B3,
        Material::F2,
        Material::B2,
        Material::F1,
        Material::B1,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(i: usize) -> Option<Material> {
        Material::ALL.get(i).copied()
    }

    /// Stones a segment needs before this material can exist
    #[inline]
    pub fn piece_req(self) -> i32 {
        match self {
            Material::C6 => 6,
            m => 5 - m as i32 / 2,
        }
    }

    /// The class one stone above (B4 promotes to C5, F3 to F4, ...)
    #[inline]
    pub fn promote(self) -> Material {
        if self >= Material::B4 {
            Material::ALL[self as usize - 2]
        } else {
            self
        }
    }

    /// The class one stone below
    #[inline]
    pub fn demote(self) -> Material {
        if self >= Material::C5 && self <= Material::B2 {
            Material::ALL[self as usize + 2]
        } else {
            self
        }
    }

    /// Strict priority: `self` is a stronger threat than `other`.
    ///
    /// Open and blocked classes of the same stone count are not ordered
    /// against the next tier when `self` is the blocked one.
    #[inline]
    pub fn prior_to(self, other: Material) -> bool {
        let diff = other as i32 - self as i32;
        if diff >= 2 {
            true
        } else if diff <= 0 {
            false
        } else {
            self as i32 % 2 == 0
        }
    }

    /// Short name used in board dumps
    pub fn name(self) -> &'static str {
        match self {
            Material::C6 => "C6",
            Material::C5 => "C5",
            Material::F4 => "F4",
            Material::B4 => "B4",
            Material::F3 => "F3",
            Material::B3 => "B3",
            Material::F2 => "F2",
            Material::B2 => "B2",
            Material::F1 => "F1",
            Material::B1 => "B1",
        }
    }
}

/// Per-cell tag bits stored in the pattern table.
///
/// For an empty cell of a segment owned by one color:
/// - bits 0..=9: a stone of the owner here increases material `m` (bit `m`)
/// - bits 10..=16: a stone of the owner here decreases `m` in B4..=B1 (bit `m + 7`)
/// - bits 17..=23: an opponent stone here, splitting the segment, increases `m` (bit `m + 14`)
/// - bits 24..=30: an opponent stone here decreases `m` (bit `m + 21`)
/// - bit 31: the cell is a four-in-the-making for VCF
pub mod tag {
    use super::Material;

    pub const VCF: u32 = 1 << 31;

    #[inline]
    pub const fn promote(m: Material) -> u32 {
        1 << m as u32
    }

    #[inline]
    pub const fn demote(m: Material) -> u32 {
        1 << (m as u32 + 7)
    }

    #[inline]
    pub const fn split_promote(m: Material) -> u32 {
        1 << (m as u32 + 14)
    }

    #[inline]
    pub const fn split_demote(m: Material) -> u32 {
        1 << (m as u32 + 21)
    }
}

/// Rule family of the table a color uses under `rule`.
///
/// White under renju plays by freestyle patterns; black under renju plays by
/// standard patterns with fouls checked on top.
#[inline]
pub fn kind_for(rule: Rule, owner: Piece) -> TableKind {
    match (rule, owner) {
        (Rule::Freestyle, _) | (Rule::Renju, Piece::White) => TableKind::Freestyle,
        _ => TableKind::Standard,
    }
}

/// Look up the table entry for a segment of `len` cells of `owner`
#[inline]
pub fn lookup(owner: Piece, rule: Rule, len: usize, bits: u32) -> TableEntry<'static> {
    table(kind_for(rule, owner)).entry(bits, len)
}

/// Force table generation for `rule`, so the first search does not pay for it
pub fn init(rule: Rule) {
    table(kind_for(rule, Piece::Black));
    table(kind_for(rule, Piece::White));
}
