//! Merged pattern table
//!
//! Rows are indexed by `bits + (1 << len) - 1`. A line and its mirror image
//! share one physical row whenever their rows agree after remapping cells
//! `k -> len - 1 - k`; the offset of the mirrored line then carries the
//! [`REVERSED`] flag and lookups read the cell tags back to front.

use std::sync::OnceLock;

use log::info;

use super::line::{Freestyle, Judge, Line, LineRule, Standard};
use super::{Material, MATERIAL_NONE, MATERIAL_SLOTS, MIN_LINE_LEN};
use crate::board::BOARD_SIDE;

const REVERSED: u32 = 1 << 31;

/// Longest line the standard table covers; larger boards are freestyle only
pub const STANDARD_MAX_LEN: usize = 15;

/// Rule family a table was generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Freestyle,
    Standard,
}

pub struct PatternTable {
    kind: TableKind,
    max_len: usize,
    offsets: Vec<u32>,
    rows: Vec<u32>,
    shared: usize,
}

impl PatternTable {
    pub fn generate(kind: TableKind, max_len: usize) -> Self {
        match kind {
            TableKind::Freestyle => Self::build::<Freestyle>(kind, max_len),
            TableKind::Standard => Self::build::<Standard>(kind, max_len),
        }
    }

    fn build<R: LineRule>(kind: TableKind, max_len: usize) -> Self {
        let judge = Judge::<R>::new(max_len);
        let mut table = PatternTable {
            kind,
            max_len,
            offsets: vec![0; 1 << (max_len + 1)],
            rows: Vec::new(),
            shared: 0,
        };

        for len in MIN_LINE_LEN..=max_len {
            for bits in 0..1u32 << len {
                let line = Line::new(bits, len);
                let mirror = line.reversed();
                let row = judge.row(&line);

                // The mirror was stored on its own earlier; reuse it when it agrees
                if mirror.bits() < bits {
                    let start = (table.offsets[mirror.index()] & !REVERSED) as usize;
                    let stored = &table.rows[start..start + len + 1];
                    let agrees = stored[0] == row[0]
                        && (0..len).all(|k| stored[1 + len - 1 - k] == row[1 + k]);
                    if agrees {
                        table.offsets[line.index()] = start as u32 | REVERSED;
                        table.shared += 1;
                        continue;
                    }
                }

                table.offsets[line.index()] = table.rows.len() as u32;
                table.rows.extend_from_slice(&row);
            }
        }
        table
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Number of lines served by their mirror's row
    pub fn shared_rows(&self) -> usize {
        self.shared
    }

    /// Entry for a segment of `len` cells with owner stones `bits`.
    ///
    /// Bit `k` of `bits` is board cell `k` of the segment.
    #[inline]
    pub fn entry(&self, bits: u32, len: usize) -> TableEntry<'_> {
        debug_assert!(len >= MIN_LINE_LEN && len <= self.max_len);
        let line = Line::new(bits, len);
        let offset = self.offsets[line.index()];
        let start = (offset & !REVERSED) as usize;
        TableEntry {
            row: &self.rows[start..start + len + 1],
            reversed: offset & REVERSED != 0,
        }
    }
}

/// One row of the table, seen from the caller's orientation
#[derive(Debug, Clone, Copy)]
pub struct TableEntry<'a> {
    row: &'a [u32],
    reversed: bool,
}

impl<'a> TableEntry<'a> {
    #[inline]
    pub fn material_info(&self) -> u32 {
        self.row[0]
    }

    /// Materials of the segment, strongest first
    pub fn materials(&self) -> impl Iterator<Item = Material> + 'a {
        let info = self.row[0];
        (0..MATERIAL_SLOTS)
            .map(move |s| (info >> (4 * s)) & 0xF)
            .take_while(|&n| n != MATERIAL_NONE)
            .filter_map(|n| Material::from_index(n as usize))
    }

    /// Segment length
    #[inline]
    pub fn len(&self) -> usize {
        self.row.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tag bits of board cell `k` of the segment
    #[inline]
    pub fn cell(&self, k: usize) -> u32 {
        if self.reversed {
            self.row[self.len() - k]
        } else {
            self.row[1 + k]
        }
    }
}

static FREESTYLE: OnceLock<PatternTable> = OnceLock::new();
static STANDARD: OnceLock<PatternTable> = OnceLock::new();

fn generate_logged(kind: TableKind, max_len: usize) -> PatternTable {
    let started = std::time::Instant::now();
    let table = PatternTable::generate(kind, max_len);
    info!(
        "{:?} pattern table: {} rows, {} lines shared with their mirror, {:?}",
        kind,
        table.rows.len(),
        table.shared,
        started.elapsed()
    );
    table
}

/// Process-wide table of `kind`, generated on first use
pub fn table(kind: TableKind) -> &'static PatternTable {
    match kind {
        TableKind::Freestyle => FREESTYLE.get_or_init(|| generate_logged(kind, BOARD_SIDE)),
        TableKind::Standard => STANDARD
            .get_or_init(|| generate_logged(kind, BOARD_SIDE.min(STANDARD_MAX_LEN))),
    }
}
