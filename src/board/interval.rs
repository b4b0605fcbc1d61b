//! Line geometry and per-color interval records
//!
//! Every cell belongs to four lines (one per direction). Lines are numbered
//! `0..VECTOR_SIZE`: ranks first, then files, then the two diagonal
//! families. For each color and each cell, an [`Interval`] records the
//! maximal run of cells on that line that contains the cell and holds no
//! opponent stone.

use std::sync::OnceLock;

use super::{Direction, Move, BOARD_SIDE, DIRECTION_NUM, MOVE_CAPACITY, VECTOR_SIZE};

/// Half-open range `begin..end` of positions on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interval {
    pub begin: u8,
    pub end: u8,
}

impl Interval {
    #[inline]
    pub fn new(begin: usize, end: usize) -> Self {
        debug_assert!(begin <= end);
        Interval {
            begin: begin as u8,
            end: end as u8,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.begin) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.begin
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.begin as usize..self.end as usize
    }
}

/// Cell-to-line mapping, shared by every board
pub struct Geometry {
    index_of: Vec<[u16; DIRECTION_NUM]>,
    index_on: Vec<[u8; DIRECTION_NUM]>,
    line_len: Vec<u8>,
    line_start: Vec<Move>,
}

impl Geometry {
    fn new() -> Self {
        let side = BOARD_SIDE as i32;
        let mut geo = Geometry {
            index_of: vec![[0; DIRECTION_NUM]; MOVE_CAPACITY],
            index_on: vec![[0; DIRECTION_NUM]; MOVE_CAPACITY],
            line_len: vec![0; VECTOR_SIZE],
            line_start: vec![Move::NONE; VECTOR_SIZE],
        };

        for m in Move::all() {
            let (r, f) = (m.rank(), m.file());
            // A diagonal is numbered by its first cell: top row, or left/right edge
            let mdiag = if r > f { r - f + side - 1 } else { f - r };
            let adiag = r + f;
            let mdiag_start = r.min(f);
            let adiag_start = if r + f < side { r } else { side - 1 - f };

            let lines = [
                (r as usize, f as usize),
                (f as usize + BOARD_SIDE, r as usize),
                (adiag as usize + 4 * BOARD_SIDE - 1, adiag_start as usize),
                (mdiag as usize + 2 * BOARD_SIDE, mdiag_start as usize),
            ];
            for (d, &(iof, ion)) in [Direction::Rank, Direction::File, Direction::ADiag, Direction::MDiag]
                .iter()
                .zip(lines.iter())
            {
                geo.index_of[m.index()][d.index()] = iof as u16;
                geo.index_on[m.index()][d.index()] = ion as u8;
                geo.line_len[iof] += 1;
                if ion == 0 {
                    geo.line_start[iof] = m;
                }
            }
        }
        geo
    }

    /// Line through `m` along `d`
    #[inline]
    pub fn index_of(&self, m: Move, d: Direction) -> usize {
        self.index_of[m.index()][d.index()] as usize
    }

    /// Position of `m` on its line along `d`
    #[inline]
    pub fn index_on(&self, m: Move, d: Direction) -> usize {
        self.index_on[m.index()][d.index()] as usize
    }

    #[inline]
    pub fn line_len(&self, line: usize) -> usize {
        self.line_len[line] as usize
    }

    /// First cell of a line
    #[inline]
    pub fn line_start(&self, line: usize) -> Move {
        self.line_start[line]
    }

    /// Direction a line runs along
    pub fn line_direction(&self, line: usize) -> Direction {
        match line {
            l if l < BOARD_SIDE => Direction::Rank,
            l if l < 2 * BOARD_SIDE => Direction::File,
            l if l < 4 * BOARD_SIDE - 1 => Direction::MDiag,
            _ => Direction::ADiag,
        }
    }
}

/// Process-wide geometry table
pub fn geometry() -> &'static Geometry {
    static GEOMETRY: OnceLock<Geometry> = OnceLock::new();
    GEOMETRY.get_or_init(Geometry::new)
}

/// Interval records of one color, `[line][position]`
#[derive(Clone, PartialEq, Eq)]
pub struct IntervalTable {
    cells: Vec<[Interval; BOARD_SIDE]>,
}

impl Default for IntervalTable {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalTable {
    /// Every cell spans its whole line
    pub fn new() -> Self {
        let geo = geometry();
        let cells = (0..VECTOR_SIZE)
            .map(|line| {
                let len = geo.line_len(line);
                let mut row = [Interval::default(); BOARD_SIDE];
                for itv in row.iter_mut().take(len) {
                    *itv = Interval::new(0, len);
                }
                row
            })
            .collect();
        IntervalTable { cells }
    }

    #[inline]
    pub fn get(&self, line: usize, pos: usize) -> Interval {
        self.cells[line][pos]
    }

    /// An opponent stone landed on `m`: split the run containing it
    pub fn split(&mut self, m: Move) {
        let geo = geometry();
        for d in Direction::ALL {
            let (line, pos) = (geo.index_of(m, d), geo.index_on(m, d));
            let row = &mut self.cells[line];
            let itv = row[pos];
            for cell in &mut row[itv.begin as usize..pos] {
                cell.end = pos as u8;
            }
            for cell in &mut row[pos + 1..itv.end as usize] {
                cell.begin = (pos + 1) as u8;
            }
        }
    }

    /// Undo [`split`](Self::split): the record kept at `m` still spans the
    /// merged run
    pub fn restore(&mut self, m: Move) {
        let geo = geometry();
        for d in Direction::ALL {
            let (line, pos) = (geo.index_of(m, d), geo.index_on(m, d));
            let row = &mut self.cells[line];
            let itv = row[pos];
            for cell in &mut row[itv.range()] {
                *cell = itv;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_numbering() {
        let geo = geometry();
        let m = Move::new(2, 5);
        assert_eq!(geo.index_of(m, Direction::Rank), 2);
        assert_eq!(geo.index_on(m, Direction::Rank), 5);
        assert_eq!(geo.index_of(m, Direction::File), 5 + BOARD_SIDE);
        assert_eq!(geo.index_on(m, Direction::File), 2);
    }

    #[test]
    fn test_lines_cover_every_cell_once() {
        let geo = geometry();
        let total: usize = (0..VECTOR_SIZE).map(|l| geo.line_len(l)).sum();
        assert_eq!(total, 4 * BOARD_SIDE * BOARD_SIDE);
        for line in 0..VECTOR_SIZE {
            let start = geo.line_start(line);
            assert!(start.is_ok(), "line {} has no start cell", line);
            let d = geo.line_direction(line);
            assert_eq!(geo.index_of(start, d), line);
            assert_eq!(geo.index_on(start, d), 0);
        }
    }

    #[test]
    fn test_positions_follow_direction_step() {
        let geo = geometry();
        for m in Move::all() {
            for d in Direction::ALL {
                let next = m.offset(d.step());
                if next.is_ok() {
                    assert_eq!(geo.index_of(next, d), geo.index_of(m, d));
                    assert_eq!(geo.index_on(next, d), geo.index_on(m, d) + 1);
                }
            }
        }
    }

    #[test]
    fn test_split_and_restore() {
        let mut table = IntervalTable::new();
        let original = table.clone();
        let m = Move::new(7, 7);
        table.split(m);

        let geo = geometry();
        let line = geo.index_of(m, Direction::Rank);
        assert_eq!(table.get(line, 3), Interval::new(0, 7));
        assert_eq!(table.get(line, 10), Interval::new(8, BOARD_SIDE));
        assert_eq!(table.get(line, 7), Interval::new(0, BOARD_SIDE), "the split cell keeps the merged run");

        table.restore(m);
        assert!(table == original, "restore must undo split");
    }
}
