//! Line judge used to derive the pattern tables
//!
//! A [`Line`] is a bit string of one color's stones over a segment. Cell `s`
//! of the segment (counting from the left) is bit `len - 1 - s`, so the
//! string reads left to right from the most significant bit.

use std::marker::PhantomData;

use super::{tag, Material, MATERIAL_NONE, MATERIAL_NUM, MATERIAL_SLOTS, MIN_LINE_LEN};

/// A short literal pattern such as `"011110"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pat {
    bits: u32,
    len: usize,
}

const fn pat(s: &str) -> Pat {
    let b = s.as_bytes();
    let mut bits = 0u32;
    let mut i = 0;
    while i < b.len() {
        bits = (bits << 1) | (b[i] == b'1') as u32;
        i += 1;
    }
    Pat { bits, len: b.len() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    bits: u32,
    len: usize,
}

impl Line {
    #[inline]
    pub fn new(bits: u32, len: usize) -> Self {
        debug_assert!(len <= 24);
        Line {
            bits: bits & mask(len),
            len,
        }
    }

    /// Parse a `0`/`1` string, leftmost character first
    pub fn parse(s: &str) -> Self {
        let p = pat(s);
        Line::new(p.bits, p.len)
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
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
    pub fn stones(&self) -> i32 {
        self.bits.count_ones() as i32
    }

    /// Dense index over all lines of every length
    #[inline]
    pub fn index(&self) -> usize {
        self.bits as usize + (1 << self.len) - 1
    }

    #[inline]
    pub fn is_empty_at(&self, pos: usize) -> bool {
        self.bits >> (self.len - 1 - pos) & 1 == 0
    }

    /// Copy with a stone added at `pos`
    #[inline]
    pub fn filled(&self, pos: usize) -> Line {
        Line::new(self.bits | 1 << (self.len - 1 - pos), self.len)
    }

    /// Same cells read right to left
    pub fn reversed(&self) -> Line {
        let bits = if self.len == 0 {
            0
        } else {
            self.bits.reverse_bits() >> (32 - self.len)
        };
        Line::new(bits, self.len)
    }

    /// Cells `from..from + n`
    #[inline]
    pub fn slice(&self, from: usize, n: usize) -> Line {
        debug_assert!(from + n <= self.len);
        Line::new(self.bits >> (self.len - from - n), n)
    }

    /// Cells left of `pos`
    #[inline]
    pub fn left_of(&self, pos: usize) -> Line {
        self.slice(0, pos)
    }

    /// Cells right of `pos`
    #[inline]
    pub fn right_of(&self, pos: usize) -> Line {
        self.slice(pos + 1, self.len - pos - 1)
    }

    /// Leftmost stone, or `len` when there is none
    fn start(&self) -> i32 {
        if self.bits == 0 {
            self.len as i32
        } else {
            self.len as i32 - 32 + self.bits.leading_zeros() as i32
        }
    }

    /// Rightmost stone, or -1 when there is none
    fn end(&self) -> i32 {
        if self.bits == 0 {
            -1
        } else {
            self.len as i32 - 1 - self.bits.trailing_zeros() as i32
        }
    }

    fn matches_at(&self, p: Pat, pos: usize) -> bool {
        pos + p.len <= self.len && self.slice(pos, p.len).bits == p.bits
    }

    /// Overlapping occurrences of `p`
    fn count(&self, p: Pat) -> i32 {
        if p.len > self.len {
            return 0;
        }
        (0..=self.len - p.len).filter(|&s| self.matches_at(p, s)).count() as i32
    }

    fn find(&self, p: Pat, from: usize) -> Option<usize> {
        if p.len > self.len {
            return None;
        }
        (from..=self.len - p.len).find(|&s| self.matches_at(p, s))
    }

    /// Earliest match of any of `pats` at or after `from`
    fn find_any(&self, pats: &[Pat], from: usize) -> Option<usize> {
        pats.iter().filter_map(|&p| self.find(p, from)).min()
    }

    /// Number of open threes found by greedy left-to-right scanning
    fn count_threes(&self, pats: &[Pat], limit: usize) -> i32 {
        let mut found = 0;
        let mut pos = 0;
        while pos < limit {
            match self.find_any(pats, pos) {
                Some(at) => {
                    pos = at + 4;
                    found += 1;
                }
                None => break,
            }
        }
        found
    }

    /// Segment with one empty cell added on each side
    fn padded(&self) -> Line {
        Line::new(self.bits << 1, self.len + 2)
    }
}

#[inline]
const fn mask(len: usize) -> u32 {
    if len >= 32 {
        u32::MAX
    } else {
        (1 << len) - 1
    }
}

#[inline]
fn ceil_div(a: i32, b: i32) -> i32 {
    (a + b - 1) / b
}

/// Rule-specific judgement of the top four materials.
///
/// The remaining materials are derived generically from promotion tests.
pub trait LineRule {
    fn has_c6(line: &Line) -> bool;
    fn has_c5(line: &Line) -> bool;
    fn count_f4(line: &Line) -> i32;
    fn count_f3(line: &Line) -> i32;
}

const THREES: [Pat; 4] = [pat("001110"), pat("010110"), pat("011010"), pat("011100")];

/// Five or more wins; overlines count as fives
pub struct Freestyle;

impl LineRule for Freestyle {
    fn has_c6(_line: &Line) -> bool {
        false
    }

    fn has_c5(line: &Line) -> bool {
        line.count(pat("11111")) > 0
    }

    fn count_f4(line: &Line) -> i32 {
        line.count(pat("011110"))
    }

    fn count_f3(line: &Line) -> i32 {
        line.count_threes(&THREES, line.len)
    }
}

/// Exactly five wins; shapes that could only grow into overlines do not count
pub struct Standard;

impl LineRule for Standard {
    fn has_c6(line: &Line) -> bool {
        line.count(pat("111111")) > 0
    }

    fn has_c5(line: &Line) -> bool {
        let len = line.len;
        if len < 6 {
            return line.count(pat("11111")) > 0;
        }
        line.matches_at(pat("111110"), 0)
            || line.count(pat("0111110")) > 0
            || line.matches_at(pat("011111"), len - 6)
    }

    fn count_f4(line: &Line) -> i32 {
        let len = line.len;
        if len < 7 {
            return line.count(pat("011110"));
        }
        line.matches_at(pat("0111100"), 0) as i32
            + line.count(pat("00111100"))
            + line.matches_at(pat("0011110"), len - 7) as i32
    }

    fn count_f3(line: &Line) -> i32 {
        const PADDED: [Pat; 4] = [
            pat("00011100"),
            pat("00101100"),
            pat("00110100"),
            pat("00111000"),
        ];
        let len = line.len;
        if len <= 5 {
            return 0;
        }
        if len == 6 {
            return THREES.iter().any(|p| p.bits == line.bits) as i32;
        }
        line.padded().count_threes(&PADDED, len)
    }
}

/// Cells beyond the stones that a promotion can reach
fn promotion_reach(m: Material) -> i32 {
    match m {
        Material::B4 => 1,
        Material::B3 | Material::F2 => 2,
        Material::B2 | Material::F1 => 3,
        _ => 4,
    }
}

/// Material counts of every line up to `max_len`, for one rule family
pub struct Judge<R: LineRule> {
    counts: Vec<[u8; MATERIAL_NUM]>,
    max_len: usize,
    _rule: PhantomData<R>,
}

impl<R: LineRule> Judge<R> {
    pub fn new(max_len: usize) -> Self {
        let mut judge = Judge {
            counts: vec![[0; MATERIAL_NUM]; 1 << (max_len + 1)],
            max_len,
            _rule: PhantomData,
        };
        for len in MIN_LINE_LEN..=max_len {
            for m in Material::ALL {
                for bits in 0..1u32 << len {
                    let line = Line::new(bits, len);
                    let n = judge.judge(&line, m);
                    judge.counts[line.index()][m.index()] = n as u8;
                }
            }
        }
        judge
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Number of `m` materials in `line`
    #[inline]
    pub fn count(&self, line: &Line, m: Material) -> i32 {
        if line.len < MIN_LINE_LEN || line.len > self.max_len {
            return 0;
        }
        self.counts[line.index()][m.index()] as i32
    }

    /// Stones not already tied up in stronger materials
    fn piece_avail(&self, line: &Line) -> i32 {
        let used: i32 = Material::ALL
            .iter()
            .map(|&m| self.count(line, m) * m.piece_req())
            .sum();
        (line.stones() - used).max(0)
    }

    fn judge(&self, line: &Line, m: Material) -> i32 {
        let avail = self.piece_avail(line);
        let req = m.piece_req();
        if avail < req {
            return 0;
        }

        let raw = match m {
            Material::C6 => R::has_c6(line) as i32,
            Material::C5 => R::has_c5(line) as i32,
            Material::F4 => R::count_f4(line),
            Material::F3 => R::count_f3(line),
            _ => {
                let reach = promotion_reach(m);
                let lo = (line.start() - reach).max(0);
                let hi = (line.end() + reach).min(line.len as i32 - 1);
                (lo..=hi)
                    .filter(|&pos| self.is_promotion(line, m.promote(), pos as usize))
                    .count() as i32
            }
        };

        // Several promotion cells belong to the same shape
        let n = match m {
            Material::B4 | Material::B3 | Material::B2 | Material::B1 => {
                let per_shape = 5 - req;
                if raw < per_shape {
                    0
                } else {
                    ceil_div(raw, per_shape)
                }
            }
            Material::F2 => {
                if raw < 2 {
                    0
                } else {
                    ceil_div(raw, 4)
                }
            }
            Material::F1 => {
                if raw < 3 {
                    0
                } else {
                    ceil_div(raw, 6)
                }
            }
            _ => raw,
        };
        n.min(ceil_div(avail, req))
    }

    /// A stone at `pos` turns `line` into more `m` without losing anything
    /// stronger than the class just below `m`.
    fn is_promotion(&self, line: &Line, m: Material, pos: usize) -> bool {
        if !line.is_empty_at(pos) {
            return false;
        }
        let filled = line.filled(pos);
        if self.count(&filled, m) <= self.count(line, m) {
            return false;
        }
        let anchor = m.demote();
        Material::ALL
            .iter()
            .take_while(|&&i| !anchor.prior_to(i))
            .filter(|&&i| i != m && i != anchor)
            .all(|&i| self.count(&filled, i) >= self.count(line, i))
    }

    /// Packed material list of a segment: one nibble per material.
    ///
    /// A segment holding a C6, C5 or F4 reports only the first of those.
    /// Otherwise every B4..=B1 occurrence is listed. Unused slots are
    /// [`MATERIAL_NONE`].
    pub fn material_info(&self, line: &Line) -> u32 {
        let mut info = 0u32;
        let mut slots = 0usize;
        let mut put = |m: Material| {
            assert!(
                slots < MATERIAL_SLOTS,
                "segment {:?} holds more than {} materials",
                line,
                MATERIAL_SLOTS
            );
            info |= (m as u32) << (4 * slots);
            slots += 1;
        };
        if let Some(&m) = [Material::C6, Material::C5, Material::F4]
            .iter()
            .find(|&&m| self.count(line, m) > 0)
        {
            put(m);
        } else {
            for m in Material::MINOR {
                for _ in 0..self.count(line, m) {
                    put(m);
                }
            }
        }
        for s in slots..MATERIAL_SLOTS {
            info |= MATERIAL_NONE << (4 * s);
        }
        info
    }

    /// Tag bits of cell `pos` (see [`tag`])
    pub fn position_info(&self, line: &Line, pos: usize) -> u32 {
        if line.len < MIN_LINE_LEN || !line.is_empty_at(pos) {
            return 0;
        }
        let filled = line.filled(pos);
        let (left, right) = (line.left_of(pos), line.right_of(pos));
        let mut ret = 0u32;

        for m in Material::ALL {
            if self.count(&filled, m) > self.count(line, m) {
                ret |= tag::promote(m);
            }
        }
        for m in Material::MINOR {
            let before = self.count(line, m);
            if self.count(&filled, m) < before {
                ret |= tag::demote(m);
            }
            let split = self.count(&left, m) + self.count(&right, m);
            if split > before {
                ret |= tag::split_promote(m);
            }
            if split < before {
                ret |= tag::split_demote(m);
            }
        }

        if ret & tag::promote(Material::B4) != 0 && line.len >= 7 && self.is_vcf_cell(line, pos) {
            ret |= tag::VCF;
        }
        ret
    }

    /// A blocked four made here still leaves room for a follow-up three
    fn is_vcf_cell(&self, line: &Line, pos: usize) -> bool {
        const SHAPES: [(i32, Pat); 6] = [
            (-2, pat("000110")),
            (-3, pat("001010")),
            (-4, pat("001100")),
            (-1, pat("001100")),
            (-2, pat("010100")),
            (-3, pat("011000")),
        ];
        SHAPES.iter().any(|&(shift, p)| {
            let at = pos as i32 + shift;
            at >= 0 && at as usize + p.len <= line.len && line.matches_at(p, at as usize)
        })
    }

    /// A full table row: material info followed by one tag per board cell.
    ///
    /// Board cell `k` of the segment maps to string position `len - 1 - k`.
    pub fn row(&self, line: &Line) -> Vec<u32> {
        let mut row = Vec::with_capacity(line.len + 1);
        row.push(self.material_info(line));
        row.extend((0..line.len).map(|k| self.position_info(line, line.len - 1 - k)));
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free() -> Judge<Freestyle> {
        Judge::new(9)
    }

    fn standard() -> Judge<Standard> {
        Judge::new(9)
    }

    fn count<R: LineRule>(judge: &Judge<R>, s: &str, m: Material) -> i32 {
        judge.count(&Line::parse(s), m)
    }

    #[test]
    fn test_line_slicing() {
        let line = Line::parse("0011010");
        assert_eq!(line.len(), 7);
        assert_eq!(line.left_of(3), Line::parse("001"));
        assert_eq!(line.right_of(3), Line::parse("010"));
        assert_eq!(line.reversed(), Line::parse("0101100"));
        assert!(line.is_empty_at(0));
        assert!(!line.is_empty_at(2));
        assert_eq!(line.filled(0), Line::parse("1011010"));
    }

    #[test]
    fn test_freestyle_fives_and_fours() {
        let j = free();
        assert_eq!(count(&j, "11111", Material::C5), 1);
        assert_eq!(count(&j, "0111111", Material::C5), 1, "overline is a five in freestyle");
        assert_eq!(count(&j, "0111111", Material::C6), 0);
        assert_eq!(count(&j, "011110", Material::F4), 1);
        assert_eq!(count(&j, "11110", Material::B4), 1);
        assert_eq!(count(&j, "11011", Material::B4), 1);
        assert_eq!(count(&j, "11110", Material::F4), 0);
    }

    #[test]
    fn test_freestyle_threes() {
        let j = free();
        assert_eq!(count(&j, "0011100", Material::F3), 1);
        assert_eq!(count(&j, "010110", Material::F3), 1);
        assert_eq!(count(&j, "11100", Material::F3), 0);
        assert_eq!(count(&j, "11100", Material::B3), 1);
        assert_eq!(count(&j, "0011100", Material::B3), 0, "stones of an open three are used up");
    }

    #[test]
    fn test_standard_overline() {
        let j = standard();
        assert_eq!(count(&j, "111111", Material::C6), 1);
        assert_eq!(count(&j, "111111", Material::C5), 0);
        assert_eq!(count(&j, "0111110", Material::C5), 1);
        assert_eq!(count(&j, "1111100", Material::C5), 1);
        assert_eq!(count(&j, "1011110", Material::F4), 0, "a four next to a stone can only make six");
        assert_eq!(count(&j, "00111100", Material::F4), 1);
    }

    #[test]
    fn test_standard_three_edges() {
        let j = standard();
        assert_eq!(count(&j, "011100", Material::F3), 1);
        assert_eq!(count(&j, "00111000", Material::F3), 1);
        assert_eq!(count(&j, "10111000", Material::F3), 0, "one end only leads to an overline");
    }

    #[test]
    fn test_short_lines_hold_nothing() {
        let j = free();
        for m in Material::ALL {
            assert_eq!(count(&j, "1111", m), 0, "{:?} in a four-cell segment", m);
        }
    }

    #[test]
    fn test_material_info_packing() {
        let j = free();
        let info = j.material_info(&Line::parse("011110"));
        assert_eq!(info & 0xF, Material::F4 as u32);
        assert_eq!(info >> 4, 0x0FFF_FFFF, "remaining slots are empty");

        let empty = j.material_info(&Line::parse("00000"));
        assert_eq!(empty, 0xFFFF_FFFF);
    }

    #[test]
    fn test_position_info_open_three() {
        let j = free();
        let line = Line::parse("0011100");
        // Extending the three on either side makes an open four
        assert_ne!(j.position_info(&line, 1) & tag::promote(Material::F4), 0);
        assert_ne!(j.position_info(&line, 5) & tag::promote(Material::F4), 0);
        // An opponent stone next to the three breaks it
        assert_ne!(j.position_info(&line, 1) & tag::split_demote(Material::F3), 0);
        // Occupied cells carry no tags
        assert_eq!(j.position_info(&line, 3), 0);
    }

    #[test]
    fn test_position_info_vcf_bit() {
        let j = free();
        let line = Line::parse("0001100");
        let tags: Vec<u32> = (0..7).map(|p| j.position_info(&line, p) & tag::VCF).collect();
        assert!(tags.iter().all(|&t| t == 0), "two stones cannot make a four: {:?}", tags);

        let line = Line::parse("0011100");
        assert_eq!(j.position_info(&line, 0) & tag::VCF, 0);
    }
}
