//! Pattern scores for Gomoku evaluation
//!
//! Two weight sets are kept per material: the static weight summed into the
//! board score, and the ordering weight used by the static-exchange estimate.

use std::sync::OnceLock;

use super::Score;
use crate::pattern::Material;

/// Static weights of the materials that can still grow.
///
/// Fives and open fours never reach the evaluation; the search resolves them
/// first.
pub struct PatternScore;

impl PatternScore {
    pub const BLOCKED_FOUR: Score = 364;
    pub const OPEN_THREE: Score = 364;
    pub const BLOCKED_THREE: Score = 99;
    pub const OPEN_TWO: Score = 99;
    pub const BLOCKED_TWO: Score = 29;
    pub const OPEN_ONE: Score = 31;
    pub const BLOCKED_ONE: Score = 8;
}

/// Move-ordering weights
pub struct SeeScore;

impl SeeScore {
    pub const FOUR_OR_THREE: Score = 2048;
    pub const THREE_OR_TWO: Score = 256;
    pub const TWO_OR_ONE: Score = 16;
    pub const ONE: Score = 1;
}

#[inline]
pub fn material_score(m: Material) -> Score {
    match m {
        Material::C6 | Material::C5 | Material::F4 => 0,
        Material::B4 => PatternScore::BLOCKED_FOUR,
        Material::F3 => PatternScore::OPEN_THREE,
        Material::B3 => PatternScore::BLOCKED_THREE,
        Material::F2 => PatternScore::OPEN_TWO,
        Material::B2 => PatternScore::BLOCKED_TWO,
        Material::F1 => PatternScore::OPEN_ONE,
        Material::B1 => PatternScore::BLOCKED_ONE,
    }
}

#[inline]
pub fn see_weight(m: Material) -> Score {
    match m {
        Material::C6 | Material::C5 | Material::F4 => 0,
        Material::B4 | Material::F3 => SeeScore::FOUR_OR_THREE,
        Material::B3 | Material::F2 => SeeScore::THREE_OR_TWO,
        Material::B2 | Material::F1 => SeeScore::TWO_OR_ONE,
        Material::B1 => SeeScore::ONE,
    }
}

/// Bits of a cell tag fed into [`see_table`]: 7 promotion bits (B4..=B1)
/// followed by 7 own-demotion bits.
pub const SEE_BITS: u32 = 14;

/// Ordering value of every combination of promotion and demotion bits.
///
/// Bit `m - 3` adds the weight of `m` for B4..=B1. Bit `m + 4` subtracts it
/// for B3..=B1; losing a B4 or F3 to your own stone is not penalised.
pub fn see_table() -> &'static [Score] {
    static TABLE: OnceLock<Vec<Score>> = OnceLock::new();
    TABLE.get_or_init(|| {
        (0..1u32 << SEE_BITS)
            .map(|bits| {
                Material::MINOR
                    .iter()
                    .map(|&m| {
                        let mut s = 0;
                        if bits >> (m as u32 - 3) & 1 != 0 {
                            s += see_weight(m);
                        }
                        if m > Material::F3 && bits >> (m as u32 + 4) & 1 != 0 {
                            s -= see_weight(m);
                        }
                        s
                    })
                    .sum::<Score>()
            })
            .collect()
    })
}
