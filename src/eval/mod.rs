//! Evaluation module for Gomoku/Renju
//!
//! The board keeps a running material score per color; this module holds the
//! weights behind it, the score constants shared with the search, and the
//! static-exchange table used for move ordering.

pub mod patterns;

pub use patterns::{material_score, see_table, see_weight, PatternScore, SeeScore};

use crate::board::STACK_SIZE;

/// Centipawn-like evaluation unit
pub type Score = i32;

pub const SCORE_ZERO: Score = 0;
pub const SCORE_DRAW: Score = 0;
pub const SCORE_WIN: Score = 32000;
pub const SCORE_INF: Score = 32001;
pub const SCORE_NONE: Score = 32002;
/// Any score beyond this is a proven win at some distance
pub const SCORE_WIN_THRESHOLD: Score = SCORE_WIN - STACK_SIZE as Score;

/// Ordering scores at or above this mark a tactical move
pub const SEE_THRESHOLD: Score = 12;
/// Ordering bonus for cells that defend an open three
pub const BONUS_F3D: Score = 1024;
/// Ordering bonus for killer and counter moves
pub const BONUS_REFUTATION: Score = 1536;

/// Score of a proven win `distance` plies away
#[inline]
pub fn win_in(distance: i32) -> Score {
    SCORE_WIN - distance
}

/// Score of a proven loss `distance` plies away
#[inline]
pub fn loss_in(distance: i32) -> Score {
    -SCORE_WIN + distance
}

/// Human-readable evaluation: `+vN`/`-vN` for proven results
pub fn format_score(score: Score) -> String {
    if score > SCORE_WIN_THRESHOLD {
        format!("+v{}", SCORE_WIN - score)
    } else if score < -SCORE_WIN_THRESHOLD {
        format!("-v{}", SCORE_WIN + score)
    } else {
        score.to_string()
    }
}
