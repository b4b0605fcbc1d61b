//! Search module for Gomoku/Renju
//!
//! Contains:
//! - Transposition table shared by all threads
//! - Staged move generation
//! - Alpha-beta search with iterative deepening and a VCF solver
//! - The thread pool and time management

pub mod alphabeta;
pub mod movegen;
pub mod threads;
pub mod tt;

pub use alphabeta::{RootBest, Worker, DEPTH_ITERATIVE_MAX, DEPTH_MAX};
pub use movegen::{MoveGen, Stage};
pub use threads::{format_nodes, SearchParams, SharedState, ThreadPool, TimeControl, TurnBudget, MAX_THREADS};
pub use tt::{score_from_tt, score_to_tt, Bound, TTData, TTSlot, TTStats, TranspositionTable};
