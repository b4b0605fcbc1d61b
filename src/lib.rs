//! Gomoku/Renju engine
//!
//! A Gomoku and Renju playing engine built around an incremental pattern
//! board:
//! - 15x15 board (20x20 with the `board-20` feature, freestyle only)
//! - Freestyle, standard (exact five) and renju rules
//! - Renju fouls for black: overline, double four, double three
//!
//! # Architecture
//!
//! The engine is organized into several modules:
//! - [`pattern`]: Line pattern tables, generated once per rule
//! - [`board`]: Board with incremental material, see tags and open threes
//! - [`eval`]: Material and move-ordering weights, score constants
//! - [`search`]: Move generation, alpha-beta/VCF search, threads, hash table
//! - [`engine`]: The façade the protocol drives
//! - [`protocol`]: Gomocup text protocol
//!
//! # Quick Start
//!
//! ```
//! use gomoku::board::{Board, Move, Rule, Wld};
//!
//! let mut board = Board::new(Rule::Freestyle);
//! for (r, f) in [(7, 3), (0, 0), (7, 4), (0, 2), (7, 5), (0, 4), (7, 6), (14, 14)] {
//!     board.do_move(Move::new(r, f));
//! }
//!
//! // Black has four in a row and wins on the next move
//! assert_eq!(board.check_wld(), Some((Wld::Win(gomoku::board::Piece::Black), 1)));
//! ```
//!
//! # Search Priority
//!
//! For every move the engine:
//! 1. Plays the centre on an empty board
//! 2. Plays out a result `check_wld` already decides (five, blocked open four)
//! 3. Plays a single legal candidate without searching
//! 4. Otherwise runs iterative-deepening alpha-beta on every thread, with a
//!    VCF probe at the leaves

pub mod board;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod pattern;
pub mod protocol;
pub mod search;

// Re-export commonly used types for convenience
pub use board::{Board, Move, Piece, Rule, BOARD_SIDE};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{ConfigError, ProtocolError};
pub use protocol::Protocol;
