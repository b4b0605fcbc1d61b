//! Engine façade driven by the protocol
//!
//! [`Engine`] owns the game position, the search threads and the clocks.
//! Every method corresponds to one protocol command and validates its input
//! before it reaches the board, whose own preconditions are only debug
//! assertions.
//!
//! # Example
//!
//! ```
//! use gomoku::{Engine, EngineConfig};
//!
//! let mut config = EngineConfig::default();
//! config.engine.hash_size_mb = 1;
//! let mut engine = Engine::new(&config);
//!
//! engine.start(15).unwrap();
//! let reply = engine.think(&mut |_| {}).unwrap();
//! assert_eq!((reply.rank(), reply.file()), (7, 7));
//! ```

use log::{debug, info, warn};

use crate::board::{Board, Move, Rule, BOARD_SIDE};
use crate::config::EngineConfig;
use crate::error::ProtocolError;
use crate::search::{SearchParams, TTStats, ThreadPool, TimeControl};

pub const ENGINE_NAME: &str = "gomoku-renju";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ENGINE_AUTHOR: &str = "gomoku-renju developers";
pub const ENGINE_COUNTRY: &str = "China";

/// Largest hash size Yixin may offer, as a power of two in KB
pub const MAX_HASH_SIZE_LOG2: u32 = 24;

pub struct Engine {
    pool: ThreadPool,
}

impl Engine {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let rule = match config.engine.rule() {
            r if BOARD_SIDE != 15 && r != Rule::Freestyle => {
                warn!("rule {:?} is not available on a {}x{} board", r, BOARD_SIDE, BOARD_SIDE);
                Rule::Freestyle
            }
            r => r,
        };
        let mut pool = ThreadPool::new(rule, config.engine.threads, config.engine.hash_size_mb);
        pool.params = SearchParams {
            max_depth: config.search.max_depth,
            yixin: config.search.yixin,
            message: config.search.message,
            pruning: true,
        };
        pool.time = TimeControl::new(&config.time);
        Engine { pool }
    }

    /// `name="...", version="...", author="...", country="..."`
    pub fn about(&self) -> String {
        format!(
            "name=\"{}\", version=\"{}\", author=\"{}\", country=\"{}\"",
            ENGINE_NAME, ENGINE_VERSION, ENGINE_AUTHOR, ENGINE_COUNTRY
        )
    }

    pub fn board(&self) -> &Board {
        self.pool.board()
    }

    pub fn rule(&self) -> Rule {
        self.pool.rule()
    }

    pub fn params(&self) -> &SearchParams {
        &self.pool.params
    }

    pub fn tt_stats(&self) -> TTStats {
        self.pool.tt_stats()
    }

    /// New game on a `size` x `size` board
    pub fn start(&mut self, size: i64) -> Result<(), ProtocolError> {
        if size != BOARD_SIDE as i64 {
            return Err(ProtocolError::UnsupportedSize);
        }
        self.pool.reset();
        Ok(())
    }

    pub fn restart(&mut self) {
        self.pool.reset();
    }

    /// Cell from protocol coordinates, which must be on the board and empty
    pub fn parse_move(&self, rank: i64, file: i64) -> Result<Move, ProtocolError> {
        match Move::from_coords(rank, file) {
            Some(m) if self.pool.board().is_empty(m) => Ok(m),
            _ => Err(ProtocolError::InvalidMove),
        }
    }

    /// Play a move for the side to move
    pub fn play(&mut self, rank: i64, file: i64) -> Result<Move, ProtocolError> {
        let m = self.parse_move(rank, file)?;
        self.pool.do_move(m);
        Ok(m)
    }

    /// Search, play and return the engine's move
    pub fn think(&mut self, out: &mut dyn FnMut(&str)) -> Result<Move, ProtocolError> {
        self.pool.think(out).ok_or(ProtocolError::BoardFull)
    }

    pub fn takeback(&mut self) {
        if !self.pool.undo_move() {
            debug!("takeback on an empty board");
        }
    }

    /// `INFO <key> <value>`. Unknown keys are ignored.
    pub fn set_info(&mut self, key: &str, value: &str) -> Result<(), ProtocolError> {
        let number = || {
            value
                .parse::<i64>()
                .map_err(|_| ProtocolError::Malformed(format!("INFO {} {}", key, value)))
        };
        match key.to_ascii_lowercase().as_str() {
            "hash_size" => {
                let kb = number()?.max(0) as usize;
                self.pool.resize_tt(kb / 1024);
            }
            "rule" => {
                let n = number()?;
                if BOARD_SIDE != 15 && n != 0 {
                    return Err(ProtocolError::UnsupportedRule);
                }
                let rule = Rule::from_protocol(n).ok_or(ProtocolError::UnsupportedRule)?;
                self.pool.set_rule(rule);
            }
            "thread_num" => {
                let n = number()?.max(1) as usize;
                self.pool.set_threads(n);
                info!("using {} search threads", self.pool.threads());
            }
            "time_left" => self.pool.time.time_left = number()?,
            "timeout_match" => self.pool.time.timeout_match = number()?,
            "timeout_turn" => self.pool.time.timeout_turn = number()?,
            other => debug!("ignoring INFO {}", other),
        }
        Ok(())
    }

    /// Empty the hash table together with the killer and counter moves
    pub fn clear_hash(&mut self) {
        self.pool.clear_tt();
        self.pool.clear_history();
    }

    /// Renju fouls on the current board; `None` under other rules
    pub fn forbidden_moves(&mut self) -> Option<Vec<Move>> {
        if self.pool.rule() != Rule::Renju {
            return None;
        }
        Some(self.pool.forbidden_moves())
    }

    pub fn enable_yixin(&mut self) {
        self.pool.params.yixin = true;
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_engine() -> Engine {
        let mut config = EngineConfig::default();
        config.engine.hash_size_mb = 1;
        config.search.max_depth = 4;
        config.search.message = false;
        Engine::new(&config)
    }

    #[test]
    fn test_start_checks_size() {
        let mut engine = small_engine();
        assert!(engine.start(BOARD_SIDE as i64).is_ok());
        assert!(matches!(engine.start(19), Err(ProtocolError::UnsupportedSize)));
    }

    #[test]
    fn test_play_validates_moves() {
        let mut engine = small_engine();
        assert_eq!(engine.play(7, 7).ok(), Some(Move::new(7, 7)));
        assert!(matches!(engine.play(7, 7), Err(ProtocolError::InvalidMove)), "occupied cell");
        assert!(matches!(engine.play(-1, 3), Err(ProtocolError::InvalidMove)));
        assert!(matches!(engine.play(3, BOARD_SIDE as i64), Err(ProtocolError::InvalidMove)));
        assert_eq!(engine.board().piece_count(), 1);
    }

    #[test]
    fn test_info_rule_and_threads() {
        let mut engine = small_engine();
        engine.set_info("rule", "4").expect("renju is known");
        assert_eq!(engine.rule(), Rule::Renju);
        engine.set_info("RULE", "1").expect("standard is known");
        assert_eq!(engine.rule(), Rule::Standard);
        assert!(matches!(engine.set_info("rule", "3"), Err(ProtocolError::UnsupportedRule)));
        assert!(matches!(engine.set_info("rule", "x"), Err(ProtocolError::Malformed(_))));
        engine.set_info("thread_num", "2").expect("numeric");
        engine.set_info("timeout_turn", "1000").expect("numeric");
        engine.set_info("max_memory", "0").expect("unknown keys are ignored");
    }

    #[test]
    fn test_hash_size_in_kb() {
        let mut engine = small_engine();
        engine.set_info("hash_size", "4096").expect("numeric");
        assert!(engine.tt_stats().size > 0);
    }

    #[test]
    fn test_forbidden_moves_only_under_renju() {
        let mut engine = small_engine();
        assert!(engine.forbidden_moves().is_none());
        engine.set_info("rule", "2").expect("renju");
        for (r, f) in [(7, 5), (0, 0), (7, 6), (0, 2), (5, 7), (0, 4), (6, 7), (0, 14)] {
            engine.play(r, f).expect("legal");
        }
        let fouls = engine.forbidden_moves().expect("renju");
        assert!(fouls.contains(&Move::new(7, 7)));
    }

    #[test]
    fn test_takeback_then_think() {
        let mut engine = small_engine();
        engine.play(7, 7).expect("legal");
        engine.takeback();
        engine.takeback();
        assert_eq!(engine.board().piece_count(), 0);
        let reply = engine.think(&mut |_| {}).expect("a move");
        assert_eq!(reply, Move::center());
    }

    #[test]
    fn test_about() {
        let about = small_engine().about();
        assert!(about.starts_with("name=\""));
        assert!(about.contains("version=\""));
        assert!(about.ends_with("country=\"China\""));
    }
}
