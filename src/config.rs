//! Engine configuration
//!
//! Settings are read from the TOML file named by `GOMOKU_CONFIG`, or
//! `gomoku.toml` in the working directory. Every field has a default, so a
//! partial file (or none at all) is fine. Protocol `INFO` commands override
//! these values while the engine runs.
//!
//! ```toml
//! [engine]
//! hash_size_mb = 64
//! threads = 4
//! rule = 2
//!
//! [search]
//! max_depth = 100
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

use crate::board::{Rule, BOARD_SIDE};
use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "GOMOKU_CONFIG";
pub const CONFIG_FILE: &str = "gomoku.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub search: SearchSection,
    pub time: TimeSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Transposition table size
    pub hash_size_mb: usize,
    /// Search threads, main thread included
    pub threads: usize,
    /// Protocol rule number: 0 freestyle, 1 standard, 2 or 4 renju
    pub rule: i64,
}

impl Default for EngineSection {
    fn default() -> Self {
        EngineSection {
            hash_size_mb: if BOARD_SIDE == 15 { 256 } else { 128 },
            threads: 1,
            rule: 0,
        }
    }
}

impl EngineSection {
    /// Configured rule, falling back to freestyle for unknown numbers
    pub fn rule(&self) -> Rule {
        Rule::from_protocol(self.rule).unwrap_or(Rule::Freestyle)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Deepest iterative-deepening iteration
    pub max_depth: i32,
    /// Print `MESSAGE` search lines
    pub message: bool,
    /// Start in Yixin-board mode (realtime best move and pv output)
    pub yixin: bool,
}

impl Default for SearchSection {
    fn default() -> Self {
        SearchSection {
            max_depth: 100,
            message: true,
            yixin: false,
        }
    }
}

/// Turn budget: `max(min((time_left - reserve) / divisor, timeout_turn) - overhead, floor)`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeSection {
    pub reserve_ms: i64,
    pub min_divisor: i64,
    pub max_divisor: i64,
    pub overhead_ms: i64,
    pub floor_ms: i64,
}

impl Default for TimeSection {
    fn default() -> Self {
        TimeSection {
            reserve_ms: 10_000,
            min_divisor: 18,
            max_divisor: 6,
            overhead_ms: 50,
            floor_ms: 50,
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Path named by `GOMOKU_CONFIG`, else `gomoku.toml`
    pub fn default_path() -> PathBuf {
        env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Load the default file, using built-in defaults when it is missing or
    /// broken
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(&path) {
            Ok(config) => {
                info!("loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }
}
