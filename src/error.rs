//! Error types
//!
//! Board preconditions (legal cell, non-empty history) are contracts checked
//! with `debug_assert!`; only input coming from outside the engine is
//! reported through these types.

use std::path::PathBuf;

use thiserror::Error;

/// Rejected protocol input. The `Display` text is the reason sent back in
/// an `ERROR <reason>` reply.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unsupported size")]
    UnsupportedSize,

    #[error("invalid move")]
    InvalidMove,

    #[error("unsupported rule for this board size")]
    UnsupportedRule,

    #[error("board is full")]
    BoardFull,

    #[error("malformed command: {0}")]
    Malformed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
