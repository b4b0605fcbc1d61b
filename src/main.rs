//! Gomoku/Renju engine speaking the Gomocup protocol on stdin/stdout
//!
//! Logs go to stderr; set `RUST_LOG=info` (or `debug`) to see them.

use std::io;
use std::process::ExitCode;

use log::{error, info};

use gomoku::{Engine, EngineConfig, Protocol};

fn main() -> ExitCode {
    env_logger::init();

    let config = EngineConfig::load_or_default();
    info!(
        "starting with {} MB hash, {} thread(s), rule {:?}",
        config.engine.hash_size_mb,
        config.engine.threads,
        config.engine.rule()
    );
    let engine = Engine::new(&config);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut protocol = Protocol::new(engine, stdin.lock(), stdout.lock());
    match protocol.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
