//! Gomocup text protocol, with the Yixin-board extensions
//!
//! One command per line, case-insensitive. Replies and `MESSAGE` lines go to
//! the output and are flushed at once; a rejected command is answered with
//! `ERROR <reason>` and the session goes on.
//!
//! ```text
//! START 15        -> OK
//! BEGIN           -> 7,7
//! TURN 7,8        -> 8,8
//! BOARD
//! 7,7,1
//! 7,8,2
//! DONE            -> 8,8
//! INFO rule 4
//! END
//! ```

use std::io::{BufRead, Write};

use log::{debug, warn};

use crate::board::Move;
use crate::engine::{Engine, MAX_HASH_SIZE_LOG2};
use crate::error::ProtocolError;
use crate::search::MAX_THREADS;

enum Flow {
    Continue,
    Quit,
}

/// `r,f` or `r,f,color`; the color field is ignored
fn parse_coords(s: &str) -> Option<(i64, i64)> {
    let mut parts = s.split(',').map(str::trim);
    let rank = parts.next()?.parse().ok()?;
    let file = parts.next()?.parse().ok()?;
    Some((rank, file))
}

fn format_move(m: Move) -> String {
    format!("{},{}", m.rank(), m.file())
}

/// `FORBID rrcc...rrcc.`
fn format_forbid(fouls: &[Move]) -> String {
    let mut line = String::from("FORBID ");
    for m in fouls {
        line.push_str(&format!("{:02}{:02}", m.rank(), m.file()));
    }
    line.push('.');
    line
}

pub struct Protocol<R, W> {
    engine: Engine,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Protocol<R, W> {
    pub fn new(engine: Engine, input: R, output: W) -> Self {
        Protocol { engine, input, output }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Serve commands until `END` or end of input. Only I/O failures end
    /// the session with an error.
    pub fn run(&mut self) -> Result<(), ProtocolError> {
        while let Some(line) = self.next_line()? {
            match self.handle(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(ProtocolError::Io(e)) => return Err(ProtocolError::Io(e)),
                Err(e) => {
                    warn!("{:?}: {}", line, e);
                    self.reply(&format!("ERROR {}", e))?;
                }
            }
        }
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<String>, ProtocolError> {
        loop {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    fn reply(&mut self, text: &str) -> Result<(), ProtocolError> {
        writeln!(self.output, "{}", text)?;
        self.output.flush()?;
        Ok(())
    }

    /// Search, then print the move
    fn think_and_reply(&mut self) -> Result<(), ProtocolError> {
        let Protocol { engine, output, .. } = self;
        let mv = engine.think(&mut |line: &str| {
            let _ = writeln!(output, "{}", line);
            let _ = output.flush();
        })?;
        self.reply(&format_move(mv))
    }

    /// Read `r,f,c` lines up to `DONE` and set up that position
    fn read_board(&mut self) -> Result<(), ProtocolError> {
        let mut moves = Vec::new();
        let mut bad = None;
        loop {
            let line = self
                .next_line()?
                .ok_or_else(|| ProtocolError::Malformed("BOARD without DONE".into()))?;
            if line.eq_ignore_ascii_case("DONE") {
                break;
            }
            match parse_coords(&line) {
                Some(coords) => moves.push(coords),
                None => bad = bad.or(Some(line)),
            }
        }
        if let Some(line) = bad {
            debug!("bad board line {:?}", line);
            return Err(ProtocolError::InvalidMove);
        }

        self.engine.restart();
        for (rank, file) in moves {
            self.engine.play(rank, file)?;
        }
        Ok(())
    }

    fn handle(&mut self, line: &str) -> Result<Flow, ProtocolError> {
        let mut words = line.split_whitespace();
        let cmd = words.next().unwrap_or_default().to_ascii_uppercase();
        let arg = words.next();

        match cmd.as_str() {
            "ABOUT" => {
                let about = self.engine.about();
                self.reply(&about)?;
            }
            "START" => {
                let size = arg.and_then(|s| s.parse().ok()).ok_or(ProtocolError::UnsupportedSize)?;
                self.engine.start(size)?;
                self.reply("OK")?;
            }
            "RECTSTART" => return Err(ProtocolError::UnsupportedSize),
            "RESTART" => {
                self.engine.restart();
                self.reply("OK")?;
            }
            "BEGIN" => self.think_and_reply()?,
            "TURN" => {
                let (rank, file) = arg.and_then(parse_coords).ok_or(ProtocolError::InvalidMove)?;
                self.engine.play(rank, file)?;
                self.think_and_reply()?;
            }
            "BOARD" => {
                self.read_board()?;
                self.think_and_reply()?;
            }
            "YXBOARD" => self.read_board()?,
            "TAKEBACK" => {
                self.engine.takeback();
                self.reply("OK")?;
            }
            "INFO" => {
                let key = arg.ok_or_else(|| ProtocolError::Malformed(line.to_string()))?;
                let value = words.next().ok_or_else(|| ProtocolError::Malformed(line.to_string()))?;
                self.engine.set_info(key, value)?;
            }
            "YXHASHCLEAR" => self.engine.clear_hash(),
            "YXSHOWFORBID" => {
                if let Some(fouls) = self.engine.forbidden_moves() {
                    self.reply(&format_forbid(&fouls))?;
                }
            }
            "YXSHOWINFO" => {
                self.engine.enable_yixin();
                self.reply(&format!("MESSAGE INFO MAX_HASH_SIZE {}", MAX_HASH_SIZE_LOG2))?;
                self.reply(&format!("MESSAGE INFO MAX_THREAD_NUM {}", MAX_THREADS))?;
            }
            "END" => return Ok(Flow::Quit),
            #[cfg(debug_assertions)]
            "D" => {
                let (rank, file) = arg.and_then(parse_coords).ok_or(ProtocolError::InvalidMove)?;
                self.engine.play(rank, file)?;
            }
            #[cfg(debug_assertions)]
            "U" => self.engine.takeback(),
            #[cfg(debug_assertions)]
            "P" => {
                let dump = self.engine.board().to_string();
                self.reply(dump.trim_end())?;
            }
            _ => {
                warn!("unknown command {:?}", line);
                self.reply(&format!("UNKNOWN command {}", cmd))?;
            }
        }
        Ok(Flow::Continue)
    }
}
