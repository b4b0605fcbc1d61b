//! Thread pool, shared search state and time management
//!
//! Every call to [`ThreadPool::think`] builds a fresh [`SharedState`], hands
//! each [`Worker`] a copy of the position and runs them all on their own OS
//! thread. Workers report through the shared atomics and the transposition
//! table; `MESSAGE` lines travel over a channel back to the caller, which
//! prints them while the search is running.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Instant;

use log::{info, warn};
use parking_lot::Mutex;

use super::alphabeta::{RootBest, Worker, DEPTH_ITERATIVE_MAX};
use super::movegen::MoveGen;
use super::tt::{TTStats, TranspositionTable};
use crate::board::{Board, Move, Rule};
use crate::config::TimeSection;
use crate::eval::{format_score, Score, SCORE_WIN_THRESHOLD, SCORE_ZERO};

/// Upper bound on search threads
pub const MAX_THREADS: usize = 32;

/// Per-search switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Deepest iteration
    pub max_depth: i32,
    /// Yixin-board output: realtime best move, per-iteration lines and pv
    pub yixin: bool,
    /// Emit `MESSAGE` lines at all
    pub message: bool,
    /// Selective search. Turning it off leaves a plain fail-soft
    /// alpha-beta: no hash cutoffs, pruning, reductions, extensions or VCF.
    pub pruning: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            max_depth: DEPTH_ITERATIVE_MAX,
            yixin: false,
            message: true,
            pruning: true,
        }
    }
}

/// Time allowed for one move, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnBudget {
    pub min: i64,
    pub start: i64,
    pub max: i64,
}

impl TurnBudget {
    pub fn unlimited() -> Self {
        let t = i64::MAX / 4;
        TurnBudget { min: t, start: t, max: t }
    }
}

/// Clock settings received from the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeControl {
    pub timeout_turn: i64,
    pub timeout_match: i64,
    pub time_left: i64,
    reserve_ms: i64,
    min_divisor: i64,
    max_divisor: i64,
    overhead_ms: i64,
    floor_ms: i64,
}

impl Default for TimeControl {
    fn default() -> Self {
        TimeControl::new(&TimeSection::default())
    }
}

impl TimeControl {
    pub const UNSET: i64 = 2_147_483_647;

    pub fn new(cfg: &TimeSection) -> Self {
        TimeControl {
            timeout_turn: Self::UNSET,
            timeout_match: Self::UNSET,
            time_left: Self::UNSET,
            reserve_ms: cfg.reserve_ms,
            min_divisor: cfg.min_divisor.max(1),
            max_divisor: cfg.max_divisor.max(1),
            overhead_ms: cfg.overhead_ms,
            floor_ms: cfg.floor_ms,
        }
    }

    fn share(&self, divisor: i64) -> i64 {
        let t = ((self.time_left - self.reserve_ms) / divisor).min(self.timeout_turn) - self.overhead_ms;
        t.max(self.floor_ms)
    }

    /// Budget for the coming move: a small share of the remaining match
    /// time, never more than the per-turn timeout
    pub fn budget(&self) -> TurnBudget {
        let max = self.share(self.max_divisor);
        TurnBudget {
            min: self.share(self.min_divisor),
            start: max,
            max,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BestRecord {
    thread: usize,
    score: Score,
    depth: i32,
}

/// State shared by the workers of one search
pub struct SharedState {
    pub(crate) tt: Arc<TranspositionTable>,
    pub(crate) params: SearchParams,
    terminate: AtomicBool,
    start: Instant,
    budget: TurnBudget,
    turn_time: AtomicI64,
    best: Mutex<BestRecord>,
    nodes: Vec<AtomicU64>,
    ply_max: Vec<AtomicI32>,
}

impl SharedState {
    pub fn new(tt: Arc<TranspositionTable>, threads: usize, params: SearchParams, budget: TurnBudget) -> Self {
        let threads = threads.max(1);
        SharedState {
            tt,
            params,
            terminate: AtomicBool::new(false),
            start: Instant::now(),
            budget,
            turn_time: AtomicI64::new(budget.start),
            best: Mutex::new(BestRecord {
                thread: 0,
                score: SCORE_ZERO,
                depth: 0,
            }),
            nodes: (0..threads).map(|_| AtomicU64::new(0)).collect(),
            ply_max: (0..threads).map(|_| AtomicI32::new(0)).collect(),
        }
    }

    #[inline]
    pub fn terminated(&self) -> bool {
        self.terminate.load(Ordering::Relaxed)
    }

    /// Ask every worker to unwind
    pub fn stop(&self) {
        self.terminate.store(true, Ordering::Relaxed);
    }

    pub fn elapsed_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }

    pub fn budget(&self) -> TurnBudget {
        self.budget
    }

    #[inline]
    pub fn turn_time(&self) -> i64 {
        self.turn_time.load(Ordering::Relaxed)
    }

    pub fn set_turn_time(&self, t: i64) {
        self.turn_time.store(t, Ordering::Relaxed);
    }

    pub(crate) fn publish(&self, idx: usize, nodes: u64, ply_max: i32) {
        if let (Some(n), Some(p)) = (self.nodes.get(idx), self.ply_max.get(idx)) {
            n.store(nodes, Ordering::Relaxed);
            p.store(ply_max, Ordering::Relaxed);
        }
    }

    pub fn total_nodes(&self) -> u64 {
        self.nodes.iter().map(|n| n.load(Ordering::Relaxed)).sum()
    }

    pub fn max_ply(&self) -> i32 {
        self.ply_max.iter().map(|p| p.load(Ordering::Relaxed)).max().unwrap_or(0)
    }

    /// Record a completed iteration. A deeper result takes over unless the
    /// current best is a proven one and the new result is not.
    pub fn offer_best(&self, idx: usize, score: Score, depth: i32) {
        let mut best = self.best.lock();
        let proven = |s: Score| s.abs() > SCORE_WIN_THRESHOLD;
        if depth > best.depth && (!proven(best.score) || proven(score)) {
            *best = BestRecord { thread: idx, score, depth };
        }
    }

    pub fn best_thread(&self) -> usize {
        self.best.lock().thread
    }

    pub fn is_best(&self, idx: usize) -> bool {
        self.best_thread() == idx
    }

    /// `MESSAGE dep ... ev ... nd ... tm ... sp ... [pv ...]`
    pub fn message_line(&self, rb: &RootBest) -> String {
        let nodes = self.total_nodes() + 1;
        let elapsed = self.elapsed_ms().max(0) as u64 + 1;
        let mut line = format!(
            "MESSAGE dep {}-{} ev {} nd {} tm {} sp {}",
            rb.depth,
            rb.depth.max(self.max_ply()),
            format_score(rb.score),
            format_nodes(nodes),
            elapsed,
            nodes / elapsed
        );
        if self.params.yixin && !rb.pv.is_empty() {
            line.push_str(" pv");
            for m in &rb.pv {
                let _ = write!(line, " {}", m);
            }
        }
        line
    }
}

/// Node count with a k/m/g/t suffix
pub fn format_nodes(n: u64) -> String {
    match n {
        0..=9_999 => n.to_string(),
        10_000..=9_999_999 => format!("{}k", n / 1_000),
        10_000_000..=9_999_999_999 => format!("{}m", n / 1_000_000),
        10_000_000_000..=9_999_999_999_999 => format!("{}g", n / 1_000_000_000),
        _ => format!("{}t", n / 1_000_000_000_000),
    }
}

/// The search threads together with the game position
pub struct ThreadPool {
    workers: Vec<Worker>,
    board: Board,
    tt: Arc<TranspositionTable>,
    pub params: SearchParams,
    pub time: TimeControl,
}

impl ThreadPool {
    pub fn new(rule: Rule, threads: usize, hash_mb: usize) -> Self {
        let threads = threads.clamp(1, MAX_THREADS);
        ThreadPool {
            workers: (0..threads).map(|i| Worker::new(i, rule)).collect(),
            board: Board::new(rule),
            tt: Arc::new(TranspositionTable::new(hash_mb.max(1))),
            params: SearchParams::default(),
            time: TimeControl::default(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn rule(&self) -> Rule {
        self.board.rule()
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Recreate the workers. Histories start empty.
    pub fn set_threads(&mut self, n: usize) {
        let n = n.clamp(1, MAX_THREADS);
        let rule = self.rule();
        self.workers = (0..n).map(|i| Worker::new(i, rule)).collect();
    }

    /// Changing the rule invalidates the hash table and the histories
    pub fn set_rule(&mut self, rule: Rule) {
        if rule == self.rule() {
            return;
        }
        info!("rule set to {:?}", rule);
        self.clear_tt();
        self.clear_history();
        self.board.set_rule(rule);
        for w in self.workers.iter_mut() {
            w.board.set_rule(rule);
        }
    }

    /// Empty board, fresh histories
    pub fn reset(&mut self) {
        self.board.reset();
        self.clear_history();
    }

    pub fn clear_history(&mut self) {
        for w in self.workers.iter_mut() {
            w.clear_history();
        }
    }

    pub fn resize_tt(&mut self, size_mb: usize) {
        self.tt = Arc::new(TranspositionTable::new(size_mb.max(1)));
        info!("hash table resized to {} MB", self.tt.size_mb());
    }

    pub fn clear_tt(&mut self) {
        match Arc::get_mut(&mut self.tt) {
            Some(tt) => tt.clear(),
            None => self.tt = Arc::new(TranspositionTable::new(self.tt.size_mb())),
        }
    }

    pub fn tt_stats(&self) -> TTStats {
        self.tt.stats()
    }

    pub fn do_move(&mut self, m: Move) {
        self.board.do_move(m);
    }

    /// Take back the last move, if any
    pub fn undo_move(&mut self) -> bool {
        if self.board.piece_count() == 0 {
            return false;
        }
        self.board.undo_move();
        true
    }

    pub fn is_foul(&mut self, m: Move) -> bool {
        self.board.is_foul(m)
    }

    pub fn forbidden_moves(&mut self) -> Vec<Move> {
        self.board.forbidden_moves()
    }

    /// Choose a move for the side to move, play it on the board and return
    /// it. `out` receives the `MESSAGE` lines. `None` only on a full board.
    pub fn think(&mut self, out: &mut dyn FnMut(&str)) -> Option<Move> {
        self.tt.new_search();
        let sh = Arc::new(SharedState::new(
            Arc::clone(&self.tt),
            self.workers.len(),
            self.params,
            self.time.budget(),
        ));

        let best = match self.shortcut() {
            Some(rb) => Some(rb),
            None => self.search_all(&sh, out),
        };

        let mv = match &best {
            Some(rb) => {
                if self.params.message {
                    out(&sh.message_line(rb));
                }
                info!(
                    "play {} ev {} depth {} after {} ms",
                    rb.best_move(),
                    format_score(rb.score),
                    rb.depth,
                    sh.elapsed_ms()
                );
                rb.best_move()
            }
            None => self.fallback_move()?,
        };

        self.board.do_move(mv);
        Some(mv)
    }

    /// Moves that need no search: the opening centre, a decided result, or
    /// a single candidate
    fn shortcut(&mut self) -> Option<RootBest> {
        let board = &mut self.board;
        let forced = |mv: Move, score: Score, depth: i32| RootBest { score, depth, pv: vec![mv] };

        if board.piece_count() == 0 {
            return Some(forced(Move::center(), SCORE_ZERO, 1));
        }

        if let Some((_, offset)) = board.check_wld() {
            if let Some(em) = MoveGen::generate_wld(board) {
                return Some(forced(em.mv, em.score, offset));
            }
        }

        let mut mg = MoveGen::main(board, Move::NONE, 0, [Move::NONE; 2], Move::NONE);
        let first = mg.next_move(board)?;
        if mg.next_move(board).is_none() {
            return Some(forced(first.mv, SCORE_ZERO, 1));
        }
        None
    }

    /// Run every worker on its own thread until the search stops
    fn search_all(&mut self, sh: &Arc<SharedState>, out: &mut dyn FnMut(&str)) -> Option<RootBest> {
        let (tx, rx) = mpsc::channel::<String>();
        let rule = self.rule();

        let handles: Vec<_> = std::mem::take(&mut self.workers)
            .into_iter()
            .map(|mut worker| {
                worker.board.clone_from(&self.board);
                worker.reset_search();
                let sh = Arc::clone(sh);
                let tx = tx.clone();
                thread::spawn(move || {
                    worker.search(&sh, &tx);
                    worker
                })
            })
            .collect();
        drop(tx);

        for line in rx {
            out(&line);
        }

        for (idx, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(worker) => self.workers.push(worker),
                Err(_) => {
                    warn!("search thread {} panicked", idx);
                    self.workers.push(Worker::new(idx, rule));
                }
            }
        }

        let best = sh.best_thread();
        self.workers
            .get(best)
            .and_then(|w| w.root_bests().last())
            .or_else(|| self.workers.iter().find_map(|w| w.root_bests().last()))
            .cloned()
    }

    /// Any legal cell when the search produced nothing
    fn fallback_move(&mut self) -> Option<Move> {
        self.board.flush_pending();
        let mv = self
            .board
            .candidates()
            .iter()
            .copied()
            .next()
            .or_else(|| Move::all().find(|&m| self.board.is_empty(m)));
        if mv.is_none() {
            warn!("no legal move on a full board");
        }
        mv
    }
}
