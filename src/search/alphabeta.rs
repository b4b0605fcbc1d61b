//! Alpha-beta and VCF search for one thread
//!
//! A [`Worker`] owns a private board and search stack. Every worker of a
//! [`ThreadPool`](super::ThreadPool) searches the same root; helpers skip
//! some iterative-deepening depths so that the threads spread out, and they
//! cooperate only through the shared transposition table and the
//! [`SharedState`] flags.
//!
//! # Features
//!
//! - Principal variation search with mate-distance pruning
//! - Razoring, extended futility pruning and move-count pruning
//! - Internal iterative deepening when no hash move is known
//! - Late move reductions with full-depth re-search
//! - A cautious re-search that double checks wins found in pv nodes
//! - A VCF solver (continuous fours) at the leaves

use std::sync::mpsc::Sender;
use std::sync::OnceLock;

use log::debug;

use super::movegen::MoveGen;
use super::threads::SharedState;
use super::tt::{score_from_tt, score_to_tt, Bound};
use crate::board::{Board, Move, Rule, Wld, MOVE_CAPACITY, MOVE_SIZE};
use crate::eval::{
    loss_in, Score, SCORE_DRAW, SCORE_INF, SCORE_NONE, SCORE_WIN, SCORE_WIN_THRESHOLD, SCORE_ZERO,
    SEE_THRESHOLD,
};
use crate::pattern::Material;

/// Deepest ply any node may reach
pub const DEPTH_MAX: i32 = 120;
/// Last iterative-deepening depth
pub const DEPTH_ITERATIVE_MAX: i32 = 100;
const DEPTH_NUM: usize = DEPTH_MAX as usize + 1;
/// VCF nodes may sit two plies past [`DEPTH_MAX`]
const PV_SIZE: usize = DEPTH_MAX as usize + 4;

// Depth schedules of the helper threads
const SKIP_SIZE: [i32; 20] = [1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4];
const SKIP_PHASE: [i32; 20] = [0, 1, 0, 1, 2, 3, 0, 1, 2, 3, 4, 5, 0, 1, 2, 3, 4, 5, 6, 7];

struct PruneTables {
    /// [quiet][depth]
    move_count: [[i32; DEPTH_NUM]; 2],
    /// [pv][depth][move count], flattened
    reduction: Vec<i32>,
}

impl PruneTables {
    fn new() -> Self {
        let mut move_count = [[0; DEPTH_NUM]; 2];
        for d in 0..DEPTH_NUM {
            let root = (d as f64).sqrt();
            move_count[0][d] = ((5.0 * root - 2.0).round() as i32).min(8);
            move_count[1][d] = ((15.0 * root - 12.0).round() as i32).min(32);
        }

        let mut reduction = vec![0; 2 * DEPTH_NUM * MOVE_SIZE];
        for d in 1..DEPTH_NUM {
            for mc in 1..MOVE_SIZE {
                let r = ((d as f64).ln() * (mc as f64).ln() / 2.0).round() as i32;
                reduction[Self::index(false, d, mc)] = r;
                reduction[Self::index(true, d, mc)] = (r - 1).max(0);
            }
        }
        PruneTables { move_count, reduction }
    }

    #[inline]
    fn index(pv: bool, depth: usize, move_cnt: usize) -> usize {
        (pv as usize * DEPTH_NUM + depth) * MOVE_SIZE + move_cnt
    }
}

fn prune_tables() -> &'static PruneTables {
    static TABLES: OnceLock<PruneTables> = OnceLock::new();
    TABLES.get_or_init(PruneTables::new)
}

#[inline]
fn futility_move_count(quiet: bool, depth: i32) -> i32 {
    prune_tables().move_count[quiet as usize][depth.clamp(0, DEPTH_MAX) as usize]
}

#[inline]
fn reduction(pv: bool, depth: i32, move_cnt: i32) -> i32 {
    let d = depth.clamp(0, DEPTH_MAX) as usize;
    let mc = (move_cnt.max(0) as usize).min(MOVE_SIZE - 1);
    prune_tables().reduction[PruneTables::index(pv, d, mc)]
}

#[inline]
fn futility_margin(depth: i32) -> Score {
    45 * depth
}

/// True when helper `idx` leaves iterative depth `depth` to the others
fn helper_skips(idx: usize, depth: i32) -> bool {
    if idx == 0 {
        return false;
    }
    let i = (idx - 1) % SKIP_SIZE.len();
    ((depth + SKIP_PHASE[i]) / SKIP_SIZE[i]) % 2 == 1
}

/// Result of one completed iteration at the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootBest {
    pub score: Score,
    pub depth: i32,
    pub pv: Vec<Move>,
}

impl RootBest {
    pub fn best_move(&self) -> Move {
        self.pv.first().copied().unwrap_or(Move::NONE)
    }
}

/// Per-thread search state
pub struct Worker {
    idx: usize,
    pub(crate) board: Board,
    ply: i32,
    ply_max: i32,
    it_depth: i32,
    nodes: u64,
    pv: Vec<[Move; PV_SIZE]>,
    pv_len: Vec<usize>,
    killers: Vec<[Move; 2]>,
    counter_moves: Vec<Move>,
    root_bests: Vec<RootBest>,
}

impl Worker {
    pub fn new(idx: usize, rule: Rule) -> Self {
        Worker {
            idx,
            board: Board::new(rule),
            ply: 0,
            ply_max: 0,
            it_depth: 1,
            nodes: 0,
            pv: vec![[Move::NONE; PV_SIZE]; PV_SIZE],
            pv_len: vec![0; PV_SIZE],
            killers: vec![[Move::NONE; 2]; PV_SIZE + 2],
            counter_moves: vec![Move::NONE; MOVE_CAPACITY],
            root_bests: Vec::new(),
        }
    }

    pub fn idx(&self) -> usize {
        self.idx
    }

    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    pub fn ply_max(&self) -> i32 {
        self.ply_max
    }

    /// Completed iterations of the last search, shallowest first
    pub fn root_bests(&self) -> &[RootBest] {
        &self.root_bests
    }

    /// Forget killers and counter moves
    pub fn clear_history(&mut self) {
        self.killers.fill([Move::NONE; 2]);
        self.counter_moves.fill(Move::NONE);
    }

    /// Called before every search
    pub fn reset_search(&mut self) {
        self.ply_max = 0;
        self.it_depth = 1;
        self.nodes = 0;
        self.root_bests.clear();
        self.reset_alphabeta();
    }

    /// Called before every iteration
    fn reset_alphabeta(&mut self) {
        self.ply = 0;
        self.pv_len[0] = 0;
    }

    fn update_history(&mut self, m: Move) {
        if m.is_none() {
            return;
        }
        let killers = &mut self.killers[self.ply as usize];
        if killers[0] != m {
            killers[1] = killers[0];
            killers[0] = m;
        }
        if self.board.piece_count() >= 1 {
            self.counter_moves[self.board.last_move(1).index()] = m;
        }
    }

    /// Principal variation found at `ply`
    fn pv_line(&self, ply: usize) -> &[Move] {
        &self.pv[ply][..self.pv_len[ply]]
    }

    /// pv[ply] = `moves` followed by the pv of `child`, if any
    fn set_pv(&mut self, ply: usize, moves: &[Move], child: Option<usize>) {
        let child_len = child.map_or(0, |c| self.pv_len[c].min(PV_SIZE - moves.len()));
        let (head, tail) = self.pv.split_at_mut(ply + 1);
        let line = &mut head[ply];
        line[..moves.len()].copy_from_slice(moves);
        if let Some(c) = child {
            line[moves.len()..moves.len() + child_len].copy_from_slice(&tail[c - ply - 1][..child_len]);
        }
        self.pv_len[ply] = moves.len() + child_len;
    }

    fn wld_score(&self, wld: Wld, offset: i32) -> Score {
        match wld {
            Wld::Win(p) if p == self.board.side_to_move() => SCORE_WIN - self.ply - offset,
            Wld::Win(_) => -SCORE_WIN + self.ply + offset,
            Wld::Draw => SCORE_DRAW,
        }
    }

    fn publish(&self, sh: &SharedState) {
        sh.publish(self.idx, self.nodes, self.ply_max);
    }

    /// Iterative deepening from the root until time runs out, the result is
    /// decided or the depth limit is reached. Sends `MESSAGE` lines to `out`.
    pub fn search(&mut self, sh: &SharedState, out: &Sender<String>) {
        let max_depth = sh.params.max_depth.clamp(1, DEPTH_ITERATIVE_MAX);
        let mut best_move_changes = false;

        loop {
            if helper_skips(self.idx, self.it_depth) {
                self.it_depth += 1;
                continue;
            }
            if self.it_depth > max_depth {
                break;
            }

            self.reset_alphabeta();
            let score = self.alphabeta::<true>(sh, -SCORE_INF, SCORE_INF, self.it_depth, false);
            let pv = self.pv_line(0).to_vec();
            self.publish(sh);

            let terminated = sh.terminated();
            let decided = score.abs() > SCORE_WIN_THRESHOLD
                && (!sh.params.yixin || self.it_depth >= SCORE_WIN - score.abs());

            // An aborted iteration that finished no root move is dropped
            if !pv.is_empty() {
                let rb = RootBest { score, depth: self.it_depth, pv };
                if self.root_bests.last().map_or(true, |last| last.best_move() != rb.best_move()) {
                    best_move_changes = true;
                }
                if self.idx == 0 {
                    debug!(
                        "depth {} score {} nodes {} best {}",
                        rb.depth,
                        rb.score,
                        self.nodes,
                        rb.best_move()
                    );
                }
                sh.offer_best(self.idx, rb.score, rb.depth);
                if sh.params.yixin && sh.is_best(self.idx) {
                    let m = rb.best_move();
                    let _ = out.send(format!("MESSAGE REALTIME BEST {},{}", m.rank(), m.file()));
                }
                self.root_bests.push(rb);
            }

            if terminated || decided || self.it_depth >= max_depth {
                sh.stop();
                break;
            }

            if sh.params.yixin && sh.is_best(self.idx) {
                if let Some(line) = self.root_bests.last().map(|rb| sh.message_line(rb)) {
                    let _ = out.send(line);
                }
            }

            if self.idx == 0 {
                let budget = sh.budget();
                let mut turn_time = sh.turn_time();
                if best_move_changes {
                    turn_time = budget.max;
                    best_move_changes = false;
                } else if self.it_depth >= 7 {
                    turn_time = (turn_time as f64 * 0.97) as i64;
                }
                let turn_time = turn_time.clamp(budget.min, budget.max);
                sh.set_turn_time(turn_time);

                // Not enough time left for another iteration
                if sh.elapsed_ms() as f64 > turn_time as f64 * 0.7 {
                    sh.stop();
                    break;
                }
            }

            self.it_depth += 1;
        }
        self.publish(sh);
    }

    /// Fail-soft negamax search of the current node
    pub(crate) fn alphabeta<const PV: bool>(
        &mut self,
        sh: &SharedState,
        mut alpha: Score,
        mut beta: Score,
        depth: i32,
        cautious: bool,
    ) -> Score {
        if sh.terminated() {
            return if self.ply & 1 == 1 { SCORE_WIN } else { -SCORE_WIN };
        }
        if self.nodes & 511 == 511 {
            self.publish(sh);
            if sh.elapsed_ms() > sh.turn_time() {
                sh.stop();
            }
        }
        self.ply_max = self.ply_max.max(self.ply);
        self.nodes += 1;

        let ply = self.ply as usize;
        let root = ply == 0;
        let pruning = sh.params.pruning;
        self.pv_len[ply] = 0;

        if let Some((wld, offset)) = self.board.check_wld() {
            return self.wld_score(wld, offset);
        }

        // Mate distance pruning
        if !root {
            alpha = alpha.max(-SCORE_WIN + self.ply);
            beta = beta.min(SCORE_WIN - self.ply - 1);
            if alpha >= beta {
                return alpha;
            }
        }

        let mut static_score = self.board.evaluate();

        if depth <= 0 || self.ply >= DEPTH_MAX {
            // A forced win may hide just past the horizon
            if pruning
                && static_score < beta
                && self.board.query(self.board.side_to_move(), Material::B3) > 0
            {
                let vcf_depth = (self.ply * 2).min(DEPTH_MAX);
                let score = self.vcf::<PV>(sh, vcf_depth, true);
                if score > SCORE_WIN_THRESHOLD {
                    return score;
                }
            }
            return static_score;
        }

        debug_assert!(-SCORE_INF <= alpha && alpha < beta && beta <= SCORE_INF);
        debug_assert!(PV || alpha == beta - 1);

        let defend_b4 = self.board.query(self.board.oppo_to_move(), Material::B4) > 0;
        let quiet = self.board.is_quiet();
        self.killers[ply + 2] = [Move::NONE; 2];

        let key = self.board.key();
        let (hit, mut slot) = sh.tt.probe(key);
        let hit = hit.filter(|_| pruning);
        let (mut tt_move, tt_score) = match (root, self.root_bests.last(), hit) {
            (true, Some(rb), _) => (rb.best_move(), rb.score),
            (_, _, Some(e)) => (e.mv, score_from_tt(e.score, self.ply)),
            _ => (Move::NONE, SCORE_NONE),
        };

        if !PV {
            if let Some(e) = hit {
                // A stored win only needs a lower bound
                if tt_score > SCORE_WIN_THRESHOLD && e.bound.includes(Bound::Lower) {
                    if tt_score >= beta {
                        self.update_history(tt_move);
                    }
                    return tt_score;
                }

                let bound = if tt_score >= beta { Bound::Lower } else { Bound::Upper };
                if e.depth >= depth && tt_score != SCORE_NONE && e.bound.includes(bound) {
                    if tt_score >= beta {
                        self.update_history(tt_move);
                    }
                    return tt_score;
                }
            }
        }

        // Forcing lines are never pruned
        if !defend_b4 && pruning {
            if let Some(e) = hit {
                let wanted = if tt_score > static_score { Bound::Lower } else { Bound::Upper };
                if e.bound.includes(wanted) {
                    static_score = tt_score;
                }
            }

            // Razoring
            if !root && depth < 5 && static_score + futility_margin(depth) <= alpha {
                return self.alphabeta::<PV>(sh, alpha, beta, 0, cautious);
            }

            // Extended futility pruning, never on an unverified win
            if !root
                && depth < 7
                && static_score - futility_margin(depth) >= beta
                && static_score < SCORE_WIN_THRESHOLD
            {
                return static_score;
            }

            // Internal iterative deepening
            if depth >= 7 && tt_move.is_none() {
                self.alphabeta::<PV>(sh, alpha, beta, depth / 2, cautious);
                self.pv_len[ply] = 0;
                let (hit, s) = sh.tt.probe(key);
                slot = s;
                tt_move = hit.map_or(Move::NONE, |e| e.mv);
            }
        }

        let counter = if self.board.piece_count() >= 1 {
            self.counter_moves[self.board.last_move(1).index()]
        } else {
            Move::NONE
        };
        let mut mg = MoveGen::main(&mut self.board, tt_move, self.ply, self.killers[ply], counter);

        let mut best_move = Move::NONE;
        let mut best_score = -SCORE_INF;
        let mut move_cnt = 0;

        while let Some(em) = mg.next_move(&mut self.board) {
            move_cnt += 1;

            if pruning {
                let limit = futility_move_count(quiet, depth);
                if !cautious && self.ply >= 2 {
                    if move_cnt > limit {
                        break;
                    }
                } else if move_cnt > limit && em.score < SEE_THRESHOLD {
                    break;
                }
            }

            let extend = pruning && defend_b4;
            let new_depth = (depth - 1 + extend as i32).min(DEPTH_MAX);

            self.ply += 1;
            self.board.do_move(em.mv);

            let (mut score, full_depth) = if pruning && depth >= 3 && move_cnt > 1 {
                let d = (new_depth - reduction(PV, depth, move_cnt)).clamp(1, new_depth);
                let score = -self.alphabeta::<false>(sh, -alpha - 1, -alpha, d, cautious);
                (score, score > alpha && d != new_depth)
            } else {
                (-SCORE_INF, !PV || move_cnt > 1)
            };

            if full_depth {
                score = -self.alphabeta::<false>(sh, -alpha - 1, -alpha, new_depth, cautious);
            }

            // Full window on the first move, or after a null-window fail high
            if PV && (move_cnt == 1 || (score > alpha && (root || score < beta))) {
                score = -self.alphabeta::<true>(sh, -beta, -alpha, new_depth, cautious);
            }

            // Verify a win; re-search cautiously if it does not hold
            if PV && self.ply >= 2 && !cautious && score > SCORE_WIN_THRESHOLD {
                let s = -self.alphabeta::<true>(
                    sh,
                    -SCORE_WIN_THRESHOLD,
                    -SCORE_WIN_THRESHOLD + 1,
                    new_depth,
                    true,
                );
                if s < SCORE_WIN_THRESHOLD {
                    score = -self.alphabeta::<true>(sh, -beta, -alpha, new_depth, true);
                }
            }

            self.board.undo_move();
            self.ply -= 1;

            if sh.terminated() {
                return best_score;
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    best_move = em.mv;
                    // A root fail high keeps the previous pv
                    if PV && (!root || score < beta) {
                        self.set_pv(ply, &[em.mv], Some(ply + 1));
                    }
                    if PV && score < beta {
                        alpha = score;
                    } else {
                        break;
                    }
                }
            }
        }

        if move_cnt == 0 {
            // Black with nothing but fouls has lost
            return if mg.skipped_fouls() { loss_in(self.ply + 1) } else { SCORE_DRAW };
        }

        self.update_history(best_move);

        let bound = if best_score >= beta {
            Bound::Lower
        } else if PV && !best_move.is_none() {
            Bound::Exact
        } else {
            Bound::Upper
        };
        sh.tt.save(slot, key, best_move, score_to_tt(best_score, self.ply), bound, PV, depth);

        best_score
    }

    /// Search for a win by continuous fours. Each step plays a four and the
    /// forced block, so the ply advances by two. Returns a win score as soon
    /// as one is proven, `-SCORE_INF` when none is found.
    pub(crate) fn vcf<const PV: bool>(&mut self, sh: &SharedState, depth: i32, root: bool) -> Score {
        let ply = self.ply as usize;

        if !root {
            self.ply_max = self.ply_max.max(self.ply);
            self.nodes += 1;
            self.pv_len[ply] = 0;

            if let Some((wld, offset)) = self.board.check_wld() {
                return self.wld_score(wld, offset);
            }
        }

        if depth <= 0 || self.ply >= DEPTH_MAX {
            return SCORE_ZERO;
        }

        let mut best_score = -SCORE_INF;
        let mut move_cnt = 0;
        let mut mg = MoveGen::vcf(&mut self.board, root);

        while let Some(em) = mg.next_move(&mut self.board) {
            move_cnt += 1;
            if !root && move_cnt > 2 {
                break;
            }

            self.ply += 2;
            self.board.do_move(em.mv);

            if let Some((wld, offset)) = self.board.check_wld() {
                self.board.undo_move();
                self.ply -= 2;
                if wld == Wld::Win(self.board.side_to_move()) {
                    best_score = SCORE_WIN - self.ply - offset;
                    if PV {
                        self.set_pv(ply, &[em.mv], None);
                    }
                    break;
                }
                move_cnt -= 1;
                continue;
            }

            let b4d = self.board.defend_b4();
            if !b4d.is_ok() || !self.board.is_empty(b4d) {
                self.board.undo_move();
                self.ply -= 2;
                continue;
            }

            self.board.do_move(b4d);
            let score = self.vcf::<PV>(sh, depth - 2, false);
            self.board.undo_move();
            self.board.undo_move();
            self.ply -= 2;

            if score > SCORE_WIN_THRESHOLD {
                best_score = score;
                if PV {
                    self.set_pv(ply, &[em.mv, b4d], Some(ply + 2));
                }
                break;
            }
        }

        best_score
    }
}
