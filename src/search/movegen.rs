//! Staged move generation
//!
//! A [`MoveGen`] lives for one search node. It yields the hash move first
//! (when it is a legal candidate), then generates the remaining moves for
//! the tactical situation and hands them out best score first with a
//! selection pick, since most nodes cut off after a few moves.

use crate::board::{Board, ExtMove, Move, MoveList, Piece, Rule, N3, N4};
use crate::eval::{Score, BONUS_F3D, BONUS_REFUTATION, SCORE_NONE, SCORE_WIN};
use crate::pattern::Material;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    MainTt,
    MainInit,
    MainPick,
    MainEnd,
    VcfTt,
    VcfInit,
    VcfPick,
    VcfEnd,
}

impl Stage {
    fn next(self) -> Stage {
        match self {
            Stage::MainTt => Stage::MainInit,
            Stage::MainInit => Stage::MainPick,
            Stage::MainPick | Stage::MainEnd => Stage::MainEnd,
            Stage::VcfTt => Stage::VcfInit,
            Stage::VcfInit => Stage::VcfPick,
            Stage::VcfPick | Stage::VcfEnd => Stage::VcfEnd,
        }
    }
}

pub struct MoveGen {
    list: MoveList<ExtMove>,
    picked: usize,
    stage: Stage,
    tt_move: Move,
    root: bool,
    ply: i32,
    killers: [Move; 2],
    counter: Move,
    skipped_fouls: bool,
}

impl MoveGen {
    fn with_stage(board: &mut Board, stage: Stage, tt_move: Move) -> Self {
        board.flush_pending();
        let tt_move = if !tt_move.is_none() && board.candidates().contains(tt_move) {
            tt_move
        } else {
            Move::NONE
        };
        let stage = if tt_move.is_none() { stage.next() } else { stage };
        MoveGen {
            list: MoveList::new(),
            picked: 0,
            stage,
            tt_move,
            root: false,
            ply: 0,
            killers: [Move::NONE; 2],
            counter: Move::NONE,
            skipped_fouls: false,
        }
    }

    /// Generator for an alpha-beta node
    pub fn main(board: &mut Board, tt_move: Move, ply: i32, killers: [Move; 2], counter: Move) -> Self {
        let mut mg = Self::with_stage(board, Stage::MainTt, tt_move);
        mg.ply = ply;
        mg.killers = killers;
        mg.counter = counter;
        mg
    }

    /// Generator for a VCF node. The root may pick any four-making move, a
    /// child only those near its previous attacking stone.
    pub fn vcf(board: &mut Board, root: bool) -> Self {
        let mut mg = Self::with_stage(board, Stage::VcfTt, Move::NONE);
        mg.root = root;
        mg
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Moves generated so far, in pick order up to the last picked one
    pub fn moves(&self) -> &[ExtMove] {
        self.list.as_slice()
    }

    /// Renju fouls were dropped from the generated moves
    pub fn skipped_fouls(&self) -> bool {
        self.skipped_fouls
    }

    /// Ordering score: see value, damped far from the recent moves, plus a
    /// bonus for killer and counter moves
    fn score_of(&self, board: &Board, m: Move) -> Score {
        let mut score = board.see_of(m);
        let dist: [i32; 4] = std::array::from_fn(|i| {
            let last = board.last_move(i + 1);
            if last.is_none() {
                0
            } else {
                m.distance(last)
            }
        });

        if dist.iter().all(|&d| d > 4) {
            score /= 4;
        } else if dist[0] > 4 && dist[1] > 4 {
            score /= 2;
        }

        if m == self.killers[0] || m == self.killers[1] || m == self.counter {
            score += BONUS_REFUTATION;
        }
        score
    }

    #[inline]
    fn add(&mut self, board: &Board, m: Move) {
        let score = self.score_of(board, m);
        self.list.push(ExtMove::new(m, score));
    }

    /// The move that realises a decided [`Board::check_wld`] result, scored
    /// with its distance. `None` when the result is not a pending one.
    pub fn generate_wld(board: &mut Board) -> Option<ExtMove> {
        let (_, offset) = board.check_wld()?;
        if offset == 0 {
            return None;
        }
        board.flush_pending();
        let (us, them) = (board.side_to_move(), board.oppo_to_move());

        // Complete our four
        if board.query(us, Material::F4) > 0 || board.query(us, Material::B4) > 0 {
            let five = board
                .candidates()
                .iter()
                .copied()
                .find(|&m| board.query_gain(us, m, Material::C5) > 0);
            if let Some(m) = five {
                return Some(ExtMove::new(m, SCORE_WIN - offset));
            }
        }

        // Their open four cannot be held; any cell that blocks one end will do
        if board.query(them, Material::F4) > 0 {
            let candidates: Vec<Move> = board.candidates().iter().copied().collect();
            for m in candidates {
                board.do_move(m);
                let blocked = board.query_inc(them, Material::F4) < 0;
                board.undo_move();
                if blocked {
                    return Some(ExtMove::new(m, -SCORE_WIN + offset));
                }
            }
        }

        if board.query(them, Material::B4) >= 2 {
            let d = board.defend_b4();
            if d.is_ok() && board.is_empty(d) {
                return Some(ExtMove::new(d, -SCORE_WIN + offset));
            }
        }

        if board.query(us, Material::F3) > 0 && board.query(them, Material::B4) == 0 {
            let four = board
                .threes()
                .iter()
                .find(|t| t.owner == us)
                .map(|t| t.four_cells[0]);
            if let Some(m) = four.filter(|m| !m.is_none()) {
                return Some(ExtMove::new(m, SCORE_WIN - offset));
            }
        }
        None
    }

    fn generate_defend_b4(&mut self, board: &Board) -> bool {
        let d = board.defend_b4();
        if d.is_ok() && board.is_empty(d) {
            self.add(board, d);
            true
        } else {
            false
        }
    }

    /// Break one of their open threes, or gain tempo with a four of our own
    fn generate_defend_f3(&mut self, board: &Board) {
        let (us, them) = (board.side_to_move(), board.oppo_to_move());
        for three in board.threes().iter().filter(|t| t.owner == them) {
            for &m in three.defences.iter().filter(|m| !m.is_none()) {
                let score = self.score_of(board, m) + BONUS_F3D;
                self.list.push(ExtMove::new(m, score));
            }
        }
        for &m in board.candidates().iter() {
            if board.query_gain(us, m, Material::B4) > 0 {
                self.add(board, m);
            }
        }
    }

    fn generate_default(&mut self, board: &Board) {
        for &m in board.candidates().iter() {
            self.add(board, m);
        }
    }

    /// Radius-3 neighbourhood, for the first plies of an opening
    fn generate_large(&mut self, board: &Board) {
        for &stone in board.moves() {
            for &delta in N3.iter() {
                let m = stone.offset(delta);
                if board.is_empty(m) && !self.list.contains(m) {
                    self.add(board, m);
                }
            }
        }
    }

    /// Fill the list for the current tactical situation
    pub fn generate_main(&mut self, board: &mut Board) {
        let them = board.oppo_to_move();
        if board.query(them, Material::B4) > 0 && self.generate_defend_b4(board) {
            return;
        }
        if board.query(them, Material::F3) > 0 {
            self.generate_defend_f3(board);
        } else if self.ply < 2 && board.piece_count() < 5 {
            self.generate_large(board);
        } else {
            self.generate_default(board);
        }
        self.drop_fouls(board);
    }

    /// Black may not play renju fouls; the cheap tag test runs first
    fn drop_fouls(&mut self, board: &mut Board) {
        if board.rule() != Rule::Renju || board.side_to_move() != Piece::Black {
            return;
        }
        let mut i = self.picked;
        while i < self.list.len() {
            let m = self.list[i].mv;
            if board.may_be_foul(m) && board.is_foul(m) {
                self.list.remove(m);
                self.skipped_fouls = true;
            } else {
                i += 1;
            }
        }
    }

    /// Our move is a four-making candidate worth following in VCF
    fn vcf_worthy(board: &Board, m: Move) -> bool {
        let us = board.side_to_move();
        let b4 = board.query_gain(us, m, Material::B4);
        b4 > 0
            && (b4 >= 2
                || board.query_gain(us, m, Material::F3) > 0
                || board.query_gain(us, m, Material::B3) > 0
                || board.query_vcf(us, m) > 0)
    }

    fn generate_vcf(&mut self, board: &Board) {
        let (us, them) = (board.side_to_move(), board.oppo_to_move());
        if board.query(them, Material::B4) > 0 {
            // Forced to block: only worth it when the block is a four too
            let d = board.defend_b4();
            if d.is_ok()
                && board.is_empty(d)
                && (board.query_gain(us, d, Material::F4) > 0 || board.query_gain(us, d, Material::B4) > 0)
            {
                self.list.push(ExtMove::new(d, SCORE_NONE));
            }
        } else if self.root {
            for &m in board.candidates().iter() {
                if Self::vcf_worthy(board, m) {
                    self.list.push(ExtMove::new(m, board.see_of(m)));
                }
            }
        } else {
            let anchor = board.last_move(2);
            if anchor.is_none() {
                return;
            }
            for &delta in N4.iter() {
                let m = anchor.offset(delta);
                if board.is_empty(m) && Self::vcf_worthy(board, m) {
                    self.list.push(ExtMove::new(m, board.see_of(m)));
                }
            }
        }
    }

    /// Next move to search, best ordering score first
    pub fn next_move(&mut self, board: &mut Board) -> Option<ExtMove> {
        loop {
            match self.stage {
                Stage::MainTt | Stage::VcfTt => {
                    self.list.push(ExtMove::new(self.tt_move, SCORE_NONE));
                    self.picked = 1;
                    self.stage = self.stage.next();
                    return Some(self.list[0]);
                }
                Stage::MainInit => {
                    self.generate_main(board);
                    self.stage = self.stage.next();
                }
                Stage::VcfInit => {
                    self.generate_vcf(board);
                    self.stage = self.stage.next();
                }
                Stage::MainPick | Stage::VcfPick => {
                    if self.picked >= self.list.len() {
                        self.stage = self.stage.next();
                        continue;
                    }
                    let items = self.list.as_mut_slice();
                    let mut best = self.picked;
                    for i in self.picked + 1..items.len() {
                        if items[i].score > items[best].score {
                            best = i;
                        }
                    }
                    items.swap(self.picked, best);
                    let em = items[self.picked];
                    self.picked += 1;
                    return Some(em);
                }
                Stage::MainEnd | Stage::VcfEnd => return None,
            }
        }
    }
}
