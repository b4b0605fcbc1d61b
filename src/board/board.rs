//! Incremental pattern board
//!
//! Besides the stones themselves the board maintains, per color:
//! - the count of every tactical material, kept for every ply so undo is a
//!   pointer move,
//! - the running static score,
//! - one tag word per (line, cell) describing what a stone there would do
//!   (the "see" arrays),
//! - the runs of cells free of opponent stones along every line.
//!
//! A move only touches the four lines through it, so each update is a
//! handful of table lookups.

use std::fmt;

use super::{
    geometry, zobrist, Direction, Interval, IntervalTable, Move, MoveList, OpenThree, Piece, Rule,
    BOARD_SIDE, DIRECTION_NUM, MOVE_CAPACITY, MOVE_SIZE, N2, STACK_SIZE, VECTOR_SIZE,
};
use crate::eval::{material_score, see_table, Score, SCORE_ZERO};
use crate::pattern::{self, tag, Material, PatternTable, MATERIAL_NUM, MIN_LINE_LEN};

type MaterialCounts = [[i16; MATERIAL_NUM]; 2];
type SeeLines = [[[u32; BOARD_SIDE]; DIRECTION_NUM]; 2];

/// Outcome already decided on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wld {
    Win(Piece),
    Draw,
}

#[derive(Clone)]
pub struct Board {
    rule: Rule,
    tables: [&'static PatternTable; 2],
    piece_cnt: usize,
    side_to_move: Piece,
    key: u64,
    cells: Vec<Piece>,
    piece_list: Vec<Move>,

    material: Vec<MaterialCounts>,
    material_inc: MaterialCounts,
    score: Vec<[Score; 2]>,
    see: [Vec<[u32; BOARD_SIDE]>; 2],
    see_stack: Vec<SeeLines>,
    vector_board: [Vec<u32>; 2],
    interval: [IntervalTable; 2],

    mlist_stack: Vec<MoveList<Move>>,
    three_stack: Vec<Vec<OpenThree>>,
    threes_formed: Vec<[i32; 2]>,
    b4d_stack: Vec<Move>,

    // Two-phase updates: work a move schedules for its children is done by
    // the first child move (or the move generator), and only once per ply
    interval_flushed: Vec<bool>,
    movelist_flushed: Vec<bool>,
}

impl Board {
    pub fn new(rule: Rule) -> Self {
        let mut board = Board {
            rule,
            tables: Self::tables_for(rule),
            piece_cnt: 0,
            side_to_move: Piece::Black,
            key: 0,
            cells: vec![Piece::Out; MOVE_CAPACITY],
            piece_list: vec![Move::NONE; MOVE_SIZE],
            material: vec![[[0; MATERIAL_NUM]; 2]; STACK_SIZE],
            material_inc: [[0; MATERIAL_NUM]; 2],
            score: vec![[0; 2]; STACK_SIZE],
            see: [vec![[0; BOARD_SIDE]; VECTOR_SIZE], vec![[0; BOARD_SIDE]; VECTOR_SIZE]],
            see_stack: vec![[[[0; BOARD_SIDE]; DIRECTION_NUM]; 2]; STACK_SIZE],
            vector_board: [vec![0; VECTOR_SIZE], vec![0; VECTOR_SIZE]],
            interval: [IntervalTable::new(), IntervalTable::new()],
            mlist_stack: vec![MoveList::new(); STACK_SIZE],
            three_stack: vec![Vec::new(); STACK_SIZE],
            threes_formed: vec![[0; 2]; STACK_SIZE],
            b4d_stack: vec![Move::NONE; STACK_SIZE],
            interval_flushed: vec![false; STACK_SIZE + 1],
            movelist_flushed: vec![false; STACK_SIZE + 1],
        };
        board.reset();
        board
    }

    fn tables_for(rule: Rule) -> [&'static PatternTable; 2] {
        [
            pattern::table(pattern::kind_for(rule, Piece::Black)),
            pattern::table(pattern::kind_for(rule, Piece::White)),
        ]
    }

    /// Clear the board, keeping the rule
    pub fn reset(&mut self) {
        self.cells.fill(Piece::Out);
        for m in Move::all() {
            self.cells[m.index()] = Piece::Empty;
        }
        self.piece_cnt = 0;
        self.side_to_move = Piece::Black;
        self.key = 0;

        self.material[0] = [[0; MATERIAL_NUM]; 2];
        self.material_inc = [[0; MATERIAL_NUM]; 2];
        self.score[0] = [0; 2];
        self.threes_formed[0] = [0; 2];
        for p in 0..2 {
            self.vector_board[p].fill(0);
            for line in self.see[p].iter_mut() {
                *line = [0; BOARD_SIDE];
            }
            self.interval[p] = IntervalTable::new();
        }
        self.mlist_stack[0].clear();
        self.three_stack[0].clear();
        self.b4d_stack[0] = Move::NONE;
        self.interval_flushed[0] = true;
        self.movelist_flushed[0] = true;

        // Empty lines carry no material, only cell tags
        let geo = geometry();
        for p in [Piece::Black, Piece::White] {
            for line in 0..VECTOR_SIZE {
                let len = geo.line_len(line);
                let start = geo.line_start(line);
                self.line_inc(p, start, geo.line_direction(line), Interval::new(0, len));
            }
        }
        self.material_inc = [[0; MATERIAL_NUM]; 2];
        self.three_stack[0].clear();
    }

    pub fn rule(&self) -> Rule {
        self.rule
    }

    /// Switch rule, replaying the current moves under the new tables
    pub fn set_rule(&mut self, rule: Rule) {
        if rule == self.rule {
            return;
        }
        let moves = self.moves().to_vec();
        self.rule = rule;
        self.tables = Self::tables_for(rule);
        self.reset();
        for m in moves {
            self.do_move(m);
        }
    }

    #[inline]
    pub fn side_to_move(&self) -> Piece {
        self.side_to_move
    }

    #[inline]
    pub fn oppo_to_move(&self) -> Piece {
        self.side_to_move.opponent()
    }

    #[inline]
    pub fn piece_count(&self) -> usize {
        self.piece_cnt
    }

    #[inline]
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Key of the position after the side to move plays `m`
    #[inline]
    pub fn key_after(&self, m: Move) -> u64 {
        self.key ^ zobrist().key(self.side_to_move, m)
    }

    #[inline]
    pub fn piece_on(&self, m: Move) -> Piece {
        self.cells[m.index()]
    }

    #[inline]
    pub fn is_empty(&self, m: Move) -> bool {
        self.cells[m.index()] == Piece::Empty
    }

    /// Moves played so far, oldest first
    pub fn moves(&self) -> &[Move] {
        &self.piece_list[..self.piece_cnt]
    }

    /// The `i`-th most recent move (1 = last), or `Move::NONE`
    #[inline]
    pub fn last_move(&self, i: usize) -> Move {
        if i == 0 || i > self.piece_cnt {
            Move::NONE
        } else {
            self.piece_list[self.piece_cnt - i]
        }
    }

    fn switch_side(&mut self) {
        self.side_to_move = self.side_to_move.opponent();
    }

    pub fn do_move(&mut self, m: Move) {
        debug_assert!(m.is_ok() && self.is_empty(m), "illegal move {}", m);
        debug_assert!(self.piece_cnt < MOVE_SIZE);
        self.flush_pending();

        let us = self.side_to_move;
        self.cells[m.index()] = us;
        self.piece_list[self.piece_cnt] = m;
        self.piece_cnt += 1;

        self.update_material_see(m);
        self.key ^= zobrist().key(us, m);
        self.switch_side();

        self.interval_flushed[self.piece_cnt] = false;
        self.movelist_flushed[self.piece_cnt] = false;
    }

    pub fn undo_move(&mut self) {
        debug_assert!(self.piece_cnt > 0);
        self.switch_side();
        self.piece_cnt -= 1;
        let last = self.piece_list[self.piece_cnt];
        let mover = self.cells[last.index()];
        self.cells[last.index()] = Piece::Empty;

        self.restore_see(last);
        self.set_vector_bit(mover, last, false);
        if self.interval_flushed[self.piece_cnt + 1] {
            self.interval[mover.opponent().index()].restore(last);
        }
        self.key ^= zobrist().key(mover, last);
    }

    /// Run the updates the last move scheduled for its successors
    pub fn flush_pending(&mut self) {
        self.flush_interval();
        self.flush_movelist();
    }

    fn flush_interval(&mut self) {
        let cnt = self.piece_cnt;
        if cnt > 0 && !self.interval_flushed[cnt] {
            let last = self.piece_list[cnt - 1];
            let split = self.cells[last.index()].opponent();
            self.interval[split.index()].split(last);
            self.interval_flushed[cnt] = true;
        }
    }

    fn flush_movelist(&mut self) {
        let cnt = self.piece_cnt;
        if cnt > 0 && !self.movelist_flushed[cnt] {
            let last = self.piece_list[cnt - 1];
            let (prev, cur) = self.mlist_stack.split_at_mut(cnt);
            let list = &mut cur[0];
            list.copy_from(&prev[cnt - 1]);
            list.remove(last);
            for &delta in N2.iter() {
                let m = last.offset(delta);
                if self.cells[m.index()] == Piece::Empty {
                    list.push(m);
                }
            }
            self.movelist_flushed[cnt] = true;
        }
    }

    /// Empty cells within distance 2 of any stone, along the four lines
    pub fn move_list(&mut self) -> &MoveList<Move> {
        self.flush_movelist();
        &self.mlist_stack[self.piece_cnt]
    }

    /// Same list as [`move_list`](Self::move_list) for an already flushed board
    #[inline]
    pub fn candidates(&self) -> &MoveList<Move> {
        debug_assert!(self.movelist_flushed[self.piece_cnt], "move list read before flush");
        &self.mlist_stack[self.piece_cnt]
    }

    #[inline]
    fn segment_bits(&self, p: Piece, line: usize, itv: Interval) -> u32 {
        (self.vector_board[p.index()][line] >> itv.begin) & ((1u32 << itv.len()) - 1)
    }

    fn set_vector_bit(&mut self, p: Piece, m: Move, on: bool) {
        let geo = geometry();
        for d in Direction::ALL {
            let bit = 1u32 << geo.index_on(m, d);
            let word = &mut self.vector_board[p.index()][geo.index_of(m, d)];
            if on {
                *word |= bit;
            } else {
                *word &= !bit;
            }
        }
    }

    /// Add the materials and cell tags of segment `itv` of the line through `m`
    fn line_inc(&mut self, p: Piece, m: Move, d: Direction, itv: Interval) {
        let geo = geometry();
        let (line, on) = (geo.index_of(m, d), geo.index_on(m, d));
        let pi = p.index();

        if itv.len() < MIN_LINE_LEN {
            for tag in &mut self.see[pi][line][itv.range()] {
                *tag = 0;
            }
            return;
        }

        let cnt = self.piece_cnt;
        let entry = self.tables[pi].entry(self.segment_bits(p, line, itv), itv.len());
        let mut forms_three = false;
        for mat in entry.materials() {
            self.material_inc[pi][mat.index()] += 1;
            self.score[cnt][pi] += material_score(mat);
            forms_three |= mat == Material::F3;
        }

        let track = forms_three
            && !self.three_stack[cnt]
                .iter()
                .any(|t| t.owner == p && t.line == line);
        let mut three = OpenThree::new(p, m, d, line);

        for (k, i) in itv.range().enumerate() {
            let cell_tag = entry.cell(k);
            let cell = m.offset(d.step() * (i as i32 - on as i32));
            if track {
                if cell_tag & tag::promote(Material::F4) != 0 {
                    three.add_four_cell(cell);
                }
                if cell_tag & tag::split_demote(Material::F3) != 0 {
                    three.add_defence(cell);
                }
            }
            if cell_tag & tag::split_demote(Material::B4) != 0 {
                self.b4d_stack[cnt] = cell;
            }
            self.see[pi][line][i] = cell_tag;
        }

        if track {
            self.three_stack[cnt].push(three);
        }
    }

    /// Remove the materials of segment `itv` of the line through `m`
    fn line_dec(&mut self, p: Piece, m: Move, d: Direction, itv: Interval) {
        if itv.len() < MIN_LINE_LEN {
            return;
        }
        let line = geometry().index_of(m, d);
        let bits = self.segment_bits(p, line, itv);
        if bits == 0 {
            return;
        }
        let pi = p.index();
        let cnt = self.piece_cnt;
        let entry = self.tables[pi].entry(bits, itv.len());
        for mat in entry.materials() {
            self.material_inc[pi][mat.index()] -= 1;
            self.score[cnt][pi] -= material_score(mat);
        }
    }

    fn update_material_see(&mut self, m: Move) {
        let cnt = self.piece_cnt;
        let geo = geometry();
        let us = self.side_to_move;
        let them = us.opponent();

        self.material_inc = [[0; MATERIAL_NUM]; 2];
        self.material[cnt] = self.material[cnt - 1];
        self.score[cnt] = self.score[cnt - 1];
        let (prev, cur) = self.three_stack.split_at_mut(cnt);
        cur[0].clone_from(&prev[cnt - 1]);
        self.b4d_stack[cnt] = self.b4d_stack[cnt - 1];

        for p in 0..2 {
            for d in Direction::ALL {
                self.see_stack[cnt - 1][p][d.index()] = self.see[p][geo.index_of(m, d)];
            }
        }

        // Both colors lose whatever the four lines through m held
        for p in [Piece::Black, Piece::White] {
            for d in Direction::ALL {
                let itv = self.interval[p.index()].get(geo.index_of(m, d), geo.index_on(m, d));
                self.line_dec(p, m, d, itv);
            }
        }

        self.set_vector_bit(us, m, true);

        // The mover's runs are unchanged; the opponent's run through m splits
        for d in Direction::ALL {
            let (line, on) = (geo.index_of(m, d), geo.index_on(m, d));
            let own = self.interval[us.index()].get(line, on);
            self.line_inc(us, m, d, own);
            let opp = self.interval[them.index()].get(line, on);
            self.line_inc(them, m, d, Interval::new(opp.begin as usize, on));
            self.line_inc(them, m, d, Interval::new(on + 1, opp.end as usize));
        }

        for p in 0..2 {
            for i in 0..MATERIAL_NUM {
                self.material[cnt][p][i] += self.material_inc[p][i];
            }
        }

        self.refresh_threes();
    }

    fn refresh_threes(&mut self) {
        let cnt = self.piece_cnt;
        let renju = self.rule == Rule::Renju;
        let mut threes = std::mem::take(&mut self.three_stack[cnt]);
        for t in threes.iter_mut() {
            t.refresh(self, renju && t.owner == Piece::Black);
        }

        let mut counts = [0i16; 2];
        let mut formed = [0i32; 2];
        threes.retain_mut(|t| {
            if !t.is_valid() {
                return false;
            }
            counts[t.owner.index()] += 1;
            if t.age <= 0 {
                formed[t.owner.index()] += 1;
            }
            t.age += 1;
            true
        });
        self.three_stack[cnt] = threes;
        self.threes_formed[cnt] = formed;

        let f3 = Material::F3.index();
        for p in 0..2 {
            self.material[cnt][p][f3] = counts[p];
        }
    }

    fn restore_see(&mut self, m: Move) {
        let geo = geometry();
        let cnt = self.piece_cnt;
        for p in 0..2 {
            for d in Direction::ALL {
                self.see[p][geo.index_of(m, d)] = self.see_stack[cnt][p][d.index()];
            }
        }
    }

    #[inline]
    fn see_at(&self, p: Piece, m: Move, d: Direction) -> u32 {
        let geo = geometry();
        self.see[p.index()][geo.index_of(m, d)][geo.index_on(m, d)]
    }

    /// Count of material `mat` held by `p`
    #[inline]
    pub fn query(&self, p: Piece, mat: Material) -> i32 {
        self.material[self.piece_cnt][p.index()][mat.index()] as i32
    }

    /// Change of `mat` for `p` caused by the last move
    #[inline]
    pub fn query_inc(&self, p: Piece, mat: Material) -> i32 {
        let cnt = self.piece_cnt;
        if cnt == 0 {
            return 0;
        }
        (self.material[cnt][p.index()][mat.index()] - self.material[cnt - 1][p.index()][mat.index()]) as i32
    }

    /// Directions in which a stone of `p` on `m` would add `mat` for `p`
    pub fn query_gain(&self, p: Piece, m: Move, mat: Material) -> i32 {
        Direction::ALL
            .iter()
            .filter(|&&d| self.see_at(p, m, d) & tag::promote(mat) != 0)
            .count() as i32
    }

    /// Directions in which a stone of `p` on `m` would take `mat` away from
    /// the opponent
    pub fn query_defence(&self, p: Piece, m: Move, mat: Material) -> i32 {
        Direction::ALL
            .iter()
            .filter(|&&d| self.see_at(p.opponent(), m, d) & tag::split_demote(mat) != 0)
            .count() as i32
    }

    /// Directions in which `m` is a VCF continuation cell for `p`
    pub fn query_vcf(&self, p: Piece, m: Move) -> i32 {
        Direction::ALL
            .iter()
            .filter(|&&d| self.see_at(p, m, d) & tag::VCF != 0)
            .count() as i32
    }

    /// Open threes currently on the board
    pub fn threes(&self) -> &[OpenThree] {
        &self.three_stack[self.piece_cnt]
    }

    /// Open threes of `p` created by the last move
    pub fn threes_formed(&self, p: Piece) -> i32 {
        self.threes_formed[self.piece_cnt][p.index()]
    }

    /// The cell that blocks the opponent's blocked four
    #[inline]
    pub fn defend_b4(&self) -> Move {
        self.b4d_stack[self.piece_cnt]
    }

    /// Static-exchange ordering estimate of `m` for the side to move
    pub fn see_of(&self, m: Move) -> Score {
        let table = see_table();
        let (us, them) = (self.side_to_move, self.oppo_to_move());
        Direction::ALL
            .iter()
            .map(|&d| {
                let own = (self.see_at(us, m, d) >> 3) & 0x3FFF;
                let opp = (self.see_at(them, m, d) >> 17) & 0x3FFF;
                table[own as usize] - table[opp as usize]
            })
            .sum()
    }

    /// Static evaluation from the side to move, averaged over the last two plies
    pub fn evaluate(&self) -> Score {
        let cnt = self.piece_cnt;
        if cnt == 0 {
            return SCORE_ZERO;
        }
        let (us, them) = (self.side_to_move.index(), self.oppo_to_move().index());
        let now = self.score[cnt][us] - self.score[cnt][them];
        let before = self.score[cnt - 1][us] - self.score[cnt - 1][them];
        (now + before) / 2
    }

    /// Neither color holds a blocked four or open three
    pub fn is_quiet(&self) -> bool {
        [Piece::Black, Piece::White]
            .iter()
            .all(|&p| self.query(p, Material::B4) == 0 && self.query(p, Material::F3) == 0)
    }

    /// Black's last move broke a renju restriction
    fn renju_foul(&self) -> bool {
        self.query(Piece::Black, Material::C6) > 0
            || self.query_inc(Piece::Black, Material::F4) + self.query_inc(Piece::Black, Material::B4) >= 2
            || self.threes_formed(Piece::Black) >= 2
    }

    /// Result that is already on the board
    pub fn check_wld_already(&self) -> Option<Wld> {
        if self.query(Piece::Black, Material::C5) > 0 {
            return Some(Wld::Win(Piece::Black));
        }
        if self.query(Piece::White, Material::C5) > 0 {
            return Some(Wld::Win(Piece::White));
        }
        if self.piece_cnt >= MOVE_SIZE {
            return Some(Wld::Draw);
        }
        let black_just_moved = self.piece_cnt > 0 && self.side_to_move == Piece::White;
        if self.rule == Rule::Renju && black_just_moved && self.renju_foul() {
            return Some(Wld::Win(Piece::White));
        }
        None
    }

    /// Result that is decided within a few plies, with its distance.
    ///
    /// Distance 3 (side to move has an open three and the opponent no four)
    /// is taken as a win without verification.
    pub fn check_wld(&self) -> Option<(Wld, i32)> {
        if let Some(wld) = self.check_wld_already() {
            return Some((wld, 0));
        }
        let (us, them) = (self.side_to_move, self.oppo_to_move());
        if self.query(us, Material::F4) > 0 || self.query(us, Material::B4) > 0 {
            return Some((Wld::Win(us), 1));
        }
        if self.query(them, Material::F4) > 0 || self.query(them, Material::B4) >= 2 {
            return Some((Wld::Win(them), 2));
        }
        if self.query(us, Material::F3) > 0 && self.query(them, Material::B4) == 0 {
            return Some((Wld::Win(us), 3));
        }
        None
    }

    /// Cheap pre-filter: could a black stone on `m` be a foul at all
    pub(crate) fn may_be_foul(&self, m: Move) -> bool {
        let black = Piece::Black;
        self.query_gain(black, m, Material::C5) == 0
            && (self.query_gain(black, m, Material::C6) > 0
                || self.query_gain(black, m, Material::F4) + self.query_gain(black, m, Material::B4) > 0
                || self.query_gain(black, m, Material::F3) >= 2)
    }

    /// Would a black stone on `m` be a renju foul.
    ///
    /// Always false under other rules, on occupied cells, and for a move
    /// that completes an exact five.
    pub fn is_foul(&mut self, m: Move) -> bool {
        if self.rule != Rule::Renju || !m.is_ok() || !self.is_empty(m) {
            return false;
        }
        if self.query_gain(Piece::Black, m, Material::C5) > 0 {
            return false;
        }
        self.flush_pending();
        let switched = self.side_to_move != Piece::Black;
        if switched {
            self.switch_side();
        }
        self.do_move(m);
        let foul = self.renju_foul();
        self.undo_move();
        if switched {
            self.switch_side();
        }
        foul
    }

    /// Every empty cell that is a foul for black
    pub fn forbidden_moves(&mut self) -> Vec<Move> {
        if self.rule != Rule::Renju {
            return Vec::new();
        }
        let candidates: Vec<Move> = Move::all().filter(|&m| self.is_empty(m)).collect();
        candidates.into_iter().filter(|&m| self.is_foul(m)).collect()
    }

    /// Material counts recomputed from scratch by scanning every line.
    ///
    /// Open threes are counted by the table here; the incremental count only
    /// keeps threes that still have a four cell and a defence.
    pub fn recount_materials(&self) -> [[i32; MATERIAL_NUM]; 2] {
        let geo = geometry();
        let mut counts = [[0i32; MATERIAL_NUM]; 2];
        for p in [Piece::Black, Piece::White] {
            for line in 0..VECTOR_SIZE {
                let (start, d, len) = (geo.line_start(line), geo.line_direction(line), geo.line_len(line));
                let mut run_start = 0;
                for i in 0..=len {
                    let blocked = i == len || self.piece_on(start.offset(d.step() * i as i32)) == p.opponent();
                    if !blocked {
                        continue;
                    }
                    let run = Interval::new(run_start, i);
                    if run.len() >= MIN_LINE_LEN {
                        let entry = self.tables[p.index()].entry(self.segment_bits(p, line, run), run.len());
                        for mat in entry.materials() {
                            counts[p.index()][mat.index()] += 1;
                        }
                    }
                    run_start = i + 1;
                }
            }
        }
        counts
    }

    /// Interval record of `p` at `m` along `d`, for consistency checks
    pub fn interval_at(&self, p: Piece, m: Move, d: Direction) -> Interval {
        let geo = geometry();
        self.interval[p.index()].get(geo.index_of(m, d), geo.index_on(m, d))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..BOARD_SIDE {
            for file in 0..BOARD_SIDE {
                let c = match self.piece_on(Move::new(r, file)) {
                    Piece::Black => 'X',
                    Piece::White => 'O',
                    _ => '.',
                };
                write!(f, "{} ", c)?;
            }
            writeln!(f, "{}", BOARD_SIDE - r)?;
        }
        for file in 0..BOARD_SIDE {
            write!(f, "{:<2}", (b'A' + file as u8) as char)?;
        }
        writeln!(f)?;

        write!(f, "{} {}", self.piece_cnt, if self.piece_cnt < 2 { "move" } else { "moves" })?;
        for m in self.moves() {
            write!(f, " {}", m)?;
        }
        writeln!(f)?;
        writeln!(f, "side to move {}", self.side_to_move)?;

        write!(f, "     ")?;
        for m in Material::ALL {
            write!(f, " {}", m.name())?;
        }
        writeln!(f)?;
        for p in [Piece::Black, Piece::White] {
            write!(f, "{:<5}", p)?;
            for m in Material::ALL {
                write!(f, " {:>2}", self.query(p, m))?;
            }
            writeln!(f)?;
        }
        write!(f, "key {:016x}", self.key)
    }
}
