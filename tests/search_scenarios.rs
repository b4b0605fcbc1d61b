//! Whole-engine scenarios: decided positions, renju fouls and forced replies

use gomoku::board::{Board, Move, Piece, Rule, Wld};
use gomoku::search::{MoveGen, ThreadPool};

fn board_with(rule: Rule, moves: &[(usize, usize)]) -> Board {
    let mut board = Board::new(rule);
    for &(r, f) in moves {
        board.do_move(Move::new(r, f));
    }
    board
}

fn pool_with(rule: Rule, threads: usize, moves: &[(usize, usize)]) -> ThreadPool {
    let mut pool = ThreadPool::new(rule, threads, 1);
    pool.params.max_depth = 5;
    pool.params.message = false;
    for &(r, f) in moves {
        pool.do_move(Move::new(r, f));
    }
    pool
}

fn generated(board: &mut Board) -> Vec<Move> {
    let mut mg = MoveGen::main(board, Move::NONE, 2, [Move::NONE; 2], Move::NONE);
    let mut moves = Vec::new();
    while let Some(em) = mg.next_move(board) {
        moves.push(em.mv);
    }
    moves
}

/// Black four on rank 7, closed by white at (7,2)
const BLACK_FOUR: [(usize, usize); 8] = [(7, 3), (0, 0), (7, 4), (0, 2), (7, 5), (0, 4), (7, 6), (7, 2)];

/// Black (7,5) (7,6) and (5,7) (6,7): (7,7) would make two open threes
const DOUBLE_THREE: [(usize, usize); 8] = [(7, 5), (0, 0), (7, 6), (0, 2), (5, 7), (0, 4), (6, 7), (0, 14)];

/// White four on rank 7, closed by black at (7,3)
const WHITE_FOUR: [(usize, usize); 8] = [(7, 3), (7, 4), (0, 0), (7, 5), (0, 2), (7, 6), (14, 14), (7, 7)];

#[test]
fn test_immediate_win_is_reported_and_played() {
    let board = board_with(Rule::Freestyle, &BLACK_FOUR);
    assert_eq!(board.side_to_move(), Piece::Black);
    assert_eq!(board.check_wld(), Some((Wld::Win(Piece::Black), 1)));

    for threads in [1, 2] {
        let mut pool = pool_with(Rule::Freestyle, threads, &BLACK_FOUR);
        let mv = pool.think(&mut |_| {});
        assert_eq!(mv, Some(Move::new(7, 7)), "{} thread(s)", threads);
        assert_eq!(pool.board().check_wld_already(), Some(Wld::Win(Piece::Black)));
    }
}

#[test]
fn test_decided_result_is_stable() {
    let mut board = board_with(Rule::Freestyle, &BLACK_FOUR);
    board.do_move(Move::new(7, 7));
    assert_eq!(board.check_wld(), Some((Wld::Win(Piece::Black), 0)));
    for m in [Move::new(10, 10), Move::new(11, 11)] {
        board.do_move(m);
        assert_eq!(board.check_wld_already(), Some(Wld::Win(Piece::Black)));
    }
}

#[test]
fn test_renju_foul_is_excluded_for_black() {
    let mut board = board_with(Rule::Renju, &DOUBLE_THREE);
    let foul = Move::new(7, 7);
    assert!(board.is_foul(foul));
    assert!(!generated(&mut board).contains(&foul));

    let mut pool = pool_with(Rule::Renju, 1, &DOUBLE_THREE);
    let mv = pool.think(&mut |_| {}).expect("a move");
    assert_ne!(mv, foul);
    assert!(pool.board().check_wld_already().is_none(), "black did not lose by foul");
}

#[test]
fn test_foul_cell_is_fine_under_freestyle() {
    let mut board = board_with(Rule::Freestyle, &DOUBLE_THREE);
    let cell = Move::new(7, 7);
    assert!(!board.is_foul(cell));
    assert!(generated(&mut board).contains(&cell));
}

#[test]
fn test_forced_defence_is_the_only_candidate() {
    let mut board = board_with(Rule::Freestyle, &WHITE_FOUR);
    assert_eq!(board.side_to_move(), Piece::Black);
    assert_eq!(board.defend_b4(), Move::new(7, 8));
    assert_eq!(generated(&mut board), vec![Move::new(7, 8)]);

    let mut pool = pool_with(Rule::Freestyle, 2, &WHITE_FOUR);
    assert_eq!(pool.think(&mut |_| {}), Some(Move::new(7, 8)));
}

#[test]
fn test_empty_board_first_move_is_centre() {
    for rule in [Rule::Freestyle, Rule::Standard, Rule::Renju] {
        let mut pool = pool_with(rule, 1, &[]);
        assert_eq!(pool.think(&mut |_| {}), Some(Move::center()), "{:?}", rule);
    }
}

#[test]
fn test_search_replies_to_open_three() {
    // White must stop black's open three (7,6) (7,7) (7,8)
    let moves = [(7, 7), (6, 6), (7, 6), (0, 0), (7, 8)];
    let mut pool = pool_with(Rule::Standard, 1, &moves);
    pool.params.message = true;
    let mut lines = Vec::new();
    let mv = pool.think(&mut |l| lines.push(l.to_string())).expect("a move");
    let defences = [Move::new(7, 5), Move::new(7, 9), Move::new(7, 4), Move::new(7, 10)];
    assert!(defences.contains(&mv), "{} does not block the three", mv);
    assert!(lines.iter().any(|l| l.starts_with("MESSAGE dep ")), "{:?}", lines);
}
