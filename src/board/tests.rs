use super::*;
use crate::eval::Score;
use crate::pattern::Material;

fn mv(r: usize, f: usize) -> Move {
    Move::new(r, f)
}

fn play(board: &mut Board, moves: &[(usize, usize)]) {
    for &(r, f) in moves {
        board.do_move(mv(r, f));
    }
}

/// Deterministic pseudo-random game among the move-list candidates,
/// stopping before the game is decided
fn random_game(board: &mut Board, plies: usize, mut seed: u64) -> Vec<Move> {
    let mut played = Vec::new();
    for _ in 0..plies {
        if board.check_wld_already().is_some() {
            break;
        }
        let candidates: Vec<Move> = if board.piece_count() == 0 {
            vec![Move::center()]
        } else {
            board.move_list().iter().copied().collect()
        };
        if candidates.is_empty() {
            break;
        }
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        let m = candidates[(seed >> 33) as usize % candidates.len()];
        board.do_move(m);
        played.push(m);
    }
    played
}

#[derive(Debug, PartialEq)]
struct Snapshot {
    cells: Vec<Piece>,
    key: u64,
    side: Piece,
    materials: Vec<i32>,
    eval: Score,
    see: Vec<Score>,
    threes: Vec<OpenThree>,
    intervals: Vec<Interval>,
}

fn snapshot(board: &mut Board) -> Snapshot {
    board.flush_pending();
    let mut materials = Vec::new();
    let mut intervals = Vec::new();
    for p in [Piece::Black, Piece::White] {
        for m in Material::ALL {
            materials.push(board.query(p, m));
        }
        for m in Move::all() {
            if board.piece_on(m) != p.opponent() {
                for d in Direction::ALL {
                    intervals.push(board.interval_at(p, m, d));
                }
            }
        }
    }
    Snapshot {
        cells: Move::all().map(|m| board.piece_on(m)).collect(),
        key: board.key(),
        side: board.side_to_move(),
        materials,
        eval: board.evaluate(),
        see: Move::all().filter(|&m| board.is_empty(m)).map(|m| board.see_of(m)).collect(),
        threes: board.threes().to_vec(),
        intervals,
    }
}

#[test]
fn test_piece_opponent() {
    assert_eq!(Piece::Black.opponent(), Piece::White);
    assert_eq!(Piece::White.opponent(), Piece::Black);
    assert_eq!(Piece::Empty.opponent(), Piece::Empty);
}

#[test]
fn test_move_coordinates() {
    let m = mv(3, 11);
    assert_eq!(m.rank(), 3);
    assert_eq!(m.file(), 11);
    assert!(m.is_ok());
    assert!(!Move::NONE.is_ok());
    assert_eq!(Move::from_coords(-1, 0), None);
    assert_eq!(Move::from_coords(0, BOARD_SIDE as i64), None);
    assert_eq!(Move::from_coords(2, 2), Some(mv(2, 2)));
    assert_eq!(Move::center(), mv(BOARD_SIDE / 2, BOARD_SIDE / 2));
    assert_eq!(mv(0, 0).distance(mv(2, 1)), 2);
}

#[test]
fn test_move_display() {
    assert_eq!(mv(0, 0).to_string(), format!("a{}", BOARD_SIDE));
    assert_eq!(mv(BOARD_SIDE - 1, 2).to_string(), "c1");
    assert_eq!(Move::NONE.to_string(), "NONE");
}

#[test]
fn test_rule_from_protocol() {
    assert_eq!(Rule::from_protocol(0), Some(Rule::Freestyle));
    assert_eq!(Rule::from_protocol(1), Some(Rule::Standard));
    assert_eq!(Rule::from_protocol(2), Some(Rule::Renju));
    assert_eq!(Rule::from_protocol(4), Some(Rule::Renju));
    assert_eq!(Rule::from_protocol(3), None);
}

#[test]
fn test_board_constants() {
    assert_eq!(MOVE_SIZE, BOARD_SIDE * BOARD_SIDE);
    assert_eq!(STACK_SIZE, MOVE_SIZE + 1);
    assert_eq!(VECTOR_SIZE, 6 * BOARD_SIDE - 2);
    assert_eq!(D, [1, 31, 32, 33]);
}

#[test]
fn test_new_board_is_empty() {
    let mut board = Board::new(Rule::Freestyle);
    assert_eq!(board.piece_count(), 0);
    assert_eq!(board.side_to_move(), Piece::Black);
    assert_eq!(board.key(), 0);
    assert_eq!(board.evaluate(), 0);
    assert!(board.move_list().is_empty());
    assert!(board.check_wld().is_none());
    for p in [Piece::Black, Piece::White] {
        for m in Material::ALL {
            assert_eq!(board.query(p, m), 0, "{:?} {:?} on empty board", p, m);
        }
    }
    assert_eq!(board.piece_on(Move::NONE.offset(1)), Piece::Out);
}

#[test]
fn test_move_list_after_first_move() {
    let mut board = Board::new(Rule::Freestyle);
    board.do_move(Move::center());
    let list: Vec<Move> = board.move_list().iter().copied().collect();
    assert_eq!(list.len(), N2.len());
    for &delta in N2.iter() {
        assert!(list.contains(&Move::center().offset(delta)));
    }
    assert!(!list.contains(&Move::center()));
}

#[test]
fn test_move_list_drops_played_cell() {
    let mut board = Board::new(Rule::Freestyle);
    play(&mut board, &[(7, 7), (7, 8)]);
    let list = board.move_list();
    assert!(!list.contains(mv(7, 7)));
    assert!(!list.contains(mv(7, 8)));
    assert!(list.contains(mv(7, 10)), "new neighbours of the last move are added");
    assert!(list.contains(mv(7, 5)), "old neighbours are kept");
}

#[test]
fn test_undo_round_trip() {
    for (seed, rule) in [(1u64, Rule::Freestyle), (7, Rule::Standard), (42, Rule::Renju)] {
        let mut board = Board::new(rule);
        play(&mut board, &[(7, 7), (8, 8)]);
        let before = snapshot(&mut board);

        let played = random_game(&mut board, 40, seed);
        assert!(!played.is_empty());
        for _ in 0..played.len() {
            board.undo_move();
        }
        let after = snapshot(&mut board);
        assert!(before == after, "state differs after undo (rule {:?}, seed {})", rule, seed);
    }
}

#[test]
fn test_undo_interleaved_with_moves() {
    let mut board = Board::new(Rule::Freestyle);
    play(&mut board, &[(7, 7), (7, 8), (8, 7)]);
    let before = snapshot(&mut board);

    board.do_move(mv(9, 9));
    board.undo_move();
    board.do_move(mv(6, 6));
    board.do_move(mv(5, 5));
    board.undo_move();
    board.undo_move();

    let after = snapshot(&mut board);
    assert!(before == after, "state differs after interleaved do/undo");
}

#[test]
fn test_incremental_matches_recount() {
    for (seed, rule) in [(3u64, Rule::Freestyle), (11, Rule::Standard), (5, Rule::Renju)] {
        let mut board = Board::new(rule);
        for _ in 0..30 {
            let step_seed = seed + board.piece_count() as u64;
            if random_game(&mut board, 1, step_seed).is_empty() {
                break;
            }
            let recount = board.recount_materials();
            for p in [Piece::Black, Piece::White] {
                for m in Material::ALL {
                    if m == Material::F3 {
                        continue;
                    }
                    assert_eq!(
                        board.query(p, m),
                        recount[p.index()][m.index()],
                        "{:?} {:?} after {} moves under {:?}",
                        p,
                        m,
                        board.piece_count(),
                        rule
                    );
                }
            }
        }
    }
}

#[test]
fn test_intervals_match_runs() {
    let mut board = Board::new(Rule::Standard);
    random_game(&mut board, 24, 9);
    board.flush_pending();
    let geo = geometry();

    for p in [Piece::Black, Piece::White] {
        for m in Move::all() {
            if board.piece_on(m) == p.opponent() {
                continue;
            }
            for d in Direction::ALL {
                let itv = board.interval_at(p, m, d);
                let on = geo.index_on(m, d);
                assert!(itv.range().contains(&on), "{} not inside its own run", m);
                // Run ends at an opponent stone or the edge
                let left = m.offset(-d.step() * (on as i32 - itv.begin as i32 + 1));
                let right = m.offset(d.step() * (itv.end as i32 - on as i32));
                for edge in [left, right] {
                    assert!(
                        !edge.is_ok() || board.piece_on(edge) == p.opponent(),
                        "run of {:?} through {} along {:?} is not maximal",
                        p,
                        m,
                        d
                    );
                }
            }
        }
    }
}

#[test]
fn test_zobrist_key_matches_full_hash() {
    let mut board = Board::new(Rule::Freestyle);
    let played = random_game(&mut board, 20, 17);
    let stones = played.iter().enumerate().map(|(i, &m)| {
        let piece = if i % 2 == 0 { Piece::Black } else { Piece::White };
        (piece, m)
    });
    assert_eq!(board.key(), zobrist().hash(stones));
}

#[test]
fn test_transposition_same_key() {
    let mut a = Board::new(Rule::Freestyle);
    play(&mut a, &[(7, 7), (7, 8), (8, 8), (6, 6)]);
    let mut b = Board::new(Rule::Freestyle);
    play(&mut b, &[(8, 8), (6, 6), (7, 7), (7, 8)]);
    assert_eq!(a.key(), b.key());
}

#[test]
fn test_key_after_predicts_do_move() {
    let mut board = Board::new(Rule::Standard);
    play(&mut board, &[(7, 7), (7, 8)]);
    let m = mv(8, 8);
    let predicted = board.key_after(m);
    board.do_move(m);
    assert_eq!(board.key(), predicted);
}

#[test]
fn test_undo_keeps_last_move_deltas() {
    let mut board = Board::new(Rule::Freestyle);
    play(&mut board, &[(7, 5), (0, 0), (7, 6), (0, 2), (7, 7)]);
    assert_eq!(board.query_inc(Piece::Black, Material::F3), 1);
    assert_eq!(board.threes_formed(Piece::Black), 1);

    board.do_move(mv(14, 14));
    board.undo_move();
    assert_eq!(board.query_inc(Piece::Black, Material::F3), 1, "deltas of the restored ply survive undo");
    assert_eq!(board.threes_formed(Piece::Black), 1);
}

#[test]
fn test_five_wins() {
    let mut board = Board::new(Rule::Freestyle);
    play(
        &mut board,
        &[(7, 3), (0, 0), (7, 4), (0, 2), (7, 5), (0, 4), (7, 6), (0, 6), (7, 7)],
    );
    assert_eq!(board.query(Piece::Black, Material::C5), 1);
    assert_eq!(board.check_wld_already(), Some(Wld::Win(Piece::Black)));
    assert_eq!(board.check_wld(), Some((Wld::Win(Piece::Black), 0)));
}

#[test]
fn test_overline_by_rule() {
    let moves = [
        (7, 2), (0, 0), (7, 3), (0, 2), (7, 4), (0, 4), (7, 6), (0, 6), (7, 7), (0, 8), (7, 5),
    ];
    let mut free = Board::new(Rule::Freestyle);
    play(&mut free, &moves);
    assert_eq!(free.check_wld_already(), Some(Wld::Win(Piece::Black)));

    let mut standard = Board::new(Rule::Standard);
    play(&mut standard, &moves);
    assert_eq!(standard.query(Piece::Black, Material::C6), 1);
    assert_eq!(standard.query(Piece::Black, Material::C5), 0, "six in a row is not a five");
    assert_eq!(standard.check_wld_already(), None);
}

#[test]
fn test_blocked_four_defence() {
    let mut board = Board::new(Rule::Freestyle);
    play(&mut board, &[(7, 3), (7, 2), (7, 4), (0, 0), (7, 5), (0, 2), (7, 6)]);
    assert_eq!(board.side_to_move(), Piece::White);
    assert_eq!(board.query(Piece::Black, Material::B4), 1);
    assert_eq!(board.defend_b4(), mv(7, 7));
    assert_eq!(board.check_wld(), None);

    // With the defence ignored, black completes the five next move
    board.do_move(mv(0, 4));
    assert_eq!(board.check_wld(), Some((Wld::Win(Piece::Black), 1)));
}

#[test]
fn test_open_four_is_decided() {
    let mut board = Board::new(Rule::Freestyle);
    play(&mut board, &[(7, 4), (0, 0), (7, 5), (0, 2), (7, 6), (0, 4), (7, 7)]);
    assert_eq!(board.query(Piece::Black, Material::F4), 1);
    assert_eq!(board.check_wld(), Some((Wld::Win(Piece::Black), 2)));
}

#[test]
fn test_open_three_tracking() {
    let mut board = Board::new(Rule::Freestyle);
    play(&mut board, &[(7, 5), (0, 0), (7, 6), (0, 2), (7, 7)]);
    assert_eq!(board.query(Piece::Black, Material::F3), 1);
    assert_eq!(board.threes_formed(Piece::Black), 1);

    let three = board.threes()[0];
    assert_eq!(three.owner, Piece::Black);
    assert!(three.is_valid());
    let fours: Vec<Move> = three.four_cells.iter().copied().filter(|m| !m.is_none()).collect();
    assert!(fours.contains(&mv(7, 4)) && fours.contains(&mv(7, 8)), "four cells {:?}", fours);
    assert!(three.defences.contains(&mv(7, 8)));

    // Black to move with an open three and no white four
    board.do_move(mv(0, 6));
    assert_eq!(board.check_wld(), Some((Wld::Win(Piece::Black), 3)));

    // Blocking one end breaks the open three
    board.undo_move();
    board.do_move(mv(7, 8));
    assert_eq!(board.query(Piece::Black, Material::F3), 0);
    assert!(board.threes().is_empty());
}

#[test]
fn test_renju_double_three_foul() {
    let moves = [(7, 5), (0, 0), (7, 6), (0, 2), (5, 7), (0, 4), (6, 7), (0, 6)];
    let mut board = Board::new(Rule::Renju);
    play(&mut board, &moves);
    assert_eq!(board.side_to_move(), Piece::Black);
    assert!(board.may_be_foul(mv(7, 7)));
    assert!(board.is_foul(mv(7, 7)), "two open threes at once");
    assert!(!board.is_foul(mv(7, 4)), "a single open three is fine");
    assert!(board.forbidden_moves().contains(&mv(7, 7)));

    let before = snapshot(&mut board);
    board.is_foul(mv(7, 7));
    assert!(before == snapshot(&mut board), "foul test must leave the board untouched");

    let mut free = Board::new(Rule::Freestyle);
    play(&mut free, &moves);
    assert!(!free.is_foul(mv(7, 7)));
}

#[test]
fn test_renju_foul_checked_for_white_to_move() {
    let moves = [(7, 5), (0, 0), (7, 6), (0, 2), (5, 7), (0, 4), (6, 7), (0, 6), (10, 10)];
    let mut board = Board::new(Rule::Renju);
    play(&mut board, &moves);
    assert_eq!(board.side_to_move(), Piece::White);
    assert!(board.is_foul(mv(7, 7)), "foul test always plays the stone as black");
    assert_eq!(board.side_to_move(), Piece::White);
}

#[test]
fn test_renju_overline_foul() {
    let moves = [(7, 2), (0, 0), (7, 3), (0, 2), (7, 4), (0, 4), (7, 6), (0, 6), (7, 7), (0, 8)];
    let mut board = Board::new(Rule::Renju);
    play(&mut board, &moves);
    assert!(board.is_foul(mv(7, 5)), "overline is forbidden for black");

    board.do_move(mv(7, 5));
    assert_eq!(board.check_wld_already(), Some(Wld::Win(Piece::White)));
}

#[test]
fn test_renju_five_is_never_foul() {
    let moves = [(7, 3), (0, 0), (7, 4), (0, 2), (7, 5), (0, 4), (7, 6), (0, 6)];
    let mut board = Board::new(Rule::Renju);
    play(&mut board, &moves);
    assert!(!board.is_foul(mv(7, 7)));
    assert!(!board.is_foul(mv(7, 2)));
}

#[test]
fn test_set_rule_replays_moves() {
    let moves = [(7, 7), (7, 8), (8, 8), (6, 6), (9, 9)];
    let mut switched = Board::new(Rule::Freestyle);
    play(&mut switched, &moves);
    switched.set_rule(Rule::Renju);

    let mut fresh = Board::new(Rule::Renju);
    play(&mut fresh, &moves);

    assert_eq!(switched.rule(), Rule::Renju);
    assert!(snapshot(&mut switched) == snapshot(&mut fresh));
}

#[test]
fn test_see_prefers_tactical_cells() {
    let mut board = Board::new(Rule::Freestyle);
    play(&mut board, &[(7, 3), (7, 2), (7, 4), (0, 0), (7, 5), (0, 14)]);
    // Black to move: turning the blocked three into a four outranks a quiet cell
    let four = board.see_of(mv(7, 6));
    assert!(four >= crate::eval::SEE_THRESHOLD, "see of the four cell is {}", four);
    assert!(four > board.see_of(mv(12, 12)));
}

#[test]
fn test_quiet_and_evaluate() {
    let mut board = Board::new(Rule::Freestyle);
    board.do_move(Move::center());
    assert!(board.is_quiet());
    assert!(board.evaluate() < 0, "white to move faces the centre stone");

    play(&mut board, &[(0, 0), (7, 6), (0, 2), (7, 5)]);
    assert!(!board.is_quiet(), "black holds an open three");
}

#[test]
fn test_display_shows_stones() {
    let mut board = Board::new(Rule::Freestyle);
    play(&mut board, &[(7, 7), (7, 8)]);
    let text = board.to_string();
    assert!(text.contains('X'));
    assert!(text.contains('O'));
    assert!(text.contains("2 moves"));
    assert!(text.contains("side to move BLACK"));
}
