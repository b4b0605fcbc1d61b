//! Protocol sessions driven through in-memory input and output

use std::io::Cursor;

use gomoku::{Engine, EngineConfig, Protocol, BOARD_SIDE};

fn small_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.engine.hash_size_mb = 1;
    config.search.max_depth = 4;
    config.search.message = false;
    config
}

/// Run `script` through a fresh engine and return the reply lines
fn session(script: &str) -> Vec<String> {
    let engine = Engine::new(&small_config());
    let mut protocol = Protocol::new(engine, Cursor::new(script.to_string()), Vec::new());
    protocol.run().expect("in-memory session never fails on I/O");
    let output = String::from_utf8(protocol.into_output()).expect("replies are UTF-8");
    output.lines().map(str::to_string).collect()
}

fn parse_reply(line: &str) -> (i64, i64) {
    let (r, f) = line.split_once(',').expect("reply is rank,file");
    (r.parse().expect("rank"), f.parse().expect("file"))
}

#[test]
fn test_start_then_begin_plays_centre() {
    let centre = BOARD_SIDE / 2;
    let replies = session(&format!("START {}\nBEGIN\nEND\n", BOARD_SIDE));
    assert_eq!(replies, vec!["OK".to_string(), format!("{},{}", centre, centre)]);
}

#[test]
fn test_unsupported_sizes() {
    let replies = session("START 19\nRECTSTART 15,20\nSTART\n");
    assert_eq!(replies.len(), 3);
    assert!(replies.iter().all(|r| r == "ERROR unsupported size"), "{:?}", replies);
}

#[test]
fn test_invalid_moves_keep_session_alive() {
    let replies = session(&format!(
        "START {}\nTURN 99,99\nTURN x,y\nBEGIN\nTURN 7,7\nABOUT\n",
        BOARD_SIDE
    ));
    assert_eq!(replies[0], "OK");
    assert_eq!(replies[1], "ERROR invalid move");
    assert_eq!(replies[2], "ERROR invalid move");
    // BEGIN took the centre, so the opponent cannot play there
    assert_eq!(parse_reply(&replies[3]), (7, 7));
    assert_eq!(replies[4], "ERROR invalid move", "occupied cell");
    assert!(replies[5].starts_with("name=\""), "session goes on after errors");
}

#[test]
fn test_turn_gets_an_empty_cell() {
    let replies = session(&format!("START {}\nTURN 7,7\nEND\nTURN 8,8\n", BOARD_SIDE));
    assert_eq!(replies.len(), 2, "nothing after END: {:?}", replies);
    let reply = parse_reply(&replies[1]);
    assert_ne!(reply, (7, 7));
    assert!(reply.0 >= 0 && reply.0 < BOARD_SIDE as i64);
    assert!(reply.1 >= 0 && reply.1 < BOARD_SIDE as i64);
}

#[test]
fn test_board_completes_five() {
    let script = format!(
        "START {}\nBOARD\n7,3,1\n0,0,2\n7,4,1\n0,2,2\n7,5,1\n0,4,2\n7,6,1\n7,2,2\nDONE\n",
        BOARD_SIDE
    );
    let replies = session(&script);
    assert_eq!(replies, vec!["OK".to_string(), "7,7".to_string()]);
}

#[test]
fn test_yxboard_does_not_think() {
    let script = format!("START {}\nYXBOARD\n7,7,1\n7,8,2\nDONE\nTAKEBACK\nTURN 7,8\n", BOARD_SIDE);
    let replies = session(&script);
    assert_eq!(replies[0], "OK");
    assert_eq!(replies[1], "OK", "only TAKEBACK answers before the next move");
    assert_eq!(replies.len(), 3);
    let reply = parse_reply(&replies[2]);
    assert_ne!(reply, (7, 7));
    assert_ne!(reply, (7, 8));
}

#[test]
fn test_board_rejects_bad_lines() {
    let replies = session(&format!("START {}\nBOARD\n7,7,1\nnonsense\nDONE\nRESTART\nBEGIN\n", BOARD_SIDE));
    assert_eq!(replies[1], "ERROR invalid move");
    assert_eq!(replies[2], "OK");
    assert_eq!(parse_reply(&replies[3]), (7, 7), "board stayed empty");
}

#[test]
fn test_renju_forbidden_points() {
    let script = format!(
        "START {}\nYXSHOWFORBID\nINFO rule 4\nYXBOARD\n7,5,1\n0,0,2\n7,6,1\n0,2,2\n5,7,1\n0,4,2\n6,7,1\n0,14,2\nDONE\nYXSHOWFORBID\n",
        BOARD_SIDE
    );
    let replies = session(&script);
    assert_eq!(replies.len(), 2, "no FORBID line under freestyle: {:?}", replies);
    assert!(replies[1].starts_with("FORBID "), "{}", replies[1]);
    assert!(replies[1].ends_with('.'));
    assert!(replies[1].contains("0707"), "double three at 7,7: {}", replies[1]);
}

#[test]
fn test_info_and_yixin_commands() {
    let replies = session(&format!(
        "START {}\nINFO timeout_turn 1000\nINFO thread_num 2\nINFO rule 3\nINFO hash_size\nYXHASHCLEAR\nYXSHOWINFO\n",
        BOARD_SIDE
    ));
    assert_eq!(replies[0], "OK");
    assert_eq!(replies[1], "ERROR unsupported rule for this board size");
    assert!(replies[2].starts_with("ERROR malformed command"), "{}", replies[2]);
    assert_eq!(replies[3], "MESSAGE INFO MAX_HASH_SIZE 24");
    assert_eq!(replies[4], "MESSAGE INFO MAX_THREAD_NUM 32");
    assert_eq!(replies.len(), 5);
}

#[test]
fn test_unknown_command() {
    let replies = session("FROBNICATE 1\n");
    assert_eq!(replies, vec!["UNKNOWN command FROBNICATE".to_string()]);
}

#[test]
fn test_commands_are_case_insensitive() {
    let replies = session(&format!("start {}\nbegin\nend\n", BOARD_SIDE));
    assert_eq!(replies[0], "OK");
    assert_eq!(parse_reply(&replies[1]), (7, 7));
}
