//! Integration tests for the bearfront binary.
//!
//! Tests full line-protocol sessions by spawning the server process,
//! sending commands via stdin, and verifying stdout responses.

use std::io::{BufRead, Write};
use std::path::Path;
use std::process::{Command, Stdio};

/// Sends a sequence of commands to the server and collects stdout lines.
fn run_server(args: &[&str], commands: &[&str]) -> Vec<String> {
    let exe = env!("CARGO_BIN_EXE_bearfront");
    let mut child = Command::new(exe)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start bearfront");

    let mut stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    let reader = std::io::BufReader::new(stdout);

    for cmd in commands {
        writeln!(stdin, "{}", cmd).unwrap();
    }
    stdin.flush().unwrap();
    drop(stdin);

    let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
    let status = child.wait().expect("failed to wait on child");
    assert!(status.success());
    lines
}

fn run(commands: &[&str]) -> Vec<String> {
    run_server(&[], commands)
}

#[test]
fn isready_response() {
    let lines = run(&["isready", "quit"]);
    assert_eq!(lines, vec!["readyok"]);
}

#[test]
fn unknown_commands_report_an_error() {
    let lines = run(&["dance", "isready", "quit"]);
    assert_eq!(lines[0], "error unknown_command unknown command: 'dance'");
    assert_eq!(lines[1], "readyok");
}

#[test]
fn comments_and_blank_lines_are_ignored() {
    let lines = run(&["# setup", "", "isready"]);
    assert_eq!(lines, vec!["readyok"]);
}

#[test]
fn session_ends_at_eof_without_quit() {
    let lines = run(&["isready"]);
    assert_eq!(lines, vec!["readyok"]);
}

#[test]
fn fresh_board_is_empty() {
    let lines = run(&["board", "quit"]);
    assert_eq!(lines[0], "ok board round 1 revision 0");
    assert_eq!(lines.len(), 9, "64 cells print as 8 rows");
    assert!(lines[1..].iter().all(|row| row == ". . . . . . . ."));
}

#[test]
fn place_and_tally() {
    let lines = run(&["account iron-player", "place 5 iron-1", "tally", "board", "quit"]);
    assert_eq!(lines[0], "ok account iron-player owns 4");
    assert_eq!(lines[1], "ok placed 5 iron-1 iron revision 1");
    assert_eq!(lines[2], "ok tally geo 0 iron 1 paper 0 tech 0 leader iron");
    assert_eq!(lines[3], "ok board round 1 revision 1");
    assert_eq!(lines[4], ". . . . . I:iron-1 . .");
}

#[test]
fn placed_unit_disappears_from_units() {
    let lines = run(&["account geo-player", "units", "place 0 geo-1", "units", "quit"]);
    assert_eq!(lines[1], "ok units 4");
    let second = lines.iter().position(|l| l == "ok units 3");
    assert!(second.is_some(), "used unit should leave the selection: {:?}", lines);
    assert!(!lines.iter().skip(second.unwrap()).any(|l| l.starts_with("unit geo-1 ")));
}

#[test]
fn rejected_place_reports_exact_kind() {
    let lines = run(&[
        "account iron-player",
        "place 5 iron-1",
        "place 6 iron-1",
        "place 5 iron-2",
        "account geo-player",
        "place 5 geo-1",
        "challenge 7 geo-2",
        "quit",
    ]);
    assert!(lines[2].starts_with("error unit_already_used "), "{}", lines[2]);
    assert!(lines[3].starts_with("error cell_owned_by_same_faction "), "{}", lines[3]);
    assert!(lines[5].starts_with("error cell_occupied "), "{}", lines[5]);
    assert!(lines[6].starts_with("error cell_empty "), "{}", lines[6]);
}

#[test]
fn attacker_oracle_takes_the_cell() {
    let lines = run_server(
        &["--oracle", "attacker"],
        &[
            "account iron-player",
            "place 5 iron-1",
            "account geo-player",
            "challenge 5 geo-2",
            "tally",
            "history",
            "quit",
        ],
    );
    assert_eq!(lines[3], "ok battle 5 winner attacker geo-2 adjudication oracle board changed");
    assert_eq!(lines[4], "ok tally geo 1 iron 0 paper 0 tech 0 leader geo");
    assert_eq!(lines[5], "ok history battles 1 settlements 0");
    assert!(lines[6].starts_with("battle 1 5 G:geo-2 vs I:iron-1 winner attacker oracle "));
}

#[test]
fn offline_oracle_falls_back_to_coin_flip() {
    let lines = run(&[
        "account tech-player",
        "place 2 tech-1",
        "account paper-player",
        "challenge 2 paper-1",
        "leaderboard",
        "quit",
    ]);
    assert!(lines[3].starts_with("ok battle 2 winner "), "{}", lines[3]);
    assert!(lines[3].contains(" adjudication fallback "), "{}", lines[3]);
    assert_eq!(lines[4], "ok leaderboard battles 1 fallback 1");
}

#[test]
fn loser_goes_on_cooldown() {
    let lines = run_server(
        &["--oracle", "defender"],
        &[
            "account tech-player",
            "place 2 tech-1",
            "account paper-player",
            "challenge 2 paper-1",
            "challenge 2 paper-1",
            "quit",
        ],
    );
    assert_eq!(lines[3], "ok battle 2 winner defender tech-1 adjudication oracle board unchanged");
    assert!(lines[4].starts_with("error unit_on_cooldown "), "{}", lines[4]);
}

#[test]
fn state_persists_across_runs_with_store_dir() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().to_str().unwrap();

    let first = run_server(&["--store-dir", store, "--account", "paper-player"], &["place 9 paper-3", "quit"]);
    assert_eq!(first[0], "ok placed 9 paper-3 paper revision 1");
    assert!(Path::new(store).join("round.json").exists());

    let second = run_server(
        &["--store-dir", store, "--account", "paper-player"],
        &["place 10 paper-3", "tally", "quit"],
    );
    assert!(second[0].starts_with("error unit_already_used "), "{}", second[0]);
    assert_eq!(second[1], "ok tally geo 0 iron 0 paper 1 tech 0 leader paper");
}

#[test]
fn config_file_sets_board_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.toml");
    std::fs::write(&path, "board_size = 9\n").unwrap();
    let lines = run_server(&["--config", path.to_str().unwrap()], &["board", "quit"]);
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], ". . .");
}

#[test]
fn round_reports_status() {
    let lines = run(&["round", "expire", "quit"]);
    assert!(lines[0].starts_with("ok round 1 revision 0 status active ends_at "), "{}", lines[0]);
    assert!(lines[0].ends_with(" used 0 cooldowns 0 contested 0"), "{}", lines[0]);
    assert_eq!(lines[1], "ok active 1");
}
