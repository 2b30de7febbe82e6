use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use bearfront::battle::FixedOracle;
use bearfront::board::{Board, Faction, Side, Unit, ALL_FACTIONS};
use bearfront::clock::ManualClock;
use bearfront::config::GameConfig;
use bearfront::protocol::{format_board, parse_board};
use bearfront::store::MemoryStore;
use bearfront::sync::NullSink;
use bearfront::RoundManager;

/// A full 64-cell board with factions striped across it.
fn full_board() -> Board {
    let mut board = Board::empty(64);
    for i in 0..64 {
        let faction = ALL_FACTIONS[i % ALL_FACTIONS.len()];
        board
            .place_unit(i, &Unit::bare(format!("u{i}"), faction), faction)
            .unwrap();
    }
    board
}

fn manager() -> Arc<RoundManager<FixedOracle>> {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    Arc::new(RoundManager::new(
        GameConfig::default(),
        FixedOracle(Side::Attacker),
        Arc::new(MemoryStore::new()),
        Arc::new(NullSink),
        clock,
    ))
}

fn bench_tally(c: &mut Criterion) {
    let board = full_board();
    c.bench_function("count_by_faction_64", |b| b.iter(|| black_box(&board).count_by_faction()));
}

fn bench_notation(c: &mut Criterion) {
    let board = full_board();
    let text = format_board(&board);
    c.bench_function("format_board_64", |b| b.iter(|| format_board(black_box(&board))));
    c.bench_function("parse_board_64", |b| b.iter(|| parse_board(black_box(&text)).unwrap()));
}

fn bench_place(c: &mut Criterion) {
    c.bench_function("place_fill_board", |b| {
        b.iter(|| {
            let m = manager();
            for i in 0..64 {
                let faction = ALL_FACTIONS[i % ALL_FACTIONS.len()];
                m.place(i, &Unit::bare(format!("u{i}"), faction)).unwrap();
            }
        })
    });
}

fn bench_challenge(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    c.bench_function("challenge_chain_16", |b| {
        b.iter(|| {
            let m = manager();
            m.place(0, &Unit::bare("seed", Faction::Iron)).unwrap();
            runtime.block_on(async {
                for i in 0..16 {
                    let faction = if i % 2 == 0 { Faction::Geo } else { Faction::Iron };
                    m.challenge(0, &Unit::bare(format!("a{i}"), faction)).await.unwrap();
                }
            });
        })
    });
}

criterion_group!(benches, bench_tally, bench_notation, bench_place, bench_challenge);
criterion_main!(benches);
