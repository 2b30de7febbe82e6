//! Property tests: random action sequences against a round must keep the
//! board, used-set and cooldown ledger consistent.
//!
//! Run with: PROPTEST_CASES=10000 cargo test --release --test properties

#![allow(clippy::unwrap_used)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use bearfront::battle::{Adjudication, BattleResolver, OfflineOracle, Verdict};
use bearfront::board::{Faction, Side, Unit, ALL_FACTIONS};
use bearfront::config::GameConfig;
use bearfront::cooldown::CooldownLedger;
use bearfront::round::Round;

const BOARD: usize = 16;

#[derive(Debug, Clone)]
enum Action {
    Place { cell: usize, unit: usize },
    Battle { cell: usize, unit: usize, attacker_wins: bool },
    Advance { minutes: i64 },
    Purge,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => (0..BOARD + 2, 0usize..16).prop_map(|(cell, unit)| Action::Place { cell, unit }),
        3 => (0..BOARD, 0usize..16, any::<bool>())
            .prop_map(|(cell, unit, attacker_wins)| Action::Battle { cell, unit, attacker_wins }),
        1 => (1i64..180).prop_map(|minutes| Action::Advance { minutes }),
        1 => Just(Action::Purge),
    ]
}

fn roster() -> Vec<Unit> {
    ALL_FACTIONS
        .iter()
        .flat_map(|&f| (0..4).map(move |n| Unit::bare(format!("{}-{n}", f.name()), f)))
        .collect()
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn check_invariants(round: &Round) -> Result<(), TestCaseError> {
    prop_assert!(round.board.is_consistent());
    for cell in round.board.cells() {
        prop_assert_eq!(cell.is_empty(), cell.owning_faction().is_none());
        if let Some(unit) = cell.unit() {
            prop_assert!(round.used_units.contains(&unit.id), "{} on board but unused", unit.id);
        }
    }
    let ids: Vec<_> = round.cooldowns.entries().map(|e| e.unit).collect();
    let mut deduped = ids.clone();
    deduped.dedup();
    prop_assert_eq!(ids, deduped);
    prop_assert!(round.contests.is_empty());
    Ok(())
}

/// Applies `actions` to a fresh round, checking invariants after each step.
fn play(actions: &[Action]) -> Result<Round, TestCaseError> {
    let units = roster();
    let config = GameConfig {
        board_size: BOARD,
        rng_seed: 5,
        ..GameConfig::default()
    };
    let resolver = BattleResolver::new(OfflineOracle, &config);
    let mut now = t0();
    let mut round = Round::new(1, 0, now, Duration::days(30), BOARD);

    for action in actions {
        let before = round.clone();
        match action {
            Action::Place { cell, unit } => {
                if round.place(*cell, &units[*unit], now).is_err() {
                    prop_assert_eq!(&round, &before);
                }
            }
            Action::Battle { cell, unit, attacker_wins } => match round.open_challenge(*cell, &units[*unit], now) {
                Ok((attacker, defender)) => {
                    let verdict = Verdict {
                        winner: if *attacker_wins { Side::Attacker } else { Side::Defender },
                        adjudication: Adjudication::Oracle,
                    };
                    let record = resolver.conclude(&mut round.cooldowns, round.id, *cell, attacker, defender, verdict, now);
                    let changed = round.finish_challenge(&record, now);
                    prop_assert_eq!(changed, *attacker_wins);
                    prop_assert!(round.cooldowns.is_on_cooldown(&record.losing().unit.id, now));
                    let holder = round.board.cell(*cell).unwrap().unit().unwrap().id.clone();
                    prop_assert_eq!(&holder, &record.winning().unit.id);
                }
                Err(_) => {
                    prop_assert_eq!(&round, &before);
                }
            },
            Action::Advance { minutes } => now += Duration::minutes(*minutes),
            Action::Purge => {
                round.cooldowns.purge_expired(now);
            }
        }
        check_invariants(&round)?;
    }
    Ok(round)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn random_play_keeps_invariants(actions in prop::collection::vec(action(), 1..80)) {
        play(&actions)?;
    }

    #[test]
    fn tally_matches_occupied_cells(actions in prop::collection::vec(action(), 1..80)) {
        let round = play(&actions)?;
        let tally = round.board.count_by_faction();
        prop_assert_eq!(tally.total(), round.board.occupied());
        if let Some(leader) = tally.leader() {
            for faction in ALL_FACTIONS {
                prop_assert!(tally.get(faction) <= tally.get(leader));
                if tally.get(faction) == tally.get(leader) {
                    prop_assert!(leader <= faction, "tie must go to canonical order");
                }
            }
        } else {
            prop_assert_eq!(tally.total(), 0);
        }
    }

    #[test]
    fn committed_round_survives_serialization(actions in prop::collection::vec(action(), 1..80)) {
        let round = play(&actions)?;
        let json = serde_json::to_string(&round).unwrap();
        let back: Round = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(&back.board, &round.board);
        prop_assert_eq!(&back.used_units, &round.used_units);
        prop_assert_eq!(&back.cooldowns, &round.cooldowns);
        prop_assert_eq!(back, round);
    }

    #[test]
    fn purge_is_idempotent(
        expiries in prop::collection::vec((0usize..8, -600i64..600), 0..20),
        at in -600i64..600,
    ) {
        let mut ledger = CooldownLedger::new();
        for (unit, offset) in &expiries {
            ledger.set(format!("u{unit}").as_str().into(), t0() + Duration::seconds(*offset));
        }
        let now = t0() + Duration::seconds(at);
        let live_before: Vec<_> = ledger.live(now).cloned().collect();

        let mut once = ledger.clone();
        once.purge_expired(now);
        let mut twice = once.clone();
        prop_assert_eq!(twice.purge_expired(now), 0);
        prop_assert_eq!(&once, &twice);

        let live_after: Vec<_> = once.live(now).cloned().collect();
        prop_assert_eq!(live_before, live_after);
        prop_assert!(once.len() <= 8);
    }

    #[test]
    fn upsert_keeps_one_entry_per_unit(offsets in prop::collection::vec(1i64..10_000, 1..10)) {
        let mut ledger = CooldownLedger::new();
        for offset in &offsets {
            ledger.set("u".into(), t0() + Duration::seconds(*offset));
        }
        prop_assert_eq!(ledger.len(), 1);
        let last = *offsets.last().unwrap();
        prop_assert_eq!(ledger.remaining(&"u".into(), t0()), Some(Duration::seconds(last)));
    }
}

#[test]
fn faction_order_is_lexicographic() {
    let mut names: Vec<&str> = ALL_FACTIONS.iter().map(|f| f.name()).collect();
    names.sort_unstable();
    let canonical: Vec<&str> = ALL_FACTIONS.iter().map(|f| f.name()).collect();
    assert_eq!(names, canonical);
    assert!(Faction::Geo < Faction::Tech);
}
