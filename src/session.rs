//! Line protocol session.
//!
//! Holds the acting account and dispatches parsed commands to the round
//! manager, writing one `ok ...` header (plus any detail lines) or one
//! `error <kind> <message>` line per command.

use std::io::{self, Write};
use std::sync::Arc;

use tracing::debug;

use crate::battle::DecisionOracle;
use crate::board::{CellIndex, Faction, Unit, UnitId};
use crate::catalog::UnitCatalog;
use crate::error::GameError;
use crate::history::Leaderboard;
use crate::manager::RoundManager;
use crate::protocol::{format_board, parse_command, Command};
use crate::round::RoundStatus;

/// Number of units listed by `leaderboard`.
const LEADERBOARD_UNITS: usize = 10;

/// One connected participant.
pub struct Session<O> {
    manager: Arc<RoundManager<O>>,
    catalog: Arc<dyn UnitCatalog>,
    account: Option<String>,
}

impl<O: DecisionOracle + 'static> Session<O> {
    pub fn new(manager: Arc<RoundManager<O>>, catalog: Arc<dyn UnitCatalog>, account: Option<String>) -> Self {
        Session {
            manager,
            catalog,
            account,
        }
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Parses and executes one input line. Returns `false` once the session
    /// should end.
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<bool> {
        match parse_command(line) {
            Ok(Some(command)) => self.execute(command, out).await,
            Ok(None) => Ok(true),
            Err(e) => {
                write_error(out, e.kind(), &e)?;
                Ok(true)
            }
        }
    }

    /// Executes one command. Returns `false` for `quit`.
    pub async fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> io::Result<bool> {
        debug!(?command, account = self.account.as_deref().unwrap_or("-"), "command");
        match command {
            Command::IsReady => writeln!(out, "readyok")?,
            Command::Account { id } => self.handle_account(id, out)?,
            Command::Units => self.handle_units(out)?,
            Command::Place { cell, unit } => self.handle_place(cell, &unit, out)?,
            Command::Challenge { cell, unit } => self.handle_challenge(cell, &unit, out).await?,
            Command::Board => self.handle_board(out)?,
            Command::Tally => self.handle_tally(out)?,
            Command::Round => self.handle_round(out)?,
            Command::Expire => self.handle_expire(out)?,
            Command::History => self.handle_history(out)?,
            Command::Leaderboard => self.handle_leaderboard(out)?,
            Command::Quit => return Ok(false),
        }
        out.flush()?;
        Ok(true)
    }

    fn handle_account<W: Write>(&mut self, id: String, out: &mut W) -> io::Result<()> {
        let owned = self.catalog.owned_units(&id).len();
        writeln!(out, "ok account {} owns {}", id, owned)?;
        self.account = Some(id);
        Ok(())
    }

    fn handle_units<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Some(account) = self.account.as_deref() else {
            return write_error(out, "no_account", "select an account with 'account <id>'");
        };
        match self.manager.available_units(self.catalog.as_ref(), account) {
            Ok(units) => {
                writeln!(out, "ok units {}", units.len())?;
                for unit in &units {
                    writeln!(out, "unit {} {} {}", unit.id, unit.faction, unit.display_name)?;
                }
                Ok(())
            }
            Err(e) => write_game_error(out, &e),
        }
    }

    fn handle_place<W: Write>(&self, cell: CellIndex, id: &UnitId, out: &mut W) -> io::Result<()> {
        let unit = match self.owned_unit(id) {
            Ok(unit) => unit,
            Err(e) => return write_game_error(out, &e),
        };
        match self.manager.place(cell, &unit) {
            Ok(round) => writeln!(
                out,
                "ok placed {} {} {} revision {}",
                cell, unit.id, unit.faction, round.revision
            ),
            Err(e) => write_game_error(out, &e),
        }
    }

    async fn handle_challenge<W: Write>(&self, cell: CellIndex, id: &UnitId, out: &mut W) -> io::Result<()> {
        let unit = match self.owned_unit(id) {
            Ok(unit) => unit,
            Err(e) => return write_game_error(out, &e),
        };
        match self.manager.challenge(cell, &unit).await {
            Ok(outcome) => {
                let record = &outcome.record;
                writeln!(
                    out,
                    "ok battle {} winner {} {} adjudication {} board {}",
                    cell,
                    record.winner.name(),
                    record.winning().unit.id,
                    record.adjudication.name(),
                    if outcome.board_changed { "changed" } else { "unchanged" }
                )
            }
            Err(e) => write_game_error(out, &e),
        }
    }

    fn handle_board<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.manager.current_round() {
            Ok(round) => {
                writeln!(out, "ok board round {} revision {}", round.id, round.revision)?;
                writeln!(out, "{}", format_board(&round.board))
            }
            Err(e) => write_game_error(out, &e),
        }
    }

    fn handle_tally<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.manager.current_round() {
            Ok(round) => {
                let tally = round.board.count_by_faction();
                write!(out, "ok tally")?;
                for (faction, count) in tally.iter() {
                    write!(out, " {} {}", faction, count)?;
                }
                writeln!(out, " leader {}", faction_or_none(tally.leader()))
            }
            Err(e) => write_game_error(out, &e),
        }
    }

    fn handle_round<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.manager.current_round() {
            Ok(round) => {
                let now = self.manager.now();
                let status = match round.status(now) {
                    RoundStatus::Active => "active",
                    RoundStatus::Expired => "expired",
                };
                writeln!(
                    out,
                    "ok round {} revision {} status {} ends_at {} used {} cooldowns {} contested {}",
                    round.id,
                    round.revision,
                    status,
                    round.ends_at.to_rfc3339(),
                    round.used_units.len(),
                    round.cooldowns.live(now).count(),
                    round.contests.len()
                )
            }
            Err(e) => write_game_error(out, &e),
        }
    }

    fn handle_expire<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.manager.evaluate_expiry() {
            Ok(Some(settlement)) => writeln!(
                out,
                "ok settled {} winner {} cells {} next {}",
                settlement.round_id,
                faction_or_none(settlement.winner),
                settlement.tally.total(),
                settlement.round_id + 1
            ),
            Ok(None) => match self.manager.current_round() {
                Ok(round) if round.is_active(self.manager.now()) => writeln!(out, "ok active {}", round.id),
                Ok(round) => writeln!(out, "ok deferred {} contested {}", round.id, round.contests.len()),
                Err(e) => write_game_error(out, &e),
            },
            Err(e) => write_game_error(out, &e),
        }
    }

    fn handle_history<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let battles = match self.manager.battles() {
            Ok(battles) => battles,
            Err(e) => return write_game_error(out, &e),
        };
        let settlements = match self.manager.settlements() {
            Ok(settlements) => settlements,
            Err(e) => return write_game_error(out, &e),
        };
        writeln!(out, "ok history battles {} settlements {}", battles.len(), settlements.len())?;
        for b in &battles {
            writeln!(
                out,
                "battle {} {} {}:{} vs {}:{} winner {} {} {}",
                b.round_id,
                b.cell,
                b.attacker.faction.notation_char(),
                b.attacker.unit.id,
                b.defender.faction.notation_char(),
                b.defender.unit.id,
                b.winner.name(),
                b.adjudication.name(),
                b.timestamp.to_rfc3339()
            )?;
        }
        for s in &settlements {
            writeln!(
                out,
                "settlement {} winner {} cells {} at {}",
                s.round_id,
                faction_or_none(s.winner),
                s.tally.total(),
                s.settled_at.to_rfc3339()
            )?;
        }
        Ok(())
    }

    fn handle_leaderboard<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let battles = match self.manager.battles() {
            Ok(battles) => battles,
            Err(e) => return write_game_error(out, &e),
        };
        let board = Leaderboard::from_records(&battles);
        writeln!(
            out,
            "ok leaderboard battles {} fallback {}",
            board.total_battles, board.fallback_battles
        )?;
        for (faction, standing) in board.faction_ranking() {
            writeln!(out, "faction {} wins {} losses {}", faction, standing.wins, standing.losses)?;
        }
        for (unit, standing) in board.top_units(LEADERBOARD_UNITS) {
            writeln!(out, "unit {} wins {} losses {}", unit, standing.wins, standing.losses)?;
        }
        Ok(())
    }

    /// Looks `id` up in the catalog, requiring the acting account to own it
    /// when an account is selected.
    fn owned_unit(&self, id: &UnitId) -> Result<Unit, GameError> {
        if let Some(account) = self.account.as_deref() {
            if !self.catalog.owned_units(account).contains(id) {
                return Err(GameError::UnknownUnit(id.clone()));
            }
        }
        self.catalog
            .unit(id)
            .ok_or_else(|| GameError::UnknownUnit(id.clone()))
    }
}

fn faction_or_none(faction: Option<Faction>) -> &'static str {
    faction.map(Faction::name).unwrap_or("none")
}

fn write_game_error<W: Write>(out: &mut W, error: &GameError) -> io::Result<()> {
    write_error(out, error.kind(), error)
}

fn write_error<W: Write>(out: &mut W, kind: &str, message: impl std::fmt::Display) -> io::Result<()> {
    writeln!(out, "error {} {}", kind, message)
}
