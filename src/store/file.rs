//! Directory-backed JSON store.
//!
//! Layout:
//! - `round.json`: the current round snapshot plus the log entries of the
//!   commit that produced it, replaced via temp file + rename
//! - `battles.jsonl`: one battle record per line, keyed by revision
//! - `settlements.jsonl`: one settlement per line, keyed by revision
//!
//! The rename of `round.json` is the commit point. Log lines are appended
//! afterwards and skipped when the log already holds the snapshot's
//! revision, so a commit whose appends were cut short is completed by the
//! next commit or log read.
//!
//! Compare-and-swap is serialized within the process by a mutex; sharing a
//! directory between processes needs external locking.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{check_revision, Commit, RoundStore, StoreError};
use crate::battle::BattleRecord;
use crate::round::{Round, Settlement};

const ROUND_FILE: &str = "round.json";
const BATTLES_FILE: &str = "battles.jsonl";
const SETTLEMENTS_FILE: &str = "settlements.jsonl";

/// Contents of `round.json`.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    round: Round,
    #[serde(default)]
    battle: Option<BattleRecord>,
    #[serde(default)]
    settlement: Option<Settlement>,
}

/// One log line: the entry and the revision of the commit that wrote it.
#[derive(Debug, Serialize, Deserialize)]
struct LogLine<T> {
    revision: u64,
    entry: T,
}

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStore { dir, lock: Mutex::new(()) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_snapshot(&self) -> Result<Option<Snapshot>, StoreError> {
        match fs::read(self.dir.join(ROUND_FILE)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let tmp = self.dir.join(format!("{ROUND_FILE}.tmp"));
        let mut file = File::create(&tmp)?;
        serde_json::to_writer_pretty(&mut file, snapshot)?;
        file.sync_all()?;
        fs::rename(&tmp, self.dir.join(ROUND_FILE))?;
        Ok(())
    }

    /// Appends the snapshot's log entries that are not on disk yet.
    fn flush(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let revision = snapshot.round.revision;
        if let Some(record) = &snapshot.battle {
            self.append_once(BATTLES_FILE, revision, record)?;
        }
        if let Some(settlement) = &snapshot.settlement {
            self.append_once(SETTLEMENTS_FILE, revision, settlement)?;
        }
        Ok(())
    }

    fn append_once<T: Serialize>(&self, name: &str, revision: u64, entry: &T) -> Result<(), StoreError> {
        if self.last_revision(name)?.is_some_and(|last| last >= revision) {
            return Ok(());
        }
        let mut line = serde_json::to_vec(&LogLine { revision, entry })?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(name))?;
        file.write_all(&line)?;
        Ok(())
    }

    fn last_revision(&self, name: &str) -> Result<Option<u64>, StoreError> {
        let lines: Vec<LogLine<IgnoredAny>> = self.read_lines(name)?;
        Ok(lines.last().map(|l| l.revision))
    }

    fn read_lines<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        let file = match File::open(self.dir.join(name)) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }

    /// Reads a log after completing any appends the last commit left behind.
    fn read_log<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        if let Some(snapshot) = self.read_snapshot()? {
            self.flush(&snapshot)?;
        }
        let lines: Vec<LogLine<T>> = self.read_lines(name)?;
        Ok(lines.into_iter().map(|l| l.entry).collect())
    }
}

impl RoundStore for FileStore {
    fn load(&self) -> Result<Option<Round>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_snapshot()?.map(|s| s.round))
    }

    fn commit(&self, commit: Commit<'_>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.read_snapshot()?;
        check_revision(commit.expected, current.as_ref().map(|s| &s.round))?;
        if let Some(previous) = &current {
            self.flush(previous)?;
        }
        let snapshot = Snapshot {
            round: commit.round.clone(),
            battle: commit.battle.cloned(),
            settlement: commit.settlement.cloned(),
        };
        self.write_snapshot(&snapshot)?;
        // Committed. A failed append is retried by the next commit or read.
        if let Err(error) = self.flush(&snapshot) {
            warn!(%error, revision = snapshot.round.revision, "log append deferred");
        }
        Ok(())
    }

    fn battles(&self) -> Result<Vec<BattleRecord>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_log(BATTLES_FILE)
    }

    fn settlements(&self) -> Result<Vec<Settlement>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_log(SETTLEMENTS_FILE)
    }
}
