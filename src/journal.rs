//! Write-ahead journal with BEGIN/MANIFEST/METADATA/COMMIT framing and
//! crash recovery (spec §4.4).
//!
//! The journal is a single append-only text file. Every write is
//! flushed and fsynced before the caller proceeds to the next step of
//! the backup transaction, so a transaction is only ever observed in
//! one of two states after a crash: no `BEGIN` line at all, or a
//! `BEGIN` with no matching `COMMIT` (incomplete — rolled back by
//! [`recover`]).

use crate::manifest::ManifestStore;
use crate::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// One parsed line of the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Begin(String),
    Manifest(String),
    Metadata {
        sid: String,
        merkle_root: String,
        prev_root: String,
        ts: String,
        label: String,
    },
    Commit(String),
}

impl Line {
    fn parse(raw: &str) -> Result<Self> {
        let (tag, rest) = raw.split_once(':').ok_or_else(|| Error::JournalCorrupted {
            reason: format!("line has no ':' tag: {raw:?}"),
        })?;
        match tag {
            "BEGIN" => Ok(Line::Begin(rest.to_string())),
            "MANIFEST" => Ok(Line::Manifest(rest.to_string())),
            "COMMIT" => Ok(Line::Commit(rest.to_string())),
            "METADATA" => {
                let parts: Vec<&str> = rest.splitn(5, ':').collect();
                if parts.len() != 5 {
                    return Err(Error::JournalCorrupted {
                        reason: format!("METADATA line has {} fields, want 5: {raw:?}", parts.len()),
                    });
                }
                Ok(Line::Metadata {
                    sid: parts[0].to_string(),
                    merkle_root: parts[1].to_string(),
                    prev_root: parts[2].to_string(),
                    ts: parts[3].to_string(),
                    label: parts[4].to_string(),
                })
            }
            other => Err(Error::JournalCorrupted {
                reason: format!("unknown journal tag {other:?}"),
            }),
        }
    }

    fn render(&self) -> String {
        match self {
            Line::Begin(sid) => format!("BEGIN:{sid}"),
            Line::Manifest(hash) => format!("MANIFEST:{hash}"),
            Line::Commit(sid) => format!("COMMIT:{sid}"),
            Line::Metadata {
                sid,
                merkle_root,
                prev_root,
                ts,
                label,
            } => format!("METADATA:{sid}:{merkle_root}:{prev_root}:{ts}:{label}"),
        }
    }

    fn sid(&self) -> Option<&str> {
        match self {
            Line::Begin(s) | Line::Commit(s) => Some(s),
            Line::Metadata { sid, .. } => Some(sid),
            Line::Manifest(_) => None,
        }
    }
}

/// Handle onto `<store>/wal.log`.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn open<P: AsRef<Path>>(store_root: P) -> Result<Self> {
        let path = store_root.as_ref().join("wal.log");
        if !path.exists() {
            File::create(&path)?.sync_all()?;
        }
        Ok(Self { path })
    }

    fn append_line(&self, line: &Line) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", line.render())?;
        file.sync_all()?;
        Ok(())
    }

    pub fn begin(&self, sid: &str) -> Result<()> {
        self.append_line(&Line::Begin(sid.to_string()))
    }

    pub fn manifest(&self, manifest_hash: &str) -> Result<()> {
        self.append_line(&Line::Manifest(manifest_hash.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn metadata(
        &self,
        sid: &str,
        merkle_root: &str,
        prev_root: &str,
        ts: &str,
        label: &str,
    ) -> Result<()> {
        self.append_line(&Line::Metadata {
            sid: sid.to_string(),
            merkle_root: merkle_root.to_string(),
            prev_root: prev_root.to_string(),
            ts: ts.to_string(),
            label: label.to_string(),
        })
    }

    pub fn commit(&self, sid: &str) -> Result<()> {
        self.append_line(&Line::Commit(sid.to_string()))
    }

    fn read_lines(&self) -> Result<Vec<Line>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut lines = Vec::new();
        for raw in reader.lines() {
            let raw = raw?;
            if raw.is_empty() {
                continue;
            }
            lines.push(Line::parse(&raw)?);
        }
        Ok(lines)
    }

    /// Atomically rewrite the journal to contain only `lines`, via
    /// temp-file + rename (same durability contract as every other
    /// on-disk artifact in the store).
    fn rewrite(&self, lines: &[Line]) -> Result<()> {
        let tmp_path = self.path.with_extension("log.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for line in lines {
                writeln!(tmp, "{}", line.render())?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Ids of snapshot transactions that were rolled back during recovery,
/// returned so the caller can log what happened.
pub struct RecoveryReport {
    pub rolled_back: Vec<String>,
}

/// Replay the journal and roll back any transaction that has a `BEGIN`
/// without a later `COMMIT` (spec §4.4). Removes the transaction's
/// manifest file and ledger record (defensively — normal ordering never
/// lets a ledger record exist without a `COMMIT`) but never deletes
/// chunk files, since they're content-addressed and may be shared.
/// Idempotent: running it twice leaves the store unchanged after the
/// first run.
pub fn recover(
    journal: &Journal,
    manifests: &ManifestStore,
    ledger: &mut crate::ledger::Ledger,
) -> Result<RecoveryReport> {
    let lines = journal.read_lines()?;

    let mut committed = std::collections::HashSet::new();
    let mut began = std::collections::HashSet::new();
    for line in &lines {
        match line {
            Line::Begin(sid) => {
                began.insert(sid.clone());
            }
            Line::Commit(sid) => {
                committed.insert(sid.clone());
            }
            _ => {}
        }
    }

    let incomplete: Vec<String> = began.difference(&committed).cloned().collect();

    for sid in &incomplete {
        if ledger.contains(sid) {
            ledger.remove(sid)?;
        }
        manifests.remove(sid)?;
    }

    let retained: Vec<Line> = lines
        .into_iter()
        .filter(|line| match line.sid() {
            Some(sid) => committed.contains(sid),
            None => true,
        })
        .collect();
    journal.rewrite(&retained)?;

    Ok(RecoveryReport {
        rolled_back: incomplete,
    })
}
