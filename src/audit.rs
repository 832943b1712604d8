//! Append-only, hash-chained audit trail of every command invocation
//! (spec §4.7).
//!
//! One line per entry: `ENTRY_HASH PREV_HASH UNIX_MS USER COMMAND
//! ARGS_SHA256 STATUS [ERROR_MSG]`. `ENTRY_HASH` covers the first six
//! tokens only — the trailing error message is advisory text, not part
//! of the chain.

use crate::hash;
use crate::{Error, Result};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Outcome of a command invocation, as recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Deny,
    Fail,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Ok => "OK",
            Status::Deny => "DENY",
            Status::Fail => "FAIL",
        })
    }
}

impl std::str::FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OK" => Ok(Status::Ok),
            "DENY" => Ok(Status::Deny),
            "FAIL" => Ok(Status::Fail),
            other => Err(Error::JournalCorrupted {
                reason: format!("unknown audit status {other:?}"),
            }),
        }
    }
}

/// SHA-256 of the argument vector, canonicalized by joining with a
/// single ASCII space (spec §4.7 / §9 — ambiguous for arguments that
/// themselves contain whitespace, a limitation the spec calls out and
/// leaves to the implementer; we keep the documented contract as-is).
pub fn args_digest(args: &[String]) -> String {
    hash::digest(args.join(" ").as_bytes())
}

fn entry_hash(prev_hash: &str, unix_ms: u128, user: &str, command: &str, args_sha256: &str, status: Status) -> String {
    let preimage = format!("{prev_hash} {unix_ms} {user} {command} {args_sha256} {status}");
    hash::digest(preimage.as_bytes())
}

/// Append-only handle onto `<store>/audit.log`.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn open<P: AsRef<Path>>(store_root: P) -> Result<Self> {
        let path = store_root.as_ref().join("audit.log");
        if !path.exists() {
            File::create(&path)?.sync_all()?;
        }
        Ok(Self { path })
    }

    /// The previous entry's `ENTRY_HASH`, or [`hash::ZERO`] if the log
    /// is empty.
    fn last_hash(&self) -> Result<String> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut last = hash::ZERO.to_string();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let entry_hash = line
                .split_whitespace()
                .next()
                .ok_or_else(|| Error::AuditCorrupted { line: 0 })?;
            last = entry_hash.to_string();
        }
        Ok(last)
    }

    /// Append one entry and return its `ENTRY_HASH`.
    pub fn append(
        &self,
        unix_ms: u128,
        user: &str,
        command: &str,
        args: &[String],
        status: Status,
        error_msg: Option<&str>,
    ) -> Result<String> {
        let prev_hash = self.last_hash()?;
        let args_sha256 = args_digest(args);
        let hash = entry_hash(&prev_hash, unix_ms, user, command, &args_sha256, status);

        let mut line = format!("{hash} {prev_hash} {unix_ms} {user} {command} {args_sha256} {status}");
        if let Some(msg) = error_msg {
            line.push(' ');
            line.push_str(msg);
        }

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        file.sync_all()?;

        Ok(hash)
    }

    /// Verify the whole chain. Returns the last entry's hash on success,
    /// or an `AuditCorrupted` error naming the first bad line.
    pub fn verify(&self) -> Result<String> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut expected_prev = hash::ZERO.to_string();
        let mut last_hash = hash::ZERO.to_string();

        for (idx, raw) in reader.lines().enumerate() {
            let raw = raw?;
            if raw.is_empty() {
                continue;
            }
            let line_no = idx + 1;
            let tokens: Vec<&str> = raw.splitn(7, ' ').collect();
            if tokens.len() < 7 {
                return Err(Error::AuditCorrupted { line: line_no });
            }

            let entry_hash_field = tokens[0];
            let prev_hash_field = tokens[1];
            let unix_ms: u128 = tokens[2]
                .parse()
                .map_err(|_| Error::AuditCorrupted { line: line_no })?;
            let user = tokens[3];
            let command = tokens[4];
            let args_sha256 = tokens[5];
            // tokens[6] is "STATUS" or "STATUS <error msg...>"; split again.
            let (status_str, _error_msg) = match tokens[6].split_once(' ') {
                Some((s, rest)) => (s, Some(rest)),
                None => (tokens[6], None),
            };
            let status: Status = status_str.parse()?;

            if prev_hash_field != expected_prev {
                return Err(Error::AuditCorrupted { line: line_no });
            }

            let recomputed = entry_hash(prev_hash_field, unix_ms, user, command, args_sha256, status);
            if recomputed != entry_hash_field {
                return Err(Error::AuditCorrupted { line: line_no });
            }

            expected_prev = entry_hash_field.to_string();
            last_hash = entry_hash_field.to_string();
        }

        Ok(last_hash)
    }
}
