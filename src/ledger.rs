//! The Metadata Ledger: the snapshot hash-chain record (spec §4.5).
//!
//! Persisted as `<store>/metadata.json`, written atomically via
//! temp-file + rename, exactly like every other durable artifact in the
//! store. `prev_root_chain` is the authoritative sequence ordering;
//! `snapshots` is keyed by id (a `BTreeMap` so canonical serialization
//! gets ascending key order for free, same as the manifest's canonical
//! rules).

use crate::hash;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The snapshot record persisted in the ledger (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub chain_hash: String,
    pub created_at: String,
    pub id: String,
    pub label: String,
    pub manifest_hash: String,
    pub merkle_root: String,
    pub prev_chain_hash: String,
    pub prev_root: String,
    pub sequence: usize,
    pub total_chunks: usize,
    pub total_files: usize,
}

impl SnapshotRecord {
    /// Derive `chain_hash = SHA256(prev_chain_hash || merkle_root || prev_root)`.
    pub fn derive_chain_hash(prev_chain_hash: &str, merkle_root: &str, prev_root: &str) -> String {
        hash::digest_concat(&[
            prev_chain_hash.as_bytes(),
            merkle_root.as_bytes(),
            prev_root.as_bytes(),
        ])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerData {
    latest_snapshot: Option<String>,
    latest_snapshot_root: Option<String>,
    prev_root_chain: Vec<String>,
    snapshots: BTreeMap<String, SnapshotRecord>,
}

/// Handle onto `<store>/metadata.json`.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    data: LedgerData,
}

impl Ledger {
    pub fn open<P: AsRef<Path>>(store_root: P) -> Result<Self> {
        let path = store_root.as_ref().join("metadata.json");
        let data = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes)?
        } else {
            LedgerData::default()
        };
        let ledger = Self { path, data };
        ledger.persist()?;
        Ok(ledger)
    }

    fn persist(&self) -> Result<()> {
        let bytes = serde_json::to_vec(&self.data)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// The merkle root and chain hash that a new snapshot's `prev_root`
    /// / `prev_chain_hash` must reference, given the current tip.
    pub fn tip(&self) -> (String, String) {
        match &self.data.latest_snapshot {
            None => (hash::ZERO.to_string(), hash::ZERO.to_string()),
            Some(id) => {
                let record = &self.data.snapshots[id];
                (record.merkle_root.clone(), record.chain_hash.clone())
            }
        }
    }

    /// Next dense sequence number.
    pub fn next_sequence(&self) -> usize {
        self.data.prev_root_chain.len()
    }

    /// Append a new, already-validated snapshot record and persist.
    /// Validates the spec §4.5 preconditions before committing the
    /// record, so a caller bug can never desynchronize the chain.
    pub fn append(&mut self, record: SnapshotRecord) -> Result<()> {
        let (expected_prev_root, expected_prev_chain_hash) = self.tip();
        if record.sequence != self.next_sequence() {
            return Err(Error::RollbackDetected {
                reason: format!(
                    "record sequence {} does not match expected next sequence {}",
                    record.sequence,
                    self.next_sequence()
                ),
            });
        }
        if record.prev_root != expected_prev_root {
            return Err(Error::RollbackDetected {
                reason: "prev_root does not match the ledger tip".to_string(),
            });
        }
        if record.prev_chain_hash != expected_prev_chain_hash {
            return Err(Error::RollbackDetected {
                reason: "prev_chain_hash does not match the ledger tip".to_string(),
            });
        }
        let expected_chain_hash =
            SnapshotRecord::derive_chain_hash(&record.prev_chain_hash, &record.merkle_root, &record.prev_root);
        if record.chain_hash != expected_chain_hash {
            return Err(Error::RollbackDetected {
                reason: "chain_hash does not match its derivation".to_string(),
            });
        }

        self.data.prev_root_chain.push(record.merkle_root.clone());
        self.data.latest_snapshot = Some(record.id.clone());
        self.data.latest_snapshot_root = Some(record.merkle_root.clone());
        self.data.snapshots.insert(record.id.clone(), record);
        self.persist()
    }

    pub fn get(&self, id: &str) -> Result<&SnapshotRecord> {
        self.data
            .snapshots
            .get(id)
            .ok_or_else(|| Error::SnapshotNotFound { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.data.snapshots.contains_key(id)
    }

    /// List all records ordered by `sequence` (spec's authoritative
    /// ordering, via `prev_root_chain`'s position rather than BTreeMap's
    /// id ordering).
    pub fn list(&self) -> Vec<&SnapshotRecord> {
        let mut records: Vec<&SnapshotRecord> = self.data.snapshots.values().collect();
        records.sort_by_key(|r| r.sequence);
        records
    }

    /// Remove a record and truncate `prev_root_chain`/tip bookkeeping
    /// accordingly. Used defensively by journal recovery (spec §4.4);
    /// normal backup ordering never leaves a ledger record for an
    /// uncommitted transaction.
    pub fn remove(&mut self, id: &str) -> Result<()> {
        if let Some(record) = self.data.snapshots.remove(id) {
            self.data.prev_root_chain.truncate(record.sequence);
            if self.data.latest_snapshot.as_deref() == Some(id) {
                let new_tip = self
                    .data
                    .snapshots
                    .values()
                    .max_by_key(|r| r.sequence)
                    .map(|r| (r.id.clone(), r.merkle_root.clone()));
                match new_tip {
                    Some((tip_id, tip_root)) => {
                        self.data.latest_snapshot = Some(tip_id);
                        self.data.latest_snapshot_root = Some(tip_root);
                    }
                    None => {
                        self.data.latest_snapshot = None;
                        self.data.latest_snapshot_root = None;
                    }
                }
            }
            self.persist()?;
        }
        Ok(())
    }

    /// Walk the chain from genesis through `id`'s `sequence`, failing at
    /// the first invariant violation (spec §4.5). Distinguishes the two
    /// documented sub-conditions in the error message: a predecessor
    /// root mismatch vs. a chain-hash mismatch. An id whose predecessor
    /// chain cannot be walked because the ledger was truncated
    /// underneath it is treated as `RollbackDetected` too, per the
    /// spec's open question (§9).
    pub fn verify_chain(&self, id: &str) -> Result<()> {
        let target = self.get(id)?;
        let chain = self.list();

        for record in chain.iter().take(target.sequence + 1) {
            if record.sequence == 0 {
                if record.prev_root != hash::ZERO || record.prev_chain_hash != hash::ZERO {
                    return Err(Error::RollbackDetected {
                        reason: format!(
                            "genesis snapshot '{}' must have ZERO predecessors",
                            record.id
                        ),
                    });
                }
            } else {
                let predecessor = chain
                    .iter()
                    .find(|r| r.sequence == record.sequence - 1)
                    .ok_or_else(|| Error::RollbackDetected {
                        reason: format!(
                            "predecessor of sequence {} not found: ledger truncated",
                            record.sequence
                        ),
                    })?;

                if record.prev_root != predecessor.merkle_root {
                    return Err(Error::RollbackDetected {
                        reason: format!(
                            "previous snapshot not found for root: '{}'.prev_root does not match predecessor '{}'.merkle_root",
                            record.id, predecessor.id
                        ),
                    });
                }
                if record.prev_chain_hash != predecessor.chain_hash {
                    return Err(Error::RollbackDetected {
                        reason: format!(
                            "hash chain mismatch: '{}'.prev_chain_hash disagrees with predecessor '{}'.chain_hash",
                            record.id, predecessor.id
                        ),
                    });
                }
            }

            let expected_chain_hash = SnapshotRecord::derive_chain_hash(
                &record.prev_chain_hash,
                &record.merkle_root,
                &record.prev_root,
            );
            if record.chain_hash != expected_chain_hash {
                return Err(Error::RollbackDetected {
                    reason: format!(
                        "hash chain mismatch: '{}'.chain_hash does not recompute",
                        record.id
                    ),
                });
            }
        }

        Ok(())
    }
}
