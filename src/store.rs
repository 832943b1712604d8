//! `Store`: the on-disk root that owns the chunk store, manifest store,
//! journal, and metadata ledger (spec §6's layout).
//!
//! Opening a store unconditionally runs journal recovery (spec §4.4),
//! so every other component can assume a consistent, committed-only
//! ledger the moment it gets a `Store` handle.

use crate::audit::AuditLog;
use crate::chunk::ChunkStore;
use crate::journal::{self, Journal, RecoveryReport};
use crate::ledger::Ledger;
use crate::manifest::ManifestStore;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A handle onto one backup store rooted at a directory on disk.
pub struct Store {
    root: PathBuf,
    pub chunks: ChunkStore,
    pub manifests: ManifestStore,
    pub journal: Journal,
    pub ledger: Ledger,
    pub audit: AuditLog,
}

impl Store {
    /// Create the on-disk skeleton for a brand-new store (spec §6
    /// `init`): empty ledger, empty journal, audit log ready for its
    /// genesis entry.
    pub fn init<P: AsRef<Path>>(root: P) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Self::open(root)
    }

    /// Open an existing store, running crash recovery unconditionally.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let chunks = ChunkStore::open(&root)?;
        let manifests = ManifestStore::open(&root)?;
        let journal = Journal::open(&root)?;
        let mut ledger = Ledger::open(&root)?;
        let audit = AuditLog::open(&root)?;

        let RecoveryReport { rolled_back } = journal::recover(&journal, &manifests, &mut ledger)?;
        if rolled_back.is_empty() {
            info!("store opened at {}: no incomplete transactions", root.display());
        } else {
            warn!(
                "store opened at {}: rolled back {} incomplete transaction(s): {:?}",
                root.display(),
                rolled_back.len(),
                rolled_back
            );
        }

        Ok(Self {
            root,
            chunks,
            manifests,
            journal,
            ledger,
            audit,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_expected_layout() -> Result<()> {
        let dir = TempDir::new()?;
        let store_root = dir.path().join("store");
        Store::init(&store_root)?;

        assert!(store_root.join("chunks").is_dir());
        assert!(store_root.join("manifests").is_dir());
        assert!(store_root.join("wal.log").is_file());
        assert!(store_root.join("audit.log").is_file());
        Ok(())
    }

    #[test]
    fn reopening_an_empty_store_is_a_no_op() -> Result<()> {
        let dir = TempDir::new()?;
        Store::init(dir.path())?;
        let reopened = Store::open(dir.path())?;
        assert!(reopened.ledger.list().is_empty());
        Ok(())
    }
}
