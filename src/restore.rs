//! Restore orchestrator (spec §4.6): rebuilds a snapshot's files on disk
//! from their stored chunks, after confirming the chain has not been
//! rolled back underneath it.

use crate::store::Store;
use crate::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, span, Level};

/// Outcome of a successful restore.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub snapshot_id: String,
    pub files_written: usize,
    pub bytes_written: u64,
}

/// Restore `snapshot_id`'s files into `target_dir`, overwriting anything
/// already there. Fails with `RollbackDetected` before writing a single
/// byte if the snapshot's chain does not verify (spec §4.6 precondition).
pub fn restore(store: &Store, snapshot_id: &str, target_dir: &Path) -> Result<RestoreOutcome> {
    let span = span!(Level::INFO, "restore", snapshot_id = %snapshot_id, target = %target_dir.display());
    let _enter = span.enter();

    store.ledger.verify_chain(snapshot_id)?;

    let manifest = store.manifests.load(snapshot_id)?;
    let record = store.ledger.get(snapshot_id)?;
    manifest.verify_hash(&record.manifest_hash)?;

    fs::create_dir_all(target_dir)?;

    let mut bytes_written = 0u64;
    for entry in &manifest.files {
        let dest = target_dir.join(&entry.path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&dest)?;
        for digest in &entry.chunks {
            let bytes = store.chunks.get(digest)?;
            out.write_all(&bytes)?;
            bytes_written += bytes.len() as u64;
        }
        out.sync_all()?;
        debug!("restored {} ({} bytes)", entry.path, entry.size);
    }

    info!(
        "restore complete: {} files, {} bytes",
        manifest.files.len(),
        bytes_written
    );

    Ok(RestoreOutcome {
        snapshot_id: snapshot_id.to_string(),
        files_written: manifest.files.len(),
        bytes_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::backup;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn round_trips_a_simple_tree() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        write_file(&source.join("a.txt"), b"hello");
        write_file(&source.join("nested/b.txt"), b"world, a bit longer this time");

        let mut store = Store::init(temp.path().join("store"))?;
        let outcome = backup(&mut store, &source, "l1")?;

        let restored_to = temp.path().join("restored");
        let result = restore(&store, &outcome.snapshot_id, &restored_to)?;
        assert_eq!(result.files_written, 2);

        assert_eq!(fs::read(restored_to.join("a.txt"))?, b"hello");
        assert_eq!(
            fs::read(restored_to.join("nested/b.txt"))?,
            b"world, a bit longer this time"
        );
        Ok(())
    }

    #[test]
    fn restore_reconstructs_multi_chunk_files() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        let data: Vec<u8> = (0..(crate::chunk::CHUNK_SIZE * 2 + 777))
            .map(|i| (i % 251) as u8)
            .collect();
        write_file(&source.join("big.bin"), &data);

        let mut store = Store::init(temp.path().join("store"))?;
        let outcome = backup(&mut store, &source, "big")?;

        let restored_to = temp.path().join("restored");
        restore(&store, &outcome.snapshot_id, &restored_to)?;

        assert_eq!(fs::read(restored_to.join("big.bin"))?, data);
        Ok(())
    }

    #[test]
    fn restore_overwrites_existing_files_at_target() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        write_file(&source.join("a.txt"), b"new content");

        let mut store = Store::init(temp.path().join("store"))?;
        let outcome = backup(&mut store, &source, "l1")?;

        let restored_to = temp.path().join("restored");
        write_file(&restored_to.join("a.txt"), b"stale content that should be replaced");
        restore(&store, &outcome.snapshot_id, &restored_to)?;

        assert_eq!(fs::read(restored_to.join("a.txt"))?, b"new content");
        Ok(())
    }

    #[test]
    fn restore_of_unknown_snapshot_errors() -> Result<()> {
        let temp = TempDir::new()?;
        let store = Store::init(temp.path().join("store"))?;
        let result = restore(&store, "snap_0_deadbeef", &temp.path().join("restored"));
        assert!(result.is_err());
        Ok(())
    }
}
