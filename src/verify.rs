//! Verify orchestrator (spec §4.6): re-derives every integrity
//! invariant for a stored snapshot without touching the source tree or
//! writing any output.

use crate::hash;
use crate::merkle;
use crate::store::Store;
use crate::{Error, Result};
use tracing::{debug, info, span, Level};

/// Outcome of a successful verification.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub snapshot_id: String,
    pub files_checked: usize,
    pub chunks_checked: usize,
}

/// Re-check `snapshot_id` against every layer of the integrity stack
/// (spec §4.6): manifest hash, every chunk's content hash, the Merkle
/// root, and the ledger hash chain. Returns the first failure it finds.
pub fn verify(store: &Store, snapshot_id: &str) -> Result<VerifyReport> {
    let span = span!(Level::INFO, "verify", snapshot_id = %snapshot_id);
    let _enter = span.enter();

    let record = store.ledger.get(snapshot_id)?;
    let manifest = store.manifests.load(snapshot_id)?;
    manifest.verify_hash(&record.manifest_hash)?;
    debug!("manifest hash ok");

    let mut chunks_checked = 0usize;
    for entry in &manifest.files {
        for digest in &entry.chunks {
            if !store.chunks.has(digest) {
                return Err(Error::ChunkMissing { hash: digest.clone() });
            }
            let bytes = store.chunks.get(digest)?;
            let recomputed = hash::digest(&bytes);
            if &recomputed != digest {
                return Err(Error::ChunkCorrupted { hash: digest.clone() });
            }
            chunks_checked += 1;
        }
    }
    debug!("{} chunks verified", chunks_checked);

    let recomputed_root = merkle::manifest_root(&manifest);
    if recomputed_root != record.merkle_root {
        return Err(Error::MerkleMismatch {
            expected: record.merkle_root.clone(),
            actual: recomputed_root,
        });
    }
    debug!("merkle root ok");

    store.ledger.verify_chain(snapshot_id)?;
    info!(
        "verify complete: {} files, {} chunks, chain ok",
        manifest.files.len(),
        chunks_checked
    );

    Ok(VerifyReport {
        snapshot_id: snapshot_id.to_string(),
        files_checked: manifest.files.len(),
        chunks_checked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::backup;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn a_freshly_backed_up_snapshot_verifies_clean() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        write_file(&source.join("a.txt"), b"hello");

        let mut store = Store::init(temp.path().join("store"))?;
        let outcome = backup(&mut store, &source, "l1")?;

        let report = verify(&store, &outcome.snapshot_id)?;
        assert_eq!(report.files_checked, 1);
        assert_eq!(report.chunks_checked, 1);
        Ok(())
    }

    #[test]
    fn tampering_a_chunk_is_detected() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        write_file(&source.join("a.txt"), b"hello");

        let mut store = Store::init(temp.path().join("store"))?;
        let outcome = backup(&mut store, &source, "l1")?;

        let manifest = store.manifests.load(&outcome.snapshot_id)?;
        let digest = &manifest.files[0].chunks[0];
        let (shard, file) = digest.split_at(2);
        let chunk_path = temp.path().join("store").join("chunks").join(shard).join(file);
        fs::write(&chunk_path, b"tampered bytes, same length??")?;

        let result = verify(&store, &outcome.snapshot_id);
        assert!(matches!(result, Err(Error::ChunkCorrupted { .. })));
        Ok(())
    }

    #[test]
    fn tampering_the_manifest_is_detected() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        write_file(&source.join("a.txt"), b"hello");
        write_file(&source.join("b.txt"), b"world");

        let mut store = Store::init(temp.path().join("store"))?;
        let outcome = backup(&mut store, &source, "l1")?;

        let mut manifest = store.manifests.load(&outcome.snapshot_id)?;
        manifest.files[0].path = "renamed.txt".to_string();
        manifest.write_to(store.manifests.path_for(&outcome.snapshot_id))?;

        let result = verify(&store, &outcome.snapshot_id);
        assert!(matches!(result, Err(Error::ManifestCorrupted { .. })));
        Ok(())
    }

    #[test]
    fn a_missing_chunk_is_reported_before_content_is_rehashed() -> Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("source");
        write_file(&source.join("a.txt"), b"hello");

        let mut store = Store::init(temp.path().join("store"))?;
        let outcome = backup(&mut store, &source, "l1")?;

        let manifest = store.manifests.load(&outcome.snapshot_id)?;
        let digest = &manifest.files[0].chunks[0];
        let (shard, file) = digest.split_at(2);
        let chunk_path = temp.path().join("store").join("chunks").join(shard).join(file);
        fs::remove_file(&chunk_path)?;

        let result = verify(&store, &outcome.snapshot_id);
        assert!(matches!(result, Err(Error::ChunkMissing { .. })));
        Ok(())
    }
}
