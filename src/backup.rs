//! Backup orchestrator (spec §4.6): walks a source directory, chunks
//! and stores every file, builds the canonical manifest, and commits a
//! new snapshot through the write-ahead journal.

use crate::chunk;
use crate::ledger::SnapshotRecord;
use crate::manifest::{FileEntry, Manifest};
use crate::merkle;
use crate::store::Store;
use crate::{Error, Result};
use chrono::Utc;
use std::fs;
use std::path::Path;
use tracing::{debug, info, span, warn, Level};
use walkdir::WalkDir;

/// Outcome of a successful backup.
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub snapshot_id: String,
    pub total_files: usize,
    pub total_chunks: usize,
    pub merkle_root: String,
}

/// Generate a snapshot id in the spec's `snap_<unix_seconds>_<8 hex>`
/// form. Reuses `uuid` (already a dependency for other purposes) for the
/// random suffix rather than pulling in a dedicated `rand` crate.
fn new_snapshot_id(unix_seconds: u64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("snap_{}_{}", unix_seconds, &suffix[..8])
}

/// Discover regular files under `source`, sorted by their
/// source-relative, forward-slash path. Symlinks and anything that
/// isn't a regular file (devices, sockets, ...) are skipped; directories
/// are not entities of their own.
fn discover_files(source: &Path) -> Result<Vec<(String, std::path::PathBuf)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if file_type.is_symlink() {
            debug!("skipping symlink: {}", entry.path().display());
            continue;
        }
        if !file_type.is_file() {
            debug!("skipping non-regular file: {}", entry.path().display());
            continue;
        }

        let relative = entry.path().strip_prefix(source).map_err(|_| Error::InvalidStore {
            reason: format!(
                "{} is not under source root {}",
                entry.path().display(),
                source.display()
            ),
        })?;
        let rel_str = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        files.push((rel_str, entry.path().to_path_buf()));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Run a full backup transaction: discover, chunk, manifest, merkle
/// root, journal, ledger append, commit.
pub fn backup(store: &mut Store, source: &Path, label: &str) -> Result<BackupOutcome> {
    let now = Utc::now();
    let unix_seconds = now.timestamp() as u64;
    let sid = new_snapshot_id(unix_seconds);

    let span = span!(Level::INFO, "backup", snapshot_id = %sid, source = %source.display());
    let _enter = span.enter();
    info!("starting backup of {} as '{}'", source.display(), label);

    store.journal.begin(&sid)?;

    let files = discover_files(source)?;
    let mut entries = Vec::with_capacity(files.len());
    let mut total_chunks = 0usize;

    for (rel_path, abs_path) in &files {
        let size = fs::metadata(abs_path)?.len();
        let digests = chunk::chunk_and_store(&store.chunks, abs_path)?;
        total_chunks += digests.len();
        debug!("backed up {} ({} bytes, {} chunks)", rel_path, size, digests.len());
        entries.push(FileEntry::new(rel_path.clone(), size, digests));
    }

    let manifest = Manifest::canonical(
        sid.clone(),
        source.display().to_string(),
        now.to_rfc3339(),
        label.to_string(),
        entries,
    );
    store.manifests.store(&manifest)?;
    let manifest_hash = manifest.manifest_hash()?;
    store.journal.manifest(&manifest_hash)?;

    let merkle_root = merkle::manifest_root(&manifest);
    let (prev_root, prev_chain_hash) = store.ledger.tip();
    let chain_hash = SnapshotRecord::derive_chain_hash(&prev_chain_hash, &merkle_root, &prev_root);

    store
        .journal
        .metadata(&sid, &merkle_root, &prev_root, &unix_seconds.to_string(), label)?;

    let record = SnapshotRecord {
        chain_hash,
        created_at: now.to_rfc3339(),
        id: sid.clone(),
        label: label.to_string(),
        manifest_hash,
        merkle_root: merkle_root.clone(),
        prev_chain_hash,
        prev_root,
        sequence: store.ledger.next_sequence(),
        total_chunks,
        total_files: manifest.files.len(),
    };
    store.ledger.append(record)?;

    store.journal.commit(&sid)?;

    info!(
        "backup complete: {} files, {} chunks, merkle root {}",
        manifest.files.len(),
        total_chunks,
        merkle_root
    );

    Ok(BackupOutcome {
        snapshot_id: sid,
        total_files: manifest.files.len(),
        total_chunks,
        merkle_root,
    })
}
