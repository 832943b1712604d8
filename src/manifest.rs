//! The canonical snapshot manifest: a byte-deterministic JSON mapping of
//! a snapshot's files to their ordered chunk digests.
//!
//! Canonicalization rules (spec §4.2) are bit-exact: object keys sorted
//! ascending, `files[]` sorted ascending by `path`, no incidental
//! whitespace, UTF-8 without a BOM. `serde_json`'s compact writer
//! already omits whitespace and preserves insertion order, so
//! canonicalization reduces to sorting the `files` vector and relying on
//! `#[derive(Serialize)]` field order to match the sorted-key contract
//! (the struct's field declaration order below *is* the sorted key
//! order).

use crate::hash;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Manifest format version. Bumped whenever the on-disk shape changes.
pub const MANIFEST_VERSION: u32 = 1;

/// One file's entry in a manifest: its source-relative path, original
/// size, and the ordered list of chunk digests whose concatenation
/// reproduces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub chunks: Vec<String>,
    pub path: String,
    pub size: u64,
}

impl FileEntry {
    pub fn new(path: String, size: u64, chunks: Vec<String>) -> Self {
        Self { chunks, path, size }
    }
}

/// A snapshot's file-to-chunk mapping, in canonical form once built via
/// [`Manifest::canonical`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at: String,
    pub files: Vec<FileEntry>,
    pub label: String,
    pub snapshot_id: String,
    pub source_path: String,
    pub version: u32,
}

impl Manifest {
    /// Build a manifest in canonical form: `files` sorted ascending by
    /// path. `created_at` is an RFC 3339 string (a fixed, round-tripping
    /// textual form sidesteps the "floats must round-trip exactly"
    /// trap the spec calls out for loosely-typed hosts).
    pub fn canonical(
        snapshot_id: String,
        source_path: String,
        created_at: String,
        label: String,
        mut files: Vec<FileEntry>,
    ) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            created_at,
            files,
            label,
            snapshot_id,
            source_path,
            version: MANIFEST_VERSION,
        }
    }

    /// Serialize to the canonical byte form: compact JSON with keys in
    /// the struct's declared (sorted) order and no extraneous
    /// whitespace.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// SHA-256 of [`Self::canonical_bytes`].
    pub fn manifest_hash(&self) -> Result<String> {
        Ok(hash::digest(&self.canonical_bytes()?))
    }

    /// Write the manifest to `path` in canonical form.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.canonical_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a manifest from disk and verify it re-serializes to the same
    /// bytes its stored hash implies (structural sanity — the actual
    /// hash comparison against a ledger record happens in `verify.rs`).
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref()).map_err(Error::Io)?;
        let manifest: Manifest = serde_json::from_slice(&bytes)?;
        Ok(manifest)
    }

    /// Re-derive the canonical bytes for a manifest loaded from disk and
    /// compare against `expected_hash`. Returns `Ok(())` when they
    /// match; otherwise a `ManifestCorrupted` error naming the
    /// mismatch.
    pub fn verify_hash(&self, expected_hash: &str) -> Result<()> {
        let recomputed = self.manifest_hash()?;
        if recomputed != expected_hash {
            return Err(Error::ManifestCorrupted {
                reason: format!(
                    "stored manifest canonicalizes to {} but the ledger records {}",
                    recomputed, expected_hash
                ),
            });
        }
        Ok(())
    }
}

/// Directory of manifests, one JSON file per snapshot id.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    manifests_dir: PathBuf,
}

impl ManifestStore {
    pub fn open<P: AsRef<Path>>(store_root: P) -> Result<Self> {
        let manifests_dir = store_root.as_ref().join("manifests");
        fs::create_dir_all(&manifests_dir)?;
        Ok(Self { manifests_dir })
    }

    pub fn path_for(&self, snapshot_id: &str) -> PathBuf {
        self.manifests_dir.join(format!("{}.json", snapshot_id))
    }

    pub fn store(&self, manifest: &Manifest) -> Result<()> {
        manifest.write_to(self.path_for(&manifest.snapshot_id))
    }

    pub fn load(&self, snapshot_id: &str) -> Result<Manifest> {
        let path = self.path_for(snapshot_id);
        if !path.exists() {
            return Err(Error::SnapshotNotFound {
                id: snapshot_id.to_string(),
            });
        }
        Manifest::read_from(path)
    }

    /// Remove a manifest file if present. Used by journal recovery to
    /// clean up an incomplete transaction's manifest (spec §4.4).
    pub fn remove(&self, snapshot_id: &str) -> Result<()> {
        let path = self.path_for(snapshot_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
