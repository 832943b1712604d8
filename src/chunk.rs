//! Fixed-size chunker and the content-addressed chunk store.
//!
//! Chunks live at `<store>/chunks/<hash[0:2]>/<hash>`. `ChunkStore::put`
//! is put-if-absent and atomic: the bytes are written to a temporary
//! sibling file in the same directory and renamed into place, so a
//! concurrent crash can never leave a half-written chunk visible under
//! its final name.

use crate::hash;
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Fixed chunk size: 1 MiB. A contract constant (spec §9) — changing it
/// changes the chunk boundaries of every future backup and is not a
/// runtime-tunable setting.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Content-addressed, immutable blob store rooted at `<store>/chunks`.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    chunks_dir: PathBuf,
}

impl ChunkStore {
    /// Open (creating if necessary) the chunk store under `store_root`.
    pub fn open<P: AsRef<Path>>(store_root: P) -> Result<Self> {
        let chunks_dir = store_root.as_ref().join("chunks");
        fs::create_dir_all(&chunks_dir)?;
        Ok(Self { chunks_dir })
    }

    fn path_for(&self, digest: &str) -> PathBuf {
        let (dir, file) = digest.split_at(2);
        self.chunks_dir.join(dir).join(file)
    }

    /// Put-if-absent: write `data` under its own SHA-256 digest and
    /// return the digest. Idempotent and safe to call again after a
    /// crash — a chunk that already exists is left untouched.
    pub fn put(&self, data: &[u8]) -> Result<String> {
        let digest = hash::digest(data);
        let target = self.path_for(&digest);

        if target.exists() {
            return Ok(digest);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = target.with_extension(format!("tmp-{}", std::process::id()));
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(data)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &target)?;

        Ok(digest)
    }

    /// True if a chunk with this digest exists on disk.
    pub fn has(&self, digest: &str) -> bool {
        self.path_for(digest).exists()
    }

    /// Read a chunk's full contents. Does not verify the digest; callers
    /// that need the integrity check re-hash the returned bytes
    /// themselves (see `verify.rs`).
    pub fn get(&self, digest: &str) -> Result<Vec<u8>> {
        let path = self.path_for(digest);
        let mut file = File::open(&path).map_err(|_| Error::ChunkMissing {
            hash: digest.to_string(),
        })?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }
}

/// Split a file into `CHUNK_SIZE`-byte pieces and store each one,
/// returning the ordered list of digests. An empty file yields an empty
/// list, not a single zero-length chunk.
pub fn chunk_and_store<P: AsRef<Path>>(store: &ChunkStore, file_path: P) -> Result<Vec<String>> {
    let mut file = File::open(file_path.as_ref())?;
    let mut digests = Vec::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let read = read_full(&mut file, &mut buffer)?;
        if read == 0 {
            break;
        }
        let digest = store.put(&buffer[..read])?;
        digests.push(digest);
        if read < CHUNK_SIZE {
            break;
        }
    }

    Ok(digests)
}

/// Fill `buffer` as much as possible from `reader`, returning the number
/// of bytes actually read (short only at EOF).
fn read_full(reader: &mut File, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buffer.len() {
        let n = reader.read(&mut buffer[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn put_is_idempotent_and_readable() -> Result<()> {
        let dir = TempDir::new()?;
        let store = ChunkStore::open(dir.path())?;

        let data = b"hello chunk world";
        let digest = store.put(data)?;
        let digest_again = store.put(data)?;
        assert_eq!(digest, digest_again);

        assert!(store.has(&digest));
        assert_eq!(store.get(&digest)?, data);
        Ok(())
    }

    #[test]
    fn get_missing_chunk_errors() -> Result<()> {
        let dir = TempDir::new()?;
        let store = ChunkStore::open(dir.path())?;
        let result = store.get(&"f".repeat(64));
        assert!(matches!(result, Err(Error::ChunkMissing { .. })));
        Ok(())
    }

    #[test]
    fn empty_file_has_no_chunks() -> Result<()> {
        let dir = TempDir::new()?;
        let store_dir = dir.path().join("store");
        let store = ChunkStore::open(&store_dir)?;

        let empty_path = dir.path().join("empty.txt");
        fs::write(&empty_path, b"")?;

        let digests = chunk_and_store(&store, &empty_path)?;
        assert!(digests.is_empty());
        Ok(())
    }

    #[test]
    fn large_file_splits_into_chunks_with_short_last_chunk() -> Result<()> {
        let dir = TempDir::new()?;
        let store_dir = dir.path().join("store");
        let store = ChunkStore::open(&store_dir)?;

        let data = vec![b'x'; CHUNK_SIZE + 123];
        let path = dir.path().join("big.bin");
        fs::write(&path, &data)?;

        let digests = chunk_and_store(&store, &path)?;
        assert_eq!(digests.len(), 2);

        let mut reconstructed = store.get(&digests[0])?;
        reconstructed.extend(store.get(&digests[1])?);
        assert_eq!(reconstructed, data);
        Ok(())
    }

    #[test]
    fn identical_content_dedups_to_one_chunk() -> Result<()> {
        let dir = TempDir::new()?;
        let store_dir = dir.path().join("store");
        let store = ChunkStore::open(&store_dir)?;

        let data = vec![b'z'; CHUNK_SIZE];
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        fs::write(&a, &data)?;
        fs::write(&b, &data)?;

        let digests_a = chunk_and_store(&store, &a)?;
        let digests_b = chunk_and_store(&store, &b)?;
        assert_eq!(digests_a, digests_b);

        let mut count = 0;
        for entry in walkdir::WalkDir::new(&store_dir) {
            let entry = entry.unwrap();
            if entry.file_type().is_file() {
                count += 1;
            }
        }
        assert_eq!(count, 1);
        Ok(())
    }
}
