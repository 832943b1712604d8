//! Merkle root computation over a canonical manifest.
//!
//! Leaf formula (spec §4.3): `SHA256(path || "|" || chunks.join(","))`.
//! Tree construction pairs adjacent leaves, duplicating the last one
//! when the level has odd length, until a single root remains.

use crate::hash;
use crate::manifest::{FileEntry, Manifest};

/// Delimiter between a file's path and its joined chunk list in the
/// leaf-hash preimage. A contract constant (spec §9).
pub const LEAF_DELIMITER: &str = "|";

/// Compute a single file entry's Merkle leaf hash.
pub fn leaf_hash(entry: &FileEntry) -> String {
    let joined = entry.chunks.join(",");
    hash::digest_concat(&[entry.path.as_bytes(), LEAF_DELIMITER.as_bytes(), joined.as_bytes()])
}

/// Compute the Merkle root over an ordered list of leaf hashes.
///
/// - Zero leaves: root is [`hash::ZERO`].
/// - One leaf: root is that leaf.
/// - Otherwise: pair adjacent hashes (duplicating the last if the level
///   is odd) and hash each pair, repeating until one hash remains.
pub fn root_from_leaves(leaves: &[String]) -> String {
    if leaves.is_empty() {
        return hash::ZERO.to_string();
    }
    if leaves.len() == 1 {
        return leaves[0].clone();
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(level.last().unwrap().clone());
        }
        let mut next = Vec::with_capacity(level.len() / 2);
        for pair in level.chunks(2) {
            next.push(hash::digest_concat(&[pair[0].as_bytes(), pair[1].as_bytes()]));
        }
        level = next;
    }
    level.into_iter().next().unwrap()
}

/// Compute the Merkle root of a manifest: leaves taken in the manifest's
/// (path-sorted) file order, per spec §4.3.
pub fn manifest_root(manifest: &Manifest) -> String {
    let leaves: Vec<String> = manifest.files.iter().map(leaf_hash).collect();
    root_from_leaves(&leaves)
}
