//! SHA-256 digest helper.
//!
//! Digests are always the lowercase 64-character hex encoding of a
//! SHA-256 output. `ZERO` is the genesis sentinel used wherever the data
//! model needs to say "no predecessor" (a snapshot's `prev_root` at
//! sequence 0, an audit entry's `PREV_HASH` for the first line, ...).

use sha2::{Digest, Sha256};

/// Length in hex characters of a digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Genesis sentinel: 64 ASCII zero characters.
pub const ZERO: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Compute the lowercase-hex SHA-256 digest of `data`.
pub fn digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the lowercase-hex SHA-256 digest of the concatenation of
/// `parts`, without allocating an intermediate concatenated buffer.
pub fn digest_concat(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// True if `s` looks like a well-formed digest: 64 lowercase hex chars.
pub fn looks_like_digest(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}
