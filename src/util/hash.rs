//! Stable hashing of source phrases.
//!
//! The same function keys the probing index at build time and probes it at
//! query time. The key is computed over the vocabulary ids of the phrase, not
//! over its text, and never equals [`EMPTY_KEY`].

use xxhash_rust::xxh64::xxh64;

/// Slot marker for an unused probing-table slot.
pub const EMPTY_KEY: u64 = 0;

/// Key substituted when the raw hash happens to be [`EMPTY_KEY`].
const ZERO_HASH_SUBSTITUTE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Compute the lookup key of a source phrase from its vocabulary ids.
pub fn phrase_key(word_ids: &[u32]) -> u64 {
    let mut buf = Vec::with_capacity(word_ids.len() * 4);
    for id in word_ids {
        buf.extend_from_slice(&id.to_le_bytes());
    }
    non_empty(xxh64(&buf, 0))
}

#[inline]
fn non_empty(hash: u64) -> u64 {
    if hash == EMPTY_KEY {
        ZERO_HASH_SUBSTITUTE
    } else {
        hash
    }
}
