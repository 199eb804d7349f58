use std::{
    hash::{BuildHasher, Hasher},
    sync::atomic::{AtomicU64, Ordering},
};

use xxhash_rust::xxh64::{xxh64, Xxh64};

const DEFAULT_HASH_SEED: u64 = 5381;

static HASH_SEED: AtomicU64 = AtomicU64::new(DEFAULT_HASH_SEED);

/// Hash builder seeded with a configurable 64-bit value.
///
/// Tables created with `SeededState::default()` pick up the process-wide seed
/// set by [`set_hash_seed`], so the seed must be installed before the tables
/// that should use it are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededState {
    seed: u64,
}

/// Streaming xxh64 hasher produced by [`SeededState`].
#[derive(Clone)]
pub struct SeededHasher(Xxh64);

/// Sets the seed used by tables created afterwards.
pub fn set_hash_seed(seed: u64) {
    HASH_SEED.store(seed, Ordering::Relaxed);
}

pub fn hash_seed() -> u64 {
    HASH_SEED.load(Ordering::Relaxed)
}

/// One-shot xxh64 of a byte string.
#[inline]
pub fn hash_bytes(
    seed: u64,
    bytes: &[u8],
) -> u64 {
    xxh64(bytes, seed)
}

/// Thomas Wang's 32-bit integer mix.
pub fn int_hash(mut key: u32) -> u32 {
    key = key.wrapping_add(!(key << 15));
    key ^= key >> 10;
    key = key.wrapping_add(key << 3);
    key ^= key >> 6;
    key = key.wrapping_add(!(key << 11));
    key ^= key >> 16;
    key
}

impl SeededState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for SeededState {
    fn default() -> Self {
        Self::new(hash_seed())
    }
}

impl BuildHasher for SeededState {
    type Hasher = SeededHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SeededHasher(Xxh64::new(self.seed))
    }
}

impl Hasher for SeededHasher {
    fn write(
        &mut self,
        bytes: &[u8],
    ) {
        self.0.update(bytes);
    }

    fn finish(&self) -> u64 {
        self.0.digest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_hash() {
        let a = SeededState::new(7);
        let b = SeededState::new(7);
        assert_eq!(a.hash_one(b"key".as_slice()), b.hash_one(b"key".as_slice()));
    }

    #[test]
    fn test_seed_changes_hash() {
        let a = SeededState::new(1);
        let b = SeededState::new(2);
        assert_ne!(a.hash_one("key"), b.hash_one("key"));
    }

    #[test]
    fn test_hash_bytes_matches_streaming() {
        let mut h = SeededState::new(42).build_hasher();
        h.write(b"hello world");
        assert_eq!(h.finish(), hash_bytes(42, b"hello world"));
    }

    #[test]
    fn test_int_hash_spreads_neighbours() {
        assert_ne!(int_hash(1), int_hash(2));
        assert_ne!(int_hash(0), 0);
    }
}
