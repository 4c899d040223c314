//! Injectable key hashing.
//!
//! `ChainHashMap` only needs a pure function from key to `u64`; the bucket
//! is `hash % bucket_count`. Distribution quality affects scan length, never
//! correctness.

use core::hash::{BuildHasher, Hash, Hasher};
use std::collections::hash_map::RandomState;

/// Maps a key to an unsigned hash. Must be deterministic for the lifetime
/// of the map and agree across `Borrow` forms of the same key.
pub trait KeyHasher<K: ?Sized> {
    fn hash_key(&self, key: &K) -> u64;
}

/// Any `Fn(&K) -> u64` is a hash function.
impl<K, F> KeyHasher<K> for F
where
    K: ?Sized,
    F: Fn(&K) -> u64,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        self(key)
    }
}

/// Adapts a `BuildHasher` (default `RandomState`) to `KeyHasher`.
#[derive(Clone, Debug, Default)]
pub struct StdHasher<S = RandomState>(S);

impl<S> StdHasher<S> {
    pub fn new(build: S) -> Self {
        StdHasher(build)
    }
}

impl<K, S> KeyHasher<K> for StdHasher<S>
where
    K: ?Sized + Hash,
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        self.0.hash_one(key)
    }
}

/// Integer keys hash to their own value (`7u32` -> `7`, `-1i8` -> `u64::MAX`).
///
/// Other keys fold every written word together; usable, but intended for
/// integers and tests that need predictable buckets.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityHasher;

impl<K> KeyHasher<K> for IdentityHasher
where
    K: ?Sized + Hash,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        let mut h = IdentityState(0);
        key.hash(&mut h);
        h.finish()
    }
}

// Folding into a zero state is the identity, so a key that writes a
// single integer hashes to exactly that integer.
struct IdentityState(u64);

impl IdentityState {
    #[inline]
    fn fold(&mut self, word: u64) {
        self.0 = self.0.rotate_left(8) ^ word;
    }
}

impl Hasher for IdentityState {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.fold(b.into());
        }
    }

    fn write_u8(&mut self, i: u8) {
        self.fold(i.into());
    }
    fn write_u16(&mut self, i: u16) {
        self.fold(i.into());
    }
    fn write_u32(&mut self, i: u32) {
        self.fold(i.into());
    }
    fn write_u64(&mut self, i: u64) {
        self.fold(i);
    }
    fn write_usize(&mut self, i: usize) {
        self.fold(i as u64);
    }
    fn write_i8(&mut self, i: i8) {
        self.fold(i as i64 as u64);
    }
    fn write_i16(&mut self, i: i16) {
        self.fold(i as i64 as u64);
    }
    fn write_i32(&mut self, i: i32) {
        self.fold(i as i64 as u64);
    }
    fn write_i64(&mut self, i: i64) {
        self.fold(i as u64);
    }
    fn write_isize(&mut self, i: isize) {
        self.fold(i as u64);
    }

    fn finish(&self) -> u64 {
        self.0
    }
}
