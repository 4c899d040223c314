//! chain-hashmap: a single-threaded chained hash map whose buckets all
//! live in one shared doubly-linked list of entries.
//!
//! Internal Design:
//!
//! Summary
//! - Chain: every entry, for every bucket, in one arena-backed
//!   doubly-linked list (`chain::Chain`, built on `slotmap`). Positions are
//!   generational keys, so a position never outlives its entry.
//! - Bucket heads: one `Option<position>` per bucket naming the earliest
//!   chain entry of that bucket.
//! - ChainHashMap<K, V, H>: insert, lookup, erase and growth over the two,
//!   with `H` the injected hash function.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (debug reentrancy state is a `Cell`).
//! - Unique keys; inserting a present key leaves the stored value alone.
//! - `K: Eq` plus whatever `H` needs. The hash is computed once per insert
//!   and cached on the entry; growth re-buckets from the cached hash and
//!   never calls `H` again.
//! - Reentrancy: disallowed while the map runs `K: Eq` or `H`; a debug
//!   guard panics on nested entry.
//!
//! Insert discipline
//! - A key whose bucket is empty is linked at the front of the chain.
//!   Otherwise it is linked immediately before the bucket's head and
//!   becomes the new head. Under sequential inserts each bucket's entries
//!   form one contiguous run starting at its head.
//!
//! Growth
//! - When `len / bucket_count` reaches the max load factor (default 1.0),
//!   the next insert squares the bucket count (10 -> 100 -> 10_000).
//! - Squaring is clamped to `MAX_BUCKET_COUNT`; at the cap, or if the new
//!   index can't be allocated, the insert proceeds without growing.
//! - The chain is not reordered. Heads are rebuilt by walking the chain
//!   once; the first entry met for a bucket becomes its head.
//! - Entries that shared an old run can end up interleaved across new
//!   buckets (with 10 -> 100 buckets, a run 11, 1, 111 splits bucket 11
//!   around bucket 1). Heads stay the earliest member of their bucket,
//!   which is all the algorithms below rely on.
//!
//! Scan boundary
//! - No end-of-run marker is kept. Lookups, duplicate checks and erases
//!   scan from the bucket head to the end of the whole chain. This is
//!   correct with interleaved buckets but makes lookups linear in the
//!   worst case. Stopping at the end of the run would need growth to
//!   regroup the chain.
//!
//! Erase
//! - The bucket head only changes when the erased entry *was* the head.
//!   The new head is the next chain entry from the same bucket, or none.
//!   Erasing an interior member unlinks it and leaves the head alone.
//!
//! Notes and non-goals
//! - No thread-safety, persistence or order guarantees beyond chain order.
//! - `Handle`s stay valid across growth and unrelated erases.
//! - With the `stats` feature, `ChainHashMap::stats` reports bucket and
//!   run layout.

mod chain;
pub mod chain_hash_map;
mod chain_hash_map_proptest;
pub mod hasher;
mod reentrancy;

// Public surface
#[cfg(feature = "stats")]
pub use chain_hash_map::ChainStats;
pub use chain_hash_map::{ChainHashMap, Handle, InsertError, Iter, IterMut};
pub use chain_hash_map::{DEFAULT_BUCKET_COUNT, DEFAULT_MAX_LOAD_FACTOR, MAX_BUCKET_COUNT};
pub use hasher::{IdentityHasher, KeyHasher, StdHasher};
