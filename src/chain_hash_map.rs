//! ChainHashMap: chained hashing over one shared entry chain.
//!
//! - `chain` holds every entry of every bucket in one doubly-linked list.
//! - `heads[b]` is the position of the earliest chain entry in bucket `b`,
//!   or `None` when the bucket is empty.
//!
//! A new entry for bucket `b` is linked at the chain front when `b` is
//! empty, otherwise immediately before `b`'s head, and becomes the head.
//! Sequential inserts therefore keep a bucket's entries contiguous. Growth
//! squares the bucket count without moving entries, which can interleave
//! buckets that used to share a run, so nothing below relies on
//! contiguity: a head is always the earliest member of its bucket and
//! every scan runs from the head to the end of the whole chain.

use crate::chain::{self, Chain};
use crate::hasher::{KeyHasher, StdHasher};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::fmt;
use core::ops::{Index, IndexMut};
use slotmap::DefaultKey;

/// Bucket count used when none is given.
pub const DEFAULT_BUCKET_COUNT: usize = 10;

/// Load factor at which the next insert grows the bucket index.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 1.0;

/// Largest bucket count growth will reach. Squaring that would pass it is
/// clamped here, and a map already at the cap stops growing; lookups stay
/// correct at any load factor because scans run to the end of the chain.
pub const MAX_BUCKET_COUNT: usize = 1 << 22;

// Squaring 1 never grows.
const MIN_BUCKET_COUNT: usize = 2;

const ENTRY_RULE: &str = "-----------------------------";

/// Stable reference to one entry. Survives growth and unrelated removals;
/// resolves to `None` once its own entry is erased.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Handle(k)
    }
    pub(crate) fn raw_handle(&self) -> DefaultKey {
        self.0
    }

    pub fn key<'a, K, V, H>(&self, map: &'a ChainHashMap<K, V, H>) -> Option<&'a K> {
        map.handle_key(*self)
    }

    pub fn value<'a, K, V, H>(&self, map: &'a ChainHashMap<K, V, H>) -> Option<&'a V> {
        map.handle_value(*self)
    }

    pub fn value_mut<'a, K, V, H>(&self, map: &'a mut ChainHashMap<K, V, H>) -> Option<&'a mut V> {
        map.handle_value_mut(*self)
    }
}

#[derive(Clone, Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    // hash % bucket_count as of the last insert or growth.
    bucket: usize,
}

#[inline]
fn bucket_index(hash: u64, bucket_count: usize) -> usize {
    debug_assert!(bucket_count > 0, "bucket index must never be empty");
    (hash % bucket_count as u64) as usize
}

/// Chain plus bucket heads. Kept apart from the hasher and the guard so
/// mutation helpers can run while a guard borrows the map.
#[derive(Clone, Debug)]
struct Table<K, V> {
    chain: Chain<Entry<K, V>>,
    heads: Vec<Option<DefaultKey>>,
}

impl<K, V> Table<K, V> {
    fn with_buckets(bucket_count: usize) -> Self {
        Self {
            chain: Chain::new(),
            heads: vec![None; bucket_count.max(MIN_BUCKET_COUNT)],
        }
    }

    fn bucket_of(&self, hash: u64) -> usize {
        bucket_index(hash, self.heads.len())
    }

    /// First entry equal to `q` between the head of `bucket` and the end of
    /// the chain.
    fn scan<Q>(&self, bucket: usize, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.chain
            .iter_from(self.heads[bucket])
            .find(|(_, e)| e.key.borrow() == q)
            .map(|(at, _)| at)
    }

    fn first_in_bucket(&self, from: Option<DefaultKey>, bucket: usize) -> Option<DefaultKey> {
        self.chain
            .iter_from(from)
            .find(|(_, e)| e.bucket == bucket)
            .map(|(at, _)| at)
    }

    /// Links a fresh entry as the new head of its bucket.
    fn link(&mut self, entry: Entry<K, V>) -> DefaultKey {
        let bucket = entry.bucket;
        let at = match self.heads[bucket] {
            Some(head) => self.chain.insert_before(head, entry),
            None => self.chain.push_front(entry),
        };
        self.heads[bucket] = Some(at);
        at
    }

    fn unlink(&mut self, at: DefaultKey) -> Option<(K, V)> {
        let next = self.chain.next(at);
        let entry = self.chain.remove(at)?;
        // Only the head moves; an interior member leaves the head valid.
        if self.heads[entry.bucket] == Some(at) {
            let successor = self.first_in_bucket(next, entry.bucket);
            self.heads[entry.bucket] = successor;
        }
        Some((entry.key, entry.value))
    }

    /// Squares the bucket count, clamped to [`MAX_BUCKET_COUNT`], and
    /// rebuilds every head. Entries keep their chain positions; the first
    /// one met for a bucket becomes its head. Leaves the index untouched
    /// when already at the cap or when the new index can't be allocated.
    fn grow(&mut self) {
        let old = self.heads.len();
        if old >= MAX_BUCKET_COUNT {
            return;
        }
        let count = old
            .checked_mul(old)
            .map_or(MAX_BUCKET_COUNT, |c| c.min(MAX_BUCKET_COUNT))
            .max(MIN_BUCKET_COUNT);
        let mut heads = Vec::new();
        if heads.try_reserve_exact(count).is_err() {
            return;
        }
        heads.resize(count, None);
        self.heads = heads;

        let mut cursor = self.chain.front();
        while let Some(at) = cursor {
            cursor = self.chain.next(at);
            let Some(entry) = self.chain.get_mut(at) else {
                break;
            };
            entry.bucket = bucket_index(entry.hash, count);
            self.heads[entry.bucket].get_or_insert(at);
        }
    }

    fn clear(&mut self) {
        self.chain.clear();
        self.heads.fill(None);
    }
}

/// Hash map whose buckets share one chain of entries.
///
/// `H` is the hash function (see [`KeyHasher`]); `K: Eq` is the only
/// requirement on keys beyond what `H` needs.
pub struct ChainHashMap<K, V, H = StdHasher> {
    hasher: H,
    table: Table<K, V>,
    max_load_factor: f64,
    reentrancy: DebugReentrancy,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InsertError {
    /// The key is already present; carries the untouched existing entry.
    DuplicateKey(Handle),
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::DuplicateKey(_) => f.write_str("key already present"),
        }
    }
}

impl std::error::Error for InsertError {}

impl<K, V> ChainHashMap<K, V> {
    pub fn new() -> Self {
        Self::with_hasher(StdHasher::default())
    }

    pub fn with_buckets(bucket_count: usize) -> Self {
        Self::with_buckets_and_hasher(bucket_count, StdHasher::default())
    }
}

impl<K, V> Default for ChainHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over entries in chain order.
pub struct Iter<'a, K, V> {
    it: chain::Iter<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let (at, e) = self.it.next()?;
        self.remaining -= 1;
        Some((Handle::new(at), &e.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over entries in chain order, with mutable values.
pub struct IterMut<'a, K, V> {
    it: chain::IterMut<'a, Entry<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (Handle, &'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(at, e)| (Handle::new(at), &e.key, &mut e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V, H> ChainHashMap<K, V, H> {
    pub fn with_hasher(hasher: H) -> Self {
        Self::with_buckets_and_hasher(DEFAULT_BUCKET_COUNT, hasher)
    }

    /// `bucket_count` below 2 is raised to 2 so growth by squaring always
    /// makes progress.
    pub fn with_buckets_and_hasher(bucket_count: usize, hasher: H) -> Self {
        Self {
            hasher,
            table: Table::with_buckets(bucket_count),
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.chain.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.table.heads.len()
    }

    /// Live entries per bucket.
    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.bucket_count() as f64
    }

    pub fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Sets the load factor at which the next insert squares the bucket
    /// count. Panics unless `value` is finite and positive.
    pub fn set_max_load_factor(&mut self, value: f64) {
        assert!(
            value.is_finite() && value > 0.0,
            "max load factor must be finite and positive, got {value}"
        );
        self.max_load_factor = value;
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Drops every entry. The bucket count is kept.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.table.clear();
    }

    /// Removes the entry behind `handle`. A stale handle yields `None`.
    pub fn remove(&mut self, handle: Handle) -> Option<(K, V)> {
        let _g = self.reentrancy.enter();
        self.table.unlink(handle.raw_handle())
    }

    pub(crate) fn handle_key(&self, h: Handle) -> Option<&K> {
        let _g = self.reentrancy.enter();
        self.table.chain.get(h.raw_handle()).map(|e| &e.key)
    }

    pub(crate) fn handle_value(&self, h: Handle) -> Option<&V> {
        let _g = self.reentrancy.enter();
        self.table.chain.get(h.raw_handle()).map(|e| &e.value)
    }

    pub(crate) fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        let _g = self.reentrancy.enter();
        self.table
            .chain
            .get_mut(h.raw_handle())
            .map(|e| &mut e.value)
    }

    /// Entries in chain order: within a bucket, most recently inserted
    /// first.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.table.chain.iter(),
            remaining: self.len(),
        }
    }

    /// Same order as [`iter`](Self::iter). Builds the order up front, so
    /// creating the iterator allocates.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.table.chain.iter_mut(),
        }
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> ChainStats {
        let mut runs = vec![0usize; self.bucket_count()];
        let mut stats = ChainStats {
            entries: self.len(),
            buckets: self.bucket_count(),
            ..ChainStats::default()
        };
        let mut current: Option<(usize, usize)> = None;
        for (_, e) in self.table.chain.iter() {
            current = match current {
                Some((bucket, len)) if bucket == e.bucket => Some((bucket, len + 1)),
                _ => {
                    runs[e.bucket] += 1;
                    Some((e.bucket, 1))
                }
            };
            if let Some((_, len)) = current {
                stats.longest_run = stats.longest_run.max(len);
            }
        }
        stats.occupied_buckets = runs.iter().filter(|&&r| r > 0).count();
        stats.fragmented_buckets = runs.iter().filter(|&&r| r > 1).count();
        stats
    }

    /// Every head is the earliest chain entry of its bucket and every
    /// cached bucket matches the cached hash.
    #[cfg(test)]
    pub(crate) fn heads_consistent(&self) -> bool {
        let count = self.bucket_count();
        let mut first: Vec<Option<DefaultKey>> = vec![None; count];
        for (at, e) in self.table.chain.iter() {
            if e.bucket >= count || e.bucket != bucket_index(e.hash, count) {
                return false;
            }
            first[e.bucket].get_or_insert(at);
        }
        first == self.table.heads
    }
}

/// Bucket and run layout, for tuning hash functions and load factors.
#[cfg(feature = "stats")]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChainStats {
    pub entries: usize,
    pub buckets: usize,
    pub occupied_buckets: usize,
    /// Buckets whose entries are split over more than one run.
    pub fragmented_buckets: usize,
    /// Longest stretch of consecutive chain entries from one bucket.
    pub longest_run: usize,
}

impl<K, V, H> ChainHashMap<K, V, H>
where
    K: Eq,
{
    /// Inserts `key` unless it is already present, in which case the
    /// existing entry is left untouched. Either way the returned handle
    /// names the entry now stored under `key`.
    pub fn insert(&mut self, key: K, value: V) -> Handle
    where
        H: KeyHasher<K>,
    {
        match self.try_insert(key, value) {
            Ok(h) | Err(InsertError::DuplicateKey(h)) => h,
        }
    }

    pub fn try_insert(&mut self, key: K, value: V) -> Result<Handle, InsertError>
    where
        H: KeyHasher<K>,
    {
        self.insert_with(key, move || value)
    }

    /// Like `try_insert`, but `make` only runs when `key` is new.
    ///
    /// Growth is checked before the duplicate scan, so a rejected insert
    /// can still square the bucket count.
    pub fn insert_with<F>(&mut self, key: K, make: F) -> Result<Handle, InsertError>
    where
        H: KeyHasher<K>,
        F: FnOnce() -> V,
    {
        let _g = self.reentrancy.enter();
        if self.load_factor() >= self.max_load_factor {
            self.table.grow();
        }

        let hash = self.hasher.hash_key(&key);
        let bucket = self.table.bucket_of(hash);
        if self.table.heads[bucket].is_some() {
            if let Some(existing) = self.table.scan(bucket, &key) {
                return Err(InsertError::DuplicateKey(Handle::new(existing)));
            }
        }
        let at = self.table.link(Entry {
            key,
            value: make(),
            hash,
            bucket,
        });
        Ok(Handle::new(at))
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        let _g = self.reentrancy.enter();
        let bucket = self.table.bucket_of(self.hasher.hash_key(q));
        self.table.scan(bucket, q).map(Handle::new)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        self.find(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        let h = self.find(q)?;
        self.handle_value(h)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        let h = self.find(q)?;
        self.handle_value_mut(h)
    }

    /// Removes `q`'s entry and returns it, or `None` if `q` is absent.
    pub fn erase<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        let _g = self.reentrancy.enter();
        let bucket = self.table.bucket_of(self.hasher.hash_key(q));
        let at = self.table.scan(bucket, q)?;
        self.table.unlink(at)
    }
}

impl<K, Q, V, H> Index<&Q> for ChainHashMap<K, V, H>
where
    K: Eq + Borrow<Q>,
    Q: ?Sized + Eq,
    H: KeyHasher<Q>,
{
    type Output = V;

    /// Panics if `key` is absent.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found")
    }
}

impl<K, Q, V, H> IndexMut<&Q> for ChainHashMap<K, V, H>
where
    K: Eq + Borrow<Q>,
    Q: ?Sized + Eq,
    H: KeyHasher<Q>,
{
    /// Panics if `key` is absent; insert first.
    fn index_mut(&mut self, key: &Q) -> &mut V {
        self.get_mut(key).expect("key not found")
    }
}

impl<'a, K, V, H> IntoIterator for &'a ChainHashMap<K, V, H> {
    type Item = (Handle, &'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, H> IntoIterator for &'a mut ChainHashMap<K, V, H> {
    type Item = (Handle, &'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Duplicate keys keep their first value.
impl<K, V, H> Extend<(K, V)> for ChainHashMap<K, V, H>
where
    K: Eq,
    H: KeyHasher<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ChainHashMap<K, V>
where
    K: Eq + core::hash::Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::new();
        m.extend(iter);
        m
    }
}

impl<K: Clone, V: Clone, H: Clone> Clone for ChainHashMap<K, V, H> {
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            table: self.table.clone(),
            max_load_factor: self.max_load_factor,
            reentrancy: DebugReentrancy::new(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H> fmt::Debug for ChainHashMap<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(_, k, v)| (k, v)))
            .finish()
    }
}

/// One block per entry in chain order: key, value, and cached bucket.
impl<K: fmt::Display, V: fmt::Display, H> fmt::Display for ChainHashMap<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, e) in self.table.chain.iter() {
            writeln!(f, "key: {}", e.key)?;
            writeln!(f, "value: {}", e.value)?;
            writeln!(f, "bucket: {}", e.bucket)?;
            writeln!(f, "{ENTRY_RULE}")?;
        }
        Ok(())
    }
}
