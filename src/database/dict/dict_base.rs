use std::{
    borrow::Borrow,
    cell::Cell,
    fmt,
    hash::{BuildHasher, Hash},
    mem,
    rc::Rc,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};

use super::{
    hash::SeededState,
    iter::{DictIter, SafeIter},
};
use crate::{database::oom, error::DictError};

/// Initial table size (a power of two).
pub const DICT_HT_INITIAL_SIZE: usize = 4;

/// Above this fill ratio the table grows even when resizing is avoided.
pub const DICT_FORCE_RESIZE_RATIO: usize = 5;

/// Buckets migrated per batch by `rehash_milliseconds`.
const REHASH_MS_BATCH: usize = 100;

/// `clear_with` invokes its callback once every this many buckets.
const CLEAR_CALLBACK_PERIOD: usize = 65_536;

new_key_type! {
    /// Handle of a stored entry. Stays valid until the entry is deleted,
    /// including across rehashing.
    pub struct EntryId;
}

/// Whether a table may grow or shrink freely.
///
/// `Avoid` is used while a snapshot process shares memory pages with the
/// server: growth then only happens once the fill ratio exceeds
/// [`DICT_FORCE_RESIZE_RATIO`] and shrinking is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizePolicy {
    #[default]
    Enable,
    Avoid,
}

/// One element of a collision chain.
#[derive(Debug, Clone)]
pub(super) struct Entry<K, V> {
    pub(super) key: K,
    pub(super) val: V,
    pub(super) next: Option<EntryId>,
}

/// One generation of the table: buckets holding chain heads.
#[derive(Debug, Clone, Default)]
pub(super) struct HashTable {
    pub(super) buckets: Vec<Option<EntryId>>,
    pub(super) size_mask: usize,
    pub(super) used: usize,
    /// Distinguishes successive allocations in the fingerprint.
    pub(super) generation: u64,
}

/// Chained hash table with incremental rehashing.
///
/// Invariants:
/// - `rehash_idx == -1`: `ht[1]` is empty and every entry lives in `ht[0]`.
/// - `rehash_idx >= 0`: buckets of `ht[0]` below `rehash_idx` are empty, the
///   rest of the entries are split between both tables, each key in exactly
///   one of them.
/// - `len() == ht[0].used + ht[1].used`.
/// - Table sizes are zero or a power of two.
///
/// Lookups, inserts and deletes each migrate one bucket while rehashing,
/// unless a safe iterator is alive.
pub struct Dict<K, V, S = SeededState> {
    pub(super) entries: SlotMap<EntryId, Entry<K, V>>,
    pub(super) ht: [HashTable; 2],
    pub(super) rehash_idx: isize,
    pub(super) iterators: Rc<Cell<usize>>,
    resize_policy: ResizePolicy,
    hasher: S,
    rng: fastrand::Rng,
    generations: u64,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl HashTable {
    #[inline]
    pub(super) fn size(&self) -> usize {
        self.buckets.len()
    }

    fn with_size(
        size: usize,
        generation: u64,
    ) -> Self {
        let mut buckets = Vec::new();
        oom::reserve_or_abort(&mut buckets, size);
        buckets.resize(size, None);
        HashTable {
            buckets,
            size_mask: size - 1,
            used: 0,
            generation,
        }
    }
}

impl<K, V> Dict<K, V, SeededState>
where
    K: Hash + Eq,
{
    /// Creates an empty table using the process-wide hash seed.
    pub fn new() -> Self {
        Self::with_hasher(SeededState::default())
    }
}

impl<K, V, S> Dict<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty table. No buckets are allocated until the first
    /// insert.
    pub fn with_hasher(hasher: S) -> Self {
        Dict {
            entries: SlotMap::with_key(),
            ht: [HashTable::default(), HashTable::default()],
            rehash_idx: -1,
            iterators: Rc::new(Cell::new(0)),
            resize_policy: ResizePolicy::default(),
            hasher,
            rng: fastrand::Rng::new(),
            generations: 0,
        }
    }

    /// Replaces the random source used by sampling, for reproducible runs.
    pub fn with_rng(
        mut self,
        rng: fastrand::Rng,
    ) -> Self {
        self.rng = rng;
        self
    }

    pub fn set_resize_policy(
        &mut self,
        policy: ResizePolicy,
    ) {
        self.resize_policy = policy;
    }

    pub fn resize_policy(&self) -> ResizePolicy {
        self.resize_policy
    }

    /// Number of stored entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.ht[0].used + self.ht[1].used
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of buckets over both tables.
    #[inline]
    pub fn slots(&self) -> usize {
        self.ht[0].size() + self.ht[1].size()
    }

    #[inline]
    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx != -1
    }

    /// Next bucket of the old table to migrate, `-1` when idle.
    #[inline]
    pub fn rehash_index(&self) -> isize {
        self.rehash_idx
    }

    /// Bucket count of table `0` or `1`.
    pub fn table_size(
        &self,
        table: usize,
    ) -> usize {
        self.ht[table].size()
    }

    /// Number of safe iterators currently alive.
    pub fn safe_iterators(&self) -> usize {
        self.iterators.get()
    }

    ////////////////////////////////////////////////////////////////////////////
    // Insertion
    ////////////////////////////////////////////////////////////////////////////

    /// Inserts a new entry. Fails if the key is already present.
    pub fn add(
        &mut self,
        key: K,
        val: V,
    ) -> Result<EntryId, DictError> {
        self.rehash_step();
        let hash = self.hasher.hash_one(&key);
        if self.locate(hash, &key).is_some() {
            return Err(DictError::KeyExists);
        }
        Ok(self.insert_new(hash, key, val))
    }

    /// Inserts a key with a default value and returns its handle so the
    /// caller can fill the value in place.
    pub fn add_raw(
        &mut self,
        key: K,
    ) -> Result<EntryId, DictError>
    where
        V: Default,
    {
        self.add(key, V::default())
    }

    /// Inserts or overwrites. Returns `true` if the key was new.
    ///
    /// The old value is dropped only after the new one is in place, so a
    /// value may be replaced by something derived from itself.
    pub fn replace(
        &mut self,
        key: K,
        val: V,
    ) -> bool {
        self.rehash_step();
        let hash = self.hasher.hash_one(&key);
        match self.locate(hash, &key) {
            Some(id) => {
                let old = mem::replace(&mut self.entries[id].val, val);
                drop(old);
                false
            }
            None => {
                self.insert_new(hash, key, val);
                true
            }
        }
    }

    /// Returns the entry for `key`, inserting one with a default value if
    /// absent.
    pub fn replace_raw(
        &mut self,
        key: K,
    ) -> EntryId
    where
        V: Default,
    {
        self.rehash_step();
        let hash = self.hasher.hash_one(&key);
        match self.locate(hash, &key) {
            Some(id) => id,
            None => self.insert_new(hash, key, V::default()),
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    // Lookup
    ////////////////////////////////////////////////////////////////////////////

    /// Finds the entry holding `key`, taking one rehash step first.
    pub fn find<Q>(
        &mut self,
        key: &Q,
    ) -> Option<EntryId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.is_empty() {
            return None;
        }
        self.rehash_step();
        let hash = self.hasher.hash_one(key);
        self.locate(hash, key)
    }

    /// Value for `key`, taking one rehash step first.
    pub fn fetch_value<Q>(
        &mut self,
        key: &Q,
    ) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.find(key)?;
        self.val(id)
    }

    /// Read-only lookup; never advances rehashing.
    pub fn get<Q>(
        &self,
        key: &Q,
    ) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.is_empty() {
            return None;
        }
        let hash = self.hasher.hash_one(key);
        self.locate(hash, key).map(|id| &self.entries[id].val)
    }

    pub fn get_mut<Q>(
        &mut self,
        key: &Q,
    ) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.find(key)?;
        self.val_mut(id)
    }

    pub fn contains_key<Q>(
        &self,
        key: &Q,
    ) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    #[inline]
    pub fn key(
        &self,
        id: EntryId,
    ) -> Option<&K> {
        self.entries.get(id).map(|e| &e.key)
    }

    #[inline]
    pub fn val(
        &self,
        id: EntryId,
    ) -> Option<&V> {
        self.entries.get(id).map(|e| &e.val)
    }

    #[inline]
    pub fn val_mut(
        &mut self,
        id: EntryId,
    ) -> Option<&mut V> {
        self.entries.get_mut(id).map(|e| &mut e.val)
    }

    /// Key and value of an entry.
    pub fn entry(
        &self,
        id: EntryId,
    ) -> Option<(&K, &V)> {
        self.entries.get(id).map(|e| (&e.key, &e.val))
    }

    /// Overwrites the value of an entry, returning the previous one.
    pub fn set_val(
        &mut self,
        id: EntryId,
        val: V,
    ) -> Option<V> {
        self.entries
            .get_mut(id)
            .map(|e| mem::replace(&mut e.val, val))
    }

    ////////////////////////////////////////////////////////////////////////////
    // Removal
    ////////////////////////////////////////////////////////////////////////////

    /// Removes `key` and drops its key and value.
    pub fn delete<Q>(
        &mut self,
        key: &Q,
    ) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.delete_no_free(key).is_some()
    }

    /// Unlinks `key` and hands the key and value back to the caller.
    pub fn delete_no_free<Q>(
        &mut self,
        key: &Q,
    ) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.is_empty() {
            return None;
        }
        self.rehash_step();
        let hash = self.hasher.hash_one(key);

        for t in 0..=1 {
            if self.ht[t].size() == 0 {
                continue;
            }
            let slot = hash as usize & self.ht[t].size_mask;
            let mut prev: Option<EntryId> = None;
            let mut cur = self.ht[t].buckets[slot];
            while let Some(id) = cur {
                let entry = &self.entries[id];
                let next = entry.next;
                if <K as Borrow<Q>>::borrow(&entry.key) == key {
                    match prev {
                        Some(p) => self.entries[p].next = next,
                        None => self.ht[t].buckets[slot] = next,
                    }
                    self.ht[t].used -= 1;
                    return self.entries.remove(id).map(|e| (e.key, e.val));
                }
                prev = Some(id);
                cur = next;
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    /// Drops every entry and releases both tables.
    pub fn clear(&mut self) {
        self.clear_with(|| {});
    }

    /// Like [`clear`](Self::clear), calling `callback` every 65536 buckets
    /// so a long release can keep serving other work.
    pub fn clear_with<F>(
        &mut self,
        mut callback: F,
    ) where
        F: FnMut(),
    {
        for t in 0..=1 {
            let table = mem::take(&mut self.ht[t]);
            for (i, head) in table.buckets.into_iter().enumerate() {
                if i % CLEAR_CALLBACK_PERIOD == 0 {
                    callback();
                }
                let mut cur = head;
                while let Some(id) = cur {
                    cur = self.entries.remove(id).and_then(|e| e.next);
                }
            }
        }
        self.entries.clear();
        self.rehash_idx = -1;
    }

    ////////////////////////////////////////////////////////////////////////////
    // Resizing
    ////////////////////////////////////////////////////////////////////////////

    /// Grows (or first allocates) the table to hold `size` entries at the
    /// next power of two.
    ///
    /// The first allocation goes straight to `ht[0]`; afterwards the new
    /// table becomes `ht[1]` and incremental rehashing starts.
    pub fn expand(
        &mut self,
        size: usize,
    ) -> Result<(), DictError> {
        if self.is_rehashing() {
            return Err(DictError::Rehashing);
        }
        if self.ht[0].used > size {
            return Err(DictError::TooSmall {
                used: self.ht[0].used,
                requested: size,
            });
        }
        let real_size = next_power(size);
        if real_size == self.ht[0].size() {
            return Err(DictError::SameSize { size: real_size });
        }

        self.generations += 1;
        let table = HashTable::with_size(real_size, self.generations);
        if self.ht[0].size() == 0 {
            self.ht[0] = table;
            return Ok(());
        }

        debug!(
            from = self.ht[0].size(),
            to = real_size,
            used = self.ht[0].used,
            "dict rehash started"
        );
        self.ht[1] = table;
        self.rehash_idx = 0;
        Ok(())
    }

    /// Shrinks the table to the smallest size holding every entry with a
    /// fill ratio of at most 1.
    pub fn resize(&mut self) -> Result<(), DictError> {
        if self.resize_policy == ResizePolicy::Avoid {
            return Err(DictError::ResizeDisabled);
        }
        if self.is_rehashing() {
            return Err(DictError::Rehashing);
        }
        let minimal = self.ht[0].used.max(DICT_HT_INITIAL_SIZE);
        self.expand(minimal)
    }

    /// Migrates up to `n` non-empty buckets from the old table to the new
    /// one. Returns `true` while there is still work left.
    ///
    /// At most `10 * n` empty buckets are visited per call. Nothing happens
    /// while a safe iterator is alive.
    pub fn rehash(
        &mut self,
        n: usize,
    ) -> bool {
        if !self.is_rehashing() {
            return false;
        }
        if self.iterators.get() > 0 {
            return true;
        }

        let mut empty_visits = n.saturating_mul(10);
        let mut n = n;
        while n > 0 && self.ht[0].used != 0 {
            n -= 1;
            let mut idx = self.rehash_idx as usize;
            debug_assert!(idx < self.ht[0].size());
            while self.ht[0].buckets[idx].is_none() {
                idx += 1;
                self.rehash_idx += 1;
                empty_visits -= 1;
                if empty_visits == 0 {
                    return true;
                }
            }

            let mut cur = self.ht[0].buckets[idx].take();
            while let Some(id) = cur {
                let hash = self.hasher.hash_one(&self.entries[id].key);
                let slot = hash as usize & self.ht[1].size_mask;
                let entry = &mut self.entries[id];
                cur = entry.next;
                entry.next = self.ht[1].buckets[slot];
                self.ht[1].buckets[slot] = Some(id);
                self.ht[0].used -= 1;
                self.ht[1].used += 1;
            }
            self.rehash_idx += 1;
        }

        if self.ht[0].used == 0 {
            self.ht[0] = mem::take(&mut self.ht[1]);
            self.rehash_idx = -1;
            debug!(size = self.ht[0].size(), used = self.ht[0].used, "dict rehash finished");
            return false;
        }
        true
    }

    /// Rehashes in batches of 100 buckets until done or until `ms`
    /// milliseconds elapsed. Returns the number of buckets processed.
    pub fn rehash_milliseconds(
        &mut self,
        ms: u64,
    ) -> usize {
        if self.iterators.get() > 0 {
            return 0;
        }
        let start = Instant::now();
        let budget = Duration::from_millis(ms);
        let mut rehashes = 0;
        while self.rehash(REHASH_MS_BATCH) {
            rehashes += REHASH_MS_BATCH;
            if start.elapsed() > budget {
                break;
            }
        }
        rehashes
    }

    ////////////////////////////////////////////////////////////////////////////
    // Sampling
    ////////////////////////////////////////////////////////////////////////////

    /// A random entry: a random non-empty bucket first, then a random
    /// position in its chain.
    ///
    /// Entries in short chains are more likely to be picked than entries in
    /// long ones.
    pub fn random_key(&mut self) -> Option<EntryId> {
        if self.is_empty() {
            return None;
        }
        self.rehash_step();

        let head = if self.is_rehashing() {
            let s0 = self.ht[0].size();
            let s1 = self.ht[1].size();
            let from = self.rehash_idx as usize;
            loop {
                // Buckets of ht[0] below rehash_idx are known to be empty.
                let h = from + self.rng.usize(..s0 + s1 - from);
                let bucket = if h >= s0 {
                    self.ht[1].buckets[h - s0]
                } else {
                    self.ht[0].buckets[h]
                };
                if let Some(id) = bucket {
                    break id;
                }
            }
        } else {
            loop {
                let h = self.rng.u64(..) as usize & self.ht[0].size_mask;
                if let Some(id) = self.ht[0].buckets[h] {
                    break id;
                }
            }
        };

        let chain_len = self.chain(Some(head)).count();
        let pick = self.rng.usize(..chain_len);
        self.chain(Some(head)).nth(pick)
    }

    /// Up to `count` entries sampled from consecutive buckets starting at a
    /// random index. Faster than calling [`random_key`](Self::random_key)
    /// repeatedly but neither uniform nor free of duplicates across calls.
    ///
    /// Gives up after `10 * count` steps, so fewer entries may be returned.
    pub fn get_some_keys(
        &mut self,
        count: usize,
    ) -> Vec<EntryId> {
        let count = count.min(self.len());
        let mut out = Vec::with_capacity(count);
        if count == 0 {
            return out;
        }
        let mut max_steps = count * 10;

        for _ in 0..count {
            if !self.is_rehashing() {
                break;
            }
            self.rehash_step();
        }

        let tables = if self.is_rehashing() { 2 } else { 1 };
        let mut max_mask = self.ht[0].size_mask;
        if tables > 1 && self.ht[1].size_mask > max_mask {
            max_mask = self.ht[1].size_mask;
        }

        let mut i = self.rng.u64(..) as usize & max_mask;
        let mut empty_len = 0;
        while out.len() < count && max_steps > 0 {
            max_steps -= 1;
            for j in 0..tables {
                if tables == 2 && j == 0 && i < self.rehash_idx as usize {
                    // ht[0] is already emptied below rehash_idx. If `i` is also
                    // beyond ht[1], jump straight to the first live index.
                    if i >= self.ht[1].size() {
                        i = self.rehash_idx as usize;
                    } else {
                        continue;
                    }
                }
                if i >= self.ht[j].size() {
                    continue;
                }
                match self.ht[j].buckets[i] {
                    None => {
                        empty_len += 1;
                        if empty_len >= 5 && empty_len > count {
                            i = self.rng.u64(..) as usize & max_mask;
                            empty_len = 0;
                        }
                    }
                    Some(head) => {
                        empty_len = 0;
                        let mut cur = Some(head);
                        while let Some(id) = cur {
                            out.push(id);
                            if out.len() == count {
                                return out;
                            }
                            cur = self.entries[id].next;
                        }
                    }
                }
            }
            i = (i + 1) & max_mask;
        }
        out
    }

    ////////////////////////////////////////////////////////////////////////////
    // Iteration
    ////////////////////////////////////////////////////////////////////////////

    /// Borrowing iterator. The table cannot change while it is alive.
    pub fn iter(&self) -> DictIter<'_, K, V, S> {
        DictIter::new(self)
    }

    /// Every value, in storage order rather than bucket order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.entries.values_mut().map(|e| &mut e.val)
    }

    /// Detached iterator that tolerates mutation of the table between
    /// calls to [`SafeIter::next`]. Rehashing is paused while it lives.
    pub fn safe_iter(&self) -> SafeIter {
        SafeIter::new(Rc::clone(&self.iterators))
    }

    /// Visits the buckets addressed by `cursor` and returns the next cursor;
    /// `0` means the scan is complete.
    ///
    /// The cursor is advanced on its reversed bits, so an element present
    /// from the start to the end of a scan is reported at least once even if
    /// the table grows or shrinks in between. Elements may be reported more
    /// than once.
    pub fn scan<F>(
        &self,
        cursor: u64,
        mut f: F,
    ) -> u64
    where
        F: FnMut(&K, &V),
    {
        if self.is_empty() {
            return 0;
        }
        let mut v = cursor;
        let m0;

        if !self.is_rehashing() {
            let t0 = &self.ht[0];
            m0 = t0.size_mask as u64;
            self.emit_bucket(t0, (v & m0) as usize, &mut f);
        } else {
            let (t0, t1) = if self.ht[0].size() > self.ht[1].size() {
                (&self.ht[1], &self.ht[0])
            } else {
                (&self.ht[0], &self.ht[1])
            };
            m0 = t0.size_mask as u64;
            let m1 = t1.size_mask as u64;

            self.emit_bucket(t0, (v & m0) as usize, &mut f);
            // Every bucket of the larger table that expands the small one.
            loop {
                self.emit_bucket(t1, (v & m1) as usize, &mut f);
                v = ((v | m0).wrapping_add(1) & !m0) | (v & m0);
                if v & (m0 ^ m1) == 0 {
                    break;
                }
            }
        }

        v |= !m0;
        v = v.reverse_bits();
        v = v.wrapping_add(1);
        v.reverse_bits()
    }

    /// Structural checksum over table generations, sizes and counts.
    ///
    /// Two equal fingerprints taken around an operation mean the table
    /// layout was not touched in between.
    pub fn fingerprint(&self) -> u64 {
        let parts = [
            self.ht[0].generation,
            self.ht[0].size() as u64,
            self.ht[0].used as u64,
            self.ht[1].generation,
            self.ht[1].size() as u64,
            self.ht[1].used as u64,
        ];
        let mut hash: u64 = 0;
        for part in parts {
            hash = hash.wrapping_add(part);
            hash = (!hash).wrapping_add(hash << 21);
            hash ^= hash >> 24;
            hash = hash.wrapping_add(hash << 3).wrapping_add(hash << 8);
            hash ^= hash >> 14;
            hash = hash.wrapping_add(hash << 2).wrapping_add(hash << 4);
            hash ^= hash >> 28;
            hash = hash.wrapping_add(hash << 31);
        }
        hash
    }

    ////////////////////////////////////////////////////////////////////////////
    // Internals
    ////////////////////////////////////////////////////////////////////////////

    /// One rehash step, skipped while safe iterators are alive.
    #[inline]
    fn rehash_step(&mut self) {
        if self.is_rehashing() {
            self.rehash(1);
        }
    }

    fn expand_if_needed(&mut self) {
        if self.is_rehashing() {
            return;
        }
        let size = self.ht[0].size();
        let used = self.ht[0].used;
        let wanted = if size == 0 {
            Some(DICT_HT_INITIAL_SIZE)
        } else if used >= size
            && (self.resize_policy == ResizePolicy::Enable
                || used / size > DICT_FORCE_RESIZE_RATIO)
        {
            Some(used * 2)
        } else {
            None
        };
        if let Some(target) = wanted {
            if let Err(err) = self.expand(target) {
                trace!(%err, target, "dict expand refused");
            }
        }
    }

    /// Links a key known to be absent at the head of its chain.
    fn insert_new(
        &mut self,
        hash: u64,
        key: K,
        val: V,
    ) -> EntryId {
        self.expand_if_needed();
        let t = if self.is_rehashing() { 1 } else { 0 };
        let slot = hash as usize & self.ht[t].size_mask;
        let next = self.ht[t].buckets[slot];
        let id = self.entries.insert(Entry { key, val, next });
        self.ht[t].buckets[slot] = Some(id);
        self.ht[t].used += 1;
        id
    }

    fn locate<Q>(
        &self,
        hash: u64,
        key: &Q,
    ) -> Option<EntryId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        for t in 0..=1 {
            let table = &self.ht[t];
            if table.size() != 0 {
                let slot = hash as usize & table.size_mask;
                let found = self
                    .chain(table.buckets[slot])
                    .find(|&id| <K as Borrow<Q>>::borrow(&self.entries[id].key) == key);
                if found.is_some() {
                    return found;
                }
            }
            if !self.is_rehashing() {
                break;
            }
        }
        None
    }

    /// Walks a collision chain from its head.
    pub(super) fn chain(
        &self,
        head: Option<EntryId>,
    ) -> impl Iterator<Item = EntryId> + '_ {
        std::iter::successors(head, move |&id| self.entries[id].next)
    }

    fn emit_bucket<F>(
        &self,
        table: &HashTable,
        idx: usize,
        f: &mut F,
    ) where
        F: FnMut(&K, &V),
    {
        for id in self.chain(table.buckets[idx]) {
            let e = &self.entries[id];
            f(&e.key, &e.val);
        }
    }
}

/// Smallest power of two `>= size`, at least the initial table size.
fn next_power(size: usize) -> usize {
    size.max(DICT_HT_INITIAL_SIZE)
        .checked_next_power_of_two()
        .unwrap_or(1 << (usize::BITS - 1))
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl<K, V> Default for Dict<K, V, SeededState>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> fmt::Debug for Dict<K, V, S>
where
    K: Hash + Eq + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for Dict<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(
        &mut self,
        iter: I,
    ) {
        for (k, v) in iter {
            self.replace(k, v);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Dict<K, V, SeededState>
where
    K: Hash + Eq,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut d = Dict::new();
        d.extend(iter);
        d
    }
}

impl<'a, K, V, S> IntoIterator for &'a Dict<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = DictIter<'a, K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
