use std::time::{SystemTime, UNIX_EPOCH};

use cachedb_error::StorageError;
use tracing::{debug, trace};

use super::MaxmemoryPolicy;
use crate::{
    config::EngineConfig,
    database::{
        dict::{Dict, ResizePolicy, DICT_HT_INITIAL_SIZE},
        object::{EncodingConfig, Value},
        sds::Sds,
    },
};

/// Tables whose fill drops below this percentage are shrunk by `cron`.
const HT_MIN_FILL: usize = 10;

/// Counters kept by a [`Db`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbStats {
    pub expired_keys: u64,
    pub evicted_keys: u64,
    pub keyspace_hits: u64,
    pub keyspace_misses: u64,
}

/// One keyspace: the main table from key to value plus a table from volatile
/// key to its absolute expiry time in milliseconds.
///
/// Every key in `expires` is also in the main table. Expired keys are
/// removed lazily when touched and actively by [`Db::cron`].
pub struct Db {
    dict: Dict<Sds, Value>,
    expires: Dict<Sds, i64>,
    engine: EngineConfig,
    encoding: EncodingConfig,
    clock: Box<dyn Fn() -> i64>,
    stats: DbStats,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl Db {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default(), EncodingConfig::default())
    }

    pub fn with_config(
        engine: EngineConfig,
        encoding: EncodingConfig,
    ) -> Self {
        let mut db = Db {
            dict: Dict::new(),
            expires: Dict::new(),
            engine,
            encoding,
            clock: Box::new(unix_time_ms),
            stats: DbStats::default(),
        };
        db.set_resize_policy(db.engine.resize_policy);
        db
    }

    /// Replaces the millisecond clock used for lazy expiry.
    pub fn with_clock<F>(
        mut self,
        clock: F,
    ) -> Self
    where
        F: Fn() -> i64 + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    #[inline]
    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    pub fn encoding_config(&self) -> &EncodingConfig {
        &self.encoding
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn stats(&self) -> DbStats {
        self.stats
    }

    /// Number of keys, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// Number of keys carrying a TTL.
    pub fn volatile_len(&self) -> usize {
        self.expires.len()
    }

    pub fn keyspace(&self) -> &Dict<Sds, Value> {
        &self.dict
    }

    ////////////////////////////////////////////////////////////////////////////
    // Keyspace
    ////////////////////////////////////////////////////////////////////////////

    /// Stores a new key. Fails if the key is live.
    pub fn add(
        &mut self,
        key: Sds,
        mut value: Value,
    ) -> Result<(), StorageError> {
        self.expire_if_needed(key.as_bytes());
        let name = lossy(key.as_bytes());
        value.set_resize_policy(self.encoding.resize_policy);
        self.dict
            .add(key, value)
            .map(|_| ())
            .map_err(|_| StorageError::KeyExists { key: name })
    }

    /// Replaces the value of a live key, keeping its TTL.
    pub fn overwrite(
        &mut self,
        key: &[u8],
        value: Value,
    ) -> Result<(), StorageError> {
        self.expire_if_needed(key);
        let policy = self.encoding.resize_policy;
        match self.dict.get_mut(key) {
            Some(slot) => {
                *slot = value;
                slot.set_resize_policy(policy);
                Ok(())
            }
            None => Err(StorageError::KeyNotFound { key: lossy(key) }),
        }
    }

    /// Adds or overwrites `key` and drops any TTL it had.
    pub fn set(
        &mut self,
        key: Sds,
        mut value: Value,
    ) {
        value.set_resize_policy(self.encoding.resize_policy);
        self.expires.delete(key.as_bytes());
        self.dict.replace(key, value);
    }

    /// Value of a live key, counting the hit or miss.
    pub fn lookup(
        &mut self,
        key: &[u8],
    ) -> Option<&Value> {
        self.expire_if_needed(key);
        match self.dict.find(key) {
            Some(id) => {
                self.stats.keyspace_hits += 1;
                self.dict.val(id)
            }
            None => {
                self.stats.keyspace_misses += 1;
                None
            }
        }
    }

    pub fn lookup_mut(
        &mut self,
        key: &[u8],
    ) -> Option<&mut Value> {
        self.expire_if_needed(key);
        match self.dict.find(key) {
            Some(id) => {
                self.stats.keyspace_hits += 1;
                self.dict.val_mut(id)
            }
            None => {
                self.stats.keyspace_misses += 1;
                None
            }
        }
    }

    /// Removes `key` and its TTL. Returns `true` if it existed.
    pub fn delete(
        &mut self,
        key: &[u8],
    ) -> bool {
        self.expire_if_needed(key);
        self.expires.delete(key);
        self.dict.delete(key)
    }

    pub fn exists(
        &mut self,
        key: &[u8],
    ) -> bool {
        self.expire_if_needed(key);
        self.dict.contains_key(key)
    }

    /// A random live key. Expired keys met on the way are reclaimed.
    pub fn random_key(&mut self) -> Option<Sds> {
        loop {
            let id = self.dict.random_key()?;
            let key = self.dict.key(id)?.clone();
            if self.expire_if_needed(key.as_bytes()) {
                continue;
            }
            return Some(key);
        }
    }

    /// Calls `f` with every key, its value and its expiry time.
    ///
    /// Walks through a safe iterator, so the keyspace is not rehashed while
    /// the walk is in progress.
    pub fn walk<F>(
        &self,
        mut f: F,
    ) where
        F: FnMut(&Sds, &Value, Option<i64>),
    {
        let mut it = self.dict.safe_iter();
        while let Some(id) = it.next(&self.dict) {
            if let Some((key, value)) = self.dict.entry(id) {
                f(key, value, self.expires.get(key.as_bytes()).copied());
            }
        }
    }

    /// One step of a cursor based scan over the keyspace; see
    /// [`Dict::scan`].
    pub fn scan<F>(
        &self,
        cursor: u64,
        f: F,
    ) -> u64
    where
        F: FnMut(&Sds, &Value),
    {
        self.dict.scan(cursor, f)
    }

    /// Drops every key.
    pub fn flush(&mut self) -> usize {
        let removed = self.dict.len();
        self.dict.clear();
        self.expires.clear();
        removed
    }

    ////////////////////////////////////////////////////////////////////////////
    // Expiry
    ////////////////////////////////////////////////////////////////////////////

    /// Sets the absolute expiry time of a live key. A key already past its
    /// deadline is reclaimed first and reported missing.
    pub fn set_expire(
        &mut self,
        key: &[u8],
        when_ms: i64,
    ) -> Result<(), StorageError> {
        self.expire_if_needed(key);
        let id = self
            .dict
            .find(key)
            .ok_or_else(|| StorageError::KeyNotFound { key: lossy(key) })?;
        let owned = self
            .dict
            .key(id)
            .cloned()
            .ok_or_else(|| StorageError::KeyNotFound { key: lossy(key) })?;
        self.expires.replace(owned, when_ms);
        Ok(())
    }

    /// Deadline of a live key, `None` for persistent or missing keys.
    pub fn get_expire(
        &mut self,
        key: &[u8],
    ) -> Option<i64> {
        self.expire_if_needed(key);
        self.expires.get(key).copied()
    }

    /// Makes `key` persistent. Returns `true` if it had a TTL.
    pub fn remove_expire(
        &mut self,
        key: &[u8],
    ) -> bool {
        self.expire_if_needed(key);
        self.expires.delete(key)
    }

    /// Deletes `key` if its expiry time has passed. Returns `true` if it was
    /// deleted.
    pub fn expire_if_needed(
        &mut self,
        key: &[u8],
    ) -> bool {
        let Some(&when) = self.expires.get(key) else {
            return false;
        };
        if self.now() <= when {
            return false;
        }
        self.stats.expired_keys += 1;
        trace!(key = %String::from_utf8_lossy(key), "lazily expired");
        self.delete(key)
    }

    /// Samples up to `samples` volatile keys and deletes the expired ones,
    /// repeating while more than a quarter of a sample was expired. Returns
    /// how many keys were deleted.
    pub fn active_expire_cycle(
        &mut self,
        now: i64,
        samples: usize,
    ) -> usize {
        let mut total = 0;
        loop {
            if self.expires.is_empty() || samples == 0 {
                break;
            }
            let picked: Vec<(Sds, i64)> = self
                .expires
                .get_some_keys(samples)
                .into_iter()
                .filter_map(|id| self.expires.entry(id).map(|(k, &w)| (k.clone(), w)))
                .collect();

            let mut expired = 0;
            for (key, when) in picked {
                if now > when && self.delete(key.as_bytes()) {
                    expired += 1;
                }
            }
            self.stats.expired_keys += expired as u64;
            total += expired;
            if expired <= samples / 4 {
                break;
            }
        }
        if total > 0 {
            debug!(expired = total, "active expire cycle");
        }
        total
    }

    ////////////////////////////////////////////////////////////////////////////
    // Eviction
    ////////////////////////////////////////////////////////////////////////////

    /// Evicts one key chosen by `policy`. Returns the evicted key, or `None`
    /// when no key qualifies.
    pub fn evict_one(
        &mut self,
        policy: MaxmemoryPolicy,
    ) -> Result<Option<Sds>, StorageError> {
        let victim = match policy {
            MaxmemoryPolicy::NoEviction => return Err(StorageError::MaxMemoryReached),
            MaxmemoryPolicy::AllkeysRandom => self
                .dict
                .random_key()
                .and_then(|id| self.dict.key(id).cloned()),
            MaxmemoryPolicy::VolatileRandom => self
                .expires
                .random_key()
                .and_then(|id| self.expires.key(id).cloned()),
            MaxmemoryPolicy::VolatileTtl => {
                let mut best: Option<(Sds, i64)> = None;
                for _ in 0..self.engine.maxmemory_samples {
                    let Some(id) = self.expires.random_key() else {
                        break;
                    };
                    if let Some((k, &when)) = self.expires.entry(id) {
                        if best.as_ref().map_or(true, |(_, b)| when < *b) {
                            best = Some((k.clone(), when));
                        }
                    }
                }
                best.map(|(k, _)| k)
            }
        };

        let Some(key) = victim else {
            return Ok(None);
        };
        self.delete(key.as_bytes());
        self.stats.evicted_keys += 1;
        debug!(key = %key, policy = %policy, "evicted key");
        Ok(Some(key))
    }

    ////////////////////////////////////////////////////////////////////////////
    // Housekeeping
    ////////////////////////////////////////////////////////////////////////////

    /// Periodic maintenance: active expiry, shrinking of sparse tables and,
    /// when enabled, a time-boxed rehash step.
    pub fn cron(
        &mut self,
        now: i64,
    ) {
        self.active_expire_cycle(now, self.engine.active_expire_samples);

        if needs_resize(&self.dict) {
            if let Err(e) = self.dict.resize() {
                trace!(error = %e, "keyspace shrink skipped");
            }
        }
        if needs_resize(&self.expires) {
            if let Err(e) = self.expires.resize() {
                trace!(error = %e, "expires shrink skipped");
            }
        }

        if self.engine.active_rehashing {
            let budget = self.engine.rehash_budget_ms;
            if self.dict.is_rehashing() {
                self.dict.rehash_milliseconds(budget);
            } else if self.expires.is_rehashing() {
                self.expires.rehash_milliseconds(budget);
            }
        }
    }

    /// Applies `policy` to both tables and to every container table, e.g.
    /// while a snapshot is being written by a child process.
    pub fn set_resize_policy(
        &mut self,
        policy: ResizePolicy,
    ) {
        self.dict.set_resize_policy(policy);
        self.expires.set_resize_policy(policy);
        self.encoding.resize_policy = policy;
        for value in self.dict.values_mut() {
            value.set_resize_policy(policy);
        }
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

fn needs_resize<V>(dict: &Dict<Sds, V>) -> bool {
    let size = dict.slots();
    size > DICT_HT_INITIAL_SIZE && dict.len() * 100 / size < HT_MIN_FILL
}

fn lossy(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

fn unix_time_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;

    fn db_at(time: Rc<Cell<i64>>) -> Db {
        Db::new().with_clock(move || time.get())
    }

    fn s(v: &str) -> Value {
        Value::Str(Sds::new(v))
    }

    /// A key cannot be added twice, but can be overwritten.
    #[test]
    fn test_add_and_overwrite() {
        let mut db = Db::new();
        db.add(Sds::new("k"), s("v1")).unwrap();
        assert!(matches!(
            db.add(Sds::new("k"), s("v2")),
            Err(StorageError::KeyExists { .. })
        ));
        db.overwrite(b"k", s("v2")).unwrap();
        assert!(matches!(db.lookup(b"k"), Some(Value::Str(v)) if *v == "v2"));
        assert!(matches!(
            db.overwrite(b"missing", s("x")),
            Err(StorageError::KeyNotFound { .. })
        ));
    }

    /// Overwrite keeps the TTL, set drops it.
    #[test]
    fn test_ttl_survives_overwrite_not_set() {
        let mut db = Db::new();
        db.set(Sds::new("k"), s("a"));
        db.set_expire(b"k", i64::MAX).unwrap();
        db.overwrite(b"k", s("b")).unwrap();
        assert_eq!(db.get_expire(b"k"), Some(i64::MAX));
        db.set(Sds::new("k"), s("c"));
        assert_eq!(db.get_expire(b"k"), None);
    }

    /// Expired keys disappear on access.
    #[test]
    fn test_lazy_expiry() {
        let clock = Rc::new(Cell::new(1_000));
        let mut db = db_at(clock.clone());
        db.set(Sds::new("k"), s("v"));
        db.set_expire(b"k", 1_500).unwrap();
        assert!(db.exists(b"k"));

        clock.set(1_500);
        assert!(db.lookup(b"k").is_some());

        clock.set(1_501);
        assert!(db.lookup(b"k").is_none());
        assert_eq!(db.len(), 0);
        assert_eq!(db.volatile_len(), 0);
        assert_eq!(db.stats().expired_keys, 1);
        assert_eq!(db.stats().keyspace_misses, 1);
    }

    /// An expired key does not block `add`.
    #[test]
    fn test_add_over_expired_key() {
        let clock = Rc::new(Cell::new(10));
        let mut db = db_at(clock.clone());
        db.set(Sds::new("k"), s("old"));
        db.set_expire(b"k", 20).unwrap();
        clock.set(30);
        db.add(Sds::new("k"), s("new")).unwrap();
        assert_eq!(db.get_expire(b"k"), None);
    }

    #[test]
    fn test_set_expire_on_missing_key() {
        let mut db = Db::new();
        assert!(db.set_expire(b"nope", 1).is_err());
        assert!(!db.remove_expire(b"nope"));
    }

    /// The active cycle reclaims expired keys without touching live ones.
    #[test]
    fn test_active_expire_cycle() {
        let mut db = Db::new();
        for i in 0..100 {
            let key = Sds::new(format!("k{i}"));
            db.set(key.clone(), s("v"));
            let when = if i % 2 == 0 { 50 } else { 5_000 };
            db.set_expire(key.as_bytes(), when).unwrap();
        }
        let mut reclaimed = 0;
        for _ in 0..200 {
            reclaimed += db.active_expire_cycle(100, 20);
        }
        assert_eq!(reclaimed, 50);
        assert_eq!(db.len(), 50);
        assert_eq!(db.volatile_len(), 50);
    }

    #[test]
    fn test_random_key_skips_expired() {
        let clock = Rc::new(Cell::new(0));
        let mut db = db_at(clock.clone());
        db.set(Sds::new("dead"), s("v"));
        db.set_expire(b"dead", 5).unwrap();
        db.set(Sds::new("alive"), s("v"));
        clock.set(10);
        for _ in 0..20 {
            assert_eq!(db.random_key().unwrap().as_bytes(), b"alive");
        }
        assert!(Db::new().random_key().is_none());
    }

    #[test]
    fn test_evict_noeviction_refuses() {
        let mut db = Db::new();
        db.set(Sds::new("k"), s("v"));
        assert_eq!(
            db.evict_one(MaxmemoryPolicy::NoEviction),
            Err(StorageError::MaxMemoryReached)
        );
        assert_eq!(db.len(), 1);
    }

    /// Volatile policies never pick a persistent key.
    #[test]
    fn test_evict_volatile_only_touches_ttl_keys() {
        let mut db = Db::new();
        db.set(Sds::new("persistent"), s("v"));
        assert_eq!(db.evict_one(MaxmemoryPolicy::VolatileRandom).unwrap(), None);

        db.set(Sds::new("soon"), s("v"));
        db.set(Sds::new("later"), s("v"));
        db.set_expire(b"soon", 100).unwrap();
        db.set_expire(b"later", 200).unwrap();
        let evicted = db.evict_one(MaxmemoryPolicy::VolatileTtl).unwrap().unwrap();
        assert!(evicted.as_bytes() == b"soon" || evicted.as_bytes() == b"later");
        assert!(db.exists(b"persistent"));
        assert_eq!(db.stats().evicted_keys, 1);

        let evicted = db.evict_one(MaxmemoryPolicy::AllkeysRandom).unwrap();
        assert!(evicted.is_some());
        assert_eq!(db.len(), 1);
    }

    /// Walk reports every key once with its TTL.
    #[test]
    fn test_walk_reports_ttls() {
        let mut db = Db::new();
        for i in 0..30 {
            db.set(Sds::new(format!("k{i}")), s("v"));
        }
        db.set_expire(b"k7", 77).unwrap();
        let mut seen = 0;
        let mut ttl = None;
        db.walk(|k, _, t| {
            seen += 1;
            if k.as_bytes() == b"k7" {
                ttl = t;
            }
        });
        assert_eq!(seen, 30);
        assert_eq!(ttl, Some(77));
    }

    /// Cron shrinks a table left sparse by deletes.
    #[test]
    fn test_cron_shrinks_sparse_tables() {
        let mut db = Db::new();
        for i in 0..1000 {
            db.set(Sds::new(format!("k{i}")), s("v"));
        }
        for i in 0..995 {
            db.delete(format!("k{i}").as_bytes());
        }
        let before = db.keyspace().slots();
        for _ in 0..100 {
            db.cron(0);
        }
        assert!(db.keyspace().slots() < before);
        assert!(!db.keyspace().is_rehashing());
        assert_eq!(db.len(), 5);
    }

    /// With resizing avoided, cron leaves the table alone.
    #[test]
    fn test_cron_respects_avoid_policy() {
        let mut db = Db::new();
        for i in 0..100 {
            db.set(Sds::new(format!("k{i}")), s("v"));
        }
        for i in 0..99 {
            db.delete(format!("k{i}").as_bytes());
        }
        db.set_resize_policy(ResizePolicy::Avoid);
        let before = db.keyspace().slots();
        db.cron(0);
        assert_eq!(db.keyspace().slots(), before);
    }

    #[test]
    fn test_flush() {
        let mut db = Db::new();
        db.set(Sds::new("a"), s("1"));
        db.set(Sds::new("b"), s("2"));
        db.set_expire(b"a", 10).unwrap();
        assert_eq!(db.flush(), 2);
        assert!(db.is_empty());
        assert_eq!(db.volatile_len(), 0);
    }
}
