//! Per-resource keyed record cache with optional expiration.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use relic_foundation::{Key, Record};

/// Supplies the current instant.
///
/// The default [`SystemClock`] reads the monotonic clock; tests drive
/// expiry deterministically with a [`ManualClock`].
pub trait Clock {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually-advanced clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Cell<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Cell::new(Duration::ZERO),
        }
    }

    /// Advances the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.offset.set(self.offset.get() + delta);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

/// What happens to entries older than `max_age`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DeleteOnExpire {
    /// Expired entries remain queryable until explicitly evicted.
    #[default]
    None,
    /// Expired entries are evicted lazily on next access.
    Passive,
    /// Expired entries are evicted by the sweep pass.
    Aggressive,
}

/// Expiry callback, invoked with each evicted key.
pub type ExpireFn = Arc<dyn Fn(&Key)>;

/// Cache expiration configuration.
#[derive(Clone, Default)]
pub struct CacheConfig {
    /// Entries older than this are eligible for expiry; `None` = never.
    pub max_age: Option<Duration>,
    /// Minimum interval between sweeps driven by [`Cache::maybe_sweep`].
    pub recycle_freq: Option<Duration>,
    /// Eviction policy for expired entries.
    pub delete_on_expire: DeleteOnExpire,
    /// Invoked with each key removed by expiry-driven eviction.
    pub on_expire: Option<ExpireFn>,
}

impl CacheConfig {
    /// Creates a config that never expires anything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum entry age.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Sets the sweep interval honored by [`Cache::maybe_sweep`].
    #[must_use]
    pub fn with_recycle_freq(mut self, freq: Duration) -> Self {
        self.recycle_freq = Some(freq);
        self
    }

    /// Sets the eviction policy.
    #[must_use]
    pub fn with_delete_on_expire(mut self, policy: DeleteOnExpire) -> Self {
        self.delete_on_expire = policy;
        self
    }

    /// Sets the expiry callback.
    pub fn with_on_expire<F>(mut self, on_expire: F) -> Self
    where
        F: Fn(&Key) + 'static,
    {
        self.on_expire = Some(Arc::new(on_expire));
        self
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("max_age", &self.max_age)
            .field("recycle_freq", &self.recycle_freq)
            .field("delete_on_expire", &self.delete_on_expire)
            .field("on_expire", &self.on_expire.is_some())
            .finish()
    }
}

#[derive(Clone, Debug)]
struct Entry {
    record: Record,
    refreshed_at: Instant,
}

/// Keyed record storage with optional expiration.
///
/// The cache is the canonical home of a resource's records: "is this key
/// cached" is the existence check for "is this record loaded". Capacity
/// is unbounded: there is no size-based eviction, only age-based expiry.
///
/// Sweeps cannot overlap for one cache instance: `sweep` takes `&mut
/// self`, so a second sweep cannot start while one is running.
pub struct Cache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: HashMap<Key, Entry>,
    last_sweep: Option<Instant>,
}

impl Cache {
    /// Creates a cache with the given config and clock.
    #[must_use]
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: HashMap::new(),
            last_sweep: None,
        }
    }

    /// Returns the eviction policy.
    #[must_use]
    pub fn policy(&self) -> DeleteOnExpire {
        self.config.delete_on_expire
    }

    /// Inserts or refreshes an entry; refreshing resets its age.
    pub fn put(&mut self, key: Key, record: Record) {
        let refreshed_at = self.clock.now();
        self.entries.insert(
            key,
            Entry {
                record,
                refreshed_at,
            },
        );
    }

    /// Gets a record. Expired entries are still returned here; policy
    /// enforcement (passive reaping, sweeps) is driven by the owner.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&Record> {
        self.entries.get(key).map(|e| &e.record)
    }

    /// Gets a record mutably.
    #[must_use]
    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Record> {
        self.entries.get_mut(key).map(|e| &mut e.record)
    }

    /// Returns true if the key has an entry (expired or not).
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns true if the entry exists and is older than `max_age`.
    #[must_use]
    pub fn is_expired(&self, key: &Key) -> bool {
        let Some(max_age) = self.config.max_age else {
            return false;
        };
        self.entries
            .get(key)
            .is_some_and(|e| self.clock.now().duration_since(e.refreshed_at) > max_age)
    }

    /// Removes an entry without treating it as expiry (no callback).
    pub fn remove(&mut self, key: &Key) -> Option<Record> {
        self.entries.remove(key).map(|e| e.record)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evicts the entry if expired, firing the expiry callback.
    ///
    /// Used by the store for the `Passive` policy on access. Returns the
    /// evicted record.
    pub fn reap_if_expired(&mut self, key: &Key) -> Option<Record> {
        if !self.is_expired(key) {
            return None;
        }
        let removed = self.entries.remove(key).map(|e| e.record);
        if removed.is_some() {
            if let Some(on_expire) = &self.config.on_expire {
                on_expire(key);
            }
        }
        removed
    }

    /// Evicts every expired entry under the `Aggressive` policy.
    ///
    /// Returns the evicted keys so the owner can purge its bookkeeping.
    /// A no-op under other policies.
    pub fn sweep(&mut self) -> Vec<Key> {
        self.last_sweep = Some(self.clock.now());
        if self.config.delete_on_expire != DeleteOnExpire::Aggressive {
            return Vec::new();
        }
        let Some(max_age) = self.config.max_age else {
            return Vec::new();
        };

        let now = self.clock.now();
        let expired: Vec<Key> = self
            .entries
            .iter()
            .filter(|(_, e)| now.duration_since(e.refreshed_at) > max_age)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.entries.remove(key);
            if let Some(on_expire) = &self.config.on_expire {
                on_expire(key);
            }
        }
        expired
    }

    /// Runs a sweep only if `recycle_freq` has elapsed since the last one.
    pub fn maybe_sweep(&mut self) -> Vec<Key> {
        let Some(freq) = self.config.recycle_freq else {
            return self.sweep();
        };
        let now = self.clock.now();
        let due = self
            .last_sweep
            .is_none_or(|last| now.duration_since(last) >= freq);
        if due { self.sweep() } else { Vec::new() }
    }

    /// Returns the number of entries (expired entries included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
