use crate::core::cache::{CacheEntry, DEFAULT_TTL, SWEEP_INTERVAL};
use dashmap::DashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// Holds at most one entry for a key. Callers that miss on the same key queue
/// on the slot, so only one of them runs the factory.
struct Slot<V> {
    entry: AsyncMutex<Option<CacheEntry<V>>>,
}

impl<V> Slot<V> {
    fn empty() -> Self {
        Self {
            entry: AsyncMutex::new(None),
        }
    }

    /// Whether a sweep at `now` may drop this slot. Slots with a factory in
    /// flight are kept.
    fn is_stale(&self, now: Instant) -> bool {
        match self.entry.try_lock() {
            Ok(guard) => guard.as_ref().is_none_or(|e| e.is_expired_at(now)),
            Err(_) => false,
        }
    }

    fn live_value(&self, now: Instant) -> bool {
        match self.entry.try_lock() {
            Ok(guard) => guard.as_ref().is_some_and(|e| !e.is_expired_at(now)),
            Err(_) => false,
        }
    }
}

/// In-memory TTL cache with single-flight misses and periodic lazy sweeping.
pub struct MemoryCache<K, V> {
    slots: DashMap<K, Arc<Slot<V>>>,
    last_sweep: Mutex<Instant>,
    default_ttl: Duration,
    sweep_interval: Duration,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + Debug,
    V: Clone + Send + Sync,
{
    /// Creates a cache with a one hour default TTL and a five minute sweep interval
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_TTL, SWEEP_INTERVAL)
    }

    pub fn with_settings(default_ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
            default_ttl,
            sweep_interval,
        }
    }

    /// Returns the cached value for `key`, or runs `factory` and caches its
    /// output for `ttl` (the default TTL when `None`). Factory errors are
    /// returned as is and nothing is stored.
    pub async fn get_or_create<F, Fut, E>(
        &self,
        key: K,
        factory: F,
        ttl: Option<Duration>,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.sweep_if_due();

        let slot = self.slot(&key);
        let mut entry = slot.entry.lock().await;
        if let Some(cached) = entry.as_ref().filter(|e| !e.is_expired()) {
            debug!("Cache HIT for key: {:?}", key);
            return Ok(cached.value.clone());
        }

        debug!("Cache MISS for key: {:?}", key);
        let value = factory().await?;
        let ttl = ttl.unwrap_or(self.default_ttl);
        *entry = Some(CacheEntry::new(value.clone(), ttl));
        debug!("Cache PUT for key: {:?} (ttl {:?})", key, ttl);
        Ok(value)
    }

    /// Returns a live value without creating one. Waits if a factory for the
    /// key is in flight.
    pub async fn get(&self, key: &K) -> Option<V> {
        let slot = self.slots.get(key).map(|s| Arc::clone(s.value()))?;
        let entry = slot.entry.lock().await;
        entry
            .as_ref()
            .filter(|e| !e.is_expired())
            .map(|e| e.value.clone())
    }

    pub fn remove(&self, key: &K) {
        self.slots.remove(key);
        debug!("Cache REMOVE for key: {:?}", key);
    }

    /// Drops every entry and restarts the sweep interval.
    pub fn clear(&self) {
        self.slots.clear();
        *self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
        debug!("Cache CLEAR");
    }

    /// Number of entries that are stored and not expired.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.slots.iter().filter(|s| s.live_value(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &K) -> Arc<Slot<V>> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(
            self.slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Slot::empty()))
                .value(),
        )
    }

    fn sweep_if_due(&self) {
        let now = Instant::now();
        {
            let mut last_sweep = self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);
            if now.duration_since(*last_sweep) < self.sweep_interval {
                return;
            }
            *last_sweep = now;
        }

        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_stale(now));
        debug!(
            "Cache SWEEP removed {} of {} entries",
            before.saturating_sub(self.slots.len()),
            before
        );
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + Debug,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
