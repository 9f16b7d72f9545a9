use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use explore_core::config::InvalidationMode;
use explore_core::errors::ExploreResult;
use explore_observability::tracing_setup::events;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use moka::Expiry;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::entry::CacheEntry;
use crate::key::CacheKey;
use crate::single_flight::{wait_for_leader, Flight, Landing, SingleFlight};

type SourceIndex = DashMap<String, HashSet<CacheKey>>;

/// Expires each entry at its own TTL.
struct EntryExpiry;

impl Expiry<CacheKey, Arc<CacheEntry>> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &Arc<CacheEntry>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Where a fetched entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Served from the cache.
    Cache,
    /// Computed by this caller.
    Computed,
    /// Computed by a concurrent caller with the same key.
    Shared,
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub entry: Arc<CacheEntry>,
    pub origin: Origin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
    pub pending_invalidations: usize,
}

impl CacheStats {
    /// Hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Explore result cache with per-entry TTL, single-flight and
/// source-driven invalidation.
pub struct ResultCache {
    cache: Cache<CacheKey, Arc<CacheEntry>>,
    by_source: Arc<SourceIndex>,
    flights: SingleFlight<CacheKey, Arc<CacheEntry>>,
    pending: Mutex<VecDeque<CacheKey>>,
    /// Write sequence. Record changes, explore drops and full clears each
    /// take the next number.
    writes: AtomicU64,
    /// Last write sequence per source alias.
    source_writes: DashMap<String, u64>,
    /// Last drop sequence per explore name.
    explore_drops: DashMap<String, u64>,
    cleared_at: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(capacity: u64) -> Self {
        let by_source: Arc<SourceIndex> = Arc::new(DashMap::new());
        let index = Arc::clone(&by_source);
        let cache = Cache::builder()
            .max_capacity(capacity)
            .expire_after(EntryExpiry)
            .eviction_listener(move |key: Arc<CacheKey>, entry: Arc<CacheEntry>, cause| {
                if cause != RemovalCause::Replaced {
                    unlink(&index, &key, &entry);
                }
            })
            .build();
        Self {
            cache,
            by_source,
            flights: SingleFlight::new(),
            pending: Mutex::new(VecDeque::new()),
            writes: AtomicU64::new(0),
            source_writes: DashMap::new(),
            explore_drops: DashMap::new(),
            cleared_at: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Unexpired entry for `key`. Counts a hit or a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        match self.peek(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn peek(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let entry = self.cache.get(key)?;
        if entry.is_expired() {
            self.cache.invalidate(key);
            return None;
        }
        Some(entry)
    }

    /// Store an entry. Uncacheable entries are ignored; returns whether it was stored.
    pub fn put(&self, entry: CacheEntry) -> bool {
        self.put_arc(Arc::new(entry))
    }

    fn put_arc(&self, entry: Arc<CacheEntry>) -> bool {
        if !entry.is_cacheable() {
            return false;
        }
        for source in &entry.sources {
            self.by_source
                .entry(source.clone())
                .or_default()
                .insert(entry.key.clone());
        }
        self.cache.insert(entry.key.clone(), entry);
        true
    }

    /// Remove one key. Returns whether an entry was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.cache.remove(key).is_some()
    }

    /// Remove every entry matching `predicate`. Returns the number removed.
    pub fn invalidate_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&CacheEntry) -> bool,
    {
        let keys: Vec<CacheKey> = self
            .cache
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(key, _)| key.as_ref().clone())
            .collect();
        keys.iter().filter(|key| self.invalidate(key)).count()
    }

    /// Drop every entry of an explore, all versions.
    pub fn invalidate_explore(&self, explore: &str) -> usize {
        let seq = self.next_write();
        mark(&self.explore_drops, explore, seq);
        let removed = self.invalidate_where(|entry| entry.explore == explore);
        events::cache_invalidated("explore_reload", explore, removed);
        removed
    }

    pub fn invalidate_all(&self) {
        let seq = self.next_write();
        self.cleared_at.fetch_max(seq, Ordering::AcqRel);
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    /// Write-path hook. Applies each affected entry's invalidation mode:
    /// `write_through` now, `write_behind` queued, `manual` not at all.
    /// Returns the number of entries removed synchronously.
    pub fn notify_record_changed(&self, source: &str, record_id: &str) -> usize {
        let seq = self.next_write();
        mark(&self.source_writes, source, seq);

        let Some(keys) = self.by_source.get(source).map(|set| set.value().clone()) else {
            return 0;
        };

        let mut removed = 0;
        let mut queued = 0;
        for key in keys {
            let Some(entry) = self.cache.get(&key) else {
                self.forget(source, &key);
                continue;
            };
            if !entry.depends_on(source, record_id) {
                continue;
            }
            match entry.mode {
                InvalidationMode::WriteThrough => {
                    if self.invalidate(&key) {
                        removed += 1;
                    }
                }
                InvalidationMode::WriteBehind => {
                    self.enqueue(key);
                    queued += 1;
                }
                InvalidationMode::Manual => {}
            }
        }

        if removed > 0 {
            events::cache_invalidated("write_through", &format!("{source}/{record_id}"), removed);
        }
        if queued > 0 {
            tracing::debug!(source, record_id, queued, "write-behind invalidations queued");
        }
        removed
    }

    fn next_write(&self) -> u64 {
        self.writes.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Whether a write that concerns `entry` landed after sequence `since`.
    /// Manual entries only care about explicit drops.
    fn changed_since(&self, entry: &CacheEntry, since: u64) -> bool {
        let after = |seq: Option<u64>| seq.is_some_and(|seq| seq > since);
        if self.cleared_at.load(Ordering::Acquire) > since {
            return true;
        }
        if after(self.explore_drops.get(&entry.explore).map(|s| *s)) {
            return true;
        }
        entry.mode != InvalidationMode::Manual
            && entry
                .sources
                .iter()
                .any(|source| after(self.source_writes.get(source).map(|s| *s)))
    }

    /// Store a freshly computed entry unless a write it depends on landed
    /// after `started`. Checked again after the insert: a write racing the
    /// insert may have scanned the index before the key was in it.
    fn store_computed(&self, entry: &Arc<CacheEntry>, started: u64) -> bool {
        if self.changed_since(entry, started) || !self.put_arc(Arc::clone(entry)) {
            return false;
        }
        if self.changed_since(entry, started) {
            self.cache.remove(&entry.key);
            return false;
        }
        true
    }

    fn enqueue(&self, key: CacheKey) {
        if let Ok(mut pending) = self.pending.lock() {
            if !pending.contains(&key) {
                pending.push_back(key);
            }
        }
    }

    fn forget(&self, source: &str, key: &CacheKey) {
        if let Some(mut set) = self.by_source.get_mut(source) {
            set.remove(key);
        }
    }

    /// Apply queued write-behind invalidations. Returns the number removed.
    pub fn flush_pending(&self) -> usize {
        let drained: Vec<CacheKey> = match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => return 0,
        };
        let removed = drained.iter().filter(|key| self.invalidate(key)).count();
        if removed > 0 {
            events::cache_invalidated("write_behind", "queued", removed);
        }
        removed
    }

    pub fn pending_invalidations(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Periodically flush write-behind invalidations.
    /// The task ends once the cache is dropped.
    pub fn spawn_write_behind_worker(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.flush_pending();
            }
        })
    }

    /// Read-through lookup with single-flight on miss.
    ///
    /// The leader runs `compute`, stores the entry when cacheable and no
    /// write it depends on raced with it, then publishes to followers.
    /// When a leader is dropped before publishing, one follower takes over
    /// with its own `compute`.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &CacheKey,
        compute: F,
    ) -> ExploreResult<Fetched>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ExploreResult<CacheEntry>>,
    {
        if let Some(entry) = self.get(key) {
            return Ok(Fetched {
                entry,
                origin: Origin::Cache,
            });
        }

        let guard = loop {
            match self.flights.join(key) {
                Flight::Leader(guard) => break guard,
                Flight::Follower(rx) => match wait_for_leader(rx).await {
                    Landing::Published(result) => {
                        return result.map(|entry| Fetched {
                            entry,
                            origin: Origin::Shared,
                        })
                    }
                    Landing::Abandoned => {
                        tracing::debug!(key = key.short(), "leader abandoned flight, rejoining");
                    }
                },
            }
        };

        // A previous leader may have stored the entry since our miss.
        if let Some(entry) = self.peek(key) {
            guard.complete(Ok(Arc::clone(&entry)));
            return Ok(Fetched {
                entry,
                origin: Origin::Cache,
            });
        }

        let started = self.writes.load(Ordering::Acquire);
        let result = compute().await.map(Arc::new);
        if let Ok(entry) = &result {
            self.store_computed(entry, started);
        }
        guard.complete(result.clone());
        result.map(|entry| Fetched {
            entry,
            origin: Origin::Computed,
        })
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
            pending_invalidations: self.pending_invalidations(),
        }
    }

    /// Whether `key` currently has an unexpired entry. Does not count as a hit.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.peek(key).is_some()
    }
}

fn mark(map: &DashMap<String, u64>, name: &str, seq: u64) {
    map.entry(name.to_string())
        .and_modify(|last| *last = (*last).max(seq))
        .or_insert(seq);
}

fn unlink(index: &SourceIndex, key: &CacheKey, entry: &CacheEntry) {
    for source in &entry.sources {
        if let Some(mut set) = index.get_mut(source) {
            set.remove(key);
        }
    }
}
