//! Thread-safe in-memory cache with change-token eviction.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use view_core::{ChangeToken, Clock, Subscription, SystemClock};

use crate::error::CacheError;

/// Priority used when entries must be evicted to respect the size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePriority {
    /// Evicted first.
    Low,
    #[default]
    Normal,
    High,
    /// Never evicted for capacity; still expires.
    NeverRemove,
}

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Removed explicitly.
    Removed,
    /// Overwritten by a new value for the same key.
    Replaced,
    /// Absolute or sliding expiration elapsed.
    Expired,
    /// An expiration token changed.
    TokenExpired,
    /// Evicted to make room under the size limit.
    Capacity,
}

/// Cache-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCacheOptions {
    /// Maximum total size of all entries, in the units entries declare.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_limit: Option<u64>,
}

impl MemoryCacheOptions {
    /// Options with a size limit.
    pub fn with_size_limit(limit: u64) -> Self {
        Self {
            size_limit: Some(limit),
        }
    }
}

/// Per-entry options.
#[derive(Clone, Default)]
pub struct EntryOptions {
    /// Expire at this instant.
    pub absolute_expiration: Option<DateTime<Utc>>,
    /// Expire this long after insertion.
    pub absolute_expiration_relative_to_now: Option<Duration>,
    /// Expire after this long without access.
    pub sliding_expiration: Option<Duration>,
    /// Capacity eviction priority.
    pub priority: CachePriority,
    /// Size counted against the cache's size limit.
    pub size: Option<u64>,
    /// Tokens that expire the entry when they change.
    pub expiration_tokens: Vec<Arc<dyn ChangeToken>>,
}

impl EntryOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire at an absolute time.
    pub fn with_absolute_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.absolute_expiration = Some(at);
        self
    }

    /// Expire a fixed time after insertion.
    pub fn expires_after(mut self, ttl: Duration) -> Self {
        self.absolute_expiration_relative_to_now = Some(ttl);
        self
    }

    /// Expire after a period of inactivity.
    pub fn with_sliding_expiration(mut self, window: Duration) -> Self {
        self.sliding_expiration = Some(window);
        self
    }

    /// Set the eviction priority.
    pub fn with_priority(mut self, priority: CachePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the entry size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Add an expiration token.
    pub fn with_expiration_token(mut self, token: Arc<dyn ChangeToken>) -> Self {
        self.expiration_tokens.push(token);
        self
    }

    fn resolve_absolute(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let relative = self
            .absolute_expiration_relative_to_now
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| now.checked_add_signed(ttl));

        match (self.absolute_expiration, relative) {
            (Some(a), Some(r)) => Some(a.min(r)),
            (a, r) => a.or(r),
        }
    }
}

impl fmt::Debug for EntryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryOptions")
            .field("absolute_expiration", &self.absolute_expiration)
            .field(
                "absolute_expiration_relative_to_now",
                &self.absolute_expiration_relative_to_now,
            )
            .field("sliding_expiration", &self.sliding_expiration)
            .field("priority", &self.priority)
            .field("size", &self.size)
            .field("expiration_tokens", &self.expiration_tokens.len())
            .finish()
    }
}

struct Entry<V> {
    value: V,
    absolute_expiration: Option<DateTime<Utc>>,
    sliding_expiration: Option<chrono::Duration>,
    last_access: DateTime<Utc>,
    priority: CachePriority,
    size: u64,
    generation: u64,
    tokens: Vec<Arc<dyn ChangeToken>>,
    _subscriptions: Vec<Subscription>,
}

impl<V> Entry<V> {
    fn expiry(&self, now: DateTime<Utc>) -> Option<EvictionReason> {
        if self.tokens.iter().any(|t| t.has_changed()) {
            return Some(EvictionReason::TokenExpired);
        }
        if self.absolute_expiration.is_some_and(|at| now >= at) {
            return Some(EvictionReason::Expired);
        }
        if self
            .sliding_expiration
            .is_some_and(|window| now - self.last_access >= window)
        {
            return Some(EvictionReason::Expired);
        }
        None
    }
}

struct Store<V> {
    entries: HashMap<String, Entry<V>>,
    current_size: u64,
}

impl<V> Store<V> {
    fn remove(&mut self, key: &str, reason: EvictionReason) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.current_size = self.current_size.saturating_sub(entry.size);
        tracing::debug!(key = %key, reason = ?reason, "cache entry evicted");
        Some(entry)
    }

    fn insert(&mut self, key: String, entry: Entry<V>) {
        self.current_size += entry.size;
        self.entries.insert(key, entry);
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> Vec<Entry<V>> {
        let expired: Vec<(String, EvictionReason)> = self
            .entries
            .iter()
            .filter_map(|(k, e)| e.expiry(now).map(|r| (k.clone(), r)))
            .collect();

        expired
            .into_iter()
            .filter_map(|(k, reason)| self.remove(&k, reason))
            .collect()
    }

    /// Keys in eviction order: lowest priority first, then least recently used.
    fn eviction_order(&self) -> Vec<String> {
        let mut candidates: Vec<(&String, &Entry<V>)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.priority != CachePriority::NeverRemove)
            .collect();
        candidates.sort_by(|(_, a), (_, b)| {
            a.priority
                .cmp(&b.priority)
                .then(a.last_access.cmp(&b.last_access))
        });
        candidates.into_iter().map(|(k, _)| k.clone()).collect()
    }

    fn evict_until(&mut self, target_size: u64) -> Vec<Entry<V>> {
        let mut evicted = Vec::new();
        for key in self.eviction_order() {
            if self.current_size <= target_size {
                break;
            }
            if let Some(entry) = self.remove(&key, EvictionReason::Capacity) {
                evicted.push(entry);
            }
        }
        evicted
    }
}

struct Shared<V> {
    store: Mutex<Store<V>>,
    next_generation: AtomicU64,
}

impl<V> Shared<V> {
    fn lock(&self) -> MutexGuard<'_, Store<V>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove_generation(&self, key: &str, generation: u64) {
        let removed = {
            let mut store = self.lock();
            match store.entries.get(key) {
                Some(entry) if entry.generation == generation => {
                    store.remove(key, EvictionReason::TokenExpired)
                }
                _ => None,
            }
        };
        // Entries are dropped outside the lock so their subscriptions can
        // unregister without contending with callers.
        drop(removed);
    }
}

/// In-memory cache keyed by string.
///
/// Entries expire by time, by change token, or by capacity when a size limit
/// is configured. Expired entries are removed lazily on lookup; tokens with
/// active callbacks also remove their entry as soon as they fire.
///
/// Cloning returns a handle to the same cache.
pub struct MemoryCache<V> {
    shared: Arc<Shared<V>>,
    options: MemoryCacheOptions,
    clock: Arc<dyn Clock>,
}

impl<V> Clone for MemoryCache<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            options: self.options.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<V> fmt::Debug for MemoryCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.shared.lock();
        f.debug_struct("MemoryCache")
            .field("entries", &store.entries.len())
            .field("current_size", &store.current_size)
            .field("options", &self.options)
            .finish()
    }
}

impl<V> Default for MemoryCache<V>
where
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new(MemoryCacheOptions::default())
    }
}

impl<V> MemoryCache<V>
where
    V: Clone + Send + 'static,
{
    /// Create a cache using the system clock.
    pub fn new(options: MemoryCacheOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    /// Create a cache with a custom time source.
    pub fn with_clock(options: MemoryCacheOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(Store {
                    entries: HashMap::new(),
                    current_size: 0,
                }),
                next_generation: AtomicU64::new(0),
            }),
            options,
            clock,
        }
    }

    /// Cache configuration.
    pub fn options(&self) -> &MemoryCacheOptions {
        &self.options
    }

    /// Look up a value. Expired entries are evicted and reported as misses.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut store = self.shared.lock();

        let lookup = match store.entries.get_mut(key) {
            None => return None,
            Some(entry) => match entry.expiry(now) {
                Some(reason) => Err(reason),
                None => {
                    entry.last_access = now;
                    Ok(entry.value.clone())
                }
            },
        };

        match lookup {
            Ok(value) => Some(value),
            Err(reason) => {
                let evicted = store.remove(key, reason);
                drop(store);
                drop(evicted);
                None
            }
        }
    }

    /// Check for a live entry without refreshing its sliding window.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.shared
            .lock()
            .entries
            .get(key)
            .is_some_and(|e| e.expiry(now).is_none())
    }

    /// Store a value.
    ///
    /// Entries that are already expired, or that cannot fit under the size
    /// limit after evicting lower-priority entries, are not stored.
    pub fn set(&self, key: impl Into<String>, value: V, options: EntryOptions) -> Result<(), CacheError> {
        let key = key.into();
        let now = self.clock.now();

        let size = match (self.options.size_limit, options.size) {
            (Some(_), None) => return Err(CacheError::SizeRequired { key }),
            (_, size) => size.unwrap_or(0),
        };

        let absolute_expiration = options.resolve_absolute(now);
        if options.expiration_tokens.iter().any(|t| t.has_changed())
            || absolute_expiration.is_some_and(|at| at <= now)
        {
            tracing::debug!(key = %key, "cache entry expired before insertion");
            let displaced = self.shared.lock().remove(&key, EvictionReason::Replaced);
            drop(displaced);
            return Ok(());
        }

        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        let subscriptions = self.subscribe(&key, generation, &options.expiration_tokens);

        let entry = Entry {
            value,
            absolute_expiration,
            sliding_expiration: options
                .sliding_expiration
                .and_then(|w| chrono::Duration::from_std(w).ok()),
            last_access: now,
            priority: options.priority,
            size,
            generation,
            tokens: options.expiration_tokens,
            _subscriptions: subscriptions,
        };

        let mut released = Vec::new();
        let mut rejected = None;
        {
            let mut store = self.shared.lock();
            released.extend(store.remove(&key, EvictionReason::Replaced));

            let fits = match self.options.size_limit {
                None => true,
                Some(limit) if size > limit => false,
                Some(limit) => {
                    if store.current_size + size > limit {
                        released.extend(store.purge_expired(now));
                    }
                    if store.current_size + size > limit {
                        released.extend(store.evict_until(limit - size));
                    }
                    store.current_size + size <= limit
                }
            };

            if fits {
                store.insert(key.clone(), entry);
            } else {
                rejected = Some(entry);
            }
        }

        if rejected.is_some() {
            tracing::warn!(key = %key, size, limit = ?self.options.size_limit, "cache entry rejected by size limit");
        }
        drop(released);
        drop(rejected);
        Ok(())
    }

    fn subscribe(&self, key: &str, generation: u64, tokens: &[Arc<dyn ChangeToken>]) -> Vec<Subscription> {
        tokens
            .iter()
            .filter(|t| t.active_change_callbacks())
            .map(|token| {
                let shared: Weak<Shared<V>> = Arc::downgrade(&self.shared);
                let key = key.to_string();
                token.register_change_callback(Box::new(move || {
                    if let Some(shared) = shared.upgrade() {
                        shared.remove_generation(&key, generation);
                    }
                }))
            })
            .collect()
    }

    /// Remove an entry.
    pub fn remove(&self, key: &str) -> Option<V> {
        let removed = self.shared.lock().remove(key, EvictionReason::Removed);
        removed.map(|e| e.value)
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size of stored entries.
    pub fn current_size(&self) -> u64 {
        self.shared.lock().current_size
    }

    /// Remove expired entries, then a `percentage` (0.0..=1.0) of the
    /// remaining removable entries in eviction order. Returns the number of
    /// entries removed.
    pub fn compact(&self, percentage: f64) -> usize {
        let now = self.clock.now();
        let removed = {
            let mut store = self.shared.lock();
            let mut removed = store.purge_expired(now);

            let order = store.eviction_order();
            let count = (order.len() as f64 * percentage.clamp(0.0, 1.0)).ceil() as usize;
            for key in order.into_iter().take(count) {
                removed.extend(store.remove(&key, EvictionReason::Capacity));
            }
            removed
        };
        removed.len()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let drained: Vec<Entry<V>> = {
            let mut store = self.shared.lock();
            store.current_size = 0;
            store.entries.drain().map(|(_, e)| e).collect()
        };
        drop(drained);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use view_core::{ChangeTokenSource, ManualClock};

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2010-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn cache_with_clock(options: MemoryCacheOptions) -> (MemoryCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        (MemoryCache::with_clock(options, clock.clone()), clock)
    }

    #[test]
    fn test_set_and_get() {
        let cache = MemoryCache::default();
        cache.set("a", "1".to_string(), EntryOptions::new()).unwrap();
        assert_eq!(cache.get("a").as_deref(), Some("1"));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_replaces_existing() {
        let cache = MemoryCache::new(MemoryCacheOptions::with_size_limit(100));
        cache.set("a", "1".to_string(), EntryOptions::new().with_size(10)).unwrap();
        cache.set("a", "2".to_string(), EntryOptions::new().with_size(20)).unwrap();
        assert_eq!(cache.get("a").as_deref(), Some("2"));
        assert_eq!(cache.current_size(), 20);
    }

    #[test]
    fn test_absolute_expiration() {
        let (cache, clock) = cache_with_clock(MemoryCacheOptions::default());
        let at = start() + chrono::Duration::seconds(60);
        cache
            .set("a", "1".to_string(), EntryOptions::new().with_absolute_expiration(at))
            .unwrap();

        clock.advance(Duration::from_secs(59));
        assert!(cache.get("a").is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_relative_expiration() {
        let (cache, clock) = cache_with_clock(MemoryCacheOptions::default());
        cache
            .set("a", "1".to_string(), EntryOptions::new().expires_after(Duration::from_secs(30)))
            .unwrap();

        clock.advance(Duration::from_secs(29));
        assert!(cache.get("a").is_some());
        clock.advance(Duration::from_secs(2));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_earliest_absolute_expiration_wins() {
        let (cache, clock) = cache_with_clock(MemoryCacheOptions::default());
        let options = EntryOptions::new()
            .with_absolute_expiration(start() + chrono::Duration::seconds(10))
            .expires_after(Duration::from_secs(60));
        cache.set("a", "1".to_string(), options).unwrap();

        clock.advance(Duration::from_secs(10));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_sliding_expiration_refreshed_by_access() {
        let (cache, clock) = cache_with_clock(MemoryCacheOptions::default());
        cache
            .set("a", "1".to_string(), EntryOptions::new().with_sliding_expiration(Duration::from_secs(10)))
            .unwrap();

        for _ in 0..5 {
            clock.advance(Duration::from_secs(9));
            assert!(cache.get("a").is_some());
        }

        clock.advance(Duration::from_secs(10));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_already_expired_entry_is_not_stored() {
        let (cache, _clock) = cache_with_clock(MemoryCacheOptions::default());
        let past = start() - chrono::Duration::seconds(1);
        cache
            .set("a", "1".to_string(), EntryOptions::new().with_absolute_expiration(past))
            .unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_changed_token_evicts_on_next_lookup() {
        let cache = MemoryCache::default();
        let source = ChangeTokenSource::new();
        cache
            .set("a", "1".to_string(), EntryOptions::new().with_expiration_token(Arc::new(source.token())))
            .unwrap();
        assert!(cache.get("a").is_some());

        source.signal();
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_active_token_evicts_eagerly() {
        let cache: MemoryCache<String> = MemoryCache::default();
        let source = ChangeTokenSource::new();
        cache
            .set("a", "1".to_string(), EntryOptions::new().with_expiration_token(Arc::new(source.token())))
            .unwrap();
        assert_eq!(cache.len(), 1);

        source.signal();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_stale_callback_does_not_remove_replacement() {
        let cache: MemoryCache<String> = MemoryCache::default();
        let first = ChangeTokenSource::new();
        cache
            .set("a", "1".to_string(), EntryOptions::new().with_expiration_token(Arc::new(first.token())))
            .unwrap();
        cache.set("a", "2".to_string(), EntryOptions::new()).unwrap();

        first.signal();
        assert_eq!(cache.get("a").as_deref(), Some("2"));
    }

    #[test]
    fn test_already_changed_token_is_not_stored() {
        let cache: MemoryCache<String> = MemoryCache::default();
        let source = ChangeTokenSource::new();
        source.signal();
        cache
            .set("a", "1".to_string(), EntryOptions::new().with_expiration_token(Arc::new(source.token())))
            .unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_size_required_with_limit() {
        let cache: MemoryCache<String> = MemoryCache::new(MemoryCacheOptions::with_size_limit(10));
        let err = cache.set("a", "1".to_string(), EntryOptions::new()).unwrap_err();
        assert_eq!(err, CacheError::SizeRequired { key: "a".to_string() });
    }

    #[test]
    fn test_oversize_entry_is_rejected() {
        let cache: MemoryCache<String> = MemoryCache::new(MemoryCacheOptions::with_size_limit(10));
        cache.set("small", "s".to_string(), EntryOptions::new().with_size(5)).unwrap();
        cache.set("big", "b".to_string(), EntryOptions::new().with_size(11)).unwrap();
        assert!(cache.get("big").is_none());
        assert!(cache.get("small").is_some());
    }

    #[test]
    fn test_capacity_evicts_low_priority_first() {
        let (cache, clock) = cache_with_clock(MemoryCacheOptions::with_size_limit(30));
        cache
            .set("high", "h".to_string(), EntryOptions::new().with_size(10).with_priority(CachePriority::High))
            .unwrap();
        clock.advance(Duration::from_secs(1));
        cache
            .set("low", "l".to_string(), EntryOptions::new().with_size(10).with_priority(CachePriority::Low))
            .unwrap();
        clock.advance(Duration::from_secs(1));
        cache.set("normal", "n".to_string(), EntryOptions::new().with_size(10)).unwrap();

        cache.set("new", "x".to_string(), EntryOptions::new().with_size(10)).unwrap();

        assert!(cache.contains_key("high"));
        assert!(!cache.contains_key("low"));
        assert!(cache.contains_key("normal"));
        assert!(cache.contains_key("new"));
        assert_eq!(cache.current_size(), 30);
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let (cache, clock) = cache_with_clock(MemoryCacheOptions::with_size_limit(20));
        cache.set("a", "a".to_string(), EntryOptions::new().with_size(10)).unwrap();
        clock.advance(Duration::from_secs(1));
        cache.set("b", "b".to_string(), EntryOptions::new().with_size(10)).unwrap();
        clock.advance(Duration::from_secs(1));
        assert!(cache.get("a").is_some());

        cache.set("c", "c".to_string(), EntryOptions::new().with_size(10)).unwrap();
        assert!(cache.contains_key("a"));
        assert!(!cache.contains_key("b"));
        assert!(cache.contains_key("c"));
    }

    #[test]
    fn test_never_remove_entries_block_insertion() {
        let cache: MemoryCache<String> = MemoryCache::new(MemoryCacheOptions::with_size_limit(10));
        cache
            .set(
                "pinned",
                "p".to_string(),
                EntryOptions::new().with_size(10).with_priority(CachePriority::NeverRemove),
            )
            .unwrap();
        cache.set("other", "o".to_string(), EntryOptions::new().with_size(1)).unwrap();

        assert!(cache.contains_key("pinned"));
        assert!(!cache.contains_key("other"));
    }

    #[test]
    fn test_compact_removes_fraction() {
        let (cache, clock) = cache_with_clock(MemoryCacheOptions::default());
        for i in 0..4 {
            cache.set(format!("k{i}"), i.to_string(), EntryOptions::new()).unwrap();
            clock.advance(Duration::from_secs(1));
        }

        assert_eq!(cache.compact(0.5), 2);
        assert!(!cache.contains_key("k0"));
        assert!(!cache.contains_key("k1"));
        assert!(cache.contains_key("k2"));
        assert!(cache.contains_key("k3"));
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = MemoryCache::new(MemoryCacheOptions::with_size_limit(100));
        cache.set("a", "1".to_string(), EntryOptions::new().with_size(3)).unwrap();
        cache.set("b", "2".to_string(), EntryOptions::new().with_size(4)).unwrap();

        assert_eq!(cache.remove("a").as_deref(), Some("1"));
        assert_eq!(cache.current_size(), 4);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.current_size(), 0);
    }

    #[test]
    fn test_concurrent_access() {
        let cache: MemoryCache<String> = MemoryCache::default();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let key = format!("k{}", i % 10);
                        cache.set(key.clone(), format!("{t}-{i}"), EntryOptions::new()).unwrap();
                        let _ = cache.get(&key);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 10);
    }

    #[test]
    fn test_options_deserialize() {
        let options: MemoryCacheOptions = serde_json::from_str(r#"{"size_limit": 1024}"#).unwrap();
        assert_eq!(options.size_limit, Some(1024));

        let options: MemoryCacheOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.size_limit, None);
    }
}
