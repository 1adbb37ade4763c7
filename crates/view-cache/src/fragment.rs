//! Rendered fragment caching with single-renderer protection.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::CacheTagKey;
use crate::memory::{CachePriority, EntryOptions, MemoryCache};

/// Sliding expiration applied when a policy sets no expiration.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(30);

/// Status of a fragment lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from cache.
    Hit,
    /// Rendered and stored.
    Miss,
    /// Rendered without caching.
    Bypass,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Bypass => write!(f, "BYPASS"),
        }
    }
}

/// Caching policy for one fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentCachePolicy {
    /// Whether the fragment is cached at all.
    pub enabled: bool,
    /// Expire at an absolute time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<DateTime<Utc>>,
    /// Expire a fixed time after rendering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_after: Option<Duration>,
    /// Expire after a period without hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_sliding: Option<Duration>,
    /// Eviction priority under memory pressure.
    pub priority: CachePriority,
}

impl Default for FragmentCachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            expires_on: None,
            expires_after: None,
            expires_sliding: None,
            priority: CachePriority::Normal,
        }
    }
}

impl FragmentCachePolicy {
    /// Create an enabled policy with default expiration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a policy that never caches.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Expire at an absolute time.
    pub fn expires_on(mut self, at: DateTime<Utc>) -> Self {
        self.expires_on = Some(at);
        self
    }

    /// Expire a fixed time after rendering.
    pub fn expires_after(mut self, ttl: Duration) -> Self {
        self.expires_after = Some(ttl);
        self
    }

    /// Expire after a period without hits.
    pub fn expires_sliding(mut self, window: Duration) -> Self {
        self.expires_sliding = Some(window);
        self
    }

    /// Set the eviction priority.
    pub fn with_priority(mut self, priority: CachePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Entry options for content of `size` bytes.
    pub fn entry_options(&self, size: u64) -> EntryOptions {
        let mut options = EntryOptions::new()
            .with_priority(self.priority)
            .with_size(size);

        if let Some(at) = self.expires_on {
            options = options.with_absolute_expiration(at);
        }
        if let Some(ttl) = self.expires_after {
            options = options.expires_after(ttl);
        }
        if let Some(window) = self.expires_sliding {
            options = options.with_sliding_expiration(window);
        }
        if self.expires_on.is_none() && self.expires_after.is_none() && self.expires_sliding.is_none() {
            options = options.with_sliding_expiration(DEFAULT_EXPIRATION);
        }

        options
    }
}

/// Outcome of one render, shared with every caller that waited on it.
struct Flight<E> {
    outcome: tokio::sync::OnceCell<Result<String, E>>,
}

impl<E> Flight<E> {
    fn new() -> Self {
        Self {
            outcome: tokio::sync::OnceCell::new(),
        }
    }
}

type FlightKey = (String, TypeId);

/// Cache of rendered fragments keyed by `CacheTagKey`.
///
/// Concurrent misses for the same key render once. The other callers wait
/// and receive that render's content, or its error. A failed render is not
/// remembered: the next call after it completes renders again.
pub struct FragmentCache {
    cache: MemoryCache<String>,
    flights: Mutex<HashMap<FlightKey, Arc<dyn Any + Send + Sync>>>,
}

impl Default for FragmentCache {
    fn default() -> Self {
        Self::new(MemoryCache::default())
    }
}

impl FragmentCache {
    /// Create a fragment cache over a memory cache.
    pub fn new(cache: MemoryCache<String>) -> Self {
        Self {
            cache,
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &MemoryCache<String> {
        &self.cache
    }

    /// Get cached content for a key.
    pub fn get(&self, key: &CacheTagKey) -> Option<String> {
        self.cache.get(&key.generate_key())
    }

    /// Store rendered content under a key.
    pub fn set(&self, key: &CacheTagKey, content: String, policy: &FragmentCachePolicy) {
        if !policy.enabled {
            return;
        }

        let key_str = key.generate_key();
        self.store_rendered(&key_str, content, policy);
    }

    /// Remove a cached fragment.
    pub fn remove(&self, key: &CacheTagKey) -> Option<String> {
        self.cache.remove(&key.generate_key())
    }

    /// Get a fragment, rendering and storing it on a miss.
    ///
    /// Render errors are returned to the caller and to every caller waiting
    /// on the same render. Nothing is cached for them.
    pub async fn get_or_render<F, Fut, E>(
        &self,
        key: &CacheTagKey,
        policy: &FragmentCachePolicy,
        render: F,
    ) -> Result<(String, CacheStatus), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: Clone + Send + Sync + 'static,
    {
        if !policy.enabled {
            let content = render().await?;
            return Ok((content, CacheStatus::Bypass));
        }

        let key_str = key.generate_key();

        if let Some(content) = self.cache.get(&key_str) {
            tracing::debug!(key = %key_str, "fragment cache hit");
            return Ok((content, CacheStatus::Hit));
        }

        let flight = self.join_flight::<E>(&key_str);
        let rendered = AtomicBool::new(false);

        let outcome = {
            let rendered = &rendered;
            let key_str = key_str.as_str();
            flight
                .outcome
                .get_or_init(move || async move {
                    // Another caller may have rendered while we waited.
                    if let Some(content) = self.cache.get(key_str) {
                        return Ok(content);
                    }

                    tracing::debug!(key = %key_str, "fragment cache miss, rendering");
                    rendered.store(true, Ordering::SeqCst);
                    let content = render().await?;
                    self.store_rendered(key_str, content.clone(), policy);
                    Ok(content)
                })
                .await
                .clone()
        };

        self.finish_flight(&key_str, &flight);

        let status = if rendered.load(Ordering::SeqCst) {
            CacheStatus::Miss
        } else {
            tracing::debug!(key = %key_str, "fragment rendered by concurrent caller");
            CacheStatus::Hit
        };

        match outcome {
            Ok(content) => Ok((content, status)),
            Err(e) => {
                tracing::debug!(key = %key_str, "fragment render failed");
                Err(e)
            }
        }
    }

    fn store_rendered(&self, key: &str, content: String, policy: &FragmentCachePolicy) {
        let options = policy.entry_options(content.len() as u64);
        if let Err(e) = self.cache.set(key, content, options) {
            tracing::warn!(key = %key, error = %e, "failed to store fragment");
        }
    }

    fn join_flight<E>(&self, key: &str) -> Arc<Flight<E>>
    where
        E: Send + Sync + 'static,
    {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = flights
            .entry((key.to_string(), TypeId::of::<E>()))
            .or_insert_with(|| Arc::new(Flight::<E>::new()) as Arc<dyn Any + Send + Sync>);

        match Arc::clone(slot).downcast::<Flight<E>>() {
            Ok(flight) => flight,
            Err(_) => {
                let flight = Arc::new(Flight::<E>::new());
                *slot = Arc::clone(&flight) as Arc<dyn Any + Send + Sync>;
                flight
            }
        }
    }

    /// Forget a completed flight so later calls start a new one.
    fn finish_flight<E>(&self, key: &str, flight: &Arc<Flight<E>>)
    where
        E: Send + Sync + 'static,
    {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        let id = (key.to_string(), TypeId::of::<E>());
        let current = flights
            .get(&id)
            .is_some_and(|f| std::ptr::eq(Arc::as_ptr(f) as *const (), Arc::as_ptr(flight) as *const ()));
        if current {
            flights.remove(&id);
        }
    }
}

impl std::fmt::Debug for FragmentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentCache")
            .field("cache", &self.cache)
            .finish()
    }
}
