//! A TTL cache in front of expensive, rate-limited lookups.
//!
//! [`Cache`] wraps an injected [`CacheStore`], a TTL, and an `ignore` flag so that
//! callers only deal with [`Cache::get_or_compute`]. Values are stored as JSON text.
//!
//! The read-then-write in `get_or_compute` is not atomic: two concurrent callers
//! with the same cold key may both compute and both write. The later write wins.

use super::cache_key::CacheKey;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core::fmt::Debug;
use core::time::Duration;
use ohno::IntoAppError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const LOG_TARGET: &str = "     cache";

/// How long an entry stays fresh once written.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Source of the current time for expiration decisions.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        let mut now = self.0.lock().expect("lock not poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("lock not poisoned")
    }
}

/// Key/value storage with per-entry expiration.
///
/// An entry written with a TTL must be returned unchanged by `get` until the TTL has
/// elapsed and treated as absent afterwards. Expiration is fixed at write time and
/// is not renewed by reads. Errors mean the backing store itself is unusable.
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()>;
}

/// Memoizes computations in a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    ignore: bool,
}

impl Cache {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, ignore_cache: bool) -> Self {
        Self {
            store,
            ttl,
            ignore: ignore_cache,
        }
    }

    /// A cache with the default TTL backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::default()), DEFAULT_CACHE_TTL, false)
    }

    /// Return the cached value for `key`, or run `compute`, store its result, and return it.
    ///
    /// A failing `compute` leaves the cache untouched. A failing store fails the call.
    /// When the cache is set to ignore existing entries, lookups always miss but fresh
    /// results are still written.
    pub async fn get_or_compute<T, F, Fut>(&self, key: CacheKey, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.ignore
            && let Some(text) = self.store.get(&key).await?
        {
            match serde_json::from_str(&text) {
                Ok(value) => {
                    log::debug!(target: LOG_TARGET, "Key already cached: {key}");
                    return Ok(value);
                }
                Err(e) => log::debug!(target: LOG_TARGET, "Discarding unreadable cache entry for {key}: {e:#}"),
            }
        }

        log::debug!(target: LOG_TARGET, "Key not cached, calculating: {key}");
        let value = compute().await?;

        let text = serde_json::to_string(&value).into_app_err_with(|| format!("serializing cache entry for '{key}'"))?;
        self.store.set(&key, text, self.ttl).await?;

        Ok(value)
    }
}

#[derive(Debug)]
struct MemoryEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// An in-process [`CacheStore`].
#[derive(Debug)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Number of entries held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock not poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let now = self.clock.now();
        let entries = self.entries.lock().expect("lock not poisoned");

        Ok(entries
            .get(key.as_str())
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl).into_app_err("cache TTL out of range")?;
        let expires_at = self.clock.now() + ttl;

        let _ = self
            .entries
            .lock()
            .expect("lock not poisoned")
            .insert(key.as_str().to_string(), MemoryEntry { value, expires_at });

        Ok(())
    }
}
