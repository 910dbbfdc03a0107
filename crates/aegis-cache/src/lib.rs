//! A backend-agnostic key/value cache with TTL, glob-pattern operations,
//! namespacing, a single-flight `get-or-compute` primitive, and pluggable
//! serialization.
//!
//! ```
//! use aegis_cache::{Cache, CacheConfig};
//! use aegis_cache::memory::{byte_len_size_fn, MemoryBackend};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), aegis_core::Error> {
//! let backend = MemoryBackend::new(1000, None, byte_len_size_fn, Duration::from_secs(30));
//! let cache = Cache::new(backend, CacheConfig::builder().build());
//!
//! cache.set("greeting", &"hello", Some(Duration::from_secs(60))).await?;
//! let value: Option<String> = cache.get("greeting").await?;
//! assert_eq!(value, Some("hello".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod events;
pub mod inflight;
pub mod memory;
pub mod pattern;

pub use backend::{CacheBackend, KvConnection, SlotConnection, TtlStatus};
pub use config::{CacheBackendKind, CacheConfig};
pub use events::CacheEvent;

use aegis_core::{AegisEvent as _, Error, ErrorKind, EventListeners, JsonSerializer, Serializer};
use inflight::InFlight;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The cache facade: one instance owns one backend and namespace prefix.
/// Cloning is cheap (everything inside is `Arc`-shared) and the clone talks
/// to the same backend and single-flight map.
///
/// Generic over the serializer `S` rather than boxing it as `dyn Serializer`:
/// [`Serializer::encode`]/[`decode`](Serializer::decode) are generic methods,
/// so the trait isn't object-safe and a cache needs static dispatch to a
/// concrete `S` (defaulting to [`JsonSerializer`]) the way `HashMap` is
/// generic over its hasher instead of boxing it.
pub struct Cache<S: Serializer = JsonSerializer> {
    backend: Arc<dyn CacheBackend>,
    serializer: Arc<S>,
    config: CacheConfig,
    events: Arc<EventListeners<CacheEvent>>,
    in_flight: Arc<InFlight>,
}

impl<S: Serializer> Clone for Cache<S> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            serializer: Arc::clone(&self.serializer),
            config: self.config.clone(),
            events: Arc::clone(&self.events),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl Cache<JsonSerializer> {
    /// Builds a cache over the given backend, using the default JSON
    /// serializer.
    pub fn new(backend: impl CacheBackend + 'static, config: CacheConfig) -> Self {
        Self::with_serializer(backend, config, JsonSerializer)
    }
}

impl<S: Serializer> Cache<S> {
    /// Builds a cache over the given backend and serializer.
    pub fn with_serializer(backend: impl CacheBackend + 'static, config: CacheConfig, serializer: S) -> Self {
        Self {
            backend: Arc::new(backend),
            serializer: Arc::new(serializer),
            config,
            events: Arc::new(EventListeners::new()),
            in_flight: Arc::new(InFlight::new()),
        }
    }

    /// Registers an event listener for cache hits/misses/evictions/writes.
    pub fn on_event<L>(&mut self, listener: L)
    where
        L: aegis_core::EventListener<CacheEvent> + 'static,
    {
        Arc::get_mut(&mut self.events)
            .expect("on_event must be called before the cache is cloned/shared")
            .add(listener);
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    fn emit(&self, event: CacheEvent) {
        self.events.emit(&event);
    }

    /// Emits one `CacheEvent::Eviction` per entry the backend reports
    /// having evicted since `evicted_before` (a no-op for backends that
    /// never report evictions, per [`CacheBackend::eviction_count`]).
    fn emit_evictions(&self, evicted_before: u64) {
        let evicted_after = self.backend.eviction_count();
        for _ in 0..evicted_after.saturating_sub(evicted_before) {
            self.emit(CacheEvent::Eviction {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
        }
    }

    /// Returns the last written value for `key`, or `None` if absent or
    /// expired.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        let full_key = self.full_key(key);
        match self.backend.raw_get(&full_key).await? {
            Some(bytes) => {
                self.emit(CacheEvent::Hit {
                    name: self.config.name.clone(),
                    timestamp: Instant::now(),
                });
                Ok(Some(self.serializer.decode(&bytes)?))
            }
            None => {
                self.emit(CacheEvent::Miss {
                    name: self.config.name.clone(),
                    timestamp: Instant::now(),
                });
                Ok(None)
            }
        }
    }

    /// Writes `value` for `key`, replacing any prior value. `ttl = None`
    /// uses the cache's configured default TTL (itself possibly absent,
    /// meaning no expiry). A zero or negative TTL is rejected.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), Error> {
        if let Some(ttl) = ttl {
            if ttl.is_zero() {
                return Err(Error::invalid_argument("ttl must be positive"));
            }
        }

        let full_key = self.full_key(key);
        let bytes = self.serializer.encode(value)?;
        let effective_ttl = ttl.or(self.config.default_ttl);
        let evicted_before = self.backend.eviction_count();
        self.backend.raw_set(&full_key, bytes, effective_ttl).await?;

        self.emit(CacheEvent::Set {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
        });
        self.emit_evictions(evicted_before);
        Ok(())
    }

    /// `true` iff `get(key)` would return a value.
    pub async fn has(&self, key: &str) -> Result<bool, Error> {
        let full_key = self.full_key(key);
        Ok(self.backend.raw_get(&full_key).await?.is_some())
    }

    /// Removes `key`. Returns `true` iff a live entry was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        let full_key = self.full_key(key);
        let removed = self.backend.raw_delete(&full_key).await?;
        if removed {
            self.emit(CacheEvent::Delete {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
        }
        Ok(removed)
    }

    /// Removes every entry under this cache's namespace.
    pub async fn clear(&self) -> Result<(), Error> {
        self.backend.raw_clear_scope(&self.config.key_prefix).await
    }

    /// Reads multiple keys; the result order matches the input order.
    pub async fn get_many<T: DeserializeOwned>(&self, keys: &[&str]) -> Result<Vec<Option<T>>, Error> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.get(key).await?);
        }
        Ok(results)
    }

    /// Writes multiple entries with the same TTL. Attempts every key even
    /// if an earlier one fails, then surfaces the first error encountered.
    pub async fn set_many<T: Serialize>(
        &self,
        entries: &[(&str, &T)],
        ttl: Option<Duration>,
    ) -> Result<(), Error> {
        let mut first_error = None;
        for (key, value) in entries {
            if let Err(e) = self.set(key, *value, ttl).await {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Deletes multiple keys, returning the number actually removed.
    pub async fn delete_many(&self, keys: &[&str]) -> Result<usize, Error> {
        let mut count = 0;
        for key in keys {
            if self.delete(key).await? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Lists keys matching a `?`/`*` glob `pattern` (applied to the
    /// post-namespace key). `None` matches every key in this namespace.
    pub async fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>, Error> {
        let pattern = pattern.unwrap_or("*");
        self.backend.raw_keys_matching(&self.config.key_prefix, pattern).await
    }

    /// Deletes every key matching `pattern`, returning the count removed.
    pub async fn delete_pattern(&self, pattern: &str) -> Result<usize, Error> {
        let matching = self.keys(Some(pattern)).await?;
        let mut count = 0;
        for key in &matching {
            let stripped = key.strip_prefix(&self.config.key_prefix).unwrap_or(key);
            if self.delete(stripped).await? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Seconds remaining before `key` expires, `-1` if it never expires,
    /// or `-2` if absent.
    pub async fn ttl(&self, key: &str) -> Result<i64, Error> {
        let full_key = self.full_key(key);
        Ok(match self.backend.raw_ttl(&full_key).await? {
            TtlStatus::Absent => -2,
            TtlStatus::NoExpiry => -1,
            TtlStatus::Remaining(d) => d.as_secs() as i64,
        })
    }

    /// Sets a new TTL for an existing key. `false` if the key is absent.
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, Error> {
        let full_key = self.full_key(key);
        self.backend.raw_expire(&full_key, ttl).await
    }

    /// Returns a view scoped to `prefix`, composed with this cache's own
    /// prefix via `:`. The view shares this cache's backend, serializer,
    /// event listeners, and single-flight map.
    pub fn namespace(&self, prefix: &str) -> Cache<S> {
        let key_prefix = if self.config.key_prefix.is_empty() {
            format!("{prefix}:")
        } else {
            format!("{}{}:", self.config.key_prefix, prefix)
        };

        Cache {
            backend: Arc::clone(&self.backend),
            serializer: Arc::clone(&self.serializer),
            config: CacheConfig {
                key_prefix,
                ..self.config.clone()
            },
            events: Arc::clone(&self.events),
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Single-flight get-or-compute: concurrent calls for the same key run
    /// `factory` at most once and every caller observes the same value (or
    /// the same error).
    pub async fn get_or_set<T, F, Fut>(&self, key: &str, factory: F, ttl: Option<Duration>) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let full_key = self.full_key(key);

        if let Some(bytes) = self.backend.raw_get(&full_key).await? {
            self.emit(CacheEvent::Hit {
                name: self.config.name.clone(),
                timestamp: Instant::now(),
            });
            return self.serializer.decode(&bytes);
        }

        match self.in_flight.try_join(full_key.clone()) {
            Some(receiver) => {
                let bytes = InFlight::wait(receiver).await?;
                self.serializer.decode(&bytes)
            }
            None => {
                self.emit(CacheEvent::Miss {
                    name: self.config.name.clone(),
                    timestamp: Instant::now(),
                });

                let result = factory().await;
                match &result {
                    Ok(value) => match self.serializer.encode(value) {
                        Ok(bytes) => {
                            let effective_ttl = ttl.or(self.config.default_ttl);
                            let evicted_before = self.backend.eviction_count();
                            let _ = self.backend.raw_set(&full_key, bytes.clone(), effective_ttl).await;
                            self.emit_evictions(evicted_before);
                            self.in_flight.complete(&full_key, Ok(bytes));
                            self.emit(CacheEvent::Set {
                                name: self.config.name.clone(),
                                timestamp: Instant::now(),
                            });
                        }
                        Err(e) => {
                            self.in_flight.complete(&full_key, Err(e.clone()));
                        }
                    },
                    Err(e) => {
                        self.in_flight.complete(&full_key, Err(e.clone()));
                    }
                }
                result
            }
        }
    }
}

impl<S: Serializer> std::fmt::Debug for Cache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.config.name)
            .field("key_prefix", &self.config.key_prefix)
            .finish_non_exhaustive()
    }
}

fn _assert_serialization_error_kind() -> ErrorKind {
    ErrorKind::SerializationFailed
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory::{byte_len_size_fn, MemoryBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn memory_cache(prefix: &str) -> Cache {
        let backend = MemoryBackend::new(1000, None, byte_len_size_fn, Duration::from_secs(30));
        Cache::new(
            backend,
            CacheConfig::builder().key_prefix(prefix).build(),
        )
    }

    #[tokio::test]
    async fn round_trip_before_ttl_elapses() {
        let cache = memory_cache("");
        cache
            .set("greeting", &"hello".to_string(), Some(Duration::from_secs(1)))
            .await
            .unwrap();

        let value: Option<String> = cache.get("greeting").await.unwrap();
        assert_eq!(value, Some("hello".to_string()));
    }

    #[tokio::test]
    async fn expiry_makes_get_and_has_report_absent() {
        let cache = memory_cache("");
        cache
            .set("greeting", &"hello".to_string(), Some(Duration::from_millis(30)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        let value: Option<String> = cache.get("greeting").await.unwrap();
        assert_eq!(value, None);
        assert!(!cache.has("greeting").await.unwrap());
        assert_eq!(cache.ttl("greeting").await.unwrap(), -2);
    }

    #[tokio::test]
    async fn namespace_isolation() {
        let backend = MemoryBackend::new(1000, None, byte_len_size_fn, Duration::from_secs(30));
        let root = Cache::new(backend, CacheConfig::builder().build());
        let ns_a = root.namespace("a");
        let ns_b = root.namespace("b");

        ns_a.set("k", &1i32, None).await.unwrap();
        let from_b: Option<i32> = ns_b.get("k").await.unwrap();
        assert_eq!(from_b, None);

        let from_a: Option<i32> = ns_a.get("k").await.unwrap();
        assert_eq!(from_a, Some(1));
    }

    #[tokio::test]
    async fn zero_ttl_is_rejected() {
        let cache = memory_cache("");
        let err = cache.set("k", &1i32, Some(Duration::ZERO)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn single_flight_runs_the_factory_once() {
        let cache = memory_cache("");
        let call_count = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let call_count = Arc::clone(&call_count);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_set(
                        "k",
                        || async move {
                            call_count.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok::<i32, Error>(42)
                        },
                        Some(Duration::from_secs(60)),
                    )
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert!(results.iter().all(|v| *v == 42));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        let cached: Option<i32> = cache.get("k").await.unwrap();
        assert_eq!(cached, Some(42));
    }

    #[tokio::test]
    async fn delete_pattern_removes_matching_keys() {
        let cache = memory_cache("");
        cache.set("user:1", &"a".to_string(), None).await.unwrap();
        cache.set("user:2", &"b".to_string(), None).await.unwrap();
        cache.set("order:1", &"c".to_string(), None).await.unwrap();

        let removed = cache.delete_pattern("user:*").await.unwrap();
        assert_eq!(removed, 2);

        let remaining = cache.keys(None).await.unwrap();
        assert_eq!(remaining, vec!["order:1".to_string()]);
    }

    #[tokio::test]
    async fn overflowing_capacity_emits_an_eviction_event() {
        let backend = MemoryBackend::new(1, None, byte_len_size_fn, Duration::from_secs(30));
        let mut cache = Cache::new(backend, CacheConfig::builder().build());

        let evictions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&evictions);
        cache.on_event(aegis_core::FnListener::new(move |event: &CacheEvent| {
            if matches!(event, CacheEvent::Eviction { .. }) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        cache.set("a", &"1".to_string(), None).await.unwrap();
        assert_eq!(evictions.load(Ordering::SeqCst), 0);

        cache.set("b", &"2".to_string(), None).await.unwrap();
        assert_eq!(evictions.load(Ordering::SeqCst), 1);
    }
}
