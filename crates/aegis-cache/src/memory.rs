//! The in-memory cache backend: LRU eviction bounded by both entry count
//! and total byte size, with TTL expiry checked opportunistically on
//! access and swept periodically in the background.

use crate::backend::{CacheBackend, TtlStatus};
use aegis_core::Error;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
    size: usize,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

struct Inner {
    entries: LruCache<String, Entry>,
    total_bytes: usize,
}

/// The default size function: the length of the encoded value in bytes.
pub fn byte_len_size_fn(bytes: &[u8]) -> usize {
    bytes.len()
}

/// An in-memory [`CacheBackend`] bounded by entry count and total byte
/// size, evicting least-recently-used entries to stay within both.
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    max_bytes: Option<usize>,
    size_fn: Box<dyn Fn(&[u8]) -> usize + Send + Sync>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    evictions: AtomicU64,
}

impl MemoryBackend {
    /// Builds a backend bounded by `max_entries` and, if given, `max_bytes`
    /// as measured by `size_fn`. Spawns a background sweeper that removes
    /// expired entries every `sweep_interval`.
    pub fn new(
        max_entries: usize,
        max_bytes: Option<usize>,
        size_fn: impl Fn(&[u8]) -> usize + Send + Sync + 'static,
        sweep_interval: Duration,
    ) -> std::sync::Arc<Self> {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::new(1).unwrap());

        let backend = std::sync::Arc::new(Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                total_bytes: 0,
            }),
            max_bytes,
            size_fn: Box::new(size_fn),
            sweeper: Mutex::new(None),
            evictions: AtomicU64::new(0),
        });

        let weak = std::sync::Arc::downgrade(&backend);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                interval.tick().await;
                match weak.upgrade() {
                    Some(backend) => backend.sweep_expired(),
                    None => break,
                }
            }
        });
        *backend.sweeper.lock().unwrap() = Some(handle);

        backend
    }

    fn sweep_expired(&self) {
        let mut inner = self.inner.lock().unwrap();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            if let Some(entry) = inner.entries.pop(&key) {
                inner.total_bytes = inner.total_bytes.saturating_sub(entry.size);
            }
        }
    }

    fn enforce_bounds(inner: &mut Inner, max_bytes: Option<usize>) -> u64 {
        let Some(max_bytes) = max_bytes else { return 0 };
        let mut evicted = 0u64;
        while inner.total_bytes > max_bytes {
            match inner.entries.pop_lru() {
                Some((_, entry)) => {
                    inner.total_bytes = inner.total_bytes.saturating_sub(entry.size);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }
}

impl Drop for MemoryBackend {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().unwrap().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn raw_get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let mut inner = self.inner.lock().unwrap();
        let expired = inner.entries.peek(key).is_some_and(|e| e.is_expired());
        if expired {
            if let Some(entry) = inner.entries.pop(key) {
                inner.total_bytes = inner.total_bytes.saturating_sub(entry.size);
            }
            return Ok(None);
        }

        Ok(inner.entries.get(key).map(|e| e.value.clone()))
    }

    async fn raw_set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), Error> {
        let size = (self.size_fn)(&value);
        let entry = Entry {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
            size,
        };

        let mut inner = self.inner.lock().unwrap();
        match inner.entries.push(key.to_string(), entry) {
            Some((evicted_key, evicted)) if evicted_key != key => {
                inner.total_bytes = inner.total_bytes.saturating_sub(evicted.size);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
            Some((_, old)) => {
                inner.total_bytes = inner.total_bytes.saturating_sub(old.size);
            }
            None => {}
        }
        inner.total_bytes += size;

        let evicted_for_bytes = Self::enforce_bounds(&mut inner, self.max_bytes);
        if evicted_for_bytes > 0 {
            self.evictions.fetch_add(evicted_for_bytes, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn raw_delete(&self, key: &str) -> Result<bool, Error> {
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.pop(key) {
            Some(entry) => {
                inner.total_bytes = inner.total_bytes.saturating_sub(entry.size);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn raw_clear_scope(&self, scope_prefix: &str) -> Result<(), Error> {
        let mut inner = self.inner.lock().unwrap();
        let keys: Vec<String> = inner
            .entries
            .iter()
            .map(|(k, _)| k.clone())
            .filter(|k| k.starts_with(scope_prefix))
            .collect();

        for key in keys {
            if let Some(entry) = inner.entries.pop(&key) {
                inner.total_bytes = inner.total_bytes.saturating_sub(entry.size);
            }
        }
        Ok(())
    }

    async fn raw_keys_matching(&self, scope_prefix: &str, pattern: &str) -> Result<Vec<String>, Error> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(k, _)| k.clone())
            .filter(|k| k.starts_with(scope_prefix))
            .filter(|k| crate::pattern::glob_match(pattern, &k[scope_prefix.len()..]))
            .collect())
    }

    async fn raw_ttl(&self, key: &str) -> Result<TtlStatus, Error> {
        let inner = self.inner.lock().unwrap();
        match inner.entries.peek(key) {
            None => Ok(TtlStatus::Absent),
            Some(entry) if entry.is_expired() => Ok(TtlStatus::Absent),
            Some(Entry { expires_at: None, .. }) => Ok(TtlStatus::NoExpiry),
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => {
                let remaining = at.saturating_duration_since(Instant::now());
                Ok(TtlStatus::Remaining(remaining))
            }
        }
    }

    async fn raw_expire(&self, key: &str, ttl: Duration) -> Result<bool, Error> {
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn eviction_count(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}
