//! The backend capability contract and the two remote-backend adapters.
//!
//! A backend is polymorphic over `{raw_get, raw_set, raw_delete,
//! raw_clear_scope, raw_keys_matching, raw_ttl, raw_expire}`. This crate
//! ships one concrete backend ([`crate::memory::MemoryBackend`]) and two
//! thin adapters ([`RemoteKvBackend`], [`RemoteSlotBackend`]) that turn a
//! caller-supplied connection into a [`CacheBackend`] — the concrete wire
//! driver (a real Redis or Memcached client) is the caller's responsibility
//! per this toolkit's scope; the adapter's job is TTL translation and
//! pushing pattern scans down to the connection when it can do them
//! natively.

use aegis_core::Error;
use async_trait::async_trait;
use std::time::Duration;

/// Remaining time-to-live for a key, distinguishing "no expiry" from "key
/// absent" the way `ttl(key)` does in the public facade (`-1` vs `-2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    Absent,
    NoExpiry,
    Remaining(Duration),
}

/// The capability set every cache backend implements.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn raw_get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// `ttl = None` means no expiry.
    async fn raw_set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), Error>;

    /// Returns true iff a live entry was removed.
    async fn raw_delete(&self, key: &str) -> Result<bool, Error>;

    /// Removes every key under `scope_prefix` (the empty string clears
    /// everything the backend can see).
    async fn raw_clear_scope(&self, scope_prefix: &str) -> Result<(), Error>;

    /// Lists keys (already scoped to the caller's prefix) matching `?`/`*`
    /// glob `pattern`.
    async fn raw_keys_matching(&self, scope_prefix: &str, pattern: &str) -> Result<Vec<String>, Error>;

    async fn raw_ttl(&self, key: &str) -> Result<TtlStatus, Error>;

    /// Returns false if the key is absent.
    async fn raw_expire(&self, key: &str, ttl: Duration) -> Result<bool, Error>;

    /// Running count of entries evicted to satisfy a capacity bound (not
    /// TTL expiry). Backends with no such bound (the remote adapters below)
    /// leave this at the default of zero; [`crate::Cache::set`] polls the
    /// delta across a call to emit `CacheEvent::Eviction`.
    fn eviction_count(&self) -> u64 {
        0
    }
}

/// A minimal connection contract for a remote key/value store (the
/// `remote-kv-store` variant of §4.1.2). A caller implements this over
/// their own Redis/Memcached/etc. client; this crate only needs the shape.
#[async_trait]
pub trait KvConnection: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), Error>;
    async fn delete(&self, key: &str) -> Result<bool, Error>;
    /// Native key scan under a prefix, if the store supports it.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, Error>;
    async fn ttl(&self, key: &str) -> Result<TtlStatus, Error>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, Error>;
}

/// Adapts a [`KvConnection`] into a [`CacheBackend`].
pub struct RemoteKvBackend<C> {
    connection: C,
}

impl<C: KvConnection> RemoteKvBackend<C> {
    pub fn new(connection: C) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl<C: KvConnection> CacheBackend for RemoteKvBackend<C> {
    async fn raw_get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        self.connection.get(key).await
    }

    async fn raw_set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), Error> {
        self.connection.set(key, value, ttl).await
    }

    async fn raw_delete(&self, key: &str) -> Result<bool, Error> {
        self.connection.delete(key).await
    }

    async fn raw_clear_scope(&self, scope_prefix: &str) -> Result<(), Error> {
        for key in self.connection.scan_prefix(scope_prefix).await? {
            self.connection.delete(&key).await?;
        }
        Ok(())
    }

    async fn raw_keys_matching(&self, scope_prefix: &str, pattern: &str) -> Result<Vec<String>, Error> {
        let keys = self.connection.scan_prefix(scope_prefix).await?;
        Ok(keys
            .into_iter()
            .filter(|key| crate::pattern::glob_match(pattern, key))
            .collect())
    }

    async fn raw_ttl(&self, key: &str) -> Result<TtlStatus, Error> {
        self.connection.ttl(key).await
    }

    async fn raw_expire(&self, key: &str, ttl: Duration) -> Result<bool, Error> {
        self.connection.expire(key, ttl).await
    }
}

/// A minimal connection contract for a remote fixed-slot cache (the
/// `remote-fixed-slot-cache` variant of §4.1.2) — a cache cluster that
/// shards keys across a fixed number of hash slots rather than exposing a
/// free-form keyspace scan. The shape mirrors [`KvConnection`]; it is kept
/// as a separate trait because a fixed-slot store typically cannot do a
/// native prefix scan at all, only per-key operations.
#[async_trait]
pub trait SlotConnection: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), Error>;
    async fn delete(&self, key: &str) -> Result<bool, Error>;
    async fn ttl(&self, key: &str) -> Result<TtlStatus, Error>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, Error>;
}

/// Adapts a [`SlotConnection`] into a [`CacheBackend`].
///
/// Because fixed-slot stores have no native prefix scan, `raw_clear_scope`
/// and `raw_keys_matching` are unsupported here — the facade's namespacing
/// and pattern features degrade to "keys you know by name" against this
/// backend, which callers should document for their users.
pub struct RemoteSlotBackend<C> {
    connection: C,
}

impl<C: SlotConnection> RemoteSlotBackend<C> {
    pub fn new(connection: C) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl<C: SlotConnection> CacheBackend for RemoteSlotBackend<C> {
    async fn raw_get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        self.connection.get(key).await
    }

    async fn raw_set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), Error> {
        self.connection.set(key, value, ttl).await
    }

    async fn raw_delete(&self, key: &str) -> Result<bool, Error> {
        self.connection.delete(key).await
    }

    async fn raw_clear_scope(&self, _scope_prefix: &str) -> Result<(), Error> {
        Err(aegis_core::Error::new(
            aegis_core::ErrorKind::InvalidArgument,
            "the fixed-slot backend has no native key enumeration; clear individual keys instead",
        ))
    }

    async fn raw_keys_matching(&self, _scope_prefix: &str, _pattern: &str) -> Result<Vec<String>, Error> {
        Err(aegis_core::Error::new(
            aegis_core::ErrorKind::InvalidArgument,
            "the fixed-slot backend has no native key enumeration",
        ))
    }

    async fn raw_ttl(&self, key: &str) -> Result<TtlStatus, Error> {
        self.connection.ttl(key).await
    }

    async fn raw_expire(&self, key: &str, ttl: Duration) -> Result<bool, Error> {
        self.connection.expire(key, ttl).await
    }
}
