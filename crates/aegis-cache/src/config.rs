//! Cache configuration, resolved per §6.1's explicit-argument >
//! environment-variable > built-in-default precedence.

use aegis_core::config::{resolve, resolve_opt};
use std::time::Duration;

/// Which backend a deployment intends to use. Selecting `RemoteKv` or
/// `RemoteSlot` here only records the intent for observability/branching —
/// this crate does not instantiate a concrete network driver; the caller
/// builds the matching backend (e.g. [`crate::backend::RemoteKvBackend`])
/// themselves and passes it to [`crate::Cache::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    RemoteKv,
    RemoteSlot,
}

impl std::str::FromStr for CacheBackendKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "remote-kv" => Ok(Self::RemoteKv),
            "remote-slot" => Ok(Self::RemoteSlot),
            _ => Err(()),
        }
    }
}

/// Cache-wide configuration: which backend, the global key prefix, and the
/// default TTL applied when a caller omits one.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub url: Option<String>,
    pub key_prefix: String,
    pub default_ttl: Option<Duration>,
    pub name: String,
}

impl CacheConfig {
    /// Resolves settings from explicit arguments, falling back to
    /// `CACHE_BACKEND`/`CACHE_URL`/`CACHE_KEY_PREFIX`/`CACHE_DEFAULT_TTL_S`,
    /// then to built-in defaults.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct CacheConfigBuilder {
    backend: Option<CacheBackendKind>,
    url: Option<String>,
    key_prefix: Option<String>,
    default_ttl: Option<Duration>,
    name: Option<String>,
}

impl CacheConfigBuilder {
    pub fn backend(mut self, backend: CacheBackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> CacheConfig {
        let default_ttl_secs: Option<u64> = resolve_opt(None, "CACHE_DEFAULT_TTL_S");
        let default_ttl = self
            .default_ttl
            .or_else(|| default_ttl_secs.map(Duration::from_secs));

        CacheConfig {
            backend: resolve(self.backend, "CACHE_BACKEND", CacheBackendKind::Memory),
            url: self.url.or_else(|| std::env::var("CACHE_URL").ok()),
            key_prefix: resolve(self.key_prefix, "CACHE_KEY_PREFIX", String::new()),
            default_ttl,
            name: self.name.unwrap_or_else(|| "<unnamed>".to_string()),
        }
    }
}
