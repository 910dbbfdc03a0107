//! The rate-limit record store contract (spec §4.3.2).
//!
//! `{get, set, delete, iterate}` — the same shape as the source system's
//! store interface. Atomic increment is explicitly not required of a
//! store; the middleware performs read-modify-write under whatever
//! synchronization the store documents, same as a remote cache backend
//! doesn't guarantee atomic `getOrSet` across instances.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-client-key state: `count` within the active window, and the
/// instant the window resets.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRecord {
    pub count: u64,
    pub reset_at: Instant,
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<RateLimitRecord>;
    async fn set(&self, key: &str, record: RateLimitRecord);
    async fn delete(&self, key: &str);
    /// All currently stored `(key, record)` pairs. Lets a custom store
    /// implement its own expiry sweep without a per-store eviction
    /// callback; [`InMemoryStore`] sweeps its map directly instead, since
    /// it already owns the concrete type.
    async fn iterate(&self) -> Vec<(String, RateLimitRecord)>;
}

type RecordMap = std::sync::Arc<Mutex<HashMap<String, RateLimitRecord>>>;

/// The default in-process store: a single mutex-guarded map plus a
/// background sweeper that removes expired records every
/// `min(window, 60s)` (spec §4.3.2). The sweeper holds only a weak
/// reference to the map, so it exits on its own once the store is
/// dropped instead of needing an explicit `close()`.
pub struct InMemoryStore {
    records: RecordMap,
    sweeper: tokio::task::JoinHandle<()>,
}

impl InMemoryStore {
    /// Builds a store and spawns its sweeper task at the given window's
    /// sweep interval.
    pub fn new(window: Duration) -> Self {
        let records: RecordMap = std::sync::Arc::new(Mutex::new(HashMap::new()));
        let sweep_interval = window.min(Duration::from_secs(60)).max(Duration::from_millis(1));

        let weak = std::sync::Arc::downgrade(&records);
        let sweeper = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                interval.tick().await;
                let Some(records) = weak.upgrade() else {
                    break;
                };
                let now = Instant::now();
                records.lock().unwrap().retain(|_, record| record.reset_at > now);
            }
        });

        Self { records, sweeper }
    }
}

impl Drop for InMemoryStore {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

#[async_trait]
impl RateLimitStore for InMemoryStore {
    async fn get(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.lock().unwrap().get(key).copied()
    }

    async fn set(&self, key: &str, record: RateLimitRecord) {
        self.records.lock().unwrap().insert(key.to_string(), record);
    }

    async fn delete(&self, key: &str) {
        self.records.lock().unwrap().remove(key);
    }

    async fn iterate(&self) -> Vec<(String, RateLimitRecord)> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}
