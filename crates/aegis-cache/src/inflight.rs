//! Single-flight coordination for `getOrSet`.
//!
//! Grounded on the request-coalescing pattern: a `Mutex<HashMap<K, Sender>>`
//! tracks who is "leading" a computation for a key. The first caller for a
//! key becomes the leader and runs the factory; everyone else joins as a
//! waiter and receives a clone of the leader's result over a broadcast
//! channel. If the leader is dropped without completing (e.g. the factory's
//! future is cancelled), waiters see a closed channel rather than hanging
//! forever.

use aegis_core::{Error, ErrorKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;

type SharedResult = Result<Vec<u8>, Error>;

pub(crate) struct InFlight {
    requests: Mutex<HashMap<String, broadcast::Sender<SharedResult>>>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Attempts to become the leader for `key`. Returns `None` if we are now
    /// the leader; returns `Some(receiver)` if another caller is already
    /// computing the value.
    pub(crate) fn try_join(&self, key: String) -> Option<broadcast::Receiver<SharedResult>> {
        let mut requests = self.requests.lock();
        if let Some(sender) = requests.get(&key) {
            Some(sender.subscribe())
        } else {
            let (tx, _rx) = broadcast::channel(1);
            requests.insert(key, tx);
            None
        }
    }

    /// Publishes the leader's result to all waiters and removes the
    /// in-flight entry.
    pub(crate) fn complete(&self, key: &str, result: SharedResult) {
        let mut requests = self.requests.lock();
        if let Some(sender) = requests.remove(key) {
            let _ = sender.send(result);
        }
    }

    /// Waits for the leader's result as a waiter.
    pub(crate) async fn wait(mut receiver: broadcast::Receiver<SharedResult>) -> SharedResult {
        match receiver.recv().await {
            Ok(result) => result,
            Err(_) => Err(Error::new(
                ErrorKind::BackendUnavailable,
                "single-flight leader was dropped without publishing a result",
            )),
        }
    }
}
