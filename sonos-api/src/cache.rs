//! Short-lived cache of successful action responses

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use soap_client::ActionResponse;
use tokio::time::Instant;

/// Cache key: endpoint, action and arguments sorted by name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: String,
    action: String,
    args: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(endpoint: &str, action: &str, args: &[(&str, &str)]) -> Self {
        let mut args: Vec<(String, String)> = args
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        args.sort();
        Self {
            endpoint: endpoint.to_string(),
            action: action.to_string(),
            args,
        }
    }
}

struct Entry {
    stored_at: Instant,
    response: ActionResponse,
}

/// Response cache with a fixed time-to-live
///
/// Expired entries are evicted when they are looked up, and every insert
/// sweeps out whatever else has expired.
pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Option<ActionResponse> {
        let mut entries = self.entries.lock();
        let fresh = match entries.get(key) {
            Some(entry) => entry.stored_at.elapsed() < self.ttl,
            None => return None,
        };
        if fresh {
            entries.get(key).map(|entry| entry.response.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    pub fn insert(&self, key: CacheKey, response: ActionResponse) {
        let mut entries = self.entries.lock();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        entries.insert(
            key,
            Entry {
                stored_at: Instant::now(),
                response,
            },
        );
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.len())
            .finish()
    }
}
