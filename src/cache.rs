use itertools::Itertools;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::{Duration, Instant};

use crate::frame::Frame;

/// Rendered replies keyed by normalized command.
///
/// The cache lives as long as the server that owns it. Without a TTL entries are kept forever,
/// so replies go stale if the data tier's records change while the gateway runs. With a TTL,
/// an entry older than it counts as a miss and is dropped on lookup. Clones share the same
/// entries.
#[derive(Clone, Debug)]
pub struct Cache {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Option<Duration>,
}

#[derive(Debug)]
struct Entry {
    frame: Frame,
    stored_at: Instant,
}

impl Cache {
    pub fn new(ttl: Option<Duration>) -> Cache {
        Cache {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub fn lookup(&self, key: &str) -> Option<Frame> {
        let mut entries = self.lock();

        let expired = match (entries.get(key), self.ttl) {
            (None, _) => return None,
            (Some(entry), Some(ttl)) => entry.stored_at.elapsed() >= ttl,
            (Some(_), None) => false,
        };

        if expired {
            entries.remove(key);
            return None;
        }

        entries.get(key).map(|entry| entry.frame.clone())
    }

    /// Last writer wins.
    pub fn store(&self, key: String, frame: Frame) {
        let entry = Entry {
            frame,
            stored_at: Instant::now(),
        };
        self.lock().insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // Entries are replaced whole, a panic elsewhere cannot leave one half written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Normalized command key: upper-cased, runs of whitespace collapsed to a single space.
pub fn key(line: &str) -> String {
    line.to_uppercase().split_whitespace().join(" ")
}
