//! Time-bounded cache of fetched FX tables.
//!
//! Owned by an [`FxProvider`](super::FxProvider) instance; there is no
//! process-wide cache. Reads and writes serialize through one mutex, which is
//! plenty: entries are small and a hit saves a network round-trip.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::fx::FxTable;

struct Entry {
    table: FxTable,
    expires: Instant,
}

pub(crate) struct FxCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl FxCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<FxTable> {
        let mut entries = self.entries.lock().expect("fx cache poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires > Instant::now() => Some(entry.table.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub(crate) fn insert(&self, key: String, table: FxTable) {
        let entry = Entry {
            table,
            expires: Instant::now() + self.ttl,
        };
        self.entries
            .lock()
            .expect("fx cache poisoned")
            .insert(key, entry);
    }
}
