use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use ahash::{HashMap, HashMapExt};
use parking_lot::RwLock;
use tokio::{task::AbortHandle, time::Instant};

use crate::{options::ClientId, statistics::Counts};

/// A registered connection.
///
/// The entry owns the abort handle of the push task that feeds the
/// connection, removing an entry from the registry is what makes the task
/// stoppable from the outside.
#[derive(Debug)]
pub struct Entry {
    /// Identifies one particular stream, several streams can have been
    /// opened with the same client id over time.
    pub connection: u64,
    pub interval: i64,
    pub connected_at: Instant,
    pub counts: Arc<Counts>,
    pub task: AbortHandle,
    /// Set once the disconnect of the connection has been reported.
    pub released: Arc<AtomicBool>,
}

/// A point in time copy of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub connection: u64,
    pub interval: i64,
    pub uptime: Duration,
    pub send_frames: usize,
    pub send_bytes: usize,
    pub dropped_frames: usize,
}

/// Mapping from client id to its open stream.
///
/// There is at most one entry per client id, a later connection with the
/// same id replaces the earlier entry.
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<ClientId, Entry>>,
    sequence: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(1024)),
            sequence: AtomicU64::new(0),
        }
    }
}

impl ConnectionRegistry {
    /// Allocate a token for a new connection.
    pub fn next_connection(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Register an entry, returning the entry it replaced if any.
    pub fn insert(&self, id: ClientId, entry: Entry) -> Option<Entry> {
        self.entries.write().insert(id, entry)
    }

    pub fn remove(&self, id: &str) -> Option<Entry> {
        self.entries.write().remove(id)
    }

    /// Remove the entry only if it still belongs to the given connection.
    ///
    /// A connection that was replaced by a newer one with the same client id
    /// must not take the newer entry with it when it closes.
    pub fn remove_if(&self, id: &str, connection: u64) -> Option<Entry> {
        let mut entries = self.entries.write();
        if entries.get(id).map(|it| it.connection) != Some(connection) {
            return None;
        }

        entries.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Snapshot> {
        self.entries.read().get(id).map(|entry| Snapshot {
            connection: entry.connection,
            interval: entry.interval,
            uptime: entry.connected_at.elapsed(),
            send_frames: entry.counts.send_frames.get(),
            send_bytes: entry.counts.send_bytes.get(),
            dropped_frames: entry.counts.dropped_frames.get(),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn ids(&self) -> Vec<ClientId> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Take every entry out of the registry.
    pub fn drain(&self) -> Vec<(ClientId, Entry)> {
        self.entries.write().drain().collect()
    }
}
