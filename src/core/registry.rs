//! Registry of live workers.
//!
//! The live count is an atomic so sizing decisions read it without locking.
//! The identity set sits behind a `parking_lot::Mutex` and is only touched for
//! a single insert or remove per critical section; no lock is ever held across
//! a blocking call.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

/// Stable identifier of a worker for the lifetime of its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Set of live workers plus a lock-free count.
#[derive(Debug, Default)]
pub struct Registry {
    workers: Mutex<HashSet<WorkerId>>,
    live: AtomicUsize,
    next_id: AtomicU64,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh worker identifier. Does not register it.
    pub fn next_id(&self) -> WorkerId {
        WorkerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Add a worker. Returns `false` if it was already present.
    pub fn register(&self, id: WorkerId) -> bool {
        let mut workers = self.workers.lock();
        let inserted = workers.insert(id);
        if inserted {
            self.live.fetch_add(1, Ordering::SeqCst);
        }
        inserted
    }

    /// Remove a worker. Returns `false` if it was not present.
    pub fn deregister(&self, id: WorkerId) -> bool {
        let mut workers = self.workers.lock();
        let removed = workers.remove(&id);
        if removed {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        removed
    }

    /// Remove `id` only if that leaves more than `floor` workers live.
    ///
    /// The decision is claimed with a compare-and-swap on the live count, so
    /// concurrent callers can never take the count below `floor` together.
    pub fn release_above(&self, id: WorkerId, floor: usize) -> bool {
        let mut current = self.live.load(Ordering::SeqCst);
        loop {
            if current <= floor {
                return false;
            }
            match self.live.compare_exchange_weak(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        let removed = self.workers.lock().remove(&id);
        if !removed {
            // Not ours to release; give the slot back.
            self.live.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    /// Number of live workers.
    pub fn len(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Whether no worker is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: WorkerId) -> bool {
        self.workers.lock().contains(&id)
    }

    /// Snapshot of live worker identifiers, sorted.
    pub fn snapshot(&self) -> Vec<WorkerId> {
        let mut ids: Vec<WorkerId> = self.workers.lock().iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}
