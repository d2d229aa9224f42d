//! Query coalescing
//!
//! Type-ahead search enqueues a query per keystroke but only the newest one
//! is worth running. `SearchQueue` absorbs the burst: `flush` hands back the
//! most recent query and discards the rest.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Coalesces rapid search queries down to the latest one
#[derive(Default)]
pub struct SearchQueue {
    pending: Mutex<Vec<String>>,
    abandoned: AtomicUsize,
}

impl SearchQueue {
    pub fn new() -> Self {
        SearchQueue::default()
    }

    /// Queue a query for the next flush
    pub fn enqueue(&self, query: impl Into<String>) {
        self.pending.lock().push(query.into());
    }

    /// Take the newest pending query, dropping everything older
    pub fn flush(&self) -> Option<String> {
        let mut pending = self.pending.lock();
        let latest = pending.pop();
        self.abandoned.fetch_add(pending.len(), Ordering::Relaxed);
        pending.clear();
        latest
    }

    /// Queries enqueued so far that were never returned by a flush
    pub fn abandoned_count(&self) -> usize {
        self.abandoned.load(Ordering::Relaxed)
    }

    /// Queries waiting for the next flush
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl std::fmt::Debug for SearchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchQueue")
            .field("pending", &self.pending_count())
            .field("abandoned", &self.abandoned_count())
            .finish()
    }
}
