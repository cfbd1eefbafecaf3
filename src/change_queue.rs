//! Versioned edit log attached to every resource.
//!
//! A [`ChangeQueue`] is appended to by the application whenever it mutates a
//! resource, from any thread, and read by the drivers on the device thread to
//! find out which parts of the resource changed since the last sync.
//!
//! # Versions
//!
//! Every recorded edit bumps the queue's version and is stamped with it. A new
//! queue starts at version 1, so [`ChangeQueue::UNSYNCED`] (0) is never issued
//! and works as the "never synced" sentinel for resource handles.
//!
//! ```
//! use redlilium_sync::ChangeQueue;
//!
//! let queue = ChangeQueue::new();
//! let synced = queue.version();
//!
//! queue.record_edit("a");
//! queue.record_edit("b");
//!
//! assert!(queue.is_version_stale(synced));
//! assert_eq!(queue.changes_since(synced), vec!["a", "b"]);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Append-only, bounded and versioned log of edits.
#[derive(Debug)]
pub struct ChangeQueue<E> {
    /// Current version, readable without taking the edit lock.
    version: AtomicU64,
    inner: Mutex<QueueInner<E>>,
}

#[derive(Debug)]
struct QueueInner<E> {
    edits: VecDeque<(u64, E)>,
    capacity: usize,
    /// Version of the newest edit dropped from the front of the log.
    evicted_through: u64,
}

impl<E> ChangeQueue<E> {
    /// Version that is never issued; handles start from it.
    pub const UNSYNCED: u64 = 0;

    /// Number of edits retained by default before the oldest are evicted.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Create an empty queue with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create an empty queue retaining at most `capacity` edits.
    ///
    /// A capacity of 0 retains nothing, so every stale reader has lost changes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            version: AtomicU64::new(1),
            inner: Mutex::new(QueueInner {
                edits: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
                capacity,
                evicted_through: Self::UNSYNCED,
            }),
        }
    }

    /// Maximum number of retained edits.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Number of edits currently retained.
    pub fn len(&self) -> usize {
        self.inner.lock().edits.len()
    }

    /// Returns true if no edits are retained.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().edits.is_empty()
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Returns true if a reader that synced at `version` is behind.
    pub fn is_version_stale(&self, version: u64) -> bool {
        version < self.version()
    }

    /// Returns true if edits newer than `version` were evicted.
    ///
    /// A reader for which this holds can not catch up incrementally and must
    /// resynchronize everything.
    pub fn has_lost_changes(&self, version: u64) -> bool {
        version == Self::UNSYNCED || version < self.inner.lock().evicted_through
    }

    /// Record an edit and return the version it was stamped with.
    pub fn record_edit(&self, edit: E) -> u64 {
        let mut inner = self.inner.lock();
        // Bumped under the lock so stamps stay ordered with the log.
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;

        if inner.capacity == 0 {
            inner.evicted_through = version;
            return version;
        }
        while inner.edits.len() >= inner.capacity {
            if let Some((evicted, _)) = inner.edits.pop_front() {
                inner.evicted_through = evicted;
            }
        }
        inner.edits.push_back((version, edit));
        version
    }

    /// Bump the version without recording an edit.
    ///
    /// Used when a payload is replaced wholesale: readers see the resource as
    /// stale and detect the replacement through its data key.
    pub fn touch(&self) -> u64 {
        let _inner = self.inner.lock();
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl<E: Clone> ChangeQueue<E> {
    /// All retained edits stamped with a version newer than `version`, oldest first.
    pub fn changes_since(&self, version: u64) -> Vec<E> {
        let inner = self.inner.lock();
        // Stamps are strictly increasing, so skip the older prefix.
        let start = inner.edits.partition_point(|(stamp, _)| *stamp <= version);
        inner
            .edits
            .range(start..)
            .map(|(_, edit)| edit.clone())
            .collect()
    }
}

impl<E> Default for ChangeQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(ChangeQueue<u32>: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_new_queue() {
        let queue: ChangeQueue<u32> = ChangeQueue::new();
        assert_eq!(queue.version(), 1);
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), ChangeQueue::<u32>::DEFAULT_CAPACITY);
        assert!(queue.is_version_stale(ChangeQueue::<u32>::UNSYNCED));
        assert!(!queue.is_version_stale(1));
    }

    #[test]
    fn test_unsynced_always_lost() {
        let queue: ChangeQueue<u32> = ChangeQueue::new();
        assert!(queue.has_lost_changes(ChangeQueue::<u32>::UNSYNCED));
        assert!(!queue.has_lost_changes(queue.version()));
    }

    #[test]
    fn test_record_and_read() {
        let queue = ChangeQueue::new();
        let v1 = queue.record_edit(10);
        let v2 = queue.record_edit(20);
        let v3 = queue.record_edit(30);
        assert_eq!((v1, v2, v3), (2, 3, 4));
        assert_eq!(queue.version(), 4);

        assert_eq!(queue.changes_since(1), vec![10, 20, 30]);
        assert_eq!(queue.changes_since(v1), vec![20, 30]);
        assert!(queue.changes_since(v3).is_empty());
    }

    #[test]
    fn test_eviction() {
        let queue = ChangeQueue::with_capacity(2);
        let synced = queue.version();
        let v1 = queue.record_edit('a');
        queue.record_edit('b');
        assert!(!queue.has_lost_changes(synced));

        queue.record_edit('c');
        assert_eq!(queue.len(), 2);
        // 'a' is gone, so a reader that had seen nothing can not catch up
        assert!(queue.has_lost_changes(synced));
        // but a reader that had seen 'a' can
        assert!(!queue.has_lost_changes(v1));
        assert_eq!(queue.changes_since(v1), vec!['b', 'c']);
    }

    #[test]
    fn test_zero_capacity() {
        let queue = ChangeQueue::with_capacity(0);
        let synced = queue.version();
        let v = queue.record_edit(1u8);
        assert!(queue.is_empty());
        assert!(queue.has_lost_changes(synced));
        assert!(!queue.has_lost_changes(v));
    }

    #[test]
    fn test_touch() {
        let queue: ChangeQueue<u32> = ChangeQueue::new();
        let synced = queue.version();
        let v = queue.touch();
        assert_eq!(v, synced + 1);
        assert!(queue.is_version_stale(synced));
        assert!(queue.changes_since(synced).is_empty());
        assert!(!queue.has_lost_changes(synced));
    }

    #[test]
    fn test_concurrent_appends() {
        let queue = Arc::new(ChangeQueue::with_capacity(1000));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..100 {
                        queue.record_edit(t * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.version(), 401);
        assert_eq!(queue.len(), 400);
        assert_eq!(queue.changes_since(1).len(), 400);
    }
}
