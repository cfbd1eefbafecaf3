//! Destruction from any thread.
//!
//! Device objects may only be deleted on the thread that owns the device, but
//! resources become unreachable wherever the application drops them. A
//! [`DestructionGuard`] makes sure exactly one caller wins the right to tear a
//! handle down, and a [`DeviceTaskQueue`] carries the actual teardown over to
//! the device thread, which runs it on its next pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;

use parking_lot::Mutex;

use crate::context::DeviceContext;

/// Work run on the device thread.
pub type DeviceTask = Box<dyn FnOnce(&mut dyn DeviceContext) + Send>;

/// One-shot "destroyed" flag.
#[derive(Debug, Default)]
pub struct DestructionGuard {
    destroyed: AtomicBool,
}

impl DestructionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the teardown. Returns true for exactly one caller.
    pub fn try_claim(&self) -> bool {
        self.destroyed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns true once any caller has claimed the teardown.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

/// Signals when a deferred task has run (or was dropped).
///
/// # Example
///
/// ```ignore
/// let completion = manager.destroy(&resource);
/// // on the device thread:
/// manager.process_pending(&mut device);
/// assert!(completion.is_complete());
/// ```
#[derive(Debug, Clone)]
pub struct Completion {
    done: Arc<AtomicBool>,
}

impl Completion {
    fn pending() -> Self {
        Self {
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A completion that is already signaled.
    pub fn completed() -> Self {
        Self {
            done: Arc::new(AtomicBool::new(true)),
        }
    }

    fn signal(&self) {
        self.done.store(true, Ordering::Release);
    }

    /// Returns true if the task has run.
    pub fn is_complete(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Block until the task has run.
    ///
    /// Must not be called on the device thread before the queue is drained.
    pub fn wait(&self) {
        while !self.is_complete() {
            std::thread::yield_now();
        }
    }
}

struct QueuedTask {
    task: DeviceTask,
    completion: Completion,
}

/// Queue of tasks submitted from any thread and run on the device thread.
pub struct DeviceTaskQueue {
    sender: Mutex<Option<mpsc::Sender<QueuedTask>>>,
    receiver: Mutex<mpsc::Receiver<QueuedTask>>,
    pending: AtomicUsize,
}

impl DeviceTaskQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(receiver),
            pending: AtomicUsize::new(0),
        }
    }

    /// Queue `task` for the device thread.
    ///
    /// After [`shutdown`](Self::shutdown) the task is dropped and the returned
    /// completion is already signaled.
    pub fn submit(&self, task: DeviceTask) -> Completion {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Completion::completed();
        };
        let completion = Completion::pending();
        self.pending.fetch_add(1, Ordering::AcqRel);
        let queued = QueuedTask {
            task,
            completion: completion.clone(),
        };
        if let Err(mpsc::SendError(queued)) = sender.send(queued) {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            queued.completion.signal();
        }
        completion
    }

    /// Run queued tasks on the calling (device) thread.
    ///
    /// Runs at most `max` tasks, or every queued task when `max` is 0.
    /// Returns the number of tasks run.
    pub fn run_pending(&self, context: &mut dyn DeviceContext, max: usize) -> usize {
        let receiver = self.receiver.lock();
        let mut ran = 0;
        while max == 0 || ran < max {
            let Ok(queued) = receiver.try_recv() else {
                break;
            };
            self.pending.fetch_sub(1, Ordering::AcqRel);
            (queued.task)(&mut *context);
            queued.completion.signal();
            ran += 1;
        }
        ran
    }

    /// Number of submitted tasks that have not run yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Refuse new tasks and drop the queued ones, signaling their completions.
    ///
    /// Returns the number of dropped tasks.
    pub fn shutdown(&self) -> usize {
        self.sender.lock().take();
        let receiver = self.receiver.lock();
        let mut dropped = 0;
        while let Ok(queued) = receiver.try_recv() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            queued.completion.signal();
            dropped += 1;
        }
        dropped
    }

    /// Returns true once the queue refuses new tasks.
    pub fn is_shut_down(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl Default for DeviceTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceTaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceTaskQueue")
            .field("pending", &self.pending())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

static_assertions::assert_impl_all!(DestructionGuard: Send, Sync);
static_assertions::assert_impl_all!(DeviceTaskQueue: Send, Sync);
static_assertions::assert_impl_all!(Completion: Send, Sync);
