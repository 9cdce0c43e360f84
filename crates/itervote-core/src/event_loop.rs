//! Single-threaded deferred task queue.
//!
//! The wizard never emits UI-facing notifications synchronously from inside a
//! call that the UI itself made; it posts them here and they run on the next
//! *tick*. A tick runs every task that was pending when the tick started.
//! Tasks posted while a tick is running are held back for the following tick,
//! so a zero-delay post always lands strictly after the current call stack.
//!
//! # Example
//!
//! ```
//! use itervote_core::EventLoop;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let event_loop = EventLoop::new();
//! let handle = event_loop.handle();
//! let hits = Arc::new(AtomicUsize::new(0));
//!
//! let hits_clone = hits.clone();
//! handle.post(move || {
//!     hits_clone.fetch_add(1, Ordering::SeqCst);
//! });
//! assert_eq!(hits.load(Ordering::SeqCst), 0);
//!
//! event_loop.run_pending();
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::ThreadId;

use parking_lot::Mutex;

/// A boxed task closure.
type BoxedTask = Box<dyn FnOnce() + Send + 'static>;

/// FIFO of pending tasks.
#[derive(Default)]
struct TaskQueue {
    tasks: VecDeque<BoxedTask>,
}

impl TaskQueue {
    fn post(&mut self, task: BoxedTask) -> usize {
        self.tasks.push_back(task);
        self.tasks.len()
    }

    /// Detach everything that is pending right now.
    fn take_tick(&mut self) -> VecDeque<BoxedTask> {
        std::mem::take(&mut self.tasks)
    }
}

/// The owner side of the task queue.
///
/// Only the thread that created the loop may drive it. Other parties post
/// work through an [`EventLoopHandle`].
pub struct EventLoop {
    queue: Arc<Mutex<TaskQueue>>,
    owner: ThreadId,
}

impl EventLoop {
    /// Create an empty loop owned by the current thread.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(TaskQueue::default())),
            owner: std::thread::current().id(),
        }
    }

    /// Get a cloneable handle for posting tasks.
    pub fn handle(&self) -> EventLoopHandle {
        EventLoopHandle {
            queue: self.queue.clone(),
        }
    }

    /// Run one tick, returning the number of tasks executed.
    ///
    /// # Panics
    ///
    /// In debug builds, panics when called from a thread that does not own the
    /// loop.
    pub fn run_pending(&self) -> usize {
        debug_assert_eq!(
            std::thread::current().id(),
            self.owner,
            "EventLoop driven from a thread that does not own it"
        );
        self.run_tick()
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.queue.lock().tasks.len()
    }

    fn run_tick(&self) -> usize {
        // The lock is released before running anything: tasks may post.
        let batch = self.queue.lock().take_tick();
        let count = batch.len();
        if count > 0 {
            let _span = tracing::trace_span!(
                target: "itervote_core::event_loop",
                "itervote::event_loop",
                tasks = count
            )
            .entered();
            for task in batch {
                task();
            }
        }
        count
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable, thread-safe handle for posting deferred tasks.
#[derive(Clone)]
pub struct EventLoopHandle {
    queue: Arc<Mutex<TaskQueue>>,
}

impl EventLoopHandle {
    /// Post a task to run on the next tick.
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let pending = self.queue.lock().post(Box::new(task));
        tracing::trace!(target: "itervote_core::event_loop", pending, "task posted");
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.queue.lock().tasks.len()
    }
}

impl std::fmt::Debug for EventLoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoopHandle")
            .field("pending", &self.pending_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(EventLoopHandle: Send, Sync, Clone);
