//! One-shot completion pairs.
//!
//! A [`CompletionHandle`] is held by whoever performs an asynchronous piece of
//! work; the matching [`CompletionWaiter`] is handed to whoever asked for it.
//! The asker may poll the waiter or simply drop it. Nothing here blocks, so
//! fire-and-forget callers never have to look at the result.
//!
//! Dropping the handle without completing settles the pair as *abandoned*.

use std::sync::Arc;

use parking_lot::Mutex;

enum Slot<T> {
    Pending,
    Done(T),
    Abandoned,
}

struct CompletionState<T> {
    slot: Mutex<Slot<T>>,
}

/// The producing side of a completion pair.
pub struct CompletionHandle<T> {
    inner: Option<Arc<CompletionState<T>>>,
}

impl<T> CompletionHandle<T> {
    /// Settle the pair with `value`.
    pub fn complete(mut self, value: T) {
        if let Some(inner) = self.inner.take() {
            *inner.slot.lock() = Slot::Done(value);
        }
    }
}

impl<T> Drop for CompletionHandle<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            let mut slot = inner.slot.lock();
            if matches!(*slot, Slot::Pending) {
                *slot = Slot::Abandoned;
            }
        }
    }
}

/// The consuming side of a completion pair.
pub struct CompletionWaiter<T> {
    inner: Arc<CompletionState<T>>,
}

impl<T: Clone> CompletionWaiter<T> {
    /// Check whether the pair has been completed or abandoned.
    pub fn is_settled(&self) -> bool {
        !matches!(*self.inner.slot.lock(), Slot::Pending)
    }

    /// Non-blocking read of the result, if one is available.
    pub fn try_get(&self) -> Option<T> {
        match &*self.inner.slot.lock() {
            Slot::Done(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T> std::fmt::Debug for CompletionWaiter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match *self.inner.slot.lock() {
            Slot::Pending => "pending",
            Slot::Done(_) => "done",
            Slot::Abandoned => "abandoned",
        };
        f.debug_struct("CompletionWaiter").field("state", &state).finish()
    }
}

/// Create a connected handle/waiter pair.
pub fn completion_pair<T>() -> (CompletionHandle<T>, CompletionWaiter<T>) {
    let state = Arc::new(CompletionState {
        slot: Mutex::new(Slot::Pending),
    });

    (
        CompletionHandle {
            inner: Some(state.clone()),
        },
        CompletionWaiter { inner: state },
    )
}

/// A waiter that is already settled with `value`.
pub fn completed<T>(value: T) -> CompletionWaiter<T> {
    let (handle, waiter) = completion_pair();
    handle.complete(value);
    waiter
}
