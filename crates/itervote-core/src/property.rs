//! Reactive properties.
//!
//! - [`Property<T>`]: a value with change detection but no notification
//! - [`Observable<T>`]: a property paired with a change signal that replays
//!   its current value to every new subscriber
//!
//! `Observable` is what step components expose as their validity stream: a
//! subscriber always learns the current state first and every change after.
//!
//! # Example
//!
//! ```
//! use itervote_core::Observable;
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//!
//! let valid = Observable::new(false);
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let seen_clone = seen.clone();
//! let _guard = valid.subscribe(move |&v| seen_clone.lock().push(v));
//! valid.set(true);
//! valid.set(true);
//!
//! assert_eq!(*seen.lock(), vec![false, true]);
//! ```

use std::fmt;

use parking_lot::RwLock;

use crate::signal::{ConnectionGuard, Signal};

/// A value that tracks changes.
///
/// `set()` compares the new value with the current one and reports whether
/// it actually changed; the caller decides whether to notify anyone.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Set the value without change detection.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }

    /// Set the value, returning the old value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.write();
        if *current != value {
            Some(std::mem::replace(&mut *current, value))
        } else {
            None
        }
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

/// A property that notifies subscribers of every change.
pub struct Observable<T> {
    value: Property<T>,
    changed: Signal<T>,
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create an observable with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: Property::new(value),
            changed: Signal::new(),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.value.with(f)
    }

    /// Set the value, notifying subscribers if it changed.
    ///
    /// Returns `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        if self.value.set(value.clone()) {
            self.changed.emit(value);
            true
        } else {
            false
        }
    }

    /// Subscribe to the value.
    ///
    /// The slot is called once immediately with the current value, then on
    /// every change until the guard is dropped.
    pub fn subscribe<F>(&self, slot: F) -> ConnectionGuard<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let current = self.get();
        slot(&current);
        self.changed.connect_scoped(slot)
    }

    /// The change signal. Connecting here does not replay the current value.
    pub fn changed(&self) -> &Signal<T> {
        &self.changed
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.changed.connection_count()
    }
}

impl<T> Default for Observable<T>
where
    T: Clone + PartialEq + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value.get())
            .field("changed", &self.changed)
            .finish()
    }
}
