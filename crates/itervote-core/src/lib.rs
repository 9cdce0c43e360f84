//! Core reactive systems for the itervote poll-creation wizard.
//!
//! This crate provides the plumbing the wizard engine is built on:
//!
//! - **Signal/Slot System**: Type-safe notifications with scoped connections
//! - **Property System**: Change-detecting values and replaying observables
//! - **Event Loop**: A single-threaded deferred task queue ("next tick")
//! - **Completion Pairs**: Fire-and-forget results for asynchronous requests
//! - **Logging**: Target and span names shared across the workspace
//!
//! # Signal/Slot Example
//!
//! ```
//! use itervote_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```
//!
//! # Deferred Emission Example
//!
//! ```
//! use itervote_core::{EventLoop, Signal};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! let event_loop = EventLoop::new();
//! let ready = Arc::new(Signal::<bool>::new());
//! let seen = Arc::new(AtomicBool::new(false));
//!
//! let seen_clone = seen.clone();
//! ready.connect(move |&v| seen_clone.store(v, Ordering::SeqCst));
//!
//! let deferred = ready.clone();
//! event_loop.handle().post(move || deferred.emit(true));
//! assert!(!seen.load(Ordering::SeqCst));
//!
//! event_loop.run_pending();
//! assert!(seen.load(Ordering::SeqCst));
//! ```

pub mod completion;
pub mod event_loop;
pub mod logging;
pub mod property;
pub mod signal;

pub use completion::{CompletionHandle, CompletionWaiter, completed, completion_pair};
pub use event_loop::{EventLoop, EventLoopHandle};
pub use logging::PerfSpan;
pub use property::{Observable, Property};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
