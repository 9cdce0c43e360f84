//! Navigation collaborator.
//!
//! The controller never owns the location. It asks a [`Router`] where the UI
//! currently is and requests navigation; the host answers asynchronously
//! through a [`NavigationTicket`].

use parking_lot::Mutex;

use itervote_core::logging::targets;
use itervote_core::{CompletionWaiter, Signal, completed};

/// Settles to `true` once navigation happened, `false` if it was refused.
///
/// Dropping the host's side without settling leaves the ticket abandoned;
/// [`CompletionWaiter::wait`] then returns `None`.
pub type NavigationTicket = CompletionWaiter<bool>;

/// The host's routing service.
pub trait Router: Send + Sync {
    /// The current location, e.g. `/poll/create/general`.
    fn current_location(&self) -> String;

    /// Request navigation to `path`.
    fn navigate_to(&self, path: &str) -> NavigationTicket;
}

/// An in-memory router that navigates synchronously.
///
/// Suitable for headless hosts and tests. Every accepted navigation is
/// recorded and announced through [`MemoryRouter::navigated`].
pub struct MemoryRouter {
    state: Mutex<RouterState>,
    navigated: Signal<String>,
}

#[derive(Default)]
struct RouterState {
    location: String,
    history: Vec<String>,
}

impl MemoryRouter {
    /// Create a router positioned at `location`.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(RouterState {
                location: location.into(),
                history: Vec::new(),
            }),
            navigated: Signal::new(),
        }
    }

    /// Move to `location` without recording it as a requested navigation.
    ///
    /// Models the user typing an address or using the browser buttons.
    pub fn jump_to(&self, location: impl Into<String>) {
        self.state.lock().location = location.into();
    }

    /// Every path requested through [`Router::navigate_to`], oldest first.
    pub fn history(&self) -> Vec<String> {
        self.state.lock().history.clone()
    }

    /// Number of navigations requested so far.
    pub fn navigation_count(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Emitted with the new location after each navigation.
    pub fn navigated(&self) -> &Signal<String> {
        &self.navigated
    }
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Router for MemoryRouter {
    fn current_location(&self) -> String {
        self.state.lock().location.clone()
    }

    fn navigate_to(&self, path: &str) -> NavigationTicket {
        {
            let mut state = self.state.lock();
            state.location = path.to_string();
            state.history.push(path.to_string());
        }
        tracing::debug!(target: targets::ROUTER, path, "navigated");
        self.navigated.emit(path.to_string());
        completed(true)
    }
}

impl std::fmt::Debug for MemoryRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryRouter")
            .field("location", &state.location)
            .field("navigations", &state.history.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(MemoryRouter: Router, Send, Sync);
