//! Logging facilities.
//!
//! Every crate in the workspace logs through `tracing` with explicit targets,
//! so the wizard engine can be filtered independently of the UI host. No
//! subscriber is installed here; that is the application's job:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("itervote_wizard=debug,itervote_core=info")
//!     .init();
//! ```

/// Span names used for tracing.
pub mod span_names {
    /// Event loop tick span.
    pub const EVENT_LOOP: &str = "itervote::event_loop";
    /// Wizard transition span.
    pub const TRANSITION: &str = "itervote::transition";
    /// Step registration span.
    pub const REGISTER: &str = "itervote::register";
}

/// Target names for log filtering.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "itervote_core";
    /// Event loop target.
    pub const EVENT_LOOP: &str = "itervote_core::event_loop";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "itervote_core::signal";
    /// Wizard controller target.
    pub const CONTROLLER: &str = "itervote_wizard::controller";
    /// Creation tree target.
    pub const TREE: &str = "itervote_wizard::tree";
    /// Step form adapter target.
    pub const FORM: &str = "itervote_wizard::form";
    /// Router collaborator target.
    pub const ROUTER: &str = "itervote_wizard::router";
}

/// A guard that keeps a timing span entered until dropped.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span for `name`.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "itervote::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
