//! The wizard controller.
//!
//! The controller owns the position in the [`CreationTree`] and mediates
//! between the step currently mounted by the UI, the router and the
//! submission service.
//!
//! # State Machine
//!
//! The controller is always at some step, with or without an active binding:
//!
//! - [`register`](WizardController::register) at a matching location
//!   activates a binding, replacing any previous one
//! - [`next`](WizardController::next) and [`back`](WizardController::back)
//!   move the position and always leave no binding active
//! - a forward move from the final step submits and returns to the root
//!
//! # Deferred Emission
//!
//! Nothing is emitted synchronously from `register`. The initial
//! [`NextStatus`] and [`StepStatus`], and every validity change forwarded
//! from the binding, are posted to the event loop and delivered on the next
//! tick. Each registration and each transition starts a new epoch; a deferred
//! emission whose epoch is no longer current is dropped when it runs, so a
//! superseded step never reaches the status signals.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use itervote_core::EventLoop;
//! use itervote_wizard::{
//!     CreationTree, FixedBinding, MemoryRouter, Query, StepSpec, WizardController,
//! };
//!
//! let event_loop = EventLoop::new();
//! let router = Arc::new(MemoryRouter::new("/poll/create/only"));
//! let controller = WizardController::builder()
//!     .tree(CreationTree::build(StepSpec::final_step("only", "Only")).unwrap())
//!     .router(router)
//!     .submitter(Arc::new(|query: Query| println!("{query:?}")))
//!     .event_loop(event_loop.handle())
//!     .build()
//!     .unwrap();
//!
//! let binding = FixedBinding::passive();
//! let _query = controller.register(&binding);
//! event_loop.run_pending();
//!
//! assert!(controller.last_next_status().is_some_and(|s| s.validable && s.is_final));
//! assert!(controller.next());
//! ```

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use itervote_core::logging::{PerfSpan, span_names, targets};
use itervote_core::{ConnectionGuard, EventLoopHandle, Property, Signal};

use crate::binding::StepBinding;
use crate::config::WizardConfig;
use crate::debug::CreationTreeDebug;
use crate::error::{Result, WizardError};
use crate::query::{Query, SharedQuery};
use crate::router::Router;
use crate::status::{NextStatus, StepStatus};
use crate::submit::Submitter;
use crate::tree::{CreationTree, StepId};

/// The outcome of a successful navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Moved forward to a successor.
    Advanced { from: StepId, to: StepId },
    /// Moved back to the parent.
    Retreated { from: StepId, to: StepId },
    /// Submitted from the final step; the controller is back at the root.
    Submitted { from: StepId },
}

/// Drives a [`CreationTree`] on behalf of the mounted step views.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct WizardController {
    inner: Arc<Inner>,
}

struct Inner {
    tree: CreationTree,
    config: WizardConfig,
    router: Arc<dyn Router>,
    submitter: Arc<dyn Submitter>,
    event_loop: EventLoopHandle,
    state: Mutex<ControllerState>,
    epoch: AtomicU64,
    last_next: Property<Option<NextStatus>>,
    status_changed: Signal<StepStatus>,
    next_status_changed: Signal<NextStatus>,
    submitted: Signal<Query>,
}

struct ControllerState {
    current: StepId,
    active: Option<ActiveBinding>,
}

/// The registration currently forwarding validity.
struct ActiveBinding {
    epoch: u64,
    fields: BTreeSet<String>,
    _validity: ConnectionGuard<bool>,
}

impl WizardController {
    /// Start assembling a controller.
    pub fn builder() -> WizardControllerBuilder {
        WizardControllerBuilder::default()
    }

    /// Register the step the UI just mounted.
    ///
    /// If the router is not showing the current step, one navigation to its
    /// canonical path is requested and an empty query, detached from the
    /// tree, is returned; the step mounted there will register again.
    ///
    /// Otherwise the binding becomes the active one and the current step's
    /// live query is returned. Edits made through the returned handle are
    /// edits to the tree.
    pub fn register(&self, binding: &dyn StepBinding) -> SharedQuery {
        let _perf = PerfSpan::new(span_names::REGISTER);
        let inner = &self.inner;
        let current = inner.state.lock().current;
        let node = &inner.tree[current];

        let location = inner.router.current_location();
        if !inner.config.location_matches(&location, node.segment()) {
            let path = inner.config.canonical_path(node.segment());
            tracing::debug!(
                target: targets::CONTROLLER,
                location = %location,
                path = %path,
                "location does not show the current step, redirecting"
            );
            let _ticket = inner.router.navigate_to(&path);
            return SharedQuery::new();
        }

        let previous = inner.state.lock().active.take();
        drop(previous);

        let epoch = inner.next_epoch();
        let is_final = node.is_final();

        let weak = Arc::downgrade(inner);
        inner.event_loop.post(move || {
            if let Some(inner) = weak.upgrade() {
                inner.deliver_initial(epoch, current, is_final);
            }
        });

        let weak = Arc::downgrade(inner);
        let queue = inner.event_loop.clone();
        let validity = binding.validable().subscribe(move |&validable| {
            let weak: Weak<Inner> = weak.clone();
            queue.post(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.deliver_next(epoch, NextStatus::new(validable, is_final));
                }
            });
        });

        let fields = binding.handled_fields();
        node.claim_fields(fields.iter().cloned());
        tracing::debug!(
            target: targets::CONTROLLER,
            step = node.segment(),
            epoch,
            fields = ?fields,
            "step registered"
        );

        inner.state.lock().active = Some(ActiveBinding {
            epoch,
            fields,
            _validity: validity,
        });

        node.query().clone()
    }

    /// Move forward, or submit from the final step.
    ///
    /// Returns `false` and logs when the move is not allowed.
    pub fn next(&self) -> bool {
        match self.try_next() {
            Ok(_) => true,
            // Already reported as an error by `try_next`.
            Err(WizardError::MissingSuccessor { .. }) => false,
            Err(err) => {
                tracing::warn!(target: targets::CONTROLLER, error = %err, "next() ignored");
                false
            }
        }
    }

    /// Move back to the parent step.
    ///
    /// Returns `false` and logs when at the root.
    pub fn back(&self) -> bool {
        match self.try_back() {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(target: targets::CONTROLLER, error = %err, "back() ignored");
                false
            }
        }
    }

    /// Move forward, or submit from the final step.
    ///
    /// Requires the last delivered [`NextStatus`] to be validable. On a
    /// forward move, every field the current step handles is copied into the
    /// successor's query (a field absent here is removed there) and becomes
    /// handled by the successor. From the final step the query is handed to
    /// the submitter first; the tree is reset and the controller returns to
    /// the root afterwards.
    pub fn try_next(&self) -> Result<Transition> {
        let _perf = PerfSpan::new(span_names::TRANSITION);
        let inner = &self.inner;
        let mut state = inner.state.lock();
        let current = state.current;
        let node = &inner.tree[current];

        let validable = inner
            .last_next
            .with(|status| status.is_some_and(|s| s.validable));
        if !validable {
            return Err(WizardError::NotValidable {
                segment: node.segment().to_string(),
            });
        }

        if node.is_final() {
            let query = node.query_snapshot();
            let previous = state.active.take();
            inner.next_epoch();
            drop(state);
            drop(previous);
            inner.last_next.set_silent(None);

            // The submitter still sees the final step and its query.
            tracing::info!(
                target: targets::CONTROLLER,
                step = node.segment(),
                fields = query.len(),
                "creation query submitted"
            );
            inner.submitter.submit(query.clone());
            inner.submitted.emit(query);

            let mut state = inner.state.lock();
            let registered_meanwhile = state.active.take();
            inner.next_epoch();
            state.current = inner.tree.root();
            drop(state);
            drop(registered_meanwhile);
            inner.tree.reset();
            return Ok(Transition::Submitted { from: current });
        }

        let Some(successor) = node.next(None) else {
            tracing::error!(
                target: targets::CONTROLLER,
                step = node.segment(),
                tree = %CreationTreeDebug::new(&inner.tree).highlight(current),
                "non-final step has no successor"
            );
            return Err(WizardError::MissingSuccessor {
                segment: node.segment().to_string(),
            });
        };

        let target = &inner.tree[successor];
        let fields = node.handled_fields();
        for field in &fields {
            match node.query().get(field) {
                Some(value) => {
                    target.query().set(field.clone(), value);
                }
                None => {
                    target.query().remove(field);
                }
            }
        }
        target.claim_fields(fields.iter().cloned());

        let previous = state.active.take();
        inner.next_epoch();
        state.current = successor;
        drop(state);
        drop(previous);
        inner.last_next.set_silent(None);

        tracing::debug!(
            target: targets::CONTROLLER,
            from = node.segment(),
            to = target.segment(),
            carried = fields.len(),
            "advanced"
        );
        tracing::trace!(
            target: targets::CONTROLLER,
            tree = %CreationTreeDebug::new(&inner.tree).highlight(successor),
            "tree after advance"
        );
        inner.navigate_if_needed(successor);
        Ok(Transition::Advanced {
            from: current,
            to: successor,
        })
    }

    /// Move back to the parent step.
    ///
    /// The parent's handled fields are released; its query values stay, so
    /// re-registering it shows what was entered before.
    pub fn try_back(&self) -> Result<Transition> {
        let _perf = PerfSpan::new(span_names::TRANSITION);
        let inner = &self.inner;
        let mut state = inner.state.lock();
        let current = state.current;
        let node = &inner.tree[current];

        let Some(parent) = node.parent() else {
            return Err(WizardError::AtRoot {
                segment: node.segment().to_string(),
            });
        };

        inner.tree[parent].release_fields();
        let previous = state.active.take();
        inner.next_epoch();
        state.current = parent;
        drop(state);
        drop(previous);

        tracing::debug!(
            target: targets::CONTROLLER,
            from = node.segment(),
            to = inner.tree[parent].segment(),
            "retreated"
        );
        inner.navigate_if_needed(parent);
        Ok(Transition::Retreated {
            from: current,
            to: parent,
        })
    }

    /// Discard everything entered so far and return to the root step.
    pub fn abandon(&self) {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        let previous = state.active.take();
        inner.next_epoch();
        state.current = inner.tree.root();
        drop(state);
        drop(previous);

        inner.tree.reset();
        inner.last_next.set_silent(None);
        tracing::info!(target: targets::CONTROLLER, "creation abandoned");
        inner.navigate_if_needed(inner.tree.root());
    }

    /// The tree being driven.
    pub fn tree(&self) -> &CreationTree {
        &self.inner.tree
    }

    /// The configuration in use.
    pub fn config(&self) -> &WizardConfig {
        &self.inner.config
    }

    /// The current step.
    pub fn current_step(&self) -> StepId {
        self.inner.state.lock().current
    }

    /// Segment of the current step.
    pub fn current_segment(&self) -> String {
        let current = self.current_step();
        self.inner.tree[current].segment().to_string()
    }

    /// The status of the current step, computed now.
    pub fn current_status(&self) -> StepStatus {
        self.inner.tree.make_status(self.current_step())
    }

    /// The last [`NextStatus`] delivered, if any since the last transition.
    ///
    /// A backward move keeps the value delivered by the step moved away from.
    pub fn last_next_status(&self) -> Option<NextStatus> {
        self.inner.last_next.get()
    }

    /// Whether a registered binding is currently forwarding validity.
    pub fn has_active_binding(&self) -> bool {
        self.inner.state.lock().active.is_some()
    }

    /// Fields claimed by the active registration.
    pub fn active_fields(&self) -> Option<BTreeSet<String>> {
        self.inner
            .state
            .lock()
            .active
            .as_ref()
            .map(|active| active.fields.clone())
    }

    /// The path at which `segment` is displayed.
    pub fn canonical_path(&self, segment: &str) -> String {
        self.inner.config.canonical_path(segment)
    }

    /// Emitted, deferred, after each registration.
    pub fn status_changed(&self) -> &Signal<StepStatus> {
        &self.inner.status_changed
    }

    /// Emitted, deferred, after each registration and each validity change.
    pub fn next_status_changed(&self) -> &Signal<NextStatus> {
        &self.inner.next_status_changed
    }

    /// Emitted with the submitted query, right after the submitter ran.
    pub fn submitted(&self) -> &Signal<Query> {
        &self.inner.submitted
    }
}

impl std::fmt::Debug for WizardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("WizardController")
            .field("current", &self.inner.tree[state.current].segment())
            .field("active_epoch", &state.active.as_ref().map(|a| a.epoch))
            .field("last_next", &self.inner.last_next.get())
            .finish()
    }
}

impl Inner {
    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, epoch: u64) -> bool {
        let live = self.epoch.load(Ordering::SeqCst) == epoch;
        if !live {
            tracing::trace!(
                target: targets::CONTROLLER,
                epoch,
                "dropping emission from a superseded registration"
            );
        }
        live
    }

    fn deliver_initial(&self, epoch: u64, step: StepId, is_final: bool) {
        if !self.is_current(epoch) {
            return;
        }
        let next = NextStatus::new(false, is_final);
        self.last_next.set_silent(Some(next));
        self.next_status_changed.emit(next);
        self.status_changed.emit(self.tree.make_status(step));
    }

    fn deliver_next(&self, epoch: u64, status: NextStatus) {
        if !self.is_current(epoch) {
            return;
        }
        self.last_next.set_silent(Some(status));
        self.next_status_changed.emit(status);
    }

    fn navigate_if_needed(&self, step: StepId) {
        let segment = self.tree[step].segment();
        let location = self.router.current_location();
        if self.config.location_matches(&location, segment) {
            return;
        }
        let path = self.config.canonical_path(segment);
        tracing::debug!(target: targets::CONTROLLER, path = %path, "navigating");
        let ticket = self.router.navigate_to(&path);
        if ticket.try_get() == Some(false) {
            tracing::warn!(target: targets::CONTROLLER, path = %path, "navigation refused");
        }
    }
}

/// Assembles a [`WizardController`].
#[derive(Default)]
pub struct WizardControllerBuilder {
    tree: Option<CreationTree>,
    router: Option<Arc<dyn Router>>,
    submitter: Option<Arc<dyn Submitter>>,
    event_loop: Option<EventLoopHandle>,
    config: WizardConfig,
}

impl WizardControllerBuilder {
    /// The tree to drive.
    pub fn tree(mut self, tree: CreationTree) -> Self {
        self.tree = Some(tree);
        self
    }

    /// The routing service.
    pub fn router<R: Router + 'static>(mut self, router: Arc<R>) -> Self {
        let router: Arc<dyn Router> = router;
        self.router = Some(router);
        self
    }

    /// The submission service.
    pub fn submitter<S: Submitter + 'static>(mut self, submitter: Arc<S>) -> Self {
        let submitter: Arc<dyn Submitter> = submitter;
        self.submitter = Some(submitter);
        self
    }

    /// The queue deferred emissions are posted to.
    pub fn event_loop(mut self, event_loop: EventLoopHandle) -> Self {
        self.event_loop = Some(event_loop);
        self
    }

    /// Replace the default configuration.
    pub fn config(mut self, config: WizardConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and build the controller at the root step.
    pub fn build(self) -> Result<WizardController> {
        let tree = self.tree.ok_or(WizardError::MissingCollaborator("tree"))?;
        let router = self.router.ok_or(WizardError::MissingCollaborator("router"))?;
        let submitter = self
            .submitter
            .ok_or(WizardError::MissingCollaborator("submitter"))?;
        let event_loop = self
            .event_loop
            .ok_or(WizardError::MissingCollaborator("event loop"))?;
        self.config.validate()?;

        let root = tree.root();
        tracing::debug!(
            target: targets::CONTROLLER,
            steps = tree.len(),
            base_path = self.config.base_path(),
            "wizard controller created"
        );

        Ok(WizardController {
            inner: Arc::new(Inner {
                tree,
                config: self.config,
                router,
                submitter,
                event_loop,
                state: Mutex::new(ControllerState {
                    current: root,
                    active: None,
                }),
                epoch: AtomicU64::new(0),
                last_next: Property::new(None),
                status_changed: Signal::new(),
                next_status_changed: Signal::new(),
                submitted: Signal::new(),
            }),
        })
    }
}

static_assertions::assert_impl_all!(WizardController: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::FixedBinding;
    use crate::router::MemoryRouter;
    use crate::tree::StepSpec;
    use itervote_core::EventLoop;

    fn controller(location: &str) -> (WizardController, Arc<MemoryRouter>, EventLoop) {
        let event_loop = EventLoop::new();
        let router = Arc::new(MemoryRouter::new(location));
        let controller = WizardController::builder()
            .tree(
                CreationTree::build(StepSpec::linear(
                    "root",
                    "Root",
                    StepSpec::final_step("leaf", "Leaf"),
                ))
                .unwrap(),
            )
            .router(router.clone())
            .submitter(Arc::new(|_: Query| {}))
            .event_loop(event_loop.handle())
            .build()
            .unwrap();
        (controller, router, event_loop)
    }

    #[test]
    fn test_builder_requires_collaborators() {
        let result = WizardController::builder().build();
        assert!(matches!(result, Err(WizardError::MissingCollaborator("tree"))));
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let event_loop = EventLoop::new();
        let result = WizardController::builder()
            .tree(CreationTree::build(StepSpec::final_step("only", "Only")).unwrap())
            .router(Arc::new(MemoryRouter::default()))
            .submitter(Arc::new(|_: Query| {}))
            .event_loop(event_loop.handle())
            .config(WizardConfig::new().with_base_path("relative"))
            .build();
        assert!(matches!(result, Err(WizardError::InvalidConfig(_))));
    }

    #[test]
    fn test_register_defers_emission() {
        let (controller, _router, event_loop) = controller("/poll/create/root");
        let binding = FixedBinding::new(["title"], true);

        controller.register(&binding);
        assert!(controller.has_active_binding());
        assert_eq!(controller.last_next_status(), None);

        event_loop.run_pending();
        assert_eq!(controller.last_next_status(), Some(NextStatus::new(true, false)));
        assert_eq!(
            controller.active_fields(),
            Some(BTreeSet::from(["title".to_string()]))
        );
    }

    #[test]
    fn test_strict_variants_report_violations() {
        let (controller, _router, _event_loop) = controller("/poll/create/root");
        assert!(matches!(controller.try_back(), Err(WizardError::AtRoot { .. })));
        assert!(matches!(
            controller.try_next(),
            Err(WizardError::NotValidable { .. })
        ));
        assert!(!controller.next());
        assert!(!controller.back());
        assert_eq!(controller.current_segment(), "root");
    }

    #[test]
    fn test_transitions_drop_binding() {
        let (controller, router, event_loop) = controller("/poll/create/root");
        let binding = FixedBinding::passive();
        controller.register(&binding);
        event_loop.run_pending();

        let leaf = controller.tree().find("leaf").unwrap();
        assert_eq!(
            controller.try_next().unwrap(),
            Transition::Advanced {
                from: controller.tree().root(),
                to: leaf,
            }
        );
        assert!(!controller.has_active_binding());
        assert_eq!(binding.validable().subscriber_count(), 0);
        assert_eq!(router.current_location(), "/poll/create/leaf");
        assert_eq!(controller.current_status().current, 1);
    }
}
