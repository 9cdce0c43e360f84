//! Shared fixtures for the wizard integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use itervote_core::EventLoop;
use itervote_wizard::{
    CreationTree, MemoryRouter, NextStatus, Query, StepSpec, StepStatus, WizardController,
};
use parking_lot::Mutex;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// A controller wired to in-memory collaborators, with every emission
/// recorded.
pub struct Harness {
    pub controller: WizardController,
    pub router: Arc<MemoryRouter>,
    pub event_loop: EventLoop,
    pub submissions: Arc<Mutex<Vec<Query>>>,
    pub next_statuses: Arc<Mutex<Vec<NextStatus>>>,
    pub step_statuses: Arc<Mutex<Vec<StepStatus>>>,
}

impl Harness {
    pub fn new(spec: StepSpec, location: &str) -> Self {
        Self::with_tree(CreationTree::build(spec).unwrap(), location)
    }

    pub fn with_tree(tree: CreationTree, location: &str) -> Self {
        init_logging();
        let event_loop = EventLoop::new();
        let router = Arc::new(MemoryRouter::new(location));
        let submissions = Arc::new(Mutex::new(Vec::new()));

        let sink = submissions.clone();
        let controller = WizardController::builder()
            .tree(tree)
            .router(router.clone())
            .submitter(Arc::new(move |query: Query| sink.lock().push(query)))
            .event_loop(event_loop.handle())
            .build()
            .unwrap();

        let next_statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = next_statuses.clone();
        controller
            .next_status_changed()
            .connect(move |status| sink.lock().push(*status));

        let step_statuses = Arc::new(Mutex::new(Vec::new()));
        let sink = step_statuses.clone();
        controller
            .status_changed()
            .connect(move |status| sink.lock().push(status.clone()));

        Self {
            controller,
            router,
            event_loop,
            submissions,
            next_statuses,
            step_statuses,
        }
    }

    /// Run one tick of deferred work.
    pub fn tick(&self) -> usize {
        self.event_loop.run_pending()
    }

    /// Canonical path of `segment`.
    pub fn path(&self, segment: &str) -> String {
        self.controller.canonical_path(segment)
    }

    pub fn last_next(&self) -> Option<NextStatus> {
        self.next_statuses.lock().last().copied()
    }

    pub fn clear_recordings(&self) {
        self.next_statuses.lock().clear();
        self.step_statuses.lock().clear();
    }
}

/// `root` (Linear) followed by `leaf` (Final).
pub fn two_steps() -> StepSpec {
    StepSpec::linear("root", "Root", StepSpec::final_step("leaf", "Leaf"))
}

/// `first` → `second` → `third` (Final).
pub fn three_steps() -> StepSpec {
    StepSpec::linear(
        "first",
        "First",
        StepSpec::linear("second", "Second", StepSpec::final_step("third", "Third")),
    )
}

pub fn query(value: serde_json::Value) -> Query {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
