//! Tests for registration, navigation and submission.

mod common;

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use itervote_core::EventLoop;
use itervote_wizard::{
    CreationTree, FixedBinding, MemoryRouter, NextStatus, Query, Router, StepBinding, StepSpec,
    StepStatus, Transition, WizardController, WizardError,
};
use parking_lot::Mutex;
use serde_json::json;

use common::{Harness, query, three_steps, two_steps};

fn fields(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_register_emits_on_next_tick() {
    let h = Harness::new(two_steps(), "/poll/create/root");
    let binding = FixedBinding::new(["a"], true);

    let _query = h.controller.register(&binding);
    assert!(h.next_statuses.lock().is_empty());
    assert!(h.step_statuses.lock().is_empty());

    h.tick();
    assert_eq!(
        *h.next_statuses.lock(),
        vec![NextStatus::new(false, false), NextStatus::new(true, false)]
    );
    assert_eq!(
        *h.step_statuses.lock(),
        vec![StepStatus::new(
            0,
            vec!["Root".into(), "Leaf".into()],
            false
        )]
    );
}

#[test]
fn test_register_returns_live_query() {
    let h = Harness::new(two_steps(), "/poll/create/root");
    let binding = FixedBinding::new(["a"], false);

    let first = h.controller.register(&binding);
    first.set("a", json!(1));
    let second = h.controller.register(&binding);

    assert!(first.ptr_eq(&second));
    assert_eq!(second.get("a"), Some(json!(1)));
    let root = h.controller.tree().root();
    assert_eq!(h.controller.tree()[root].query_snapshot(), query(json!({ "a": 1 })));
}

#[test]
fn test_next_carries_handled_fields_as_copies() {
    let h = Harness::new(two_steps(), "/poll/create/root");
    let binding = FixedBinding::new(["a", "b"], true);

    let root_query = h.controller.register(&binding);
    root_query.set("a", json!({ "nested": [1, 2] }));
    root_query.set("c", json!("not handled"));
    h.tick();

    assert!(h.controller.next());

    let tree = h.controller.tree();
    let leaf = tree.find("leaf").unwrap();
    assert_eq!(h.controller.current_step(), leaf);
    assert_eq!(
        tree[leaf].query_snapshot(),
        query(json!({ "a": { "nested": [1, 2] } }))
    );
    assert_eq!(tree[leaf].handled_fields(), fields(&["a", "b"]));

    root_query.set("a", json!(0));
    assert_eq!(
        tree[leaf].query_snapshot()["a"],
        json!({ "nested": [1, 2] })
    );
    assert_eq!(h.router.current_location(), "/poll/create/leaf");
}

#[test]
fn test_carry_over_removes_fields_absent_upstream() {
    let h = Harness::new(three_steps(), "/poll/create/first");
    let first = FixedBinding::new(["a"], true);

    let first_query = h.controller.register(&first);
    first_query.set("a", json!("x"));
    h.tick();
    assert!(h.controller.next());

    let second = FixedBinding::passive();
    h.controller.register(&second);
    h.tick();
    assert!(h.controller.back());

    let first_query = h.controller.register(&first);
    first_query.remove("a");
    h.tick();
    assert!(h.controller.next());

    let tree = h.controller.tree();
    let second_id = tree.find("second").unwrap();
    assert!(!tree[second_id].query_snapshot().contains_key("a"));
}

#[test]
fn test_back_restores_parent_values() {
    let h = Harness::new(two_steps(), "/poll/create/root");
    let root_binding = FixedBinding::new(["title"], true);

    let root_query = h.controller.register(&root_binding);
    root_query.set("title", json!("original"));
    h.tick();
    assert!(h.controller.next());

    let leaf_binding = FixedBinding::new(["title", "extra"], true);
    let leaf_query = h.controller.register(&leaf_binding);
    assert_eq!(leaf_query.get("title"), Some(json!("original")));
    leaf_query.set("title", json!("changed"));
    h.tick();

    assert_eq!(
        h.controller.try_back().unwrap(),
        Transition::Retreated {
            from: h.controller.tree().find("leaf").unwrap(),
            to: h.controller.tree().root(),
        }
    );
    assert_eq!(h.router.current_location(), "/poll/create/root");

    let root = h.controller.tree().root();
    assert!(h.controller.tree()[root].handled_fields().is_empty());

    let again = h.controller.register(&root_binding);
    assert!(again.ptr_eq(&root_query));
    assert_eq!(again.get("title"), Some(json!("original")));
    assert_eq!(h.controller.tree()[root].handled_fields(), fields(&["title"]));
}

#[test]
fn test_back_then_next_without_registration() {
    let h = Harness::new(two_steps(), "/poll/create/root");
    let root_binding = FixedBinding::new(["a"], true);

    let root_query = h.controller.register(&root_binding);
    root_query.set("a", json!("x"));
    h.tick();
    assert!(h.controller.next());

    let leaf_binding = FixedBinding::passive();
    h.controller.register(&leaf_binding);
    h.tick();
    assert!(h.controller.back());

    // Nothing registers at the root before moving forward again.
    root_query.set("a", json!("y"));
    assert!(h.controller.next());

    let tree = h.controller.tree();
    let leaf = tree.find("leaf").unwrap();
    assert_eq!(h.controller.current_step(), leaf);
    assert_eq!(tree[leaf].query_snapshot()["a"], json!("x"));
    assert!(h.submissions.lock().is_empty());
}

#[test]
fn test_reregistration_is_idempotent() {
    let h = Harness::new(two_steps(), "/poll/create/root");
    let binding = FixedBinding::new(["a"], false);

    h.controller.register(&binding);
    h.controller.register(&binding);
    assert_eq!(h.router.navigation_count(), 0);
    assert_eq!(binding.validable().subscriber_count(), 1);

    h.tick();
    // The first registration's deferred emissions were superseded.
    assert_eq!(h.step_statuses.lock().len(), 1);
    assert_eq!(
        *h.next_statuses.lock(),
        vec![NextStatus::new(false, false), NextStatus::new(false, false)]
    );

    h.clear_recordings();
    binding.set_validable(true);
    binding.set_validable(true);
    h.tick();
    assert_eq!(*h.next_statuses.lock(), vec![NextStatus::new(true, false)]);

    binding.set_validable(false);
    h.tick();
    assert_eq!(
        *h.next_statuses.lock(),
        vec![NextStatus::new(true, false), NextStatus::new(false, false)]
    );
}

#[test]
fn test_superseded_binding_never_reaches_next_status() {
    let h = Harness::new(two_steps(), "/poll/create/root");
    let old = FixedBinding::new(["a"], false);
    let new = FixedBinding::new(["b"], false);

    h.controller.register(&old);
    h.controller.register(&new);
    old.set_validable(true);
    h.tick();

    {
        let statuses = h.next_statuses.lock();
        assert!(!statuses.is_empty());
        assert!(
            statuses.iter().all(|s| *s == NextStatus::new(false, false)),
            "superseded binding leaked: {statuses:?}"
        );
    }
    assert_eq!(old.validable().subscriber_count(), 0);
    assert_eq!(new.validable().subscriber_count(), 1);
    assert!(!h.controller.next());

    let tree = h.controller.tree();
    assert_eq!(tree[tree.root()].handled_fields(), fields(&["a", "b"]));
    assert_eq!(h.controller.active_fields(), Some(fields(&["b"])));
}

#[test]
fn test_final_next_submits_and_resets() {
    let h = Harness::new(three_steps(), "/poll/create/first");

    let first = FixedBinding::new(["title"], true);
    let first_query = h.controller.register(&first);
    first_query.set("title", json!("Lunch"));
    h.tick();
    assert!(h.controller.next());

    let second = FixedBinding::new(["candidates"], true);
    let second_query = h.controller.register(&second);
    second_query.set("candidates", json!(["Pizza", "Sushi"]));
    h.tick();
    assert!(h.controller.next());

    let third = FixedBinding::passive();
    h.controller.register(&third);
    h.tick();
    assert_eq!(h.last_next(), Some(NextStatus::new(true, true)));

    let navigations = h.router.navigation_count();
    let submitted = h.controller.try_next().unwrap();
    let tree = h.controller.tree();
    assert_eq!(
        submitted,
        Transition::Submitted {
            from: tree.find("third").unwrap()
        }
    );

    let submissions = h.submissions.lock();
    assert_eq!(submissions.len(), 1);
    assert_eq!(
        submissions[0],
        query(json!({ "title": "Lunch", "candidates": ["Pizza", "Sushi"] }))
    );

    for (_, node) in tree.iter() {
        assert!(node.query_snapshot().is_empty(), "{} not reset", node.segment());
        assert!(node.handled_fields().is_empty());
    }
    assert_eq!(h.controller.current_step(), tree.root());
    assert!(!h.controller.has_active_binding());
    assert_eq!(h.controller.last_next_status(), None);
    assert_eq!(h.router.navigation_count(), navigations);
    assert!(first_query.is_empty());
}

#[test]
fn test_submitter_sees_final_step_before_reset() {
    common::init_logging();
    let event_loop = EventLoop::new();
    let slot: Arc<OnceLock<WizardController>> = Arc::new(OnceLock::new());
    let observed = Arc::new(Mutex::new(Vec::new()));

    let (controller_slot, sink) = (slot.clone(), observed.clone());
    let controller = WizardController::builder()
        .tree(CreationTree::build(two_steps()).unwrap())
        .router(Arc::new(MemoryRouter::new("/poll/create/root")))
        .submitter(Arc::new(move |submitted: Query| {
            let Some(controller) = controller_slot.get() else {
                return;
            };
            let step = controller.current_step();
            sink.lock().push((
                controller.current_segment(),
                controller.tree()[step].query_snapshot(),
                submitted,
            ));
        }))
        .event_loop(event_loop.handle())
        .build()
        .unwrap();
    let _ = slot.set(controller.clone());

    let root = FixedBinding::new(["title"], true);
    controller.register(&root).set("title", json!("Lunch"));
    event_loop.run_pending();
    assert!(controller.next());

    let leaf = FixedBinding::passive();
    controller.register(&leaf);
    event_loop.run_pending();
    assert!(controller.next());

    let lunch = query(json!({ "title": "Lunch" }));
    assert_eq!(
        *observed.lock(),
        vec![("leaf".to_string(), lunch.clone(), lunch)]
    );
    assert_eq!(controller.current_segment(), "root");
    let tree = controller.tree();
    assert!(tree[tree.root()].query_snapshot().is_empty());
}

#[test]
fn test_submitted_signal_mirrors_submission() {
    let h = Harness::new(StepSpec::final_step("only", "Only"), "/poll/create/only");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    h.controller
        .submitted()
        .connect(move |query| sink.lock().push(query.clone()));

    let binding = FixedBinding::new(["x"], true);
    h.controller.register(&binding).set("x", json!(1));
    h.tick();
    assert!(h.controller.next());

    assert_eq!(*seen.lock(), vec![query(json!({ "x": 1 }))]);
    assert_eq!(*h.submissions.lock(), *seen.lock());
}

#[test]
fn test_location_mismatch_redirects() {
    let h = Harness::new(two_steps(), "/somewhere/else");
    let binding = FixedBinding::new(["a"], true);

    let detached = h.controller.register(&binding);
    assert!(detached.is_empty());
    assert_eq!(h.router.history(), vec![h.path("root")]);
    assert!(!h.controller.has_active_binding());
    assert_eq!(binding.validable().subscriber_count(), 0);

    detached.set("a", json!(1));
    let root = h.controller.tree().root();
    assert!(h.controller.tree()[root].query_snapshot().is_empty());

    h.tick();
    assert!(h.next_statuses.lock().is_empty());

    let live = h.controller.register(&binding);
    assert!(!live.ptr_eq(&detached));
    assert_eq!(h.router.navigation_count(), 1);
}

#[test]
fn test_location_with_query_string_matches() {
    let h = Harness::new(two_steps(), "/poll/create/root?draft=1");
    let binding = FixedBinding::passive();
    h.controller.register(&binding);
    assert_eq!(h.router.navigation_count(), 0);
    assert!(h.controller.has_active_binding());
}

#[test]
fn test_back_at_root_is_a_noop() {
    let h = Harness::new(two_steps(), "/poll/create/root");
    assert!(!h.controller.back());
    assert!(matches!(
        h.controller.try_back(),
        Err(WizardError::AtRoot { ref segment }) if segment == "root"
    ));
    assert_eq!(h.controller.current_segment(), "root");
    assert_eq!(h.router.navigation_count(), 0);
}

#[test]
fn test_next_requires_validable_step() {
    let h = Harness::new(two_steps(), "/poll/create/root");
    let binding = FixedBinding::new(["a"], false);
    h.controller.register(&binding);

    // Validity only counts once delivered.
    binding.set_validable(true);
    assert!(!h.controller.next());

    h.tick();
    assert!(h.controller.next());
}

#[test]
fn test_double_next_is_rejected() {
    let h = Harness::new(three_steps(), "/poll/create/first");
    let binding = FixedBinding::passive();
    h.controller.register(&binding);
    h.tick();

    assert!(h.controller.next());
    assert!(matches!(
        h.controller.try_next(),
        Err(WizardError::NotValidable { ref segment }) if segment == "second"
    ));
    assert_eq!(h.controller.current_segment(), "second");
}

#[test]
fn test_transition_drops_pending_emissions() {
    let h = Harness::new(two_steps(), "/poll/create/root");
    let binding = FixedBinding::new(["a"], true);
    h.controller.register(&binding);
    h.tick();
    h.clear_recordings();

    binding.set_validable(false);
    binding.set_validable(true);
    assert!(h.controller.next());
    h.tick();

    assert!(h.next_statuses.lock().is_empty());
    assert_eq!(h.controller.last_next_status(), None);
    assert_eq!(binding.validable().subscriber_count(), 0);
}

#[test]
fn test_multi_hop_back() {
    let h = Harness::new(three_steps(), "/poll/create/first");
    let first = FixedBinding::new(["a"], true);
    let second = FixedBinding::new(["b"], true);
    let third = FixedBinding::passive();

    h.controller.register(&first).set("a", json!(1));
    h.tick();
    assert!(h.controller.next());
    h.controller.register(&second).set("b", json!(2));
    h.tick();
    assert!(h.controller.next());
    h.controller.register(&third);
    h.tick();

    assert!(h.controller.back());
    assert!(h.controller.back());
    assert!(!h.controller.back());

    let tree = h.controller.tree();
    let second_id = tree.find("second").unwrap();
    let third_id = tree.find("third").unwrap();
    assert_eq!(h.controller.current_segment(), "first");
    assert!(tree[tree.root()].handled_fields().is_empty());
    assert!(tree[second_id].handled_fields().is_empty());
    assert_eq!(tree[third_id].handled_fields(), fields(&["a", "b"]));
    assert_eq!(tree[second_id].query_snapshot(), query(json!({ "a": 1, "b": 2 })));
    assert_eq!(h.router.current_location(), "/poll/create/first");
}

#[test]
fn test_conditional_branch_follows_answers() {
    let spec = StepSpec::conditional(
        "kind",
        "Kind",
        vec![
            StepSpec::final_step("quick", "Quick"),
            StepSpec::linear("rounds", "Rounds", StepSpec::final_step("review", "Review")),
        ],
        |query| match query.get("iterative") {
            Some(value) if value == &json!(true) => Some(1),
            _ => Some(0),
        },
    );
    let h = Harness::new(spec, "/poll/create/kind");
    let binding = FixedBinding::new(["iterative"], true);

    let kind_query = h.controller.register(&binding);
    h.tick();
    assert_eq!(h.step_statuses.lock()[0].steps, vec!["Kind", "Quick"]);

    kind_query.set("iterative", json!(true));
    assert_eq!(
        h.controller.current_status().steps,
        vec!["Kind", "Rounds", "Review"]
    );

    assert!(h.controller.next());
    assert_eq!(h.controller.current_segment(), "rounds");

    let rounds = FixedBinding::passive();
    h.controller.register(&rounds);
    h.tick();
    assert_eq!(
        h.step_statuses.lock().last().cloned(),
        Some(StepStatus::new(
            1,
            vec!["Kind".into(), "Rounds".into(), "Review".into()],
            false
        ))
    );
}

#[test]
fn test_missing_successor_leaves_state() {
    let spec = StepSpec::conditional(
        "gate",
        "Gate",
        vec![StepSpec::final_step("end", "End")],
        |query| query.get("go").map(|_| 0),
    );
    let h = Harness::new(spec, "/poll/create/gate");
    let binding = FixedBinding::passive();
    h.controller.register(&binding);
    h.tick();

    assert!(!h.controller.next());
    assert!(matches!(
        h.controller.try_next(),
        Err(WizardError::MissingSuccessor { .. })
    ));
    assert_eq!(h.controller.current_segment(), "gate");
    assert!(h.controller.has_active_binding());
    assert_eq!(h.router.navigation_count(), 0);
}

#[test]
fn test_abandon_resets_everything() {
    let h = Harness::new(two_steps(), "/poll/create/root");
    let binding = FixedBinding::new(["a"], true);
    let root_query = h.controller.register(&binding);
    root_query.set("a", json!(1));
    h.tick();
    assert!(h.controller.next());

    h.controller.abandon();

    let tree = h.controller.tree();
    assert_eq!(h.controller.current_step(), tree.root());
    assert!(root_query.is_empty());
    for (_, node) in tree.iter() {
        assert!(node.query_snapshot().is_empty());
        assert!(node.handled_fields().is_empty());
    }
    assert_eq!(h.router.current_location(), "/poll/create/root");
    assert!(h.submissions.lock().is_empty());
}
