//! Poll-creation wizard engine.
//!
//! The creation of a poll is split into steps arranged in a static
//! [`CreationTree`]. A [`WizardController`] walks that tree: the step view
//! mounted by the UI registers with it, edits the live partial query it gets
//! back, and reports whether it may be left. Moving forward carries the
//! step's fields into the next step's query; moving back releases the
//! parent's claim on its fields; confirming the final step hands the
//! accumulated query to a [`Submitter`] and starts over.
//!
//! - **Tree**: [`StepSpec`], [`CreationTree`], [`StepStatus`]
//! - **Controller**: [`WizardController`], [`NextStatus`], [`Transition`]
//! - **Binding**: [`StepBinding`], [`StepForm`], [`FixedBinding`]
//! - **Collaborators**: [`Router`], [`Submitter`]
//! - **Procedure**: the shipped tree and forms in [`procedure`]
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use itervote_core::EventLoop;
//! use itervote_wizard::procedure::{self, fields};
//! use itervote_wizard::{MemoryRouter, Query, Router, WizardController};
//! use serde_json::json;
//!
//! let event_loop = EventLoop::new();
//! let router = Arc::new(MemoryRouter::new("/poll/create/general"));
//! let controller = WizardController::builder()
//!     .tree(procedure::poll_creation_tree().unwrap())
//!     .router(router.clone())
//!     .submitter(Arc::new(|_: Query| {}))
//!     .event_loop(event_loop.handle())
//!     .build()
//!     .unwrap();
//!
//! let general = procedure::general_form();
//! let mounted = general.mount(&controller);
//! mounted.set(fields::TITLE, json!("Friday lunch"));
//! event_loop.run_pending();
//!
//! assert!(controller.next());
//! assert_eq!(router.current_location(), "/poll/create/candidates");
//! ```

mod binding;
mod config;
mod controller;
mod debug;
mod error;
mod form;
pub mod procedure;
mod query;
mod router;
mod status;
mod submit;
mod tree;

pub use binding::{FixedBinding, StepBinding};
pub use config::{DEFAULT_BASE_PATH, WizardConfig};
pub use controller::{Transition, WizardController, WizardControllerBuilder};
pub use debug::{CreationTreeDebug, TreeFormatOptions, TreeStyle};
pub use error::{Result, WizardError};
pub use form::{
    CustomCheck, FormControl, MountedForm, StepForm, ValidationError, ValidationResult, Validator,
};
pub use query::{Query, SharedQuery};
pub use router::{MemoryRouter, NavigationTicket, Router};
pub use status::{NextStatus, StepStatus};
pub use submit::Submitter;
pub use tree::{BranchDecider, CreationTree, StepId, StepKind, StepNode, StepSpec};
