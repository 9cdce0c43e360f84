//! Form-backed steps.
//!
//! A [`StepForm`] is a ready-made [`StepBinding`]: a list of named controls,
//! each holding a JSON value and a set of validators. The form is validable
//! while every control is valid.
//!
//! Mounting a form registers it with the controller, loads the control
//! values from the returned query and then mirrors every control edit back
//! into that same query, for as long as the [`MountedForm`] lives.
//!
//! ```
//! use itervote_wizard::{FormControl, StepForm, Validator};
//! use serde_json::json;
//!
//! let form = StepForm::new([
//!     FormControl::new("title").with_validator(Validator::Required),
//!     FormControl::new("description"),
//! ]);
//! assert!(!form.is_valid());
//!
//! form.set("title", json!("Friday lunch"));
//! assert!(form.is_valid());
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};

use serde_json::Value;

use itervote_core::logging::targets;
use itervote_core::{ConnectionGuard, Observable};

use crate::binding::StepBinding;
use crate::controller::WizardController;
use crate::query::SharedQuery;

// ============================================================================
// ValidationResult
// ============================================================================

/// The outcome of validating a control or a whole form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// A passing result.
    pub fn valid() -> Self {
        Self { errors: Vec::new() }
    }

    /// A failing result about `field`.
    pub fn field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![ValidationError::new(field, message)],
        }
    }

    /// Whether validation passed.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Every failure, in control order.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// First failure message, if any.
    pub fn first_error_message(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }

    /// Fold `other` into this result.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The control that failed.
    pub field: String,
    /// What is wrong.
    pub message: String,
}

impl ValidationError {
    /// Create a failure about `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Checks a value; returns the failure message, if any.
pub type CustomCheck = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// A rule a control value must satisfy.
#[derive(Clone)]
pub enum Validator {
    /// Not null, and not a blank string.
    Required,
    /// An array with at least one element.
    NonEmptyList,
    /// An array with at least this many elements.
    MinItems(usize),
    /// An integer within `min..=max`.
    IntegerRange { min: i64, max: i64 },
    /// A string of at most this many characters. Null passes.
    MaxLength(usize),
    /// Anything else.
    Custom(CustomCheck),
}

impl Validator {
    /// Wrap a closure as a validator.
    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(check))
    }

    /// Check `value`, returning the failure message.
    pub fn check(&self, value: &Value) -> Option<String> {
        match self {
            Self::Required => match value {
                Value::Null => Some("is required".into()),
                Value::String(s) if s.trim().is_empty() => Some("is required".into()),
                _ => None,
            },
            Self::NonEmptyList => match value {
                Value::Array(items) if !items.is_empty() => None,
                _ => Some("needs at least one entry".into()),
            },
            Self::MinItems(min) => match value {
                Value::Array(items) if items.len() >= *min => None,
                _ => Some(format!("needs at least {min} entries")),
            },
            Self::IntegerRange { min, max } => match value.as_i64() {
                Some(n) if (*min..=*max).contains(&n) => None,
                _ => Some(format!("must be an integer between {min} and {max}")),
            },
            Self::MaxLength(max) => match value {
                Value::String(s) if s.chars().count() > *max => {
                    Some(format!("must be at most {max} characters"))
                }
                _ => None,
            },
            Self::Custom(check) => check(value),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("Required"),
            Self::NonEmptyList => f.write_str("NonEmptyList"),
            Self::MinItems(n) => f.debug_tuple("MinItems").field(n).finish(),
            Self::IntegerRange { min, max } => f
                .debug_struct("IntegerRange")
                .field("min", min)
                .field("max", max)
                .finish(),
            Self::MaxLength(n) => f.debug_tuple("MaxLength").field(n).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ============================================================================
// FormControl
// ============================================================================

/// A named input holding a JSON value.
pub struct FormControl {
    name: String,
    value: Observable<Value>,
    default: Value,
    validators: Vec<Validator>,
}

impl FormControl {
    /// Create a control whose default is null.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Observable::new(Value::Null),
            default: Value::Null,
            validators: Vec::new(),
        }
    }

    /// Value used when the query does not hold this field yet.
    pub fn with_default(mut self, default: Value) -> Self {
        self.value.set(default.clone());
        self.default = default;
        self
    }

    /// Add a rule.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// The query field this control edits.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current value.
    pub fn value(&self) -> Value {
        self.value.get()
    }

    /// The default value.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    /// Change the value. Returns `true` if it changed.
    pub fn set(&self, value: Value) -> bool {
        self.value.set(value)
    }

    /// The observable behind the value.
    pub fn observable(&self) -> &Observable<Value> {
        &self.value
    }

    /// Run every rule against the current value.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::valid();
        self.value.with(|value| {
            for validator in &self.validators {
                if let Some(message) = validator.check(value) {
                    result.merge(ValidationResult::field_error(&self.name, message));
                }
            }
        });
        result
    }
}

impl fmt::Debug for FormControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormControl")
            .field("name", &self.name)
            .field("value", &self.value.get())
            .field("validators", &self.validators)
            .finish()
    }
}

// ============================================================================
// StepForm
// ============================================================================

/// A step made of form controls.
///
/// Cheap to clone; clones share the same controls.
#[derive(Clone)]
pub struct StepForm {
    state: Arc<FormState>,
}

struct FormState {
    controls: Vec<FormControl>,
    valid: Observable<bool>,
}

impl FormState {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::valid();
        for control in &self.controls {
            result.merge(control.validate());
        }
        result
    }

    fn revalidate(&self) {
        self.valid.set(self.validate().is_valid());
    }
}

impl StepForm {
    /// Create a form from its controls.
    pub fn new(controls: impl IntoIterator<Item = FormControl>) -> Self {
        let controls: Vec<FormControl> = controls.into_iter().collect();
        let state = Arc::new(FormState {
            controls,
            valid: Observable::new(false),
        });
        state.revalidate();

        for control in &state.controls {
            let weak: Weak<FormState> = Arc::downgrade(&state);
            // Lives as long as the control's signal, which the state owns.
            control.observable().changed().connect(move |_| {
                if let Some(state) = weak.upgrade() {
                    state.revalidate();
                }
            });
        }

        Self { state }
    }

    /// Look up a control.
    pub fn control(&self, name: &str) -> Option<&FormControl> {
        self.state.controls.iter().find(|c| c.name == name)
    }

    /// Every control, in declaration order.
    pub fn controls(&self) -> &[FormControl] {
        &self.state.controls
    }

    /// Current value of a control.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.control(name).map(FormControl::value)
    }

    /// Change a control's value. Returns `true` if a control changed.
    pub fn set(&self, name: &str, value: Value) -> bool {
        match self.control(name) {
            Some(control) => control.set(value),
            None => {
                tracing::warn!(target: targets::FORM, field = name, "no such control");
                false
            }
        }
    }

    /// Validate every control.
    pub fn validate(&self) -> ValidationResult {
        self.state.validate()
    }

    /// Whether every control is valid.
    pub fn is_valid(&self) -> bool {
        self.state.valid.get()
    }

    /// Register with `controller` and start mirroring edits into the query.
    ///
    /// Controls take the values found in the query; controls whose field is
    /// absent fall back to their default, which is written to the query
    /// unless it is null.
    pub fn mount(&self, controller: &WizardController) -> MountedForm {
        let query = controller.register(self);

        for control in &self.state.controls {
            match query.get(&control.name) {
                Some(value) => {
                    control.set(value);
                }
                None => {
                    control.set(control.default.clone());
                    if !control.default.is_null() {
                        query.set(control.name.clone(), control.default.clone());
                    }
                }
            }
        }

        let patches = self
            .state
            .controls
            .iter()
            .map(|control| {
                let query = query.clone();
                let field = control.name.clone();
                control.observable().changed().connect_scoped(move |value: &Value| {
                    if value.is_null() {
                        query.remove(&field);
                    } else {
                        query.set(field.clone(), value.clone());
                    }
                })
            })
            .collect();

        tracing::debug!(
            target: targets::FORM,
            controls = self.state.controls.len(),
            valid = self.is_valid(),
            "form mounted"
        );

        MountedForm {
            form: self.clone(),
            query,
            _patches: patches,
        }
    }
}

impl StepBinding for StepForm {
    fn handled_fields(&self) -> BTreeSet<String> {
        self.state.controls.iter().map(|c| c.name.clone()).collect()
    }

    fn validable(&self) -> &Observable<bool> {
        &self.state.valid
    }
}

impl fmt::Debug for StepForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepForm")
            .field("controls", &self.state.controls)
            .field("valid", &self.state.valid.get())
            .finish()
    }
}

/// A form while it is on screen.
///
/// Dropping it stops mirroring edits into the query.
pub struct MountedForm {
    form: StepForm,
    query: SharedQuery,
    _patches: Vec<ConnectionGuard<Value>>,
}

impl MountedForm {
    /// The query the form writes to.
    pub fn query(&self) -> &SharedQuery {
        &self.query
    }

    /// The mounted form.
    pub fn form(&self) -> &StepForm {
        &self.form
    }

    /// Edit a control, as the user would.
    pub fn set(&self, name: &str, value: Value) -> bool {
        self.form.set(name, value)
    }

    /// Stop mirroring edits.
    pub fn unmount(self) {}
}

impl fmt::Debug for MountedForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedForm")
            .field("form", &self.form)
            .field("query", &self.query)
            .finish()
    }
}

static_assertions::assert_impl_all!(StepForm: Send, Sync, Clone);
