//! The contract between a mounted step view and the controller.

use std::collections::BTreeSet;

use itervote_core::Observable;

/// What the controller needs from the step currently mounted.
///
/// `handled_fields` is read once, at registration. `validable` is subscribed
/// for as long as the step stays active; because [`Observable::subscribe`]
/// replays the current value, the controller learns the initial validity
/// without waiting for a change.
pub trait StepBinding {
    /// The query fields this step edits.
    fn handled_fields(&self) -> BTreeSet<String>;

    /// Whether the step's inputs currently allow moving forward.
    fn validable(&self) -> &Observable<bool>;
}

/// A binding with a fixed field set and manually driven validity.
///
/// Used for steps without inputs (a summary page) and for hosts that manage
/// their own forms.
#[derive(Debug)]
pub struct FixedBinding {
    fields: BTreeSet<String>,
    validable: Observable<bool>,
}

impl FixedBinding {
    /// Create a binding claiming `fields`, initially `validable`.
    pub fn new<I, S>(fields: I, validable: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            validable: Observable::new(validable),
        }
    }

    /// A binding with no fields that is always validable.
    pub fn passive() -> Self {
        Self::new(std::iter::empty::<String>(), true)
    }

    /// Change the validity, notifying the controller if it changed.
    pub fn set_validable(&self, validable: bool) -> bool {
        self.validable.set(validable)
    }
}

impl StepBinding for FixedBinding {
    fn handled_fields(&self) -> BTreeSet<String> {
        self.fields.clone()
    }

    fn validable(&self) -> &Observable<bool> {
        &self.validable
    }
}
