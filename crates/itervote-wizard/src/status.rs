//! Status values broadcast to the UI.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the wizard stands in the creation procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStatus {
    /// Depth of the active step; the root step is 0.
    pub current: usize,
    /// Labels from the root to the deepest step currently reachable.
    pub steps: Vec<String>,
    /// Whether the path may still grow once more answers are known.
    pub may_have_more: bool,
}

impl StepStatus {
    /// Create a status value.
    pub fn new(current: usize, steps: Vec<String>, may_have_more: bool) -> Self {
        Self {
            current,
            steps,
            may_have_more,
        }
    }

    /// Label of the active step.
    pub fn current_label(&self) -> Option<&str> {
        self.steps.get(self.current).map(String::as_str)
    }

    /// Whether the active step is the root; going back is not allowed there.
    pub fn is_first(&self) -> bool {
        self.current == 0
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Step {} of {}{}",
            self.current + 1,
            self.steps.len(),
            if self.may_have_more { "+" } else { "" }
        )?;
        if let Some(label) = self.current_label() {
            write!(f, ": {label}")?;
        }
        Ok(())
    }
}

/// Whether the forward action is available and what it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NextStatus {
    /// Forward navigation is currently permitted.
    pub validable: bool,
    /// Forward navigation submits instead of advancing.
    #[serde(rename = "final")]
    pub is_final: bool,
}

impl NextStatus {
    /// Create a status value.
    pub fn new(validable: bool, is_final: bool) -> Self {
        Self {
            validable,
            is_final,
        }
    }
}
