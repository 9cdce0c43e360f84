//! Error types for the wizard engine.

/// Result type alias for wizard operations.
pub type Result<T> = std::result::Result<T, WizardError>;

/// Errors that can occur while building or driving the creation wizard.
///
/// Navigation misuse (`NotValidable`, `AtRoot`, `MissingSuccessor`) is only
/// ever returned by the strict `try_*` controller methods; the plain
/// `next()`/`back()` entry points log it and carry on.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    /// A step was declared with an empty segment.
    #[error("Step '{label}' has an empty segment")]
    EmptySegment { label: String },

    /// Two steps share a segment; segments double as route leaves.
    #[error("Duplicate step segment '{0}'")]
    DuplicateSegment(String),

    /// A conditional step was declared without any branch.
    #[error("Conditional step '{0}' has no branches")]
    NoBranches(String),

    /// A non-final step produced no successor.
    #[error("Step '{segment}' is not final but has no successor")]
    MissingSuccessor { segment: String },

    /// Forward navigation was requested while the step is not validable.
    #[error("Cannot advance from step '{segment}': step is not validable")]
    NotValidable { segment: String },

    /// Backward navigation was requested on the root step.
    #[error("Cannot go back from root step '{segment}'")]
    AtRoot { segment: String },

    /// The controller was assembled without a required collaborator.
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The accumulated query does not decode into a poll request.
    #[error("Failed to decode poll request: {0}")]
    Decode(#[from] serde_json::Error),
}

impl WizardError {
    /// Whether this error is a navigation contract violation rather than a
    /// construction or decoding problem.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::NotValidable { .. } | Self::AtRoot { .. } | Self::MissingSuccessor { .. }
        )
    }
}
