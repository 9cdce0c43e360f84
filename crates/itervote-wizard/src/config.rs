//! Controller configuration.
//!
//! ```
//! use itervote_wizard::WizardConfig;
//!
//! let config = WizardConfig::from_toml_str(
//!     r#"
//!     [wizard]
//!     base_path = "/polls/new/"
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.base_path(), "/polls/new");
//! assert_eq!(config.canonical_path("general"), "/polls/new/general");
//! ```

use serde::Deserialize;

use crate::error::{Result, WizardError};

/// Default route prefix of the creation wizard.
pub const DEFAULT_BASE_PATH: &str = "/poll/create";

/// Settings of the wizard controller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WizardConfig {
    base_path: String,
    ignore_location_suffix: bool,
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    wizard: WizardConfig,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            ignore_location_suffix: true,
        }
    }
}

impl WizardConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the route prefix under which step segments live.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set whether `?query` and `#fragment` parts of the current location
    /// are ignored when matching it against a step.
    pub fn with_ignore_location_suffix(mut self, ignore: bool) -> Self {
        self.ignore_location_suffix = ignore;
        self
    }

    /// Parse the `[wizard]` table of a TOML document.
    ///
    /// A missing table yields the defaults. The result is validated.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(s)?;
        file.wizard.validate()?;
        Ok(file.wizard)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        let base = self.base_path.as_str();
        if base.is_empty() {
            return Err(WizardError::InvalidConfig("base path is empty".into()));
        }
        if !base.starts_with('/') {
            return Err(WizardError::InvalidConfig(format!(
                "base path '{base}' is not absolute"
            )));
        }
        Ok(())
    }

    /// The route prefix, without trailing slash.
    pub fn base_path(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }

    /// Whether location suffixes are stripped before matching.
    pub fn ignore_location_suffix(&self) -> bool {
        self.ignore_location_suffix
    }

    /// The path at which `segment` is displayed.
    pub fn canonical_path(&self, segment: &str) -> String {
        format!("{}/{}", self.base_path(), segment)
    }

    /// Whether `location` displays `segment`.
    ///
    /// Matching is by suffix, so the host may mount the wizard under any
    /// prefix.
    pub fn location_matches(&self, location: &str, segment: &str) -> bool {
        let location = if self.ignore_location_suffix {
            location
                .split(['?', '#'])
                .next()
                .unwrap_or(location)
        } else {
            location
        };
        let location = location.trim_end_matches('/');
        location
            .strip_suffix(segment)
            .is_some_and(|prefix| prefix.ends_with('/'))
    }
}
