//! Error types for configuration resolution
//!
//! Three classes of problems, handled differently:
//! - [`ConfigError`]: a setting has a shape that cannot be used. Fatal to
//!   the operation that needed it and surfaced to the user.
//! - [`StoreError`](testmate_settings::StoreError): persisting a migrated
//!   value failed. Logged, never returned.
//! - [`Diagnostic`]: a single field or list element was malformed and has
//!   been dropped. Logged, processing continues.

use testmate_settings::Setting;

/// Fatal configuration problem
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Setting value has an unrecognized shape
    #[error("invalid value for '{setting}': {message}")]
    Shape {
        /// Full key
        setting: String,
        /// What was wrong
        message: String,
    },

    /// Executable object without a usable `pattern`
    #[error("'{setting}' entry {index}: pattern is required")]
    PatternRequired {
        /// Full key
        setting: String,
        /// Position in the list
        index: usize,
    },

    /// Nothing to build a debug configuration from
    #[error(
        "for debugging '{setting}' should be set: no supported debug extension is installed \
         (vadimcn.vscode-lldb, webfreak.debug or ms-vscode.cpptools)"
    )]
    NoDebugTemplate {
        /// Full key of the template setting
        setting: String,
    },
}

impl ConfigError {
    /// Create shape error for `setting`
    pub fn shape(setting: Setting, message: impl Into<String>) -> Self {
        Self::Shape {
            setting: setting.full_key(),
            message: message.into(),
        }
    }

    /// Create missing-pattern error for entry `index` of `setting`
    #[must_use]
    pub fn pattern_required(setting: Setting, index: usize) -> Self {
        Self::PatternRequired {
            setting: setting.full_key(),
            index,
        }
    }

    /// Create error for a debug session with no template source
    #[must_use]
    pub fn no_debug_template() -> Self {
        Self::NoDebugTemplate {
            setting: Setting::DebugConfigTemplate.full_key(),
        }
    }

    /// True if the setting value itself is malformed
    #[must_use]
    pub fn is_shape_error(&self) -> bool {
        matches!(self, Self::Shape { .. } | Self::PatternRequired { .. })
    }

    /// Full key of the offending setting
    #[must_use]
    pub fn setting(&self) -> &str {
        match self {
            Self::Shape { setting, .. }
            | Self::PatternRequired { setting, .. }
            | Self::NoDebugTemplate { setting } => setting,
        }
    }
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A dropped field or list element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Setting the value came from
    pub setting: Setting,
    /// Path inside the value, e.g. `[1].env`
    pub location: String,
    /// Why it was dropped
    pub reason: String,
}

impl Diagnostic {
    /// Create new diagnostic
    #[inline]
    #[must_use]
    pub fn new(setting: Setting, location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            setting,
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Emit as a warning
    pub fn log(&self) {
        tracing::warn!(
            setting = %self.setting,
            location = %self.location,
            "{}; value ignored",
            self.reason
        );
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}: {}", self.setting.full_key(), self.location, self.reason)
    }
}
