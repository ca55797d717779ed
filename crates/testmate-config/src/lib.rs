//! TestMate configuration
//!
//! Resolution of the extension's settings for one workspace folder:
//!
//! - Reads every setting through [`ConfigurationResolver`], migrating legacy
//!   `catch2TestExplorer` keys to `testMate.cpp` on first read
//! - Expands `test.executables` / `test.executable` into normalized
//!   [`ExecutableConfig`]s with [`ExecutableSpecExpander`]
//! - Picks a debug launch template with [`DebugTemplateResolver`]
//! - Manages the anonymous user id and crash-report consent
//!
//! Malformed fields are dropped with a logged [`Diagnostic`]; only shapes
//! that leave nothing usable fail with a [`ConfigError`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use testmate_config::{ConfigurationResolver, WorkspaceFolder};
//! use testmate_settings::{MemoryStore, Scope};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new().with_value(
//!     "testMate.cpp.test.executables",
//!     Scope::Workspace,
//!     json!(["build/**/*_test"]),
//! );
//! let resolver = ConfigurationResolver::new(Arc::new(store), WorkspaceFolder::from_path("/ws"));
//!
//! let executables = resolver.executables().await?;
//! assert_eq!(executables[0].pattern(), "build/**/*_test");
//! assert_eq!(executables[0].cwd(), "/ws");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod debug;
pub mod error;
pub mod executable;
pub mod expander;
pub mod identity;
pub mod migration;
pub mod persist;
pub mod resolver;
pub mod values;
pub mod variables;

pub use debug::{
    DebugConfigTemplate, DebugHost, DebugTemplateResolver, Platform, ResolvedTemplate,
    TemplateSource,
};
pub use error::{ConfigError, ConfigResult, Diagnostic};
pub use executable::{
    normalize_executable, ExecutableConfig, ExecutableDefaults, ExecutableSpec, Framework,
    FrameworkConfig, FrameworkConfigs, Normalized, RunTask, CWD_PLACEHOLDER,
    DEFAULT_EXECUTABLE_PATTERN,
};
pub use expander::ExecutableSpecExpander;
pub use identity::{ConsentPrompt, CONSENT_MESSAGE, CONSENT_OPTIONS};
pub use migration::{
    migrate_legacy_executables, migrate_scalar, plan_legacy_executables, LegacyExecutablesPlan,
};
pub use persist::DetachedWrites;
pub use resolver::{ConfigurationResolver, WorkspaceFolder};
pub use values::{GmockVerbosity, GmockWarningTreatment, RandomSeed, SentryConsent, SharedSettings};
pub use variables::VariableRules;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for resolving TestMate settings
    pub use crate::{
        ConfigError, ConfigResult, ConfigurationResolver, DebugHost, ExecutableConfig,
        SharedSettings, WorkspaceFolder,
    };
    pub use testmate_settings::{MemoryStore, Scope, Setting, SettingStore};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
