//! TestMate settings
//!
//! The storage-facing half of the configuration engine:
//!
//! - **Scopes**: [`Scope`] and [`ScopedValue`], the Global / Workspace /
//!   WorkspaceFolder override layers
//! - **Stores**: the [`SettingStore`] backend trait, [`Section`] handles bound
//!   to a root identifier, and the in-process [`MemoryStore`]
//! - **Catalogue**: the closed set of logical [`Setting`]s and the static
//!   [`MigrationTable`] to their legacy names
//! - **Changes**: [`ChangeNotifier`] turning raw store events into
//!   per-setting queries
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use testmate_settings::{MemoryStore, Scope, Section, SECTION_ROOT};
//!
//! let store = Arc::new(
//!     MemoryStore::new().with_value("testMate.cpp.debug.noThrow", Scope::Global, json!(true)),
//! );
//! let section = Section::new(store, SECTION_ROOT);
//! assert_eq!(section.get("debug.noThrow"), Some(json!(true)));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod catalogue;
pub mod change;
pub mod memory;
pub mod scope;
pub mod store;

pub use catalogue::{
    MigrationRecord, MigrationTable, Setting, UnknownSetting, LEGACY_EXECUTABLES_KEY,
    LEGACY_SECTION_ROOT, SECTION_ROOT,
};
pub use change::{ChangeEvent, ChangeNotifier, ConfigurationChangeEvent, Subscription};
pub use memory::{MemoryStore, Snapshot};
pub use scope::{Scope, ScopedValue};
pub use store::{ScopedSlot, Section, SettingSlot, SettingStore, StoreError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
