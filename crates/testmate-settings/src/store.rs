//! Setting store abstraction
//!
//! The editor owns the actual configuration storage. This crate only sees it
//! through [`SettingStore`]: synchronous reads against an already loaded
//! snapshot, asynchronous writes, and a broadcast of change events.
//!
//! [`Section`] binds a store to a root identifier (`testMate.cpp` or the
//! legacy `catch2TestExplorer`), and [`SettingSlot`] binds a section to a
//! single key so migrations can be written against [`ScopedSlot`] without
//! knowing the backend.

use crate::change::ChangeEvent;
use crate::scope::{Scope, ScopedValue};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Errors raised by a store while persisting a value
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend refused the write
    #[error("write of '{key}' at {scope} scope rejected: {reason}")]
    Rejected {
        /// Full key
        key: String,
        /// Scope written to
        scope: Scope,
        /// Backend message
        reason: String,
    },

    /// Snapshot file could not be read or written
    #[error("io error on {path}: {source}")]
    Io {
        /// Snapshot path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Snapshot file is not valid JSON
    #[error("invalid snapshot {path}: {source}")]
    InvalidSnapshot {
        /// Snapshot path
        path: PathBuf,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create a rejected-write error
    pub fn rejected(key: impl Into<String>, scope: Scope, reason: impl Into<String>) -> Self {
        Self::Rejected {
            key: key.into(),
            scope,
            reason: reason.into(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Backend holding scoped key-value settings
///
/// Keys are full dotted names (`testMate.cpp.test.executables`). A store is
/// bound to one workspace folder; the folder scope it reports belongs to
/// that folder.
#[async_trait::async_trait]
pub trait SettingStore: Send + Sync {
    /// Values of `key` at every scope
    fn inspect(&self, key: &str) -> ScopedValue<Value>;

    /// Effective value of `key`
    fn get(&self, key: &str) -> Option<Value> {
        self.inspect(key).effective().cloned()
    }

    /// Write `value` to `key` at `scope`; `None` removes the value
    async fn update(&self, key: &str, value: Option<Value>, scope: Scope)
        -> Result<(), StoreError>;

    /// Receive change events for every subsequent update
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// A store seen through a fixed root identifier
#[derive(Clone)]
pub struct Section {
    store: Arc<dyn SettingStore>,
    root: Arc<str>,
}

impl Section {
    /// Bind `store` to `root`
    #[must_use]
    pub fn new(store: Arc<dyn SettingStore>, root: &str) -> Self {
        Self {
            store,
            root: Arc::from(root),
        }
    }

    /// Root identifier
    #[inline]
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SettingStore> {
        &self.store
    }

    /// Full dotted key for `key` below the root
    #[must_use]
    pub fn full_key(&self, key: &str) -> String {
        format!("{}.{}", self.root, key)
    }

    /// Values of `key` at every scope
    #[must_use]
    pub fn inspect(&self, key: &str) -> ScopedValue<Value> {
        self.store.inspect(&self.full_key(key))
    }

    /// Effective value of `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(&self.full_key(key))
    }

    /// Write `key` at `scope`
    ///
    /// # Errors
    /// Whatever the backend reports.
    pub async fn update(
        &self,
        key: &str,
        value: Option<Value>,
        scope: Scope,
    ) -> Result<(), StoreError> {
        self.store.update(&self.full_key(key), value, scope).await
    }

    /// Handle on a single key
    #[must_use]
    pub fn slot(&self, key: &str) -> SettingSlot {
        SettingSlot {
            section: self.clone(),
            key: Arc::from(key),
        }
    }
}

impl std::fmt::Debug for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section").field("root", &self.root).finish_non_exhaustive()
    }
}

/// A single setting readable and writable per scope
///
/// Migrations are generic over this trait so they do not depend on how or
/// where values are stored.
#[async_trait::async_trait]
pub trait ScopedSlot: Send + Sync {
    /// Full key, for logs
    fn name(&self) -> String;

    /// Values at every scope
    fn inspect(&self) -> ScopedValue<Value>;

    /// Value at `scope`
    fn read(&self, scope: Scope) -> Option<Value> {
        self.inspect().get(scope).cloned()
    }

    /// Write (or with `None`, clear) the value at `scope`
    async fn write(&self, scope: Scope, value: Option<Value>) -> Result<(), StoreError>;
}

/// [`ScopedSlot`] backed by a [`Section`]
#[derive(Debug, Clone)]
pub struct SettingSlot {
    section: Section,
    key: Arc<str>,
}

impl SettingSlot {
    /// Key relative to the section root
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Owning section
    #[inline]
    #[must_use]
    pub fn section(&self) -> &Section {
        &self.section
    }
}

#[async_trait::async_trait]
impl ScopedSlot for SettingSlot {
    fn name(&self) -> String {
        self.section.full_key(&self.key)
    }

    fn inspect(&self) -> ScopedValue<Value> {
        self.section.inspect(&self.key)
    }

    async fn write(&self, scope: Scope, value: Option<Value>) -> Result<(), StoreError> {
        self.section.update(&self.key, value, scope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde_json::json;

    #[test]
    fn section_prefixes_keys() {
        let store = Arc::new(MemoryStore::new());
        let section = Section::new(store, "testMate.cpp");
        assert_eq!(section.full_key("test.executables"), "testMate.cpp.test.executables");
        assert_eq!(section.slot("log.logfile").name(), "testMate.cpp.log.logfile");
    }

    #[tokio::test]
    async fn slot_reads_and_writes_through_section() {
        let store = Arc::new(MemoryStore::new());
        let section = Section::new(store.clone(), "root");
        let slot = section.slot("a.b");

        slot.write(Scope::Workspace, Some(json!(3))).await.unwrap();
        assert_eq!(slot.read(Scope::Workspace), Some(json!(3)));
        assert_eq!(slot.read(Scope::Global), None);
        assert_eq!(store.get("root.a.b"), Some(json!(3)));

        slot.write(Scope::Workspace, None).await.unwrap();
        assert!(!slot.inspect().is_defined());
    }

    #[test]
    fn rejected_error_names_key_and_scope() {
        let err = StoreError::rejected("root.k", Scope::Global, "read-only");
        assert_eq!(
            err.to_string(),
            "write of 'root.k' at global scope rejected: read-only"
        );
    }
}
