//! In-process setting store
//!
//! Backs the command line tool and the test suites. Values are kept per full
//! key in a concurrent map and every update is broadcast as a
//! [`ChangeEvent`].

use crate::change::ChangeEvent;
use crate::scope::{Scope, ScopedValue};
use crate::store::{SettingStore, StoreError};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Serializable content of a [`MemoryStore`]
///
/// ```json
/// {
///   "global": { "catch2TestExplorer.executables": null },
///   "workspace": {},
///   "workspaceFolder": { "testMate.cpp.test.executable": "out/*_test" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Values at [`Scope::Global`]
    #[serde(default)]
    pub global: BTreeMap<String, Value>,
    /// Values at [`Scope::Workspace`]
    #[serde(default)]
    pub workspace: BTreeMap<String, Value>,
    /// Values at [`Scope::WorkspaceFolder`]
    #[serde(default)]
    pub workspace_folder: BTreeMap<String, Value>,
}

impl Snapshot {
    fn scope_mut(&mut self, scope: Scope) -> &mut BTreeMap<String, Value> {
        match scope {
            Scope::Global => &mut self.global,
            Scope::Workspace => &mut self.workspace,
            Scope::WorkspaceFolder => &mut self.workspace_folder,
        }
    }

    fn into_scopes(self) -> [(Scope, BTreeMap<String, Value>); 3] {
        [
            (Scope::Global, self.global),
            (Scope::Workspace, self.workspace),
            (Scope::WorkspaceFolder, self.workspace_folder),
        ]
    }
}

/// Setting store kept in memory
#[derive(Debug)]
pub struct MemoryStore {
    values: DashMap<String, ScopedValue<Value>>,
    changes: broadcast::Sender<ChangeEvent>,
    folder: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: DashMap::new(),
            changes,
            folder: None,
        }
    }

    /// Attribute folder-scope changes to `folder`
    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Seed a value without broadcasting
    #[must_use]
    pub fn with_value(self, key: &str, scope: Scope, value: Value) -> Self {
        self.seed(key, scope, Some(value));
        self
    }

    /// Build from a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        for (scope, values) in snapshot.into_scopes() {
            for (key, value) in values {
                store.seed(&key, scope, Some(value));
            }
        }
        store
    }

    /// Load a JSON snapshot from disk
    ///
    /// # Errors
    /// - `StoreError::Io` if the file cannot be read
    /// - `StoreError::InvalidSnapshot` if it is not a snapshot
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::io_error(path, e))?;
        let snapshot: Snapshot =
            serde_json::from_str(&text).map_err(|source| StoreError::InvalidSnapshot {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write the current content to disk as JSON
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the file cannot be written
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(&self.snapshot()).map_err(|source| {
            StoreError::InvalidSnapshot {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tokio::fs::write(path, text)
            .await
            .map_err(|e| StoreError::io_error(path, e))
    }

    /// Current content
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for entry in &self.values {
            for scope in Scope::ALL {
                if let Some(value) = entry.value().get(scope) {
                    snapshot
                        .scope_mut(scope)
                        .insert(entry.key().clone(), value.clone());
                }
            }
        }
        snapshot
    }

    /// Number of keys holding a value at any scope
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no key holds a value
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn seed(&self, key: &str, scope: Scope, value: Option<Value>) {
        match value {
            Some(value) => {
                self.values
                    .entry(key.to_string())
                    .or_default()
                    .set(scope, Some(value));
            }
            None => {
                if let Some(mut entry) = self.values.get_mut(key) {
                    entry.set(scope, None);
                }
                self.values.remove_if(key, |_, v| !v.is_defined());
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SettingStore for MemoryStore {
    fn inspect(&self, key: &str) -> ScopedValue<Value> {
        self.values
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    async fn update(
        &self,
        key: &str,
        value: Option<Value>,
        scope: Scope,
    ) -> Result<(), StoreError> {
        tracing::trace!(key, %scope, remove = value.is_none(), "memory store update");
        self.seed(key, scope, value);

        let folder = match scope {
            Scope::WorkspaceFolder => self.folder.clone(),
            Scope::Global | Scope::Workspace => None,
        };
        // Nobody listening is fine.
        let _ = self.changes.send(ChangeEvent::new([key], folder));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}
