//! Override scopes and per-scope values
//!
//! Settings live in three layers. The most specific layer that holds a
//! value wins:
//!
//! ```text
//! Global  <  Workspace  <  WorkspaceFolder
//! ```

use serde::{Deserialize, Serialize};

/// Override layer of the configuration store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    /// User-wide settings
    Global,
    /// Settings of the opened workspace
    Workspace,
    /// Settings of a single workspace folder
    WorkspaceFolder,
}

impl Scope {
    /// All scopes, least specific first
    pub const ALL: [Scope; 3] = [Scope::Global, Scope::Workspace, Scope::WorkspaceFolder];

    /// Stable name used in logs and snapshots
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Workspace => "workspace",
            Scope::WorkspaceFolder => "workspaceFolder",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value as seen at each of the three scopes
///
/// A `ScopedValue` is *defined* if at least one scope holds a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopedValue<T> {
    /// Value at [`Scope::Global`]
    pub global_value: Option<T>,
    /// Value at [`Scope::Workspace`]
    pub workspace_value: Option<T>,
    /// Value at [`Scope::WorkspaceFolder`]
    pub workspace_folder_value: Option<T>,
}

impl<T> Default for ScopedValue<T> {
    fn default() -> Self {
        Self {
            global_value: None,
            workspace_value: None,
            workspace_folder_value: None,
        }
    }
}

impl<T> ScopedValue<T> {
    /// Empty triple
    #[inline]
    #[must_use]
    pub fn undefined() -> Self {
        Self::default()
    }

    /// Value at a single scope
    #[inline]
    #[must_use]
    pub fn get(&self, scope: Scope) -> Option<&T> {
        match scope {
            Scope::Global => self.global_value.as_ref(),
            Scope::Workspace => self.workspace_value.as_ref(),
            Scope::WorkspaceFolder => self.workspace_folder_value.as_ref(),
        }
    }

    /// Replace the value at `scope`, returning the previous one
    pub fn set(&mut self, scope: Scope, value: Option<T>) -> Option<T> {
        let slot = match scope {
            Scope::Global => &mut self.global_value,
            Scope::Workspace => &mut self.workspace_value,
            Scope::WorkspaceFolder => &mut self.workspace_folder_value,
        };
        std::mem::replace(slot, value)
    }

    /// Builder form of [`ScopedValue::set`]
    #[inline]
    #[must_use]
    pub fn with(mut self, scope: Scope, value: T) -> Self {
        self.set(scope, Some(value));
        self
    }

    /// True if any scope holds a value
    #[inline]
    #[must_use]
    pub fn is_defined(&self) -> bool {
        Scope::ALL.iter().any(|scope| self.get(*scope).is_some())
    }

    /// Most specific value
    #[must_use]
    pub fn effective(&self) -> Option<&T> {
        Scope::ALL.iter().rev().find_map(|scope| self.get(*scope))
    }

    /// Scopes that hold a value
    pub fn defined_scopes(&self) -> impl Iterator<Item = Scope> + '_ {
        Scope::ALL.into_iter().filter(|scope| self.get(*scope).is_some())
    }

    /// Consume into `(scope, value)` pairs for every scope, defined or not
    pub fn into_entries(self) -> [(Scope, Option<T>); 3] {
        [
            (Scope::Global, self.global_value),
            (Scope::Workspace, self.workspace_value),
            (Scope::WorkspaceFolder, self.workspace_folder_value),
        ]
    }

    /// Apply `f` to every defined value
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ScopedValue<U> {
        ScopedValue {
            global_value: self.global_value.map(&mut f),
            workspace_value: self.workspace_value.map(&mut f),
            workspace_folder_value: self.workspace_folder_value.map(&mut f),
        }
    }
}
