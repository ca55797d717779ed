//! Testing utilities for the TestMate workspace
//!
//! Shared fixtures: seeded stores, a store that rejects writes, a scripted
//! debug host and consent prompt.

#![allow(missing_docs)]

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use testmate_config::{
    ConfigurationResolver, ConsentPrompt, DebugHost, Platform, WorkspaceFolder,
};
use testmate_settings::{
    ChangeEvent, MemoryStore, Scope, ScopedValue, Setting, SettingStore, StoreError,
    LEGACY_SECTION_ROOT,
};
use tokio::sync::broadcast;

pub const FOLDER: &str = "/ws/app";

pub fn new_key(setting: Setting) -> String {
    setting.full_key()
}

pub fn legacy_key(name: &str) -> String {
    format!("{LEGACY_SECTION_ROOT}.{name}")
}

/// Store seeded with `(full key, scope, value)` entries
pub fn seeded(entries: &[(String, Scope, Value)]) -> MemoryStore {
    entries
        .iter()
        .fold(MemoryStore::new(), |store, (key, scope, value)| {
            store.with_value(key, *scope, value.clone())
        })
}

pub fn folder() -> WorkspaceFolder {
    WorkspaceFolder::from_path(FOLDER)
}

pub fn resolver_for(store: Arc<dyn SettingStore>) -> ConfigurationResolver {
    ConfigurationResolver::new(store, folder())
}

/// Resolver plus a handle on its store for inspecting writes
pub fn seeded_resolver(
    entries: &[(String, Scope, Value)],
) -> (Arc<MemoryStore>, ConfigurationResolver) {
    let store = Arc::new(seeded(entries));
    let resolver = resolver_for(store.clone());
    (store, resolver)
}

/// Store that serves reads from a [`MemoryStore`] and rejects every write
#[derive(Debug)]
pub struct FailingStore {
    inner: MemoryStore,
    attempts: Mutex<Vec<(String, Scope, Option<Value>)>>,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> Vec<(String, Scope, Option<Value>)> {
        self.attempts.lock().clone()
    }
}

#[async_trait::async_trait]
impl SettingStore for FailingStore {
    fn inspect(&self, key: &str) -> ScopedValue<Value> {
        self.inner.inspect(key)
    }

    async fn update(
        &self,
        key: &str,
        value: Option<Value>,
        scope: Scope,
    ) -> Result<(), StoreError> {
        self.attempts.lock().push((key.to_string(), scope, value));
        Err(StoreError::rejected(key, scope, "read-only settings"))
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.inner.subscribe()
    }
}

/// Debug host with fixed answers that records extension probes
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub launch: Vec<Value>,
    pub installed: Vec<String>,
    pub platform: Option<Platform>,
    probes: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_launch(mut self, config: Value) -> Self {
        self.launch.push(config);
        self
    }

    pub fn with_extension(mut self, id: &str) -> Self {
        self.installed.push(id.to_string());
        self
    }

    pub fn on(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().clone()
    }
}

impl DebugHost for RecordingHost {
    fn launch_configurations(&self) -> Vec<Value> {
        self.launch.clone()
    }

    fn is_extension_installed(&self, id: &str) -> bool {
        self.probes.lock().push(id.to_string());
        self.installed.iter().any(|i| i == id)
    }

    fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }
}

/// Consent prompt that always gives the same answer
#[derive(Debug)]
pub struct ScriptedPrompt {
    answer: Option<usize>,
    asked: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn answering(answer: Option<usize>) -> Self {
        Self {
            answer,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn times_asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ConsentPrompt for ScriptedPrompt {
    async fn ask(&self, _message: &str, _options: &[&str]) -> Option<usize> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}
