//! Folder-scoped configuration resolution
//!
//! [`ConfigurationResolver`] is the single entry point for reading settings.
//! Every read of a setting with a legacy counterpart first checks the legacy
//! key and, if it is defined anywhere, migrates it (see
//! [`migrate_scalar`]). The typed accessors layer defaults and light
//! validation on top of [`ConfigurationResolver::resolve`].

use crate::debug::{DebugHost, DebugTemplateResolver};
use crate::error::ConfigResult;
use crate::executable::{clamp_limit, ExecutableConfig, ExecutableDefaults, CWD_PLACEHOLDER};
use crate::expander::ExecutableSpecExpander;
use crate::migration::migrate_scalar;
use crate::persist::DetachedWrites;
use crate::values::{
    GmockVerbosity, GmockWarningTreatment, RandomSeed, SentryConsent, SharedSettings,
};
use crate::variables::VariableRules;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use testmate_settings::{
    ChangeNotifier, Scope, ScopedSlot, Section, Setting, SettingStore, LEGACY_SECTION_ROOT,
    SECTION_ROOT,
};

/// Workspace folder a resolver is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFolder {
    name: String,
    path: Option<PathBuf>,
}

impl WorkspaceFolder {
    /// Create new folder descriptor
    #[must_use]
    pub fn new(name: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    /// Folder on disk, named after its last path component
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self::new(name, Some(path))
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filesystem path, if the folder is local
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Resolves settings for one workspace folder, migrating legacy keys on read
#[derive(Debug, Clone)]
pub struct ConfigurationResolver {
    folder: WorkspaceFolder,
    section: Section,
    legacy: Section,
    writes: DetachedWrites,
}

impl ConfigurationResolver {
    /// Create resolver over `store` for `folder`
    ///
    /// The log settings are resolved immediately so that they are migrated
    /// before anything else reads them.
    #[must_use]
    pub fn new(store: Arc<dyn SettingStore>, folder: WorkspaceFolder) -> Self {
        let resolver = Self {
            folder,
            section: Section::new(store.clone(), SECTION_ROOT),
            legacy: Section::new(store, LEGACY_SECTION_ROOT),
            writes: DetachedWrites::new(),
        };
        let _ = resolver.resolve(Setting::LogPanel);
        let _ = resolver.resolve(Setting::LogFile);
        resolver
    }

    /// Bound folder
    #[inline]
    #[must_use]
    pub fn folder(&self) -> &WorkspaceFolder {
        &self.folder
    }

    /// Handle on the current settings root
    #[inline]
    #[must_use]
    pub fn section(&self) -> &Section {
        &self.section
    }

    /// Handle on the legacy settings root
    #[inline]
    #[must_use]
    pub fn legacy_section(&self) -> &Section {
        &self.legacy
    }

    /// Outstanding migration writes
    #[inline]
    #[must_use]
    pub fn writes(&self) -> &DetachedWrites {
        &self.writes
    }

    /// Wait for every migration write issued so far
    pub async fn settle(&self) {
        self.writes.settle().await;
    }

    /// Change notifications for this folder
    #[must_use]
    pub fn change_notifier(&self) -> ChangeNotifier {
        ChangeNotifier::new(self.section.store().clone(), self.folder.path.clone())
    }

    /// Effective value of `setting`, migrating its legacy key first
    ///
    /// While a migration is in flight the legacy value is returned; once the
    /// legacy key is cleared the new key is read.
    #[must_use]
    pub fn resolve(&self, setting: Setting) -> Option<Value> {
        if let Some(legacy_key) = setting.legacy_key() {
            let legacy = self.legacy.slot(legacy_key);
            let target = self.section.slot(setting.key());
            if let Some(value) = migrate_scalar(&legacy, &target, &self.writes) {
                return Some(value);
            }
        }
        let value = self.section.get(setting.key());
        tracing::debug!(key = %setting, ?value, "resolved setting");
        value
    }

    /// Effective value of `setting` as `T`; a value of another type is
    /// logged and treated as unset
    #[must_use]
    pub fn resolve_as<T: DeserializeOwned>(&self, setting: Setting) -> Option<T> {
        let value = self.resolve(setting)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(error) => {
                tracing::warn!(key = %setting, %error, "setting has unexpected type; using default");
                None
            }
        }
    }

    /// Effective value of `setting` as `T`, or `default`
    #[must_use]
    pub fn resolve_or<T: DeserializeOwned>(&self, setting: Setting, default: T) -> T {
        self.resolve_as(setting).unwrap_or(default)
    }

    /// Write `value` to the current key of `setting` in the background
    pub fn persist(&self, setting: Setting, scope: Scope, value: Option<Value>) {
        let slot = self.section.slot(setting.key());
        self.writes.spawn(format!("{} @ {scope}", slot.name()), async move {
            slot.write(scope, value).await
        });
    }

    /// `test.randomGeneratorSeed`; `None` disables randomization
    #[must_use]
    pub fn random_seed(&self) -> Option<RandomSeed> {
        match self.resolve(Setting::TestRandomGeneratorSeed) {
            None => Some(RandomSeed::Time),
            Some(value) => RandomSeed::parse(&value),
        }
    }

    /// `test.parallelExecutionLimit`, at least 1
    #[must_use]
    pub fn parallel_execution_limit(&self) -> usize {
        let limit = self.limit(Setting::TestParallelExecutionLimit);
        if limit > 1 {
            tracing::warn!(limit, "parallel test execution enabled; tests must not share resources");
        }
        limit
    }

    /// `test.parallelExecutionOfExecutableLimit`, at least 1
    #[must_use]
    pub fn parallel_execution_of_executable_limit(&self) -> usize {
        self.limit(Setting::TestParallelExecutionOfExecutableLimit)
    }

    fn limit(&self, setting: Setting) -> usize {
        self.resolve(setting)
            .as_ref()
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite())
            .map_or(1, clamp_limit)
    }

    /// `test.runtimeLimit` in milliseconds; unset or non-positive means no limit
    #[must_use]
    pub fn runtime_limit_ms(&self) -> Option<u64> {
        self.resolve(Setting::TestRuntimeLimit)
            .as_ref()
            .and_then(positive_seconds_to_ms)
    }

    /// `discovery.runtimeLimit` in milliseconds; a number ≤ 0 means no limit
    #[must_use]
    pub fn discovery_runtime_limit_ms(&self) -> Option<u64> {
        const DEFAULT_MS: u64 = 5000;
        let Some(value) = self
            .resolve(Setting::DiscoveryRuntimeLimit)
            .filter(|value| !value.is_null())
        else {
            return Some(DEFAULT_MS);
        };
        if value.as_f64().is_some_and(f64::is_finite) {
            return positive_seconds_to_ms(&value);
        }
        tracing::warn!(key = %Setting::DiscoveryRuntimeLimit, %value, "expected seconds; using default");
        Some(DEFAULT_MS)
    }

    /// `discovery.gracePeriodForMissing` in milliseconds
    #[must_use]
    pub fn grace_period_for_missing_ms(&self) -> u64 {
        let seconds: f64 = self.resolve_or(Setting::DiscoveryGracePeriodForMissing, 10.0);
        seconds_to_ms(seconds.max(0.0))
    }

    /// `discovery.retireDebounceLimit` in milliseconds
    #[must_use]
    pub fn retire_debounce_ms(&self) -> u64 {
        self.resolve_or(Setting::DiscoveryRetireDebounceLimit, 1000)
    }

    /// `discovery.testListCaching`
    #[must_use]
    pub fn test_list_caching(&self) -> bool {
        self.resolve_or(Setting::DiscoveryTestListCaching, false)
    }

    /// `debug.breakOnFailure`
    #[must_use]
    pub fn debug_break_on_failure(&self) -> bool {
        self.resolve_or(Setting::DebugBreakOnFailure, true)
    }

    /// `debug.noThrow`
    #[must_use]
    pub fn default_no_throw(&self) -> bool {
        self.resolve_or(Setting::DebugNoThrow, false)
    }

    /// `gtest.treatGmockWarningAs`
    #[must_use]
    pub fn gmock_warning_treatment(&self) -> GmockWarningTreatment {
        self.parsed(Setting::GtestTreatGmockWarningAs)
    }

    /// `gtest.gmockVerbose`
    #[must_use]
    pub fn gmock_verbose(&self) -> GmockVerbosity {
        self.parsed(Setting::GtestGmockVerbose)
    }

    fn parsed<T>(&self, setting: Setting) -> T
    where
        T: FromStr<Err = String> + Default,
    {
        let Some(raw) = self.resolve_as::<String>(setting) else {
            return T::default();
        };
        raw.parse().unwrap_or_else(|reason: String| {
            tracing::warn!(key = %setting, %reason, "using default");
            T::default()
        })
    }

    /// `log.logpanel`
    #[must_use]
    pub fn log_panel_enabled(&self) -> bool {
        self.resolve_or(Setting::LogPanel, false)
    }

    /// `log.logfile`; empty means no log file
    #[must_use]
    pub fn log_file(&self) -> Option<String> {
        self.resolve_as::<Option<String>>(Setting::LogFile)
            .flatten()
            .filter(|path| !path.is_empty())
    }

    /// `log.logSentry`
    #[must_use]
    pub fn sentry_consent(&self) -> SentryConsent {
        self.parsed(Setting::LogSentry)
    }

    /// Crash reports may be sent
    #[must_use]
    pub fn is_sentry_enabled(&self) -> bool {
        self.sentry_consent().is_enabled()
    }

    /// Working directory for executables that set none
    ///
    /// `test.workingDirectory`, else the folder path, else `${absDirpath}`.
    #[must_use]
    pub fn default_cwd(&self) -> String {
        if let Some(cwd) = self
            .resolve_as::<Option<String>>(Setting::TestWorkingDirectory)
            .flatten()
            .filter(|cwd| !cwd.is_empty())
        {
            return cwd;
        }
        self.folder
            .path()
            .map_or_else(|| CWD_PLACEHOLDER.to_string(), |p| p.display().to_string())
    }

    /// Placeholder rules for this folder
    #[must_use]
    pub fn variable_rules(&self) -> VariableRules {
        VariableRules::for_folder(self.folder.name(), self.folder.path())
    }

    /// Bundle of run-time settings attached to every executable
    #[must_use]
    pub fn shared_settings(&self) -> SharedSettings {
        SharedSettings {
            random_seed: self.random_seed(),
            runtime_limit_ms: self.runtime_limit_ms(),
            discovery_runtime_limit_ms: self.discovery_runtime_limit_ms(),
            parallel_execution_limit: self.parallel_execution_limit(),
            grace_period_for_missing_ms: self.grace_period_for_missing_ms(),
            retire_debounce_ms: self.retire_debounce_ms(),
            test_list_caching: self.test_list_caching(),
            debug_break_on_failure: self.debug_break_on_failure(),
            no_throw: self.default_no_throw(),
            gmock_warning_treatment: self.gmock_warning_treatment(),
            gmock_verbose: self.gmock_verbose(),
        }
    }

    /// Defaults for executables that leave fields unset
    #[must_use]
    pub fn executable_defaults(&self) -> ExecutableDefaults {
        ExecutableDefaults {
            cwd: self.default_cwd(),
            parallelization_limit: self.parallel_execution_of_executable_limit(),
        }
    }

    /// Expand executables with this folder's shared settings and rules
    ///
    /// # Errors
    /// See [`ExecutableSpecExpander::expand`].
    pub async fn executables(&self) -> ConfigResult<Vec<ExecutableConfig>> {
        ExecutableSpecExpander::new(self)
            .expand(
                Arc::new(self.shared_settings()),
                Arc::new(self.variable_rules()),
            )
            .await
    }

    /// Debug template resolver using `host`
    #[must_use]
    pub fn debug_templates<'a>(&'a self, host: &'a dyn DebugHost) -> DebugTemplateResolver<'a> {
        DebugTemplateResolver::new(self, host)
    }
}

fn positive_seconds_to_ms(value: &Value) -> Option<u64> {
    value
        .as_f64()
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(seconds_to_ms)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).round() as u64
}
