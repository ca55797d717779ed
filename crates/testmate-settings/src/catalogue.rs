//! Logical settings and the legacy key table
//!
//! Every setting the extension reads is a [`Setting`]. Most of them used to
//! live under the legacy `catch2TestExplorer` root with a flat name; the
//! [`MigrationTable`] maps each logical setting to that legacy name.
//!
//! `test.executable` has no legacy counterpart. `test.executables` is fed
//! by the legacy `executables` key, whose shape differs from both new keys,
//! so it is migrated by the executable expander instead of this table.

use std::str::FromStr;

/// Root of all current settings
pub const SECTION_ROOT: &str = "testMate.cpp";

/// Root of the legacy settings
pub const LEGACY_SECTION_ROOT: &str = "catch2TestExplorer";

/// Legacy key holding executables in any of the old shapes
pub const LEGACY_EXECUTABLES_KEY: &str = "executables";

/// Logical setting, independent of where it is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Setting {
    /// `test.executable`: single discovery pattern
    TestExecutable,
    /// `test.executables`: list of executable objects or patterns
    TestExecutables,
    /// `test.workingDirectory`
    TestWorkingDirectory,
    /// `test.randomGeneratorSeed`
    TestRandomGeneratorSeed,
    /// `test.runtimeLimit` (seconds)
    TestRuntimeLimit,
    /// `test.parallelExecutionLimit`
    TestParallelExecutionLimit,
    /// `test.parallelExecutionOfExecutableLimit`
    TestParallelExecutionOfExecutableLimit,
    /// `discovery.gracePeriodForMissing` (seconds)
    DiscoveryGracePeriodForMissing,
    /// `discovery.retireDebounceLimit` (milliseconds)
    DiscoveryRetireDebounceLimit,
    /// `discovery.runtimeLimit` (seconds)
    DiscoveryRuntimeLimit,
    /// `discovery.testListCaching`
    DiscoveryTestListCaching,
    /// `debug.configTemplate`
    DebugConfigTemplate,
    /// `debug.breakOnFailure`
    DebugBreakOnFailure,
    /// `debug.noThrow`
    DebugNoThrow,
    /// `log.logpanel`
    LogPanel,
    /// `log.logfile`
    LogFile,
    /// `log.logSentry`
    LogSentry,
    /// `log.userId`
    LogUserId,
    /// `gtest.treatGmockWarningAs`
    GtestTreatGmockWarningAs,
    /// `gtest.gmockVerbose`
    GtestGmockVerbose,
}

impl Setting {
    /// Every logical setting
    pub const ALL: [Setting; 20] = [
        Setting::TestExecutable,
        Setting::TestExecutables,
        Setting::TestWorkingDirectory,
        Setting::TestRandomGeneratorSeed,
        Setting::TestRuntimeLimit,
        Setting::TestParallelExecutionLimit,
        Setting::TestParallelExecutionOfExecutableLimit,
        Setting::DiscoveryGracePeriodForMissing,
        Setting::DiscoveryRetireDebounceLimit,
        Setting::DiscoveryRuntimeLimit,
        Setting::DiscoveryTestListCaching,
        Setting::DebugConfigTemplate,
        Setting::DebugBreakOnFailure,
        Setting::DebugNoThrow,
        Setting::LogPanel,
        Setting::LogFile,
        Setting::LogSentry,
        Setting::LogUserId,
        Setting::GtestTreatGmockWarningAs,
        Setting::GtestGmockVerbose,
    ];

    /// Key below [`SECTION_ROOT`]
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Setting::TestExecutable => "test.executable",
            Setting::TestExecutables => "test.executables",
            Setting::TestWorkingDirectory => "test.workingDirectory",
            Setting::TestRandomGeneratorSeed => "test.randomGeneratorSeed",
            Setting::TestRuntimeLimit => "test.runtimeLimit",
            Setting::TestParallelExecutionLimit => "test.parallelExecutionLimit",
            Setting::TestParallelExecutionOfExecutableLimit => {
                "test.parallelExecutionOfExecutableLimit"
            }
            Setting::DiscoveryGracePeriodForMissing => "discovery.gracePeriodForMissing",
            Setting::DiscoveryRetireDebounceLimit => "discovery.retireDebounceLimit",
            Setting::DiscoveryRuntimeLimit => "discovery.runtimeLimit",
            Setting::DiscoveryTestListCaching => "discovery.testListCaching",
            Setting::DebugConfigTemplate => "debug.configTemplate",
            Setting::DebugBreakOnFailure => "debug.breakOnFailure",
            Setting::DebugNoThrow => "debug.noThrow",
            Setting::LogPanel => "log.logpanel",
            Setting::LogFile => "log.logfile",
            Setting::LogSentry => "log.logSentry",
            Setting::LogUserId => "log.userId",
            Setting::GtestTreatGmockWarningAs => "gtest.treatGmockWarningAs",
            Setting::GtestGmockVerbose => "gtest.gmockVerbose",
        }
    }

    /// Full dotted key including [`SECTION_ROOT`]
    #[must_use]
    pub fn full_key(self) -> String {
        format!("{SECTION_ROOT}.{}", self.key())
    }

    /// Legacy key below [`LEGACY_SECTION_ROOT`], if the setting is migrated
    #[inline]
    #[must_use]
    pub fn legacy_key(self) -> Option<&'static str> {
        MigrationTable::legacy_key(self)
    }
}

impl std::fmt::Display for Setting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Name is not part of the catalogue
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown setting: '{0}'")]
pub struct UnknownSetting(pub String);

impl FromStr for Setting {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s
            .strip_prefix(SECTION_ROOT)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(s);
        Setting::ALL
            .into_iter()
            .find(|setting| setting.key() == key)
            .ok_or_else(|| UnknownSetting(s.to_string()))
    }
}

/// One row of the legacy key table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationRecord {
    /// Current logical setting
    pub setting: Setting,
    /// Flat name below [`LEGACY_SECTION_ROOT`]
    pub legacy_key: &'static str,
}

const fn record(setting: Setting, legacy_key: &'static str) -> MigrationRecord {
    MigrationRecord {
        setting,
        legacy_key,
    }
}

const MIGRATIONS: [MigrationRecord; 18] = [
    record(Setting::TestWorkingDirectory, "defaultCwd"),
    record(Setting::TestRandomGeneratorSeed, "defaultRngSeed"),
    record(Setting::TestRuntimeLimit, "defaultRunningTimeoutSec"),
    record(Setting::TestParallelExecutionLimit, "workerMaxNumber"),
    record(
        Setting::TestParallelExecutionOfExecutableLimit,
        "defaultExecParallelizationLimit",
    ),
    record(Setting::DiscoveryGracePeriodForMissing, "defaultWatchTimeoutSec"),
    record(Setting::DiscoveryRetireDebounceLimit, "retireDebounceTimeMilisec"),
    record(Setting::DiscoveryRuntimeLimit, "defaultExecParsingTimeoutSec"),
    record(Setting::DiscoveryTestListCaching, "enableTestListCaching"),
    record(Setting::DebugConfigTemplate, "debugConfigTemplate"),
    record(Setting::DebugBreakOnFailure, "debugBreakOnFailure"),
    record(Setting::DebugNoThrow, "defaultNoThrow"),
    record(Setting::LogPanel, "logpanel"),
    record(Setting::LogFile, "logfile"),
    record(Setting::LogSentry, "logSentry"),
    record(Setting::LogUserId, "userId"),
    record(Setting::GtestTreatGmockWarningAs, "googletest.treatGmockWarningAs"),
    record(Setting::GtestGmockVerbose, "googletest.gmockVerbose"),
];

/// Static mapping between logical settings and legacy keys
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationTable;

impl MigrationTable {
    /// All records
    #[inline]
    #[must_use]
    pub fn records() -> &'static [MigrationRecord] {
        &MIGRATIONS
    }

    /// Legacy key of `setting`
    #[must_use]
    pub fn legacy_key(setting: Setting) -> Option<&'static str> {
        MIGRATIONS
            .iter()
            .find(|r| r.setting == setting)
            .map(|r| r.legacy_key)
    }

    /// Logical setting stored under `legacy_key` before
    #[must_use]
    pub fn setting_for_legacy(legacy_key: &str) -> Option<Setting> {
        MIGRATIONS
            .iter()
            .find(|r| r.legacy_key == legacy_key)
            .map(|r| r.setting)
    }
}
