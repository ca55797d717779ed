//! Typed values of individual settings

use serde::{Serialize, Serializer};
use std::str::FromStr;

/// `test.randomGeneratorSeed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomSeed {
    /// Seed from the current time
    Time,
    /// Fixed seed
    Value(i64),
}

impl RandomSeed {
    /// Parse a configured value; `None` means randomization is disabled
    #[must_use]
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if s == "time" => Some(Self::Time),
            serde_json::Value::String(s) => s.trim().parse().ok().map(Self::Value),
            serde_json::Value::Number(n) => n.as_i64().map(Self::Value),
            _ => None,
        }
    }
}

impl Serialize for RandomSeed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Time => serializer.serialize_str("time"),
            Self::Value(seed) => serializer.serialize_i64(*seed),
        }
    }
}

/// `gtest.treatGmockWarningAs`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GmockWarningTreatment {
    /// Warnings do not affect the result
    #[default]
    Nothing,
    /// Warnings fail the test
    Failure,
}

impl FromStr for GmockWarningTreatment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nothing" => Ok(Self::Nothing),
            "failure" => Ok(Self::Failure),
            other => Err(format!("unknown gmock warning treatment '{other}'")),
        }
    }
}

/// `gtest.gmockVerbose`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GmockVerbosity {
    /// Leave `--gmock_verbose` unset
    #[default]
    Default,
    /// `--gmock_verbose=info`
    Info,
    /// `--gmock_verbose=warning`
    Warning,
    /// `--gmock_verbose=error`
    Error,
}

impl GmockVerbosity {
    /// Flag value passed to the executable, if any
    #[must_use]
    pub const fn flag(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Info => Some("info"),
            Self::Warning => Some("warning"),
            Self::Error => Some("error"),
        }
    }
}

impl FromStr for GmockVerbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown gmock verbosity '{other}'")),
        }
    }
}

/// `log.logSentry`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SentryConsent {
    /// Never asked
    #[default]
    Question,
    /// Accepted
    Enable,
    /// Accepted (older spelling)
    Enabled,
    /// Declined, may be asked again
    Disable,
    /// Declined once
    Disable1,
    /// Declined twice
    Disable2,
    /// Declined for good
    Disable3,
}

impl SentryConsent {
    /// Stored string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Enable => "enable",
            Self::Enabled => "enabled",
            Self::Disable => "disable",
            Self::Disable1 => "disable_1",
            Self::Disable2 => "disable_2",
            Self::Disable3 => "disable_3",
        }
    }

    /// Crash reporting is allowed
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enable | Self::Enabled)
    }

    /// The user should be asked (again)
    #[must_use]
    pub const fn should_ask(self) -> bool {
        matches!(
            self,
            Self::Question | Self::Disable | Self::Disable1 | Self::Disable2
        )
    }
}

impl FromStr for SentryConsent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Question,
            Self::Enable,
            Self::Enabled,
            Self::Disable,
            Self::Disable1,
            Self::Disable2,
            Self::Disable3,
        ]
        .into_iter()
        .find(|c| c.as_str() == s)
        .ok_or_else(|| format!("unknown consent state '{s}'"))
    }
}

impl std::fmt::Display for SentryConsent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Folder-wide run-time settings shared by every executable
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSettings {
    /// Seed passed to the frameworks; `None` disables randomization
    pub random_seed: Option<RandomSeed>,
    /// Per-run time limit
    pub runtime_limit_ms: Option<u64>,
    /// Time limit for listing tests
    pub discovery_runtime_limit_ms: Option<u64>,
    /// Concurrent test runs
    pub parallel_execution_limit: usize,
    /// Wait before a vanished executable is retired
    pub grace_period_for_missing_ms: u64,
    /// Debounce for retiring tests
    pub retire_debounce_ms: u64,
    /// Cache test lists between sessions
    pub test_list_caching: bool,
    /// Break into the debugger on failure
    pub debug_break_on_failure: bool,
    /// Skip assertions that expect exceptions
    pub no_throw: bool,
    /// GoogleTest mock warning policy
    pub gmock_warning_treatment: GmockWarningTreatment,
    /// GoogleTest mock verbosity
    pub gmock_verbose: GmockVerbosity,
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self {
            random_seed: Some(RandomSeed::Time),
            runtime_limit_ms: None,
            discovery_runtime_limit_ms: Some(5000),
            parallel_execution_limit: 1,
            grace_period_for_missing_ms: 10_000,
            retire_debounce_ms: 1000,
            test_list_caching: false,
            debug_break_on_failure: true,
            no_throw: false,
            gmock_warning_treatment: GmockWarningTreatment::Nothing,
            gmock_verbose: GmockVerbosity::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn random_seed_parsing() {
        assert_eq!(RandomSeed::parse(&json!("time")), Some(RandomSeed::Time));
        assert_eq!(RandomSeed::parse(&json!("")), None);
        assert_eq!(RandomSeed::parse(&json!("42")), Some(RandomSeed::Value(42)));
        assert_eq!(RandomSeed::parse(&json!("abc")), None);
        assert_eq!(RandomSeed::parse(&json!(7)), Some(RandomSeed::Value(7)));
        assert_eq!(RandomSeed::parse(&json!(null)), None);
    }

    #[test]
    fn random_seed_serializes_like_the_setting() {
        assert_eq!(serde_json::to_value(RandomSeed::Time).unwrap(), json!("time"));
        assert_eq!(serde_json::to_value(RandomSeed::Value(3)).unwrap(), json!(3));
    }

    #[test]
    fn consent_states() {
        for s in ["question", "enable", "enabled", "disable", "disable_1", "disable_2", "disable_3"] {
            let consent: SentryConsent = s.parse().unwrap();
            assert_eq!(consent.as_str(), s);
        }
        assert!(SentryConsent::Enabled.is_enabled());
        assert!(SentryConsent::Disable1.should_ask());
        assert!(!SentryConsent::Disable3.should_ask());
        assert!("maybe".parse::<SentryConsent>().is_err());
    }

    #[test]
    fn gmock_enums() {
        assert_eq!("failure".parse(), Ok(GmockWarningTreatment::Failure));
        assert_eq!("info".parse::<GmockVerbosity>().unwrap().flag(), Some("info"));
        assert_eq!(GmockVerbosity::Default.flag(), None);
    }
}
