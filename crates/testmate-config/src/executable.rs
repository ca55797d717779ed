//! Executable descriptors
//!
//! The `test.executables` setting is permissive JSON. It becomes a strict
//! [`ExecutableConfig`] in two stages:
//!
//! 1. [`normalize_executable`] validates an object field by field. A field
//!    of the wrong type is dropped with a [`Diagnostic`]; only a missing or
//!    empty `pattern` is fatal.
//! 2. [`ExecutableConfig::new`] accepts the validated [`ExecutableSpec`] and
//!    fills the remaining defaults.

use crate::error::{ConfigError, ConfigResult, Diagnostic};
use crate::values::SharedSettings;
use crate::variables::VariableRules;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use testmate_settings::Setting;

/// Pattern used when neither executable setting is configured
pub const DEFAULT_EXECUTABLE_PATTERN: &str =
    "{build,Build,BUILD,out,Out,OUT}/**/*{test,Test,TEST}*";

/// Working directory placeholder resolved by the test runner per executable
pub const CWD_PLACEHOLDER: &str = "${absDirpath}";

/// Supported test frameworks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Framework {
    /// Catch2
    Catch2,
    /// GoogleTest
    GoogleTest,
    /// doctest
    Doctest,
}

impl Framework {
    /// All frameworks
    pub const ALL: [Framework; 3] = [Framework::Catch2, Framework::GoogleTest, Framework::Doctest];

    /// Field name of the framework block inside an executable object
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Framework::Catch2 => "catch2",
            Framework::GoogleTest => "gtest",
            Framework::Doctest => "doctest",
        }
    }
}

/// Per-framework overrides of one executable
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkConfig {
    /// Regex recognizing the framework in `--help` output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_regex: Option<String>,
    /// Arguments placed before the runner's own when running tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepend_test_running_args: Option<Vec<String>>,
    /// Arguments placed before the runner's own when listing tests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepend_test_listing_args: Option<Vec<String>>,
    /// Ignore stderr output during test enumeration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_test_enumeration_std_err: Option<bool>,
    /// Test tree grouping specification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_grouping: Option<Value>,
}

/// Framework blocks of one executable
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameworkConfigs {
    /// Catch2 overrides
    pub catch2: FrameworkConfig,
    /// GoogleTest overrides
    pub gtest: FrameworkConfig,
    /// doctest overrides
    pub doctest: FrameworkConfig,
}

impl FrameworkConfigs {
    /// Block of `framework`
    #[must_use]
    pub fn get(&self, framework: Framework) -> &FrameworkConfig {
        match framework {
            Framework::Catch2 => &self.catch2,
            Framework::GoogleTest => &self.gtest,
            Framework::Doctest => &self.doctest,
        }
    }

    fn get_mut(&mut self, framework: Framework) -> &mut FrameworkConfig {
        match framework {
            Framework::Catch2 => &mut self.catch2,
            Framework::GoogleTest => &mut self.gtest,
            Framework::Doctest => &mut self.doctest,
        }
    }
}

/// Tasks run around test execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTask {
    /// Task labels run before
    pub before: Vec<String>,
    /// Task labels run after
    pub after: Vec<String>,
}

/// Validated executable object, before defaults are applied
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutableSpec {
    /// Discovery glob; never empty
    pub pattern: String,
    /// Display name
    pub name: Option<String>,
    /// Display description
    pub description: Option<String>,
    /// Working directory
    pub cwd: Option<String>,
    /// Extra environment
    pub env: BTreeMap<String, String>,
    /// Names of executables this one waits for
    pub depends_on: Vec<String>,
    /// Concurrent runs of this executable
    pub parallelization_limit: Option<usize>,
    /// Mark discovered tests as skipped
    pub mark_as_skipped: bool,
    /// Surrounding tasks
    pub run_task: RunTask,
    /// Framework overrides
    pub frameworks: FrameworkConfigs,
}

impl ExecutableSpec {
    /// Spec with nothing but a pattern
    #[must_use]
    pub fn from_pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            name: None,
            description: None,
            cwd: None,
            env: BTreeMap::new(),
            depends_on: Vec::new(),
            parallelization_limit: None,
            mark_as_skipped: false,
            run_task: RunTask::default(),
            frameworks: FrameworkConfigs::default(),
        }
    }
}

/// Output of [`normalize_executable`]
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// Validated spec
    pub spec: ExecutableSpec,
    /// Dropped fields
    pub diagnostics: Vec<Diagnostic>,
}

/// Validate entry `index` of `test.executables`
///
/// # Errors
/// `ConfigError::PatternRequired` if `pattern` is missing, not a string or
/// empty.
pub fn normalize_executable(object: &Map<String, Value>, index: usize) -> ConfigResult<Normalized> {
    let pattern = match object.get("pattern") {
        Some(Value::String(p)) if !p.is_empty() => p.clone(),
        _ => return Err(ConfigError::pattern_required(Setting::TestExecutables, index)),
    };

    let mut diagnostics = Vec::new();
    let mut fields = Fields::new(object, format!("[{index}]"), &mut diagnostics);

    let mut spec = ExecutableSpec::from_pattern(pattern);
    spec.name = fields.string("name");
    spec.description = fields.string("description");
    spec.cwd = fields.string("cwd");
    spec.env = fields.string_map("env").unwrap_or_default();
    spec.depends_on = fields.filtered_strings("dependsOn").unwrap_or_default();
    spec.parallelization_limit = fields.limit("parallelizationLimit");
    spec.mark_as_skipped = fields.boolean("markAsSkipped").unwrap_or(false);

    if let Some(run_task) = fields.object("runTask") {
        let mut task_fields = fields.nested(run_task, "runTask");
        spec.run_task = RunTask {
            before: task_fields.strings("before").unwrap_or_default(),
            after: task_fields.strings("after").unwrap_or_default(),
        };
    }

    let default_grouping = fields.object("testGrouping").cloned().map(Value::Object);
    for framework in Framework::ALL {
        let block = spec.frameworks.get_mut(framework);
        if let Some(overrides) = fields.object(framework.key()) {
            let mut fw_fields = fields.nested(overrides, framework.key());
            *block = fw_fields.framework();
        }
        if block.test_grouping.is_none() {
            block.test_grouping.clone_from(&default_grouping);
        }
    }

    Ok(Normalized { spec, diagnostics })
}

/// Type-checked field access with drop-on-mismatch
struct Fields<'a> {
    object: &'a Map<String, Value>,
    location: String,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> Fields<'a> {
    fn new(
        object: &'a Map<String, Value>,
        location: String,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            object,
            location,
            diagnostics,
        }
    }

    fn nested<'b>(&'b mut self, object: &'b Map<String, Value>, field: &str) -> Fields<'b> {
        Fields {
            object,
            location: format!("{}.{field}", self.location),
            diagnostics: self.diagnostics,
        }
    }

    /// Present and not null
    fn present(&self, field: &str) -> Option<&'a Value> {
        self.object.get(field).filter(|v| !v.is_null())
    }

    fn mismatch(&mut self, field: &str, expected: &str) {
        self.drop_value(format!(".{field}"), format!("expected {expected}"));
    }

    fn drop_value(&mut self, suffix: String, reason: String) {
        let diagnostic = Diagnostic::new(
            Setting::TestExecutables,
            format!("{}{suffix}", self.location),
            reason,
        );
        diagnostic.log();
        self.diagnostics.push(diagnostic);
    }

    fn string(&mut self, field: &str) -> Option<String> {
        match self.present(field)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.mismatch(field, "a string");
                None
            }
        }
    }

    fn boolean(&mut self, field: &str) -> Option<bool> {
        match self.present(field)? {
            Value::Bool(b) => Some(*b),
            _ => {
                self.mismatch(field, "a boolean");
                None
            }
        }
    }

    fn object(&mut self, field: &str) -> Option<&'a Map<String, Value>> {
        match self.present(field)? {
            Value::Object(map) => Some(map),
            _ => {
                self.mismatch(field, "an object");
                None
            }
        }
    }

    /// Whole field dropped unless every element is a string
    fn strings(&mut self, field: &str) -> Option<Vec<String>> {
        let Some(Value::Array(items)) = self.present(field) else {
            if self.present(field).is_some() {
                self.mismatch(field, "a list of strings");
            }
            return None;
        };
        let strings: Option<Vec<String>> = items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect();
        if strings.is_none() {
            self.mismatch(field, "a list of strings");
        }
        strings
    }

    /// Non-string elements dropped one by one
    fn filtered_strings(&mut self, field: &str) -> Option<Vec<String>> {
        let Some(Value::Array(items)) = self.present(field) else {
            if self.present(field).is_some() {
                self.mismatch(field, "a list");
            }
            return None;
        };
        let mut strings = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::String(s) => strings.push(s.clone()),
                _ => self.drop_value(format!(".{field}[{i}]"), "expected a string".to_string()),
            }
        }
        Some(strings)
    }

    /// String values only; other entries dropped one by one
    fn string_map(&mut self, field: &str) -> Option<BTreeMap<String, String>> {
        let map = self.object(field)?;
        let mut out = BTreeMap::new();
        for (key, value) in map {
            match value {
                Value::String(s) => {
                    out.insert(key.clone(), s.clone());
                }
                _ => self.drop_value(format!(".{field}.{key}"), "expected a string".to_string()),
            }
        }
        Some(out)
    }

    /// Number clamped to at least 1
    fn limit(&mut self, field: &str) -> Option<usize> {
        let value = self.present(field)?;
        match value.as_f64() {
            Some(n) if n.is_finite() => Some(clamp_limit(n)),
            _ => {
                self.mismatch(field, "a number");
                None
            }
        }
    }

    fn framework(&mut self) -> FrameworkConfig {
        let help_regex = self.string("helpRegex").filter(|pattern| {
            let valid = Regex::new(pattern).is_ok();
            if !valid {
                self.mismatch("helpRegex", "a valid regular expression");
            }
            valid
        });
        FrameworkConfig {
            help_regex,
            prepend_test_running_args: self.strings("prependTestRunningArgs"),
            prepend_test_listing_args: self.strings("prependTestListingArgs"),
            ignore_test_enumeration_std_err: self.boolean("ignoreTestEnumerationStdErr"),
            test_grouping: self.object("testGrouping").cloned().map(Value::Object),
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub(crate) fn clamp_limit(n: f64) -> usize {
    if n < 1.0 {
        1
    } else {
        n.floor().min(usize::MAX as f64) as usize
    }
}

/// Defaults applied to every executable of a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableDefaults {
    /// Working directory when the executable sets none
    pub cwd: String,
    /// Parallelization limit when the executable sets none
    pub parallelization_limit: usize,
}

impl Default for ExecutableDefaults {
    fn default() -> Self {
        Self {
            cwd: CWD_PLACEHOLDER.to_string(),
            parallelization_limit: 1,
        }
    }
}

/// Normalized executable descriptor consumed by discovery
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableConfig {
    pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    cwd: String,
    env: BTreeMap<String, String>,
    depends_on: Vec<String>,
    parallelization_limit: usize,
    mark_as_skipped: bool,
    run_task: RunTask,
    frameworks: FrameworkConfigs,
    #[serde(skip)]
    shared: Arc<SharedSettings>,
    #[serde(skip)]
    variables: Arc<VariableRules>,
}

impl ExecutableConfig {
    /// Build from a validated spec
    #[must_use]
    pub fn new(
        spec: ExecutableSpec,
        defaults: &ExecutableDefaults,
        shared: Arc<SharedSettings>,
        variables: Arc<VariableRules>,
    ) -> Self {
        debug_assert!(!spec.pattern.is_empty());
        Self {
            pattern: spec.pattern,
            name: spec.name,
            description: spec.description,
            cwd: spec.cwd.unwrap_or_else(|| defaults.cwd.clone()),
            env: spec.env,
            depends_on: spec.depends_on,
            parallelization_limit: spec
                .parallelization_limit
                .unwrap_or(defaults.parallelization_limit)
                .max(1),
            mark_as_skipped: spec.mark_as_skipped,
            run_task: spec.run_task,
            frameworks: spec.frameworks,
            shared,
            variables,
        }
    }

    /// Discovery glob as configured
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Discovery glob with placeholders substituted
    #[must_use]
    pub fn resolved_pattern(&self) -> String {
        self.variables.resolve(&self.pattern)
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display description
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Working directory, possibly containing placeholders
    #[inline]
    #[must_use]
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Working directory with known placeholders substituted
    ///
    /// `${absDirpath}` survives; it depends on the matched file.
    #[must_use]
    pub fn resolved_cwd(&self) -> String {
        self.variables.resolve(&self.cwd)
    }

    /// Extra environment
    #[inline]
    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Names this executable depends on
    #[inline]
    #[must_use]
    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    /// Concurrent runs allowed; at least 1
    #[inline]
    #[must_use]
    pub fn parallelization_limit(&self) -> usize {
        self.parallelization_limit
    }

    /// Discovered tests are reported as skipped
    #[inline]
    #[must_use]
    pub fn mark_as_skipped(&self) -> bool {
        self.mark_as_skipped
    }

    /// Surrounding tasks
    #[inline]
    #[must_use]
    pub fn run_task(&self) -> &RunTask {
        &self.run_task
    }

    /// Overrides for `framework`
    #[inline]
    #[must_use]
    pub fn framework(&self, framework: Framework) -> &FrameworkConfig {
        self.frameworks.get(framework)
    }

    /// Folder-wide run-time settings
    #[inline]
    #[must_use]
    pub fn shared(&self) -> &SharedSettings {
        &self.shared
    }

    /// Placeholder rules
    #[inline]
    #[must_use]
    pub fn variables(&self) -> &VariableRules {
        &self.variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn normalize(value: Value) -> ConfigResult<Normalized> {
        match value {
            Value::Object(map) => normalize_executable(&map, 0),
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn missing_pattern_is_fatal() {
        let err = normalize(json!({ "name": "x" })).unwrap_err();
        assert!(matches!(err, ConfigError::PatternRequired { index: 0, .. }));
    }

    #[test]
    fn non_string_or_empty_pattern_is_fatal() {
        assert!(normalize(json!({ "pattern": 3 })).is_err());
        assert!(normalize(json!({ "pattern": "" })).is_err());
    }

    #[test]
    fn full_object() {
        let normalized = normalize(json!({
            "pattern": "out/*_test",
            "name": "unit",
            "description": "fast ones",
            "cwd": "${workspaceFolder}/out",
            "env": { "A": "1" },
            "dependsOn": ["lib"],
            "parallelizationLimit": 4,
            "markAsSkipped": true,
            "runTask": { "before": ["build"], "after": [] },
            "gtest": { "prependTestRunningArgs": ["--gtest_color=no"], "ignoreTestEnumerationStdErr": true }
        }))
        .unwrap();

        assert!(normalized.diagnostics.is_empty());
        let spec = normalized.spec;
        assert_eq!(spec.pattern, "out/*_test");
        assert_eq!(spec.name.as_deref(), Some("unit"));
        assert_eq!(spec.cwd.as_deref(), Some("${workspaceFolder}/out"));
        assert_eq!(spec.env.get("A").map(String::as_str), Some("1"));
        assert_eq!(spec.depends_on, vec!["lib".to_string()]);
        assert_eq!(spec.parallelization_limit, Some(4));
        assert!(spec.mark_as_skipped);
        assert_eq!(spec.run_task.before, vec!["build".to_string()]);
        assert_eq!(
            spec.frameworks.gtest.prepend_test_running_args,
            Some(vec!["--gtest_color=no".to_string()])
        );
        assert_eq!(spec.frameworks.gtest.ignore_test_enumeration_std_err, Some(true));
        assert_eq!(spec.frameworks.catch2, FrameworkConfig::default());
    }

    #[test]
    fn wrong_types_are_dropped() {
        let normalized = normalize(json!({
            "pattern": "p",
            "name": 5,
            "env": "A=1",
            "dependsOn": ["a", 2, "b"],
            "parallelizationLimit": "many",
            "catch2": { "helpRegex": "(unclosed", "prependTestListingArgs": ["x", 1] }
        }))
        .unwrap();

        let spec = &normalized.spec;
        assert_eq!(spec.name, None);
        assert!(spec.env.is_empty());
        assert_eq!(spec.depends_on, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(spec.parallelization_limit, None);
        assert_eq!(spec.frameworks.catch2.help_regex, None);
        assert_eq!(spec.frameworks.catch2.prepend_test_listing_args, None);

        let locations: Vec<_> = normalized
            .diagnostics
            .iter()
            .map(|d| d.location.as_str())
            .collect();
        assert_eq!(
            locations,
            vec![
                "[0].name",
                "[0].env",
                "[0].dependsOn[1]",
                "[0].parallelizationLimit",
                "[0].catch2.helpRegex",
                "[0].catch2.prependTestListingArgs",
            ]
        );
    }

    #[test]
    fn env_drops_non_string_entries() {
        let normalized = normalize(json!({ "pattern": "p", "env": { "A": "1", "B": 2 } })).unwrap();
        assert_eq!(normalized.spec.env.len(), 1);
        assert_eq!(normalized.diagnostics[0].location, "[0].env.B");
    }

    #[test]
    fn top_level_grouping_is_fallback() {
        let normalized = normalize(json!({
            "pattern": "p",
            "testGrouping": { "groupByExecutable": {} },
            "doctest": { "testGrouping": { "groupBySource": {} } }
        }))
        .unwrap();

        let frameworks = normalized.spec.frameworks;
        assert_eq!(frameworks.catch2.test_grouping, Some(json!({ "groupByExecutable": {} })));
        assert_eq!(frameworks.gtest.test_grouping, Some(json!({ "groupByExecutable": {} })));
        assert_eq!(frameworks.doctest.test_grouping, Some(json!({ "groupBySource": {} })));
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(0.0), 1);
        assert_eq!(clamp_limit(-3.0), 1);
        assert_eq!(clamp_limit(2.7), 2);
        let normalized = normalize(json!({ "pattern": "p", "parallelizationLimit": 0 })).unwrap();
        assert_eq!(normalized.spec.parallelization_limit, Some(1));
    }

    #[test]
    fn config_applies_defaults() {
        let defaults = ExecutableDefaults {
            cwd: "/ws".to_string(),
            parallelization_limit: 3,
        };
        let config = ExecutableConfig::new(
            ExecutableSpec::from_pattern("p"),
            &defaults,
            Arc::new(SharedSettings::default()),
            Arc::new(VariableRules::new()),
        );
        assert_eq!(config.cwd(), "/ws");
        assert_eq!(config.parallelization_limit(), 3);
        assert!(config.env().is_empty());
        assert_eq!(config.framework(Framework::Doctest), &FrameworkConfig::default());
    }

    #[test]
    fn resolved_values_use_rules() {
        let spec = ExecutableSpec {
            cwd: Some("${workspaceFolder}/build".to_string()),
            ..ExecutableSpec::from_pattern("${workspaceFolder}/build/*test*")
        };
        let config = ExecutableConfig::new(
            spec,
            &ExecutableDefaults::default(),
            Arc::new(SharedSettings::default()),
            Arc::new(VariableRules::new().with("workspaceFolder", "/ws")),
        );
        assert_eq!(config.resolved_pattern(), "/ws/build/*test*");
        assert_eq!(config.resolved_cwd(), "/ws/build");
    }
}
