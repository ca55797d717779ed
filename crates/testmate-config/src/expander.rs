//! Expansion of the executable settings into [`ExecutableConfig`]s

use crate::error::{ConfigError, ConfigResult};
use crate::executable::{
    normalize_executable, ExecutableConfig, ExecutableSpec, DEFAULT_EXECUTABLE_PATTERN,
};
use crate::migration::migrate_legacy_executables;
use crate::resolver::ConfigurationResolver;
use crate::values::SharedSettings;
use crate::variables::VariableRules;
use serde_json::Value;
use std::sync::Arc;
use testmate_settings::{Setting, LEGACY_EXECUTABLES_KEY};

/// Builds the executable list of one folder
#[derive(Debug, Clone, Copy)]
pub struct ExecutableSpecExpander<'a> {
    resolver: &'a ConfigurationResolver,
}

impl<'a> ExecutableSpecExpander<'a> {
    /// Create expander reading through `resolver`
    #[must_use]
    pub fn new(resolver: &'a ConfigurationResolver) -> Self {
        Self { resolver }
    }

    /// Migrate the legacy `executables` key, then expand
    ///
    /// `test.executables` wins when it holds a non-empty list. Otherwise
    /// `test.executable` decides: unset gives the default pattern, an empty
    /// string disables discovery.
    ///
    /// # Errors
    /// `ConfigError::Shape` if either key has an unusable type;
    /// `ConfigError::PatternRequired` if a list entry lacks a pattern.
    pub async fn expand(
        &self,
        shared: Arc<SharedSettings>,
        rules: Arc<VariableRules>,
    ) -> ConfigResult<Vec<ExecutableConfig>> {
        self.migrate().await;

        let defaults = self.resolver.executable_defaults();
        let build = |spec: ExecutableSpec| {
            ExecutableConfig::new(spec, &defaults, shared.clone(), rules.clone())
        };

        let section = self.resolver.section();
        match section.get(Setting::TestExecutables.key()) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) if !items.is_empty() => {
                let specs = Self::from_list(&items)?;
                tracing::debug!(count = specs.len(), "expanded test.executables");
                return Ok(specs.into_iter().map(&build).collect());
            }
            Some(Value::Array(_)) => {}
            Some(other) => {
                return Err(ConfigError::shape(
                    Setting::TestExecutables,
                    format!("expected a list, got {other}"),
                ));
            }
        }

        match section.get(Setting::TestExecutable.key()) {
            None => Ok(vec![build(ExecutableSpec::from_pattern(
                DEFAULT_EXECUTABLE_PATTERN,
            ))]),
            Some(Value::String(pattern)) if pattern.is_empty() => {
                tracing::info!("test discovery disabled by empty test.executable");
                Ok(Vec::new())
            }
            Some(Value::String(pattern)) => Ok(vec![build(ExecutableSpec::from_pattern(pattern))]),
            Some(other) => Err(ConfigError::shape(
                Setting::TestExecutable,
                format!("expected a string, got {other}"),
            )),
        }
    }

    async fn migrate(&self) {
        let legacy = self.resolver.legacy_section().slot(LEGACY_EXECUTABLES_KEY);
        let pattern = self.resolver.section().slot(Setting::TestExecutable.key());
        let list = self.resolver.section().slot(Setting::TestExecutables.key());
        for diagnostic in migrate_legacy_executables(&legacy, &pattern, &list).await {
            diagnostic.log();
        }
    }

    fn from_list(items: &[Value]) -> ConfigResult<Vec<ExecutableSpec>> {
        let mut specs = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item {
                Value::String(pattern) if pattern.is_empty() => {
                    tracing::debug!(index, "skipping empty executable pattern");
                }
                Value::String(pattern) => specs.push(ExecutableSpec::from_pattern(pattern.clone())),
                Value::Object(object) => specs.push(normalize_executable(object, index)?.spec),
                other => tracing::warn!(
                    setting = %Setting::TestExecutables,
                    index,
                    "entry must be a string or an object, got {other}; entry ignored"
                ),
            }
        }
        Ok(specs)
    }
}
