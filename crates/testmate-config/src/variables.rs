//! Placeholder substitution
//!
//! Settings may contain `${name}` placeholders. A [`VariableRules`] set is
//! shared by every executable of a folder and applied when a consumer needs
//! the concrete string. `${os_env:NAME}` reads the process environment; an
//! unset variable becomes the empty string.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;

static OS_ENV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{os_env:([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid os_env pattern")
});

/// Ordered placeholder substitutions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableRules {
    rules: Vec<(String, String)>,
}

impl VariableRules {
    /// Create empty rule set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard rules for a workspace folder
    #[must_use]
    pub fn for_folder(name: &str, path: Option<&Path>) -> Self {
        let mut rules = Self::new()
            .with("workspaceName", name)
            .with("osPathSep", std::path::MAIN_SEPARATOR.to_string())
            .with("osPathEnvSep", if cfg!(windows) { ";" } else { ":" });
        if let Some(path) = path {
            let path = path.display().to_string();
            rules = rules
                .with("workspaceFolder", path.clone())
                .with("workspaceDirectory", path);
        }
        rules
    }

    /// Add a rule replacing `${name}` with `value`
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.rules.push((format!("${{{name}}}"), value.into()));
        self
    }

    /// Number of rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if there are no rules
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Substitute every known placeholder in `text`
    #[must_use]
    pub fn resolve(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (placeholder, value) in &self.rules {
            if out.contains(placeholder.as_str()) {
                out = out.replace(placeholder.as_str(), value);
            }
        }
        resolve_os_env(&out)
    }
}

fn resolve_os_env(text: &str) -> String {
    OS_ENV
        .replace_all(text, |caps: &Captures<'_>| std::env::var(&caps[1]).unwrap_or_default())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_known_placeholders() {
        let rules = VariableRules::new().with("a", "1").with("b", "2");
        assert_eq!(rules.resolve("${a}/${b}/${a}"), "1/2/1");
    }

    #[test]
    fn leaves_unknown_placeholders() {
        let rules = VariableRules::new().with("a", "1");
        assert_eq!(rules.resolve("${absDirpath}/${a}"), "${absDirpath}/1");
    }

    #[test]
    fn folder_rules() {
        let rules = VariableRules::for_folder("app", Some(Path::new("/ws/app")));
        assert_eq!(rules.resolve("${workspaceFolder}/out"), "/ws/app/out");
        assert_eq!(rules.resolve("${workspaceName}"), "app");
    }

    #[test]
    fn os_env_lookup() {
        let rules = VariableRules::new();
        let path = std::env::var("PATH").unwrap_or_default();
        assert_eq!(rules.resolve("${os_env:PATH}"), path);
        assert_eq!(rules.resolve("x${os_env:TESTMATE_SURELY_UNSET_VAR}y"), "xy");
    }
}
