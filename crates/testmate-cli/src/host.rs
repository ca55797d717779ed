//! Debug host backed by command line input

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use testmate_config::{DebugHost, Platform};

/// Extensions named with `--extension`, launch entries read from `--launch`
#[derive(Debug, Default)]
pub(crate) struct FileHost {
    extensions: Vec<String>,
    launch: Vec<Value>,
}

impl FileHost {
    pub(crate) fn new(extensions: Vec<String>) -> Self {
        Self {
            extensions,
            launch: Vec::new(),
        }
    }

    /// Read a launch file: either `{"configurations": [...]}` or a bare list
    pub(crate) async fn with_launch_file(mut self, path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let parsed: Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        self.launch = launch_entries(parsed);
        Ok(self)
    }
}

fn launch_entries(parsed: Value) -> Vec<Value> {
    match parsed {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("configurations") {
            Some(Value::Array(entries)) => entries,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

impl DebugHost for FileHost {
    fn launch_configurations(&self) -> Vec<Value> {
        self.launch.clone()
    }

    fn is_extension_installed(&self, id: &str) -> bool {
        self.extensions.iter().any(|e| e == id)
    }

    fn platform(&self) -> Platform {
        Platform::current()
    }
}
