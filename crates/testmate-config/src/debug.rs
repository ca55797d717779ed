//! Debug launch templates
//!
//! A template is a debug configuration with placeholders (`${exec}`,
//! `${args}`, `${cwd}`, ...) filled in by the session that starts the
//! debugger. [`DebugTemplateResolver`] walks an ordered rule list and takes
//! the first template it can build:
//!
//! 1. the user's `debug.configTemplate` object over a minimal base
//! 2. a matching entry of the editor's launch configurations, if the
//!    setting is unset
//! 3. a built-in template for the first installed debug extension

use crate::error::{ConfigError, ConfigResult};
use crate::resolver::ConfigurationResolver;
use serde::Serialize;
use serde_json::{json, Map, Value};
use testmate_settings::Setting;

/// CodeLLDB
pub const LLDB_EXTENSION: &str = "vadimcn.vscode-lldb";

/// Native Debug
pub const WEBFREAK_EXTENSION: &str = "webfreak.debug";

/// C/C++ tools
pub const CPPTOOLS_EXTENSION: &str = "ms-vscode.cpptools";

/// Launch configuration types usable as a template
pub const LAUNCH_TYPE_PREFIXES: [&str; 3] = ["cpp", "lldb", "gdb"];

/// Setting value that skips launch configurations
pub const EXTENSION_ONLY: &str = "extensionOnly";

const TEMPLATE_NAME: &str = "${label} (${suiteLabel})";

const MACOS_LLDB_MI_PATH: &str = "/Library/Developer/CommandLineTools/Library/PrivateFrameworks/LLDB.framework/Versions/A/Resources/lldb-mi";

/// Debug configuration with unresolved placeholders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DebugConfigTemplate(Map<String, Value>);

impl DebugConfigTemplate {
    /// Minimal launch template
    #[must_use]
    pub fn base() -> Self {
        let mut map = Map::new();
        map.insert("name".into(), Value::from(TEMPLATE_NAME));
        map.insert("request".into(), Value::from("launch"));
        map.insert("type".into(), Value::from("cppdbg"));
        Self(map)
    }

    /// Field `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// `name`
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    /// `request`
    #[must_use]
    pub fn request(&self) -> Option<&str> {
        self.get("request").and_then(Value::as_str)
    }

    /// `type`
    #[must_use]
    pub fn debugger_type(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }

    /// All fields
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Take the fields
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn merged(mut self, fields: Map<String, Value>) -> Self {
        self.0.extend(fields);
        self
    }
}

/// Where a template came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "extension")]
pub enum TemplateSource {
    /// `debug.configTemplate`
    UserDefined,
    /// The editor's launch configurations
    LaunchJson,
    /// Built-in template of an installed extension
    Extension(&'static str),
}

/// Output of [`DebugTemplateResolver::resolve_template`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTemplate {
    /// The template
    pub template: DebugConfigTemplate,
    /// Its origin
    pub source: TemplateSource,
}

/// Host operating system, as far as templates care
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux and other unix
    Linux,
    /// macOS
    MacOs,
    /// Windows
    Windows,
}

impl Platform {
    /// Platform this process runs on
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(windows) {
            Self::Windows
        } else {
            Self::Linux
        }
    }
}

/// Editor facilities consulted for templates
pub trait DebugHost: Send + Sync {
    /// Entries of the launch configuration list, in order
    fn launch_configurations(&self) -> Vec<Value>;

    /// True if extension `id` is installed
    fn is_extension_installed(&self, id: &str) -> bool;

    /// Host platform
    fn platform(&self) -> Platform {
        Platform::current()
    }
}

/// Interpreted `debug.configTemplate`
#[derive(Debug, Clone, PartialEq)]
enum TemplateSetting {
    Template(Map<String, Value>),
    Unset,
    ExtensionOnly,
}

impl TemplateSetting {
    fn from_value(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Unset,
            Some(Value::Object(map)) => Self::Template(map),
            Some(Value::String(s)) if s == EXTENSION_ONLY => Self::ExtensionOnly,
            Some(other) => {
                tracing::warn!(
                    setting = %Setting::DebugConfigTemplate,
                    "unrecognized value {other}; treated as '{EXTENSION_ONLY}'"
                );
                Self::ExtensionOnly
            }
        }
    }
}

struct Context<'a> {
    setting: TemplateSetting,
    host: &'a dyn DebugHost,
}

struct Rule {
    applies: fn(&Context<'_>) -> bool,
    build: fn(&Context<'_>) -> Option<ResolvedTemplate>,
}

fn rules() -> [Rule; 5] {
    [
        Rule {
            applies: |ctx| matches!(ctx.setting, TemplateSetting::Template(_)),
            build: user_template,
        },
        Rule {
            applies: |ctx| ctx.setting == TemplateSetting::Unset,
            build: launch_json_template,
        },
        Rule {
            applies: |ctx| ctx.host.is_extension_installed(LLDB_EXTENSION),
            build: |_| Some(extension(LLDB_EXTENSION, lldb_template())),
        },
        Rule {
            applies: |ctx| ctx.host.is_extension_installed(WEBFREAK_EXTENSION),
            build: |ctx| {
                let fields = webfreak_template(ctx.host.platform());
                Some(extension(WEBFREAK_EXTENSION, fields))
            },
        },
        Rule {
            applies: |ctx| ctx.host.is_extension_installed(CPPTOOLS_EXTENSION),
            build: |_| Some(extension(CPPTOOLS_EXTENSION, cpptools_template())),
        },
    ]
}

/// Picks the debug template for a session
pub struct DebugTemplateResolver<'a> {
    resolver: &'a ConfigurationResolver,
    host: &'a dyn DebugHost,
}

impl<'a> DebugTemplateResolver<'a> {
    /// Create new template resolver
    #[must_use]
    pub fn new(resolver: &'a ConfigurationResolver, host: &'a dyn DebugHost) -> Self {
        Self { resolver, host }
    }

    /// First template the rule list can produce
    ///
    /// # Errors
    /// `ConfigError::NoDebugTemplate` if no rule applies.
    pub fn resolve_template(&self) -> ConfigResult<ResolvedTemplate> {
        let ctx = Context {
            setting: TemplateSetting::from_value(
                self.resolver.resolve(Setting::DebugConfigTemplate),
            ),
            host: self.host,
        };
        let resolved = rules()
            .iter()
            .filter(|rule| (rule.applies)(&ctx))
            .find_map(|rule| (rule.build)(&ctx))
            .ok_or_else(ConfigError::no_debug_template)?;
        tracing::info!(source = ?resolved.source, "debug template resolved");
        Ok(resolved)
    }
}

impl std::fmt::Debug for DebugTemplateResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugTemplateResolver")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

fn user_template(ctx: &Context<'_>) -> Option<ResolvedTemplate> {
    let TemplateSetting::Template(fields) = &ctx.setting else {
        return None;
    };
    Some(ResolvedTemplate {
        template: DebugConfigTemplate::base().merged(fields.clone()),
        source: TemplateSource::UserDefined,
    })
}

fn launch_json_template(ctx: &Context<'_>) -> Option<ResolvedTemplate> {
    let entry = ctx.host.launch_configurations().into_iter().find_map(|config| match config {
        Value::Object(map) if is_usable_launch(&map) => Some(map),
        _ => None,
    })?;

    let overrides = object(json!({
        "name": TEMPLATE_NAME,
        "program": "${exec}",
        "target": "${exec}",
        "arguments": "${argsStr}",
        "args": "${args}",
        "cwd": "${cwd}",
        "env": "${envObj}",
    }));
    Some(ResolvedTemplate {
        template: DebugConfigTemplate(entry).merged(overrides),
        source: TemplateSource::LaunchJson,
    })
}

fn is_usable_launch(config: &Map<String, Value>) -> bool {
    let is_launch = config.get("request").and_then(Value::as_str) == Some("launch");
    let debugger = config.get("type").and_then(Value::as_str).unwrap_or_default();
    is_launch && LAUNCH_TYPE_PREFIXES.iter().any(|p| debugger.starts_with(p))
}

fn extension(id: &'static str, fields: Map<String, Value>) -> ResolvedTemplate {
    ResolvedTemplate {
        template: DebugConfigTemplate::base().merged(fields),
        source: TemplateSource::Extension(id),
    }
}

fn lldb_template() -> Map<String, Value> {
    object(json!({
        "type": "lldb",
        "program": "${exec}",
        "args": "${args}",
        "cwd": "${cwd}",
        "env": "${envObj}",
        "sourceMap": "${sourceFileMap}",
    }))
}

fn webfreak_template(platform: Platform) -> Map<String, Value> {
    let mut fields = object(json!({
        "type": "gdb",
        "target": "${exec}",
        "arguments": "${argsStr}",
        "cwd": "${cwd}",
        "env": "${envObj}",
        "valuesFormatting": "prettyPrinters",
        "pathSubstitutions": "${sourceFileMap}",
    }));
    if platform == Platform::MacOs {
        fields.insert("type".into(), Value::from("lldb-mi"));
        fields.insert("lldbmipath".into(), Value::from(MACOS_LLDB_MI_PATH));
    }
    fields
}

fn cpptools_template() -> Map<String, Value> {
    object(json!({
        "type": "cppvsdbg",
        "linux": { "type": "cppdbg", "MIMode": "gdb" },
        "osx": { "type": "cppdbg", "MIMode": "lldb" },
        "windows": { "type": "cppvsdbg" },
        "program": "${exec}",
        "args": "${args}",
        "cwd": "${cwd}",
        "env": "${envObj}",
        "environment": "${envObjArray}",
        "sourceFileMap": "${sourceFileMap}",
    }))
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
