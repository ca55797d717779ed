//! Debug template selection

use pretty_assertions::assert_eq;
use serde_json::json;
use testmate_config::debug::{CPPTOOLS_EXTENSION, LLDB_EXTENSION, WEBFREAK_EXTENSION};
use testmate_config::{ConfigError, Platform, TemplateSource};
use testmate_settings::{Scope, Setting, SettingStore};
use testmate_test_utils::{legacy_key, new_key, seeded_resolver, RecordingHost};

fn template_setting(value: serde_json::Value) -> (String, Scope, serde_json::Value) {
    (new_key(Setting::DebugConfigTemplate), Scope::Global, value)
}

#[test]
fn user_template_is_merged_over_base() {
    let (_, resolver) = seeded_resolver(&[template_setting(json!({
        "type": "cppvsdbg",
        "program": "${exec}",
        "stopAtEntry": true
    }))]);
    let host = RecordingHost::new().with_extension(LLDB_EXTENSION);

    let resolved = resolver.debug_templates(&host).resolve_template().unwrap();

    assert_eq!(resolved.source, TemplateSource::UserDefined);
    let template = resolved.template;
    assert_eq!(template.name(), Some("${label} (${suiteLabel})"));
    assert_eq!(template.request(), Some("launch"));
    assert_eq!(template.debugger_type(), Some("cppvsdbg"));
    assert_eq!(template.get("stopAtEntry"), Some(&json!(true)));
    assert!(host.probes().is_empty());
}

#[tokio::test]
async fn legacy_template_is_migrated() {
    let (store, resolver) = seeded_resolver(&[(
        legacy_key("debugConfigTemplate"),
        Scope::Workspace,
        json!({ "type": "lldb" }),
    )]);
    let host = RecordingHost::new();

    let resolved = resolver.debug_templates(&host).resolve_template().unwrap();
    resolver.settle().await;

    assert_eq!(resolved.template.debugger_type(), Some("lldb"));
    assert_eq!(
        store.get(&new_key(Setting::DebugConfigTemplate)),
        Some(json!({ "type": "lldb" }))
    );
}

#[test]
fn launch_configuration_is_used_when_unset() {
    let (_, resolver) = seeded_resolver(&[]);
    let host = RecordingHost::new()
        .with_launch(json!({ "name": "attach", "request": "attach", "type": "cppdbg" }))
        .with_launch(json!({ "name": "py", "request": "launch", "type": "python" }))
        .with_launch(json!({
            "name": "mine",
            "request": "launch",
            "type": "cppdbg",
            "MIMode": "gdb",
            "program": "a.out"
        }))
        .with_extension(LLDB_EXTENSION);

    let resolved = resolver.debug_templates(&host).resolve_template().unwrap();

    assert_eq!(resolved.source, TemplateSource::LaunchJson);
    let t = resolved.template;
    assert_eq!(t.name(), Some("${label} (${suiteLabel})"));
    assert_eq!(t.get("MIMode"), Some(&json!("gdb")));
    assert_eq!(t.get("program"), Some(&json!("${exec}")));
    assert_eq!(t.get("target"), Some(&json!("${exec}")));
    assert_eq!(t.get("arguments"), Some(&json!("${argsStr}")));
    assert_eq!(t.get("args"), Some(&json!("${args}")));
    assert_eq!(t.get("cwd"), Some(&json!("${cwd}")));
    assert_eq!(t.get("env"), Some(&json!("${envObj}")));
}

#[test]
fn extension_only_skips_launch_configurations() {
    let (_, resolver) = seeded_resolver(&[template_setting(json!("extensionOnly"))]);
    let host = RecordingHost::new()
        .with_launch(json!({ "request": "launch", "type": "cppdbg" }))
        .with_extension(CPPTOOLS_EXTENSION);

    let resolved = resolver.debug_templates(&host).resolve_template().unwrap();

    assert_eq!(resolved.source, TemplateSource::Extension(CPPTOOLS_EXTENSION));
    assert_eq!(resolved.template.get("environment"), Some(&json!("${envObjArray}")));
    assert_eq!(
        resolved.template.get("linux"),
        Some(&json!({ "type": "cppdbg", "MIMode": "gdb" }))
    );
}

#[test]
fn extensions_are_probed_in_priority_order() {
    let (_, resolver) = seeded_resolver(&[]);
    let host = RecordingHost::new()
        .with_extension(CPPTOOLS_EXTENSION)
        .with_extension(WEBFREAK_EXTENSION)
        .on(Platform::Linux);

    let resolved = resolver.debug_templates(&host).resolve_template().unwrap();

    assert_eq!(resolved.source, TemplateSource::Extension(WEBFREAK_EXTENSION));
    assert_eq!(resolved.template.debugger_type(), Some("gdb"));
    assert_eq!(resolved.template.get("valuesFormatting"), Some(&json!("prettyPrinters")));
    assert_eq!(host.probes(), vec![LLDB_EXTENSION, WEBFREAK_EXTENSION]);
}

#[test]
fn lldb_extension_template() {
    let (_, resolver) = seeded_resolver(&[]);
    let host = RecordingHost::new().with_extension(LLDB_EXTENSION);

    let resolved = resolver.debug_templates(&host).resolve_template().unwrap();

    assert_eq!(resolved.template.debugger_type(), Some("lldb"));
    assert_eq!(resolved.template.get("sourceMap"), Some(&json!("${sourceFileMap}")));
}

#[test]
fn webfreak_on_macos() {
    let (_, resolver) = seeded_resolver(&[]);
    let host = RecordingHost::new()
        .with_extension(WEBFREAK_EXTENSION)
        .on(Platform::MacOs);

    let resolved = resolver.debug_templates(&host).resolve_template().unwrap();

    assert_eq!(resolved.template.debugger_type(), Some("lldb-mi"));
    assert!(resolved.template.get("lldbmipath").is_some());
}

#[test]
fn no_extension_is_an_error() {
    let (_, resolver) = seeded_resolver(&[]);
    let host = RecordingHost::new().with_launch(json!({ "request": "launch", "type": "node" }));

    let err = resolver.debug_templates(&host).resolve_template().unwrap_err();

    assert_eq!(err, ConfigError::no_debug_template());
    assert!(err.to_string().contains("testMate.cpp.debug.configTemplate"));
}
