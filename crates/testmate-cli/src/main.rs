//! `testmate`: resolve, expand and migrate TestMate settings from a JSON
//! snapshot of the editor's scoped settings.

mod host;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use host::FileHost;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use testmate_config::{ConfigurationResolver, WorkspaceFolder};
use testmate_settings::{MemoryStore, Setting, Snapshot, LEGACY_SECTION_ROOT};

fn cli() -> Command {
    Command::new("testmate")
        .version(testmate_config::VERSION)
        .about("Resolve and migrate TestMate C++ settings")
        .subcommand_required(true)
        .arg(
            Arg::new("settings")
                .long("settings")
                .global(true)
                .default_value("settings.json")
                .value_parser(value_parser!(PathBuf))
                .help("Settings snapshot with global/workspace/workspaceFolder maps"),
        )
        .arg(
            Arg::new("folder")
                .long("folder")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Workspace folder path (default: current directory)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("get")
                .about("Print the effective value of a setting")
                .arg(
                    Arg::new("setting")
                        .required(true)
                        .value_parser(value_parser!(Setting))
                        .help("Setting name, e.g. test.executables"),
                ),
        )
        .subcommand(Command::new("executables").about("Print the expanded executable list"))
        .subcommand(
            Command::new("debug-template")
                .about("Print the debug launch template")
                .arg(
                    Arg::new("extension")
                        .long("extension")
                        .action(ArgAction::Append)
                        .help("Installed debug extension id (repeatable)"),
                )
                .arg(
                    Arg::new("launch")
                        .long("launch")
                        .value_parser(value_parser!(PathBuf))
                        .help("launch.json to take configurations from"),
                ),
        )
        .subcommand(
            Command::new("migrate").about("Migrate every legacy key and rewrite the snapshot"),
        )
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));
    run(&matches).await
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let settings = matches
        .get_one::<PathBuf>("settings")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("settings.json"));
    let folder = match matches.get_one::<PathBuf>("folder") {
        Some(folder) => folder.clone(),
        None => std::env::current_dir().context("resolving current directory")?,
    };

    let store = Arc::new(open_store(&settings).await?.with_folder(folder.clone()));
    let resolver = ConfigurationResolver::new(store.clone(), WorkspaceFolder::from_path(folder));

    match matches.subcommand() {
        Some(("get", args)) => {
            let setting = args
                .get_one::<Setting>("setting")
                .copied()
                .context("setting is required")?;
            let value = resolver.resolve(setting);
            resolver.settle().await;
            match value {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => println!("undefined"),
            }
        }
        Some(("executables", _)) => {
            let executables = resolver.executables().await?;
            resolver.settle().await;
            println!("{}", serde_json::to_string_pretty(&executables)?);
        }
        Some(("debug-template", args)) => {
            let extensions: Vec<String> = args
                .get_many::<String>("extension")
                .map(|ids| ids.cloned().collect())
                .unwrap_or_default();
            let mut host = FileHost::new(extensions);
            if let Some(launch) = args.get_one::<PathBuf>("launch") {
                host = host.with_launch_file(launch).await?;
            }
            let resolved = resolver.debug_templates(&host).resolve_template()?;
            resolver.settle().await;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        Some(("migrate", _)) => {
            let before = legacy_keys(&store.snapshot());
            for setting in Setting::ALL {
                let _ = resolver.resolve(setting);
            }
            resolver.executables().await?;
            resolver.settle().await;

            store
                .save(&settings)
                .await
                .with_context(|| format!("writing {}", settings.display()))?;
            let after = legacy_keys(&store.snapshot());
            tracing::info!(migrated = before - after, remaining = after, "migration finished");
            println!("migrated {} legacy entries, {after} remaining", before - after);
        }
        Some((other, _)) => anyhow::bail!("unknown command '{other}'"),
        None => anyhow::bail!("no command given"),
    }
    Ok(())
}

async fn open_store(path: &Path) -> Result<MemoryStore> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        MemoryStore::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))
    } else {
        tracing::warn!(path = %path.display(), "settings snapshot not found; starting empty");
        Ok(MemoryStore::new())
    }
}

fn legacy_keys(snapshot: &Snapshot) -> usize {
    let prefix = format!("{LEGACY_SECTION_ROOT}.");
    [&snapshot.global, &snapshot.workspace, &snapshot.workspace_folder]
        .into_iter()
        .flat_map(|scope| scope.keys())
        .filter(|key| key.starts_with(&prefix))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testmate_settings::Scope;

    #[test]
    fn parses_subcommands() {
        let matches = cli()
            .try_get_matches_from(["testmate", "--settings", "s.json", "get", "test.executables"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "get");
        assert_eq!(args.get_one::<Setting>("setting"), Some(&Setting::TestExecutables));
        assert_eq!(
            matches.get_one::<PathBuf>("settings"),
            Some(&PathBuf::from("s.json"))
        );
    }

    #[test]
    fn rejects_unknown_setting() {
        assert!(cli()
            .try_get_matches_from(["testmate", "get", "test.nope"])
            .is_err());
    }

    #[test]
    fn repeatable_extensions() {
        let matches = cli()
            .try_get_matches_from([
                "testmate",
                "debug-template",
                "--extension",
                "a",
                "--extension",
                "b",
            ])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let ids: Vec<_> = args.get_many::<String>("extension").unwrap().collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn counts_legacy_keys() {
        let store = MemoryStore::new()
            .with_value("catch2TestExplorer.logpanel", Scope::Global, json!(true))
            .with_value("catch2TestExplorer.executables", Scope::WorkspaceFolder, json!("x"))
            .with_value("testMate.cpp.log.logpanel", Scope::Global, json!(true));
        assert_eq!(legacy_keys(&store.snapshot()), 2);
    }

    #[tokio::test]
    async fn migrate_rewrites_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"global":{"catch2TestExplorer.workerMaxNumber":2},"workspace":{"catch2TestExplorer.executables":"out/*"},"workspaceFolder":{}}"#,
        )
        .unwrap();

        let matches = cli()
            .try_get_matches_from([
                "testmate",
                "--settings",
                path.to_str().unwrap(),
                "--folder",
                "/ws",
                "migrate",
            ])
            .unwrap();
        run(&matches).await.unwrap();

        let migrated = MemoryStore::load(&path).await.unwrap().snapshot();
        assert_eq!(legacy_keys(&migrated), 0);
        assert_eq!(
            migrated.global.get("testMate.cpp.test.parallelExecutionLimit"),
            Some(&json!(2))
        );
        assert_eq!(
            migrated.workspace.get("testMate.cpp.test.executable"),
            Some(&json!("out/*"))
        );
    }
}
