//! Change notification
//!
//! Stores broadcast raw [`ChangeEvent`]s naming full keys. Consumers are
//! interested in logical settings of one workspace folder, so
//! [`ChangeNotifier`] wraps each raw event in a [`ConfigurationChangeEvent`]
//! that answers "does this touch setting X?" for both the current and the
//! legacy key.

use crate::catalogue::{Setting, LEGACY_EXECUTABLES_KEY, LEGACY_SECTION_ROOT, SECTION_ROOT};
use crate::store::SettingStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Raw change reported by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    keys: Vec<String>,
    folder: Option<PathBuf>,
}

impl ChangeEvent {
    /// Event for `keys`; `folder` limits it to one workspace folder
    pub fn new<I, S>(keys: I, folder: Option<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            folder,
        }
    }

    /// Changed full keys
    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Folder the change is limited to
    #[inline]
    #[must_use]
    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    /// True if `section` or anything below or above it changed for `folder`
    #[must_use]
    pub fn affects_configuration(&self, section: &str, folder: Option<&Path>) -> bool {
        if let (Some(changed_in), Some(asked_for)) = (self.folder(), folder) {
            if changed_in != asked_for {
                return false;
            }
        }
        self.keys.iter().any(|key| overlaps(key, section))
    }
}

fn overlaps(key: &str, section: &str) -> bool {
    fn is_below(child: &str, parent: &str) -> bool {
        child
            .strip_prefix(parent)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    }
    is_below(key, section) || is_below(section, key)
}

/// A raw change seen from one workspace folder
#[derive(Debug, Clone)]
pub struct ConfigurationChangeEvent {
    event: ChangeEvent,
    folder: Option<PathBuf>,
}

impl ConfigurationChangeEvent {
    /// Wrap `event` for `folder`
    #[must_use]
    pub fn new(event: ChangeEvent, folder: Option<PathBuf>) -> Self {
        Self { event, folder }
    }

    /// True if the current or legacy key of `setting` changed
    ///
    /// Both executable settings are fed by the legacy `executables` key.
    #[must_use]
    pub fn affects(&self, setting: Setting) -> bool {
        let folder = self.folder.as_deref();
        if self.event.affects_configuration(&setting.full_key(), folder) {
            return true;
        }
        let legacy = match setting {
            Setting::TestExecutable | Setting::TestExecutables => Some(LEGACY_EXECUTABLES_KEY),
            _ => setting.legacy_key(),
        };
        legacy.is_some_and(|legacy| {
            self.event
                .affects_configuration(&format!("{LEGACY_SECTION_ROOT}.{legacy}"), folder)
        })
    }

    /// True if any of `settings` changed
    #[must_use]
    pub fn affects_any(&self, settings: &[Setting]) -> bool {
        settings.iter().any(|s| self.affects(*s))
    }

    /// True if a key outside the extension's roots changed (e.g. `files.watcherExclude`)
    ///
    /// Keys at or below either root are answered with `false`; query those
    /// through [`ConfigurationChangeEvent::affects`].
    #[must_use]
    pub fn affects_foreign(&self, key: &str) -> bool {
        if overlaps(key, SECTION_ROOT) || overlaps(key, LEGACY_SECTION_ROOT) {
            return false;
        }
        self.event.affects_configuration(key, self.folder.as_deref())
    }

    /// Underlying raw event
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &ChangeEvent {
        &self.event
    }
}

/// Adapts store change events for one workspace folder
pub struct ChangeNotifier {
    store: Arc<dyn SettingStore>,
    folder: Option<PathBuf>,
}

impl ChangeNotifier {
    /// Notifier over `store` for `folder`
    #[must_use]
    pub fn new(store: Arc<dyn SettingStore>, folder: Option<PathBuf>) -> Self {
        Self { store, folder }
    }

    /// Register `handler`; it runs on a spawned task until the returned
    /// [`Subscription`] is dropped
    ///
    /// # Panics
    /// Must be called from within a tokio runtime.
    pub fn on_did_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ConfigurationChangeEvent) + Send + 'static,
    {
        let mut rx = self.store.subscribe();
        let folder = self.folder.clone();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handler(&ConfigurationChangeEvent::new(event, folder.clone())),
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "configuration change events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription { task }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

/// Handler registration; dropping it unregisters the handler
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(keys: &[&str]) -> ChangeEvent {
        ChangeEvent::new(keys.iter().copied(), None)
    }

    #[test]
    fn prefix_match_respects_segments() {
        let e = event(&["testMate.cpp.test.executables"]);
        assert!(e.affects_configuration("testMate.cpp", None));
        assert!(e.affects_configuration("testMate.cpp.test", None));
        assert!(e.affects_configuration("testMate.cpp.test.executables", None));
        assert!(!e.affects_configuration("testMate.cpp.test.executable", None));
        assert!(!e.affects_configuration("testMate.cpp.debug", None));
    }

    #[test]
    fn parent_change_affects_child() {
        let e = event(&["testMate.cpp"]);
        assert!(e.affects_configuration("testMate.cpp.log.logfile", None));
    }

    #[test]
    fn folder_limited_event() {
        let e = ChangeEvent::new(["a.b"], Some(PathBuf::from("/one")));
        assert!(e.affects_configuration("a.b", Some(Path::new("/one"))));
        assert!(!e.affects_configuration("a.b", Some(Path::new("/two"))));
        assert!(e.affects_configuration("a.b", None));
    }

    #[test]
    fn affects_checks_legacy_key() {
        let e = ConfigurationChangeEvent::new(event(&["catch2TestExplorer.logfile"]), None);
        assert!(e.affects(Setting::LogFile));
        assert!(!e.affects(Setting::LogPanel));
        assert!(e.affects_any(&[Setting::LogPanel, Setting::LogFile]));
    }

    #[test]
    fn affects_foreign_key() {
        let e = ConfigurationChangeEvent::new(event(&["files.watcherExclude"]), None);
        assert!(e.affects_foreign("files.watcherExclude"));
        assert!(!e.affects(Setting::TestExecutables));
    }

    #[test]
    fn own_roots_are_not_foreign() {
        let e = ConfigurationChangeEvent::new(
            event(&["testMate.cpp.log.logfile", "catch2TestExplorer.logfile"]),
            None,
        );
        assert!(!e.affects_foreign("testMate.cpp.log.logfile"));
        assert!(!e.affects_foreign("catch2TestExplorer"));
        assert!(e.affects(Setting::LogFile));
    }

    #[test]
    fn legacy_executables_affect_both_executable_settings() {
        let e = ConfigurationChangeEvent::new(event(&["catch2TestExplorer.executables"]), None);
        assert!(e.affects(Setting::TestExecutable));
        assert!(e.affects(Setting::TestExecutables));
        assert!(!e.affects(Setting::TestWorkingDirectory));
    }
}
