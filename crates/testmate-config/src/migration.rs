//! One-way migration from the legacy schema
//!
//! Two routines, both generic over [`ScopedSlot`]:
//!
//! - [`migrate_scalar`] moves a value key-to-key, scope by scope, in one
//!   detached task. The caller gets the legacy effective value at once.
//! - [`migrate_legacy_executables`] rewrites the overloaded legacy
//!   `executables` value into `test.executable` / `test.executables`. It is
//!   awaited, because expansion reads the new keys right after.
//!
//! Both clear the legacy key at every scope once the new values have been
//! issued. Both are idempotent: with the legacy key undefined they do
//! nothing.

use crate::error::Diagnostic;
use crate::persist::DetachedWrites;
use serde_json::{Map, Value};
use testmate_settings::{Scope, ScopedSlot, Setting, StoreError};

/// Move a legacy value to its new key at the same scopes
///
/// Returns `None` if the legacy key is undefined everywhere. Otherwise
/// spawns one detached task that writes `target` at all three scopes
/// (scopes without a legacy value are written as undefined, clearing any
/// stale value) and only then clears `legacy` at all three scopes. The
/// legacy effective value is returned without waiting.
pub fn migrate_scalar<L, N>(legacy: &L, target: &N, writes: &DetachedWrites) -> Option<Value>
where
    L: ScopedSlot + Clone + 'static,
    N: ScopedSlot + Clone + 'static,
{
    let old = legacy.inspect();
    let effective = old.effective().cloned()?;

    let (legacy, target) = (legacy.clone(), target.clone());
    let what = format!("migrate {} -> {}", legacy.name(), target.name());
    tracing::info!(from = %legacy.name(), to = %target.name(), "migrating legacy setting");

    writes.spawn(what, async move {
        for (scope, value) in old.into_entries() {
            persist(&target, scope, value).await;
        }
        for scope in Scope::ALL {
            persist(&legacy, scope, None).await;
        }
        Ok(())
    });

    Some(effective)
}

/// What a legacy `executables` value becomes
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyExecutablesPlan {
    /// Discovery disabled: `test.executable = ""`, `test.executables` cleared
    Disable,
    /// `test.executable = pattern`
    Pattern(String),
    /// `test.executables = list`
    List(Vec<Value>),
    /// Unusable value; nothing is written
    Skip,
}

/// Decide how a single-scope legacy `executables` value is rewritten
///
/// A singleton list collapses to the plain pattern key only when its lone
/// object carries nothing but a string `pattern`; any other field keeps it
/// a list so the field is not lost.
#[must_use]
pub fn plan_legacy_executables(value: &Value) -> (LegacyExecutablesPlan, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();

    let items = match value {
        Value::Null => return (LegacyExecutablesPlan::Disable, diagnostics),
        Value::String(pattern) => {
            return (LegacyExecutablesPlan::Pattern(pattern.clone()), diagnostics);
        }
        Value::Object(_) => vec![value.clone()],
        Value::Array(items) => items.clone(),
        Value::Bool(_) | Value::Number(_) => {
            diagnostics.push(Diagnostic::new(
                Setting::TestExecutables,
                "",
                "legacy 'executables' must be a string, an object or a list",
            ));
            return (LegacyExecutablesPlan::Skip, diagnostics);
        }
    };

    let mut list = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::String(pattern) => {
                let mut object = Map::new();
                object.insert("pattern".to_string(), Value::String(pattern));
                list.push(Value::Object(object));
            }
            Value::Object(_) => list.push(item),
            other => diagnostics.push(Diagnostic::new(
                Setting::TestExecutables,
                format!("[{index}]"),
                format!("legacy executable entry must be a string or an object, got {other}"),
            )),
        }
    }

    let collapsed = match list.as_slice() {
        [Value::Object(only)] if only.len() == 1 => only
            .get("pattern")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    let plan = if list.is_empty() {
        LegacyExecutablesPlan::Disable
    } else if let Some(pattern) = collapsed {
        LegacyExecutablesPlan::Pattern(pattern)
    } else {
        LegacyExecutablesPlan::List(list)
    };
    (plan, diagnostics)
}

/// Rewrite the legacy `executables` key into the two new keys
///
/// Each scope is planned and written on its own, since the legacy value may
/// differ per scope. Write failures are logged; malformed entries are
/// returned as diagnostics.
pub async fn migrate_legacy_executables<L, P, A>(
    legacy: &L,
    pattern: &P,
    list: &A,
) -> Vec<Diagnostic>
where
    L: ScopedSlot,
    P: ScopedSlot,
    A: ScopedSlot,
{
    let old = legacy.inspect();
    if !old.is_defined() {
        return Vec::new();
    }
    tracing::info!(from = %legacy.name(), "migrating legacy executables");

    let mut diagnostics = Vec::new();
    for (scope, value) in old.into_entries() {
        let Some(value) = value else { continue };
        let (plan, found) = plan_legacy_executables(&value);
        diagnostics.extend(found);
        tracing::debug!(%scope, ?plan, "legacy executables plan");

        match plan {
            LegacyExecutablesPlan::Disable => {
                persist(pattern, scope, Some(Value::String(String::new()))).await;
                persist(list, scope, None).await;
            }
            LegacyExecutablesPlan::Pattern(p) => {
                persist(pattern, scope, Some(Value::String(p))).await;
            }
            LegacyExecutablesPlan::List(items) => {
                persist(list, scope, Some(Value::Array(items))).await;
            }
            LegacyExecutablesPlan::Skip => {}
        }
    }

    for scope in Scope::ALL {
        persist(legacy, scope, None).await;
    }
    diagnostics
}

async fn persist<S: ScopedSlot + ?Sized>(slot: &S, scope: Scope, value: Option<Value>) {
    let result: Result<(), StoreError> = slot.write(scope, value).await;
    if let Err(error) = result {
        tracing::error!(key = %slot.name(), %scope, %error, "settings write failed");
    }
}
