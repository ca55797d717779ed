//! Exact writes issued by the legacy migrations, and their order

use mockall::predicate::{always, eq};
use mockall::{mock, Sequence};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use testmate_config::{migrate_legacy_executables, migrate_scalar, DetachedWrites};
use testmate_settings::{
    MemoryStore, Scope, ScopedSlot, ScopedValue, Section, Setting, StoreError,
    LEGACY_SECTION_ROOT, SECTION_ROOT,
};

mock! {
    Slot {}

    #[async_trait::async_trait]
    impl ScopedSlot for Slot {
        fn name(&self) -> String;
        fn inspect(&self) -> ScopedValue<Value>;
        async fn write(&self, scope: Scope, value: Option<Value>) -> Result<(), StoreError>;
    }
}

fn named(name: &'static str) -> MockSlot {
    let mut slot = MockSlot::new();
    slot.expect_name().returning(move || name.to_string());
    slot
}

#[tokio::test]
async fn new_keys_are_written_before_legacy_is_cleared() {
    let mut seq = Sequence::new();
    let mut legacy = named("catch2TestExplorer.executables");
    let mut pattern = named("testMate.cpp.test.executable");
    let mut list = named("testMate.cpp.test.executables");

    legacy.expect_inspect().times(1).returning(|| {
        ScopedValue::undefined()
            .with(Scope::Global, Value::Null)
            .with(Scope::WorkspaceFolder, json!(["a/*", "b/*"]))
    });

    pattern
        .expect_write()
        .with(eq(Scope::Global), eq(Some(json!(""))))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    list.expect_write()
        .with(eq(Scope::Global), eq(None))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    list.expect_write()
        .with(
            eq(Scope::WorkspaceFolder),
            eq(Some(json!([{ "pattern": "a/*" }, { "pattern": "b/*" }]))),
        )
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    for scope in Scope::ALL {
        legacy
            .expect_write()
            .with(eq(scope), eq(None))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
    }

    let diagnostics = migrate_legacy_executables(&legacy, &pattern, &list).await;
    assert!(diagnostics.is_empty());
}

#[tokio::test]
async fn failed_writes_do_not_stop_the_migration() {
    let mut legacy = named("catch2TestExplorer.executables");
    let mut pattern = named("testMate.cpp.test.executable");
    let list = named("testMate.cpp.test.executables");

    legacy
        .expect_inspect()
        .returning(|| ScopedValue::undefined().with(Scope::Workspace, json!("x/*")));
    pattern
        .expect_write()
        .with(eq(Scope::Workspace), eq(Some(json!("x/*"))))
        .times(1)
        .returning(|scope, _| {
            Err(StoreError::rejected("testMate.cpp.test.executable", scope, "denied"))
        });
    legacy
        .expect_write()
        .with(always(), eq(None))
        .times(3)
        .returning(|_, _| Ok(()));

    migrate_legacy_executables(&legacy, &pattern, &list).await;
}

#[tokio::test]
async fn undefined_legacy_value_writes_nothing() {
    let mut legacy = named("catch2TestExplorer.executables");
    let pattern = named("testMate.cpp.test.executable");
    let list = named("testMate.cpp.test.executables");

    legacy.expect_inspect().returning(ScopedValue::undefined);
    legacy.expect_write().never();

    let diagnostics = migrate_legacy_executables(&legacy, &pattern, &list).await;
    assert!(diagnostics.is_empty());
}

/// Slot over a real section that logs each write and can delay it
#[derive(Clone)]
struct LoggedSlot {
    inner: testmate_settings::SettingSlot,
    log: Arc<Mutex<Vec<String>>>,
    delay: Duration,
}

#[async_trait::async_trait]
impl ScopedSlot for LoggedSlot {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn inspect(&self) -> ScopedValue<Value> {
        self.inner.inspect()
    }

    async fn write(&self, scope: Scope, value: Option<Value>) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.log.lock().push(format!("{}@{scope}", self.inner.key()));
        self.inner.write(scope, value).await
    }
}

fn logged_pair(
    store: Arc<MemoryStore>,
    target_delay: Duration,
) -> (LoggedSlot, LoggedSlot, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let legacy = LoggedSlot {
        inner: Section::new(store.clone(), LEGACY_SECTION_ROOT).slot("workerMaxNumber"),
        log: log.clone(),
        delay: Duration::ZERO,
    };
    let target = LoggedSlot {
        inner: Section::new(store, SECTION_ROOT).slot(Setting::TestParallelExecutionLimit.key()),
        log: log.clone(),
        delay: target_delay,
    };
    (legacy, target, log)
}

#[tokio::test]
async fn slow_target_write_keeps_legacy_value_until_written() {
    let store = Arc::new(MemoryStore::new().with_value(
        "catch2TestExplorer.workerMaxNumber",
        Scope::Global,
        json!(3),
    ));
    let (legacy, target, _) = logged_pair(store.clone(), Duration::from_millis(200));
    let writes = DetachedWrites::new();

    assert_eq!(migrate_scalar(&legacy, &target, &writes), Some(json!(3)));
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A crash here must leave the value reachable somewhere.
    let legacy_defined = legacy.inspect().is_defined();
    let target_defined = target.inspect().is_defined();
    assert!(legacy_defined || target_defined, "value lost mid-migration");
    assert!(legacy_defined);

    writes.settle().await;
    assert!(!legacy.inspect().is_defined());
    assert_eq!(
        target.inspect(),
        ScopedValue::undefined().with(Scope::Global, json!(3))
    );
}

#[tokio::test]
async fn scalar_migration_clears_only_after_every_target_write() {
    let store = Arc::new(MemoryStore::new().with_value(
        "catch2TestExplorer.workerMaxNumber",
        Scope::Workspace,
        json!(2),
    ));
    let (legacy, target, log) = logged_pair(store, Duration::from_millis(5));
    let writes = DetachedWrites::new();

    migrate_scalar(&legacy, &target, &writes);
    writes.settle().await;

    let target_key = Setting::TestParallelExecutionLimit.key();
    assert_eq!(
        *log.lock(),
        vec![
            format!("{target_key}@global"),
            format!("{target_key}@workspace"),
            format!("{target_key}@workspaceFolder"),
            "workerMaxNumber@global".to_string(),
            "workerMaxNumber@workspace".to_string(),
            "workerMaxNumber@workspaceFolder".to_string(),
        ]
    );
}
