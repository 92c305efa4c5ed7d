//! Integration Tests for the Scheduler Runtime
//!
//! These tests drive whole event sequences through the runtime and the
//! async dispatcher, playing the part of the executor.

use std::sync::Arc;

use serde_json::json;

use conduit_core::callback::{CallbackDefinition, CallbackRegistry};
use conduit_core::config::SchedulerConfig;
use conduit_core::error::{DispatchError, StoreError};
use conduit_core::layout::{
    Address, ComponentId, DependencySpec, KeyValue, PathIndex, Selector, TreePath,
};
use conduit_core::lifecycle::{Bin, Entry, Reason};
use conduit_core::runtime::{Dispatcher, SchedulerRuntime, TickReport};

fn todo(index: i64) -> ComponentId {
    ComponentId::keyed([("type", KeyValue::from("todo")), ("index", KeyValue::from(index))])
}

fn todo_spec(selector: Selector, property: &str) -> DependencySpec {
    DependencySpec::pattern(
        [("type", Selector::Value(KeyValue::from("todo"))), ("index", selector)],
        property,
    )
}

/// A todo list: a filter box restyles every row, rows feed a counter.
fn todo_app() -> (CallbackRegistry, PathIndex) {
    let layout = json!({
        "type": "Div",
        "props": {
            "id": "app",
            "children": [
                {"type": "Input", "props": {"id": "filter"}},
                {"type": "Ul", "props": {"children": [
                    {"type": "Li", "props": {"id": {"type": "todo", "index": 0}}},
                    {"type": "Li", "props": {"id": {"type": "todo", "index": 1}}},
                    {"type": "Li", "props": {"id": {"type": "todo", "index": 2}}}
                ]}},
                {"type": "Span", "props": {"id": "remaining"}}
            ]
        }
    });
    let paths = PathIndex::from_layout(&layout);

    let registry = CallbackRegistry::from_definitions([
        CallbackDefinition::new("style-row")
            .input(DependencySpec::exact("filter", "value"))
            .output(todo_spec(Selector::Match, "style")),
        CallbackDefinition::new("count")
            .input(todo_spec(Selector::All, "style"))
            .output(DependencySpec::exact("remaining", "children"))
            .prevent_initial_call(),
    ])
    .unwrap();

    (registry, paths)
}

/// Run every prioritized entry to completion, each writing all its outputs.
fn drain(runtime: &SchedulerRuntime, mut report: TickReport) -> Vec<String> {
    let mut ran = Vec::new();
    while let Some(entry) = report.prioritized.first().cloned() {
        ran.push(entry.instance.to_string());
        runtime
            .transition(entry.key, Bin::Prioritized, Bin::Executing)
            .unwrap();
        let updated = entry.instance.outputs().to_vec();
        report = runtime.complete(entry.key, &updated).unwrap();
    }
    ran
}

#[test]
fn user_change_runs_rows_then_counter() {
    let (registry, paths) = todo_app();
    let runtime = SchedulerRuntime::new(SchedulerConfig::default(), registry, paths);

    let report = runtime.prop_changed(&[Address::new("filter", "value")]).unwrap();
    assert_eq!(report.prioritized.len(), 3);

    let ran = drain(&runtime, report);

    assert_eq!(ran.len(), 4);
    assert_eq!(ran.last().map(String::as_str), Some("count"));
    assert!(runtime.snapshot().is_idle());
    assert!(runtime.snapshot().stored().is_empty());
}

#[test]
fn counter_waits_for_every_row() {
    let (registry, paths) = todo_app();
    let runtime = SchedulerRuntime::new(SchedulerConfig::default(), registry, paths);

    let report = runtime.prop_changed(&[Address::new("filter", "value")]).unwrap();
    let first = report.prioritized[0].clone();
    runtime
        .transition(first.key, Bin::Prioritized, Bin::Executing)
        .unwrap();
    let report = runtime.complete(first.key, first.instance.outputs()).unwrap();

    // the other two rows are still prioritized and write what count reads
    assert_eq!(report.prioritized.len(), 2);
    let requested = runtime.snapshot().bin(Bin::Requested).to_vec();
    assert_eq!(requested.len(), 1);
    assert_eq!(requested[0].instance.callback().as_str(), "count");
}

#[test]
fn initial_render_skips_prevented_callbacks() {
    let (registry, paths) = todo_app();
    let runtime = SchedulerRuntime::new(SchedulerConfig::default(), registry, paths);

    let report = runtime.initial_layout().unwrap();

    let names: Vec<_> = report
        .prioritized
        .iter()
        .map(|entry: &Entry| entry.instance.to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            r#"style-row{"index":0}"#,
            r#"style-row{"index":1}"#,
            r#"style-row{"index":2}"#
        ]
    );
    assert!(report.prioritized.iter().all(|e| e.instance.is_initial_call()));
}

#[test]
fn removed_row_prunes_its_callback() {
    let (registry, paths) = todo_app();
    let runtime = SchedulerRuntime::new(SchedulerConfig::default(), registry, paths.clone());
    runtime.prop_changed(&[Address::new("filter", "value")]).unwrap();

    let mut shrunk = paths;
    shrunk.remove(&todo(2));
    let report = runtime.set_layout(shrunk).unwrap();

    assert_eq!(report.batch.removed_for(Bin::Prioritized, Reason::Pruned).len(), 1);
    assert_eq!(report.prioritized.len(), 2);
}

#[test]
fn added_row_is_styled_on_its_own() {
    let (registry, paths) = todo_app();
    let runtime = SchedulerRuntime::new(SchedulerConfig::default(), registry, paths.clone());
    let ran = drain(&runtime, runtime.initial_layout().unwrap());
    assert_eq!(ran.last().map(String::as_str), Some("count"));

    let mut grown = paths;
    grown.insert(todo(3), TreePath::root());
    let report = runtime.set_layout(grown).unwrap();

    let names: Vec<_> = report
        .prioritized
        .iter()
        .map(|entry| entry.instance.to_string())
        .collect();
    assert_eq!(names, vec![r#"style-row{"index":3}"#]);
    assert!(report.prioritized[0].instance.is_initial_call());

    // the new row's style reaches the counter like any other change
    let ran = drain(&runtime, report);
    assert_eq!(ran, vec![r#"style-row{"index":3}"#, "count"]);
}

#[test]
fn registering_later_rebuilds_the_graph() {
    let (registry, paths) = todo_app();
    let runtime = SchedulerRuntime::new(SchedulerConfig::default(), registry, paths);
    runtime
        .register(
            CallbackDefinition::new("echo")
                .input(DependencySpec::exact("remaining", "children"))
                .output(DependencySpec::exact("app", "title")),
        )
        .unwrap();

    let report = runtime.prop_changed(&[Address::new("filter", "value")]).unwrap();
    let ran = drain(&runtime, report);

    assert_eq!(ran.last().map(String::as_str), Some("echo"));
}

#[test]
fn executor_errors_surface() {
    let (registry, paths) = todo_app();
    let runtime = SchedulerRuntime::new(SchedulerConfig::default(), registry, paths);
    let report = runtime.prop_changed(&[Address::new("filter", "value")]).unwrap();
    let key = report.prioritized[0].key;

    assert_eq!(
        runtime.transition(key, Bin::Executing, Bin::Watched),
        Err(StoreError::WrongBin {
            key,
            expected: Bin::Executing,
            actual: Bin::Prioritized,
        })
    );
    assert_eq!(
        runtime.transition(key, Bin::Prioritized, Bin::Requested),
        Err(StoreError::IllegalTransition {
            from: Bin::Prioritized,
            to: Bin::Requested,
        })
    );
}

#[tokio::test]
async fn dispatcher_serializes_events() {
    let (registry, paths) = todo_app();
    let runtime = Arc::new(SchedulerRuntime::new(SchedulerConfig::default(), registry, paths));
    let (handle, task) = Dispatcher::spawn(runtime);

    let report = handle
        .prop_changed(vec![Address::new("filter", "value")])
        .await
        .unwrap();
    assert_eq!(report.prioritized.len(), 3);

    for entry in report.prioritized {
        handle
            .transition(entry.key, Bin::Prioritized, Bin::Executing)
            .await
            .unwrap();
        handle
            .complete(entry.key, entry.instance.outputs().to_vec())
            .await
            .unwrap();
    }

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.bin(Bin::Prioritized).len(), 1);
    assert_eq!(
        snapshot.bin(Bin::Prioritized)[0].instance.callback().as_str(),
        "count"
    );

    drop(handle);
    task.await.unwrap();
}

#[tokio::test]
async fn dispatcher_reports_store_errors() {
    let (registry, paths) = todo_app();
    let runtime = Arc::new(SchedulerRuntime::new(SchedulerConfig::default(), registry, paths));
    let (handle, _task) = Dispatcher::spawn(runtime);

    let report = handle
        .prop_changed(vec![Address::new("filter", "value")])
        .await
        .unwrap();
    let key = report.prioritized[0].key;

    let err = handle.complete(key, Vec::new()).await.unwrap_err();
    assert!(matches!(err, DispatchError::Store(StoreError::WrongBin { .. })));
}

#[tokio::test]
async fn closed_dispatcher_is_reported() {
    let (registry, paths) = todo_app();
    let runtime = Arc::new(SchedulerRuntime::new(SchedulerConfig::default(), registry, paths));
    let (handle, task) = Dispatcher::spawn(runtime);

    task.abort();
    let _ = task.await;

    let err = handle.initial_layout().await.unwrap_err();
    assert!(matches!(err, DispatchError::Closed));
}
