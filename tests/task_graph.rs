// tests/task_graph.rs

mod common;
use crate::common::{init_tracing, with_timeout, TestResult};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use themeforge::dag::TaskGraph;
use themeforge::errors::BuildError;
use themeforge_test_utils::Recorder;

#[tokio::test]
async fn sequence_runs_children_in_order() -> TestResult {
    init_tracing();
    let rec = Recorder::new();

    let mut b = TaskGraph::builder();
    b = rec.slow(b, "a", 20);
    b = rec.ok(b, "b");
    b = rec.ok(b, "c");
    let graph = b.sequence("all", ["a", "b", "c"]).build()?;

    with_timeout(graph.run("all")).await?;

    assert_eq!(rec.events(), vec!["a:start", "a:end", "b", "c"]);
    Ok(())
}

#[tokio::test]
async fn sequence_stops_at_first_failure() -> TestResult {
    init_tracing();
    let rec = Recorder::new();

    let mut b = TaskGraph::builder();
    b = rec.ok(b, "clean");
    b = rec.failing(b, "pull");
    b = rec.ok(b, "assets");
    let graph = b.sequence("build", ["clean", "pull", "assets"]).build()?;

    let failures = with_timeout(graph.run("build")).await.unwrap_err();

    assert_eq!(failures.task_names(), vec!["pull"]);
    assert!(rec.contains("clean"));
    assert!(!rec.contains("assets"), "successor of a failed task must not start");
    Ok(())
}

#[tokio::test]
async fn parallel_waits_for_all_children_and_reports_each_failure() -> TestResult {
    init_tracing();
    let rec = Recorder::new();

    let mut b = TaskGraph::builder();
    b = rec.failing(b, "styles");
    b = rec.slow(b, "images", 50);
    b = rec.failing(b, "scripts");
    b = rec.ok(b, "fonts");
    let graph = b
        .parallel("theme", ["styles", "images", "scripts", "fonts"])
        .build()?;

    let failures = with_timeout(graph.run("theme")).await.unwrap_err();

    let mut failed = failures.task_names();
    failed.sort();
    assert_eq!(failed, vec!["scripts", "styles"]);
    // A failing sibling never cancels the others.
    assert!(rec.contains("images:end"));
    assert!(rec.contains("fonts"));
    Ok(())
}

#[tokio::test]
async fn parallel_children_run_concurrently() -> TestResult {
    init_tracing();
    let rec = Recorder::new();

    let mut b = TaskGraph::builder();
    b = rec.slow(b, "x", 100);
    b = rec.slow(b, "y", 100);
    let graph = b.parallel("both", ["x", "y"]).build()?;

    with_timeout(graph.run("both")).await?;

    let x_end = rec.position("x:end").unwrap();
    let y_start = rec.position("y:start").unwrap();
    let y_end = rec.position("y:end").unwrap();
    let x_start = rec.position("x:start").unwrap();
    assert!(y_start < x_end && x_start < y_end, "events: {:?}", rec.events());
    Ok(())
}

#[tokio::test]
async fn nested_groups_compose() -> TestResult {
    init_tracing();
    let rec = Recorder::new();

    let mut b = TaskGraph::builder();
    for name in ["clean", "vendor-js", "vendor-css", "styles", "scripts"] {
        b = rec.ok(b, name);
    }
    let graph = b
        .parallel("vendor", ["vendor-js", "vendor-css"])
        .parallel("theme", ["styles", "scripts"])
        .sequence("build", ["clean", "vendor", "theme"])
        .build()?;

    with_timeout(graph.run("build")).await?;

    let clean = rec.position("clean").unwrap();
    let last_vendor = rec.position("vendor-js").unwrap().max(rec.position("vendor-css").unwrap());
    let first_theme = rec.position("styles").unwrap().min(rec.position("scripts").unwrap());
    assert!(clean < last_vendor);
    assert!(last_vendor < first_theme);
    Ok(())
}

#[tokio::test]
async fn blocking_actions_run_off_the_runtime() -> TestResult {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);

    let graph = TaskGraph::builder()
        .blocking("io", move || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build()?;

    with_timeout(graph.run("io")).await?;
    with_timeout(graph.run("io")).await?;

    assert_eq!(count.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn unknown_reference_is_a_config_error() {
    let rec = Recorder::new();
    let b = rec.ok(TaskGraph::builder(), "a");
    let err = b.sequence("build", ["a", "missing"]).build().unwrap_err();

    match err {
        BuildError::ConfigError(msg) => assert!(msg.contains("missing"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn cycles_are_rejected() {
    let err = TaskGraph::builder()
        .sequence("a", ["b"])
        .parallel("b", ["c"])
        .sequence("c", ["a"])
        .build()
        .unwrap_err();

    match err {
        BuildError::GraphCycle(msg) => assert!(msg.contains("cycle detected"), "{msg}"),
        other => panic!("expected GraphCycle, got {other:?}"),
    }
}

#[test]
fn duplicate_names_are_rejected() {
    let rec = Recorder::new();
    let b = rec.ok(TaskGraph::builder(), "a");
    let b = rec.ok(b, "a");
    assert!(matches!(b.build(), Err(BuildError::ConfigError(_))));
}

#[tokio::test]
async fn running_an_unknown_task_reports_it() -> TestResult {
    let graph = TaskGraph::builder().build()?;
    let failures = graph.run("nope").await.unwrap_err();

    assert_eq!(failures.len(), 1);
    let failure = failures.iter().next().unwrap();
    assert!(matches!(failure.error, BuildError::TaskNotFound(_)));
    assert!(failures.to_string().contains("1 task(s) failed"));
    Ok(())
}
