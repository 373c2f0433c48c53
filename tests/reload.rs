// tests/reload.rs

mod common;
use crate::common::{with_timeout, TestResult};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::broadcast::error::TryRecvError;

use std::sync::Arc;

use themeforge::assets::{compile_globs, names};
use themeforge::fs::RealFileSystem;
use themeforge::reload::{spawn_reload_server, ReloadBus, ReloadEvent};
use themeforge::tasks::BuildContext;
use themeforge::types::{AssetClassKind, ReloadMode};
use themeforge_test_utils::ProjectFixture;

fn paths(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn styles_are_injected_and_other_kinds_reload() -> TestResult {
    let bus = ReloadBus::new();
    let mut rx = bus.subscribe();

    bus.publish("styles", AssetClassKind::Style, &paths(&["css/main.css"]), None);
    bus.publish("scripts", AssetClassKind::Script, &paths(&["js/main.js"]), None);

    let styles = rx.try_recv()?;
    assert_eq!(styles.class, "styles");
    assert_eq!(styles.mode, ReloadMode::Inject);
    assert_eq!(styles.paths, paths(&["css/main.css"]));

    let scripts = rx.try_recv()?;
    assert_eq!(scripts.mode, ReloadMode::Full);
    Ok(())
}

#[tokio::test]
async fn matcher_filters_announced_paths() -> TestResult {
    let bus = ReloadBus::new();
    let mut rx = bus.subscribe();
    let css_only = compile_globs("test", &["**/*.css".to_string()])?;

    bus.publish(
        "styles",
        AssetClassKind::Style,
        &paths(&["css/main.min.css", "css/main.min.css.map"]),
        Some(&css_only),
    );
    bus.publish(
        "styles",
        AssetClassKind::Style,
        &paths(&["css/main.min.css.map"]),
        Some(&css_only),
    );

    assert_eq!(rx.try_recv()?.paths, paths(&["css/main.min.css"]));
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    Ok(())
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<ReloadEvent>) -> Vec<ReloadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn vendor_stylesheets_are_injected() -> TestResult {
    let fixture = ProjectFixture::new().with_sample_sources();
    let bus = ReloadBus::new();
    let ctx = BuildContext::new(Arc::new(fixture.settings()), Arc::new(RealFileSystem), bus.clone())?;
    let mut rx = bus.subscribe();

    ctx.pipeline(names::VENDOR_STYLES).ok_or("no vendor-styles")?.run()?;
    let styles = drain(&mut rx);

    assert!(!styles.is_empty());
    assert!(styles.iter().all(|e| e.mode == ReloadMode::Inject), "{styles:?}");
    assert!(styles.iter().flat_map(|e| &e.paths).all(|p| p.ends_with(".css")));
    assert_eq!(styles[0].paths, paths(&["css/lib.css"]));

    ctx.pipeline(names::VENDOR_SCRIPTS).ok_or("no vendor-scripts")?.run()?;
    let scripts = drain(&mut rx);
    assert!(!scripts.is_empty());
    assert!(scripts.iter().all(|e| e.mode == ReloadMode::Full), "{scripts:?}");
    Ok(())
}

#[tokio::test]
async fn publish_as_overrides_the_kind_default() -> TestResult {
    let bus = ReloadBus::new();
    let mut rx = bus.subscribe();

    bus.publish_as(
        "vendor-styles",
        AssetClassKind::Vendor,
        ReloadMode::Inject,
        &paths(&["css/lib.css"]),
        None,
    );

    let event = rx.try_recv()?;
    assert_eq!(event.kind, AssetClassKind::Vendor);
    assert_eq!(event.mode, ReloadMode::Inject);
    Ok(())
}

#[tokio::test]
async fn disabled_bus_sends_nothing() {
    let bus = ReloadBus::disabled();
    let mut rx = bus.subscribe();
    bus.publish("fonts", AssetClassKind::Font, &paths(&["fonts/a.woff"]), None);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn publishing_without_observers_is_fine() {
    let bus = ReloadBus::new();
    bus.publish("images", AssetClassKind::Image, &paths(&["img/a.png"]), None);
}

#[tokio::test]
async fn server_streams_events_as_json_lines() -> TestResult {
    let bus = ReloadBus::new();
    let (addr, server) = spawn_reload_server("127.0.0.1:0".parse()?, bus.clone()).await?;

    let stream = with_timeout(TcpStream::connect(addr)).await?;
    let mut lines = BufReader::new(stream).lines();

    // The client subscribes once its connection is accepted; keep
    // publishing until the first line arrives.
    let line = with_timeout(async {
        loop {
            bus.publish("styles", AssetClassKind::Style, &paths(&["css/main.css"]), None);
            tokio::select! {
                line = lines.next_line() => break line,
                _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {}
            }
        }
    })
    .await?
    .ok_or("connection closed")?;

    let event: serde_json::Value = serde_json::from_str(&line)?;
    assert_eq!(event["class"], "styles");
    assert_eq!(event["kind"], "style");
    assert_eq!(event["mode"], "inject");
    assert_eq!(event["paths"][0], "css/main.css");

    server.abort();
    Ok(())
}
