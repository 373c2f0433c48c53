// tests/dual_sink.rs

mod common;
use crate::common::{mock_fs, p, TestResult};

use themeforge::errors::BuildError;
use themeforge::fs::FileSystem;
use themeforge::sink::DualSink;

#[test]
fn write_lands_in_every_root() -> TestResult {
    let (_mock, fs) = mock_fs();
    let sink = DualSink::new(vec![p("/b"), p("/l")], fs.clone());

    sink.write("css/main.css", b"body{}")?;

    assert_eq!(fs.read(&p("/b/css/main.css"))?, b"body{}");
    assert_eq!(fs.read(&p("/l/css/main.css"))?, b"body{}");
    Ok(())
}

#[test]
fn failing_root_does_not_stop_the_other() {
    let (mock, fs) = mock_fs();
    mock.fail_writes_under("/l");
    let sink = DualSink::new(vec![p("/b"), p("/l")], fs.clone());

    let err = sink.write("js/main.js", b"x").unwrap_err();

    match err {
        BuildError::PartialWrite { path, failures } => {
            assert_eq!(path, "js/main.js");
            assert_eq!(failures.len(), 1);
            assert!(failures[0].starts_with("/l"), "{failures:?}");
        }
        other => panic!("expected PartialWrite, got {other:?}"),
    }
    assert!(fs.is_file(&p("/b/js/main.js")));
    assert!(!fs.exists(&p("/l/js/main.js")));
}

#[test]
fn ensure_dir_is_idempotent() -> TestResult {
    let (_mock, fs) = mock_fs();
    let sink = DualSink::new(vec![p("/b"), p("/l")], fs.clone());

    sink.ensure_dir("acf-json")?;
    sink.ensure_dir("acf-json")?;

    assert!(fs.is_dir(&p("/b/acf-json")));
    assert!(fs.is_dir(&p("/l/acf-json")));
    Ok(())
}

#[test]
fn clear_removes_every_root_and_tolerates_missing_ones() -> TestResult {
    let (mock, fs) = mock_fs();
    mock.add_file("/b/style.css", "x");
    let sink = DualSink::new(vec![p("/b"), p("/l")], fs.clone());

    sink.clear()?;

    assert!(!fs.exists(&p("/b")));
    assert!(!fs.exists(&p("/b/style.css")));
    Ok(())
}

#[test]
fn copy_from_reads_the_source_once_for_all_roots() -> TestResult {
    let (mock, fs) = mock_fs();
    mock.add_file("/src/fonts/a.woff", [1u8, 2, 3]);
    let sink = DualSink::new(vec![p("/b"), p("/l")], fs.clone());

    sink.copy_from(&p("/src/fonts/a.woff"), "fonts/a.woff")?;

    assert_eq!(fs.read(&p("/b/fonts/a.woff"))?, vec![1, 2, 3]);
    assert_eq!(fs.read(&p("/l/fonts/a.woff"))?, vec![1, 2, 3]);
    assert_eq!(mock.write_count(), 2);
    Ok(())
}

#[test]
fn missing_source_is_an_io_error() {
    let (_mock, fs) = mock_fs();
    let sink = DualSink::new(vec![p("/b"), p("/l")], fs);
    assert!(matches!(
        sink.copy_from(&p("/src/nope"), "nope"),
        Err(BuildError::Io { .. })
    ));
}
