// tests/change_tracker.rs

mod common;
use crate::common::{mock_fs, p, TestResult};

use std::sync::Arc;

use themeforge::fs::{FileSystem, RealFileSystem};
use themeforge::sink::DualSink;
use themeforge::track::{ChangeTracker, MemoryRecordStore, RECORDS_DIR};
use themeforge::types::{FingerprintMode, RecordStorageMode};

fn tracker(fs: &Arc<dyn FileSystem>, mode: FingerprintMode) -> ChangeTracker {
    ChangeTracker::new(
        "fonts",
        mode,
        vec![p("/out/build"), p("/out/live")],
        Arc::clone(fs),
        Box::new(MemoryRecordStore::new()),
    )
    .expect("tracker")
}

fn sink(fs: &Arc<dyn FileSystem>) -> DualSink {
    DualSink::new(vec![p("/out/build"), p("/out/live")], Arc::clone(fs))
}

#[test]
fn missing_destination_is_stale_until_written_and_recorded() -> TestResult {
    let (mock, fs) = mock_fs();
    mock.add_file("/src/a.woff", "font");
    let t = tracker(&fs, FingerprintMode::Mtime);

    assert!(t.is_stale(&p("/src/a.woff"), "a.woff")?);

    sink(&fs).copy_from(&p("/src/a.woff"), "a.woff")?;
    t.record(&p("/src/a.woff"), "a.woff")?;

    assert!(!t.is_stale(&p("/src/a.woff"), "a.woff")?);
    // Asking again changes nothing.
    assert!(!t.is_stale(&p("/src/a.woff"), "a.woff")?);
    Ok(())
}

#[test]
fn deleted_destination_in_one_root_is_stale() -> TestResult {
    let (mock, fs) = mock_fs();
    mock.add_file("/src/a.woff", "font");
    let t = tracker(&fs, FingerprintMode::Mtime);

    sink(&fs).copy_from(&p("/src/a.woff"), "a.woff")?;
    t.record(&p("/src/a.woff"), "a.woff")?;
    mock.remove("/out/live/a.woff");

    assert!(t.is_stale(&p("/src/a.woff"), "a.woff")?);
    Ok(())
}

#[test]
fn touched_source_is_stale_in_mtime_mode() -> TestResult {
    let (mock, fs) = mock_fs();
    mock.add_file("/src/a.woff", "font");
    let t = tracker(&fs, FingerprintMode::Mtime);

    sink(&fs).copy_from(&p("/src/a.woff"), "a.woff")?;
    t.record(&p("/src/a.woff"), "a.woff")?;
    mock.touch("/src/a.woff");

    assert!(t.is_stale(&p("/src/a.woff"), "a.woff")?);
    Ok(())
}

#[test]
fn hash_mode_ignores_touches_but_sees_content_changes() -> TestResult {
    let (mock, fs) = mock_fs();
    mock.add_file("/src/a.woff", "font");
    let t = tracker(&fs, FingerprintMode::Hash);

    sink(&fs).copy_from(&p("/src/a.woff"), "a.woff")?;
    t.record(&p("/src/a.woff"), "a.woff")?;

    mock.touch("/src/a.woff");
    assert!(!t.is_stale(&p("/src/a.woff"), "a.woff")?);

    mock.add_file("/src/a.woff", "font v2");
    assert!(t.is_stale(&p("/src/a.woff"), "a.woff")?);
    Ok(())
}

#[test]
fn destination_edited_behind_our_back_is_stale() -> TestResult {
    let (mock, fs) = mock_fs();
    mock.add_file("/src/a.woff", "font");
    let t = tracker(&fs, FingerprintMode::Mtime);

    sink(&fs).copy_from(&p("/src/a.woff"), "a.woff")?;
    t.record(&p("/src/a.woff"), "a.woff")?;
    mock.add_file("/out/build/a.woff", "tampered");

    assert!(t.is_stale(&p("/src/a.woff"), "a.woff")?);
    Ok(())
}

#[test]
fn without_a_record_destination_age_decides() -> TestResult {
    let (mock, fs) = mock_fs();
    let t = tracker(&fs, FingerprintMode::Mtime);

    // Destinations written after the source: current.
    mock.add_file("/src/new.woff", "font");
    mock.add_file("/out/build/new.woff", "font");
    mock.add_file("/out/live/new.woff", "font");
    assert!(!t.is_stale(&p("/src/new.woff"), "new.woff")?);

    // Source written after the destinations: stale.
    mock.add_file("/out/build/old.woff", "font");
    mock.add_file("/out/live/old.woff", "font");
    mock.add_file("/src/old.woff", "font");
    assert!(t.is_stale(&p("/src/old.woff"), "old.woff")?);
    Ok(())
}

#[test]
fn missing_source_is_stale() -> TestResult {
    let (_mock, fs) = mock_fs();
    let t = tracker(&fs, FingerprintMode::Mtime);
    assert!(t.is_stale(&p("/src/gone.woff"), "gone.woff")?);
    Ok(())
}

#[test]
fn generated_outputs_compare_bytes() -> TestResult {
    let (_mock, fs) = mock_fs();
    let t = tracker(&fs, FingerprintMode::Mtime);

    assert!(t.is_content_stale(b"body{}", "main.css")?);
    sink(&fs).write("main.css", b"body{}")?;
    assert!(!t.is_content_stale(b"body{}", "main.css")?);
    assert!(t.is_content_stale(b"body{color:red}", "main.css")?);
    Ok(())
}

#[test]
fn file_records_survive_a_restart() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let roots = vec![root.join("build/img"), root.join("live/img")];

    fs.write(&root.join("src/logo.png"), b"png")?;
    DualSink::new(roots.clone(), Arc::clone(&fs)).copy_from(&root.join("src/logo.png"), "logo.png")?;

    let first = ChangeTracker::with_storage(
        "images",
        FingerprintMode::Hash,
        RecordStorageMode::File,
        root,
        roots.clone(),
        Arc::clone(&fs),
    )?;
    first.record(&root.join("src/logo.png"), "logo.png")?;
    first.flush()?;
    assert!(root.join(RECORDS_DIR).join("images").is_file());

    let second = ChangeTracker::with_storage(
        "images",
        FingerprintMode::Hash,
        RecordStorageMode::File,
        root,
        roots,
        Arc::clone(&fs),
    )?;
    assert_eq!(second.record_for("logo.png"), first.record_for("logo.png"));
    assert!(!second.is_stale(&root.join("src/logo.png"), "logo.png")?);
    Ok(())
}
