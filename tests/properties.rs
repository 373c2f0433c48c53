// tests/properties.rs

mod common;
use crate::common::{mock_fs, p};

use std::collections::BTreeSet;
use std::path::PathBuf;

use proptest::prelude::*;
use themeforge::assets::SourceFile;
use themeforge::dag::{TaskGraph, TaskGraphBuilder};
use themeforge::errors::BuildError;
use themeforge::fs::FileSystem;
use themeforge::manifest::aggregator;
use themeforge::sink::DualSink;
use themeforge::transform::builtin::{CssMinifier, JsMinifier};
use themeforge::transform::Transform;
use themeforge::types::AssetClassKind;
use themeforge_test_utils::Recorder;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("tokio runtime")
}

// Leaf `i` of a generated group fails when `failing[i]` is set.
fn leaves(rec: &Recorder, failing: &[bool]) -> (TaskGraphBuilder, Vec<String>) {
    let mut builder = TaskGraph::builder();
    let mut names = Vec::new();
    for (i, fails) in failing.iter().enumerate() {
        let name = format!("leaf_{i}");
        builder = if *fails {
            rec.failing(builder, &name)
        } else {
            rec.ok(builder, &name)
        };
        names.push(name);
    }
    (builder, names)
}

fn rel_path() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{1,6}", 1..4).prop_map(|parts| parts.join("/"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sequence_runs_exactly_the_prefix_up_to_the_first_failure(
        failing in proptest::collection::vec(any::<bool>(), 1..8)
    ) {
        let rec = Recorder::new();
        let (builder, names) = leaves(&rec, &failing);
        let graph = builder.sequence("all", names.clone()).build().expect("valid graph");

        let result = runtime().block_on(graph.run("all"));

        match failing.iter().position(|f| *f) {
            Some(first) => {
                let failures = result.expect_err("a leaf failed");
                prop_assert_eq!(failures.task_names(), vec![names[first].as_str()]);
                prop_assert_eq!(rec.events(), names[..=first].to_vec());
            }
            None => {
                prop_assert!(result.is_ok());
                prop_assert_eq!(rec.events(), names);
            }
        }
    }

    #[test]
    fn parallel_runs_every_child_and_reports_every_failure(
        failing in proptest::collection::vec(any::<bool>(), 1..8)
    ) {
        let rec = Recorder::new();
        let (builder, names) = leaves(&rec, &failing);
        let graph = builder.parallel("all", names.clone()).build().expect("valid graph");

        let result = runtime().block_on(graph.run("all"));

        let ran: BTreeSet<String> = rec.events().into_iter().collect();
        prop_assert_eq!(ran, names.iter().cloned().collect::<BTreeSet<_>>());

        let expected: BTreeSet<&str> = names
            .iter()
            .zip(&failing)
            .filter(|(_, f)| **f)
            .map(|(n, _)| n.as_str())
            .collect();
        let reported: BTreeSet<&str> = match &result {
            Ok(()) => BTreeSet::new(),
            Err(failures) => failures.task_names().into_iter().collect(),
        };
        prop_assert_eq!(reported, expected);
    }

    #[test]
    fn dual_sink_roots_agree_unless_a_write_fails(
        writes in proptest::collection::vec((rel_path(), proptest::collection::vec(any::<u8>(), 0..32)), 1..12),
        fail_live in any::<bool>(),
    ) {
        let (mock, fs) = mock_fs();
        if fail_live {
            mock.fail_writes_under("/live");
        }
        let sink = DualSink::new(vec![p("/build"), p("/live")], fs.clone());

        for (rel, contents) in &writes {
            match sink.write(rel, contents) {
                Ok(()) => {
                    prop_assert!(!fail_live);
                    prop_assert_eq!(fs.read(&p("/build").join(rel)).ok(), fs.read(&p("/live").join(rel)).ok());
                }
                Err(BuildError::PartialWrite { failures, .. }) => {
                    prop_assert!(fail_live);
                    prop_assert_eq!(failures.len(), 1);
                    prop_assert_eq!(fs.read(&p("/build").join(rel)).ok(), Some(contents.clone()));
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn minifiers_never_grow_their_input(text in "[ -~\n\t]{0,200}") {
        let css = CssMinifier.apply("a.css", text.as_bytes()).expect("css minify");
        let js = JsMinifier.apply("a.js", text.as_bytes()).expect("js minify");
        prop_assert!(css.len() <= text.len());
        prop_assert!(js.len() <= text.len());
    }

    #[test]
    fn aggregator_lists_each_top_level_php_once(rels in proptest::collection::vec(rel_path(), 0..10)) {
        let files: Vec<SourceFile> = rels
            .iter()
            .map(|rel| SourceFile {
                path: PathBuf::from("/src/includes").join(format!("{rel}.php")),
                rel: format!("{rel}.php"),
                kind: AssetClassKind::Include,
            })
            .collect();

        let out = aggregator(&files).expect("aggregator");

        let expected = files.iter().filter(|f| !f.rel.contains('/')).count();
        prop_assert_eq!(out.matches("require_once").count(), expected);
        prop_assert!(out.starts_with("<?php\r\n"));
        prop_assert!(out.split("\r\n").skip(1).filter(|l| !l.is_empty()).all(|l| l.ends_with("');")));
    }
}
