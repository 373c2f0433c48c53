// tests/transform.rs

mod common;
use crate::common::TestResult;

use std::path::PathBuf;
use std::sync::Arc;

use themeforge::assets::compile_globs;
use themeforge::errors::BuildError;
use themeforge::transform::builtin::{CssLinter, CssMinifier, JsLinter, JsMinifier, StyleVariables};
use themeforge::transform::{min_path, Asset, Chain, Diagnostics, Linter, MinifyStep, Stage, Transform};

fn asset(path: &str, contents: &str) -> Asset {
    Asset::new(path, PathBuf::from(format!("/src/{path}")), contents.as_bytes().to_vec())
}

fn text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).expect("utf-8 output")
}

#[test]
fn css_minifier_strips_comments_and_whitespace() -> TestResult {
    let input = "body {\n  color: red; /* c */\n}\n\na, b {\n margin: 0 auto;\n}\n";
    let out = text(CssMinifier.apply("main.css", input.as_bytes())?);
    assert_eq!(out, "body{color: red;}a,b{margin: 0 auto;}");
    Ok(())
}

#[test]
fn js_minifier_keeps_strings_and_line_breaks() -> TestResult {
    let input = "// header\nvar s = \"a  // not comment\";\nfunction f(a, b) {\n  return a + b; /* sum */\n}\n";
    let out = text(JsMinifier.apply("main.js", input.as_bytes())?);
    assert_eq!(out, "var s=\"a  // not comment\";\nfunction f(a,b){\nreturn a + b;\n}");
    Ok(())
}

#[test]
fn js_minifier_copies_regex_literals() -> TestResult {
    let input = concat!(
        "var re = /https?:\\/\\//;\n",
        "var x = 1;\n",
        "var half = x / 2;\n",
        "if (/[/]\\d+/g.test(s)) { return /a b/; }\n",
    );
    let out = text(JsMinifier.apply("main.js", input.as_bytes())?);
    assert_eq!(
        out,
        concat!(
            "var re=/https?:\\/\\//;\n",
            "var x=1;\n",
            "var half=x / 2;\n",
            "if(/[/]\\d+/g.test(s)){return /a b/;}",
        )
    );
    Ok(())
}

#[test]
fn minifiers_never_grow_their_input() -> TestResult {
    let css = ".a{color:red}";
    assert!(CssMinifier.apply("a.css", css.as_bytes())?.len() <= css.len());
    let js = "f(1);";
    assert!(JsMinifier.apply("a.js", js.as_bytes())?.len() <= js.len());
    Ok(())
}

#[test]
fn style_variables_are_substituted_and_removed() -> TestResult {
    let input = "$gap: 4px;\n$wide: $gap;\n.a { margin: $gap $wide; }\n";
    let out = text(StyleVariables.apply("a.css", input.as_bytes())?);
    assert_eq!(out, ".a { margin: 4px 4px; }\n");
    Ok(())
}

#[test]
fn undefined_style_variable_is_a_transform_error() {
    let err = StyleVariables.apply("a.css", b".a { color: $nope; }").unwrap_err();
    assert!(matches!(err, BuildError::Transform { .. }), "{err:?}");
    assert!(err.to_string().contains("$nope"), "{err}");
}

#[test]
fn css_linter_reports_lines() -> TestResult {
    let findings = CssLinter.lint("a.css", b".a { color: red !important; }\n.b {}\n")?;
    let lines: Vec<_> = findings.iter().map(|f| f.line).collect();
    assert_eq!(lines, vec![Some(1), Some(2)]);
    Ok(())
}

#[test]
fn js_linter_flags_debugger_eval_and_loose_equality() -> TestResult {
    let src = "debugger;\nif (a == b) {}\neval('x');\nif (a === b) {}\n";
    let findings = JsLinter.lint("a.js", src.as_bytes())?;
    let lines: Vec<_> = findings.iter().filter_map(|f| f.line).collect();
    assert_eq!(lines, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn concat_joins_in_order_under_the_target_name() -> TestResult {
    let chain = Chain {
        stages: vec![Stage::Concat("main.js".to_string())],
        minify: None,
    };
    let out = chain.apply(vec![asset("a.js", "A"), asset("sub/b.js", "B")], &Diagnostics::new())?;

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].path, "main.js");
    assert_eq!(out[0].contents, b"A\nB");
    assert_eq!(out[0].sources.len(), 2);
    Ok(())
}

#[test]
fn flatten_drops_directories() -> TestResult {
    let chain = Chain {
        stages: vec![Stage::Flatten],
        minify: None,
    };
    let out = chain.apply(vec![asset("layouts/deep/base.twig", "x")], &Diagnostics::new())?;
    assert_eq!(out[0].path, "base.twig");
    assert_eq!(chain.output_path("pages/page.php"), "page.php");
    Ok(())
}

#[test]
fn lint_findings_are_collected_but_never_fatal() -> TestResult {
    let diagnostics = Diagnostics::new();
    let chain = Chain {
        stages: vec![
            Stage::Lint {
                linter: Arc::new(CssLinter),
                skip: Some(compile_globs("test", &["defaults.css".to_string()])?),
            },
            Stage::Concat("main.css".to_string()),
        ],
        minify: None,
    };

    let out = chain.apply(
        vec![
            asset("defaults.css", ".x { a: b !important; }"),
            asset("site.css", ".y { a: b !important; }"),
        ],
        &diagnostics,
    )?;

    assert_eq!(out.len(), 1);
    let findings = diagnostics.findings();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].path, "site.css");
    Ok(())
}

#[test]
fn failing_transform_aborts_the_chain() {
    let chain = Chain {
        stages: vec![Stage::Transform(Arc::new(StyleVariables))],
        minify: None,
    };
    let err = chain
        .apply(vec![asset("a.css", "a { b: $c; }")], &Diagnostics::new())
        .unwrap_err();
    assert!(matches!(err, BuildError::Transform { .. }));
}

#[test]
fn minify_emits_min_artifact_and_source_map() -> TestResult {
    let chain = Chain {
        stages: vec![Stage::Concat("main.css".to_string())],
        minify: Some(MinifyStep {
            minifier: Arc::new(CssMinifier),
            sourcemap: true,
        }),
    };
    let full = asset("main.css", "body {\n  color: red;\n}\n");
    let out = chain.minify(&full, &["assets/css/base.css".to_string()])?;

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].path, "main.min.css");
    assert_eq!(out[1].path, "main.min.css.map");

    let min = text(out[0].contents.clone());
    assert!(min.starts_with("body{color: red;}"));
    assert!(min.ends_with("/*# sourceMappingURL=main.min.css.map */"));

    let map: serde_json::Value = serde_json::from_slice(&out[1].contents)?;
    assert_eq!(map["version"], 3);
    assert_eq!(map["file"], "main.min.css");
    assert_eq!(map["sources"][0], "assets/css/base.css");
    Ok(())
}

#[test]
fn min_path_inserts_before_the_extension() {
    assert_eq!(min_path("css/main.css"), "css/main.min.css");
    assert_eq!(min_path("lib.js"), "lib.min.js");
    assert_eq!(min_path("noext"), "noext.min");
}

#[cfg(unix)]
mod external {
    use super::*;
    use themeforge::transform::external::ExternalCommand;

    #[test]
    fn pipes_content_through_the_command() -> TestResult {
        let upper = ExternalCommand::new("upper", "tr a-z A-Z");
        assert_eq!(upper.apply("a.css", b"abc")?, b"ABC");
        Ok(())
    }

    #[test]
    fn exposes_the_asset_path() -> TestResult {
        let echo = ExternalCommand::new("echo", "printf %s \"$THEMEFORGE_ASSET\"");
        assert_eq!(echo.apply("css/a.css", b"")?, b"css/a.css");
        Ok(())
    }

    #[test]
    fn non_zero_exit_is_an_external_process_error() {
        let failing = ExternalCommand::new("fail", "echo oops >&2; exit 3");
        match failing.apply("a.css", b"x").unwrap_err() {
            BuildError::ExternalProcess { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected ExternalProcess, got {other:?}"),
        }
    }

    #[test]
    fn lint_command_output_becomes_findings() -> TestResult {
        let lint = ExternalCommand::new("lint", "cat >/dev/null; echo 'bad thing'; exit 1");
        let findings = Linter::lint(&lint, "a.js", b"x")?;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "bad thing");

        let clean = ExternalCommand::new("lint", "cat >/dev/null");
        assert!(Linter::lint(&clean, "a.js", b"x")?.is_empty());
        Ok(())
    }
}
