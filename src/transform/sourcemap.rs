// src/transform/sourcemap.rs

//! Minimal v3 source maps for minified artifacts.
//!
//! The maps list the original sources of a concatenated output but carry no
//! segment mappings; that is enough for browser dev tools to show where an
//! artifact came from.

use serde_json::json;

/// Source map document for `file`, built from `sources`.
pub fn source_map(file: &str, sources: &[String]) -> String {
    json!({
        "version": 3,
        "file": file,
        "sources": sources,
        "names": [],
        "mappings": "",
    })
    .to_string()
}

/// Trailer linking an artifact to its map, in the artifact's comment syntax.
pub fn url_comment(artifact_path: &str, map_name: &str) -> String {
    if artifact_path.ends_with(".css") {
        format!("\n/*# sourceMappingURL={map_name} */")
    } else {
        format!("\n//# sourceMappingURL={map_name}")
    }
}
