// src/assets/discover.rs

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::assets::{AssetClass, SourceFile};
use crate::errors::Result;
use crate::fs::FileSystem;

/// Find the source files of `class` under `src_root`.
///
/// Files come back in discovery order: grouped by the first glob they match
/// (in declaration order), and within a group in a depth-first walk with
/// directory entries sorted by name. A missing base directory yields no
/// files; symlinked directories are not entered.
pub fn discover(fs: &dyn FileSystem, src_root: &Path, class: &AssetClass) -> Result<Vec<SourceFile>> {
    let base = if class.base.is_empty() {
        src_root.to_path_buf()
    } else {
        src_root.join(&class.base)
    };

    if class.globs.is_empty() || !fs.is_dir(&base) {
        trace!(class = %class.name, ?base, "base directory missing; nothing to discover");
        return Ok(Vec::new());
    }

    let mut walked = Vec::new();
    walk_sorted(fs, &base, &mut walked)?;

    let mut ranked: Vec<(usize, SourceFile)> = walked
        .into_iter()
        .filter_map(|path| {
            let rel = relative_slash(&base, &path)?;
            if !class.matches(&rel) {
                return None;
            }
            let rank = class.glob_rank(&rel)?;
            Some((
                rank,
                SourceFile {
                    path,
                    rel,
                    kind: class.kind,
                },
            ))
        })
        .collect();

    // Stable: keeps walk order inside each glob group.
    ranked.sort_by_key(|(rank, _)| *rank);

    Ok(ranked.into_iter().map(|(_, file)| file).collect())
}

fn walk_sorted(fs: &dyn FileSystem, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs.read_dir(dir)?;
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    for entry in entries {
        if fs.is_dir(&entry) {
            // Linked directories can loop back into the tree.
            if fs.is_symlink(&entry) {
                trace!(dir = ?entry, "skipping symlinked directory");
                continue;
            }
            walk_sorted(fs, &entry, out)?;
        } else if fs.is_file(&entry) {
            out.push(entry);
        }
    }
    Ok(())
}

/// `path` relative to `root` with forward slashes.
pub fn relative_slash(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}
