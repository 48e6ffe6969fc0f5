//! Glob expansion with `*`, `?`, `[..]`, `{a,b}` and recursive `**`.
//!
//! `*` never crosses a `/`; `**` spans any number of directories, including none.
//! Expansion walks the literal base directory of a pattern in file-name order, so results
//! are deterministic and free of duplicates.

use globset::{GlobBuilder, GlobMatcher};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{DeployError, Result};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Expand `include` and drop everything matched by any of `excludes`.
///
/// Order of the include expansion is preserved.
pub fn resolve(include: &str, excludes: &[String]) -> Result<Vec<PathBuf>> {
    let matches = expand(include)?;
    if excludes.is_empty() {
        return Ok(matches);
    }

    let mut excluded = HashSet::new();
    for pattern in excludes {
        excluded.extend(expand(pattern)?.iter().map(|p| normalize(p)));
    }

    debug!(
        included = matches.len(),
        excluded = excluded.len(),
        "applying exclude patterns"
    );

    Ok(matches
        .into_iter()
        .filter(|path| !excluded.contains(&normalize(path)))
        .collect())
}

/// Drop `.` components so `./build/a.js` and `build/a.js` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Expand a single pattern against the local filesystem.
///
/// A pattern that matches nothing yields an empty list.
pub fn expand(pattern: &str) -> Result<Vec<PathBuf>> {
    let (base, rest) = split_base(pattern);

    if rest.is_empty() {
        // no wildcards: the pattern names one path
        let path = PathBuf::from(pattern);
        return Ok(if path.symlink_metadata().is_ok() {
            vec![path]
        } else {
            Vec::new()
        });
    }

    let matcher = compile(pattern)?;
    let walk_root = if base.is_empty() { "." } else { base.as_str() };
    if !Path::new(walk_root).exists() {
        return Ok(Vec::new());
    }

    let mut walker = WalkDir::new(walk_root).sort_by_file_name();
    if let Some(depth) = max_depth(&rest) {
        walker = walker.max_depth(depth);
    }

    let mut seen = HashSet::new();
    let mut matches = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| DeployError::pattern(pattern, e))?;
        let path = if base.is_empty() {
            // keep paths relative the way the pattern was written ("a.js", not "./a.js")
            match entry.path().strip_prefix(".") {
                Ok(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => continue,
            }
        } else {
            entry.into_path()
        };

        if matcher.is_match(&path) && seen.insert(path.clone()) {
            matches.push(path);
        }
    }

    Ok(matches)
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| DeployError::pattern(pattern, e))
}

/// Split a pattern into its literal leading directories and the wildcard remainder.
fn split_base(pattern: &str) -> (String, Vec<&str>) {
    let components: Vec<&str> = pattern.split('/').collect();
    let first_meta = components
        .iter()
        .position(|c| c.contains(GLOB_META))
        .unwrap_or(components.len());

    let base = components[..first_meta].join("/");
    let base = if base.is_empty() && pattern.starts_with('/') {
        "/".to_string()
    } else {
        base
    };

    (base, components[first_meta..].to_vec())
}

/// Bound the walk when the remainder cannot descend arbitrarily deep.
fn max_depth(rest: &[&str]) -> Option<usize> {
    if rest.iter().any(|c| c.contains("**") || c.contains('{')) {
        None
    } else {
        Some(rest.len())
    }
}
