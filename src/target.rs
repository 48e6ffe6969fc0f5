use std::path::{Path, PathBuf};

use crate::content::classify;

/// A matched local file with its derived remote key and content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub target: String,
    pub content_type: String,
}

impl FileEntry {
    pub fn new(path: PathBuf, target_prefix: &str, strip_prefix: &str) -> Self {
        let target = resolve_target(&path, target_prefix, strip_prefix);
        let content_type = classify(&path);
        Self {
            path,
            target,
            content_type,
        }
    }
}

/// Strip one leading `/` from the target prefix. Done once per run.
pub fn normalize_prefix(target_prefix: &str) -> &str {
    target_prefix.strip_prefix('/').unwrap_or(target_prefix)
}

/// Build the object key for `local_path`.
///
/// `strip_prefix` is removed literally when present, the rest is joined under
/// `target_prefix` with `.`/`..` segments and repeated separators collapsed.
/// The key never starts with `/`.
pub fn resolve_target(local_path: &Path, target_prefix: &str, strip_prefix: &str) -> String {
    let local = to_key_path(local_path);
    let relative = local.strip_prefix(strip_prefix).unwrap_or(local.as_str());

    let mut segments: Vec<&str> = Vec::new();
    for segment in target_prefix.split('/').chain(relative.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(last) if *last != "..") {
                    segments.pop();
                } else {
                    segments.push(segment);
                }
            }
            _ => segments.push(segment),
        }
    }

    segments.join("/")
}

/// Object keys always use `/`, whatever the local separator is.
fn to_key_path(path: &Path) -> String {
    let path = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        path.into_owned()
    } else {
        path.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str, prefix: &str, strip: &str) -> String {
        resolve_target(Path::new(path), prefix, strip)
    }

    #[test]
    fn test_strip_and_join() {
        assert_eq!(key("build/app.js", "releases/v1", "build/"), "releases/v1/app.js");
        assert_eq!(
            key("build/img/logo.png", "releases/v1", "build/"),
            "releases/v1/img/logo.png"
        );
    }

    #[test]
    fn test_absent_strip_prefix_is_noop() {
        assert_eq!(key("dist/app.js", "releases", "build/"), "releases/dist/app.js");
        assert_eq!(key("dist/app.js", "", ""), "dist/app.js");
    }

    #[test]
    fn test_strip_without_trailing_slash_never_yields_leading_slash() {
        assert_eq!(key("build/app.js", "", "build"), "app.js");
        assert_eq!(key("build/app.js", "assets", "build"), "assets/app.js");
    }

    #[test]
    fn test_doubled_separators_collapse() {
        assert_eq!(key("build//css/site.css", "static//", "build/"), "static/css/site.css");
        assert_eq!(key("/abs/path/file.txt", "", ""), "abs/path/file.txt");
    }

    #[test]
    fn test_dot_segments() {
        assert_eq!(key("./build/app.js", "a/./b", "./build/"), "a/b/app.js");
        assert_eq!(key("build/../other/x.txt", "root", ""), "root/other/x.txt");
    }

    #[test]
    fn test_normalize_prefix_strips_once() {
        assert_eq!(normalize_prefix("/releases/v1"), "releases/v1");
        assert_eq!(normalize_prefix("//releases"), "/releases");
        assert_eq!(normalize_prefix("releases"), "releases");
        assert_eq!(normalize_prefix(""), "");
    }

    #[test]
    fn test_file_entry() {
        let entry = FileEntry::new(PathBuf::from("build/index.html"), "site", "build/");
        assert_eq!(entry.target, "site/index.html");
        assert!(entry.content_type.starts_with("text/html"));
    }
}
