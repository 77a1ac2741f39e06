//! Exclusion patterns for indexing
//!
//! A pattern containing `*` is a glob (globset semantics) tested against the
//! full path, every ancestor of it and the final segment. Any other pattern is
//! a plain path-segment match: `dir1` excludes `dir1/file1.ts`, and a pattern
//! with slashes must match a run of whole segments.
//!
//! Under a project root only the part of the path below the root is matched,
//! except for globs that are themselves absolute.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Compiled set of exclusion patterns for one project root
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    globs: GlobSet,
    glob_count: usize,
    absolute_globs: GlobSet,
    absolute_count: usize,
    segments: Vec<String>,
}

impl ExclusionMatcher {
    /// Compile a pattern list; invalid globs are logged and ignored
    pub fn new(patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut glob_count = 0;
        let mut absolute_builder = GlobSetBuilder::new();
        let mut absolute_count = 0;
        let mut segments = Vec::new();

        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }

            if pattern.contains('*') {
                match Glob::new(pattern) {
                    Ok(glob) if is_absolute_pattern(pattern) => {
                        absolute_builder.add(glob);
                        absolute_count += 1;
                    }
                    Ok(glob) => {
                        builder.add(glob);
                        glob_count += 1;
                    }
                    Err(e) => {
                        log::warn!("Ignoring invalid exclude pattern '{}': {}", pattern, e);
                    }
                }
            } else {
                segments.push(pattern.replace('\\', "/").trim_matches('/').to_string());
            }
        }

        Self {
            globs: compile(builder),
            glob_count,
            absolute_globs: compile(absolute_builder),
            absolute_count,
            segments,
        }
    }

    /// A matcher that never excludes anything
    pub fn empty() -> Self {
        Self::new(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.glob_count == 0 && self.absolute_count == 0 && self.segments.is_empty()
    }

    /// Check a path against all patterns
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.is_empty() {
            return false;
        }

        let path_str = unix_string(path);
        self.matches_segments(&path_str)
            || matches_glob_set(&self.globs, self.glob_count, &path_str)
            || matches_glob_set(&self.absolute_globs, self.absolute_count, &path_str)
    }

    /// Check a path below its project root
    ///
    /// Segments and relative globs only see the part of `path` under `root`, so
    /// the directories the project itself lives in never exclude it. Paths
    /// outside `root` are checked as given.
    pub fn is_excluded_under(&self, root: &Path, path: &Path) -> bool {
        if self.is_empty() {
            return false;
        }

        let relative = match path.strip_prefix(root) {
            Ok(relative) => relative,
            Err(_) => return self.is_excluded(path),
        };

        if matches_glob_set(&self.absolute_globs, self.absolute_count, &unix_string(path)) {
            return true;
        }
        if relative.as_os_str().is_empty() {
            return false;
        }

        let relative = unix_string(relative);
        self.matches_segments(&relative) || matches_glob_set(&self.globs, self.glob_count, &relative)
    }

    fn matches_segments(&self, path: &str) -> bool {
        if self.segments.is_empty() {
            return false;
        }

        let wrapped = format!("/{}/", path.trim_matches('/'));
        self.segments.iter().any(|segment| {
            if segment.is_empty() {
                return false;
            }
            wrapped.contains(&format!("/{}/", segment))
        })
    }
}

impl Default for ExclusionMatcher {
    fn default() -> Self {
        Self::empty()
    }
}

fn compile(builder: GlobSetBuilder) -> GlobSet {
    builder.build().unwrap_or_else(|e| {
        log::warn!("Failed to compile exclude patterns: {}", e);
        GlobSet::empty()
    })
}

fn unix_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// `/abs/**/gen` or `C:/work/**`
fn is_absolute_pattern(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    pattern.starts_with('/')
        || (bytes.len() > 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && matches!(bytes[2], b'/' | b'\\'))
}

fn matches_glob_set(globs: &GlobSet, count: usize, path: &str) -> bool {
    if count == 0 {
        return false;
    }

    if globs.is_match(path) {
        return true;
    }

    // Ancestors: `**/volumes` must exclude everything below a volumes dir
    let mut prefix_end = 0;
    while let Some(offset) = path[prefix_end..].find('/') {
        let end = prefix_end + offset;
        if end > 0 && globs.is_match(&path[..end]) {
            return true;
        }
        prefix_end = end + 1;
    }

    // Final segment: `*.spec.ts` written as a bare file-name glob
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != path => globs.is_match(name),
        _ => false,
    }
}

/// Convenience wrapper: compile `patterns` and test `path`
pub fn is_excluded(path: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    ExclusionMatcher::new(patterns).is_excluded(Path::new(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_glob_against_full_path() {
        assert!(is_excluded("dir/file1.ts", &patterns(&["*.ts"])));
        assert!(!is_excluded("dir/file1.js", &patterns(&["*.ts"])));
    }

    #[test]
    fn test_plain_pattern_as_segment() {
        assert!(is_excluded("dir1/file1.ts", &patterns(&["dir1"])));
        assert!(is_excluded("/abs/dir1/sub/file1.ts", &patterns(&["dir1"])));
        // Plain patterns are whole segments, not substrings
        assert!(!is_excluded("dir10/file1.ts", &patterns(&["dir1"])));
    }

    #[test]
    fn test_plain_pattern_matches_file_name() {
        let list = patterns(&["dummy.component.ts"]);
        assert!(is_excluded("/p/app/t2/dummy.component.ts", &list));
        assert!(!is_excluded("/p/app/t2/real.component.ts", &list));
    }

    #[test]
    fn test_plain_pattern_with_slashes() {
        let list = patterns(&["src/generated"]);
        assert!(is_excluded("/p/src/generated/api.ts", &list));
        assert!(!is_excluded("/p/src/generated_api.ts", &list));
    }

    #[test]
    fn test_double_star_directory_glob() {
        let list = patterns(&["**/volumes"]);
        assert!(is_excluded("/p/app/t1/volumes/volume.ts", &list));
        assert!(is_excluded("/p/app/t1/volumes", &list));
        assert!(!is_excluded("/p/app/t1/test.ts", &list));
    }

    #[test]
    fn test_empty_patterns_never_exclude() {
        assert!(!is_excluded("anything/at/all.ts", &[]));
        assert!(!is_excluded("anything/at/all.ts", &patterns(&["", "  "])));
    }

    #[test]
    fn test_invalid_glob_is_ignored() {
        let matcher = ExclusionMatcher::new(&patterns(&["[*", "dir1"]));
        assert!(matcher.is_excluded(Path::new("dir1/a.ts")));
        assert!(!matcher.is_excluded(Path::new("dir2/a.ts")));
    }

    #[test]
    fn test_relative_glob_under_root() {
        let matcher = ExclusionMatcher::new(&patterns(&["src/**/*.spec.ts"]));
        let root = Path::new("/project");
        assert!(matcher.is_excluded_under(root, Path::new("/project/src/app/a.spec.ts")));
        assert!(!matcher.is_excluded_under(root, Path::new("/project/src/app/a.ts")));
    }

    #[test]
    fn test_directories_above_root_do_not_exclude() {
        let matcher = ExclusionMatcher::new(&patterns(&["build", "tmp", "**/home/**"]));
        let root = Path::new("/home/u/tmp/build/app");
        assert!(!matcher.is_excluded_under(root, Path::new("/home/u/tmp/build/app/src/a.ts")));
        assert!(!matcher.is_excluded_under(root, root));
        assert!(matcher.is_excluded_under(root, Path::new("/home/u/tmp/build/app/build/out.js")));
    }

    #[test]
    fn test_absolute_glob_sees_full_path() {
        let matcher = ExclusionMatcher::new(&patterns(&["/work/**/generated/**"]));
        let root = Path::new("/work/app");
        assert!(matcher.is_excluded_under(root, Path::new("/work/app/src/generated/api.ts")));
        assert!(!matcher.is_excluded_under(root, Path::new("/work/app/src/api.ts")));
    }
}
