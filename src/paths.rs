//! Path normalization for module specifiers
//!
//! Turns file-system paths into forward-slash module specifiers: recognized
//! source extensions are stripped and a trailing `/index` segment collapses to
//! its directory. Normalization runs to a fixpoint, so it is idempotent.

use std::path::{Component, Path, PathBuf};

/// Source extensions stripped from specifiers, longest first
pub const SOURCE_EXTENSIONS: &[&str] = &[
    ".d.mts", ".d.cts", ".d.ts", ".tsx", ".mts", ".cts", ".jsx", ".mjs", ".cjs", ".ts", ".js",
];

/// Normalize a path into a module specifier
///
/// - `\local\some\file` => `/local/some/file`
/// - `some\file.ts` => `some/file`
/// - `./component/x/index` => `./component/x`
pub fn unixify(path: &str) -> String {
    let mut current = path.replace('\\', "/");

    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(path: &str) -> String {
    if let Some(stripped) = strip_source_extension(path) {
        return stripped.to_string();
    }

    if let Some(parent) = path.strip_suffix("/index") {
        if !parent.is_empty() {
            return parent.to_string();
        }
    }

    path.to_string()
}

/// Strip one recognized extension, keeping at least one character of file name
fn strip_source_extension(path: &str) -> Option<&str> {
    SOURCE_EXTENSIONS.iter().find_map(|ext| {
        let stem = path.strip_suffix(ext)?;
        if stem.is_empty() || stem.ends_with('/') {
            None
        } else {
            Some(stem)
        }
    })
}

/// Check whether a path has one of the recognized source extensions
pub fn is_source_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| strip_source_extension(name).is_some())
        .unwrap_or(false)
}

/// Resolve `.` and `..` components without touching the file system
pub fn lexical_normalize(path: &Path) -> PathBuf {
    path.components()
        .fold(PathBuf::new(), |mut acc, component| {
            match component {
                Component::CurDir => acc,
                Component::ParentDir => {
                    acc.pop();
                    acc
                }
                _ => {
                    acc.push(component);
                    acc
                }
            }
        })
}

/// Relative module path from a directory to a target, always `./` or `../` prefixed
pub fn relative_specifier(from_dir: &Path, to: &Path) -> String {
    let from_dir = lexical_normalize(from_dir);
    let to = lexical_normalize(to);

    let mut base = from_dir.components().peekable();
    let mut target = to.components().peekable();

    // Skip common prefix
    while let (Some(a), Some(b)) = (base.peek(), target.peek()) {
        if a != b {
            break;
        }
        base.next();
        target.next();
    }

    let mut parts: Vec<String> = base.map(|_| "..".to_string()).collect();
    parts.extend(target.map(|c| c.as_os_str().to_string_lossy().into_owned()));

    if parts.is_empty() {
        return ".".to_string();
    }

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}

/// Module specifier for a project file, as written in an import statement
///
/// Relative to the importing file when both paths are absolute; otherwise the
/// normalized path itself, `./`-prefixed unless already relative or rooted.
pub fn module_specifier_for(filepath: &str, current_file: Option<&Path>) -> String {
    let normalized = unixify(filepath);

    if let Some(current) = current_file {
        let target = Path::new(&normalized);
        if target.is_absolute() && current.is_absolute() {
            if let Some(dir) = current.parent() {
                return unixify(&relative_specifier(dir, target));
            }
        }
    }

    if normalized.starts_with('.') || normalized.starts_with('/') {
        normalized
    } else {
        format!("./{}", normalized)
    }
}

/// Find the nearest directory at or above `start` containing a package.json
pub fn find_import_root(start: &Path) -> Option<PathBuf> {
    let mut current = if start.is_file() { start.parent()? } else { start };

    loop {
        if current.join("package.json").is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_unixify_backslashes() {
        assert_eq!(unixify("\\local\\some\\file"), "/local/some/file");
    }

    #[test]
    fn test_unixify_strips_extensions() {
        assert_eq!(unixify("some\\file.ts"), "some/file");
        assert_eq!(unixify("d/file.tsx"), "d/file");
        assert_eq!(unixify("some\\file.js"), "some/file");
        assert_eq!(unixify("types/lib.d.ts"), "types/lib");
        assert_eq!(unixify("a/b.jsx"), "a/b");
    }

    #[test]
    fn test_unixify_collapses_index() {
        assert_eq!(unixify("./component/x/index"), "./component/x");
        assert_eq!(unixify("/app/components/index.ts"), "/app/components");
        assert_eq!(unixify("index.ts"), "index");
    }

    #[test]
    fn test_unixify_leaves_other_extensions() {
        assert_eq!(unixify("styles/app.css"), "styles/app.css");
        assert_eq!(unixify("dir/.ts"), "dir/.ts");
    }

    #[test]
    fn test_unixify_idempotent() {
        let samples = [
            "",
            "a",
            "./a/index",
            "a\\index\\index.ts",
            "x.ts.ts",
            "/abs/path/file.d.ts",
            "pkg/index.js/index",
            "weird/.js",
            "../up/index.tsx",
        ];

        for sample in samples {
            let once = unixify(sample);
            assert_eq!(unixify(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_is_source_file() {
        assert!(is_source_file(Path::new("src/app.ts")));
        assert!(is_source_file(Path::new("src/app.d.ts")));
        assert!(is_source_file(Path::new("App.jsx")));
        assert!(!is_source_file(Path::new("README.md")));
        assert!(!is_source_file(Path::new("src/.ts")));
    }

    #[test]
    fn test_relative_specifier() {
        assert_eq!(
            relative_specifier(Path::new("/p/src/app"), Path::new("/p/src/lib/util")),
            "../lib/util"
        );
        assert_eq!(
            relative_specifier(Path::new("/p/src"), Path::new("/p/src/util")),
            "./util"
        );
        assert_eq!(relative_specifier(Path::new("/p/src"), Path::new("/p/src")), ".");
    }

    #[test]
    fn test_module_specifier_without_current_file() {
        assert_eq!(module_specifier_for("side/effect", None), "./side/effect");
        assert_eq!(module_specifier_for("dinah_widdoes", None), "./dinah_widdoes");
        assert_eq!(module_specifier_for("./component/x/index", None), "./component/x");
        assert_eq!(module_specifier_for("../up/x.ts", None), "../up/x");
    }

    #[test]
    fn test_module_specifier_relative_to_current_file() {
        let current = Path::new("/p/src/pages/home.tsx");
        assert_eq!(
            module_specifier_for("/p/src/components/button", Some(current)),
            "../components/button"
        );
        assert_eq!(
            module_specifier_for("/p/src/pages/widgets/index.ts", Some(current)),
            "./widgets"
        );
    }

    #[test]
    fn test_find_import_root() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("src/app");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join("package.json"), "{}").unwrap();

        let found = find_import_root(&nested);
        assert_eq!(found, Some(temp.path().to_path_buf()));
    }
}
