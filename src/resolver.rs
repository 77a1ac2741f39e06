//! Package entry-point resolution
//!
//! Finds the file whose exports represent a dependency package. The default
//! chain reads the package's own package.json first and only falls back to
//! asking `node` (`require.resolve`) when that fails.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Extensions probed when an entry path is written without one
const PROBE_EXTENSIONS: &[&str] = &[".d.ts", ".ts", ".tsx", ".mjs", ".js", ".cjs", ".jsx"];

/// package.json fields that may name the entry file, in priority order
const ENTRY_FIELDS: &[&str] = &["types", "typings", "module", "es2015", "main"];

const NODE_RESOLVE_SCRIPT: &str = "process.stdout.write(require.resolve(process.argv[1]))";

/// A dependency package on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    /// Package name as written in import statements (`@angular/core`)
    pub name: String,
    /// Package directory (`node_modules/@angular/core`)
    pub dir: PathBuf,
}

impl PackageRef {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }

    /// Package living under `<project_root>/node_modules`
    pub fn in_node_modules(project_root: &Path, name: &str) -> Self {
        Self::new(name, project_root.join("node_modules").join(name))
    }
}

/// Strategy for locating a package's entry file
pub trait EntryResolver: Send + Sync {
    /// Entry file of `package`, or None if it cannot be determined
    fn resolve(&self, package: &PackageRef, project_root: &Path) -> Option<PathBuf>;

    fn name(&self) -> &'static str;
}

/// Resolves entry points from the package's package.json fields
#[derive(Debug, Clone, Default)]
pub struct PackageJsonResolver;

impl PackageJsonResolver {
    pub fn new() -> Self {
        Self
    }
}

impl EntryResolver for PackageJsonResolver {
    fn resolve(&self, package: &PackageRef, _project_root: &Path) -> Option<PathBuf> {
        resolve_package_dir(&package.dir)
    }

    fn name(&self) -> &'static str {
        "package.json"
    }
}

/// Entry file of a package directory from its package.json, or an `index.*` file
pub fn resolve_package_dir(dir: &Path) -> Option<PathBuf> {
    let manifest_path = dir.join("package.json");
    if let Ok(content) = std::fs::read_to_string(&manifest_path) {
        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(manifest) => {
                for field in ENTRY_FIELDS {
                    let Some(value) = manifest.get(*field).and_then(|v| v.as_str()) else {
                        continue;
                    };
                    if let Some(entry) = probe_entry(&dir.join(value)) {
                        log::trace!("{}: entry from '{}' => {}", dir.display(), field, entry.display());
                        return Some(entry);
                    }
                    log::debug!("{}: '{}' points at missing {}", dir.display(), field, value);
                }
            }
            Err(e) => {
                log::debug!("Invalid {}: {}", manifest_path.display(), e);
            }
        }
    }

    probe_index(dir)
}

/// Resolve a module path the way bundlers do: exact file, added extension, directory index
pub fn probe_entry(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }

    let raw = path.to_string_lossy();
    for ext in PROBE_EXTENSIONS {
        let candidate = PathBuf::from(format!("{}{}", raw, ext));
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if path.is_dir() {
        return probe_index(path);
    }

    None
}

fn probe_index(dir: &Path) -> Option<PathBuf> {
    PROBE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("index{}", ext)))
        .find(|candidate| candidate.is_file())
}

/// Resolves entry points by running `node -e "require.resolve(...)"`
///
/// The process runs in the project root so node's own lookup rules apply. It is
/// killed after `timeout`; a timeout or failed exit means "no resolution".
#[derive(Debug, Clone)]
pub struct NodeProcessResolver {
    command: Vec<String>,
    timeout: Duration,
}

impl NodeProcessResolver {
    /// `command` is the program plus leading arguments (`["node"]`)
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    fn run(&self, package: &str, project_root: &Path) -> std::io::Result<Option<String>> {
        let Some((program, args)) = self.command.split_first() else {
            return Ok(None);
        };

        let mut child = Command::new(program)
            .args(args)
            .arg("-e")
            .arg(NODE_RESOLVE_SCRIPT)
            .arg(package)
            .current_dir(project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        match child.wait_timeout(self.timeout)? {
            Some(status) if status.success() => {
                let mut out = String::new();
                if let Some(mut stdout) = child.stdout.take() {
                    stdout.read_to_string(&mut out)?;
                }
                Ok(Some(out.trim().to_string()))
            }
            Some(status) => {
                log::debug!("{} could not resolve {} ({})", program, package, status);
                Ok(None)
            }
            None => {
                let _ = child.kill();
                let _ = child.wait();
                log::warn!("Resolving {} timed out after {:?}", package, self.timeout);
                Ok(None)
            }
        }
    }
}

impl Default for NodeProcessResolver {
    fn default() -> Self {
        Self::new(vec!["node".to_string()], Duration::from_millis(5000))
    }
}

impl EntryResolver for NodeProcessResolver {
    fn resolve(&self, package: &PackageRef, project_root: &Path) -> Option<PathBuf> {
        match self.run(&package.name, project_root) {
            Ok(Some(resolved)) if !resolved.is_empty() => {
                let path = PathBuf::from(resolved);
                path.is_file().then_some(path)
            }
            Ok(_) => None,
            Err(e) => {
                log::debug!("Failed to run resolver for {}: {}", package.name, e);
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "node"
    }
}

/// Tries each resolver in order
pub struct ChainResolver {
    resolvers: Vec<Box<dyn EntryResolver>>,
}

impl ChainResolver {
    pub fn new(resolvers: Vec<Box<dyn EntryResolver>>) -> Self {
        Self { resolvers }
    }

    /// package.json fields first, then the external `node` process
    pub fn with_node(command: Vec<String>, timeout: Duration) -> Self {
        Self::new(vec![
            Box::new(PackageJsonResolver::new()),
            Box::new(NodeProcessResolver::new(command, timeout)),
        ])
    }
}

impl Default for ChainResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(PackageJsonResolver::new()),
            Box::new(NodeProcessResolver::default()),
        ])
    }
}

impl EntryResolver for ChainResolver {
    fn resolve(&self, package: &PackageRef, project_root: &Path) -> Option<PathBuf> {
        self.resolvers.iter().find_map(|resolver| {
            let resolved = resolver.resolve(package, project_root);
            if resolved.is_none() {
                log::trace!("{} resolver found no entry for {}", resolver.name(), package.name);
            }
            resolved
        })
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_types_field_wins_over_main() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("node_modules/lib");
        write(&dir.join("package.json"), r#"{ "main": "dist/index.js", "types": "dist/index.d.ts" }"#);
        write(&dir.join("dist/index.js"), "");
        write(&dir.join("dist/index.d.ts"), "");

        let package = PackageRef::in_node_modules(temp.path(), "lib");
        let entry = PackageJsonResolver::new().resolve(&package, temp.path());
        assert_eq!(entry, Some(dir.join("dist/index.d.ts")));
    }

    #[test]
    fn test_missing_field_target_falls_through() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("pkg");
        write(&dir.join("package.json"), r#"{ "types": "missing.d.ts", "main": "lib/main" }"#);
        write(&dir.join("lib/main.js"), "");

        assert_eq!(resolve_package_dir(&dir), Some(dir.join("lib/main.js")));
    }

    #[test]
    fn test_directory_entry_and_index_probe() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("pkg");
        write(&dir.join("package.json"), r#"{ "module": "./esm" }"#);
        write(&dir.join("esm/index.mjs"), "");
        assert_eq!(resolve_package_dir(&dir), Some(dir.join("esm/index.mjs")));

        let bare = temp.path().join("bare");
        write(&bare.join("index.d.ts"), "");
        assert_eq!(resolve_package_dir(&bare), Some(bare.join("index.d.ts")));
    }

    #[test]
    fn test_unresolvable_package() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("empty");
        write(&dir.join("package.json"), "{ invalid json");
        assert_eq!(resolve_package_dir(&dir), None);
    }

    #[test]
    fn test_node_resolver_missing_program() {
        let temp = TempDir::new().unwrap();
        let resolver = NodeProcessResolver::new(
            vec!["definitely-not-a-real-program-imph".to_string()],
            Duration::from_millis(500),
        );
        let package = PackageRef::in_node_modules(temp.path(), "react");
        assert_eq!(resolver.resolve(&package, temp.path()), None);
    }

    #[test]
    fn test_chain_uses_first_success() {
        struct Fixed(Option<PathBuf>);
        impl EntryResolver for Fixed {
            fn resolve(&self, _: &PackageRef, _: &Path) -> Option<PathBuf> {
                self.0.clone()
            }
            fn name(&self) -> &'static str {
                "fixed"
            }
        }

        let chain = ChainResolver::new(vec![
            Box::new(Fixed(None)),
            Box::new(Fixed(Some(PathBuf::from("/second")))),
            Box::new(Fixed(Some(PathBuf::from("/third")))),
        ]);
        let package = PackageRef::new("x", "/nowhere");
        assert_eq!(chain.resolve(&package, Path::new("/")), Some(PathBuf::from("/second")));
    }
}
