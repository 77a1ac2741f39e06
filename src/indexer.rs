//! Module index builder
//!
//! Scans project trees and dependency packages, parses each file's exports
//! with Tree-sitter and assembles an immutable [`Catalog`] of importable
//! symbols. Per-file and per-package failures are logged and recorded in the
//! catalog statistics; only a missing project root fails the whole pass.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

use crate::config::ExclusionConfig;
use crate::exclusion::ExclusionMatcher;
use crate::models::{Catalog, IndexStats, PackageEntry, SkippedFile, SourceEntry};
use crate::parsers::exports::{camel_case, parse_exports, ExportedSymbol};
use crate::paths::{is_source_file, lexical_normalize, unixify};
use crate::resolver::{probe_entry, resolve_package_dir, ChainResolver, EntryResolver, PackageRef};

/// Maximum depth of `export * from` chains followed inside a package
pub const MAX_REEXPORT_DEPTH: usize = 8;

/// Inputs of one indexing pass
#[derive(Debug, Clone, Default)]
pub struct IndexRequest {
    /// Project directories whose source files are indexed
    pub project_roots: Vec<PathBuf>,
    /// Package directories indexed in addition to the discovered dependencies
    pub dependency_roots: Vec<PathBuf>,
    /// package.json tables read to discover dependencies; empty disables discovery
    pub package_keys: Vec<String>,
    /// Exclusion patterns per project folder
    pub exclusions: ExclusionConfig,
    pub show_progress: bool,
}

impl IndexRequest {
    pub fn new(project_roots: Vec<PathBuf>) -> Self {
        Self {
            project_roots,
            package_keys: vec!["dependencies".to_string(), "devDependencies".to_string()],
            ..Default::default()
        }
    }
}

/// Outcome of parsing one project file
enum FileOutcome {
    Indexed(Vec<SourceEntry>),
    Skipped(SkippedFile),
}

/// Outcome of indexing one package
enum PackageOutcome {
    Indexed(Vec<PackageEntry>),
    Unresolved(String),
}

/// Builds catalogs from project and dependency trees
pub struct ModuleIndexer {
    resolver: Arc<dyn EntryResolver>,
    threads: usize,
}

impl ModuleIndexer {
    pub fn new(resolver: Arc<dyn EntryResolver>) -> Self {
        Self {
            resolver,
            threads: 0,
        }
    }

    /// Number of parser threads; 0 = auto (80% of available cores)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    fn thread_count(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        ((num_cpus::get() as f64 * 0.8).ceil() as usize).max(1)
    }

    /// Run a full indexing pass
    pub fn build_index(&self, request: &IndexRequest) -> Result<Catalog> {
        let start = Instant::now();

        let mut roots = Vec::with_capacity(request.project_roots.len());
        for root in &request.project_roots {
            let root = absolutize(root)?;
            if !root.is_dir() {
                anyhow::bail!("Project root does not exist or is not a directory: {}", root.display());
            }
            roots.push(root);
        }

        log::info!("Indexing {} project root(s)", roots.len());

        let mut files = Vec::new();
        for root in &roots {
            let matcher = request.exclusions.matcher_for(root);
            let discovered = discover_source_files(root, &matcher);
            log::info!("Discovered {} source files under {}", discovered.len(), root.display());
            files.extend(discovered);
        }

        let packages = self.collect_packages(&roots, request);
        log::info!("Found {} dependency packages", packages.len());

        let num_threads = self.thread_count();
        log::debug!("Using {} threads for parallel indexing", num_threads);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .context("Failed to create thread pool")?;

        let pb = progress_bar(request.show_progress, (files.len() + packages.len()) as u64);

        let file_outcomes: Vec<FileOutcome> = pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    let outcome = index_source_file(path);
                    pb.inc(1);
                    outcome
                })
                .collect()
        });

        let package_outcomes: Vec<(PackageRef, PackageOutcome)> = pool.install(|| {
            packages
                .par_iter()
                .map(|(package, project_root)| {
                    pb.set_message(package.name.clone());
                    let outcome = self.index_package(package, project_root);
                    pb.inc(1);
                    (package.clone(), outcome)
                })
                .collect()
        });

        pb.finish_with_message("Indexing complete");

        let mut stats = IndexStats {
            files_scanned: files.len(),
            ..Default::default()
        };

        let mut source_modules = Vec::new();
        let mut seen_sources = HashSet::new();
        for outcome in file_outcomes {
            match outcome {
                FileOutcome::Indexed(entries) => {
                    if !entries.is_empty() {
                        stats.files_indexed += 1;
                    }
                    for entry in entries {
                        if seen_sources.insert((entry.name.clone(), entry.filepath.clone())) {
                            source_modules.push(entry);
                        }
                    }
                }
                FileOutcome::Skipped(skipped) => stats.skipped.push(skipped),
            }
        }

        let mut node_modules = Vec::new();
        let mut seen_packages = HashSet::new();
        for (package, outcome) in package_outcomes {
            match outcome {
                PackageOutcome::Indexed(entries) => {
                    stats.packages_indexed += 1;
                    for entry in entries {
                        if seen_packages.insert((entry.name.clone(), entry.module.clone())) {
                            node_modules.push(entry);
                        }
                    }
                }
                PackageOutcome::Unresolved(reason) => {
                    log::warn!("Skipping package {}: {}", package.name, reason);
                    stats.unresolved_packages.push(package.name);
                }
            }
        }

        stats.elapsed_ms = start.elapsed().as_millis() as u64;

        log::info!(
            "Indexing complete: {} source symbols from {} files, {} package symbols from {} packages ({} skipped files, {} unresolved packages) in {}ms",
            source_modules.len(),
            stats.files_indexed,
            node_modules.len(),
            stats.packages_indexed,
            stats.skipped.len(),
            stats.unresolved_packages.len(),
            stats.elapsed_ms
        );

        Ok(Catalog {
            source_modules,
            node_modules,
            built_at: Some(chrono::Local::now().to_rfc3339()),
            stats,
        })
    }

    /// List the exports of a single package directory
    pub fn package_exports(&self, package_dir: &Path) -> Result<Vec<PackageEntry>> {
        let package_dir = absolutize(package_dir)?;
        if !package_dir.is_dir() {
            anyhow::bail!("Package directory does not exist: {}", package_dir.display());
        }

        let package = package_ref_for_dir(&package_dir);
        match self.index_package(&package, &package_dir) {
            PackageOutcome::Indexed(entries) => Ok(entries),
            PackageOutcome::Unresolved(reason) => {
                anyhow::bail!("Cannot index package {}: {}", package.name, reason)
            }
        }
    }

    /// Dependencies discovered from each root's package.json, then explicit ones
    ///
    /// Each package is paired with the project root used for node resolution.
    fn collect_packages(&self, roots: &[PathBuf], request: &IndexRequest) -> Vec<(PackageRef, PathBuf)> {
        let mut packages = Vec::new();
        let mut seen = HashSet::new();

        for root in roots {
            for package in discover_dependencies(root, &request.package_keys) {
                if seen.insert(package.name.clone()) {
                    packages.push((package, root.clone()));
                }
            }
        }

        for dir in &request.dependency_roots {
            let dir = match absolutize(dir) {
                Ok(dir) => dir,
                Err(e) => {
                    log::warn!("Skipping dependency root {}: {:#}", dir.display(), e);
                    continue;
                }
            };
            let package = package_ref_for_dir(&dir);
            if seen.insert(package.name.clone()) {
                packages.push((package, dir));
            }
        }

        packages
    }

    fn index_package(&self, package: &PackageRef, project_root: &Path) -> PackageOutcome {
        let Some(entry) = self.resolver.resolve(package, project_root) else {
            return PackageOutcome::Unresolved("no entry point found".to_string());
        };

        log::debug!("Indexing package {} from {}", package.name, entry.display());

        let mut entries = package_entries(&package.name, &entry);

        // Secondary entry points such as `@angular/core/testing`
        for (sub_name, sub_entry) in secondary_entry_points(package) {
            log::debug!("Indexing secondary entry {} from {}", sub_name, sub_entry.display());
            entries.extend(package_entries(&sub_name, &sub_entry));
        }

        PackageOutcome::Indexed(entries)
    }
}

impl Default for ModuleIndexer {
    fn default() -> Self {
        Self::new(Arc::new(ChainResolver::default()))
    }
}

fn progress_bar(show_progress: bool, len: u64) -> ProgressBar {
    if !show_progress {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Absolute, lexically normalized form of `path`
pub(crate) fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(lexical_normalize(path));
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(lexical_normalize(&cwd.join(path)))
}

/// Source files under `root`, skipping node_modules and excluded paths
pub fn discover_source_files(root: &Path, matcher: &ExclusionMatcher) -> Vec<PathBuf> {
    let filter_root = root.to_path_buf();
    let filter_matcher = matcher.clone();

    let walker = WalkBuilder::new(root)
        .follow_links(false)
        .filter_entry(move |entry| {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false)
                && entry.file_name() == "node_modules"
            {
                return false;
            }
            !filter_matcher.is_excluded_under(&filter_root, entry.path())
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };

        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        if is_source_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    files
}

fn index_source_file(path: &Path) -> FileOutcome {
    let path_str = path.to_string_lossy().to_string();

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            log::warn!("Failed to read {}: {}", path_str, e);
            return FileOutcome::Skipped(SkippedFile {
                path: path_str,
                reason: format!("read failed: {}", e),
            });
        }
    };

    match parse_exports(path, &source) {
        Ok(exports) => {
            log::debug!("Extracted {} exports from {}", exports.symbols.len(), path_str);
            let filepath = unixify(&path_str);
            let entries = exports
                .symbols
                .into_iter()
                .map(|symbol| SourceEntry {
                    name: symbol.name,
                    filepath: filepath.clone(),
                    is_default: symbol.is_default,
                })
                .collect();
            FileOutcome::Indexed(entries)
        }
        Err(e) => {
            log::warn!("Failed to parse {}: {:#}", path_str, e);
            FileOutcome::Skipped(SkippedFile {
                path: path_str,
                reason: format!("parse failed: {:#}", e),
            })
        }
    }
}

/// Dependency names listed under `package_keys` in `<root>/package.json`
pub fn discover_dependencies(project_root: &Path, package_keys: &[String]) -> Vec<PackageRef> {
    if package_keys.is_empty() {
        return Vec::new();
    }

    let manifest_path = project_root.join("package.json");
    let content = match std::fs::read_to_string(&manifest_path) {
        Ok(content) => content,
        Err(_) => {
            log::debug!("No package.json in {}", project_root.display());
            return Vec::new();
        }
    };

    let manifest: serde_json::Value = match serde_json::from_str(&content) {
        Ok(manifest) => manifest,
        Err(e) => {
            log::warn!("Failed to parse {}: {}", manifest_path.display(), e);
            return Vec::new();
        }
    };

    let mut packages = Vec::new();
    let mut seen = HashSet::new();
    for key in package_keys {
        let Some(table) = manifest.get(key).and_then(|t| t.as_object()) else {
            continue;
        };
        for name in table.keys() {
            if seen.insert(name.clone()) {
                packages.push(PackageRef::in_node_modules(project_root, name));
            }
        }
    }

    packages
}

/// Package name from `<dir>/package.json`, falling back to the directory name
fn package_ref_for_dir(dir: &Path) -> PackageRef {
    let from_manifest = std::fs::read_to_string(dir.join("package.json"))
        .ok()
        .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
        .and_then(|manifest| manifest.get("name").and_then(|n| n.as_str()).map(String::from));

    let name = from_manifest.unwrap_or_else(|| {
        dir.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    });

    PackageRef::new(name, dir)
}

/// Subdirectories with their own package.json and resolvable entry
fn secondary_entry_points(package: &PackageRef) -> Vec<(String, PathBuf)> {
    WalkDir::new(&package.dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name != "node_modules" && !name.starts_with('.')
        })
        .filter(|entry| entry.path().join("package.json").is_file())
        .filter_map(|entry| {
            let sub = entry.file_name().to_string_lossy().to_string();
            let resolved = resolve_package_dir(entry.path())?;
            Some((format!("{}/{}", package.name, sub), resolved))
        })
        .collect()
}

/// Exports of a package entry file, following relative `export * from` chains
fn package_entries(module: &str, entry: &Path) -> Vec<PackageEntry> {
    let mut symbols = Vec::new();
    let mut visited = HashSet::new();
    collect_package_exports(entry, 0, &mut visited, &mut symbols);

    let default_name = camel_case(module.rsplit('/').next().unwrap_or(module));

    let mut seen = HashSet::new();
    symbols
        .into_iter()
        .filter_map(|symbol| {
            let name = if symbol.is_synthetic && !default_name.is_empty() {
                default_name.clone()
            } else {
                symbol.name
            };
            seen.insert(name.clone()).then(|| PackageEntry {
                name,
                module: module.to_string(),
                is_default: symbol.is_default,
            })
        })
        .collect()
}

fn collect_package_exports(
    file: &Path,
    depth: usize,
    visited: &mut HashSet<PathBuf>,
    out: &mut Vec<ExportedSymbol>,
) {
    if depth > MAX_REEXPORT_DEPTH {
        log::debug!("Re-export chain too deep at {}", file.display());
        return;
    }
    if !visited.insert(lexical_normalize(file)) {
        return;
    }

    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => {
            log::warn!("Failed to read {}: {}", file.display(), e);
            return;
        }
    };

    let exports = match parse_exports(file, &source) {
        Ok(exports) => exports,
        Err(e) => {
            log::warn!("Failed to parse {}: {:#}", file.display(), e);
            return;
        }
    };

    // Default exports of re-exported files are not re-exported by `export *`
    out.extend(
        exports
            .symbols
            .into_iter()
            .filter(|symbol| depth == 0 || !symbol.is_default),
    );

    let Some(dir) = file.parent() else {
        return;
    };

    for specifier in exports.star_reexports {
        if !specifier.starts_with('.') {
            log::debug!("Not following non-relative re-export '{}' in {}", specifier, file.display());
            continue;
        }

        let trimmed = [".js", ".mjs", ".cjs"]
            .iter()
            .find_map(|ext| specifier.strip_suffix(ext))
            .unwrap_or(&specifier);

        match probe_entry(&dir.join(trimmed)) {
            Some(target) => collect_package_exports(&target, depth + 1, visited, out),
            None => log::debug!("Cannot resolve re-export '{}' from {}", specifier, file.display()),
        }
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

    fn indexer() -> ModuleIndexer {
        ModuleIndexer::new(Arc::new(crate::resolver::PackageJsonResolver::new())).with_threads(2)
    }

    #[test]
    fn test_absolutize_normalizes() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolutize(Path::new("a/../b")).unwrap(), cwd.join("b"));
        assert_eq!(absolutize(Path::new("/p/./q/../r")).unwrap(), PathBuf::from("/p/r"));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let request = IndexRequest::new(vec![PathBuf::from("/definitely/not/here/imph")]);
        assert!(indexer().build_index(&request).is_err());
    }

    #[test]
    fn test_source_entries_are_normalized() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("src/widgets/index.ts"), "export const Widget = 1;");
        write(&temp.path().join("src/util.js"), "export function helper() {}\nexport default helper;");

        let catalog = indexer().build_index(&IndexRequest::new(vec![temp.path().to_path_buf()])).unwrap();

        let root = unixify(&temp.path().to_string_lossy());
        let widget = catalog.source_modules.iter().find(|e| e.name == "Widget").unwrap();
        assert_eq!(widget.filepath, format!("{}/src/widgets", root));
        assert!(!widget.is_default);

        // (name, filepath) is unique: the named export is found first
        let helpers: Vec<_> = catalog.source_modules.iter().filter(|e| e.name == "helper").collect();
        assert_eq!(helpers.len(), 1);
        assert!(!helpers[0].is_default);
        assert_eq!(catalog.stats.files_scanned, 2);
        assert_eq!(catalog.stats.files_indexed, 2);
        assert!(catalog.built_at.is_some());
    }

    #[test]
    fn test_node_modules_sources_are_not_walked() {
        let temp = TempDir::new().unwrap();
        write(&temp.path().join("a.ts"), "export const a = 1;");
        write(&temp.path().join("node_modules/x/index.ts"), "export const fromDep = 1;");

        let mut request = IndexRequest::new(vec![temp.path().to_path_buf()]);
        request.package_keys.clear();
        let catalog = indexer().build_index(&request).unwrap();

        assert_eq!(catalog.source_modules.len(), 1);
        assert!(catalog.node_modules.is_empty());
    }

    #[test]
    fn test_discover_dependencies() {
        let temp = TempDir::new().unwrap();
        write(
            &temp.path().join("package.json"),
            r#"{ "dependencies": { "react": "^18" }, "devDependencies": { "jest": "^29", "react": "^18" }, "peerDependencies": { "vue": "3" } }"#,
        );

        let keys = vec!["dependencies".to_string(), "devDependencies".to_string()];
        let names: Vec<String> = discover_dependencies(temp.path(), &keys)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["react", "jest"]);

        let keys = vec!["peerDependencies".to_string()];
        assert_eq!(discover_dependencies(temp.path(), &keys)[0].name, "vue");
    }

    #[test]
    fn test_package_default_uses_package_name() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("node_modules/lodash.debounce");
        write(&dir.join("package.json"), r#"{ "name": "lodash.debounce", "main": "index.js" }"#);
        write(&dir.join("index.js"), "export default function () {}");

        let entries = indexer().package_exports(&dir).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "lodashDebounce");
        assert_eq!(entries[0].module, "lodash.debounce");
        assert!(entries[0].is_default);
    }

    #[test]
    fn test_reexport_cycle_terminates() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("cyclic");
        write(&dir.join("package.json"), r#"{ "name": "cyclic", "types": "a.d.ts" }"#);
        write(&dir.join("a.d.ts"), "export * from './b';\nexport declare const a: number;");
        write(&dir.join("b.d.ts"), "export * from './a';\nexport declare const b: number;");

        let entries = indexer().package_exports(&dir).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
