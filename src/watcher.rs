//! File system watcher for automatic catalog rebuilds
//!
//! Changes to source files, `package.json` and tsconfig files are collected
//! and, once the tree has been quiet for the debounce period, turned into a
//! single rebuild request on the [`IndexManager`].

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::background_indexer::IndexManager;
use crate::config::PROJECT_CONFIG_FILE;
use crate::exclusion::ExclusionMatcher;
use crate::indexer::IndexRequest;
use crate::paths::is_source_file;

/// Files outside the source set whose change affects the catalog
const MANIFEST_FILES: &[&str] = &["package.json", "tsconfig.json", "jsconfig.json", PROJECT_CONFIG_FILE];

/// Configuration for file watching
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Waits this long after the last change before requesting a rebuild
    pub debounce_ms: u64,
    /// Suppress output (only log errors)
    pub quiet: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2000,
            quiet: false,
        }
    }
}

/// Watch the request's project roots and rebuild on change
///
/// Blocks until the event channel disconnects. Rebuilds run on the manager's
/// worker thread; a burst of changes arriving while a rebuild is running
/// collapses into one pending request.
pub fn watch(manager: &IndexManager, request: IndexRequest, config: WatchConfig) -> Result<()> {
    log::info!(
        "Starting file watcher for {:?} with {}ms debounce",
        request.project_roots,
        config.debounce_ms
    );

    let (tx, rx) = channel();

    let mut watcher = RecommendedWatcher::new(tx, Config::default())
        .context("Failed to create file watcher")?;

    for root in &request.project_roots {
        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to start watching {}", root.display()))?;
    }

    let filter = ChangeFilter::new(&request);

    if !config.quiet {
        println!("Watching for changes (debounce: {}ms)...", config.debounce_ms);
    }

    let mut pending_files: HashSet<PathBuf> = HashSet::new();
    let mut last_event_time: Option<Instant> = None;
    let debounce_duration = Duration::from_millis(config.debounce_ms);

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok(event)) => {
                for changed_path in changed_paths(&event) {
                    if filter.is_relevant(&changed_path) {
                        log::debug!("Detected change: {:?}", changed_path);
                        pending_files.insert(changed_path);
                        last_event_time = Some(Instant::now());
                    }
                }
            }
            Ok(Err(e)) => {
                log::warn!("Watch error: {}", e);
            }
            Err(RecvTimeoutError::Timeout) => {
                let Some(last_time) = last_event_time else {
                    continue;
                };
                if pending_files.is_empty() || last_time.elapsed() < debounce_duration {
                    continue;
                }

                if !config.quiet {
                    println!("Detected {} changed file(s), rebuilding index...", pending_files.len());
                }
                log::info!("Requesting rebuild after {} change(s)", pending_files.len());
                manager.request_rebuild(request.clone());

                pending_files.clear();
                last_event_time = None;
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("Watcher channel disconnected, stopping...");
                break;
            }
        }
    }

    if !config.quiet {
        println!("Watcher stopped.");
    }

    Ok(())
}

/// Paths touched by a create, modify or remove event
fn changed_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => event.paths.clone(),
        _ => Vec::new(),
    }
}

/// Decides which changed paths warrant a rebuild
struct ChangeFilter {
    roots: Vec<(PathBuf, ExclusionMatcher)>,
}

impl ChangeFilter {
    fn new(request: &IndexRequest) -> Self {
        let roots = request
            .project_roots
            .iter()
            .map(|root| (root.clone(), request.exclusions.matcher_for(root)))
            .collect();
        Self { roots }
    }

    fn is_relevant(&self, path: &Path) -> bool {
        if !should_watch_file(path) {
            return false;
        }

        let excluded = self
            .roots
            .iter()
            .any(|(root, matcher)| path.starts_with(root) && matcher.is_excluded_under(root, path));
        !excluded
    }
}

/// Source files and manifests, outside hidden entries and node_modules
fn should_watch_file(path: &Path) -> bool {
    let Some(file_name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };

    if MANIFEST_FILES.contains(&&*file_name) {
        // A dependency's own manifest changes with every install; the root one is enough
        return !in_node_modules(path.parent().unwrap_or(path));
    }

    if file_name.starts_with('.') || path.is_dir() {
        return false;
    }

    is_source_file(path) && !in_node_modules(path)
}

fn in_node_modules(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str() == "node_modules")
}
