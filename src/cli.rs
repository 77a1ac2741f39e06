//! CLI argument parsing and command handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::alias::project_alias_rules;
use crate::background_indexer::IndexManager;
use crate::completion::{find_entry, query_catalog};
use crate::config::Settings;
use crate::indexer::{absolutize, IndexRequest, ModuleIndexer};
use crate::insert::{plan_insert, InsertContext};
use crate::models::{Catalog, ModuleEntry, PackageEntry, SourceEntry};
use crate::output;
use crate::paths::{find_import_root, unixify};
use crate::resolver::ChainResolver;
use crate::unused::{find_unused, remove_unused};
use crate::watcher::{watch, WatchConfig};

/// imph: find, insert and merge JavaScript/TypeScript imports
#[derive(Parser, Debug)]
#[command(
    name = "imph",
    version,
    about = "Index project exports and insert import statements",
    long_about = "imph scans a JavaScript/TypeScript project and its node_modules \
                  dependencies for exported symbols, then inserts or merges the \
                  matching import statement into a source file."
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the export catalog and print statistics
    Index {
        /// Project roots (defaults to current directory)
        #[arg(value_name = "ROOT")]
        roots: Vec<PathBuf>,

        /// Extra package directories to index
        #[arg(long = "deps", value_name = "DIR")]
        deps: Vec<PathBuf>,

        /// Output statistics as JSON
        #[arg(long)]
        json: bool,

        /// Suppress progress bar and summary
        #[arg(short, long)]
        quiet: bool,
    },

    /// List symbols whose name contains PREFIX
    ///
    /// Project symbols are listed before dependency symbols.
    ///
    /// Examples:
    ///   imph query use              # useState, useAuth, ...
    ///   imph query Button src --json
    Query {
        /// Substring to match (case-sensitive)
        prefix: String,

        /// Project roots (defaults to current directory)
        #[arg(value_name = "ROOT")]
        roots: Vec<PathBuf>,

        /// Output format as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import a symbol into a file
    ///
    /// Without --filepath or --module the symbol is looked up in the catalog
    /// of the file's project; NAME may then be a full completion label.
    ///
    /// Examples:
    ///   imph insert src/app.tsx useState --module react
    ///   imph insert src/app.tsx Button --filepath src/widgets/button.tsx --default
    Insert {
        /// File to edit (a missing file counts as empty)
        file: PathBuf,

        /// Symbol to import
        name: String,

        /// Project file exporting the symbol
        #[arg(long, conflicts_with = "module")]
        filepath: Option<PathBuf>,

        /// Package (or any module specifier) exporting the symbol
        #[arg(long)]
        module: Option<String>,

        /// Import as the module's default export
        #[arg(long)]
        default: bool,

        /// Print the edited buffer instead of writing the file
        #[arg(long)]
        stdout: bool,
    },

    /// List the exports of a package directory
    Exports {
        /// Directory containing package.json
        package_dir: PathBuf,

        /// Output format as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report imported names that are never used
    Unused {
        file: PathBuf,

        /// Rewrite the file without the unused bindings
        #[arg(long)]
        fix: bool,

        /// Output format as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the module specifier form of a path
    Normalize {
        path: String,
    },

    /// Rebuild the catalog whenever project files change
    Watch {
        /// Project roots (defaults to current directory)
        #[arg(value_name = "ROOT")]
        roots: Vec<PathBuf>,

        /// Quiet period before rebuilding, in milliseconds
        #[arg(short, long, default_value = "2000")]
        debounce: u64,

        /// Suppress output (only log errors)
        #[arg(short, long)]
        quiet: bool,
    },
}

impl Cli {
    /// Execute the parsed command
    pub fn execute(self) -> Result<()> {
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        match self.command {
            Command::Index { roots, deps, json, quiet } => handle_index(roots, deps, json, quiet),
            Command::Query { prefix, roots, json } => handle_query(&prefix, roots, json),
            Command::Insert { file, name, filepath, module, default, stdout } => {
                handle_insert(&file, &name, filepath, module, default, stdout)
            }
            Command::Exports { package_dir, json } => handle_exports(&package_dir, json),
            Command::Unused { file, fix, json } => handle_unused(&file, fix, json),
            Command::Normalize { path } => {
                println!("{}", unixify(&path));
                Ok(())
            }
            Command::Watch { roots, debounce, quiet } => handle_watch(roots, debounce, quiet),
        }
    }
}

/// Settings, request and indexer for a set of project roots
struct Workspace {
    import_root: PathBuf,
    settings: Settings,
    request: IndexRequest,
    indexer: ModuleIndexer,
}

impl Workspace {
    fn open(roots: Vec<PathBuf>, deps: Vec<PathBuf>, show_progress: bool) -> Result<Self> {
        let roots = if roots.is_empty() { vec![PathBuf::from(".")] } else { roots };
        let roots = roots
            .into_iter()
            .map(|root| absolutize(&root))
            .collect::<Result<Vec<_>>>()?;

        let import_root = find_import_root(&roots[0]).unwrap_or_else(|| roots[0].clone());
        log::debug!("Import root: {}", import_root.display());

        let settings = Settings::load(Some(&import_root));

        let mut request = IndexRequest::new(roots);
        request.dependency_roots = deps
            .iter()
            .map(|dep| absolutize(dep))
            .collect::<Result<Vec<_>>>()?;
        request.package_keys = settings.package_keys();
        request.exclusions = settings.exclusions(&import_root);
        request.show_progress = show_progress;

        let resolver = ChainResolver::with_node(settings.resolver_command(), settings.resolver_timeout());
        let indexer = ModuleIndexer::new(Arc::new(resolver));

        Ok(Self {
            import_root,
            settings,
            request,
            indexer,
        })
    }

    fn for_file(file: &Path) -> Result<Self> {
        let dir = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let root = find_import_root(&absolutize(&dir)?).unwrap_or(dir);
        Self::open(vec![root], Vec::new(), false)
    }

    fn build(&self) -> Result<Catalog> {
        self.indexer.build_index(&self.request)
    }
}

fn handle_index(roots: Vec<PathBuf>, deps: Vec<PathBuf>, as_json: bool, quiet: bool) -> Result<()> {
    log::info!("Starting index build");

    let workspace = Workspace::open(roots, deps, !quiet && !as_json)?;
    let manager = IndexManager::new(Arc::new(workspace.indexer));
    let catalog = manager.rebuild_blocking(workspace.request)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&catalog.stats)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    let stats = &catalog.stats;
    println!("Indexing complete!");
    println!("  Project symbols:    {}", catalog.source_modules.len());
    println!("  Dependency symbols: {}", catalog.node_modules.len());
    println!("  Files scanned:      {}", stats.files_scanned);
    println!("  Files indexed:      {}", stats.files_indexed);
    println!("  Packages indexed:   {}", stats.packages_indexed);
    println!("  Time:               {}ms", stats.elapsed_ms);
    if let Some(built_at) = &catalog.built_at {
        println!("  Built at:           {}", built_at);
    }

    if !stats.skipped.is_empty() {
        output::warn(&format!("{} file(s) could not be indexed:", stats.skipped.len()));
        for skipped in &stats.skipped {
            println!("  {}: {}", skipped.path, skipped.reason);
        }
    }
    if !stats.unresolved_packages.is_empty() {
        output::warn(&format!(
            "No entry point found for: {}",
            stats.unresolved_packages.join(", ")
        ));
    }

    Ok(())
}

fn handle_query(prefix: &str, roots: Vec<PathBuf>, as_json: bool) -> Result<()> {
    let workspace = Workspace::open(roots, Vec::new(), false)?;
    let catalog = workspace.build()?;

    let start = Instant::now();
    let completions = query_catalog(prefix, &catalog);
    log::info!("Query '{}' matched {} entries in {:?}", prefix, completions.len(), start.elapsed());

    if as_json {
        println!("{}", serde_json::to_string_pretty(&completions)?);
        return Ok(());
    }

    if completions.is_empty() {
        output::info(&format!("No symbols match '{}'", prefix));
        return Ok(());
    }
    for completion in completions {
        println!("{}", completion.label);
    }
    Ok(())
}

fn handle_insert(
    file: &Path,
    name: &str,
    filepath: Option<PathBuf>,
    module: Option<String>,
    default: bool,
    stdout: bool,
) -> Result<()> {
    let buffer = if file.exists() {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?
    } else {
        String::new()
    };

    let workspace = Workspace::for_file(file)?;

    let entry = match (filepath, module) {
        (Some(path), _) => ModuleEntry::Source(SourceEntry {
            name: name.to_string(),
            filepath: unixify(&absolutize(&path)?.to_string_lossy()),
            is_default: default,
        }),
        (None, Some(module)) => ModuleEntry::Package(PackageEntry {
            name: name.to_string(),
            module,
            is_default: default,
        }),
        (None, None) => {
            let catalog = workspace.build()?;
            find_entry(&catalog, name).with_context(|| {
                format!(
                    "No exported symbol '{}' under {}",
                    name,
                    workspace.import_root.display()
                )
            })?
        }
    };

    let aliases = project_alias_rules(&workspace.settings, &workspace.import_root);

    let current_file = absolutize(file)?;
    let ctx = InsertContext {
        current_file: Some(&current_file),
        aliases: &aliases,
        style: workspace.settings.style(),
    };

    let Some(edit) = plan_insert(&buffer, &entry, &ctx) else {
        if stdout {
            print!("{}", buffer);
        } else {
            output::info(&format!("'{}' is already imported", entry.name()));
        }
        return Ok(());
    };

    let updated = edit.apply(&buffer);
    if stdout {
        print!("{}", updated);
    } else {
        std::fs::write(file, &updated).with_context(|| format!("Failed to write {}", file.display()))?;
        output::success(&format!("Imported '{}' on line {}", entry.name(), edit.line + 1));
    }
    Ok(())
}

fn handle_exports(package_dir: &Path, as_json: bool) -> Result<()> {
    let indexer = ModuleIndexer::default();
    let entries = indexer.package_exports(&absolutize(package_dir)?)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in entries {
        let marker = if entry.is_default { " (default)" } else { "" };
        println!("{}{}\t{}", entry.name, marker, entry.module);
    }
    Ok(())
}

fn handle_unused(file: &Path, fix: bool, as_json: bool) -> Result<()> {
    let source = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;

    if fix {
        let edits = remove_unused(&source)?;
        if edits.is_empty() {
            output::info("No unused imports");
            return Ok(());
        }
        let updated = crate::models::apply_edits(&source, &edits);
        std::fs::write(file, updated).with_context(|| format!("Failed to write {}", file.display()))?;
        output::success(&format!("Rewrote {} import statement(s)", edits.len()));
        return Ok(());
    }

    let unused = find_unused(&source)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&unused)?);
        return Ok(());
    }
    if unused.is_empty() {
        output::info("No unused imports");
        return Ok(());
    }
    for (line, bindings) in unused {
        let names: Vec<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
        println!("{}:{}: {}", file.display(), line + 1, names.join(", "));
    }
    Ok(())
}

fn handle_watch(roots: Vec<PathBuf>, debounce_ms: u64, quiet: bool) -> Result<()> {
    let workspace = Workspace::open(roots, Vec::new(), false)?;
    log::info!("Starting watch mode for {:?}", workspace.request.project_roots);

    if !quiet {
        println!("Starting imph watch mode...");
        println!("  Import root: {}", workspace.import_root.display());
        println!("  Press Ctrl+C to stop.\n");
    }

    let manager = IndexManager::new(Arc::new(workspace.indexer));
    let catalog = manager.rebuild_blocking(workspace.request.clone())?;
    if !quiet {
        println!("Initial index complete ({} symbols). Watching for changes...\n", catalog.len());
    }

    watch(&manager, workspace.request, WatchConfig { debounce_ms, quiet })
}
