//! Test helpers for building throwaway JS/TS projects
//!
//! Integration tests pull this in with `mod test_helpers;`.

#![allow(dead_code)]

use import_helper::config::ImportStyle;
use import_helper::indexer::{IndexRequest, ModuleIndexer};
use import_helper::insert::{plan_insert, InsertContext};
use import_helper::models::{Catalog, ModuleEntry, PackageEntry, SourceEntry};
use import_helper::resolver::PackageJsonResolver;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A project directory that lives as long as the value
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file relative to the project root, creating parent directories
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Install a package under node_modules with the given manifest and files
    pub fn package(&self, name: &str, manifest: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = format!("node_modules/{}", name);
        self.write(&format!("{}/package.json", dir), manifest);
        for (file, content) in files {
            self.write(&format!("{}/{}", dir, file), content);
        }
        self.root().join(dir)
    }

    pub fn request(&self) -> IndexRequest {
        IndexRequest::new(vec![self.root().to_path_buf()])
    }

    /// Build the catalog without spawning node
    pub fn build(&self) -> Catalog {
        self.build_with(&self.request())
    }

    pub fn build_with(&self, request: &IndexRequest) -> Catalog {
        indexer().build_index(request).expect("Indexing failed")
    }
}

/// Indexer that resolves entry points from package.json only
pub fn indexer() -> ModuleIndexer {
    ModuleIndexer::new(Arc::new(PackageJsonResolver::new())).with_threads(2)
}

pub fn source_names(catalog: &Catalog) -> Vec<&str> {
    catalog.source_modules.iter().map(|e| e.name.as_str()).collect()
}

pub fn package_names(catalog: &Catalog) -> Vec<(&str, &str)> {
    catalog
        .node_modules
        .iter()
        .map(|e| (e.name.as_str(), e.module.as_str()))
        .collect()
}

pub fn named_source(name: &str, filepath: &str) -> ModuleEntry {
    ModuleEntry::Source(SourceEntry {
        name: name.to_string(),
        filepath: filepath.to_string(),
        is_default: false,
    })
}

pub fn named_package(name: &str, module: &str) -> ModuleEntry {
    ModuleEntry::Package(PackageEntry {
        name: name.to_string(),
        module: module.to_string(),
        is_default: false,
    })
}

/// Run the insertion pipeline with the default style and no current file
pub fn insert(buffer: &str, entry: &ModuleEntry) -> String {
    let ctx = InsertContext {
        style: ImportStyle::default(),
        ..Default::default()
    };
    match plan_insert(buffer, entry, &ctx) {
        Some(edit) => edit.apply(buffer),
        None => buffer.to_string(),
    }
}

/// Line `row` of a buffer (0-indexed)
pub fn row(buffer: &str, row: usize) -> &str {
    buffer.lines().nth(row).unwrap_or("")
}
