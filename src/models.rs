//! Core data models for import-helper
//!
//! These structures describe the importable symbols produced by the indexer,
//! the catalog snapshots handed to completion, and the buffer edits produced
//! by the insertion pipeline.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::PathBuf;

/// A symbol exported by a project source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceEntry {
    /// Exported name (synthetic for anonymous default exports)
    pub name: String,
    /// Absolute, normalized path of the exporting file (no extension, `/index` collapsed)
    pub filepath: String,
    /// Whether this is the module's default export
    pub is_default: bool,
}

/// A symbol exported by a dependency package
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PackageEntry {
    /// Exported name
    pub name: String,
    /// Package name used as the module specifier (e.g. `@angular/core`)
    pub module: String,
    /// Whether this is the package's default export
    pub is_default: bool,
}

/// One importable symbol, tagged by where it comes from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum ModuleEntry {
    Source(SourceEntry),
    Package(PackageEntry),
}

impl ModuleEntry {
    pub fn name(&self) -> &str {
        match self {
            ModuleEntry::Source(e) => &e.name,
            ModuleEntry::Package(e) => &e.name,
        }
    }

    pub fn is_default(&self) -> bool {
        match self {
            ModuleEntry::Source(e) => e.is_default,
            ModuleEntry::Package(e) => e.is_default,
        }
    }

    /// The symbol half of the entry, as consumed by the merger
    pub fn symbol(&self) -> SymbolRef {
        SymbolRef {
            name: self.name().to_string(),
            is_default: self.is_default(),
        }
    }
}

impl From<SourceEntry> for ModuleEntry {
    fn from(entry: SourceEntry) -> Self {
        ModuleEntry::Source(entry)
    }
}

impl From<PackageEntry> for ModuleEntry {
    fn from(entry: PackageEntry) -> Self {
        ModuleEntry::Package(entry)
    }
}

/// Name of a symbol to import and whether it is a default import
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolRef {
    pub name: String,
    pub is_default: bool,
}

impl SymbolRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_default: false }
    }

    pub fn default_import(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_default: true }
    }
}

/// Path alias rule (TypeScript `paths` style)
///
/// `path_to` is the alias (`@Libs/*`), `path_value` the real path relative to
/// `base_dir` (`./src/lib/*`). Wildcards must appear on both sides or neither.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AliasRule {
    pub path_to: String,
    pub path_value: String,
    pub base_dir: PathBuf,
}

/// A file the indexer could not use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Statistics about one indexing pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Source files discovered after exclusion
    pub files_scanned: usize,
    /// Source files that contributed at least one export
    pub files_indexed: usize,
    /// Files that failed to read or parse
    pub skipped: Vec<SkippedFile>,
    /// Packages whose entry point was resolved and parsed
    pub packages_indexed: usize,
    /// Packages with no resolvable entry point
    pub unresolved_packages: Vec<String>,
    /// Wall time of the pass
    pub elapsed_ms: u64,
}

/// Immutable result of an indexing pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub source_modules: Vec<SourceEntry>,
    pub node_modules: Vec<PackageEntry>,
    /// Completion time (RFC 3339), None for the initial empty catalog
    pub built_at: Option<String>,
    pub stats: IndexStats,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.source_modules.len() + self.node_modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries, source modules first
    pub fn entries(&self) -> impl Iterator<Item = ModuleEntry> + '_ {
        self.source_modules
            .iter()
            .cloned()
            .map(ModuleEntry::Source)
            .chain(self.node_modules.iter().cloned().map(ModuleEntry::Package))
    }
}

/// A single replacement over a buffer snapshot (byte offsets)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextEdit {
    /// Byte range being replaced; empty for a pure insertion
    pub range: Range<usize>,
    pub new_text: String,
    /// 0-indexed line where the edit starts
    pub line: usize,
}

impl TextEdit {
    pub fn insert(offset: usize, line: usize, text: impl Into<String>) -> Self {
        Self {
            range: offset..offset,
            new_text: text.into(),
            line,
        }
    }

    pub fn replace(range: Range<usize>, line: usize, text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: text.into(),
            line,
        }
    }

    pub fn is_insertion(&self) -> bool {
        self.range.is_empty()
    }

    /// Apply the edit to the snapshot it was computed from
    pub fn apply(&self, buffer: &str) -> String {
        let start = self.range.start.min(buffer.len());
        let end = self.range.end.clamp(start, buffer.len());

        let mut out = String::with_capacity(buffer.len() + self.new_text.len());
        out.push_str(&buffer[..start]);
        out.push_str(&self.new_text);
        out.push_str(&buffer[end..]);
        out
    }
}

/// Apply several non-overlapping edits computed against the same snapshot
pub fn apply_edits(buffer: &str, edits: &[TextEdit]) -> String {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    // Back to front so earlier offsets stay valid
    sorted.sort_by(|a, b| b.range.start.cmp(&a.range.start));

    let mut out = buffer.to_string();
    for edit in sorted {
        out = edit.apply(&out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_entry_serde_tag() {
        let entry = ModuleEntry::Package(PackageEntry {
            name: "Component".to_string(),
            module: "@angular/core".to_string(),
            is_default: false,
        });

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"origin\":\"package\""));

        let back: ModuleEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_text_edit_insert_and_replace() {
        let buffer = "import a from 'a'\nconst x = 1\n";

        let insert = TextEdit::insert(18, 1, "import b from 'b'\n");
        assert_eq!(
            insert.apply(buffer),
            "import a from 'a'\nimport b from 'b'\nconst x = 1\n"
        );

        let replace = TextEdit::replace(0..17, 0, "import a, { c } from 'a'");
        assert_eq!(replace.apply(buffer), "import a, { c } from 'a'\nconst x = 1\n");
    }

    #[test]
    fn test_apply_edits_back_to_front() {
        let buffer = "aaa\nbbb\nccc\n";
        let edits = vec![
            TextEdit::replace(0..3, 0, "A"),
            TextEdit::replace(8..11, 2, "C"),
        ];
        assert_eq!(apply_edits(buffer, &edits), "A\nbbb\nC\n");
    }

    #[test]
    fn test_catalog_entries_source_first() {
        let catalog = Catalog {
            source_modules: vec![SourceEntry {
                name: "a".to_string(),
                filepath: "/p/a".to_string(),
                is_default: false,
            }],
            node_modules: vec![PackageEntry {
                name: "b".to_string(),
                module: "b".to_string(),
                is_default: true,
            }],
            ..Default::default()
        };

        let names: Vec<String> = catalog.entries().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(catalog.len(), 2);
    }
}
