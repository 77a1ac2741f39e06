//! Completion queries over a catalog snapshot

use serde::{Deserialize, Serialize};

use crate::models::{Catalog, ModuleEntry, PackageEntry, SourceEntry};

/// Origin tag shown for project symbols
pub const SOURCE_ORIGIN: &str = "source_modules";

/// One completion item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// `"<name>\t<origin>"`
    pub label: String,
    /// Text inserted at the cursor
    pub insert_value: String,
}

impl Completion {
    fn for_entry(entry: &ModuleEntry) -> Self {
        Self {
            label: label_for(entry),
            insert_value: entry.name().to_string(),
        }
    }
}

/// Label shown for an entry
pub fn label_for(entry: &ModuleEntry) -> String {
    match entry {
        ModuleEntry::Source(e) => format!("{}\t{}", e.name, SOURCE_ORIGIN),
        ModuleEntry::Package(e) => format!("{}\tnode_modules/{}", e.name, e.module),
    }
}

/// Entries whose name contains `prefix`, project symbols first
///
/// Matching is a case-sensitive substring test; an empty prefix matches
/// everything. Order within each group is catalog order.
pub fn query(prefix: &str, source_modules: &[SourceEntry], node_modules: &[PackageEntry]) -> Vec<Completion> {
    matching_entries(prefix, source_modules, node_modules)
        .iter()
        .map(Completion::for_entry)
        .collect()
}

/// Same as [`query`] over a whole catalog
pub fn query_catalog(prefix: &str, catalog: &Catalog) -> Vec<Completion> {
    query(prefix, &catalog.source_modules, &catalog.node_modules)
}

/// Matching entries themselves, in completion order
pub fn matching_entries(
    prefix: &str,
    source_modules: &[SourceEntry],
    node_modules: &[PackageEntry],
) -> Vec<ModuleEntry> {
    let sources = source_modules
        .iter()
        .filter(|e| e.name.contains(prefix))
        .cloned()
        .map(ModuleEntry::Source);

    let packages = node_modules
        .iter()
        .filter(|e| e.name.contains(prefix))
        .cloned()
        .map(ModuleEntry::Package);

    sources.chain(packages).collect()
}

/// Map a chosen completion back to its entry
///
/// Accepts a full label (`"useState\tnode_modules/react"`) or a bare name;
/// a bare name picks the first entry in completion order.
pub fn find_entry(catalog: &Catalog, label_or_name: &str) -> Option<ModuleEntry> {
    if label_or_name.contains('\t') {
        return catalog.entries().find(|entry| label_for(entry) == label_or_name);
    }
    catalog.entries().find(|entry| entry.name() == label_or_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, filepath: &str) -> SourceEntry {
        SourceEntry {
            name: name.to_string(),
            filepath: filepath.to_string(),
            is_default: false,
        }
    }

    fn package(name: &str, module: &str) -> PackageEntry {
        PackageEntry {
            name: name.to_string(),
            module: module.to_string(),
            is_default: false,
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            source_modules: vec![
                source("useAuth", "/p/src/auth"),
                source("Button", "/p/src/button"),
                source("useState", "/p/src/state"),
            ],
            node_modules: vec![
                package("useState", "react"),
                package("Component", "@angular/core"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_source_before_node() {
        let results = query_catalog("use", &catalog());
        let labels: Vec<&str> = results.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "useAuth\tsource_modules",
                "useState\tsource_modules",
                "useState\tnode_modules/react",
            ]
        );
        assert_eq!(results[2].insert_value, "useState");
    }

    #[test]
    fn test_substring_and_case_sensitivity() {
        let cat = catalog();
        assert_eq!(query_catalog("ton", &cat).len(), 1);
        assert!(query_catalog("button", &cat).is_empty());
        assert_eq!(query_catalog("Comp", &cat)[0].label, "Component\tnode_modules/@angular/core");
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        let cat = catalog();
        assert_eq!(query_catalog("", &cat).len(), cat.len());
    }

    #[test]
    fn test_no_match() {
        assert!(query_catalog("zzz", &catalog()).is_empty());
    }

    #[test]
    fn test_find_entry_by_label_and_name() {
        let cat = catalog();

        let by_label = find_entry(&cat, "useState\tnode_modules/react").unwrap();
        assert!(matches!(by_label, ModuleEntry::Package(ref e) if e.module == "react"));

        let by_name = find_entry(&cat, "useState").unwrap();
        assert!(matches!(by_name, ModuleEntry::Source(ref e) if e.filepath == "/p/src/state"));

        assert!(find_entry(&cat, "missing").is_none());
    }
}
