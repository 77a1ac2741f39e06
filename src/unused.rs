//! Unused import detection and removal
//!
//! A binding introduced by an import statement is unused when its name never
//! appears as an identifier outside import statements. References are found
//! with a Tree-sitter query over the TSX grammar, which also accepts plain
//! JavaScript and TypeScript without JSX.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor};

use crate::config::ImportStyle;
use crate::imports::parser::line_starts;
use crate::imports::{local_name, parse_imports, render, ImportStatement};
use crate::models::TextEdit;

const REFERENCE_QUERY: &str = r#"
[
  (identifier)
  (type_identifier)
  (shorthand_property_identifier)
  (shorthand_property_identifier_pattern)
] @ref
"#;

/// An imported name nothing refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedBinding {
    pub name: String,
    /// Every binding of the statement is unused
    pub all: bool,
}

/// Unused bindings keyed by the 0-indexed first line of their statement
pub fn find_unused(source: &str) -> Result<BTreeMap<usize, Vec<UnusedBinding>>> {
    let parsed = parse_imports(source);
    let referenced = referenced_names(source)?;

    let mut unused = BTreeMap::new();
    for stmt in &parsed.statements {
        let names = stmt.local_names();
        if names.is_empty() {
            continue;
        }

        let missing: Vec<String> = names
            .iter()
            .filter(|name| !referenced.contains(name.as_str()))
            .cloned()
            .collect();
        if missing.is_empty() {
            continue;
        }

        let all = missing.len() == names.len();
        let bindings = missing
            .into_iter()
            .map(|name| UnusedBinding { name, all })
            .collect();
        unused.insert(stmt.line_range.0, bindings);
    }

    Ok(unused)
}

/// Edits removing every unused binding
///
/// Statements keep their own quote, semicolon and brace style. A statement
/// whose bindings are all unused is deleted along with its line.
pub fn remove_unused(source: &str) -> Result<Vec<TextEdit>> {
    let parsed = parse_imports(source);
    let unused = find_unused(source)?;
    let starts = line_starts(source);

    let mut edits = Vec::new();
    for stmt in &parsed.statements {
        let Some(bindings) = unused.get(&stmt.line_range.0) else {
            continue;
        };

        if bindings.iter().any(|b| b.all) {
            let start = starts.get(stmt.line_range.0).copied().unwrap_or(0);
            let end = starts
                .get(stmt.line_range.1 + 1)
                .copied()
                .unwrap_or(source.len());
            edits.push(TextEdit::replace(start..end, stmt.line_range.0, ""));
            continue;
        }

        let names: HashSet<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
        let trimmed = without_bindings(stmt, &names);
        let text = render(&trimmed, &ImportStyle::of_statement(stmt));
        edits.push(TextEdit::replace(stmt.byte_range.clone(), stmt.line_range.0, text));
    }

    Ok(edits)
}

fn without_bindings(stmt: &ImportStatement, names: &HashSet<&str>) -> ImportStatement {
    let mut trimmed = stmt.clone();
    if trimmed
        .default_specifier
        .as_deref()
        .is_some_and(|d| names.contains(d))
    {
        trimmed.default_specifier = None;
    }
    if trimmed
        .namespace_specifier
        .as_deref()
        .is_some_and(|ns| names.contains(ns))
    {
        trimmed.namespace_specifier = None;
    }
    trimmed
        .named_specifiers
        .retain(|spec| !names.contains(local_name(spec)));
    trimmed
}

/// Identifier texts used outside import statements
fn referenced_names(source: &str) -> Result<HashSet<String>> {
    let mut parser = Parser::new();
    let language: tree_sitter::Language = tree_sitter_typescript::LANGUAGE_TSX.into();
    parser
        .set_language(&language)
        .context("Failed to set TSX language")?;

    let tree = parser
        .parse(source, None)
        .context("Failed to parse source for references")?;

    let query = Query::new(&language, REFERENCE_QUERY).context("Failed to create reference query")?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, tree.root_node(), source.as_bytes());

    let mut names = HashSet::new();
    while let Some(match_) = matches.next() {
        for capture in match_.captures {
            if inside_import(capture.node) {
                continue;
            }
            if let Ok(text) = capture.node.utf8_text(source.as_bytes()) {
                names.insert(text.to_string());
            }
        }
    }

    Ok(names)
}

fn inside_import(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.kind() == "import_statement" {
            return true;
        }
        current = parent.parent();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::apply_edits;

    #[test]
    fn test_find_unused_named_and_default() {
        let source = "import React, { useState, useEffect } from 'react'\nimport { map } from 'rxjs'\n\nexport function App() {\n  const [v] = useState(0)\n  return <div>{v}</div>\n}\n";
        let unused = find_unused(source).unwrap();

        assert_eq!(
            unused.get(&0),
            Some(&vec![
                UnusedBinding { name: "React".to_string(), all: false },
                UnusedBinding { name: "useEffect".to_string(), all: false },
            ])
        );
        assert_eq!(
            unused.get(&1),
            Some(&vec![UnusedBinding { name: "map".to_string(), all: true }])
        );
    }

    #[test]
    fn test_side_effect_never_reported() {
        let unused = find_unused("import './polyfill'\nrun()\n").unwrap();
        assert!(unused.is_empty());
    }

    #[test]
    fn test_aliases_and_type_references() {
        let source = "import { a as b } from './a'\nimport type { Props } from './types'\nimport * as fs from 'fs'\nconst p: Props = { b }\nfs.readFileSync(p)\n";
        let unused = find_unused(source).unwrap();
        assert!(unused.is_empty(), "unexpected unused: {:?}", unused);
    }

    #[test]
    fn test_property_names_are_not_references() {
        let source = "import { helper } from './h'\nobj.helper()\n";
        let unused = find_unused(source).unwrap();
        assert_eq!(unused.get(&0).map(|b| b[0].all), Some(true));
    }

    #[test]
    fn test_remove_unused() {
        let source = "import React, { useState, useEffect } from 'react';\nimport { map } from 'rxjs';\nuseState(1)\n";
        let edits = remove_unused(source).unwrap();
        assert_eq!(
            apply_edits(source, &edits),
            "import { useState } from 'react';\nuseState(1)\n"
        );
    }
}
