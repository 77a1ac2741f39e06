//! Module-level export extraction using Tree-sitter
//!
//! Collects the names a JavaScript/TypeScript module exports:
//! - Exported declarations (functions, classes, interfaces, type aliases,
//!   enums, namespaces, variables, `declare`d ambient declarations)
//! - Export clauses (`export { a, b as c }`, with or without `from`)
//! - Namespace re-exports (`export * as ns from './x'`)
//! - Default exports (`export default ...`, `export = ...`)
//!
//! `export * from './x'` contributes no names itself; the module specifier is
//! returned so the indexer can follow it.
//!
//! `.ts`, `.mts`, `.cts` and declaration files use the TypeScript grammar;
//! everything else uses the TSX grammar, which also covers plain JavaScript.

use anyhow::{Context, Result};
use std::path::Path;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor};

use crate::paths::unixify;

/// One exported name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportedSymbol {
    pub name: String,
    pub is_default: bool,
    /// Default export with no name of its own; the name was derived from the file
    pub is_synthetic: bool,
}

/// Everything a module exports directly, plus its `export *` targets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleExports {
    pub symbols: Vec<ExportedSymbol>,
    /// Module specifiers of `export * from '...'` statements, in source order
    pub star_reexports: Vec<String>,
}

impl ModuleExports {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.star_reexports.is_empty()
    }
}

/// Parse a source file and extract its module-level exports
pub fn parse_exports(path: &Path, source: &str) -> Result<ModuleExports> {
    let mut parser = Parser::new();

    let language: tree_sitter::Language = if uses_tsx_grammar(path) {
        tree_sitter_typescript::LANGUAGE_TSX.into()
    } else {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    };

    parser
        .set_language(&language)
        .context("Failed to set TypeScript/JavaScript language")?;

    let tree = parser
        .parse(source, None)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let root = tree.root_node();
    if root.has_error() {
        log::debug!("Syntax errors in {}, exports may be incomplete", path.display());
    }

    let query = Query::new(&language, "(program (export_statement) @export)")
        .context("Failed to create export query")?;

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, root, source.as_bytes());

    let mut collector = ExportCollector::new(path, source);
    while let Some(match_) = matches.next() {
        for capture in match_.captures {
            collector.visit_export(capture.node);
        }
    }

    Ok(collector.finish())
}

fn uses_tsx_grammar(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let typescript_only = [".ts", ".mts", ".cts"];
    !typescript_only.iter().any(|ext| name.ends_with(ext))
}

/// Name used for an anonymous default export
///
/// The camel-cased file stem, or the directory name for `index` files:
/// `my-button.tsx` => `myButton`, `widgets/index.ts` => `widgets`.
pub fn synthetic_default_name(path: &Path) -> String {
    let normalized = unixify(&path.to_string_lossy());
    let base = normalized.rsplit('/').next().unwrap_or("");
    let name = camel_case(base);
    if name.is_empty() { "default".to_string() } else { name }
}

pub(crate) fn camel_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut upper_next = false;

    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' || c == '$' {
            if upper_next && !out.is_empty() {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }

    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

struct ExportCollector<'a> {
    path: &'a Path,
    source: &'a str,
    exports: ModuleExports,
}

impl<'a> ExportCollector<'a> {
    fn new(path: &'a Path, source: &'a str) -> Self {
        Self {
            path,
            source,
            exports: ModuleExports::default(),
        }
    }

    fn finish(self) -> ModuleExports {
        self.exports
    }

    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn push(&mut self, name: &str, is_default: bool) {
        self.push_symbol(name, is_default, false);
    }

    fn push_symbol(&mut self, name: &str, is_default: bool, is_synthetic: bool) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let duplicate = self
            .exports
            .symbols
            .iter()
            .any(|s| s.name == name && s.is_default == is_default);
        if !duplicate {
            self.exports.symbols.push(ExportedSymbol {
                name: name.to_string(),
                is_default,
                is_synthetic,
            });
        }
    }

    fn push_default(&mut self, name: Option<String>) {
        match name {
            Some(name) => self.push_symbol(&name, true, false),
            None => {
                let name = synthetic_default_name(self.path);
                self.push_symbol(&name, true, true);
            }
        }
    }

    fn visit_export(&mut self, node: Node) {
        let is_default = has_child_kind(node, "default");

        if let Some(declaration) = node.child_by_field_name("declaration") {
            let names = self.declaration_names(declaration);
            if is_default {
                self.push_default(names.into_iter().next());
            } else {
                for name in names {
                    self.push(&name, false);
                }
            }
            return;
        }

        if is_default {
            let name = node
                .child_by_field_name("value")
                .and_then(|value| self.expression_name(value));
            self.push_default(name);
            return;
        }

        // export = value
        if has_child_kind(node, "=") {
            let mut cursor = node.walk();
            let name = node
                .named_children(&mut cursor)
                .filter(|child| child.kind() != "comment")
                .find_map(|child| self.expression_name(child));
            self.push_default(name);
            return;
        }

        let source_module = node
            .child_by_field_name("source")
            .map(|source| string_value(self.text(source)));

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "export_clause" => self.visit_export_clause(child),
                "namespace_export" => {
                    let mut inner = child.walk();
                    let name = child
                        .named_children(&mut inner)
                        .last()
                        .map(|n| string_value(self.text(n)));
                    if let Some(name) = name {
                        self.push(&name, false);
                    }
                }
                "*" => {
                    if let Some(module) = &source_module {
                        self.exports.star_reexports.push(module.clone());
                    }
                }
                _ => {}
            }
        }
    }

    fn visit_export_clause(&mut self, clause: Node) {
        let mut cursor = clause.walk();
        let specifiers: Vec<Node> = clause
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "export_specifier")
            .collect();

        for specifier in specifiers {
            let Some(name_node) = specifier.child_by_field_name("name") else {
                continue;
            };
            let name = string_value(self.text(name_node));
            let alias = specifier
                .child_by_field_name("alias")
                .map(|a| string_value(self.text(a)));

            match alias {
                // export { Button as default }
                Some(alias) if alias == "default" => self.push_default(Some(name)),
                Some(alias) => self.push(&alias, false),
                // export { default } from './Button'
                None if name == "default" => self.push_default(None),
                None => self.push(&name, false),
            }
        }
    }

    /// Names bound by an exported declaration
    fn declaration_names(&self, declaration: Node) -> Vec<String> {
        match declaration.kind() {
            "lexical_declaration" | "variable_declaration" => {
                let mut names = Vec::new();
                let mut cursor = declaration.walk();
                for declarator in declaration.named_children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    if let Some(pattern) = declarator.child_by_field_name("name") {
                        self.pattern_names(pattern, &mut names);
                    }
                }
                names
            }
            "ambient_declaration" => {
                let mut cursor = declaration.walk();
                let inner: Vec<Node> = declaration.named_children(&mut cursor).collect();
                inner
                    .into_iter()
                    .flat_map(|child| self.declaration_names(child))
                    .collect()
            }
            "module" | "internal_module" => {
                let Some(name) = declaration.child_by_field_name("name") else {
                    return Vec::new();
                };
                // declare module 'pkg' augments another module
                if name.kind() == "string" {
                    return Vec::new();
                }
                let text = self.text(name);
                let head = text.split('.').next().unwrap_or(text);
                vec![head.to_string()]
            }
            _ => declaration
                .child_by_field_name("name")
                .map(|name| vec![self.text(name).to_string()])
                .unwrap_or_default(),
        }
    }

    /// Identifiers bound by a (possibly destructuring) pattern
    fn pattern_names(&self, pattern: Node, names: &mut Vec<String>) {
        match pattern.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                names.push(self.text(pattern).to_string());
            }
            "pair_pattern" => {
                if let Some(value) = pattern.child_by_field_name("value") {
                    self.pattern_names(value, names);
                }
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = pattern.child_by_field_name("left") {
                    self.pattern_names(left, names);
                }
            }
            _ => {
                let mut cursor = pattern.walk();
                let children: Vec<Node> = pattern.named_children(&mut cursor).collect();
                for child in children {
                    self.pattern_names(child, names);
                }
            }
        }
    }

    /// Name of a default-exported expression, if it has one
    fn expression_name(&self, expression: Node) -> Option<String> {
        match expression.kind() {
            "identifier" => Some(self.text(expression).to_string()),
            "function_expression" | "function" | "generator_function" | "class" => expression
                .child_by_field_name("name")
                .map(|name| self.text(name).to_string()),
            "parenthesized_expression" => {
                let mut cursor = expression.walk();
                let inner = expression.named_children(&mut cursor).next();
                inner.and_then(|inner| self.expression_name(inner))
            }
            _ => None,
        }
    }
}

fn has_child_kind(node: Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == kind);
    found
}

fn string_value(text: &str) -> String {
    text.trim()
        .trim_matches(|c| c == '\'' || c == '"' || c == '`')
        .to_string()
}
