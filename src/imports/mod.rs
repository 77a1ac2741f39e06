//! Import statement parsing, merging and rendering
//!
//! The pipeline over one buffer snapshot is: [`parser::parse_imports`] finds
//! the statements and the leading import block, [`merger::merge_or_insert`]
//! decides how a symbol gets imported, and [`formatter::render`] produces the
//! statement text.

pub mod formatter;
pub mod lexer;
pub mod merger;
pub mod parser;

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::config::QuoteChar;

pub use formatter::render;
pub use merger::{merge_or_insert, MergeOutcome};
pub use parser::{parse_imports, ImportBlock, ParsedImports};

/// Shape of an import statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    /// `import React from 'react'`
    DefaultOnly,
    /// `import * as fs from 'fs'`, with or without a default
    Namespace,
    /// `import { a, b } from 'm'`
    NamedOnly,
    /// `import React, { useState } from 'react'`
    Mixed,
    /// `import 'polyfill'`
    SideEffect,
}

/// One parsed (or synthesized) import statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatement {
    pub default_specifier: Option<String>,
    pub namespace_specifier: Option<String>,
    /// Named specifiers as written (`a`, `b as c`, `type T`)
    pub named_specifiers: Vec<String>,
    pub source_module: String,
    pub has_semicolon: bool,
    pub quote: QuoteChar,
    /// `import type ...`
    pub is_type_only: bool,
    /// Whether the brace list is written `{ a }` (Some(true)) or `{a}`; None without braces
    pub brace_padding: Option<bool>,
    /// First and last 0-indexed line of the statement
    pub line_range: (usize, usize),
    /// Byte range in the buffer, including the semicolon if present
    pub byte_range: Range<usize>,
}

impl ImportStatement {
    fn empty(module: &str) -> Self {
        Self {
            default_specifier: None,
            namespace_specifier: None,
            named_specifiers: Vec::new(),
            source_module: module.to_string(),
            has_semicolon: false,
            quote: QuoteChar::Single,
            is_type_only: false,
            brace_padding: None,
            line_range: (0, 0),
            byte_range: 0..0,
        }
    }

    /// New `import name from 'module'`
    pub fn new_default(name: &str, module: &str) -> Self {
        Self {
            default_specifier: Some(name.to_string()),
            ..Self::empty(module)
        }
    }

    /// New `import { name } from 'module'`
    pub fn new_named(name: &str, module: &str) -> Self {
        Self {
            named_specifiers: vec![name.to_string()],
            ..Self::empty(module)
        }
    }

    /// New `import 'module'`
    pub fn new_side_effect(module: &str) -> Self {
        Self::empty(module)
    }

    pub fn is_side_effect_only(&self) -> bool {
        self.default_specifier.is_none()
            && self.namespace_specifier.is_none()
            && self.named_specifiers.is_empty()
    }

    pub fn kind(&self) -> ImportKind {
        if self.namespace_specifier.is_some() {
            return ImportKind::Namespace;
        }
        match (self.default_specifier.is_some(), !self.named_specifiers.is_empty()) {
            (true, true) => ImportKind::Mixed,
            (true, false) => ImportKind::DefaultOnly,
            (false, true) => ImportKind::NamedOnly,
            (false, false) => ImportKind::SideEffect,
        }
    }

    /// Whether `name` is already imported by the brace list
    ///
    /// Matches a specifier written exactly as `name`, or one importing `name`
    /// under an alias (`name as other`).
    pub fn has_named(&self, name: &str) -> bool {
        self.named_specifiers
            .iter()
            .any(|spec| spec == name || imported_name(spec) == name)
    }

    /// Append a named specifier unless it is already present
    pub fn add_named(&mut self, name: &str) -> bool {
        if self.has_named(name) {
            return false;
        }
        self.named_specifiers.push(name.to_string());
        true
    }

    /// Names this statement binds in the importing module
    pub fn local_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(default) = &self.default_specifier {
            names.push(default.clone());
        }
        if let Some(namespace) = &self.namespace_specifier {
            names.push(namespace.clone());
        }
        names.extend(self.named_specifiers.iter().map(|spec| local_name(spec).to_string()));
        names
    }
}

/// Exported name of a specifier: `a as b` => `a`, `type T` => `T`
pub fn imported_name(spec: &str) -> &str {
    let spec = strip_type_modifier(spec);
    match spec.split_once(" as ") {
        Some((imported, _)) => imported.trim(),
        None => spec.trim(),
    }
}

/// Local binding of a specifier: `a as b` => `b`, `type T` => `T`
pub fn local_name(spec: &str) -> &str {
    let spec = strip_type_modifier(spec);
    match spec.rsplit_once(" as ") {
        Some((_, local)) => local.trim(),
        None => spec.trim(),
    }
}

fn strip_type_modifier(spec: &str) -> &str {
    let trimmed = spec.trim();
    match trimmed.strip_prefix("type ") {
        // `type as x` imports something called `type`
        Some(rest) if !rest.trim_start().starts_with("as ") => rest.trim_start(),
        _ => trimmed,
    }
}
