//! Insertion pipeline
//!
//! Chosen entry -> module specifier (alias or relative path) -> parsed buffer
//! imports -> merge decision -> a single [`TextEdit`] against the snapshot.

use std::path::Path;

use crate::alias::resolve_alias;
use crate::config::ImportStyle;
use crate::imports::parser::line_starts;
use crate::imports::{merge_or_insert, parse_imports, render, MergeOutcome};
use crate::models::{AliasRule, ModuleEntry, SymbolRef, TextEdit};
use crate::paths::module_specifier_for;

/// Everything the pipeline needs besides the buffer
#[derive(Debug, Clone, Default)]
pub struct InsertContext<'a> {
    /// File being edited; relative specifiers are computed from its directory
    pub current_file: Option<&'a Path>,
    pub aliases: &'a [AliasRule],
    /// Style for newly created statements
    pub style: ImportStyle,
}

/// Module specifier an entry is imported from
pub fn target_module(entry: &ModuleEntry, ctx: &InsertContext<'_>) -> String {
    match entry {
        ModuleEntry::Package(e) => e.module.clone(),
        ModuleEntry::Source(e) => match resolve_alias(&e.filepath, ctx.aliases) {
            Some(alias) => alias,
            None => module_specifier_for(&e.filepath, ctx.current_file),
        },
    }
}

/// Edit importing `entry` into `buffer`, or None if it is already imported
pub fn plan_insert(buffer: &str, entry: &ModuleEntry, ctx: &InsertContext<'_>) -> Option<TextEdit> {
    let module = target_module(entry, ctx);
    log::debug!("Importing {} from {}", entry.name(), module);
    plan_insert_symbol(buffer, &entry.symbol(), &module, &ctx.style)
}

/// Same as [`plan_insert`] for a symbol whose module is already known
pub fn plan_insert_symbol(
    buffer: &str,
    symbol: &SymbolRef,
    target_module: &str,
    style: &ImportStyle,
) -> Option<TextEdit> {
    let parsed = parse_imports(buffer);

    match merge_or_insert(&parsed, symbol, target_module) {
        MergeOutcome::AlreadyImported => {
            log::debug!("{} is already imported from {}", symbol.name, target_module);
            None
        }
        MergeOutcome::Update { index, statement } => {
            let original = &parsed.statements[index];
            let text = render(&statement, &ImportStyle::of_statement(original));
            Some(TextEdit::replace(original.byte_range.clone(), original.line_range.0, text))
        }
        MergeOutcome::Insert { line, statement } => {
            let text = render(&statement, style);
            Some(insert_line(buffer, line, &text))
        }
    }
}

/// Insert `text` as a whole line before 0-indexed `line`
fn insert_line(buffer: &str, line: usize, text: &str) -> TextEdit {
    let starts = line_starts(buffer);

    match starts.get(line) {
        Some(&offset) => TextEdit::insert(offset, line, format!("{}\n", text)),
        None => {
            // Past the last line: append, closing an unterminated last line first
            let line = starts.len();
            if buffer.is_empty() || buffer.ends_with('\n') {
                TextEdit::insert(buffer.len(), line, format!("{}\n", text))
            } else {
                TextEdit::insert(buffer.len(), line, format!("\n{}\n", text))
            }
        }
    }
}
