//! Deciding how a symbol gets imported into a parsed buffer

use crate::models::SymbolRef;
use crate::paths::unixify;

use super::{ImportStatement, ParsedImports};

/// What to do to import one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The buffer already imports the symbol from the module
    AlreadyImported,
    /// Replace `statements[index]` with `statement`
    Update { index: usize, statement: ImportStatement },
    /// Insert `statement` as a new line before 0-indexed `line`
    Insert { line: usize, statement: ImportStatement },
}

/// Merge `symbol` from `target_module` into the parsed imports
///
/// Statements for the same module (compared after normalization) are
/// candidates unless they are side-effect-only or `import type`. A default
/// symbol goes into the first candidate without a default; a named symbol is
/// appended to the first candidate without a namespace specifier. Anything
/// else becomes a new statement.
pub fn merge_or_insert(parsed: &ParsedImports, symbol: &SymbolRef, target_module: &str) -> MergeOutcome {
    let target = unixify(target_module);

    let same_module: Vec<usize> = parsed
        .statements
        .iter()
        .enumerate()
        .filter(|(_, stmt)| unixify(&stmt.source_module) == target)
        .map(|(i, _)| i)
        .collect();

    let candidates: Vec<usize> = same_module
        .iter()
        .copied()
        .filter(|&i| {
            let stmt = &parsed.statements[i];
            !stmt.is_side_effect_only() && !stmt.is_type_only
        })
        .collect();

    if symbol.is_default {
        if candidates
            .iter()
            .any(|&i| parsed.statements[i].default_specifier.is_some())
        {
            return MergeOutcome::AlreadyImported;
        }

        if let Some(&index) = candidates.first() {
            let mut statement = parsed.statements[index].clone();
            statement.default_specifier = Some(symbol.name.clone());
            return MergeOutcome::Update { index, statement };
        }
    } else {
        if candidates
            .iter()
            .any(|&i| parsed.statements[i].has_named(&symbol.name))
        {
            return MergeOutcome::AlreadyImported;
        }

        let appendable = candidates
            .iter()
            .copied()
            .find(|&i| parsed.statements[i].namespace_specifier.is_none());

        if let Some(index) = appendable {
            let mut statement = parsed.statements[index].clone();
            statement.add_named(&symbol.name);
            return MergeOutcome::Update { index, statement };
        }
    }

    let statement = if symbol.is_default {
        ImportStatement::new_default(&symbol.name, target_module)
    } else {
        ImportStatement::new_named(&symbol.name, target_module)
    };

    MergeOutcome::Insert {
        line: insertion_line(parsed, &same_module),
        statement,
    }
}

/// Line a new statement goes on
fn insertion_line(parsed: &ParsedImports, same_module: &[usize]) -> usize {
    if let Some(&last) = same_module.last() {
        return parsed.statements[last].line_range.1 + 1;
    }
    match parsed.block {
        Some(block) => block.last_line + 1,
        None => 0,
    }
}
