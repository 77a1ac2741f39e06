//! Rendering import statements back to text

use crate::config::ImportStyle;

use super::ImportStatement;

impl ImportStyle {
    /// Style an existing statement is written in
    ///
    /// Keeps the statement's own quote and semicolon. A statement without a
    /// brace list yet gets padded braces.
    pub fn of_statement(statement: &ImportStatement) -> Self {
        Self {
            quote: statement.quote,
            semicolon: statement.has_semicolon,
            space_around_braces: statement.brace_padding.unwrap_or(true),
        }
    }
}

/// Render a statement as a single line
///
/// Clause order is default, `* as ns`, then the brace list; the module
/// string uses `style.quote` and a `;` is appended only when
/// `style.semicolon` is set.
pub fn render(statement: &ImportStatement, style: &ImportStyle) -> String {
    let quote = style.quote.as_char();
    let module = format!("{}{}{}", quote, statement.source_module, quote);
    let terminator = if style.semicolon { ";" } else { "" };

    if statement.is_side_effect_only() {
        return format!("import {}{}", module, terminator);
    }

    let mut clauses: Vec<String> = Vec::with_capacity(2);
    if let Some(default) = &statement.default_specifier {
        clauses.push(default.clone());
    }
    if let Some(namespace) = &statement.namespace_specifier {
        clauses.push(format!("* as {}", namespace));
    } else if !statement.named_specifiers.is_empty() {
        clauses.push(brace_list(&statement.named_specifiers, style.space_around_braces));
    }

    let keyword = if statement.is_type_only { "import type" } else { "import" };
    format!("{} {} from {}{}", keyword, clauses.join(", "), module, terminator)
}

fn brace_list(names: &[String], padded: bool) -> String {
    let inner = names.join(", ");
    if padded {
        format!("{{ {} }}", inner)
    } else {
        format!("{{{}}}", inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuoteChar;
    use crate::imports::parse_imports;

    fn style(quote: QuoteChar, semicolon: bool, space_around_braces: bool) -> ImportStyle {
        ImportStyle {
            quote,
            semicolon,
            space_around_braces,
        }
    }

    #[test]
    fn test_render_named() {
        let stmt = ImportStatement::new_named("Lakia", "./dinah_widdoes");
        assert_eq!(
            render(&stmt, &ImportStyle::default()),
            "import {Lakia} from './dinah_widdoes'"
        );
        assert_eq!(
            render(&stmt, &style(QuoteChar::Double, true, true)),
            "import { Lakia } from \"./dinah_widdoes\";"
        );
    }

    #[test]
    fn test_render_mixed_and_namespace() {
        let mut mixed = ImportStatement::new_default("React", "react");
        mixed.add_named("useState");
        mixed.add_named("useCallback");
        assert_eq!(
            render(&mixed, &style(QuoteChar::Single, false, true)),
            "import React, { useState, useCallback } from 'react'"
        );

        let mut ns = ImportStatement::new_default("def", "m");
        ns.namespace_specifier = Some("all".to_string());
        assert_eq!(render(&ns, &ImportStyle::default()), "import def, * as all from 'm'");
    }

    #[test]
    fn test_render_side_effect() {
        let stmt = ImportStatement::new_side_effect("rxjs/operators/map");
        assert_eq!(render(&stmt, &style(QuoteChar::Double, true, false)), "import \"rxjs/operators/map\";");
    }

    #[test]
    fn test_render_type_only() {
        let mut stmt = ImportStatement::new_named("Props", "./types");
        stmt.is_type_only = true;
        assert_eq!(render(&stmt, &ImportStyle::default()), "import type {Props} from './types'");
    }

    #[test]
    fn test_style_of_parsed_statement() {
        let parsed = parse_imports("import React from \"react\";\nimport {a} from 'a'\n");
        let react = ImportStyle::of_statement(&parsed.statements[0]);
        assert_eq!(react, style(QuoteChar::Double, true, true));

        let a = ImportStyle::of_statement(&parsed.statements[1]);
        assert_eq!(a, style(QuoteChar::Single, false, false));
    }

    #[test]
    fn test_rerender_keeps_original_text() {
        for line in [
            "import React, { useCallback } from 'react'",
            "import {x1, x2} from './component/x'",
            "import * as fs from \"fs\";",
            "import type { T } from './t';",
        ] {
            let parsed = parse_imports(line);
            let stmt = &parsed.statements[0];
            assert_eq!(render(stmt, &ImportStyle::of_statement(stmt)), line);
        }
    }
}
