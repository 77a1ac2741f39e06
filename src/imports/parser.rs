//! Import statement parser
//!
//! Walks the buffer line by line. A line whose first token is the `import`
//! keyword (not `import(` or `import.meta`) starts a statement, which is then
//! read token by token, possibly across several lines. Statements that do not
//! fit any import form are treated as ordinary code lines.

use super::lexer::{Lexer, Token, TokenKind};
use super::ImportStatement;

/// Lines spanned by the leading run of import statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportBlock {
    pub first_line: usize,
    pub last_line: usize,
}

/// Result of parsing one buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedImports {
    /// Every import statement in the buffer, in order
    pub statements: Vec<ImportStatement>,
    /// The leading contiguous import block, if the buffer starts with one
    ///
    /// Blank and comment-only lines neither start nor end the block; the first
    /// other line ends it.
    pub block: Option<ImportBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineClass {
    Blank,
    Comment,
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockScan {
    Searching,
    Inside,
    Closed,
}

/// Parse all import statements of a buffer
pub fn parse_imports(buffer: &str) -> ParsedImports {
    let line_starts = line_starts(buffer);
    let mut parsed = ParsedImports::default();
    let mut scan = BlockScan::Searching;
    let mut in_block_comment = false;
    let mut line = 0;

    while line < line_starts.len() {
        let start = line_starts[line];
        let end = line_end(buffer, &line_starts, line);
        let text = &buffer[start..end];

        let (class, statement) = if in_block_comment {
            match text.find("*/") {
                Some(pos) => {
                    in_block_comment = false;
                    let rest = text[pos + 2..].trim();
                    (if rest.is_empty() { LineClass::Comment } else { LineClass::Code }, None)
                }
                None => (LineClass::Comment, None),
            }
        } else {
            classify_line(buffer, start, line, text, &mut in_block_comment)
        };

        match statement {
            Some(statement) => {
                let last_line = statement.line_range.1;
                let tail_end = line_end(buffer, &line_starts, last_line);
                if leaves_comment_open(&buffer[statement.byte_range.end..tail_end]) {
                    in_block_comment = true;
                }
                match scan {
                    BlockScan::Searching => {
                        parsed.block = Some(ImportBlock {
                            first_line: line,
                            last_line,
                        });
                        scan = BlockScan::Inside;
                    }
                    BlockScan::Inside => {
                        if let Some(block) = parsed.block.as_mut() {
                            block.last_line = last_line;
                        }
                    }
                    BlockScan::Closed => {}
                }
                parsed.statements.push(statement);
                line = last_line + 1;
            }
            None => {
                if class == LineClass::Code && scan != BlockScan::Closed {
                    scan = BlockScan::Closed;
                }
                line += 1;
            }
        }
    }

    parsed
}

fn classify_line(
    buffer: &str,
    start: usize,
    line: usize,
    text: &str,
    in_block_comment: &mut bool,
) -> (LineClass, Option<ImportStatement>) {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return (LineClass::Blank, None);
    }
    if trimmed.starts_with("//") {
        return (LineClass::Comment, None);
    }
    if let Some(after_open) = trimmed.strip_prefix("/*") {
        return match after_open.find("*/") {
            Some(pos) if after_open[pos + 2..].trim().is_empty() => (LineClass::Comment, None),
            Some(_) => (LineClass::Code, None),
            None => {
                *in_block_comment = true;
                (LineClass::Comment, None)
            }
        };
    }

    let starts_with_import = trimmed
        .strip_prefix("import")
        .map(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(false);
    if !starts_with_import {
        return (LineClass::Code, None);
    }

    let indent = text.len() - text.trim_start().len();
    match parse_statement(buffer, start + indent, line) {
        Some(statement) => (LineClass::Code, Some(statement)),
        None => {
            log::debug!("Line {} starts with import but is not an import statement: {}", line + 1, trimmed);
            (LineClass::Code, None)
        }
    }
}

/// True if `text` opens a `/*` comment it does not close
fn leaves_comment_open(mut text: &str) -> bool {
    loop {
        let open = text.find("/*");
        match (open, text.find("//")) {
            (Some(open), Some(line_comment)) if line_comment < open => return false,
            (None, _) => return false,
            (Some(open), _) => match text[open + 2..].find("*/") {
                Some(close) => text = &text[open + 2 + close + 2..],
                None => return true,
            },
        }
    }
}

/// Byte offset of each line start
pub fn line_starts(buffer: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in buffer.bytes().enumerate() {
        if b == b'\n' && i + 1 < buffer.len() {
            starts.push(i + 1);
        }
    }
    if buffer.is_empty() {
        starts.clear();
    }
    starts
}

/// End of a line's text, excluding the newline (and a preceding `\r`)
fn line_end(buffer: &str, starts: &[usize], line: usize) -> usize {
    let mut end = starts.get(line + 1).map(|next| next - 1).unwrap_or(buffer.len());
    if buffer[..end].ends_with('\n') {
        end -= 1;
    }
    if buffer[..end].ends_with('\r') {
        end -= 1;
    }
    end.max(starts[line])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Right after `import`
    Start,
    /// After `import type`
    AfterType,
    /// After the default specifier
    AfterDefault,
    /// After `default,`: a namespace or brace list must follow
    ExpectClause,
    /// After `*`
    ExpectNamespaceAs,
    /// After `* as`
    ExpectNamespaceName,
    /// Inside `{ ... }`
    InBraces,
    /// After the namespace or brace list
    AfterClause,
    /// After `from`
    ExpectModule,
}

/// Parse one statement whose `import` keyword starts at `offset`
fn parse_statement(buffer: &str, offset: usize, line: usize) -> Option<ImportStatement> {
    let mut lexer = Lexer::at(buffer, offset, line).peekable();

    let first = lexer.next()?;
    if first.kind != TokenKind::Import {
        return None;
    }

    // import(...) and import.meta are expressions
    if matches!(
        lexer.peek().map(|t| &t.kind),
        Some(TokenKind::ParenOpen) | Some(TokenKind::Dot) | None
    ) {
        return None;
    }

    let mut statement = ImportStatement::new_side_effect("");
    let mut state = State::Start;
    let mut current_spec: Vec<String> = Vec::new();
    let module_end: usize;
    let module_line: usize;

    loop {
        let token = lexer.next()?;

        state = match (state, &token.kind) {
            (State::Start, TokenKind::Type) => {
                // `import type from 'x'` / `import type, {...}` bind a default named `type`
                match lexer.peek().map(|t| &t.kind) {
                    Some(TokenKind::From) | Some(TokenKind::Comma) => {
                        statement.default_specifier = Some("type".to_string());
                        State::AfterDefault
                    }
                    _ => {
                        statement.is_type_only = true;
                        State::AfterType
                    }
                }
            }
            (State::Start, TokenKind::Str { value, quote }) => {
                statement.source_module = value.clone();
                statement.quote = *quote;
                module_end = token.end;
                module_line = token.line;
                break;
            }
            (State::Start | State::AfterType, TokenKind::Ident(name)) => {
                statement.default_specifier = Some(name.clone());
                State::AfterDefault
            }
            (State::Start | State::AfterType | State::ExpectClause, TokenKind::Star) => {
                State::ExpectNamespaceAs
            }
            (State::Start | State::AfterType | State::ExpectClause, TokenKind::BraceOpen) => {
                statement.brace_padding = brace_padding(buffer, &token);
                State::InBraces
            }
            (State::AfterDefault, TokenKind::Comma) => State::ExpectClause,
            (State::AfterDefault | State::AfterClause, TokenKind::From) => State::ExpectModule,
            (State::ExpectNamespaceAs, TokenKind::As) => State::ExpectNamespaceName,
            (State::ExpectNamespaceName, TokenKind::Ident(name)) => {
                statement.namespace_specifier = Some(name.clone());
                State::AfterClause
            }
            (State::InBraces, TokenKind::Comma) => {
                push_specifier(&mut statement, &mut current_spec);
                State::InBraces
            }
            (State::InBraces, TokenKind::BraceClose) => {
                push_specifier(&mut statement, &mut current_spec);
                State::AfterClause
            }
            (State::InBraces, kind) => {
                current_spec.push(specifier_word(kind)?);
                State::InBraces
            }
            (State::ExpectModule, TokenKind::Str { value, quote }) => {
                statement.source_module = value.clone();
                statement.quote = *quote;
                module_end = token.end;
                module_line = token.line;
                break;
            }
            _ => return None,
        };
    }

    let mut end = module_end;
    let mut last_line = module_line;

    if let Some(next) = lexer.peek() {
        if next.kind == TokenKind::Semicolon && next.line == module_line {
            statement.has_semicolon = true;
            end = next.end;
            last_line = next.line;
        }
    }

    statement.line_range = (line, last_line);
    statement.byte_range = offset..end;
    Some(statement)
}

fn push_specifier(statement: &mut ImportStatement, words: &mut Vec<String>) {
    if words.is_empty() {
        return;
    }
    let spec = words.join(" ");
    words.clear();
    statement.add_named(&spec);
}

/// Text of a token that may appear inside a brace list
fn specifier_word(kind: &TokenKind) -> Option<String> {
    match kind {
        TokenKind::Ident(name) => Some(name.clone()),
        TokenKind::As => Some("as".to_string()),
        TokenKind::Type => Some("type".to_string()),
        TokenKind::From => Some("from".to_string()),
        TokenKind::Import => Some("import".to_string()),
        TokenKind::Str { value, quote } => {
            let q = quote.as_char();
            Some(format!("{}{}{}", q, value, q))
        }
        _ => None,
    }
}

/// Padding style of a brace list from the character after `{`
fn brace_padding(buffer: &str, open: &Token) -> Option<bool> {
    let next = buffer[open.end..].chars().next()?;
    if next == '}' {
        return None;
    }
    Some(next.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuoteChar;
    use crate::imports::ImportKind;

    fn single(src: &str) -> ImportStatement {
        let parsed = parse_imports(src);
        assert_eq!(parsed.statements.len(), 1, "expected one statement in {:?}", src);
        parsed.statements.into_iter().next().unwrap()
    }

    #[test]
    fn test_default_import() {
        let stmt = single("import React from 'react'\n");
        assert_eq!(stmt.default_specifier.as_deref(), Some("React"));
        assert_eq!(stmt.source_module, "react");
        assert_eq!(stmt.quote, QuoteChar::Single);
        assert!(!stmt.has_semicolon);
        assert_eq!(stmt.brace_padding, None);
        assert_eq!(stmt.kind(), ImportKind::DefaultOnly);
        assert_eq!(stmt.byte_range, 0..25);
    }

    #[test]
    fn test_mixed_import() {
        let stmt = single("import React, { useState, useCallback } from \"react\";");
        assert_eq!(stmt.default_specifier.as_deref(), Some("React"));
        assert_eq!(stmt.named_specifiers, vec!["useState", "useCallback"]);
        assert_eq!(stmt.quote, QuoteChar::Double);
        assert!(stmt.has_semicolon);
        assert_eq!(stmt.brace_padding, Some(true));
        assert_eq!(stmt.kind(), ImportKind::Mixed);
    }

    #[test]
    fn test_namespace_import() {
        let stmt = single("import * as worker_threads from 'worker_threads'");
        assert_eq!(stmt.namespace_specifier.as_deref(), Some("worker_threads"));
        assert_eq!(stmt.kind(), ImportKind::Namespace);

        let both = single("import def, * as ns from 'm'");
        assert_eq!(both.default_specifier.as_deref(), Some("def"));
        assert_eq!(both.namespace_specifier.as_deref(), Some("ns"));
    }

    #[test]
    fn test_side_effect_import() {
        let stmt = single("import \"rxjs/operators/map\"\n");
        assert!(stmt.is_side_effect_only());
        assert_eq!(stmt.source_module, "rxjs/operators/map");
    }

    #[test]
    fn test_unpadded_braces_and_aliases() {
        let stmt = single("import {a, b as c, type T} from './x'");
        assert_eq!(stmt.brace_padding, Some(false));
        assert_eq!(stmt.named_specifiers, vec!["a", "b as c", "type T"]);
    }

    #[test]
    fn test_type_only_import() {
        let stmt = single("import type { Props } from './types';");
        assert!(stmt.is_type_only);
        assert_eq!(stmt.named_specifiers, vec!["Props"]);

        let named_type = single("import type from './type'");
        assert!(!named_type.is_type_only);
        assert_eq!(named_type.default_specifier.as_deref(), Some("type"));
    }

    #[test]
    fn test_multiline_statement() {
        let src = "import {\n  a,\n  b,\n} from 'm';\nconst x = 1;\n";
        let parsed = parse_imports(src);
        assert_eq!(parsed.statements.len(), 1);
        let stmt = &parsed.statements[0];
        assert_eq!(stmt.named_specifiers, vec!["a", "b"]);
        assert_eq!(stmt.line_range, (0, 3));
        assert_eq!(&src[stmt.byte_range.clone()], "import {\n  a,\n  b,\n} from 'm';");
        assert_eq!(parsed.block, Some(ImportBlock { first_line: 0, last_line: 3 }));
    }

    #[test]
    fn test_duplicate_named_collapse() {
        let stmt = single("import { a, a } from 'm'");
        assert_eq!(stmt.named_specifiers, vec!["a"]);
    }

    #[test]
    fn test_block_after_blank_lines() {
        let src = format!("{}import x from \"x\"\n", "\n".repeat(14));
        let parsed = parse_imports(&src);
        assert_eq!(parsed.statements.len(), 1);
        assert_eq!(parsed.statements[0].line_range, (14, 14));
        assert_eq!(parsed.block, Some(ImportBlock { first_line: 14, last_line: 14 }));
    }

    #[test]
    fn test_block_ends_at_first_code_line() {
        let src = "// header\nimport a from 'a'\n\n/* note */\nimport b from 'b'\nconst z = 1\nimport c from 'c'\n";
        let parsed = parse_imports(src);
        assert_eq!(parsed.statements.len(), 3);
        assert_eq!(parsed.block, Some(ImportBlock { first_line: 1, last_line: 4 }));
    }

    #[test]
    fn test_code_before_imports_means_no_block() {
        let parsed = parse_imports("const a = 1\nimport b from 'b'\n");
        assert_eq!(parsed.statements.len(), 1);
        assert_eq!(parsed.block, None);
    }

    #[test]
    fn test_dynamic_import_and_meta_are_code() {
        let parsed = parse_imports("import('x').then(run)\nimport.meta.url\n");
        assert!(parsed.statements.is_empty());
        assert_eq!(parsed.block, None);
    }

    #[test]
    fn test_malformed_lines_degrade() {
        let parsed = parse_imports("import { a from 'a'\nimport b from 'b'\nimport x = require('x')\n");
        // The unclosed brace list runs on into the next lines until `=`
        assert_eq!(parsed.statements.len(), 1);
        assert_eq!(parsed.statements[0].source_module, "b");
        assert_eq!(parsed.block, None);
    }

    #[test]
    fn test_import_inside_block_comment_is_ignored() {
        let src = "/*\nimport a from 'a'\n*/\nimport b from 'b'\n";
        let parsed = parse_imports(src);
        assert_eq!(parsed.statements.len(), 1);
        assert_eq!(parsed.statements[0].source_module, "b");
        assert_eq!(parsed.block, Some(ImportBlock { first_line: 3, last_line: 3 }));
    }

    #[test]
    fn test_comment_opened_after_statement() {
        let src = "import a from 'a' /* old:\nimport c from 'c'\n*/\nimport b from 'b'; /* ok */\nrun()\n";
        let parsed = parse_imports(src);
        let modules: Vec<&str> = parsed.statements.iter().map(|s| s.source_module.as_str()).collect();
        assert_eq!(modules, vec!["a", "b"]);
        assert_eq!(parsed.block, Some(ImportBlock { first_line: 0, last_line: 3 }));
    }

    #[test]
    fn test_crlf_lines() {
        let parsed = parse_imports("import a from 'a'\r\nimport {b} from 'b';\r\n");
        assert_eq!(parsed.statements.len(), 2);
        assert!(parsed.statements[1].has_semicolon);
        assert_eq!(parsed.block, Some(ImportBlock { first_line: 0, last_line: 1 }));
    }

    #[test]
    fn test_empty_buffer() {
        let parsed = parse_imports("");
        assert!(parsed.statements.is_empty());
        assert!(parsed.block.is_none());
        assert!(line_starts("").is_empty());
        assert_eq!(line_starts("a\nb\n"), vec![0, 2]);
    }
}
