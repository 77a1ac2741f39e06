//! Tokenizer for import statements
//!
//! Produces just enough tokens to recognize `import` syntax. Whitespace and
//! comments are skipped; anything unrecognized becomes `Other`, which the
//! parser treats as the end of an import statement.

use crate::config::QuoteChar;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Import,
    From,
    As,
    Type,
    Ident(String),
    Star,
    BraceOpen,
    BraceClose,
    Comma,
    Str { value: String, quote: QuoteChar },
    Semicolon,
    Dot,
    ParenOpen,
    Other(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset just past the last character
    pub end: usize,
    /// 0-indexed line of the first character
    pub line: usize,
}

/// Streaming tokenizer over a buffer, starting at any byte offset
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::at(src, 0, 0)
    }

    /// Start at `offset`, which lies on 0-indexed line `line`
    pub fn at(src: &'a str, offset: usize, line: usize) -> Self {
        Self {
            src,
            pos: offset.min(src.len()),
            line,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.rest().starts_with("//") => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.rest().starts_with("/*") => {
                    self.bump();
                    self.bump();
                    loop {
                        if self.rest().starts_with("*/") {
                            self.bump();
                            self.bump();
                            break;
                        }
                        if self.bump().is_none() {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn lex_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if is_ident_char(c) {
                self.bump();
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    /// String literal after its opening quote; None if unterminated on this line
    fn lex_string(&mut self, quote: char) -> Option<String> {
        let mut value = String::new();
        loop {
            let c = self.peek_char()?;
            if c == '\n' {
                return None;
            }
            self.bump();
            if c == quote {
                return Some(value);
            }
            if c == '\\' {
                let escaped = self.bump()?;
                value.push(escaped);
            } else {
                value.push(c);
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.skip_trivia();

        let start = self.pos;
        let line = self.line;
        let c = self.peek_char()?;

        let kind = if is_ident_start(c) {
            let word = self.lex_ident();
            match word.as_str() {
                "import" => TokenKind::Import,
                "from" => TokenKind::From,
                "as" => TokenKind::As,
                "type" => TokenKind::Type,
                _ => TokenKind::Ident(word),
            }
        } else {
            self.bump();
            match c {
                '*' => TokenKind::Star,
                '{' => TokenKind::BraceOpen,
                '}' => TokenKind::BraceClose,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                '.' => TokenKind::Dot,
                '(' => TokenKind::ParenOpen,
                '\'' | '"' => {
                    let after_quote = (self.pos, self.line);
                    match self.lex_string(c) {
                        Some(value) => TokenKind::Str {
                            value,
                            quote: QuoteChar::from_char(c).unwrap_or(QuoteChar::Single),
                        },
                        None => {
                            (self.pos, self.line) = after_quote;
                            TokenKind::Other(c)
                        }
                    }
                }
                other => TokenKind::Other(other),
            }
        };

        Some(Token {
            kind,
            start,
            end: self.pos,
            line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).map(|t| t.kind).collect()
    }

    #[test]
    fn test_named_import_tokens() {
        assert_eq!(
            kinds("import { a, b as c } from 'mod';"),
            vec![
                TokenKind::Import,
                TokenKind::BraceOpen,
                TokenKind::Ident("a".to_string()),
                TokenKind::Comma,
                TokenKind::Ident("b".to_string()),
                TokenKind::As,
                TokenKind::Ident("c".to_string()),
                TokenKind::BraceClose,
                TokenKind::From,
                TokenKind::Str {
                    value: "mod".to_string(),
                    quote: QuoteChar::Single
                },
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("import /* x */ React // trailing\nfrom \"react\""),
            vec![
                TokenKind::Import,
                TokenKind::Ident("React".to_string()),
                TokenKind::From,
                TokenKind::Str {
                    value: "react".to_string(),
                    quote: QuoteChar::Double
                },
            ]
        );
    }

    #[test]
    fn test_positions_and_lines() {
        let tokens: Vec<Token> = Lexer::new("import x\n  from 'y'").collect();
        assert_eq!(tokens[1].start, 7);
        assert_eq!(tokens[1].end, 8);
        assert_eq!(tokens[2].line, 1);
        assert_eq!(tokens[3].start, 16);
        assert_eq!(tokens[3].end, 19);
    }

    #[test]
    fn test_nested_quotes_and_escapes() {
        assert_eq!(
            kinds(r#"'it"s' "a\"b""#),
            vec![
                TokenKind::Str {
                    value: "it\"s".to_string(),
                    quote: QuoteChar::Single
                },
                TokenKind::Str {
                    value: "a\"b".to_string(),
                    quote: QuoteChar::Double
                },
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            kinds("'abc\nx"),
            vec![
                TokenKind::Other('\''),
                TokenKind::Ident("abc".to_string()),
                TokenKind::Ident("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_dynamic_import_tokens() {
        assert_eq!(
            kinds("import('x')")[..2],
            [TokenKind::Import, TokenKind::ParenOpen]
        );
        assert_eq!(kinds("import.meta")[1], TokenKind::Dot);
    }
}
