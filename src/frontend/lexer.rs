use std::{collections::BTreeMap, str::Chars};

use itertools::{PeekNth, peek_nth};
use once_cell::sync::Lazy;
use thiserror::Error;

use crate::frontend::SourceFile;

#[derive(Debug)]
pub struct Lexer<'source> {
    source: &'source SourceFile,
    position: usize,
    line_number: usize,
    chars: PeekNth<Chars<'source>>,
}

#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /* Words */
    Keyword(Keyword), // holla
    Identifier,       // x

    /* Literals */
    NumberLiteral, // 42
    StringLiteral, // "hello"

    /* Assignment */
    Arrow, // ➡️

    /* Binary Ops */
    Plus,     // +
    Minus,    // -
    Asterisk, // *
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Keyword {
    Holla,
}

/// Table of single char operator tokens (matched after longer sequences are
/// checked for)
static SINGLE_TOKENS: Lazy<BTreeMap<char, TokenKind>> = Lazy::new(|| {
    BTreeMap::from([
        ('+', TokenKind::Plus),
        ('-', TokenKind::Minus),
        ('*', TokenKind::Asterisk),
    ])
});

#[derive(Debug, Clone, Copy)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// The variation selector that follows `➡` in the assignment token
const VARIATION_SELECTOR: char = '\u{fe0f}';

#[derive(Debug, Error)]
pub enum LexError {
    #[error("invalid character '{character}' on line {line}")]
    InvalidCharacter { character: char, line: usize },
    #[error("unterminated string literal on line {line}")]
    UnterminatedString { line: usize },
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source SourceFile) -> Self {
        Self {
            source,
            position: 0,
            line_number: 1,
            chars: peek_nth(source.contents.chars()),
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;

        self.position += c.len_utf8();

        if c == '\n' {
            self.line_number += 1;
        }

        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.chars.peek().copied() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.chars.peek_nth(1) == Some(&'/') => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Produces the next token, or `None` at the end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace_and_comments();

        let Some(&c) = self.chars.peek() else {
            return Ok(None);
        };

        let start = self.position;
        let line = self.line_number;

        let kind = if c == '"' {
            self.lex_string_literal()?
        } else if c.is_ascii_digit() {
            while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }

            TokenKind::NumberLiteral
        } else if c.is_alphabetic() || c == '_' {
            while matches!(self.chars.peek(), Some(&c) if c.is_alphanumeric() || c == '_') {
                self.advance();
            }

            let word = &self.source.contents[start..self.position];

            word.parse::<Keyword>()
                .map(TokenKind::Keyword)
                .unwrap_or(TokenKind::Identifier)
        } else if c == '➡' && self.chars.peek_nth(1) == Some(&VARIATION_SELECTOR) {
            self.advance();
            self.advance();

            TokenKind::Arrow
        } else if let Some(&kind) = SINGLE_TOKENS.get(&c) {
            self.advance();

            kind
        } else {
            return Err(LexError::InvalidCharacter { character: c, line });
        };

        Ok(Some(Token {
            kind,
            span: Span {
                start,
                end: self.position,
            },
            line,
        }))
    }

    fn lex_string_literal(&mut self) -> Result<TokenKind, LexError> {
        let line = self.line_number;

        // opening quote
        self.advance();

        loop {
            match self.advance() {
                Some('"') => break,
                Some(_) => {}
                None => return Err(LexError::UnterminatedString { line }),
            }
        }

        Ok(TokenKind::StringLiteral)
    }

    /// Consumes the lexer, producing the full token stream.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::SourceFileOrigin;

    fn lex(contents: &str) -> Result<Vec<Token>, LexError> {
        let source = SourceFile {
            contents: contents.to_owned(),
            origin: SourceFileOrigin::Memory,
        };

        Lexer::new(&source).tokenize()
    }

    #[test]
    fn lexes_assignment_and_print() {
        let tokens = lex("x ➡️ 5\nholla x").unwrap();

        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::Identifier,
                TokenKind::Arrow,
                TokenKind::NumberLiteral,
                TokenKind::Keyword(Keyword::Holla),
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn string_literal_span_includes_quotes() {
        let tokens = lex("holla \"hi there\"").unwrap();

        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[1].span.start, 6);
        assert_eq!(tokens[1].span.end, 16);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let tokens = lex("// greeting\n\nholla \"hi\" // trailing\n").unwrap();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn a_single_slash_is_not_a_comment() {
        assert!(matches!(
            lex("holla 1 / 2"),
            Err(LexError::InvalidCharacter {
                character: '/',
                line: 1
            })
        ));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(matches!(
            lex("holla \"oops"),
            Err(LexError::UnterminatedString { line: 1 })
        ));
    }

    #[test]
    fn invalid_character_reports_line() {
        assert!(matches!(
            lex("x ➡️ 1\ny @ 2"),
            Err(LexError::InvalidCharacter {
                character: '@',
                line: 2
            })
        ));
    }

    #[test]
    fn operators_lex_individually() {
        let tokens = lex("1 + 2 - 3 * 4").unwrap();

        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::NumberLiteral,
                TokenKind::Plus,
                TokenKind::NumberLiteral,
                TokenKind::Minus,
                TokenKind::NumberLiteral,
                TokenKind::Asterisk,
                TokenKind::NumberLiteral,
            ]
        );
    }
}
