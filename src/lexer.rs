//! Byte-stream tokenizer for the SDF DSL.
//!
//! Skips ASCII whitespace and `#` line comments. See `spec.md` §4.1 for the
//! exact token grammar.

use thiserror::Error;

use crate::token::{Token, TokenKind};

/// A lexical error: a malformed numeric lexeme or an unexpected character.
/// Carries the 1-indexed line and column of the offending input.
#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq)]
pub enum LexError {
    #[error("invalid number {lexeme:?} at {line}:{column}")]
    InvalidNumber {
        lexeme: String,
        line: u32,
        column: u32,
    },
    #[error("unexpected character {ch:?} at {line}:{column}")]
    UnexpectedChar { ch: char, line: u32, column: u32 },
}

/// Tokenizes a complete source string into a vector of [`Token`]s ending in
/// an `Eof` token.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> u8 {
        if self.pos < self.src.len() {
            self.src[self.pos]
        } else {
            0
        }
    }

    fn peek_at(&self, offset: usize) -> u8 {
        let idx = self.pos + offset;
        if idx < self.src.len() {
            self.src[idx]
        } else {
            0
        }
    }

    fn advance(&mut self) -> u8 {
        let ch = self.peek();
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            if self.at_end() {
                return;
            }
            let ch = self.peek();
            if ch == b' ' || ch == b'\t' || ch == b'\r' || ch == b'\n' {
                self.advance();
                continue;
            }
            if ch == b'#' {
                while !self.at_end() && self.peek() != b'\n' {
                    self.advance();
                }
                continue;
            }
            return;
        }
    }

    // The digit/`.` scan below can only ever produce a lexeme `f32::parse`
    // accepts, so `LexError::InvalidNumber` is unreachable today; kept so a
    // future scanner change (e.g. exponents) has somewhere to report to.
    fn number(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let line = self.line;
        let column = self.column;
        let mut saw_dot = false;
        loop {
            let ch = self.peek();
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == b'.' && !saw_dot {
                saw_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        let lexeme = std::str::from_utf8(&self.src[start..self.pos])
            .expect("source is valid utf-8 and this slice is ASCII digits/dot")
            .to_string();
        match lexeme.parse::<f32>() {
            Ok(value) => Ok(Token::number(lexeme, value, line, column)),
            Err(_) => Err(LexError::InvalidNumber {
                lexeme,
                line,
                column,
            }),
        }
    }

    fn ident(&mut self) -> Token {
        let start = self.pos;
        let line = self.line;
        let column = self.column;
        loop {
            let ch = self.peek();
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        let lexeme = std::str::from_utf8(&self.src[start..self.pos])
            .expect("source is valid utf-8 and this slice is ASCII ident chars")
            .to_string();
        Token::new(TokenKind::Ident, lexeme, line, column)
    }

    /// Consumes the whole source and returns its tokens, the last of which
    /// is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.at_end() {
                tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
                return Ok(tokens);
            }
            let ch = self.peek();
            if ch.is_ascii_digit() || (ch == b'.' && self.peek_at(1).is_ascii_digit()) {
                tokens.push(self.number()?);
                continue;
            }
            if ch.is_ascii_alphabetic() || ch == b'_' {
                tokens.push(self.ident());
                continue;
            }
            let line = self.line;
            let column = self.column;
            match ch {
                b'(' => {
                    self.advance();
                    tokens.push(Token::new(TokenKind::LParen, "(", line, column));
                }
                b')' => {
                    self.advance();
                    tokens.push(Token::new(TokenKind::RParen, ")", line, column));
                }
                b',' => {
                    self.advance();
                    tokens.push(Token::new(TokenKind::Comma, ",", line, column));
                }
                _ => {
                    self.advance();
                    return Err(LexError::UnexpectedChar {
                        ch: ch as char,
                        line,
                        column,
                    });
                }
            }
        }
    }
}

#[test]
fn tokenizes_call_with_numbers() {
    let tokens = Lexer::new("sphere(1.5)").tokenize().unwrap();
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Ident,
            TokenKind::LParen,
            TokenKind::Number,
            TokenKind::RParen,
            TokenKind::Eof,
        ]
    );
    assert_eq!(tokens[2].value, Some(1.5));
}

#[test]
fn skips_comments_and_tracks_position() {
    let tokens = Lexer::new("# hello\nsphere(1)").tokenize().unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Ident);
    assert_eq!(tokens[0].line, 2);
    assert_eq!(tokens[0].column, 1);
}

#[test]
fn leading_dot_number() {
    let tokens = Lexer::new(".5").tokenize().unwrap();
    assert_eq!(tokens[0].value, Some(0.5));
}

#[test]
fn rejects_unexpected_character() {
    let err = Lexer::new("sphere(1) @").tokenize().unwrap_err();
    match err {
        LexError::UnexpectedChar { ch, .. } => assert_eq!(ch, '@'),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn two_dots_lex_as_two_numbers() {
    // The scanner stops a number at its first `.`, so "1.2.3" is NUMBER(1.2)
    // followed by NUMBER(.3); rejecting the overall shape is the parser's
    // job (trailing input after the root expression), not the lexer's.
    let tokens = Lexer::new("1.2.3").tokenize().unwrap();
    assert_eq!(tokens[0].value, Some(1.2));
    assert_eq!(tokens[1].value, Some(0.3));
}
