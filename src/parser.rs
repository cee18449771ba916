//! Recursive-descent parser: `expr := NUMBER | IDENT '(' [expr (',' expr)*] ')'`.
//!
//! `vec2`/`vec3` are the only two identifiers with dedicated AST variants;
//! every other identifier becomes `Expr::Call`. See `spec.md` §4.2.

use thiserror::Error;

use crate::ast::Expr;
use crate::lexer::{LexError, Lexer};
use crate::token::{Token, TokenKind};

/// A parse error: an unexpected token, wrong arity for a `vec2`/`vec3`
/// literal, or trailing input after the root expression.
#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("expected {expected} at {line}:{column}, got {got}")]
    UnexpectedToken {
        expected: TokenKind,
        got: TokenKind,
        line: u32,
        column: u32,
    },
    #[error("unexpected token {got} at {line}:{column}")]
    UnexpectedStart {
        got: TokenKind,
        line: u32,
        column: u32,
    },
    #[error("vec3 expects 3 arguments, got {got} at {line}:{column}")]
    Vec3Arity { got: usize, line: u32, column: u32 },
    #[error("vec2 expects 2 arguments, got {got} at {line}:{column}")]
    Vec2Arity { got: usize, line: u32, column: u32 },
    #[error("expected EOF at {line}:{column}, got {got}")]
    TrailingInput {
        got: TokenKind,
        line: u32,
        column: u32,
    },
}

/// Parses a token stream into an [`Expr`] tree.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    pub fn from_source(src: &str) -> Result<Self, ParseError> {
        Ok(Parser::new(Lexer::new(src).tokenize()?))
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let tok = self.peek().clone();
        if tok.kind != kind {
            return Err(ParseError::UnexpectedToken {
                expected: kind,
                got: tok.kind,
                line: tok.line,
                column: tok.column,
            });
        }
        Ok(self.advance())
    }

    /// Parses a single expression (not necessarily the whole input).
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Number => {
                self.advance();
                Ok(Expr::Number(tok.value.unwrap_or(0.0)))
            }
            TokenKind::Ident => {
                let name = self.advance().lexeme;
                self.expect(TokenKind::LParen)?;
                let mut args = Vec::new();
                if self.peek().kind != TokenKind::RParen {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.peek().kind == TokenKind::Comma {
                            self.advance();
                            continue;
                        }
                        break;
                    }
                }
                let rparen = self.expect(TokenKind::RParen)?;
                match name.as_str() {
                    "vec3" => {
                        if args.len() != 3 {
                            return Err(ParseError::Vec3Arity {
                                got: args.len(),
                                line: rparen.line,
                                column: rparen.column,
                            });
                        }
                        let mut it = args.into_iter();
                        Ok(Expr::vec3(
                            it.next().unwrap(),
                            it.next().unwrap(),
                            it.next().unwrap(),
                        ))
                    }
                    "vec2" => {
                        if args.len() != 2 {
                            return Err(ParseError::Vec2Arity {
                                got: args.len(),
                                line: rparen.line,
                                column: rparen.column,
                            });
                        }
                        let mut it = args.into_iter();
                        Ok(Expr::vec2(it.next().unwrap(), it.next().unwrap()))
                    }
                    _ => Ok(Expr::Call(name, args)),
                }
            }
            other => Err(ParseError::UnexpectedStart {
                got: other,
                line: tok.line,
                column: tok.column,
            }),
        }
    }

    /// Parses the whole input as a single root expression, requiring `EOF`
    /// immediately after it.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        let tok = self.peek();
        if tok.kind != TokenKind::Eof {
            return Err(ParseError::TrailingInput {
                got: tok.kind,
                line: tok.line,
                column: tok.column,
            });
        }
        Ok(expr)
    }
}

/// Parses a complete source string into an [`Expr`] tree.
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    Parser::from_source(src)?.parse()
}

#[test]
fn parses_number() {
    assert_eq!(parse("1.5").unwrap(), Expr::Number(1.5));
}

#[test]
fn parses_nested_call() {
    let expr = parse("union(sphere(1), sphere(2))").unwrap();
    assert_eq!(
        expr,
        Expr::call(
            "union",
            vec![
                Expr::call("sphere", vec![Expr::Number(1.0)]),
                Expr::call("sphere", vec![Expr::Number(2.0)]),
            ]
        )
    );
}

#[test]
fn parses_vec3_and_vec2() {
    assert_eq!(
        parse("vec3(1, 2, 3)").unwrap(),
        Expr::vec3(Expr::Number(1.0), Expr::Number(2.0), Expr::Number(3.0))
    );
    assert_eq!(
        parse("vec2(1, 2)").unwrap(),
        Expr::vec2(Expr::Number(1.0), Expr::Number(2.0))
    );
}

#[test]
fn rejects_wrong_vec3_arity() {
    let err = parse("vec3(1, 2)").unwrap_err();
    assert!(matches!(err, ParseError::Vec3Arity { got: 2, .. }));
}

#[test]
fn rejects_trailing_comma() {
    let err = parse("sphere(1,)").unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedStart { .. }));
}

#[test]
fn rejects_trailing_input() {
    let err = parse("sphere(1) sphere(2)").unwrap_err();
    assert!(matches!(err, ParseError::TrailingInput { .. }));
}

#[test]
fn parse_is_idempotent_modulo_call_shape() {
    // Re-parsing a structurally-equal source yields a structurally-equal
    // tree; the parser has no hidden state across calls.
    let a = parse("union(sphere(1), box(vec3(1,2,3)))").unwrap();
    let b = parse("union(sphere(1), box(vec3(1,2,3)))").unwrap();
    assert_eq!(a, b);
}
