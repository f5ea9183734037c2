//! Hand-written recursive descent parser for manifest units.
//!
//! The grammar is tiny, so the parser is a single keyword-dispatched
//! loop over a token stream with one token of lookahead. Two statement
//! forms are meaningful (`const` resource declarations and `include`);
//! every other top-level statement is skipped to its `;` boundary,
//! because scanning is best-effort pattern matching, not validation of
//! the whole unit.
//!
//! Errors are collected with statement-level synchronization so a unit
//! reports all of its problems in one pass, but any error at all makes
//! the unit unusable.

use std::ops::Range;

use thiserror::Error;

use crate::ast::{BinOp, Expr, IncludeDecl, Item, ResourceDecl, Span, Unit};
use crate::lexer::Token;

/// Parse error with source location.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

/// Category of parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A specific token was expected and something else was found.
    UnexpectedToken,
    /// Input ended while a recognized statement form was incomplete.
    UnexpectedEof,
    /// The input could not be tokenized at all.
    Unreadable,
}

impl ParseError {
    fn expected(what: &str, found: Option<&Token>, span: Span) -> Self {
        let message = match found {
            Some(tok) => format!("expected {what}, found {tok:?}"),
            None => format!("expected {what}, found end of input"),
        };
        Self {
            kind: if found.is_none() {
                ParseErrorKind::UnexpectedEof
            } else {
                ParseErrorKind::UnexpectedToken
            },
            span,
            message,
        }
    }
}

/// Token stream with one-token lookahead and span tracking.
struct TokenStream<'src> {
    tokens: &'src [(Token, Range<usize>)],
    pos: usize,
    source_len: usize,
}

impl<'src> TokenStream<'src> {
    fn new(tokens: &'src [(Token, Range<usize>)], source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            source_len,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|(tok, _)| tok);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Span of the current token, or a zero-width span at EOF.
    fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, range)) => Span::new(range.start, range.end),
            None => Span::new(self.source_len, self.source_len),
        }
    }

    /// Span from the start of token `start_pos` to the last consumed token.
    fn span_from(&self, start_pos: usize) -> Span {
        let start = self
            .tokens
            .get(start_pos)
            .map_or(self.source_len, |(_, r)| r.start);
        let end = if self.pos > 0 {
            self.tokens
                .get(self.pos - 1)
                .map_or(self.source_len, |(_, r)| r.end)
        } else {
            start
        };
        Span::new(start, end)
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        match self.peek() {
            Some(tok) if std::mem::discriminant(tok) == std::mem::discriminant(expected) => {
                self.advance();
                Ok(())
            }
            found => Err(ParseError::expected(what, found, self.current_span())),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            found => Err(ParseError::expected(what, found, self.current_span())),
        }
    }

    /// Consume tokens up to and including the next `;`.
    fn skip_statement(&mut self) {
        while let Some(tok) = self.advance() {
            if matches!(tok, Token::Semicolon) {
                break;
            }
        }
    }
}

/// Parse a lexed manifest unit.
///
/// `source_len` is the byte length of the original source, used to
/// position end-of-input diagnostics.
pub fn parse_unit(
    tokens: &[(Token, Range<usize>)],
    source_len: usize,
) -> Result<Unit, Vec<ParseError>> {
    let mut stream = TokenStream::new(tokens, source_len);
    let mut items = Vec::new();
    let mut errors = Vec::new();

    while !stream.at_end() {
        match parse_item(&mut stream) {
            Ok(item) => items.push(item),
            Err(e) => {
                errors.push(e);
                stream.skip_statement();
            }
        }
    }

    if errors.is_empty() {
        Ok(Unit { items })
    } else {
        Err(errors)
    }
}

fn parse_item(stream: &mut TokenStream) -> Result<Item, ParseError> {
    match stream.peek() {
        Some(Token::Include) => parse_include(stream),
        Some(Token::Const) => parse_const(stream),
        Some(_) => {
            let start = stream.pos;
            stream.skip_statement();
            Ok(Item::Skipped(stream.span_from(start)))
        }
        None => unreachable!("parse_item called at end of stream"),
    }
}

/// Parse `include "path";`.
fn parse_include(stream: &mut TokenStream) -> Result<Item, ParseError> {
    let start = stream.pos;
    stream.advance(); // include

    let path = match stream.peek() {
        Some(Token::String(path)) => {
            let path = path.clone();
            stream.advance();
            path
        }
        found => {
            return Err(ParseError::expected(
                "string literal after `include`",
                found,
                stream.current_span(),
            ))
        }
    };
    stream.expect(&Token::Semicolon, "`;` after include")?;

    Ok(Item::Include(IncludeDecl {
        path,
        span: stream.span_from(start),
    }))
}

/// Parse a `const` declaration.
///
/// Only the exact binding shape produces a [`ResourceDecl`]:
///
/// ```text
/// const path::To::Template<EXPR> NAME = "file";
/// ```
///
/// A `const` statement that deviates from the shape in a recoverable
/// way (no template argument list, a second template argument, an
/// initializer that is not one string literal) is skipped silently.
/// A statement that is recognizably of the shape but truncated or
/// malformed is a parse error.
fn parse_const(stream: &mut TokenStream) -> Result<Item, ParseError> {
    let start = stream.pos;
    stream.advance(); // const

    // Qualified template path.
    let mut template = vec![stream.expect_ident("type name after `const`")?];
    while matches!(stream.peek(), Some(Token::PathSep)) {
        stream.advance();
        template.push(stream.expect_ident("identifier after `::`")?);
    }

    // A single-argument template argument list is what makes this a
    // binding candidate at all.
    if !matches!(stream.peek(), Some(Token::Lt)) {
        stream.skip_statement();
        return Ok(Item::Skipped(stream.span_from(start)));
    }
    stream.advance(); // <

    let id_expr = parse_expr(stream)?;

    if matches!(stream.peek(), Some(Token::Comma)) {
        // Multi-argument template: not the binding template.
        stream.skip_statement();
        return Ok(Item::Skipped(stream.span_from(start)));
    }
    stream.expect(&Token::Gt, "`>` closing template argument")?;

    let name = stream.expect_ident("declaration name")?;
    stream.expect(&Token::Eq, "`=` before initializer")?;

    // Exactly one string literal; anything else renders the
    // declaration skippable but still consumes the statement.
    let path = match stream.peek() {
        Some(Token::String(path)) => {
            let path = path.clone();
            stream.advance();
            if matches!(stream.peek(), Some(Token::Semicolon)) {
                stream.advance();
                Some(path)
            } else {
                stream.skip_statement();
                None
            }
        }
        Some(_) => {
            stream.skip_statement();
            None
        }
        None => {
            return Err(ParseError::expected(
                "initializer",
                None,
                stream.current_span(),
            ))
        }
    };

    Ok(Item::Resource(ResourceDecl {
        template,
        id_expr,
        name,
        path,
        span: stream.span_from(start),
    }))
}

/// Binding power of a binary operator, C-like: `*` over `+`/`-` over
/// `<<` over `&` over `|`.
fn binding_power(token: &Token) -> Option<(BinOp, u8)> {
    match token {
        Token::Star => Some((BinOp::Mul, 5)),
        Token::Plus => Some((BinOp::Add, 4)),
        Token::Minus => Some((BinOp::Sub, 4)),
        Token::Shl => Some((BinOp::Shl, 3)),
        Token::Amp => Some((BinOp::BitAnd, 2)),
        Token::Pipe => Some((BinOp::BitOr, 1)),
        _ => None,
    }
}

/// Parse a constant ID expression (precedence climbing).
fn parse_expr(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    parse_expr_bp(stream, 0)
}

fn parse_expr_bp(stream: &mut TokenStream, min_bp: u8) -> Result<Expr, ParseError> {
    let mut lhs = parse_primary(stream)?;

    while let Some(tok) = stream.peek() {
        let Some((op, bp)) = binding_power(tok) else {
            break;
        };
        if bp < min_bp {
            break;
        }
        stream.advance();
        let rhs = parse_expr_bp(stream, bp + 1)?;
        lhs = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
    }

    Ok(lhs)
}

fn parse_primary(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    match stream.peek() {
        Some(Token::Integer(v)) => {
            let v = *v;
            stream.advance();
            Ok(Expr::Int(v))
        }
        Some(Token::Ident(_)) => {
            // Named constants are syntactically accepted but cannot be
            // folded, which makes the enclosing declaration skippable.
            stream.advance();
            Ok(Expr::Opaque)
        }
        Some(Token::LParen) => {
            stream.advance();
            let inner = parse_expr(stream)?;
            stream.expect(&Token::RParen, "`)`")?;
            Ok(inner)
        }
        found => Err(ParseError::expected(
            "integer expression",
            found,
            stream.current_span(),
        )),
    }
}
