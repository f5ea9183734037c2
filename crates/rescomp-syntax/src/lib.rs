//! Syntax frontend for the rescomp resource manifest language.
//!
//! A manifest unit is a flat list of top-level statements. Two forms
//! carry meaning:
//!
//! ```text
//! include "more.resh";
//! const resman::Resource<0x10 + 2> SPLASH = "art/splash.rgba";
//! ```
//!
//! Everything else at the top level is tolerated and skipped. The
//! crate exposes the token type, the AST, and [`parse`], which runs
//! lexing and parsing in one step.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{BinOp, Expr, IncludeDecl, Item, ResourceDecl, Span, Unit};
pub use lexer::Token;
pub use parser::{ParseError, ParseErrorKind};

/// Lex and parse a manifest unit.
///
/// Unreadable input (a lexer failure) is reported as a single
/// [`ParseErrorKind::Unreadable`] error at the offending byte span.
pub fn parse(source: &str) -> Result<Unit, Vec<ParseError>> {
    let tokens = match lexer::tokenize(source) {
        Ok(tokens) => tokens,
        Err(span) => {
            return Err(vec![ParseError {
                kind: ParseErrorKind::Unreadable,
                span: Span::new(span.start, span.end),
                message: format!("unreadable input at byte {}", span.start),
            }])
        }
    };
    parser::parse_unit(&tokens, source.len())
}
