//! AST for the resource manifest language.
//!
//! The tree is deliberately small: a unit is a flat list of top-level
//! items, and the only expression language is the constant integer
//! arithmetic permitted inside a template argument list.

use std::fmt;

/// Byte range of a syntax node within its source unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Translate the span start into a 1-based line:column pair.
    pub fn line_col(&self, source: &str) -> (u32, u32) {
        let upto = &source[..(self.start as usize).min(source.len())];
        let line = upto.bytes().filter(|&b| b == b'\n').count() as u32 + 1;
        let col = upto.rsplit('\n').next().map_or(0, |l| l.chars().count()) as u32 + 1;
        (line, col)
    }
}

/// A parsed manifest unit.
#[derive(Debug, Clone, Default)]
pub struct Unit {
    pub items: Vec<Item>,
}

/// Top-level item of a manifest unit.
///
/// Anything the parser does not recognize as one of the two meaningful
/// statement forms is preserved as `Skipped` so that downstream passes
/// can see that scanning was best-effort, not exhaustive.
#[derive(Debug, Clone)]
pub enum Item {
    /// `const path::To::Template<ID> NAME = "file";`
    Resource(ResourceDecl),
    /// `include "other.resh";`
    Include(IncludeDecl),
    /// An unrecognized top-level statement, skipped to its `;` boundary.
    Skipped(Span),
}

/// A candidate resource-binding declaration.
///
/// The parser only guarantees the syntactic shape; whether the template
/// path matches the configured binding template, and whether the ID
/// expression folds to a constant, is decided by the scanner.
#[derive(Debug, Clone)]
pub struct ResourceDecl {
    /// Qualified template path, e.g. `["resman", "Resource"]`.
    pub template: Vec<String>,
    /// The single template argument.
    pub id_expr: Expr,
    /// Declared variable name (unused by the compiler, kept for diagnostics).
    pub name: String,
    /// The initializer, when it is exactly one string literal.
    ///
    /// `None` means the initializer had some other form and the
    /// declaration must be skipped.
    pub path: Option<String>,
    pub span: Span,
}

/// An `include` statement splicing another unit.
#[derive(Debug, Clone)]
pub struct IncludeDecl {
    pub path: String,
    pub span: Span,
}

/// Constant integer expression used as a template argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(u64),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// A subexpression the grammar accepts but constant folding cannot
    /// evaluate (currently only identifiers).
    Opaque,
}

/// Binary operator inside a constant ID expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Shl,
    BitOr,
    BitAnd,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Shl => "<<",
            BinOp::BitOr => "|",
            BinOp::BitAnd => "&",
        };
        f.write_str(s)
    }
}

impl Expr {
    /// Fold the expression to an unsigned 64-bit constant.
    ///
    /// Returns `None` for opaque subexpressions and for any operation
    /// that overflows, making the enclosing declaration skippable
    /// rather than a hard error.
    pub fn fold(&self) -> Option<u64> {
        match self {
            Expr::Int(v) => Some(*v),
            Expr::Opaque => None,
            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.fold()?;
                let r = rhs.fold()?;
                match op {
                    BinOp::Add => l.checked_add(r),
                    BinOp::Sub => l.checked_sub(r),
                    BinOp::Mul => l.checked_mul(r),
                    BinOp::Shl => {
                        if r < 64 {
                            l.checked_shl(r as u32)
                        } else {
                            None
                        }
                    }
                    BinOp::BitOr => Some(l | r),
                    BinOp::BitAnd => Some(l & r),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[test]
    fn fold_arithmetic() {
        let e = bin(BinOp::Add, Expr::Int(0x10), Expr::Int(2));
        assert_eq!(e.fold(), Some(18));

        let e = bin(BinOp::Shl, Expr::Int(1), Expr::Int(8));
        assert_eq!(e.fold(), Some(256));

        let e = bin(BinOp::BitOr, Expr::Int(0xF0), Expr::Int(0x0F));
        assert_eq!(e.fold(), Some(0xFF));
    }

    #[test]
    fn fold_overflow_is_none() {
        let e = bin(BinOp::Add, Expr::Int(u64::MAX), Expr::Int(1));
        assert_eq!(e.fold(), None);

        let e = bin(BinOp::Shl, Expr::Int(1), Expr::Int(64));
        assert_eq!(e.fold(), None);

        let e = bin(BinOp::Sub, Expr::Int(1), Expr::Int(2));
        assert_eq!(e.fold(), None);
    }

    #[test]
    fn fold_opaque_is_none() {
        let e = bin(BinOp::Add, Expr::Int(1), Expr::Opaque);
        assert_eq!(e.fold(), None);
    }

    #[test]
    fn line_col() {
        let source = "abc\ndef ghi";
        assert_eq!(Span::new(0, 3).line_col(source), (1, 1));
        assert_eq!(Span::new(8, 11).line_col(source), (2, 5));
    }
}
