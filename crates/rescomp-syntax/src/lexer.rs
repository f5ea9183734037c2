//! Lexical analysis for the resource manifest language.
//!
//! Tokenization is done with logos. Comments and whitespace are stripped
//! during lexing and never reach the parser.

use logos::Logos;

/// Manifest token.
///
/// Covers the full lexical surface of the manifest language: the two
/// keywords, the punctuation of a template-typed constant declaration,
/// the operators allowed inside a constant ID expression, and literals.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")] // Skip whitespace
#[logos(skip r"//[^\n]*")] // Skip line comments
#[logos(skip r"/\*([^*]|\*[^/])*\*/")] // Skip block comments
pub enum Token {
    /// Keyword `const`
    #[token("const")]
    Const,
    /// Keyword `include`
    #[token("include")]
    Include,

    /// Path separator `::`
    #[token("::")]
    PathSep,
    /// Delimiter `<` (template argument list open)
    #[token("<")]
    Lt,
    /// Delimiter `>` (template argument list close)
    #[token(">")]
    Gt,
    /// Operator `=`
    #[token("=")]
    Eq,
    /// Operator `;`
    #[token(";")]
    Semicolon,
    /// Operator `,`
    #[token(",")]
    Comma,
    /// Delimiter `(`
    #[token("(")]
    LParen,
    /// Delimiter `)`
    #[token(")")]
    RParen,

    /// Operator `+`
    #[token("+")]
    Plus,
    /// Operator `-`
    #[token("-")]
    Minus,
    /// Operator `*`
    #[token("*")]
    Star,
    /// Operator `<<` (higher priority than two `<` tokens)
    #[token("<<", priority = 10)]
    Shl,
    /// Operator `|`
    #[token("|")]
    Pipe,
    /// Operator `&`
    #[token("&")]
    Amp,

    /// Unsigned integer literal, decimal (e.g. 42) or hex (e.g. 0x2A).
    ///
    /// Values that overflow `u64` fail the callback and surface as a
    /// lexer error token at that position.
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().ok())]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| u64::from_str_radix(&lex.slice()[2..], 16).ok())]
    Integer(u64),

    /// String literal (e.g. "icons/app.png").
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len() - 1])
    })]
    String(String),

    /// Identifier (declaration names and template path components).
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),
}

/// Unescape a string literal body.
fn unescape_string(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                _ => return None,
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

/// Tokenize a manifest source string.
///
/// Returns the tokens paired with their byte spans, or the byte span of
/// the first unreadable input if lexing fails anywhere.
pub fn tokenize(source: &str) -> Result<Vec<(Token, std::ops::Range<usize>)>, std::ops::Range<usize>> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => return Err(span),
        }
    }
    Ok(tokens)
}
