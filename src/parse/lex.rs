//! Tokenizing LC-3 assembly lines.
//!
//! This module holds the tokens that characterize a line of LC-3 assembly ([`Token`]).
//! This module is used by the line parser to split a line into its
//! label, mnemonic, and operands.
//!
//! Operands are only split here, not classified. Whether an operand is a register,
//! a number, or a label depends on where it appears, so that is decided by the encoder.

use logos::{Lexer, Logos};

/// A unit of information in an LC-3 source line.
///
/// The lexer's extras flag selects whether escapes in string literals are interpreted
/// (`true`) or whether string literals are taken verbatim (`false`, the default).
#[derive(Debug, Logos, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+", error = LexErr, extras = bool)]
pub enum Token {
    /// Any run of characters that isn't whitespace, a comma, a quote, or a semicolon.
    ///
    /// This can refer to a mnemonic, a directive, a label, a register, or a numeric literal.
    /// The text is lowercased.
    #[regex(r#"[^ \t\r\n\f,;"]+"#, |lx| lx.slice().to_lowercase())]
    Atom(String),

    /// A string literal (e.g., `"Hello!"`), without its quotes.
    #[token(r#"""#, lex_str_literal)]
    String(String),

    /// A comma, which delineate operands of an instruction
    #[token(",")]
    Comma,

    /// A comment, which starts with a semicolon and spans the remaining part of the line.
    #[regex(r";.*")]
    Comment,
}

/// Any errors raised in attempting to tokenize a line.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub enum LexErr {
    /// String literal is missing an end quotation mark.
    UnclosedStrLit,
    /// String literal is too long to be stored in memory.
    StrLitTooBig,
    /// String literal contains a character which does not fit in a 16-bit word.
    WideCharInStrLit,
    /// A string literal was expected, but some other operand was found.
    ExpectedStrLit,
    /// A symbol was used which is not allowed in LC3 assembly files
    #[default]
    InvalidSymbol
}
impl std::fmt::Display for LexErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexErr::UnclosedStrLit   => f.write_str("unclosed string literal"),
            LexErr::StrLitTooBig     => f.write_str("string literal is too large"),
            LexErr::WideCharInStrLit => f.write_str("string literal contains a character wider than 16 bits"),
            LexErr::ExpectedStrLit   => f.write_str("expected string literal"),
            LexErr::InvalidSymbol    => f.write_str("unrecognized symbol"),
        }
    }
}
impl std::error::Error for LexErr {}
impl crate::err::Error for LexErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            LexErr::UnclosedStrLit   => Some("add a quote to the end of the string literal".into()),
            LexErr::StrLitTooBig     => Some(format!("string literals are limited to at most {} characters", u16::MAX - 1).into()),
            LexErr::WideCharInStrLit => Some("only characters from U+0000 to U+FFFF can be stored".into()),
            LexErr::ExpectedStrLit   => Some("surround the text with double quotes".into()),
            LexErr::InvalidSymbol    => Some("this char does not occur in any token in LC-3 assembly".into()),
        }
    }
}

/// Finds the closing quote of a string literal,
/// skipping over any quote which is escaped by a backslash.
fn find_unescaped_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match (escaped, c) {
            (true, _)     => escaped = false,
            (false, '\\') => escaped = true,
            (false, '"')  => return Some(i),
            (false, _)    => {}
        }
    }
    None
}

/// Interprets the simple group of escapes (e.g., `\n`, `\r`, etc.).
///
/// Unknown escapes are kept as-is.
fn unescape(raw: &str) -> String {
    let mut buf = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            buf.push(c);
            continue;
        }

        match chars.next() {
            Some('n')  => buf.push('\n'),
            Some('r')  => buf.push('\r'),
            Some('t')  => buf.push('\t'),
            Some('\\') => buf.push('\\'),
            Some('0')  => buf.push('\0'),
            Some('"')  => buf.push('"'),
            Some(c) => {
                buf.push('\\');
                buf.push(c);
            }
            None => buf.push('\\'),
        }
    }

    buf
}

fn lex_str_literal(lx: &mut Lexer<'_, Token>) -> Result<String, LexErr> {
    let escapes = lx.extras;
    let rem = lx.remainder()
        .lines()
        .next()
        .unwrap_or("");

    // Without escapes, the literal is everything up to the next quote.
    let mlen = match escapes {
        true  => find_unescaped_quote(rem),
        false => rem.find('"'),
    };

    // consume tokens up to the end of the literal and including the closing quote
    let Some(len) = mlen else {
        lx.bump(rem.len());
        return Err(LexErr::UnclosedStrLit);
    };
    lx.bump(len + 1);

    let raw = &rem[..len];
    let buf = match escapes {
        true  => unescape(raw),
        false => raw.to_string(),
    };

    if buf.chars().any(|c| u32::from(c) > u32::from(u16::MAX)) {
        return Err(LexErr::WideCharInStrLit);
    }
    match buf.chars().count() < usize::from(u16::MAX) {
        true  => Ok(buf),
        false => Err(LexErr::StrLitTooBig),
    }
}
