//! Parsing single lines of LC-3 assembly.
//!
//! The line parser normalizes one source line into an optional label declaration
//! and an optional validated statement ([`Stmt`]).
//!
//! The steps of parsing a line are:
//! - strip any trailing comment,
//! - split the line into lowercased tokens (commas and whitespace separate tokens,
//!   string literals are kept verbatim),
//! - detect a leading label,
//! - resolve the mnemonic against the descriptor table (expanding `BR` condition suffixes),
//! - check the operand count.
//!
//! The parser is pure: binding the label into the symbol table is the assembler's job,
//! because a label's address depends on everything emitted before it.
//!
//! ```
//! use lc3_twopass::parse::parse_line;
//! use lc3_twopass::ast::asm::{Mnemonic, Operand};
//!
//! let line = parse_line("LOOP BRnz LOOP ; spin", &Default::default());
//! assert_eq!(line.label, Some(Ok("loop".to_string())));
//!
//! let stmt = line.stmt.unwrap().unwrap();
//! assert_eq!(stmt.mnemonic, Mnemonic::BR);
//! assert_eq!(stmt.cond, Some(0b110));
//! assert_eq!(stmt.operands, [Operand::Text("loop".to_string())]);
//! ```

pub mod lex;

use logos::Logos;

use crate::asm::{AsmErrKind, AsmFlags};
use crate::ast::asm::{Mnemonic, Operand, Stmt};
use crate::ast::CondCode;
use lex::{LexErr, Token};

/// The result of parsing one source line.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Line {
    /// The label declared at the start of the line, if one was present.
    ///
    /// This is an error if the token in label position is not a valid label name.
    pub label: Option<Result<String, AsmErrKind>>,

    /// The statement on this line.
    ///
    /// This is `None` if the line emits nothing
    /// (it was blank, a comment, or only held a label).
    /// If the instruction was rejected, this holds the reason.
    pub stmt: Option<Result<Stmt, AsmErrKind>>,
}

/// Parses the condition suffix of a `BR` mnemonic (e.g. `nz` for `BRnz`).
///
/// An empty suffix is an unconditional branch (`nzp`).
/// Any letters other than `n`, `z`, `p` mean this isn't a `BR` mnemonic.
fn parse_cond(suffix: &str) -> Option<CondCode> {
    if suffix.is_empty() {
        return Some(0b111);
    }

    suffix.chars().try_fold(0, |cc, c| match c {
        'n' => Some(cc | 0b100),
        'z' => Some(cc | 0b010),
        'p' => Some(cc | 0b001),
        _ => None
    })
}

/// Resolves a (lowercased) token against the descriptor table.
///
/// This also returns the condition code for a `BR` mnemonic.
fn lookup_mnemonic(token: &str, flags: &AsmFlags) -> Option<(Mnemonic, Option<CondCode>)> {
    if let Some(suffix) = token.strip_prefix("br") {
        return parse_cond(suffix).map(|cc| (Mnemonic::BR, Some(cc)));
    }

    match token.parse::<Mnemonic>() {
        Ok(m) if m.is_optional_alias() && !flags.trap_aliases => None,
        Ok(m) => Some((m, None)),
        Err(()) => None,
    }
}

/// Whether the token is a legal label name (`[a-z_][a-z0-9_]*`).
pub(crate) fn is_label_name(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some('a'..='z' | '_'))
        && chars.all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
}

/// Checks whether the token is in label position.
///
/// A token is a label iff it is not empty, does not start with `x` or a digit,
/// and is not a recognized mnemonic. Directive-like tokens (starting with `.`)
/// are never labels.
fn is_label_candidate(token: &str, flags: &AsmFlags) -> bool {
    match token.chars().next() {
        None => false,
        Some('x' | '.') => false,
        Some(c) if c.is_ascii_digit() => false,
        Some(_) => lookup_mnemonic(token, flags).is_none(),
    }
}

/// Parses a single line of source.
///
/// This never fails outright: any problem on the line is reported
/// in the label or statement slot of the returned [`Line`].
pub fn parse_line(line: &str, flags: &AsmFlags) -> Line {
    let mut tokens = vec![];
    let mut lex_err = None;

    for m_token in Token::lexer_with_extras(line, flags.string_escapes) {
        match m_token {
            Ok(Token::Atom(a))   => tokens.push(Operand::Text(a)),
            Ok(Token::String(s)) => tokens.push(Operand::String(s)),
            Ok(Token::Comma)     => {},
            Ok(Token::Comment)   => break,
            Err(e) => {
                lex_err.get_or_insert(e);
            }
        }
    }

    let mut tokens = tokens.into_iter().peekable();
    let mut result = Line::default();

    // Label detection:
    if let Some(Operand::Text(first)) = tokens.peek() {
        if is_label_candidate(first, flags) {
            let name = first.strip_suffix(':').unwrap_or(first);
            result.label = Some(match is_label_name(name) {
                true  => Ok(name.to_string()),
                false => Err(AsmErrKind::InvalidLabelName(first.clone())),
            });
            tokens.next();
        }
    }

    let Some(head) = tokens.next() else {
        // Nothing after the label (or an empty line).
        // If the lexer failed, it failed on an unclosed string literal, which is still worth reporting.
        result.stmt = lex_err.map(|e| Err(AsmErrKind::InvalidString(e)));
        return result;
    };

    result.stmt = Some(parse_stmt(head, tokens.collect(), lex_err, flags));
    result
}

fn parse_stmt(head: Operand, operands: Vec<Operand>, lex_err: Option<LexErr>, flags: &AsmFlags) -> Result<Stmt, AsmErrKind> {
    let m_mnemonic = match &head {
        Operand::Text(t) => lookup_mnemonic(t, flags),
        Operand::String(_) => None,
    };
    let Some((mnemonic, cond)) = m_mnemonic else {
        return Err(AsmErrKind::UnknownInstruction(head.to_string()));
    };

    if let Some(e) = lex_err {
        return Err(AsmErrKind::InvalidString(e));
    }

    let expected = mnemonic.operand_count();
    if operands.len() != expected {
        return Err(AsmErrKind::ArityMismatch { mnemonic, expected, found: operands.len() });
    }

    Ok(Stmt { mnemonic, cond, operands })
}

#[cfg(test)]
mod tests {
    use crate::asm::{AsmErrKind, AsmFlags};
    use crate::ast::asm::{Mnemonic, Operand, Stmt};
    use crate::parse::lex::LexErr;

    use super::{is_label_name, parse_cond, parse_line, Line};

    fn text(s: &str) -> Operand {
        Operand::Text(s.to_string())
    }
    fn stmt(mnemonic: Mnemonic, operands: &[&str]) -> Stmt {
        Stmt { mnemonic, cond: None, operands: operands.iter().map(|s| text(s)).collect() }
    }
    fn parse(line: &str) -> Line {
        parse_line(line, &AsmFlags::default())
    }

    #[test]
    fn test_blank() {
        assert_eq!(parse(""), Line::default());
        assert_eq!(parse("   \t "), Line::default());
        assert_eq!(parse("; just a comment"), Line::default());
        assert_eq!(parse(" , ,, "), Line::default());
    }

    #[test]
    fn test_split() {
        let expected = Line { label: None, stmt: Some(Ok(stmt(Mnemonic::ADD, &["r0", "r1", "r2"]))) };
        assert_eq!(parse("ADD R0, R1, R2"), expected);
        assert_eq!(parse("add r0 r1 r2"), expected);
        assert_eq!(parse("  ADD  R0,,R1 ,R2 ; comment"), expected);
    }

    #[test]
    fn test_label() {
        let line = parse("LOOP ADD r0 r0 r0");
        assert_eq!(line.label, Some(Ok("loop".to_string())));
        assert_eq!(line.stmt, Some(Ok(stmt(Mnemonic::ADD, &["r0", "r0", "r0"]))));

        let line = parse("Done:");
        assert_eq!(line.label, Some(Ok("done".to_string())));
        assert_eq!(line.stmt, None);

        let line = parse("  end_1 ; label only");
        assert_eq!(line.label, Some(Ok("end_1".to_string())));
        assert_eq!(line.stmt, None);
    }

    #[test]
    fn test_not_label() {
        // starts with x: treated as the mnemonic
        let line = parse("xyz ADD r0 r0 r0");
        assert_eq!(line.label, None);
        assert_eq!(line.stmt, Some(Err(AsmErrKind::UnknownInstruction("xyz".to_string()))));

        // starts with digit
        let line = parse("1abc HALT");
        assert_eq!(line.label, None);
        assert_eq!(line.stmt, Some(Err(AsmErrKind::UnknownInstruction("1abc".to_string()))));

        // unknown directive
        let line = parse(".text");
        assert_eq!(line.label, None);
        assert_eq!(line.stmt, Some(Err(AsmErrKind::UnknownInstruction(".text".to_string()))));
    }

    #[test]
    fn test_invalid_label() {
        let line = parse("my-label HALT");
        assert_eq!(line.label, Some(Err(AsmErrKind::InvalidLabelName("my-label".to_string()))));
        assert_eq!(line.stmt, Some(Ok(stmt(Mnemonic::HALT, &[]))));
    }

    #[test]
    fn test_label_then_unknown() {
        let line = parse("a b");
        assert_eq!(line.label, Some(Ok("a".to_string())));
        assert_eq!(line.stmt, Some(Err(AsmErrKind::UnknownInstruction("b".to_string()))));
    }

    #[test]
    fn test_br_forms() {
        let line = parse("BR LOOP");
        assert_eq!(line.stmt, Some(Ok(Stmt { mnemonic: Mnemonic::BR, cond: Some(0b111), operands: vec![text("loop")] })));

        let line = parse("BRnzp LOOP");
        assert_eq!(line.stmt.unwrap().unwrap().cond, Some(0b111));
        let line = parse("BRzn x3");
        assert_eq!(line.stmt.unwrap().unwrap().cond, Some(0b110));
        let line = parse("brP -1");
        assert_eq!(line.stmt.unwrap().unwrap().cond, Some(0b001));

        // not a BR mnemonic: this is a label
        let line = parse("break HALT");
        assert_eq!(line.label, Some(Ok("break".to_string())));
        assert_eq!(line.stmt, Some(Ok(stmt(Mnemonic::HALT, &[]))));
    }

    #[test]
    fn test_parse_cond() {
        assert_eq!(parse_cond(""), Some(0b111));
        assert_eq!(parse_cond("n"), Some(0b100));
        assert_eq!(parse_cond("z"), Some(0b010));
        assert_eq!(parse_cond("p"), Some(0b001));
        assert_eq!(parse_cond("np"), Some(0b101));
        assert_eq!(parse_cond("pzn"), Some(0b111));
        assert_eq!(parse_cond("eak"), None);
    }

    #[test]
    fn test_arity() {
        assert_eq!(
            parse("ADD r0 r1").stmt,
            Some(Err(AsmErrKind::ArityMismatch { mnemonic: Mnemonic::ADD, expected: 3, found: 2 }))
        );
        assert_eq!(
            parse("HALT r0").stmt,
            Some(Err(AsmErrKind::ArityMismatch { mnemonic: Mnemonic::HALT, expected: 0, found: 1 }))
        );
        assert_eq!(
            parse("BRz").stmt,
            Some(Err(AsmErrKind::ArityMismatch { mnemonic: Mnemonic::BR, expected: 1, found: 0 }))
        );
    }

    #[test]
    fn test_stringz() {
        let line = parse(r#"MSG .STRINGZ "Hi, There; OK" ; greeting"#);
        assert_eq!(line.label, Some(Ok("msg".to_string())));
        assert_eq!(line.stmt, Some(Ok(Stmt {
            mnemonic: Mnemonic::STRINGZ,
            cond: None,
            operands: vec![Operand::String("Hi, There; OK".to_string())]
        })));

        let line = parse(r#".stringz "oops"#);
        assert_eq!(line.stmt, Some(Err(AsmErrKind::InvalidString(LexErr::UnclosedStrLit))));
    }

    #[test]
    fn test_trap_aliases() {
        // Off by default: PUTS is a label.
        let line = parse("PUTS HALT");
        assert_eq!(line.label, Some(Ok("puts".to_string())));

        let flags = AsmFlags { trap_aliases: true, ..Default::default() };
        let line = parse_line("PUTS", &flags);
        assert_eq!(line.label, None);
        assert_eq!(line.stmt, Some(Ok(stmt(Mnemonic::PUTS, &[]))));
    }

    #[test]
    fn test_label_names() {
        assert!(is_label_name("loop"));
        assert!(is_label_name("_start"));
        assert!(is_label_name("a1_b2"));
        assert!(!is_label_name(""));
        assert!(!is_label_name("1a"));
        assert!(!is_label_name("a-b"));
        assert!(!is_label_name("a:"));
    }
}
