//! Error interface for this crate.
//!
//! Every error type raised while assembling implements [`Error`],
//! which carries the extra information needed to show the error to a user:
//! the source line it occurred on and a hint to fix it.
//!
//! This module also re-exports every error type in the crate.

use std::borrow::Cow;

pub use crate::asm::{AsmErr, AsmErrKind};
pub use crate::ast::OffsetNewErr;
pub use crate::parse::lex::LexErr;

/// Unified error interface for all errors in this crate.
///
/// ```
/// use lc3_twopass::asm::assemble;
/// use lc3_twopass::err::Error;
///
/// let asm = assemble(["HALT", "ADD R0, R0, 16"]);
/// for e in &asm.errors {
///     let line = e.line().map_or_else(|| "?".to_string(), |l| (l + 1).to_string());
///     let help = e.help().unwrap_or_default();
///     assert_eq!(format!("line {line}: {e} ({help})"),
///         "line 2: offset '16' out of range: value is too big for signed 5-bit integer (the range for a signed 5-bit integer is [-16, 15])"
///     );
/// }
/// ```
pub trait Error: std::error::Error {
    /// The source line (0-indexed) where this error occurred, if known.
    fn line(&self) -> Option<usize> {
        None
    }

    /// A help message describing how to fix this error, if one exists.
    fn help(&self) -> Option<Cow<str>>;
}
