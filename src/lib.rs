//! A line-oriented, two-pass LC-3 assembler.
//!
//! This converts LC-3 assembly source lines into 16-bit machine words.
//! Assembly never stops at the first mistake: every error is recovered locally
//! and reported as a diagnostic, so a single run surfaces every error in the source.
//!
//! # Usage
//!
//! Source lines are assembled into an [`asm::Assembly`],
//! which holds the assembled object file and the list of diagnostics:
//! ```
//! use lc3_twopass::asm::assemble_str;
//!
//! let code = "
//!     .orig x3000
//!     AND R0, R0, #0
//! LOOP ADD R0, R0, #7
//!     BRp LOOP
//!     HALT
//!     .end
//! ";
//! let asm = assemble_str(code);
//! assert!(asm.is_clean());
//!
//! let words: Vec<String> = asm.obj.words().iter()
//!     .map(|w| w.to_string())
//!     .collect();
//! assert_eq!(words, ["5020", "1027", "03FE", "F025"]);
//! ```
//!
//! If the source has errors, every one of them is reported,
//! along with the line it occurred on:
//! ```
//! use lc3_twopass::asm::assemble;
//!
//! let asm = assemble([
//!     "ADD R0, R9, 1",
//!     "BR MISSING",
//!     "TRAP x100",
//! ]);
//! let errors: Vec<String> = asm.errors.iter()
//!     .map(|e| format!("{}: {e}", e.line))
//!     .collect();
//! assert_eq!(errors, [
//!     "0: invalid register 'r9'",
//!     "2: offset '256' out of range: value is too big for signed 8-bit integer",
//!     "1: label 'missing' could not be found",
//! ]);
//!
//! // Every line still occupies its words.
//! assert_eq!(asm.obj.len(), 3);
//! ```
//!
//! The syntax accepted by the assembler can be configured with [`asm::AsmFlags`].
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod asm;
pub mod err;
