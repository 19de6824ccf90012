//! Assembling LC-3 source lines into machine words.
//!
//! This module is used to convert a sequence of source lines into an [`ObjectFile`]
//! (the assembled words) along with every diagnostic raised while assembling.
//!
//! The assembler module notably consists of:
//! - [`Assembler`], [`assemble`], and [`assemble_str`]: The main entry points which assemble source lines.
//! - [`SymbolTable`]: a struct holding the symbol table, which maps labels to word addresses
//! - [`ObjectFile`]: a struct holding the assembled words
//! - [`AsmErr`]: a diagnostic (a line number and an [`AsmErrKind`])
//!
//! # Passes
//!
//! Assembly happens in two passes:
//! 1. Each line is parsed and encoded in order. Labels are bound as they are declared.
//!    A label operand that is not bound yet is recorded as a deferred reference
//!    and its field is left as 0.
//! 2. Every deferred reference is resolved (in the order they were found)
//!    and its field is patched into the already emitted word.
//!
//! # Errors
//!
//! No error stops assembly. A bad field is encoded as 0 and a bad line emits nothing,
//! so a single call reports every mistake in the source.
//! An empty list of errors means the source assembled cleanly.

pub mod encoding;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::{debug, trace};

use crate::ast::asm::Mnemonic;
use crate::ast::word::Word;
use crate::ast::{Offset, OffsetNewErr};
use crate::parse::lex::LexErr;
use crate::parse::{parse_line, Line};

/// Flags which configure the syntax accepted by the assembler.
///
/// The default flags accept exactly the base syntax.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct AsmFlags {
    /// Whether the trap aliases `GETC`, `OUT`, `PUTC`, `PUTS`, `IN`, and `PUTSP`
    /// are recognized as instructions.
    ///
    /// When disabled, these names are ordinary labels. `HALT` is recognized either way.
    ///
    /// By default, this flag is `false`.
    pub trap_aliases: bool,

    /// Whether `#` can prefix a decimal literal (e.g., `#10`, `#-3`).
    ///
    /// By default, this flag is `true`.
    pub hash_decimals: bool,

    /// Whether escapes (`\n`, `\r`, `\t`, `\\`, `\"`, `\0`) are interpreted in `.STRINGZ` literals.
    ///
    /// When disabled, the contents between the quotes are taken verbatim
    /// and the literal ends at the first quote.
    ///
    /// By default, this flag is `false`.
    pub string_escapes: bool,
}
impl Default for AsmFlags {
    fn default() -> Self {
        Self {
            trap_aliases: false,
            hash_decimals: true,
            string_escapes: false
        }
    }
}

/// Kinds of errors that can occur from assembling given assembly code.
///
/// See [`AsmErr`] for this error type with line information included.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum AsmErrKind {
    /// The mnemonic is not in the descriptor table.
    UnknownInstruction(String),
    /// The instruction has the wrong number of operands.
    ArityMismatch {
        /// The instruction.
        mnemonic: Mnemonic,
        /// How many operands it needs.
        expected: usize,
        /// How many operands were provided.
        found: usize
    },
    /// The operand is not a register `R0`-`R7`.
    InvalidRegister(String),
    /// The operand could not be parsed as a number.
    UnparsableOffset(String),
    /// The value does not fit in its field.
    OffsetOutOfRange {
        /// The value which did not fit.
        value: i32,
        /// Why it did not fit.
        err: OffsetNewErr
    },
    /// The label was never declared (pass 2).
    UnknownLabel(String),
    /// The label was already declared on an earlier line.
    DuplicateLabel(String),
    /// The label is not a valid label name.
    InvalidLabelName(String),
    /// The `.STRINGZ` operand is not a valid string literal.
    InvalidString(LexErr),
    /// The line would place a word or label past address `xFFFF`.
    ProgramTooLarge,
}
impl std::fmt::Display for AsmErrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownInstruction(s)     => write!(f, "instruction '{s}' not recognized"),
            Self::ArityMismatch { mnemonic, expected, found } => {
                let s = if *expected == 1 { "" } else { "s" };
                write!(f, "invalid {mnemonic} instruction, needs {expected} operand{s} (found {found})")
            },
            Self::InvalidRegister(s)        => write!(f, "invalid register '{s}'"),
            Self::UnparsableOffset(s)       => write!(f, "cannot parse offset '{s}'"),
            Self::OffsetOutOfRange { value, err } => write!(f, "offset '{value}' out of range: {err}"),
            Self::UnknownLabel(s)           => write!(f, "label '{s}' could not be found"),
            Self::DuplicateLabel(s)         => write!(f, "label '{s}' was defined multiple times"),
            Self::InvalidLabelName(s)       => write!(f, "'{s}' is not a valid label name"),
            Self::InvalidString(e)          => e.fmt(f),
            Self::ProgramTooLarge           => f.write_str("program does not fit in memory"),
        }
    }
}

/// Error from assembling given assembly code.
///
/// This is a diagnostic: the 0-indexed source line where the error occurred,
/// and what the error was.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct AsmErr {
    /// The source line (0-indexed) associated with this error.
    pub line: usize,
    /// The kind of error.
    pub kind: AsmErrKind
}
impl AsmErr {
    /// Creates a new [`AsmErr`].
    pub fn new(line: usize, kind: AsmErrKind) -> Self {
        AsmErr { line, kind }
    }
}
impl std::fmt::Display for AsmErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
impl std::error::Error for AsmErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AsmErrKind::OffsetOutOfRange { err, .. } => Some(err),
            AsmErrKind::InvalidString(e) => Some(e),
            _ => None
        }
    }
}
impl crate::err::Error for AsmErr {
    fn line(&self) -> Option<usize> {
        Some(self.line)
    }

    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match &self.kind {
            AsmErrKind::UnknownInstruction(_)       => Some("labels cannot start with 'x' or a digit".into()),
            AsmErrKind::ArityMismatch { .. }        => Some("operands are separated by commas or whitespace".into()),
            AsmErrKind::InvalidRegister(_)          => Some("this must be R0-R7".into()),
            AsmErrKind::UnparsableOffset(_)         => Some("a hex literal starts with 'x', a decimal literal with a digit or '-'".into()),
            AsmErrKind::OffsetOutOfRange { err, .. } => crate::err::Error::help(err),
            AsmErrKind::UnknownLabel(_)             => Some("try adding this label before an instruction or directive".into()),
            AsmErrKind::DuplicateLabel(_)           => Some("labels must be unique within a file, try renaming one of the labels".into()),
            AsmErrKind::InvalidLabelName(_)         => Some("labels consist of letters, digits, and underscores, and cannot start with a digit".into()),
            AsmErrKind::InvalidString(e)            => crate::err::Error::help(e),
            AsmErrKind::ProgramTooLarge             => Some(format!("the address space holds at most {MEM_SIZE} words").into()),
        }
    }
}

/// The number of addressable words.
const MEM_SIZE: usize = 1 << 16;

/// The ordered list of diagnostics raised during one assembly.
///
/// Diagnostics are only ever appended. Every validation goes through
/// [`Diagnostics::check`] or [`Diagnostics::ok`], which hand back what the
/// call site needs to fall back to a default.
#[derive(Debug, Default)]
struct Diagnostics(Vec<AsmErr>);
impl Diagnostics {
    fn push(&mut self, line: usize, kind: AsmErrKind) {
        trace!("line {line}: {kind}");
        self.0.push(AsmErr::new(line, kind));
    }

    /// Adds the error if `invalid` is true, and returns `invalid`.
    fn check(&mut self, invalid: bool, line: usize, kind: impl FnOnce() -> AsmErrKind) -> bool {
        if invalid {
            self.push(line, kind());
        }
        invalid
    }

    /// Adds the error if the result failed, and returns the value otherwise.
    fn ok<T>(&mut self, line: usize, result: Result<T, AsmErrKind>) -> Option<T> {
        match result {
            Ok(t) => Some(t),
            Err(e) => {
                self.push(line, e);
                None
            }
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
struct SymbolData {
    addr: u16,
    line: usize
}

/// The symbol table created during the first assembler pass,
/// mapping each label to the word address it was declared at.
///
/// Labels are case-insensitive.
///
/// ## Example
/// ```
/// use lc3_twopass::asm::assemble;
///
/// let asm = assemble([
///     "LOOP ADD R0, R0, 1",
///     "     BR LOOP",
///     "DONE HALT",
/// ]);
/// let sym = asm.obj.symbol_table();
/// assert_eq!(sym.lookup_label("LOOP"), Some(0));
/// assert_eq!(sym.lookup_label("done"), Some(2));
/// assert_eq!(sym.lookup_label("NOPE"), None);
/// assert_eq!(sym.rev_lookup_label(2), Some("done"));
/// assert_eq!(sym.get_label_line("Done"), Some(2));
/// ```
#[derive(PartialEq, Eq, Clone, Default)]
pub struct SymbolTable {
    /// A mapping from label to address and declaration line of the label.
    label_map: HashMap<String, SymbolData>,
}

impl SymbolTable {
    /// Creates a new, empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a label to an address.
    ///
    /// If the label is already bound, the original binding is kept and this errors.
    fn add_label(&mut self, label: &str, addr: u16, line: usize) -> Result<(), AsmErrKind> {
        match self.label_map.entry(label.to_lowercase()) {
            Entry::Occupied(e) => Err(AsmErrKind::DuplicateLabel(e.key().clone())),
            Entry::Vacant(e) => {
                e.insert(SymbolData { addr, line });
                Ok(())
            }
        }
    }

    /// Gets the word address of a given label (if it exists).
    pub fn lookup_label(&self, label: &str) -> Option<u16> {
        self.label_map.get(&label.to_lowercase()).map(|sym_data| sym_data.addr)
    }

    /// Gets the label at a given word address (if it exists).
    ///
    /// If multiple labels are bound to the address, the one declared first is returned.
    pub fn rev_lookup_label(&self, addr: u16) -> Option<&str> {
        let (label, _) = self.label_map.iter()
            .filter(|&(_, sym_data)| sym_data.addr == addr)
            .min_by_key(|&(_, sym_data)| sym_data.line)?;

        Some(label.as_str())
    }

    /// Gets the source line (0-indexed) where a given label was declared (if it exists).
    pub fn get_label_line(&self, label: &str) -> Option<usize> {
        self.label_map.get(&label.to_lowercase()).map(|sym_data| sym_data.line)
    }

    /// Gets an iterable of the mapping from labels to addresses.
    pub fn label_iter(&self) -> impl Iterator<Item=(&str, u16)> + '_ {
        self.label_map.iter()
            .map(|(label, sym_data)| (&**label, sym_data.addr))
    }

    /// The number of labels in this symbol table.
    pub fn len(&self) -> usize {
        self.label_map.len()
    }

    /// Whether this symbol table has no labels.
    pub fn is_empty(&self) -> bool {
        self.label_map.is_empty()
    }
}
impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entries: Vec<_> = self.label_map.iter().collect();
        entries.sort_by_key(|&(_, data)| data.line);

        f.debug_map()
            .entries(entries.into_iter().map(|(k, data)| (k, Addr(data.addr))))
            .finish()
    }
}

/// How a deferred label reference is patched into its word.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum RefKind {
    /// A PC-relative offset occupying the low `N` bits.
    PcOffset(u32),
    /// The label's absolute address, occupying the whole word (`.FILL`).
    Absolute,
}

/// A label operand which was not bound when its word was emitted.
#[derive(PartialEq, Eq, Clone, Debug)]
struct DeferredRef {
    /// Address of the word to patch.
    addr: u16,
    /// Source line of the reference.
    line: usize,
    kind: RefKind,
    label: String
}

/// Computes the PC-relative offset from the instruction at `addr` to `target`.
///
/// The PC has already been incremented past the instruction when the offset is applied.
fn pc_offset(target: u16, addr: u16) -> i32 {
    i32::from(target) - i32::from(addr) - 1
}

/// Per-call state of an assembly.
///
/// A fresh `Pass` is created for every call to [`Assembler::assemble`].
struct Pass<'f> {
    flags: &'f AsmFlags,
    /// Current source line.
    line: usize,
    words: Vec<Word>,
    sym: SymbolTable,
    diags: Diagnostics,
    deferred: Vec<DeferredRef>,
    orig: Option<u16>,
}
impl<'f> Pass<'f> {
    fn new(flags: &'f AsmFlags) -> Self {
        Self {
            flags,
            line: 0,
            words: vec![],
            sym: SymbolTable::new(),
            diags: Diagnostics::default(),
            deferred: vec![],
            orig: None
        }
    }

    /// The current location counter (the address of the next word to be emitted).
    ///
    /// This is `None` once every address has been filled.
    fn lc(&self) -> Option<u16> {
        u16::try_from(self.words.len()).ok()
    }

    /// Checks that `len` more words fit in the address space.
    ///
    /// Nothing may be emitted (and no label field built) on a line which fails this.
    fn has_room(&mut self, len: usize) -> bool {
        let full = self.words.len() + len > MEM_SIZE;
        !self.diags.check(full, self.line, || AsmErrKind::ProgramTooLarge)
    }

    /// PASS 1 for a single line.
    fn process_line(&mut self, line_no: usize, text: &str) {
        self.line = line_no;
        let Line { label, stmt } = parse_line(text, self.flags);

        // The label is bound before anything on its line is emitted.
        match label {
            Some(Ok(name)) => {
                let bound = self.lc()
                    .ok_or(AsmErrKind::ProgramTooLarge)
                    .and_then(|addr| self.sym.add_label(&name, addr, line_no));
                self.diags.ok(line_no, bound);
            },
            Some(Err(e)) => self.diags.push(line_no, e),
            None => {}
        }

        match stmt {
            Some(Ok(stmt)) => {
                let start = self.words.len();
                self.encode(&stmt);
                trace!("line {line_no}: {} emitted {} word(s)", stmt.mnemonic, self.words.len() - start);
            },
            Some(Err(e)) => self.diags.push(line_no, e),
            None => {}
        }
    }

    /// Binds a label operand: computes its field bits if the label is known,
    /// or defers it to pass 2 and returns a placeholder 0.
    ///
    /// Callers check [`Pass::has_room`] first, so the word being built has an address.
    fn label_field(&mut self, label: &str, kind: RefKind) -> u16 {
        let Some(addr) = self.lc() else { return 0 };
        match self.sym.lookup_label(label) {
            Some(target) => self.ref_field(target, addr, kind, self.line),
            None => {
                trace!("line {}: deferring '{label}' at {:?}", self.line, Addr(addr));
                self.deferred.push(DeferredRef { addr, line: self.line, kind, label: label.to_string() });
                0
            }
        }
    }

    /// Computes the field bits of a resolved label reference,
    /// raising an error and returning 0 if the offset does not fit.
    fn ref_field(&mut self, target: u16, addr: u16, kind: RefKind, line: usize) -> u16 {
        match kind {
            RefKind::PcOffset(bits) => {
                let value = pc_offset(target, addr);
                let m_off = Offset::new(value, bits)
                    .map_err(|err| AsmErrKind::OffsetOutOfRange { value, err });
                self.diags.ok(line, m_off).map_or(0, |off| off.field())
            },
            RefKind::Absolute => target,
        }
    }

    /// PASS 2: backpatches every deferred reference.
    fn resolve(&mut self) {
        let deferred = std::mem::take(&mut self.deferred);
        debug!("resolving {} deferred label reference(s)", deferred.len());

        for DeferredRef { addr, line, kind, label } in deferred {
            let Some(target) = self.sym.lookup_label(&label) else {
                self.diags.push(line, AsmErrKind::UnknownLabel(label));
                continue;
            };

            let bits = self.ref_field(target, addr, kind, line);
            let index = usize::from(addr);
            let patched = self.words[index].with_field(bits);
            trace!("patching {:?}: {:?} -> {:?} ('{label}')", Addr(addr), self.words[index], patched);
            self.words[index] = patched;
        }
    }

    fn finish(self) -> Assembly {
        let Self { words, sym, diags, orig, .. } = self;
        Assembly {
            obj: ObjectFile { words, sym, orig },
            errors: diags.0,
        }
    }
}

/// An object file.
///
/// This is the final product after assembly source code is fully assembled.
/// A word's address is its index in the object file.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct ObjectFile {
    /// The assembled words.
    words: Vec<Word>,
    /// The labels bound during assembly.
    sym: SymbolTable,
    /// The address given by the first `.ORIG`, if there was one.
    orig: Option<u16>,
}
impl ObjectFile {
    /// Creates an empty object file.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The assembled words, in address order.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// The number of assembled words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether no words were assembled.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The load origin declared by the first `.ORIG` directive, if there was one.
    ///
    /// This is metadata only; word and label addresses always count from 0.
    pub fn orig(&self) -> Option<u16> {
        self.orig
    }

    /// Gets the symbol table.
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.sym
    }

    /// Gets an iterator over every word along with its memory address once loaded at the origin
    /// (or at 0 if there was no `.ORIG`).
    ///
    /// ```
    /// use lc3_twopass::asm::assemble;
    ///
    /// let asm = assemble([".ORIG x3000", "AND R0, R0, 0", "HALT", ".END"]);
    /// let addrs: Vec<_> = asm.obj.addr_iter()
    ///     .map(|(addr, word)| (addr, word.get()))
    ///     .collect();
    /// assert_eq!(addrs, [(0x3000, 0x5020), (0x3001, 0xF025)]);
    /// ```
    pub fn addr_iter(&self) -> impl Iterator<Item=(u16, Word)> + '_ {
        let start = self.orig.unwrap_or(0);
        self.words.iter()
            .zip(0..=u16::MAX)
            .map(move |(&w, i)| (start.wrapping_add(i), w))
    }
}

/// The result of an assembly: the object file and every diagnostic raised.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Assembly {
    /// The assembled object file.
    pub obj: ObjectFile,
    /// The diagnostics, in the order they were raised.
    ///
    /// Pass 1 diagnostics come in line order, followed by pass 2 diagnostics
    /// in the order their references were found.
    pub errors: Vec<AsmErr>
}
impl Assembly {
    /// Whether the source assembled without any diagnostics.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// An LC-3 assembler.
///
/// An assembler holds only its configuration, so it can be reused for any number of assemblies.
/// Every call to [`Assembler::assemble`] starts from fresh state.
///
/// # Example
/// ```
/// use lc3_twopass::asm::{Assembler, AsmFlags};
///
/// let asm = Assembler::new(AsmFlags { trap_aliases: true, ..Default::default() });
///
/// let first = asm.assemble(["PUTS", "HALT"]);
/// assert!(first.is_clean());
/// assert_eq!(first.obj.words()[0].get(), 0xF022);
///
/// let second = asm.assemble(["BR NOWHERE"]);
/// assert_eq!(second.errors.len(), 1);
/// assert_eq!(second.errors[0].to_string(), "label 'nowhere' could not be found");
/// ```
#[derive(Debug, Default, Clone)]
pub struct Assembler {
    flags: AsmFlags
}
impl Assembler {
    /// Creates a new assembler with the given flags.
    pub fn new(flags: AsmFlags) -> Self {
        Self { flags }
    }

    /// The flags this assembler was configured with.
    pub fn flags(&self) -> &AsmFlags {
        &self.flags
    }

    /// Assembles a sequence of source lines.
    ///
    /// Line numbers in diagnostics are 0-indexed positions in this sequence.
    pub fn assemble<I>(&self, lines: I) -> Assembly
        where I: IntoIterator,
              I::Item: AsRef<str>
    {
        debug!("assembling with {:?}", self.flags);
        let mut pass = Pass::new(&self.flags);

        // PASS 1
        let mut n_lines = 0;
        for (line_no, line) in lines.into_iter().enumerate() {
            pass.process_line(line_no, line.as_ref());
            n_lines += 1;
        }

        // PASS 2
        pass.resolve();

        let asm = pass.finish();
        debug!("assembled {n_lines} line(s) into {} word(s) with {} error(s)", asm.obj.len(), asm.errors.len());
        asm
    }
}

/// Assembles a sequence of source lines with the default flags.
///
/// # Example
/// ```
/// use lc3_twopass::asm::assemble;
///
/// let asm = assemble(["TRAP x25", "HALT"]);
/// assert!(asm.is_clean());
/// assert_eq!(asm.obj.words()[0], asm.obj.words()[1]);
/// ```
pub fn assemble<I>(lines: I) -> Assembly
    where I: IntoIterator,
          I::Item: AsRef<str>
{
    Assembler::default().assemble(lines)
}

/// Assembles a whole source string with the default flags, one line per source line.
///
/// # Example
/// ```
/// use lc3_twopass::asm::assemble_str;
///
/// let src = "
///     AND R0, R0, 0
/// LOOP ADD R0, R0, 1
///     BRp LOOP
/// ";
/// let asm = assemble_str(src);
/// assert!(asm.is_clean());
/// assert_eq!(asm.obj.len(), 3);
/// assert_eq!(asm.obj.symbol_table().get_label_line("LOOP"), Some(2));
/// ```
pub fn assemble_str(src: &str) -> Assembly {
    assemble(src.lines())
}

/// Used for [`std::fmt::Debug`] purposes.
#[repr(transparent)]
struct Addr(u16);
impl std::fmt::Debug for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{:04X}", self.0)
    }
}
