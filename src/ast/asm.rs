//! Assembly-side AST components.
//!
//! This holds the instruction descriptor table ([`Mnemonic`]), which records
//! how many operands each instruction takes and its fixed opcode bits,
//! as well as [`Stmt`], a single parsed instruction or directive.

use super::CondCode;

macro_rules! mnemonic_table {
    ($($name:ident = $text:literal: ($count:literal, $opcode:literal)),+ $(,)?) => {
        /// An instruction or directive mnemonic.
        ///
        /// Each mnemonic is an entry of the descriptor table,
        /// which maps it to its required operand count ([`Mnemonic::operand_count`])
        /// and its fixed opcode bits ([`Mnemonic::opcode_bits`]).
        ///
        /// Mnemonics are matched case-insensitively.
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub enum Mnemonic {
            $(
                #[allow(missing_docs)]
                $name
            ),+
        }

        impl Mnemonic {
            /// Every mnemonic of the descriptor table.
            pub const ALL: &'static [Mnemonic] = &[$(Mnemonic::$name),+];

            /// The number of operands this mnemonic requires.
            ///
            /// For `BR`, the condition suffix is not counted as an operand.
            pub fn operand_count(self) -> usize {
                match self {
                    $(Mnemonic::$name => $count),+
                }
            }

            /// The fixed bits of this mnemonic's encoding (the opcode in bits 15-12).
            ///
            /// Directives have no opcode and return 0.
            pub fn opcode_bits(self) -> u16 {
                match self {
                    $(Mnemonic::$name => $opcode),+
                }
            }

            /// The lowercase source text of this mnemonic.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Mnemonic::$name => $text),+
                }
            }
        }

        impl std::str::FromStr for Mnemonic {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match &*s.to_lowercase() {
                    $($text => Ok(Mnemonic::$name)),+,
                    _ => Err(())
                }
            }
        }
    };
}
mnemonic_table! {
    ADD     = "add":      (3, 0x1000),
    AND     = "and":      (3, 0x5000),
    BR      = "br":       (1, 0x0000),
    JMP     = "jmp":      (1, 0xC000),
    JSR     = "jsr":      (1, 0x4000),
    JSRR    = "jsrr":     (1, 0x4000),
    LD      = "ld":       (2, 0x2000),
    LDI     = "ldi":      (2, 0xA000),
    LDR     = "ldr":      (3, 0x6000),
    LEA     = "lea":      (2, 0xE000),
    NOT     = "not":      (2, 0x9000),
    RET     = "ret":      (0, 0xC000),
    RTI     = "rti":      (0, 0x8000),
    ST      = "st":       (2, 0x3000),
    STI     = "sti":      (2, 0xB000),
    STR     = "str":      (3, 0x7000),
    TRAP    = "trap":     (1, 0xF000),

    // Trap aliases
    GETC    = "getc":     (0, 0xF000),
    OUT     = "out":      (0, 0xF000),
    PUTC    = "putc":     (0, 0xF000),
    PUTS    = "puts":     (0, 0xF000),
    IN      = "in":       (0, 0xF000),
    PUTSP   = "putsp":    (0, 0xF000),
    HALT    = "halt":     (0, 0xF000),

    // Directives
    ORIG    = ".orig":    (1, 0x0000),
    FILL    = ".fill":    (1, 0x0000),
    BLKW    = ".blkw":    (1, 0x0000),
    STRINGZ = ".stringz": (1, 0x0000),
    END     = ".end":     (0, 0x0000),
}

impl Mnemonic {
    /// The trap vector this mnemonic is an alias of, if it is a trap alias.
    ///
    /// ```
    /// # use lc3_twopass::ast::asm::Mnemonic;
    /// assert_eq!(Mnemonic::HALT.trap_vect(), Some(0x25));
    /// assert_eq!(Mnemonic::TRAP.trap_vect(), None);
    /// ```
    pub fn trap_vect(self) -> Option<u16> {
        match self {
            Mnemonic::GETC  => Some(0x20),
            Mnemonic::OUT   => Some(0x21),
            Mnemonic::PUTC  => Some(0x21),
            Mnemonic::PUTS  => Some(0x22),
            Mnemonic::IN    => Some(0x23),
            Mnemonic::PUTSP => Some(0x24),
            Mnemonic::HALT  => Some(0x25),
            _ => None
        }
    }

    /// Whether this is one of the optional trap aliases (`GETC`, `OUT`, `PUTC`, `PUTS`, `IN`, `PUTSP`).
    ///
    /// `HALT` is always recognized and is not considered optional.
    pub fn is_optional_alias(self) -> bool {
        self != Mnemonic::HALT && self.trap_vect().is_some()
    }

    /// Whether this mnemonic is a directive (pseudo-op starting with `.`).
    pub fn is_directive(self) -> bool {
        self.as_str().starts_with('.')
    }
}
impl std::fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// An operand of an instruction or directive, as it appeared in source.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Operand {
    /// A bare operand (register, number, or label), lowercased.
    Text(String),
    /// A string literal, with its contents kept verbatim.
    String(String),
}
impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Text(t)   => f.write_str(t),
            Operand::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// A validated instruction or directive, ready for encoding.
///
/// A `Stmt` always has exactly [`Mnemonic::operand_count`] operands.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Stmt {
    /// The instruction or directive.
    pub mnemonic: Mnemonic,
    /// The condition code, if this is a `BR` instruction.
    pub cond: Option<CondCode>,
    /// The operands (not including the mnemonic or the `BR` condition).
    pub operands: Vec<Operand>,
}
