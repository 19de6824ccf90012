//! Components relating to the values that make up LC-3 assembly lines
//! and the machine words they assemble into.
//!
//! These components together are used to construct...
//! - [`asm::Stmt`] (a data structure holding one parsed source line's instruction or directive),
//! - [`asm::Mnemonic`] (the instruction descriptor table),
//! - and [`word::Word`] (a data structure holding an assembled 16-bit word).

pub mod asm;
pub mod word;

use std::num::TryFromIntError;

/// A register. Must be between 0 and 7.
///
/// This `Reg` struct can either be constructed by selecting a register from [`reg_consts`],
/// by parsing an operand with [`Reg::parse`], or by using [`Reg::try_from`].
///
/// ## Examples
///
/// ```text
/// AND R0, R0, 0
///     ~~  ~~
/// ADD R1, R1, R0
///     ~~  ~~  ~~
/// LD R2, VALUE
///    ~~
/// NOT R1, R2
///     ~~  ~~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Reg(pub(crate) u8);

/// Register constants!
pub mod reg_consts {
    use super::Reg;

    /// The 0th register in the register file.
    pub const R0: Reg = Reg(0);
    /// The 1st register in the register file.
    pub const R1: Reg = Reg(1);
    /// The 2nd register in the register file.
    pub const R2: Reg = Reg(2);
    /// The 3rd register in the register file.
    pub const R3: Reg = Reg(3);
    /// The 4th register in the register file.
    pub const R4: Reg = Reg(4);
    /// The 5th register in the register file.
    pub const R5: Reg = Reg(5);
    /// The 6th register in the register file.
    pub const R6: Reg = Reg(6);
    /// The 7th register in the register file.
    pub const R7: Reg = Reg(7);
}
impl Reg {
    /// Gets the register number of this [`Reg`]. This is always between 0 and 7.
    pub fn reg_no(self) -> u8 {
        self.0
    }

    /// Parses a (lowercased) register operand.
    ///
    /// A register operand is exactly two characters: `r` followed by a digit from 0 to 7.
    ///
    /// ```
    /// # use lc3_twopass::ast::Reg;
    /// # use lc3_twopass::ast::reg_consts::R5;
    /// assert_eq!(Reg::parse("r5"), Some(R5));
    /// assert_eq!(Reg::parse("r8"), None);
    /// assert_eq!(Reg::parse("r10"), None);
    /// assert_eq!(Reg::parse("x5"), None);
    /// ```
    pub fn parse(token: &str) -> Option<Self> {
        match token.as_bytes() {
            &[b'r', n @ b'0'..=b'7'] => Some(Reg(n - b'0')),
            _ => None
        }
    }

    /// Shifts the register number into a field starting at bit `lsb`.
    pub(crate) fn field(self, lsb: u32) -> u16 {
        u16::from(self.0) << lsb
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // padding should have no effect here
        write!(f, "R{}", self.0)
    }
}
impl From<Reg> for usize {
    fn from(value: Reg) -> Self {
        usize::from(value.0)
    }
}
impl TryFrom<u8> for Reg {
    type Error = TryFromIntError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0..=7 => Ok(Reg(value)),
            // HACKy, but there's no other way to create this error
            _     => u8::try_from(256).map(|_| unreachable!("should've been TryFromIntError")),
        }
    }
}

/// A condition code (used for `BR`), must be between 0 and 7.
///
/// The condition codes are listed below:
///
/// | instruction   | code (bin) |
/// |---------------|------------|
/// | `BRn`         | `100`      |
/// | `BRz`         | `010`      |
/// | `BRnz`        | `110`      |
/// | `BRp`         | `001`      |
/// | `BRnp`        | `101`      |
/// | `BRzp`        | `011`      |
/// | `BR`, `BRnzp` | `111`      |
///
pub type CondCode = u8;

/// The errors that can result from fitting a value into a field
/// (see [`Offset::new`], [`fit_unsigned`], and [`fit_word`]).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum OffsetNewErr {
    /// The provided value cannot fit an unsigned integer of the given bitsize.
    CannotFitUnsigned(u32),
    /// The provided value cannot fit a signed integer of the given bitsize.
    CannotFitSigned(u32),
    /// The provided value cannot fit in a 16-bit word as either a signed or an unsigned integer.
    CannotFitWord
}

impl std::fmt::Display for OffsetNewErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffsetNewErr::CannotFitUnsigned(n) => write!(f, "value is too big for unsigned {n}-bit integer"),
            OffsetNewErr::CannotFitSigned(n) => write!(f, "value is too big for signed {n}-bit integer"),
            OffsetNewErr::CannotFitWord => f.write_str("value does not fit in a 16-bit word"),
        }
    }
}
impl std::error::Error for OffsetNewErr {}
impl crate::err::Error for OffsetNewErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        use std::borrow::Cow;

        let error = match self {
            OffsetNewErr::CannotFitUnsigned(n) => Cow::from(format!("the range for an unsigned {n}-bit integer is [0, {}]", (1u32 << n) - 1)),
            OffsetNewErr::CannotFitSigned(n) => Cow::from(format!("the range for a signed {n}-bit integer is [{}, {}]", (-1i32) << (n - 1), (1i32 << (n - 1)) - 1)),
            OffsetNewErr::CannotFitWord => Cow::from(format!("a word holds values in [{}, {}]", i16::MIN, u16::MAX)),
        };

        Some(error)
    }
}

/// A signed offset or immediate value which occupies the low `bits` bits of an instruction.
///
/// The width is only known at runtime because label references are resolved
/// after the instruction that uses them has been emitted,
/// so the width has to travel with the deferred reference.
///
/// ## Examples
///
/// A 5-bit offset is used to represent `ADD`/`AND`'s imm5 operand:
///
/// ```text
/// AND R0, R0, 0
///             ~
/// ADD R1, R1, -1
///             ~~
/// ```
///
/// Offsets are also used for PC-relative and base-register offsets:
/// ```text
/// BR x-F
///    ~~~
/// JSR 99
///     ~~
/// LDR R0, R0, 9
///             ~
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct Offset {
    value: i16,
    bits: u32
}
impl Offset {
    /// Creates a new offset value.
    /// This must fit within `bits` bits as a signed integer, otherwise an error is raised.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lc3_twopass::ast::Offset;
    /// #
    /// let neg16 = Offset::new(-16, 5);
    /// let pos15 = Offset::new(15, 5);
    /// let pos16 = Offset::new(16, 5);
    /// assert!(neg16.is_ok());
    /// assert!(pos15.is_ok());
    /// assert!(pos16.is_err());
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `bits` is not between 1 and 16.
    ///
    /// ```should_panic
    /// # use lc3_twopass::ast::Offset;
    /// #
    /// let oh_no = Offset::new(18, 17);
    /// ```
    pub fn new(value: i32, bits: u32) -> Result<Self, OffsetNewErr> {
        assert!((1..=16).contains(&bits), "bit size {bits} must be between 1 and 16");
        let min = (-1i32) << (bits - 1);
        let max = (1i32 << (bits - 1)) - 1;

        match (min..=max).contains(&value) {
            true  => Ok(Offset { value: value as i16, bits }),
            false => Err(OffsetNewErr::CannotFitSigned(bits)),
        }
    }

    /// Creates a new offset by sign-extending the first `bits` bits of the integer,
    /// and discarding the rest.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lc3_twopass::ast::Offset;
    /// #
    /// assert_eq!(Offset::new_trunc(0b11011, 5).get(), -5);
    /// assert_eq!(Offset::new_trunc(0b01111, 5).get(), 15);
    /// assert_eq!(Offset::new_trunc(0b10000, 5).get(), -16);
    /// assert_eq!(Offset::new_trunc(0x1FE, 9).get(), -2);
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `bits` is not between 1 and 16.
    pub fn new_trunc(value: u16, bits: u32) -> Self {
        assert!((1..=16).contains(&bits), "bit size {bits} must be between 1 and 16");
        let shift = 16 - bits;
        Self { value: ((value << shift) as i16) >> shift, bits }
    }

    /// Gets the value of the offset.
    pub fn get(&self) -> i16 {
        self.value
    }

    /// Gets the bit width of the field this offset occupies.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// The two's complement bits of this offset, truncated to its width.
    ///
    /// ```
    /// # use lc3_twopass::ast::Offset;
    /// #
    /// assert_eq!(Offset::new(-2, 9).unwrap().field(), 0x1FE);
    /// assert_eq!(Offset::new(5, 5).unwrap().field(), 0x05);
    /// ```
    pub fn field(&self) -> u16 {
        (self.value as u16) & low_mask(self.bits)
    }
}
impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.value, f)
    }
}

/// Checks that a value fits in an unsigned field of the given bitsize.
pub fn fit_unsigned(value: i32, bits: u32) -> Result<u16, OffsetNewErr> {
    match u16::try_from(value) {
        Ok(v) if v & !low_mask(bits) == 0 => Ok(v),
        _ => Err(OffsetNewErr::CannotFitUnsigned(bits)),
    }
}

/// Checks that a value fits in a full 16-bit word,
/// accepting both the signed and unsigned interpretations (`-32768` to `65535`).
///
/// ```
/// # use lc3_twopass::ast::fit_word;
/// assert_eq!(fit_word(-1), Ok(0xFFFF));
/// assert_eq!(fit_word(0xFFFF), Ok(0xFFFF));
/// assert!(fit_word(0x10000).is_err());
/// assert!(fit_word(-32769).is_err());
/// ```
pub fn fit_word(value: i32) -> Result<u16, OffsetNewErr> {
    match (i32::from(i16::MIN)..=i32::from(u16::MAX)).contains(&value) {
        true  => Ok(value as u16),
        false => Err(OffsetNewErr::CannotFitWord),
    }
}

/// A mask of the low `bits` bits of a word.
pub(crate) fn low_mask(bits: u32) -> u16 {
    match bits {
        0 => 0,
        16.. => u16::MAX,
        n => (1 << n) - 1
    }
}
