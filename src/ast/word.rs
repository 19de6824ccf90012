//! The assembled machine word.
//!
//! A [`Word`] is a plain 16-bit value with accessor views
//! over the standard LC-3 instruction fields.

use super::{low_mask, Offset, Reg};

/// A single assembled 16-bit word.
///
/// The word is a value type: it is never modified in place.
/// Backpatching a label into a word creates a new word with [`Word::with_field`].
///
/// A word is rendered as 4 uppercase hex digits by `Display`:
/// ```
/// # use lc3_twopass::ast::word::Word;
/// let halt = Word::new(0xF025);
/// assert_eq!(halt.to_string(), "F025");
/// assert_eq!(format!("{halt:?}"), "xF025");
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct Word(u16);

impl Word {
    /// Creates a word from its raw bits.
    pub const fn new(data: u16) -> Self {
        Self(data)
    }

    /// Reads the word, returning its unsigned representation.
    pub const fn get(self) -> u16 {
        self.0
    }

    /// The opcode nibble (bits 15-12).
    pub fn opcode(self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// The destination (or source, for stores) register field (bits 11-9).
    pub fn dr(self) -> Reg {
        Reg(((self.0 >> 9) & 0b111) as u8)
    }

    /// The first source (or base) register field (bits 8-6).
    pub fn sr1(self) -> Reg {
        Reg(((self.0 >> 6) & 0b111) as u8)
    }

    /// The second source register field (bits 2-0).
    pub fn sr2(self) -> Reg {
        Reg((self.0 & 0b111) as u8)
    }

    /// Whether the bit at `pos` is set.
    pub fn bit(self, pos: u32) -> bool {
        pos < 16 && (self.0 >> pos) & 1 != 0
    }

    /// The low `len` bits of this word, zero-extended.
    pub fn low_bits(self, len: u32) -> u16 {
        self.0 & low_mask(len)
    }

    /// The low `len` bits of this word, sign-extended.
    ///
    /// ```
    /// # use lc3_twopass::ast::word::Word;
    /// // BRnzp #-2
    /// assert_eq!(Word::new(0x0FFE).offset(9), -2);
    /// ```
    ///
    /// # Panics
    ///
    /// This will panic if `len` is not between 1 and 16.
    pub fn offset(self, len: u32) -> i16 {
        Offset::new_trunc(self.0, len).get()
    }

    /// Creates a new word with the given field bits OR'd into this word.
    #[must_use]
    pub fn with_field(self, bits: u16) -> Self {
        Self(self.0 | bits)
    }
}
impl From<u16> for Word {
    fn from(value: u16) -> Self {
        Self(value)
    }
}
impl From<Word> for u16 {
    fn from(value: Word) -> Self {
        value.0
    }
}
impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}
impl std::fmt::Debug for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{:04X}", self.0)
    }
}
impl std::fmt::UpperHex for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
impl std::fmt::LowerHex for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
impl std::fmt::Binary for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::reg_consts::{R1, R2, R3, R7};

    use super::Word;

    #[test]
    fn test_fields() {
        // ADD R1, R2, R3
        let add = Word::new(0x1283);
        assert_eq!(add.opcode(), 0b0001);
        assert_eq!(add.dr(), R1);
        assert_eq!(add.sr1(), R2);
        assert_eq!(add.sr2(), R3);
        assert!(!add.bit(5));

        // AND R1, R2, #-1
        let and = Word::new(0x52BF);
        assert_eq!(and.opcode(), 0b0101);
        assert!(and.bit(5));
        assert_eq!(and.low_bits(5), 0x1F);
        assert_eq!(and.offset(5), -1);

        // RET
        let ret = Word::new(0xC1C0);
        assert_eq!(ret.opcode(), 0b1100);
        assert_eq!(ret.sr1(), R7);
    }

    #[test]
    fn test_bit_out_of_range() {
        assert!(!Word::new(0xFFFF).bit(16));
        assert!(Word::new(0xFFFF).bit(15));
    }

    #[test]
    fn test_with_field() {
        let ld = Word::new(0x2200);
        let patched = ld.with_field(0x1FE);
        assert_eq!(patched.get(), 0x23FE);
        // original word is untouched
        assert_eq!(ld.get(), 0x2200);
    }

    #[test]
    fn test_fmt() {
        assert_eq!(Word::new(0x000A).to_string(), "000A");
        assert_eq!(format!("{:04x}", Word::new(0xBEEF)), "beef");
        assert_eq!(format!("{:016b}", Word::new(0x8001)), "1000000000000001");
        assert_eq!(format!("{:?}", vec![Word::new(1), Word::new(0xF025)]), "[x0001, xF025]");
    }
}
