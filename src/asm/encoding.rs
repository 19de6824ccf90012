//! Encoding validated statements into machine words.
//!
//! Each [`Stmt`] is encoded into the exact LC-3 bit layout of its mnemonic.
//! Instructions emit one word; directives emit zero or more words.
//!
//! Operand errors never stop encoding. An invalid register or an out-of-range value
//! is reported and its field is left as 0, so the instruction still occupies its word
//! and later addresses are unaffected.

use crate::ast::asm::{Mnemonic, Operand, Stmt};
use crate::ast::reg_consts::R7;
use crate::ast::word::Word;
use crate::ast::{fit_unsigned, fit_word, Offset, Reg};
use crate::parse::is_label_name;
use crate::parse::lex::LexErr;

use super::{AsmErrKind, AsmFlags, Pass, RefKind};

/// The value of a numeric or label operand.
#[derive(Debug, PartialEq, Eq)]
enum Value {
    Num(i32),
    Label(String),
}

/// Classifies a (lowercased) operand as a numeric literal or a label reference.
///
/// Numeric literals are:
/// - hex: `x` followed by an optionally negative hex number (`x3000`, `x-1F`)
/// - decimal: an optionally negative decimal number (`10`, `-3`)
/// - `#` followed by a decimal number, if enabled by [`AsmFlags::hash_decimals`]
fn parse_value(op: &Operand, flags: &AsmFlags) -> Result<Value, AsmErrKind> {
    let Operand::Text(text) = op else {
        return Err(AsmErrKind::UnparsableOffset(op.to_string()));
    };

    let m_num = if let Some(hex) = text.strip_prefix('x') {
        Some(parse_int(hex, 16))
    } else if let Some(dec) = text.strip_prefix('#').filter(|_| flags.hash_decimals) {
        Some(parse_int(dec, 10))
    } else if text.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        Some(parse_int(text, 10))
    } else {
        None
    };

    match m_num {
        Some(Some(n)) => Ok(Value::Num(n)),
        Some(None) => Err(AsmErrKind::UnparsableOffset(text.clone())),
        None if is_label_name(text) => Ok(Value::Label(text.clone())),
        None => Err(AsmErrKind::InvalidLabelName(text.clone())),
    }
}

/// Parses an optionally negative integer.
///
/// Unlike [`i32::from_str_radix`], this does not accept a `+` sign.
fn parse_int(digits: &str, radix: u32) -> Option<i32> {
    match digits.starts_with('+') {
        true  => None,
        false => i32::from_str_radix(digits, radix).ok(),
    }
}

/// Whether the third operand of `ADD`/`AND` selects the register form.
///
/// Anything shaped like `r<digits>` counts, even if it isn't a real register,
/// so that `R9` is reported as a bad register rather than a bad immediate.
fn is_reg_form(op: &Operand) -> bool {
    match op {
        Operand::Text(t) => t.strip_prefix('r')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
        Operand::String(_) => false,
    }
}

impl Pass<'_> {
    fn emit(&mut self, word: u16) {
        self.words.push(Word::new(word));
    }

    /// Encodes a register operand into a field starting at bit `lsb`.
    fn reg(&mut self, op: &Operand, lsb: u32) -> u16 {
        let m_reg = match op {
            Operand::Text(t) => Reg::parse(t),
            Operand::String(_) => None,
        };

        self.diags.check(m_reg.is_none(), self.line, || AsmErrKind::InvalidRegister(op.to_string()));
        m_reg.map_or(0, |r| r.field(lsb))
    }

    /// Fits a value into a signed `bits`-bit field.
    fn fit(&mut self, value: i32, bits: u32) -> u16 {
        let m_off = Offset::new(value, bits)
            .map_err(|err| AsmErrKind::OffsetOutOfRange { value, err });
        self.diags.ok(self.line, m_off).map_or(0, |off| off.field())
    }

    /// Encodes an offset or immediate operand into the low `bits` bits.
    ///
    /// A label operand is encoded as the PC-relative offset to the label.
    fn offset(&mut self, op: &Operand, bits: u32) -> u16 {
        match self.diags.ok(self.line, parse_value(op, self.flags)) {
            Some(Value::Num(n)) => self.fit(n, bits),
            Some(Value::Label(label)) => self.label_field(&label, RefKind::PcOffset(bits)),
            None => 0,
        }
    }

    /// Evaluates an operand which must be a numeric literal (not a label).
    fn number(&mut self, op: &Operand) -> Option<i32> {
        let m_num = match parse_value(op, self.flags) {
            Ok(Value::Num(n)) => Ok(n),
            _ => Err(AsmErrKind::UnparsableOffset(op.to_string())),
        };
        self.diags.ok(self.line, m_num)
    }

    /// Evaluates an operand which must fit in an unsigned 16-bit value.
    fn unsigned(&mut self, op: &Operand) -> Option<u16> {
        let value = self.number(op)?;
        let m_n = fit_unsigned(value, 16)
            .map_err(|err| AsmErrKind::OffsetOutOfRange { value, err });
        self.diags.ok(self.line, m_n)
    }

    /// Encodes a statement, appending its words to the output.
    pub(super) fn encode(&mut self, stmt: &Stmt) {
        let Stmt { mnemonic, cond, operands } = stmt;
        let base = mnemonic.opcode_bits();

        // every instruction is one word
        if !mnemonic.is_directive() && !self.has_room(1) {
            return;
        }

        // HALT, GETC, etc.
        if let Some(vect) = mnemonic.trap_vect() {
            self.emit(base | vect);
            return;
        }

        match (mnemonic, &operands[..]) {
            (Mnemonic::ADD | Mnemonic::AND, [dr, sr1, op3]) => {
                let dr = self.reg(dr, 9);
                let sr1 = self.reg(sr1, 6);
                let op3 = match is_reg_form(op3) {
                    true  => self.reg(op3, 0),
                    false => 1 << 5 | self.offset(op3, 5),
                };
                self.emit(base | dr | sr1 | op3);
            },
            (Mnemonic::NOT, [dr, sr]) => {
                let dr = self.reg(dr, 9);
                let sr = self.reg(sr, 6);
                self.emit(base | dr | sr | 0x3F);
            },
            (Mnemonic::BR, [off]) => {
                let cc = u16::from(cond.unwrap_or(0b111)) << 9;
                let off = self.offset(off, 9);
                self.emit(base | cc | off);
            },
            (Mnemonic::JMP | Mnemonic::JSRR, [br]) => {
                let br = self.reg(br, 6);
                self.emit(base | br);
            },
            (Mnemonic::RET, []) => self.emit(base | R7.field(6)),
            (Mnemonic::RTI, []) => self.emit(base),
            (Mnemonic::JSR, [off]) => {
                let off = self.offset(off, 11);
                self.emit(base | 1 << 11 | off);
            },
            (Mnemonic::LD | Mnemonic::LDI | Mnemonic::LEA | Mnemonic::ST | Mnemonic::STI, [r, off]) => {
                let r = self.reg(r, 9);
                let off = self.offset(off, 9);
                self.emit(base | r | off);
            },
            (Mnemonic::LDR | Mnemonic::STR, [r, br, off]) => {
                let r = self.reg(r, 9);
                let br = self.reg(br, 6);
                let off = self.offset(off, 6);
                self.emit(base | r | br | off);
            },
            (Mnemonic::TRAP, [vect]) => {
                let vect = self.offset(vect, 8);
                self.emit(base | vect);
            },

            (Mnemonic::ORIG, [addr]) => {
                if let Some(addr) = self.unsigned(addr) {
                    self.orig.get_or_insert(addr);
                }
            },
            (Mnemonic::FILL, [op]) => {
                if !self.has_room(1) {
                    return;
                }
                let value = match self.diags.ok(self.line, parse_value(op, self.flags)) {
                    Some(Value::Num(value)) => {
                        let m_word = fit_word(value)
                            .map_err(|err| AsmErrKind::OffsetOutOfRange { value, err });
                        self.diags.ok(self.line, m_word).unwrap_or(0)
                    },
                    Some(Value::Label(label)) => self.label_field(&label, RefKind::Absolute),
                    None => 0,
                };
                self.emit(value);
            },
            (Mnemonic::BLKW, [n]) => {
                let Some(n) = self.unsigned(n) else { return };
                if self.has_room(usize::from(n)) {
                    let len = self.words.len() + usize::from(n);
                    self.words.resize(len, Word::default());
                }
            },
            (Mnemonic::STRINGZ, [Operand::String(s)]) => {
                let len = s.encode_utf16().count() + 1;
                if self.has_room(len) {
                    self.words.extend(s.encode_utf16().chain([0]).map(Word::new));
                }
            },
            (Mnemonic::STRINGZ, [_]) => {
                self.diags.push(self.line, AsmErrKind::InvalidString(LexErr::ExpectedStrLit));
            },
            (Mnemonic::END, []) => {},

            (&mnemonic, ops) => {
                let kind = AsmErrKind::ArityMismatch { mnemonic, expected: mnemonic.operand_count(), found: ops.len() };
                self.diags.push(self.line, kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::{assemble, AsmErrKind, AsmFlags};
    use crate::ast::asm::Operand;
    use crate::ast::reg_consts::{R1, R2, R4};

    use super::{is_reg_form, parse_value, Value};

    fn text(s: &str) -> Operand {
        Operand::Text(s.to_string())
    }
    fn encode(line: &str) -> u16 {
        let asm = assemble([line]);
        assert!(asm.is_clean(), "{line}: {:?}", asm.errors);
        assert_eq!(asm.obj.len(), 1, "{line}");
        asm.obj.words()[0].get()
    }

    #[test]
    fn test_parse_value() {
        let flags = AsmFlags::default();
        assert_eq!(parse_value(&text("x3000"), &flags), Ok(Value::Num(0x3000)));
        assert_eq!(parse_value(&text("x-1f"), &flags), Ok(Value::Num(-31)));
        assert_eq!(parse_value(&text("15"), &flags), Ok(Value::Num(15)));
        assert_eq!(parse_value(&text("-16"), &flags), Ok(Value::Num(-16)));
        assert_eq!(parse_value(&text("#-7"), &flags), Ok(Value::Num(-7)));
        assert_eq!(parse_value(&text("loop"), &flags), Ok(Value::Label("loop".to_string())));

        assert_eq!(parse_value(&text("x"), &flags), Err(AsmErrKind::UnparsableOffset("x".to_string())));
        assert_eq!(parse_value(&text("xyz"), &flags), Err(AsmErrKind::UnparsableOffset("xyz".to_string())));
        assert_eq!(parse_value(&text("12a"), &flags), Err(AsmErrKind::UnparsableOffset("12a".to_string())));
        assert_eq!(parse_value(&text("-"), &flags), Err(AsmErrKind::UnparsableOffset("-".to_string())));
        assert_eq!(parse_value(&text("x+5"), &flags), Err(AsmErrKind::UnparsableOffset("x+5".to_string())));
        assert_eq!(parse_value(&text("#+5"), &flags), Err(AsmErrKind::UnparsableOffset("#+5".to_string())));
        assert_eq!(parse_value(&text("x--5"), &flags), Err(AsmErrKind::UnparsableOffset("x--5".to_string())));
        assert_eq!(parse_value(&text("99999999999"), &flags), Err(AsmErrKind::UnparsableOffset("99999999999".to_string())));
        assert_eq!(parse_value(&text("a.b"), &flags), Err(AsmErrKind::InvalidLabelName("a.b".to_string())));
        assert_eq!(
            parse_value(&Operand::String("hi".to_string()), &flags),
            Err(AsmErrKind::UnparsableOffset("\"hi\"".to_string()))
        );
    }

    #[test]
    fn test_plus_sign_rejected() {
        let asm = assemble(["ADD R0, R0, x+5"]);
        assert_eq!(asm.errors.len(), 1);
        assert_eq!(asm.errors[0].kind, AsmErrKind::UnparsableOffset("x+5".to_string()));
        assert_eq!(asm.obj.words()[0].get(), 0x1020);
    }

    #[test]
    fn test_reg_form() {
        assert!(is_reg_form(&text("r0")));
        assert!(is_reg_form(&text("r9")));
        assert!(is_reg_form(&text("r12")));
        assert!(!is_reg_form(&text("r")));
        assert!(!is_reg_form(&text("ra")));
        assert!(!is_reg_form(&text("5")));
        assert!(!is_reg_form(&text("ret_addr")));
    }

    #[test]
    fn test_arith() {
        assert_eq!(encode("ADD R1, R2, 5"), 0x12A5);
        assert_eq!(encode("ADD R1, R2, R3"), 0x1283);
        assert_eq!(encode("AND R0, R0, -1"), 0x503F);
        assert_eq!(encode("AND R7, R6, R5"), 0x5F85);
        assert_eq!(encode("ADD R0, R0, 15"), 0x102F);
        assert_eq!(encode("ADD R0, R0, -16"), 0x1030);
        assert_eq!(encode("NOT R1, R2"), 0x92BF);
    }

    #[test]
    fn test_control() {
        assert_eq!(encode("BRz 2"), 0x0402);
        assert_eq!(encode("BRnp -3"), 0x0BFD);
        assert_eq!(encode("BR 0"), 0x0E00);
        assert_eq!(encode("JMP R3"), 0xC0C0);
        assert_eq!(encode("RET"), 0xC1C0);
        assert_eq!(encode("JSRR R4"), 0x4100);
        assert_eq!(encode("JSR 5"), 0x4805);
        assert_eq!(encode("JSR -1"), 0x4FFF);
        assert_eq!(encode("RTI"), 0x8000);
    }

    #[test]
    fn test_memory() {
        assert_eq!(encode("LD R2, 3"), 0x2403);
        assert_eq!(encode("LDI R0, -1"), 0xA1FF);
        assert_eq!(encode("LEA R7, 0"), 0xEE00);
        assert_eq!(encode("ST R1, x10"), 0x3210);
        assert_eq!(encode("STI R3, 0"), 0xB600);
        assert_eq!(encode("LDR R1, R2, -32"), 0x62A0);
        assert_eq!(encode("STR R0, R6, 31"), 0x719F);
    }

    #[test]
    fn test_trap() {
        assert_eq!(encode("TRAP x7F"), 0xF07F);
        assert_eq!(encode("TRAP -128"), 0xF080);
        assert_eq!(encode("HALT"), 0xF025);
    }

    #[test]
    fn test_trap_aliases() {
        let asm = crate::asm::Assembler::new(AsmFlags { trap_aliases: true, ..Default::default() });
        let out = asm.assemble(["GETC", "OUT", "PUTC", "PUTS", "IN", "PUTSP", "HALT"]);
        assert!(out.is_clean());

        let words: Vec<_> = out.obj.words().iter().map(|w| w.get()).collect();
        assert_eq!(words, [0xF020, 0xF021, 0xF021, 0xF022, 0xF023, 0xF024, 0xF025]);
    }

    #[test]
    fn test_fields_decode() {
        let asm = assemble(["LDR R1, R2, -5", "JSRR R4"]);
        let [ldr, jsrr] = [asm.obj.words()[0], asm.obj.words()[1]];
        assert_eq!(ldr.dr(), R1);
        assert_eq!(ldr.sr1(), R2);
        assert_eq!(ldr.offset(6), -5);
        assert_eq!(jsrr.sr1(), R4);
        assert!(!jsrr.bit(11));
    }

    #[test]
    fn test_label_immediate() {
        // labels in any offset field are PC-relative
        let asm = assemble(["A ADD R0, R0, A", "LDR R0, R0, A", "TRAP A"]);
        assert!(asm.is_clean(), "{:?}", asm.errors);
        let offs: Vec<_> = asm.obj.words().iter()
            .zip([5, 6, 8])
            .map(|(w, bits)| w.offset(bits))
            .collect();
        assert_eq!(offs, [-1, -2, -3]);
    }

    #[test]
    fn test_string_register() {
        let asm = assemble([r#"NOT R1, "R2""#]);
        assert_eq!(asm.errors.len(), 1);
        assert_eq!(asm.errors[0].kind, AsmErrKind::InvalidRegister("\"R2\"".to_string()));
        assert_eq!(asm.obj.words()[0].get(), 0x923F);
    }
}
