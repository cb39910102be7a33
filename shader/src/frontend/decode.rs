//! Bitfield dispatch over the guest's 64-bit instruction words.
//!
//! Encodings are written as 16-character patterns over the top sixteen bits
//! of the word (`0`, `1` or `-`), parsed once into mask/value pairs and
//! matched most-constrained first.

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GuestOpcode {
    MovReg,
    MovCbuf,
    MovImm,
    Mov32Imm,
    FaddReg,
    FaddCbuf,
    FaddImm,
    FmulReg,
    FmulCbuf,
    FmulImm,
    FfmaReg,
    FfmaRc,
    FfmaCr,
    FfmaImm,
    FmnmxReg,
    FmnmxCbuf,
    FmnmxImm,
    Mufu,
    FsetpReg,
    FsetpCbuf,
    FsetpImm,
    IaddReg,
    IaddCbuf,
    IaddImm,
    Iadd32Imm,
    IscaddReg,
    IscaddCbuf,
    IscaddImm,
    ImnmxReg,
    ImnmxCbuf,
    ImnmxImm,
    IsetpReg,
    IsetpCbuf,
    IsetpImm,
    LopReg,
    LopCbuf,
    LopImm,
    Lop32Imm,
    ShlReg,
    ShlCbuf,
    ShlImm,
    ShrReg,
    ShrCbuf,
    ShrImm,
    BfeReg,
    BfeCbuf,
    BfeImm,
    BfiReg,
    PopcReg,
    FloReg,
    F2F,
    F2I,
    I2F,
    I2I,
    Ldc,
    Ldg,
    Stg,
    Ldl,
    Stl,
    Lds,
    Sts,
    Ald,
    Ast,
    Ipa,
    Tex,
    S2R,
    Nop,
    Exit,
    Bra,
    Brx,
    Ssy,
    Sync,
    Pbk,
    Brk,
}

struct Encoding {
    mask: u64,
    value: u64,
    opcode: GuestOpcode,
}

fn parse_pattern(pattern: &str, opcode: GuestOpcode) -> Encoding {
    let mut mask = 0u64;
    let mut value = 0u64;
    let mut bit = 16;
    for c in pattern.chars() {
        if c == ' ' {
            continue;
        }
        bit -= 1;
        match c {
            '0' => mask |= 1 << bit,
            '1' => {
                mask |= 1 << bit;
                value |= 1 << bit;
            }
            '-' => {}
            other => unreachable!("invalid pattern character {}", other),
        }
    }
    debug_assert!(bit == 0, "pattern {:?} is not 16 bits", pattern);
    Encoding { mask: mask << 48, value: value << 48, opcode }
}

lazy_static! {
    static ref TABLE: Vec<Encoding> = {
        let raw: &[(&str, GuestOpcode)] = &[
            ("0101 1100 1001 1---", GuestOpcode::MovReg),
            ("0100 1100 1001 1---", GuestOpcode::MovCbuf),
            ("0011 100- 1001 1---", GuestOpcode::MovImm),
            ("0000 0001 0000 ----", GuestOpcode::Mov32Imm),
            ("0101 1100 0101 1---", GuestOpcode::FaddReg),
            ("0100 1100 0101 1---", GuestOpcode::FaddCbuf),
            ("0011 100- 0101 1---", GuestOpcode::FaddImm),
            ("0101 1100 0110 1---", GuestOpcode::FmulReg),
            ("0100 1100 0110 1---", GuestOpcode::FmulCbuf),
            ("0011 100- 0110 1---", GuestOpcode::FmulImm),
            ("0101 1001 1--- ----", GuestOpcode::FfmaReg),
            ("0100 1001 1--- ----", GuestOpcode::FfmaRc),
            ("0101 0001 1--- ----", GuestOpcode::FfmaCr),
            ("0011 001- 1--- ----", GuestOpcode::FfmaImm),
            ("0101 1100 0110 0---", GuestOpcode::FmnmxReg),
            ("0100 1100 0110 0---", GuestOpcode::FmnmxCbuf),
            ("0011 100- 0110 0---", GuestOpcode::FmnmxImm),
            ("0101 0000 1000 0---", GuestOpcode::Mufu),
            ("0101 1011 1011 ----", GuestOpcode::FsetpReg),
            ("0100 1011 1011 ----", GuestOpcode::FsetpCbuf),
            ("0011 011- 1011 ----", GuestOpcode::FsetpImm),
            ("0101 1100 0001 0---", GuestOpcode::IaddReg),
            ("0100 1100 0001 0---", GuestOpcode::IaddCbuf),
            ("0011 100- 0001 0---", GuestOpcode::IaddImm),
            ("0001 110- ---- ----", GuestOpcode::Iadd32Imm),
            ("0101 1100 0001 1---", GuestOpcode::IscaddReg),
            ("0100 1100 0001 1---", GuestOpcode::IscaddCbuf),
            ("0011 100- 0001 1---", GuestOpcode::IscaddImm),
            ("0101 1100 0010 0---", GuestOpcode::ImnmxReg),
            ("0100 1100 0010 0---", GuestOpcode::ImnmxCbuf),
            ("0011 100- 0010 0---", GuestOpcode::ImnmxImm),
            ("0101 1011 0110 ----", GuestOpcode::IsetpReg),
            ("0100 1011 0110 ----", GuestOpcode::IsetpCbuf),
            ("0011 011- 0110 ----", GuestOpcode::IsetpImm),
            ("0101 1100 0100 0---", GuestOpcode::LopReg),
            ("0100 1100 0100 0---", GuestOpcode::LopCbuf),
            ("0011 100- 0100 0---", GuestOpcode::LopImm),
            ("0000 01-- ---- ----", GuestOpcode::Lop32Imm),
            ("0101 1100 0100 1---", GuestOpcode::ShlReg),
            ("0100 1100 0100 1---", GuestOpcode::ShlCbuf),
            ("0011 100- 0100 1---", GuestOpcode::ShlImm),
            ("0101 1100 0010 1---", GuestOpcode::ShrReg),
            ("0100 1100 0010 1---", GuestOpcode::ShrCbuf),
            ("0011 100- 0010 1---", GuestOpcode::ShrImm),
            ("0101 1100 0000 0---", GuestOpcode::BfeReg),
            ("0100 1100 0000 0---", GuestOpcode::BfeCbuf),
            ("0011 100- 0000 0---", GuestOpcode::BfeImm),
            ("0101 1011 1111 0---", GuestOpcode::BfiReg),
            ("0101 1100 0000 1---", GuestOpcode::PopcReg),
            ("0101 1100 0011 0---", GuestOpcode::FloReg),
            ("0101 1100 1010 1---", GuestOpcode::F2F),
            ("0101 1100 1011 0---", GuestOpcode::F2I),
            ("0101 1100 1011 1---", GuestOpcode::I2F),
            ("0101 1100 1110 0---", GuestOpcode::I2I),
            ("1110 1111 1001 0---", GuestOpcode::Ldc),
            ("1110 1110 1101 0---", GuestOpcode::Ldg),
            ("1110 1110 1101 1---", GuestOpcode::Stg),
            ("1110 1111 0100 0---", GuestOpcode::Ldl),
            ("1110 1111 0101 0---", GuestOpcode::Stl),
            ("1110 1111 0100 1---", GuestOpcode::Lds),
            ("1110 1111 0101 1---", GuestOpcode::Sts),
            ("1110 1111 1101 1---", GuestOpcode::Ald),
            ("1110 1111 1111 0---", GuestOpcode::Ast),
            ("1110 0000 ---- ----", GuestOpcode::Ipa),
            ("1100 0--- ---- ----", GuestOpcode::Tex),
            ("1111 0000 1100 1---", GuestOpcode::S2R),
            ("0101 0000 1011 0---", GuestOpcode::Nop),
            ("1110 0011 0000 ----", GuestOpcode::Exit),
            ("1110 0010 0100 ----", GuestOpcode::Bra),
            ("1110 0010 0101 ----", GuestOpcode::Brx),
            ("1110 0010 1001 ----", GuestOpcode::Ssy),
            ("1111 0000 1111 1---", GuestOpcode::Sync),
            ("1110 0010 1010 ----", GuestOpcode::Pbk),
            ("1110 0011 0100 ----", GuestOpcode::Brk),
        ];
        let mut table: Vec<Encoding> =
            raw.iter().map(|&(pattern, opcode)| parse_pattern(pattern, opcode)).collect();
        // Most constrained encodings win ties
        table.sort_by_key(|encoding| u64::max_value() - u64::from(encoding.mask.count_ones()));
        table
    };
}

pub fn decode(insn: u64) -> Result<GuestOpcode> {
    TABLE
        .iter()
        .find(|encoding| insn & encoding.mask == encoding.value)
        .map(|encoding| encoding.opcode)
        .ok_or_else(|| Error::not_implemented(format!("instruction {:#018x}", insn)))
}

/// Control words interleaved with the instruction stream carry scheduling
/// information, not instructions. One precedes every three instructions.
pub fn is_sched_word(address: u64, start_address: u64) -> bool {
    ((address - start_address) / 8) % 4 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_patterns() {
        // IADD (reg): 0101 1100 0001 0---
        let iadd = 0b0101_1100_0001_0000u64 << 48;
        assert_eq!(decode(iadd).unwrap(), GuestOpcode::IaddReg);
        // EXIT
        let exit = 0b1110_0011_0000_0000u64 << 48;
        assert_eq!(decode(exit).unwrap(), GuestOpcode::Exit);
        // LDC with a size field in the low pattern bits
        let ldc = 0b1110_1111_1001_0011u64 << 48;
        assert_eq!(decode(ldc).unwrap(), GuestOpcode::Ldc);
    }

    #[test]
    fn unknown_patterns_are_not_implemented() {
        assert!(decode(u64::max_value()).is_err());
    }

    #[test]
    fn priority_prefers_more_constrained_encodings() {
        // TEX's wide pattern must not shadow narrower ones
        let s2r = 0b1111_0000_1100_1000u64 << 48;
        assert_eq!(decode(s2r).unwrap(), GuestOpcode::S2R);
    }
}
