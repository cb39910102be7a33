//! Per-opcode translation from guest instruction words to IR emission.

mod alu;
mod attribute_io;
mod convert;
mod integer;
mod ldc;
mod memory;
mod system;
mod texture;

use crate::error::Result;
use crate::frontend::decode::GuestOpcode;
use crate::ir::{IrEmitter, Pred, Reg, Value};

/// Destination register, bits 0..8.
pub(crate) fn dest_reg(insn: u64) -> Reg {
    Reg::new(insn & 0xff)
}

/// First source register, bits 8..16.
pub(crate) fn src_a_reg(insn: u64) -> Reg {
    Reg::new((insn >> 8) & 0xff)
}

/// Second source register, bits 20..28 (register forms only).
pub(crate) fn src_b_reg(insn: u64) -> Reg {
    Reg::new((insn >> 20) & 0xff)
}

/// Third source register, bits 39..47.
pub(crate) fn src_c_reg(insn: u64) -> Reg {
    Reg::new((insn >> 39) & 0xff)
}

/// Guard predicate, bits 16..19 with the negation bit at 19.
pub(crate) fn guard_pred(insn: u64) -> (Pred, bool) {
    (Pred::new((insn >> 16) & 0x7), (insn >> 19) & 1 != 0)
}

/// Signed 19-bit integer immediate at bits 20..39, negated by bit 56.
pub(crate) fn imm20_int(insn: u64) -> u32 {
    let raw = ((insn >> 20) & 0x7_ffff) as u32;
    if (insn >> 56) & 1 != 0 {
        (raw as i32).wrapping_neg() as u32
    } else {
        raw
    }
}

/// Float immediate: the 19-bit field forms the upper mantissa/exponent bits,
/// bit 56 is the sign.
pub(crate) fn imm20_float(insn: u64) -> f32 {
    let raw = (((insn >> 20) & 0x7_ffff) as u32) << 12;
    let sign = (((insn >> 56) & 1) as u32) << 31;
    f32::from_bits(raw | sign)
}

/// 32-bit immediate of the long-immediate forms, bits 20..52.
pub(crate) fn imm32(insn: u64) -> u32 {
    ((insn >> 20) & 0xffff_ffff) as u32
}

/// Constant buffer operand: byte offset bits 20..34 (x4), index bits 34..39.
pub(crate) fn cbuf_operand(ir: &mut IrEmitter, insn: u64) -> Result<Value> {
    let offset = (((insn >> 20) & 0x3fff) * 4) as u32;
    let index = ((insn >> 34) & 0x1f) as u32;
    ir.get_cbuf_u32(index, offset)
}

pub(crate) fn cbuf_float_operand(ir: &mut IrEmitter, insn: u64) -> Result<Value> {
    let offset = ir.imm32((((insn >> 20) & 0x3fff) * 4) as u32);
    let index = ir.imm32(((insn >> 34) & 0x1f) as u32);
    ir.get_float_cbuf(index, offset)
}

/// Which form the second operand takes, implied by the matched encoding.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum SrcB {
    Reg,
    Cbuf,
    Imm,
}

pub(crate) fn int_src_b(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<Value> {
    match form {
        SrcB::Reg => ir.get_register(src_b_reg(insn)),
        SrcB::Cbuf => cbuf_operand(ir, insn),
        SrcB::Imm => Ok(ir.imm32(imm20_int(insn))),
    }
}

pub(crate) fn float_src_b(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<Value> {
    match form {
        SrcB::Reg => {
            let raw = ir.get_register(src_b_reg(insn))?;
            ir.bitcast_u32_f32(raw)
        }
        SrcB::Cbuf => cbuf_float_operand(ir, insn),
        SrcB::Imm => Ok(ir.imm32f(imm20_float(insn))),
    }
}

pub(crate) fn float_src_a(ir: &mut IrEmitter, insn: u64) -> Result<Value> {
    let raw = ir.get_register(src_a_reg(insn))?;
    ir.bitcast_u32_f32(raw)
}

/// Writes a float result back as raw register bits.
pub(crate) fn set_float_dest(ir: &mut IrEmitter, reg: Reg, value: Value) -> Result<()> {
    let raw = ir.bitcast_f32_u32(value)?;
    ir.set_register(reg, raw)
}

/// Generic absolute-value/negation modifier application.
pub(crate) fn apply_fp_abs_neg(
    ir: &mut IrEmitter,
    value: Value,
    abs: bool,
    neg: bool,
) -> Result<Value> {
    let mut value = value;
    if abs {
        value = ir.fp_abs(value)?;
    }
    if neg {
        value = ir.fp_neg(value)?;
    }
    Ok(value)
}

pub(crate) fn apply_int_neg(ir: &mut IrEmitter, value: Value, neg: bool) -> Result<Value> {
    if neg {
        ir.ineg(value)
    } else {
        Ok(value)
    }
}

/// Saturation modifier for float results.
pub(crate) fn apply_saturate(ir: &mut IrEmitter, value: Value, saturate: bool) -> Result<Value> {
    if saturate {
        ir.fp_saturate(value)
    } else {
        Ok(value)
    }
}

/// Attaches condition-code consumers to `result` and stores them in the
/// guest flags. Opcodes that do not produce carry/overflow skip those bits.
pub(crate) fn set_zero_sign_flags(ir: &mut IrEmitter, result: Value) -> Result<()> {
    let zero = ir.get_zero_from_op(result)?;
    let sign = ir.get_sign_from_op(result)?;
    ir.set_zflag(zero)?;
    ir.set_sflag(sign)
}

pub(crate) fn set_all_cc_flags(ir: &mut IrEmitter, result: Value) -> Result<()> {
    set_zero_sign_flags(ir, result)?;
    let carry = ir.get_carry_from_op(result)?;
    let overflow = ir.get_overflow_from_op(result)?;
    ir.set_cflag(carry)?;
    ir.set_oflag(overflow)
}

/// Translates one non-control instruction into the current block.
pub fn translate_instruction(ir: &mut IrEmitter, insn: u64, opcode: GuestOpcode) -> Result<()> {
    use GuestOpcode::*;
    match opcode {
        MovReg => alu::mov(ir, insn, SrcB::Reg),
        MovCbuf => alu::mov(ir, insn, SrcB::Cbuf),
        MovImm => alu::mov(ir, insn, SrcB::Imm),
        Mov32Imm => alu::mov32i(ir, insn),
        FaddReg => alu::fadd(ir, insn, SrcB::Reg),
        FaddCbuf => alu::fadd(ir, insn, SrcB::Cbuf),
        FaddImm => alu::fadd(ir, insn, SrcB::Imm),
        FmulReg => alu::fmul(ir, insn, SrcB::Reg),
        FmulCbuf => alu::fmul(ir, insn, SrcB::Cbuf),
        FmulImm => alu::fmul(ir, insn, SrcB::Imm),
        FfmaReg => alu::ffma(ir, insn, SrcB::Reg, false),
        FfmaRc => alu::ffma(ir, insn, SrcB::Cbuf, true),
        FfmaCr => alu::ffma(ir, insn, SrcB::Cbuf, false),
        FfmaImm => alu::ffma(ir, insn, SrcB::Imm, false),
        FmnmxReg => alu::fmnmx(ir, insn, SrcB::Reg),
        FmnmxCbuf => alu::fmnmx(ir, insn, SrcB::Cbuf),
        FmnmxImm => alu::fmnmx(ir, insn, SrcB::Imm),
        Mufu => alu::mufu(ir, insn),
        FsetpReg => alu::fsetp(ir, insn, SrcB::Reg),
        FsetpCbuf => alu::fsetp(ir, insn, SrcB::Cbuf),
        FsetpImm => alu::fsetp(ir, insn, SrcB::Imm),
        IaddReg => integer::iadd(ir, insn, SrcB::Reg),
        IaddCbuf => integer::iadd(ir, insn, SrcB::Cbuf),
        IaddImm => integer::iadd(ir, insn, SrcB::Imm),
        Iadd32Imm => integer::iadd32i(ir, insn),
        IscaddReg => integer::iscadd(ir, insn, SrcB::Reg),
        IscaddCbuf => integer::iscadd(ir, insn, SrcB::Cbuf),
        IscaddImm => integer::iscadd(ir, insn, SrcB::Imm),
        ImnmxReg => integer::imnmx(ir, insn, SrcB::Reg),
        ImnmxCbuf => integer::imnmx(ir, insn, SrcB::Cbuf),
        ImnmxImm => integer::imnmx(ir, insn, SrcB::Imm),
        IsetpReg => integer::isetp(ir, insn, SrcB::Reg),
        IsetpCbuf => integer::isetp(ir, insn, SrcB::Cbuf),
        IsetpImm => integer::isetp(ir, insn, SrcB::Imm),
        LopReg => integer::lop(ir, insn, SrcB::Reg),
        LopCbuf => integer::lop(ir, insn, SrcB::Cbuf),
        LopImm => integer::lop(ir, insn, SrcB::Imm),
        Lop32Imm => integer::lop32i(ir, insn),
        ShlReg => integer::shl(ir, insn, SrcB::Reg),
        ShlCbuf => integer::shl(ir, insn, SrcB::Cbuf),
        ShlImm => integer::shl(ir, insn, SrcB::Imm),
        ShrReg => integer::shr(ir, insn, SrcB::Reg),
        ShrCbuf => integer::shr(ir, insn, SrcB::Cbuf),
        ShrImm => integer::shr(ir, insn, SrcB::Imm),
        BfeReg => integer::bfe(ir, insn, SrcB::Reg),
        BfeCbuf => integer::bfe(ir, insn, SrcB::Cbuf),
        BfeImm => integer::bfe(ir, insn, SrcB::Imm),
        BfiReg => integer::bfi(ir, insn),
        PopcReg => integer::popc(ir, insn),
        FloReg => integer::flo(ir, insn),
        F2F => convert::f2f(ir, insn),
        F2I => convert::f2i(ir, insn),
        I2F => convert::i2f(ir, insn),
        I2I => convert::i2i(ir, insn),
        Ldc => ldc::ldc(ir, insn),
        Ldg => memory::ldg(ir, insn),
        Stg => memory::stg(ir, insn),
        Ldl => memory::ldl(ir, insn),
        Stl => memory::stl(ir, insn),
        Lds => memory::lds(ir, insn),
        Sts => memory::sts(ir, insn),
        Ald => attribute_io::ald(ir, insn),
        Ast => attribute_io::ast(ir, insn),
        Ipa => attribute_io::ipa(ir, insn),
        Tex => texture::tex(ir, insn),
        S2R => system::s2r(ir, insn),
        Nop => Ok(()),
        Exit | Bra | Brx | Ssy | Sync | Pbk | Brk => {
            // Control transfers are terminators; the CFG builder owns them
            Ok(())
        }
    }
}
