//! Scalar conversion translators.

use super::*;
use crate::error::Error;
use crate::ir::{FmzMode, FpControl, FpRounding, Opcode};

fn int_rounding(raw: u64) -> FpRounding {
    match raw & 3 {
        0 => FpRounding::RN,
        1 => FpRounding::RM,
        2 => FpRounding::RP,
        _ => FpRounding::RZ,
    }
}

/// F2F on 32-bit values: rounding mode selector at bits 39..41 applies
/// round/floor/ceil/trunc to the value itself.
pub(super) fn f2f(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let value = float_src_b(ir, insn, SrcB::Reg)?;
    let value = apply_fp_abs_neg(ir, value, (insn >> 49) & 1 != 0, (insn >> 45) & 1 != 0)?;
    let result = if (insn >> 44) & 1 != 0 {
        match (insn >> 39) & 3 {
            0 => ir.inst(Opcode::FPRoundEven32, &[value])?,
            1 => ir.inst(Opcode::FPFloor32, &[value])?,
            2 => ir.inst(Opcode::FPCeil32, &[value])?,
            _ => ir.inst(Opcode::FPTrunc32, &[value])?,
        }
    } else {
        value
    };
    let result = apply_saturate(ir, result, (insn >> 50) & 1 != 0)?;
    set_float_dest(ir, dest_reg(insn), result)
}

/// F2I: destination signedness bit 12, rounding bits 39..41.
pub(super) fn f2i(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let is_signed = (insn >> 12) & 1 != 0;
    let value = float_src_b(ir, insn, SrcB::Reg)?;
    let value = apply_fp_abs_neg(ir, value, (insn >> 49) & 1 != 0, (insn >> 45) & 1 != 0)?;
    // The rounding mode rides in the conversion's flag word
    let control = FpControl {
        no_contraction: false,
        rounding: match (insn >> 39) & 3 {
            0 => FpRounding::RN,
            1 => FpRounding::RM,
            2 => FpRounding::RP,
            _ => FpRounding::RZ,
        },
        fmz_mode: FmzMode::DontCare,
    };
    let op = if is_signed { Opcode::ConvertS32F32 } else { Opcode::ConvertU32F32 };
    let result = ir.inst_flags(op, control, &[value])?;
    ir.set_register(dest_reg(insn), result)
}

/// I2F: source signedness bit 13.
pub(super) fn i2f(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let is_signed = (insn >> 13) & 1 != 0;
    let value = int_src_b(ir, insn, SrcB::Reg)?;
    let value = apply_int_neg(ir, value, (insn >> 45) & 1 != 0)?;
    let control = FpControl {
        no_contraction: false,
        rounding: int_rounding(insn >> 39),
        fmz_mode: FmzMode::DontCare,
    };
    let op = if is_signed { Opcode::ConvertF32S32 } else { Opcode::ConvertF32U32 };
    let result = ir.inst_flags(op, control, &[value])?;
    set_float_dest(ir, dest_reg(insn), result)
}

/// I2I: byte/halfword source selection with sign or zero extension.
/// Source width bits 10..12 (0=8, 1=16, 2=32), signedness bit 13,
/// saturation is not supported.
pub(super) fn i2i(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    if (insn >> 50) & 1 != 0 {
        return Err(Error::not_implemented("I2I saturation"));
    }
    let is_signed = (insn >> 13) & 1 != 0;
    let value = int_src_b(ir, insn, SrcB::Reg)?;
    let result = match (insn >> 10) & 3 {
        0 => {
            let zero = ir.imm32(0);
            let count = ir.imm32(8);
            ir.bit_field_extract(value, zero, count, is_signed)?
        }
        1 => {
            let zero = ir.imm32(0);
            let count = ir.imm32(16);
            ir.bit_field_extract(value, zero, count, is_signed)?
        }
        2 => value,
        other => {
            return Err(Error::not_implemented(format!("I2I source width {}", other)));
        }
    };
    if (insn >> 47) & 1 != 0 {
        set_zero_sign_flags(ir, result)?;
    }
    ir.set_register(dest_reg(insn), result)
}
