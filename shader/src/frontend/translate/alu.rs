//! Floating-point ALU translators.

use super::*;
use crate::error::Error;
use crate::ir::{FmzMode, FpControl, FpRounding, Opcode, Pred};

fn fp_rounding(raw: u64) -> FpRounding {
    match raw & 3 {
        0 => FpRounding::RN,
        1 => FpRounding::RM,
        2 => FpRounding::RP,
        _ => FpRounding::RZ,
    }
}

fn fmz_mode(raw: u64) -> FmzMode {
    match raw & 3 {
        0 => FmzMode::None,
        1 => FmzMode::FTZ,
        _ => FmzMode::DontCare,
    }
}

pub(super) fn mov(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let value = int_src_b(ir, insn, form)?;
    ir.set_register(dest_reg(insn), value)
}

pub(super) fn mov32i(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let value = ir.imm32(imm32(insn));
    ir.set_register(dest_reg(insn), value)
}

/// FADD: abs_a bit 46, neg_a bit 48, abs_b bit 49, neg_b bit 45,
/// saturate bit 50, CC bit 47, rounding bits 39..41.
pub(super) fn fadd(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let control = FpControl {
        no_contraction: true,
        rounding: fp_rounding(insn >> 39),
        fmz_mode: FmzMode::None,
    };
    let op_a = float_src_a(ir, insn)?;
    let op_a = apply_fp_abs_neg(ir, op_a, (insn >> 46) & 1 != 0, (insn >> 48) & 1 != 0)?;
    let op_b = float_src_b(ir, insn, form)?;
    let op_b = apply_fp_abs_neg(ir, op_b, (insn >> 49) & 1 != 0, (insn >> 45) & 1 != 0)?;
    let sum = ir.fp_add(control, op_a, op_b)?;
    let sum = apply_saturate(ir, sum, (insn >> 50) & 1 != 0)?;
    if (insn >> 47) & 1 != 0 {
        set_zero_sign_flags(ir, sum)?;
    }
    set_float_dest(ir, dest_reg(insn), sum)
}

/// FMUL: neg_b bit 48, saturate bit 50, CC bit 47, fmz bits 44..46.
pub(super) fn fmul(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let control = FpControl {
        no_contraction: true,
        rounding: fp_rounding(insn >> 39),
        fmz_mode: fmz_mode(insn >> 44),
    };
    let op_a = float_src_a(ir, insn)?;
    let op_b = float_src_b(ir, insn, form)?;
    let op_b = apply_fp_abs_neg(ir, op_b, false, (insn >> 48) & 1 != 0)?;
    let product = ir.fp_mul(control, op_a, op_b)?;
    let product = apply_saturate(ir, product, (insn >> 50) & 1 != 0)?;
    if (insn >> 47) & 1 != 0 {
        set_zero_sign_flags(ir, product)?;
    }
    set_float_dest(ir, dest_reg(insn), product)
}

/// FFMA: d = a * b + c. `swap_cb` distinguishes the form where the addend
/// comes from the register file and the multiplier from a constant buffer.
/// neg_b bit 48, neg_c bit 49, saturate bit 50, CC bit 47.
pub(super) fn ffma(ir: &mut IrEmitter, insn: u64, form: SrcB, swap_cb: bool) -> Result<()> {
    let control = FpControl {
        no_contraction: true,
        rounding: fp_rounding(insn >> 51),
        fmz_mode: fmz_mode(insn >> 53),
    };
    let op_a = float_src_a(ir, insn)?;
    let (op_b, op_c) = if swap_cb {
        let op_b = {
            let raw = ir.get_register(src_c_reg(insn))?;
            ir.bitcast_u32_f32(raw)?
        };
        let op_c = float_src_b(ir, insn, SrcB::Cbuf)?;
        (op_b, op_c)
    } else {
        let op_b = float_src_b(ir, insn, form)?;
        let op_c = {
            let raw = ir.get_register(src_c_reg(insn))?;
            ir.bitcast_u32_f32(raw)?
        };
        (op_b, op_c)
    };
    let op_b = apply_fp_abs_neg(ir, op_b, false, (insn >> 48) & 1 != 0)?;
    let op_c = apply_fp_abs_neg(ir, op_c, false, (insn >> 49) & 1 != 0)?;
    let result = ir.fp_fma(control, op_a, op_b, op_c)?;
    let result = apply_saturate(ir, result, (insn >> 50) & 1 != 0)?;
    if (insn >> 47) & 1 != 0 {
        set_zero_sign_flags(ir, result)?;
    }
    set_float_dest(ir, dest_reg(insn), result)
}

/// FMNMX: min when the selector predicate (bits 39..43) is true, else max.
pub(super) fn fmnmx(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let op_a = float_src_a(ir, insn)?;
    let op_a = apply_fp_abs_neg(ir, op_a, (insn >> 46) & 1 != 0, (insn >> 48) & 1 != 0)?;
    let op_b = float_src_b(ir, insn, form)?;
    let op_b = apply_fp_abs_neg(ir, op_b, (insn >> 49) & 1 != 0, (insn >> 45) & 1 != 0)?;
    let pred = Pred::new((insn >> 39) & 0x7);
    let neg_pred = (insn >> 42) & 1 != 0;
    let selector = ir.get_pred(pred, neg_pred)?;
    let min = ir.fp_min(op_a, op_b)?;
    let max = ir.fp_max(op_a, op_b)?;
    let result = ir.select(selector, min, max)?;
    if (insn >> 47) & 1 != 0 {
        set_zero_sign_flags(ir, result)?;
    }
    set_float_dest(ir, dest_reg(insn), result)
}

/// MUFU: multifunction unit, operation selector at bits 20..24, abs bit 46,
/// neg bit 48, saturate bit 50.
pub(super) fn mufu(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let value = float_src_a(ir, insn)?;
    let value = apply_fp_abs_neg(ir, value, (insn >> 46) & 1 != 0, (insn >> 48) & 1 != 0)?;
    let result = match (insn >> 20) & 0xf {
        0 => ir.fp_cos(value)?,
        1 => ir.fp_sin(value)?,
        2 => ir.fp_exp2(value)?,
        3 => ir.fp_log2(value)?,
        4 => ir.fp_recip(value)?,
        5 => ir.fp_recip_sqrt(value)?,
        8 => ir.fp_sqrt(value)?,
        other => {
            return Err(Error::not_implemented(format!("MUFU operation {}", other)));
        }
    };
    let result = apply_saturate(ir, result, (insn >> 50) & 1 != 0)?;
    set_float_dest(ir, dest_reg(insn), result)
}

fn fp_compare_opcode(raw: u64) -> Result<Opcode> {
    Ok(match raw & 0xf {
        1 => Opcode::FPOrdLessThan32,
        2 => Opcode::FPOrdEqual32,
        3 => Opcode::FPOrdLessThanEqual32,
        4 => Opcode::FPOrdGreaterThan32,
        5 => Opcode::FPOrdNotEqual32,
        6 => Opcode::FPOrdGreaterThanEqual32,
        9 => Opcode::FPUnordLessThan32,
        10 => Opcode::FPUnordEqual32,
        11 => Opcode::FPUnordLessThanEqual32,
        12 => Opcode::FPUnordGreaterThan32,
        13 => Opcode::FPUnordNotEqual32,
        14 => Opcode::FPUnordGreaterThanEqual32,
        other => {
            return Err(Error::not_implemented(format!("FP comparison {}", other)));
        }
    })
}

/// FSETP: compare bits 48..52, combine op bits 45..47, destination
/// predicates at bits 3..6 and 0..3, combining predicate bits 39..42
/// (negated by bit 42). abs_a bit 7, neg_a bit 43, abs_b bit 44, neg_b 6.
pub(super) fn fsetp(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let op_a = float_src_a(ir, insn)?;
    let op_a = apply_fp_abs_neg(ir, op_a, (insn >> 7) & 1 != 0, (insn >> 43) & 1 != 0)?;
    let op_b = float_src_b(ir, insn, form)?;
    let op_b = apply_fp_abs_neg(ir, op_b, (insn >> 44) & 1 != 0, (insn >> 6) & 1 != 0)?;
    let compare_op = fp_compare_opcode(insn >> 48)?;
    let compare = ir.fp_compare(compare_op, op_a, op_b)?;

    let combine_pred = Pred::new((insn >> 39) & 0x7);
    let combine_neg = (insn >> 42) & 1 != 0;
    let combine = ir.get_pred(combine_pred, combine_neg)?;
    let (result_a, result_b) = match (insn >> 45) & 0x3 {
        0 => {
            let not = ir.logical_not(compare)?;
            (ir.logical_and(compare, combine)?, ir.logical_and(not, combine)?)
        }
        1 => {
            let not = ir.logical_not(compare)?;
            (ir.logical_or(compare, combine)?, ir.logical_or(not, combine)?)
        }
        _ => {
            let not = ir.logical_not(compare)?;
            (ir.logical_xor(compare, combine)?, ir.logical_xor(not, combine)?)
        }
    };
    ir.set_pred(Pred::new((insn >> 3) & 0x7), result_a)?;
    ir.set_pred(Pred::new(insn & 0x7), result_b)
}
