//! Integer ALU translators.

use super::*;
use crate::error::Error;
use crate::ir::Pred;

/// IADD: neg_a bit 49, neg_b bit 48, CC bit 47, saturate bit 50.
pub(super) fn iadd(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let op_a = ir.get_register(src_a_reg(insn))?;
    let op_a = apply_int_neg(ir, op_a, (insn >> 49) & 1 != 0)?;
    let op_b = int_src_b(ir, insn, form)?;
    let op_b = apply_int_neg(ir, op_b, (insn >> 48) & 1 != 0)?;
    let sum = ir.iadd(op_a, op_b)?;
    if (insn >> 47) & 1 != 0 {
        set_all_cc_flags(ir, sum)?;
    }
    ir.set_register(dest_reg(insn), sum)
}

pub(super) fn iadd32i(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let op_a = ir.get_register(src_a_reg(insn))?;
    let op_b = ir.imm32(imm32(insn));
    let sum = ir.iadd(op_a, op_b)?;
    // The long-immediate form places CC at bit 52
    if (insn >> 52) & 1 != 0 {
        set_all_cc_flags(ir, sum)?;
    }
    ir.set_register(dest_reg(insn), sum)
}

/// ISCADD: d = (a << shift) + b, shift at bits 39..44.
pub(super) fn iscadd(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let op_a = ir.get_register(src_a_reg(insn))?;
    let shift = ir.imm32(((insn >> 39) & 0x1f) as u32);
    let scaled = ir.shift_left_logical(op_a, shift)?;
    let op_b = int_src_b(ir, insn, form)?;
    let sum = ir.iadd(scaled, op_b)?;
    if (insn >> 47) & 1 != 0 {
        set_zero_sign_flags(ir, sum)?;
    }
    ir.set_register(dest_reg(insn), sum)
}

/// IMNMX: signedness bit 48, selector predicate bits 39..42 (neg bit 42).
pub(super) fn imnmx(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let is_signed = (insn >> 48) & 1 != 0;
    let op_a = ir.get_register(src_a_reg(insn))?;
    let op_b = int_src_b(ir, insn, form)?;
    let pred = Pred::new((insn >> 39) & 0x7);
    let neg_pred = (insn >> 42) & 1 != 0;
    let selector = ir.get_pred(pred, neg_pred)?;
    let min = ir.imin(op_a, op_b, is_signed)?;
    let max = ir.imax(op_a, op_b, is_signed)?;
    let result = ir.select(selector, min, max)?;
    if (insn >> 47) & 1 != 0 {
        set_zero_sign_flags(ir, result)?;
    }
    ir.set_register(dest_reg(insn), result)
}

fn int_compare(
    ir: &mut IrEmitter,
    raw: u64,
    is_signed: bool,
    op_a: Value,
    op_b: Value,
) -> Result<Value> {
    match raw & 0x7 {
        1 => ir.iless_than(op_a, op_b, is_signed),
        2 => ir.iequal(op_a, op_b),
        3 => ir.iless_than_equal(op_a, op_b, is_signed),
        4 => ir.igreater_than(op_a, op_b, is_signed),
        5 => ir.inot_equal(op_a, op_b),
        6 => ir.igreater_than_equal(op_a, op_b, is_signed),
        other => Err(Error::not_implemented(format!("integer comparison {}", other))),
    }
}

/// ISETP: comparison bits 49..52, signedness bit 48, combine op bits
/// 45..47, destination predicates bits 3..6 / 0..3, combining predicate
/// bits 39..42 negated by bit 42.
pub(super) fn isetp(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let is_signed = (insn >> 48) & 1 != 0;
    let op_a = ir.get_register(src_a_reg(insn))?;
    let op_b = int_src_b(ir, insn, form)?;
    let compare = int_compare(ir, insn >> 49, is_signed, op_a, op_b)?;

    let combine = {
        let pred = Pred::new((insn >> 39) & 0x7);
        let neg = (insn >> 42) & 1 != 0;
        ir.get_pred(pred, neg)?
    };
    let not_compare = ir.logical_not(compare)?;
    let (result_a, result_b) = match (insn >> 45) & 0x3 {
        0 => (ir.logical_and(compare, combine)?, ir.logical_and(not_compare, combine)?),
        1 => (ir.logical_or(compare, combine)?, ir.logical_or(not_compare, combine)?),
        _ => (ir.logical_xor(compare, combine)?, ir.logical_xor(not_compare, combine)?),
    };
    ir.set_pred(Pred::new((insn >> 3) & 0x7), result_a)?;
    ir.set_pred(Pred::new(insn & 0x7), result_b)
}

/// LOP: logic op bits 41..43, invert_a bit 39, invert_b bit 40.
pub(super) fn lop(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let op_a = ir.get_register(src_a_reg(insn))?;
    let op_a = if (insn >> 39) & 1 != 0 { ir.bitwise_not(op_a)? } else { op_a };
    let op_b = int_src_b(ir, insn, form)?;
    let op_b = if (insn >> 40) & 1 != 0 { ir.bitwise_not(op_b)? } else { op_b };
    let result = match (insn >> 41) & 0x3 {
        0 => ir.bitwise_and(op_a, op_b)?,
        1 => ir.bitwise_or(op_a, op_b)?,
        2 => ir.bitwise_xor(op_a, op_b)?,
        // PASS_B
        _ => op_b,
    };
    if (insn >> 47) & 1 != 0 {
        set_zero_sign_flags(ir, result)?;
    }
    ir.set_register(dest_reg(insn), result)
}

/// LOP32I: logic op bits 53..55.
pub(super) fn lop32i(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let op_a = ir.get_register(src_a_reg(insn))?;
    let op_b = ir.imm32(imm32(insn));
    let result = match (insn >> 53) & 0x3 {
        0 => ir.bitwise_and(op_a, op_b)?,
        1 => ir.bitwise_or(op_a, op_b)?,
        2 => ir.bitwise_xor(op_a, op_b)?,
        _ => op_b,
    };
    ir.set_register(dest_reg(insn), result)
}

pub(super) fn shl(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let base = ir.get_register(src_a_reg(insn))?;
    let shift = int_src_b(ir, insn, form)?;
    let result = ir.shift_left_logical(base, shift)?;
    ir.set_register(dest_reg(insn), result)
}

/// SHR: arithmetic when the signedness bit 48 is set.
pub(super) fn shr(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let base = ir.get_register(src_a_reg(insn))?;
    let shift = int_src_b(ir, insn, form)?;
    let result = if (insn >> 48) & 1 != 0 {
        ir.shift_right_arithmetic(base, shift)?
    } else {
        ir.shift_right_logical(base, shift)?
    };
    ir.set_register(dest_reg(insn), result)
}

/// BFE: the second operand packs the bit offset in its low byte and the
/// field width in the next one. Signedness bit 48.
pub(super) fn bfe(ir: &mut IrEmitter, insn: u64, form: SrcB) -> Result<()> {
    let is_signed = (insn >> 48) & 1 != 0;
    let base = ir.get_register(src_a_reg(insn))?;
    let packed = int_src_b(ir, insn, form)?;
    let eight = ir.imm32(8);
    let zero = ir.imm32(0);
    let offset = ir.bit_field_extract(packed, zero, eight, false)?;
    let count = {
        let shift = ir.imm32(8);
        ir.bit_field_extract(packed, shift, eight, false)?
    };
    let result = ir.bit_field_extract(base, offset, count, is_signed)?;
    if (insn >> 47) & 1 != 0 {
        set_zero_sign_flags(ir, result)?;
    }
    ir.set_register(dest_reg(insn), result)
}

/// BFI: insert `src_a` into the third operand under the packed
/// offset/count of the second.
pub(super) fn bfi(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let insert = ir.get_register(src_a_reg(insn))?;
    let packed = ir.get_register(src_b_reg(insn))?;
    let base = ir.get_register(src_c_reg(insn))?;
    let eight = ir.imm32(8);
    let zero = ir.imm32(0);
    let offset = ir.bit_field_extract(packed, zero, eight, false)?;
    let count = {
        let shift = ir.imm32(8);
        ir.bit_field_extract(packed, shift, eight, false)?
    };
    let result = ir.bit_field_insert(base, insert, offset, count)?;
    ir.set_register(dest_reg(insn), result)
}

pub(super) fn popc(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let value = ir.get_register(src_b_reg(insn))?;
    let value = if (insn >> 40) & 1 != 0 { ir.bitwise_not(value)? } else { value };
    let result = ir.bit_count(value)?;
    ir.set_register(dest_reg(insn), result)
}

/// FLO: find leading one; signedness bit 48.
pub(super) fn flo(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let is_signed = (insn >> 48) & 1 != 0;
    let value = ir.get_register(src_b_reg(insn))?;
    let result = ir.find_msb(value, is_signed)?;
    ir.set_register(dest_reg(insn), result)
}
