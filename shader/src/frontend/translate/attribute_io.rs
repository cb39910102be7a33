//! Attribute load/store and interpolation translators.

use super::*;
use crate::ir::Attribute;

/// Attribute word index, bits 20..30.
fn attribute_word(insn: u64) -> u32 {
    ((insn >> 20) & 0x3ff) as u32
}

/// Consecutive component count: bits 47..49 encode 1, 2, 3 or 4.
fn element_count(insn: u64) -> u32 {
    ((insn >> 47) & 0x3) as u32 + 1
}

/// Physical (runtime-indexed) addressing flag, bit 31.
fn is_physical(insn: u64) -> bool {
    (insn >> 31) & 1 != 0
}

pub(super) fn ald(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let dest = dest_reg(insn);
    let vertex = ir.imm32(0);
    if is_physical(insn) {
        let address = ir.get_register(src_a_reg(insn))?;
        let value = ir.get_attribute_indexed(address, vertex)?;
        let raw = ir.bitcast_f32_u32(value)?;
        return ir.set_register(dest, raw);
    }
    let base = attribute_word(insn);
    for element in 0..element_count(insn) {
        let attribute = Attribute::new(base + element);
        let value = ir.get_attribute(attribute, vertex)?;
        let raw = ir.bitcast_f32_u32(value)?;
        ir.set_register(dest.offset(element as i32)?, raw)?;
    }
    Ok(())
}

pub(super) fn ast(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let src = dest_reg(insn);
    let vertex = ir.imm32(0);
    if is_physical(insn) {
        let address = ir.get_register(src_a_reg(insn))?;
        let raw = ir.get_register(src)?;
        let value = ir.bitcast_u32_f32(raw)?;
        return ir.set_attribute_indexed(address, value, vertex);
    }
    let base = attribute_word(insn);
    for element in 0..element_count(insn) {
        let attribute = Attribute::new(base + element);
        let raw = ir.get_register(src.offset(element as i32)?)?;
        let value = ir.bitcast_u32_f32(raw)?;
        ir.set_attribute(attribute, value, vertex)?;
    }
    Ok(())
}

/// IPA: fragment input interpolation. Attribute word at bits 30..38;
/// multiplication by the interpolation weight is the hardware's business,
/// the host interpolates for us.
pub(super) fn ipa(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let word = ((insn >> 30) & 0xff) as u32;
    let attribute = Attribute::new(word);
    let vertex = ir.imm32(0);
    let value = ir.get_attribute(attribute, vertex)?;
    let value = apply_saturate(ir, value, (insn >> 51) & 1 != 0)?;
    set_float_dest(ir, dest_reg(insn), value)
}
