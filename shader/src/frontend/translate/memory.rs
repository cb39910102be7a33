//! Global, local and shared memory translators.

use super::*;
use crate::error::Error;

/// Width selector shared by the memory opcodes, bits 48..51.
fn memory_size(insn: u64) -> Result<(u32, bool)> {
    Ok(match (insn >> 48) & 7 {
        0 => (8, false),
        1 => (8, true),
        2 => (16, false),
        3 => (16, true),
        4 => (32, false),
        5 => (64, false),
        6 => (128, false),
        other => {
            return Err(Error::not_implemented(format!("memory size {}", other)));
        }
    })
}

/// 24-bit signed byte offset of the global forms at bits 20..44.
fn global_offset(insn: u64) -> i32 {
    let raw = ((insn >> 20) & 0xff_ffff) as u32;
    // Sign extend from 24 bits
    ((raw << 8) as i32) >> 8
}

/// The 64-bit address lives in an aligned register pair.
fn global_address(ir: &mut IrEmitter, insn: u64) -> Result<Value> {
    let addr_reg = src_a_reg(insn);
    if !addr_reg.is_aligned(2) {
        return Err(Error::not_implemented("unaligned global memory address register"));
    }
    let low = ir.get_register(addr_reg)?;
    let high = ir.get_register(addr_reg.offset(1)?)?;
    let vector = ir.composite_construct_u32x2(low, high)?;
    let packed = ir.pack_uint2x32(vector)?;
    let offset = ir.imm64(global_offset(insn) as i64 as u64);
    ir.inst(crate::ir::Opcode::IAdd64, &[packed, offset])
}

fn write_wide_result(ir: &mut IrEmitter, dest: Reg, value: Value, size: u32) -> Result<()> {
    match size {
        8 | 16 | 32 => ir.set_register(dest, value),
        64 => {
            for i in 0..2 {
                let element = ir.composite_extract(value, i)?;
                ir.set_register(dest.offset(i as i32)?, element)?;
            }
            Ok(())
        }
        128 => {
            for i in 0..4 {
                let element = ir.composite_extract(value, i)?;
                ir.set_register(dest.offset(i as i32)?, element)?;
            }
            Ok(())
        }
        _ => Err(Error::logic("invalid wide result size")),
    }
}

fn read_wide_source(ir: &mut IrEmitter, src: Reg, size: u32) -> Result<Value> {
    match size {
        8 | 16 | 32 => ir.get_register(src),
        64 => {
            let e0 = ir.get_register(src)?;
            let e1 = ir.get_register(src.offset(1)?)?;
            ir.composite_construct_u32x2(e0, e1)
        }
        128 => {
            let e0 = ir.get_register(src)?;
            let e1 = ir.get_register(src.offset(1)?)?;
            let e2 = ir.get_register(src.offset(2)?)?;
            let e3 = ir.get_register(src.offset(3)?)?;
            ir.inst(crate::ir::Opcode::CompositeConstructU32x4, &[e0, e1, e2, e3])
        }
        _ => Err(Error::logic("invalid wide source size")),
    }
}

pub(super) fn ldg(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let (size, is_signed) = memory_size(insn)?;
    let address = global_address(ir, insn)?;
    let value = ir.load_global(address, size, is_signed)?;
    write_wide_result(ir, dest_reg(insn), value, size)
}

pub(super) fn stg(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let (size, is_signed) = memory_size(insn)?;
    let address = global_address(ir, insn)?;
    let value = read_wide_source(ir, dest_reg(insn), size)?;
    ir.write_global(address, value, size, is_signed)
}

/// Local memory byte offset: register plus a 24-bit immediate.
fn local_offset(ir: &mut IrEmitter, insn: u64) -> Result<Value> {
    let base = ir.get_register(src_a_reg(insn))?;
    let imm = ir.imm32(((insn >> 20) & 0xff_ffff) as u32);
    ir.iadd(base, imm)
}

pub(super) fn ldl(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let (size, _) = memory_size(insn)?;
    if size != 32 {
        return Err(Error::not_implemented(format!("{}-bit local load", size)));
    }
    let offset = local_offset(ir, insn)?;
    let two = ir.imm32(2);
    let word_offset = ir.shift_right_logical(offset, two)?;
    let value = ir.load_local(word_offset)?;
    ir.set_register(dest_reg(insn), value)
}

pub(super) fn stl(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let (size, _) = memory_size(insn)?;
    if size != 32 {
        return Err(Error::not_implemented(format!("{}-bit local store", size)));
    }
    let offset = local_offset(ir, insn)?;
    let two = ir.imm32(2);
    let word_offset = ir.shift_right_logical(offset, two)?;
    let value = ir.get_register(dest_reg(insn))?;
    ir.write_local(word_offset, value)
}

pub(super) fn lds(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let (size, is_signed) = memory_size(insn)?;
    let offset = local_offset(ir, insn)?;
    let value = ir.load_shared(offset, size, is_signed)?;
    write_wide_result(ir, dest_reg(insn), value, size)
}

pub(super) fn sts(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let (size, _) = memory_size(insn)?;
    let offset = local_offset(ir, insn)?;
    let value = read_wide_source(ir, dest_reg(insn), size)?;
    ir.write_shared(offset, value, size)
}
