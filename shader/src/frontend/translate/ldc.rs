//! LDC: load from constant buffer.

use super::*;
use crate::error::Error;

/// Addressing modes of the slot computation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Mode {
    Default,
    Il,
    Is,
    Isl,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Size {
    U8,
    S8,
    U16,
    S16,
    B32,
    B64,
}

/// Encoding: dest 0..8, src reg 8..16, signed offset 20..36, cbuf index
/// 36..41, mode 44..46, size 48..51.
struct Encoding {
    dest: Reg,
    src: Reg,
    offset: i32,
    index: u32,
    mode: Mode,
    size: Size,
}

fn unpack(insn: u64) -> Result<Encoding> {
    let mode = match (insn >> 44) & 3 {
        0 => Mode::Default,
        1 => Mode::Il,
        2 => Mode::Is,
        _ => Mode::Isl,
    };
    let size = match (insn >> 48) & 7 {
        0 => Size::U8,
        1 => Size::S8,
        2 => Size::U16,
        3 => Size::S16,
        4 => Size::B32,
        5 => Size::B64,
        other => {
            return Err(Error::not_implemented(format!("invalid LDC size {}", other)));
        }
    };
    let raw_offset = ((insn >> 20) & 0xffff) as u16;
    Ok(Encoding {
        dest: dest_reg(insn),
        src: src_a_reg(insn),
        offset: i32::from(raw_offset as i16),
        index: ((insn >> 36) & 0x1f) as u32,
        mode,
        size,
    })
}

/// In `Default` mode the slot is `imm_index` and the byte offset is
/// `reg + imm`. Other modes index the constant buffer indirectly and are
/// not implemented.
fn slot(
    ir: &mut IrEmitter,
    mode: Mode,
    imm_index: Value,
    reg: Value,
    imm: Value,
) -> Result<(Value, Value)> {
    match mode {
        Mode::Default => {
            let offset = ir.iadd(reg, imm)?;
            Ok((imm_index, offset))
        }
        other => Err(Error::not_implemented(format!("LDC mode {:?}", other))),
    }
}

pub(super) fn ldc(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let ldc = unpack(insn)?;
    let imm_index = ir.imm32(ldc.index);
    let reg = ir.get_register(ldc.src)?;
    let imm = ir.imm32s(ldc.offset);
    let (index, offset) = slot(ir, ldc.mode, imm_index, reg, imm)?;
    match ldc.size {
        Size::U8 => {
            let value = ir.get_cbuf(index, offset, 8, false)?;
            ir.set_register(ldc.dest, value)
        }
        Size::S8 => {
            let value = ir.get_cbuf(index, offset, 8, true)?;
            ir.set_register(ldc.dest, value)
        }
        Size::U16 => {
            let value = ir.get_cbuf(index, offset, 16, false)?;
            ir.set_register(ldc.dest, value)
        }
        Size::S16 => {
            let value = ir.get_cbuf(index, offset, 16, true)?;
            ir.set_register(ldc.dest, value)
        }
        Size::B32 => {
            let value = ir.get_cbuf(index, offset, 32, false)?;
            ir.set_register(ldc.dest, value)
        }
        Size::B64 => {
            if !ldc.dest.is_aligned(2) {
                return Err(Error::not_implemented("unaligned LDC destination register"));
            }
            let vector = ir.get_cbuf(index, offset, 64, false)?;
            for i in 0..2 {
                let element = ir.composite_extract(vector, i)?;
                ir.set_register(ldc.dest.offset(i as i32)?, element)?;
            }
            Ok(())
        }
    }
}
