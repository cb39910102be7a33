//! Constant propagation and folding.
//!
//! Folds operations whose operands resolved to immediates and strips a few
//! algebraic identities. Unrecognized patterns are left untouched; folding
//! never guesses.

use crate::error::Result;
use crate::ir::{InstId, Opcode, Program, Value};

fn imm_u32(program: &Program, inst: InstId, index: usize) -> Option<u32> {
    match program.arg(inst, index).resolve(program) {
        Value::U32(value) => Some(value),
        _ => None,
    }
}

fn imm_u1(program: &Program, inst: InstId, index: usize) -> Option<bool> {
    match program.arg(inst, index).resolve(program) {
        Value::U1(value) => Some(value),
        _ => None,
    }
}

fn imm_f32(program: &Program, inst: InstId, index: usize) -> Option<f32> {
    match program.arg(inst, index).resolve(program) {
        Value::F32(value) => Some(value.0),
        _ => None,
    }
}

fn fold_binary_u32(
    program: &mut Program,
    inst: InstId,
    fold: impl Fn(u32, u32) -> u32,
) -> Result<bool> {
    if let (Some(a), Some(b)) = (imm_u32(program, inst, 0), imm_u32(program, inst, 1)) {
        program.replace_uses_with(inst, Value::U32(fold(a, b)))?;
        return Ok(true);
    }
    Ok(false)
}

fn fold_binary_u1(
    program: &mut Program,
    inst: InstId,
    fold: impl Fn(bool, bool) -> bool,
) -> Result<bool> {
    if let (Some(a), Some(b)) = (imm_u1(program, inst, 0), imm_u1(program, inst, 1)) {
        program.replace_uses_with(inst, Value::U1(fold(a, b)))?;
        return Ok(true);
    }
    Ok(false)
}

fn fold_binary_f32(
    program: &mut Program,
    inst: InstId,
    fold: impl Fn(f32, f32) -> f32,
) -> Result<bool> {
    if let (Some(a), Some(b)) = (imm_f32(program, inst, 0), imm_f32(program, inst, 1)) {
        program.replace_uses_with(inst, Value::imm_f32(fold(a, b)))?;
        return Ok(true);
    }
    Ok(false)
}

/// Extracting from a composite the pass can see through goes straight to
/// the constructed element.
fn fold_composite_extract(program: &mut Program, inst: InstId) -> Result<bool> {
    let vector = program.arg(inst, 0).resolve(program);
    let element = match imm_u32(program, inst, 1) {
        Some(element) => element as usize,
        None => return Ok(false),
    };
    let producer = match vector.inst() {
        Some(producer) => producer,
        None => return Ok(false),
    };
    let construct = match program.inst(producer).opcode() {
        Opcode::CompositeConstructU32x2
        | Opcode::CompositeConstructU32x3
        | Opcode::CompositeConstructU32x4
        | Opcode::CompositeConstructF16x2
        | Opcode::CompositeConstructF16x3
        | Opcode::CompositeConstructF16x4
        | Opcode::CompositeConstructF32x2
        | Opcode::CompositeConstructF32x3
        | Opcode::CompositeConstructF32x4
        | Opcode::CompositeConstructF64x2
        | Opcode::CompositeConstructF64x3
        | Opcode::CompositeConstructF64x4 => producer,
        _ => return Ok(false),
    };
    if element >= program.inst(construct).num_args() {
        return Ok(false);
    }
    let value = program.arg(construct, element);
    program.replace_uses_with(inst, value)?;
    Ok(true)
}

fn fold_inst(program: &mut Program, inst: InstId) -> Result<()> {
    if program.inst(inst).has_associated_pseudo_operation() {
        // Folding would orphan the flag consumers
        return Ok(());
    }
    let opcode = program.inst(inst).opcode();
    match opcode {
        Opcode::IAdd32 => {
            if !fold_binary_u32(program, inst, |a, b| a.wrapping_add(b))? {
                // x + 0 and 0 + x forward the other operand
                for (imm_index, fwd_index) in [(1usize, 0usize), (0, 1)].iter() {
                    if imm_u32(program, inst, *imm_index) == Some(0) {
                        let other = program.arg(inst, *fwd_index);
                        program.replace_uses_with(inst, other)?;
                        break;
                    }
                }
            }
        }
        Opcode::ISub32 => {
            fold_binary_u32(program, inst, |a, b| a.wrapping_sub(b))?;
        }
        Opcode::IMul32 => {
            fold_binary_u32(program, inst, |a, b| a.wrapping_mul(b))?;
        }
        Opcode::ShiftLeftLogical32 => {
            fold_binary_u32(program, inst, |a, b| a.wrapping_shl(b))?;
        }
        Opcode::ShiftRightLogical32 => {
            fold_binary_u32(program, inst, |a, b| a.wrapping_shr(b))?;
        }
        Opcode::ShiftRightArithmetic32 => {
            fold_binary_u32(program, inst, |a, b| ((a as i32).wrapping_shr(b)) as u32)?;
        }
        Opcode::BitwiseAnd32 => {
            fold_binary_u32(program, inst, |a, b| a & b)?;
        }
        Opcode::BitwiseOr32 => {
            fold_binary_u32(program, inst, |a, b| a | b)?;
        }
        Opcode::BitwiseXor32 => {
            fold_binary_u32(program, inst, |a, b| a ^ b)?;
        }
        Opcode::BitFieldUExtract => {
            if let (Some(base), Some(shift), Some(count)) = (
                imm_u32(program, inst, 0),
                imm_u32(program, inst, 1),
                imm_u32(program, inst, 2),
            ) {
                if shift < 32 {
                    let mask = if count >= 32 { u32::max_value() } else { (1u32 << count) - 1 };
                    program.replace_uses_with(inst, Value::U32((base >> shift) & mask))?;
                }
            }
        }
        Opcode::BitFieldSExtract => {
            if let (Some(base), Some(shift), Some(count)) = (
                imm_u32(program, inst, 0),
                imm_u32(program, inst, 1),
                imm_u32(program, inst, 2),
            ) {
                if count > 0 && shift + count <= 32 {
                    let left = 32 - (shift + count);
                    let value = (((base << left) as i32) >> (left + shift)) as u32;
                    program.replace_uses_with(inst, Value::U32(value))?;
                }
            }
        }
        Opcode::BitCastU32F32 => {
            if let Some(value) = imm_f32(program, inst, 0) {
                program.replace_uses_with(inst, Value::U32(value.to_bits()))?;
            }
        }
        Opcode::BitCastF32U32 => {
            if let Some(value) = imm_u32(program, inst, 0) {
                program.replace_uses_with(inst, Value::imm_f32(f32::from_bits(value)))?;
            }
        }
        Opcode::LogicalAnd => {
            fold_binary_u1(program, inst, |a, b| a && b)?;
        }
        Opcode::LogicalOr => {
            fold_binary_u1(program, inst, |a, b| a || b)?;
        }
        Opcode::LogicalXor => {
            fold_binary_u1(program, inst, |a, b| a != b)?;
        }
        Opcode::LogicalNot => {
            if let Some(value) = imm_u1(program, inst, 0) {
                program.replace_uses_with(inst, Value::U1(!value))?;
            }
        }
        Opcode::FPAdd32 => {
            fold_binary_f32(program, inst, |a, b| a + b)?;
        }
        Opcode::FPMul32 => {
            fold_binary_f32(program, inst, |a, b| a * b)?;
        }
        Opcode::SelectU1
        | Opcode::SelectU8
        | Opcode::SelectU16
        | Opcode::SelectU32
        | Opcode::SelectU64
        | Opcode::SelectF16
        | Opcode::SelectF32
        | Opcode::SelectF64 => {
            if let Some(cond) = imm_u1(program, inst, 0) {
                let taken = program.arg(inst, if cond { 1 } else { 2 });
                program.replace_uses_with(inst, taken)?;
            }
        }
        Opcode::CompositeExtractU32x2
        | Opcode::CompositeExtractU32x3
        | Opcode::CompositeExtractU32x4
        | Opcode::CompositeExtractF16x2
        | Opcode::CompositeExtractF16x3
        | Opcode::CompositeExtractF16x4
        | Opcode::CompositeExtractF32x2
        | Opcode::CompositeExtractF32x3
        | Opcode::CompositeExtractF32x4
        | Opcode::CompositeExtractF64x2
        | Opcode::CompositeExtractF64x3
        | Opcode::CompositeExtractF64x4 => {
            fold_composite_extract(program, inst)?;
        }
        _ => {}
    }
    Ok(())
}

pub fn constant_propagation_pass(program: &mut Program) -> Result<()> {
    let order: Vec<_> = program.rpo().collect();
    for block in order {
        let insts = program.block(block).instructions().to_vec();
        for inst in insts {
            fold_inst(program, inst)?;
        }
    }
    Ok(())
}
