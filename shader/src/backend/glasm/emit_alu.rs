//! Integer, logical and select emission.

use crate::backend::glasm::emit_context::EmitContext;
use crate::error::Result;
use crate::ir::{InstId, Opcode};

pub fn iadd32(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let flags = [
        ctx.program.associated_pseudo_operation(inst, Opcode::GetZeroFromOp),
        ctx.program.associated_pseudo_operation(inst, Opcode::GetSignFromOp),
        ctx.program.associated_pseudo_operation(inst, Opcode::GetCarryFromOp),
        ctx.program.associated_pseudo_operation(inst, Opcode::GetOverflowFromOp),
    ];
    for flag_inst in flags.iter().flatten() {
        ctx.program.invalidate(*flag_inst)?;
    }
    let cc = flags.iter().any(Option::is_some);
    if cc {
        ctx.reg_alloc.invalidate_condition_codes();
    }
    let a = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let b = ctx.consume_s32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    let cc_mod = if cc { ".CC" } else { "" };
    ctx.add(format!("ADD.S{} {}.x,{},{};", cc_mod, ret, a, b));
    if !cc {
        return Ok(());
    }
    const MASKS: [&str; 4] = ["", "SF", "CF", "OF"];
    for (flag_index, flag) in flags.iter().enumerate() {
        let flag_inst = match flag {
            Some(flag_inst) => *flag_inst,
            None => continue,
        };
        let flag_ret = ctx.define(flag_inst)?;
        if flag_index == 0 {
            ctx.add(format!("SEQ.S {}.x,{}.x,0;", flag_ret, ret));
        } else {
            // Conditional execution on the flag is broken on some drivers;
            // branch instead
            ctx.add(format!(
                "IF {}.x;MOV.S {}.x,-1;ELSE;MOV.S {}.x,0;ENDIF;",
                MASKS[flag_index], flag_ret, flag_ret
            ));
        }
    }
    Ok(())
}

pub fn ineg32(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.S {}.x,-{};", ret, value));
    Ok(())
}

pub fn binary_s32(ctx: &mut EmitContext, inst: InstId, op: &str) -> Result<()> {
    let a = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let b = ctx.consume_s32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("{} {}.x,{},{};", op, ret, a, b));
    Ok(())
}

pub fn binary_u32(ctx: &mut EmitContext, inst: InstId, op: &str) -> Result<()> {
    let a = ctx.consume_u32(ctx.program.arg(inst, 0))?;
    let b = ctx.consume_u32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("{} {}.x,{},{};", op, ret, a, b));
    Ok(())
}

pub fn unary_s32(ctx: &mut EmitContext, inst: InstId, op: &str) -> Result<()> {
    let value = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("{} {}.x,{};", op, ret, value));
    Ok(())
}

pub fn unary_u32(ctx: &mut EmitContext, inst: InstId, op: &str) -> Result<()> {
    let value = ctx.consume_u32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("{} {}.x,{};", op, ret, value));
    Ok(())
}

/// Bitwise operations also feed the zero/sign pseudo consumers when a CC
/// write survived to the back-end.
pub fn bitwise(ctx: &mut EmitContext, inst: InstId, lop: &str) -> Result<()> {
    let zero = ctx.program.associated_pseudo_operation(inst, Opcode::GetZeroFromOp);
    let sign = ctx.program.associated_pseudo_operation(inst, Opcode::GetSignFromOp);
    for flag_inst in [zero, sign].iter().flatten() {
        ctx.program.invalidate(*flag_inst)?;
    }
    if zero.is_some() || sign.is_some() {
        ctx.reg_alloc.invalidate_condition_codes();
    }
    let a = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let b = ctx.consume_s32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("{}.S {}.x,{},{};", lop, ret, a, b));
    if let Some(zero_inst) = zero {
        let zero_ret = ctx.define(zero_inst)?;
        ctx.add(format!("SEQ.S {},{},0;", zero_ret, ret));
    }
    if let Some(sign_inst) = sign {
        let sign_ret = ctx.define(sign_inst)?;
        ctx.add(format!("SLT.S {},{},0;", sign_ret, ret));
    }
    Ok(())
}

/// BFE packs the count and offset into the `{count, offset, 0, 0}` vector
/// operand form when both are immediate.
pub fn bit_field_extract(ctx: &mut EmitContext, inst: InstId, op: &str) -> Result<()> {
    let base = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let offset = ctx.program.arg(inst, 1).resolve(ctx.program);
    let count = ctx.program.arg(inst, 2).resolve(ctx.program);
    let imm_offset = offset.u32(ctx.program).ok();
    let imm_count = count.u32(ctx.program).ok();
    if let (Some(imm_offset), Some(imm_count)) = (imm_offset, imm_count) {
        let ret = ctx.define(inst)?;
        ctx.add(format!("{} {},{{{},{},0,0}},{};", op, ret, imm_count, imm_offset, base));
        return Ok(());
    }
    let offset = ctx.consume_s32(offset)?;
    let count = ctx.consume_s32(count)?;
    let ret = ctx.define(inst)?;
    ctx.add(format!(
        "MOV.S RC.x,{};MOV.S RC.y,{};{} {},RC,{};",
        count, offset, op, ret, base
    ));
    Ok(())
}

pub fn bit_field_insert(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let base = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let insert = ctx.consume_s32(ctx.program.arg(inst, 1))?;
    let offset = ctx.program.arg(inst, 2).resolve(ctx.program);
    let count = ctx.program.arg(inst, 3).resolve(ctx.program);
    let imm_offset = offset.u32(ctx.program).ok();
    let imm_count = count.u32(ctx.program).ok();
    if let (Some(imm_offset), Some(imm_count)) = (imm_offset, imm_count) {
        let ret = ctx.define(inst)?;
        ctx.add(format!(
            "BFI.S {},{{{},{},0,0}},{},{};",
            ret, imm_count, imm_offset, insert, base
        ));
        return Ok(());
    }
    let offset = ctx.consume_s32(offset)?;
    let count = ctx.consume_s32(count)?;
    let ret = ctx.define(inst)?;
    ctx.add(format!(
        "MOV.S RC.x,{};MOV.S RC.y,{};BFI.S {},RC,{},{};",
        count, offset, ret, insert, base
    ));
    Ok(())
}

pub fn clamp_s32(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let min = ctx.consume_s32(ctx.program.arg(inst, 1))?;
    let max = ctx.consume_s32(ctx.program.arg(inst, 2))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MAX.S RC.x,{},{};MIN.S {}.x,RC.x,{};", min, value, ret, max));
    Ok(())
}

pub fn clamp_u32(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_u32(ctx.program.arg(inst, 0))?;
    let min = ctx.consume_u32(ctx.program.arg(inst, 1))?;
    let max = ctx.consume_u32(ctx.program.arg(inst, 2))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MAX.U RC.x,{},{};MIN.U {}.x,RC.x,{};", min, value, ret, max));
    Ok(())
}

/// Comparisons produce the canonical -1/0 mask.
pub fn compare(ctx: &mut EmitContext, inst: InstId, op: &str) -> Result<()> {
    let a = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let b = ctx.consume_s32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("{} {}.x,{},{};", op, ret, a, b));
    Ok(())
}

pub fn logical(ctx: &mut EmitContext, inst: InstId, op: &str) -> Result<()> {
    let a = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let b = ctx.consume_s32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("{} {}.x,{},{};", op, ret, a, b));
    Ok(())
}

pub fn logical_not(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("SEQ.S {}.x,{},0;", ret, value));
    Ok(())
}

pub fn select(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let cond = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let true_value = ctx.consume_s32(ctx.program.arg(inst, 1))?;
    let false_value = ctx.consume_s32(ctx.program.arg(inst, 2))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!(
        "MOV.S.CC RC.x,{};MOV.U {}.x,{};MOV.U {}.x (NE.x),{};",
        cond, ret, false_value, ret, true_value
    ));
    Ok(())
}
