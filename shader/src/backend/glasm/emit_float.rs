//! Floating-point and conversion emission.

use crate::backend::glasm::emit_context::EmitContext;
use crate::error::Result;
use crate::ir::{FpControl, FpRounding, InstId};

fn precise(ctx: &EmitContext, inst: InstId) -> &'static str {
    if ctx.program.inst(inst).flags::<FpControl>().no_contraction {
        ".PREC"
    } else {
        ""
    }
}

fn fp_rounding(rounding: FpRounding) -> &'static str {
    match rounding {
        FpRounding::DontCare => "",
        FpRounding::RN => ".ROUND",
        FpRounding::RZ => ".TRUNC",
        FpRounding::RM => ".FLR",
        FpRounding::RP => ".CEIL",
    }
}

pub fn fp_abs(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.F {}.x,|{}|;", ret, value));
    Ok(())
}

pub fn fp_neg(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.F {}.x,-{};", ret, value));
    Ok(())
}

pub fn fp_add(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let a = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let b = ctx.consume_f32(ctx.program.arg(inst, 1))?;
    let prec = precise(ctx, inst);
    let ret = ctx.define(inst)?;
    ctx.add(format!("ADD.F{} {}.x,{},{};", prec, ret, a, b));
    Ok(())
}

pub fn fp_mul(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let a = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let b = ctx.consume_f32(ctx.program.arg(inst, 1))?;
    let prec = precise(ctx, inst);
    let ret = ctx.define(inst)?;
    ctx.add(format!("MUL.F{} {}.x,{},{};", prec, ret, a, b));
    Ok(())
}

pub fn fp_fma(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let a = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let b = ctx.consume_f32(ctx.program.arg(inst, 1))?;
    let c = ctx.consume_f32(ctx.program.arg(inst, 2))?;
    let prec = precise(ctx, inst);
    let ret = ctx.define(inst)?;
    ctx.add(format!("MAD.F{} {}.x,{},{},{};", prec, ret, a, b, c));
    Ok(())
}

pub fn fp_min(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let a = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let b = ctx.consume_f32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MIN.F {}.x,{},{};", ret, a, b));
    Ok(())
}

pub fn fp_max(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let a = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let b = ctx.consume_f32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MAX.F {}.x,{},{};", ret, a, b));
    Ok(())
}

pub fn fp_unary(ctx: &mut EmitContext, inst: InstId, op: &str) -> Result<()> {
    let value = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("{} {}.x,{};", op, ret, value));
    Ok(())
}

pub fn fp_sqrt(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("RSQ.F RC.x,{};RCP.F {}.x,RC.x;", value, ret));
    Ok(())
}

pub fn fp_saturate(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.F.SAT {}.x,{};", ret, value));
    Ok(())
}

pub fn fp_clamp(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let min_value = ctx.consume_f32(ctx.program.arg(inst, 1))?;
    let max_value = ctx.consume_f32(ctx.program.arg(inst, 2))?;
    let ret = ctx.define(inst)?;
    // MAX first so NaN clamps to the minimum
    ctx.add(format!(
        "MAX.F RC.x,{},{};MIN.F {}.x,RC.x,{};",
        min_value, value, ret, max_value
    ));
    Ok(())
}

/// Ordered compares must reject NaN operands; unordered must accept them.
/// Ordered inequality additionally needs the self-equality probes.
pub fn fp_compare(
    ctx: &mut EmitContext,
    inst: InstId,
    op: &str,
    ordered: bool,
    inequality: bool,
) -> Result<()> {
    let lhs = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let rhs = ctx.consume_f32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("{}.F RC.x,{},{};", op, lhs, rhs));
    if ordered && inequality {
        ctx.add(format!(
            "SEQ.F RC.y,{},{};SEQ.F RC.z,{},{};AND.U RC.x,RC.x,RC.y;AND.U RC.x,RC.x,RC.z;SNE.S {}.x,RC.x,0;",
            lhs, lhs, rhs, rhs, ret
        ));
    } else if ordered {
        ctx.add(format!("SNE.S {}.x,RC.x,0;", ret));
    } else {
        ctx.add(format!(
            "SNE.F RC.y,{},{};SNE.F RC.z,{},{};OR.U RC.x,RC.x,RC.y;OR.U RC.x,RC.x,RC.z;SNE.S {}.x,RC.x,0;",
            lhs, lhs, rhs, rhs, ret
        ));
    }
    Ok(())
}

pub fn fp_is_nan(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("SNE.F RC.x,{},{};SNE.S {}.x,RC.x,0;", value, value, ret));
    Ok(())
}

/// CVT with the rounding suffix taken from the instruction's flag word.
pub fn convert(
    ctx: &mut EmitContext,
    inst: InstId,
    dest: &str,
    src: &str,
    is_long_result: bool,
) -> Result<()> {
    let rounding = fp_rounding(ctx.program.inst(inst).flags::<FpControl>().rounding);
    let value = match src {
        "F64" | "U64" | "S64" => {
            let operand = ctx.consume_f64(ctx.program.arg(inst, 0))?;
            format!("{}", operand)
        }
        "F32" => {
            let operand = ctx.consume_f32(ctx.program.arg(inst, 0))?;
            format!("{}", operand)
        }
        _ => {
            let operand = ctx.consume_s32(ctx.program.arg(inst, 0))?;
            format!("{}", operand)
        }
    };
    let ret = if is_long_result { ctx.long_define(inst)? } else { ctx.define(inst)? };
    ctx.add(format!("CVT.{}.{}{} {}.x,{};", dest, src, rounding, ret, value));
    Ok(())
}
