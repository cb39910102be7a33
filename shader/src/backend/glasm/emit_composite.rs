//! Vector composites, packing and register-aliasing bit casts.

use crate::backend::glasm::emit_context::EmitContext;
use crate::backend::glasm::reg_alloc;
use crate::error::{Error, Result};
use crate::ir::{InstId, Value};

const ELEMENTS: [&str; 4] = ["x", "y", "z", "w"];

pub fn construct(ctx: &mut EmitContext, inst: InstId, count: usize) -> Result<()> {
    let mut operands = Vec::with_capacity(count);
    for index in 0..count {
        operands.push(ctx.consume_u32(ctx.program.arg(inst, index))?);
    }
    let ret = ctx.define(inst)?;
    for (index, operand) in operands.iter().enumerate() {
        ctx.add(format!("MOV.U {}.{},{};", ret, ELEMENTS[index], operand));
    }
    Ok(())
}

pub fn extract(ctx: &mut EmitContext, inst: InstId, ty: &str) -> Result<()> {
    let element = ctx.program.arg(inst, 1).u32(ctx.program)? as usize;
    if element >= ELEMENTS.len() {
        return Err(Error::invalid_argument("composite element out of range"));
    }
    let vector = ctx.consume_register(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.{} {}.x,{}.{};", ty, ret, vector, ELEMENTS[element]));
    Ok(())
}

pub fn insert(ctx: &mut EmitContext, inst: InstId, ty: &str) -> Result<()> {
    let element = ctx.program.arg(inst, 2).u32(ctx.program)? as usize;
    if element >= ELEMENTS.len() {
        return Err(Error::invalid_argument("composite element out of range"));
    }
    let vector = ctx.consume_register(ctx.program.arg(inst, 0))?;
    let value = ctx.consume_u32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.{} {},{};", ty, ret, vector));
    ctx.add(format!("MOV.{} {}.{},{};", ty, ret, ELEMENTS[element], value));
    Ok(())
}

/// Bit casts do not move data; they forward the source register through
/// the alias chain.
pub fn alias(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.program.arg(inst, 0).resolve(ctx.program);
    match value {
        Value::Inst(_) => {
            // The source takes over the alias's remaining uses so the shared
            // register is released when the last reader dies
            let source = reg_alloc::alias_inst(ctx.program, inst);
            let alias_uses = ctx.program.inst(inst).use_count();
            ctx.program.inst_mut(source).destructive_add_usage(alias_uses);
            ctx.program.inst_mut(source).destructive_remove_usage();
            let definition = ctx.program.inst(source).definition();
            ctx.program.inst_mut(inst).set_definition(definition);
            Ok(())
        }
        imm => {
            // Immediates materialize into a fresh register
            let operand = ctx.consume_u32(imm)?;
            let ret = ctx.define(inst)?;
            ctx.add(format!("MOV.U {}.x,{};", ret, operand));
            Ok(())
        }
    }
}

pub fn pack_uint_2x32(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let vector = ctx.consume_register(ctx.program.arg(inst, 0))?;
    let ret = ctx.long_define(inst)?;
    ctx.add(format!("PK64.U {}.x,{};", ret, vector));
    Ok(())
}

pub fn unpack_uint_2x32(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_register(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("UP64.U {}.xy,{}.x;", ret, value));
    Ok(())
}

pub fn pack_half_2x16(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let vector = ctx.consume_register(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("PK2H.F {}.x,{};", ret, vector));
    Ok(())
}

pub fn unpack_half_2x16(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_u32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("UP2H.F {}.xy,{};", ret, value));
    Ok(())
}
