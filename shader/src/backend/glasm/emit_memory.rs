//! Local, shared and storage buffer access emission.

use crate::backend::glasm::emit_context::EmitContext;
use crate::error::Result;
use crate::ir::InstId;

pub fn load_local(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let word_offset = ctx.consume_u32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.U {}.x,lmem[{}].x;", ret, word_offset));
    Ok(())
}

pub fn write_local(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let word_offset = ctx.consume_u32(ctx.program.arg(inst, 0))?;
    let value = ctx.consume_u32(ctx.program.arg(inst, 1))?;
    ctx.add(format!("MOV.U lmem[{}].x,{};", word_offset, value));
    Ok(())
}

pub fn load_storage(ctx: &mut EmitContext, inst: InstId, size: &str) -> Result<()> {
    let binding = ctx.program.arg(inst, 0).u32(ctx.program)?;
    let offset = ctx.consume_u32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("LDB.{} {}.x,ssbo{}[{}];", size, ret, binding, offset));
    Ok(())
}

/// 64/128-bit loads fill several components of the destination register.
pub fn load_storage_wide(ctx: &mut EmitContext, inst: InstId, size: &str) -> Result<()> {
    let binding = ctx.program.arg(inst, 0).u32(ctx.program)?;
    let offset = ctx.consume_u32(ctx.program.arg(inst, 1))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("LDB.{} {},ssbo{}[{}];", size, ret, binding, offset));
    Ok(())
}

pub fn write_storage(ctx: &mut EmitContext, inst: InstId, size: &str) -> Result<()> {
    let binding = ctx.program.arg(inst, 0).u32(ctx.program)?;
    let offset = ctx.consume_u32(ctx.program.arg(inst, 1))?;
    let value = ctx.consume_register(ctx.program.arg(inst, 2))?;
    ctx.add(format!("STB.{} {},ssbo{}[{}];", size, value, binding, offset));
    Ok(())
}

pub fn load_shared(ctx: &mut EmitContext, inst: InstId, size: &str) -> Result<()> {
    let offset = ctx.consume_u32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("LDS.{} {}.x,shared_mem[{}];", size, ret, offset));
    Ok(())
}

pub fn write_shared(ctx: &mut EmitContext, inst: InstId, size: &str) -> Result<()> {
    let offset = ctx.consume_u32(ctx.program.arg(inst, 0))?;
    let value = ctx.consume_u32(ctx.program.arg(inst, 1))?;
    ctx.add(format!("STS.{} {},shared_mem[{}];", size, value, offset));
    Ok(())
}
