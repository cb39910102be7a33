//! Phi and structural instruction emission.

use crate::backend::glasm::emit_context::EmitContext;
use crate::backend::glasm::reg_alloc::{Id, Register, Value as GlasmValue};
use crate::error::Result;
use crate::ir::{InstId, Type, Value};

/// Allocates the phi's register on first sight, in the bank its type needs.
fn ensure_phi_definition(ctx: &mut EmitContext, phi: InstId) -> Result<Register> {
    let id = Id::from_raw(ctx.program.inst(phi).definition());
    if id.is_valid() || id.is_null() {
        return Ok(Register(GlasmValue {
            kind: crate::backend::glasm::reg_alloc::Kind::Register,
            id,
            imm_u32: 0,
            imm_u64: 0,
        }));
    }
    let ty = ctx.program.inst(phi).flags::<Type>();
    if ty == Type::U64 || ty == Type::F64 {
        ctx.long_define(phi)
    } else {
        ctx.define(phi)
    }
}

pub fn phi(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    // Operands are only consumed here; the moves happened at the
    // predecessors' ends
    for index in 0..ctx.program.inst(inst).num_args() {
        let arg = ctx.program.arg(inst, index);
        if !arg.is_immediate(ctx.program) {
            ctx.consume(arg)?;
        }
    }
    ensure_phi_definition(ctx, inst)?;
    Ok(())
}

pub fn phi_move(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let phi = match ctx.program.arg(inst, 0).resolve(ctx.program) {
        Value::Inst(phi) => phi,
        _ => return Ok(()),
    };
    let ret = ensure_phi_definition(ctx, phi)?;
    // This move's reference to the phi is spent here
    ctx.consume(ctx.program.arg(inst, 0))?;
    let value = ctx.consume_u32(ctx.program.arg(inst, 1))?;
    ctx.add(format!("MOV.U {}.x,{};", ret, value));
    Ok(())
}

/// The branch condition stays referenced by the block end; copy it into its
/// own register so consuming the source does not clobber it.
pub fn condition_ref(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    // The reference itself counts as one use beyond the argument slots
    ctx.program.inst_mut(inst).destructive_add_usage(1);
    let value = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.S {}.x,{};", ret, value));
    Ok(())
}
