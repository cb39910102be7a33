//! Context getters/setters: constant buffers, attributes, fragment
//! outputs, system values.

use crate::backend::glasm::emit_context::EmitContext;
use crate::error::{Error, Result};
use crate::ir::{Attribute, InstId};
use crate::stage::Stage;

fn is_input_array(stage: Stage) -> bool {
    matches!(
        stage,
        Stage::Geometry | Stage::TessellationControl | Stage::TessellationEval
    )
}

/// LDC with the hardware's out-of-bounds behavior: offsets past the 64 KiB
/// window deterministically read zero.
pub fn get_cbuf(ctx: &mut EmitContext, inst: InstId, size: &str) -> Result<()> {
    let binding = ctx.program.arg(inst, 0).resolve(ctx.program);
    let binding = binding
        .u32(ctx.program)
        .map_err(|_| Error::not_implemented("indirect constant buffer loading"))?;
    let offset_value = ctx.program.arg(inst, 1).resolve(ctx.program);
    let imm_offset = offset_value.u32(ctx.program).ok();
    let offset = ctx.consume_u32(offset_value)?;
    let ret = ctx.define(inst)?;
    if let Some(imm) = imm_offset {
        // Avoid reading arrays out of bounds, matching hardware's behavior
        if imm >= 0x10000 {
            ctx.add(format!("MOV.S {},0;", ret));
            return Ok(());
        }
    }
    ctx.add(format!("LDC.{} {},c{}[{}];", size, ret, binding, offset));
    Ok(())
}

pub fn get_attribute(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let attr = ctx.program.arg(inst, 0).attribute()?;
    let _vertex = ctx.consume(ctx.program.arg(inst, 1))?;
    let element = attr.element();
    let swizzle = ["x", "y", "z", "w"][element as usize];
    let ret = ctx.define(inst)?;
    if attr.is_generic() {
        let index = attr.generic_index();
        ctx.add(format!("MOV.F {}.x,in_attr{}[0].{};", ret, index, swizzle));
        return Ok(());
    }
    if attr.is_fixed_fnc_texture() {
        let index = attr.fixed_fnc_texture_index();
        ctx.add(format!(
            "MOV.F {}.x,{}.texcoord[{}].{};",
            ret, ctx.attrib_name, index, swizzle
        ));
        return Ok(());
    }
    match attr {
        Attribute::PRIMITIVE_ID => ctx.add(format!("MOV.S {}.x,primitive.id;", ret)),
        Attribute::POSITION_X
        | Attribute::POSITION_Y
        | Attribute::POSITION_Z
        | Attribute::POSITION_W => {
            if is_input_array(ctx.stage) {
                ctx.add(format!("MOV.F {}.x,vertex_position.{};", ret, swizzle));
            } else {
                ctx.add(format!("MOV.F {}.x,{}.position.{};", ret, ctx.attrib_name, swizzle));
            }
        }
        Attribute::COLOR_FRONT_DIFFUSE_R
        | Attribute::COLOR_FRONT_DIFFUSE_G
        | Attribute::COLOR_FRONT_DIFFUSE_B
        | Attribute::COLOR_FRONT_DIFFUSE_A => {
            ctx.add(format!("MOV.F {}.x,{}.color.{};", ret, ctx.attrib_name, swizzle));
        }
        Attribute::POINT_SPRITE_S | Attribute::POINT_SPRITE_T => {
            ctx.add(format!("MOV.F {}.x,{}.pointcoord.{};", ret, ctx.attrib_name, swizzle));
        }
        Attribute::TESSELLATION_EVALUATION_POINT_U
        | Attribute::TESSELLATION_EVALUATION_POINT_V => {
            ctx.add(format!("MOV.F {}.x,vertex.tesscoord.{};", ret, swizzle));
        }
        Attribute::INSTANCE_ID => ctx.add(format!("MOV.S {}.x,{}.instance;", ret, ctx.attrib_name)),
        Attribute::VERTEX_ID => ctx.add(format!("MOV.S {}.x,{}.id;", ret, ctx.attrib_name)),
        Attribute::FRONT_FACE => {
            ctx.add(format!("CMP.S {}.x,{}.facing.x,0,-1;", ret, ctx.attrib_name));
        }
        other => {
            return Err(Error::not_implemented(format!("get attribute {}", other)));
        }
    }
    Ok(())
}

pub fn set_attribute(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let attr = ctx.program.arg(inst, 0).attribute()?;
    let value = ctx.consume_f32(ctx.program.arg(inst, 1))?;
    let _vertex = ctx.consume(ctx.program.arg(inst, 2))?;
    let element = attr.element();
    let swizzle = ["x", "y", "z", "w"][element as usize];
    if attr.is_generic() {
        let index = attr.generic_index();
        ctx.add(format!("MOV.F out_attr{}[0].{},{};", index, swizzle, value));
        return Ok(());
    }
    if attr.is_fixed_fnc_texture() {
        let index = attr.fixed_fnc_texture_index();
        ctx.add(format!("MOV.F result.texcoord[{}].{},{};", index, swizzle, value));
        return Ok(());
    }
    match attr {
        Attribute::POSITION_X
        | Attribute::POSITION_Y
        | Attribute::POSITION_Z
        | Attribute::POSITION_W => {
            ctx.add(format!("MOV.F result.position.{},{};", swizzle, value));
        }
        Attribute::COLOR_FRONT_DIFFUSE_R
        | Attribute::COLOR_FRONT_DIFFUSE_G
        | Attribute::COLOR_FRONT_DIFFUSE_B
        | Attribute::COLOR_FRONT_DIFFUSE_A => {
            ctx.add(format!("MOV.F result.color.{},{};", swizzle, value));
        }
        Attribute::POINT_SIZE => ctx.add(format!("MOV.F result.pointsize.x,{};", value)),
        Attribute::LAYER => ctx.add(format!("MOV.S result.layer.x,{};", value)),
        Attribute::VIEWPORT_INDEX => ctx.add(format!("MOV.S result.viewport.x,{};", value)),
        other => {
            return Err(Error::not_implemented(format!("set attribute {}", other)));
        }
    }
    Ok(())
}

pub fn get_patch(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let patch = ctx.program.arg(inst, 0).patch()?;
    if !patch.is_generic() {
        return Err(Error::not_implemented(format!("non-generic patch read {}", patch)));
    }
    let index = patch.generic_index();
    let element = ["x", "y", "z", "w"][patch.element() as usize];
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.F {}.x,primitive.patch.attrib[{}].{};", ret, index, element));
    Ok(())
}

pub fn set_patch(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let patch = ctx.program.arg(inst, 0).patch()?;
    let value = ctx.consume_f32(ctx.program.arg(inst, 1))?;
    if patch.is_generic() {
        let index = patch.generic_index();
        let element = ["x", "y", "z", "w"][patch.element() as usize];
        ctx.add(format!("MOV.F result.patch.attrib[{}].{},{};", index, element, value));
        return Ok(());
    }
    let edge = match patch {
        p if p == crate::ir::Patch::TESSELLATION_LOD_LEFT => "outer[0]",
        p if p == crate::ir::Patch::TESSELLATION_LOD_RIGHT => "outer[1]",
        p if p == crate::ir::Patch::TESSELLATION_LOD_TOP => "outer[2]",
        p if p == crate::ir::Patch::TESSELLATION_LOD_BOTTOM => "outer[3]",
        p if p == crate::ir::Patch::TESSELLATION_LOD_INTERIOR_U => "inner[0]",
        p if p == crate::ir::Patch::TESSELLATION_LOD_INTERIOR_V => "inner[1]",
        other => {
            return Err(Error::not_implemented(format!("set patch {}", other)));
        }
    };
    ctx.add(format!("MOV.F result.patch.tessouter.{}.x,{};", edge, value));
    Ok(())
}

pub fn set_frag_color(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let index = ctx.program.arg(inst, 0).u32(ctx.program)?;
    let component = ctx.program.arg(inst, 1).u32(ctx.program)?;
    let value = ctx.consume_f32(ctx.program.arg(inst, 2))?;
    let swizzle = ["x", "y", "z", "w"][component as usize];
    ctx.add(format!("MOV.F frag_color{}.{},{};", index, swizzle, value));
    Ok(())
}

pub fn set_frag_depth(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_f32(ctx.program.arg(inst, 0))?;
    ctx.add(format!("MOV.F result.depth.z,{};", value));
    Ok(())
}

pub fn set_sample_mask(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let value = ctx.consume_s32(ctx.program.arg(inst, 0))?;
    ctx.add(format!("MOV.S result.samplemask.x,{};", value));
    Ok(())
}

pub fn workgroup_id(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.S {},invocation.groupid;", ret));
    Ok(())
}

pub fn local_invocation_id(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.S {},invocation.localid;", ret));
    Ok(())
}

pub fn lane_id(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let ret = ctx.define(inst)?;
    ctx.add(format!("MOV.S {}.x,{}.threadid;", ret, ctx.attrib_name));
    Ok(())
}
