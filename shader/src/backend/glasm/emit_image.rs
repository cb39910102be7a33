//! Texture sampling emission.

use crate::backend::glasm::emit_context::EmitContext;
use crate::error::{Error, Result};
use crate::ir::{InstId, Opcode, TextureInstInfo, TextureType, Value};

fn texture_name(ctx: &EmitContext, info: &TextureInstInfo) -> Result<String> {
    let index = info.descriptor_index as usize;
    if info.ty == Some(TextureType::Buffer) {
        let binding = ctx
            .texture_buffer_bindings
            .get(index)
            .ok_or_else(|| Error::logic("texture buffer binding out of range"))?;
        Ok(format!("texture[{}]", binding))
    } else {
        let binding = ctx
            .texture_bindings
            .get(index)
            .ok_or_else(|| Error::logic("texture binding out of range"))?;
        Ok(format!("texture[{}]", binding))
    }
}

fn texture_type(info: &TextureInstInfo) -> Result<&'static str> {
    let ty = info.ty.ok_or_else(|| Error::logic("texture operation without a resolved type"))?;
    Ok(if info.is_depth {
        match ty {
            TextureType::Color1D => "SHADOW1D",
            TextureType::ColorArray1D => "SHADOWARRAY1D",
            TextureType::Color2D => "SHADOW2D",
            TextureType::ColorArray2D => "SHADOWARRAY2D",
            TextureType::Color3D => "SHADOW3D",
            TextureType::ColorCube => "SHADOWCUBE",
            TextureType::ColorArrayCube => "SHADOWARRAYCUBE",
            TextureType::Buffer => "SHADOWBUFFER",
        }
    } else {
        match ty {
            TextureType::Color1D => "1D",
            TextureType::ColorArray1D => "ARRAY1D",
            TextureType::Color2D => "2D",
            TextureType::ColorArray2D => "ARRAY2D",
            TextureType::Color3D => "3D",
            TextureType::ColorCube => "CUBE",
            TextureType::ColorArrayCube => "ARRAYCUBE",
            TextureType::Buffer => "BUFFER",
        }
    })
}

fn offset_operand(ctx: &mut EmitContext, offset: Value) -> Result<String> {
    if offset.is_empty() {
        return Ok(String::new());
    }
    let register = ctx.consume_register(offset)?;
    Ok(format!(",offset({})", register))
}

/// TEX/TXL/TXB and their shadow forms.
pub fn sample(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    let op = ctx.program.inst(inst).opcode();
    let info = ctx.program.inst(inst).flags::<TextureInstInfo>();
    let sparse = ctx.program.associated_pseudo_operation(inst, Opcode::GetSparseFromOp);
    if sparse.is_some() {
        return Err(Error::not_implemented("sparse texture queries"));
    }
    let texture = texture_name(ctx, &info)?;
    let ty = texture_type(&info)?;

    match op {
        Opcode::ImageSampleImplicitLod => {
            let coord = ctx.consume_register(ctx.program.arg(inst, 1))?;
            let bias_lc = ctx.program.arg(inst, 2);
            let offset_arg = ctx.program.arg(inst, 3);
            let offset = offset_operand(ctx, offset_arg)?;
            let ret = ctx.define(inst)?;
            if bias_lc.is_empty() {
                let clamp_mod = if info.has_lod_clamp { ".LODCLAMP" } else { "" };
                ctx.add(format!(
                    "TEX.F{} {},{},{},{}{};",
                    clamp_mod, ret, coord, texture, ty, offset
                ));
            } else {
                let bias = ctx.consume_f32(bias_lc)?;
                let clamp_mod = if info.has_lod_clamp { ".LODCLAMP" } else { "" };
                ctx.add(format!(
                    "MOV.F RC.w,{};TXB.F{} {},RC,{},{}{};",
                    bias, clamp_mod, ret, texture, ty, offset
                ));
            }
        }
        Opcode::ImageSampleExplicitLod => {
            let coord = ctx.consume_register(ctx.program.arg(inst, 1))?;
            let lod = ctx.consume_f32(ctx.program.arg(inst, 2))?;
            let offset_arg = ctx.program.arg(inst, 3);
            let offset = offset_operand(ctx, offset_arg)?;
            let ret = ctx.define(inst)?;
            ctx.add(format!(
                "MOV.F RC,{};MOV.F RC.w,{};TXL.F {},RC,{},{}{};",
                coord, lod, ret, texture, ty, offset
            ));
        }
        Opcode::ImageSampleDrefImplicitLod => {
            let coord = ctx.consume_register(ctx.program.arg(inst, 1))?;
            let dref = ctx.consume_f32(ctx.program.arg(inst, 2))?;
            let offset_arg = ctx.program.arg(inst, 4);
            let offset = offset_operand(ctx, offset_arg)?;
            let ret = ctx.define(inst)?;
            ctx.add(format!(
                "MOV.F RC,{};MOV.F RC.z,{};TEX.F {}.x,RC,{},{}{};",
                coord, dref, ret, texture, ty, offset
            ));
        }
        Opcode::ImageSampleDrefExplicitLod => {
            let coord = ctx.consume_register(ctx.program.arg(inst, 1))?;
            let dref = ctx.consume_f32(ctx.program.arg(inst, 2))?;
            let lod = ctx.consume_f32(ctx.program.arg(inst, 3))?;
            let offset_arg = ctx.program.arg(inst, 4);
            let offset = offset_operand(ctx, offset_arg)?;
            let ret = ctx.define(inst)?;
            ctx.add(format!(
                "MOV.F RC,{};MOV.F RC.z,{};MOV.F RC.w,{};TXL.F {}.x,RC,{},{}{};",
                coord, dref, lod, ret, texture, ty, offset
            ));
        }
        other => {
            return Err(Error::not_implemented(format!("GLASM image operation {:?}", other)));
        }
    }
    Ok(())
}
