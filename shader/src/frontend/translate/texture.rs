//! Texture sampling translators.

use super::*;
use crate::error::Error;
use crate::ir::{Opcode, TextureInstInfo, TextureType};

/// Texture encoding: coordinate base register at 8..16, bound handle
/// immediate at bits 36..49, dimensionality at 28..31, depth compare bit
/// 50, explicit-lod bit 55.
pub(super) fn tex(ir: &mut IrEmitter, insn: u64) -> Result<()> {
    let coord_reg = src_a_reg(insn);
    let handle = ir.imm32(((insn >> 36) & 0x1fff) as u32);
    let (ty, num_coords) = match (insn >> 28) & 0x7 {
        0 => (TextureType::Color1D, 1),
        1 => (TextureType::Color2D, 2),
        2 => (TextureType::Color3D, 3),
        3 => (TextureType::ColorCube, 3),
        other => {
            return Err(Error::not_implemented(format!("texture type {}", other)));
        }
    };
    let is_depth = (insn >> 50) & 1 != 0;
    let explicit_lod = (insn >> 55) & 1 != 0;

    let mut coords = [Value::Void; 3];
    for (i, coord) in coords.iter_mut().enumerate().take(num_coords) {
        let raw = ir.get_register(coord_reg.offset(i as i32)?)?;
        *coord = ir.bitcast_u32_f32(raw)?;
    }
    let coords = match num_coords {
        1 => coords[0],
        2 => ir.inst(Opcode::CompositeConstructF32x2, &[coords[0], coords[1]])?,
        _ => ir.inst(Opcode::CompositeConstructF32x3, &[coords[0], coords[1], coords[2]])?,
    };

    let info = TextureInstInfo {
        ty: Some(ty),
        is_depth,
        ..TextureInstInfo::default()
    };
    let offset = Value::Void;
    let result = if is_depth {
        let dref = {
            let raw = ir.get_register(src_b_reg(insn))?;
            ir.bitcast_u32_f32(raw)?
        };
        let bias_lc = Value::Void;
        let value =
            ir.image_sample_dref_implicit_lod(handle, coords, dref, bias_lc, offset, info)?;
        let raw = ir.bitcast_f32_u32(value)?;
        return ir.set_register(dest_reg(insn), raw);
    } else if explicit_lod {
        let lod = {
            let raw = ir.get_register(src_b_reg(insn))?;
            ir.bitcast_u32_f32(raw)?
        };
        ir.image_sample_explicit_lod(handle, coords, lod, offset, info)?
    } else {
        ir.image_sample_implicit_lod(handle, coords, Value::Void, offset, info)?
    };

    // Unpack up to four components into consecutive registers
    let dest = dest_reg(insn);
    for element in 0..4 {
        let component = ir.composite_extract(result, element)?;
        let raw = ir.bitcast_f32_u32(component)?;
        ir.set_register(dest.offset(element as i32)?, raw)?;
    }
    Ok(())
}
