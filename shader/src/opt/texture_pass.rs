//! Texture and image handle tracking.
//!
//! Resolves each bound/bindless handle to a descriptor table index and
//! rewrites the operation into its indexed form; the descriptor index rides
//! in the instruction's flag word.

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::info::{TextureBufferDescriptor, TextureDescriptor};
use crate::ir::{
    BlockId, InstId, Opcode, Program, TextureInstInfo, TextureType, Value,
};

fn indexed_opcode(op: Opcode) -> Option<Opcode> {
    Some(match op {
        Opcode::BoundImageSampleImplicitLod | Opcode::BindlessImageSampleImplicitLod => {
            Opcode::ImageSampleImplicitLod
        }
        Opcode::BoundImageSampleExplicitLod | Opcode::BindlessImageSampleExplicitLod => {
            Opcode::ImageSampleExplicitLod
        }
        Opcode::BoundImageSampleDrefImplicitLod | Opcode::BindlessImageSampleDrefImplicitLod => {
            Opcode::ImageSampleDrefImplicitLod
        }
        Opcode::BoundImageSampleDrefExplicitLod | Opcode::BindlessImageSampleDrefExplicitLod => {
            Opcode::ImageSampleDrefExplicitLod
        }
        Opcode::BoundImageGather | Opcode::BindlessImageGather => Opcode::ImageGather,
        Opcode::BoundImageGatherDref | Opcode::BindlessImageGatherDref => Opcode::ImageGatherDref,
        Opcode::BoundImageFetch | Opcode::BindlessImageFetch => Opcode::ImageFetch,
        Opcode::BoundImageQueryDimensions | Opcode::BindlessImageQueryDimensions => {
            Opcode::ImageQueryDimensions
        }
        Opcode::BoundImageQueryLod | Opcode::BindlessImageQueryLod => Opcode::ImageQueryLod,
        Opcode::BoundImageGradient | Opcode::BindlessImageGradient => Opcode::ImageGradient,
        Opcode::BoundImageRead | Opcode::BindlessImageRead => Opcode::ImageRead,
        Opcode::BoundImageWrite | Opcode::BindlessImageWrite => Opcode::ImageWrite,
        _ => return None,
    })
}

fn is_bindless(op: Opcode) -> bool {
    matches!(
        op,
        Opcode::BindlessImageSampleImplicitLod
            | Opcode::BindlessImageSampleExplicitLod
            | Opcode::BindlessImageSampleDrefImplicitLod
            | Opcode::BindlessImageSampleDrefExplicitLod
            | Opcode::BindlessImageGather
            | Opcode::BindlessImageGatherDref
            | Opcode::BindlessImageFetch
            | Opcode::BindlessImageQueryDimensions
            | Opcode::BindlessImageQueryLod
            | Opcode::BindlessImageGradient
            | Opcode::BindlessImageRead
            | Opcode::BindlessImageWrite
    )
}

/// Bindless handles ultimately come from a constant buffer word; walk the
/// chain back to the originating load.
fn track_handle(program: &Program, value: Value) -> Result<(u32, u32)> {
    let inst = value
        .inst_recursive(program)
        .ok_or_else(|| Error::not_implemented("untrackable texture handle"))?;
    match program.inst(inst).opcode() {
        Opcode::GetCbufU32 => {
            let binding = program.arg(inst, 0).u32(program)?;
            let offset = program.arg(inst, 1).u32(program)?;
            Ok((binding, offset))
        }
        _ => Err(Error::not_implemented("bindless texture handle pattern")),
    }
}

pub fn texture_pass(env: &dyn Environment, program: &mut Program) -> Result<()> {
    let order: Vec<BlockId> = program.rpo().collect();
    let mut worklist: Vec<(InstId, Opcode)> = Vec::new();
    for &block in &order {
        for &inst in program.block(block).instructions() {
            let op = program.inst(inst).opcode();
            if indexed_opcode(op).is_some() {
                worklist.push((inst, op));
            }
        }
    }
    for (inst, op) in worklist {
        let handle = program.arg(inst, 0);
        let (cbuf_index, cbuf_offset) = if is_bindless(op) {
            track_handle(program, handle)?
        } else {
            let word = handle.u32(program)?;
            (env.texture_bound_buffer(), word * 4)
        };
        let mut info = program.inst(inst).flags::<TextureInstInfo>();
        let ty = info.ty.unwrap_or_else(|| env.read_texture_type(cbuf_offset));

        let descriptor_index = if ty == TextureType::Buffer {
            let descriptors = &mut program.info.texture_buffer_descriptors;
            let position = descriptors
                .iter()
                .position(|desc| desc.cbuf_index == cbuf_index && desc.cbuf_offset == cbuf_offset);
            match position {
                Some(index) => index as u32,
                None => {
                    descriptors.push(TextureBufferDescriptor {
                        cbuf_index,
                        cbuf_offset,
                        count: 1,
                    });
                    descriptors.len() as u32 - 1
                }
            }
        } else {
            let is_depth = info.is_depth;
            let descriptors = &mut program.info.texture_descriptors;
            let position = descriptors
                .iter()
                .position(|desc| desc.cbuf_index == cbuf_index && desc.cbuf_offset == cbuf_offset);
            match position {
                Some(index) => index as u32,
                None => {
                    descriptors.push(TextureDescriptor {
                        ty,
                        is_depth,
                        cbuf_index,
                        cbuf_offset,
                        count: 1,
                    });
                    descriptors.len() as u32 - 1
                }
            }
        };

        info.descriptor_index = descriptor_index;
        info.ty = Some(ty);
        program.inst_mut(inst).set_flags(info);
        let new_op = indexed_opcode(op).expect("worklist entries are texture operations");
        program.replace_opcode(inst, new_op)?;
        program.set_arg(inst, 0, Value::Void)?;
    }
    Ok(())
}
