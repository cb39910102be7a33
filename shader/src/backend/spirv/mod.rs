//! SPIR-V back-end.

mod emit;
mod emit_context;
mod module;

pub use self::emit_context::EmitContext;
pub use self::module::{Id, Module};

use spirv_headers::{Capability, ExecutionMode, ExecutionModel, Op};

use crate::backend::Bindings;
use crate::error::Result;
use crate::info::{TessPrimitive, TessSpacing};
use crate::profile::{InputTopology, Profile, RuntimeInfo};
use crate::stage::Stage;

use self::module::push_inst;

fn execution_model(stage: Stage) -> ExecutionModel {
    match stage {
        Stage::VertexA | Stage::VertexB => ExecutionModel::Vertex,
        Stage::TessellationControl => ExecutionModel::TessellationControl,
        Stage::TessellationEval => ExecutionModel::TessellationEvaluation,
        Stage::Geometry => ExecutionModel::Geometry,
        Stage::Fragment => ExecutionModel::Fragment,
        Stage::Compute => ExecutionModel::GLCompute,
    }
}

/// Lowers the program to a SPIR-V word stream.
pub fn emit_spirv(
    profile: &Profile,
    runtime_info: &RuntimeInfo,
    program: &mut crate::ir::Program,
    bindings: &mut Bindings,
) -> Result<Vec<u32>> {
    let num_cbufs = program.info.constant_buffer_descriptors.len() as u32;
    let num_ssbos = program.info.storage_buffers_descriptors.len() as u32;
    let num_textures =
        (program.info.texture_descriptors.len() + program.info.texture_buffer_descriptors.len()) as u32;

    let mut ctx = EmitContext::new(profile, runtime_info, program)?;
    let main = emit::emit_program(&mut ctx)?;

    let stage = ctx.stage;
    let model = execution_model(stage);
    match stage {
        Stage::Fragment => {
            push_inst(
                &mut ctx.module.execution_modes,
                Op::ExecutionMode,
                &[main.0, ExecutionMode::OriginUpperLeft as u32],
            );
            if ctx.program.info.stores_frag_depth {
                push_inst(
                    &mut ctx.module.execution_modes,
                    Op::ExecutionMode,
                    &[main.0, ExecutionMode::DepthReplacing as u32],
                );
            }
        }
        Stage::Compute => {
            let [x, y, z] = ctx.program.workgroup_size;
            push_inst(
                &mut ctx.module.execution_modes,
                Op::ExecutionMode,
                &[main.0, ExecutionMode::LocalSize as u32, x, y, z],
            );
        }
        Stage::Geometry => {
            ctx.module.add_capability(Capability::Geometry);
            let input_mode = match runtime_info.input_topology {
                InputTopology::Points => ExecutionMode::InputPoints,
                InputTopology::Lines => ExecutionMode::InputLines,
                InputTopology::LinesAdjacency => ExecutionMode::InputLinesAdjacency,
                InputTopology::Triangles => ExecutionMode::Triangles,
                InputTopology::TrianglesAdjacency => ExecutionMode::InputTrianglesAdjacency,
            };
            for mode in [input_mode, ExecutionMode::OutputTriangleStrip].iter() {
                push_inst(
                    &mut ctx.module.execution_modes,
                    Op::ExecutionMode,
                    &[main.0, *mode as u32],
                );
            }
            let invocations = ctx.program.invocations.unwrap_or(1);
            push_inst(
                &mut ctx.module.execution_modes,
                Op::ExecutionMode,
                &[main.0, ExecutionMode::Invocations as u32, invocations],
            );
        }
        Stage::TessellationControl => {
            ctx.module.add_capability(Capability::Tessellation);
            let vertices = ctx.program.invocations.unwrap_or(3);
            push_inst(
                &mut ctx.module.execution_modes,
                Op::ExecutionMode,
                &[main.0, ExecutionMode::OutputVertices as u32, vertices],
            );
        }
        Stage::TessellationEval => {
            ctx.module.add_capability(Capability::Tessellation);
            let primitive = match ctx.program.info.tess_primitive {
                TessPrimitive::Isolines => ExecutionMode::Isolines,
                TessPrimitive::Triangles => ExecutionMode::Triangles,
                TessPrimitive::Quads => ExecutionMode::Quads,
            };
            let spacing = match ctx.program.info.tess_spacing {
                TessSpacing::Equal => ExecutionMode::SpacingEqual,
                TessSpacing::FractionalOdd => ExecutionMode::SpacingFractionalOdd,
                TessSpacing::FractionalEven => ExecutionMode::SpacingFractionalEven,
            };
            let winding = if ctx.program.info.tess_clockwise {
                ExecutionMode::VertexOrderCw
            } else {
                ExecutionMode::VertexOrderCcw
            };
            for mode in [primitive, spacing, winding].iter() {
                push_inst(
                    &mut ctx.module.execution_modes,
                    Op::ExecutionMode,
                    &[main.0, *mode as u32],
                );
            }
        }
        _ => {}
    }

    let interfaces = ctx.interfaces.clone();
    ctx.module.add_entry_point(model, main, &interfaces);

    // The main body was emitted into its own sink; splice it in after the
    // helper functions
    let body = std::mem::replace(&mut ctx.body, Vec::new());
    ctx.module.functions.extend_from_slice(&body);

    bindings.uniform_buffer += num_cbufs;
    bindings.storage_buffer += num_ssbos;
    bindings.texture += num_textures;
    Ok(ctx.module.assemble())
}
