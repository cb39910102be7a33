//! GL assembly back-end.

mod emit;
mod emit_alu;
mod emit_composite;
mod emit_context;
mod emit_context_get_set;
mod emit_float;
mod emit_image;
mod emit_memory;
mod emit_special;
mod reg_alloc;

pub use self::emit_context::EmitContext;
pub use self::reg_alloc::{Id, RegAlloc, Register, ScalarF32, ScalarS32, ScalarU32};

use crate::backend::Bindings;
use crate::error::{Error, Result};
use crate::ir::{BlockEnd, BlockId, Opcode, Program, Value, NUM_GENERICS};
use crate::profile::{Profile, RuntimeInfo};
use crate::stage::Stage;

/// Lowers the program to GLASM source text. The IR is consumed
/// destructively: use counts reach zero and pseudo instructions fuse into
/// their producers.
pub fn emit_glasm(
    profile: &Profile,
    runtime_info: &RuntimeInfo,
    program: &mut Program,
    bindings: &mut Bindings,
) -> Result<String> {
    insert_phi_moves(program)?;
    let mut ctx = EmitContext::new(program, profile, runtime_info);
    for index in 0..ctx.program.info.texture_buffer_descriptors.len() {
        ctx.texture_buffer_bindings.push(bindings.texture + index as u32);
    }
    bindings.texture += ctx.program.info.texture_buffer_descriptors.len() as u32;
    for index in 0..ctx.program.info.texture_descriptors.len() {
        ctx.texture_bindings.push(bindings.texture + index as u32);
    }
    bindings.texture += ctx.program.info.texture_descriptors.len() as u32;
    for index in 0..ctx.program.info.image_buffer_descriptors.len() {
        ctx.image_buffer_bindings.push(bindings.image + index as u32);
    }
    bindings.image += ctx.program.info.image_buffer_descriptors.len() as u32;
    for index in 0..ctx.program.info.image_descriptors.len() {
        ctx.image_bindings.push(bindings.image + index as u32);
    }
    bindings.image += ctx.program.info.image_descriptors.len() as u32;

    let structure = Structure::new(ctx.program);
    structure.emit(&mut ctx)?;

    let header = build_header(&ctx, bindings)?;
    let mut source = header;
    source.push_str(&ctx.code);
    source.push_str("END\n");
    Ok(source)
}

/// Phi values are carried through registers: each predecessor writes the
/// phi's register before branching away.
fn insert_phi_moves(program: &mut Program) -> Result<()> {
    let order: Vec<BlockId> = program.rpo().collect();
    for block in order {
        let phis: Vec<_> = program
            .block(block)
            .instructions()
            .iter()
            .copied()
            .filter(|&id| program.inst(id).opcode() == Opcode::Phi)
            .collect();
        for phi in phis {
            for index in 0..program.inst(phi).num_args() {
                let pred = program.phi_block(phi, index)?;
                let value = program.arg(phi, index);
                program.append_new_inst(
                    pred,
                    Opcode::PhiMove,
                    0,
                    &[Value::Inst(phi), value],
                )?;
            }
        }
    }
    Ok(())
}

/// Structured emission order. GLASM has no free-form labels, so the CFG is
/// emitted as nested IF/ELSE regions; other shapes are rejected.
struct Structure {
    post_dominators: Vec<Option<BlockId>>,
    entry: BlockId,
}

impl Structure {
    fn new(program: &Program) -> Structure {
        Structure {
            post_dominators: crate::backend::compute_immediate_post_dominators(program),
            entry: program.block_order[0],
        }
    }

    fn emit(&self, ctx: &mut EmitContext) -> Result<()> {
        let num_blocks = ctx.program.num_blocks();
        let mut visited = vec![false; num_blocks];
        self.emit_range(ctx, self.entry, None, &mut visited)
    }

    fn emit_range(
        &self,
        ctx: &mut EmitContext,
        entry: BlockId,
        stop: Option<BlockId>,
        visited: &mut [bool],
    ) -> Result<()> {
        let mut block = entry;
        loop {
            if Some(block) == stop {
                return Ok(());
            }
            if visited[block.index()] {
                return Err(Error::not_implemented("loop emission in GLASM"));
            }
            visited[block.index()] = true;
            let insts = ctx.program.block(block).instructions().to_vec();
            for inst in insts {
                emit::emit_inst(ctx, inst)?;
            }
            match ctx.program.block(block).end() {
                BlockEnd::Return => {
                    ctx.add("RET;".to_string());
                    return Ok(());
                }
                BlockEnd::Unconditional(next) => {
                    block = next;
                }
                BlockEnd::Conditional { cond, true_block, false_block } => {
                    let join = self.post_dominators[block.index()]
                        .ok_or_else(|| Error::not_implemented("unstructured control flow"))?;
                    let cond = ctx.consume_s32(cond)?;
                    ctx.add(format!("MOV.S.CC RC.x,{};", cond));
                    ctx.add("IF NE.x;".to_string());
                    self.emit_range(ctx, true_block, Some(join), visited)?;
                    ctx.add("ELSE;".to_string());
                    self.emit_range(ctx, false_block, Some(join), visited)?;
                    ctx.add("ENDIF;".to_string());
                    block = join;
                }
                BlockEnd::Indirect { .. } => {
                    return Err(Error::not_implemented("GLASM indirect branches"));
                }
                BlockEnd::Unset => {
                    return Err(Error::logic("unterminated block reached emission"));
                }
            }
        }
    }
}

fn stage_directive(stage: Stage) -> &'static str {
    match stage {
        Stage::VertexA | Stage::VertexB => "!!NVvp5.0",
        Stage::TessellationControl => "!!NVtcp5.0",
        Stage::TessellationEval => "!!NVtep5.0",
        Stage::Geometry => "!!NVgp5.0",
        Stage::Fragment => "!!NVfp5.0",
        Stage::Compute => "!!NVcp5.0",
    }
}

fn build_header(ctx: &EmitContext, bindings: &Bindings) -> Result<String> {
    let program = &*ctx.program;
    let info = &program.info;
    let mut header = String::new();
    header.push_str(stage_directive(program.stage));
    header.push('\n');
    header.push_str("OPTION NV_internal;\n");
    if program.stage == Stage::Compute {
        header.push_str(&format!(
            "GROUP_SIZE {} {} {};\n",
            program.workgroup_size[0], program.workgroup_size[1], program.workgroup_size[2]
        ));
        if program.shared_memory_size > 0 {
            header.push_str(&format!("SHARED_MEMORY {};\n", program.shared_memory_size));
            header.push_str("SHARED shared_mem[] = {program.sharedmem};\n");
        }
    }
    if program.local_memory_size > 0 {
        header.push_str(&format!("TEMP lmem[{}];\n", (program.local_memory_size + 3) / 4));
    }
    for desc in &info.constant_buffer_descriptors {
        header.push_str(&format!(
            "CBUFFER c{}[]={{program.buffer[{}]}};\n",
            desc.index,
            bindings.uniform_buffer + desc.index
        ));
    }
    for (index, _) in info.storage_buffers_descriptors.iter().enumerate() {
        header.push_str(&format!(
            "STORAGE ssbo{}[]={{program.storage[{}]}};\n",
            index,
            bindings.storage_buffer + index as u32
        ));
    }
    for index in 0..NUM_GENERICS as u32 {
        if info.loads.generic(index) {
            header.push_str(&format!(
                "ATTRIB in_attr{0}[] = {{ {1}.attrib[{0}..{0}] }};\n",
                index, ctx.attrib_name
            ));
        }
    }
    for index in 0..NUM_GENERICS as u32 {
        if info.stores.generic(index) {
            header.push_str(&format!(
                "OUTPUT out_attr{0}[] = {{ result.attrib[{0}..{0}] }};\n",
                index
            ));
        }
    }
    if program.stage == Stage::Fragment {
        for (index, &stored) in info.stores_frag_color.iter().enumerate() {
            if stored {
                header.push_str(&format!(
                    "OUTPUT frag_color{0} = result.color[{0}];\n",
                    index
                ));
            }
        }
    }
    let num_regs = ctx.reg_alloc.num_used_registers();
    if num_regs > 0 {
        let names: Vec<String> = (0..num_regs).map(|reg| format!("R{}", reg)).collect();
        header.push_str(&format!("TEMP {};\n", names.join(",")));
    }
    header.push_str("TEMP RC;\n");
    let num_long_regs = ctx.reg_alloc.num_used_long_registers();
    if num_long_regs > 0 {
        let names: Vec<String> = (0..num_long_regs).map(|reg| format!("D{}", reg)).collect();
        header.push_str(&format!("LONG TEMP {};\n", names.join(",")));
    }
    header.push_str("LONG TEMP DC;\n");
    header.push_str("main:\n");
    Ok(header)
}
