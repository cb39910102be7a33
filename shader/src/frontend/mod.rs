//! Guest ISA front end: instruction decoding, translation and CFG
//! construction.

pub mod cfg;
pub mod decode;
pub mod translate;

use crate::environment::Environment;
use crate::error::Result;
use crate::ir::Program;

/// Decodes one guest program into pre-SSA IR with explicit basic blocks.
pub fn translate(env: &dyn Environment) -> Result<Program> {
    let mut program = Program::new(env.stage());
    program.local_memory_size = env.local_memory_size();
    program.shared_memory_size = env.shared_memory_size();
    program.workgroup_size = env.workgroup_size();
    cfg::build(env, &mut program)?;
    program.compute_post_order();
    debug!(
        "translated {} blocks, {} instructions",
        program.num_blocks(),
        program.insts.len()
    );
    Ok(program)
}
