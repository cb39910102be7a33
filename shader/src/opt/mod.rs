//! IR optimization passes.

mod collect_info;
mod constant_folding;
mod dead_code;
mod global_memory;
mod identity_removal;
mod ssa_rewrite;
mod texture_pass;

pub use self::collect_info::collect_shader_info_pass;
pub use self::constant_folding::constant_propagation_pass;
pub use self::dead_code::dead_code_elimination_pass;
pub use self::global_memory::global_memory_to_storage_buffer_pass;
pub use self::identity_removal::identity_removal_pass;
pub use self::ssa_rewrite::ssa_rewrite_pass;
pub use self::texture_pass::texture_pass;

use crate::environment::Environment;
use crate::error::Result;
use crate::ir::Program;

/// Standard pass pipeline between translation and back-end emission.
pub fn run_passes(env: &dyn Environment, program: &mut Program) -> Result<()> {
    ssa_rewrite_pass(program)?;
    constant_propagation_pass(program)?;
    identity_removal_pass(program)?;
    dead_code_elimination_pass(program)?;
    global_memory_to_storage_buffer_pass(program)?;
    texture_pass(env, program)?;
    // The rewrites above leave dead address chains behind
    dead_code_elimination_pass(program)?;
    collect_shader_info_pass(program)?;
    Ok(())
}
