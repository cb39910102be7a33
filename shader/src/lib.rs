//! Maxwell shader recompiler.
//!
//! Translates guest shader binaries into an SSA intermediate representation
//! and lowers them to one of two host targets: a GL assembly dialect or a
//! SPIR-V module. Compilation is a pure function of (program bytes, profile,
//! runtime info); the crate keeps no state between invocations.
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod backend;
pub mod environment;
mod error;
pub mod frontend;
pub mod info;
pub mod ir;
pub mod opt;
pub mod profile;
pub mod stage;

pub use self::environment::Environment;
pub use self::error::{Error, Result};
pub use self::info::Info;
pub use self::profile::{Profile, RuntimeInfo};
pub use self::stage::Stage;

use self::backend::Bindings;

/// Decodes, builds SSA and optimizes one guest program.
pub fn translate_program(env: &dyn Environment) -> Result<ir::Program> {
    let mut program = frontend::translate(env)?;
    opt::run_passes(env, &mut program)?;
    Ok(program)
}

/// Full pipeline to the GL assembly target.
pub fn compile_glasm(
    env: &dyn Environment,
    profile: &Profile,
    runtime_info: &RuntimeInfo,
    bindings: &mut Bindings,
) -> Result<String> {
    let mut program = translate_program(env)?;
    backend::glasm::emit_glasm(profile, runtime_info, &mut program, bindings)
}

/// Full pipeline to the SPIR-V target.
pub fn compile_spirv(
    env: &dyn Environment,
    profile: &Profile,
    runtime_info: &RuntimeInfo,
    bindings: &mut Bindings,
) -> Result<Vec<u32>> {
    let mut program = translate_program(env)?;
    backend::spirv::emit_spirv(profile, runtime_info, &mut program, bindings)
}
