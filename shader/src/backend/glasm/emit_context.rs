//! Shared state of one GLASM emission.

use crate::backend::glasm::reg_alloc::{RegAlloc, Register, ScalarF32, ScalarF64, ScalarRegister, ScalarS32, ScalarU32, Value};
use crate::error::Result;
use crate::ir::{InstId, Program, Value as IrValue};
use crate::profile::{Profile, RuntimeInfo};
use crate::stage::Stage;

pub struct EmitContext<'a> {
    pub program: &'a mut Program,
    pub code: String,
    pub reg_alloc: RegAlloc,
    pub profile: &'a Profile,
    pub runtime_info: &'a RuntimeInfo,

    pub texture_buffer_bindings: Vec<u32>,
    pub image_buffer_bindings: Vec<u32>,
    pub texture_bindings: Vec<u32>,
    pub image_bindings: Vec<u32>,

    pub stage: Stage,
    pub attrib_name: &'static str,
}

impl<'a> EmitContext<'a> {
    pub fn new(
        program: &'a mut Program,
        profile: &'a Profile,
        runtime_info: &'a RuntimeInfo,
    ) -> EmitContext<'a> {
        let stage = program.stage;
        let attrib_name = match stage {
            Stage::VertexA | Stage::VertexB => "vertex",
            Stage::TessellationControl | Stage::TessellationEval => "primitive",
            Stage::Geometry => "primitive",
            Stage::Fragment => "fragment",
            Stage::Compute => "invocation",
        };
        EmitContext {
            program,
            code: String::new(),
            reg_alloc: RegAlloc::new(),
            profile,
            runtime_info,
            texture_buffer_bindings: Vec::new(),
            image_buffer_bindings: Vec::new(),
            texture_bindings: Vec::new(),
            image_bindings: Vec::new(),
            stage,
            attrib_name,
        }
    }

    pub fn add(&mut self, line: String) {
        self.code.push_str(&line);
        self.code.push('\n');
    }

    /// Allocates the destination register for `inst` in the short bank.
    pub fn define(&mut self, inst: InstId) -> Result<Register> {
        self.reg_alloc.define(self.program, inst)
    }

    /// Allocates the destination register for `inst` in the long bank.
    pub fn long_define(&mut self, inst: InstId) -> Result<Register> {
        self.reg_alloc.long_define(self.program, inst)
    }

    pub fn consume(&mut self, value: IrValue) -> Result<Value> {
        self.reg_alloc.consume(self.program, value)
    }

    pub fn consume_register(&mut self, value: IrValue) -> Result<Register> {
        Ok(Register(self.consume(value)?))
    }

    pub fn consume_scalar(&mut self, value: IrValue) -> Result<ScalarRegister> {
        Ok(ScalarRegister(self.consume(value)?))
    }

    pub fn consume_u32(&mut self, value: IrValue) -> Result<ScalarU32> {
        Ok(ScalarU32(self.consume(value)?))
    }

    pub fn consume_s32(&mut self, value: IrValue) -> Result<ScalarS32> {
        Ok(ScalarS32(self.consume(value)?))
    }

    pub fn consume_f32(&mut self, value: IrValue) -> Result<ScalarF32> {
        Ok(ScalarF32(self.consume(value)?))
    }

    pub fn consume_f64(&mut self, value: IrValue) -> Result<ScalarF64> {
        Ok(ScalarF64(self.consume(value)?))
    }
}
