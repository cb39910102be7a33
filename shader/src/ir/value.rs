//! IR values: immediates, guest state references and instruction results.

use ordered_float::OrderedFloat;
use std::fmt;

use crate::error::{Error, Result};
use crate::ir::attribute::Attribute;
use crate::ir::opcodes::Opcode;
use crate::ir::patch::Patch;
use crate::ir::pred::Pred;
use crate::ir::program::Program;
use crate::ir::reg::Reg;
use crate::ir::types::Type;

/// Index of an instruction in its program's arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct InstId(pub(crate) u32);

impl InstId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Index of a block in its program.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> BlockId {
        BlockId(index as u32)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// A trivially copyable tagged value. Instruction references are arena
/// indices; everything else is an immediate payload.
#[derive(Copy, Clone, Debug)]
pub enum Value {
    Void,
    Inst(InstId),
    Reg(Reg),
    Pred(Pred),
    Attribute(Attribute),
    Patch(Patch),
    U1(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(OrderedFloat<f32>),
    F64(OrderedFloat<f64>),
}

impl Value {
    pub fn imm_f32(value: f32) -> Value {
        Value::F32(OrderedFloat(value))
    }

    pub fn imm_f64(value: f64) -> Value {
        Value::F64(OrderedFloat(value))
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Value::Void)
    }

    /// The tag's type, without consulting any producing instruction.
    pub fn raw_type(self) -> Type {
        match self {
            Value::Void => Type::VOID,
            Value::Inst(_) => Type::OPAQUE,
            Value::Reg(_) => Type::REG,
            Value::Pred(_) => Type::PRED,
            Value::Attribute(_) => Type::ATTRIBUTE,
            Value::Patch(_) => Type::PATCH,
            Value::U1(_) => Type::U1,
            Value::U8(_) => Type::U8,
            Value::U16(_) => Type::U16,
            Value::U32(_) => Type::U32,
            Value::U64(_) => Type::U64,
            Value::F32(_) => Type::F32,
            Value::F64(_) => Type::F64,
        }
    }

    pub fn inst(self) -> Option<InstId> {
        match self {
            Value::Inst(id) => Some(id),
            _ => None,
        }
    }

    /// Resolved type: phi types come from the flags word, identity chains
    /// are descended, other instruction results use the opcode table.
    pub fn ty(self, program: &Program) -> Type {
        match self {
            Value::Inst(id) => {
                let inst = program.inst(id);
                match inst.opcode() {
                    Opcode::Phi => inst.flags::<Type>(),
                    Opcode::Identity => inst.arg(0).ty(program),
                    op => crate::ir::opcodes::type_of(op),
                }
            }
            other => other.raw_type(),
        }
    }

    pub fn is_identity(self, program: &Program) -> bool {
        match self {
            Value::Inst(id) => program.inst(id).opcode() == Opcode::Identity,
            _ => false,
        }
    }

    pub fn is_phi(self, program: &Program) -> bool {
        match self {
            Value::Inst(id) => program.inst(id).opcode() == Opcode::Phi,
            _ => false,
        }
    }

    /// True when the value is not (even transitively) an instruction result.
    pub fn is_immediate(self, program: &Program) -> bool {
        let mut current = self;
        loop {
            match current {
                Value::Inst(id) => {
                    let inst = program.inst(id);
                    if inst.opcode() != Opcode::Identity {
                        return false;
                    }
                    current = inst.arg(0);
                }
                _ => return true,
            }
        }
    }

    /// Descends `Identity` chains to the value they forward.
    pub fn resolve(self, program: &Program) -> Value {
        let mut current = self;
        while let Value::Inst(id) = current {
            let inst = program.inst(id);
            if inst.opcode() != Opcode::Identity {
                break;
            }
            current = inst.arg(0);
        }
        current
    }

    /// Producing instruction after identity resolution.
    pub fn inst_recursive(self, program: &Program) -> Option<InstId> {
        self.resolve(program).inst()
    }

    pub fn reg(self) -> Result<Reg> {
        match self {
            Value::Reg(reg) => Ok(reg),
            _ => Err(Error::logic("value is not a register")),
        }
    }

    pub fn pred(self) -> Result<Pred> {
        match self {
            Value::Pred(pred) => Ok(pred),
            _ => Err(Error::logic("value is not a predicate")),
        }
    }

    pub fn attribute(self) -> Result<Attribute> {
        match self {
            Value::Attribute(attribute) => Ok(attribute),
            _ => Err(Error::logic("value is not an attribute")),
        }
    }

    pub fn patch(self) -> Result<Patch> {
        match self {
            Value::Patch(patch) => Ok(patch),
            _ => Err(Error::logic("value is not a patch")),
        }
    }

    pub fn u1(self, program: &Program) -> Result<bool> {
        match self.resolve(program) {
            Value::U1(value) => Ok(value),
            other => Err(Error::logic(format!("{:?} is not a U1 immediate", other))),
        }
    }

    pub fn u32(self, program: &Program) -> Result<u32> {
        match self.resolve(program) {
            Value::U32(value) => Ok(value),
            other => Err(Error::logic(format!("{:?} is not a U32 immediate", other))),
        }
    }

    pub fn u64(self, program: &Program) -> Result<u64> {
        match self.resolve(program) {
            Value::U64(value) => Ok(value),
            other => Err(Error::logic(format!("{:?} is not a U64 immediate", other))),
        }
    }

    pub fn f32(self, program: &Program) -> Result<f32> {
        match self.resolve(program) {
            Value::F32(value) => Ok(value.0),
            other => Err(Error::logic(format!("{:?} is not an F32 immediate", other))),
        }
    }

    pub fn f64(self, program: &Program) -> Result<f64> {
        match self.resolve(program) {
            Value::F64(value) => Ok(value.0),
            other => Err(Error::logic(format!("{:?} is not an F64 immediate", other))),
        }
    }
}

/// Structural equality. Floats compare by bit pattern, instruction results
/// by arena identity.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (*self, *other) {
            (Value::Void, Value::Void) => true,
            (Value::Inst(a), Value::Inst(b)) => a == b,
            (Value::Reg(a), Value::Reg(b)) => a == b,
            (Value::Pred(a), Value::Pred(b)) => a == b,
            (Value::Attribute(a), Value::Attribute(b)) => a == b,
            (Value::Patch(a), Value::Patch(b)) => a == b,
            (Value::U1(a), Value::U1(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.0.to_bits() == b.0.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.0.to_bits() == b.0.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Default for Value {
    fn default() -> Value {
        Value::Void
    }
}
