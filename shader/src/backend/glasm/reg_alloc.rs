//! GLASM register allocation.
//!
//! Two pools of 4096 vec4 temporaries: 32-bit `R` registers and 64-bit `D`
//! registers. Values with no remaining uses land in the null registers
//! `RC`/`DC`. Aliasing opcodes reuse their source's register instead of
//! allocating.

use std::fmt;

use crate::error::{Error, Result};
use crate::ir::{InstId, Opcode, Program, Value as IrValue};

pub const NUM_REGS: usize = 4096;

/// Packed register id: `{valid, long, spill, condition-code, null, index}`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Id(u32);

impl Id {
    const VALID: u32 = 1 << 0;
    const LONG: u32 = 1 << 1;
    const SPILL: u32 = 1 << 2;
    const CONDITION_CODE: u32 = 1 << 3;
    const NULL: u32 = 1 << 4;
    const INDEX_SHIFT: u32 = 5;

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn from_raw(raw: u32) -> Id {
        Id(raw)
    }

    pub fn is_valid(self) -> bool {
        self.0 & Id::VALID != 0
    }

    pub fn is_long(self) -> bool {
        self.0 & Id::LONG != 0
    }

    pub fn is_spill(self) -> bool {
        self.0 & Id::SPILL != 0
    }

    pub fn is_condition_code(self) -> bool {
        self.0 & Id::CONDITION_CODE != 0
    }

    pub fn is_null(self) -> bool {
        self.0 & Id::NULL != 0
    }

    pub fn index(self) -> u32 {
        self.0 >> Id::INDEX_SHIFT
    }

    fn fmt_impl(self, f: &mut fmt::Formatter, scalar: bool) -> fmt::Result {
        debug_assert!(!self.is_condition_code());
        debug_assert!(!self.is_spill());
        let suffix = if scalar { ".x" } else { "" };
        if self.is_null() {
            let name = if self.is_long() { "DC" } else { "RC" };
            return write!(f, "{}{}", name, suffix);
        }
        let bank = if self.is_long() { "D" } else { "R" };
        write!(f, "{}{}{}", bank, self.index(), suffix)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Kind {
    Void,
    Register,
    U32,
    U64,
}

/// An emission operand: an allocated register or an inline immediate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Value {
    pub kind: Kind,
    pub id: Id,
    pub imm_u32: u32,
    pub imm_u64: u64,
}

impl Value {
    fn register(id: Id) -> Value {
        Value { kind: Kind::Register, id, imm_u32: 0, imm_u64: 0 }
    }
}

/// Vector operand (all four components).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Register(pub Value);

/// Scalar operand (`.x` component or immediate), printed as its type.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScalarRegister(pub Value);
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScalarU32(pub Value);
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScalarS32(pub Value);
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScalarF32(pub Value);
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScalarF64(pub Value);

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        debug_assert!(self.0.kind == Kind::Register);
        self.0.id.fmt_impl(f, false)
    }
}

impl fmt::Display for ScalarRegister {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        debug_assert!(self.0.kind == Kind::Register);
        self.0.id.fmt_impl(f, true)
    }
}

impl fmt::Display for ScalarU32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0.kind {
            Kind::Register => self.0.id.fmt_impl(f, true),
            Kind::U32 => write!(f, "{}", self.0.imm_u32),
            _ => panic!("invalid scalar U32 operand"),
        }
    }
}

impl fmt::Display for ScalarS32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0.kind {
            Kind::Register => self.0.id.fmt_impl(f, true),
            Kind::U32 => write!(f, "{}", self.0.imm_u32 as i32),
            _ => panic!("invalid scalar S32 operand"),
        }
    }
}

impl fmt::Display for ScalarF32 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0.kind {
            Kind::Register => self.0.id.fmt_impl(f, true),
            Kind::U32 => write!(f, "{}", f32::from_bits(self.0.imm_u32)),
            _ => panic!("invalid scalar F32 operand"),
        }
    }
}

impl fmt::Display for ScalarF64 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0.kind {
            Kind::Register => self.0.id.fmt_impl(f, true),
            Kind::U64 => write!(f, "{}", f64::from_bits(self.0.imm_u64)),
            _ => panic!("invalid scalar F64 operand"),
        }
    }
}

#[derive(Default)]
pub struct RegAlloc {
    num_used_registers: usize,
    num_used_long_registers: usize,
    register_use: Vec<bool>,
    long_register_use: Vec<bool>,
}

impl RegAlloc {
    pub fn new() -> RegAlloc {
        RegAlloc {
            num_used_registers: 0,
            num_used_long_registers: 0,
            register_use: vec![false; NUM_REGS],
            long_register_use: vec![false; NUM_REGS],
        }
    }

    pub fn define(&mut self, program: &mut Program, inst: InstId) -> Result<Register> {
        self.define_impl(program, inst, false)
    }

    pub fn long_define(&mut self, program: &mut Program, inst: InstId) -> Result<Register> {
        self.define_impl(program, inst, true)
    }

    pub fn peek(&self, program: &Program, value: IrValue) -> Result<Value> {
        match value.resolve(program) {
            IrValue::Inst(inst) => Ok(self.peek_inst(program, inst)),
            imm => make_imm(imm),
        }
    }

    pub fn consume(&mut self, program: &mut Program, value: IrValue) -> Result<Value> {
        match value.resolve(program) {
            IrValue::Inst(inst) => self.consume_inst(program, inst),
            imm => make_imm(imm),
        }
    }

    /// Removes one use and frees the register once nothing is left.
    pub fn unref(&mut self, program: &mut Program, inst: InstId) -> Result<()> {
        let value_inst = alias_inst(program, inst);
        program.inst_mut(value_inst).destructive_remove_usage();
        if !program.inst(value_inst).has_uses() {
            self.free(Id::from_raw(program.inst(value_inst).definition()))?;
        }
        Ok(())
    }

    pub fn alloc_reg(&mut self) -> Result<Register> {
        Ok(Register(Value::register(self.alloc(false)?)))
    }

    pub fn alloc_long_reg(&mut self) -> Result<Register> {
        Ok(Register(Value::register(self.alloc(true)?)))
    }

    pub fn free_reg(&mut self, reg: Register) -> Result<()> {
        self.free(reg.0.id)
    }

    pub fn invalidate_condition_codes(&self) {
        // This does nothing for now
    }

    pub fn num_used_registers(&self) -> usize {
        self.num_used_registers
    }

    pub fn num_used_long_registers(&self) -> usize {
        self.num_used_long_registers
    }

    fn define_impl(&mut self, program: &mut Program, inst: InstId, is_long: bool) -> Result<Register> {
        let id = if program.inst(inst).has_uses() {
            self.alloc(is_long)?
        } else {
            // Dead results write to the null register
            let mut raw = Id::NULL;
            if is_long {
                raw |= Id::LONG;
            }
            Id::from_raw(raw)
        };
        program.inst_mut(inst).set_definition(id.raw());
        Ok(Register(self.peek_inst(program, inst)))
    }

    fn peek_inst(&self, program: &Program, inst: InstId) -> Value {
        Value::register(Id::from_raw(program.inst(inst).definition()))
    }

    fn consume_inst(&mut self, program: &mut Program, inst: InstId) -> Result<Value> {
        self.unref(program, inst)?;
        Ok(self.peek_inst(program, inst))
    }

    fn alloc(&mut self, is_long: bool) -> Result<Id> {
        if self.num_used_registers + self.num_used_long_registers < NUM_REGS {
            let (use_map, num_regs) = if is_long {
                (&mut self.long_register_use, &mut self.num_used_long_registers)
            } else {
                (&mut self.register_use, &mut self.num_used_registers)
            };
            for reg in 0..NUM_REGS {
                if use_map[reg] {
                    continue;
                }
                *num_regs = (*num_regs).max(reg + 1);
                use_map[reg] = true;
                let mut raw = Id::VALID | ((reg as u32) << Id::INDEX_SHIFT);
                if is_long {
                    raw |= Id::LONG;
                }
                return Ok(Id::from_raw(raw));
            }
        }
        Err(Error::not_implemented("register spilling"))
    }

    fn free(&mut self, id: Id) -> Result<()> {
        if id.is_null() {
            return Ok(());
        }
        if !id.is_valid() {
            return Err(Error::logic("freeing invalid register"));
        }
        if id.is_spill() {
            return Err(Error::not_implemented("free spill"));
        }
        let use_map =
            if id.is_long() { &mut self.long_register_use } else { &mut self.register_use };
        use_map[id.index() as usize] = false;
        Ok(())
    }
}

/// Whether the instruction reuses its source's register.
pub fn is_aliased(program: &Program, inst: InstId) -> bool {
    matches!(
        program.inst(inst).opcode(),
        Opcode::Identity
            | Opcode::BitCastU16F16
            | Opcode::BitCastU32F32
            | Opcode::BitCastU64F64
            | Opcode::BitCastF16U16
            | Opcode::BitCastF32U32
            | Opcode::BitCastF64U64
    )
}

/// Walks back through aliasing producers to the value-carrying instruction.
pub fn alias_inst(program: &Program, inst: InstId) -> InstId {
    let mut current = inst;
    while is_aliased(program, current) {
        match program.arg(current, 0).resolve(program) {
            IrValue::Inst(producer) => current = producer,
            _ => break,
        }
    }
    current
}

fn make_imm(value: IrValue) -> Result<Value> {
    let mut ret = Value { kind: Kind::Void, id: Id::from_raw(0), imm_u32: 0, imm_u64: 0 };
    match value {
        IrValue::Void => {}
        IrValue::U1(imm) => {
            ret.kind = Kind::U32;
            ret.imm_u32 = if imm { 0xffff_ffff } else { 0 };
        }
        IrValue::U32(imm) => {
            ret.kind = Kind::U32;
            ret.imm_u32 = imm;
        }
        IrValue::F32(imm) => {
            ret.kind = Kind::U32;
            ret.imm_u32 = imm.0.to_bits();
        }
        IrValue::U64(imm) => {
            ret.kind = Kind::U64;
            ret.imm_u64 = imm;
        }
        IrValue::F64(imm) => {
            ret.kind = Kind::U64;
            ret.imm_u64 = imm.0.to_bits();
        }
        other => {
            return Err(Error::not_implemented(format!("immediate type {:?}", other)));
        }
    }
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_packing() {
        let mut raw = Id::VALID | Id::LONG | (37 << Id::INDEX_SHIFT);
        let id = Id::from_raw(raw);
        assert!(id.is_valid() && id.is_long() && !id.is_null());
        assert_eq!(id.index(), 37);
        raw |= Id::NULL;
        assert!(Id::from_raw(raw).is_null());
    }

    #[test]
    fn null_register_formatting() {
        let null_short = Register(Value::register(Id::from_raw(Id::NULL)));
        assert_eq!(null_short.to_string(), "RC");
        let null_long = Register(Value::register(Id::from_raw(Id::NULL | Id::LONG)));
        assert_eq!(null_long.to_string(), "DC");
        let real = ScalarRegister(Value::register(Id::from_raw(Id::VALID | (3 << Id::INDEX_SHIFT))));
        assert_eq!(real.to_string(), "R3.x");
    }
}
