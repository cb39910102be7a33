//! Construction facade over the instruction arena.
//!
//! Translators drive this; it validates argument types through the opcode
//! table and keeps the emission point at the end of the current block.

use crate::error::{Error, Result};
use crate::ir::condition::{Condition, FlowTest};
use crate::ir::modifiers::{FpControl, InstFlags, TextureInstInfo};
use crate::ir::opcodes::{name_of, type_of, Opcode};
use crate::ir::patch::Patch;
use crate::ir::pred::Pred;
use crate::ir::program::Program;
use crate::ir::reg::Reg;
use crate::ir::types::Type;
use crate::ir::value::{BlockId, Value};

pub struct IrEmitter<'a> {
    pub program: &'a mut Program,
    pub block: BlockId,
    insertion_point: Option<usize>,
}

impl<'a> IrEmitter<'a> {
    pub fn new(program: &'a mut Program, block: BlockId) -> IrEmitter<'a> {
        IrEmitter { program, block, insertion_point: None }
    }

    /// Emits before the instruction at `index` instead of at the block end.
    pub fn with_insertion_point(
        program: &'a mut Program,
        block: BlockId,
        index: usize,
    ) -> IrEmitter<'a> {
        IrEmitter { program, block, insertion_point: Some(index) }
    }

    //----------------------------------------------------------------------
    // Immediates

    pub fn imm1(&self, value: bool) -> Value {
        Value::U1(value)
    }

    pub fn imm8(&self, value: u8) -> Value {
        Value::U8(value)
    }

    pub fn imm16(&self, value: u16) -> Value {
        Value::U16(value)
    }

    pub fn imm32(&self, value: u32) -> Value {
        Value::U32(value)
    }

    pub fn imm32s(&self, value: i32) -> Value {
        Value::U32(value as u32)
    }

    pub fn imm32f(&self, value: f32) -> Value {
        Value::imm_f32(value)
    }

    pub fn imm64(&self, value: u64) -> Value {
        Value::U64(value)
    }

    pub fn imm64f(&self, value: f64) -> Value {
        Value::imm_f64(value)
    }

    //----------------------------------------------------------------------
    // Raw emission

    pub fn inst(&mut self, op: Opcode, args: &[Value]) -> Result<Value> {
        self.emit(op, 0, args)
    }

    pub fn inst_flags<T: InstFlags>(&mut self, op: Opcode, flags: T, args: &[Value]) -> Result<Value> {
        self.emit(op, flags.to_raw(), args)
    }

    fn emit(&mut self, op: Opcode, flags: u32, args: &[Value]) -> Result<Value> {
        let id = match self.insertion_point {
            Some(ref mut index) => {
                let id = self.program.insert_new_inst(self.block, *index, op, flags, args)?;
                *index += 1;
                id
            }
            None => self.program.append_new_inst(self.block, op, flags, args)?,
        };
        if type_of(op) == Type::VOID {
            Ok(Value::Void)
        } else {
            Ok(Value::Inst(id))
        }
    }

    //----------------------------------------------------------------------
    // Guest context

    pub fn get_register(&mut self, reg: Reg) -> Result<Value> {
        if reg.is_zero() {
            return Ok(self.imm32(0));
        }
        self.inst(Opcode::GetRegister, &[Value::Reg(reg)])
    }

    pub fn set_register(&mut self, reg: Reg, value: Value) -> Result<()> {
        if reg.is_zero() {
            // Writes to the zero register are discarded
            return Ok(());
        }
        self.inst(Opcode::SetRegister, &[Value::Reg(reg), value]).map(|_| ())
    }

    pub fn get_pred(&mut self, pred: Pred, is_negated: bool) -> Result<Value> {
        if pred.is_true() {
            return Ok(self.imm1(!is_negated));
        }
        let value = self.inst(Opcode::GetPred, &[Value::Pred(pred)])?;
        if is_negated {
            self.logical_not(value)
        } else {
            Ok(value)
        }
    }

    pub fn set_pred(&mut self, pred: Pred, value: Value) -> Result<()> {
        if pred.is_true() {
            return Ok(());
        }
        self.inst(Opcode::SetPred, &[Value::Pred(pred), value]).map(|_| ())
    }

    pub fn get_goto_variable(&mut self, index: u32) -> Result<Value> {
        let index = self.imm32(index);
        self.inst(Opcode::GetGotoVariable, &[index])
    }

    pub fn set_goto_variable(&mut self, index: u32, value: Value) -> Result<()> {
        let index = self.imm32(index);
        self.inst(Opcode::SetGotoVariable, &[index, value]).map(|_| ())
    }

    pub fn get_indirect_branch_variable(&mut self) -> Result<Value> {
        self.inst(Opcode::GetIndirectBranchVariable, &[])
    }

    pub fn set_indirect_branch_variable(&mut self, value: Value) -> Result<()> {
        self.inst(Opcode::SetIndirectBranchVariable, &[value]).map(|_| ())
    }

    pub fn get_cbuf(
        &mut self,
        binding: Value,
        byte_offset: Value,
        bitsize: u32,
        is_signed: bool,
    ) -> Result<Value> {
        let op = match (bitsize, is_signed) {
            (8, false) => Opcode::GetCbufU8,
            (8, true) => Opcode::GetCbufS8,
            (16, false) => Opcode::GetCbufU16,
            (16, true) => Opcode::GetCbufS16,
            (32, false) => Opcode::GetCbufU32,
            (64, false) => Opcode::GetCbufU32x2,
            _ => {
                return Err(Error::invalid_argument(format!("invalid bit size {}", bitsize)));
            }
        };
        self.inst(op, &[binding, byte_offset])
    }

    pub fn get_cbuf_u32(&mut self, binding: u32, byte_offset: u32) -> Result<Value> {
        let binding = self.imm32(binding);
        let byte_offset = self.imm32(byte_offset);
        self.inst(Opcode::GetCbufU32, &[binding, byte_offset])
    }

    pub fn get_float_cbuf(&mut self, binding: Value, byte_offset: Value) -> Result<Value> {
        self.inst(Opcode::GetCbufF32, &[binding, byte_offset])
    }

    pub fn get_zflag(&mut self) -> Result<Value> {
        self.inst(Opcode::GetZFlag, &[])
    }

    pub fn get_sflag(&mut self) -> Result<Value> {
        self.inst(Opcode::GetSFlag, &[])
    }

    pub fn get_cflag(&mut self) -> Result<Value> {
        self.inst(Opcode::GetCFlag, &[])
    }

    pub fn get_oflag(&mut self) -> Result<Value> {
        self.inst(Opcode::GetOFlag, &[])
    }

    pub fn set_zflag(&mut self, value: Value) -> Result<()> {
        self.inst(Opcode::SetZFlag, &[value]).map(|_| ())
    }

    pub fn set_sflag(&mut self, value: Value) -> Result<()> {
        self.inst(Opcode::SetSFlag, &[value]).map(|_| ())
    }

    pub fn set_cflag(&mut self, value: Value) -> Result<()> {
        self.inst(Opcode::SetCFlag, &[value]).map(|_| ())
    }

    pub fn set_oflag(&mut self, value: Value) -> Result<()> {
        self.inst(Opcode::SetOFlag, &[value]).map(|_| ())
    }

    pub fn get_attribute(&mut self, attribute: crate::ir::Attribute, vertex: Value) -> Result<Value> {
        self.inst(Opcode::GetAttribute, &[Value::Attribute(attribute), vertex])
    }

    pub fn set_attribute(
        &mut self,
        attribute: crate::ir::Attribute,
        value: Value,
        vertex: Value,
    ) -> Result<()> {
        self.inst(Opcode::SetAttribute, &[Value::Attribute(attribute), value, vertex])
            .map(|_| ())
    }

    pub fn get_attribute_indexed(&mut self, phys_address: Value, vertex: Value) -> Result<Value> {
        self.inst(Opcode::GetAttributeIndexed, &[phys_address, vertex])
    }

    pub fn set_attribute_indexed(
        &mut self,
        phys_address: Value,
        value: Value,
        vertex: Value,
    ) -> Result<()> {
        self.inst(Opcode::SetAttributeIndexed, &[phys_address, value, vertex]).map(|_| ())
    }

    pub fn get_patch(&mut self, patch: Patch) -> Result<Value> {
        self.inst(Opcode::GetPatch, &[Value::Patch(patch)])
    }

    pub fn set_patch(&mut self, patch: Patch, value: Value) -> Result<()> {
        self.inst(Opcode::SetPatch, &[Value::Patch(patch), value]).map(|_| ())
    }

    pub fn set_frag_color(&mut self, index: u32, component: u32, value: Value) -> Result<()> {
        let index = self.imm32(index);
        let component = self.imm32(component);
        self.inst(Opcode::SetFragColor, &[index, component, value]).map(|_| ())
    }

    pub fn set_frag_depth(&mut self, value: Value) -> Result<()> {
        self.inst(Opcode::SetFragDepth, &[value]).map(|_| ())
    }

    pub fn set_sample_mask(&mut self, value: Value) -> Result<()> {
        self.inst(Opcode::SetSampleMask, &[value]).map(|_| ())
    }

    pub fn local_invocation_id(&mut self) -> Result<Value> {
        self.inst(Opcode::LocalInvocationId, &[])
    }

    pub fn workgroup_id(&mut self) -> Result<Value> {
        self.inst(Opcode::WorkgroupId, &[])
    }

    pub fn lane_id(&mut self) -> Result<Value> {
        self.inst(Opcode::LaneId, &[])
    }

    //----------------------------------------------------------------------
    // Conditions

    fn flow_test(&mut self, flow_test: FlowTest) -> Result<Value> {
        match flow_test {
            FlowTest::F => Ok(self.imm1(false)),
            FlowTest::LT => {
                let s = self.get_sflag()?;
                let z = self.get_zflag()?;
                let nz = self.logical_not(z)?;
                let lhs = self.logical_and(s, nz)?;
                let o = self.get_oflag()?;
                self.logical_xor(lhs, o)
            }
            FlowTest::EQ => {
                let s = self.get_sflag()?;
                let ns = self.logical_not(s)?;
                let z = self.get_zflag()?;
                self.logical_and(ns, z)
            }
            FlowTest::LE => {
                let s = self.get_sflag()?;
                let z = self.get_zflag()?;
                let o = self.get_oflag()?;
                let zo = self.logical_or(z, o)?;
                self.logical_xor(s, zo)
            }
            FlowTest::GT => {
                let s = self.get_sflag()?;
                let ns = self.logical_not(s)?;
                let o = self.get_oflag()?;
                let nso = self.logical_xor(ns, o)?;
                let z = self.get_zflag()?;
                let nz = self.logical_not(z)?;
                self.logical_and(nso, nz)
            }
            FlowTest::NE => {
                let z = self.get_zflag()?;
                self.logical_not(z)
            }
            FlowTest::GE => {
                let s = self.get_sflag()?;
                let o = self.get_oflag()?;
                let so = self.logical_xor(s, o)?;
                self.logical_not(so)
            }
            FlowTest::NUM => {
                let s = self.get_sflag()?;
                let ns = self.logical_not(s)?;
                let z = self.get_zflag()?;
                let nz = self.logical_not(z)?;
                self.logical_or(ns, nz)
            }
            FlowTest::NaN => {
                let s = self.get_sflag()?;
                let z = self.get_zflag()?;
                self.logical_and(s, z)
            }
            FlowTest::LTU => {
                let s = self.get_sflag()?;
                let o = self.get_oflag()?;
                self.logical_xor(s, o)
            }
            FlowTest::EQU => self.get_zflag(),
            FlowTest::LEU => {
                let s = self.get_sflag()?;
                let o = self.get_oflag()?;
                let so = self.logical_xor(s, o)?;
                let z = self.get_zflag()?;
                self.logical_or(so, z)
            }
            FlowTest::GTU => {
                let s = self.get_sflag()?;
                let ns = self.logical_not(s)?;
                let z = self.get_zflag()?;
                let o = self.get_oflag()?;
                let zo = self.logical_or(z, o)?;
                self.logical_xor(ns, zo)
            }
            FlowTest::NEU => {
                let s = self.get_sflag()?;
                let z = self.get_zflag()?;
                let nz = self.logical_not(z)?;
                self.logical_or(s, nz)
            }
            FlowTest::GEU => {
                let s = self.get_sflag()?;
                let ns = self.logical_not(s)?;
                let z = self.get_zflag()?;
                let nsz = self.logical_or(ns, z)?;
                let o = self.get_oflag()?;
                self.logical_xor(nsz, o)
            }
            FlowTest::T => Ok(self.imm1(true)),
            FlowTest::OFF => {
                let o = self.get_oflag()?;
                self.logical_not(o)
            }
            FlowTest::LO => {
                let c = self.get_cflag()?;
                self.logical_not(c)
            }
            FlowTest::SFF => {
                let s = self.get_sflag()?;
                self.logical_not(s)
            }
            FlowTest::LS => {
                let z = self.get_zflag()?;
                let c = self.get_cflag()?;
                let nc = self.logical_not(c)?;
                self.logical_or(z, nc)
            }
            FlowTest::HI => {
                let c = self.get_cflag()?;
                let z = self.get_zflag()?;
                let nz = self.logical_not(z)?;
                self.logical_and(c, nz)
            }
            FlowTest::SFT => self.get_sflag(),
            FlowTest::HS => self.get_cflag(),
            FlowTest::OFT => self.get_oflag(),
            FlowTest::RLE => {
                let s = self.get_sflag()?;
                let z = self.get_zflag()?;
                self.logical_or(s, z)
            }
            FlowTest::RGT => {
                let s = self.get_sflag()?;
                let ns = self.logical_not(s)?;
                let z = self.get_zflag()?;
                let nz = self.logical_not(z)?;
                self.logical_and(ns, nz)
            }
            FlowTest::FcsmTr => {
                warn!("(STUBBED) FCSM_TR");
                Ok(self.imm1(false))
            }
            other => Err(Error::not_implemented(format!("flow test {}", other))),
        }
    }

    /// Lowers a guest condition to a `U1` value. The flow test result is
    /// visible to the caller for standalone use.
    pub fn condition(&mut self, cond: Condition) -> Result<Value> {
        let (pred, is_negated) = cond.pred();
        let pred_value = self.get_pred(pred, is_negated)?;
        if cond.flow_test() == FlowTest::T {
            return Ok(pred_value);
        }
        let test = self.flow_test(cond.flow_test())?;
        self.logical_and(pred_value, test)
    }

    pub fn get_flow_test_result(&mut self, test: FlowTest) -> Result<Value> {
        self.flow_test(test)
    }

    //----------------------------------------------------------------------
    // Logicals

    pub fn logical_or(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::LogicalOr, &[a, b])
    }

    pub fn logical_and(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::LogicalAnd, &[a, b])
    }

    pub fn logical_xor(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::LogicalXor, &[a, b])
    }

    pub fn logical_not(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::LogicalNot, &[value])
    }

    //----------------------------------------------------------------------
    // Integer arithmetic

    pub fn iadd(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::IAdd32, &[a, b])
    }

    pub fn isub(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::ISub32, &[a, b])
    }

    pub fn imul(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::IMul32, &[a, b])
    }

    pub fn ineg(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::INeg32, &[value])
    }

    pub fn iabs(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::IAbs32, &[value])
    }

    pub fn shift_left_logical(&mut self, base: Value, shift: Value) -> Result<Value> {
        self.inst(Opcode::ShiftLeftLogical32, &[base, shift])
    }

    pub fn shift_right_logical(&mut self, base: Value, shift: Value) -> Result<Value> {
        self.inst(Opcode::ShiftRightLogical32, &[base, shift])
    }

    pub fn shift_right_arithmetic(&mut self, base: Value, shift: Value) -> Result<Value> {
        self.inst(Opcode::ShiftRightArithmetic32, &[base, shift])
    }

    pub fn bitwise_and(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::BitwiseAnd32, &[a, b])
    }

    pub fn bitwise_or(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::BitwiseOr32, &[a, b])
    }

    pub fn bitwise_xor(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::BitwiseXor32, &[a, b])
    }

    pub fn bitwise_not(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::BitwiseNot32, &[value])
    }

    pub fn bit_field_extract(
        &mut self,
        base: Value,
        offset: Value,
        count: Value,
        is_signed: bool,
    ) -> Result<Value> {
        let op = if is_signed { Opcode::BitFieldSExtract } else { Opcode::BitFieldUExtract };
        self.inst(op, &[base, offset, count])
    }

    pub fn bit_field_insert(
        &mut self,
        base: Value,
        insert: Value,
        offset: Value,
        count: Value,
    ) -> Result<Value> {
        self.inst(Opcode::BitFieldInsert, &[base, insert, offset, count])
    }

    pub fn bit_count(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::BitCount32, &[value])
    }

    pub fn find_msb(&mut self, value: Value, is_signed: bool) -> Result<Value> {
        let op = if is_signed { Opcode::FindSMsb32 } else { Opcode::FindUMsb32 };
        self.inst(op, &[value])
    }

    pub fn imin(&mut self, a: Value, b: Value, is_signed: bool) -> Result<Value> {
        let op = if is_signed { Opcode::SMin32 } else { Opcode::UMin32 };
        self.inst(op, &[a, b])
    }

    pub fn imax(&mut self, a: Value, b: Value, is_signed: bool) -> Result<Value> {
        let op = if is_signed { Opcode::SMax32 } else { Opcode::UMax32 };
        self.inst(op, &[a, b])
    }

    pub fn iless_than(&mut self, a: Value, b: Value, is_signed: bool) -> Result<Value> {
        let op = if is_signed { Opcode::SLessThan } else { Opcode::ULessThan };
        self.inst(op, &[a, b])
    }

    pub fn iequal(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::IEqual, &[a, b])
    }

    pub fn iless_than_equal(&mut self, a: Value, b: Value, is_signed: bool) -> Result<Value> {
        let op = if is_signed { Opcode::SLessThanEqual } else { Opcode::ULessThanEqual };
        self.inst(op, &[a, b])
    }

    pub fn igreater_than(&mut self, a: Value, b: Value, is_signed: bool) -> Result<Value> {
        let op = if is_signed { Opcode::SGreaterThan } else { Opcode::UGreaterThan };
        self.inst(op, &[a, b])
    }

    pub fn inot_equal(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::INotEqual, &[a, b])
    }

    pub fn igreater_than_equal(&mut self, a: Value, b: Value, is_signed: bool) -> Result<Value> {
        let op = if is_signed { Opcode::SGreaterThanEqual } else { Opcode::UGreaterThanEqual };
        self.inst(op, &[a, b])
    }

    //----------------------------------------------------------------------
    // Floating point

    pub fn fp_add(&mut self, control: FpControl, a: Value, b: Value) -> Result<Value> {
        self.inst_flags(Opcode::FPAdd32, control, &[a, b])
    }

    pub fn fp_mul(&mut self, control: FpControl, a: Value, b: Value) -> Result<Value> {
        self.inst_flags(Opcode::FPMul32, control, &[a, b])
    }

    pub fn fp_fma(&mut self, control: FpControl, a: Value, b: Value, c: Value) -> Result<Value> {
        self.inst_flags(Opcode::FPFma32, control, &[a, b, c])
    }

    pub fn fp_min(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::FPMin32, &[a, b])
    }

    pub fn fp_max(&mut self, a: Value, b: Value) -> Result<Value> {
        self.inst(Opcode::FPMax32, &[a, b])
    }

    pub fn fp_abs(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::FPAbs32, &[value])
    }

    pub fn fp_neg(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::FPNeg32, &[value])
    }

    pub fn fp_saturate(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::FPSaturate32, &[value])
    }

    pub fn fp_sin(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::FPSin, &[value])
    }

    pub fn fp_cos(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::FPCos, &[value])
    }

    pub fn fp_exp2(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::FPExp2, &[value])
    }

    pub fn fp_log2(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::FPLog2, &[value])
    }

    pub fn fp_recip(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::FPRecip32, &[value])
    }

    pub fn fp_recip_sqrt(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::FPRecipSqrt32, &[value])
    }

    pub fn fp_sqrt(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::FPSqrt, &[value])
    }

    /// Ordered/unordered FP32 comparison by guest comparison index.
    pub fn fp_compare(&mut self, op: Opcode, a: Value, b: Value) -> Result<Value> {
        match op {
            Opcode::FPOrdEqual32
            | Opcode::FPUnordEqual32
            | Opcode::FPOrdNotEqual32
            | Opcode::FPUnordNotEqual32
            | Opcode::FPOrdLessThan32
            | Opcode::FPUnordLessThan32
            | Opcode::FPOrdGreaterThan32
            | Opcode::FPUnordGreaterThan32
            | Opcode::FPOrdLessThanEqual32
            | Opcode::FPUnordLessThanEqual32
            | Opcode::FPOrdGreaterThanEqual32
            | Opcode::FPUnordGreaterThanEqual32 => self.inst(op, &[a, b]),
            _ => Err(Error::invalid_argument(format!("{} is not an FP comparison", name_of(op)))),
        }
    }

    //----------------------------------------------------------------------
    // Select and composites

    pub fn select(&mut self, cond: Value, true_value: Value, false_value: Value) -> Result<Value> {
        let ty = true_value.ty(self.program);
        let op = match ty {
            Type::U1 => Opcode::SelectU1,
            Type::U8 => Opcode::SelectU8,
            Type::U16 => Opcode::SelectU16,
            Type::U32 => Opcode::SelectU32,
            Type::U64 => Opcode::SelectU64,
            Type::F16 => Opcode::SelectF16,
            Type::F32 => Opcode::SelectF32,
            Type::F64 => Opcode::SelectF64,
            other => {
                return Err(Error::invalid_argument(format!(
                    "cannot select on type {}",
                    other
                )));
            }
        };
        self.inst(op, &[cond, true_value, false_value])
    }

    pub fn composite_construct_u32x2(&mut self, e0: Value, e1: Value) -> Result<Value> {
        self.inst(Opcode::CompositeConstructU32x2, &[e0, e1])
    }

    pub fn composite_extract(&mut self, vector: Value, element: u32) -> Result<Value> {
        let op = match vector.ty(self.program) {
            Type::U32X2 => Opcode::CompositeExtractU32x2,
            Type::U32X3 => Opcode::CompositeExtractU32x3,
            Type::U32X4 => Opcode::CompositeExtractU32x4,
            Type::F16X2 => Opcode::CompositeExtractF16x2,
            Type::F16X3 => Opcode::CompositeExtractF16x3,
            Type::F16X4 => Opcode::CompositeExtractF16x4,
            Type::F32X2 => Opcode::CompositeExtractF32x2,
            Type::F32X3 => Opcode::CompositeExtractF32x3,
            Type::F32X4 => Opcode::CompositeExtractF32x4,
            Type::F64X2 => Opcode::CompositeExtractF64x2,
            Type::F64X3 => Opcode::CompositeExtractF64x3,
            Type::F64X4 => Opcode::CompositeExtractF64x4,
            other => {
                return Err(Error::invalid_argument(format!(
                    "invalid type {} for composite extract",
                    other
                )));
            }
        };
        let element = self.imm32(element);
        self.inst(op, &[vector, element])
    }

    pub fn pack_uint2x32(&mut self, vector: Value) -> Result<Value> {
        self.inst(Opcode::PackUint2x32, &[vector])
    }

    pub fn unpack_uint2x32(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::UnpackUint2x32, &[value])
    }

    pub fn bitcast_u32_f32(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::BitCastF32U32, &[value])
    }

    pub fn bitcast_f32_u32(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::BitCastU32F32, &[value])
    }

    //----------------------------------------------------------------------
    // Memory

    pub fn load_global(&mut self, address: Value, size: u32, is_signed: bool) -> Result<Value> {
        let op = match (size, is_signed) {
            (8, false) => Opcode::LoadGlobalU8,
            (8, true) => Opcode::LoadGlobalS8,
            (16, false) => Opcode::LoadGlobalU16,
            (16, true) => Opcode::LoadGlobalS16,
            (32, _) => Opcode::LoadGlobal32,
            (64, _) => Opcode::LoadGlobal64,
            (128, _) => Opcode::LoadGlobal128,
            _ => return Err(Error::invalid_argument(format!("invalid global load size {}", size))),
        };
        self.inst(op, &[address])
    }

    pub fn write_global(&mut self, address: Value, value: Value, size: u32, is_signed: bool) -> Result<()> {
        let op = match (size, is_signed) {
            (8, false) => Opcode::WriteGlobalU8,
            (8, true) => Opcode::WriteGlobalS8,
            (16, false) => Opcode::WriteGlobalU16,
            (16, true) => Opcode::WriteGlobalS16,
            (32, _) => Opcode::WriteGlobal32,
            (64, _) => Opcode::WriteGlobal64,
            (128, _) => Opcode::WriteGlobal128,
            _ => return Err(Error::invalid_argument(format!("invalid global store size {}", size))),
        };
        self.inst(op, &[address, value]).map(|_| ())
    }

    pub fn load_local(&mut self, word_offset: Value) -> Result<Value> {
        self.inst(Opcode::LoadLocal, &[word_offset])
    }

    pub fn write_local(&mut self, word_offset: Value, value: Value) -> Result<()> {
        self.inst(Opcode::WriteLocal, &[word_offset, value]).map(|_| ())
    }

    pub fn load_shared(&mut self, offset: Value, size: u32, is_signed: bool) -> Result<Value> {
        let op = match (size, is_signed) {
            (8, false) => Opcode::LoadSharedU8,
            (8, true) => Opcode::LoadSharedS8,
            (16, false) => Opcode::LoadSharedU16,
            (16, true) => Opcode::LoadSharedS16,
            (32, _) => Opcode::LoadSharedU32,
            (64, _) => Opcode::LoadSharedU64,
            (128, _) => Opcode::LoadSharedU128,
            _ => return Err(Error::invalid_argument(format!("invalid shared load size {}", size))),
        };
        self.inst(op, &[offset])
    }

    pub fn write_shared(&mut self, offset: Value, value: Value, size: u32) -> Result<()> {
        let op = match size {
            8 => Opcode::WriteSharedU8,
            16 => Opcode::WriteSharedU16,
            32 => Opcode::WriteSharedU32,
            64 => Opcode::WriteSharedU64,
            128 => Opcode::WriteSharedU128,
            _ => return Err(Error::invalid_argument(format!("invalid shared store size {}", size))),
        };
        self.inst(op, &[offset, value]).map(|_| ())
    }

    //----------------------------------------------------------------------
    // Textures

    pub fn image_sample_implicit_lod(
        &mut self,
        handle: Value,
        coords: Value,
        bias_lc: Value,
        offset: Value,
        info: TextureInstInfo,
    ) -> Result<Value> {
        let op = if handle.is_immediate(self.program) {
            Opcode::BoundImageSampleImplicitLod
        } else {
            Opcode::BindlessImageSampleImplicitLod
        };
        self.inst_flags(op, info, &[handle, coords, bias_lc, offset])
    }

    pub fn image_sample_explicit_lod(
        &mut self,
        handle: Value,
        coords: Value,
        lod_lc: Value,
        offset: Value,
        info: TextureInstInfo,
    ) -> Result<Value> {
        let op = if handle.is_immediate(self.program) {
            Opcode::BoundImageSampleExplicitLod
        } else {
            Opcode::BindlessImageSampleExplicitLod
        };
        self.inst_flags(op, info, &[handle, coords, lod_lc, offset])
    }

    pub fn image_sample_dref_implicit_lod(
        &mut self,
        handle: Value,
        coords: Value,
        dref: Value,
        bias_lc: Value,
        offset: Value,
        info: TextureInstInfo,
    ) -> Result<Value> {
        let op = if handle.is_immediate(self.program) {
            Opcode::BoundImageSampleDrefImplicitLod
        } else {
            Opcode::BindlessImageSampleDrefImplicitLod
        };
        self.inst_flags(op, info, &[handle, coords, dref, bias_lc, offset])
    }

    //----------------------------------------------------------------------
    // Pseudo consumers

    pub fn get_zero_from_op(&mut self, op: Value) -> Result<Value> {
        self.inst(Opcode::GetZeroFromOp, &[op])
    }

    pub fn get_sign_from_op(&mut self, op: Value) -> Result<Value> {
        self.inst(Opcode::GetSignFromOp, &[op])
    }

    pub fn get_carry_from_op(&mut self, op: Value) -> Result<Value> {
        self.inst(Opcode::GetCarryFromOp, &[op])
    }

    pub fn get_overflow_from_op(&mut self, op: Value) -> Result<Value> {
        self.inst(Opcode::GetOverflowFromOp, &[op])
    }

    //----------------------------------------------------------------------
    // Structure

    pub fn prologue(&mut self) -> Result<()> {
        self.inst(Opcode::Prologue, &[]).map(|_| ())
    }

    pub fn epilogue(&mut self) -> Result<()> {
        self.inst(Opcode::Epilogue, &[]).map(|_| ())
    }

    pub fn join(&mut self) -> Result<()> {
        self.inst(Opcode::Join, &[]).map(|_| ())
    }

    pub fn demote_to_helper_invocation(&mut self) -> Result<()> {
        self.inst(Opcode::DemoteToHelperInvocation, &[]).map(|_| ())
    }

    pub fn barrier(&mut self) -> Result<()> {
        self.inst(Opcode::Barrier, &[]).map(|_| ())
    }

    /// A `ConditionRef` pins a branch condition so SSA rewriting keeps it
    /// alive for the block end.
    pub fn condition_ref(&mut self, value: Value) -> Result<Value> {
        self.inst(Opcode::ConditionRef, &[value])
    }

    pub fn undef(&mut self, ty: Type) -> Result<Value> {
        let op = match ty {
            Type::U1 => Opcode::UndefU1,
            Type::U8 => Opcode::UndefU8,
            Type::U16 => Opcode::UndefU16,
            Type::U32 => Opcode::UndefU32,
            Type::U64 => Opcode::UndefU64,
            other => {
                return Err(Error::invalid_argument(format!("cannot undef type {}", other)));
            }
        };
        self.inst(op, &[])
    }
}
