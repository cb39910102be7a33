//! SSA construction.
//!
//! This implements the algorithm proposed in
//!
//!     Simple and Efficient Construction of Static Single Assignment Form.
//!     Braun M., Buchwald S., Hack S., Leiba R., Mallon C., Zwinkau A. (2013)
//!     In: Jhala R., De Bosschere K. (eds) Compiler Construction. CC 2013.
//!
//! The variable read is driven by an explicit frame stack instead of
//! recursion; deep predecessor chains would otherwise overflow the native
//! stack.

use fxhash::FxHashMap;
use smallvec::SmallVec;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::ir::{
    type_of, BlockId, InstId, Opcode, Pred, Program, Reg, Type, Value,
    NUM_USER_PREDS,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
enum Variable {
    Reg(Reg),
    Pred(Pred),
    ZeroFlag,
    SignFlag,
    CarryFlag,
    OverflowFlag,
    Goto(u32),
    IndirectBranch,
}

impl Variable {
    fn undef_opcode(self) -> Opcode {
        match self {
            Variable::Reg(_) | Variable::IndirectBranch => Opcode::UndefU32,
            _ => Opcode::UndefU1,
        }
    }
}

type ValueMap = FxHashMap<BlockId, Value>;

#[derive(Default)]
struct DefTable {
    preds: [ValueMap; NUM_USER_PREDS],
    goto_vars: FxHashMap<u32, ValueMap>,
    indirect_branch_var: ValueMap,
    zero_flag: ValueMap,
    sign_flag: ValueMap,
    carry_flag: ValueMap,
    overflow_flag: ValueMap,
}

impl DefTable {
    fn def(&self, program: &Program, block: BlockId, variable: Variable) -> Value {
        match variable {
            Variable::Reg(reg) => program.block(block).ssa_reg_value(reg.index()),
            Variable::Pred(pred) => copied(&self.preds[pred.index()], block),
            Variable::ZeroFlag => copied(&self.zero_flag, block),
            Variable::SignFlag => copied(&self.sign_flag, block),
            Variable::CarryFlag => copied(&self.carry_flag, block),
            Variable::OverflowFlag => copied(&self.overflow_flag, block),
            Variable::Goto(index) => self
                .goto_vars
                .get(&index)
                .map(|map| copied(map, block))
                .unwrap_or(Value::Void),
            Variable::IndirectBranch => copied(&self.indirect_branch_var, block),
        }
    }

    fn set_def(&mut self, program: &mut Program, block: BlockId, variable: Variable, value: Value) {
        match variable {
            Variable::Reg(reg) => {
                program.block_mut(block).set_ssa_reg_value(reg.index(), value)
            }
            Variable::Pred(pred) => {
                self.preds[pred.index()].insert(block, value);
            }
            Variable::ZeroFlag => {
                self.zero_flag.insert(block, value);
            }
            Variable::SignFlag => {
                self.sign_flag.insert(block, value);
            }
            Variable::CarryFlag => {
                self.carry_flag.insert(block, value);
            }
            Variable::OverflowFlag => {
                self.overflow_flag.insert(block, value);
            }
            Variable::Goto(index) => {
                self.goto_vars.entry(index).or_default().insert(block, value);
            }
            Variable::IndirectBranch => {
                self.indirect_branch_var.insert(block, value);
            }
        }
    }
}

fn copied(map: &ValueMap, block: BlockId) -> Value {
    map.get(&block).copied().unwrap_or(Value::Void)
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Status {
    Start,
    SetValue,
    PreparePhiArgument,
    PushPhiArgument,
}

#[derive(Copy, Clone)]
struct ReadState {
    block: BlockId,
    result: Value,
    phi: Option<InstId>,
    pred_index: usize,
    pred_count: usize,
    pc: Status,
}

impl ReadState {
    fn new(block: BlockId) -> ReadState {
        ReadState {
            block,
            result: Value::Void,
            phi: None,
            pred_index: 0,
            pred_count: 0,
            pc: Status::Start,
        }
    }
}

#[derive(Default)]
struct Pass {
    current_def: DefTable,
    incomplete_phis: FxHashMap<BlockId, BTreeMap<Variable, InstId>>,
}

impl Pass {
    fn write_variable(
        &mut self,
        program: &mut Program,
        variable: Variable,
        block: BlockId,
        value: Value,
    ) {
        self.current_def.set_def(program, block, variable, value);
    }

    fn read_variable(
        &mut self,
        program: &mut Program,
        variable: Variable,
        root_block: BlockId,
    ) -> Result<Value> {
        let mut stack: SmallVec<[ReadState; 64]> = SmallVec::new();
        stack.push(ReadState::new(root_block)); // sentinel result slot
        stack.push(ReadState::new(root_block));
        loop {
            let pc = stack.last().unwrap().pc;
            match pc {
                Status::Start => {
                    let block = stack.last().unwrap().block;
                    let def = self.current_def.def(program, block, variable);
                    if !def.is_empty() {
                        stack.last_mut().unwrap().result = def;
                        stack.last_mut().unwrap().pc = Status::SetValue;
                    } else if !program.block(block).is_ssa_sealed() {
                        // Incomplete CFG
                        let phi = self.prepend_phi(program, block, variable)?;
                        self.incomplete_phis
                            .entry(block)
                            .or_default()
                            .insert(variable, phi);
                        stack.last_mut().unwrap().result = Value::Inst(phi);
                        stack.last_mut().unwrap().pc = Status::SetValue;
                    } else {
                        let preds = program.block(block).imm_predecessors().to_vec();
                        if preds.len() == 1 {
                            // Common case of one predecessor: no phi needed
                            stack.last_mut().unwrap().pc = Status::SetValue;
                            stack.push(ReadState::new(preds[0]));
                        } else {
                            // Break potential cycles with an operandless phi
                            let phi = self.prepend_phi(program, block, variable)?;
                            self.write_variable(program, variable, block, Value::Inst(phi));
                            let frame = stack.last_mut().unwrap();
                            frame.phi = Some(phi);
                            frame.pred_index = 0;
                            frame.pred_count = preds.len();
                            self.prepare_phi_operand(program, variable, &mut stack)?;
                        }
                    }
                }
                Status::SetValue => {
                    let result = stack.last().unwrap().result;
                    let block = stack.last().unwrap().block;
                    self.write_variable(program, variable, block, result);
                    stack.pop();
                    stack.last_mut().unwrap().result = result;
                    if stack.len() == 1 {
                        return Ok(result);
                    }
                }
                Status::PushPhiArgument => {
                    let frame = *stack.last().unwrap();
                    let phi = frame.phi.expect("phi frame");
                    let pred =
                        program.block(frame.block).imm_predecessors()[frame.pred_index];
                    program.add_phi_operand(phi, pred, frame.result)?;
                    stack.last_mut().unwrap().pred_index += 1;
                    stack.last_mut().unwrap().pc = Status::PreparePhiArgument;
                }
                Status::PreparePhiArgument => {
                    self.prepare_phi_operand(program, variable, &mut stack)?;
                }
            }
            // A frame that produced a final result unwinds in SetValue; the
            // sentinel result is the answer once only it remains
            if stack.len() == 1 {
                return Ok(stack[0].result);
            }
        }
    }

    fn prepare_phi_operand(
        &mut self,
        program: &mut Program,
        variable: Variable,
        stack: &mut SmallVec<[ReadState; 64]>,
    ) -> Result<()> {
        let frame = *stack.last().unwrap();
        if frame.pred_index == frame.pred_count {
            let phi = frame.phi.expect("phi frame");
            let block = frame.block;
            let result = self.try_remove_trivial_phi(program, phi, block, variable.undef_opcode())?;
            stack.pop();
            stack.last_mut().unwrap().result = result;
            self.write_variable(program, variable, block, result);
        } else {
            let pred = program.block(frame.block).imm_predecessors()[frame.pred_index];
            stack.last_mut().unwrap().pc = Status::PushPhiArgument;
            stack.push(ReadState::new(pred));
        }
        Ok(())
    }

    fn prepend_phi(
        &mut self,
        program: &mut Program,
        block: BlockId,
        variable: Variable,
    ) -> Result<InstId> {
        let phi = program.insert_new_inst(block, 0, Opcode::Phi, 0, &[])?;
        let ty = type_of(variable.undef_opcode());
        program.inst_mut(phi).set_flags::<Type>(ty);
        Ok(phi)
    }

    fn seal_block(&mut self, program: &mut Program, block: BlockId) -> Result<()> {
        if let Some(incomplete) = self.incomplete_phis.remove(&block) {
            for (variable, phi) in incomplete {
                self.add_phi_operands(program, variable, phi, block)?;
            }
        }
        program.block_mut(block).ssa_seal();
        Ok(())
    }

    fn add_phi_operands(
        &mut self,
        program: &mut Program,
        variable: Variable,
        phi: InstId,
        block: BlockId,
    ) -> Result<Value> {
        let preds = program.block(block).imm_predecessors().to_vec();
        for pred in preds {
            let value = self.read_variable(program, variable, pred)?;
            program.add_phi_operand(phi, pred, value)?;
        }
        self.try_remove_trivial_phi(program, phi, block, variable.undef_opcode())
    }

    /// A phi whose operands all match a single value (or itself) forwards
    /// that value. The phi is pulled out of the block, re-inserted at the
    /// first non-phi position and rewritten into an identity; its users are
    /// left for later passes to simplify.
    fn try_remove_trivial_phi(
        &mut self,
        program: &mut Program,
        phi: InstId,
        block: BlockId,
        undef_opcode: Opcode,
    ) -> Result<Value> {
        let mut same = Value::Void;
        let num_args = program.inst(phi).num_args();
        for arg_index in 0..num_args {
            let op = program.arg(phi, arg_index);
            if op.resolve(program) == same.resolve(program) || op == Value::Inst(phi) {
                // Unique value or self-reference
                continue;
            }
            if !same.is_empty() {
                // The phi merges at least two values: not trivial
                return Ok(Value::Inst(phi));
            }
            same = op;
        }
        // Remove the phi node from the block; it will be reinserted
        let position = program
            .block(block)
            .instructions()
            .iter()
            .position(|&id| id == phi)
            .expect("phi not in its block");
        program.block_mut(block).insts.remove(position);

        // Find the first non-phi instruction as the reinsertion point
        let mut reinsert_point = program
            .block(block)
            .instructions()
            .iter()
            .position(|&id| program.inst(id).opcode() != Opcode::Phi)
            .unwrap_or_else(|| program.block(block).instructions().len());
        if same.is_empty() {
            // The phi is unreachable or in the start block; an undefined
            // value takes its place
            let undef = program.insert_new_inst(block, reinsert_point, undef_opcode, 0, &[])?;
            same = Value::Inst(undef);
            reinsert_point += 1;
        }
        // Reinsert the phi and reroute its uses
        program.block_mut(block).insts.insert(reinsert_point, phi);
        program.replace_uses_with(phi, same)?;
        Ok(same)
    }
}

fn visit_inst(pass: &mut Pass, program: &mut Program, block: BlockId, inst: InstId) -> Result<()> {
    let opcode = program.inst(inst).opcode();
    match opcode {
        Opcode::SetRegister => {
            let reg = program.arg(inst, 0).reg()?;
            if !reg.is_zero() {
                let value = program.arg(inst, 1);
                pass.write_variable(program, Variable::Reg(reg), block, value);
            }
        }
        Opcode::SetPred => {
            let pred = program.arg(inst, 0).pred()?;
            if !pred.is_true() {
                let value = program.arg(inst, 1);
                pass.write_variable(program, Variable::Pred(pred), block, value);
            }
        }
        Opcode::SetGotoVariable => {
            let index = program.arg(inst, 0).u32(program)?;
            let value = program.arg(inst, 1);
            pass.write_variable(program, Variable::Goto(index), block, value);
        }
        Opcode::SetIndirectBranchVariable => {
            let value = program.arg(inst, 0);
            pass.write_variable(program, Variable::IndirectBranch, block, value);
        }
        Opcode::SetZFlag => {
            let value = program.arg(inst, 0);
            pass.write_variable(program, Variable::ZeroFlag, block, value);
        }
        Opcode::SetSFlag => {
            let value = program.arg(inst, 0);
            pass.write_variable(program, Variable::SignFlag, block, value);
        }
        Opcode::SetCFlag => {
            let value = program.arg(inst, 0);
            pass.write_variable(program, Variable::CarryFlag, block, value);
        }
        Opcode::SetOFlag => {
            let value = program.arg(inst, 0);
            pass.write_variable(program, Variable::OverflowFlag, block, value);
        }
        Opcode::GetRegister => {
            let reg = program.arg(inst, 0).reg()?;
            if !reg.is_zero() {
                let value = pass.read_variable(program, Variable::Reg(reg), block)?;
                program.replace_uses_with(inst, value)?;
            }
        }
        Opcode::GetPred => {
            let pred = program.arg(inst, 0).pred()?;
            if !pred.is_true() {
                let value = pass.read_variable(program, Variable::Pred(pred), block)?;
                program.replace_uses_with(inst, value)?;
            }
        }
        Opcode::GetGotoVariable => {
            let index = program.arg(inst, 0).u32(program)?;
            let value = pass.read_variable(program, Variable::Goto(index), block)?;
            program.replace_uses_with(inst, value)?;
        }
        Opcode::GetIndirectBranchVariable => {
            let value = pass.read_variable(program, Variable::IndirectBranch, block)?;
            program.replace_uses_with(inst, value)?;
        }
        Opcode::GetZFlag => {
            let value = pass.read_variable(program, Variable::ZeroFlag, block)?;
            program.replace_uses_with(inst, value)?;
        }
        Opcode::GetSFlag => {
            let value = pass.read_variable(program, Variable::SignFlag, block)?;
            program.replace_uses_with(inst, value)?;
        }
        Opcode::GetCFlag => {
            let value = pass.read_variable(program, Variable::CarryFlag, block)?;
            program.replace_uses_with(inst, value)?;
        }
        Opcode::GetOFlag => {
            let value = pass.read_variable(program, Variable::OverflowFlag, block)?;
            program.replace_uses_with(inst, value)?;
        }
        _ => {}
    }
    Ok(())
}

pub fn ssa_rewrite_pass(program: &mut Program) -> Result<()> {
    let mut pass = Pass::default();
    let order: Vec<BlockId> = program.rpo().collect();
    for block in order {
        let insts = program.block(block).instructions().to_vec();
        for inst in insts {
            visit_inst(&mut pass, program, block, inst)?;
        }
        pass.seal_block(program, block)?;
    }
    Ok(())
}
