//! Basic blocks.

use crate::ir::reg::NUM_REGS;
use crate::ir::value::{BlockId, InstId, Value};

/// How control leaves a block.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlockEnd {
    /// Not terminated yet (decoder in progress).
    Unset,
    /// Shader exit.
    Return,
    Unconditional(BlockId),
    /// `cond` references a `ConditionRef` instruction in this block.
    Conditional { cond: Value, true_block: BlockId, false_block: BlockId },
    /// Branch through the indirect-branch variable; the successor set is
    /// the program's recorded branch-target table. `selector` references a
    /// `Reference` instruction pinning the target address.
    Indirect { selector: Value },
}

pub struct Block {
    /// Ordered arena indices of this block's instructions.
    pub(crate) insts: Vec<InstId>,
    pub(crate) imm_predecessors: Vec<BlockId>,
    pub(crate) imm_successors: Vec<BlockId>,
    pub(crate) end: BlockEnd,
    /// Guest code range this block was decoded from.
    pub(crate) begin_address: u64,
    pub(crate) end_address: u64,
    ssa_sealed: bool,
    ssa_reg_values: Vec<Value>,
}

impl Block {
    pub(crate) fn new(begin_address: u64) -> Block {
        Block {
            insts: Vec::new(),
            imm_predecessors: Vec::new(),
            imm_successors: Vec::new(),
            end: BlockEnd::Unset,
            begin_address,
            end_address: begin_address,
            ssa_sealed: false,
            ssa_reg_values: vec![Value::Void; NUM_REGS],
        }
    }

    pub fn instructions(&self) -> &[InstId] {
        &self.insts
    }

    pub fn imm_predecessors(&self) -> &[BlockId] {
        &self.imm_predecessors
    }

    pub fn imm_successors(&self) -> &[BlockId] {
        &self.imm_successors
    }

    pub fn end(&self) -> BlockEnd {
        self.end
    }

    pub fn begin_address(&self) -> u64 {
        self.begin_address
    }

    pub fn is_ssa_sealed(&self) -> bool {
        self.ssa_sealed
    }

    pub fn ssa_seal(&mut self) {
        self.ssa_sealed = true;
    }

    pub fn ssa_reg_value(&self, index: usize) -> Value {
        self.ssa_reg_values[index]
    }

    pub fn set_ssa_reg_value(&mut self, index: usize, value: Value) {
        self.ssa_reg_values[index] = value;
    }

    pub(crate) fn add_predecessor(&mut self, block: BlockId) {
        if !self.imm_predecessors.contains(&block) {
            self.imm_predecessors.push(block);
        }
    }
}
