//! The program: block list, instruction arena and bookkeeping operations.
//!
//! Instructions live in a flat arena owned by the program; arguments store
//! arena indices. All use-count and pseudo-instruction bookkeeping happens
//! through the methods here so the counts can never drift from the argument
//! slots.

use crate::error::{Error, Result};
use crate::info::Info;
use crate::ir::block::{Block, BlockEnd};
use crate::ir::inst::{Args, AssociatedInsts, Inst, MAX_ARGS};
use crate::ir::opcodes::{arg_type_of, name_of, Opcode};
use crate::ir::types::{are_types_compatible, name_of_type};
use crate::ir::value::{BlockId, InstId, Value};
use crate::stage::Stage;

pub struct Program {
    pub(crate) insts: Vec<Inst>,
    pub(crate) blocks: Vec<Block>,
    /// Layout order of the blocks, entry first.
    pub block_order: Vec<BlockId>,
    /// Post-order of the control-flow graph; reverse for RPO walks.
    pub post_order_blocks: Vec<BlockId>,
    /// Targets an indirect branch may resolve to.
    pub indirect_branch_targets: Vec<BlockId>,
    pub stage: Stage,
    pub local_memory_size: u32,
    pub shared_memory_size: u32,
    pub workgroup_size: [u32; 3],
    pub invocations: Option<u32>,
    pub info: Info,
}

impl Program {
    pub fn new(stage: Stage) -> Program {
        Program {
            insts: Vec::new(),
            blocks: Vec::new(),
            block_order: Vec::new(),
            post_order_blocks: Vec::new(),
            indirect_branch_targets: Vec::new(),
            stage,
            local_memory_size: 0,
            shared_memory_size: 0,
            workgroup_size: [1, 1, 1],
            invocations: None,
            info: Info::default(),
        }
    }

    //----------------------------------------------------------------------
    // Blocks

    pub fn alloc_block(&mut self, begin_address: u64) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new(begin_address));
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Reverse post-order block walk.
    pub fn rpo(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.post_order_blocks.iter().rev().copied()
    }

    /// Recomputes the post-order list with an iterative depth-first walk
    /// from the entry block.
    pub fn compute_post_order(&mut self) {
        self.post_order_blocks.clear();
        if self.block_order.is_empty() {
            return;
        }
        let entry = self.block_order[0];
        let mut visited = vec![false; self.blocks.len()];
        // (block, next successor index) frames
        let mut stack: Vec<(BlockId, usize)> = vec![(entry, 0)];
        visited[entry.index()] = true;
        while let Some(frame) = stack.last_mut() {
            let block = frame.0;
            let next = frame.1;
            frame.1 += 1;
            match self.blocks[block.index()].imm_successors.get(next).copied() {
                Some(succ) => {
                    if !visited[succ.index()] {
                        visited[succ.index()] = true;
                        stack.push((succ, 0));
                    }
                }
                None => {
                    self.post_order_blocks.push(block);
                    stack.pop();
                }
            }
        }
    }

    //----------------------------------------------------------------------
    // Instruction arena

    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id.index()]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Inst {
        &mut self.insts[id.index()]
    }

    fn alloc_inst(&mut self, op: Opcode, flags: u32) -> InstId {
        let id = InstId(self.insts.len() as u32);
        self.insts.push(Inst::new(op, flags));
        id
    }

    /// Appends a new instruction to the end of `block`.
    pub fn append_new_inst(
        &mut self,
        block: BlockId,
        op: Opcode,
        flags: u32,
        args: &[Value],
    ) -> Result<InstId> {
        let index = self.blocks[block.index()].insts.len();
        self.insert_new_inst(block, index, op, flags, args)
    }

    /// Inserts a new instruction at `position` within `block`'s list.
    pub fn insert_new_inst(
        &mut self,
        block: BlockId,
        position: usize,
        op: Opcode,
        flags: u32,
        args: &[Value],
    ) -> Result<InstId> {
        if args.len() > MAX_ARGS {
            return Err(Error::invalid_argument(format!(
                "too many arguments for {}",
                name_of(op)
            )));
        }
        let id = self.alloc_inst(op, flags);
        for (index, &arg) in args.iter().enumerate() {
            self.set_arg(id, index, arg)?;
        }
        self.blocks[block.index()].insts.insert(position, id);
        Ok(id)
    }

    pub fn arg(&self, id: InstId, index: usize) -> Value {
        self.inst(id).arg(index)
    }

    /// Replaces argument `index`, keeping use counts and pseudo-op slots in
    /// sync and validating the argument's type against the opcode table.
    pub fn set_arg(&mut self, id: InstId, index: usize, value: Value) -> Result<()> {
        let inst = self.inst(id);
        let op = inst.op;
        if index >= inst.num_args() {
            return Err(Error::invalid_argument(format!(
                "out of bounds argument index {} in opcode {}",
                index,
                name_of(op)
            )));
        }
        if op != Opcode::Phi {
            let declared = arg_type_of(op, index);
            let actual = value.ty(self);
            if !are_types_compatible(declared, actual) {
                return Err(Error::invalid_argument(format!(
                    "invalid type {} for argument {} of {}, expected {}",
                    name_of_type(actual),
                    index,
                    name_of(op),
                    name_of_type(declared)
                )));
            }
        }
        let old = self.inst(id).arg(index);
        if !old.is_immediate(self) {
            self.undo_use(id, old)?;
        }
        if !value.is_immediate(self) {
            self.track_use(id, value)?;
        }
        match &mut self.insts[id.index()].args {
            Args::Phi(args) => args[index].1 = value,
            Args::Fixed(args) => args[index] = value,
        }
        Ok(())
    }

    pub fn phi_block(&self, id: InstId, index: usize) -> Result<BlockId> {
        match &self.inst(id).args {
            Args::Phi(args) => args
                .get(index)
                .map(|(block, _)| *block)
                .ok_or_else(|| Error::invalid_argument("out of bounds phi operand index")),
            Args::Fixed(_) => Err(Error::logic(format!(
                "{} is not a phi instruction",
                name_of(self.inst(id).op)
            ))),
        }
    }

    pub fn add_phi_operand(&mut self, id: InstId, predecessor: BlockId, value: Value) -> Result<()> {
        if self.inst(id).op != Opcode::Phi {
            return Err(Error::logic("adding phi operand to non-phi instruction"));
        }
        if !value.is_immediate(self) {
            self.track_use(id, value)?;
        }
        match &mut self.insts[id.index()].args {
            Args::Phi(args) => args.push((predecessor, value)),
            Args::Fixed(_) => unreachable!(),
        }
        Ok(())
    }

    /// Drops all arguments (fixing use counts) and turns the instruction
    /// into `Void`.
    pub fn invalidate(&mut self, id: InstId) -> Result<()> {
        self.clear_args(id)?;
        self.replace_opcode(id, Opcode::Void)
    }

    pub fn clear_args(&mut self, id: InstId) -> Result<()> {
        for index in 0..self.inst(id).num_args() {
            let arg = self.inst(id).arg(index);
            if !arg.is_immediate(self) {
                self.undo_use(id, arg)?;
            }
        }
        match &mut self.insts[id.index()].args {
            Args::Phi(args) => args.clear(),
            Args::Fixed(args) => *args = [Value::Void; MAX_ARGS],
        }
        Ok(())
    }

    /// Rewrites the instruction into `Identity(replacement)`; readers reach
    /// the replacement transparently through identity resolution.
    pub fn replace_uses_with(&mut self, id: InstId, replacement: Value) -> Result<()> {
        self.invalidate(id)?;
        self.replace_opcode(id, Opcode::Identity)?;
        self.set_arg(id, 0, replacement)
    }

    pub fn replace_opcode(&mut self, id: InstId, op: Opcode) -> Result<()> {
        if op == Opcode::Phi {
            return Err(Error::logic("cannot transition into phi"));
        }
        let inst = &mut self.insts[id.index()];
        if inst.op == Opcode::Phi {
            inst.args = Args::Fixed([Value::Void; MAX_ARGS]);
        }
        inst.op = op;
        Ok(())
    }

    /// The registered consumer of `opcode` side results, if any.
    pub fn associated_pseudo_operation(&self, id: InstId, opcode: Opcode) -> Option<InstId> {
        let assoc = self.inst(id).assoc.as_ref()?;
        let slot = match opcode {
            Opcode::GetZeroFromOp => assoc.zero,
            Opcode::GetSignFromOp => assoc.sign,
            Opcode::GetCarryFromOp => assoc.carry,
            Opcode::GetOverflowFromOp => assoc.overflow,
            Opcode::GetSparseFromOp => assoc.sparse,
            Opcode::GetInBoundsFromOp => assoc.in_bounds,
            _ => {
                debug_assert!(false, "{} is not a pseudo-instruction", name_of(opcode));
                return None;
            }
        };
        debug_assert!(slot.map_or(true, |pseudo| self.inst(pseudo).op == opcode));
        slot
    }

    //----------------------------------------------------------------------
    // Use tracking

    fn track_use(&mut self, user: InstId, value: Value) -> Result<()> {
        let producer = match value {
            Value::Inst(id) => id,
            _ => return Ok(()),
        };
        let user_op = self.inst(user).op;
        self.insts[producer.index()].use_count += 1;
        if let Some(slot) = pseudo_slot(user_op) {
            let assoc = self.insts[producer.index()]
                .assoc
                .get_or_insert_with(|| Box::new(AssociatedInsts::default()));
            let entry = slot.get_mut(assoc);
            if entry.is_some() {
                return Err(Error::logic("only one of each type of pseudo-op allowed"));
            }
            *entry = Some(user);
        }
        Ok(())
    }

    fn undo_use(&mut self, user: InstId, value: Value) -> Result<()> {
        let producer = match value {
            Value::Inst(id) => id,
            _ => return Ok(()),
        };
        let user_op = self.inst(user).op;
        self.insts[producer.index()].use_count -= 1;
        if let Some(slot) = pseudo_slot(user_op) {
            let assoc = self.insts[producer.index()]
                .assoc
                .get_or_insert_with(|| Box::new(AssociatedInsts::default()));
            let entry = slot.get_mut(assoc);
            if entry.is_none() {
                return Err(Error::logic("undoing use of unregistered pseudo-op"));
            }
            *entry = None;
        }
        Ok(())
    }

    //----------------------------------------------------------------------
    // Block-end helpers

    pub fn set_block_end(&mut self, block: BlockId, end: BlockEnd) {
        match end {
            BlockEnd::Unconditional(target) => {
                self.blocks[block.index()].imm_successors = vec![target];
                self.blocks[target.index()].add_predecessor(block);
            }
            BlockEnd::Conditional { true_block, false_block, .. } => {
                self.blocks[block.index()].imm_successors = vec![true_block, false_block];
                self.blocks[true_block.index()].add_predecessor(block);
                self.blocks[false_block.index()].add_predecessor(block);
            }
            BlockEnd::Indirect { .. } => {
                let targets = self.indirect_branch_targets.clone();
                self.blocks[block.index()].imm_successors = targets.clone();
                for target in targets {
                    self.blocks[target.index()].add_predecessor(block);
                }
            }
            BlockEnd::Return | BlockEnd::Unset => {
                self.blocks[block.index()].imm_successors.clear();
            }
        }
        self.blocks[block.index()].end = end;
    }
}

enum PseudoSlot {
    Zero,
    Sign,
    Carry,
    Overflow,
    Sparse,
    InBounds,
}

impl PseudoSlot {
    fn get_mut<'a>(&self, assoc: &'a mut AssociatedInsts) -> &'a mut Option<InstId> {
        match self {
            PseudoSlot::Zero => &mut assoc.zero,
            PseudoSlot::Sign => &mut assoc.sign,
            PseudoSlot::Carry => &mut assoc.carry,
            PseudoSlot::Overflow => &mut assoc.overflow,
            PseudoSlot::Sparse => &mut assoc.sparse,
            PseudoSlot::InBounds => &mut assoc.in_bounds,
        }
    }
}

fn pseudo_slot(op: Opcode) -> Option<PseudoSlot> {
    match op {
        Opcode::GetZeroFromOp => Some(PseudoSlot::Zero),
        Opcode::GetSignFromOp => Some(PseudoSlot::Sign),
        Opcode::GetCarryFromOp => Some(PseudoSlot::Carry),
        Opcode::GetOverflowFromOp => Some(PseudoSlot::Overflow),
        Opcode::GetSparseFromOp => Some(PseudoSlot::Sparse),
        Opcode::GetInBoundsFromOp => Some(PseudoSlot::InBounds),
        _ => None,
    }
}
