//! Control-flow graph construction over the decoded instruction stream.

use std::collections::{BTreeMap, BTreeSet};

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::frontend::decode::{decode, is_sched_word, GuestOpcode};
use crate::frontend::translate::{guard_pred, translate_instruction};
use crate::ir::{
    BlockEnd, BlockId, Condition, FlowTest, IrEmitter, Pred, Program, Reg, Value,
};

/// Upper bound on scanned instructions; a runaway scan means the stream
/// never reached an exit.
const MAX_INSTRUCTIONS: u64 = 0x40000;

#[derive(Copy, Clone, Debug)]
enum Terminator {
    Exit { cond: Condition },
    Branch { target: u64, cond: Condition },
    /// SYNC/BRK resolved against the recorded SSY/PBK target.
    Resync { target: u64 },
    Indirect { reg: Reg, offset: i64 },
}

fn branch_offset(insn: u64) -> i64 {
    let raw = ((insn >> 20) & 0xff_ffff) as u32;
    i64::from(((raw << 8) as i32) >> 8)
}

fn branch_condition(insn: u64) -> Condition {
    let (pred, neg) = guard_pred(insn);
    Condition::new(FlowTest::decode(insn), pred, neg)
}

fn is_unconditional(cond: &Condition) -> bool {
    let (pred, neg) = cond.pred();
    pred == Pred::PT && !neg && cond.flow_test() == FlowTest::T
}

struct Scan {
    /// Addresses that start a block.
    leaders: BTreeSet<u64>,
    /// Address of a control instruction -> how it leaves the block.
    terminators: BTreeMap<u64, Terminator>,
    end_address: u64,
}

/// Linear scan from the entry point. SSY/PBK record their push targets;
/// later SYNC/BRK resolve against the most recent one in address order,
/// which holds for the reducible programs the guest compiler emits.
fn scan(env: &dyn Environment, start: u64) -> Result<Scan> {
    let mut leaders = BTreeSet::new();
    let mut terminators = BTreeMap::new();
    leaders.insert(start);

    let mut ssy_target: Option<u64> = None;
    let mut pbk_target: Option<u64> = None;
    let mut max_pending = start;
    let mut addr = start;
    let mut count = 0u64;
    loop {
        if count >= MAX_INSTRUCTIONS {
            return Err(Error::not_implemented("program exceeds the scan limit"));
        }
        count += 1;
        if is_sched_word(addr, start) {
            addr += 8;
            continue;
        }
        let insn = env.read_instruction(addr);
        let opcode = decode(insn)?;
        let mut stop_here = false;
        match opcode {
            GuestOpcode::Exit => {
                let cond = branch_condition(insn);
                let unconditional = is_unconditional(&cond);
                terminators.insert(addr, Terminator::Exit { cond });
                if unconditional {
                    stop_here = true;
                } else {
                    // The fall-through path starts its own block
                    leaders.insert(addr + 8);
                }
            }
            GuestOpcode::Bra => {
                let cond = branch_condition(insn);
                let target = (addr as i64 + 8 + branch_offset(insn)) as u64;
                leaders.insert(target);
                max_pending = max_pending.max(target);
                let unconditional = is_unconditional(&cond);
                terminators.insert(addr, Terminator::Branch { target, cond });
                if unconditional {
                    stop_here = true;
                } else {
                    leaders.insert(addr + 8);
                }
            }
            GuestOpcode::Brx => {
                let offset = branch_offset(insn);
                terminators.insert(
                    addr,
                    Terminator::Indirect { reg: crate::frontend::translate::src_a_reg(insn), offset },
                );
                stop_here = true;
            }
            GuestOpcode::Ssy => {
                let target = (addr as i64 + 8 + branch_offset(insn)) as u64;
                leaders.insert(target);
                max_pending = max_pending.max(target);
                ssy_target = Some(target);
            }
            GuestOpcode::Pbk => {
                let target = (addr as i64 + 8 + branch_offset(insn)) as u64;
                leaders.insert(target);
                max_pending = max_pending.max(target);
                pbk_target = Some(target);
            }
            GuestOpcode::Sync => {
                let target = ssy_target
                    .ok_or_else(|| Error::not_implemented("SYNC without a prior SSY"))?;
                terminators.insert(addr, Terminator::Resync { target });
                stop_here = true;
            }
            GuestOpcode::Brk => {
                let target = pbk_target
                    .ok_or_else(|| Error::not_implemented("BRK without a prior PBK"))?;
                terminators.insert(addr, Terminator::Resync { target });
                stop_here = true;
            }
            _ => {}
        }
        addr += 8;
        if stop_here && addr > max_pending {
            break;
        }
    }
    Ok(Scan { leaders, terminators, end_address: addr })
}

/// One guest block range maps to a chain of IR blocks when predicated
/// instructions split it into conditional diamonds.
pub fn build(env: &dyn Environment, program: &mut Program) -> Result<()> {
    let start = env.start_address();
    let scan = scan(env, start)?;

    // Allocate one IR block per leader plus the shared exit block
    let leaders: Vec<u64> = scan.leaders.iter().copied().collect();
    let mut leader_blocks: BTreeMap<u64, BlockId> = BTreeMap::new();
    for &leader in &leaders {
        leader_blocks.insert(leader, program.alloc_block(leader));
    }
    let exit_block = program.alloc_block(scan.end_address);
    {
        let mut ir = IrEmitter::new(program, exit_block);
        ir.epilogue()?;
    }
    program.set_block_end(exit_block, BlockEnd::Return);

    {
        let entry = leader_blocks[&start];
        let mut ir = IrEmitter::new(program, entry);
        ir.prologue()?;
    }

    let leader_target_blocks: Vec<BlockId> = leader_blocks.values().copied().collect();
    let block_of = |address: u64| -> Result<BlockId> {
        leader_blocks
            .get(&address)
            .copied()
            .ok_or_else(|| Error::logic(format!("branch target {:#x} is not a leader", address)))
    };

    for (index, &leader) in leaders.iter().enumerate() {
        let range_end = leaders.get(index + 1).copied().unwrap_or(scan.end_address);
        let mut current = leader_blocks[&leader];
        let mut addr = leader;
        let mut terminated = false;
        while addr < range_end {
            if is_sched_word(addr, start) {
                addr += 8;
                continue;
            }
            if let Some(terminator) = scan.terminators.get(&addr) {
                let fallthrough_addr = leaders
                    .get(index + 1)
                    .copied()
                    .unwrap_or(scan.end_address);
                terminate(
                    program,
                    current,
                    *terminator,
                    exit_block,
                    &block_of,
                    &leader_target_blocks,
                    fallthrough_addr,
                )?;
                terminated = true;
                break;
            }
            let insn = env.read_instruction(addr);
            let opcode = decode(insn)?;
            let (pred, neg) = guard_pred(insn);
            if pred == Pred::PT && !neg {
                let mut ir = IrEmitter::new(program, current);
                translate_instruction(&mut ir, insn, opcode)?;
            } else {
                // Split into a conditional diamond around the instruction
                let body = program.alloc_block(addr);
                let join = program.alloc_block(addr + 8);
                let cond = {
                    let mut ir = IrEmitter::new(program, current);
                    let pred_value = ir.get_pred(pred, neg)?;
                    ir.condition_ref(pred_value)?
                };
                program.set_block_end(
                    current,
                    BlockEnd::Conditional { cond, true_block: body, false_block: join },
                );
                {
                    let mut ir = IrEmitter::new(program, body);
                    translate_instruction(&mut ir, insn, opcode)?;
                }
                program.set_block_end(body, BlockEnd::Unconditional(join));
                current = join;
            }
            addr += 8;
        }
        if !terminated {
            // Fall through into the next leader
            let next = leaders.get(index + 1).copied();
            let target = match next {
                Some(next_leader) => block_of(next_leader)?,
                None => exit_block,
            };
            program.set_block_end(current, BlockEnd::Unconditional(target));
        }
    }

    // Layout order: entry first, then allocation order
    program.block_order = (0..program.num_blocks() as u32).map(BlockId).collect();
    let entry = leader_blocks[&start];
    let entry_pos = program.block_order.iter().position(|&b| b == entry).unwrap_or(0);
    program.block_order.swap(0, entry_pos);
    Ok(())
}

fn terminate(
    program: &mut Program,
    block: BlockId,
    terminator: Terminator,
    exit_block: BlockId,
    block_of: &dyn Fn(u64) -> Result<BlockId>,
    leader_targets: &[BlockId],
    fallthrough_addr: u64,
) -> Result<()> {
    match terminator {
        Terminator::Exit { cond } => {
            if is_unconditional(&cond) {
                program.set_block_end(block, BlockEnd::Unconditional(exit_block));
            } else {
                let cond_value = emit_condition(program, block, cond)?;
                let fallthrough = block_of(fallthrough_addr)?;
                program.set_block_end(
                    block,
                    BlockEnd::Conditional {
                        cond: cond_value,
                        true_block: exit_block,
                        false_block: fallthrough,
                    },
                );
            }
        }
        Terminator::Branch { target, cond } => {
            let target_block = block_of(target)?;
            if is_unconditional(&cond) {
                program.set_block_end(block, BlockEnd::Unconditional(target_block));
            } else {
                let cond_value = emit_condition(program, block, cond)?;
                let fallthrough = block_of(fallthrough_addr)?;
                program.set_block_end(
                    block,
                    BlockEnd::Conditional {
                        cond: cond_value,
                        true_block: target_block,
                        false_block: fallthrough,
                    },
                );
            }
        }
        Terminator::Resync { target } => {
            let target_block = block_of(target)?;
            program.set_block_end(block, BlockEnd::Unconditional(target_block));
        }
        Terminator::Indirect { reg, offset } => {
            let selector = {
                let mut ir = IrEmitter::new(program, block);
                let base = ir.get_register(reg)?;
                let bias = ir.imm32(offset as u32);
                let address = ir.iadd(base, bias)?;
                ir.set_indirect_branch_variable(address)?;
                let read_back = ir.get_indirect_branch_variable()?;
                ir.inst(crate::ir::Opcode::Reference, &[read_back])?;
                read_back
            };
            // Conservatively, every leader block is a potential target of
            // the table jump
            program.indirect_branch_targets = leader_targets.to_vec();
            program.set_block_end(block, BlockEnd::Indirect { selector });
        }
    }
    Ok(())
}

fn emit_condition(program: &mut Program, block: BlockId, cond: Condition) -> Result<Value> {
    let mut ir = IrEmitter::new(program, block);
    let value = ir.condition(cond)?;
    let value = crate::ir::U1::new(value, ir.program)?.value();
    ir.condition_ref(value)
}
