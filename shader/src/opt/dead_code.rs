//! Dead code elimination.
//!
//! Iterates blocks in post order and each block backwards so dependency
//! chains die in one sweep. Side-effecting instructions and block-end
//! conditions always survive.

use crate::error::Result;
use crate::ir::{BlockEnd, BlockId, InstId, Opcode, Program, Value};

/// Block-end conditions are referenced from the terminator, not from an
/// argument slot; they must survive.
fn is_block_end_condition(program: &Program, block: BlockId, inst: InstId) -> bool {
    match program.block(block).end() {
        BlockEnd::Conditional { cond, .. } => cond == Value::Inst(inst),
        BlockEnd::Indirect { selector } => selector == Value::Inst(inst),
        _ => false,
    }
}

pub fn dead_code_elimination_pass(program: &mut Program) -> Result<()> {
    let order: Vec<BlockId> = program.post_order_blocks.clone();
    for block in order {
        let insts = program.block(block).instructions().to_vec();
        for (position, &inst) in insts.iter().enumerate().rev() {
            let keep = {
                let inst_ref = program.inst(inst);
                inst_ref.has_uses()
                    || inst_ref.may_have_side_effects()
                    || is_block_end_condition(program, block, inst)
            };
            if keep {
                continue;
            }
            program.clear_args(inst)?;
            program.replace_opcode(inst, Opcode::Void)?;
            debug_assert_eq!(program.block(block).instructions()[position], inst);
            program.block_mut(block).insts.remove(position);
        }
    }
    Ok(())
}
