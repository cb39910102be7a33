//! Identity collapse.
//!
//! Rewrites every argument to its identity-resolved value and drops the
//! `Identity`/`Void` carcasses from the block lists.

use crate::error::Result;
use crate::ir::{Opcode, Program};

pub fn identity_removal_pass(program: &mut Program) -> Result<()> {
    let order: Vec<_> = program.rpo().collect();
    for block in order {
        let insts = program.block(block).instructions().to_vec();
        for inst in insts {
            let opcode = program.inst(inst).opcode();
            if opcode == Opcode::Identity || opcode == Opcode::Void {
                continue;
            }
            for index in 0..program.inst(inst).num_args() {
                let arg = program.arg(inst, index);
                let resolved = arg.resolve(program);
                if resolved != arg {
                    program.set_arg(inst, index, resolved)?;
                }
            }
        }
        // Drop the stripped identities from the instruction list
        let dead: Vec<usize> = program
            .block(block)
            .instructions()
            .iter()
            .enumerate()
            .filter(|&(_, &id)| {
                let op = program.inst(id).opcode();
                (op == Opcode::Identity || op == Opcode::Void)
                    && !program.inst(id).has_uses()
            })
            .map(|(index, _)| index)
            .collect();
        for index in dead.into_iter().rev() {
            let id = program.block(block).instructions()[index];
            program.clear_args(id)?;
            program.block_mut(block).insts.remove(index);
        }
    }
    Ok(())
}
