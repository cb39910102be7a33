//! Host shading back-ends.

pub mod glasm;
pub mod spirv;

/// Running binding indices shared across the stages of one pipeline.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    pub unified: u32,
    pub uniform_buffer: u32,
    pub storage_buffer: u32,
    pub texture: u32,
    pub image: u32,
}

use crate::ir::{BlockId, Program};

/// Iterative post-dominator sets over the reachable graph; the immediate
/// post-dominator of a block is its nearest strict post-dominator. Both
/// back-ends use this to find the merge block of a conditional.
pub(crate) fn compute_immediate_post_dominators(program: &Program) -> Vec<Option<BlockId>> {
    let num_blocks = program.num_blocks();
    let full: Vec<bool> = vec![true; num_blocks];
    let mut sets: Vec<Vec<bool>> = vec![full; num_blocks];
    let reachable: Vec<BlockId> = program.post_order_blocks.clone();
    for &block in &reachable {
        if program.block(block).imm_successors().is_empty() {
            let mut only_self = vec![false; num_blocks];
            only_self[block.index()] = true;
            sets[block.index()] = only_self;
        }
    }
    let mut changed = true;
    while changed {
        changed = false;
        // Post-order visits successors before their predecessors
        for &block in &reachable {
            let successors = program.block(block).imm_successors().to_vec();
            if successors.is_empty() {
                continue;
            }
            let mut new_set = vec![true; num_blocks];
            for succ in &successors {
                for (index, value) in new_set.iter_mut().enumerate() {
                    *value = *value && sets[succ.index()][index];
                }
            }
            new_set[block.index()] = true;
            if new_set != sets[block.index()] {
                sets[block.index()] = new_set;
                changed = true;
            }
        }
    }
    (0..num_blocks)
        .map(|index| {
            let mut best: Option<(usize, usize)> = None;
            for candidate in 0..num_blocks {
                if candidate == index || !sets[index][candidate] {
                    continue;
                }
                let size = sets[candidate].iter().filter(|&&member| member).count();
                if best.map_or(true, |(_, best_size)| size > best_size) {
                    best = Some((candidate, size));
                }
            }
            best.map(|(candidate, _)| BlockId::from_index(candidate))
        })
        .collect()
}
