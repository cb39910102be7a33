//! Global memory to storage buffer lowering.
//!
//! Guest programs address storage buffers through 64-bit pointers loaded
//! from a constant buffer, where each buffer slot holds an (address, size)
//! pair. Accesses whose pointer provably originates from such a pair are
//! rewritten into direct storage-buffer operations; anything else stays a
//! plain global access for the back-end helpers.

use fxhash::FxHashMap;

use crate::error::Result;
use crate::info::StorageBufferDescriptor;
use crate::ir::{BlockId, InstId, IrEmitter, Opcode, Program, Value};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
struct StorageBufferAddr {
    cbuf_index: u32,
    cbuf_offset: u32,
}

/// Walks an address back to the `(cbuf index, cbuf offset)` pair it was
/// loaded from. The decoder produces
/// `IAdd64(PackUint2x32(U32x2(lo, hi)), imm)` chains where `lo`/`hi` come
/// from adjacent constant buffer words.
fn track(program: &Program, value: Value) -> Option<StorageBufferAddr> {
    let inst = value.inst_recursive(program)?;
    match program.inst(inst).opcode() {
        Opcode::IAdd64 => (0..2).find_map(|index| track(program, program.arg(inst, index))),
        Opcode::PackUint2x32 => track(program, program.arg(inst, 0)),
        Opcode::CompositeConstructU32x2 => {
            let lo = program.arg(inst, 0).inst_recursive(program)?;
            let hi = program.arg(inst, 1).inst_recursive(program)?;
            if program.inst(lo).opcode() != Opcode::GetCbufU32
                || program.inst(hi).opcode() != Opcode::GetCbufU32
            {
                return None;
            }
            let lo_binding = program.arg(lo, 0).u32(program).ok()?;
            let lo_offset = program.arg(lo, 1).u32(program).ok()?;
            let hi_binding = program.arg(hi, 0).u32(program).ok()?;
            let hi_offset = program.arg(hi, 1).u32(program).ok()?;
            if lo_binding != hi_binding || hi_offset != lo_offset + 4 {
                return None;
            }
            Some(StorageBufferAddr { cbuf_index: lo_binding, cbuf_offset: lo_offset })
        }
        _ => None,
    }
}

fn storage_opcode(op: Opcode) -> Option<(Opcode, bool)> {
    Some(match op {
        Opcode::LoadGlobalU8 => (Opcode::LoadStorageU8, false),
        Opcode::LoadGlobalS8 => (Opcode::LoadStorageS8, false),
        Opcode::LoadGlobalU16 => (Opcode::LoadStorageU16, false),
        Opcode::LoadGlobalS16 => (Opcode::LoadStorageS16, false),
        Opcode::LoadGlobal32 => (Opcode::LoadStorage32, false),
        Opcode::LoadGlobal64 => (Opcode::LoadStorage64, false),
        Opcode::LoadGlobal128 => (Opcode::LoadStorage128, false),
        Opcode::WriteGlobalU8 => (Opcode::WriteStorageU8, true),
        Opcode::WriteGlobalS8 => (Opcode::WriteStorageS8, true),
        Opcode::WriteGlobalU16 => (Opcode::WriteStorageU16, true),
        Opcode::WriteGlobalS16 => (Opcode::WriteStorageS16, true),
        Opcode::WriteGlobal32 => (Opcode::WriteStorage32, true),
        Opcode::WriteGlobal64 => (Opcode::WriteStorage64, true),
        Opcode::WriteGlobal128 => (Opcode::WriteStorage128, true),
        _ => return None,
    })
}

/// Runtime byte offset into the storage buffer: the low pointer half minus
/// the buffer base read back from the constant buffer.
fn storage_offset(
    program: &mut Program,
    block: BlockId,
    inst: InstId,
    buffer: StorageBufferAddr,
) -> Result<Value> {
    let position = program
        .block(block)
        .instructions()
        .iter()
        .position(|&id| id == inst)
        .expect("instruction not in its block");
    let address = program.arg(inst, 0);
    let mut ir = IrEmitter::with_insertion_point(program, block, position);
    let low = ir.inst(Opcode::ConvertU32U64, &[address])?;
    let base = ir.get_cbuf_u32(buffer.cbuf_index, buffer.cbuf_offset)?;
    let offset = ir.isub(low, base)?;
    Ok(crate::ir::U32::new(offset, ir.program)?.value())
}

pub fn global_memory_to_storage_buffer_pass(program: &mut Program) -> Result<()> {
    // Discover every provable storage buffer first so bindings are stable
    let mut buffers: Vec<StorageBufferAddr> = Vec::new();
    let mut writes: FxHashMap<StorageBufferAddr, bool> = FxHashMap::default();
    let mut to_rewrite: Vec<(BlockId, InstId, StorageBufferAddr, Opcode)> = Vec::new();

    let order: Vec<BlockId> = program.rpo().collect();
    for &block in &order {
        let insts = program.block(block).instructions().to_vec();
        for inst in insts {
            let op = program.inst(inst).opcode();
            let (storage_op, is_write) = match storage_opcode(op) {
                Some(pair) => pair,
                None => continue,
            };
            let buffer = match track(program, program.arg(inst, 0)) {
                Some(buffer) => buffer,
                None => continue,
            };
            if !buffers.contains(&buffer) {
                buffers.push(buffer);
            }
            *writes.entry(buffer).or_insert(false) |= is_write;
            to_rewrite.push((block, inst, buffer, storage_op));
        }
    }
    if buffers.is_empty() {
        return Ok(());
    }
    // Stable binding order: by constant buffer slot then offset
    buffers.sort();
    program.info.storage_buffers_descriptors = buffers
        .iter()
        .map(|buffer| StorageBufferDescriptor {
            cbuf_index: buffer.cbuf_index,
            cbuf_offset: buffer.cbuf_offset,
            count: 1,
            is_written: writes.get(buffer).copied().unwrap_or(false),
        })
        .collect();
    for (index, _) in buffers.iter().enumerate() {
        if index < program.info.nvn_buffer_used.len() {
            program.info.nvn_buffer_used[index] = true;
        }
    }

    for (block, inst, buffer, storage_op) in to_rewrite {
        let binding = buffers.iter().position(|b| *b == buffer).unwrap() as u32;
        let offset = storage_offset(program, block, inst, buffer)?;
        let value_args: Vec<Value> =
            (1..program.inst(inst).num_args()).map(|i| program.arg(inst, i)).collect();
        // The storage form has a different arity; drop the old arguments
        // (and their uses) before rebuilding
        program.clear_args(inst)?;
        program.replace_opcode(inst, storage_op)?;
        program.set_arg(inst, 0, Value::U32(binding))?;
        program.set_arg(inst, 1, offset)?;
        for (slot, value) in value_args.into_iter().enumerate() {
            program.set_arg(inst, slot + 2, value)?;
        }
    }
    Ok(())
}
