//! Shader info collection.
//!
//! Walks the final IR and aggregates everything the Environment and the
//! back-ends need to know: referenced constant buffers, attribute loads and
//! stores, memory classes, capability-relevant types.

use crate::error::Result;
use crate::info::{ConstantBufferDescriptor, MAX_CBUFS};
use crate::ir::{InstId, Opcode, Program, Type, Value};

fn add_constant_buffer(program: &mut Program, inst: InstId, element_size: u32, ty: Type) -> Result<()> {
    let binding = program.arg(inst, 0).u32(program)?;
    let info = &mut program.info;
    info.constant_buffer_mask |= 1 << binding;
    info.used_constant_buffer_types |= ty;
    let descriptors = &mut info.constant_buffer_descriptors;
    if !descriptors.iter().any(|desc| desc.index == binding) {
        descriptors.push(ConstantBufferDescriptor { index: binding, count: 1 });
        descriptors.sort_by_key(|desc| desc.index);
    }
    // Track how far into the buffer the program reaches, when knowable
    if let Ok(offset) = program.arg(inst, 1).u32(program) {
        let binding = binding as usize;
        if binding < MAX_CBUFS {
            let size = &mut program.info.constant_buffer_used_sizes[binding];
            *size = (*size).max(offset + element_size);
        }
    } else if (binding as usize) < MAX_CBUFS {
        program.info.constant_buffer_used_sizes[binding as usize] = 0x10000;
    }
    Ok(())
}

fn visit(program: &mut Program, inst: InstId) -> Result<()> {
    use Opcode::*;
    let op = program.inst(inst).opcode();
    match op {
        GetCbufU8 | GetCbufS8 => {
            program.info.uses_int8 = true;
            add_constant_buffer(program, inst, 1, Type::U8)?;
        }
        GetCbufU16 | GetCbufS16 => {
            program.info.uses_int16 = true;
            add_constant_buffer(program, inst, 2, Type::U16)?;
        }
        GetCbufU32 => add_constant_buffer(program, inst, 4, Type::U32)?,
        GetCbufF32 => add_constant_buffer(program, inst, 4, Type::F32)?,
        GetCbufU32x2 => add_constant_buffer(program, inst, 8, Type::U32X2)?,
        GetAttribute => {
            let attribute = program.arg(inst, 0).attribute()?;
            program.info.loads.set(attribute);
        }
        SetAttribute => {
            let attribute = program.arg(inst, 0).attribute()?;
            program.info.stores.set(attribute);
        }
        GetAttributeIndexed => program.info.loads_indexed_attributes = true,
        SetAttributeIndexed => program.info.stores_indexed_attributes = true,
        GetPatch => {
            let patch = program.arg(inst, 0).patch()?;
            if patch.is_generic() {
                program.info.used_patches[patch.generic_index() as usize] = true;
            }
        }
        SetPatch => {
            let patch = program.arg(inst, 0).patch()?;
            if patch.is_generic() {
                program.info.used_patches[patch.generic_index() as usize] = true;
            }
        }
        SetFragColor => {
            let index = program.arg(inst, 0).u32(program)? as usize;
            if index < program.info.stores_frag_color.len() {
                program.info.stores_frag_color[index] = true;
            }
        }
        SetFragDepth => program.info.stores_frag_depth = true,
        SetSampleMask => program.info.stores_sample_mask = true,
        WorkgroupId => program.info.uses_workgroup_id = true,
        LocalInvocationId => program.info.uses_local_invocation_id = true,
        InvocationId => program.info.uses_invocation_id = true,
        SampleId => program.info.uses_sample_id = true,
        IsHelperInvocation => program.info.uses_is_helper_invocation = true,
        YDirection => program.info.uses_y_direction = true,
        DemoteToHelperInvocation => program.info.uses_demote_to_helper_invocation = true,
        LaneId => program.info.uses_subgroup_invocation_id = true,
        SubgroupEqMask | SubgroupLtMask | SubgroupLeMask | SubgroupGtMask | SubgroupGeMask => {
            program.info.uses_subgroup_mask = true;
        }
        VoteAll | VoteAny | VoteEqual | SubgroupBallot => {
            program.info.uses_subgroup_vote = true;
        }
        FSwizzleAdd => program.info.uses_fswzadd = true,
        DPdxFine | DPdyFine | DPdxCoarse | DPdyCoarse => {
            program.info.uses_derivatives = true;
        }
        LoadLocal | WriteLocal => program.info.uses_local_memory = true,
        LoadSharedU64 | LoadSharedU128 | WriteSharedU64 | WriteSharedU128 => {
            program.info.uses_shared_memory_u32x2 = true;
        }
        LoadGlobalU8 | LoadGlobalS8 | LoadGlobalU16 | LoadGlobalS16 | LoadGlobal32
        | LoadGlobal64 | LoadGlobal128 | WriteGlobalU8 | WriteGlobalS8 | WriteGlobalU16
        | WriteGlobalS16 | WriteGlobal32 | WriteGlobal64 | WriteGlobal128 => {
            program.info.uses_global_memory = true;
            program.info.uses_int64 = true;
        }
        LoadStorageU8 | LoadStorageS8 | WriteStorageU8 | WriteStorageS8 => {
            program.info.uses_int8 = true;
            program.info.used_storage_buffer_types |= Type::U8;
        }
        LoadStorageU16 | LoadStorageS16 | WriteStorageU16 | WriteStorageS16 => {
            program.info.uses_int16 = true;
            program.info.used_storage_buffer_types |= Type::U16;
        }
        LoadStorage32 | WriteStorage32 => {
            program.info.used_storage_buffer_types |= Type::U32;
        }
        LoadStorage64 | WriteStorage64 => {
            program.info.used_storage_buffer_types |= Type::U32X2;
        }
        LoadStorage128 | WriteStorage128 => {
            program.info.used_storage_buffer_types |= Type::U32X4;
        }
        SharedAtomicInc32 => program.info.uses_shared_increment = true,
        SharedAtomicDec32 => program.info.uses_shared_decrement = true,
        StorageAtomicInc32 | GlobalAtomicInc32 => program.info.uses_global_increment = true,
        StorageAtomicDec32 | GlobalAtomicDec32 => program.info.uses_global_decrement = true,
        StorageAtomicAddF32 | GlobalAtomicAddF32 => program.info.uses_atomic_f32_add = true,
        StorageAtomicAddF16x2 | GlobalAtomicAddF16x2 => {
            program.info.uses_atomic_f16x2_add = true;
        }
        StorageAtomicMinF16x2 | GlobalAtomicMinF16x2 => {
            program.info.uses_atomic_f16x2_min = true;
        }
        StorageAtomicMaxF16x2 | GlobalAtomicMaxF16x2 => {
            program.info.uses_atomic_f16x2_max = true;
        }
        StorageAtomicAddF32x2 | GlobalAtomicAddF32x2 => {
            program.info.uses_atomic_f32x2_add = true;
        }
        StorageAtomicMinF32x2 | GlobalAtomicMinF32x2 => {
            program.info.uses_atomic_f32x2_min = true;
        }
        StorageAtomicMaxF32x2 | GlobalAtomicMaxF32x2 => {
            program.info.uses_atomic_f32x2_max = true;
        }
        StorageAtomicSMin32 | StorageAtomicSMax32 | GlobalAtomicSMin32 | GlobalAtomicSMax32 => {
            program.info.uses_atomic_s32_min_max = true;
        }
        StorageAtomicIAdd64 | StorageAtomicSMin64 | StorageAtomicUMin64 | StorageAtomicSMax64
        | StorageAtomicUMax64 | StorageAtomicAnd64 | StorageAtomicOr64 | StorageAtomicXor64
        | StorageAtomicExchange64 | SharedAtomicExchange64 => {
            program.info.uses_int64_bit_atomics = true;
            program.info.uses_int64 = true;
        }
        GetSparseFromOp => program.info.uses_sparse_residency = true,
        _ => {}
    }
    // Scalar type usage drives capability gates in the back-ends
    let result_type = Value::Inst(inst).ty(program);
    match result_type {
        Type::F16 | Type::F16X2 | Type::F16X3 | Type::F16X4 => program.info.uses_fp16 = true,
        Type::F64 | Type::F64X2 | Type::F64X3 | Type::F64X4 => program.info.uses_fp64 = true,
        Type::U64 => program.info.uses_int64 = true,
        _ => {}
    }
    Ok(())
}

pub fn collect_shader_info_pass(program: &mut Program) -> Result<()> {
    let order: Vec<_> = program.rpo().collect();
    for block in order {
        let insts = program.block(block).instructions().to_vec();
        for inst in insts {
            visit(program, inst)?;
        }
    }
    Ok(())
}
