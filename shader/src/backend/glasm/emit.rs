//! Per-instruction GLASM emission dispatch.

use crate::backend::glasm::emit_context::EmitContext;
use crate::backend::glasm::{
    emit_alu, emit_composite, emit_context_get_set, emit_float, emit_image, emit_memory,
    emit_special,
};
use crate::error::{Error, Result};
use crate::ir::{name_of, InstId, Opcode};

pub fn emit_inst(ctx: &mut EmitContext, inst: InstId) -> Result<()> {
    use Opcode::*;
    match ctx.program.inst(inst).opcode() {
        Phi => emit_special::phi(ctx, inst),
        PhiMove => emit_special::phi_move(ctx, inst),
        ConditionRef => emit_special::condition_ref(ctx, inst),
        Reference | Void | Identity | Prologue | Epilogue | Join => Ok(()),
        Barrier => {
            ctx.add("BAR;".to_string());
            Ok(())
        }
        WorkgroupMemoryBarrier | DeviceMemoryBarrier => {
            ctx.add("MEMBAR;".to_string());
            Ok(())
        }
        DemoteToHelperInvocation => {
            ctx.add("KIL TR;".to_string());
            Ok(())
        }
        UndefU1 | UndefU8 | UndefU16 | UndefU32 => {
            ctx.define(inst)?;
            Ok(())
        }
        UndefU64 => {
            ctx.long_define(inst)?;
            Ok(())
        }
        GetCbufU8 => emit_context_get_set::get_cbuf(ctx, inst, "U8"),
        GetCbufS8 => emit_context_get_set::get_cbuf(ctx, inst, "S8"),
        GetCbufU16 => emit_context_get_set::get_cbuf(ctx, inst, "U16"),
        GetCbufS16 => emit_context_get_set::get_cbuf(ctx, inst, "S16"),
        GetCbufU32 => emit_context_get_set::get_cbuf(ctx, inst, "U32"),
        GetCbufF32 => emit_context_get_set::get_cbuf(ctx, inst, "F32"),
        GetCbufU32x2 => emit_context_get_set::get_cbuf(ctx, inst, "U32X2"),
        GetAttribute => emit_context_get_set::get_attribute(ctx, inst),
        SetAttribute => emit_context_get_set::set_attribute(ctx, inst),
        GetAttributeIndexed | SetAttributeIndexed => {
            Err(Error::not_implemented("GLASM indexed attributes"))
        }
        GetPatch => emit_context_get_set::get_patch(ctx, inst),
        SetPatch => emit_context_get_set::set_patch(ctx, inst),
        SetFragColor => emit_context_get_set::set_frag_color(ctx, inst),
        SetFragDepth => emit_context_get_set::set_frag_depth(ctx, inst),
        SetSampleMask => emit_context_get_set::set_sample_mask(ctx, inst),
        WorkgroupId => emit_context_get_set::workgroup_id(ctx, inst),
        LocalInvocationId => emit_context_get_set::local_invocation_id(ctx, inst),
        LaneId => emit_context_get_set::lane_id(ctx, inst),
        LoadLocal => emit_memory::load_local(ctx, inst),
        WriteLocal => emit_memory::write_local(ctx, inst),
        LoadStorageU8 => emit_memory::load_storage(ctx, inst, "U8"),
        LoadStorageS8 => emit_memory::load_storage(ctx, inst, "S8"),
        LoadStorageU16 => emit_memory::load_storage(ctx, inst, "U16"),
        LoadStorageS16 => emit_memory::load_storage(ctx, inst, "S16"),
        LoadStorage32 => emit_memory::load_storage(ctx, inst, "U32"),
        LoadStorage64 => emit_memory::load_storage_wide(ctx, inst, "U32X2"),
        LoadStorage128 => emit_memory::load_storage_wide(ctx, inst, "U32X4"),
        WriteStorageU8 => emit_memory::write_storage(ctx, inst, "U8"),
        WriteStorageS8 => emit_memory::write_storage(ctx, inst, "S8"),
        WriteStorageU16 => emit_memory::write_storage(ctx, inst, "U16"),
        WriteStorageS16 => emit_memory::write_storage(ctx, inst, "S16"),
        WriteStorage32 => emit_memory::write_storage(ctx, inst, "U32"),
        WriteStorage64 => emit_memory::write_storage(ctx, inst, "U32X2"),
        WriteStorage128 => emit_memory::write_storage(ctx, inst, "U32X4"),
        LoadSharedU8 => emit_memory::load_shared(ctx, inst, "U8"),
        LoadSharedS8 => emit_memory::load_shared(ctx, inst, "S8"),
        LoadSharedU16 => emit_memory::load_shared(ctx, inst, "U16"),
        LoadSharedS16 => emit_memory::load_shared(ctx, inst, "S16"),
        LoadSharedU32 => emit_memory::load_shared(ctx, inst, "U32"),
        WriteSharedU8 => emit_memory::write_shared(ctx, inst, "U8"),
        WriteSharedU16 => emit_memory::write_shared(ctx, inst, "U16"),
        WriteSharedU32 => emit_memory::write_shared(ctx, inst, "U32"),
        CompositeConstructU32x2 | CompositeConstructF32x2 => {
            emit_composite::construct(ctx, inst, 2)
        }
        CompositeConstructU32x3 | CompositeConstructF32x3 => {
            emit_composite::construct(ctx, inst, 3)
        }
        CompositeConstructU32x4 | CompositeConstructF32x4 => {
            emit_composite::construct(ctx, inst, 4)
        }
        CompositeExtractU32x2 | CompositeExtractU32x3 | CompositeExtractU32x4 => {
            emit_composite::extract(ctx, inst, "U")
        }
        CompositeExtractF32x2 | CompositeExtractF32x3 | CompositeExtractF32x4 => {
            emit_composite::extract(ctx, inst, "F")
        }
        CompositeInsertU32x2 | CompositeInsertU32x3 | CompositeInsertU32x4 => {
            emit_composite::insert(ctx, inst, "U")
        }
        CompositeInsertF32x2 | CompositeInsertF32x3 | CompositeInsertF32x4 => {
            emit_composite::insert(ctx, inst, "F")
        }
        SelectU1 | SelectU8 | SelectU16 | SelectU32 | SelectF32 => emit_alu::select(ctx, inst),
        BitCastU16F16 | BitCastU32F32 | BitCastU64F64 | BitCastF16U16 | BitCastF32U32
        | BitCastF64U64 => emit_composite::alias(ctx, inst),
        PackUint2x32 => emit_composite::pack_uint_2x32(ctx, inst),
        UnpackUint2x32 => emit_composite::unpack_uint_2x32(ctx, inst),
        PackHalf2x16 => emit_composite::pack_half_2x16(ctx, inst),
        UnpackHalf2x16 => emit_composite::unpack_half_2x16(ctx, inst),
        GetZeroFromOp | GetSignFromOp | GetCarryFromOp | GetOverflowFromOp | GetSparseFromOp
        | GetInBoundsFromOp => Err(Error::not_implemented("unfused pseudo-instruction")),
        FPAbs32 => emit_float::fp_abs(ctx, inst),
        FPAdd32 => emit_float::fp_add(ctx, inst),
        FPFma32 => emit_float::fp_fma(ctx, inst),
        FPMax32 => emit_float::fp_max(ctx, inst),
        FPMin32 => emit_float::fp_min(ctx, inst),
        FPMul32 => emit_float::fp_mul(ctx, inst),
        FPNeg32 => emit_float::fp_neg(ctx, inst),
        FPSin => emit_float::fp_unary(ctx, inst, "SIN.F"),
        FPCos => emit_float::fp_unary(ctx, inst, "COS.F"),
        FPExp2 => emit_float::fp_unary(ctx, inst, "EX2.F"),
        FPLog2 => emit_float::fp_unary(ctx, inst, "LG2.F"),
        FPRecip32 => emit_float::fp_unary(ctx, inst, "RCP.F"),
        FPRecipSqrt32 => emit_float::fp_unary(ctx, inst, "RSQ.F"),
        FPSqrt => emit_float::fp_sqrt(ctx, inst),
        FPSaturate32 => emit_float::fp_saturate(ctx, inst),
        FPClamp32 => emit_float::fp_clamp(ctx, inst),
        FPRoundEven32 => emit_float::fp_unary(ctx, inst, "ROUND.F"),
        FPFloor32 => emit_float::fp_unary(ctx, inst, "FLR.F"),
        FPCeil32 => emit_float::fp_unary(ctx, inst, "CEIL.F"),
        FPTrunc32 => emit_float::fp_unary(ctx, inst, "TRUNC.F"),
        FPOrdEqual32 => emit_float::fp_compare(ctx, inst, "SEQ", true, false),
        FPUnordEqual32 => emit_float::fp_compare(ctx, inst, "SEQ", false, false),
        FPOrdNotEqual32 => emit_float::fp_compare(ctx, inst, "SNE", true, true),
        FPUnordNotEqual32 => emit_float::fp_compare(ctx, inst, "SNE", false, false),
        FPOrdLessThan32 => emit_float::fp_compare(ctx, inst, "SLT", true, false),
        FPUnordLessThan32 => emit_float::fp_compare(ctx, inst, "SLT", false, false),
        FPOrdGreaterThan32 => emit_float::fp_compare(ctx, inst, "SGT", true, false),
        FPUnordGreaterThan32 => emit_float::fp_compare(ctx, inst, "SGT", false, false),
        FPOrdLessThanEqual32 => emit_float::fp_compare(ctx, inst, "SLE", true, false),
        FPUnordLessThanEqual32 => emit_float::fp_compare(ctx, inst, "SLE", false, false),
        FPOrdGreaterThanEqual32 => emit_float::fp_compare(ctx, inst, "SGE", true, false),
        FPUnordGreaterThanEqual32 => emit_float::fp_compare(ctx, inst, "SGE", false, false),
        FPIsNan32 => emit_float::fp_is_nan(ctx, inst),
        IAdd32 => emit_alu::iadd32(ctx, inst),
        ISub32 => emit_alu::binary_s32(ctx, inst, "SUB.S"),
        IMul32 => emit_alu::binary_s32(ctx, inst, "MUL.S"),
        INeg32 => emit_alu::ineg32(ctx, inst),
        IAbs32 => emit_alu::unary_s32(ctx, inst, "ABS.S"),
        ShiftLeftLogical32 => emit_alu::binary_u32(ctx, inst, "SHL.U"),
        ShiftRightLogical32 => emit_alu::binary_u32(ctx, inst, "SHR.U"),
        ShiftRightArithmetic32 => emit_alu::binary_s32(ctx, inst, "SHR.S"),
        BitwiseAnd32 => emit_alu::bitwise(ctx, inst, "AND"),
        BitwiseOr32 => emit_alu::bitwise(ctx, inst, "OR"),
        BitwiseXor32 => emit_alu::bitwise(ctx, inst, "XOR"),
        BitFieldInsert => emit_alu::bit_field_insert(ctx, inst),
        BitFieldSExtract => emit_alu::bit_field_extract(ctx, inst, "BFE.S"),
        BitFieldUExtract => emit_alu::bit_field_extract(ctx, inst, "BFE.U"),
        BitReverse32 => emit_alu::unary_s32(ctx, inst, "BFR.S"),
        BitCount32 => emit_alu::unary_s32(ctx, inst, "BTC.S"),
        BitwiseNot32 => emit_alu::unary_s32(ctx, inst, "NOT.S"),
        FindSMsb32 => emit_alu::unary_s32(ctx, inst, "BTFM.S"),
        FindUMsb32 => emit_alu::unary_u32(ctx, inst, "BTFM.U"),
        SMin32 => emit_alu::binary_s32(ctx, inst, "MIN.S"),
        UMin32 => emit_alu::binary_u32(ctx, inst, "MIN.U"),
        SMax32 => emit_alu::binary_s32(ctx, inst, "MAX.S"),
        UMax32 => emit_alu::binary_u32(ctx, inst, "MAX.U"),
        SClamp32 => emit_alu::clamp_s32(ctx, inst),
        UClamp32 => emit_alu::clamp_u32(ctx, inst),
        SLessThan => emit_alu::compare(ctx, inst, "SLT.S"),
        ULessThan => emit_alu::compare(ctx, inst, "SLT.U"),
        IEqual => emit_alu::compare(ctx, inst, "SEQ.S"),
        SLessThanEqual => emit_alu::compare(ctx, inst, "SLE.S"),
        ULessThanEqual => emit_alu::compare(ctx, inst, "SLE.U"),
        SGreaterThan => emit_alu::compare(ctx, inst, "SGT.S"),
        UGreaterThan => emit_alu::compare(ctx, inst, "SGT.U"),
        INotEqual => emit_alu::compare(ctx, inst, "SNE.S"),
        SGreaterThanEqual => emit_alu::compare(ctx, inst, "SGE.S"),
        UGreaterThanEqual => emit_alu::compare(ctx, inst, "SGE.U"),
        LogicalOr => emit_alu::logical(ctx, inst, "OR.S"),
        LogicalAnd => emit_alu::logical(ctx, inst, "AND.S"),
        LogicalXor => emit_alu::logical(ctx, inst, "XOR.S"),
        LogicalNot => emit_alu::logical_not(ctx, inst),
        ConvertS16F32 => emit_float::convert(ctx, inst, "S16", "F32", false),
        ConvertS32F32 => emit_float::convert(ctx, inst, "S32", "F32", false),
        ConvertU16F32 => emit_float::convert(ctx, inst, "U16", "F32", false),
        ConvertU32F32 => emit_float::convert(ctx, inst, "U32", "F32", false),
        ConvertF32S32 => emit_float::convert(ctx, inst, "F32", "S32", false),
        ConvertF32U32 => emit_float::convert(ctx, inst, "F32", "U32", false),
        ConvertF32U8 => emit_float::convert(ctx, inst, "F32", "U8", false),
        ConvertF32U16 => emit_float::convert(ctx, inst, "F32", "U16", false),
        ConvertS64F32 => emit_float::convert(ctx, inst, "S64", "F32", true),
        ConvertU64F32 => emit_float::convert(ctx, inst, "U64", "F32", true),
        ConvertU64U32 => emit_float::convert(ctx, inst, "U64", "U32", true),
        ConvertU32U64 => emit_float::convert(ctx, inst, "U32", "U64", false),
        ImageSampleImplicitLod | ImageSampleExplicitLod | ImageSampleDrefImplicitLod
        | ImageSampleDrefExplicitLod => emit_image::sample(ctx, inst),
        other => Err(Error::not_implemented(format!("GLASM instruction {}", name_of(other)))),
    }
}
