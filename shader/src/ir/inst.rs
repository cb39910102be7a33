//! Micro-instructions.

use smallvec::SmallVec;

use crate::ir::modifiers::InstFlags;
use crate::ir::opcodes::{num_args_of, Opcode};
use crate::ir::value::{BlockId, Value};

pub const MAX_ARGS: usize = 5;

pub(crate) enum Args {
    Fixed([Value; MAX_ARGS]),
    Phi(SmallVec<[(BlockId, Value); 2]>),
}

/// Consumers of a producer's side results, at most one per kind.
#[derive(Default)]
pub struct AssociatedInsts {
    pub zero: Option<crate::ir::value::InstId>,
    pub sign: Option<crate::ir::value::InstId>,
    pub carry: Option<crate::ir::value::InstId>,
    pub overflow: Option<crate::ir::value::InstId>,
    pub sparse: Option<crate::ir::value::InstId>,
    pub in_bounds: Option<crate::ir::value::InstId>,
}

pub struct Inst {
    pub(crate) op: Opcode,
    pub(crate) use_count: u32,
    pub(crate) flags: u32,
    pub(crate) definition: u32,
    pub(crate) args: Args,
    pub(crate) assoc: Option<Box<AssociatedInsts>>,
}

impl Inst {
    pub(crate) fn new(op: Opcode, flags: u32) -> Inst {
        let args = if op == Opcode::Phi {
            Args::Phi(SmallVec::new())
        } else {
            Args::Fixed([Value::Void; MAX_ARGS])
        };
        Inst { op, use_count: 0, flags, definition: 0, args, assoc: None }
    }

    pub fn opcode(&self) -> Opcode {
        self.op
    }

    pub fn use_count(&self) -> u32 {
        self.use_count
    }

    pub fn has_uses(&self) -> bool {
        self.use_count > 0
    }

    pub fn num_args(&self) -> usize {
        match &self.args {
            Args::Phi(args) => args.len(),
            Args::Fixed(_) => num_args_of(self.op),
        }
    }

    pub fn arg(&self, index: usize) -> Value {
        match &self.args {
            Args::Phi(args) => args[index].1,
            Args::Fixed(args) => args[index],
        }
    }

    pub fn flags<T: InstFlags>(&self) -> T {
        T::from_raw(self.flags)
    }

    pub fn set_flags<T: InstFlags>(&mut self, value: T) {
        self.flags = value.to_raw();
    }

    /// Back-end private definition slot (an allocated register or id).
    pub fn definition(&self) -> u32 {
        self.definition
    }

    pub fn set_definition(&mut self, definition: u32) {
        self.definition = definition;
    }

    pub fn has_associated_pseudo_operation(&self) -> bool {
        self.assoc.is_some()
    }

    pub fn is_pseudo_instruction(&self) -> bool {
        matches!(
            self.op,
            Opcode::GetZeroFromOp
                | Opcode::GetSignFromOp
                | Opcode::GetCarryFromOp
                | Opcode::GetOverflowFromOp
                | Opcode::GetSparseFromOp
                | Opcode::GetInBoundsFromOp
        )
    }

    /// Register allocation walks usage destructively; these bypass the
    /// argument bookkeeping on purpose.
    pub fn destructive_remove_usage(&mut self) {
        self.use_count -= 1;
    }

    pub fn destructive_add_usage(&mut self, count: u32) {
        self.use_count += count;
    }

    pub fn may_have_side_effects(&self) -> bool {
        use Opcode::*;
        match self.op {
            ConditionRef | Reference | PhiMove | Prologue | Epilogue | Join
            | DemoteToHelperInvocation | Barrier | WorkgroupMemoryBarrier | DeviceMemoryBarrier
            | EmitVertex | EndPrimitive | SetAttribute | SetAttributeIndexed | SetPatch
            | SetFragColor | SetSampleMask | SetFragDepth | WriteGlobalU8 | WriteGlobalS8
            | WriteGlobalU16 | WriteGlobalS16 | WriteGlobal32 | WriteGlobal64 | WriteGlobal128
            | WriteStorageU8 | WriteStorageS8 | WriteStorageU16 | WriteStorageS16
            | WriteStorage32 | WriteStorage64 | WriteStorage128 | WriteLocal | WriteSharedU8
            | WriteSharedU16 | WriteSharedU32 | WriteSharedU64 | WriteSharedU128
            | SharedAtomicIAdd32 | SharedAtomicSMin32 | SharedAtomicUMin32 | SharedAtomicSMax32
            | SharedAtomicUMax32 | SharedAtomicInc32 | SharedAtomicDec32 | SharedAtomicAnd32
            | SharedAtomicOr32 | SharedAtomicXor32 | SharedAtomicExchange32
            | SharedAtomicExchange64 | GlobalAtomicIAdd32 | GlobalAtomicSMin32
            | GlobalAtomicUMin32 | GlobalAtomicSMax32 | GlobalAtomicUMax32 | GlobalAtomicInc32
            | GlobalAtomicDec32 | GlobalAtomicAnd32 | GlobalAtomicOr32 | GlobalAtomicXor32
            | GlobalAtomicExchange32 | GlobalAtomicIAdd64 | GlobalAtomicSMin64
            | GlobalAtomicUMin64 | GlobalAtomicSMax64 | GlobalAtomicUMax64 | GlobalAtomicInc64
            | GlobalAtomicDec64 | GlobalAtomicAnd64 | GlobalAtomicOr64 | GlobalAtomicXor64
            | GlobalAtomicExchange64 | GlobalAtomicAddF32 | GlobalAtomicAddF16x2
            | GlobalAtomicAddF32x2 | GlobalAtomicMinF16x2 | GlobalAtomicMinF32x2
            | GlobalAtomicMaxF16x2 | GlobalAtomicMaxF32x2 | StorageAtomicIAdd32
            | StorageAtomicSMin32 | StorageAtomicUMin32 | StorageAtomicSMax32
            | StorageAtomicUMax32 | StorageAtomicInc32 | StorageAtomicDec32 | StorageAtomicAnd32
            | StorageAtomicOr32 | StorageAtomicXor32 | StorageAtomicExchange32
            | StorageAtomicIAdd64 | StorageAtomicSMin64 | StorageAtomicUMin64
            | StorageAtomicSMax64 | StorageAtomicUMax64 | StorageAtomicAnd64 | StorageAtomicOr64
            | StorageAtomicXor64 | StorageAtomicExchange64 | StorageAtomicAddF32
            | StorageAtomicAddF16x2 | StorageAtomicAddF32x2 | StorageAtomicMinF16x2
            | StorageAtomicMinF32x2 | StorageAtomicMaxF16x2 | StorageAtomicMaxF32x2
            | BindlessImageWrite | BoundImageWrite | ImageWrite | BindlessImageAtomicIAdd32
            | BindlessImageAtomicSMin32 | BindlessImageAtomicUMin32 | BindlessImageAtomicSMax32
            | BindlessImageAtomicUMax32 | BindlessImageAtomicInc32 | BindlessImageAtomicDec32
            | BindlessImageAtomicAnd32 | BindlessImageAtomicOr32 | BindlessImageAtomicXor32
            | BindlessImageAtomicExchange32 | BoundImageAtomicIAdd32 | BoundImageAtomicSMin32
            | BoundImageAtomicUMin32 | BoundImageAtomicSMax32 | BoundImageAtomicUMax32
            | BoundImageAtomicInc32 | BoundImageAtomicDec32 | BoundImageAtomicAnd32
            | BoundImageAtomicOr32 | BoundImageAtomicXor32 | BoundImageAtomicExchange32
            | ImageAtomicIAdd32 | ImageAtomicSMin32 | ImageAtomicUMin32 | ImageAtomicSMax32
            | ImageAtomicUMax32 | ImageAtomicInc32 | ImageAtomicDec32 | ImageAtomicAnd32
            | ImageAtomicOr32 | ImageAtomicXor32 | ImageAtomicExchange32 => true,
            _ => false,
        }
    }
}
