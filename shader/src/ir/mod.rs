//! Typed value IR: values, instructions, blocks, programs and the
//! construction facade.

mod attribute;
mod block;
mod condition;
mod emitter;
mod inst;
mod modifiers;
mod opcodes;
mod patch;
mod pred;
mod program;
mod reg;
mod typed;
mod types;
mod value;

pub use self::attribute::{Attribute, AttributeType, VaryingState, NUM_GENERICS};
pub use self::block::{Block, BlockEnd};
pub use self::condition::{Condition, FlowTest};
pub use self::emitter::IrEmitter;
pub use self::inst::{AssociatedInsts, Inst, MAX_ARGS};
pub use self::modifiers::{
    FmzMode, FpControl, FpRounding, ImageFormat, InstFlags, TextureInstInfo, TextureType,
};
pub use self::opcodes::{arg_type_of, name_of, num_args_of, type_of, Opcode};
pub use self::patch::Patch;
pub use self::pred::{Pred, NUM_USER_PREDS};
pub use self::program::Program;
pub use self::reg::{Reg, NUM_REGS, NUM_USER_REGS};
pub use self::typed::{F16, F32, F32F64, F64, U1, U16, U32, U32U64, U64, U8, UAny};
pub use self::types::{are_types_compatible, name_of_type, Type};
pub use self::value::{BlockId, InstId, Value};
