//! Phantom-typed wrappers over [`Value`].
//!
//! A wrapper witnesses that its value's resolved type intersects the
//! wrapper's mask; construction fails otherwise. Union wrappers such as
//! [`F32F64`] accept any member of the union.

use crate::error::{Error, Result};
use crate::ir::program::Program;
use crate::ir::types::{name_of_type, Type};
use crate::ir::value::Value;

macro_rules! typed_value {
    ($(#[$meta:meta])* $name:ident, $mask:expr) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub struct $name(Value);

        impl $name {
            pub const TYPE_MASK: Type = $mask;

            pub fn new(value: Value, program: &Program) -> Result<$name> {
                let ty = value.ty(program);
                if (ty & $mask) == Type::VOID && ty != Type::OPAQUE {
                    return Err(Error::invalid_argument(format!(
                        "incompatible types {} and {}",
                        name_of_type($mask),
                        name_of_type(ty)
                    )));
                }
                Ok($name(value))
            }

            /// For values whose type the caller just established, e.g. the
            /// result of emitting an opcode with a known return type.
            pub(crate) fn from_emitted(value: Value) -> $name {
                $name(value)
            }

            pub fn value(self) -> Value {
                self.0
            }
        }

        impl From<$name> for Value {
            fn from(typed: $name) -> Value {
                typed.0
            }
        }
    };
}

typed_value!(U1, Type::U1);
typed_value!(U8, Type::U8);
typed_value!(U16, Type::U16);
typed_value!(U32, Type::U32);
typed_value!(U64, Type::U64);
typed_value!(F16, Type::F16);
typed_value!(F32, Type::F32);
typed_value!(F64, Type::F64);
typed_value!(
    /// A 32- or 64-bit unsigned value.
    U32U64,
    Type::from_bits_truncate(Type::U32.bits() | Type::U64.bits())
);
typed_value!(
    /// A single- or double-precision float.
    F32F64,
    Type::from_bits_truncate(Type::F32.bits() | Type::F64.bits())
);
typed_value!(
    UAny,
    Type::from_bits_truncate(
        Type::U8.bits() | Type::U16.bits() | Type::U32.bits() | Type::U64.bits()
    )
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    #[test]
    fn guards_reject_mismatches() {
        let program = Program::new(Stage::Compute);
        assert!(U32::new(Value::U32(1), &program).is_ok());
        assert!(U32::new(Value::imm_f32(1.0), &program).is_err());
        assert!(F32F64::new(Value::imm_f64(1.0), &program).is_ok());
        assert!(F32F64::new(Value::U1(true), &program).is_err());
    }
}
