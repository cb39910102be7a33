//! Error type.
//!
//! This is the shared error type for the whole crate. Deep call sites return
//! one of these; only the outermost compile entry points turn them into a
//! compile failure for the caller.

use std::{error, fmt};

#[derive(Clone, Debug)]
pub enum Error {
    /// An IR builder received incompatible operand types or an out-of-range
    /// index.
    InvalidArgument(String),
    /// A violated internal invariant.
    LogicError(String),
    /// A reachable but unsupported opcode or pattern.
    NotImplemented(String),
    /// Host-side exhaustion that cannot be avoided.
    RuntimeError(String),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Error {
        Error::InvalidArgument(msg.into())
    }

    pub fn logic(msg: impl Into<String>) -> Error {
        Error::LogicError(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Error {
        Error::NotImplemented(msg.into())
    }

    pub fn runtime(msg: impl Into<String>) -> Error {
        Error::RuntimeError(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::LogicError(msg) => write!(f, "logic error: {}", msg),
            Error::NotImplemented(msg) => write!(f, "not implemented: {}", msg),
            Error::RuntimeError(msg) => write!(f, "runtime error: {}", msg),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
