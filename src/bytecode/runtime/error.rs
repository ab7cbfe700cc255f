use crate::prelude::*;

/// Represents the various possible runtime error-kinds. Runtime faults are
/// fatal to the running program and propagate to the host; the VM never
/// silently truncates the operand stack.
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeErrorKind {
    DivideByZero,
    StackUnderflow,
    InvalidAddress,
    UnknownFunction(String),
    IntrinsicResultMissing(String),
    UnsupportedInstruction,
    NotReady,
    Internal(&'static str),
}

/// An error reported by the runtime.
#[derive(Clone, Debug)]
pub struct RuntimeError {
    kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub(crate) fn new(kind: RuntimeErrorKind) -> RuntimeError {
        Self { kind }
    }
    /// The kind of the error.
    pub fn kind(self: &Self) -> &RuntimeErrorKind {
        &self.kind
    }
}

impl From<RuntimeErrorKind> for RuntimeError {
    fn from(kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError::new(kind)
    }
}

impl Display for RuntimeError {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RuntimeErrorKind::DivideByZero => write!(f, "Integer division by zero"),
            RuntimeErrorKind::StackUnderflow => write!(f, "Operand stack underflow"),
            RuntimeErrorKind::InvalidAddress => write!(f, "Invalid instruction or slot address"),
            RuntimeErrorKind::UnknownFunction(name) => write!(f, "Unknown function '{}'", name),
            RuntimeErrorKind::IntrinsicResultMissing(name) => {
                write!(f, "Intrinsic '{}' returned no value although its signature declares one", name)
            }
            RuntimeErrorKind::UnsupportedInstruction => write!(f, "Unsupported instruction"),
            RuntimeErrorKind::NotReady => write!(f, "VM state is not ready"),
            RuntimeErrorKind::Internal(message) => write!(f, "Internal runtime error: {}", message),
        }
    }
}

pub type RuntimeResult<T = ()> = Result<T, RuntimeError>;
