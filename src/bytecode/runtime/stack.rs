//! The operand stack shared by all call frames.

use crate::prelude::*;
use crate::shared::value::Value;
use crate::bytecode::runtime::error::{RuntimeError, RuntimeErrorKind, RuntimeResult};

/// A stack holding temporary operation results and inputs.
#[derive(Debug, Default)]
pub struct ValueStack {
    data: Vec<Value>,
}

impl ValueStack {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn len(self: &Self) -> usize {
        self.data.len()
    }
    pub fn is_empty(self: &Self) -> bool {
        self.data.is_empty()
    }
    /// The stack contents, bottom first.
    pub fn values(self: &Self) -> &[Value] {
        &self.data
    }
    pub fn push(self: &mut Self, value: Value) {
        self.data.push(value);
    }
    pub fn pop(self: &mut Self) -> RuntimeResult<Value> {
        self.data.pop().ok_or_else(|| RuntimeError::new(RuntimeErrorKind::StackUnderflow))
    }
    pub fn top(self: &Self) -> RuntimeResult<Value> {
        self.data.last().copied().ok_or_else(|| RuntimeError::new(RuntimeErrorKind::StackUnderflow))
    }
    pub(crate) fn clear(self: &mut Self) {
        self.data.clear();
    }
}

impl Display for ValueStack {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, value) in self.data.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}

/// Typed stack operations. Values pushed through a primitive type are tagged
/// with its class; values popped are coerced to the requested type.
pub trait StackOp<T> {
    /// Push given value onto the stack.
    fn push_value(self: &mut Self, value: T);
    /// Pop the top value off the stack, coercing it to T.
    fn pop_value(self: &mut Self) -> RuntimeResult<T>;
}

macro_rules! impl_stack {
    ($type:ty, $to:ident) => {
        impl StackOp<$type> for ValueStack {
            fn push_value(self: &mut Self, value: $type) {
                self.push(Value::from(value));
            }
            fn pop_value(self: &mut Self) -> RuntimeResult<$type> {
                Ok(self.pop()?.$to())
            }
        }
    };
}

impl_stack!(i16, to_i16);
impl_stack!(u16, to_u16);
impl_stack!(i32, to_i32);
impl_stack!(u32, to_u32);
impl_stack!(f32, to_f32);
impl_stack!(f64, to_f64);
