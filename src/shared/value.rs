//! Tagged runtime value. One value occupies one operand stack or variable slot.

use crate::prelude::*;
use crate::shared::types::ArithmeticClass;

/// A single runtime value, tagged with its arithmetic class.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float32(f32),
    Float64(f64),
}

macro_rules! impl_value_conversions {
    ($( $name:ident, $type:ty, $variant:ident ),+ $(,)?) => {
        impl Value {
            $(
                /// Coerces the value with C cast semantics.
                pub(crate) fn $name(self: Self) -> $type {
                    match self {
                        Value::Int16(v) => v as $type,
                        Value::UInt16(v) => v as $type,
                        Value::Int32(v) => v as $type,
                        Value::UInt32(v) => v as $type,
                        Value::Float32(v) => v as $type,
                        Value::Float64(v) => v as $type,
                    }
                }
            )+
        }
        $(
            impl From<$type> for Value {
                fn from(value: $type) -> Value {
                    Value::$variant(value)
                }
            }
        )+
    };
}

impl_value_conversions! {
    to_i16, i16, Int16,
    to_u16, u16, UInt16,
    to_i32, i32, Int32,
    to_u32, u32, UInt32,
    to_f32, f32, Float32,
    to_f64, f64, Float64,
}

impl Value {
    /// The arithmetic class of this value.
    pub fn class(self: Self) -> ArithmeticClass {
        match self {
            Value::Int16(_) => ArithmeticClass::Int16,
            Value::UInt16(_) => ArithmeticClass::UInt16,
            Value::Int32(_) => ArithmeticClass::Int32,
            Value::UInt32(_) => ArithmeticClass::UInt32,
            Value::Float32(_) => ArithmeticClass::Float32,
            Value::Float64(_) => ArithmeticClass::Float64,
        }
    }
    /// The zero value of the given class.
    pub fn zero(class: ArithmeticClass) -> Value {
        match class {
            ArithmeticClass::Int16 => Value::Int16(0),
            ArithmeticClass::UInt16 => Value::UInt16(0),
            ArithmeticClass::Int32 => Value::Int32(0),
            ArithmeticClass::UInt32 => Value::UInt32(0),
            ArithmeticClass::Float32 => Value::Float32(0.0),
            ArithmeticClass::Float64 => Value::Float64(0.0),
        }
    }
    /// Converts the value to the given class.
    pub fn convert(self: Self, class: ArithmeticClass) -> Value {
        match class {
            ArithmeticClass::Int16 => Value::Int16(self.to_i16()),
            ArithmeticClass::UInt16 => Value::UInt16(self.to_u16()),
            ArithmeticClass::Int32 => Value::Int32(self.to_i32()),
            ArithmeticClass::UInt32 => Value::UInt32(self.to_u32()),
            ArithmeticClass::Float32 => Value::Float32(self.to_f32()),
            ArithmeticClass::Float64 => Value::Float64(self.to_f64()),
        }
    }
    /// Returns whether the value is zero, i.e. false in a condition.
    pub fn is_zero(self: Self) -> bool {
        match self {
            Value::Int16(v) => v == 0,
            Value::UInt16(v) => v == 0,
            Value::Int32(v) => v == 0,
            Value::UInt32(v) => v == 0,
            Value::Float32(v) => v == 0.0,
            Value::Float64(v) => v == 0.0,
        }
    }
    /// The arithmetic negation of the value, wrapping for integers.
    pub fn negated(self: Self) -> Value {
        match self {
            Value::Int16(v) => Value::Int16(v.wrapping_neg()),
            Value::UInt16(v) => Value::UInt16(v.wrapping_neg()),
            Value::Int32(v) => Value::Int32(v.wrapping_neg()),
            Value::UInt32(v) => Value::UInt32(v.wrapping_neg()),
            Value::Float32(v) => Value::Float32(-v),
            Value::Float64(v) => Value::Float64(-v),
        }
    }
}

impl Display for Value {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int16(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
        }
    }
}
