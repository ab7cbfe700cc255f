//! Opcode definitions. The table is flat: each arithmetic family occupies six
//! consecutive discriminants ordered by [ArithmeticClass] offset, so that
//! family base + class offset selects the width/signedness specialized
//! variant. The discriminants are fixed so bytecode dumps stay comparable.

use crate::shared::types::ArithmeticClass;

macro_rules! opcodes {
    (
        singles {
            $( $(#[$single_meta:meta])* $single:ident = $single_value:literal ),+ $(,)?
        }
        families {
            $( $(#[$family_meta:meta])* $family:ident = $family_value:literal ),+ $(,)?
        }
    ) => { paste::paste! {
        /// A bytecode operation. Arithmetic operations are specialized per
        /// [ArithmeticClass]; all other operations exist exactly once.
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum OpCode {
            $(
                $(#[$single_meta])*
                $single = $single_value,
            )+
            $(
                $(#[$family_meta])*
                [<$family Int16>] = $family_value,
                [<$family UInt16>] = $family_value + 1,
                [<$family Int32>] = $family_value + 2,
                [<$family UInt32>] = $family_value + 3,
                [<$family Float32>] = $family_value + 4,
                [<$family Float64>] = $family_value + 5,
            )+
        }

        impl OpCode {
            /// Returns the opcode for the given discriminant.
            pub fn from_u8(value: u8) -> Option<OpCode> {
                match value {
                    $(
                        $single_value => Some(OpCode::$single),
                    )+
                    $(
                        $family_value => Some(OpCode::[<$family Int16>]),
                        v if v == $family_value + 1 => Some(OpCode::[<$family UInt16>]),
                        v if v == $family_value + 2 => Some(OpCode::[<$family Int32>]),
                        v if v == $family_value + 3 => Some(OpCode::[<$family UInt32>]),
                        v if v == $family_value + 4 => Some(OpCode::[<$family Float32>]),
                        v if v == $family_value + 5 => Some(OpCode::[<$family Float64>]),
                    )+
                    _ => None,
                }
            }
        }
    } };
}

opcodes! {
    singles {
        /// Does nothing.
        Nop = 0,
        /// Push the constant given by the operand onto the operand stack.
        LoadValue = 1,
        /// Push the argument slot given by the operand.
        LoadArg = 2,
        /// Pop a value into the argument slot given by the operand.
        StoreArg = 3,
        /// Push the local slot given by the operand.
        LoadLocal = 4,
        /// Pop a value into the local slot given by the operand.
        StoreLocal = 5,
        /// Push the global slot given by the operand.
        LoadGlobal = 6,
        /// Pop a value into the global slot given by the operand.
        StoreGlobal = 7,
        /// Duplicate the top of the operand stack.
        Dup = 8,
        /// Discard the top of the operand stack.
        Pop = 9,
        /// Continue execution at the instruction index given by the operand.
        Jump = 10,
        /// Pop a value; if it is zero, continue at the instruction index
        /// given by the operand.
        BranchIfFalse = 11,
        /// Call the function given by the operand. The caller has pushed the
        /// arguments left to right; the callee consumes exactly its declared
        /// parameter count during frame initialization.
        Call = 12,
        /// Return from the current function, leaving the return value (if
        /// any) on the operand stack.
        Return = 13,
        /// Pop a value and push 1 if it was zero, otherwise 0.
        LogicalNot = 14,
        /// Pop a value and push its arithmetic negation.
        Negate = 15,
        /// Pop a value and push it converted to the class given by the
        /// operand. Only emitted when source and target classes differ.
        Convert = 16,
    }
    families {
        /// Pop two values, push their sum.
        Add = 32,
        /// Pop two values, push their difference.
        Subtract = 38,
        /// Pop two values, push their product.
        Multiply = 44,
        /// Pop two values, push their quotient. Integer division by zero is
        /// a runtime fault.
        Divide = 50,
        /// Pop two values, push the division remainder. Integer division by
        /// zero is a runtime fault.
        Modulo = 56,
        /// Pop two values, push the first shifted left by the second.
        ShiftLeft = 62,
        /// Pop two values, push the first shifted right by the second.
        ShiftRight = 68,
        /// Pop two values, push their bitwise conjunction.
        BinaryAnd = 74,
        /// Pop two values, push their bitwise disjunction.
        BinaryOr = 80,
        /// Pop two values, push their bitwise exclusive disjunction.
        BinaryXor = 86,
        /// Pop two values, push 1 if they are equal, otherwise 0.
        EqualTo = 92,
        /// Pop two values, push 1 if the first is less than the second,
        /// otherwise 0.
        LessThan = 98,
        /// Pop two values, push 1 if the first is greater than the second,
        /// otherwise 0.
        GreaterThan = 104,
    }
}

const FAMILY_FIRST: u8 = OpCode::AddInt16 as u8;
const FAMILY_END: u8 = OpCode::GreaterThanFloat64 as u8 + 1;
const CLASS_COUNT: u8 = 6;

impl OpCode {
    /// Selects the width/signedness specialized variant of a family base
    /// opcode by adding the class's instruction offset.
    pub fn offset(self: Self, class: ArithmeticClass) -> OpCode {
        OpCode::from_u8(self as u8 + class.offset()).expect("class offset escapes the opcode table")
    }
    /// Splits an arithmetic opcode into its family base and class. Returns
    /// `None` for non-arithmetic opcodes.
    pub(crate) fn family(self: Self) -> Option<(OpCode, ArithmeticClass)> {
        let value = self as u8;
        if !(FAMILY_FIRST..FAMILY_END).contains(&value) {
            return None;
        }
        let base = value - (value - FAMILY_FIRST) % CLASS_COUNT;
        Some((
            OpCode::from_u8(base).expect("family base is in the opcode table"),
            ArithmeticClass::from_offset((value - base) % CLASS_COUNT).expect("class offset is below CLASS_COUNT"),
        ))
    }
}
