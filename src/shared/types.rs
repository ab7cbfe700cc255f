//! The C type system: basic arithmetic types, pointers, arrays and function
//! types, plus the usual arithmetic conversions between them.

use crate::prelude::*;
use crate::shared::machine::MachineDescription;

/// Signedness of a basic type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Width modifier of a basic type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WidthModifier {
    None,
    Short,
    Long,
    LongLong,
}

/// const/volatile/restrict qualifier set of a type or pointer level.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeQualifiers {
    pub constant: bool,
    pub volatile: bool,
    pub restrict: bool,
}

impl TypeQualifiers {
    pub fn none() -> Self {
        Self::default()
    }
    /// Combines two qualifier sets.
    pub fn merge(self: Self, other: TypeQualifiers) -> TypeQualifiers {
        TypeQualifiers {
            constant: self.constant || other.constant,
            volatile: self.volatile || other.volatile,
            restrict: self.restrict || other.restrict,
        }
    }
}

/// A C type.
#[derive(Clone, Debug, PartialEq)]
pub enum CType {
    Void,
    Basic(CBasicType),
    Pointer(CPointerType),
    Array(CArrayType),
    Function(CFunctionType),
}

/// A basic arithmetic type, e.g. `unsigned short int`.
#[derive(Clone, Debug, PartialEq)]
pub struct CBasicType {
    pub name: String,
    pub signedness: Signedness,
    pub width: WidthModifier,
    pub qualifiers: TypeQualifiers,
}

/// A pointer type. Qualifiers apply to the pointer itself, not the pointee.
#[derive(Clone, Debug, PartialEq)]
pub struct CPointerType {
    pub inner: Box<CType>,
    pub qualifiers: TypeQualifiers,
}

/// An array type. The length remains `None` until either an explicit constant
/// size expression or an initializer list fixes it.
#[derive(Clone, Debug, PartialEq)]
pub struct CArrayType {
    pub element: Box<CType>,
    pub length: Option<usize>,
    pub qualifiers: TypeQualifiers,
}

/// A function type. Callable values are represented by the function type
/// directly, so a pointer to a function collapses to the function type itself.
#[derive(Clone, Debug, PartialEq)]
pub struct CFunctionType {
    pub return_type: Box<CType>,
    pub parameters: Vec<Parameter>,
    pub variadic: bool,
}

/// An ordered function parameter. The name is empty for abstract declarations.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: CType,
}

/// The six width/signedness classes that arithmetic instructions specialize
/// over. The discriminant is the instruction offset added to a family base
/// opcode to select the specialized variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArithmeticClass {
    Int16 = 0,
    UInt16 = 1,
    Int32 = 2,
    UInt32 = 3,
    Float32 = 4,
    Float64 = 5,
}

impl ArithmeticClass {
    /// The instruction offset of this class.
    pub fn offset(self: Self) -> u8 {
        self as u8
    }
    /// The class for the given instruction offset.
    pub fn from_offset(offset: u8) -> Option<ArithmeticClass> {
        match offset {
            0 => Some(ArithmeticClass::Int16),
            1 => Some(ArithmeticClass::UInt16),
            2 => Some(ArithmeticClass::Int32),
            3 => Some(ArithmeticClass::UInt32),
            4 => Some(ArithmeticClass::Float32),
            5 => Some(ArithmeticClass::Float64),
            _ => None,
        }
    }
}

/// An error produced by a type computation.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    /// The operator has no defined combination for the given operand types.
    UnsupportedOperator { op: String, left: String, right: String },
    /// A void value was used where a value is required.
    VoidOperand { op: String },
    /// The type cannot be used in arithmetic.
    NotScalar { ty: String },
    /// A recognized but unsupported type construct.
    Unsupported { what: String },
    /// An array length expression that is not an integer constant.
    NonConstantLength,
}

impl Display for TypeError {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UnsupportedOperator { op, left, right } => {
                write!(f, "Operator '{}' cannot be applied to operands of type '{}' and '{}'", op, left, right)
            }
            TypeError::VoidOperand { op } => write!(f, "Operator '{}' cannot be applied to a void operand", op),
            TypeError::NotScalar { ty } => write!(f, "Type '{}' cannot be used in arithmetic", ty),
            TypeError::Unsupported { what } => write!(f, "Feature not supported: {}", what),
            TypeError::NonConstantLength => write!(f, "Array length is not an integer constant"),
        }
    }
}

pub type TypeResult<T = CType> = Result<T, TypeError>;

/// Width, signedness and floatness of a scalar type on a concrete machine.
#[derive(Copy, Clone, Debug)]
pub(crate) struct ScalarInfo {
    pub bits: u32,
    pub signedness: Signedness,
    pub float: bool,
}

impl CType {
    /// Convenience constructor for an unqualified signed basic type.
    pub fn basic(name: &str) -> CType {
        CType::Basic(CBasicType {
            name: name.to_string(),
            signedness: Signedness::Signed,
            width: WidthModifier::None,
            qualifiers: TypeQualifiers::none(),
        })
    }
    pub fn is_void(self: &Self) -> bool {
        matches!(self, CType::Void)
    }
    pub fn is_function(self: &Self) -> bool {
        matches!(self, CType::Function(_))
    }
    pub fn is_array(self: &Self) -> bool {
        matches!(self, CType::Array(_))
    }
    /// Number of value slots a variable of this type occupies.
    pub fn slot_count(self: &Self) -> Option<usize> {
        match self {
            CType::Array(array) => Some(array.length? * array.element.slot_count()?),
            CType::Void => None,
            _ => Some(1),
        }
    }
    /// Width, signedness and floatness of this type on the given machine.
    pub(crate) fn scalar_info(self: &Self, machine: &MachineDescription) -> TypeResult<ScalarInfo> {
        match self {
            CType::Basic(basic) => {
                let (bits, float) = match (&basic.name[..], basic.width) {
                    ("char", WidthModifier::None) => (machine.char_bits, false),
                    ("int", WidthModifier::None) => (machine.int_bits, false),
                    ("int", WidthModifier::Short) => (machine.int_bits, false),
                    ("int", WidthModifier::Long) => (machine.long_bits, false),
                    ("float", WidthModifier::None) => (machine.float_bits, true),
                    ("double", WidthModifier::None) => (machine.double_bits, true),
                    ("double", WidthModifier::Long) => (machine.double_bits, true),
                    _ => return Err(TypeError::Unsupported { what: format!("type '{}'", self) }),
                };
                Ok(ScalarInfo { bits, signedness: basic.signedness, float })
            }
            // pointers, arrays and functions compare as unsigned pointer-width integers
            CType::Pointer(_) | CType::Array(_) | CType::Function(_) => Ok(ScalarInfo {
                bits: machine.pointer_bits,
                signedness: Signedness::Unsigned,
                float: false,
            }),
            CType::Void => Err(TypeError::NotScalar { ty: self.to_string() }),
        }
    }
    /// The width/signedness class instructions operating on this type use.
    /// Basic types narrower than `int` promote into the int class.
    pub fn arithmetic_class(self: &Self, machine: &MachineDescription) -> TypeResult<ArithmeticClass> {
        let info = self.scalar_info(machine)?;
        if info.float {
            return match info.bits {
                32 => Ok(ArithmeticClass::Float32),
                64 => Ok(ArithmeticClass::Float64),
                _ => Err(TypeError::NotScalar { ty: self.to_string() }),
            };
        }
        let promoted = info.bits.max(machine.int_bits);
        let unsigned = info.signedness == Signedness::Unsigned && info.bits == promoted;
        match (promoted, unsigned) {
            (16, false) => Ok(ArithmeticClass::Int16),
            (16, true) => Ok(ArithmeticClass::UInt16),
            (32, false) => Ok(ArithmeticClass::Int32),
            (32, true) => Ok(ArithmeticClass::UInt32),
            _ => Err(TypeError::NotScalar { ty: self.to_string() }),
        }
    }
}

impl Display for CType {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Void => write!(f, "void"),
            CType::Basic(basic) => {
                if basic.signedness == Signedness::Unsigned {
                    write!(f, "unsigned ")?;
                }
                match basic.width {
                    WidthModifier::None => {}
                    WidthModifier::Short => write!(f, "short ")?,
                    WidthModifier::Long => write!(f, "long ")?,
                    WidthModifier::LongLong => write!(f, "long long ")?,
                }
                write!(f, "{}", basic.name)
            }
            CType::Pointer(pointer) => write!(f, "{} *", pointer.inner),
            CType::Array(array) => match array.length {
                Some(length) => write!(f, "{} [{}]", array.element, length),
                None => write!(f, "{} []", array.element),
            },
            CType::Function(function) => {
                write!(f, "{} (", function.return_type)?;
                for (index, parameter) in function.parameters.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", parameter.ty)?;
                }
                if function.variadic {
                    if !function.parameters.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Operators that only accept integer operands.
const INTEGER_ONLY_OPERATORS: &[&str] = &["%", "<<", ">>", "&", "|", "^"];

/// Operators pointer-like operands may participate in.
const COMPARISON_OPERATORS: &[&str] = &["==", "!=", "<", "<=", ">", ">="];

/// Computes the common arithmetic type of two operand types for the given
/// operator. Widens to the larger integer/floating width present in either
/// operand (never below the machine's int width); the result is unsigned if
/// either operand is unsigned at the chosen width. The operator name is
/// carried only for diagnostic text, except that pointer-like operands are
/// admitted for comparison operators only and floats are rejected for the
/// integer-only operators.
pub fn common_arithmetic_type(left: &CType, right: &CType, op: &str, machine: &MachineDescription) -> TypeResult {
    if left.is_void() || right.is_void() {
        return Err(TypeError::VoidOperand { op: op.to_string() });
    }

    let pointer_like = |ty: &CType| matches!(ty, CType::Pointer(_) | CType::Array(_) | CType::Function(_));
    if pointer_like(left) || pointer_like(right) {
        if !COMPARISON_OPERATORS.contains(&op) {
            return Err(TypeError::UnsupportedOperator {
                op: op.to_string(),
                left: left.to_string(),
                right: right.to_string(),
            });
        }
        return basic_from_bits(machine.pointer_bits, Signedness::Unsigned, false, machine);
    }

    let left_info = left.scalar_info(machine)?;
    let right_info = right.scalar_info(machine)?;

    if (left_info.float || right_info.float) && INTEGER_ONLY_OPERATORS.contains(&op) {
        return Err(TypeError::UnsupportedOperator {
            op: op.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        });
    }

    if left_info.float || right_info.float {
        let bits = [left_info, right_info].iter().filter(|i| i.float).map(|i| i.bits).max().unwrap_or(machine.float_bits);
        return basic_from_bits(bits, Signedness::Signed, true, machine);
    }

    let bits = left_info.bits.max(right_info.bits).max(machine.int_bits);
    let unsigned = (left_info.signedness == Signedness::Unsigned && left_info.bits == bits)
        || (right_info.signedness == Signedness::Unsigned && right_info.bits == bits);
    let signedness = if unsigned { Signedness::Unsigned } else { Signedness::Signed };
    basic_from_bits(bits, signedness, false, machine)
}

/// The canonical basic type of the given width on the given machine.
fn basic_from_bits(bits: u32, signedness: Signedness, float: bool, machine: &MachineDescription) -> TypeResult {
    let (name, width) = if float {
        match bits {
            32 => ("float", WidthModifier::None),
            64 => ("double", WidthModifier::None),
            _ => return Err(TypeError::Unsupported { what: format!("{} bit float type", bits) }),
        }
    } else if bits == machine.int_bits {
        ("int", WidthModifier::None)
    } else if bits == machine.long_bits {
        ("int", WidthModifier::Long)
    } else if bits == machine.char_bits {
        ("char", WidthModifier::None)
    } else {
        return Err(TypeError::Unsupported { what: format!("{} bit integer type", bits) });
    };
    Ok(CType::Basic(CBasicType {
        name: name.to_string(),
        signedness,
        width,
        qualifiers: TypeQualifiers::none(),
    }))
}
