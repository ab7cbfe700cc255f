use crate::prelude::*;
use crate::shared::types::TypeError;

/// Represents the various possible emitter error-kinds. Each maps to a fixed
/// diagnostic code reported through the sink.
#[derive(Clone, Debug)]
pub enum CompileErrorKind {
    /// 19: the operator has no defined combination for the operand types.
    UnsupportedOperator { op: String, left: String, right: String },
    /// 30: a void value was used where a value is required.
    VoidValue,
    /// 103: an undeclared name was referenced.
    UndefinedName(String),
    /// 111: a name was declared twice in the same scope.
    AlreadyDefined(String),
    /// 126: return without a value in a function returning a value.
    ReturnValueRequired(String),
    /// 127: return with a value in a void function.
    ReturnValueNotAllowed(String),
    /// 139: break or continue outside of a loop.
    NoEnclosingLoop,
    /// 161: not all control flow paths return a value.
    MissingReturn(String),
    /// 270: a variable of array type without a resolved length.
    IncompleteType(String),
    /// 847: an initializer list longer than the array it initializes.
    TooManyInitializers(String),
    /// 1501: a call with the wrong number of arguments.
    WrongArgumentCount { name: String, expected: usize, got: usize },
    /// 9002: a recognized but unsupported construct.
    NotSupported(String),
    /// 9001: an internal invariant was violated.
    Internal(String),
}

/// An error reported by the bytecode emitter. Caught per function: the error
/// becomes a diagnostic and compilation continues with the next function.
#[derive(Clone, Debug)]
pub struct CompileError {
    kind: CompileErrorKind,
}

impl CompileError {
    pub(crate) fn new(kind: CompileErrorKind) -> CompileError {
        Self { kind }
    }
    pub(crate) fn internal(message: impl Into<String>) -> CompileError {
        Self { kind: CompileErrorKind::Internal(message.into()) }
    }
    /// The kind of the error.
    pub fn kind(self: &Self) -> &CompileErrorKind {
        &self.kind
    }
    /// The diagnostic code reported for this error.
    pub fn code(self: &Self) -> u32 {
        match &self.kind {
            CompileErrorKind::UnsupportedOperator { .. } => 19,
            CompileErrorKind::VoidValue => 30,
            CompileErrorKind::UndefinedName(_) => 103,
            CompileErrorKind::AlreadyDefined(_) => 111,
            CompileErrorKind::ReturnValueRequired(_) => 126,
            CompileErrorKind::ReturnValueNotAllowed(_) => 127,
            CompileErrorKind::NoEnclosingLoop => 139,
            CompileErrorKind::MissingReturn(_) => 161,
            CompileErrorKind::IncompleteType(_) => 270,
            CompileErrorKind::TooManyInitializers(_) => 847,
            CompileErrorKind::WrongArgumentCount { .. } => 1501,
            CompileErrorKind::NotSupported(_) => 9002,
            CompileErrorKind::Internal(_) => 9001,
        }
    }
}

impl From<TypeError> for CompileError {
    fn from(error: TypeError) -> CompileError {
        let kind = match error {
            TypeError::UnsupportedOperator { op, left, right } => {
                CompileErrorKind::UnsupportedOperator { op, left, right }
            }
            TypeError::VoidOperand { .. } => CompileErrorKind::VoidValue,
            TypeError::NotScalar { ty } => CompileErrorKind::NotSupported(format!("arithmetic on type '{}'", ty)),
            TypeError::Unsupported { what } => CompileErrorKind::NotSupported(what),
            TypeError::NonConstantLength => CompileErrorKind::NotSupported("non-constant array lengths".to_string()),
        };
        CompileError::new(kind)
    }
}

impl Display for CompileError {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CompileErrorKind::UnsupportedOperator { op, left, right } => {
                write!(f, "Operator '{}' cannot be applied to operands of type '{}' and '{}'", op, left, right)
            }
            CompileErrorKind::VoidValue => write!(f, "Cannot convert type 'void' to a value"),
            CompileErrorKind::UndefinedName(name) => write!(f, "The name '{}' does not exist in the current context", name),
            CompileErrorKind::AlreadyDefined(name) => write!(f, "The name '{}' is already defined in this scope", name),
            CompileErrorKind::ReturnValueRequired(name) => {
                write!(f, "'{}': a return keyword must be followed by an object expression", name)
            }
            CompileErrorKind::ReturnValueNotAllowed(name) => {
                write!(f, "'{}': since the function returns void, a return keyword must not be followed by an object expression", name)
            }
            CompileErrorKind::NoEnclosingLoop => write!(f, "No enclosing loop out of which to break or continue"),
            CompileErrorKind::MissingReturn(name) => write!(f, "'{}': not all code paths return a value", name),
            CompileErrorKind::IncompleteType(name) => write!(f, "'{}' has an array type with an unresolved length", name),
            CompileErrorKind::TooManyInitializers(name) => write!(f, "Too many initializers for '{}'", name),
            CompileErrorKind::WrongArgumentCount { name, expected, got } => {
                write!(f, "'{}' takes {} arguments, {} given", name, expected, got)
            }
            CompileErrorKind::NotSupported(what) => write!(f, "Feature not supported: {}", what),
            CompileErrorKind::Internal(message) => write!(f, "Internal compiler error: {}", message),
        }
    }
}

pub type CompileResult<T = ()> = Result<T, CompileError>;
