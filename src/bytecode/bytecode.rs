//! Bytecode representation: instructions, compiled functions and the
//! executable artifact produced by the compiler and consumed by the VM.

pub mod opcodes;

#[path="compiler/compiler.rs"]
#[cfg(feature = "compiler")]
pub mod compiler;

#[path="runtime/runtime.rs"]
#[cfg(feature = "runtime")]
pub mod runtime;

use crate::prelude::*;
use crate::shared::machine::IntrinsicFunction;
use crate::shared::types::{ArithmeticClass, CFunctionType, CType};
use crate::shared::value::Value;
use opcodes::OpCode;

/// A single instruction: an opcode plus an optional immediate operand.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub op: OpCode,
    pub operand: Operand,
}

/// The immediate operand of an instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    None,
    /// A constant value.
    Value(Value),
    /// A branch target instruction index.
    Target(usize),
    /// A local, argument or global slot index.
    Slot(usize),
    /// An index into the executable's function list.
    Function(usize),
    /// The target class of a conversion.
    Cast(ArithmeticClass),
}

impl Instruction {
    pub fn new(op: OpCode) -> Self {
        Instruction { op, operand: Operand::None }
    }
    pub fn with(op: OpCode, operand: Operand) -> Self {
        Instruction { op, operand }
    }
}

impl Display for Instruction {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Operand::None => write!(f, "{:?}", self.op),
            Operand::Value(value) => write!(f, "{:?} {}", self.op, value),
            Operand::Target(target) => write!(f, "{:?} @{}", self.op, target),
            Operand::Slot(slot) => write!(f, "{:?} [{}]", self.op, slot),
            Operand::Function(index) => write!(f, "{:?} #{}", self.op, index),
            Operand::Cast(class) => write!(f, "{:?} {:?}", self.op, class),
        }
    }
}

/// A local variable slot of a compiled function.
#[derive(Clone, Debug)]
pub struct LocalVariable {
    pub name: String,
    pub ty: CType,
}

/// A global variable slot of an executable.
#[derive(Clone, Debug)]
pub struct GlobalVariable {
    pub name: String,
    pub ty: CType,
}

/// A function compiled to bytecode: its name, instruction sequence, ordered
/// local variable slot table and function type. Immutable once built.
#[derive(Clone, Debug)]
pub struct CompiledFunction {
    pub(crate) name: String,
    pub(crate) ty: CFunctionType,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) local_variables: Vec<LocalVariable>,
}

impl CompiledFunction {
    pub fn name(self: &Self) -> &str {
        &self.name
    }
    pub fn function_type(self: &Self) -> &CFunctionType {
        &self.ty
    }
    pub fn instructions(self: &Self) -> &[Instruction] {
        &self.instructions
    }
    pub fn local_variables(self: &Self) -> &[LocalVariable] {
        &self.local_variables
    }
    /// Renders the instruction sequence as text.
    pub fn disassemble(self: &Self) -> String {
        let mut result = String::new();
        for (index, instruction) in self.instructions.iter().enumerate() {
            result.push_str(&format!("{:4}: {}\n", index, instruction));
        }
        result
    }
}

/// A callable installed in an executable, either compiled from source or
/// implemented by the host. Both kinds share the VM's function stepping
/// contract, implemented in the runtime module.
#[derive(Clone, Debug)]
pub enum Function {
    Compiled(CompiledFunction),
    Intrinsic(IntrinsicFunction),
}

impl Function {
    pub fn name(self: &Self) -> &str {
        match self {
            Function::Compiled(function) => function.name(),
            Function::Intrinsic(intrinsic) => intrinsic.name(),
        }
    }
    pub fn function_type(self: &Self) -> &CFunctionType {
        match self {
            Function::Compiled(function) => function.function_type(),
            Function::Intrinsic(intrinsic) => intrinsic.function_type(),
        }
    }
}

/// A compiled program: the ordered function list (machine intrinsics first,
/// then compiled functions) plus the global variable slots.
#[derive(Clone, Debug, Default)]
pub struct Executable {
    pub(crate) functions: Vec<Function>,
    pub(crate) globals: Vec<GlobalVariable>,
}

impl Executable {
    /// All functions, in table order.
    pub fn functions(self: &Self) -> &[Function] {
        &self.functions
    }
    /// The global variable slots.
    pub fn globals(self: &Self) -> &[GlobalVariable] {
        &self.globals
    }
    /// The function table index for the given name. Compiled functions
    /// shadow intrinsics of the same name.
    pub fn function_index(self: &Self, name: &str) -> Option<usize> {
        self.functions.iter().rposition(|f| f.name() == name)
    }
    /// Looks up a function by name.
    pub fn function(self: &Self, name: &str) -> Option<&Function> {
        self.function_index(name).map(|index| &self.functions[index])
    }
    /// Looks up a compiled function by name.
    pub fn compiled_function(self: &Self, name: &str) -> Option<&CompiledFunction> {
        match self.function(name) {
            Some(Function::Compiled(function)) => Some(function),
            _ => None,
        }
    }
}
