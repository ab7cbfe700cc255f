//! Bitsy, a small C compiler and stack-machine runtime for embedded use.
//!
//! Compiles a statically typed, C-like source language into a compact
//! stack-based bytecode and executes it on a small virtual machine, intended
//! for embedding interpreted program execution inside a host simulation,
//! e.g. simulating a microcontroller while native intrinsic functions model
//! hardware side effects.
//!
//! ```
//! use std::rc::Rc;
//! use bitsy::{MachineDescription, Value};
//!
//! let mut machine = MachineDescription::new("demo");
//! machine
//!     .register_prototype("void led(int on)", Rc::new(|args: &[Value]| {
//!         println!("led: {}", args[0]);
//!         None
//!     }))
//!     .unwrap();
//!
//! let mut vm = bitsy::vm("
//!     int brightness;
//!
//!     void set(int value) {
//!         brightness = value;
//!         led(brightness > 0);
//!     }
//! ", &machine).unwrap();
//!
//! vm.call("set", &[ Value::Int16(42) ]).unwrap();
//! ```
//!
//! Hosts that need finer control drive the pipeline themselves via [lex],
//! [parse] and [compile], and single-step the [VM] for breakpointing or
//! cooperative scheduling with other simulated components.

#[path="shared/shared.rs"]
mod shared;

#[path="frontend/frontend.rs"]
#[cfg(feature = "compiler")]
pub mod frontend;

#[path="bytecode/bytecode.rs"]
pub mod bytecode;

pub(crate) mod prelude;

pub use shared::error::Error;
pub use shared::machine::{IntrinsicFunction, IntrinsicHandler, MachineDescription};
pub use shared::report::{Diagnostic, Printer, Report, Severity, StdoutPrinter};
pub use shared::types::{
    common_arithmetic_type, ArithmeticClass, CArrayType, CBasicType, CFunctionType, CPointerType,
    CType, Parameter, Signedness, TypeError, TypeQualifiers, WidthModifier,
};
pub use shared::value::Value;
pub use bytecode::{CompiledFunction, Executable, Function, GlobalVariable, Instruction, LocalVariable, Operand};
pub use bytecode::opcodes::OpCode;
#[cfg(feature = "compiler")]
pub use frontend::lexer::{lex, error::LexError, token::{Token, TokenKind}};
#[cfg(feature = "compiler")]
pub use frontend::parser::{parse, ParserOptions};
#[cfg(feature = "compiler")]
pub use frontend::ast::TranslationUnit;
#[cfg(feature = "compiler")]
pub use bytecode::compiler::compile;
#[cfg(feature = "runtime")]
pub use bytecode::runtime::error::{RuntimeError, RuntimeErrorKind};
#[cfg(feature = "runtime")]
pub use bytecode::runtime::vm::{ExecutionState, Frame, FrameState, VM, VMState};

/// One stop shop to lex, parse and compile the given source code against the
/// given machine description. Parse and emission diagnostics land in the
/// report; callers must check its error count before trusting the result.
#[cfg(feature = "compiler")]
pub fn build(source: &str, machine: &MachineDescription, report: &mut Report) -> Result<Executable, Error> {
    let tokens = frontend::lexer::lex(source)?;
    let unit = frontend::parser::parse(&tokens, report, ParserOptions::default());
    Ok(bytecode::compiler::compile(&unit, machine, report))
}

/// One stop shop to compile the given source code and create a VM for it.
/// Fails if any diagnostics were reported.
#[cfg(all(feature = "compiler", feature = "runtime"))]
pub fn vm(source: &str, machine: &MachineDescription) -> Result<VM, Error> {
    let mut report = Report::new();
    let executable = build(source, machine, &mut report)?;
    if report.error_count() > 0 {
        return Err(Error::Compile(report.into_diagnostics()));
    }
    Ok(VM::new(executable))
}
