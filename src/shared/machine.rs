//! Target machine description: basic type widths and the table of intrinsic
//! functions the host exposes to compiled code.

use crate::prelude::*;
use crate::shared::types::CFunctionType;
use crate::shared::value::Value;

/// Handler invoked when an intrinsic function is stepped. Receives the bound
/// argument values and returns the function's result, if it declares one.
pub type IntrinsicHandler = Rc<dyn Fn(&[Value]) -> Option<Value>>;

/// A host-implemented function callable from compiled code. Shares the
/// function stepping contract with compiled functions: the VM binds its
/// declared arguments, then a single step invokes the handler.
#[derive(Clone)]
pub struct IntrinsicFunction {
    name: String,
    ty: CFunctionType,
    handler: IntrinsicHandler,
}

impl IntrinsicFunction {
    pub fn new(name: impl Into<String>, ty: CFunctionType, handler: IntrinsicHandler) -> Self {
        IntrinsicFunction { name: name.into(), ty, handler }
    }
    pub fn name(self: &Self) -> &str {
        &self.name
    }
    pub fn function_type(self: &Self) -> &CFunctionType {
        &self.ty
    }
    pub(crate) fn invoke(self: &Self, args: &[Value]) -> Option<Value> {
        (self.handler)(args)
    }
}

impl Debug for IntrinsicFunction {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntrinsicFunction").field("name", &self.name).field("ty", &self.ty).finish()
    }
}

/// Describes the compilation target: widths of the basic types in bits and
/// the intrinsic functions available to compiled code. The defaults model a
/// small 16 bit microcontroller.
#[derive(Clone, Debug)]
pub struct MachineDescription {
    pub name: String,
    pub char_bits: u32,
    pub int_bits: u32,
    pub long_bits: u32,
    pub pointer_bits: u32,
    pub float_bits: u32,
    pub double_bits: u32,
    intrinsics: Vec<IntrinsicFunction>,
}

impl MachineDescription {
    /// Creates a 16 bit machine description with no intrinsics.
    pub fn new(name: impl Into<String>) -> Self {
        MachineDescription {
            name: name.into(),
            char_bits: 8,
            int_bits: 16,
            long_bits: 32,
            pointer_bits: 16,
            float_bits: 32,
            double_bits: 64,
            intrinsics: Vec::new(),
        }
    }
    /// Registers an intrinsic function under the given name and signature.
    pub fn register(self: &mut Self, name: impl Into<String>, ty: CFunctionType, handler: IntrinsicHandler) {
        self.intrinsics.push(IntrinsicFunction::new(name, ty, handler));
    }
    /// Registers an intrinsic function from a C prototype, e.g.
    /// `"void pin_mode(int pin, int mode)"`.
    #[cfg(feature = "compiler")]
    pub fn register_prototype(self: &mut Self, prototype: &str, handler: IntrinsicHandler) -> Result<(), crate::shared::error::Error> {
        use crate::shared::error::Error;
        use crate::shared::report::Report;
        use crate::frontend::{lexer, parser};

        let source = format!("{};", prototype.trim().trim_end_matches(';'));
        let tokens = lexer::lex(&source).map_err(Error::Lex)?;
        let mut report = Report::new();
        let unit = parser::parse(&tokens, &mut report, parser::ParserOptions::default());
        if report.error_count() > 0 {
            return Err(Error::Compile(report.into_diagnostics()));
        }
        let function = unit.block.functions.first().ok_or_else(|| {
            Error::Compile(vec![crate::shared::report::Diagnostic {
                severity: crate::shared::report::Severity::Error,
                code: 9002,
                message: format!("'{}' does not declare a function", prototype),
            }])
        })?;
        self.register(function.name.clone(), function.ty.clone(), handler);
        Ok(())
    }
    /// The registered intrinsic functions, in registration order.
    pub fn intrinsics(self: &Self) -> &[IntrinsicFunction] {
        &self.intrinsics
    }
    /// Looks up an intrinsic by name.
    pub fn intrinsic(self: &Self, name: &str) -> Option<&IntrinsicFunction> {
        self.intrinsics.iter().find(|i| i.name == name)
    }
}
