use crate::prelude::*;
use crate::shared::report::Diagnostic;

/// An error generated while building or executing a program.
#[derive(Clone, Debug)]
pub enum Error {
    /// The tokenizer rejected the source text.
    #[cfg(feature = "compiler")]
    Lex(crate::frontend::lexer::error::LexError),
    /// Parsing or bytecode emission reported diagnostics.
    Compile(Vec<Diagnostic>),
    /// Program execution faulted.
    #[cfg(feature = "runtime")]
    Runtime(crate::bytecode::runtime::error::RuntimeError),
}

impl Display for Error {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "compiler")]
            Error::Lex(e) => write!(f, "{}", e),
            Error::Compile(diagnostics) => match diagnostics.first() {
                Some(first) if diagnostics.len() > 1 => write!(f, "{} (and {} more)", first, diagnostics.len() - 1),
                Some(first) => write!(f, "{}", first),
                None => write!(f, "compilation failed"),
            },
            #[cfg(feature = "runtime")]
            Error::Runtime(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(feature = "compiler")]
impl From<crate::frontend::lexer::error::LexError> for Error {
    fn from(error: crate::frontend::lexer::error::LexError) -> Error {
        Error::Lex(error)
    }
}

#[cfg(feature = "runtime")]
impl From<crate::bytecode::runtime::error::RuntimeError> for Error {
    fn from(error: crate::bytecode::runtime::error::RuntimeError) -> Error {
        Error::Runtime(error)
    }
}
