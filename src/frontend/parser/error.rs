use crate::prelude::*;
use crate::frontend::lexer::token::Position;

/// Represents the various possible parser error-kinds, classified into the
/// severities funneled to the diagnostic sink.
#[derive(Clone, Debug)]
pub enum ParseErrorKind {
    /// The grammar could not derive a node.
    SyntaxError,
    /// A grammar feature that is recognized but not implemented.
    NotImplemented(&'static str),
    /// A construct that is recognized but deliberately unsupported.
    NotSupported(String),
    /// An internal invariant was violated.
    InternalError(String),
}

impl ParseErrorKind {
    /// The diagnostic code reported for this error kind.
    pub fn code(self: &Self) -> u32 {
        match self {
            ParseErrorKind::SyntaxError => 1001,
            ParseErrorKind::InternalError(_) => 9001,
            ParseErrorKind::NotSupported(_) => 9002,
            ParseErrorKind::NotImplemented(_) => 9003,
        }
    }
}

/// An error reported by the parser. Parse errors are recovered locally: the
/// error is reported and parsing resumes at the next top-level boundary.
#[derive(Clone, Debug)]
pub struct ParseError {
    kind: ParseErrorKind,
    position: Position,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, position: Position) -> ParseError {
        Self { kind, position }
    }
    /// The kind of the error.
    pub fn kind(self: &Self) -> &ParseErrorKind {
        &self.kind
    }
    /// The diagnostic code of the error.
    pub fn code(self: &Self) -> u32 {
        self.kind.code()
    }
    /// Byte offset of the error in the source text.
    pub fn position(self: &Self) -> Position {
        self.position
    }
}

impl Display for ParseError {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::SyntaxError => write!(f, "Syntax error at offset {}", self.position),
            ParseErrorKind::NotImplemented(what) => write!(f, "Feature not implemented: {}", what),
            ParseErrorKind::NotSupported(what) => write!(f, "Feature not supported: {}", what),
            ParseErrorKind::InternalError(message) => write!(f, "Internal compiler error: {}", message),
        }
    }
}

pub type ParseResult<T = ()> = Result<T, ParseError>;
