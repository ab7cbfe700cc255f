use crate::prelude::*;
use crate::frontend::lexer::token::Position;

/// Represents the various possible tokenizer error-kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum LexErrorKind {
    UnexpectedCharacter(char),
    InvalidNumerical,
    UnterminatedCharLiteral,
    UnterminatedString,
}

/// An error reported by the tokenizer.
#[derive(Clone, Debug)]
pub struct LexError {
    kind: LexErrorKind,
    position: Position,
}

impl LexError {
    pub(crate) fn new(kind: LexErrorKind, position: Position) -> LexError {
        Self { kind, position }
    }
    /// The kind of the error.
    pub fn kind(self: &Self) -> &LexErrorKind {
        &self.kind
    }
    /// Byte offset of the error in the source text.
    pub fn position(self: &Self) -> Position {
        self.position
    }
}

impl Display for LexError {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LexErrorKind::UnexpectedCharacter(c) => write!(f, "Unexpected character '{}' at offset {}", c, self.position),
            LexErrorKind::InvalidNumerical => write!(f, "Invalid numeric value at offset {}", self.position),
            LexErrorKind::UnterminatedCharLiteral => write!(f, "Unterminated character literal at offset {}", self.position),
            LexErrorKind::UnterminatedString => write!(f, "Unterminated string literal at offset {}", self.position),
        }
    }
}

pub type LexResult<T = ()> = Result<T, LexError>;
