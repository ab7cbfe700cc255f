//! Parser input over the lexed token stream, carrying the shared parser
//! state, plus the primitive token combinators the grammar is built from.

use crate::prelude::*;
use crate::frontend::lexer::token::{Position, Token, TokenKind};
use crate::frontend::parser::error::ParseErrorKind;
use crate::frontend::parser::state::ParserState;

/// Parser input: the remaining token stream plus shared state.
#[derive(Clone, Debug)]
pub(super) struct Input<'a> {
    pub tokens: &'a [Token],
    pub state: Rc<RefCell<ParserState>>,
    pub max_parsed: Rc<Cell<(Option<Position>, usize)>>,
}

impl<'a> Input<'a> {
    pub fn new(tokens: &'a [Token], state: Rc<RefCell<ParserState>>) -> Self {
        Input {
            tokens,
            state,
            max_parsed: Rc::new(Cell::new((None, usize::MAX))),
        }
    }
    /// Source position of the next token, or of the end of input.
    pub fn position(self: &Self) -> Position {
        self.tokens.first().map_or(Position::MAX, |t| t.position)
    }
    pub fn is_empty(self: &Self) -> bool {
        self.tokens.is_empty()
    }
    pub fn first(self: &Self) -> Option<&'a Token> {
        self.tokens.first()
    }
    /// Remembers the deepest position any parser reached, for syntax error
    /// reporting after backtracking.
    pub fn update_max_parsed(self: &Self) {
        let remaining = self.tokens.len();
        let current = self.max_parsed.get();
        if remaining < current.1 {
            self.max_parsed.set((Some(self.position()), remaining));
        }
    }
    pub fn max_parsed_position(self: &Self) -> Option<Position> {
        self.max_parsed.get().0
    }
    pub fn from_tokens(self: &Self, tokens: &'a [Token]) -> Self {
        Input {
            tokens,
            state: self.state.clone(),
            max_parsed: self.max_parsed.clone(),
        }
    }
    pub fn advance(self: &Self, count: usize) -> Self {
        self.from_tokens(&self.tokens[count..])
    }
}

impl<'a> PartialEq for Input<'a> {
    fn eq(self: &Self, other: &Self) -> bool {
        std::ptr::eq(self.tokens, other.tokens)
    }
}

impl<'a> nom::InputLength for Input<'a> {
    #[inline]
    fn input_len(&self) -> usize {
        self.tokens.len()
    }
}

impl<'a> nom::InputTake for Input<'a> {
    #[inline]
    fn take(&self, count: usize) -> Self {
        self.from_tokens(&self.tokens[..count])
    }
    #[inline]
    fn take_split(&self, count: usize) -> (Self, Self) {
        (self.from_tokens(&self.tokens[count..]), self.from_tokens(&self.tokens[..count]))
    }
}

/// Parser error carried through nom.
#[derive(Debug)]
pub(super) struct Failure<'a> {
    pub input: Input<'a>,
    pub kind: ParseErrorKind,
}

impl<'a> Failure<'a> {
    pub fn new(input: Input<'a>, kind: ParseErrorKind) -> Self {
        Failure { input, kind }
    }
    /// A hard failure that aborts the current construct instead of
    /// backtracking into other alternatives.
    pub fn fail<O>(input: Input<'a>, kind: ParseErrorKind) -> Output<'a, O> {
        Err(nom::Err::Failure(Failure::new(input, kind)))
    }
}

impl<'a> nom::error::ParseError<Input<'a>> for Failure<'a> {
    fn from_error_kind(input: Input<'a>, _: nom::error::ErrorKind) -> Self {
        input.update_max_parsed();
        Failure { input, kind: ParseErrorKind::SyntaxError }
    }
    fn append(_: Input<'a>, _: nom::error::ErrorKind, other: Self) -> Self {
        other.input.update_max_parsed();
        other
    }
}

/// Parser output.
pub(super) type Output<'a, O> = nom::IResult<Input<'a>, O, Failure<'a>>;

/// Matches exactly the given token kind.
pub(super) fn token<'a>(kind: TokenKind) -> impl Fn(Input<'a>) -> Output<'a, Position> {
    move |i: Input<'a>| match i.first() {
        Some(t) if t.kind == kind => Ok((i.advance(1), t.position)),
        _ => {
            i.update_max_parsed();
            Err(nom::Err::Error(Failure::new(i, ParseErrorKind::SyntaxError)))
        }
    }
}

/// Matches any identifier token, including ones naming typedefs.
pub(super) fn identifier(i: Input<'_>) -> Output<'_, (String, Position)> {
    match i.first() {
        Some(Token { kind: TokenKind::Identifier(name), position }) => {
            Ok((i.advance(1), (name.clone(), *position)))
        }
        _ => {
            i.update_max_parsed();
            Err(nom::Err::Error(Failure::new(i, ParseErrorKind::SyntaxError)))
        }
    }
}

