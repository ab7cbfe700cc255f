//! Token definitions for the C-like source language.

use crate::prelude::*;

/// A byte offset into the source text.
pub type Position = u32;

/// A single lexical token.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

/// All token kinds produced by the tokenizer.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),

    // keywords
    Void, Char, Int, Short, Long, Float, Double, Signed, Unsigned,
    Const, Volatile, Restrict,
    Typedef, Extern, Static, Auto, Register,
    If, Else, While, For, Do, Return, Break, Continue,
    Switch, Case, Default, Goto, Struct, Union, Enum, Sizeof,

    // punctuation
    LParen, RParen, LBrace, RBrace, LBracket, RBracket,
    Comma, Semicolon, Dot, Arrow, Ellipsis, Question, Colon,
    Star, Plus, Minus, Slash, Percent, Amp, Pipe, Caret, Tilde, Bang,
    Lt, Gt, LtEq, GtEq, EqEq, BangEq, AmpAmp, PipePipe,
    Shl, Shr, PlusPlus, MinusMinus,
    Assign, PlusAssign, MinusAssign, StarAssign, SlashAssign, PercentAssign,
    ShlAssign, ShrAssign, AmpAssign, PipeAssign, CaretAssign,
}

impl TokenKind {
    /// The keyword kind for the given identifier text, if it is a keyword.
    pub(crate) fn keyword(text: &str) -> Option<TokenKind> {
        Some(match text {
            "void" => TokenKind::Void,
            "char" => TokenKind::Char,
            "int" => TokenKind::Int,
            "short" => TokenKind::Short,
            "long" => TokenKind::Long,
            "float" => TokenKind::Float,
            "double" => TokenKind::Double,
            "signed" => TokenKind::Signed,
            "unsigned" => TokenKind::Unsigned,
            "const" => TokenKind::Const,
            "volatile" => TokenKind::Volatile,
            "restrict" => TokenKind::Restrict,
            "typedef" => TokenKind::Typedef,
            "extern" => TokenKind::Extern,
            "static" => TokenKind::Static,
            "auto" => TokenKind::Auto,
            "register" => TokenKind::Register,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "do" => TokenKind::Do,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "goto" => TokenKind::Goto,
            "struct" => TokenKind::Struct,
            "union" => TokenKind::Union,
            "enum" => TokenKind::Enum,
            "sizeof" => TokenKind::Sizeof,
            _ => return None,
        })
    }
}

impl Display for TokenKind {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "{}", name),
            TokenKind::IntLiteral(value) => write!(f, "{}", value),
            TokenKind::FloatLiteral(value) => write!(f, "{}", value),
            TokenKind::StringLiteral(value) => write!(f, "\"{}\"", value),
            TokenKind::Void => write!(f, "void"),
            TokenKind::Char => write!(f, "char"),
            TokenKind::Int => write!(f, "int"),
            TokenKind::Short => write!(f, "short"),
            TokenKind::Long => write!(f, "long"),
            TokenKind::Float => write!(f, "float"),
            TokenKind::Double => write!(f, "double"),
            TokenKind::Signed => write!(f, "signed"),
            TokenKind::Unsigned => write!(f, "unsigned"),
            TokenKind::Const => write!(f, "const"),
            TokenKind::Volatile => write!(f, "volatile"),
            TokenKind::Restrict => write!(f, "restrict"),
            TokenKind::Typedef => write!(f, "typedef"),
            TokenKind::Extern => write!(f, "extern"),
            TokenKind::Static => write!(f, "static"),
            TokenKind::Auto => write!(f, "auto"),
            TokenKind::Register => write!(f, "register"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::While => write!(f, "while"),
            TokenKind::For => write!(f, "for"),
            TokenKind::Do => write!(f, "do"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::Break => write!(f, "break"),
            TokenKind::Continue => write!(f, "continue"),
            TokenKind::Switch => write!(f, "switch"),
            TokenKind::Case => write!(f, "case"),
            TokenKind::Default => write!(f, "default"),
            TokenKind::Goto => write!(f, "goto"),
            TokenKind::Struct => write!(f, "struct"),
            TokenKind::Union => write!(f, "union"),
            TokenKind::Enum => write!(f, "enum"),
            TokenKind::Sizeof => write!(f, "sizeof"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Arrow => write!(f, "->"),
            TokenKind::Ellipsis => write!(f, "..."),
            TokenKind::Question => write!(f, "?"),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Amp => write!(f, "&"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Tilde => write!(f, "~"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::LtEq => write!(f, "<="),
            TokenKind::GtEq => write!(f, ">="),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::BangEq => write!(f, "!="),
            TokenKind::AmpAmp => write!(f, "&&"),
            TokenKind::PipePipe => write!(f, "||"),
            TokenKind::Shl => write!(f, "<<"),
            TokenKind::Shr => write!(f, ">>"),
            TokenKind::PlusPlus => write!(f, "++"),
            TokenKind::MinusMinus => write!(f, "--"),
            TokenKind::Assign => write!(f, "="),
            TokenKind::PlusAssign => write!(f, "+="),
            TokenKind::MinusAssign => write!(f, "-="),
            TokenKind::StarAssign => write!(f, "*="),
            TokenKind::SlashAssign => write!(f, "/="),
            TokenKind::PercentAssign => write!(f, "%="),
            TokenKind::ShlAssign => write!(f, "<<="),
            TokenKind::ShrAssign => write!(f, ">>="),
            TokenKind::AmpAssign => write!(f, "&="),
            TokenKind::PipeAssign => write!(f, "|="),
            TokenKind::CaretAssign => write!(f, "^="),
        }
    }
}
