//! Nom tokenizer for the C-like source language. Produces the token stream
//! consumed by the parser; typedef names are classified later, by the parser,
//! against its live typedef table.

pub mod error;
pub mod token;

use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while, take_while1};
use nom::character::complete::{char, digit0, digit1, one_of};
use nom::combinator::{opt, recognize};
use nom::multi::many0;
use nom::sequence::{preceded, tuple};
use error::{LexError, LexErrorKind, LexResult};
use token::{Position, Token, TokenKind};

/// Tokenizes the given source text.
pub fn lex(source: &str) -> LexResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut remaining = source;
    loop {
        remaining = skip_trivia(remaining);
        if remaining.is_empty() {
            return Ok(tokens);
        }
        let position = (source.len() - remaining.len()) as Position;
        let (rest, kind) = scan_token(remaining, position)?;
        tokens.push(Token { kind, position });
        remaining = rest;
    }
}

/// Consumes whitespace and comments.
fn skip_trivia(input: &str) -> &str {
    let result: IResult<&str, &str> = recognize(many0(alt((
        preceded(tag("//"), take_while(|c| c != '\r' && c != '\n')),
        recognize(tuple((tag("/*"), take_until("*/"), tag("*/")))),
        take_while1(|c: char| c == ' ' || c == '\t' || c == '\r' || c == '\n'),
    ))))(input);
    match result {
        Ok((rest, _)) => rest,
        Err(_) => input,
    }
}

fn scan_token(input: &str, position: Position) -> LexResult<(&str, TokenKind)> {
    let first = input.chars().next().expect("scan_token requires input");
    if first.is_ascii_alphabetic() || first == '_' {
        Ok(word(input))
    } else if first.is_ascii_digit() {
        numerical(input, position)
    } else if first == '\'' {
        char_literal(input, position)
    } else if first == '"' {
        string_literal(input, position)
    } else {
        punctuation(input).ok_or_else(|| LexError::new(LexErrorKind::UnexpectedCharacter(first), position))
    }
}

// identifier or keyword ([a-z_][a-z0-9_]*)

fn word(input: &str) -> (&str, TokenKind) {
    let end = input
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(input.len());
    let (text, rest) = input.split_at(end);
    let kind = TokenKind::keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
    (rest, kind)
}

// numeric literal (42, 0x2a, 3.5, 1e3, suffixes skipped)

fn numerical(input: &str, position: Position) -> LexResult<(&str, TokenKind)> {
    let invalid = || LexError::new(LexErrorKind::InvalidNumerical, position);

    // hexadecimal
    let hex: IResult<&str, &str> = preceded(alt((tag("0x"), tag("0X"))), take_while1(|c: char| c.is_ascii_hexdigit()))(input);
    if let Ok((rest, digits)) = hex {
        let value = i64::from_str_radix(digits, 16).map_err(|_| invalid())?;
        let (rest, _) = integer_suffix(rest);
        return Ok((rest, TokenKind::IntLiteral(value)));
    }

    // decimal integer or float
    let decimal: IResult<&str, (&str, Option<&str>, Option<&str>)> = tuple((
        digit1,
        opt(recognize(tuple((char('.'), digit0)))),
        opt(recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))),
    ))(input);
    let (rest, (digits, fraction, exponent)) = decimal.map_err(|_| invalid())?;

    if fraction.is_some() || exponent.is_some() || rest.starts_with(['f', 'F']) {
        let end = input.len() - rest.len();
        let value = str::parse::<f64>(&input[..end]).map_err(|_| invalid())?;
        let rest = rest.strip_prefix(['f', 'F', 'l', 'L']).unwrap_or(rest);
        Ok((rest, TokenKind::FloatLiteral(value)))
    } else {
        let value = str::parse::<i64>(digits).map_err(|_| invalid())?;
        let (rest, _) = integer_suffix(rest);
        Ok((rest, TokenKind::IntLiteral(value)))
    }
}

fn integer_suffix(input: &str) -> (&str, &str) {
    let end = input.find(|c| !matches!(c, 'u' | 'U' | 'l' | 'L')).unwrap_or(input.len());
    let (suffix, rest) = input.split_at(end);
    (rest, suffix)
}

// character literal ('a', '\n') producing its integer value

fn char_literal(input: &str, position: Position) -> LexResult<(&str, TokenKind)> {
    let unterminated = || LexError::new(LexErrorKind::UnterminatedCharLiteral, position);
    let mut chars = input[1..].char_indices();
    let (_, first) = chars.next().ok_or_else(unterminated)?;
    let value = if first == '\\' {
        let (_, escaped) = chars.next().ok_or_else(unterminated)?;
        unescape(escaped).ok_or_else(|| LexError::new(LexErrorKind::InvalidNumerical, position))?
    } else if first == '\'' {
        return Err(unterminated());
    } else {
        first
    };
    match chars.next() {
        Some((index, '\'')) => Ok((&input[1 + index + 1..], TokenKind::IntLiteral(value as i64))),
        _ => Err(unterminated()),
    }
}

// string literal ("hello"), recognized here, rejected later by the parser

fn string_literal(input: &str, position: Position) -> LexResult<(&str, TokenKind)> {
    let unterminated = || LexError::new(LexErrorKind::UnterminatedString, position);
    let mut value = String::new();
    let mut chars = input[1..].char_indices();
    loop {
        let (index, c) = chars.next().ok_or_else(unterminated)?;
        match c {
            '"' => return Ok((&input[1 + index + 1..], TokenKind::StringLiteral(value))),
            '\\' => {
                let (_, escaped) = chars.next().ok_or_else(unterminated)?;
                value.push(unescape(escaped).unwrap_or(escaped));
            }
            '\r' | '\n' => return Err(unterminated()),
            _ => value.push(c),
        }
    }
}

fn unescape(escaped: char) -> Option<char> {
    match escaped {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        '0' => Some('\0'),
        '\\' => Some('\\'),
        '\'' => Some('\''),
        '"' => Some('"'),
        _ => None,
    }
}

// punctuation, longest match first

fn punctuation(input: &str) -> Option<(&str, TokenKind)> {
    const TABLE: &[(&str, TokenKind)] = &[
        ("...", TokenKind::Ellipsis),
        ("<<=", TokenKind::ShlAssign),
        (">>=", TokenKind::ShrAssign),
        ("<<", TokenKind::Shl),
        (">>", TokenKind::Shr),
        ("<=", TokenKind::LtEq),
        (">=", TokenKind::GtEq),
        ("==", TokenKind::EqEq),
        ("!=", TokenKind::BangEq),
        ("&&", TokenKind::AmpAmp),
        ("||", TokenKind::PipePipe),
        ("++", TokenKind::PlusPlus),
        ("--", TokenKind::MinusMinus),
        ("+=", TokenKind::PlusAssign),
        ("-=", TokenKind::MinusAssign),
        ("*=", TokenKind::StarAssign),
        ("/=", TokenKind::SlashAssign),
        ("%=", TokenKind::PercentAssign),
        ("&=", TokenKind::AmpAssign),
        ("|=", TokenKind::PipeAssign),
        ("^=", TokenKind::CaretAssign),
        ("->", TokenKind::Arrow),
        ("(", TokenKind::LParen),
        (")", TokenKind::RParen),
        ("{", TokenKind::LBrace),
        ("}", TokenKind::RBrace),
        ("[", TokenKind::LBracket),
        ("]", TokenKind::RBracket),
        (",", TokenKind::Comma),
        (";", TokenKind::Semicolon),
        (".", TokenKind::Dot),
        ("?", TokenKind::Question),
        (":", TokenKind::Colon),
        ("*", TokenKind::Star),
        ("+", TokenKind::Plus),
        ("-", TokenKind::Minus),
        ("/", TokenKind::Slash),
        ("%", TokenKind::Percent),
        ("&", TokenKind::Amp),
        ("|", TokenKind::Pipe),
        ("^", TokenKind::Caret),
        ("~", TokenKind::Tilde),
        ("!", TokenKind::Bang),
        ("<", TokenKind::Lt),
        (">", TokenKind::Gt),
        ("=", TokenKind::Assign),
    ];
    for (text, kind) in TABLE {
        if let Some(rest) = input.strip_prefix(text) {
            return Some((rest, kind.clone()));
        }
    }
    None
}
