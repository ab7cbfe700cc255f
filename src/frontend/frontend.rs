//! Tokenization, parsing and type resolution for the C-like frontend.

pub mod ast;
pub mod declarator;

#[path="lexer/lexer.rs"]
pub mod lexer;

#[path="parser/parser.rs"]
pub mod parser;
