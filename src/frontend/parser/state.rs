use crate::prelude::*;
use crate::shared::types::CType;
use crate::frontend::ast::Block;

/// Per-parse configuration.
#[derive(Clone, Debug, Default)]
pub struct ParserOptions {
    /// Include the offending token in recovery diagnostics.
    pub verbose_errors: bool,
}

/// Internal parser state, tracked via RC through the Input type: the live
/// typedef table queried while classifying identifier tokens, and the scope
/// stack pushed/popped around compound statements. Frame 0 is the translation
/// unit block.
#[derive(Debug)]
pub(super) struct ParserState {
    pub typedefs: UnorderedMap<String, CType>,
    pub scopes: Vec<Block>,
    pub options: ParserOptions,
}

impl ParserState {
    pub fn new(options: ParserOptions) -> Self {
        ParserState {
            typedefs: UnorderedMap::new(),
            scopes: vec![Block::new()],
            options,
        }
    }
    /// Returns whether the given identifier currently names a typedef.
    pub fn is_typedef(self: &Self, name: &str) -> bool {
        self.typedefs.contains_key(name)
    }
    /// Pushes a fresh scope frame.
    pub fn begin_scope(self: &mut Self) {
        self.scopes.push(Block::new());
    }
    /// Pops the current scope frame. Pops are strictly matched with pushes;
    /// an empty stack indicates an internal error handled by the caller.
    pub fn end_scope(self: &mut Self) -> Option<Block> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }
    /// The innermost open scope.
    pub fn current_scope(self: &mut Self) -> &mut Block {
        self.scopes.last_mut().expect("parser scope stack is never empty")
    }
}
