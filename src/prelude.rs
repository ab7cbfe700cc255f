//! Non-public crate prelude, shared by all modules.

pub use std::fmt::{self, Debug, Display};
pub use std::rc::Rc;
pub use std::cell::{Cell, RefCell};
pub use std::collections::HashMap;

/// A map that does not guarantee a particular iteration order.
pub type UnorderedMap<K, V> = HashMap<K, V>;
