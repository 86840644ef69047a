//! Quarry DOM - element tree with text and tail
//!
//! Provides the arena tree the parser builds and the selection layer
//! queries and mutates.

mod node;
mod tree;
mod error;
mod serialize;

pub use node::{Node, NodeId, NodeType, ElementData};
pub use tree::DomTree;
pub use error::{DomError, DomResult};
pub use serialize::{escape_attribute, escape_text, is_void_element, SerializeMode};
