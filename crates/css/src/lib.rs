//! Quarry selector front end
//!
//! Tokenizes and parses CSS selectors (plus the positional, form and
//! content pseudo-classes of the jQuery dialect) and compiles them into a
//! typed [`Query`] for the executor in `quarry-select`.

mod tokenizer;
mod selector;
mod error;
mod query;

pub use tokenizer::{Tokenizer, Token, HashType};
pub use selector::{Selector, SelectorPart, SelectorParser, AttributeOp, Combinator, NamespacePrefix};
pub use error::{SelectorError, SelectorResult, SourceLocation};
pub use query::{
    parse_nth, Chain, NamespaceMatch, Namespaces, PostCondition, PreCondition, Query, Step, Translator,
};
