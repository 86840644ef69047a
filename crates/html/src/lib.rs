//! Quarry markup parser
//!
//! Tokenizer and tree construction for strict XML and lenient HTML.

mod tokenizer;
mod tree_builder;
mod error;
mod entities;

pub use tokenizer::{Tokenizer, Token};
pub use tree_builder::{HtmlParser, ParserMode};
pub use error::{HtmlError, HtmlResult};
