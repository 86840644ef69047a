//! Quarry selector engine
//!
//! Evaluates compiled queries from `quarry-css` against a `quarry-dom`
//! tree.

mod eval;
mod matching;

pub use eval::{matches, select, Axis};
pub use matching::{is_disabled, matches_conditions};
