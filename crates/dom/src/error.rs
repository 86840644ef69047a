//! DOM error types

use thiserror::Error;

/// DOM operation result type
pub type DomResult<T> = Result<T, DomError>;

/// DOM errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Cannot insert node {child} into its own descendant {parent}")]
    HierarchyCycle { parent: u32, child: u32 },
}
