//! Selector error types

use std::fmt;
use thiserror::Error;

/// Selector result type
pub type SelectorResult<T> = Result<T, SelectorError>;

/// Source location in a selector string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from start
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Selector syntax and translation errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SelectorError {
    #[error("Unexpected token '{found}' at {location}")]
    UnexpectedToken {
        found: String,
        location: SourceLocation,
    },

    #[error("Unexpected end of selector at {location}")]
    UnexpectedEof {
        location: SourceLocation,
    },

    #[error("Expected selector at {location}")]
    ExpectedSelector {
        location: SourceLocation,
    },

    #[error("Unterminated string at {location}")]
    UnterminatedString {
        location: SourceLocation,
    },

    #[error("Invalid number '{number}' at {location}")]
    InvalidNumber {
        number: String,
        location: SourceLocation,
    },

    #[error("Unknown pseudo-class :{0}")]
    UnknownPseudoClass(String),

    #[error("Pseudo-elements are not supported: ::{0}")]
    UnsupportedPseudoElement(String),

    #[error("Invalid argument for :{name}(): {reason}")]
    InvalidPseudoArgument {
        name: String,
        reason: String,
    },

    #[error("Namespace prefix '{0}' is not declared")]
    UnknownNamespacePrefix(String),
}

impl SelectorError {
    /// Get the source location of this error, when it has one
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Self::UnexpectedToken { location, .. }
            | Self::UnexpectedEof { location }
            | Self::ExpectedSelector { location }
            | Self::UnterminatedString { location }
            | Self::InvalidNumber { location, .. } => Some(*location),
            _ => None,
        }
    }

    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPseudoArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation::new(10, 5, 100);
        assert_eq!(format!("{}", loc), "10:5");
    }

    #[test]
    fn test_error_display() {
        let err = SelectorError::UnexpectedToken {
            found: "@".into(),
            location: SourceLocation::new(1, 10, 9),
        };
        assert_eq!(format!("{}", err), "Unexpected token '@' at 1:10");
        assert_eq!(err.location(), Some(SourceLocation::new(1, 10, 9)));
    }

    #[test]
    fn test_argument_error() {
        let err = SelectorError::invalid_argument("eq", "expected a single integer");
        assert_eq!(format!("{}", err), "Invalid argument for :eq(): expected a single integer");
        assert_eq!(err.location(), None);
    }
}
