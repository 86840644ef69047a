//! Markup parsing error types

use thiserror::Error;

/// Parsing result type
pub type HtmlResult<T> = Result<T, HtmlError>;

/// Parsing errors
///
/// Lenient HTML parsing only ever reports `EmptyDocument`; every other
/// variant comes from the strict XML rules.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HtmlError {
    #[error("Unexpected character: {0:?}")]
    UnexpectedChar(char),

    #[error("Unexpected end of file")]
    UnexpectedEof,

    #[error("Invalid tag name: {0}")]
    InvalidTagName(String),

    #[error("Entity '{0}' not defined")]
    UndefinedEntity(String),

    #[error("Invalid character reference: &#{0};")]
    InvalidCharRef(String),

    #[error("Opening and ending tag mismatch: {expected} and {found}")]
    MismatchedTag { expected: String, found: String },

    #[error("Unexpected end tag: {0}")]
    UnexpectedEndTag(String),

    #[error("Premature end of data, unclosed tags: {0}")]
    UnclosedElements(String),

    #[error("Extra content at the end of the document")]
    MultipleRoots,

    #[error("Text is not allowed outside the root element")]
    TextOutsideRoot,

    #[error("Attribute {0} redefined")]
    DuplicateAttribute(String),

    #[error("Namespace prefix {0} is not defined")]
    UnboundPrefix(String),

    #[error("Document is empty")]
    EmptyDocument,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error(transparent)]
    Dom(#[from] quarry_dom::DomError),
}
