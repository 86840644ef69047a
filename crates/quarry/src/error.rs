//! Error type shared by every fallible selection operation

use quarry_css::SelectorError;
use quarry_dom::DomError;
use quarry_html::HtmlError;
use quarry_net::NetError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("Parse error: {0}")]
    Parse(#[from] HtmlError),

    #[error("Selector syntax error: {0}")]
    SelectorSyntax(#[from] SelectorError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error("Cannot build a selection: {0}")]
    Construction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No extension registered as {0:?}")]
    UnknownExtension(String),

    #[error("You need a base URL to make your links absolute")]
    MissingBaseUrl,

    #[error("{0} can only be used on a selection with a parent")]
    MissingParent(&'static str),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Net(NetError::from(err))
    }
}
