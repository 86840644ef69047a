//! Errors raised while fetching documents

use thiserror::Error;

pub type NetResult<T> = Result<T, NetError>;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Cannot connect: {0}")]
    ConnectionError(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Too many redirects")]
    TooManyRedirects,

    /// The server answered outside the 2xx range
    #[error("{url} answered with status {status}")]
    HttpError { status: u16, url: String },

    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("Network access is unavailable: {0}")]
    Unavailable(String),

    /// The blocking runtime could not start
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for NetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return NetError::Timeout;
        }
        if err.is_redirect() {
            return NetError::TooManyRedirects;
        }
        if err.is_connect() {
            return NetError::ConnectionError(err.to_string());
        }
        NetError::RequestFailed(err.to_string())
    }
}

impl From<url::ParseError> for NetError {
    fn from(err: url::ParseError) -> Self {
        NetError::InvalidUrl(err.to_string())
    }
}
