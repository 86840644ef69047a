//! Quarry Network Layer
//!
//! Fetches documents over HTTP for building a document from a URL.

mod client;
mod error;
mod response;
mod transport;

pub use client::{ClientConfig, HttpClient, DEFAULT_USER_AGENT};
pub use error::{NetError, NetResult};
pub use response::Response;
pub use transport::{FetchRequest, HttpTransport, Method, NullTransport, Transport};
