//! HTTP response representation

use std::collections::HashMap;

use encoding_rs::{Encoding, UTF_8};
use url::Url;

use crate::error::{NetError, NetResult};

/// HTTP response
#[derive(Debug)]
pub struct Response {
    /// Final URL after redirects
    pub url: Url,
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

impl Response {
    /// Create a new response
    pub fn new(url: Url, status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        Self {
            url,
            status,
            headers,
            body,
        }
    }

    /// Check if the response was successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the Content-Type header
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(|s| s.as_str())
    }

    /// The `charset` parameter of the Content-Type header
    pub fn charset(&self) -> Option<&str> {
        self.content_type()?
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"'))
    }

    /// Decode the body, preferring `label` over the declared charset
    ///
    /// Falls back to UTF-8 when neither is given. A byte order mark wins
    /// over both.
    pub fn decode(&self, label: Option<&str>) -> NetResult<String> {
        let encoding = match label {
            Some(label) => Encoding::for_label(label.as_bytes())
                .ok_or_else(|| NetError::UnknownEncoding(label.to_string()))?,
            None => self
                .charset()
                .and_then(|c| Encoding::for_label(c.as_bytes()))
                .unwrap_or(UTF_8),
        };
        let (text, _, _) = encoding.decode(&self.body);
        Ok(text.into_owned())
    }

    /// Get the body as a UTF-8 string, replacing invalid characters
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
