//! HTTP client implementation

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE, USER_AGENT};
use url::Url;

use crate::error::{NetError, NetResult};
use crate::response::Response;

/// Default user agent string
pub const DEFAULT_USER_AGENT: &str = concat!("Quarry/", env!("CARGO_PKG_VERSION"));

/// Default timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of redirects to follow
const MAX_REDIRECTS: usize = 10;

/// HTTP client for fetching documents
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> NetResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: ClientConfig) -> NetResult<Self> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::try_from(config.user_agent.as_str())
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(USER_AGENT, agent);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| NetError::RequestFailed(e.to_string()))?;

        Ok(Self { client })
    }

    /// Fetch a URL using GET
    pub async fn get(&self, url: &Url) -> NetResult<Response> {
        self.get_with_headers(url, &[]).await
    }

    /// Fetch a URL with custom headers
    pub async fn get_with_headers(&self, url: &Url, extra_headers: &[(String, String)]) -> NetResult<Response> {
        info!("Fetching: {}", url);
        let request = with_headers(self.client.get(url.clone()), extra_headers);
        Self::finish(request).await
    }

    /// Send a POST request with an url-encoded form body
    pub async fn post_form(
        &self,
        url: &Url,
        form_data: &str,
        extra_headers: &[(String, String)],
    ) -> NetResult<Response> {
        info!("POST to: {}", url);
        debug!("POST body: {}", form_data);

        let request = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form_data.to_string());
        Self::finish(with_headers(request, extra_headers)).await
    }

    async fn finish(request: reqwest::RequestBuilder) -> NetResult<Response> {
        let response = request.send().await?;

        let final_url = response.url().clone();
        let status = response.status().as_u16();

        debug!("Response status: {}", status);

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|val| (k.as_str().to_lowercase(), val.to_string()))
            })
            .collect();

        let body = response.bytes().await?.to_vec();

        debug!("Received {} bytes", body.len());

        Ok(Response::new(final_url, status, headers, body))
    }
}

fn with_headers(mut request: reqwest::RequestBuilder, extra_headers: &[(String, String)]) -> reqwest::RequestBuilder {
    for (key, value) in extra_headers {
        if let (Ok(name), Ok(val)) = (
            HeaderName::try_from(key.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            request = request.header(name, val);
        }
    }
    request
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Value of the User-Agent header
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
