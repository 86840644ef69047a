//! Blocking document fetch used when a document is built from a URL

use std::str::FromStr;
use std::time::Duration;

use log::{debug, warn};
use url::{form_urlencoded, Url};

use crate::client::{ClientConfig, HttpClient};
use crate::error::{NetError, NetResult};

/// HTTP method of a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl FromStr for Method {
    type Err = NetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            other => Err(NetError::RequestFailed(format!("unsupported method {other}"))),
        }
    }
}

/// Everything about a fetch besides its URL
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub method: Method,
    /// Form fields. Appended to the query string for GET, sent as the body for POST
    pub data: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// Encoding label that overrides the response charset
    pub encoding: Option<String>,
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self {
            method: Method::Post,
            ..Self::default()
        }
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The URL actually requested
    pub fn target_url(&self, url: &Url) -> Url {
        let mut target = url.clone();
        if self.method == Method::Get && !self.data.is_empty() {
            target
                .query_pairs_mut()
                .extend_pairs(self.data.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        target
    }

    /// Url-encoded form body
    pub fn encoded_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.data.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish()
    }
}

/// Source of document text for a URL
pub trait Transport {
    fn fetch(&self, url: &Url, request: &FetchRequest) -> NetResult<String>;
}

/// Transport backed by [`HttpClient`]
///
/// Each fetch drives its own current-thread runtime, so it must not be
/// called from inside an async context.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &Url, request: &FetchRequest) -> NetResult<String> {
        let mut config = self.config.clone();
        if let Some(timeout) = request.timeout {
            config.timeout_secs = timeout.as_secs().max(1);
        }
        let client = HttpClient::with_config(config)?;
        let target = request.target_url(url);
        debug!("{:?} {}", request.method, target);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let response = runtime.block_on(async {
            let send = async {
                match request.method {
                    Method::Get => client.get_with_headers(&target, &request.headers).await,
                    Method::Post => {
                        client
                            .post_form(&target, &request.encoded_body(), &request.headers)
                            .await
                    }
                }
            };
            match request.timeout {
                Some(limit) => tokio::time::timeout(limit, send)
                    .await
                    .map_err(|_| NetError::Timeout)?,
                None => send.await,
            }
        })?;

        if !response.is_success() {
            warn!("{} answered with status {}", response.url, response.status);
            return Err(NetError::HttpError {
                status: response.status,
                url: response.url.to_string(),
            });
        }
        response.decode(request.encoding.as_deref())
    }
}

/// Transport for environments without network access
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn fetch(&self, url: &Url, _request: &FetchRequest) -> NetResult<String> {
        Err(NetError::Unavailable(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned HTTP response and hand back the raw request
    fn serve_once(reply: &'static str, delay: Option<Duration>) -> (Url, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).unwrap_or(0);
            if let Some(delay) = delay {
                thread::sleep(delay);
            }
            let _ = stream.write_all(reply.as_bytes());
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (Url::parse(&format!("http://{addr}/page")).unwrap(), handle)
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("POST".parse::<Method>().unwrap(), Method::Post);
        assert!("PUT".parse::<Method>().is_err());
    }

    #[test]
    fn test_target_url_appends_data_for_get() {
        let url = Url::parse("http://example.com/search?x=1").unwrap();
        let req = FetchRequest::get().data("q", "a b").data("n", "2");
        assert_eq!(req.target_url(&url).as_str(), "http://example.com/search?x=1&q=a+b&n=2");

        let post = FetchRequest::post().data("q", "a b");
        assert_eq!(post.target_url(&url), url);
        assert_eq!(post.encoded_body(), "q=a+b");
    }

    #[test]
    fn test_null_transport() {
        let url = Url::parse("http://example.com/").unwrap();
        let err = NullTransport.fetch(&url, &FetchRequest::get()).unwrap_err();
        assert!(matches!(err, NetError::Unavailable(_)));
    }

    #[test]
    fn test_http_transport_get() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<p>hello</p>\n",
            None,
        );
        let body = HttpTransport::default()
            .fetch(&url, &FetchRequest::get().data("a", "1"))
            .unwrap();
        assert_eq!(body, "<p>hello</p>\n");

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /page?a=1 HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("user-agent: quarry/"));
    }

    #[test]
    fn test_http_transport_post() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
            None,
        );
        let body = HttpTransport::default()
            .fetch(&url, &FetchRequest::post().data("name", "x"))
            .unwrap();
        assert_eq!(body, "ok");

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /page HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("application/x-www-form-urlencoded"));
    }

    #[test]
    fn test_http_transport_error_status() {
        let (url, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            None,
        );
        let err = HttpTransport::default().fetch(&url, &FetchRequest::get()).unwrap_err();
        assert!(matches!(err, NetError::HttpError { status: 404, .. }));
        server.join().unwrap();
    }

    #[test]
    fn test_http_transport_timeout() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            Some(Duration::from_millis(1500)),
        );
        let request = FetchRequest::get().timeout(Duration::from_millis(200));
        let err = HttpTransport::default().fetch(&url, &request).unwrap_err();
        assert!(matches!(err, NetError::Timeout));
        server.join().unwrap();
    }
}
