//! URLs: absolute links and requests relative to the document

use log::{debug, info, warn};
use quarry_html::ParserMode;
use quarry_net::{FetchRequest, NetError};
use url::Url;

use crate::document::NodeRef;
use crate::error::{Error, Result};
use crate::selection::{parse_document, Selection, Settings};

/// Elements and the attribute holding their link
const LINK_ATTRIBUTES: &[(&str, &str)] = &[
    ("a", "href"),
    ("link", "href"),
    ("script", "src"),
    ("img", "src"),
    ("iframe", "src"),
    ("form", "action"),
];

/// Schemes left untouched
const OPAQUE_SCHEMES: &[&str] = &["tel:", "callto:", "sms:"];

fn resolve_link(base: &Url, link: &str) -> Option<Url> {
    let link = link.trim();
    if OPAQUE_SCHEMES.iter().any(|scheme| link.starts_with(scheme)) {
        return None;
    }
    match base.join(link) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Cannot resolve link {:?} against {}: {}", link, base, e);
            None
        }
    }
}

/// Fetch `url` and parse the body
///
/// The configured timeout applies unless the request sets one. An `Auto`
/// parser reads the body as HTML.
pub(crate) fn fetch_document(settings: &Settings, url: &Url, mut request: FetchRequest) -> Result<Vec<NodeRef>> {
    if request.timeout.is_none() {
        request.timeout = Some(settings.config.timeout);
    }
    info!("Fetching document: {}", url);
    let body = settings.transport.fetch(url, &request)?;
    let mode = match settings.config.parser {
        ParserMode::Auto => ParserMode::Html,
        other => other,
    };
    parse_document(&body, mode)
}

impl Selection {
    /// Rewrite relative links in and below every element against `base`
    /// (the selection's base URL when `None`)
    pub fn make_links_absolute(&self, base: Option<&Url>) -> Result<&Self> {
        let base = match base {
            Some(base) => base.clone(),
            None => self.base_url().cloned().ok_or(Error::MissingBaseUrl)?,
        };
        for &(tag, attr) in LINK_ATTRIBUTES {
            for element in self.query(tag)?.items() {
                let Some(link) = element.attr(attr) else {
                    continue;
                };
                if let Some(absolute) = resolve_link(&base, &link) {
                    debug!("{} -> {}", link, absolute);
                    element.set_attr(attr, absolute.as_str());
                }
            }
        }
        Ok(self)
    }

    /// Fetch `path` relative to the base URL and parse the response
    ///
    /// An HTTP error status yields an empty selection.
    pub fn ajax(&self, path: &str, request: FetchRequest) -> Result<Selection> {
        let url = match self.base_url() {
            Some(base) => base.join(path)?,
            None => Url::parse(path).map_err(|_| Error::MissingBaseUrl)?,
        };
        match fetch_document(self.settings(), &url, request) {
            Ok(nodes) => {
                let mut result = self.derive(nodes);
                result.set_base_url(Some(url));
                Ok(result)
            }
            Err(Error::Net(NetError::HttpError { status, .. })) => {
                warn!("{} answered {}, returning nothing", url, status);
                Ok(self.derive(Vec::new()))
            }
            Err(e) => Err(e),
        }
    }

    /// [`ajax`](Self::ajax) with a GET request
    pub fn ajax_get(&self, path: &str) -> Result<Selection> {
        self.ajax(path, FetchRequest::get())
    }

    /// [`ajax`](Self::ajax) with a POST of `data`
    pub fn ajax_post(&self, path: &str, data: &[(&str, &str)]) -> Result<Selection> {
        let request = data
            .iter()
            .fold(FetchRequest::post(), |request, &(k, v)| request.data(k, v));
        self.ajax(path, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Quarry};
    use quarry_net::{Method, NetResult, Transport};
    use std::cell::RefCell;
    use std::rc::Rc;

    const PAGE: &str = r#"<html><head><link href="style.css"></head><body>
        <a href="/path_info">with href</a>
        <a>without href</a>
        <a href=" tel:+123 ">call</a>
        <img src="../img/x.png">
        <form action="?q=1"></form>
    </body></html>"#;

    #[test]
    fn test_make_links_absolute() {
        let d = Quarry::new().parse(PAGE).unwrap();
        let base = Url::parse("http://example.com/dir/page.html").unwrap();
        d.make_links_absolute(Some(&base)).unwrap();

        let hrefs: Vec<String> = d.query("a[href]").unwrap().items().iter().filter_map(|a| a.attr("href")).collect();
        assert_eq!(hrefs, vec!["http://example.com/path_info", " tel:+123 "]);
        assert_eq!(d.query("link").unwrap().attr("href").as_deref(), Some("http://example.com/dir/style.css"));
        assert_eq!(d.query("img").unwrap().attr("src").as_deref(), Some("http://example.com/img/x.png"));
        assert_eq!(
            d.query("form").unwrap().attr("action").as_deref(),
            Some("http://example.com/dir/page.html?q=1")
        );
    }

    #[test]
    fn test_make_links_absolute_needs_a_base() {
        let d = Quarry::new().parse(PAGE).unwrap();
        assert!(matches!(d.make_links_absolute(None), Err(Error::MissingBaseUrl)));

        let q = Quarry::with_config(Config::default().base_url(Url::parse("http://example.org/").unwrap()));
        let d = q.parse(PAGE).unwrap();
        d.make_links_absolute(None).unwrap();
        assert_eq!(d.query("a").unwrap().attr("href").as_deref(), Some("http://example.org/path_info"));
    }

    /// Serves two paths and refuses everything else
    struct Site {
        requests: Rc<RefCell<Vec<(Method, String)>>>,
    }

    impl Transport for Site {
        fn fetch(&self, url: &Url, request: &FetchRequest) -> NetResult<String> {
            self.requests
                .borrow_mut()
                .push((request.method, request.target_url(url).to_string()));
            match url.path() {
                "/" => Ok("<html><body><pre>index</pre></body></html>".to_string()),
                "/form" => Ok("<div><a href=\"/\">back</a></div>".to_string()),
                _ => Err(NetError::HttpError {
                    status: 403,
                    url: url.to_string(),
                }),
            }
        }
    }

    fn site() -> (Quarry, Rc<RefCell<Vec<(Method, String)>>>) {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let transport = Site {
            requests: Rc::clone(&requests),
        };
        let config = Config::default().base_url(Url::parse("http://site.test/start").unwrap());
        (Quarry::with_transport(config, transport), requests)
    }

    #[test]
    fn test_ajax_get_and_post() {
        let (q, requests) = site();
        let d = q.parse("<div>start</div>").unwrap();

        let page = d.ajax_get("/").unwrap();
        assert_eq!(page.query("pre").unwrap().len(), 1);
        assert_eq!(page.base_url().unwrap().as_str(), "http://site.test/");
        assert_eq!(page.end().text(), "start");

        let posted = d.query("div").unwrap().ajax_post("form", &[("k", "v")]).unwrap();
        assert_eq!(posted.query("a").unwrap().len(), 1);

        let seen = requests.borrow();
        assert_eq!(seen[0], (Method::Get, "http://site.test/".to_string()));
        assert_eq!(seen[1], (Method::Post, "http://site.test/form".to_string()));
    }

    #[test]
    fn test_ajax_http_error_is_empty() {
        let (q, _) = site();
        let d = q.parse("<div>start</div>").unwrap();
        let denied = d.ajax_get("/secret").unwrap();
        assert!(denied.is_empty());
    }

    #[test]
    fn test_ajax_without_base_needs_absolute_url() {
        let q = Quarry::with_transport(Config::default(), quarry_net::NullTransport);
        let d = q.parse("<div/>").unwrap();
        assert!(matches!(d.ajax_get("/relative"), Err(Error::MissingBaseUrl)));
        assert!(matches!(
            d.ajax_get("http://example.com/"),
            Err(Error::Net(NetError::Unavailable(_)))
        ));
    }
}
