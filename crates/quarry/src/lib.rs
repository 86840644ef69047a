//! Quarry - chainable queries and edits over HTML and XML trees
//!
//! ```no_run
//! use quarry::Quarry;
//!
//! let doc = Quarry::new().parse("<div><p class=\"hello\">Hi</p><p>Bye</p></div>")?;
//! assert_eq!(doc.query("p:first")?.text(), "Hi");
//! doc.query("p:last")?.append("<b>!</b>")?;
//! # Ok::<(), quarry::Error>(())
//! ```

mod attributes;
mod config;
mod content;
mod document;
mod error;
mod extensions;
mod forms;
mod links;
mod manipulation;
mod selection;
mod text;
mod traversal;

pub use config::{Config, DEFAULT_TIMEOUT};
pub use content::ContentItem;
pub use document::{Document, NodeRef};
pub use error::{Error, Result};
pub use extensions::{ExtensionFn, ExtensionOutput, Registry};
pub use forms::{FieldValue, FormField};
pub use manipulation::Content;
pub use selection::{Callback, Selection};
pub use text::{
    extract_raw_text, extract_text, extract_text_with, squash_whitespace, TextOptions, INLINE_TAGS, SEPARATOR_TAGS,
};

pub use quarry_css::Namespaces;
pub use quarry_html::ParserMode;
pub use quarry_net::{FetchRequest, HttpTransport, Method, NullTransport, Transport};

use std::fs;
use std::path::Path;
use std::rc::Rc;

use encoding_rs::{Encoding, UTF_8};
use log::debug;
use quarry_select::Axis;
use url::Url;

use crate::links::fetch_document;
use crate::selection::{parse_document, Settings};

/// Entry point: builds selections from markup, files, URLs and nodes
pub struct Quarry {
    settings: Rc<Settings>,
    extensions: Registry,
}

impl Quarry {
    /// HTTP fetching, automatic parser selection
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let transport = HttpTransport::new(config.client_config());
        Self::with_transport(config, transport)
    }

    pub fn with_transport(config: Config, transport: impl Transport + 'static) -> Self {
        Self {
            settings: Rc::new(Settings {
                config,
                transport: Rc::new(transport),
            }),
            extensions: Registry::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.settings.config
    }

    fn selection(&self, nodes: Vec<NodeRef>, base_url: Option<Url>) -> Selection {
        let base_url = base_url.or_else(|| self.settings.config.base_url.clone());
        Selection::new(nodes, Rc::clone(&self.settings), base_url)
    }

    /// Parse markup with the configured parser
    pub fn parse(&self, markup: &str) -> Result<Selection> {
        let nodes = parse_document(markup, self.settings.config.parser)?;
        Ok(self.selection(nodes, None))
    }

    /// Read and parse a UTF-8 file (a byte order mark overrides)
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Selection> {
        let bytes = fs::read(path.as_ref())?;
        let (text, _, _) = UTF_8.decode(&bytes);
        debug!("loaded {} bytes from {}", bytes.len(), path.as_ref().display());
        self.parse(&text)
    }

    /// Read a file in the encoding named by `label` (`"latin1"`, `"shift_jis"`, ...)
    pub fn load_file_with_encoding(&self, path: impl AsRef<Path>, label: &str) -> Result<Selection> {
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| Error::UnsupportedEncoding(label.to_string()))?;
        let bytes = fs::read(path.as_ref())?;
        let (text, _, _) = encoding.decode(&bytes);
        self.parse(&text)
    }

    /// Fetch a document through the configured transport
    ///
    /// The URL becomes the selection's base URL. Unless another parser is
    /// configured, the body is parsed as HTML.
    pub fn fetch(&self, url: &str, request: FetchRequest) -> Result<Selection> {
        let url = Url::parse(url)?;
        let nodes = fetch_document(&self.settings, &url, request)?;
        Ok(self.selection(nodes, Some(url)))
    }

    pub fn from_node(&self, node: NodeRef) -> Selection {
        self.selection(vec![node], None)
    }

    pub fn from_nodes(&self, nodes: Vec<NodeRef>) -> Selection {
        self.selection(nodes, None)
    }

    /// Same elements, fresh chain
    pub fn from_selection(&self, selection: &Selection) -> Selection {
        self.selection(selection.nodes().to_vec(), selection.base_url().cloned())
    }

    /// Parse `markup`, then select `selector` below and including every top-level element
    pub fn select(&self, selector: &str, markup: &str) -> Result<Selection> {
        let document = self.parse(markup)?;
        let query = document.compile(selector)?;
        let nodes = Selection::run(document.nodes(), &query, Axis::DescendantOrSelf);
        Ok(self.selection(nodes, None))
    }

    /// One argument is markup. Two arguments are a selector and the markup
    /// to run it against.
    pub fn context(&self, args: &[&str]) -> Result<Selection> {
        match args {
            [markup] => self.parse(markup),
            [selector, markup] if !selector.starts_with('<') => self.select(selector, markup),
            [_, _] => Err(Error::Construction(
                "a selector cannot start with '<'".to_string(),
            )),
            _ => Err(Error::Construction(format!(
                "expected one or two arguments, got {}",
                args.len()
            ))),
        }
    }

    // ---- Extensions ----

    /// Make `f` callable by name through [`Quarry::invoke`]
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Selection, &[serde_json::Value]) -> Result<ExtensionOutput> + 'static,
    {
        self.extensions.register(name, f);
    }

    pub fn invoke(
        &self,
        name: &str,
        selection: &Selection,
        args: &[serde_json::Value],
    ) -> Result<ExtensionOutput> {
        self.extensions.invoke(name, selection, args)
    }

    pub fn extensions(&self) -> &Registry {
        &self.extensions
    }
}

impl Default for Quarry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;

    /// Transport answering every request with fixed markup
    struct Canned {
        body: &'static str,
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl Transport for Canned {
        fn fetch(&self, url: &Url, request: &FetchRequest) -> quarry_net::NetResult<String> {
            self.seen.borrow_mut().push(request.target_url(url).to_string());
            Ok(self.body.to_string())
        }
    }

    #[test]
    fn test_parse_modes() {
        let q = Quarry::new();
        assert_eq!(q.parse("<p>hi</p>").unwrap().len(), 1);

        let fragments = Quarry::with_config(Config::default().parser(ParserMode::HtmlFragments))
            .parse("<p>a</p><p>b</p>")
            .unwrap();
        assert_eq!(fragments.len(), 2);

        let html5 = Quarry::with_config(Config::default().parser(ParserMode::Html5))
            .parse("<p>x</p>")
            .unwrap();
        assert_eq!(html5.first().unwrap().tag_name().as_deref(), Some("html"));

        let soup = Quarry::with_config(Config::default().parser(ParserMode::Soup))
            .parse("x<p>y</p>")
            .unwrap();
        assert_eq!(soup.first().unwrap().tag_name().as_deref(), Some("html"));
        assert_eq!(soup.query("p").unwrap().text(), "y");
        soup.query("p").unwrap().append("<b>z</b>").unwrap();
        assert_eq!(soup.to_string(), "<html>x<p>y<b>z</b></p></html>");
    }

    #[test]
    fn test_parse_empty_is_an_error() {
        let q = Quarry::with_config(Config::default().parser(ParserMode::Html));
        assert!(matches!(q.parse("   "), Err(Error::Parse(_))));
    }

    #[test]
    fn test_select_and_context() {
        let q = Quarry::new();
        let markup = "<div><p>a</p><p>b</p></div>";
        assert_eq!(q.select("p", markup).unwrap().len(), 2);
        assert_eq!(q.context(&["p", markup]).unwrap().len(), 2);
        assert_eq!(q.context(&[markup]).unwrap().len(), 1);
        assert!(matches!(q.context(&["<p>", markup]), Err(Error::Construction(_))));
        assert!(matches!(q.context(&[]), Err(Error::Construction(_))));
    }

    #[test]
    fn test_from_node_and_selection() {
        let q = Quarry::new();
        let d = q.parse("<div><p>a</p></div>").unwrap();
        let p = d.query("p").unwrap();
        let again = q.from_node(p.first().unwrap().clone());
        assert_eq!(again.text(), "a");
        let copy = q.from_selection(&p);
        assert!(copy.end().is_empty());
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn test_fetch_sets_base_url() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let transport = Canned {
            body: "<html><body><a href=\"/x\">x</a></body></html>",
            seen: Rc::clone(&seen),
        };
        let q = Quarry::with_transport(Config::default(), transport);
        let d = q
            .fetch("http://example.com/dir/page", FetchRequest::get().data("q", "1"))
            .unwrap();
        assert_eq!(d.base_url().unwrap().as_str(), "http://example.com/dir/page");
        assert_eq!(d.query("a").unwrap().attr("href").as_deref(), Some("/x"));
        assert_eq!(seen.borrow()[0], "http://example.com/dir/page?q=1");
    }

    #[test]
    fn test_null_transport_refuses() {
        let q = Quarry::with_transport(Config::default(), NullTransport);
        let err = q.fetch("http://example.com/", FetchRequest::get()).unwrap_err();
        assert!(matches!(err, Error::Net(quarry_net::NetError::Unavailable(_))));
        assert!(q.fetch("not a url", FetchRequest::get()).is_err());
    }

    #[test]
    fn test_load_file_with_encoding() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("quarry-latin1-{}.html", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"<p>caf\xe9</p>").unwrap();
        drop(file);

        let q = Quarry::new();
        assert_eq!(q.load_file_with_encoding(&path, "latin1").unwrap().text(), "café");
        assert!(matches!(
            q.load_file_with_encoding(&path, "klingon"),
            Err(Error::UnsupportedEncoding(_))
        ));
        assert!(q.load_file(dir.join("quarry-missing-file.html")).is_err());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_extensions() {
        let mut q = Quarry::new();
        q.register("tags", |sel: &Selection, _args: &[serde_json::Value]| {
            let tags: Vec<serde_json::Value> = sel
                .iter()
                .filter_map(|n| n.tag_name())
                .map(serde_json::Value::from)
                .collect();
            Ok(ExtensionOutput::Value(serde_json::Value::Array(tags)))
        });
        q.register("nth", |sel: &Selection, args: &[serde_json::Value]| {
            let i = args.first().and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(ExtensionOutput::Selection(sel.eq(i as isize)))
        });

        let d = q.parse("<ul><li>a</li><li>b</li></ul>").unwrap();
        let li = d.query("li").unwrap();
        match q.invoke("tags", &li, &[]).unwrap() {
            ExtensionOutput::Value(v) => assert_eq!(v, serde_json::json!(["li", "li"])),
            other => panic!("unexpected {:?}", other),
        }
        match q.invoke("nth", &li, &[serde_json::json!(1)]).unwrap() {
            ExtensionOutput::Selection(s) => assert_eq!(s.text(), "b"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(q.invoke("missing", &li, &[]), Err(Error::UnknownExtension(_))));
    }
}
