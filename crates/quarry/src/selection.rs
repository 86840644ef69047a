//! The selection set
//!
//! Every query, traversal and filter returns a new [`Selection`] that
//! remembers the selection it came from, so [`Selection::end`] can step
//! back up the chain.

use std::fmt;
use std::ops::ControlFlow;
use std::rc::Rc;

use log::debug;
use quarry_css::{Query, Translator};
use quarry_dom::DomTree;
use quarry_html::{HtmlParser, ParserMode};
use quarry_net::Transport;
use quarry_select::{select, Axis};
use url::Url;

use crate::config::Config;
use crate::document::{Document, NodeRef};
use crate::error::Result;

/// State shared by every selection derived from one [`Quarry`](crate::Quarry)
pub(crate) struct Settings {
    pub config: Config,
    pub transport: Rc<dyn Transport>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings").field("config", &self.config).finish_non_exhaustive()
    }
}

/// A callback invoked once per selected element
///
/// The element is handed over as a one-element [`Selection`].
pub enum Callback<'a, R> {
    Indexed(Box<dyn FnMut(usize, &Selection) -> R + 'a>),
    Element(Box<dyn FnMut(&Selection) -> R + 'a>),
}

impl<'a, R> Callback<'a, R> {
    pub fn indexed(f: impl FnMut(usize, &Selection) -> R + 'a) -> Self {
        Callback::Indexed(Box::new(f))
    }

    pub fn element(f: impl FnMut(&Selection) -> R + 'a) -> Self {
        Callback::Element(Box::new(f))
    }

    pub(crate) fn call(&mut self, index: usize, item: &Selection) -> R {
        match self {
            Callback::Indexed(f) => f(index, item),
            Callback::Element(f) => f(item),
        }
    }
}

/// An ordered set of element references
#[derive(Clone)]
pub struct Selection {
    nodes: Vec<NodeRef>,
    parent: Option<Rc<Selection>>,
    base_url: Option<Url>,
    settings: Rc<Settings>,
}

impl Selection {
    pub(crate) fn new(nodes: Vec<NodeRef>, settings: Rc<Settings>, base_url: Option<Url>) -> Self {
        Self {
            nodes,
            parent: None,
            base_url,
            settings,
        }
    }

    /// A selection over `nodes` parented to `self`
    pub(crate) fn derive(&self, nodes: Vec<NodeRef>) -> Selection {
        Selection {
            nodes,
            parent: Some(Rc::new(self.clone())),
            base_url: self.base_url.clone(),
            settings: Rc::clone(&self.settings),
        }
    }

    /// A selection over `nodes` sharing this one's settings but no parent
    pub(crate) fn sibling(&self, nodes: Vec<NodeRef>) -> Selection {
        Selection {
            nodes,
            parent: None,
            base_url: self.base_url.clone(),
            settings: Rc::clone(&self.settings),
        }
    }

    pub(crate) fn settings(&self) -> &Rc<Settings> {
        &self.settings
    }

    pub(crate) fn set_nodes(&mut self, nodes: Vec<NodeRef>) {
        self.nodes = nodes;
    }

    pub(crate) fn set_base_url(&mut self, url: Option<Url>) {
        self.base_url = url;
    }

    pub fn config(&self) -> &Config {
        &self.settings.config
    }

    pub fn parser(&self) -> ParserMode {
        self.settings.config.parser
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeRef] {
        &self.nodes
    }

    pub fn get(&self, index: usize) -> Option<&NodeRef> {
        self.nodes.get(index)
    }

    pub fn first(&self) -> Option<&NodeRef> {
        self.nodes.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeRef> {
        self.nodes.iter()
    }

    /// Each element as its own selection, parented to `self`
    pub fn items(&self) -> Vec<Selection> {
        self.nodes.iter().map(|n| self.derive(vec![n.clone()])).collect()
    }

    /// Concatenation of both sets, duplicates kept
    pub fn add(&self, other: &Selection) -> Selection {
        let mut nodes = self.nodes.clone();
        nodes.extend(other.nodes.iter().cloned());
        self.sibling(nodes)
    }

    pub fn extend(&mut self, other: &Selection) -> &mut Self {
        self.nodes.extend(other.nodes.iter().cloned());
        self
    }

    /// The selection this one was derived from, or an empty one
    pub fn end(&self) -> Selection {
        match &self.parent {
            Some(parent) => parent.as_ref().clone(),
            None => self.sibling(Vec::new()),
        }
    }

    pub(crate) fn parent_selection(&self) -> Option<&Selection> {
        self.parent.as_deref()
    }

    /// Explicit base URL, or the nearest one up the parent chain
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url
            .as_ref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.base_url()))
    }

    /// Topmost ancestor of the first element (of the parent selection if there is one)
    pub fn root(&self) -> Option<NodeRef> {
        let anchor = match &self.parent {
            Some(parent) => parent.first(),
            None => self.first(),
        }?;
        let root = anchor.document().borrow().root_of(anchor.id());
        Some(anchor.sibling_ref(root))
    }

    /// Declared encoding of the document
    pub fn encoding(&self) -> Option<String> {
        let root = self.root()?;
        let tree = root.document().borrow();
        tree.encoding().map(str::to_string)
    }

    // ---- Selector plumbing ----

    pub(crate) fn compile(&self, selector: &str) -> Result<Query> {
        let config = &self.settings.config;
        Ok(Translator::new(&config.namespaces, config.case_sensitive()).translate(selector)?)
    }

    /// Run `query` from every context in turn, concatenating the results
    pub(crate) fn run(contexts: &[NodeRef], query: &Query, axis: Axis) -> Vec<NodeRef> {
        let mut results = Vec::new();
        for context in contexts {
            let tree = context.document().borrow();
            results.extend(
                select(&tree, context.id(), query, axis)
                    .into_iter()
                    .map(|id| context.sibling_ref(id)),
            );
        }
        results
    }

    /// Parse markup with this selection's parser into a fresh document
    pub(crate) fn parse_fragment(&self, markup: &str) -> Result<Vec<NodeRef>> {
        parse_document(markup, self.parser())
    }

    /// Keep the elements of `elements` matching `selector` on the self axis
    pub(crate) fn filter_only(
        &self,
        selector: Option<&str>,
        elements: Vec<NodeRef>,
        reverse: bool,
        unique: bool,
    ) -> Result<Selection> {
        let mut results = match selector {
            None => elements,
            Some(selector) => {
                let query = self.compile(selector)?;
                Self::run(&elements, &query, Axis::SelfOnly)
            }
        };
        if reverse {
            results.reverse();
        }
        if unique {
            let mut seen: Vec<NodeRef> = Vec::with_capacity(results.len());
            results.retain(|n| {
                if seen.contains(n) {
                    false
                } else {
                    seen.push(n.clone());
                    true
                }
            });
        }
        Ok(self.derive(results))
    }

    // ---- Querying ----

    /// `""` selects nothing, markup starting with `<` is parsed into a new
    /// document, anything else is matched below and including every element
    pub fn query(&self, selector: &str) -> Result<Selection> {
        if selector.is_empty() {
            return Ok(self.sibling(Vec::new()));
        }
        if selector.starts_with('<') {
            let nodes = self.parse_fragment(selector)?;
            return Ok(self.derive(nodes));
        }
        let query = self.compile(selector)?;
        Ok(self.derive(Self::run(&self.nodes, &query, Axis::DescendantOrSelf)))
    }

    /// Elements below the current ones; positions restart for every child
    pub fn find(&self, selector: &str) -> Result<Selection> {
        let query = self.compile(selector)?;
        let children: Vec<NodeRef> = self
            .nodes
            .iter()
            .flat_map(|n| {
                let tree = n.document().borrow();
                tree.element_children(n.id())
                    .into_iter()
                    .map(|c| n.sibling_ref(c))
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(self.derive(Self::run(&children, &query, Axis::DescendantOrSelf)))
    }

    pub fn filter(&self, selector: &str) -> Result<Selection> {
        self.filter_only(Some(selector), self.nodes.clone(), false, false)
    }

    pub fn filter_with(&self, mut predicate: Callback<'_, bool>) -> Selection {
        let mut kept = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            let item = self.sibling(vec![node.clone()]);
            if predicate.call(i, &item) {
                kept.push(node.clone());
            }
        }
        self.derive(kept)
    }

    /// Elements not matched by `selector` below and including the current set
    pub fn not_(&self, selector: &str) -> Result<Selection> {
        let query = self.compile(selector)?;
        let excluded = Self::run(&self.nodes, &query, Axis::DescendantOrSelf);
        let kept = self.nodes.iter().filter(|n| !excluded.contains(n)).cloned().collect();
        Ok(self.derive(kept))
    }

    pub fn is_(&self, selector: &str) -> Result<bool> {
        let query = self.compile(selector)?;
        Ok(!Self::run(&self.nodes, &query, Axis::SelfOnly).is_empty())
    }

    /// Negative indices count from the end
    pub fn eq(&self, index: isize) -> Selection {
        let len = self.nodes.len() as isize;
        let index = if index < 0 { len + index } else { index };
        let nodes = if (0..len).contains(&index) {
            vec![self.nodes[index as usize].clone()]
        } else {
            Vec::new()
        };
        self.derive(nodes)
    }

    /// Collect the callback's results, flattening iterables and dropping `None`
    pub fn map<T, I>(&self, mut f: Callback<'_, I>) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
    {
        let mut out = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            let item = self.sibling(vec![node.clone()]);
            out.extend(f.call(i, &item));
        }
        out
    }

    /// Call `f` for every element until it breaks
    pub fn each(&self, mut f: Callback<'_, ControlFlow<()>>) -> &Self {
        for (i, node) in self.nodes.iter().enumerate() {
            let item = self.sibling(vec![node.clone()]);
            if f.call(i, &item).is_break() {
                break;
            }
        }
        self
    }
}

/// Parse markup into a new document and return its top-level nodes
pub(crate) fn parse_document(markup: &str, mode: ParserMode) -> Result<Vec<NodeRef>> {
    let tree: DomTree = HtmlParser::new(mode).parse(markup)?;
    debug!("parsed {} nodes with {:?}", tree.len(), mode);
    Ok(Document::new(tree).roots())
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a NodeRef;
    type IntoIter = std::slice::Iter<'a, NodeRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Callback, Quarry};
    use std::ops::ControlFlow;

    const DOC: &str = "<div><p class=\"hello\">Hi</p><p>Bye</p></div>";

    #[test]
    fn test_positional_queries() {
        let d = Quarry::new().parse(DOC).unwrap();
        assert_eq!(d.query("p:first").unwrap().text(), "Hi");
        assert_eq!(d.query("p:last").unwrap().text(), "Bye");
        assert_eq!(d.query("p:eq(1)").unwrap().text(), "Bye");
        assert_eq!(d.query("p").unwrap().len(), 2);
        assert!(d.query("p:gt(9223372036854775807)").unwrap().is_empty());
        assert_eq!(d.query("p:lt(9223372036854775807)").unwrap().len(), 2);
        assert_eq!(d.query("p:gt(-9223372036854775808)").unwrap().len(), 2);
    }

    #[test]
    fn test_empty_and_markup_queries() {
        let d = Quarry::new().parse(DOC).unwrap();
        assert!(d.query("").unwrap().is_empty());

        let fresh = d.query("<span>new</span>").unwrap();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh.first().unwrap().tag_name().as_deref(), Some("span"));
        assert!(fresh.first().unwrap().parent().is_none());
    }

    #[test]
    fn test_end_walks_back() {
        let d = Quarry::new().parse(DOC).unwrap();
        let p = d.query("p").unwrap();
        let hello = p.filter(".hello").unwrap();
        assert_eq!(hello.len(), 1);
        assert_eq!(hello.end().len(), 2);
        assert_eq!(hello.end().end().len(), 1);
        assert!(d.end().is_empty());
    }

    #[test]
    fn test_eq_negative_and_out_of_range() {
        let d = Quarry::new().parse(DOC).unwrap();
        let p = d.query("p").unwrap();
        assert_eq!(p.eq(-1).text(), "Bye");
        assert_eq!(p.eq(0).text(), "Hi");
        assert!(p.eq(2).is_empty());
        assert!(p.eq(-3).is_empty());
    }

    #[test]
    fn test_find_is_descendant_only() {
        let d = Quarry::new().parse(DOC).unwrap();
        assert!(d.find("div").unwrap().is_empty());
        assert_eq!(d.find("p").unwrap().len(), 2);
        // every child starts its own position count
        assert_eq!(d.find("p:first").unwrap().len(), 2);
    }

    #[test]
    fn test_not_and_is() {
        let d = Quarry::new().parse(DOC).unwrap();
        let p = d.query("p").unwrap();
        assert_eq!(p.not_(".hello").unwrap().text(), "Bye");
        assert!(p.is_(".hello").unwrap());
        assert!(!p.is_("span").unwrap());
        assert!(p.is_("p:gt(").is_err());
    }

    #[test]
    fn test_filter_with_both_shapes() {
        let d = Quarry::new().parse(DOC).unwrap();
        let p = d.query("p").unwrap();
        let odd = p.filter_with(Callback::indexed(|i, _| i % 2 == 1));
        assert_eq!(odd.text(), "Bye");
        let hello = p.filter_with(Callback::element(|item| item.has_class("hello")));
        assert_eq!(hello.text(), "Hi");
    }

    #[test]
    fn test_map_flattens() {
        let d = Quarry::new().parse(DOC).unwrap();
        let p = d.query("p").unwrap();
        let classes: Vec<String> = p.map(Callback::element(|item| item.attr("class")));
        assert_eq!(classes, vec!["hello".to_string()]);
        let lengths: Vec<usize> = p.map(Callback::indexed(|i, item| vec![i, item.text().len()]));
        assert_eq!(lengths, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_each_breaks() {
        let d = Quarry::new().parse(DOC).unwrap();
        let mut seen = Vec::new();
        d.query("p").unwrap().each(Callback::indexed(|i, item| {
            seen.push(item.text());
            if i == 0 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }));
        assert_eq!(seen, vec!["Hi".to_string()]);
    }

    #[test]
    fn test_add_and_extend() {
        let d = Quarry::new().parse(DOC).unwrap();
        let first = d.query("p:first").unwrap();
        let last = d.query("p:last").unwrap();
        assert_eq!(first.add(&last).len(), 2);

        let mut both = first.clone();
        both.extend(&last).extend(&last);
        assert_eq!(both.len(), 3);
    }

    #[test]
    fn test_items_and_root() {
        let d = Quarry::new().parse(DOC).unwrap();
        let items = d.query("p").unwrap().items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text(), "Bye");
        assert_eq!(items[1].root().unwrap().tag_name().as_deref(), Some("div"));
        assert_eq!(format!("{:?}", d.query("p").unwrap()), "[<p.hello>, <p>]");
    }
}
