//! Tree construction
//!
//! Builds a `DomTree` from tokens. Character data never becomes a node of
//! its own: it is appended to the inner text of the current element when
//! that element has no children yet, otherwise to the tail of its last
//! child.

use std::str::FromStr;

use log::debug;
use smallvec::SmallVec;

use quarry_dom::{is_void_element, DomTree, NodeId};

use crate::error::{HtmlError, HtmlResult};
use crate::tokenizer::{Token, Tokenizer};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

type Attributes = SmallVec<[(String, String); 4]>;

/// Which parser (or parser chain) turns markup into a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserMode {
    /// Strict XML, retried as `Html` when the input is not well formed
    #[default]
    Auto,
    /// Strict XML only
    Xml,
    /// Lenient HTML. Full documents yield the `html` element, anything
    /// else yields a single element (wrapping loose content if needed).
    Html,
    /// Always a full `html`/`head`/`body` document
    Html5,
    /// Every top-level element, leading text discarded
    HtmlFragments,
    /// Lenient recovery that keeps everything under one `html` root
    /// without adding `head` or `body`
    Soup,
}

impl ParserMode {
    pub fn is_xml(self) -> bool {
        self == ParserMode::Xml
    }
}

impl FromStr for ParserMode {
    type Err = HtmlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ParserMode::Auto),
            "xml" => Ok(ParserMode::Xml),
            "html" => Ok(ParserMode::Html),
            "html5" => Ok(ParserMode::Html5),
            "html_fragments" => Ok(ParserMode::HtmlFragments),
            "soup" => Ok(ParserMode::Soup),
            other => Err(HtmlError::ParseError(format!("No such parser: \"{}\"", other))),
        }
    }
}

/// Markup parser front end
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser {
    mode: ParserMode,
}

impl HtmlParser {
    /// Create a parser for the given mode
    pub fn new(mode: ParserMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ParserMode {
        self.mode
    }

    /// Parse markup into a tree. The parse results are the tree's roots.
    pub fn parse(&self, input: &str) -> HtmlResult<DomTree> {
        match self.mode {
            ParserMode::Auto => parse_xml(input).or_else(|err| {
                debug!("XML parse failed ({}), retrying as HTML", err);
                parse_html(input)
            }),
            ParserMode::Xml => parse_xml(input),
            ParserMode::Html => parse_html(input),
            ParserMode::Html5 => parse_document(input, true),
            ParserMode::HtmlFragments => parse_fragments(input),
            ParserMode::Soup => parse_soup(input),
        }
    }
}

fn parse_xml(input: &str) -> HtmlResult<DomTree> {
    let mut builder = TreeBuilder::new(BuildMode::Xml);
    builder.run(Tokenizer::new_xml(input))?;
    Ok(builder.tree)
}

fn parse_document(input: &str, full_scaffold: bool) -> HtmlResult<DomTree> {
    let mut builder = TreeBuilder::new(BuildMode::Document);
    builder.run(Tokenizer::new(input))?;
    builder.complete_document(full_scaffold)?;
    Ok(builder.tree)
}

/// Parse loose markup under a synthetic container element
fn parse_into_container(input: &str) -> HtmlResult<(DomTree, NodeId)> {
    let mut builder = TreeBuilder::new(BuildMode::Fragment);
    let container = builder.tree.create_element("div");
    builder.container = Some(container);
    builder.open_elements.push(container);
    builder.run(Tokenizer::new(input))?;
    Ok((builder.tree, container))
}

fn looks_like_full_html(input: &str) -> bool {
    let head: String = input.chars().take(9).collect::<String>().to_ascii_lowercase();
    head.starts_with("<html") || head.starts_with("<!doctype")
}

fn is_blank(text: Option<&str>) -> bool {
    text.map(|t| t.trim().is_empty()).unwrap_or(true)
}

fn parse_html(input: &str) -> HtmlResult<DomTree> {
    let trimmed = input.trim_start();
    if trimmed.is_empty() {
        return Err(HtmlError::EmptyDocument);
    }
    if looks_like_full_html(trimmed) {
        return parse_document(input, false);
    }

    let (mut tree, container) = parse_into_container(input)?;
    let children = tree.children(container).to_vec();

    if children.is_empty() {
        if is_blank(tree.text(container)) {
            return Err(HtmlError::EmptyDocument);
        }
        rename(&mut tree, container, "p");
        tree.add_root(container);
        return Ok(tree);
    }

    if children.len() == 1
        && tree.is_element(children[0])
        && is_blank(tree.text(container))
        && is_blank(tree.tail(children[0]))
    {
        let only = children[0];
        tree.detach(only);
        tree.set_tail(only, None);
        tree.add_root(only);
        tree.remove_subtree(container);
        return Ok(tree);
    }

    let has_block = tree
        .descendants(container)
        .into_iter()
        .any(|id| tree.element(id).map(|e| is_block_level(&e.tag_name)).unwrap_or(false));
    rename(&mut tree, container, if has_block { "div" } else { "span" });
    tree.add_root(container);
    Ok(tree)
}

fn parse_fragments(input: &str) -> HtmlResult<DomTree> {
    let (mut tree, container) = parse_into_container(input)?;
    if let Some(text) = tree.text(container).filter(|t| !t.trim().is_empty()) {
        debug!("discarding leading text {:?} before the first fragment", text);
    }
    for child in tree.children(container).to_vec() {
        if tree.is_element(child) {
            tree.detach(child);
            tree.add_root(child);
        }
    }
    tree.remove_subtree(container);
    Ok(tree)
}

fn parse_soup(input: &str) -> HtmlResult<DomTree> {
    if looks_like_full_html(input.trim_start()) {
        return parse_document(input, false);
    }
    let (mut tree, container) = parse_into_container(input)?;
    rename(&mut tree, container, "html");
    tree.add_root(container);
    Ok(tree)
}

fn rename(tree: &mut DomTree, id: NodeId, tag: &str) {
    if let Some(el) = tree.element_mut(id) {
        el.tag_name = tag.to_string();
    }
}

/// Pull `encoding="..."` out of an XML declaration
fn declared_encoding(data: &str) -> Option<String> {
    let rest = &data[data.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    let end = value.find(quote)?;
    Some(value[..end].to_string())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BuildMode {
    Xml,
    Document,
    Fragment,
}

struct TreeBuilder {
    tree: DomTree,
    mode: BuildMode,
    open_elements: Vec<NodeId>,
    /// Namespace declarations per open element (XML only)
    ns_scopes: Vec<Vec<(Option<String>, String)>>,
    /// Pending character data
    text: String,
    root: Option<NodeId>,
    html_element: Option<NodeId>,
    head_element: Option<NodeId>,
    body_element: Option<NodeId>,
    container: Option<NodeId>,
}

impl TreeBuilder {
    fn new(mode: BuildMode) -> Self {
        Self {
            tree: DomTree::new(),
            mode,
            open_elements: Vec::new(),
            ns_scopes: Vec::new(),
            text: String::new(),
            root: None,
            html_element: None,
            head_element: None,
            body_element: None,
            container: None,
        }
    }

    fn run(&mut self, mut tokenizer: Tokenizer) -> HtmlResult<()> {
        loop {
            let token = tokenizer.next_token()?;
            if token == Token::Eof {
                break;
            }
            self.process_token(token)?;
        }
        self.flush_text()?;

        if self.mode == BuildMode::Xml {
            if !self.open_elements.is_empty() {
                let names: Vec<String> = self
                    .open_elements
                    .iter()
                    .map(|&id| self.tag_name(id))
                    .collect();
                return Err(HtmlError::UnclosedElements(names.join(", ")));
            }
            if self.root.is_none() {
                return Err(HtmlError::EmptyDocument);
            }
        }
        Ok(())
    }

    /// Process a single token
    fn process_token(&mut self, token: Token) -> HtmlResult<()> {
        if let Token::Character(c) = token {
            self.text.push(c);
            return Ok(());
        }
        self.flush_text()?;

        match token {
            Token::Doctype { name } => {
                if !name.is_empty() {
                    self.tree.set_doctype(name);
                }
            }

            Token::StartTag { name, attributes, self_closing } => match self.mode {
                BuildMode::Xml => self.xml_start_tag(name, attributes, self_closing)?,
                BuildMode::Document => self.document_start_tag(name, attributes, self_closing)?,
                BuildMode::Fragment => {
                    if !matches!(name.as_str(), "html" | "head" | "body") {
                        self.close_implied_elements(&name);
                        self.insert_element(name, attributes, self_closing)?;
                    }
                }
            },

            Token::EndTag { name } => match self.mode {
                BuildMode::Xml => self.xml_end_tag(name)?,
                _ => self.html_end_tag(&name),
            },

            Token::Comment(text) => {
                if let Some(parent) = self.current_node() {
                    let comment = self.tree.create_comment(text);
                    self.tree.append_child(parent, comment)?;
                }
            }

            Token::ProcessingInstruction { target, data } => {
                if target.eq_ignore_ascii_case("xml") {
                    if let Some(encoding) = declared_encoding(&data) {
                        self.tree.set_encoding(encoding);
                    }
                } else if let Some(parent) = self.current_node() {
                    let pi = self.tree.create_processing_instruction(target, data);
                    self.tree.append_child(parent, pi)?;
                }
            }

            Token::Character(_) | Token::Eof => {}
        }
        Ok(())
    }

    /// Get the current node (top of the open element stack)
    fn current_node(&self) -> Option<NodeId> {
        self.open_elements.last().copied()
    }

    fn tag_name(&self, id: NodeId) -> String {
        self.tree
            .element(id)
            .map(|e| e.tag_name.clone())
            .unwrap_or_default()
    }

    fn append_text_run(&mut self, parent: NodeId, text: &str) {
        match self.tree.children(parent).last().copied() {
            Some(last) => self.tree.append_tail(last, text),
            None => self.tree.append_text(parent, text),
        }
    }

    fn flush_text(&mut self) -> HtmlResult<()> {
        if self.text.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.text);
        let blank = text.trim().is_empty();

        match self.mode {
            BuildMode::Xml => match self.current_node() {
                Some(parent) => self.append_text_run(parent, &text),
                None if blank => {}
                None => return Err(HtmlError::TextOutsideRoot),
            },
            BuildMode::Document => {
                let current = self.current_node();
                let at_top = current.is_none() || current == self.html_element;
                let in_head = current.is_some() && current == self.head_element;
                if blank && at_top {
                    return Ok(());
                }
                if !blank && (at_top || in_head) && self.body_element.is_none() {
                    self.open_body(Attributes::new())?;
                }
                if let Some(parent) = self.current_node() {
                    self.append_text_run(parent, &text);
                }
            }
            BuildMode::Fragment => {
                if let Some(parent) = self.current_node() {
                    self.append_text_run(parent, &text);
                }
            }
        }
        Ok(())
    }

    // ---- XML ----

    fn lookup_namespace(&self, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE.to_string());
        }
        self.ns_scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.clone())
    }

    fn xml_start_tag(&mut self, name: String, attributes: Attributes, self_closing: bool) -> HtmlResult<()> {
        if self.open_elements.is_empty() && self.root.is_some() {
            return Err(HtmlError::MultipleRoots);
        }

        let scope = attributes
            .iter()
            .filter_map(|(k, v)| {
                if k == "xmlns" {
                    Some((None, v.clone()))
                } else {
                    k.strip_prefix("xmlns:").map(|p| (Some(p.to_string()), v.clone()))
                }
            })
            .collect();
        self.ns_scopes.push(scope);

        let namespace = match name.split_once(':') {
            Some((prefix, _)) => Some(
                self.lookup_namespace(Some(prefix))
                    .ok_or_else(|| HtmlError::UnboundPrefix(prefix.to_string()))?,
            ),
            None => self.lookup_namespace(None).filter(|uri| !uri.is_empty()),
        };
        for (key, _) in &attributes {
            if let Some((prefix, _)) = key.split_once(':') {
                if prefix != "xmlns" && self.lookup_namespace(Some(prefix)).is_none() {
                    return Err(HtmlError::UnboundPrefix(prefix.to_string()));
                }
            }
        }

        let id = self.tree.create_element_ns(name, namespace);
        if let Some(elem) = self.tree.element_mut(id) {
            elem.attributes = attributes;
        }

        match self.current_node() {
            Some(parent) => self.tree.append_child(parent, id)?,
            None => {
                self.root = Some(id);
                self.tree.add_root(id);
            }
        }

        if self_closing {
            self.ns_scopes.pop();
        } else {
            self.open_elements.push(id);
        }
        Ok(())
    }

    fn xml_end_tag(&mut self, name: String) -> HtmlResult<()> {
        let Some(top) = self.current_node() else {
            return Err(HtmlError::UnexpectedEndTag(name));
        };
        let expected = self.tag_name(top);
        if expected != name {
            return Err(HtmlError::MismatchedTag { expected, found: name });
        }
        self.open_elements.pop();
        self.ns_scopes.pop();
        Ok(())
    }

    // ---- HTML ----

    fn merge_attributes(&mut self, id: NodeId, attributes: Attributes) {
        if let Some(elem) = self.tree.element_mut(id) {
            for (key, value) in attributes {
                if !elem.has_attribute(&key) {
                    elem.set_attribute(key, value);
                }
            }
        }
    }

    fn ensure_html(&mut self) -> NodeId {
        if let Some(html) = self.html_element {
            return html;
        }
        let html = self.tree.create_element("html");
        self.tree.add_root(html);
        self.html_element = Some(html);
        self.open_elements.insert(0, html);
        html
    }

    fn open_body(&mut self, attributes: Attributes) -> HtmlResult<NodeId> {
        let html = self.ensure_html();
        if let Some(pos) = self.open_elements.iter().position(|&e| e == html) {
            self.open_elements.truncate(pos + 1);
        }
        let body = self.tree.create_element("body");
        self.merge_attributes(body, attributes);
        self.tree.append_child(html, body)?;
        self.body_element = Some(body);
        self.open_elements.push(body);
        Ok(body)
    }

    fn open_head(&mut self) -> HtmlResult<NodeId> {
        let html = self.ensure_html();
        let head = match self.head_element {
            Some(head) => head,
            None => {
                let head = self.tree.create_element("head");
                self.tree.insert_children(html, 0, &[head])?;
                self.head_element = Some(head);
                head
            }
        };
        if !self.open_elements.contains(&head) {
            self.open_elements.push(head);
        }
        Ok(head)
    }

    fn document_start_tag(&mut self, name: String, attributes: Attributes, self_closing: bool) -> HtmlResult<()> {
        match name.as_str() {
            "html" => {
                match self.html_element {
                    Some(html) => self.merge_attributes(html, attributes),
                    None => {
                        let html = self.ensure_html();
                        self.merge_attributes(html, attributes);
                    }
                }
                return Ok(());
            }
            "head" => {
                if self.head_element.is_none() && self.body_element.is_none() {
                    let head = self.open_head()?;
                    self.merge_attributes(head, attributes);
                }
                return Ok(());
            }
            "body" => {
                match self.body_element {
                    Some(body) => self.merge_attributes(body, attributes),
                    None => {
                        self.open_body(attributes)?;
                    }
                }
                return Ok(());
            }
            _ => {}
        }

        if self.body_element.is_some() || is_body_content(&name) {
            if self.body_element.is_none() {
                self.open_body(Attributes::new())?;
            }
        } else {
            self.open_head()?;
        }

        self.close_implied_elements(&name);
        self.insert_element(name, attributes, self_closing)
    }

    /// Append a new element at the current node and open it if it can
    /// have content
    fn insert_element(&mut self, name: String, attributes: Attributes, self_closing: bool) -> HtmlResult<()> {
        let Some(parent) = self.current_node() else {
            return Ok(());
        };
        let keep_open = !self_closing && !is_void_element(&name);
        let id = self.tree.create_element(name);
        if let Some(elem) = self.tree.element_mut(id) {
            elem.attributes = attributes;
        }
        self.tree.append_child(parent, id)?;
        if keep_open {
            self.open_elements.push(id);
        }
        Ok(())
    }

    fn is_scaffold(&self, id: NodeId) -> bool {
        Some(id) == self.container
            || Some(id) == self.html_element
            || Some(id) == self.head_element
            || Some(id) == self.body_element
    }

    /// Pop elements whose end tag is implied by `incoming`
    fn close_implied_elements(&mut self, incoming: &str) {
        while let Some(current) = self.current_node() {
            if self.is_scaffold(current) {
                break;
            }
            let tag = self.tag_name(current);
            if closes_on_start(&tag, incoming) {
                self.open_elements.pop();
            } else {
                break;
            }
        }
    }

    fn html_end_tag(&mut self, name: &str) {
        if self.mode == BuildMode::Document {
            match name {
                "html" | "body" => return,
                "head" => {
                    if let Some(pos) = self
                        .head_element
                        .and_then(|head| self.open_elements.iter().position(|&e| e == head))
                    {
                        self.open_elements.truncate(pos);
                    }
                    return;
                }
                _ => {}
            }
        }

        for i in (0..self.open_elements.len()).rev() {
            let id = self.open_elements[i];
            if self.is_scaffold(id) {
                break;
            }
            if self.tag_name(id) == name {
                // Pop all elements up to and including this one
                self.open_elements.truncate(i);
                return;
            }
        }
        debug!("ignoring stray end tag </{}>", name);
    }

    /// Make sure a document has the structure callers expect
    fn complete_document(&mut self, full_scaffold: bool) -> HtmlResult<()> {
        self.ensure_html();
        if full_scaffold {
            self.open_head()?;
            if self.body_element.is_none() {
                self.open_body(Attributes::new())?;
            }
        }
        Ok(())
    }
}

/// Block-level elements; a fragment containing one is wrapped in a `div`
fn is_block_level(tag: &str) -> bool {
    matches!(
        tag,
        "address" | "blockquote" | "center" | "dir" | "div" | "dl" | "fieldset" | "form"
            | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "hr" | "isindex" | "menu"
            | "noframes" | "noscript" | "ol" | "p" | "pre" | "table" | "ul"
    )
}

/// Whether opening `incoming` ends the open `current` element
fn closes_on_start(current: &str, incoming: &str) -> bool {
    match current {
        "p" => {
            is_block_level(incoming)
                || matches!(
                    incoming,
                    "article" | "aside" | "details" | "dd" | "dt" | "figure" | "footer"
                        | "header" | "li" | "main" | "nav" | "section"
                )
        }
        "li" => incoming == "li",
        "dt" | "dd" => incoming == "dt" || incoming == "dd",
        "option" => incoming == "option" || incoming == "optgroup",
        "optgroup" => incoming == "optgroup",
        "tr" => incoming == "tr",
        "td" | "th" => matches!(incoming, "td" | "th" | "tr"),
        _ => false,
    }
}

/// Check if a tag belongs in body (not head)
fn is_body_content(name: &str) -> bool {
    !matches!(
        name,
        "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes"
        | "script" | "style" | "template" | "title"
    )
}
