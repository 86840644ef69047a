//! Reading and replacing element content

use std::fmt;

use quarry_dom::SerializeMode;

use crate::document::NodeRef;
use crate::error::Result;
use crate::manipulation::Content;
use crate::selection::Selection;
use crate::text::{extract_text, extract_text_with, TextOptions};

/// A child of an element: a run of text or an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    Text(String),
    Node(NodeRef),
}

impl Selection {
    /// Text runs and element children of every element, in order
    ///
    /// Comments are skipped but the text after them is kept.
    pub fn contents(&self) -> Vec<ContentItem> {
        let mut items = Vec::new();
        for node in self.iter() {
            let tree = node.document().borrow();
            if let Some(text) = tree.text(node.id()) {
                items.push(ContentItem::Text(text.to_string()));
            }
            for &child in tree.children(node.id()) {
                if tree.is_element(child) {
                    items.push(ContentItem::Node(node.sibling_ref(child)));
                }
                if let Some(tail) = tree.tail(child) {
                    items.push(ContentItem::Text(tail.to_string()));
                }
            }
        }
        items
    }

    /// Inner markup of the first element
    pub fn html(&self) -> Option<String> {
        let node = self.first()?;
        let tree = node.document().borrow();
        Some(tree.inner_markup(node.id(), SerializeMode::Xml))
    }

    /// Markup of the first element itself, HTML method, tail excluded
    pub fn outer_html(&self) -> Option<String> {
        let node = self.first()?;
        let tree = node.document().borrow();
        Some(tree.serialize(node.id(), SerializeMode::Html, false))
    }

    /// Readable text of every element, joined with a space
    pub fn text(&self) -> String {
        self.iter()
            .map(|node| {
                let tree = node.document().borrow();
                match tree.element(node.id()) {
                    Some(el) if el.tag_name == "textarea" => {
                        tree.inner_markup(node.id(), SerializeMode::Xml)
                    }
                    _ => extract_text(&tree, node.id()),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Like [`text`](Self::text) without whitespace squashing
    pub fn text_raw(&self) -> String {
        self.text_with(&TextOptions::raw())
    }

    /// Text of every element rendered with `options`, joined with a space
    pub fn text_with(&self, options: &TextOptions) -> String {
        self.iter()
            .map(|node| extract_text_with(&node.document().borrow(), node.id(), options))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Replace the content of every element with parsed `markup`
    pub fn set_html(&self, markup: &str) -> Result<&Self> {
        self.empty();
        self.append(Content::Markup(markup.to_string()))
    }

    /// Replace the content of every element with plain text
    pub fn set_text(&self, value: &str) -> &Self {
        for node in self.iter() {
            let discarded = {
                let mut tree = node.document().borrow_mut();
                let children = tree.children(node.id()).to_vec();
                tree.clear_children(node.id());
                let text = if value.is_empty() { None } else { Some(value.to_string()) };
                tree.set_text(node.id(), text);
                children
            };
            node.document().release(discarded);
        }
        self
    }

    fn serialize_all(&self, mode: SerializeMode) -> String {
        let mut out = String::new();
        for node in self.iter() {
            node.document().borrow().serialize_into(node.id(), mode, true, &mut out);
        }
        out
    }

    /// Every element with its tail, XML method
    pub fn to_xml_string(&self) -> String {
        self.serialize_all(SerializeMode::Xml)
    }

    /// Every element with its tail, HTML method
    pub fn to_html_string(&self) -> String {
        self.serialize_all(SerializeMode::Html)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, ParserMode, Quarry};

    fn html(markup: &str) -> Selection {
        Quarry::with_config(Config::default().parser(ParserMode::Html))
            .parse(markup)
            .unwrap()
    }

    #[test]
    fn test_html_and_outer_html() {
        let d = html("<div><p>a &amp; <br>b</p> tail</div>");
        let p = d.query("p").unwrap();
        assert_eq!(p.html().as_deref(), Some("a &amp; <br/>b"));
        assert_eq!(p.outer_html().as_deref(), Some("<p>a &amp; <br>b</p>"));
        assert!(d.query("span").unwrap().html().is_none());
    }

    #[test]
    fn test_text_joins_elements() {
        let d = html("<ul><li>one</li><li> two  words </li></ul>");
        assert_eq!(d.query("li").unwrap().text(), "one two words");
        assert_eq!(d.query("li").unwrap().text_raw(), "one  two  words ");
        assert_eq!(d.query("em").unwrap().text(), "");
    }

    #[test]
    fn test_text_with_symbols() {
        let d = html("<div><p>a<br>b</p><p>c</p></div>");
        let options = TextOptions::default().block_symbol(" ¶ ").separator_symbol(" / ");
        assert_eq!(d.text_with(&options), "a / b ¶ c");
        assert_eq!(d.text_with(&TextOptions::raw()), d.text_raw());
        assert_eq!(d.text_with(&TextOptions::default()), d.text());
    }

    #[test]
    fn test_textarea_text_is_its_markup() {
        let d = html("<form><textarea>  two  spaces </textarea><p>  two  spaces </p></form>");
        assert_eq!(d.query("textarea").unwrap().text(), "  two  spaces ");
        assert_eq!(d.query("p").unwrap().text(), "two spaces");
    }

    #[test]
    fn test_set_html_and_set_text() {
        let d = html("<div><p>old<b>x</b></p><p>two</p></div>");
        let p = d.query("p").unwrap();
        p.set_html("new <i>i</i>").unwrap();
        assert_eq!(d.to_string(), "<div><p>new <i>i</i></p><p>new <i>i</i></p></div>");

        p.set_text("<plain>");
        assert_eq!(d.to_string(), "<div><p>&lt;plain&gt;</p><p>&lt;plain&gt;</p></div>");
        p.set_text("");
        assert_eq!(d.to_string(), "<div><p/><p/></div>");
    }

    #[test]
    fn test_replaced_content_is_freed() {
        let d = html("<div><p>x</p></div>");
        let doc = d.first().unwrap().document().clone();
        d.set_html("<p>a</p><p>b</p>").unwrap();
        assert_eq!(doc.borrow().len(), 3);

        for _ in 0..200 {
            d.set_html("<p>a</p><p>b</p>").unwrap();
            d.set_text("t");
            d.set_html("<p>a</p><p>b</p>").unwrap();
        }
        assert_eq!(doc.borrow().len(), 3);
    }

    #[test]
    fn test_detached_nodes_live_while_referenced() {
        let d = html("<div><p>a</p><p>b</p></div>");
        let doc = d.first().unwrap().document().clone();
        let p = d.query("p").unwrap();
        d.set_text("t");
        assert_eq!(doc.borrow().len(), 3);
        assert_eq!(p.text(), "a b");

        drop(p);
        assert_eq!(doc.borrow().len(), 1);
        assert_eq!(d.to_string(), "<div>t</div>");

        let d = html("<ul><li>a</li><li>b</li></ul>");
        let doc = d.first().unwrap().document().clone();
        d.query("li:first").unwrap().remove();
        assert_eq!(doc.borrow().len(), 2);
        assert_eq!(d.to_string(), "<ul><li>b</li></ul>");
    }

    #[test]
    fn test_serialized_output_reparses_to_the_same_tree() {
        // the HTML method pairs with the HTML parser: raw text stays raw
        let d = html(
            "<div id=\"a\">x &amp; y<p class=\"c\">one<br>two</p> tail<script>if (a < b) {}</script><!-- note -->after</div>",
        );
        let out = d.to_html_string();
        assert!(out.contains("<script>if (a < b) {}</script>"));
        let again = html(&out);
        assert_eq!(again.to_html_string(), out);
        assert_eq!(again.text(), d.text());

        // the XML method pairs with the XML parser
        let xml = |markup: &str| {
            Quarry::with_config(Config::default().parser(ParserMode::Xml))
                .parse(markup)
                .unwrap()
        };
        let d = xml("<doc><a k=\"1 &amp; 2\">t &lt; u</a><b/>tail<!-- c --></doc>");
        let out = d.to_xml_string();
        assert_eq!(out, "<doc><a k=\"1 &amp; 2\">t &lt; u</a><b/>tail<!-- c --></doc>");
        assert_eq!(xml(&out).to_xml_string(), out);
    }

    #[test]
    fn test_contents_skips_comments() {
        let d = html("<p>a<!-- c -->b<em>e</em>c</p>");
        let items = d.contents();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], ContentItem::Text("a".into()));
        assert_eq!(items[1], ContentItem::Text("b".into()));
        assert!(matches!(&items[2], ContentItem::Node(n) if n.tag_name().as_deref() == Some("em")));
        assert_eq!(items[3], ContentItem::Text("c".into()));
    }

    #[test]
    fn test_serialization_methods() {
        let d = html("<div><br><img src=\"x\"> t</div>");
        assert_eq!(d.to_xml_string(), "<div><br/><img src=\"x\"/> t</div>");
        assert_eq!(d.to_html_string(), "<div><br><img src=\"x\"> t</div>");
        let imgs = d.query("br, img").unwrap();
        assert_eq!(imgs.to_string(), "<br/><img src=\"x\"/> t");
    }
}
