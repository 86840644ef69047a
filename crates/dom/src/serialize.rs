//! Markup serialization
//!
//! Two output methods are supported. `Xml` closes empty elements as `<x/>`
//! and escapes whitespace control characters inside attribute values.
//! `Html` never self-closes, omits end tags for void elements and leaves
//! `script`/`style` content unescaped.

use crate::node::NodeType;
use crate::tree::DomTree;
use crate::NodeId;

/// Output method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializeMode {
    #[default]
    Xml,
    Html,
}

/// Elements that never have an end tag in HTML output
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "area"
            | "base"
            | "basefont"
            | "br"
            | "col"
            | "embed"
            | "frame"
            | "hr"
            | "img"
            | "input"
            | "isindex"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Attributes HTML output writes without a value
fn is_boolean_attribute(name: &str) -> bool {
    matches!(
        name,
        "checked"
            | "compact"
            | "declare"
            | "defer"
            | "disabled"
            | "ismap"
            | "multiple"
            | "nohref"
            | "noresize"
            | "noshade"
            | "nowrap"
            | "readonly"
            | "selected"
    )
}

fn is_raw_text_element(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("script") || tag.eq_ignore_ascii_case("style")
}

/// Escape character data
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value for the given output method
pub fn escape_attribute(s: &str, mode: SerializeMode) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match (c, mode) {
            ('&', _) => out.push_str("&amp;"),
            ('<', _) => out.push_str("&lt;"),
            ('>', _) => out.push_str("&gt;"),
            ('"', _) => out.push_str("&quot;"),
            ('\n', SerializeMode::Xml) => out.push_str("&#10;"),
            ('\r', SerializeMode::Xml) => out.push_str("&#13;"),
            ('\t', SerializeMode::Xml) => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
    out
}

impl DomTree {
    /// Serialize a node, optionally followed by its tail
    pub fn serialize(&self, id: NodeId, mode: SerializeMode, with_tail: bool) -> String {
        let mut out = String::new();
        self.serialize_into(id, mode, with_tail, &mut out);
        out
    }

    pub fn serialize_into(&self, id: NodeId, mode: SerializeMode, with_tail: bool, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };

        match &node.node_type {
            NodeType::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeType::ProcessingInstruction { target, data } => {
                out.push_str("<?");
                out.push_str(target);
                if !data.is_empty() {
                    out.push(' ');
                    out.push_str(data);
                }
                out.push_str("?>");
            }
            NodeType::Element(elem) => {
                out.push('<');
                out.push_str(&elem.tag_name);
                for (name, value) in &elem.attributes {
                    out.push(' ');
                    out.push_str(name);
                    if mode == SerializeMode::Html && is_boolean_attribute(name) {
                        continue;
                    }
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value, mode));
                    out.push('"');
                }

                let text = node.text.as_deref().unwrap_or("");
                match mode {
                    SerializeMode::Xml if text.is_empty() && node.children.is_empty() => {
                        out.push_str("/>");
                    }
                    SerializeMode::Html if is_void_element(&elem.tag_name) => {
                        out.push('>');
                    }
                    _ => {
                        out.push('>');
                        if mode == SerializeMode::Html && is_raw_text_element(&elem.tag_name) {
                            out.push_str(text);
                        } else {
                            out.push_str(&escape_text(text));
                        }
                        for &child in &node.children {
                            self.serialize_into(child, mode, true, out);
                        }
                        out.push_str("</");
                        out.push_str(&elem.tag_name);
                        out.push('>');
                    }
                }
            }
        }

        if with_tail {
            if let Some(tail) = &node.tail {
                out.push_str(&escape_text(tail));
            }
        }
    }

    /// Escaped inner text followed by every child (with tails)
    pub fn inner_markup(&self, id: NodeId, mode: SerializeMode) -> String {
        let mut out = String::new();
        if let Some(text) = self.text(id) {
            out.push_str(&escape_text(text));
        }
        for &child in self.children(id) {
            self.serialize_into(child, mode, true, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph() -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        let b = tree.create_element("b");
        let br = tree.create_element("br");
        tree.append_children(p, &[b, br]).unwrap();
        tree.set_text(p, Some("Hello ".into()));
        tree.set_text(b, Some("warming".into()));
        tree.set_tail(b, Some(" world".into()));
        tree.set_tail(br, Some(" & more".into()));
        tree.set_tail(p, Some("after".into()));
        tree.element_mut(p).unwrap().set_attribute("title", "a\"b\nc");
        (tree, p)
    }

    #[test]
    fn test_xml_output() {
        let (tree, p) = paragraph();
        assert_eq!(
            tree.serialize(p, SerializeMode::Xml, false),
            "<p title=\"a&quot;b&#10;c\">Hello <b>warming</b> world<br/> &amp; more</p>"
        );
        assert!(tree.serialize(p, SerializeMode::Xml, true).ends_with("</p>after"));
    }

    #[test]
    fn test_html_output() {
        let (tree, p) = paragraph();
        assert_eq!(
            tree.serialize(p, SerializeMode::Html, false),
            "<p title=\"a&quot;b\nc\">Hello <b>warming</b> world<br> &amp; more</p>"
        );
    }

    #[test]
    fn test_html_empty_non_void() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let input = tree.create_element("input");
        tree.element_mut(input).unwrap().set_attribute("checked", "checked");
        tree.append_child(div, input).unwrap();
        assert_eq!(tree.serialize(div, SerializeMode::Html, false), "<div><input checked></div>");
        assert_eq!(
            tree.serialize(div, SerializeMode::Xml, false),
            "<div><input checked=\"checked\"/></div>"
        );
    }

    #[test]
    fn test_raw_script() {
        let mut tree = DomTree::new();
        let script = tree.create_element("script");
        tree.set_text(script, Some("if (a < b) {}".into()));
        assert_eq!(
            tree.serialize(script, SerializeMode::Html, false),
            "<script>if (a < b) {}</script>"
        );
        assert_eq!(
            tree.serialize(script, SerializeMode::Xml, false),
            "<script>if (a &lt; b) {}</script>"
        );
    }

    #[test]
    fn test_comments_and_pis() {
        let mut tree = DomTree::new();
        let root = tree.create_element("root");
        let c = tree.create_comment(" note ");
        let pi = tree.create_processing_instruction("php", "echo 1;");
        tree.append_children(root, &[c, pi]).unwrap();
        tree.set_tail(c, Some("x".into()));
        assert_eq!(
            tree.serialize(root, SerializeMode::Xml, false),
            "<root><!-- note -->x<?php echo 1;?></root>"
        );
    }

    #[test]
    fn test_inner_markup() {
        let (tree, p) = paragraph();
        assert_eq!(
            tree.inner_markup(p, SerializeMode::Xml),
            "Hello <b>warming</b> world<br/> &amp; more"
        );
    }
}
