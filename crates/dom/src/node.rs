//! DOM Node representation
//!
//! Text lives on the nodes themselves: `text` is the content before the
//! first child, `tail` is the content after the node's end tag and before
//! the next sibling.

use smallvec::SmallVec;
use std::fmt;

/// Unique identifier for a node in the DOM tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new node ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Type of DOM node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    /// Element node
    Element(ElementData),
    /// Comment
    Comment(String),
    /// Processing instruction (`<?target data?>`)
    ProcessingInstruction { target: String, data: String },
}

/// Element-specific data
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Tag name as written in the source, including any prefix
    pub tag_name: String,
    /// Namespace URI the tag resolved to, if any
    pub namespace: Option<String>,
    /// Attributes in source order
    pub attributes: SmallVec<[(String, String); 4]>,
}

impl ElementData {
    /// Create a new element with the given tag name
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            namespace: None,
            attributes: SmallVec::new(),
        }
    }

    /// Create a namespaced element
    pub fn with_namespace(tag_name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            namespace,
            ..Self::new(tag_name)
        }
    }

    /// Tag name without its prefix
    pub fn local_name(&self) -> &str {
        match self.tag_name.split_once(':') {
            Some((_, local)) => local,
            None => &self.tag_name,
        }
    }

    /// Get an attribute value
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get an attribute value, comparing names ASCII case-insensitively
    pub fn get_attribute_ignore_case(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    /// Set an attribute value, keeping its position if it already exists
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Remove an attribute
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Check if the element has a class
    pub fn has_class(&self, class: &str) -> bool {
        self.get_attribute("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Get the element's ID
    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id")
    }

    /// Get all classes as a vector
    pub fn classes(&self) -> Vec<&str> {
        self.get_attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// A node in the DOM tree
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Node type and associated data
    pub node_type: NodeType,
    /// Parent node ID (None for roots and detached nodes)
    pub parent: Option<NodeId>,
    /// Child node IDs
    pub children: SmallVec<[NodeId; 8]>,
    /// Text before the first child
    pub text: Option<String>,
    /// Text after this node, before the next sibling
    pub tail: Option<String>,
}

impl Node {
    /// Create a new node
    pub fn new(id: NodeId, node_type: NodeType) -> Self {
        Self {
            id,
            node_type,
            parent: None,
            children: SmallVec::new(),
            text: None,
            tail: None,
        }
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        matches!(self.node_type, NodeType::Element(_))
    }

    /// Check if this is a comment node
    pub fn is_comment(&self) -> bool {
        matches!(self.node_type, NodeType::Comment(_))
    }

    /// Get element data if this is an element
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Get mutable element data if this is an element
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Get the tag name if this is an element
    pub fn tag_name(&self) -> Option<&str> {
        self.as_element().map(|e| e.tag_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_order_is_stable() {
        let mut el = ElementData::new("a");
        el.set_attribute("href", "/x");
        el.set_attribute("class", "one two");
        el.set_attribute("href", "/y");

        let names: Vec<&str> = el.attributes.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["href", "class"]);
        assert_eq!(el.get_attribute("href"), Some("/y"));
        assert!(el.has_class("two"));
        assert_eq!(el.remove_attribute("href"), Some("/y".to_string()));
        assert!(!el.has_attribute("href"));
    }

    #[test]
    fn test_local_name() {
        let el = ElementData::with_namespace("svg:rect", Some("http://www.w3.org/2000/svg".into()));
        assert_eq!(el.local_name(), "rect");
        assert_eq!(ElementData::new("div").local_name(), "div");
    }

    #[test]
    fn test_attribute_ignore_case() {
        let mut el = ElementData::new("input");
        el.set_attribute("TYPE", "text");
        assert_eq!(el.get_attribute("type"), None);
        assert_eq!(el.get_attribute_ignore_case("type"), Some("text"));
    }
}
