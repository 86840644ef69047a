//! DOM Tree structure

use log::debug;
use rustc_hash::FxHashMap;
use std::fmt;

use crate::error::{DomError, DomResult};
use crate::node::{ElementData, Node, NodeId, NodeType};

/// Arena that owns every node parsed from (or created for) one document.
///
/// Nodes that get detached stay in the arena with no parent until
/// [`DomTree::remove_subtree`] frees them.
pub struct DomTree {
    /// All nodes in the tree
    nodes: FxHashMap<NodeId, Node>,
    /// Next available node ID
    next_id: u32,
    /// Top-level nodes produced by the parser
    roots: Vec<NodeId>,
    /// DOCTYPE name, if the source had one
    doctype: Option<String>,
    /// Declared or detected source encoding
    encoding: Option<String>,
}

impl DomTree {
    /// Create a new empty DOM tree
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            next_id: 1,
            roots: Vec::new(),
            doctype: None,
            encoding: None,
        }
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.nodes.get(&id).ok_or(DomError::NodeNotFound(id.0))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(DomError::NodeNotFound(id.0))
    }

    /// Element data for `id`, if it is an element
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| n.as_element())
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(|n| n.as_element_mut())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(id, node_type));
        id
    }

    /// Create a new element node
    pub fn create_element(&mut self, tag_name: impl Into<String>) -> NodeId {
        self.alloc(NodeType::Element(ElementData::new(tag_name)))
    }

    /// Create an element bound to a namespace URI
    pub fn create_element_ns(
        &mut self,
        tag_name: impl Into<String>,
        namespace: Option<String>,
    ) -> NodeId {
        self.alloc(NodeType::Element(ElementData::with_namespace(
            tag_name, namespace,
        )))
    }

    /// Create a new comment node
    pub fn create_comment(&mut self, content: impl Into<String>) -> NodeId {
        self.alloc(NodeType::Comment(content.into()))
    }

    /// Create a processing instruction node
    pub fn create_processing_instruction(
        &mut self,
        target: impl Into<String>,
        data: impl Into<String>,
    ) -> NodeId {
        self.alloc(NodeType::ProcessingInstruction {
            target: target.into(),
            data: data.into(),
        })
    }

    /// Top-level nodes
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Register a parentless node as a top-level node
    pub fn add_root(&mut self, id: NodeId) {
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
    }

    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    pub fn set_doctype(&mut self, name: impl Into<String>) {
        self.doctype = Some(name.into());
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn set_encoding(&mut self, encoding: impl Into<String>) {
        self.encoding = Some(encoding.into());
    }

    // ---- Navigation ----

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// All children of a node (elements, comments and PIs)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element children only
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Position of a node among its parent's children
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        idx.checked_sub(1).map(|i| self.children(parent)[i])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent)[..idx]
            .iter()
            .rev()
            .copied()
            .find(|&c| self.is_element(c))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.children(parent)[idx + 1..]
            .iter()
            .copied()
            .find(|&c| self.is_element(c))
    }

    /// Ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            result.push(p);
            current = self.parent(p);
        }
        result
    }

    /// Topmost ancestor (or the node itself)
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(p) = self.parent(current) {
            current = p;
        }
        current
    }

    /// True when `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    /// Iterate over all descendants of a node (depth-first)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_descendants(id, &mut result);
        result
    }

    fn collect_descendants(&self, id: NodeId, result: &mut Vec<NodeId>) {
        if let Some(node) = self.get(id) {
            for &child_id in &node.children {
                result.push(child_id);
                self.collect_descendants(child_id, result);
            }
        }
    }

    /// Preorder position of every node in the subtree rooted at `root`
    pub fn document_order(&self, root: NodeId) -> FxHashMap<NodeId, usize> {
        let mut order = FxHashMap::default();
        order.insert(root, 0);
        for (i, id) in self.descendants(root).into_iter().enumerate() {
            order.insert(id, i + 1);
        }
        order
    }

    // ---- Text ----

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| n.text.as_deref())
    }

    pub fn tail(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| n.tail.as_deref())
    }

    pub fn set_text(&mut self, id: NodeId, text: Option<String>) {
        if let Some(node) = self.get_mut(id) {
            node.text = text;
        }
    }

    pub fn set_tail(&mut self, id: NodeId, tail: Option<String>) {
        if let Some(node) = self.get_mut(id) {
            node.tail = tail;
        }
    }

    /// Append to a node's text, creating it when absent
    pub fn append_text(&mut self, id: NodeId, extra: &str) {
        if let Some(node) = self.get_mut(id) {
            node.text.get_or_insert_with(String::new).push_str(extra);
        }
    }

    /// Append to a node's tail, creating it when absent
    pub fn append_tail(&mut self, id: NodeId, extra: &str) {
        if let Some(node) = self.get_mut(id) {
            node.tail.get_or_insert_with(String::new).push_str(extra);
        }
    }

    /// Get the text content of a node and all its descendants
    ///
    /// Comments and processing instructions contribute only their tails.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result
    }

    fn collect_text(&self, id: NodeId, result: &mut String) {
        if let Some(node) = self.get(id) {
            if !node.is_element() {
                return;
            }
            if let Some(text) = &node.text {
                result.push_str(text);
            }
            for &child_id in &node.children {
                self.collect_text(child_id, result);
                if let Some(tail) = self.tail(child_id) {
                    result.push_str(tail);
                }
            }
        }
    }

    // ---- Mutation ----

    /// Insert `children` into `parent` starting at `index`.
    ///
    /// Each child is first detached from wherever it currently lives. The
    /// whole batch is validated before anything moves.
    pub fn insert_children(
        &mut self,
        parent: NodeId,
        index: usize,
        children: &[NodeId],
    ) -> DomResult<()> {
        self.node(parent)?;
        for &child in children {
            self.node(child)?;
            if self.is_ancestor_or_self(child, parent) {
                debug!("refusing to insert {:?} below its own descendant {:?}", child, parent);
                return Err(DomError::HierarchyCycle {
                    parent: parent.0,
                    child: child.0,
                });
            }
        }

        let mut index = index;
        for &child in children {
            if self.parent(child) == Some(parent) {
                if let Some(pos) = self.index_in_parent(child) {
                    if pos < index {
                        index -= 1;
                    }
                }
            }
            self.detach(child);

            let node = self.node_mut(parent)?;
            let at = index.min(node.children.len());
            node.children.insert(at, child);
            self.node_mut(child)?.parent = Some(parent);
            index = at + 1;
        }
        Ok(())
    }

    /// Append a child node to a parent
    pub fn append_child(&mut self, parent_id: NodeId, child_id: NodeId) -> DomResult<()> {
        let len = self.node(parent_id)?.children.len();
        self.insert_children(parent_id, len, &[child_id])
    }

    /// Append several children in order
    pub fn append_children(&mut self, parent_id: NodeId, children: &[NodeId]) -> DomResult<()> {
        let len = self.node(parent_id)?.children.len();
        self.insert_children(parent_id, len, children)
    }

    /// Unlink a node from its parent (or from the top level). Its tail
    /// stays with it.
    pub fn detach(&mut self, id: NodeId) {
        match self.parent(id) {
            Some(parent) => {
                if let Some(p) = self.get_mut(parent) {
                    p.children.retain(|c| *c != id);
                }
                if let Some(n) = self.get_mut(id) {
                    n.parent = None;
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
    }

    /// Put `new` where `old` is and detach `old`
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> DomResult<()> {
        if old == new {
            return Ok(());
        }
        let parent = self
            .parent(old)
            .ok_or_else(|| DomError::InvalidOperation("cannot replace a node without a parent".into()))?;
        self.node(new)?;
        if self.is_ancestor_or_self(new, parent) {
            return Err(DomError::HierarchyCycle {
                parent: parent.0,
                child: new.0,
            });
        }
        let index = self.index_in_parent(old).unwrap_or(0);
        self.detach(old);
        self.insert_children(parent, index, &[new])
    }

    /// Neither a child nor a top-level node
    pub fn is_detached(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id) && self.parent(id).is_none() && !self.roots.contains(&id)
    }

    /// Drop a node and everything below it from the arena, returning the
    /// number of nodes freed. Ids of freed nodes are never reused.
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        if !self.nodes.contains_key(&id) {
            return 0;
        }
        self.detach(id);
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node in &doomed {
            self.nodes.remove(node);
        }
        doomed.len()
    }

    /// Detach every child of a node
    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).to_vec();
        for child in children {
            self.detach(child);
        }
    }

    /// Deep copy a subtree (text and tail included). The copy is detached.
    pub fn deep_copy(&mut self, id: NodeId) -> DomResult<NodeId> {
        let node = self.node(id)?.clone();
        let copy = self.alloc(node.node_type);
        {
            let n = self.node_mut(copy)?;
            n.text = node.text;
            n.tail = node.tail;
        }
        for child in node.children {
            let child_copy = self.deep_copy(child)?;
            self.node_mut(child_copy)?.parent = Some(copy);
            self.node_mut(copy)?.children.push(child_copy);
        }
        Ok(copy)
    }

    /// Deep copy a subtree from another tree into this one
    pub fn import(&mut self, source: &DomTree, id: NodeId) -> DomResult<NodeId> {
        let node = source.node(id)?;
        let copy = self.alloc(node.node_type.clone());
        {
            let n = self.node_mut(copy)?;
            n.text = node.text.clone();
            n.tail = node.tail.clone();
        }
        for &child in &node.children {
            let child_copy = self.import(source, child)?;
            self.node_mut(child_copy)?.parent = Some(copy);
            self.node_mut(copy)?.children.push(child_copy);
        }
        Ok(copy)
    }

    /// Get the number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pretty print the tree for debugging
    pub fn pretty_print(&self) -> String {
        let mut output = String::new();
        for &root in &self.roots {
            self.print_node(root, 0, &mut output);
        }
        output
    }

    fn print_node(&self, id: NodeId, depth: usize, output: &mut String) {
        let indent = "  ".repeat(depth);

        if let Some(node) = self.get(id) {
            match &node.node_type {
                NodeType::Element(elem) => {
                    output.push_str(&format!("{}<{}>", indent, elem.tag_name));
                    if let Some(text) = node.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                        output.push_str(&format!(" {:?}", text));
                    }
                    output.push('\n');
                }
                NodeType::Comment(text) => {
                    output.push_str(&format!("{}<!-- {} -->\n", indent, text));
                }
                NodeType::ProcessingInstruction { target, .. } => {
                    output.push_str(&format!("{}<?{}?>\n", indent, target));
                }
            }

            for &child_id in &node.children {
                self.print_node(child_id, depth + 1, output);
            }
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DomTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pretty_print())
    }
}
