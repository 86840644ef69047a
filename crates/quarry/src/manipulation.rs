//! Structural edits
//!
//! Text lives on the elements: `text` before the first child and `tail`
//! after the end tag. Every edit here moves those strings along with the
//! nodes so the serialized document keeps all of its text.

use log::debug;
use quarry_dom::{DomError, DomTree, NodeId};
use quarry_html::ParserMode;

use crate::document::{Document, NodeRef};
use crate::error::{Error, Result};
use crate::selection::{parse_document, Callback, Selection};

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Anything that can be inserted into a document
#[derive(Debug, Clone)]
pub enum Content {
    /// Markup, parsed with the selection's parser
    Markup(String),
    Node(NodeRef),
    Selection(Selection),
}

impl From<&str> for Content {
    fn from(markup: &str) -> Self {
        Content::Markup(markup.to_string())
    }
}

impl From<String> for Content {
    fn from(markup: String) -> Self {
        Content::Markup(markup)
    }
}

impl From<NodeRef> for Content {
    fn from(node: NodeRef) -> Self {
        Content::Node(node)
    }
}

impl From<&NodeRef> for Content {
    fn from(node: &NodeRef) -> Self {
        Content::Node(node.clone())
    }
}

impl From<Selection> for Content {
    fn from(selection: Selection) -> Self {
        Content::Selection(selection)
    }
}

impl From<&Selection> for Content {
    fn from(selection: &Selection) -> Self {
        Content::Selection(selection.clone())
    }
}

/// Content ready for insertion: its nodes plus the text that goes before them
pub(crate) struct Materialized {
    pub nodes: Vec<NodeRef>,
    pub leading: String,
}

/// Nodes to insert at one target, already living in the target's document
struct Batch {
    target: NodeRef,
    nodes: Vec<NodeId>,
}

/// Where new nodes end up relative to a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Inside,
    Beside,
}

fn insertion_parent(tree: &DomTree, target: NodeId, anchor: Anchor) -> Option<NodeId> {
    match anchor {
        Anchor::Inside => Some(target),
        Anchor::Beside => tree.parent(target),
    }
}

/// Deep copy of `node` owned by `doc`, detached
pub(crate) fn copy_into(doc: &Document, node: &NodeRef) -> Result<NodeId> {
    if node.document().ptr_eq(doc) {
        Ok(doc.borrow_mut().deep_copy(node.id())?)
    } else {
        let source = node.document().borrow();
        Ok(doc.borrow_mut().import(&source, node.id())?)
    }
}

/// Last element child, repeatedly
fn deepest_last(tree: &DomTree, id: NodeId) -> NodeId {
    let mut current = id;
    while let Some(&last) = tree.element_children(current).last() {
        current = last;
    }
    current
}

/// Validate the edit, then bring the content into every target's document
///
/// The first target receives the content itself. Content from another
/// document is imported and then detached from its source. Every other
/// target receives deep copies taken before anything moves.
fn prepare(op: &str, targets: &[NodeRef], content: &Materialized, anchor: Anchor) -> Result<Vec<Batch>> {
    for target in targets {
        let tree = target.document().borrow();
        if insertion_parent(&tree, target.id(), anchor).is_none() {
            return Err(DomError::InvalidOperation(format!("{}: target has no parent", op)).into());
        }
    }

    let Some(first) = targets.first() else {
        return Ok(Vec::new());
    };
    {
        let tree = first.document().borrow();
        if let Some(parent) = insertion_parent(&tree, first.id(), anchor) {
            for node in content.nodes.iter().filter(|n| n.same_document(first)) {
                if tree.is_ancestor_or_self(node.id(), parent) {
                    return Err(DomError::HierarchyCycle {
                        parent: parent.0,
                        child: node.id().0,
                    }
                    .into());
                }
            }
        }
    }

    let mut batches = Vec::with_capacity(targets.len());
    let mut copies = Vec::with_capacity(targets.len().saturating_sub(1));
    for target in &targets[1..] {
        let nodes = content
            .nodes
            .iter()
            .map(|n| copy_into(target.document(), n))
            .collect::<Result<Vec<_>>>()?;
        copies.push(Batch {
            target: target.clone(),
            nodes,
        });
    }

    let mut moved = Vec::with_capacity(content.nodes.len());
    for node in &content.nodes {
        if node.same_document(first) {
            moved.push(node.id());
        } else {
            moved.push(copy_into(first.document(), node)?);
            node.document().borrow_mut().detach(node.id());
        }
    }
    batches.push(Batch {
        target: first.clone(),
        nodes: moved,
    });
    batches.extend(copies);
    Ok(batches)
}

fn find_root_element(nodes: &[NodeRef]) -> Option<NodeRef> {
    for node in nodes {
        let tree = node.document().borrow();
        let found = std::iter::once(node.id())
            .chain(tree.descendants(node.id()))
            .find(|&id| tree.element(id).map(|e| e.tag_name == "root").unwrap_or(false));
        if let Some(id) = found {
            return Some(node.sibling_ref(id));
        }
    }
    None
}

/// Text before `target`: the previous sibling's tail or the parent's text
fn append_before(tree: &mut DomTree, target: NodeId, parent: NodeId, text: &str) {
    if text.is_empty() {
        return;
    }
    match tree.previous_sibling(target) {
        Some(prev) => tree.append_tail(prev, text),
        None => tree.append_text(parent, text),
    }
}

fn insert_before(tree: &mut DomTree, target: NodeId, leading: &str, nodes: &[NodeId]) -> Result<()> {
    let parent = tree
        .parent(target)
        .ok_or_else(|| DomError::InvalidOperation("before: target has no parent".into()))?;
    append_before(tree, target, parent, leading);
    let index = tree.index_in_parent(target).unwrap_or(0);
    tree.insert_children(parent, index, nodes)?;
    Ok(())
}

impl Selection {
    pub(crate) fn materialize(&self, value: &Content) -> Result<Materialized> {
        match value {
            Content::Markup(markup) => {
                let roots = self.parse_fragment(&format!("<root>{}</root>", markup))?;
                let root = find_root_element(&roots)
                    .ok_or_else(|| Error::Construction(format!("cannot parse {:?}", markup)))?;
                let mut tree = root.document().borrow_mut();
                let leading = tree.text(root.id()).unwrap_or_default().to_string();
                let children = tree.children(root.id()).to_vec();
                for &child in &children {
                    tree.detach(child);
                }
                Ok(Materialized {
                    nodes: children.into_iter().map(|c| root.sibling_ref(c)).collect(),
                    leading,
                })
            }
            Content::Node(node) => Ok(Materialized {
                nodes: vec![node.clone()],
                leading: String::new(),
            }),
            Content::Selection(selection) => Ok(Materialized {
                nodes: selection.nodes().to_vec(),
                leading: String::new(),
            }),
        }
    }

    /// Insert content after the last child of every element
    pub fn append(&self, value: impl Into<Content>) -> Result<&Self> {
        let content = self.materialize(&value.into())?;
        for batch in prepare("append", self.nodes(), &content, Anchor::Inside)? {
            let mut tree = batch.target.document().borrow_mut();
            let target = batch.target.id();
            if !content.leading.is_empty() {
                match tree.children(target).last().copied() {
                    Some(last) => tree.append_tail(last, &content.leading),
                    None => tree.append_text(target, &content.leading),
                }
            }
            tree.append_children(target, &batch.nodes)?;
        }
        Ok(self)
    }

    /// Insert content before the first child of every element
    pub fn prepend(&self, value: impl Into<Content>) -> Result<&Self> {
        let content = self.materialize(&value.into())?;
        for batch in prepare("prepend", self.nodes(), &content, Anchor::Inside)? {
            let mut tree = batch.target.document().borrow_mut();
            let target = batch.target.id();
            let old = tree.text(target).unwrap_or_default().to_string();
            match batch.nodes.last() {
                Some(&last) => {
                    if !old.is_empty() {
                        tree.append_tail(last, &old);
                    }
                    tree.set_text(target, non_empty(content.leading.clone()));
                }
                None => tree.set_text(target, non_empty(format!("{}{}", content.leading, old))),
            }
            tree.insert_children(target, 0, &batch.nodes)?;
        }
        Ok(self)
    }

    /// Insert content right after every element
    pub fn after(&self, value: impl Into<Content>) -> Result<&Self> {
        let content = self.materialize(&value.into())?;
        for batch in prepare("after", self.nodes(), &content, Anchor::Beside)? {
            let mut tree = batch.target.document().borrow_mut();
            let target = batch.target.id();
            if !content.leading.is_empty() {
                tree.append_tail(target, &content.leading);
            }
            let parent = tree
                .parent(target)
                .ok_or_else(|| DomError::InvalidOperation("after: target has no parent".into()))?;
            let index = tree.index_in_parent(target).map(|i| i + 1).unwrap_or(0);
            tree.insert_children(parent, index, &batch.nodes)?;
        }
        Ok(self)
    }

    /// Insert content right before every element
    pub fn before(&self, value: impl Into<Content>) -> Result<&Self> {
        let content = self.materialize(&value.into())?;
        for batch in prepare("before", self.nodes(), &content, Anchor::Beside)? {
            let mut tree = batch.target.document().borrow_mut();
            insert_before(&mut tree, batch.target.id(), &content.leading, &batch.nodes)?;
        }
        Ok(self)
    }

    pub fn append_to(&self, target: &Selection) -> Result<&Self> {
        target.append(self)?;
        Ok(self)
    }

    pub fn prepend_to(&self, target: &Selection) -> Result<&Self> {
        target.prepend(self)?;
        Ok(self)
    }

    pub fn insert_after(&self, target: &Selection) -> Result<&Self> {
        target.after(self)?;
        Ok(self)
    }

    pub fn insert_before(&self, target: &Selection) -> Result<&Self> {
        target.before(self)?;
        Ok(self)
    }

    /// Wrap every element in its own copy of `markup`
    ///
    /// The element goes into the wrapper's deepest last element and the
    /// selection then holds the wrappers.
    pub fn wrap(&mut self, markup: &str) -> Result<&mut Self> {
        let template = wrapper_template(markup)?;
        let mut wrappers = Vec::with_capacity(self.len());
        for target in self.nodes().to_vec() {
            let doc = target.document().clone();
            let wrapper = copy_into(&doc, &template)?;
            let mut tree = doc.borrow_mut();
            let id = target.id();
            let inner = deepest_last(&tree, wrapper);
            let top_level = tree.roots().contains(&id);

            if tree.parent(id).is_some() {
                let tail = tree.tail(id).map(str::to_string);
                tree.replace(id, wrapper)?;
                tree.set_tail(wrapper, tail);
                tree.set_tail(id, None);
            }
            tree.append_child(inner, id)?;
            if top_level {
                tree.add_root(wrapper);
            }
            wrappers.push(doc.node(wrapper));
        }
        self.set_nodes(wrappers);
        Ok(self)
    }

    /// Wrap all elements together in one copy of `markup`
    ///
    /// The wrapper takes the elements' place only when they are exactly the
    /// children of one parent. Otherwise it receives copies and stays
    /// detached, leaving the document as it was.
    pub fn wrap_all(&mut self, markup: &str) -> Result<&mut Self> {
        let Some(first) = self.first().cloned() else {
            return Ok(self);
        };
        let template = wrapper_template(markup)?;
        let doc = first.document().clone();
        let wrapper = copy_into(&doc, &template)?;

        let shared_parent = {
            let tree = doc.borrow();
            let parent = tree.parent(first.id());
            parent.filter(|&p| {
                self.iter()
                    .all(|n| n.same_document(&first) && tree.parent(n.id()) == Some(p))
                    && tree.children(p).len() == self.len()
            })
        };

        match shared_parent {
            Some(parent) => {
                let mut tree = doc.borrow_mut();
                let inner = deepest_last(&tree, wrapper);
                let index = tree.index_in_parent(first.id()).unwrap_or(0);
                let ids: Vec<NodeId> = self.iter().map(NodeRef::id).collect();
                tree.append_children(inner, &ids)?;
                tree.insert_children(parent, index, &[wrapper])?;
            }
            None => {
                debug!("wrap_all: elements do not share a parent, wrapper left detached");
                let inner = deepest_last(&doc.borrow(), wrapper);
                for node in self.nodes().to_vec() {
                    let copy = copy_into(&doc, &node)?;
                    doc.borrow_mut().append_child(inner, copy)?;
                }
            }
        }
        self.set_nodes(vec![doc.node(wrapper)]);
        Ok(self)
    }

    /// Put `value` where every element is, keeping the element's tail
    pub fn replace_with(&self, value: impl Into<Content>) -> Result<&Self> {
        let content = self.materialize(&value.into())?;
        for batch in prepare("replace_with", self.nodes(), &content, Anchor::Beside)? {
            replace_one(&batch, &content.leading)?;
        }
        Ok(self)
    }

    /// Like [`replace_with`](Self::replace_with) with content computed per element
    pub fn replace_with_fn(&self, mut f: Callback<'_, Content>) -> Result<&Self> {
        let mut planned = Vec::with_capacity(self.len());
        for (i, node) in self.iter().enumerate() {
            let item = self.sibling(vec![node.clone()]);
            let content = self.materialize(&f.call(i, &item))?;
            let mut batches = prepare("replace_with", std::slice::from_ref(node), &content, Anchor::Beside)?;
            if let Some(batch) = batches.pop() {
                planned.push((batch, content));
            }
        }
        for (batch, content) in &planned {
            replace_one(batch, &content.leading)?;
        }
        Ok(self)
    }

    /// Replace every element matched by `selector` in the parent selection with this one
    pub fn replace_all(&self, selector: &str) -> Result<&Self> {
        let parent = self.parent_selection().ok_or(Error::MissingParent("replace_all"))?;
        parent.query(selector)?.replace_with(self)?;
        Ok(self)
    }

    /// Drop the text and every child of each element
    pub fn empty(&self) -> &Self {
        for node in self.iter() {
            let discarded = {
                let mut tree = node.document().borrow_mut();
                let children = tree.children(node.id()).to_vec();
                tree.set_text(node.id(), None);
                tree.clear_children(node.id());
                children
            };
            node.document().release(discarded);
        }
        self
    }

    /// Detach every element, leaving its tail text in the document
    pub fn remove(&self) -> &Self {
        for node in self.iter() {
            let mut tree = node.document().borrow_mut();
            let id = node.id();
            let Some(parent) = tree.parent(id) else {
                continue;
            };
            if let Some(tail) = tree.tail(id).map(str::to_string) {
                append_before(&mut tree, id, parent, &tail);
            }
            tree.detach(id);
            tree.set_tail(id, None);
        }
        self
    }

    /// Remove the elements `selector` matches below and including the current ones
    pub fn remove_matching(&self, selector: &str) -> Result<&Self> {
        self.query(selector)?.remove();
        Ok(self)
    }

    /// Detached deep copies of every element
    pub fn deep_clone(&self) -> Result<Selection> {
        let mut copies = Vec::with_capacity(self.len());
        for node in self.iter() {
            let copy = node.document().borrow_mut().deep_copy(node.id())?;
            copies.push(node.sibling_ref(copy));
        }
        Ok(self.sibling(copies))
    }

    /// Drop the XHTML namespace from every element of the document
    pub fn xhtml_to_html(&self) -> &Self {
        self.strip_namespaces(Some(XHTML_NAMESPACE))
    }

    /// Drop every namespace from every element of the document
    pub fn remove_namespaces(&self) -> &Self {
        self.strip_namespaces(None)
    }

    fn strip_namespaces(&self, only: Option<&str>) -> &Self {
        let Some(first) = self.first() else {
            return self;
        };
        let mut tree = first.document().borrow_mut();
        let top = tree.root_of(first.id());
        let ids: Vec<NodeId> = std::iter::once(top).chain(tree.descendants(top)).collect();
        for id in ids {
            let Some(el) = tree.element_mut(id) else {
                continue;
            };
            let strip = match (&el.namespace, only) {
                (Some(ns), Some(uri)) => ns == uri,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if strip {
                el.tag_name = el.local_name().to_string();
                el.namespace = None;
            }
            el.attributes.retain(|attr| {
                let declaration = attr.0 == "xmlns" || attr.0.starts_with("xmlns:");
                !(declaration && only.map_or(true, |uri| attr.1 == uri))
            });
        }
        self
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn wrapper_template(markup: &str) -> Result<NodeRef> {
    parse_document(markup, ParserMode::Auto)?
        .into_iter()
        .find(NodeRef::is_element)
        .ok_or_else(|| Error::Construction(format!("no wrapper element in {:?}", markup)))
}

fn replace_one(batch: &Batch, leading: &str) -> Result<()> {
    let mut tree = batch.target.document().borrow_mut();
    let target = batch.target.id();
    let mut leading = leading.to_string();
    if let Some(tail) = tree.tail(target).map(str::to_string) {
        match batch.nodes.last() {
            Some(&last) => tree.append_tail(last, &tail),
            None => leading.push_str(&tail),
        }
    }
    insert_before(&mut tree, target, &leading, &batch.nodes)?;
    tree.detach(target);
    tree.set_tail(target, None);
    Ok(())
}
