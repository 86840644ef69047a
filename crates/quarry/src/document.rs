//! Shared document handles

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use log::trace;
use rustc_hash::FxHashMap;

use quarry_dom::{DomTree, NodeId};

#[derive(Default)]
struct Shared {
    tree: RefCell<DomTree>,
    /// Live [`NodeRef`]s per node
    handles: RefCell<FxHashMap<NodeId, usize>>,
}

/// A parsed document. Cloning shares the same tree.
///
/// A detached subtree is freed once no [`NodeRef`] points into it.
#[derive(Clone, Default)]
pub struct Document(Rc<Shared>);

impl Document {
    pub fn new(tree: DomTree) -> Self {
        Self(Rc::new(Shared {
            tree: RefCell::new(tree),
            handles: RefCell::default(),
        }))
    }

    pub fn borrow(&self) -> Ref<'_, DomTree> {
        self.0.tree.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, DomTree> {
        self.0.tree.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Top-level nodes the parser produced
    pub fn roots(&self) -> Vec<NodeRef> {
        let tree = self.borrow();
        tree.roots().iter().map(|&id| NodeRef::new(self.clone(), id)).collect()
    }

    pub(crate) fn node(&self, id: NodeId) -> NodeRef {
        NodeRef::new(self.clone(), id)
    }

    /// Number of live handles to `id`
    pub fn handle_count(&self, id: NodeId) -> usize {
        self.0.handles.borrow().get(&id).copied().unwrap_or(0)
    }

    fn retain(&self, id: NodeId) {
        *self.0.handles.borrow_mut().entry(id).or_insert(0) += 1;
    }

    /// Returns true when the last handle to `id` went away
    fn forget(&self, id: NodeId) -> bool {
        let Ok(mut handles) = self.0.handles.try_borrow_mut() else {
            return false;
        };
        match handles.get_mut(&id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                handles.remove(&id);
                true
            }
            None => false,
        }
    }

    /// Free the detached subtrees holding `ids` that no handle reaches
    ///
    /// Skipped while the tree is borrowed.
    pub(crate) fn release(&self, ids: impl IntoIterator<Item = NodeId>) {
        let Ok(mut tree) = self.0.tree.try_borrow_mut() else {
            return;
        };
        let Ok(handles) = self.0.handles.try_borrow() else {
            return;
        };
        for id in ids {
            if tree.get(id).is_none() {
                continue;
            }
            let top = tree.root_of(id);
            if !tree.is_detached(top) {
                continue;
            }
            let referenced = std::iter::once(top)
                .chain(tree.descendants(top))
                .any(|n| handles.contains_key(&n));
            if !referenced {
                let freed = tree.remove_subtree(top);
                trace!("freed {} detached nodes", freed);
            }
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Document({:p})", Rc::as_ptr(&self.0))
    }
}

/// A node inside a [`Document`]
///
/// Two references are equal when they point at the same node of the same
/// document.
pub struct NodeRef {
    doc: Document,
    id: NodeId,
}

impl NodeRef {
    pub fn new(doc: Document, id: NodeId) -> Self {
        doc.retain(id);
        Self { doc, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn tag_name(&self) -> Option<String> {
        self.doc.borrow().element(self.id).map(|e| e.tag_name.clone())
    }

    pub fn is_element(&self) -> bool {
        self.doc.borrow().is_element(self.id)
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.doc
            .borrow()
            .element(self.id)
            .and_then(|e| e.get_attribute(name))
            .map(str::to_string)
    }

    pub fn text(&self) -> Option<String> {
        self.doc.borrow().text(self.id).map(str::to_string)
    }

    pub fn tail(&self) -> Option<String> {
        self.doc.borrow().tail(self.id).map(str::to_string)
    }

    pub fn parent(&self) -> Option<NodeRef> {
        let parent = self.doc.borrow().parent(self.id)?;
        Some(self.sibling_ref(parent))
    }

    /// Another node of the same document
    pub(crate) fn sibling_ref(&self, id: NodeId) -> NodeRef {
        NodeRef::new(self.doc.clone(), id)
    }

    pub(crate) fn same_document(&self, other: &NodeRef) -> bool {
        self.doc.ptr_eq(&other.doc)
    }
}

impl Clone for NodeRef {
    fn clone(&self) -> Self {
        NodeRef::new(self.doc.clone(), self.id)
    }
}

impl Drop for NodeRef {
    fn drop(&mut self) {
        if self.doc.forget(self.id) {
            self.doc.release([self.id]);
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.same_document(other)
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.doc.0).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.doc.borrow();
        match tree.element(self.id) {
            Some(el) => {
                write!(f, "<{}", el.tag_name)?;
                if let Some(id) = el.id() {
                    write!(f, "#{}", id)?;
                }
                for class in el.classes() {
                    write!(f, ".{}", class)?;
                }
                write!(f, ">")
            }
            None => write!(f, "<{}>", self.id),
        }
    }
}
