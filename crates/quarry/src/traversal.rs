//! Tree navigation relative to the current elements
//!
//! Every method returns elements only, without duplicates, and keeps those
//! matching the optional `selector`.

use quarry_dom::{DomTree, NodeId};
use quarry_select::Axis;

use crate::document::NodeRef;
use crate::error::Result;
use crate::selection::Selection;

impl Selection {
    /// Collect `step(tree, id)` for every element, in selection order
    fn gather(&self, step: impl Fn(&DomTree, NodeId) -> Vec<NodeId>) -> Vec<NodeRef> {
        let mut out = Vec::new();
        for node in self.iter() {
            let tree = node.document().borrow();
            out.extend(step(&*tree, node.id()).into_iter().map(|id| node.sibling_ref(id)));
        }
        out
    }

    pub fn parent(&self, selector: Option<&str>) -> Result<Selection> {
        let parents = self.gather(|tree, id| tree.parent(id).into_iter().collect());
        self.filter_only(selector, parents, false, true)
    }

    /// Every ancestor, outermost first
    pub fn parents(&self, selector: Option<&str>) -> Result<Selection> {
        let ancestors = self.gather(|tree, id| {
            let mut chain = tree.ancestors(id);
            chain.reverse();
            chain
        });
        self.filter_only(selector, ancestors, false, true)
    }

    pub fn children(&self, selector: Option<&str>) -> Result<Selection> {
        let children = self.gather(|tree, id| tree.element_children(id));
        self.filter_only(selector, children, false, true)
    }

    pub fn next(&self, selector: Option<&str>) -> Result<Selection> {
        let next = self.gather(|tree, id| tree.next_element_sibling(id).into_iter().collect());
        self.filter_only(selector, next, false, true)
    }

    pub fn prev(&self, selector: Option<&str>) -> Result<Selection> {
        let prev = self.gather(|tree, id| tree.previous_element_sibling(id).into_iter().collect());
        self.filter_only(selector, prev, false, true)
    }

    pub fn next_all(&self, selector: Option<&str>) -> Result<Selection> {
        let following = self.gather(following_siblings);
        self.filter_only(selector, following, false, true)
    }

    /// Preceding siblings; the collected list is reversed as a whole
    pub fn prev_all(&self, selector: Option<&str>) -> Result<Selection> {
        let preceding = self.gather(preceding_siblings);
        self.filter_only(selector, preceding, true, true)
    }

    pub fn siblings(&self, selector: Option<&str>) -> Result<Selection> {
        let mut preceding = self.gather(preceding_siblings);
        preceding.reverse();
        preceding.extend(self.gather(following_siblings));
        self.filter_only(selector, preceding, false, true)
    }

    /// Nearest element matching `selector`, starting from each element itself
    pub fn closest(&self, selector: &str) -> Result<Selection> {
        let query = self.compile(selector)?;
        let mut found = Vec::new();
        for node in self.iter() {
            let chain = {
                let tree = node.document().borrow();
                let mut chain = vec![node.id()];
                chain.extend(tree.ancestors(node.id()));
                chain
            };
            let hit = chain.into_iter().map(|id| node.sibling_ref(id)).find(|candidate| {
                !Self::run(std::slice::from_ref(candidate), &query, Axis::SelfOnly).is_empty()
            });
            found.extend(hit);
        }
        self.filter_only(None, found, false, true)
    }

    /// Following siblings up to the first one matching `selector`
    pub fn next_until(&self, selector: &str, filter: Option<&str>) -> Result<Selection> {
        let query = self.compile(selector)?;
        let mut collected = Vec::new();
        for node in self.iter() {
            let following: Vec<NodeRef> = {
                let tree = node.document().borrow();
                following_siblings(&tree, node.id())
                    .into_iter()
                    .map(|id| node.sibling_ref(id))
                    .collect()
            };
            for sibling in following {
                if !Self::run(std::slice::from_ref(&sibling), &query, Axis::SelfOnly).is_empty() {
                    break;
                }
                collected.push(sibling);
            }
        }
        self.filter_only(filter, collected, false, true)
    }
}

fn following_siblings(tree: &DomTree, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = tree.next_element_sibling(id);
    while let Some(next) = current {
        out.push(next);
        current = tree.next_element_sibling(next);
    }
    out
}

/// Nearest first
fn preceding_siblings(tree: &DomTree, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = tree.previous_element_sibling(id);
    while let Some(prev) = current {
        out.push(prev);
        current = tree.previous_element_sibling(prev);
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::{Quarry, Selection};

    const LIST: &str = "<div id=\"top\"><ul class=\"menu\"><li>1</li><!-- c --><li class=\"x\">2</li>\
                        <li>3</li><li class=\"x\">4</li><li>5</li></ul></div>";

    fn doc() -> Selection {
        Quarry::new().parse(LIST).unwrap()
    }

    fn texts(sel: &Selection) -> Vec<String> {
        sel.items().iter().map(Selection::text).collect()
    }

    #[test]
    fn test_parent_and_parents() {
        let d = doc();
        let li = d.query("li").unwrap();
        let parent = li.parent(None).unwrap();
        assert_eq!(parent.len(), 1);
        assert!(parent.has_class("menu"));

        let parents = li.parents(None).unwrap();
        assert_eq!(parents.len(), 2);
        assert_eq!(parents.first().unwrap().attr("id").as_deref(), Some("top"));
        assert_eq!(li.parents(Some("ul")).unwrap().len(), 1);
        assert!(d.parent(None).unwrap().is_empty());
    }

    #[test]
    fn test_children() {
        let d = doc();
        let ul = d.query("ul").unwrap();
        assert_eq!(ul.children(None).unwrap().len(), 5);
        assert_eq!(texts(&ul.children(Some(".x")).unwrap()), vec!["2", "4"]);
    }

    #[test]
    fn test_next_and_prev_skip_comments() {
        let d = doc();
        let first = d.query("li:first").unwrap();
        assert_eq!(first.next(None).unwrap().text(), "2");
        let second = d.query("li.x:first").unwrap();
        assert_eq!(second.prev(None).unwrap().text(), "1");
        assert!(first.prev(None).unwrap().is_empty());
    }

    #[test]
    fn test_next_all_and_prev_all() {
        let d = doc();
        let third = d.query("li:eq(2)").unwrap();
        assert_eq!(texts(&third.next_all(None).unwrap()), vec!["4", "5"]);
        assert_eq!(texts(&third.prev_all(None).unwrap()), vec!["1", "2"]);
        assert_eq!(texts(&third.prev_all(Some(".x")).unwrap()), vec!["2"]);
    }

    #[test]
    fn test_siblings() {
        let d = doc();
        let third = d.query("li:eq(2)").unwrap();
        assert_eq!(texts(&third.siblings(None).unwrap()), vec!["1", "2", "4", "5"]);
        assert_eq!(texts(&third.siblings(Some(".x")).unwrap()), vec!["2", "4"]);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let d = doc();
        let xs = d.query("li.x").unwrap();
        assert_eq!(texts(&xs.next_all(None).unwrap()), vec!["3", "4", "5"]);
    }

    #[test]
    fn test_closest() {
        let d = doc();
        let li = d.query("li").unwrap();
        assert_eq!(li.closest("ul").unwrap().len(), 1);
        assert_eq!(li.closest("li").unwrap().len(), 5);
        assert!(li.closest("table").unwrap().is_empty());
    }

    #[test]
    fn test_next_until() {
        let d = doc();
        let first = d.query("li:first").unwrap();
        assert!(first.next_until(".x", None).unwrap().is_empty());
        let second = d.query("li.x:first").unwrap();
        assert_eq!(texts(&second.next_until(".x", None).unwrap()), vec!["3"]);
        let last_x = d.query("li.x:last").unwrap();
        assert_eq!(texts(&last_x.next_until("p", None).unwrap()), vec!["5"]);
    }
}
