//! Query Execution
//!
//! Runs a compiled [`Query`] against a tree. Forward evaluation walks the
//! steps left to right the way an XPath location path does: each step is
//! applied to every node produced by the previous one, and post-conditions
//! see positions among the candidates of a single context node. Self
//! matching walks right to left from the node under test.

use log::trace;
use rustc_hash::FxHashMap;

use quarry_css::{Chain, Combinator, PostCondition, Query, Step};
use quarry_dom::{DomTree, NodeId};

use crate::matching::matches_conditions;

/// Where the first step looks for candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// The context element and everything below it
    DescendantOrSelf,
    /// Everything below the context element
    Descendant,
    /// The context element only
    SelfOnly,
}

/// Run `query` from `context`, returning matches in document order without duplicates
pub fn select(tree: &DomTree, context: NodeId, query: &Query, axis: Axis) -> Vec<NodeId> {
    if !tree.is_element(context) {
        return Vec::new();
    }
    if axis == Axis::SelfOnly {
        return if matches(tree, context, query) { vec![context] } else { Vec::new() };
    }

    let order = tree.document_order(tree.root_of(context));
    let mut results = Vec::new();
    for chain in &query.chains {
        results.extend(select_chain(tree, context, chain, axis, query.case_sensitive, &order));
    }
    sort_unique(&mut results, &order);
    trace!("{} matches below {:?}", results.len(), context);
    results
}

/// Does `element_id` match any alternative of `query`?
pub fn matches(tree: &DomTree, element_id: NodeId, query: &Query) -> bool {
    tree.is_element(element_id)
        && query
            .chains
            .iter()
            .any(|chain| matches_chain(tree, element_id, &chain.steps, query.case_sensitive))
}

fn select_chain(
    tree: &DomTree,
    context: NodeId,
    chain: &Chain,
    axis: Axis,
    case_sensitive: bool,
    order: &FxHashMap<NodeId, usize>,
) -> Vec<NodeId> {
    let mut current = vec![context];

    for (i, step) in chain.steps.iter().enumerate() {
        let mut next = Vec::new();
        for &node in &current {
            let candidates = if i == 0 {
                axis_candidates(tree, node, axis)
            } else {
                combinator_candidates(tree, node, step.combinator.unwrap_or(Combinator::Descendant))
            };
            let candidates: Vec<NodeId> = candidates
                .into_iter()
                .filter(|&c| matches_conditions(tree, c, &step.conditions, case_sensitive))
                .collect();
            next.extend(apply_post_conditions(tree, candidates, &step.post_conditions));
        }
        sort_unique(&mut next, order);
        if next.is_empty() {
            return next;
        }
        current = next;
    }

    current
}

fn element_descendants(tree: &DomTree, node: NodeId) -> Vec<NodeId> {
    tree.descendants(node)
        .into_iter()
        .filter(|&id| tree.is_element(id))
        .collect()
}

fn axis_candidates(tree: &DomTree, node: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::DescendantOrSelf => {
            let mut nodes = vec![node];
            nodes.extend(element_descendants(tree, node));
            nodes
        }
        Axis::Descendant => element_descendants(tree, node),
        Axis::SelfOnly => vec![node],
    }
}

fn combinator_candidates(tree: &DomTree, node: NodeId, combinator: Combinator) -> Vec<NodeId> {
    match combinator {
        Combinator::Descendant => element_descendants(tree, node),
        Combinator::Child => tree.element_children(node),
        Combinator::NextSibling => tree.next_element_sibling(node).into_iter().collect(),
        Combinator::SubsequentSibling => {
            let mut siblings = Vec::new();
            let mut current = tree.next_element_sibling(node);
            while let Some(id) = current {
                siblings.push(id);
                current = tree.next_element_sibling(id);
            }
            siblings
        }
    }
}

/// Keep candidates whose 1-based position satisfies every post-condition
fn apply_post_conditions(tree: &DomTree, candidates: Vec<NodeId>, post: &[PostCondition]) -> Vec<NodeId> {
    if post.is_empty() {
        return candidates;
    }
    let count = candidates.len();
    candidates
        .into_iter()
        .enumerate()
        .filter(|&(i, id)| post.iter().all(|c| post_condition_holds(tree, id, c, i + 1, count)))
        .map(|(_, id)| id)
        .collect()
}

fn post_condition_holds(
    tree: &DomTree,
    id: NodeId,
    condition: &PostCondition,
    position: usize,
    count: usize,
) -> bool {
    if let Some(result) = condition.holds_at(position, count) {
        return result;
    }
    match condition {
        PostCondition::Contains(text) => tree.text_content(id).contains(text.as_str()),
        PostCondition::Has(query) => !select(tree, id, query, Axis::Descendant).is_empty(),
        _ => false,
    }
}

/// Match a compound step on its own; positions count as 1 of 1
fn matches_step(tree: &DomTree, id: NodeId, step: &Step, case_sensitive: bool) -> bool {
    matches_conditions(tree, id, &step.conditions, case_sensitive)
        && step
            .post_conditions
            .iter()
            .all(|c| post_condition_holds(tree, id, c, 1, 1))
}

/// Right-to-left match with backtracking over ancestors and siblings
fn matches_chain(tree: &DomTree, id: NodeId, steps: &[Step], case_sensitive: bool) -> bool {
    let Some((last, rest)) = steps.split_last() else {
        return false;
    };
    if !matches_step(tree, id, last, case_sensitive) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }

    match last.combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Descendant => tree
            .ancestors(id)
            .into_iter()
            .filter(|&a| tree.is_element(a))
            .any(|a| matches_chain(tree, a, rest, case_sensitive)),
        Combinator::Child => tree
            .parent(id)
            .is_some_and(|p| tree.is_element(p) && matches_chain(tree, p, rest, case_sensitive)),
        Combinator::NextSibling => tree
            .previous_element_sibling(id)
            .is_some_and(|s| matches_chain(tree, s, rest, case_sensitive)),
        Combinator::SubsequentSibling => {
            let mut current = tree.previous_element_sibling(id);
            while let Some(s) = current {
                if matches_chain(tree, s, rest, case_sensitive) {
                    return true;
                }
                current = tree.previous_element_sibling(s);
            }
            false
        }
    }
}

fn sort_unique(nodes: &mut Vec<NodeId>, order: &FxHashMap<NodeId, usize>) {
    nodes.sort_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));
    nodes.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_css::{Namespaces, Translator};
    use quarry_html::{HtmlParser, ParserMode};

    fn parse(mode: ParserMode, input: &str) -> (DomTree, NodeId) {
        let tree = HtmlParser::new(mode).parse(input).unwrap();
        let root = tree.roots()[0];
        (tree, root)
    }

    fn texts(tree: &DomTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| tree.text_content(id)).collect()
    }

    fn run(tree: &DomTree, root: NodeId, selector: &str) -> Vec<String> {
        let query = Query::parse(selector).unwrap();
        texts(tree, &select(tree, root, &query, Axis::DescendantOrSelf))
    }

    const PAGE: &str = "<div id=\"main\"><p class=\"a\">one</p><p>two <b>bold</b></p>\
                        <span>three</span><p class=\"a\">four</p></div>";

    #[test]
    fn test_descendant_or_self() {
        let (tree, root) = parse(ParserMode::Html, PAGE);
        assert_eq!(run(&tree, root, "p"), vec!["one", "two bold", "four"]);
        assert_eq!(run(&tree, root, "#main").len(), 1);
        assert_eq!(run(&tree, root, "p.a"), vec!["one", "four"]);
    }

    #[test]
    fn test_descendant_axis_excludes_context() {
        let (tree, root) = parse(ParserMode::Html, PAGE);
        let query = Query::parse("div, p").unwrap();
        assert_eq!(select(&tree, root, &query, Axis::Descendant).len(), 3);
    }

    #[test]
    fn test_positional_post_conditions() {
        let (tree, root) = parse(ParserMode::Html, PAGE);
        assert_eq!(run(&tree, root, "p:first"), vec!["one"]);
        assert_eq!(run(&tree, root, "p:last"), vec!["four"]);
        assert_eq!(run(&tree, root, "p:even"), vec!["one", "four"]);
        assert_eq!(run(&tree, root, "p:odd"), vec!["two bold"]);
        assert_eq!(run(&tree, root, "p:eq(1)"), vec!["two bold"]);
        assert_eq!(run(&tree, root, "p:gt(0)"), vec!["two bold", "four"]);
        assert_eq!(run(&tree, root, "p:lt(1)"), vec!["one"]);
        assert_eq!(run(&tree, root, "p:eq(5)"), Vec::<String>::new());
        assert_eq!(run(&tree, root, "p.a:last"), vec!["four"]);
    }

    #[test]
    fn test_positions_are_per_context() {
        let (tree, root) = parse(
            ParserMode::Html,
            "<div><ul><li>a</li><li>b</li></ul><ul><li>c</li><li>d</li></ul></div>",
        );
        assert_eq!(run(&tree, root, "ul li:first"), vec!["a", "c"]);
        assert_eq!(run(&tree, root, "li:first"), vec!["a"]);
        assert_eq!(run(&tree, root, "ul:last li"), vec!["c", "d"]);
        assert_eq!(run(&tree, root, "div div:even"), Vec::<String>::new());
    }

    #[test]
    fn test_combinators() {
        let (tree, root) = parse(ParserMode::Html, PAGE);
        assert_eq!(run(&tree, root, "div > p + span"), vec!["three"]);
        assert_eq!(run(&tree, root, "p ~ p"), vec!["two bold", "four"]);
        assert_eq!(run(&tree, root, "div > b"), Vec::<String>::new());
        assert_eq!(run(&tree, root, "div b"), vec!["bold"]);
        assert_eq!(run(&tree, root, "span + p"), vec!["four"]);
    }

    #[test]
    fn test_group_is_document_ordered_union() {
        let (tree, root) = parse(ParserMode::Html, PAGE);
        assert_eq!(run(&tree, root, "span, p.a, p"), vec!["one", "two bold", "three", "four"]);
    }

    #[test]
    fn test_contains_and_has() {
        let (tree, root) = parse(ParserMode::Html, PAGE);
        assert_eq!(run(&tree, root, ":contains('bold')").len(), 3);
        assert_eq!(run(&tree, root, "p:has(b)"), vec!["two bold"]);
        assert_eq!(run(&tree, root, "p:has('.missing')"), Vec::<String>::new());
        assert_eq!(run(&tree, root, "div:has(p)").len(), 1);
    }

    #[test]
    fn test_has_does_not_match_self() {
        let (tree, root) = parse(ParserMode::Html, "<div class=\"foo\"><div class=\"bar\"></div></div>");
        assert_eq!(run(&tree, root, ".foo:has('.foo')").len(), 0);
        assert_eq!(run(&tree, root, ".foo:has('.bar')").len(), 1);
        assert_eq!(run(&tree, root, ".foo:has(div)").len(), 1);
    }

    #[test]
    fn test_self_matching() {
        let (tree, root) = parse(ParserMode::Html, PAGE);
        let ps = select(&tree, root, &Query::parse("p").unwrap(), Axis::DescendantOrSelf);
        let b = select(&tree, root, &Query::parse("b").unwrap(), Axis::DescendantOrSelf)[0];

        assert!(matches(&tree, ps[1], &Query::parse("div p").unwrap()));
        assert!(matches(&tree, ps[1], &Query::parse("div > p").unwrap()));
        assert!(!matches(&tree, ps[1], &Query::parse("span p").unwrap()));
        assert!(matches(&tree, b, &Query::parse("div b").unwrap()));
        assert!(matches(&tree, b, &Query::parse("#main p b").unwrap()));
        assert!(matches(&tree, ps[2], &Query::parse("p ~ span + p").unwrap()));
        assert!(matches(&tree, ps[0], &Query::parse("p:first").unwrap()));
        assert!(matches(&tree, ps[2], &Query::parse("p:first").unwrap()));
        assert!(!matches(&tree, ps[2], &Query::parse("p:gt(0)").unwrap()));

        let only = select(&tree, ps[1], &Query::parse("p").unwrap(), Axis::SelfOnly);
        assert_eq!(only, vec![ps[1]]);
    }

    #[test]
    fn test_backtracking_descendant() {
        let (tree, root) = parse(
            ParserMode::Html,
            "<div class=\"x\"><section><div><p>deep</p></div></section></div>",
        );
        let p = select(&tree, root, &Query::parse("p").unwrap(), Axis::DescendantOrSelf)[0];
        assert!(matches(&tree, p, &Query::parse(".x > section p").unwrap()));
        assert!(matches(&tree, p, &Query::parse("div.x div p").unwrap()));
    }

    #[test]
    fn test_not_pseudo() {
        let (tree, root) = parse(ParserMode::Html, PAGE);
        assert_eq!(run(&tree, root, "p:not(.a)"), vec!["two bold"]);
        assert_eq!(run(&tree, root, "#main > :not(p)"), vec!["three"]);
    }

    #[test]
    fn test_namespaced_xml() {
        let (tree, root) = parse(
            ParserMode::Xml,
            "<root xmlns:svg=\"http://www.w3.org/2000/svg\"><svg:rect>a</svg:rect><rect>b</rect></root>",
        );
        let ns: Namespaces = [("s", "http://www.w3.org/2000/svg")].into_iter().collect();
        let translator = Translator::new(&ns, true);

        let query = translator.translate("s|rect").unwrap();
        assert_eq!(texts(&tree, &select(&tree, root, &query, Axis::DescendantOrSelf)), vec!["a"]);

        let query = translator.translate("rect").unwrap();
        assert_eq!(texts(&tree, &select(&tree, root, &query, Axis::DescendantOrSelf)), vec!["b"]);

        let query = translator.translate("*|rect").unwrap();
        assert_eq!(select(&tree, root, &query, Axis::DescendantOrSelf).len(), 2);
    }

    #[test]
    fn test_xml_case_sensitivity() {
        let (tree, root) = parse(ParserMode::Xml, "<Root><Item/><item/></Root>");
        let ns = Namespaces::new();
        let query = Translator::new(&ns, true).translate("Item").unwrap();
        assert_eq!(select(&tree, root, &query, Axis::DescendantOrSelf).len(), 1);
        let query = Translator::new(&ns, false).translate("Item").unwrap();
        assert_eq!(select(&tree, root, &query, Axis::DescendantOrSelf).len(), 2);
    }
}
